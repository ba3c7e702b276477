//! Dashboard figures.

use foodtruck_core::{OrderStatus, Price};

use super::{AdminError, AdminService};
use crate::models::Order;

/// Number of recent orders shown.
const RECENT_ORDERS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardStats {
    /// Sum of totals of every order that was not cancelled.
    pub total_sales: Price,
    pub total_orders: usize,
    pub total_users: usize,
    pub pending_orders: usize,
    /// Newest first.
    pub recent_orders: Vec<Order>,
}

impl DashboardStats {
    /// Compute the figures from all orders (newest first) and the user count.
    #[must_use]
    pub fn compute(orders: &[Order], total_users: usize) -> Self {
        Self {
            total_sales: orders
                .iter()
                .filter(|o| o.status != OrderStatus::Cancelled)
                .map(|o| o.total)
                .sum(),
            total_orders: orders.len(),
            total_users,
            pending_orders: orders
                .iter()
                .filter(|o| o.status == OrderStatus::Pending)
                .count(),
            recent_orders: orders.iter().take(RECENT_ORDERS).cloned().collect(),
        }
    }
}

impl AdminService {
    /// Sales, counts and the latest orders.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-administrators and
    /// `AdminError::Backend` when a lookup fails.
    pub async fn dashboard(&self) -> Result<DashboardStats, AdminError> {
        self.require_admin()?;
        let (orders, profiles) = tokio::try_join!(
            self.backends.orders.list_all(),
            self.backends.profiles.list()
        )
        .map_err(|e| self.fail(e, "Failed to load dashboard"))?;
        Ok(DashboardStats::compute(&orders, profiles.len()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use foodtruck_core::{OrderId, UserId};

    use super::*;

    fn order(status: OrderStatus, cents: u32, age_minutes: i64) -> Order {
        Order {
            id: OrderId::random(),
            user_id: UserId::random(),
            status,
            total: Price::from_cents(cents),
            delivery_address: String::new(),
            created_at: Utc::now() - Duration::minutes(age_minutes),
            updated_at: None,
        }
    }

    #[test]
    fn test_cancelled_orders_are_not_sales() {
        let orders = vec![
            order(OrderStatus::Pending, 1_000, 1),
            order(OrderStatus::Cancelled, 5_000, 2),
            order(OrderStatus::Completed, 2_500, 3),
        ];
        let stats = DashboardStats::compute(&orders, 4);
        assert_eq!(stats.total_sales, Price::from_cents(3_500));
        assert_eq!(stats.total_orders, 3);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.total_users, 4);
    }

    #[test]
    fn test_recent_orders_are_capped() {
        let orders: Vec<Order> = (0..8)
            .map(|i| order(OrderStatus::Pending, 100, i))
            .collect();
        let stats = DashboardStats::compute(&orders, 0);
        assert_eq!(stats.recent_orders.len(), 5);
        assert_eq!(stats.recent_orders[0].id, orders[0].id);
    }
}
