//! Order management.

use foodtruck_core::{OrderId, OrderStatus};

use super::{AdminError, AdminService};
use crate::backend::BackendError;
use crate::models::{Order, OrderWithItems};

/// Search over the order list.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Case-insensitive substring of the order id.
    pub search: String,
    pub status: Option<OrderStatus>,
}

impl OrderFilter {
    #[must_use]
    pub fn matches(&self, order: &Order) -> bool {
        let search = self.search.trim().to_lowercase();
        let matches_search = search.is_empty() || order.id.to_string().contains(&search);
        let matches_status = self.status.is_none_or(|status| order.status == status);
        matches_search && matches_status
    }
}

impl AdminService {
    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-administrators and
    /// `AdminError::Backend` when the lookup fails.
    pub async fn orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, AdminError> {
        self.require_admin()?;
        let orders = self
            .backends
            .orders
            .list_all()
            .await
            .map_err(|e| self.fail(e, "Failed to load orders"))?;
        Ok(orders.into_iter().filter(|o| filter.matches(o)).collect())
    }

    /// One order with its items.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for an unknown id.
    pub async fn order(&self, id: OrderId) -> Result<OrderWithItems, AdminError> {
        self.require_admin()?;
        let order = match self.backends.orders.get(id).await {
            Ok(order) => order,
            Err(BackendError::NotFound(_)) => return Err(AdminError::NotFound("Order".into())),
            Err(e) => return Err(self.fail(e, "Failed to load order details")),
        };
        let items = self
            .backends
            .orders
            .items_for(id)
            .await
            .map_err(|e| self.fail(e, "Failed to load order details"))?;
        Ok(OrderWithItems { order, items })
    }

    /// Move an order to `status`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-administrators and
    /// `AdminError::Backend` when the update fails.
    pub async fn set_order_status(&self, id: OrderId, status: OrderStatus) -> Result<(), AdminError> {
        self.require_admin()?;
        self.backends
            .orders
            .update_status(id, status)
            .await
            .map_err(|e| self.fail(e, "Failed to update order status"))?;
        tracing::info!(order_id = %id, status = %status, "order status updated");
        self.notifier
            .success(&format!("Status updated to {}", status.label()));
        Ok(())
    }
}
