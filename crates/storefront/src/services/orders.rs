//! Order history of the signed-in user.

use std::sync::Arc;

use foodtruck_core::OrderId;

use super::auth::AuthController;
use super::{ServiceError, report_failure};
use crate::backend::{BackendError, OrderTable};
use crate::models::{Order, OrderWithItems};
use crate::notify::Notifier;

/// Read-only access to the user's orders.
#[derive(Clone)]
pub struct OrderHistory {
    table: Arc<dyn OrderTable>,
    auth: AuthController,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for OrderHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderHistory").finish_non_exhaustive()
    }
}

/// Load the items of each order, keeping order.
pub(crate) async fn with_items(
    table: &dyn OrderTable,
    orders: Vec<Order>,
) -> Result<Vec<OrderWithItems>, BackendError> {
    let mut loaded = Vec::with_capacity(orders.len());
    for order in orders {
        let items = table.items_for(order.id).await?;
        loaded.push(OrderWithItems { order, items });
    }
    Ok(loaded)
}

impl OrderHistory {
    #[must_use]
    pub fn new(table: Arc<dyn OrderTable>, auth: AuthController, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            table,
            auth,
            notifier,
        }
    }

    /// The user's orders, newest first, each with its items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotSignedIn` without a user and
    /// `ServiceError::Backend` when a lookup fails.
    pub async fn list(&self) -> Result<Vec<OrderWithItems>, ServiceError> {
        let user_id = self.auth.current_user_id().ok_or(ServiceError::NotSignedIn)?;
        let result = async {
            let orders = self.table.list_for_user(user_id).await?;
            with_items(self.table.as_ref(), orders).await
        }
        .await;
        result.map_err(|e| report_failure(self.notifier.as_ref(), e, "Failed to load orders"))
    }

    /// One of the user's orders with its items.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::NotFound` when the order does not exist or
    /// belongs to someone else.
    pub async fn get(&self, id: OrderId) -> Result<OrderWithItems, ServiceError> {
        let user_id = self.auth.current_user_id().ok_or(ServiceError::NotSignedIn)?;
        let order = match self.table.get(id).await {
            Ok(order) if order.user_id == user_id => order,
            Ok(_) | Err(BackendError::NotFound(_)) => {
                self.notifier.error("Order not found");
                return Err(ServiceError::NotFound("Order".to_string()));
            }
            Err(e) => return Err(report_failure(self.notifier.as_ref(), e, "Failed to load order")),
        };
        let items = self
            .table
            .items_for(order.id)
            .await
            .map_err(|e| {
                report_failure::<ServiceError>(self.notifier.as_ref(), e, "Failed to load order")
            })?;
        Ok(OrderWithItems { order, items })
    }
}
