//! Checkout: turn the cart into an order.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;

use foodtruck_core::{AddressId, OrderStatus, PaymentMethod, Price};

use super::ServiceError;
use super::addresses::AddressService;
use super::auth::AuthController;
use crate::backend::{BackendError, OrderTable};
use crate::cart::CartStore;
use crate::models::{NewOrder, NewOrderItem, Order};
use crate::navigation::Route;
use crate::notify::Notifier;

/// Errors that can occur when placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("not signed in")]
    NotSignedIn,

    #[error("cart is empty")]
    EmptyCart,

    /// The address is missing or not the user's.
    #[error("delivery address not found")]
    AddressNotFound,

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<ServiceError> for CheckoutError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotSignedIn => Self::NotSignedIn,
            ServiceError::Backend(e) => Self::Backend(e),
            ServiceError::NotFound(_) | ServiceError::Validation(_) => Self::AddressNotFound,
        }
    }
}

/// A placed order and where to go next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: PaymentMethod,
    pub route: Route,
}

/// Amounts shown on the checkout page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
}

/// Places orders from the cart.
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderTable>,
    addresses: AddressService,
    auth: AuthController,
    cart: Arc<CartStore>,
    notifier: Arc<dyn Notifier>,
    delivery_fee: Price,
}

impl std::fmt::Debug for CheckoutService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutService")
            .field("delivery_fee", &self.delivery_fee)
            .finish_non_exhaustive()
    }
}

/// Human name of a payment method.
#[must_use]
pub const fn payment_label(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::CreditCard => "credit card",
        PaymentMethod::Cash => "cash",
        PaymentMethod::Pix => "Pix",
    }
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrderTable>,
        addresses: AddressService,
        auth: AuthController,
        cart: Arc<CartStore>,
        notifier: Arc<dyn Notifier>,
        delivery_fee: Price,
    ) -> Self {
        Self {
            orders,
            addresses,
            auth,
            cart,
            notifier,
            delivery_fee,
        }
    }

    /// Subtotal, fee and total for the current cart.
    #[must_use]
    pub fn summary(&self) -> CheckoutSummary {
        let subtotal = self.cart.total_price();
        CheckoutSummary {
            subtotal,
            delivery_fee: self.delivery_fee,
            total: subtotal + self.delivery_fee,
        }
    }

    /// Place an order for the cart, delivered to `address_id`.
    ///
    /// The cart is cleared only once the order and all its items are saved.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NotSignedIn`, `CheckoutError::EmptyCart` or
    /// `CheckoutError::AddressNotFound` before anything is written, and
    /// `CheckoutError::Backend` when saving fails. The cart is kept in
    /// every error case.
    #[instrument(skip(self), fields(payment = %payment))]
    pub async fn place_order(
        &self,
        address_id: AddressId,
        payment: PaymentMethod,
    ) -> Result<PlacedOrder, CheckoutError> {
        let Some(user_id) = self.auth.current_user_id() else {
            self.notifier.error("Please sign in to place an order");
            return Err(CheckoutError::NotSignedIn);
        };
        let lines = self.cart.items();
        if lines.is_empty() {
            self.notifier.error("Your cart is empty");
            return Err(CheckoutError::EmptyCart);
        }
        let address = match self.addresses.get(address_id).await {
            Ok(address) => address,
            Err(ServiceError::NotFound(_)) => {
                self.notifier.error("Select a delivery address");
                return Err(CheckoutError::AddressNotFound);
            }
            Err(e) => return Err(e.into()),
        };

        let total = self.summary().total;
        let order = self
            .orders
            .insert_order(&NewOrder {
                user_id,
                status: OrderStatus::Pending,
                total,
                delivery_address: address.one_line(),
            })
            .await
            .map_err(|e| self.fail(e))?;

        let items: Vec<NewOrderItem> = lines
            .iter()
            .map(|line| NewOrderItem {
                order_id: order.id,
                product_id: line.product.id,
                quantity: line.quantity.get(),
                unit_price: line.product.price,
                note: line.note.clone(),
            })
            .collect();

        if let Err(e) = self.orders.insert_items(&items).await {
            tracing::error!(order_id = %order.id, error = %e, "failed to save order items");
            // The order row exists without items; withdraw it.
            if let Err(cancel) = self
                .orders
                .update_status(order.id, OrderStatus::Cancelled)
                .await
            {
                tracing::error!(order_id = %order.id, error = %cancel, "failed to cancel incomplete order");
            }
            return Err(self.fail(e));
        }

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %total,
            payment = %payment,
            items = items.len(),
            "order placed"
        );
        self.cart.clear();
        self.notifier.success(&format!(
            "Order placed successfully! Pay with {} on delivery.",
            payment_label(payment)
        ));
        Ok(PlacedOrder {
            order,
            payment,
            route: Route::Orders,
        })
    }

    fn fail(&self, error: BackendError) -> CheckoutError {
        super::report_failure(self.notifier.as_ref(), error, "Failed to place order")
    }
}
