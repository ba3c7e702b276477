//! Placing orders.

#![allow(clippy::unwrap_used)]

use std::num::NonZeroU32;

use foodtruck_core::{OrderStatus, PaymentMethod, Price};
use foodtruck_integration_tests::{Client, DELIVERY_FEE_CENTS, FakeBackend, Fault};
use foodtruck_storefront::models::Address;
use foodtruck_storefront::navigation::Route;
use foodtruck_storefront::services::ServiceError;
use foodtruck_storefront::services::checkout::CheckoutError;
use foodtruck_storefront::services::auth::validation::AddressForm;
use foodtruck_storefront::storage::DurableStorage;

fn qty(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

fn address_form() -> AddressForm {
    AddressForm {
        street: "Rua das Flores".to_string(),
        number: "42".to_string(),
        complement: Some("Apto 3".to_string()),
        district: "Centro".to_string(),
        city: "São Paulo".to_string(),
        state: "sp".to_string(),
        postal_code: "01000-000".to_string(),
    }
}

async fn customer(backend: &std::sync::Arc<FakeBackend>) -> (Client, Address) {
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    let client = Client::signed_in(
        backend,
        &DurableStorage::in_memory(),
        "ana@example.com",
        "secret1",
    )
    .await;
    let address = client.state.addresses().add(&address_form()).await.unwrap();
    (client, address)
}

#[tokio::test]
async fn test_place_order() {
    let backend = FakeBackend::new();
    let burger = backend.add_product("X-Burger", 2490, None);
    let soda = backend.add_product("Soda", 600, None);
    let (client, address) = customer(&backend).await;
    assert!(address.is_default, "first address becomes the default");
    assert_eq!(address.state, "SP");

    client.state.cart().add(&burger, qty(2), Some("well done"));
    client.state.cart().add(&soda, qty(1), None);

    let summary = client.state.checkout().summary();
    assert_eq!(summary.subtotal, Price::from_cents(5580));
    assert_eq!(summary.delivery_fee, Price::from_cents(DELIVERY_FEE_CENTS));
    assert_eq!(summary.total, Price::from_cents(6080));

    let placed = client
        .state
        .checkout()
        .place_order(address.id, PaymentMethod::Pix)
        .await
        .unwrap();

    assert_eq!(placed.route, Route::Orders);
    assert_eq!(placed.order.status, OrderStatus::Pending);
    assert_eq!(placed.order.total, Price::from_cents(6080));
    assert!(placed.order.delivery_address.contains("Rua das Flores, 42"));
    assert!(client.state.cart().is_empty());

    let items = backend.items();
    assert_eq!(items.len(), 2);
    let burger_line = items.iter().find(|i| i.product_id == burger.id).unwrap();
    assert_eq!(burger_line.quantity, 2);
    assert_eq!(burger_line.unit_price, Price::from_cents(2490));
    assert_eq!(burger_line.note.as_deref(), Some("well done"));

    assert!(
        client
            .messages()
            .contains(&"Order placed successfully! Pay with Pix on delivery.".to_string())
    );

    let history = client.state.orders().list().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].items.len(), 2);
}

#[tokio::test]
async fn test_empty_cart_is_rejected() {
    let backend = FakeBackend::new();
    let (client, address) = customer(&backend).await;

    let result = client
        .state
        .checkout()
        .place_order(address.id, PaymentMethod::Cash)
        .await;

    assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    assert!(backend.orders().is_empty());
}

#[tokio::test]
async fn test_signed_out_checkout_is_rejected() {
    let backend = FakeBackend::new();
    let burger = backend.add_product("X-Burger", 2490, None);
    let (client, address) = customer(&backend).await;
    client.state.cart().add(&burger, qty(1), None);
    client.state.auth().sign_out().await.unwrap();

    let result = client
        .state
        .checkout()
        .place_order(address.id, PaymentMethod::Cash)
        .await;

    assert!(matches!(result, Err(CheckoutError::NotSignedIn)));
}

#[tokio::test]
async fn test_failed_items_cancel_order_and_keep_cart() {
    let backend = FakeBackend::new();
    let burger = backend.add_product("X-Burger", 2490, None);
    let (client, address) = customer(&backend).await;
    client.state.cart().add(&burger, qty(1), None);
    backend.fail(Fault::OrderItems);

    let result = client
        .state
        .checkout()
        .place_order(address.id, PaymentMethod::CreditCard)
        .await;

    assert!(matches!(result, Err(CheckoutError::Backend(_))));
    assert_eq!(client.state.cart().quantity_of(burger.id), 1);
    let orders = backend.orders();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].status, OrderStatus::Cancelled);
    assert!(client.messages().contains(&"Failed to place order".to_string()));
}

#[tokio::test]
async fn test_foreign_address_is_rejected() {
    let backend = FakeBackend::new();
    let burger = backend.add_product("X-Burger", 2490, None);
    let (ana, ana_address) = customer(&backend).await;
    drop(ana);

    backend.add_user("bia@example.com", "secret2", "Bia", false);
    let bia = Client::signed_in(
        &backend,
        &DurableStorage::in_memory(),
        "bia@example.com",
        "secret2",
    )
    .await;
    bia.state.cart().add(&burger, qty(1), None);

    let result = bia
        .state
        .checkout()
        .place_order(ana_address.id, PaymentMethod::Cash)
        .await;

    assert!(matches!(result, Err(CheckoutError::AddressNotFound)));
    assert!(backend.orders().is_empty());
}

#[tokio::test]
async fn test_order_history_hides_other_users_orders() {
    let backend = FakeBackend::new();
    let burger = backend.add_product("X-Burger", 2490, None);
    let (ana, address) = customer(&backend).await;
    ana.state.cart().add(&burger, qty(1), None);
    let placed = ana
        .state
        .checkout()
        .place_order(address.id, PaymentMethod::Cash)
        .await
        .unwrap();
    assert_eq!(ana.state.orders().get(placed.order.id).await.unwrap().items.len(), 1);

    backend.add_user("bia@example.com", "secret2", "Bia", false);
    let bia = Client::signed_in(
        &backend,
        &DurableStorage::in_memory(),
        "bia@example.com",
        "secret2",
    )
    .await;

    assert!(bia.state.orders().list().await.unwrap().is_empty());
    assert!(matches!(
        bia.state.orders().get(placed.order.id).await,
        Err(ServiceError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_address_book_default_and_delete() {
    let backend = FakeBackend::new();
    let (client, first) = customer(&backend).await;
    let addresses = client.state.addresses();
    let second = addresses
        .add(&AddressForm {
            street: "Avenida Paulista".to_string(),
            number: "1000".to_string(),
            ..address_form()
        })
        .await
        .unwrap();
    assert!(!second.is_default);

    addresses.set_default(second.id).await.unwrap();
    let listed = addresses.list().await.unwrap();
    assert_eq!(listed[0].id, second.id);
    assert!(listed[0].is_default);
    assert!(!listed[1].is_default);

    addresses.delete(first.id).await.unwrap();
    assert_eq!(addresses.list().await.unwrap().len(), 1);
    assert!(matches!(
        addresses.delete(first.id).await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(
        client
            .messages()
            .contains(&"Default address updated".to_string())
    );
}
