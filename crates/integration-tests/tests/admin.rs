//! Back-office access and operations.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use foodtruck_core::OrderStatus;
use foodtruck_integration_tests::{Client, FakeBackend, OBJECT_BASE_URL};
use foodtruck_storefront::services::admin::{
    AdminError, Direction, ImageUpload, ProductForm, SettingsForm, SponsorForm,
};
use foodtruck_storefront::storage::DurableStorage;

async fn admin(backend: &Arc<FakeBackend>) -> Client {
    backend.add_user("chef@example.com", "secret1", "Chef", true);
    Client::signed_in(
        backend,
        &DurableStorage::in_memory(),
        "chef@example.com",
        "secret1",
    )
    .await
}

#[tokio::test]
async fn test_customers_are_forbidden() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    let client = Client::signed_in(
        &backend,
        &DurableStorage::in_memory(),
        "ana@example.com",
        "secret1",
    )
    .await;

    assert!(matches!(
        client.state.admin().dashboard().await,
        Err(AdminError::Forbidden)
    ));
    assert!(matches!(
        client.state.admin().sponsors().await,
        Err(AdminError::Forbidden)
    ));
}

#[tokio::test]
async fn test_demoted_admin_loses_access_after_refresh() {
    let backend = FakeBackend::new();
    let storage = DurableStorage::in_memory();
    let user_id = backend.add_user("chef@example.com", "secret1", "Chef", true);
    drop(Client::signed_in(&backend, &storage, "chef@example.com", "secret1").await);
    backend.set_admin_flag(user_id, false);

    let client = Client::boot(&backend, &storage).await;
    client.state.auth().wait_for_background_refresh().await;

    assert!(matches!(
        client.state.admin().dashboard().await,
        Err(AdminError::Forbidden)
    ));
}

#[tokio::test]
async fn test_new_product_appears_on_cached_menu() {
    let backend = FakeBackend::new();
    let burgers = backend.add_category("Burgers", 1);
    backend.add_product("X-Burger", 2490, Some(burgers.id));
    let client = admin(&backend).await;

    assert_eq!(client.state.catalog().menu(None).await.unwrap().len(), 1);

    let form = ProductForm {
        name: "X-Salada".to_string(),
        description: "With lettuce".to_string(),
        price: "R$ 26,90".to_string(),
        category_id: Some(burgers.id),
        available: true,
        featured: true,
        image_url: None,
    };
    let image = ImageUpload {
        file_name: "salada.PNG".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    };
    let created = client
        .state
        .admin()
        .save_product(None, &form, Some(image))
        .await
        .unwrap()
        .unwrap();

    let paths = backend.object_paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("produtos/"));
    assert!(paths[0].ends_with(".png"));
    assert_eq!(
        created.image_url.as_deref(),
        Some(format!("{OBJECT_BASE_URL}{}", paths[0]).as_str())
    );

    let menu = client.state.catalog().menu(None).await.unwrap();
    assert_eq!(menu.len(), 2);
    let featured = client.state.catalog().featured().await.unwrap();
    assert_eq!(featured.len(), 1);
    assert_eq!(featured[0].name, "X-Salada");
}

#[tokio::test]
async fn test_invalid_product_uploads_nothing() {
    let backend = FakeBackend::new();
    let client = admin(&backend).await;
    let image = ImageUpload {
        file_name: "x.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        bytes: vec![1, 2, 3],
    };

    let result = client
        .state
        .admin()
        .save_product(None, &ProductForm::default(), Some(image))
        .await;

    assert!(matches!(result, Err(AdminError::Validation(_))));
    assert!(backend.object_paths().is_empty());
    assert!(
        client
            .messages()
            .contains(&"Fill in all required fields".to_string())
    );
}

#[tokio::test]
async fn test_order_status_and_dashboard() {
    let backend = FakeBackend::new();
    let client = admin(&backend).await;
    let burger = backend.add_product("X-Burger", 2000, None);
    client
        .state
        .cart()
        .add(&burger, std::num::NonZeroU32::MIN, None);
    let address = client
        .state
        .addresses()
        .add(&foodtruck_storefront::services::auth::validation::AddressForm {
            street: "Rua A".to_string(),
            number: "1".to_string(),
            complement: None,
            district: "Centro".to_string(),
            city: "Recife".to_string(),
            state: "PE".to_string(),
            postal_code: "50000-000".to_string(),
        })
        .await
        .unwrap();
    let placed = client
        .state
        .checkout()
        .place_order(address.id, foodtruck_core::PaymentMethod::Cash)
        .await
        .unwrap();

    let stats = client.state.admin().dashboard().await.unwrap();
    assert_eq!(stats.total_orders, 1);
    assert_eq!(stats.pending_orders, 1);

    client
        .state
        .admin()
        .set_order_status(placed.order.id, OrderStatus::Cancelled)
        .await
        .unwrap();
    let stats = client.state.admin().dashboard().await.unwrap();
    assert_eq!(stats.pending_orders, 0);
    assert_eq!(stats.total_sales, foodtruck_core::Price::ZERO);
    assert!(
        client
            .messages()
            .contains(&"Status updated to Cancelled".to_string())
    );
}

#[tokio::test]
async fn test_sponsor_reorder() {
    let backend = FakeBackend::new();
    let client = admin(&backend).await;
    let first = backend.add_sponsor("padaria", 1);
    let second = backend.add_sponsor("mercado", 2);
    let third = client
        .state
        .admin()
        .create_sponsor(&SponsorForm {
            name: "feira".to_string(),
            logo_url: "https://cdn.test/feira.png".to_string(),
            website: "https://feira.test".to_string(),
            active: true,
        })
        .await
        .unwrap();
    assert_eq!(third.position, 3);

    client
        .state
        .admin()
        .move_sponsor(third.id, Direction::Up)
        .await
        .unwrap();
    client
        .state
        .admin()
        .move_sponsor(first.id, Direction::Up)
        .await
        .unwrap();

    let order: Vec<_> = client
        .state
        .admin()
        .sponsors()
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.id)
        .collect();
    assert_eq!(order, vec![first.id, third.id, second.id]);
}

#[tokio::test]
async fn test_settings_are_validated_and_saved() {
    let backend = FakeBackend::new();
    let client = admin(&backend).await;

    let bad = SettingsForm {
        app_name: "Foodtruck".to_string(),
        logo_url: String::new(),
        primary_color: "blue".to_string(),
        secondary_color: "#FFFFFF".to_string(),
    };
    assert!(matches!(
        client.state.admin().save_settings(&bad).await,
        Err(AdminError::Validation(_))
    ));
    assert_eq!(client.state.settings().fetch().await.unwrap(), None);

    let good = SettingsForm {
        primary_color: "#00AA00".to_string(),
        ..bad
    };
    client.state.admin().save_settings(&good).await.unwrap();
    let current = client.state.settings().current().await;
    assert_eq!(current.app_name, "Foodtruck");
    assert_eq!(current.primary_color, "#00aa00");
    assert_eq!(current.secondary_color, "#ffffff");
}

#[tokio::test]
async fn test_toggle_admin() {
    let backend = FakeBackend::new();
    let client = admin(&backend).await;
    backend.add_user("ana@example.com", "secret1", "Ana", false);

    let ana = client.state.admin().users("ana").await.unwrap();
    assert_eq!(ana.len(), 1);
    assert!(client.state.admin().toggle_admin(&ana[0]).await.unwrap());
    assert!(
        client
            .messages()
            .contains(&"Ana is now an administrator".to_string())
    );
    let ana = client.state.admin().users("ana").await.unwrap();
    assert!(ana[0].is_admin);
}
