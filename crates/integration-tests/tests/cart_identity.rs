//! Cart persistence and isolation between accounts.

#![allow(clippy::unwrap_used)]

use std::num::NonZeroU32;

use foodtruck_integration_tests::{Client, FakeBackend};
use foodtruck_storefront::cart::CART_KEY;
use foodtruck_storefront::services::auth::PROFILE_CACHE_KEY;
use foodtruck_storefront::services::auth::validation::LoginForm;
use foodtruck_storefront::storage::{DurableStorage, FileBackend};

fn qty(n: u32) -> NonZeroU32 {
    NonZeroU32::new(n).unwrap()
}

#[tokio::test]
async fn test_cart_survives_restart_for_same_user() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    let burger = backend.add_product("X-Burger", 2490, None);
    let storage = DurableStorage::in_memory();

    {
        let client = Client::signed_in(&backend, &storage, "ana@example.com", "secret1").await;
        client.state.cart().add(&burger, qty(2), Some("no onions"));
    }

    let client = Client::boot(&backend, &storage).await;
    let items = client.state.cart().items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity.get(), 2);
    assert_eq!(items[0].note.as_deref(), Some("no onions"));
}

#[tokio::test]
async fn test_cart_survives_process_restart_on_disk() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    let burger = backend.add_product("X-Burger", 2490, None);
    let dir = tempfile::tempdir().unwrap();

    {
        let storage = DurableStorage::new(FileBackend::new(dir.path()));
        let client = Client::signed_in(&backend, &storage, "ana@example.com", "secret1").await;
        client.state.cart().add(&burger, qty(3), None);
    }

    let storage = DurableStorage::new(FileBackend::new(dir.path()));
    let client = Client::boot(&backend, &storage).await;
    assert_eq!(client.state.cart().quantity_of(burger.id), 3);
}

#[tokio::test]
async fn test_sign_out_empties_cart_before_next_user() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    backend.add_user("bia@example.com", "secret2", "Bia", false);
    let burger = backend.add_product("X-Burger", 2490, None);
    let storage = DurableStorage::in_memory();

    let client = Client::signed_in(&backend, &storage, "ana@example.com", "secret1").await;
    client.state.cart().add(&burger, qty(1), None);
    client.state.auth().sign_out().await.unwrap();

    assert!(client.state.cart().is_empty());
    assert_eq!(storage.get_item(CART_KEY).unwrap(), None);
    assert!(client.messages().contains(&"Signed out successfully".to_string()));

    let next = Client::signed_in(&backend, &storage, "bia@example.com", "secret2").await;
    assert!(next.state.cart().is_empty());
}

#[tokio::test]
async fn test_session_lost_between_runs_clears_cart() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    let burger = backend.add_product("X-Burger", 2490, None);
    let storage = DurableStorage::in_memory();

    {
        let client = Client::signed_in(&backend, &storage, "ana@example.com", "secret1").await;
        client.state.cart().add(&burger, qty(3), None);
    }
    backend.revoke_session();

    let client = Client::boot(&backend, &storage).await;
    assert!(client.state.auth().state().user.is_none());
    assert!(client.state.cart().is_empty());
    assert_eq!(storage.get_item(CART_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_failed_restore_keeps_cart() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    let burger = backend.add_product("X-Burger", 2490, None);
    let storage = DurableStorage::in_memory();

    {
        let client = Client::signed_in(&backend, &storage, "ana@example.com", "secret1").await;
        client.state.cart().add(&burger, qty(1), None);
    }
    backend.fail(foodtruck_integration_tests::Fault::SessionRestore);

    let client = Client::boot(&backend, &storage).await;
    assert!(client.state.auth().state().user.is_none());
    assert_eq!(client.state.cart().quantity_of(burger.id), 1);
}

#[tokio::test]
async fn test_cart_changes_reach_other_instances() {
    let backend = FakeBackend::new();
    let burger = backend.add_product("X-Burger", 2490, None);
    let fries = backend.add_product("Fries", 1200, None);
    let storage = DurableStorage::in_memory();

    let first = Client::boot(&backend, &storage).await;
    let second = Client::boot(&backend, &storage).await;

    first.state.cart().add(&burger, qty(1), None);
    second.state.cart().add(&fries, qty(2), None);

    assert_eq!(first.state.cart().total_item_count(), 3);
    assert_eq!(
        first.state.cart().total_price(),
        second.state.cart().total_price()
    );
}

#[tokio::test]
async fn test_switching_account_without_sign_out_empties_cart() {
    let backend = FakeBackend::new();
    backend.add_user("ana@example.com", "secret1", "Ana", false);
    backend.add_user("bia@example.com", "secret2", "Bia", false);
    let burger = backend.add_product("X-Burger", 2490, None);
    let storage = DurableStorage::in_memory();

    let client = Client::signed_in(&backend, &storage, "ana@example.com", "secret1").await;
    client.state.cart().add(&burger, qty(2), None);

    client
        .state
        .auth()
        .sign_in(&LoginForm {
            email: "bia@example.com".to_string(),
            password: "secret2".to_string(),
        })
        .await
        .unwrap();

    let profile = client.state.auth().state().profile.unwrap();
    assert_eq!(profile.name, "Bia");
    assert_eq!(client.state.cart().quantity_of(burger.id), 0);
    assert_eq!(storage.get_item(CART_KEY).unwrap(), None);
    let cached = storage.get_item(PROFILE_CACHE_KEY).unwrap().unwrap();
    assert!(cached.contains("\"Bia\""));
    assert!(!cached.contains("\"Ana\""));
}
