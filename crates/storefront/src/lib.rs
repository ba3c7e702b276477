//! Foodtruck client library.
//!
//! Durable local state (cart, session, cached profile), the auth session
//! controller, and the customer and back-office services built on the
//! hosted backend. The `foodtruck` and `ft-admin` binaries are thin shells
//! over [`AppState`].

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod cache;
pub mod cart;
pub mod config;
pub mod error;
pub mod models;
pub mod navigation;
pub mod notify;
pub mod services;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use error::AppError;
pub use state::AppState;
