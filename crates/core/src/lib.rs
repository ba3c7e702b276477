//! Foodtruck Core - Shared types library.
//!
//! This crate provides common types used across all Foodtruck components:
//! - `storefront` - Customer client and back-office services
//! - `cli` - Back-office management tool
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no backend
//! access, no HTTP clients. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, phones and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
