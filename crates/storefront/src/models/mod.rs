//! Domain models for the storefront.
//!
//! These are the validated shapes the services work with. Backend rows use
//! their own column names and are converted at the REST boundary
//! (see `backend::rest::rows`).

mod address;
mod catalog;
mod order;
mod profile;
mod session;
mod settings;
mod sponsor;

pub use address::{Address, NewAddress};
pub use catalog::{Category, NewCategory, NewProduct, Product};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderWithItems};
pub use profile::{NewProfile, Profile, ProfilePatch};
pub use session::{AuthEvent, AuthUser, Session};
pub use settings::{AppSettings, DEFAULT_PRIMARY_COLOR, DEFAULT_SECONDARY_COLOR, SETTINGS_ROW_ID};
pub use sponsor::{NewSponsor, Sponsor};
