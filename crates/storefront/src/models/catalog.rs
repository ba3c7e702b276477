//! Menu entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodtruck_core::{CategoryId, Price, ProductId};

/// A menu item.
///
/// The cart stores a snapshot of this struct per line, so its serialized
/// form is part of the persisted cart format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Price,
    /// Public URL of the product image.
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default = "default_true")]
    pub available: bool,
    #[serde(default)]
    pub featured: bool,
}

const fn default_true() -> bool {
    true
}

/// Fields for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Price,
    pub image_url: Option<String>,
    pub category_id: CategoryId,
    pub available: bool,
    pub featured: bool,
}

/// A menu section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub image_url: Option<String>,
    /// Display position, ascending.
    pub position: i32,
    pub created_at: Option<DateTime<Utc>>,
}

/// Fields for creating or updating a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub image_url: Option<String>,
    pub position: Option<i32>,
}
