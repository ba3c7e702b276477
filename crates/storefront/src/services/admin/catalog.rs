//! Product and category management, including image uploads.
//!
//! Images go to object storage under `<folder>/<millis>-<random>.<ext>` and
//! the public URL is stored on the row. Every successful write drops the
//! customer-facing catalog cache.

use chrono::Utc;
use rand::Rng;

use foodtruck_core::{CategoryId, Price, ProductId};

use super::{AdminError, AdminService};
use crate::backend::{BackendError, ProductQuery};
use crate::models::{Category, NewCategory, NewProduct, Product};
use crate::services::auth::validation::ValidationErrors;

const PRODUCT_IMAGES: &str = "produtos";
const CATEGORY_IMAGES: &str = "categorias";

/// Length of the random part of an image name.
const RANDOM_SUFFIX_LEN: usize = 9;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// An image chosen for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    /// Original file name; only its extension is kept.
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// Storage path for a new image in `folder`.
#[must_use]
pub fn image_path(folder: &str, file_name: &str) -> String {
    let ext = std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map_or_else(|| "bin".to_string(), str::to_lowercase);
    let mut rng = rand::rng();
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .filter_map(|_| BASE36.get(rng.random_range(0..BASE36.len())).copied().map(char::from))
        .collect();
    format!("{folder}/{}-{suffix}.{ext}", Utc::now().timestamp_millis())
}

/// Whether `product` matches a back-office search.
#[must_use]
pub fn product_matches(product: &Product, search: &str, category: Option<CategoryId>) -> bool {
    let search = search.trim().to_lowercase();
    (search.is_empty() || product.name.to_lowercase().contains(&search))
        && category.is_none_or(|c| product.category_id == Some(c))
}

/// Product editor fields.
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: String,
    pub description: String,
    /// As typed, e.g. `24,90`.
    pub price: String,
    pub category_id: Option<CategoryId>,
    pub available: bool,
    pub featured: bool,
    /// Image already stored on the product, kept when no new one is chosen.
    pub image_url: Option<String>,
}

impl ProductForm {
    /// Start an edit from an existing product.
    #[must_use]
    pub fn from_product(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.amount().to_string(),
            category_id: product.category_id,
            available: product.available,
            featured: product.featured,
            image_url: product.image_url.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns the failing fields. Name, description, price and category are
    /// required.
    pub fn validate(&self) -> Result<NewProduct, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        }
        let description = self.description.trim();
        if description.is_empty() {
            errors.add("description", "Description is required");
        }
        let price = if self.price.trim().is_empty() {
            errors.add("price", "Price is required");
            None
        } else {
            match self.price.parse::<Price>() {
                Ok(price) => Some(price),
                Err(e) => {
                    errors.add("price", e.to_string());
                    None
                }
            }
        };
        if self.category_id.is_none() {
            errors.add("category_id", "Category is required");
        }

        match (price, self.category_id) {
            (Some(price), Some(category_id)) if errors.is_empty() => Ok(NewProduct {
                name: name.to_string(),
                description: description.to_string(),
                price,
                image_url: self.image_url.clone(),
                category_id,
                available: self.available,
                featured: self.featured,
            }),
            _ => Err(errors),
        }
    }
}

/// Category editor fields.
#[derive(Debug, Clone, Default)]
pub struct CategoryForm {
    pub name: String,
    pub position: Option<i32>,
    /// Image already stored on the category.
    pub image_url: Option<String>,
}

impl CategoryForm {
    fn validate(&self) -> Result<NewCategory, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        }
        errors.finish(|| NewCategory {
            name: name.to_string(),
            image_url: self.image_url.clone(),
            position: self.position,
        })
    }
}

impl AdminService {
    async fn upload_image(&self, folder: &str, image: ImageUpload) -> Result<String, AdminError> {
        let path = image_path(folder, &image.file_name);
        let url = self
            .backends
            .objects
            .upload(&path, image.bytes, &image.content_type)
            .await
            .map_err(|e| self.fail(e, "Failed to upload image"))?;
        tracing::info!(path = %path, "image uploaded");
        Ok(url)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Every product ordered by name, filtered by `search` and `category`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` for non-administrators and
    /// `AdminError::Backend` when the lookup fails.
    pub async fn products(
        &self,
        search: &str,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, AdminError> {
        self.require_admin()?;
        let products = self
            .backends
            .catalog
            .list_products(&ProductQuery::ALL)
            .await
            .map_err(|e| self.fail(e, "Failed to load products"))?;
        Ok(products
            .into_iter()
            .filter(|p| product_matches(p, search, category))
            .collect())
    }

    /// One product for editing.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::NotFound` for an unknown id.
    pub async fn product(&self, id: ProductId) -> Result<Product, AdminError> {
        self.require_admin()?;
        match self.backends.catalog.get_product(id).await {
            Ok(product) => Ok(product),
            Err(BackendError::NotFound(_)) => Err(AdminError::NotFound("Product".into())),
            Err(e) => Err(self.fail(e, "Failed to load product")),
        }
    }

    /// Create a product, or update it when `id` is given.
    ///
    /// A chosen image is uploaded first and replaces the form's image URL.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` when a required field is missing
    /// (nothing is uploaded) and `AdminError::Backend` when the upload or
    /// the write fails.
    pub async fn save_product(
        &self,
        id: Option<ProductId>,
        form: &ProductForm,
        image: Option<ImageUpload>,
    ) -> Result<Option<Product>, AdminError> {
        self.require_admin()?;
        let mut product = form.validate().inspect_err(|_| {
            self.notifier.error("Fill in all required fields");
        })?;
        if let Some(image) = image {
            product.image_url = Some(self.upload_image(PRODUCT_IMAGES, image).await?);
        }

        let saved = match id {
            Some(id) => {
                self.backends
                    .catalog
                    .update_product(id, &product)
                    .await
                    .map_err(|e| self.fail(e, "Failed to save product"))?;
                self.notifier.success("Product updated successfully");
                None
            }
            None => {
                let created = self
                    .backends
                    .catalog
                    .insert_product(&product)
                    .await
                    .map_err(|e| self.fail(e, "Failed to save product"))?;
                self.notifier.success("Product created successfully");
                Some(created)
            }
        };
        self.catalog.invalidate_all().await;
        Ok(saved)
    }

    /// Flip whether customers can order `product`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the update fails.
    pub async fn toggle_product_available(&self, product: &Product) -> Result<bool, AdminError> {
        self.require_admin()?;
        let available = !product.available;
        self.backends
            .catalog
            .set_product_available(product.id, available)
            .await
            .map_err(|e| self.fail(e, "Failed to update product status"))?;
        self.catalog.invalidate_all().await;
        self.notifier.success(if available {
            "Product enabled"
        } else {
            "Product disabled"
        });
        Ok(available)
    }

    /// Flip whether `product` is featured on the home page.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the update fails.
    pub async fn toggle_product_featured(&self, product: &Product) -> Result<bool, AdminError> {
        self.require_admin()?;
        let featured = !product.featured;
        self.backends
            .catalog
            .set_product_featured(product.id, featured)
            .await
            .map_err(|e| self.fail(e, "Failed to update featured products"))?;
        self.catalog.invalidate_all().await;
        self.notifier.success(if featured {
            "Product featured"
        } else {
            "Product removed from featured"
        });
        Ok(featured)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the delete fails.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        self.require_admin()?;
        self.backends
            .catalog
            .delete_product(id)
            .await
            .map_err(|e| self.fail(e, "Failed to delete product"))?;
        self.catalog.invalidate_all().await;
        tracing::info!(product_id = %id, "product deleted");
        self.notifier.success("Product deleted successfully");
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Categories ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the lookup fails.
    pub async fn categories(&self) -> Result<Vec<Category>, AdminError> {
        self.require_admin()?;
        self.backends
            .catalog
            .list_categories()
            .await
            .map_err(|e| self.fail(e, "Failed to load categories"))
    }

    /// Create a category. An image is required.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` without a name or image and
    /// `AdminError::Backend` when the upload or insert fails.
    pub async fn create_category(
        &self,
        form: &CategoryForm,
        image: Option<ImageUpload>,
    ) -> Result<Category, AdminError> {
        self.require_admin()?;
        let mut category = form.validate()?;
        let Some(image) = image else {
            let mut errors = ValidationErrors::new();
            errors.add("image", "Select an image");
            self.notifier.error("Select an image");
            return Err(errors.into());
        };
        category.image_url = Some(self.upload_image(CATEGORY_IMAGES, image).await?);

        let created = self
            .backends
            .catalog
            .insert_category(&category)
            .await
            .map_err(|e| self.fail(e, "Failed to save category"))?;
        self.catalog.invalidate_all().await;
        self.notifier.success("Category created");
        Ok(created)
    }

    /// Rename a category, optionally replacing its image.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Validation` without a name and
    /// `AdminError::Backend` when the upload or update fails.
    pub async fn update_category(
        &self,
        id: CategoryId,
        form: &CategoryForm,
        image: Option<ImageUpload>,
    ) -> Result<(), AdminError> {
        self.require_admin()?;
        let mut category = form.validate()?;
        if let Some(image) = image {
            category.image_url = Some(self.upload_image(CATEGORY_IMAGES, image).await?);
        }
        self.backends
            .catalog
            .update_category(id, &category)
            .await
            .map_err(|e| self.fail(e, "Failed to save category"))?;
        self.catalog.invalidate_all().await;
        self.notifier.success("Category updated");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `AdminError::Backend` when the delete fails.
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), AdminError> {
        self.require_admin()?;
        self.backends
            .catalog
            .delete_category(id)
            .await
            .map_err(|e| self.fail(e, "Failed to delete category"))?;
        self.catalog.invalidate_all().await;
        self.notifier.success("Category deleted");
        Ok(())
    }
}
