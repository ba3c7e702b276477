//! Product and category commands.

use foodtruck_core::{CategoryId, ProductId};
use foodtruck_storefront::AppError;
use foodtruck_storefront::services::admin::{AdminService, CategoryForm, ProductForm};

use super::read_image;
use crate::{CategoryAction, ProductArgs, ProductEdit};

pub async fn list_products(
    admin: &AdminService,
    search: &str,
    category: Option<CategoryId>,
) -> Result<(), AppError> {
    for product in admin.products(search, category).await? {
        let flags = format!(
            "{}{}",
            if product.available { " " } else { "x" },
            if product.featured { "*" } else { " " }
        );
        println!("{flags} {}  {:<32} {}", product.id, product.name, product.price);
    }
    Ok(())
}

pub async fn add_product(admin: &AdminService, args: ProductArgs) -> Result<(), AppError> {
    let form = ProductForm {
        name: args.name,
        description: args.description,
        price: args.price,
        category_id: Some(args.category),
        available: !args.unavailable,
        featured: args.featured,
        image_url: None,
    };
    let image = match &args.image {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };
    if let Some(product) = admin.save_product(None, &form, image).await? {
        println!("{}", product.id);
    }
    Ok(())
}

pub async fn edit_product(
    admin: &AdminService,
    id: ProductId,
    fields: ProductEdit,
) -> Result<(), AppError> {
    let mut form = ProductForm::from_product(&admin.product(id).await?);
    if let Some(name) = fields.name {
        form.name = name;
    }
    if let Some(description) = fields.description {
        form.description = description;
    }
    if let Some(price) = fields.price {
        form.price = price;
    }
    if fields.category.is_some() {
        form.category_id = fields.category;
    }
    let image = match &fields.image {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };
    admin.save_product(Some(id), &form, image).await?;
    Ok(())
}

pub async fn categories(admin: &AdminService, action: CategoryAction) -> Result<(), AppError> {
    match action {
        CategoryAction::List => {}
        CategoryAction::Add {
            name,
            position,
            image,
        } => {
            let image = match &image {
                Some(path) => Some(read_image(path).await?),
                None => None,
            };
            let form = CategoryForm {
                name,
                position,
                image_url: None,
            };
            admin.create_category(&form, image).await?;
        }
        CategoryAction::Edit {
            id,
            name,
            position,
            image,
        } => {
            let current = admin
                .categories()
                .await?
                .into_iter()
                .find(|c| c.id == id)
                .ok_or_else(|| AppError::BadRequest(format!("no category {id}")))?;
            let image = match &image {
                Some(path) => Some(read_image(path).await?),
                None => None,
            };
            let form = CategoryForm {
                name,
                position: position.or(Some(current.position)),
                image_url: current.image_url,
            };
            admin.update_category(id, &form, image).await?;
        }
        CategoryAction::Delete { id } => admin.delete_category(id).await?,
    }

    for category in admin.categories().await? {
        println!("{:>3}  {}  {}", category.position, category.id, category.name);
    }
    Ok(())
}
