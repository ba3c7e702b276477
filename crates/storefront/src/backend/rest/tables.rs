//! Table access through `PostgREST` (`/rest/v1`).

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;

use foodtruck_core::{
    AddressId, CategoryId, OrderId, OrderStatus, ProductId, ProfileId, SponsorId, UserId,
};

use super::rows::{
    AddressRow, AddressWrite, CategoryRow, CategoryWrite, OrderInsert, OrderItemInsert,
    OrderItemRow, OrderRow, ProductRow, ProductWrite, ProfileInsert, ProfileRow, ProfileUpdate,
    SettingsRow, SponsorRow, SponsorWrite,
};
use super::{BackendClient, eq};
use crate::backend::{
    AddressTable, BackendError, CatalogTable, OrderTable, ProductQuery, ProfileTable,
    SettingsTable, SponsorTable,
};
use crate::models::{
    Address, AppSettings, Category, NewAddress, NewCategory, NewOrder, NewOrderItem, NewProduct,
    NewProfile, NewSponsor, Order, OrderItem, Product, Profile, ProfilePatch, SETTINGS_ROW_ID,
    Sponsor,
};

const PROFILES: &str = "perfis";
const PRODUCTS: &str = "produtos";
const CATEGORIES: &str = "categorias";
const ADDRESSES: &str = "enderecos";
const ORDERS: &str = "pedidos";
const ORDER_ITEMS: &str = "itens_pedido";
const SPONSORS: &str = "patrocinadores";
const SETTINGS: &str = "configuracoes";

fn select_all() -> (&'static str, String) {
    ("select", "*".to_string())
}

fn order_by(columns: &str) -> (&'static str, String) {
    ("order", columns.to_string())
}

#[async_trait]
impl ProfileTable for BackendClient {
    #[instrument(skip(self))]
    async fn select_by_user_id(&self, user_id: UserId) -> Result<Profile, BackendError> {
        let row: ProfileRow = self
            .select_one(PROFILES, &[select_all(), eq("user_id", user_id)])
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, profile), fields(user_id = %profile.user_id))]
    async fn insert(&self, profile: &NewProfile) -> Result<Profile, BackendError> {
        let row: ProfileRow = self
            .insert_returning(PROFILES, &ProfileInsert::from(profile))
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, user_id: UserId, patch: &ProfilePatch) -> Result<(), BackendError> {
        self.patch(PROFILES, &[eq("user_id", user_id)], &ProfileUpdate::from(patch))
            .await
    }

    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Profile>, BackendError> {
        let rows: Vec<ProfileRow> = self
            .select_many(PROFILES, &[select_all(), order_by("nome.asc")])
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn set_admin(&self, id: ProfileId, is_admin: bool) -> Result<(), BackendError> {
        self.patch(
            PROFILES,
            &[eq("id", id)],
            &serde_json::json!({ "is_admin": is_admin }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: ProfileId) -> Result<(), BackendError> {
        self.delete_where(PROFILES, &[eq("id", id)]).await
    }
}

#[async_trait]
impl CatalogTable for BackendClient {
    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<Category>, BackendError> {
        let rows: Vec<CategoryRow> = self
            .select_many(CATEGORIES, &[select_all(), order_by("ordem.asc")])
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, category))]
    async fn insert_category(&self, category: &NewCategory) -> Result<Category, BackendError> {
        let row: CategoryRow = self
            .insert_returning(CATEGORIES, &CategoryWrite::from(category))
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, category))]
    async fn update_category(
        &self,
        id: CategoryId,
        category: &NewCategory,
    ) -> Result<(), BackendError> {
        self.patch(CATEGORIES, &[eq("id", id)], &CategoryWrite::from(category))
            .await
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: CategoryId) -> Result<(), BackendError> {
        self.delete_where(CATEGORIES, &[eq("id", id)]).await
    }

    #[instrument(skip(self))]
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, BackendError> {
        let mut params = vec![select_all(), order_by("nome.asc")];
        if let Some(category) = query.category {
            params.push(eq("categoria_id", category));
        }
        if query.available_only {
            params.push(eq("disponivel", true));
        }
        if query.featured_only {
            params.push(eq("destaque", true));
        }
        let rows: Vec<ProductRow> = self.select_many(PRODUCTS, &params).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        let row: ProductRow = self
            .select_one(PRODUCTS, &[select_all(), eq("id", id)])
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, product))]
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError> {
        let row: ProductRow = self
            .insert_returning(PRODUCTS, &ProductWrite::from(product))
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, product))]
    async fn update_product(
        &self,
        id: ProductId,
        product: &NewProduct,
    ) -> Result<(), BackendError> {
        self.patch(PRODUCTS, &[eq("id", id)], &ProductWrite::from(product))
            .await
    }

    #[instrument(skip(self))]
    async fn set_product_available(
        &self,
        id: ProductId,
        available: bool,
    ) -> Result<(), BackendError> {
        self.patch(
            PRODUCTS,
            &[eq("id", id)],
            &serde_json::json!({ "disponivel": available }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn set_product_featured(
        &self,
        id: ProductId,
        featured: bool,
    ) -> Result<(), BackendError> {
        self.patch(
            PRODUCTS,
            &[eq("id", id)],
            &serde_json::json!({ "destaque": featured }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<(), BackendError> {
        self.delete_where(PRODUCTS, &[eq("id", id)]).await
    }
}

#[async_trait]
impl AddressTable for BackendClient {
    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, BackendError> {
        let rows: Vec<AddressRow> = self
            .select_many(
                ADDRESSES,
                &[
                    select_all(),
                    eq("user_id", user_id),
                    order_by("padrao.desc,created_at.asc"),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, address))]
    async fn insert(
        &self,
        user_id: UserId,
        address: &NewAddress,
        is_default: bool,
    ) -> Result<Address, BackendError> {
        let row: AddressRow = self
            .insert_returning(
                ADDRESSES,
                &AddressWrite::insert(user_id, address, is_default),
            )
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, address))]
    async fn update(&self, id: AddressId, address: &NewAddress) -> Result<(), BackendError> {
        self.patch(ADDRESSES, &[eq("id", id)], &AddressWrite::update(address))
            .await
    }

    #[instrument(skip(self))]
    async fn set_default(&self, user_id: UserId, id: AddressId) -> Result<(), BackendError> {
        self.patch(
            ADDRESSES,
            &[eq("user_id", user_id)],
            &serde_json::json!({ "padrao": false }),
        )
        .await?;
        self.patch(
            ADDRESSES,
            &[eq("id", id), eq("user_id", user_id)],
            &serde_json::json!({ "padrao": true }),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: AddressId) -> Result<(), BackendError> {
        self.delete_where(ADDRESSES, &[eq("id", id)]).await
    }
}

#[async_trait]
impl OrderTable for BackendClient {
    #[instrument(skip(self, order), fields(user_id = %order.user_id))]
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        let row: OrderRow = self
            .insert_returning(ORDERS, &OrderInsert::from(order))
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_items(&self, items: &[NewOrderItem]) -> Result<(), BackendError> {
        let rows: Vec<OrderItemInsert<'_>> = items.iter().map(Into::into).collect();
        self.insert_rows(ORDER_ITEMS, &rows).await
    }

    #[instrument(skip(self))]
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, BackendError> {
        let rows: Vec<OrderRow> = self
            .select_many(
                ORDERS,
                &[select_all(), eq("user_id", user_id), order_by("created_at.desc")],
            )
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<Order>, BackendError> {
        let rows: Vec<OrderRow> = self
            .select_many(ORDERS, &[select_all(), order_by("created_at.desc")])
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: OrderId) -> Result<Order, BackendError> {
        let row: OrderRow = self.select_one(ORDERS, &[select_all(), eq("id", id)]).await?;
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn items_for(&self, id: OrderId) -> Result<Vec<OrderItem>, BackendError> {
        let rows: Vec<OrderItemRow> = self
            .select_many(
                ORDER_ITEMS,
                &[
                    ("select", "*,produtos(nome)".to_string()),
                    eq("pedido_id", id),
                    order_by("created_at.asc"),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn update_status(&self, id: OrderId, status: OrderStatus) -> Result<(), BackendError> {
        self.patch(
            ORDERS,
            &[eq("id", id)],
            &serde_json::json!({
                "status": status,
                "updated_at": chrono::Utc::now(),
            }),
        )
        .await
    }
}

#[async_trait]
impl SponsorTable for BackendClient {
    #[instrument(skip(self))]
    async fn list(&self) -> Result<Vec<Sponsor>, BackendError> {
        let rows: Vec<SponsorRow> = self
            .select_many(SPONSORS, &[select_all(), order_by("ordem.asc")])
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self, sponsor))]
    async fn insert(&self, sponsor: &NewSponsor, position: i32) -> Result<Sponsor, BackendError> {
        let row: SponsorRow = self
            .insert_returning(SPONSORS, &SponsorWrite::new(sponsor, Some(position)))
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self, sponsor))]
    async fn update(&self, id: SponsorId, sponsor: &NewSponsor) -> Result<(), BackendError> {
        self.patch(SPONSORS, &[eq("id", id)], &SponsorWrite::new(sponsor, None))
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: SponsorId) -> Result<(), BackendError> {
        self.delete_where(SPONSORS, &[eq("id", id)]).await
    }

    #[instrument(skip(self))]
    async fn set_active(&self, id: SponsorId, active: bool) -> Result<(), BackendError> {
        self.patch(SPONSORS, &[eq("id", id)], &serde_json::json!({ "ativo": active }))
            .await
    }

    #[instrument(skip(self))]
    async fn set_position(&self, id: SponsorId, position: i32) -> Result<(), BackendError> {
        self.patch(SPONSORS, &[eq("id", id)], &serde_json::json!({ "ordem": position }))
            .await
    }
}

#[async_trait]
impl SettingsTable for BackendClient {
    #[instrument(skip(self))]
    async fn fetch(&self) -> Result<Option<AppSettings>, BackendError> {
        let rows: Vec<SettingsRow> = self
            .select_many(SETTINGS, &[select_all(), eq("id", SETTINGS_ROW_ID)])
            .await?;
        Ok(rows.into_iter().next().map(Into::into))
    }

    #[instrument(skip(self, settings))]
    async fn upsert(&self, settings: &AppSettings) -> Result<(), BackendError> {
        let request = self
            .table(Method::POST, SETTINGS, &[])?
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&SettingsRow::from(settings));
        self.execute(request, SETTINGS).await.map(drop)
    }
}
