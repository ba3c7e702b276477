//! Table row shapes and their conversions to domain models.
//!
//! Column names follow the backend schema. Each row type has an explicit
//! conversion into its model; nothing untyped crosses this boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use foodtruck_core::{
    AddressId, CategoryId, OrderId, OrderItemId, OrderStatus, Price, ProductId, ProfileId,
    SponsorId, UserId,
};

use crate::models::{
    Address, AppSettings, Category, DEFAULT_PRIMARY_COLOR, DEFAULT_SECONDARY_COLOR, NewAddress,
    NewCategory, NewOrder, NewOrderItem, NewProduct, NewProfile, NewSponsor, Order, OrderItem,
    Product, Profile, ProfilePatch, SETTINGS_ROW_ID, Sponsor,
};

// =============================================================================
// perfis
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProfileRow {
    pub id: ProfileId,
    pub user_id: UserId,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub telefone: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: Some(row.id),
            user_id: row.user_id,
            name: row.nome.unwrap_or_default(),
            phone: row.telefone.unwrap_or_default(),
            is_admin: row.is_admin.unwrap_or(false),
            created_at: row.created_at,
            updated_at: row.updated_at,
            extra: row.extra,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileInsert<'a> {
    pub user_id: UserId,
    pub nome: &'a str,
    pub telefone: &'a str,
    pub is_admin: bool,
}

impl<'a> From<&'a NewProfile> for ProfileInsert<'a> {
    fn from(profile: &'a NewProfile) -> Self {
        Self {
            user_id: profile.user_id,
            nome: &profile.name,
            telefone: &profile.phone,
            is_admin: profile.is_admin,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdate<'a> {
    pub nome: &'a str,
    pub telefone: &'a str,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a ProfilePatch> for ProfileUpdate<'a> {
    fn from(patch: &'a ProfilePatch) -> Self {
        Self {
            nome: &patch.name,
            telefone: &patch.phone,
            updated_at: patch.updated_at,
        }
    }
}

// =============================================================================
// produtos / categorias
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub nome: String,
    #[serde(default)]
    pub descricao: Option<String>,
    pub preco: Price,
    #[serde(default)]
    pub imagem_url: Option<String>,
    #[serde(default)]
    pub categoria_id: Option<CategoryId>,
    #[serde(default)]
    pub disponivel: Option<bool>,
    #[serde(default)]
    pub destaque: Option<bool>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.nome,
            description: row.descricao.unwrap_or_default(),
            price: row.preco,
            image_url: row.imagem_url.filter(|u| !u.is_empty()),
            category_id: row.categoria_id,
            available: row.disponivel.unwrap_or(true),
            featured: row.destaque.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductWrite<'a> {
    pub nome: &'a str,
    pub descricao: &'a str,
    pub preco: Price,
    pub imagem_url: &'a str,
    pub categoria_id: CategoryId,
    pub disponivel: bool,
    pub destaque: bool,
}

impl<'a> From<&'a NewProduct> for ProductWrite<'a> {
    fn from(product: &'a NewProduct) -> Self {
        Self {
            nome: &product.name,
            descricao: &product.description,
            preco: product.price,
            imagem_url: product.image_url.as_deref().unwrap_or_default(),
            categoria_id: product.category_id,
            disponivel: product.available,
            destaque: product.featured,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CategoryRow {
    pub id: CategoryId,
    pub nome: String,
    #[serde(default)]
    pub imagem_url: Option<String>,
    #[serde(default)]
    pub ordem: Option<i32>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.nome,
            image_url: row.imagem_url.filter(|u| !u.is_empty()),
            position: row.ordem.unwrap_or_default(),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryWrite<'a> {
    pub nome: &'a str,
    pub imagem_url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordem: Option<i32>,
}

impl<'a> From<&'a NewCategory> for CategoryWrite<'a> {
    fn from(category: &'a NewCategory) -> Self {
        Self {
            nome: &category.name,
            imagem_url: category.image_url.as_deref().unwrap_or_default(),
            ordem: category.position,
        }
    }
}

// =============================================================================
// enderecos
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct AddressRow {
    pub id: AddressId,
    pub user_id: UserId,
    pub rua: String,
    pub numero: String,
    #[serde(default)]
    pub complemento: Option<String>,
    pub bairro: String,
    pub cidade: String,
    pub estado: String,
    pub cep: String,
    #[serde(default)]
    pub padrao: Option<bool>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            street: row.rua,
            number: row.numero,
            complement: row.complemento.filter(|c| !c.trim().is_empty()),
            district: row.bairro,
            city: row.cidade,
            state: row.estado,
            postal_code: row.cep,
            is_default: row.padrao.unwrap_or(false),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AddressWrite<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    pub rua: &'a str,
    pub numero: &'a str,
    pub complemento: Option<&'a str>,
    pub bairro: &'a str,
    pub cidade: &'a str,
    pub estado: &'a str,
    pub cep: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padrao: Option<bool>,
}

impl<'a> AddressWrite<'a> {
    /// Insert payload for a new address of `user_id`.
    pub fn insert(user_id: UserId, address: &'a NewAddress, is_default: bool) -> Self {
        Self {
            user_id: Some(user_id),
            padrao: Some(is_default),
            ..Self::update(address)
        }
    }

    /// Update payload leaving owner and default flag untouched.
    pub fn update(address: &'a NewAddress) -> Self {
        Self {
            user_id: None,
            rua: &address.street,
            numero: &address.number,
            complemento: address.complement.as_deref(),
            bairro: &address.district,
            cidade: &address.city,
            estado: &address.state,
            cep: &address.postal_code,
            padrao: None,
        }
    }
}

// =============================================================================
// pedidos / itens_pedido
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct OrderRow {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Price,
    pub endereco_entrega: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            status: row.status,
            total: row.total,
            delivery_address: row.endereco_entrega,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderInsert<'a> {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub total: Price,
    pub endereco_entrega: &'a str,
}

impl<'a> From<&'a NewOrder> for OrderInsert<'a> {
    fn from(order: &'a NewOrder) -> Self {
        Self {
            user_id: order.user_id,
            status: order.status,
            total: order.total,
            endereco_entrega: &order.delivery_address,
        }
    }
}

/// Embedded `produtos(nome)` resource on an item row.
#[derive(Debug, Deserialize)]
pub struct EmbeddedProductName {
    pub nome: String,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemRow {
    pub id: OrderItemId,
    pub pedido_id: OrderId,
    pub produto_id: ProductId,
    pub quantidade: u32,
    pub preco_unitario: Price,
    #[serde(default)]
    pub observacao: Option<String>,
    #[serde(default)]
    pub produtos: Option<EmbeddedProductName>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.pedido_id,
            product_id: row.produto_id,
            product_name: row.produtos.map(|p| p.nome),
            quantity: row.quantidade,
            unit_price: row.preco_unitario,
            note: row.observacao.filter(|n| !n.is_empty()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderItemInsert<'a> {
    pub pedido_id: OrderId,
    pub produto_id: ProductId,
    pub quantidade: u32,
    pub preco_unitario: Price,
    pub observacao: Option<&'a str>,
}

impl<'a> From<&'a NewOrderItem> for OrderItemInsert<'a> {
    fn from(item: &'a NewOrderItem) -> Self {
        Self {
            pedido_id: item.order_id,
            produto_id: item.product_id,
            quantidade: item.quantity,
            preco_unitario: item.unit_price,
            observacao: item.note.as_deref(),
        }
    }
}

// =============================================================================
// patrocinadores
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct SponsorRow {
    pub id: SponsorId,
    pub nome: String,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub ativo: Option<bool>,
    #[serde(default)]
    pub ordem: Option<i32>,
}

impl From<SponsorRow> for Sponsor {
    fn from(row: SponsorRow) -> Self {
        Self {
            id: row.id,
            name: row.nome,
            logo_url: row.logo_url.unwrap_or_default(),
            website: row.website.unwrap_or_default(),
            active: row.ativo.unwrap_or(true),
            position: row.ordem.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SponsorWrite<'a> {
    pub nome: &'a str,
    pub logo_url: &'a str,
    pub website: &'a str,
    pub ativo: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordem: Option<i32>,
}

impl<'a> SponsorWrite<'a> {
    pub fn new(sponsor: &'a NewSponsor, position: Option<i32>) -> Self {
        Self {
            nome: &sponsor.name,
            logo_url: &sponsor.logo_url,
            website: &sponsor.website,
            ativo: sponsor.active,
            ordem: position,
        }
    }
}

// =============================================================================
// configuracoes
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsRow {
    pub id: String,
    #[serde(default)]
    pub nome_app: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub cor_primaria: Option<String>,
    #[serde(default)]
    pub cor_secundaria: Option<String>,
}

impl From<SettingsRow> for AppSettings {
    fn from(row: SettingsRow) -> Self {
        let color = |c: Option<String>, default: &str| {
            c.filter(|c| !c.is_empty())
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            app_name: row.nome_app.unwrap_or_default(),
            logo_url: row.logo_url.unwrap_or_default(),
            primary_color: color(row.cor_primaria, DEFAULT_PRIMARY_COLOR),
            secondary_color: color(row.cor_secundaria, DEFAULT_SECONDARY_COLOR),
        }
    }
}

impl From<&AppSettings> for SettingsRow {
    fn from(settings: &AppSettings) -> Self {
        Self {
            id: SETTINGS_ROW_ID.to_string(),
            nome_app: Some(settings.app_name.clone()),
            logo_url: Some(settings.logo_url.clone()),
            cor_primaria: Some(settings.primary_color.clone()),
            cor_secundaria: Some(settings.secondary_color.clone()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_row_tolerates_nulls() {
        let row: ProfileRow = serde_json::from_value(serde_json::json!({
            "id": "0b6f6b1e-3b8c-4f0e-9d77-7d1c6f2f6a01",
            "user_id": "6f1c9d0e-6a55-4d4b-9a57-2a1f4d8c0b11",
            "nome": null,
            "telefone": "(11) 91234-5678",
            "is_admin": null,
            "created_at": "2025-03-01T12:00:00+00:00",
            "avatar_url": "a.png"
        }))
        .unwrap();
        let profile = Profile::from(row);
        assert_eq!(profile.name, "");
        assert!(!profile.is_admin);
        assert!(profile.extra.contains_key("avatar_url"));
    }

    #[test]
    fn test_product_row_numeric_price() {
        let row: ProductRow = serde_json::from_value(serde_json::json!({
            "id": "2a7c1b0e-1111-4d4b-9a57-2a1f4d8c0b11",
            "nome": "X-Salada",
            "descricao": "Pão, carne, alface",
            "preco": 22.5,
            "imagem_url": "",
            "categoria_id": null,
            "disponivel": true,
            "destaque": false,
            "created_at": "2025-03-01T12:00:00+00:00"
        }))
        .unwrap();
        let product = Product::from(row);
        assert_eq!(product.price, Price::from_cents(2250));
        assert_eq!(product.image_url, None);
    }

    #[test]
    fn test_order_item_row_with_embedded_product() {
        let row: OrderItemRow = serde_json::from_value(serde_json::json!({
            "id": "3a7c1b0e-1111-4d4b-9a57-2a1f4d8c0b11",
            "pedido_id": "4a7c1b0e-1111-4d4b-9a57-2a1f4d8c0b11",
            "produto_id": "5a7c1b0e-1111-4d4b-9a57-2a1f4d8c0b11",
            "quantidade": 2,
            "preco_unitario": "10.00",
            "observacao": "",
            "produtos": { "nome": "Coxinha" }
        }))
        .unwrap();
        let item = OrderItem::from(row);
        assert_eq!(item.product_name.as_deref(), Some("Coxinha"));
        assert_eq!(item.note, None);
        assert_eq!(item.line_total(), Price::from_cents(2000));
    }

    #[test]
    fn test_settings_row_defaults_colors() {
        let row = SettingsRow {
            id: SETTINGS_ROW_ID.to_string(),
            nome_app: Some("Food Truck".into()),
            logo_url: None,
            cor_primaria: Some(String::new()),
            cor_secundaria: None,
        };
        let settings = AppSettings::from(row);
        assert_eq!(settings.primary_color, DEFAULT_PRIMARY_COLOR);
        assert_eq!(settings.secondary_color, DEFAULT_SECONDARY_COLOR);
    }

    #[test]
    fn test_address_update_omits_owner() {
        let address = NewAddress {
            street: "Rua A".into(),
            number: "1".into(),
            complement: None,
            district: "Centro".into(),
            city: "Recife".into(),
            state: "PE".into(),
            postal_code: "50000-000".into(),
        };
        let json = serde_json::to_value(AddressWrite::update(&address)).unwrap();
        assert!(json.get("user_id").is_none());
        assert!(json.get("padrao").is_none());

        let json = serde_json::to_value(AddressWrite::insert(UserId::random(), &address, true))
            .unwrap();
        assert_eq!(json["padrao"], true);
    }
}
