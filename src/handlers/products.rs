use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::access::Operation;
use crate::domain::catalog::{ProductView, StockAdjustment};
use crate::errors::AppError;
use crate::AppState;

use super::auth::AuthContext;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    /// Decimal amount as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub compare_price: Option<String>,
    pub sku: String,
    pub barcode: Option<String>,
    pub stock_quantity: i32,
    pub is_in_stock: bool,
    pub category_id: Uuid,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductView> for ProductResponse {
    fn from(product: ProductView) -> Self {
        let is_in_stock = product.is_in_stock();
        Self {
            id: product.id,
            name: product.name,
            price: product.price.to_string(),
            compare_price: product.compare_price.map(|p| p.to_string()),
            sku: product.sku,
            barcode: product.barcode,
            stock_quantity: product.stock_quantity,
            is_in_stock,
            category_id: product.category_id,
            is_active: product.is_active,
            created_at: product.created_at.to_rfc3339(),
            updated_at: product.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdjustStockRequest {
    pub quantity: i32,
    /// One of: add, subtract, set
    pub operation: StockAdjustment,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AvailabilityParams {
    /// Quantity to check for. Defaults to 1.
    #[serde(default = "default_check_quantity")]
    pub quantity: i32,
}

fn default_check_quantity() -> i32 {
    1
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub product_id: Uuid,
    pub requested: i32,
    pub available: bool,
    pub stock_quantity: i32,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /products/{id}
///
/// Public storefront read; soft-deleted products are not visible here.
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found or inactive"),
    ),
    tag = "products"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();

    let product = web::block(move || state.catalog.get_product(product_id, false))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

/// GET /products/{id}/availability?quantity=N
#[utoipa::path(
    get,
    path = "/products/{id}/availability",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
        ("quantity" = Option<i32>, Query, description = "Quantity to check for (default 1)"),
    ),
    responses(
        (status = 200, description = "Availability verdict", body = AvailabilityResponse),
        (status = 404, description = "Product not found or inactive"),
    ),
    tag = "products"
)]
pub async fn check_availability(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<AvailabilityParams>,
) -> Result<HttpResponse, AppError> {
    let product_id = path.into_inner();
    let quantity = query.into_inner().quantity;

    let availability = web::block(move || state.catalog.check_availability(product_id, quantity))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(AvailabilityResponse {
        product_id,
        requested: quantity,
        available: availability.available,
        stock_quantity: availability.stock_quantity,
    }))
}

/// PUT /products/{id}/stock
///
/// Staff stock correction through the same floor-at-zero primitive the
/// checkout pipeline uses.
#[utoipa::path(
    put,
    path = "/products/{id}/stock",
    params(
        ("id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock updated", body = ProductResponse),
        (status = 400, description = "Negative quantity or subtract below zero"),
        (status = 403, description = "Caller is not a manager or admin"),
        (status = 404, description = "Product not found"),
    ),
    tag = "products"
)]
pub async fn adjust_stock(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<AdjustStockRequest>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::AdjustStock)?;
    let product_id = path.into_inner();
    let body = body.into_inner();

    let product =
        web::block(move || state.catalog.adjust_stock(product_id, body.quantity, body.operation))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}
