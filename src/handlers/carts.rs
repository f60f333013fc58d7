use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::access::Operation;
use crate::domain::cart::{CartView, CheckoutValidation};
use crate::errors::AppError;
use crate::AppState;

use super::auth::AuthContext;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    /// Defaults to 1 when omitted.
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    /// Decimal amount as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
    pub quantity: i32,
    pub total_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub items: Vec<CartItemResponse>,
    pub subtotal: String,
    pub total_items: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        let total_items = cart.total_items();
        Self {
            id: cart.id,
            customer_id: cart.customer_id,
            subtotal: cart.subtotal.to_string(),
            total_items,
            created_at: cart.created_at.to_rfc3339(),
            updated_at: cart.updated_at.to_rfc3339(),
            items: cart
                .lines
                .into_iter()
                .map(|line| CartItemResponse {
                    product_id: line.product_id,
                    product_name: line.product_name,
                    product_sku: line.product_sku,
                    unit_price: line.unit_price.to_string(),
                    quantity: line.quantity,
                    total_price: line.line_total.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartValidationResponse {
    pub is_valid: bool,
    pub message: String,
}

impl From<CheckoutValidation> for CartValidationResponse {
    fn from(validation: CheckoutValidation) -> Self {
        Self {
            is_valid: validation.is_valid,
            message: validation.message,
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /cart
///
/// Returns the caller's cart, lazily creating an empty one on first use.
#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "The customer's cart", body = CartResponse),
        (status = 401, description = "Missing or invalid identity headers"),
    ),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    ctx: AuthContext,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ManageOwnCart)?;
    let customer_id = ctx.user_id;

    let cart = web::block(move || state.carts.get_or_create_cart(customer_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/items
#[utoipa::path(
    post,
    path = "/cart/items",
    request_body = AddCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Bad quantity, inactive product, or insufficient stock"),
        (status = 404, description = "Product not found"),
    ),
    tag = "cart"
)]
pub async fn add_item(
    state: web::Data<AppState>,
    ctx: AuthContext,
    body: web::Json<AddCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ManageOwnCart)?;
    let customer_id = ctx.user_id;
    let body = body.into_inner();

    let cart =
        web::block(move || state.carts.add_item(customer_id, body.product_id, body.quantity))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /cart/items/{product_id}
#[utoipa::path(
    put,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Bad quantity or insufficient stock"),
        (status = 404, description = "Cart or cart item not found"),
    ),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ManageOwnCart)?;
    let customer_id = ctx.user_id;
    let product_id = path.into_inner();
    let quantity = body.into_inner().quantity;

    let cart =
        web::block(move || state.carts.update_item_quantity(customer_id, product_id, quantity))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// DELETE /cart/items/{product_id}
#[utoipa::path(
    delete,
    path = "/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product UUID"),
    ),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Cart or cart item not found"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ManageOwnCart)?;
    let customer_id = ctx.user_id;
    let product_id = path.into_inner();

    let cart = web::block(move || state.carts.remove_item(customer_id, product_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// POST /cart/clear
///
/// Empties the cart; a no-op when the customer has no cart yet.
#[utoipa::path(
    post,
    path = "/cart/clear",
    responses(
        (status = 200, description = "Emptied cart, or null when none exists"),
    ),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    ctx: AuthContext,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ManageOwnCart)?;
    let customer_id = ctx.user_id;

    let cart = web::block(move || state.carts.clear_cart(customer_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(cart.map(CartResponse::from)))
}

/// GET /cart/validate
///
/// Non-mutating pre-flight check; stock may have drifted since items were
/// added, so checkout re-validates rather than trusting the cart.
#[utoipa::path(
    get,
    path = "/cart/validate",
    responses(
        (status = 200, description = "Validation verdict", body = CartValidationResponse),
    ),
    tag = "cart"
)]
pub async fn validate_cart(
    state: web::Data<AppState>,
    ctx: AuthContext,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ManageOwnCart)?;
    let customer_id = ctx.user_id;

    let validation = web::block(move || state.carts.validate_for_checkout(customer_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(CartValidationResponse::from(validation)))
}
