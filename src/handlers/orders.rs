use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::access::Operation;
use crate::domain::order::{OrderPage, OrderStatus, OrderView, PaymentStatus, ShippingAddress};
use crate::errors::AppError;
use crate::AppState;

use super::auth::AuthContext;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ShippingAddressRequest {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

impl From<ShippingAddressRequest> for ShippingAddress {
    fn from(address: ShippingAddressRequest) -> Self {
        Self {
            line1: address.line1,
            line2: address.line2,
            city: address.city,
            state: address.state,
            postal_code: address.postal_code,
            country: address.country,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub shipping_address: ShippingAddressRequest,
    /// One of: credit_card, debit_card, paypal, cash, bank_transfer
    pub payment_method: Option<String>,
    pub customer_notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ShippingAddressResponse {
    pub line1: String,
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub country: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_sku: String,
    /// Decimal amount as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
    pub quantity: i32,
    pub total_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: Option<String>,
    pub subtotal: String,
    pub tax: String,
    pub shipping_cost: String,
    pub total: String,
    pub total_items: i32,
    pub shipping_address: ShippingAddressResponse,
    pub customer_notes: Option<String>,
    pub staff_notes: Option<String>,
    pub confirmed_at: Option<String>,
    pub shipped_at: Option<String>,
    pub delivered_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub items: Vec<OrderItemResponse>,
}

impl From<OrderView> for OrderResponse {
    fn from(order: OrderView) -> Self {
        let total_items = order.total_items();
        Self {
            id: order.id,
            order_number: order.order_number,
            customer_id: order.customer_id,
            status: order.status,
            payment_status: order.payment_status,
            payment_method: order.payment_method.map(|m| m.as_str().to_string()),
            subtotal: order.subtotal.to_string(),
            tax: order.tax.to_string(),
            shipping_cost: order.shipping_cost.to_string(),
            total: order.total.to_string(),
            total_items,
            shipping_address: ShippingAddressResponse {
                line1: order.shipping_address.line1,
                line2: order.shipping_address.line2,
                city: order.shipping_address.city,
                state: order.shipping_address.state,
                postal_code: order.shipping_address.postal_code,
                country: order.shipping_address.country,
            },
            customer_notes: order.customer_notes,
            staff_notes: order.staff_notes,
            confirmed_at: order.confirmed_at.map(|t| t.to_rfc3339()),
            shipped_at: order.shipped_at.map(|t| t.to_rfc3339()),
            delivered_at: order.delivered_at.map(|t| t.to_rfc3339()),
            created_at: order.created_at.to_rfc3339(),
            updated_at: order.updated_at.to_rfc3339(),
            items: order
                .items
                .into_iter()
                .map(|item| OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    product_sku: item.product_sku,
                    unit_price: item.unit_price.to_string(),
                    quantity: item.quantity,
                    total_price: item.line_total.to_string(),
                })
                .collect(),
        }
    }
}

// ── Pagination ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct ListOrdersParams {
    /// Page number (1-based). Defaults to 1.
    #[serde(default = "default_page")]
    pub page: i64,
    /// Number of items per page. Defaults to 20, maximum 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Optional status filter (admin listing only).
    pub status: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ListOrdersResponse {
    pub items: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

fn page_response(page: OrderPage, page_number: i64, limit: i64) -> ListOrdersResponse {
    ListOrdersResponse {
        items: page.items.into_iter().map(OrderResponse::from).collect(),
        total: page.total,
        page: page_number,
        limit,
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchOrdersParams {
    /// Full order number, e.g. "ORD-1A2B3C4D".
    pub number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RefundRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddNotesRequest {
    pub notes: String,
}

// ── Customer handlers ────────────────────────────────────────────────────────

/// POST /orders
///
/// Checkout: converts the caller's cart into an order. Stock is re-checked
/// under row locks; the order, item snapshots, stock decrement, and cart
/// clearing commit or roll back as one transaction.
#[utoipa::path(
    post,
    path = "/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 400, description = "Empty cart, bad address, or insufficient stock"),
    ),
    tag = "orders"
)]
pub async fn create_order(
    state: web::Data<AppState>,
    ctx: AuthContext,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::PlaceOrder)?;
    let customer_id = ctx.user_id;
    let body = body.into_inner();

    let order = web::block(move || {
        state.orders.create_order_from_cart(
            customer_id,
            body.shipping_address.into(),
            body.payment_method,
            body.customer_notes,
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(OrderResponse::from(order)))
}

/// GET /orders
///
/// The caller's own order history, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
    ),
    responses(
        (status = 200, description = "Paginated list of the caller's orders", body = ListOrdersResponse),
    ),
    tag = "orders"
)]
pub async fn list_own_orders(
    state: web::Data<AppState>,
    ctx: AuthContext,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ViewOwnOrders)?;
    let customer_id = ctx.user_id;
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result = web::block(move || state.orders.list_customer_orders(customer_id, page, limit))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(page_response(result, page, limit)))
}

/// GET /orders/{id}
///
/// Customers may only read their own orders; staff may read any.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to another customer"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let order = if ctx.role.is_staff() {
        ctx.require(Operation::ViewAnyOrder)?;
        web::block(move || state.orders.get_order(order_id))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??
    } else {
        ctx.require(Operation::ViewOwnOrders)?;
        let customer_id = ctx.user_id;
        web::block(move || state.orders.get_order_for_customer(order_id, customer_id))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??
    };

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/cancel
///
/// Customer-initiated cancellation. Delivered, cancelled, and refunded
/// orders are terminal here; restored stock goes back to the catalog.
#[utoipa::path(
    post,
    path = "/orders/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order cancelled", body = OrderResponse),
        (status = 400, description = "Order is in a terminal state"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn cancel_order(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::CancelOwnOrder)?;
    let customer_id = ctx.user_id;
    let order_id = path.into_inner();

    let order = web::block(move || state.orders.cancel_own_order(customer_id, order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Order cancelled successfully",
        "order": OrderResponse::from(order)
    })))
}

// ── Staff handlers ───────────────────────────────────────────────────────────

/// GET /orders/all
///
/// Every order in the store, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/orders/all",
    params(
        ("page" = Option<i64>, Query, description = "Page number (1-based, default 1)"),
        ("limit" = Option<i64>, Query, description = "Items per page (default 20, max 100)"),
        ("status" = Option<String>, Query, description = "Optional status filter"),
    ),
    responses(
        (status = 200, description = "Paginated list of orders", body = ListOrdersResponse),
        (status = 403, description = "Caller is not a manager or admin"),
    ),
    tag = "orders"
)]
pub async fn list_all_orders(
    state: web::Data<AppState>,
    ctx: AuthContext,
    query: web::Query<ListOrdersParams>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ListAllOrders)?;
    let params = query.into_inner();
    let page = params.page.max(1);
    let limit = params.limit.clamp(1, 100);

    let result =
        web::block(move || state.orders.list_all_orders(page, limit, params.status.as_deref()))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(page_response(result, page, limit)))
}

/// GET /orders/search?number=ORD-…
///
/// Quick lookup by order number for the counter.
#[utoipa::path(
    get,
    path = "/orders/search",
    params(
        ("number" = String, Query, description = "Order number"),
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn search_orders(
    state: web::Data<AppState>,
    ctx: AuthContext,
    query: web::Query<SearchOrdersParams>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::SearchOrders)?;
    let number = query.into_inner().number;

    let order = web::block(move || state.orders.find_by_order_number(&number))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{id}/status
///
/// Staff status driving. Which target values are allowed depends on the
/// caller's role; the transition table decides which moves are legal.
#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown status or illegal transition"),
        (status = 403, description = "Role may not set this status"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::UpdateOrderStatus)?;
    let order_id = path.into_inner();
    let status = body.into_inner().status;
    let role = ctx.role;

    let order = web::block(move || state.orders.update_order_status(order_id, &status, role))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PUT /orders/{id}/payment-status
#[utoipa::path(
    put,
    path = "/orders/{id}/payment-status",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = UpdatePaymentStatusRequest,
    responses(
        (status = 200, description = "Payment status updated", body = OrderResponse),
        (status = 400, description = "Unknown payment status"),
        (status = 403, description = "Refund bookkeeping is admin-only"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_payment_status(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePaymentStatusRequest>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::UpdatePaymentStatus)?;
    let order_id = path.into_inner();
    let payment_status = body.into_inner().payment_status;
    let role = ctx.role;

    let order =
        web::block(move || state.orders.update_payment_status(order_id, &payment_status, role))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// POST /orders/{id}/notes
#[utoipa::path(
    post,
    path = "/orders/{id}/notes",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = AddNotesRequest,
    responses(
        (status = 200, description = "Note appended", body = OrderResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn add_order_notes(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
    body: web::Json<AddNotesRequest>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::AnnotateOrders)?;
    let order_id = path.into_inner();
    let notes = body.into_inner().notes;

    let order = web::block(move || state.orders.add_staff_note(order_id, &notes))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

// ── Admin handlers ───────────────────────────────────────────────────────────

/// POST /orders/{id}/refund
///
/// Moves order status and payment status to `refunded` together and
/// restores stock if the cancellation path hasn't already.
#[utoipa::path(
    post,
    path = "/orders/{id}/refund",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    request_body = RefundRequest,
    responses(
        (status = 200, description = "Refund processed", body = OrderResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn process_refund(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
    body: Option<web::Json<RefundRequest>>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::ProcessRefund)?;
    let order_id = path.into_inner();
    let reason = body.and_then(|b| b.into_inner().reason);

    let order = web::block(move || state.orders.process_refund(order_id, reason))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Refund processed successfully",
        "order": OrderResponse::from(order)
    })))
}

/// DELETE /orders/{id}
///
/// Hard delete. Cannot be undone.
#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order permanently deleted"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn delete_order(
    state: web::Data<AppState>,
    ctx: AuthContext,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    ctx.require(Operation::DeleteOrder)?;
    let order_id = path.into_inner();

    web::block(move || state.orders.delete_order(order_id))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Order permanently deleted"
    })))
}
