use uuid::Uuid;

use super::cart::{CartView, CheckoutValidation};
use super::catalog::{ProductView, StockAdjustment, StockAvailability};
use super::errors::DomainError;
use super::order::{
    OrderPage, OrderStatus, OrderView, PaymentMethod, PaymentStatus, ShippingAddress,
};
use super::pricing::PricingConfig;

/// Read/adjust access to the product catalog. The core never creates or
/// deletes products or categories; stock is the only field it writes, and
/// every write goes through `adjust_stock`'s floor-at-zero check.
pub trait CatalogRepository: Send + Sync + 'static {
    /// `include_inactive` makes the soft-delete filter explicit at every
    /// call site instead of an implicit default.
    fn find_product(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<ProductView>, DomainError>;

    fn adjust_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
        mode: StockAdjustment,
    ) -> Result<ProductView, DomainError>;

    fn check_availability(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<StockAvailability, DomainError>;
}

/// One cart per customer; every mutating operation runs as a single
/// transaction and takes the product row lock before any check-then-write.
pub trait CartRepository: Send + Sync + 'static {
    fn get_or_create(&self, customer_id: Uuid) -> Result<CartView, DomainError>;

    fn add_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError>;

    fn set_item_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError>;

    fn remove_item(&self, customer_id: Uuid, product_id: Uuid) -> Result<CartView, DomainError>;

    fn clear(&self, customer_id: Uuid) -> Result<Option<CartView>, DomainError>;

    fn validate_for_checkout(&self, customer_id: Uuid) -> Result<CheckoutValidation, DomainError>;
}

pub trait OrderRepository: Send + Sync + 'static {
    /// The whole checkout (stock re-check, order and snapshot inserts,
    /// stock decrement, cart clearing) commits or rolls back as one
    /// transaction. No partial orders.
    fn create_from_cart(
        &self,
        customer_id: Uuid,
        address: ShippingAddress,
        payment_method: Option<PaymentMethod>,
        customer_notes: Option<String>,
        pricing: &PricingConfig,
    ) -> Result<OrderView, DomainError>;

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError>;

    fn find_by_order_number(&self, order_number: &str) -> Result<Option<OrderView>, DomainError>;

    fn list_for_customer(
        &self,
        customer_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError>;

    fn list_all(
        &self,
        page: i64,
        limit: i64,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, DomainError>;

    /// Applies the legal-transition table; entering `cancelled`/`refunded`
    /// from a live state restores stock in the same transaction, exactly
    /// once.
    fn update_status(&self, id: Uuid, next: OrderStatus) -> Result<OrderView, DomainError>;

    fn update_payment_status(&self, id: Uuid, next: PaymentStatus)
        -> Result<OrderView, DomainError>;

    /// Refund: order status and payment status move to `refunded` together,
    /// as one operation.
    fn process_refund(&self, id: Uuid, reason: &str) -> Result<OrderView, DomainError>;

    fn append_staff_note(&self, id: Uuid, note: &str) -> Result<OrderView, DomainError>;

    fn delete(&self, id: Uuid) -> Result<(), DomainError>;
}
