use bigdecimal::BigDecimal;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::StockAdjustment;
use crate::domain::errors::DomainError;
use crate::domain::order::{
    generate_order_number, OrderItemView, OrderPage, OrderStatus, OrderView, PaymentMethod,
    PaymentStatus, ShippingAddress,
};
use crate::domain::ports::OrderRepository;
use crate::domain::pricing::PricingConfig;
use crate::schema::{cart_items, carts, order_items, orders};

use super::catalog_repo::{apply_stock_adjustment, lock_product};
use super::models::{CartItemRow, CartRow, NewOrderItemRow, NewOrderRow, OrderItemRow, OrderRow};

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_status(value: &str) -> Result<OrderStatus, DomainError> {
    OrderStatus::parse(value)
        .ok_or_else(|| DomainError::Internal(format!("unknown order status '{value}' in store")))
}

fn parse_payment_status(value: &str) -> Result<PaymentStatus, DomainError> {
    PaymentStatus::parse(value)
        .ok_or_else(|| DomainError::Internal(format!("unknown payment status '{value}' in store")))
}

fn order_view(order: OrderRow, items: Vec<OrderItemRow>) -> Result<OrderView, DomainError> {
    let status = parse_status(&order.status)?;
    let payment_status = parse_payment_status(&order.payment_status)?;
    let payment_method = match order.payment_method.as_deref() {
        None => None,
        Some(value) => Some(PaymentMethod::parse(value).ok_or_else(|| {
            DomainError::Internal(format!("unknown payment method '{value}' in store"))
        })?),
    };

    Ok(OrderView {
        id: order.id,
        order_number: order.order_number,
        customer_id: order.customer_id,
        status,
        payment_status,
        payment_method,
        subtotal: order.subtotal,
        tax: order.tax,
        shipping_cost: order.shipping_cost,
        total: order.total,
        shipping_address: ShippingAddress {
            line1: order.shipping_address_line1,
            line2: order.shipping_address_line2,
            city: order.shipping_city,
            state: order.shipping_state,
            postal_code: order.shipping_postal_code,
            country: order.shipping_country,
        },
        customer_notes: order.customer_notes,
        staff_notes: order.staff_notes,
        confirmed_at: order.confirmed_at,
        shipped_at: order.shipped_at,
        delivered_at: order.delivered_at,
        created_at: order.created_at,
        updated_at: order.updated_at,
        items: items
            .into_iter()
            .map(|item| {
                let line_total = &item.unit_price * BigDecimal::from(item.quantity);
                OrderItemView {
                    id: item.id,
                    product_id: item.product_id,
                    product_name: item.product_name,
                    product_sku: item.product_sku,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    line_total,
                }
            })
            .collect(),
    })
}

fn load_order_view(conn: &mut PgConnection, order_id: Uuid) -> Result<OrderView, DomainError> {
    let order: OrderRow = orders::table
        .find(order_id)
        .select(OrderRow::as_select())
        .first(conn)?;
    let items = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::created_at.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?;
    order_view(order, items)
}

fn lock_order(conn: &mut PgConnection, order_id: Uuid) -> Result<OrderRow, DomainError> {
    orders::table
        .find(order_id)
        .for_update()
        .select(OrderRow::as_select())
        .first(conn)
        .optional()?
        .ok_or(DomainError::NotFound("Order"))
}

/// Return every line's quantity to its product. Caller is responsible for
/// only invoking this on the first transition into cancelled/refunded.
fn restore_order_stock(conn: &mut PgConnection, order_id: Uuid) -> Result<(), DomainError> {
    let items: Vec<OrderItemRow> = order_items::table
        .filter(order_items::order_id.eq(order_id))
        .order(order_items::product_id.asc())
        .select(OrderItemRow::as_select())
        .load(conn)?;

    for item in items {
        let product =
            lock_product(conn, item.product_id)?.ok_or(DomainError::NotFound("Product"))?;
        apply_stock_adjustment(conn, &product, item.quantity, StockAdjustment::Add)?;
    }
    Ok(())
}

fn append_note(existing: Option<String>, note: &str) -> String {
    let stamped = format!("[{}] {}", Utc::now().to_rfc3339(), note);
    match existing {
        Some(notes) if !notes.is_empty() => format!("{notes}\n{stamped}"),
        _ => stamped,
    }
}

impl OrderRepository for DieselOrderRepository {
    fn create_from_cart(
        &self,
        customer_id: Uuid,
        address: ShippingAddress,
        payment_method: Option<PaymentMethod>,
        customer_notes: Option<String>,
        pricing: &PricingConfig,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart: Option<CartRow> = carts::table
                .filter(carts::customer_id.eq(customer_id))
                .select(CartRow::as_select())
                .first(conn)
                .optional()?;
            let Some(cart) = cart else {
                return Err(DomainError::Validation("Cart is empty".to_string()));
            };

            // Lock products in ascending id order so two checkouts sharing
            // products cannot deadlock on each other.
            let items: Vec<CartItemRow> = cart_items::table
                .filter(cart_items::cart_id.eq(cart.id))
                .order(cart_items::product_id.asc())
                .select(CartItemRow::as_select())
                .load(conn)?;
            if items.is_empty() {
                return Err(DomainError::Validation("Cart is empty".to_string()));
            }

            let mut locked = Vec::with_capacity(items.len());
            for item in items {
                let product = lock_product(conn, item.product_id)?
                    .ok_or(DomainError::NotFound("Product"))?;
                if !product.is_active {
                    return Err(DomainError::Validation(format!(
                        "Product '{}' is no longer available",
                        product.name
                    )));
                }
                if product.stock_quantity < item.quantity {
                    return Err(DomainError::InsufficientStock {
                        product: product.name.clone(),
                        available: product.stock_quantity,
                        requested: item.quantity,
                    });
                }
                locked.push((item, product));
            }

            let subtotal = locked
                .iter()
                .fold(BigDecimal::from(0), |acc, (item, product)| {
                    acc + &product.price * BigDecimal::from(item.quantity)
                });
            let totals = pricing.quote(subtotal);

            let order_id = Uuid::new_v4();
            diesel::insert_into(orders::table)
                .values(&NewOrderRow {
                    id: order_id,
                    order_number: generate_order_number(),
                    customer_id,
                    status: OrderStatus::Pending.as_str().to_string(),
                    payment_status: PaymentStatus::Pending.as_str().to_string(),
                    payment_method: payment_method.map(|m| m.as_str().to_string()),
                    subtotal: totals.subtotal,
                    tax: totals.tax,
                    shipping_cost: totals.shipping_cost,
                    total: totals.total,
                    shipping_address_line1: address.line1,
                    shipping_address_line2: address.line2,
                    shipping_city: address.city,
                    shipping_state: address.state,
                    shipping_postal_code: address.postal_code,
                    shipping_country: address.country,
                    customer_notes,
                })
                .execute(conn)?;

            let snapshots: Vec<NewOrderItemRow> = locked
                .iter()
                .map(|(item, product)| NewOrderItemRow {
                    id: Uuid::new_v4(),
                    order_id,
                    product_id: product.id,
                    product_name: product.name.clone(),
                    product_sku: product.sku.clone(),
                    unit_price: product.price.clone(),
                    quantity: item.quantity,
                })
                .collect();
            diesel::insert_into(order_items::table)
                .values(&snapshots)
                .execute(conn)?;

            for (item, product) in &locked {
                apply_stock_adjustment(conn, product, item.quantity, StockAdjustment::Subtract)?;
            }

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;
            diesel::update(carts::table.find(cart.id))
                .set(carts::updated_at.eq(diesel::dsl::now))
                .execute(conn)?;

            load_order_view(conn, order_id)
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order: Option<OrderRow> = orders::table
            .find(id)
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        let Some(order) = order else {
            return Ok(None);
        };

        let items = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .order(order_items::created_at.asc())
            .select(OrderItemRow::as_select())
            .load(&mut conn)?;

        Ok(Some(order_view(order, items)?))
    }

    fn find_by_order_number(&self, order_number: &str) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let order: Option<OrderRow> = orders::table
            .filter(orders::order_number.eq(order_number))
            .select(OrderRow::as_select())
            .first(&mut conn)
            .optional()?;
        let Some(order) = order else {
            return Ok(None);
        };

        let items = order_items::table
            .filter(order_items::order_id.eq(order.id))
            .order(order_items::created_at.asc())
            .select(OrderItemRow::as_select())
            .load(&mut conn)?;

        Ok(Some(order_view(order, items)?))
    }

    fn list_for_customer(
        &self,
        customer_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = orders::table
                .filter(orders::customer_id.eq(customer_id))
                .count()
                .get_result(conn)?;

            let rows: Vec<OrderRow> = orders::table
                .filter(orders::customer_id.eq(customer_id))
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset)
                .select(OrderRow::as_select())
                .load(conn)?;

            // Listings skip the line items, like the detail-free index the
            // storefront renders.
            let items = rows
                .into_iter()
                .map(|row| order_view(row, vec![]))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(OrderPage { items, total })
        })
    }

    fn list_all(
        &self,
        page: i64,
        limit: i64,
        status: Option<OrderStatus>,
    ) -> Result<OrderPage, DomainError> {
        let mut conn = self.pool.get()?;

        let offset = (page - 1) * limit;
        conn.transaction::<_, DomainError, _>(|conn| {
            let total: i64 = match status {
                Some(status) => orders::table
                    .filter(orders::status.eq(status.as_str()))
                    .count()
                    .get_result(conn)?,
                None => orders::table.count().get_result(conn)?,
            };

            let mut query = orders::table
                .select(OrderRow::as_select())
                .into_boxed()
                .order(orders::created_at.desc())
                .limit(limit)
                .offset(offset);
            if let Some(status) = status {
                query = query.filter(orders::status.eq(status.as_str()));
            }
            let rows: Vec<OrderRow> = query.load(conn)?;

            let items = rows
                .into_iter()
                .map(|row| order_view(row, vec![]))
                .collect::<Result<Vec<_>, _>>()?;

            Ok(OrderPage { items, total })
        })
    }

    fn update_status(&self, id: Uuid, next: OrderStatus) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, id)?;
            let current = parse_status(&order.status)?;

            if current == next {
                // Re-asserting the current status is a no-op; in particular
                // it must not restore stock a second time.
                return load_order_view(conn, id);
            }
            if !current.can_transition_to(next) {
                return Err(DomainError::Validation(format!(
                    "Cannot transition order from {current} to {next}"
                )));
            }

            if next.stock_released() && !current.stock_released() {
                restore_order_stock(conn, order.id)?;
            }

            // Status milestones are stamped exactly once, on first entry.
            match next {
                OrderStatus::Confirmed if order.confirmed_at.is_none() => {
                    diesel::update(orders::table.find(id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::confirmed_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)?;
                }
                OrderStatus::Shipped if order.shipped_at.is_none() => {
                    diesel::update(orders::table.find(id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::shipped_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)?;
                }
                OrderStatus::Delivered if order.delivered_at.is_none() => {
                    diesel::update(orders::table.find(id))
                        .set((
                            orders::status.eq(next.as_str()),
                            orders::delivered_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)?;
                }
                _ => {
                    diesel::update(orders::table.find(id))
                        .set(orders::status.eq(next.as_str()))
                        .execute(conn)?;
                }
            }

            log::info!("Order {} status: {} -> {}", order.order_number, current, next);
            load_order_view(conn, id)
        })
    }

    fn update_payment_status(
        &self,
        id: Uuid,
        next: PaymentStatus,
    ) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, id)?;

            diesel::update(orders::table.find(order.id))
                .set(orders::payment_status.eq(next.as_str()))
                .execute(conn)?;

            load_order_view(conn, order.id)
        })
    }

    fn process_refund(&self, id: Uuid, reason: &str) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, id)?;
            let current = parse_status(&order.status)?;

            if current != OrderStatus::Refunded {
                if !current.can_transition_to(OrderStatus::Refunded) {
                    return Err(DomainError::Validation(format!(
                        "Cannot refund order with status: {current}"
                    )));
                }
                if !current.stock_released() {
                    restore_order_stock(conn, order.id)?;
                }
            }

            let notes = append_note(
                order.staff_notes.clone(),
                &format!("REFUND PROCESSED: {reason}"),
            );
            diesel::update(orders::table.find(order.id))
                .set((
                    orders::status.eq(OrderStatus::Refunded.as_str()),
                    orders::payment_status.eq(PaymentStatus::Refunded.as_str()),
                    orders::staff_notes.eq(notes),
                ))
                .execute(conn)?;

            log::info!("Order {} refunded", order.order_number);
            load_order_view(conn, order.id)
        })
    }

    fn append_staff_note(&self, id: Uuid, note: &str) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let order = lock_order(conn, id)?;

            let notes = append_note(order.staff_notes.clone(), note);
            diesel::update(orders::table.find(order.id))
                .set(orders::staff_notes.eq(notes))
                .execute(conn)?;

            load_order_view(conn, order.id)
        })
    }

    fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let deleted = diesel::delete(orders::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(DomainError::NotFound("Order"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use diesel::prelude::*;
    use uuid::Uuid;

    use super::DieselOrderRepository;
    use crate::db::DbPool;
    use crate::domain::errors::DomainError;
    use crate::domain::order::{OrderStatus, PaymentStatus, ShippingAddress};
    use crate::domain::ports::{CartRepository, OrderRepository};
    use crate::domain::pricing::PricingConfig;
    use crate::infrastructure::cart_repo::DieselCartRepository;
    use crate::infrastructure::test_support::{
        drain_stock, product_stock, rename_and_reprice_product, seed_product, setup_db,
    };
    use crate::schema::cart_items;

    fn address() -> ShippingAddress {
        ShippingAddress {
            line1: "1 Main St".to_string(),
            line2: None,
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
            country: "US".to_string(),
        }
    }

    fn cart_line_count(pool: &DbPool, customer_id: Uuid) -> i64 {
        use crate::schema::carts;
        let mut conn = pool.get().expect("Failed to get connection");
        let cart_id: Uuid = carts::table
            .filter(carts::customer_id.eq(customer_id))
            .select(carts::id)
            .first(&mut conn)
            .expect("cart should exist");
        cart_items::table
            .filter(cart_items::cart_id.eq(cart_id))
            .count()
            .get_result(&mut conn)
            .expect("count failed")
    }

    fn order_count(pool: &DbPool) -> i64 {
        use crate::schema::orders;
        let mut conn = pool.get().expect("Failed to get connection");
        orders::table
            .count()
            .get_result(&mut conn)
            .expect("count failed")
    }

    #[tokio::test]
    async fn checkout_creates_order_decrements_stock_and_clears_cart() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_a = seed_product(&pool, "Alpha", "20.00", 5);
        let product_b = seed_product(&pool, "Beta", "7.50", 10);

        carts.add_item(customer_id, product_a, 2).expect("add failed");
        carts.add_item(customer_id, product_b, 1).expect("add failed");

        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");

        assert_eq!(order.subtotal.to_string(), "47.50");
        assert_eq!(order.tax.to_string(), "4.75");
        assert_eq!(order.shipping_cost.to_string(), "10.00");
        assert_eq!(order.total.to_string(), "62.25");
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_status, PaymentStatus::Pending);
        assert_eq!(order.items.len(), 2);
        assert!(order.order_number.starts_with("ORD-"));
        assert_eq!(order.shipping_address.city, "Springfield");

        assert_eq!(product_stock(&pool, product_a), 3);
        assert_eq!(product_stock(&pool, product_b), 9);
        assert_eq!(cart_line_count(&pool, customer_id), 0);
    }

    #[tokio::test]
    async fn checkout_of_missing_or_empty_cart_fails() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();

        let err = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect_err("no cart");
        assert!(matches!(err, DomainError::Validation(_)));

        carts.get_or_create(customer_id).expect("create failed");
        let err = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect_err("empty cart");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn failed_checkout_rolls_back_everything() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_a = seed_product(&pool, "Alpha", "20.00", 5);
        let product_b = seed_product(&pool, "Beta", "7.50", 10);

        carts.add_item(customer_id, product_a, 2).expect("add failed");
        carts.add_item(customer_id, product_b, 4).expect("add failed");

        // Stock drifts under the cart between add and checkout.
        drain_stock(&pool, product_b, 1);

        let err = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect_err("checkout must fail");
        assert!(matches!(err, DomainError::InsufficientStock { .. }));

        // No order, no stock movement, cart untouched.
        assert_eq!(order_count(&pool), 0);
        assert_eq!(product_stock(&pool, product_a), 5);
        assert_eq!(product_stock(&pool, product_b), 1);
        assert_eq!(cart_line_count(&pool, customer_id), 2);
    }

    #[tokio::test]
    async fn order_items_are_snapshots_of_the_product_at_checkout() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 5);

        carts.add_item(customer_id, product_id, 1).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");

        rename_and_reprice_product(&pool, product_id, "Renamed", "99.00");

        let reloaded = repo
            .find_by_id(order.id)
            .expect("find failed")
            .expect("order exists");
        assert_eq!(reloaded.items[0].product_name, "Alpha");
        assert_eq!(reloaded.items[0].unit_price.to_string(), "20.00");
    }

    #[tokio::test]
    async fn cancel_restores_stock_exactly_once() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_a = seed_product(&pool, "Alpha", "20.00", 5);
        let product_b = seed_product(&pool, "Beta", "7.50", 10);

        carts.add_item(customer_id, product_a, 2).expect("add failed");
        carts.add_item(customer_id, product_b, 3).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");
        assert_eq!(product_stock(&pool, product_a), 3);
        assert_eq!(product_stock(&pool, product_b), 7);

        repo.update_status(order.id, OrderStatus::Cancelled)
            .expect("cancel failed");
        assert_eq!(product_stock(&pool, product_a), 5);
        assert_eq!(product_stock(&pool, product_b), 10);

        // Cancelling again is a no-op on stock.
        repo.update_status(order.id, OrderStatus::Cancelled)
            .expect("repeat cancel failed");
        assert_eq!(product_stock(&pool, product_a), 5);
        assert_eq!(product_stock(&pool, product_b), 10);
    }

    #[tokio::test]
    async fn refund_sets_both_statuses_and_does_not_double_restore() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 5);

        carts.add_item(customer_id, product_id, 2).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");

        repo.update_status(order.id, OrderStatus::Cancelled)
            .expect("cancel failed");
        assert_eq!(product_stock(&pool, product_id), 5);

        let refunded = repo
            .process_refund(order.id, "damaged in transit")
            .expect("refund failed");
        assert_eq!(refunded.status, OrderStatus::Refunded);
        assert_eq!(refunded.payment_status, PaymentStatus::Refunded);
        assert!(refunded
            .staff_notes
            .as_deref()
            .unwrap_or_default()
            .contains("REFUND PROCESSED: damaged in transit"));
        // Stock was already restored by the cancellation.
        assert_eq!(product_stock(&pool, product_id), 5);
    }

    #[tokio::test]
    async fn refund_of_a_live_order_restores_stock() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 5);

        carts.add_item(customer_id, product_id, 2).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");
        assert_eq!(product_stock(&pool, product_id), 3);

        repo.process_refund(order.id, "Customer request")
            .expect("refund failed");
        assert_eq!(product_stock(&pool, product_id), 5);
    }

    #[tokio::test]
    async fn transition_table_blocks_illegal_moves() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 5);

        carts.add_item(customer_id, product_id, 1).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");

        repo.update_status(order.id, OrderStatus::Confirmed)
            .expect("confirm failed");
        repo.update_status(order.id, OrderStatus::Shipped)
            .expect("ship failed");
        repo.update_status(order.id, OrderStatus::Delivered)
            .expect("deliver failed");

        let err = repo
            .update_status(order.id, OrderStatus::Cancelled)
            .expect_err("delivered orders cannot be cancelled");
        assert!(matches!(err, DomainError::Validation(_)));

        let err = repo
            .update_status(order.id, OrderStatus::Pending)
            .expect_err("no backward transitions");
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn milestone_timestamps_are_stamped_once() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 5);

        carts.add_item(customer_id, product_id, 1).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");
        assert!(order.confirmed_at.is_none());

        let confirmed = repo
            .update_status(order.id, OrderStatus::Confirmed)
            .expect("confirm failed");
        let stamp = confirmed.confirmed_at.expect("confirmed_at set");

        // Re-asserting the status is a no-op and keeps the original stamp.
        let again = repo
            .update_status(order.id, OrderStatus::Confirmed)
            .expect("repeat confirm failed");
        assert_eq!(again.confirmed_at, Some(stamp));

        let shipped = repo
            .update_status(order.id, OrderStatus::Shipped)
            .expect("ship failed");
        assert!(shipped.shipped_at.is_some());
        assert_eq!(shipped.confirmed_at, Some(stamp));
    }

    #[tokio::test]
    async fn payment_status_is_independent_of_order_status() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 5);

        carts.add_item(customer_id, product_id, 1).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");

        let paid = repo
            .update_payment_status(order.id, PaymentStatus::Paid)
            .expect("payment update failed");
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.status, OrderStatus::Pending);
        // Marking the payment does not move stock.
        assert_eq!(product_stock(&pool, product_id), 4);
    }

    #[tokio::test]
    async fn listings_paginate_and_filter_by_status() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 100);

        let mut order_ids = Vec::new();
        for _ in 0..5 {
            carts.add_item(customer_id, product_id, 1).expect("add failed");
            let order = repo
                .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
                .expect("checkout failed");
            order_ids.push(order.id);
        }
        repo.update_status(order_ids[0], OrderStatus::Confirmed)
            .expect("confirm failed");

        let page1 = repo
            .list_for_customer(customer_id, 1, 3)
            .expect("list failed");
        assert_eq!(page1.total, 5);
        assert_eq!(page1.items.len(), 3);
        let page2 = repo
            .list_for_customer(customer_id, 2, 3)
            .expect("list failed");
        assert_eq!(page2.items.len(), 2);

        let confirmed = repo
            .list_all(1, 20, Some(OrderStatus::Confirmed))
            .expect("list failed");
        assert_eq!(confirmed.total, 1);
        let all = repo.list_all(1, 20, None).expect("list failed");
        assert_eq!(all.total, 5);

        let none = repo
            .list_for_customer(Uuid::new_v4(), 1, 20)
            .expect("list failed");
        assert_eq!(none.total, 0);
    }

    #[tokio::test]
    async fn find_by_order_number_and_delete() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let repo = DieselOrderRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Alpha", "20.00", 5);

        carts.add_item(customer_id, product_id, 1).expect("add failed");
        let order = repo
            .create_from_cart(customer_id, address(), None, None, &PricingConfig::default())
            .expect("checkout failed");

        let found = repo
            .find_by_order_number(&order.order_number)
            .expect("search failed")
            .expect("order exists");
        assert_eq!(found.id, order.id);

        repo.delete(order.id).expect("delete failed");
        assert!(repo.find_by_id(order.id).expect("find failed").is_none());
        assert!(matches!(
            repo.delete(order.id),
            Err(DomainError::NotFound("Order"))
        ));
    }

    #[tokio::test]
    async fn concurrent_checkouts_cannot_oversell_the_last_unit() {
        let (_container, pool) = setup_db().await;
        let carts = DieselCartRepository::new(pool.clone());
        let customer_a = Uuid::new_v4();
        let customer_b = Uuid::new_v4();
        let product_id = seed_product(&pool, "Last unit", "20.00", 1);

        // Both customers hold the last unit in their carts; carts never
        // reserve stock, so both adds succeed.
        carts.add_item(customer_a, product_id, 1).expect("add failed");
        carts.add_item(customer_b, product_id, 1).expect("add failed");

        let spawn_checkout = |pool: DbPool, customer_id: Uuid| {
            std::thread::spawn(move || {
                DieselOrderRepository::new(pool).create_from_cart(
                    customer_id,
                    address(),
                    None,
                    None,
                    &PricingConfig::default(),
                )
            })
        };
        let first = spawn_checkout(pool.clone(), customer_a);
        let second = spawn_checkout(pool.clone(), customer_b);

        let results = [
            first.join().expect("thread panicked"),
            second.join().expect("thread panicked"),
        ];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "only one checkout may win the last unit");
        assert!(results
            .iter()
            .any(|r| matches!(r, Err(DomainError::InsufficientStock { .. }))));
        assert_eq!(product_stock(&pool, product_id), 0);
        assert_eq!(order_count(&pool), 1);
    }
}
