use bigdecimal::BigDecimal;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{CartLineView, CartView, CheckoutValidation, MAX_QUANTITY_PER_LINE};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts, products};

use super::catalog_repo::lock_product;
use super::models::{CartItemRow, CartRow, NewCartItemRow, NewCartRow, ProductRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn find_cart_row(
    conn: &mut PgConnection,
    customer_id: Uuid,
) -> Result<Option<CartRow>, DomainError> {
    carts::table
        .filter(carts::customer_id.eq(customer_id))
        .select(CartRow::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

fn get_or_create_cart_row(
    conn: &mut PgConnection,
    customer_id: Uuid,
) -> Result<CartRow, DomainError> {
    if let Some(cart) = find_cart_row(conn, customer_id)? {
        return Ok(cart);
    }
    // `customer_id` is unique; on a concurrent insert the conflict is
    // swallowed and the winner's row is read back.
    diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            customer_id,
        })
        .on_conflict(carts::customer_id)
        .do_nothing()
        .execute(conn)?;
    find_cart_row(conn, customer_id)?.ok_or(DomainError::NotFound("Cart"))
}

fn find_cart_item(
    conn: &mut PgConnection,
    cart_id: Uuid,
    product_id: Uuid,
) -> Result<Option<CartItemRow>, DomainError> {
    cart_items::table
        .filter(cart_items::cart_id.eq(cart_id))
        .filter(cart_items::product_id.eq(product_id))
        .select(CartItemRow::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

fn touch_cart(conn: &mut PgConnection, cart_id: Uuid) -> Result<(), DomainError> {
    diesel::update(carts::table.find(cart_id))
        .set(carts::updated_at.eq(diesel::dsl::now))
        .execute(conn)?;
    Ok(())
}

fn load_cart_view(conn: &mut PgConnection, cart_id: Uuid) -> Result<CartView, DomainError> {
    let cart: CartRow = carts::table
        .find(cart_id)
        .select(CartRow::as_select())
        .first(conn)?;

    let rows: Vec<(CartItemRow, ProductRow)> = cart_items::table
        .inner_join(products::table)
        .filter(cart_items::cart_id.eq(cart.id))
        .order(cart_items::created_at.asc())
        .select((CartItemRow::as_select(), ProductRow::as_select()))
        .load(conn)?;

    let mut subtotal = BigDecimal::from(0);
    let mut lines = Vec::with_capacity(rows.len());
    for (item, product) in rows {
        let line_total = &product.price * BigDecimal::from(item.quantity);
        subtotal = subtotal + &line_total;
        lines.push(CartLineView {
            product_id: product.id,
            product_name: product.name,
            product_sku: product.sku,
            unit_price: product.price,
            quantity: item.quantity,
            line_total,
        });
    }

    Ok(CartView {
        id: cart.id,
        customer_id: cart.customer_id,
        lines,
        subtotal,
        created_at: cart.created_at,
        updated_at: cart.updated_at,
    })
}

impl CartRepository for DieselCartRepository {
    fn get_or_create(&self, customer_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = get_or_create_cart_row(conn, customer_id)?;
            load_cart_view(conn, cart.id)
        })
    }

    fn add_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Lock before the stock check so two concurrent adds for the
            // same product serialize through the check-then-write.
            let product =
                lock_product(conn, product_id)?.ok_or(DomainError::NotFound("Product"))?;
            if !product.is_active {
                return Err(DomainError::Validation(
                    "Product is not available".to_string(),
                ));
            }
            if product.stock_quantity < quantity {
                return Err(DomainError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock_quantity,
                    requested: quantity,
                });
            }

            let cart = get_or_create_cart_row(conn, customer_id)?;

            match find_cart_item(conn, cart.id, product_id)? {
                Some(item) => {
                    let new_quantity = item.quantity + quantity;
                    if new_quantity > product.stock_quantity {
                        return Err(DomainError::InsufficientStock {
                            product: product.name.clone(),
                            available: product.stock_quantity,
                            requested: new_quantity,
                        });
                    }
                    if new_quantity > MAX_QUANTITY_PER_LINE {
                        return Err(DomainError::Validation(format!(
                            "Maximum {MAX_QUANTITY_PER_LINE} items per product"
                        )));
                    }
                    diesel::update(cart_items::table.find(item.id))
                        .set(cart_items::quantity.eq(new_quantity))
                        .execute(conn)?;
                }
                None => {
                    diesel::insert_into(cart_items::table)
                        .values(&NewCartItemRow {
                            id: Uuid::new_v4(),
                            cart_id: cart.id,
                            product_id,
                            quantity,
                        })
                        .execute(conn)?;
                }
            }

            touch_cart(conn, cart.id)?;
            load_cart_view(conn, cart.id)
        })
    }

    fn set_item_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let product =
                lock_product(conn, product_id)?.ok_or(DomainError::NotFound("Product"))?;
            if product.stock_quantity < quantity {
                return Err(DomainError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock_quantity,
                    requested: quantity,
                });
            }

            let cart =
                find_cart_row(conn, customer_id)?.ok_or(DomainError::NotFound("Cart"))?;
            let item = find_cart_item(conn, cart.id, product_id)?
                .ok_or(DomainError::NotFound("Cart item"))?;

            diesel::update(cart_items::table.find(item.id))
                .set(cart_items::quantity.eq(quantity))
                .execute(conn)?;

            touch_cart(conn, cart.id)?;
            load_cart_view(conn, cart.id)
        })
    }

    fn remove_item(&self, customer_id: Uuid, product_id: Uuid) -> Result<CartView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart =
                find_cart_row(conn, customer_id)?.ok_or(DomainError::NotFound("Cart"))?;

            let deleted = diesel::delete(
                cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .filter(cart_items::product_id.eq(product_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(DomainError::NotFound("Cart item"));
            }

            touch_cart(conn, cart.id)?;
            load_cart_view(conn, cart.id)
        })
    }

    fn clear(&self, customer_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let Some(cart) = find_cart_row(conn, customer_id)? else {
                return Ok(None);
            };

            diesel::delete(cart_items::table.filter(cart_items::cart_id.eq(cart.id)))
                .execute(conn)?;

            touch_cart(conn, cart.id)?;
            Ok(Some(load_cart_view(conn, cart.id)?))
        })
    }

    fn validate_for_checkout(&self, customer_id: Uuid) -> Result<CheckoutValidation, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(cart) = find_cart_row(&mut conn, customer_id)? else {
            return Ok(CheckoutValidation::fail("Cart is empty"));
        };

        let rows: Vec<(CartItemRow, ProductRow)> = cart_items::table
            .inner_join(products::table)
            .filter(cart_items::cart_id.eq(cart.id))
            .select((CartItemRow::as_select(), ProductRow::as_select()))
            .load(&mut conn)?;

        if rows.is_empty() {
            return Ok(CheckoutValidation::fail("Cart is empty"));
        }

        for (item, product) in rows {
            if !product.is_active {
                return Ok(CheckoutValidation::fail(format!(
                    "Product '{}' is no longer available",
                    product.name
                )));
            }
            if product.stock_quantity < item.quantity {
                return Ok(CheckoutValidation::fail(format!(
                    "Insufficient stock for '{}'. Only {} available, but cart has {}",
                    product.name, product.stock_quantity, item.quantity
                )));
            }
        }

        Ok(CheckoutValidation::ok())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::DieselCartRepository;
    use crate::domain::errors::DomainError;
    use crate::domain::ports::CartRepository;
    use crate::infrastructure::test_support::{
        product_stock, seed_product, set_product_active, setup_db,
    };

    #[tokio::test]
    async fn get_or_create_is_idempotent() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool);
        let customer_id = Uuid::new_v4();

        let first = repo.get_or_create(customer_id).expect("create failed");
        let second = repo.get_or_create(customer_id).expect("get failed");

        assert_eq!(first.id, second.id);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn add_item_merges_lines_and_computes_subtotal() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Widget", "10.00", 10);

        repo.add_item(customer_id, product_id, 2).expect("add failed");
        let cart = repo.add_item(customer_id, product_id, 3).expect("add failed");

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
        assert_eq!(cart.subtotal.to_string(), "50.00");
        // Stock is not reserved at add-to-cart time.
        assert_eq!(product_stock(&pool, product_id), 10);
    }

    #[tokio::test]
    async fn add_item_rejects_more_than_available_stock() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Widget", "10.00", 4);

        repo.add_item(customer_id, product_id, 3).expect("add failed");
        let err = repo
            .add_item(customer_id, product_id, 2)
            .expect_err("should exceed stock");

        assert!(matches!(
            err,
            DomainError::InsufficientStock {
                available: 4,
                requested: 5,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn add_item_rejects_inactive_and_unknown_products() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Widget", "10.00", 4);
        set_product_active(&pool, product_id, false);

        let err = repo
            .add_item(customer_id, product_id, 1)
            .expect_err("inactive product");
        assert!(matches!(err, DomainError::Validation(_)));

        let err = repo
            .add_item(customer_id, Uuid::new_v4(), 1)
            .expect_err("unknown product");
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn set_quantity_requires_an_existing_line() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Widget", "10.00", 10);

        repo.get_or_create(customer_id).expect("create failed");
        let err = repo
            .set_item_quantity(customer_id, product_id, 2)
            .expect_err("no line yet");
        assert!(matches!(err, DomainError::NotFound("Cart item")));

        repo.add_item(customer_id, product_id, 1).expect("add failed");
        let cart = repo
            .set_item_quantity(customer_id, product_id, 7)
            .expect("update failed");
        assert_eq!(cart.lines[0].quantity, 7);
    }

    #[tokio::test]
    async fn remove_and_clear() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let first = seed_product(&pool, "Widget", "10.00", 10);
        let second = seed_product(&pool, "Gadget", "5.00", 10);

        repo.add_item(customer_id, first, 1).expect("add failed");
        repo.add_item(customer_id, second, 2).expect("add failed");

        let cart = repo.remove_item(customer_id, first).expect("remove failed");
        assert_eq!(cart.lines.len(), 1);

        let err = repo
            .remove_item(customer_id, first)
            .expect_err("already removed");
        assert!(matches!(err, DomainError::NotFound("Cart item")));

        let cart = repo
            .clear(customer_id)
            .expect("clear failed")
            .expect("cart exists");
        assert!(cart.is_empty());

        // Clearing a nonexistent cart is a no-op.
        assert!(repo.clear(Uuid::new_v4()).expect("clear failed").is_none());
    }

    #[tokio::test]
    async fn validate_for_checkout_catches_stock_drift() {
        let (_container, pool) = setup_db().await;
        let repo = DieselCartRepository::new(pool.clone());
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Widget", "10.00", 5);

        let empty = repo
            .validate_for_checkout(customer_id)
            .expect("validate failed");
        assert!(!empty.is_valid);
        assert_eq!(empty.message, "Cart is empty");

        repo.add_item(customer_id, product_id, 5).expect("add failed");
        let ok = repo
            .validate_for_checkout(customer_id)
            .expect("validate failed");
        assert!(ok.is_valid);
        assert!(ok.message.is_empty());

        // Another customer buys most of the stock after the add.
        crate::infrastructure::test_support::drain_stock(&pool, product_id, 2);
        let drifted = repo
            .validate_for_checkout(customer_id)
            .expect("validate failed");
        assert!(!drifted.is_valid);
        assert!(drifted.message.contains("Insufficient stock"));

        set_product_active(&pool, product_id, false);
        let inactive = repo
            .validate_for_checkout(customer_id)
            .expect("validate failed");
        assert!(!inactive.is_valid);
        assert!(inactive.message.contains("no longer available"));
    }

    #[tokio::test]
    async fn concurrent_adds_to_one_cart_cannot_exceed_stock() {
        let (_container, pool) = setup_db().await;
        let customer_id = Uuid::new_v4();
        let product_id = seed_product(&pool, "Last unit", "10.00", 1);

        let spawn_add = |pool: crate::db::DbPool| {
            std::thread::spawn(move || {
                DieselCartRepository::new(pool).add_item(customer_id, product_id, 1)
            })
        };
        let first = spawn_add(pool.clone());
        let second = spawn_add(pool.clone());

        let results = [
            first.join().expect("thread panicked"),
            second.join().expect("thread panicked"),
        ];

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "exactly one add may win the last unit");
        assert!(results.iter().any(|r| matches!(
            r,
            Err(DomainError::InsufficientStock { .. })
        )));
    }
}
