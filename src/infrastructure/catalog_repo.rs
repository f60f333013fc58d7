use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{ProductView, StockAdjustment, StockAvailability};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;
use crate::schema::products;

use super::models::ProductRow;

/// Read the product row under an exclusive row lock. Every check-then-write
/// on stock goes through this so concurrent mutations of the same product
/// serialize instead of racing.
pub(crate) fn lock_product(
    conn: &mut PgConnection,
    product_id: Uuid,
) -> Result<Option<ProductRow>, DomainError> {
    products::table
        .find(product_id)
        .for_update()
        .select(ProductRow::as_select())
        .first(conn)
        .optional()
        .map_err(Into::into)
}

/// The single stock-write primitive. `Subtract` enforces the floor at zero,
/// `Set` rejects negatives, `Add` is unconditional (cancel/refund restore).
/// Callers must already hold the row lock via [`lock_product`].
pub(crate) fn apply_stock_adjustment(
    conn: &mut PgConnection,
    product: &ProductRow,
    quantity: i32,
    mode: StockAdjustment,
) -> Result<ProductRow, DomainError> {
    if quantity < 0 {
        return Err(DomainError::Validation(
            "Stock quantity cannot be negative".to_string(),
        ));
    }
    let new_quantity = match mode {
        StockAdjustment::Add => product.stock_quantity + quantity,
        StockAdjustment::Subtract => {
            if product.stock_quantity < quantity {
                return Err(DomainError::InsufficientStock {
                    product: product.name.clone(),
                    available: product.stock_quantity,
                    requested: quantity,
                });
            }
            product.stock_quantity - quantity
        }
        StockAdjustment::Set => quantity,
    };
    let updated = diesel::update(products::table.find(product.id))
        .set(products::stock_quantity.eq(new_quantity))
        .get_result::<ProductRow>(conn)?;
    Ok(updated)
}

pub(crate) fn product_view(row: ProductRow) -> ProductView {
    ProductView {
        id: row.id,
        name: row.name,
        price: row.price,
        compare_price: row.compare_price,
        sku: row.sku,
        barcode: row.barcode,
        stock_quantity: row.stock_quantity,
        category_id: row.category_id,
        is_active: row.is_active,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn find_product(
        &self,
        id: Uuid,
        include_inactive: bool,
    ) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut query = products::table
            .select(ProductRow::as_select())
            .into_boxed()
            .filter(products::id.eq(id));
        if !include_inactive {
            query = query.filter(products::is_active.eq(true));
        }
        let row = query.first(&mut conn).optional()?;

        Ok(row.map(product_view))
    }

    fn adjust_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
        mode: StockAdjustment,
    ) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let product =
                lock_product(conn, product_id)?.ok_or(DomainError::NotFound("Product"))?;
            let updated = apply_stock_adjustment(conn, &product, quantity, mode)?;
            log::info!(
                "Stock updated for '{}' ({}): {} -> {}",
                updated.name,
                mode.as_str(),
                product.stock_quantity,
                updated.stock_quantity
            );
            Ok(product_view(updated))
        })
    }

    fn check_availability(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<StockAvailability, DomainError> {
        let product = self
            .find_product(product_id, false)?
            .ok_or(DomainError::NotFound("Product"))?;

        Ok(StockAvailability {
            available: product.stock_quantity >= quantity,
            stock_quantity: product.stock_quantity,
        })
    }
}
