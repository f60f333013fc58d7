use uuid::Uuid;

use crate::domain::catalog::{ProductView, StockAdjustment, StockAvailability};
use crate::domain::errors::DomainError;
use crate::domain::ports::CatalogRepository;

pub struct CatalogService<R> {
    repo: R,
}

impl<R: CatalogRepository> CatalogService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn get_product(
        &self,
        product_id: Uuid,
        include_inactive: bool,
    ) -> Result<ProductView, DomainError> {
        self.repo
            .find_product(product_id, include_inactive)?
            .ok_or(DomainError::NotFound("Product"))
    }

    pub fn adjust_stock(
        &self,
        product_id: Uuid,
        quantity: i32,
        mode: StockAdjustment,
    ) -> Result<ProductView, DomainError> {
        self.repo.adjust_stock(product_id, quantity, mode)
    }

    pub fn check_availability(
        &self,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<StockAvailability, DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        self.repo.check_availability(product_id, quantity)
    }
}
