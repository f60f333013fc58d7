use uuid::Uuid;

use crate::domain::cart::{CartView, CheckoutValidation, MAX_QUANTITY_PER_LINE};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;

pub struct CartService<R> {
    repo: R,
}

impl<R: CartRepository> CartService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Quantity bounds are checked here, before any database work; the
    /// stock check itself happens under the product row lock in the store.
    fn validate_quantity(quantity: i32) -> Result<(), DomainError> {
        if quantity < 1 {
            return Err(DomainError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if quantity > MAX_QUANTITY_PER_LINE {
            return Err(DomainError::Validation(format!(
                "Maximum quantity per item is {MAX_QUANTITY_PER_LINE}"
            )));
        }
        Ok(())
    }

    pub fn get_or_create_cart(&self, customer_id: Uuid) -> Result<CartView, DomainError> {
        let cart = self.repo.get_or_create(customer_id)?;
        log::info!("Cart {} ready for customer {}", cart.id, customer_id);
        Ok(cart)
    }

    pub fn add_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        Self::validate_quantity(quantity)?;
        let cart = self.repo.add_item(customer_id, product_id, quantity)?;
        log::info!(
            "Added {} of product {} to cart for customer {}",
            quantity,
            product_id,
            customer_id
        );
        Ok(cart)
    }

    pub fn update_item_quantity(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, DomainError> {
        Self::validate_quantity(quantity)?;
        let cart = self
            .repo
            .set_item_quantity(customer_id, product_id, quantity)?;
        log::info!(
            "Set quantity of product {} to {} in cart for customer {}",
            product_id,
            quantity,
            customer_id
        );
        Ok(cart)
    }

    pub fn remove_item(
        &self,
        customer_id: Uuid,
        product_id: Uuid,
    ) -> Result<CartView, DomainError> {
        let cart = self.repo.remove_item(customer_id, product_id)?;
        log::info!(
            "Removed product {} from cart for customer {}",
            product_id,
            customer_id
        );
        Ok(cart)
    }

    pub fn clear_cart(&self, customer_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let cart = self.repo.clear(customer_id)?;
        log::info!("Cleared cart for customer {}", customer_id);
        Ok(cart)
    }

    pub fn validate_for_checkout(
        &self,
        customer_id: Uuid,
    ) -> Result<CheckoutValidation, DomainError> {
        self.repo.validate_for_checkout(customer_id)
    }
}
