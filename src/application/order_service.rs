use uuid::Uuid;

use crate::domain::access::{self, Role};
use crate::domain::errors::DomainError;
use crate::domain::order::{
    OrderPage, OrderStatus, OrderView, PaymentMethod, PaymentStatus, ShippingAddress,
};
use crate::domain::ports::OrderRepository;
use crate::domain::pricing::PricingConfig;

pub struct OrderService<R> {
    repo: R,
    pricing: PricingConfig,
}

impl<R: OrderRepository> OrderService<R> {
    pub fn new(repo: R, pricing: PricingConfig) -> Self {
        Self { repo, pricing }
    }

    fn validate_address(address: &ShippingAddress) -> Result<(), DomainError> {
        let required = [
            ("line1", &address.line1),
            ("city", &address.city),
            ("state", &address.state),
            ("postal_code", &address.postal_code),
            ("country", &address.country),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(DomainError::Validation(format!(
                    "shipping_address.{field} is required"
                )));
            }
        }
        Ok(())
    }

    pub fn create_order_from_cart(
        &self,
        customer_id: Uuid,
        address: ShippingAddress,
        payment_method: Option<String>,
        customer_notes: Option<String>,
    ) -> Result<OrderView, DomainError> {
        Self::validate_address(&address)?;
        let method = match payment_method.as_deref() {
            None | Some("") => None,
            Some(value) => Some(PaymentMethod::parse(value).ok_or_else(|| {
                DomainError::Validation(format!(
                    "Invalid payment method. Must be one of: {}",
                    PaymentMethod::valid_values()
                ))
            })?),
        };

        let order =
            self.repo
                .create_from_cart(customer_id, address, method, customer_notes, &self.pricing)?;
        log::info!(
            "Order {} created for customer {} (total {})",
            order.order_number,
            customer_id,
            order.total
        );
        Ok(order)
    }

    pub fn get_order(&self, order_id: Uuid) -> Result<OrderView, DomainError> {
        self.repo
            .find_by_id(order_id)?
            .ok_or(DomainError::NotFound("Order"))
    }

    /// Customer-scoped read: the order must belong to the caller.
    pub fn get_order_for_customer(
        &self,
        order_id: Uuid,
        customer_id: Uuid,
    ) -> Result<OrderView, DomainError> {
        let order = self.get_order(order_id)?;
        if order.customer_id != customer_id {
            return Err(DomainError::Forbidden(
                "You do not have access to this order".to_string(),
            ));
        }
        Ok(order)
    }

    pub fn find_by_order_number(&self, order_number: &str) -> Result<OrderView, DomainError> {
        self.repo
            .find_by_order_number(order_number)?
            .ok_or(DomainError::NotFound("Order"))
    }

    pub fn list_customer_orders(
        &self,
        customer_id: Uuid,
        page: i64,
        limit: i64,
    ) -> Result<OrderPage, DomainError> {
        self.repo.list_for_customer(customer_id, page, limit)
    }

    pub fn list_all_orders(
        &self,
        page: i64,
        limit: i64,
        status: Option<&str>,
    ) -> Result<OrderPage, DomainError> {
        let status = match status {
            None | Some("") => None,
            Some(value) => Some(OrderStatus::parse(value).ok_or_else(|| {
                DomainError::Validation(format!(
                    "Invalid status. Must be one of: {}",
                    OrderStatus::valid_values()
                ))
            })?),
        };
        self.repo.list_all(page, limit, status)
    }

    pub fn update_order_status(
        &self,
        order_id: Uuid,
        status: &str,
        role: Role,
    ) -> Result<OrderView, DomainError> {
        let status = OrderStatus::parse(status).ok_or_else(|| {
            DomainError::Validation(format!(
                "Invalid status. Must be one of: {}",
                OrderStatus::valid_values()
            ))
        })?;

        if !access::may_set_order_status(role, status) {
            return Err(DomainError::Forbidden(match role {
                Role::Cashier => {
                    "Cashiers can only update order status to: confirmed, processing".to_string()
                }
                _ => "Only admins can set status to refunded".to_string(),
            }));
        }

        self.repo.update_status(order_id, status)
    }

    pub fn update_payment_status(
        &self,
        order_id: Uuid,
        payment_status: &str,
        role: Role,
    ) -> Result<OrderView, DomainError> {
        let next = PaymentStatus::parse(payment_status).ok_or_else(|| {
            DomainError::Validation(format!(
                "Invalid payment status. Must be one of: {}",
                PaymentStatus::valid_values()
            ))
        })?;

        if !access::may_set_payment_status(role, next) {
            return Err(DomainError::Forbidden(
                "Only admins can set payment status to refunded".to_string(),
            ));
        }
        // Reversing a recorded refund is equally sensitive.
        let current = self.get_order(order_id)?;
        if current.payment_status == PaymentStatus::Refunded
            && next != PaymentStatus::Refunded
            && role != Role::Admin
        {
            return Err(DomainError::Forbidden(
                "Only admins can reverse a refunded payment status".to_string(),
            ));
        }

        self.repo.update_payment_status(order_id, next)
    }

    /// Customer-initiated cancellation; staff drive cancellations through
    /// `update_order_status` instead.
    pub fn cancel_own_order(
        &self,
        customer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderView, DomainError> {
        let order = self.get_order_for_customer(order_id, customer_id)?;
        if !order.status.customer_cancellable() {
            return Err(DomainError::Validation(format!(
                "Cannot cancel order with status: {}",
                order.status
            )));
        }
        self.repo.update_status(order_id, OrderStatus::Cancelled)
    }

    pub fn process_refund(
        &self,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<OrderView, DomainError> {
        let reason = reason.unwrap_or_else(|| "Customer request".to_string());
        self.repo.process_refund(order_id, &reason)
    }

    pub fn add_staff_note(&self, order_id: Uuid, note: &str) -> Result<OrderView, DomainError> {
        if note.trim().is_empty() {
            return Err(DomainError::Validation("notes is required".to_string()));
        }
        self.repo.append_staff_note(order_id, note)
    }

    pub fn delete_order(&self, order_id: Uuid) -> Result<(), DomainError> {
        self.repo.delete(order_id)?;
        log::info!("Order {} permanently deleted", order_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::OrderView;

    // Gating and enum parsing run before any store access; a repository that
    // panics on contact proves the rejection happens up front.
    struct UnreachableRepo;

    impl OrderRepository for UnreachableRepo {
        fn create_from_cart(
            &self,
            _: Uuid,
            _: ShippingAddress,
            _: Option<PaymentMethod>,
            _: Option<String>,
            _: &PricingConfig,
        ) -> Result<OrderView, DomainError> {
            unreachable!()
        }
        fn find_by_id(&self, _: Uuid) -> Result<Option<OrderView>, DomainError> {
            unreachable!()
        }
        fn find_by_order_number(&self, _: &str) -> Result<Option<OrderView>, DomainError> {
            unreachable!()
        }
        fn list_for_customer(&self, _: Uuid, _: i64, _: i64) -> Result<OrderPage, DomainError> {
            unreachable!()
        }
        fn list_all(
            &self,
            _: i64,
            _: i64,
            _: Option<OrderStatus>,
        ) -> Result<OrderPage, DomainError> {
            unreachable!()
        }
        fn update_status(&self, _: Uuid, _: OrderStatus) -> Result<OrderView, DomainError> {
            unreachable!()
        }
        fn update_payment_status(
            &self,
            _: Uuid,
            _: PaymentStatus,
        ) -> Result<OrderView, DomainError> {
            unreachable!()
        }
        fn process_refund(&self, _: Uuid, _: &str) -> Result<OrderView, DomainError> {
            unreachable!()
        }
        fn append_staff_note(&self, _: Uuid, _: &str) -> Result<OrderView, DomainError> {
            unreachable!()
        }
        fn delete(&self, _: Uuid) -> Result<(), DomainError> {
            unreachable!()
        }
    }

    fn service() -> OrderService<UnreachableRepo> {
        OrderService::new(UnreachableRepo, PricingConfig::default())
    }

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

    #[test]
    fn unknown_status_values_are_rejected_before_the_store() {
        let err = service()
            .update_order_status(Uuid::new_v4(), "misplaced", Role::Admin)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(err.to_string().contains("pending"));

        let err = service()
            .update_payment_status(Uuid::new_v4(), "charged_back", Role::Admin)
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cashiers_and_managers_are_gated_by_target_status() {
        let err = service()
            .update_order_status(Uuid::new_v4(), "shipped", Role::Cashier)
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = service()
            .update_order_status(Uuid::new_v4(), "refunded", Role::Manager)
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let err = service()
            .update_payment_status(Uuid::new_v4(), "refunded", Role::Cashier)
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[test]
    fn incomplete_addresses_are_rejected_before_the_store() {
        let mut bad = address();
        bad.postal_code = "  ".to_string();

        let err = service()
            .create_order_from_cart(Uuid::new_v4(), bad, None, None)
            .unwrap_err();
        match err {
            DomainError::Validation(msg) => {
                assert_eq!(msg, "shipping_address.postal_code is required")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_payment_methods_are_rejected() {
        let err = service()
            .create_order_from_cart(
                Uuid::new_v4(),
                address(),
                Some("bitcoin".to_string()),
                None,
            )
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!(err.to_string().contains("credit_card"));
    }

    #[test]
    fn blank_staff_notes_are_rejected() {
        let err = service().add_staff_note(Uuid::new_v4(), "  ").unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
