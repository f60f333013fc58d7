//! Role-based permission matrix.
//!
//! Pure data and pure functions: the HTTP layer asks whether a role may
//! perform an operation (or set a particular status value) before delegating
//! to a service. Nothing in here touches the database or mutates state.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::order::{OrderStatus, PaymentStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    Cashier,
    Customer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Cashier => "cashier",
            Role::Customer => "customer",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "cashier" => Some(Role::Cashier),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }

    pub fn is_staff(self) -> bool {
        !matches!(self, Role::Customer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ManageOwnCart,
    PlaceOrder,
    ViewOwnOrders,
    CancelOwnOrder,
    ViewAnyOrder,
    SearchOrders,
    UpdateOrderStatus,
    UpdatePaymentStatus,
    ListAllOrders,
    AnnotateOrders,
    AdjustStock,
    ProcessRefund,
    DeleteOrder,
}

const CUSTOMER_OPERATIONS: &[Operation] = &[
    Operation::ManageOwnCart,
    Operation::PlaceOrder,
    Operation::ViewOwnOrders,
    Operation::CancelOwnOrder,
];

const CASHIER_OPERATIONS: &[Operation] = &[
    Operation::ViewAnyOrder,
    Operation::SearchOrders,
    Operation::UpdateOrderStatus,
    Operation::UpdatePaymentStatus,
];

const MANAGER_OPERATIONS: &[Operation] = &[
    Operation::ViewAnyOrder,
    Operation::SearchOrders,
    Operation::UpdateOrderStatus,
    Operation::UpdatePaymentStatus,
    Operation::ListAllOrders,
    Operation::AnnotateOrders,
    Operation::AdjustStock,
];

const ADMIN_OPERATIONS: &[Operation] = &[
    Operation::ViewAnyOrder,
    Operation::SearchOrders,
    Operation::UpdateOrderStatus,
    Operation::UpdatePaymentStatus,
    Operation::ListAllOrders,
    Operation::AnnotateOrders,
    Operation::AdjustStock,
    Operation::ProcessRefund,
    Operation::DeleteOrder,
];

pub fn allowed_operations(role: Role) -> &'static [Operation] {
    match role {
        Role::Customer => CUSTOMER_OPERATIONS,
        Role::Cashier => CASHIER_OPERATIONS,
        Role::Manager => MANAGER_OPERATIONS,
        Role::Admin => ADMIN_OPERATIONS,
    }
}

pub fn permits(role: Role, operation: Operation) -> bool {
    allowed_operations(role).contains(&operation)
}

/// Which order-status values a staff role may set: cashiers only drive
/// orders through confirmation, managers anything short of a refund, admins
/// everything.
pub fn may_set_order_status(role: Role, status: OrderStatus) -> bool {
    match role {
        Role::Admin => true,
        Role::Manager => status != OrderStatus::Refunded,
        Role::Cashier => matches!(status, OrderStatus::Confirmed | OrderStatus::Processing),
        Role::Customer => false,
    }
}

pub fn may_set_payment_status(role: Role, status: PaymentStatus) -> bool {
    match role {
        Role::Admin => true,
        Role::Manager | Role::Cashier => status != PaymentStatus::Refunded,
        Role::Customer => false,
    }
}
