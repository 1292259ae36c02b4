//! Authorization table: every gated operation paired with the predicate its
//! caller must satisfy. Checked by the services before any store access.

use crate::{
    app_error::AppError,
    roles::{Identity, Role, StaffGroup},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListCatalog,
    CreateCatalogEntry,
    UpdateCatalogEntry,
    DeleteCatalogEntry,
    ViewCart,
    ModifyCart,
    ClearCart,
    ListOrders,
    PlaceOrder,
    ViewOrder,
    UpdateOrder,
    DeleteOrder,
    ListGroupMembers(StaffGroup),
    AssignGroupMember(StaffGroup),
    RevokeGroupMember(StaffGroup),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Anyone,
    Authenticated,
    Manager,
    ManagerOrDeliveryCrew,
    Admin,
}

impl Operation {
    pub fn requirement(self) -> Requirement {
        match self {
            Operation::ListCatalog => Requirement::Anyone,
            Operation::CreateCatalogEntry
            | Operation::UpdateCatalogEntry
            | Operation::DeleteCatalogEntry => Requirement::Manager,
            Operation::ViewCart | Operation::ModifyCart | Operation::ClearCart => {
                Requirement::Authenticated
            }
            // Per-order ownership is checked by the order engine.
            Operation::ListOrders | Operation::PlaceOrder | Operation::ViewOrder => {
                Requirement::Authenticated
            }
            Operation::UpdateOrder => Requirement::ManagerOrDeliveryCrew,
            Operation::DeleteOrder => Requirement::Manager,
            Operation::ListGroupMembers(group)
            | Operation::AssignGroupMember(group)
            | Operation::RevokeGroupMember(group) => group_administrator(group),
        }
    }
}

/// Admins administer the Manager group; Managers administer Delivery Crew.
fn group_administrator(group: StaffGroup) -> Requirement {
    match group {
        StaffGroup::Manager => Requirement::Admin,
        StaffGroup::DeliveryCrew => Requirement::Manager,
    }
}

impl Requirement {
    pub fn is_satisfied_by(self, identity: &Identity) -> bool {
        match self {
            Requirement::Anyone | Requirement::Authenticated => true,
            Requirement::Manager => identity.role == Role::Manager,
            Requirement::ManagerOrDeliveryCrew => {
                matches!(identity.role, Role::Manager | Role::DeliveryCrew)
            }
            Requirement::Admin => identity.is_admin,
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Requirement::Anyone | Requirement::Authenticated => "Authentication required",
            Requirement::Manager => "Only managers may perform this action",
            Requirement::ManagerOrDeliveryCrew => {
                "Only managers or delivery crew may perform this action"
            }
            Requirement::Admin => "Only administrators may perform this action",
        }
    }
}

pub fn authorize(operation: Operation, identity: &Identity) -> Result<(), AppError> {
    let requirement = operation.requirement();
    if requirement.is_satisfied_by(identity) {
        Ok(())
    } else {
        tracing::debug!(
            "Denied {:?} to user #{} ({:?})",
            operation,
            identity.user_id,
            identity.role
        );
        Err(AppError::Forbidden(requirement.denial().into()))
    }
}
