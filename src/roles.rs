use serde::Serialize;
use utoipa::ToSchema;

use crate::models::UserEntity;

/// Administrative groups that confer a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum StaffGroup {
    Manager,
    DeliveryCrew,
}

impl StaffGroup {
    /// Group name as stored in the `groups` table.
    pub fn name(self) -> &'static str {
        match self {
            StaffGroup::Manager => "Manager",
            StaffGroup::DeliveryCrew => "Delivery Crew",
        }
    }
}

/// The single role an authenticated identity acts under for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub enum Role {
    Customer,
    Manager,
    DeliveryCrew,
}

impl Role {
    /// Derives the role from group membership. Manager takes precedence over
    /// Delivery Crew when an identity belongs to both; the data layer does
    /// not forbid that combination.
    pub fn from_groups<'a>(group_names: impl IntoIterator<Item = &'a str>) -> Role {
        let mut manager = false;
        let mut delivery_crew = false;
        for name in group_names {
            if name == StaffGroup::Manager.name() {
                manager = true;
            } else if name == StaffGroup::DeliveryCrew.name() {
                delivery_crew = true;
            }
        }

        match (manager, delivery_crew) {
            (true, true) => {
                tracing::warn!("Identity is in both Manager and Delivery Crew groups, acting as Manager");
                Role::Manager
            }
            (true, false) => Role::Manager,
            (false, true) => Role::DeliveryCrew,
            (false, false) => Role::Customer,
        }
    }
}

/// An authenticated caller, classified once per request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub user_id: i32,
    pub username: String,
    /// Admin-level accounts administer the Manager group.
    pub is_admin: bool,
    pub role: Role,
}

impl Identity {
    pub fn new(user: &UserEntity, role: Role) -> Self {
        Self {
            user_id: user.id,
            username: user.username.clone(),
            is_admin: user.is_staff,
            role,
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    pub fn is_delivery_crew(&self) -> bool {
        self.role == Role::DeliveryCrew
    }
}
