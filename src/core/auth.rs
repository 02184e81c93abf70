//! Admin roles and what each of them may do.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Admin,
    Staff,
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUPER_ADMIN" => Ok(Role::SuperAdmin),
            "ADMIN" => Ok(Role::Admin),
            "STAFF" => Ok(Role::Staff),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ReadInquiries,
    ReplyInquiries,
    DeleteInquiries,
    RetryNotifications,
    ManageHistory,
    DeleteHistory,
    ModerateReviews,
    ViewDashboard,
    /// Read, admit and edit residents.
    ManageResidents,
    DeleteResidents,
    /// Employee records, read and write.
    ManageStaff,
}

impl Role {
    pub fn allows(self, capability: Capability) -> bool {
        match self {
            Role::SuperAdmin | Role::Admin => true,
            Role::Staff => matches!(
                capability,
                Capability::ReadInquiries
                    | Capability::ReplyInquiries
                    | Capability::ManageHistory
                    | Capability::ViewDashboard
                    | Capability::ManageResidents
            ),
        }
    }
}

/// The signed-in admin, as established by the session layer in front of this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: Uuid,
    pub role: Role,
    pub name: Option<String>,
}

impl CurrentUser {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.role.allows(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden("권한이 없습니다"))
        }
    }

    /// Recorded as `repliedBy` / `approvedBy`.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: Uuid::nil(),
            role,
            name: None,
        }
    }

    #[test]
    fn staff_cannot_delete_or_moderate() {
        let staff = user(Role::Staff);
        assert!(staff.require(Capability::ReplyInquiries).is_ok());
        assert!(staff.require(Capability::ManageHistory).is_ok());
        assert!(staff.require(Capability::DeleteInquiries).is_err());
        assert!(staff.require(Capability::ModerateReviews).is_err());
        assert!(staff.require(Capability::RetryNotifications).is_err());
    }

    #[test]
    fn staff_handle_residents_but_not_employee_records() {
        let staff = user(Role::Staff);
        assert!(staff.require(Capability::ManageResidents).is_ok());
        assert!(staff.require(Capability::DeleteResidents).is_err());
        assert!(staff.require(Capability::ManageStaff).is_err());
        assert!(user(Role::Admin).require(Capability::ManageStaff).is_ok());
    }

    #[test]
    fn admins_hold_every_capability() {
        for role in [Role::Admin, Role::SuperAdmin] {
            assert!(user(role).require(Capability::DeleteHistory).is_ok());
        }
    }

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("super_admin".parse(), Ok(Role::SuperAdmin));
        assert_eq!("guest".parse::<Role>(), Err(()));
    }

    #[test]
    fn display_name_falls_back_to_id() {
        let mut admin = user(Role::Admin);
        assert_eq!(admin.display_name(), Uuid::nil().to_string());
        admin.name = Some("김관리".to_owned());
        assert_eq!(admin.display_name(), "김관리");
    }
}
