use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::AppError;

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Employee = 1,
    HrManager = 2,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Employee),
            2 => Some(Role::HrManager),
            _ => None,
        }
    }

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// The authenticated identity an operation runs on behalf of.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub employee_id: u64,
    pub role: Role,
}

impl Actor {
    pub fn new(employee_id: u64, role: Role) -> Self {
        Self { employee_id, role }
    }

    pub fn is_hr(&self) -> bool {
        self.role == Role::HrManager
    }

    pub fn require_hr(&self) -> Result<(), AppError> {
        if self.is_hr() {
            Ok(())
        } else {
            Err(AppError::Forbidden("HR manager only".into()))
        }
    }

    /// Employees may act on their own records; HR on anyone's.
    pub fn require_self_or_hr(&self, employee_id: u64) -> Result<(), AppError> {
        if self.is_hr() || self.employee_id == employee_id {
            Ok(())
        } else {
            Err(AppError::Forbidden("not allowed to act for another employee".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_ids_round_trip() {
        for role in [Role::Employee, Role::HrManager] {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
        assert_eq!(Role::from_id(0), None);
    }

    #[test]
    fn employees_cannot_act_for_others() {
        let actor = Actor::new(7, Role::Employee);
        assert!(actor.require_self_or_hr(7).is_ok());
        assert!(actor.require_self_or_hr(8).is_err());
        assert!(actor.require_hr().is_err());

        let hr = Actor::new(1, Role::HrManager);
        assert!(hr.require_self_or_hr(8).is_ok());
        assert!(hr.require_hr().is_ok());
    }

    #[test]
    fn role_names_are_snake_case() {
        assert_eq!(Role::HrManager.as_ref(), "hr_manager");
        assert_eq!("employee".parse::<Role>().ok(), Some(Role::Employee));
    }
}
