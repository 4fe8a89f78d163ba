use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::role::Role;

pub const DEFAULT_VACATION_DAYS: u32 = 22;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[schema(
    example = json!({
        "id": 4,
        "name": "Juanjo",
        "avatar_url": "https://cdn.example.com/avatars/4.png",
        "schedule_id": 2,
        "role": "employee",
        "vacation_days": 22,
        "active": true,
        "created_at": "2026-01-01T08:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 4)]
    pub id: u64,

    #[schema(example = "Juanjo")]
    pub name: String,

    /// argon2 PHC string; never leaves the process.
    #[serde(skip)]
    pub pin_hash: String,

    #[schema(nullable = true)]
    pub avatar_url: Option<String>,

    #[schema(nullable = true)]
    pub schedule_id: Option<u64>,

    pub role: Role,

    #[schema(example = 22)]
    pub vacation_days: u32,

    pub active: bool,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Row handed to the store on insert.
#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub pin_hash: String,
    pub avatar_url: Option<String>,
    pub schedule_id: Option<u64>,
    pub role: Role,
    pub vacation_days: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "Test-Xyz")]
    pub name: String,
    #[schema(example = "9999")]
    pub pin: String,
    pub avatar_url: Option<String>,
    pub schedule_id: Option<u64>,
    pub role: Option<Role>,
    #[schema(example = 22)]
    pub vacation_days: Option<u32>,
}

/// Partial update. For nullable fields an explicit `null` clears the value
/// while an absent field leaves it untouched.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateEmployee {
    pub name: Option<String>,
    pub pin: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub avatar_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<u64>)]
    pub schedule_id: Option<Option<u64>>,
    pub role: Option<Role>,
    pub vacation_days: Option<u32>,
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeFilter {
    /// Only this role
    pub role: Option<Role>,
    /// Only employees on this schedule type
    pub schedule_id: Option<u64>,
    /// Include soft-deleted employees
    #[serde(default)]
    pub include_inactive: bool,
    /// Case-insensitive substring of the name
    pub search: Option<String>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        if !self.include_inactive && !employee.active {
            return false;
        }
        if self.role.is_some_and(|role| role != employee.role) {
            return false;
        }
        if self.schedule_id.is_some() && self.schedule_id != employee.schedule_id {
            return false;
        }
        match &self.search {
            Some(needle) => employee
                .name
                .to_lowercase()
                .contains(&needle.trim().to_lowercase()),
            None => true,
        }
    }
}

/// Public kiosk card: enough to pick yourself from the roster.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterEntry {
    pub id: u64,
    pub name: String,
    pub avatar_url: Option<String>,
}

impl From<&Employee> for RosterEntry {
    fn from(employee: &Employee) -> Self {
        Self {
            id: employee.id,
            name: employee.name.clone(),
            avatar_url: employee.avatar_url.clone(),
        }
    }
}
