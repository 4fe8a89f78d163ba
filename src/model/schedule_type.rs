use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::ValidationError;

pub const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[derive(
    Debug, Copy, Clone, Default, Eq, PartialEq, Serialize, Deserialize, ToSchema, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScheduleKind {
    /// Hours may be worked at any time.
    #[default]
    Open,
    /// Fixed per-weekday time slots.
    Specific,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 2,
    "name": "Full time",
    "weekly_hours": 40.0,
    "kind": "specific",
    "details": { "monday": "09:00-13:00, 14:00-18:00" }
}))]
pub struct ScheduleType {
    pub id: u64,
    pub name: String,
    pub weekly_hours: f64,
    pub kind: ScheduleKind,
    /// Weekday name to free-form slot text.
    pub details: BTreeMap<String, String>,
}

impl ScheduleType {
    /// Expected hours over `days` calendar days.
    pub fn target_hours(&self, days: f64) -> f64 {
        self.weekly_hours * days / 7.0
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ScheduleInput {
    #[schema(example = "Full time")]
    pub name: String,
    #[schema(example = 40.0)]
    pub weekly_hours: f64,
    #[serde(default)]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl ScheduleInput {
    /// Trims the input, checks its bounds and normalizes weekday keys.
    /// Details are dropped for open schedules.
    pub fn validated(self) -> Result<ScheduleInput, ValidationError> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if !self.weekly_hours.is_finite() || self.weekly_hours <= 0.0 || self.weekly_hours > 168.0 {
            return Err(ValidationError::InvalidWeeklyHours);
        }

        let details = match self.kind {
            ScheduleKind::Open => BTreeMap::new(),
            ScheduleKind::Specific => {
                let mut details = BTreeMap::new();
                for (day, slots) in self.details {
                    let key = day.trim().to_lowercase();
                    if !WEEKDAYS.contains(&key.as_str()) {
                        return Err(ValidationError::UnknownWeekday(day));
                    }
                    let slots = slots.trim();
                    if !slots.is_empty() {
                        details.insert(key, slots.to_string());
                    }
                }
                details
            }
        };

        Ok(ScheduleInput {
            name,
            weekly_hours: self.weekly_hours,
            kind: self.kind,
            details,
        })
    }
}
