use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A cost-center that clock events are booked against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Client {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = "Cliente A")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ClientInput {
    #[schema(example = "Cliente A")]
    pub name: String,
}

/// Comparison key for client name uniqueness.
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}
