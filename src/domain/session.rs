use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Adopter,
    Shelter,
    Rescuer,
}

/// The acting profile, passed explicitly to every owner-scoped call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub profile_id: String,
    pub role: Role,
}

impl Session {
    pub fn new(profile_id: impl Into<String>, role: Role) -> Self {
        Self {
            profile_id: profile_id.into(),
            role,
        }
    }

    pub fn shelter(profile_id: impl Into<String>) -> Self {
        Self::new(profile_id, Role::Shelter)
    }

    pub fn adopter(profile_id: impl Into<String>) -> Self {
        Self::new(profile_id, Role::Adopter)
    }

    /// Shelters and rescuers own pets and publications; adopters own their requests.
    pub fn owns_listings(&self) -> bool {
        matches!(self.role, Role::Shelter | Role::Rescuer)
    }
}
