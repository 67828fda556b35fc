use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The identity resolved from the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
}

/// A user account on the reference backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn identity(&self) -> CurrentUser {
        CurrentUser {
            id: self.id.clone(),
        }
    }
}

/// Returned when a user is provisioned. The token authenticates API calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedUser {
    pub user: User,
    pub token: String,
}

/// Request body for the summarize endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeRequest {
    pub text: String,
}

/// Response body for the summarize endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummarizeResponse {
    pub summary: String,
}
