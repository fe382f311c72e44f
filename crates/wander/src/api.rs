//! JSON bodies exchanged between the front end and the backend.

use serde::{Deserialize, Serialize};

use crate::interpret::RoutingDecision;

/// `GET /api/token` response. `token` is `null` when the secret is unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: Option<String>,
}

/// `POST /api/resolve` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveRequest {
    pub query: String,
}

/// `POST /api/resolve` success response.
///
/// `locations` is present only for [`RoutingDecision::Interpret`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub decision: RoutingDecision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
}

impl ResolveResponse {
    #[must_use]
    pub const fn direct() -> Self {
        Self {
            decision: RoutingDecision::Direct,
            locations: None,
        }
    }

    #[must_use]
    pub const fn candidates(locations: Vec<String>) -> Self {
        Self {
            decision: RoutingDecision::Interpret,
            locations: Some(locations),
        }
    }
}

/// Body of every non-200 backend response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}
