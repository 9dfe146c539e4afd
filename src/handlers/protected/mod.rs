// handlers/protected/mod.rs - session-protected endpoints (/api/*)
//
// Every route here runs behind `session_logger` and `require_session`.
// Handlers receive the caller as a `SessionUser` extractor.

pub mod auth; // GET /api/auth/me
pub mod groups; // /api/groups
pub mod instances; // /api/instances
pub mod payments; // GET /api/payments
pub mod plans; // GET /api/plans
pub mod subscriptions; // /api/subscriptions

use serde::Deserialize;

/// `userId` carried in a query string or JSON body
#[derive(Debug, Default, Deserialize)]
pub struct UserIdParams {
    #[serde(rename = "userId")]
    pub user_id: Option<String>,
}
