pub mod admin;
pub mod auth;
pub mod session;

pub use admin::require_admin;
pub use auth::{authorize_user, parse_user_id, require_session};
pub use session::session_logger;
