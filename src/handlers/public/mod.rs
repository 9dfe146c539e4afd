// handlers/public/mod.rs - endpoints reachable without a session

pub mod auth; // POST /auth/register, /auth/login, /auth/logout
pub mod system; // GET /, GET /health
pub mod webhooks; // POST /webhooks/asaas

pub use auth::{login, logout, register};
pub use system::{health, root};
pub use webhooks::asaas_webhook;
