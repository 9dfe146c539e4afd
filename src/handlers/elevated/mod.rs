// handlers/elevated/mod.rs - admin endpoints (/api/admin/*)
//
// Routes here run behind `require_session` and then `require_admin`, so every
// handler can assume the caller is a current admin.

pub mod groups; // /api/admin/groups
pub mod plans; // /api/admin/plans
pub mod users; // /api/admin/users
