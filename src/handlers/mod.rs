// handlers/mod.rs - 3-tier handler layout
//
// Public (no session) → Protected (session required) → Elevated (admin role)
pub mod elevated; // Tier 3: /api/admin/*, session + users.role = 'admin'
pub mod protected; // Tier 2: /api/*, session required
pub mod public; // Tier 1: /, /health, /auth/*, /webhooks/*
