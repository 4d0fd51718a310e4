// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition plus the read-only pages the app shows before login.

pub mod auth;
pub mod church;
pub mod events;
