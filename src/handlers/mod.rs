// handlers/mod.rs - Two-tier handler layout
//
// Public handlers need no token. Protected handlers run behind
// `token_auth_middleware` and take the caller as an `AuthUser` extractor.

pub mod protected;
pub mod public;
