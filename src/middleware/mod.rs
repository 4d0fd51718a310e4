pub mod auth;
pub mod cors;
pub mod response;

pub use auth::{token_auth_middleware, AuthUser};
pub use cors::{cors_middleware, CorsPolicy};
pub use response::{ApiResponse, ApiResult, Detail};
