pub mod auth;
pub mod identity;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use identity::{resolve_identity_middleware, CurrentUser};
pub use response::{ApiResponse, ApiResult};
