pub mod auth;
pub mod response;
pub mod session;

pub use auth::jwt_auth_middleware;
pub use response::{ApiResponse, ApiResult};
pub use session::{found, require_session};
