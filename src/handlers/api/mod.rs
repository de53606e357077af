// handlers/api/mod.rs - JSON API
//
// /api/token trades login/password headers for a JWT. Everything under
// /api/pages runs behind `jwt_auth_middleware`, and capability checks are
// answered from the verified token claims.

pub mod pages;
pub mod token;
