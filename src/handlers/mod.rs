// handlers/mod.rs - route handlers grouped by surface
//
// web:    session cookie, HTML responses, redirects to /login when signed out
// api:    bearer JWT, JSON envelope responses
// health: liveness plus a pool round-trip, no authentication

pub mod api;
pub mod health;
pub mod web;

pub use health::health;
