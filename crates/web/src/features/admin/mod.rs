//! Operator endpoints. Everything here sits behind the API key.

pub mod handlers;
pub mod routes;

pub use routes::routes;
