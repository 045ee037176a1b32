mod client;
pub mod models;

pub use client::{DEFAULT_BASE_URL, MlbClient};
pub use models::GameKind;
