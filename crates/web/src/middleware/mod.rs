pub mod auth;
pub mod season;
