// Business domains
pub mod auth;
pub mod cart;
pub mod profile;
pub mod session;
