//! Cart domain - session-scoped shopping cart with quantity management.

pub mod models;

pub use models::{Cart, CartError, CartItem, Category};
