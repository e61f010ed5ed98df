//! Per-user shopping cart.

mod model;
mod service;

pub use model::{Cart, CartItem};
pub use service::CartService;
