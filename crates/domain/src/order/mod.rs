//! Checkout, order storage and the order service.

mod materializer;
mod model;
mod repository;
mod service;

pub use materializer::OrderMaterializer;
pub use model::{Order, OrderItem};
pub use repository::OrderRepository;
pub use service::OrderService;
