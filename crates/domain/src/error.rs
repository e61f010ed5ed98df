//! Domain error types.

use common::{AddressError, CartItemId, OrderId, ParseStatusError, ProductId};
use store::StoreError;
use thiserror::Error;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, CommerceError>;

/// How a caller should treat an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The input was malformed; nothing was attempted.
    Validation,
    /// The operation was rejected by current state; nothing was changed.
    Conflict,
    /// The caller lacks the required role.
    Forbidden,
    /// Infrastructure failure. Details must not reach the caller.
    Internal,
}

/// Errors that can occur during cart, checkout, order and catalog operations.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// Quantity outside the accepted range.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i32 },

    /// Shipping address is missing a required field.
    #[error("Invalid shipping address: {0}")]
    InvalidShippingAddress(#[from] AddressError),

    /// Status string is not one of the known values.
    #[error("Invalid status: {0}")]
    InvalidStatus(#[from] ParseStatusError),

    /// Product data failed validation.
    #[error("Invalid product: {0}")]
    InvalidProduct(String),

    /// Not enough stock to satisfy the request.
    #[error(
        "Insufficient stock for product {product_name}: available {available}, requested {requested}"
    )]
    OutOfStock {
        product_id: ProductId,
        product_name: String,
        available: i32,
        requested: i32,
    },

    /// Checkout was attempted on a cart without items.
    #[error("Cart is empty")]
    EmptyCart,

    /// Product does not exist.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Product is referenced by existing orders.
    #[error("Product {0} is referenced by existing orders")]
    ProductInUse(ProductId),

    /// Cart item does not exist in the caller's cart.
    #[error("Cart item not found: {0}")]
    ItemNotFound(CartItemId),

    /// Order does not exist or is not visible to the caller.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The caller is not allowed to perform the operation.
    #[error("Forbidden")]
    Forbidden,

    /// An error occurred in the store.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl CommerceError {
    /// Classifies the error for the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CommerceError::InvalidQuantity { .. }
            | CommerceError::InvalidShippingAddress(_)
            | CommerceError::InvalidStatus(_)
            | CommerceError::InvalidProduct(_) => ErrorKind::Validation,
            CommerceError::OutOfStock { .. }
            | CommerceError::EmptyCart
            | CommerceError::ProductNotFound(_)
            | CommerceError::ProductInUse(_)
            | CommerceError::ItemNotFound(_)
            | CommerceError::OrderNotFound(_) => ErrorKind::Conflict,
            CommerceError::Forbidden => ErrorKind::Forbidden,
            CommerceError::Store(_) => ErrorKind::Internal,
        }
    }

    /// Returns true for conflicts caused by a missing entity.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CommerceError::ProductNotFound(_)
                | CommerceError::ItemNotFound(_)
                | CommerceError::OrderNotFound(_)
        )
    }

    /// Short label used as a metrics dimension.
    pub fn reason(&self) -> &'static str {
        match self {
            CommerceError::InvalidQuantity { .. } => "invalid_quantity",
            CommerceError::InvalidShippingAddress(_) => "invalid_shipping_address",
            CommerceError::InvalidStatus(_) => "invalid_status",
            CommerceError::InvalidProduct(_) => "invalid_product",
            CommerceError::OutOfStock { .. } => "out_of_stock",
            CommerceError::EmptyCart => "empty_cart",
            CommerceError::ProductNotFound(_) => "product_not_found",
            CommerceError::ProductInUse(_) => "product_in_use",
            CommerceError::ItemNotFound(_) => "item_not_found",
            CommerceError::OrderNotFound(_) => "order_not_found",
            CommerceError::Forbidden => "forbidden",
            CommerceError::Store(_) => "internal",
        }
    }
}
