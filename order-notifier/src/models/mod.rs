pub mod order;

pub use order::{OrderItem, OrderRequest, OrderValidationError, SendOrderResponse};
