mod errors;
mod fraud;
mod gold;
mod mapper;

pub use errors::TransformError;
pub use fraud::FraudTransform;
pub use gold::GoldAggregator;
pub use mapper::TransactionMapper;
