//! Resilience utilities: category-aware retry and token-bucket rate limiting.

pub mod rate_limit;
pub mod retry;

pub use rate_limit::TokenBucket;
pub use retry::RetryPolicy;
