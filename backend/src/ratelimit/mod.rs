pub mod limiter;
pub mod middleware;

pub use limiter::{RateLimit, RateLimiter};
pub use middleware::RateLimitMiddleware;
