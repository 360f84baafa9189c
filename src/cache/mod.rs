// Process-wide bearer token cache

pub mod models;
pub mod operations;

pub use models::{CachedToken, IssuedToken};
pub use operations::{Clock, SystemClock, TokenIssuer, TokenManager};
