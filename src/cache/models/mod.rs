pub mod token;

pub use token::{CachedToken, DEFAULT_LIFETIME, EXPIRY_MARGIN, IssuedToken, MAX_LIFETIME};
