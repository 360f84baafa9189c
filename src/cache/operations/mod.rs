pub mod token;

pub use token::{Clock, SystemClock, TokenIssuer, TokenManager};
