mod cors;
mod error_handler;

pub use cors::{ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN, with_cors};
pub use error_handler::log_errors;
