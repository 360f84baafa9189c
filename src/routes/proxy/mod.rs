mod handler;
pub mod model;

pub use handler::{method_not_allowed, preflight, proxy};
