pub mod ping;
pub mod proxy;
