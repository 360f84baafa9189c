// Calls to the Prokerala API: token grant and request forwarding

pub mod forward;
pub mod issuer;

pub use forward::{ForwardRequest, Forwarder, RelayBody, Relayed};
pub use issuer::HttpTokenIssuer;
