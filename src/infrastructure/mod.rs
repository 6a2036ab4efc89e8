//! Adapters for the ports in `domain::ports`.

pub mod clock;
#[cfg(feature = "http-gateway")]
pub mod http;
pub mod scripted;
pub mod wire;
