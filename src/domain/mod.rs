//! Domain layer: payment attempt data, classification rules and the ports
//! the application layer talks through.

pub mod attempt;
pub mod challenge;
pub mod gateway;
pub mod money;
pub mod outcome;
pub mod ports;
pub mod request;
pub mod status;
pub mod token;
