//! Application layer: the payment orchestrator and the steps it sequences.
//!
//! `PaymentOrchestrator` runs one attempt as a single async task: tokenize,
//! initialize, then (when the gateway asks for them) device-data collection
//! and a step-up challenge, and finally the server-guided settlement poll.

pub mod challenge;
pub mod data_collection;
pub mod orchestrator;
pub mod poller;
