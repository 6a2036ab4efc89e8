//! Edges the host application touches: deep links, the challenge redirect
//! document, and scenario files for the demo binary.

pub mod deep_link;
pub mod redirect;
pub mod scenario;
