// Upstream module - signed calls to the AI search service

pub mod client;
pub mod signer;
