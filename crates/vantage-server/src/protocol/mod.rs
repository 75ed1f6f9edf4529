//! The §6.1 RPC surface, transport-agnostic at the `server::VantageServer`
//! layer and exposed here over HTTP/SSE.

pub mod http;
pub mod types;
