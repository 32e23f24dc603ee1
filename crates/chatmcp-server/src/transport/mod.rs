//! Transport bindings for the session runtime: line-delimited stdio for a
//! single long-lived process, and streamable HTTP with SSE for many
//! concurrent, resumable sessions.

pub mod http;
pub mod stdio;

pub use http::{router, HttpState};
pub use stdio::serve_stdio;
