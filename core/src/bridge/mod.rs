//! Raw TCP to HTTP bridge
//!
//! Lets plain socket clients (`nc`, `telnet`) use the clipboard: the first
//! bytes of a connection are peeked to detect `help` or an optional
//! `pcopy:<path>` line, and the rest of the stream is handed to an in-process
//! HTTP handler as the body of a `PUT`.

mod connection;
mod server;
pub mod stream;
mod upstream;

pub use server::{BridgeConfig, BridgeHandle, TcpBridge};
pub use upstream::{RequestBody, RouterUpstream, Upstream, UpstreamRequest, UpstreamResponse};
