//! Small MCP servers used to try Conduit end to end.
//!
//! Both servers share [`DemoServer`], which answers `initialize`,
//! `tools/list` and `tools/call` for a fixed set of tools. `mathy` speaks
//! newline-delimited JSON-RPC over stdio; `remote-random` serves the same
//! protocol over HTTP POST.

pub mod remote;
pub mod server;
pub mod tools;

pub use remote::router;
pub use server::{DemoServer, DemoTool};

/// The `mathy` server: `get-random` and `add`.
pub fn mathy() -> DemoServer {
    DemoServer::new("mathy", vec![tools::get_random(), tools::add()])
}

/// The `remote-random` server: `get-random` only.
pub fn remote_random() -> DemoServer {
    DemoServer::new("remote-random", vec![tools::get_random()])
}
