//! The MCP network surface: process configuration, session-routed
//! JSON-RPC dispatch, the four tool handlers, HTTP routes, and the
//! stdio transport for single-process cooperative deployments.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod stdio;

pub use config::ServiceConfig;
pub use state::AppState;
