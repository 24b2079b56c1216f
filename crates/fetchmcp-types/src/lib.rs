//! Shared data model and error taxonomy for the fetchmcp ingestion service.
//!
//! Every other crate in the workspace depends on this one; it carries no
//! I/O and no async runtime, only the types both sides of a boundary need
//! to agree on.

pub mod content;
pub mod crawl;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod options;
pub mod resource;
pub mod session;
pub mod strategy;

pub use content::ContentBlock;
pub use diagnostics::ScrapeDiagnostics;
pub use error::{IngestError, IngestResult};
pub use options::ResultHandling;
pub use resource::{ResourceHeader, ResourceTier, ResourceUri};
pub use strategy::FetchStrategy;
