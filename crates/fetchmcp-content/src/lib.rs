//! Content processors: sniffing a body's content type, cleaning HTML
//! down to Markdown, and the LLM-extraction seam.
//!
//! Cleaning walks the parsed DOM tree once, dropping boilerplate
//! elements by tag and class before flattening the rest to Markdown.
//! Extraction sits behind a trait so a
//! structured extractor (prompt in, typed result out) can be configured
//! in; absent configuration it degrades to a no-op gracefully.

mod clean;
mod detect;
mod extract;

pub use clean::clean_html;
pub use detect::{detect_content_type, DetectedType};
pub use extract::{ExtractionOutcome, ExtractionProvider, NoExtractionProvider};
