//! Markdown post-processing for agent answers.
//!
//! The agent replies in Markdown. Clients that can't render it get a
//! flattened plain-text copy, and hyperlinks are pulled out separately so
//! they can be shown as a list of sources.
mod flatten;
mod links;

pub use flatten::flatten;
pub use links::{SourceItem, extract_links};
