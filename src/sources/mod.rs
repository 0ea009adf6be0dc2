//! Document sources.
//!
//! Walks a local directory and turns each supported file into a [`Document`]
//! through the per-format extractor on [`DocumentFormat`].
//!
//! [`Document`]: crate::models::Document
//! [`DocumentFormat`]: crate::models::DocumentFormat

mod extract;
mod local;

pub use extract::docx_xml_to_text;
pub use local::{DocumentLoader, LoadOutcome, SkippedFile};
