//! Results page extraction.
//!
//! This crate provides:
//! - [`layouts`]: structural queries for the known page variants
//! - [`TableExtractor`]: reads one page into a fragment of location-keyed tallies

mod extractor;
pub mod layouts;
mod text;

pub use extractor::{DescriptionRow, ExtractionMode, TableExtractor};
pub use layouts::{LayoutRegistry, LinkWrappedLayout, PageLayout, StandardLayout};
pub use text::parse_count;
