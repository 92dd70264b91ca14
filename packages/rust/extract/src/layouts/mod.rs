//! Page layout trait and the known layouts of results pages.
//!
//! Results pages share one table structure, but some of them wrap the whole
//! content in a hyperlink, which shifts every structural path one level down.
//! Each layout knows where the description block, the data block, and the
//! header location links live for one such variant.

mod link_wrapped;
mod standard;

use scraper::{ElementRef, Html, Selector};

pub use link_wrapped::LinkWrappedLayout;
pub use standard::StandardLayout;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Structural queries for one page variant.
pub trait PageLayout: Send + Sync {
    /// Rows of the description block (index cell, label cell, row-total cell).
    fn description_rows<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>>;

    /// Rows of the data block; the first row names the columns.
    fn data_rows<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>>;

    /// Hyperlinks in the page header, some of which form the location path.
    fn header_links<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>>;

    /// Human-readable layout name for tracing.
    fn name(&self) -> &str;
}

pub(crate) fn select_all<'a>(doc: &'a Html, selector: &Selector) -> Vec<ElementRef<'a>> {
    doc.select(selector).collect()
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds known layouts in the order they are tried.
pub struct LayoutRegistry {
    layouts: Vec<Box<dyn PageLayout>>,
}

impl LayoutRegistry {
    /// Create a registry with the built-in layouts (plain first, link-wrapped second).
    pub fn new() -> Self {
        Self {
            layouts: vec![Box::new(StandardLayout), Box::new(LinkWrappedLayout)],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn PageLayout> {
        self.layouts.iter().map(|layout| layout.as_ref())
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}
