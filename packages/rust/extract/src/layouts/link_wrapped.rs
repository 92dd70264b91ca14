//! Results page whose content table is wrapped in an `<a>` element.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{PageLayout, select_all};

static DESCRIPTION_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "html > body > a > table > tbody > tr > td > table > tbody > tr > td > table > tbody > tr",
    )
    .expect("valid description selector")
});

static DATA_ROWS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "html > body > a > table > tbody > tr > td > table > tbody > tr > td > div > table > tbody > tr",
    )
    .expect("valid data selector")
});

static HEADER_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("html > body > a > table > tbody > tr > td > a").expect("valid link selector")
});

pub struct LinkWrappedLayout;

impl PageLayout for LinkWrappedLayout {
    fn description_rows<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        select_all(doc, &DESCRIPTION_ROWS)
    }

    fn data_rows<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        select_all(doc, &DATA_ROWS)
    }

    fn header_links<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        select_all(doc, &HEADER_LINKS)
    }

    fn name(&self) -> &str {
        "link-wrapped"
    }
}
