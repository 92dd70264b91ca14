//! Turns one results page into a fragment of location-keyed tallies.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};

use tallycheck_aggregate::AggregatedTable;
use tallycheck_shared::{ExtractConfig, MetricLabel, PathKey, Result, TallycheckError};

use crate::layouts::{LayoutRegistry, PageLayout};
use crate::text::{child_elements, element_text, own_text, parse_count};

static CONTENT_BLOCK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("html > body > table, html > body > a").expect("valid content block selector")
});

/// One row of the description block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptionRow {
    /// Metric label; `None` for section headings.
    pub label: Option<MetricLabel>,
    /// Raw row-total text, e.g. `"450 (45%)"`.
    pub total: String,
}

/// How the tallies of a page were read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// No data block: one `sum_leaf` entry built from the row totals.
    SummaryOnly,
    /// Per-column tallies from the data block.
    Tabular,
}

/// Extracts (path, label, count) facts from parsed results pages.
///
/// Extraction is a pure function of the document, so one extractor can be
/// shared across worker threads.
pub struct TableExtractor {
    config: ExtractConfig,
    registry: LayoutRegistry,
}

impl TableExtractor {
    pub fn new(config: ExtractConfig) -> Self {
        Self {
            config,
            registry: LayoutRegistry::new(),
        }
    }

    /// Parse `html` and extract its fragment.
    pub fn extract_html(&self, html: &str) -> Result<AggregatedTable> {
        let doc = Html::parse_document(html);
        self.extract(&doc)
    }

    /// Extract the fragment of one parsed page.
    ///
    /// Fails with [`TallycheckError::MalformedPage`] when no layout yields a
    /// labeled description row, and with [`TallycheckError::NoGeography`] when
    /// no header location link is found.
    #[instrument(skip_all)]
    pub fn extract(&self, doc: &Html) -> Result<AggregatedTable> {
        let (layout, rows) = self.description_block(doc)?;
        let data = layout.data_rows(doc);
        let geography = self.geography(doc)?;

        let mode = if data.is_empty() {
            ExtractionMode::SummaryOnly
        } else {
            ExtractionMode::Tabular
        };

        debug!(
            layout = layout.name(),
            ?mode,
            description_rows = rows.len(),
            data_rows = data.len(),
            %geography,
            "page structure located"
        );

        let fragment = match mode {
            ExtractionMode::SummaryOnly => self.summary_only(&geography, &rows),
            ExtractionMode::Tabular => tabular(&geography, &rows, &data),
        };

        Ok(fragment)
    }

    /// First layout whose description block has at least one labeled row.
    fn description_block<'a>(
        &'a self,
        doc: &Html,
    ) -> Result<(&'a dyn PageLayout, Vec<DescriptionRow>)> {
        for layout in self.registry.iter() {
            let rows = self.description_rows(&layout.description_rows(doc));
            if rows.iter().any(|row| row.label.is_some()) {
                return Ok((layout, rows));
            }
            debug!(layout = layout.name(), "no row labels under layout");
        }

        let raw = content_block(doc);
        debug!(%raw, "row labels are empty under every layout");
        Err(TallycheckError::malformed_page(&raw))
    }

    fn description_rows(&self, elements: &[ElementRef<'_>]) -> Vec<DescriptionRow> {
        elements
            .iter()
            .filter_map(|row| {
                let cells: Vec<_> = child_elements(row).collect();
                if cells.len() < 3 {
                    return None;
                }
                let text = element_text(&cells[1]);
                let label = (!text.contains(self.config.section_marker.as_str()))
                    .then(|| MetricLabel::new(&text));
                Some(DescriptionRow {
                    label,
                    total: element_text(&cells[2]),
                })
            })
            .collect()
    }

    /// Location path from the first layout whose header has location links.
    fn geography(&self, doc: &Html) -> Result<PathKey> {
        let mut last_links = String::new();

        for layout in self.registry.iter() {
            let links = layout.header_links(doc);
            let coords: Vec<String> = links
                .iter()
                .filter(|a| {
                    a.value()
                        .attr("href")
                        .is_some_and(|href| href.contains(self.config.location_marker.as_str()))
                })
                .map(own_text)
                .collect();

            if !coords.is_empty() {
                return Ok(PathKey::filtered(coords, &self.config.stop_words));
            }

            debug!(layout = layout.name(), links = links.len(), "no location links under layout");
            last_links = links.iter().map(|a| a.html()).collect::<Vec<_>>().join(" ");
        }

        Err(TallycheckError::no_geography(&last_links))
    }

    fn summary_only(&self, geography: &PathKey, rows: &[DescriptionRow]) -> AggregatedTable {
        let mut fragment = AggregatedTable::new();
        let leaf = geography.extend(self.config.sum_leaf.as_str());

        for row in rows {
            let Some(label) = &row.label else { continue };
            if row.total.is_empty() {
                continue;
            }
            match parse_count(&row.total) {
                Some(count) => {
                    fragment.insert(leaf.clone(), label.clone(), count);
                }
                None => debug!(%label, total = %row.total, "row total holds no count, skipping"),
            }
        }

        fragment
    }
}

/// Per-column tallies: the first data row names the columns, and each later
/// row that yields at least one count consumes the next label.
fn tabular(geography: &PathKey, rows: &[DescriptionRow], data: &[ElementRef<'_>]) -> AggregatedTable {
    let mut fragment = AggregatedTable::new();

    let columns: Vec<String> = child_elements(&data[0]).map(|cell| element_text(&cell)).collect();
    let labels: Vec<&MetricLabel> = rows.iter().filter_map(|row| row.label.as_ref()).collect();
    let mut cursor = 0;

    for (index, row) in data.iter().enumerate().skip(1) {
        let Some(&label) = labels.get(cursor) else {
            debug!(row = index, "data rows outnumber labels, ignoring the rest");
            break;
        };

        let mut consumed = false;
        for (column, cell) in child_elements(row).enumerate() {
            let Some(count) = parse_count(&element_text(&cell)) else {
                continue;
            };
            consumed = true;

            match columns.get(column).filter(|name| !name.is_empty()) {
                Some(name) => {
                    fragment.insert(geography.extend(name.as_str()), label.clone(), count);
                }
                None => debug!(row = index, column, "count under unnamed column, skipping"),
            }
        }

        if consumed {
            cursor += 1;
        }
    }

    fragment
}

/// Markup of the page's content block, for diagnostics.
fn content_block(doc: &Html) -> String {
    doc.select(&CONTENT_BLOCK)
        .next()
        .map(|el| el.html())
        .unwrap_or_else(|| doc.root_element().html())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> TableExtractor {
        TableExtractor::new(ExtractConfig::default())
    }

    fn page(header: &str, descriptions: &str, data: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><body><table>
<tr><td>{header}</td></tr>
<tr><td><table><tr>
<td><table>{descriptions}</table></td>
<td>{data}</td>
</tr></table></td></tr>
</table></body></html>"#
        )
    }

    const HEADER: &str = r#"<a href="/vybory?region=1">RegionX</a>"#;

    #[test]
    fn rows_with_fewer_than_three_cells_are_ignored() {
        let html = page(
            HEADER,
            "<tr><td>Only</td><td>two</td></tr><tr><td>1</td><td>Turnout</td><td>7</td></tr>",
            "",
        );
        let fragment = extractor().extract_html(&html).unwrap();
        let leaf: PathKey = ["RegionX", "Sum"].into_iter().collect();
        assert_eq!(fragment.count(&leaf, &MetricLabel::from("Turnout")), 7);
        assert_eq!(fragment.labels().len(), 1);
    }

    #[test]
    fn summary_only_skips_unparsable_totals() {
        let html = page(
            HEADER,
            "<tr><td>1</td><td>Turnout</td><td>high</td></tr>\
             <tr><td>2</td><td>Spoiled ballots</td><td>3 (1%)</td></tr>",
            "",
        );
        let fragment = extractor().extract_html(&html).unwrap();
        let leaf: PathKey = ["RegionX", "Sum"].into_iter().collect();
        assert_eq!(fragment.labels().len(), 1);
        assert_eq!(fragment.count(&leaf, &MetricLabel::from("Spoiled ballots")), 3);
    }

    #[test]
    fn extra_data_rows_beyond_labels_are_ignored() {
        let html = page(
            HEADER,
            "<tr><td>1</td><td>Turnout</td><td>7</td></tr>",
            "<div><table><tr><td>A</td></tr><tr><td>4</td></tr><tr><td>9</td></tr></table></div>",
        );
        let fragment = extractor().extract_html(&html).unwrap();
        let leaf: PathKey = ["RegionX", "A"].into_iter().collect();
        assert_eq!(fragment.count(&leaf, &MetricLabel::from("Turnout")), 4);
        assert_eq!(fragment.len(), 1);
    }

    #[test]
    fn counts_under_unnamed_columns_are_skipped() {
        let html = page(
            HEADER,
            "<tr><td>1</td><td>Turnout</td><td>7</td></tr>",
            "<div><table><tr><td>A</td><td></td></tr><tr><td>4</td><td>5</td><td>6</td></tr></table></div>",
        );
        let fragment = extractor().extract_html(&html).unwrap();
        assert_eq!(fragment.len(), 1);
        assert_eq!(fragment.rollup(&PathKey::root()).total(), 4);
    }

    #[test]
    fn custom_markers_are_honored() {
        let config = ExtractConfig {
            section_marker: "SECTION".into(),
            location_marker: "area".into(),
            sum_leaf: "Total".into(),
            stop_words: vec!["Home".into()],
        };
        let html = page(
            r#"<a href="/area/0">Home page</a><a href="/area/3">North</a>"#,
            "<tr><td></td><td>SECTION A</td><td>1</td></tr><tr><td>1</td><td>Votes</td><td>11</td></tr>",
            "",
        );
        let fragment = TableExtractor::new(config).extract_html(&html).unwrap();
        let leaf: PathKey = ["North", "Total"].into_iter().collect();
        assert_eq!(fragment.count(&leaf, &MetricLabel::from("Votes")), 11);
        assert_eq!(fragment.labels().len(), 1);
    }
}
