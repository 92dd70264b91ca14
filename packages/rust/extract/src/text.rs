//! Text helpers over parsed elements.

use scraper::ElementRef;

/// All descendant text, with whitespace runs collapsed and the ends trimmed.
pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    normalize(&el.text().collect::<String>())
}

/// Only the element's own text nodes, normalized like [`element_text`].
pub(crate) fn own_text(el: &ElementRef<'_>) -> String {
    let text: String = el
        .children()
        .filter_map(|node| node.value().as_text())
        .map(|t| &**t)
        .collect();
    normalize(&text)
}

/// Child elements (text and comment nodes are skipped).
pub(crate) fn child_elements<'a>(el: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    el.children().filter_map(ElementRef::wrap)
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Leading integer of a tally cell.
///
/// Cells often carry annotations after the count, as in `"125 (35%)"`; only
/// the first whitespace-separated token is significant. `None` means the cell
/// holds no count (blank, a dash, a heading) and should be skipped.
pub fn parse_count(text: &str) -> Option<u64> {
    text.split_whitespace().next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::{Html, Selector};

    #[test]
    fn parse_count_takes_leading_token() {
        assert_eq!(parse_count("125 (35%)"), Some(125));
        assert_eq!(parse_count("  42 "), Some(42));
        assert_eq!(parse_count("0"), Some(0));
    }

    #[test]
    fn parse_count_rejects_non_counts() {
        assert_eq!(parse_count(""), None);
        assert_eq!(parse_count("N/A"), None);
        assert_eq!(parse_count("12%"), None);
        assert_eq!(parse_count("-3"), None);
    }

    #[test]
    fn own_text_skips_nested_elements() {
        let doc = Html::parse_fragment(r#"<a href="x"> Region <b>bold</b>  X </a>"#);
        let sel = Selector::parse("a").unwrap();
        let a = doc.select(&sel).next().unwrap();
        assert_eq!(own_text(&a), "Region X");
        assert_eq!(element_text(&a), "Region bold X");
    }
}
