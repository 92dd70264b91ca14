//! Core domain types: location paths, metric labels, and tiers.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// PathKey
// ---------------------------------------------------------------------------

/// Hierarchical location of a commission or polling unit, outermost first.
///
/// Components are never blank. Ordering is positional: components are compared
/// one by one up to the longer length, and a missing component counts as the
/// empty string, so `[a, b]` sorts before `[a, b, c]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PathKey(Vec<String>);

impl PathKey {
    /// The empty path (the root of the hierarchy).
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a path from raw location names, dropping blank names and any name
    /// that contains one of `stop_words` (site banners, navigation labels).
    pub fn filtered<I, S>(components: I, stop_words: &[String]) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let coords = components
            .into_iter()
            .filter(|c| !is_stop_component(c.as_ref(), stop_words))
            .map(|c| c.as_ref().trim().to_string())
            .collect();
        Self(coords)
    }

    /// A new path with `name` appended as the finest-grained component.
    /// A blank `name` leaves the path unchanged.
    pub fn extend(&self, name: impl Into<String>) -> Self {
        let mut coords = self.0.clone();
        let name = name.into();
        if !name.trim().is_empty() {
            coords.push(name);
        }
        Self(coords)
    }

    /// The first `len` components (the whole path if it is shorter).
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0.iter().take(len).cloned().collect())
    }

    /// Component at `index`, or `""` past the end.
    pub fn get(&self, index: usize) -> &str {
        self.0.get(index).map(String::as_str).unwrap_or("")
    }

    pub fn components(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Case-insensitive, component-wise prefix test.
    ///
    /// Components of `prefix` past the end of `self` are compared against `""`.
    pub fn starts_with_ignore_case(&self, prefix: &PathKey) -> bool {
        prefix
            .0
            .iter()
            .enumerate()
            .all(|(i, component)| eq_ignore_case(self.get(i), component))
    }
}

fn is_stop_component(component: &str, stop_words: &[String]) -> bool {
    component.trim().is_empty() || stop_words.iter().any(|stop| component.contains(stop.as_str()))
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

impl Ord for PathKey {
    fn cmp(&self, other: &Self) -> Ordering {
        (0..self.len().max(other.len()))
            .map(|i| self.get(i).cmp(other.get(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for PathKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Collects components as-is, dropping blank ones.
impl<S: Into<String>> FromIterator<S> for PathKey {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .filter(|c: &String| !c.trim().is_empty())
                .collect(),
        )
    }
}

impl fmt::Display for PathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

// ---------------------------------------------------------------------------
// MetricLabel
// ---------------------------------------------------------------------------

/// The text of one tally row, e.g. "Ballots issued".
///
/// Labels are trimmed on construction and ordered by their text, which keeps
/// the global column order stable no matter which page a label came from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MetricLabel(String);

impl MetricLabel {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(text.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MetricLabel {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl fmt::Display for MetricLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

/// One level of the administrative hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Central commission pages.
    Top,
    /// Territorial commission pages.
    Territorial,
    /// Precinct (polling station) pages.
    Precinct,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Top, Tier::Territorial, Tier::Precinct];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Top => "top",
            Tier::Territorial => "territorial",
            Tier::Precinct => "precinct",
        }
    }

    /// Pairs compared by cross-validation, in report order.
    pub fn pairs() -> [(Tier, Tier); 3] {
        [
            (Tier::Top, Tier::Territorial),
            (Tier::Top, Tier::Precinct),
            (Tier::Territorial, Tier::Precinct),
        ]
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(components: &[&str]) -> PathKey {
        components.iter().copied().collect()
    }

    #[test]
    fn shorter_path_sorts_first() {
        let p = path(&["a", "b"]);
        let q = path(&["a", "b", "c"]);
        assert!(p < q);
        assert_eq!(q.cmp(&p), Ordering::Greater);
    }

    #[test]
    fn comparison_is_positional() {
        assert!(path(&["a", "z"]) < path(&["b"]));
        assert!(path(&["b"]) > path(&["a", "z", "z"]));
        assert_eq!(path(&["a", "b"]).cmp(&path(&["a", "b"])), Ordering::Equal);
    }

    #[test]
    fn stop_words_and_blanks_are_filtered() {
        let stop = vec!["ЦИК России".to_string(), "Выборы".to_string()];
        let key = PathKey::filtered(
            ["ЦИК России", "  ", "RegionX", "Выборы и референдумы", "DistrictY"],
            &stop,
        );
        assert_eq!(key, path(&["RegionX", "DistrictY"]));
    }

    #[test]
    fn extend_returns_new_path() {
        let base = path(&["RegionX"]);
        let leaf = base.extend("UIK#1");
        assert_eq!(base.len(), 1);
        assert_eq!(leaf, path(&["RegionX", "UIK#1"]));
    }

    #[test]
    fn prefix_match_ignores_case() {
        let key = path(&["Region X", "District Y", "УИК №1"]);
        assert!(key.starts_with_ignore_case(&path(&["region x"])));
        assert!(key.starts_with_ignore_case(&path(&["REGION X", "district y", "уик №1"])));
        assert!(key.starts_with_ignore_case(&PathKey::root()));
        assert!(!key.starts_with_ignore_case(&path(&["Region Z"])));
        assert!(!path(&["Region X"]).starts_with_ignore_case(&path(&["Region X", "District Y"])));
    }

    #[test]
    fn get_past_end_is_empty() {
        let key = path(&["a"]);
        assert_eq!(key.get(0), "a");
        assert_eq!(key.get(3), "");
    }

    #[test]
    fn display_lists_components() {
        assert_eq!(path(&["RegionX", "DistrictY"]).to_string(), "[RegionX, DistrictY]");
        assert_eq!(PathKey::root().to_string(), "[]");
    }

    #[test]
    fn labels_are_trimmed_and_ordered_by_text() {
        assert_eq!(MetricLabel::new("  Turnout "), MetricLabel::from("Turnout"));
        assert!(MetricLabel::from("Ballots issued") < MetricLabel::from("Registered voters"));
    }
}
