//! Tabular export of an aggregated table.
//!
//! ```text
//! "Coordinate 1","Coordinate 2","Unit","Ballots issued","Registered voters"
//! "RegionX","DistrictY","UIK#1",50,100
//! ```
//!
//! Text fields are quoted and counts are bare integers, 0 when a label is
//! absent. Double quotes inside a field are stripped rather than escaped.

use std::io::{self, Write};

use tallycheck_aggregate::AggregatedTable;

/// Write `table` as CSV, one row per path in table order.
pub fn write_csv<W: Write>(table: &AggregatedTable, out: W) -> io::Result<()> {
    let coordinates = table.max_depth().saturating_sub(1);
    let labels = table.labels();

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(out);

    let header: Vec<String> = (1..=coordinates)
        .map(|c| format!("Coordinate {c}"))
        .chain(std::iter::once("Unit".to_string()))
        .chain(labels.iter().map(|label| strip_quotes(label.as_str())))
        .collect();
    writer.write_record(&header)?;

    for (path, record) in table.iter() {
        let row: Vec<String> = (0..=coordinates)
            .map(|c| strip_quotes(path.get(c)))
            .chain(labels.iter().map(|label| record.count(label).to_string()))
            .collect();
        writer.write_record(&row)?;
    }

    writer.flush()
}

/// Render `table` as a CSV string.
pub fn render_csv(table: &AggregatedTable) -> io::Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn strip_quotes(field: &str) -> String {
    field.replace('"', "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tallycheck_shared::{MetricLabel, PathKey};

    fn path(components: &[&str]) -> PathKey {
        components.iter().copied().collect()
    }

    #[test]
    fn header_and_rows() {
        let mut t = AggregatedTable::new();
        t.insert(path(&["RegionX", "DistrictY", "UIK#1"]), MetricLabel::from("Registered voters"), 100);
        t.insert(path(&["RegionX", "DistrictY", "UIK#1"]), MetricLabel::from("Ballots issued"), 50);
        t.insert(path(&["RegionX", "DistrictY", "UIK#2"]), MetricLabel::from("Registered voters"), 200);

        let csv = render_csv(&t).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines,
            vec![
                r#""Coordinate 1","Coordinate 2","Unit","Ballots issued","Registered voters""#,
                r#""RegionX","DistrictY","UIK#1",50,100"#,
                r#""RegionX","DistrictY","UIK#2",0,200"#,
            ]
        );
    }

    #[test]
    fn short_paths_are_padded() {
        let mut t = AggregatedTable::new();
        t.insert(path(&["A", "B", "C"]), MetricLabel::from("x"), 1);
        t.insert(path(&["A", "Sum"]), MetricLabel::from("x"), 2);

        let csv = render_csv(&t).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[1], r#""A","B","C",1"#);
        assert_eq!(lines[2], r#""A","Sum","",2"#);
    }

    #[test]
    fn quotes_are_stripped() {
        let mut t = AggregatedTable::new();
        t.insert(path(&["\"Quoted\" region", "UIK"]), MetricLabel::from("Votes for \"Party\""), 3);

        let csv = render_csv(&t).unwrap();
        assert!(csv.starts_with(r#""Coordinate 1","Unit","Votes for Party""#));
        assert!(csv.contains(r#""Quoted region","UIK",3"#));
    }

    #[test]
    fn explicit_zero_is_written_like_absence() {
        let mut t = AggregatedTable::new();
        t.insert(path(&["R", "U1"]), MetricLabel::from("Spoiled"), 0);
        t.insert(path(&["R", "U2"]), MetricLabel::from("Votes"), 4);

        let csv = render_csv(&t).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], r#""Coordinate 1","Unit","Spoiled","Votes""#);
        assert_eq!(lines[1], r#""R","U1",0,0"#);
        assert_eq!(lines[2], r#""R","U2",0,4"#);
    }

    #[test]
    fn empty_table_has_header_only() {
        assert_eq!(render_csv(&AggregatedTable::new()).unwrap(), "\"Unit\"\n");
    }
}
