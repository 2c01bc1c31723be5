//! Scan result records.
use std::collections::HashMap;

use crate::error::Result;

/// One scan result: output field name to value.
pub type ScanRecord = HashMap<String, String>;

/// Parses result output for the given output fields.
///
/// zmap prints a bare column when exactly one field is selected and
/// header-framed CSV otherwise.
pub fn parse_results(data: &[u8], fields: &[String]) -> Result<Vec<ScanRecord>> {
    match fields {
        [field] => Ok(parse_single_column(&String::from_utf8_lossy(data), field)),
        _ => parse_with_header(data),
    }
}

/// Each line is one record holding `field`.
pub fn parse_single_column(text: &str, field: &str) -> Vec<ScanRecord> {
    text.lines()
        .map(|line| ScanRecord::from([(field.to_owned(), line.to_owned())]))
        .collect()
}

/// The first row names the columns, every following row is a record.
pub fn parse_with_header(data: &[u8]) -> Result<Vec<ScanRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(data);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        records.push(
            headers
                .iter()
                .zip(row.iter())
                .map(|(name, value)| (name.to_owned(), value.to_owned()))
                .collect(),
        );
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScanError;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_field_is_a_bare_column() {
        let records = parse_results(b"1.1.1.1\n2.2.2.2\n", &fields(&["saddr"])).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["saddr"], "1.1.1.1");
        assert_eq!(records[1]["saddr"], "2.2.2.2");
        assert_eq!(records[1].len(), 1);
    }

    #[test]
    fn single_field_does_not_split_on_commas() {
        let records = parse_single_column("a,b\n", "data");
        assert_eq!(records[0]["data"], "a,b");
    }

    #[test]
    fn several_fields_use_header() {
        let data = b"saddr,sport,classification\n1.1.1.1,80,synack\n2.2.2.2,443,rst\n";
        let records =
            parse_results(data, &fields(&["saddr", "sport", "classification"])).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["saddr"], "1.1.1.1");
        assert_eq!(records[1]["sport"], "443");
        assert_eq!(records[1]["classification"], "rst");
    }

    #[test]
    fn header_names_come_from_output_not_request() {
        let records = parse_with_header(b"daddr,ttl\n9.9.9.9,64\n").unwrap();
        assert_eq!(records[0]["ttl"], "64");
        assert!(!records[0].contains_key("saddr"));
    }

    #[test]
    fn empty_output_has_no_records() {
        assert!(parse_results(b"", &fields(&["saddr"])).unwrap().is_empty());
        assert!(parse_results(b"", &fields(&["saddr", "sport"]))
            .unwrap()
            .is_empty());
        assert!(parse_results(b"saddr,sport\n", &fields(&["saddr", "sport"]))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn ragged_rows_are_an_error() {
        let err = parse_with_header(b"saddr,sport\n1.1.1.1\n").unwrap_err();
        assert!(matches!(err, ScanError::Csv(_)));
    }
}
