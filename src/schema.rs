//! Header (schema) handling.
//!
//! The first row of every sheet is its schema. Ragged data forces the codec
//! to invent column names (a row wider than the header, or a blank header
//! cell); those synthetic names are kept on the table for positional access
//! but stripped from everything user-visible and from the header used when a
//! sheet is written back.

use crate::workbook::{cell_text, Record, Table};

const PLACEHOLDER_PREFIX: &str = "__empty";

/// Synthetic name for the column at `index` (0-based position in the raw
/// header).
pub fn placeholder(index: usize) -> String {
    format!("{}_{}", PLACEHOLDER_PREFIX, index + 1)
}

pub fn is_placeholder(name: &str) -> bool {
    name.is_empty() || name.starts_with(PLACEHOLDER_PREFIX)
}

/// The user-visible schema: raw header with placeholder entries removed.
pub fn clean_header(header: &[String]) -> Vec<String> {
    header
        .iter()
        .filter(|h| !is_placeholder(h))
        .cloned()
        .collect()
}

/// Merge new column names into an existing header: the existing order is
/// preserved and novel names are appended in first-seen order. This is what
/// grows the schema when a write introduces a column; older rows pick up the
/// empty-string default for it on the next read.
pub fn merged_header<'a, I>(existing: &[String], new_keys: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut merged: Vec<String> = existing.to_vec();
    for key in new_keys {
        if !merged.iter().any(|h| h == key) {
            merged.push(key.clone());
        }
    }
    merged
}

/// A record as handed back to callers: placeholder keys removed. Cells that
/// only exist under a synthetic column are not part of the record's schema.
pub fn display_record(record: &Record) -> Record {
    record
        .iter()
        .filter(|(k, _)| !is_placeholder(k))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

/// True when every value in the record is the empty string. Rows like this
/// carry no data once their placeholder cells are stripped.
pub fn is_blank_record(record: &Record) -> bool {
    record.values().all(|v| cell_text(v).is_empty())
}

/// The header a table is serialized against: its cleaned header extended by
/// every non-placeholder column any record carries. Cells held under
/// placeholder columns do not survive a rewrite.
pub fn write_header(table: &Table) -> Vec<String> {
    let mut header = clean_header(&table.header);
    for record in &table.records {
        header = merged_header(
            &header,
            record.keys().filter(|k| !is_placeholder(k.as_str())),
        );
    }
    header
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::Record;
    use serde_json::json;

    fn owned(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn clean_header_strips_placeholders_and_blanks() {
        let header = owned(&["ID", "", "__empty_3", "Name"]);
        assert_eq!(clean_header(&header), owned(&["ID", "Name"]));
    }

    #[test]
    fn merged_header_appends_novel_keys_in_first_seen_order() {
        let existing = owned(&["ID", "Name"]);
        let new = owned(&["Name", "Email", "ID", "Phone"]);
        assert_eq!(
            merged_header(&existing, new.iter()),
            owned(&["ID", "Name", "Email", "Phone"])
        );
    }

    #[test]
    fn merged_header_with_no_new_keys_is_identity() {
        let existing = owned(&["A", "B"]);
        let none: Vec<String> = Vec::new();
        assert_eq!(merged_header(&existing, &none), existing);
    }

    #[test]
    fn display_record_drops_placeholder_keys() {
        let mut record = Record::new();
        record.insert("ID".into(), json!("1"));
        record.insert("__empty_2".into(), json!("stray"));
        let shown = display_record(&record);
        assert_eq!(shown.len(), 1);
        assert_eq!(shown.get("ID"), Some(&json!("1")));
    }

    #[test]
    fn blank_record_means_every_value_is_empty() {
        let mut record = Record::new();
        record.insert("A".into(), json!(""));
        record.insert("B".into(), json!(null));
        assert!(is_blank_record(&record));
        record.insert("C".into(), json!("x"));
        assert!(!is_blank_record(&record));
        assert!(is_blank_record(&Record::new()));
    }

    #[test]
    fn write_header_ignores_placeholder_record_keys() {
        let mut table = crate::workbook::Table::new(owned(&["ID", "__empty_2"]));
        let mut record = Record::new();
        record.insert("ID".into(), json!("1"));
        record.insert("__empty_2".into(), json!("stray"));
        record.insert("Extra".into(), json!("x"));
        table.records.push(record);
        assert_eq!(write_header(&table), owned(&["ID", "Extra"]));
    }
}
