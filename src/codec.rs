//! Tabular codec: converts between on-disk bytes and an in-memory
//! [`Workbook`], behind a single [`Dialect`] switch.
//!
//! Two dialects are supported:
//!
//! - **Delimited** (`.csv`): single-sheet comma-delimited text. Lines are
//!   split on line breaks and then on the delimiter with no quoting or
//!   escaping, so a literal comma inside a field is not supported. This is a
//!   known limitation.
//! - **Packed** (`.wbk`): multi-sheet binary, a gzip-compressed bincode
//!   encoding of a version-tagged grid model. All sheets round-trip, in
//!   order.
//!
//! A missing cell always decodes to the empty string, never to null.

use std::io::{Read, Write};
use std::path::Path;

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::schema;
use crate::workbook::{Record, Sheet, Table, Workbook};

pub const DELIMITED_EXTENSION: &str = "csv";
pub const PACKED_EXTENSION: &str = "wbk";

/// Sheet name given to the single sheet of a delimited file.
pub const DEFAULT_SHEET: &str = "Sheet1";

const DELIMITER: char = ',';
const PACKED_VERSION: u32 = 1;

/// On-disk format variant. A tagged choice dispatched over, not a trait
/// hierarchy: the two forms share almost no mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Delimited,
    Packed,
}

impl Dialect {
    pub fn extension(&self) -> &'static str {
        match self {
            Dialect::Delimited => DELIMITED_EXTENSION,
            Dialect::Packed => PACKED_EXTENSION,
        }
    }

    /// Dialect for a file path, by extension.
    pub fn for_path(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some(DELIMITED_EXTENSION) => Ok(Dialect::Delimited),
            Some(PACKED_EXTENSION) => Ok(Dialect::Packed),
            Some(other) => Err(StoreError::invalid(format!(
                "unsupported file extension: {other}"
            ))),
            None => Err(StoreError::invalid("file name has no extension")),
        }
    }

    pub fn is_known_path(path: &Path) -> bool {
        Dialect::for_path(path).is_ok()
    }
}

// Packed on-disk model. Cells are stored as text grids rather than JSON
// values because bincode is not self-describing.
#[derive(Serialize, Deserialize)]
struct PackedWorkbook {
    version: u32,
    sheets: Vec<PackedSheet>,
}

#[derive(Serialize, Deserialize)]
struct PackedSheet {
    name: String,
    rows: Vec<Vec<String>>,
}

/// Decode raw file bytes into a workbook.
pub fn decode(bytes: &[u8], dialect: Dialect) -> Result<Workbook> {
    match dialect {
        Dialect::Delimited => decode_delimited(bytes),
        Dialect::Packed => decode_packed(bytes),
    }
}

/// Encode a workbook to raw file bytes. Only the packed dialect can express
/// more than one sheet.
pub fn encode(workbook: &Workbook, dialect: Dialect) -> Result<Vec<u8>> {
    match dialect {
        Dialect::Delimited => encode_delimited(workbook),
        Dialect::Packed => encode_packed(workbook),
    }
}

/// Read and decode the file at `path`, picking the dialect from its
/// extension.
pub fn load(path: &Path) -> Result<Workbook> {
    let dialect = Dialect::for_path(path)?;
    let bytes = std::fs::read(path)?;
    decode(&bytes, dialect)
}

/// Encode and overwrite the file at `path`.
pub fn save(path: &Path, workbook: &Workbook) -> Result<()> {
    let dialect = Dialect::for_path(path)?;
    let bytes = encode(workbook, dialect)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn decode_delimited(bytes: &[u8]) -> Result<Workbook> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| StoreError::invalid("delimited file is not valid UTF-8"))?;
    let rows: Vec<Vec<String>> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split(DELIMITER).map(str::to_string).collect())
        .collect();
    Ok(Workbook::single(DEFAULT_SHEET, table_from_rows(&rows)))
}

fn encode_delimited(workbook: &Workbook) -> Result<Vec<u8>> {
    let sheet = match workbook.sheets.as_slice() {
        [sheet] => sheet,
        [] => return Err(StoreError::invalid("workbook has no sheets")),
        _ => {
            return Err(StoreError::invalid(
                "delimited format cannot hold a multi-sheet workbook",
            ))
        }
    };
    let mut out = String::new();
    for row in rows_from_table(&sheet.table) {
        out.push_str(&row.join(&DELIMITER.to_string()));
        out.push('\n');
    }
    Ok(out.into_bytes())
}

fn decode_packed(bytes: &[u8]) -> Result<Workbook> {
    let mut decoder = GzDecoder::new(bytes);
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(|_| StoreError::invalid("not a packed workbook (bad compression)"))?;
    let packed: PackedWorkbook = bincode::deserialize(&raw)
        .map_err(|_| StoreError::invalid("not a packed workbook (bad encoding)"))?;
    if packed.version != PACKED_VERSION {
        return Err(StoreError::invalid(format!(
            "unsupported packed workbook version {}",
            packed.version
        )));
    }
    let sheets = packed
        .sheets
        .into_iter()
        .map(|s| Sheet {
            name: s.name,
            table: table_from_rows(&s.rows),
        })
        .collect();
    Ok(Workbook { sheets })
}

fn encode_packed(workbook: &Workbook) -> Result<Vec<u8>> {
    let packed = PackedWorkbook {
        version: PACKED_VERSION,
        sheets: workbook
            .sheets
            .iter()
            .map(|s| PackedSheet {
                name: s.name.clone(),
                rows: rows_from_table(&s.table),
            })
            .collect(),
    };
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    bincode::serialize_into(&mut encoder, &packed)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    encoder.flush()?;
    Ok(encoder.finish()?)
}

/// Build a table from a text grid. Row 0 is the header; blank header cells
/// and columns beyond the header's width get synthetic placeholder names so
/// every cell stays positionally addressable. Short rows fill in with empty
/// strings.
fn table_from_rows(rows: &[Vec<String>]) -> Table {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let raw_header = rows.first().cloned().unwrap_or_default();
    let header: Vec<String> = (0..width)
        .map(|i| match raw_header.get(i) {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => schema::placeholder(i),
        })
        .collect();

    let records = rows
        .iter()
        .skip(1)
        .map(|row| {
            let mut record = Record::new();
            for (i, column) in header.iter().enumerate() {
                let value = row.get(i).cloned().unwrap_or_default();
                record.insert(column.clone(), Value::String(value));
            }
            record
        })
        .collect();

    Table { header, records }
}

/// Serialize a table back to a text grid against its merged write header.
/// Placeholder columns are dropped here; see [`schema::write_header`].
fn rows_from_table(table: &Table) -> Vec<Vec<String>> {
    let header = schema::write_header(table);
    let mut rows = Vec::with_capacity(table.records.len() + 1);
    rows.push(header.clone());
    for record in &table.records {
        rows.push(
            header
                .iter()
                .map(|column| crate::workbook::field_text(record, column))
                .collect(),
        );
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::field_text;
    use serde_json::json;

    fn decode_csv(text: &str) -> Workbook {
        decode(text.as_bytes(), Dialect::Delimited).unwrap()
    }

    #[test]
    fn delimited_decode_reads_header_and_rows() {
        let wb = decode_csv("ID,Name\n1,ProductA\n2,ProductB\n");
        let table = wb.table(DEFAULT_SHEET).unwrap();
        assert_eq!(table.header, vec!["ID", "Name"]);
        assert_eq!(table.records.len(), 2);
        assert_eq!(field_text(&table.records[1], "Name"), "ProductB");
    }

    #[test]
    fn missing_cells_decode_to_empty_string() {
        let wb = decode_csv("ID,Name,Value\n1,ProductA\n");
        let table = wb.table(DEFAULT_SHEET).unwrap();
        assert_eq!(table.records[0].get("Value"), Some(&json!("")));
    }

    #[test]
    fn ragged_rows_get_placeholder_columns() {
        let wb = decode_csv("ID,Name\n1,ProductA,stray\n");
        let table = wb.table(DEFAULT_SHEET).unwrap();
        assert_eq!(table.header.len(), 3);
        assert!(schema::is_placeholder(&table.header[2]));
        assert_eq!(field_text(&table.records[0], &table.header[2]), "stray");
        // Stripped from the user-visible schema.
        assert_eq!(schema::clean_header(&table.header), vec!["ID", "Name"]);
    }

    #[test]
    fn blank_header_cells_become_placeholders() {
        let wb = decode_csv("ID,,Name\n1,x,ProductA\n");
        let table = wb.table(DEFAULT_SHEET).unwrap();
        assert!(schema::is_placeholder(&table.header[1]));
        assert_eq!(schema::clean_header(&table.header), vec!["ID", "Name"]);
    }

    #[test]
    fn delimited_round_trip() {
        let text = "ID,Name,Value\n1,ProductA,100\n2,ProductB,150\n";
        let wb = decode_csv(text);
        let bytes = encode(&wb, Dialect::Delimited).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), text);
    }

    #[test]
    fn delimited_rejects_multi_sheet_workbooks() {
        let wb = Workbook {
            sheets: vec![
                Sheet {
                    name: "A".into(),
                    table: Table::new(vec!["X".into()]),
                },
                Sheet {
                    name: "B".into(),
                    table: Table::new(vec!["Y".into()]),
                },
            ],
        };
        let err = encode(&wb, Dialect::Delimited).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn packed_round_trips_all_sheets_in_order() {
        let wb = Workbook {
            sheets: vec![
                Sheet {
                    name: "People".into(),
                    table: table_from_rows(&[
                        vec!["Name".into(), "Age".into()],
                        vec!["Ann".into(), "31".into()],
                    ]),
                },
                Sheet {
                    name: "Cities".into(),
                    table: table_from_rows(&[
                        vec!["City".into()],
                        vec!["Kigali".into()],
                        vec!["Seoul".into()],
                    ]),
                },
            ],
        };
        let bytes = encode(&wb, Dialect::Packed).unwrap();
        let back = decode(&bytes, Dialect::Packed).unwrap();
        assert_eq!(back, wb);
        assert_eq!(back.sheet_names(), vec!["People", "Cities"]);
    }

    #[test]
    fn packed_decode_rejects_garbage() {
        let err = decode(b"definitely not gzip", Dialect::Packed).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
    }

    #[test]
    fn dialect_is_chosen_by_extension() {
        assert_eq!(
            Dialect::for_path(Path::new("t.csv")).unwrap(),
            Dialect::Delimited
        );
        assert_eq!(
            Dialect::for_path(Path::new("t.WBK")).unwrap(),
            Dialect::Packed
        );
        assert!(Dialect::for_path(Path::new("t.xlsx")).is_err());
        assert!(Dialect::for_path(Path::new("noext")).is_err());
    }

    #[test]
    fn empty_file_decodes_to_empty_table() {
        let wb = decode_csv("");
        let table = wb.table(DEFAULT_SHEET).unwrap();
        assert!(table.header.is_empty());
        assert!(table.is_empty());
    }
}
