use serde_json::{Map, Value};

/// A single row, keyed by column name. Key order is insertion order
/// (serde_json is built with `preserve_order`), which is what makes
/// first-seen column ordering work when new columns are introduced.
pub type Record = Map<String, Value>;

/// One sheet's data: the raw first-row header (placeholders included, for
/// positional access) plus the rows in on-disk order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn new(header: Vec<String>) -> Self {
        Table {
            header,
            records: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

/// An ordered, named collection of tables. This is the unit the codec reads
/// and writes. Mutations replace exactly one sheet's table; the others
/// round-trip untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Build a workbook holding a single sheet.
    pub fn single(name: impl Into<String>, table: Table) -> Self {
        Workbook {
            sheets: vec![Sheet {
                name: name.into(),
                table,
            }],
        }
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    /// Resolve a requested sheet name. A single-sheet workbook always
    /// resolves to its only sheet no matter what was asked for (CSV files
    /// carry a synthetic sheet name), an omitted name means the first sheet,
    /// otherwise the name must match exactly.
    pub fn resolve_sheet_name(&self, requested: Option<&str>) -> Option<&str> {
        if self.sheets.len() == 1 {
            return self.sheets.first().map(|s| s.name.as_str());
        }
        match requested {
            Some(name) => self
                .sheets
                .iter()
                .find(|s| s.name == name)
                .map(|s| s.name.as_str()),
            None => self.sheets.first().map(|s| s.name.as_str()),
        }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|s| &s.table)
    }

    pub fn table_mut(&mut self, name: &str) -> Option<&mut Table> {
        self.sheets
            .iter_mut()
            .find(|s| s.name == name)
            .map(|s| &mut s.table)
    }
}

/// Coerce a cell value to its textual form. Missing and null cells are the
/// empty string, so comparisons downstream never deal with null.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Textual value of `column` in `record`, empty string when absent.
pub fn field_text(record: &Record, column: &str) -> String {
    record.get(column).map(cell_text).unwrap_or_default()
}
