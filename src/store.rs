//! Mutation engine and file directory: every operation loads the target file
//! fresh, mutates exactly one sheet's table, and writes the workbook back
//! through the codec before returning.
//!
//! There is no cross-caller lock: two simultaneous writers to the same file
//! race, and the last full-file overwrite wins. Single-writer-per-file is
//! assumed; a production deployment wanting more should hold a per-file
//! mutex around the load-mutate-save span.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde_json::Value;

use crate::codec::{self, Dialect, DEFAULT_SHEET};
use crate::error::{Result, StoreError};
use crate::filter::{self, FilterSpec, SortSpec};
use crate::schema;
use crate::workbook::{cell_text, field_text, Record, Table, Workbook};

/// A directory of spreadsheet files addressed by file name. The data
/// directory is injected at construction; there is no process-wide working
/// directory state.
pub struct SheetStore {
    data_dir: PathBuf,
}

impl SheetStore {
    /// Open (creating if needed) the given data directory.
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)?;
        Ok(SheetStore { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File names with a known dialect extension, sorted.
    pub fn list_files(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.data_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && Dialect::is_known_path(&path) {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn list_sheets(&self, file_name: &str) -> Result<Vec<String>> {
        let (_, workbook) = self.load(file_name)?;
        Ok(workbook.sheet_names())
    }

    /// The user-visible schema of a sheet: row-1 names with placeholders
    /// stripped. Always re-derived from the file, never cached.
    pub fn list_columns(&self, file_name: &str, sheet: Option<&str>) -> Result<Vec<String>> {
        let (_, workbook) = self.load(file_name)?;
        let table = resolve_table(&workbook, sheet)?;
        Ok(schema::clean_header(&table.header))
    }

    /// Read records: filter, then sort, then limit (`0` means all). Never
    /// mutates. Placeholder columns are stripped from the returned records,
    /// and rows with nothing left but empty values are dropped.
    pub fn read(
        &self,
        file_name: &str,
        sheet: Option<&str>,
        spec: &FilterSpec,
        sort: Option<&SortSpec>,
        limit: usize,
    ) -> Result<Vec<Record>> {
        let (_, workbook) = self.load(file_name)?;
        let table = resolve_table(&workbook, sheet)?;
        let mut records: Vec<Record> = table
            .records
            .iter()
            .filter(|r| filter::matches(r, spec))
            .map(schema::display_record)
            .filter(|r| !schema::is_blank_record(r))
            .collect();
        if let Some(sort) = sort {
            filter::sort_records(&mut records, sort);
        }
        if limit > 0 {
            records.truncate(limit);
        }
        debug!(
            "read {} record(s) from {}",
            records.len(),
            file_name
        );
        Ok(records)
    }

    /// Append a row to the end of a sheet. Columns the sheet has not seen
    /// before grow the schema; columns the row leaves out default to the
    /// empty string on the next read. Returns the sheet's new row count.
    pub fn add_row(&self, file_name: &str, sheet: Option<&str>, row: Record) -> Result<usize> {
        self.mutate(file_name, sheet, |table| {
            table.records.push(row);
            Ok(table.records.len())
        })
    }

    /// Merge `row` into the first record whose `key_column` value equals
    /// `key_value` (both compared as text). Fails with `NotFound` before any
    /// write when no record matches.
    pub fn update_row_by_key(
        &self,
        file_name: &str,
        sheet: Option<&str>,
        key_column: &str,
        key_value: &Value,
        row: Record,
    ) -> Result<()> {
        let key_text = cell_text(key_value);
        self.mutate(file_name, sheet, |table| {
            let target = table
                .records
                .iter_mut()
                .find(|r| field_text(r, key_column) == key_text)
                .ok_or_else(|| {
                    StoreError::not_found(format!(
                        "no row with {key_column}='{key_text}'"
                    ))
                })?;
            merge(target, &row);
            Ok(())
        })
    }

    /// Merge `row` into every record matching the filter. Matching is by
    /// value identity: any record whose full field-set equals a matched one
    /// is updated too, so duplicate rows are always updated together.
    /// Returns the number of records updated, `NotFound` when zero.
    pub fn update_rows_by_filter(
        &self,
        file_name: &str,
        sheet: Option<&str>,
        spec: &FilterSpec,
        row: Record,
    ) -> Result<usize> {
        self.mutate(file_name, sheet, |table| {
            let matched = matched_snapshot(table, spec)?;
            let mut updated = 0;
            for record in &mut table.records {
                if matched.contains(record) {
                    merge(record, &row);
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    /// Remove every record matching the filter, with the same value-identity
    /// semantics as [`update_rows_by_filter`](Self::update_rows_by_filter).
    /// The header survives even when the last record goes. Returns the
    /// number removed, `NotFound` when zero.
    pub fn delete_rows_by_filter(
        &self,
        file_name: &str,
        sheet: Option<&str>,
        spec: &FilterSpec,
    ) -> Result<usize> {
        self.mutate(file_name, sheet, |table| {
            let matched = matched_snapshot(table, spec)?;
            let before = table.records.len();
            table.records.retain(|r| !matched.contains(r));
            Ok(before - table.records.len())
        })
    }

    /// Drop all records from a sheet, keeping only its header.
    pub fn clear(&self, file_name: &str, sheet: Option<&str>) -> Result<()> {
        self.mutate(file_name, sheet, |table| {
            table.records.clear();
            Ok(())
        })
    }

    /// Create a new file holding one empty sheet with the given columns. The
    /// dialect comes from the file name's extension when it has one,
    /// otherwise from `dialect` (packed by default) with the matching
    /// extension appended. Returns the final file name.
    pub fn create_file(
        &self,
        file_name: &str,
        dialect: Option<Dialect>,
        columns: Vec<String>,
    ) -> Result<String> {
        let file_name = if Path::new(file_name).extension().is_some() {
            // A name with an extension must name a known dialect.
            Dialect::for_path(Path::new(file_name))?;
            file_name.to_string()
        } else {
            let dialect = dialect.unwrap_or(Dialect::Packed);
            format!("{}.{}", file_name, dialect.extension())
        };
        let path = self.file_path(&file_name)?;
        if path.exists() {
            return Err(StoreError::Conflict(file_name));
        }
        let workbook = Workbook::single(DEFAULT_SHEET, Table::new(columns));
        codec::save(&path, &workbook)?;
        info!("created {}", file_name);
        Ok(file_name)
    }

    pub fn delete_file(&self, file_name: &str) -> Result<()> {
        let path = self.existing_path(file_name)?;
        fs::remove_file(path)?;
        info!("deleted {}", file_name);
        Ok(())
    }

    /// Store raw uploaded bytes under `file_name`, overwriting any previous
    /// file of that name. The name must carry a known dialect extension.
    pub fn upload(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let path = self.file_path(file_name)?;
        Dialect::for_path(&path)?;
        fs::write(path, bytes)?;
        info!("uploaded {} ({} bytes)", file_name, bytes.len());
        Ok(())
    }

    /// Raw bytes of an existing file, for download.
    pub fn download(&self, file_name: &str) -> Result<Vec<u8>> {
        let path = self.existing_path(file_name)?;
        Ok(fs::read(path)?)
    }

    /// Load, apply `op` to the resolved sheet's table, and save: the
    /// load-mutate-save span every write shares. An error from `op` aborts
    /// before anything touches disk.
    fn mutate<T>(
        &self,
        file_name: &str,
        sheet: Option<&str>,
        op: impl FnOnce(&mut Table) -> Result<T>,
    ) -> Result<T> {
        let (path, mut workbook) = self.load(file_name)?;
        let sheet_name = resolve_sheet(&workbook, sheet)?;
        let table = workbook
            .table_mut(&sheet_name)
            .expect("resolved sheet exists");
        let out = op(table)?;
        codec::save(&path, &workbook)?;
        Ok(out)
    }

    fn load(&self, file_name: &str) -> Result<(PathBuf, Workbook)> {
        let path = self.existing_path(file_name)?;
        let workbook = codec::load(&path)?;
        Ok((path, workbook))
    }

    fn existing_path(&self, file_name: &str) -> Result<PathBuf> {
        let path = self.file_path(file_name)?;
        if !path.is_file() {
            return Err(StoreError::not_found(format!("file '{file_name}'")));
        }
        Ok(path)
    }

    fn file_path(&self, file_name: &str) -> Result<PathBuf> {
        // File names are identifiers, not paths.
        if file_name.is_empty()
            || file_name.contains(['/', '\\'])
            || file_name.starts_with("..")
        {
            return Err(StoreError::invalid(format!(
                "invalid file name: '{file_name}'"
            )));
        }
        Ok(self.data_dir.join(file_name))
    }
}

fn resolve_sheet(workbook: &Workbook, requested: Option<&str>) -> Result<String> {
    workbook
        .resolve_sheet_name(requested)
        .map(str::to_string)
        .ok_or_else(|| {
            StoreError::not_found(format!(
                "sheet '{}'",
                requested.unwrap_or("<first>")
            ))
        })
}

fn resolve_table<'a>(workbook: &'a Workbook, requested: Option<&str>) -> Result<&'a Table> {
    let name = resolve_sheet(workbook, requested)?;
    Ok(workbook.table(&name).expect("resolved sheet exists"))
}

/// Records matching the filter, cloned before mutation so later merges do
/// not disturb the match set. Empty match set is a `NotFound`.
fn matched_snapshot(table: &Table, spec: &FilterSpec) -> Result<Vec<Record>> {
    let matched: Vec<Record> = table
        .records
        .iter()
        .filter(|r| filter::matches(r, spec))
        .cloned()
        .collect();
    if matched.is_empty() {
        return Err(StoreError::not_found("no rows matched the filter"));
    }
    Ok(matched)
}

/// Shallow merge: `patch` keys overwrite, everything else is untouched.
fn merge(record: &mut Record, patch: &Record) {
    for (key, value) in patch {
        record.insert(key.clone(), value.clone());
    }
}
