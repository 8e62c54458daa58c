/*!
# sheetdb

Treat local spreadsheet files as a small record store over HTTP: create,
read with filter/sort/limit, insert, update-by-key, bulk update/delete by
filter, and clear, using each sheet's first row as its column schema.

## Architecture

- **Tabular codec** (`codec`): converts between on-disk bytes and an
  in-memory workbook. Two dialects behind one enum: comma-delimited text
  (`.csv`, single sheet, no quoting, so a literal comma inside a field is
  not supported) and a packed multi-sheet binary (`.wbk`, gzip + bincode).
- **Schema resolver** (`schema`): the first row is the schema. Synthetic
  placeholder columns produced by ragged rows are suppressed from the
  user-visible header and from write headers; writes that introduce new
  columns grow the header in first-seen order.
- **Predicate engine** (`filter`): AND-combined `(column, operator, value)`
  conditions and a single-key, numeric-aware stable sort.
- **Mutation engine** (`store`): loads the file, mutates exactly one sheet's
  table, writes the workbook back. Failed lookups abort before any write.
- **HTTP layer** (`app`): axum routes mapping straight onto store
  operations.

Schema is re-derived from row 1 on every access; nothing is cached across
requests. There is no cross-process file locking: concurrent writers to the
same file race and the last overwrite wins.

## REST API

- `GET /api/files`, `POST /api/files`, `DELETE /api/files/{name}`
- `GET /api/files/{name}/sheets`, `GET /api/files/{name}/columns`
- `POST /api/read`: filter/sort/limit over one sheet
- `POST /api/add-row`, `POST /api/update-row`: append / update by key
- `POST /api/update-rows`, `POST /api/delete-rows`: bulk by filter
- `POST /api/clear`: drop all records, keep the header
- `POST /api/upload`, `GET /api/download/{name}`: raw file transfer
*/

pub mod app;
pub mod codec;
pub mod error;
pub mod filter;
pub mod schema;
pub mod store;
pub mod workbook;

pub use codec::Dialect;
pub use error::{Result, StoreError};
pub use filter::{Condition, Direction, FilterSpec, Operator, SortSpec};
pub use store::SheetStore;
pub use workbook::{Record, Sheet, Table, Workbook};
