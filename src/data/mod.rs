/// Data layer: cell types, workbook reading, conversion and series extraction.
///
/// Architecture:
/// ```text
///   .xlsx
///     │
///     ▼
///   ┌──────────┐
///   │   xlsx    │  first worksheet → Table
///   └──────────┘
///     │
///     ▼
///   ┌──────────┐
///   │ convert   │  Table → .csv (same base name)
///   └──────────┘
///     │
///     ▼
///   ┌──────────┐
///   │  loader   │  .csv → Table
///   └──────────┘
///     │
///     ▼
///   ┌──────────┐
///   │ extract   │  ColumnLayout → Series (period, value)
///   └──────────┘
/// ```

pub mod convert;
pub mod extract;
pub mod loader;
pub mod model;
pub mod xlsx;
