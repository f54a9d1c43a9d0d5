use crate::clean::RawRow;

/// Column names every upload must declare in its header.
pub const REQUIRED_COLUMNS: [&str; 2] = ["Course Title", "Total Registrations"];

/// Column copied through without trimming or numeric coercion.
pub const TEXT_COLUMN: &str = "Course Title";

/// How often the required columns are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Check the first row only; later rows are not re-checked.
    #[default]
    FirstRow,
    /// Check every row, so a short row that drops a required cell fails the upload.
    EveryRow,
}

impl ValidationMode {
    /// Whether the row at `index` (zero based) must be checked.
    pub fn applies_to(self, index: usize) -> bool {
        match self {
            ValidationMode::FirstRow => index == 0,
            ValidationMode::EveryRow => true,
        }
    }
}

/// Required column names absent from the row's keys. An empty cell still counts as present.
pub fn missing_columns(row: &RawRow) -> Vec<String> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|col| !row.contains_key(col))
        .map(|col| col.to_string())
        .collect()
}
