//! Row model and per-cell normalisation.
use csv_async::StringRecord;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::validate::TEXT_COLUMN;

/// One data line keyed by header name, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    cells: Vec<(String, String)>,
}

impl RawRow {
    /// Pair a record with the header line.
    ///
    /// Cells past the end of the header are keyed `_<index>`. Headers with no
    /// matching cell (short rows) are left out. A repeated header keeps its
    /// first position and takes the later cell.
    pub fn from_record(headers: &StringRecord, record: &StringRecord) -> Self {
        let mut row = RawRow::default();
        for (idx, value) in record.iter().enumerate() {
            let key = match headers.get(idx) {
                Some(h) => h.to_string(),
                None => format!("_{idx}"),
            };
            row.insert(key, value.to_string());
        }
        row
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.cells.push((key, value)),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.cells.iter().any(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::default();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

/// A cleaned cell value. Serialises as a bare JSON number or string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Integer(i64),
    Text(String),
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Integer(n) => serializer.serialize_i64(*n),
            Cell::Text(s) => serializer.serialize_str(s),
        }
    }
}

/// A row after cleaning; serialises as a JSON object in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedRow {
    cells: Vec<(String, Cell)>,
}

impl CleanedRow {
    pub fn get(&self, key: &str) -> Option<&Cell> {
        self.cells.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for CleanedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (k, v) in &self.cells {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Cleaned rows in arrival order.
pub type ResultSet = Vec<CleanedRow>;

/// Clean every cell of a row. The course title is copied verbatim.
pub fn clean_row(raw: RawRow) -> CleanedRow {
    let cells = raw
        .cells
        .into_iter()
        .map(|(key, value)| {
            let cell = if key == TEXT_COLUMN {
                Cell::Text(value)
            } else {
                clean_value(&value)
            };
            (key, cell)
        })
        .collect();
    CleanedRow { cells }
}

/// Drop grouping commas, trim, then coerce to an integer when the rest reads
/// as a number. Fractions are truncated: `"12.7"` becomes `12`.
pub fn clean_value(raw: &str) -> Cell {
    let stripped: String = raw.chars().filter(|c| *c != ',').collect();
    let trimmed = stripped.trim();
    match coerce_integer(trimmed) {
        Some(n) => Cell::Integer(n),
        None => Cell::Text(trimmed.to_string()),
    }
}

fn coerce_integer(s: &str) -> Option<i64> {
    if s.is_empty() {
        return None;
    }
    let value: f64 = s.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    // leading digits win ("1e3" -> 1); ".5" has none, so truncate instead
    match leading_integer(s) {
        Some(n) => Some(n),
        None if value >= i64::MIN as f64 && value < i64::MAX as f64 => Some(value.trunc() as i64),
        None => None,
    }
}

fn leading_integer(s: &str) -> Option<i64> {
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let end = s.len() - unsigned.len() + digits;
    s[..end].parse().ok()
}
