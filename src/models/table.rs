/// Untyped delimited table as read from a source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column names exactly as the file declares them
    pub headers: Vec<String>,
    /// One entry per data row, padded to `headers.len()`; `None` marks a null cell
    pub rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating it to the header width
    pub fn push_row(&mut self, mut row: Vec<Option<String>>) {
        row.resize(self.headers.len(), None);
        self.rows.push(row);
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// A table without columns or without data rows carries no responses
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() || self.rows.is_empty()
    }
}
