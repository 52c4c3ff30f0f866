use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RowParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV header error: {0}")]
    Header(#[from] csv::Error),
}

/// The header record of a CSV export: trimmed cells used verbatim as lookup
/// keys, matched case-insensitively.
#[derive(Debug, Clone)]
pub struct RowHeaders {
    cells: Vec<String>,
    raw_line: String,
}

impl RowHeaders {
    pub fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.cells.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn contains_all(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.contains(n))
    }

    /// Reconstructed header line, for format-recognition diagnostics.
    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }
}

/// One data row, keyed by the shared header index.
#[derive(Debug, Clone)]
pub struct Row {
    headers: Arc<RowHeaders>,
    record: csv::StringRecord,
}

impl Row {
    /// First non-empty value across the candidate header names, in candidate
    /// order. Tolerates banks renaming the same logical column across export
    /// versions. Cells missing from a short row are absent, not empty.
    pub fn first(&self, names: &[&str]) -> Option<&str> {
        for name in names {
            if let Some(idx) = self.headers.position(name) {
                if let Some(value) = self.record.get(idx) {
                    let value = value.trim();
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
        None
    }
}

/// Lazy reader over the data rows of a bank CSV export. Double-quote escaping
/// and commas inside quotes are handled by the `csv` crate; ragged rows are
/// allowed; blank and malformed rows are skipped without aborting the
/// sequence — whether a missing field is fatal for a row is the adapter's
/// call, not the parser's.
pub struct RowReader {
    headers: Arc<RowHeaders>,
    records: csv::StringRecordsIntoIter<Cursor<Vec<u8>>>,
}

impl RowReader {
    pub fn open(path: &Path) -> Result<Self, RowParseError> {
        Self::from_bytes(std::fs::read(path)?)
    }

    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, RowParseError> {
        if bytes.starts_with(b"\xef\xbb\xbf") {
            bytes.drain(..3);
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(Cursor::new(bytes));

        let cells: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let raw_line = cells.join(",");

        Ok(RowReader {
            headers: Arc::new(RowHeaders { cells, raw_line }),
            records: reader.into_records(),
        })
    }

    pub fn headers(&self) -> &RowHeaders {
        &self.headers
    }
}

impl Iterator for RowReader {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        loop {
            match self.records.next()? {
                Ok(record) => {
                    if record.iter().all(|f| f.trim().is_empty()) {
                        continue;
                    }
                    return Some(Row {
                        headers: Arc::clone(&self.headers),
                        record,
                    });
                }
                Err(e) => {
                    tracing::debug!("skipping malformed row: {e}");
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(data: &str) -> RowReader {
        RowReader::from_bytes(data.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn headers_are_case_insensitive() {
        let r = reader("Date,Description,Amount\n2025-01-02,COFFEE,4.50\n");
        assert!(r.headers().contains("date"));
        assert!(r.headers().contains("DESCRIPTION"));
        assert!(r.headers().contains_all(&["date", "amount"]));
        assert!(!r.headers().contains("reference"));
    }

    #[test]
    fn first_match_wins_across_aliases() {
        let mut r = reader("Posted Date,Payee,Amount\n2025-01-02,COFFEE,4.50\n");
        let row = r.next().unwrap();
        assert_eq!(row.first(&["date", "posted date"]), Some("2025-01-02"));
        assert_eq!(row.first(&["description", "payee"]), Some("COFFEE"));
    }

    #[test]
    fn empty_cell_falls_through_to_next_alias() {
        let mut r = reader("Memo,Description,Amount\n,GROCER,12.00\n");
        let row = r.next().unwrap();
        assert_eq!(row.first(&["memo", "description"]), Some("GROCER"));
    }

    #[test]
    fn quoted_fields_keep_commas_and_escaped_quotes() {
        let mut r = reader("Date,Description\n2025-01-02,\"SMITH, \"\"JOE\"\" AND CO\"\n");
        let row = r.next().unwrap();
        assert_eq!(row.first(&["description"]), Some("SMITH, \"JOE\" AND CO"));
    }

    #[test]
    fn short_row_maps_missing_cells_to_absent() {
        let mut r = reader("Date,Description,Memo\n2025-01-02,COFFEE\n");
        let row = r.next().unwrap();
        assert_eq!(row.first(&["description"]), Some("COFFEE"));
        assert_eq!(row.first(&["memo"]), None);
    }

    #[test]
    fn blank_lines_are_skipped() {
        let r = reader("Date,Amount\n\n2025-01-02,1.00\n   ,\n2025-01-03,2.00\n");
        assert_eq!(r.count(), 2);
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let mut data = b"\xef\xbb\xbf".to_vec();
        data.extend_from_slice(b"Date,Amount\n2025-01-02,1.00\n");
        let r = RowReader::from_bytes(data).unwrap();
        assert!(r.headers().contains("date"));
    }

    #[test]
    fn raw_header_line_is_preserved() {
        let r = reader("Date,Description,Amount\n");
        assert_eq!(r.headers().raw_line(), "Date,Description,Amount");
    }
}
