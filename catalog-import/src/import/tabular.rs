//! CSV ⇄ raw rows
//!
//! Headers are trimmed and lower-cased; cells are kept as text (typing is
//! the normalizer's job). Trailing all-blank lines, as spreadsheet exports
//! tend to leave, are dropped so row numbers still match the file.

use shared::models::RawRow;

use crate::export::ExportTable;
use crate::utils::ImportResult;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn rows_from_csv(bytes: &[u8]) -> ImportResult<Vec<RawRow>> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: RawRow = headers
            .iter()
            .cloned()
            .zip(record.iter().map(str::to_string))
            .collect();
        rows.push(row);
    }

    while rows
        .last()
        .is_some_and(|row| row.values().all(|v| v.is_empty()))
    {
        rows.pop();
    }
    Ok(rows)
}

pub fn render_csv(table: &ExportTable) -> ImportResult<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.into_inner()
        .map_err(|e| crate::utils::ImportError::Csv(e.to_string()))
}
