/// Row label used in import reports.
///
/// In-memory row `0` is the first data line, which sits on line 2 of the
/// uploaded file (line 1 is the header).
pub fn row_label(row_index: usize) -> String {
    (row_index + 2).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_label_offsets_header() {
        assert_eq!(row_label(0), "2");
        assert_eq!(row_label(41), "43");
    }
}
