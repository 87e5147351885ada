//! A1-style cell naming.

/// Convert 0-based column index to spreadsheet letter(s): 0=A, 25=Z, 26=AA.
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Inverse of `col_to_letters`: "A" -> 0, "AA" -> 26. Returns `None` for
/// empty input, non-uppercase letters, or columns past the addressable
/// range (the running total is overflow-checked).
pub fn letters_to_col(s: &str) -> Option<usize> {
    if s.is_empty() {
        return None;
    }
    let mut col: usize = 0;
    for c in s.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c as usize - 'A' as usize + 1)?;
    }
    Some(col - 1)
}

/// Human-readable name for a cell, e.g. (2, 1) -> "B3".
pub fn cell_name(row: usize, col: usize) -> String {
    format!("{}{}", col_to_letters(col), row + 1)
}
