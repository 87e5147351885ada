use crate::formula::parser::{self, Expr};

/// What a cell holds, classified from the raw text the user typed.
#[derive(Debug, Clone, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Formula { source: String, ast: Option<Expr> },
}

impl CellValue {
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();

        if trimmed.is_empty() {
            return CellValue::Empty;
        }

        if trimmed.starts_with('=') {
            // Keep the source even when it does not parse; the cell shows
            // a parse error but the user's text survives round-trips.
            let ast = parser::parse(trimmed).ok();
            return CellValue::Formula {
                source: trimmed.to_string(),
                ast,
            };
        }

        if let Ok(num) = trimmed.parse::<f64>() {
            return CellValue::Number(num);
        }

        CellValue::Text(trimmed.to_string())
    }

    /// The text as the user entered it (what editing and saving see).
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Formula { source, .. } => source.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_classifies_number() {
        assert!(matches!(CellValue::from_input("42"), CellValue::Number(n) if n == 42.0));
        assert!(matches!(CellValue::from_input("-3.5"), CellValue::Number(n) if n == -3.5));
    }

    #[test]
    fn test_from_input_classifies_text() {
        assert!(matches!(CellValue::from_input("hello"), CellValue::Text(_)));
    }

    #[test]
    fn test_from_input_classifies_formula() {
        match CellValue::from_input("=1+2") {
            CellValue::Formula { source, ast } => {
                assert_eq!(source, "=1+2");
                assert!(ast.is_some());
            }
            other => panic!("expected formula, got {:?}", other),
        }
    }

    #[test]
    fn test_from_input_keeps_unparseable_formula_source() {
        match CellValue::from_input("=1+") {
            CellValue::Formula { source, ast } => {
                assert_eq!(source, "=1+");
                assert!(ast.is_none());
            }
            other => panic!("expected formula, got {:?}", other),
        }
    }

    #[test]
    fn test_from_input_blank_is_empty() {
        assert!(CellValue::from_input("").is_empty());
        assert!(CellValue::from_input("   ").is_empty());
    }

    #[test]
    fn test_raw_display_round_trips() {
        assert_eq!(CellValue::from_input("42").raw_display(), "42");
        assert_eq!(CellValue::from_input("hi").raw_display(), "hi");
        assert_eq!(CellValue::from_input("=A1+1").raw_display(), "=A1+1");
        assert_eq!(CellValue::from_input("").raw_display(), "");
    }
}
