use std::cell::RefCell;
use std::collections::HashSet;

use rustc_hash::FxHashMap;

use crate::cell::CellValue;
use crate::formula::eval::{self, CellLookup, Value};

/// Default grid size for a fresh workspace.
pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_COLS: usize = 10;

// Thread-local set of cells currently being evaluated, for cycle detection
thread_local! {
    static EVALUATING: RefCell<HashSet<(usize, usize)>> = RefCell::new(HashSet::new());
}

/// A sparse grid of cells. Formulas are evaluated on read.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    cells: FxHashMap<(usize, usize), CellValue>,
    pub rows: usize,
    pub cols: usize,
}

impl CellLookup for Sheet {
    fn get(&self, row: usize, col: usize) -> Value {
        let is_cycle = EVALUATING.with(|eval| eval.borrow().contains(&(row, col)));
        if is_cycle {
            return Value::Error("#CIRC!".to_string());
        }

        match self.cells.get(&(row, col)) {
            None => Value::Empty,
            Some(CellValue::Empty) => Value::Empty,
            Some(CellValue::Number(n)) => Value::Number(*n),
            Some(CellValue::Text(s)) => Value::Text(s.clone()),
            Some(CellValue::Formula { ast: Some(ast), .. }) => {
                EVALUATING.with(|eval| eval.borrow_mut().insert((row, col)));
                let value = eval::evaluate(ast, self);
                EVALUATING.with(|eval| eval.borrow_mut().remove(&(row, col)));
                value
            }
            Some(CellValue::Formula { ast: None, .. }) => {
                Value::Error("#PARSE!".to_string())
            }
        }
    }
}

impl Sheet {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            name: String::from("Sheet1"),
            cells: FxHashMap::default(),
            rows,
            cols,
        }
    }

    /// Set a cell from raw user text. Blank input clears the cell, so
    /// undoing a first edit (back to "") removes it from the sparse map.
    pub fn set_value(&mut self, row: usize, col: usize, input: &str) {
        let value = CellValue::from_input(input);
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
    }

    /// The text as entered: formula source, not its result.
    pub fn get_raw(&self, row: usize, col: usize) -> String {
        self.cells
            .get(&(row, col))
            .map(|v| v.raw_display())
            .unwrap_or_default()
    }

    /// The text to show in the grid: formulas are evaluated.
    pub fn get_display(&self, row: usize, col: usize) -> String {
        self.get(row, col).to_display()
    }

    pub fn is_empty_cell(&self, row: usize, col: usize) -> bool {
        !self.cells.contains_key(&(row, col))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Occupied cells, in no particular order.
    pub fn cells_iter(&self) -> impl Iterator<Item = ((usize, usize), &CellValue)> + '_ {
        self.cells.iter().map(|(pos, v)| (*pos, v))
    }
}
