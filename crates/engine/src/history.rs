//! Undo/redo history for cell edits.
//!
//! One `History` holds every textual edit of the session, split into two
//! segments: the *applied* segment (edits currently in effect, oldest first)
//! and the *undone* segment (edits rolled back, most recently undone on top).
//! `undo` and `redo` move one record between the segments; a fresh `record`
//! discards the whole undone segment, so there is no redo after a new edit.
//!
//! Both segments are owned vectors, so a record always lives in exactly one
//! of them and teardown is plain `Drop`. All operations are `&mut self`;
//! a `History` belongs to the single thread driving the edit loop.

/// Maximum length of a cell expression, in characters. Input longer than
/// this is refused at the editor boundary before it can reach the history.
pub const MAX_EXPR_LEN: usize = 59;

/// One recorded edit: which cell changed, and its expression text before
/// and after. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRecord {
    pub row: usize,
    pub col: usize,
    pub old_expr: String,
    pub new_expr: String,
}

/// What `undo`/`redo` hand back: the expression text the caller must write
/// into the cell at (row, col) to carry out the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEdit {
    pub row: usize,
    pub col: usize,
    pub expr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    /// Growing a segment failed. The history is exactly as it was before
    /// the call.
    AllocationFailure,
    /// `undo` with an empty applied segment.
    NoEditsToUndo,
    /// `redo` with an empty undone segment.
    NoEditsToRedo,
}

impl std::fmt::Display for HistoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HistoryError::AllocationFailure => write!(f, "out of memory"),
            HistoryError::NoEditsToUndo => write!(f, "nothing to undo"),
            HistoryError::NoEditsToRedo => write!(f, "nothing to redo"),
        }
    }
}

impl std::error::Error for HistoryError {}

#[derive(Debug, Default)]
pub struct History {
    /// Edits currently in effect, oldest first. `last()` is the next undo.
    applied: Vec<EditRecord>,
    /// Edits rolled back, most recently undone last. `last()` is the next
    /// redo.
    undone: Vec<EditRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed cell edit.
    ///
    /// Appends to the applied segment and discards the entire undone
    /// segment: a new edit always erases any redo history, however deep.
    /// On `AllocationFailure` the history is unmodified.
    pub fn record(
        &mut self,
        row: usize,
        col: usize,
        old_expr: String,
        new_expr: String,
    ) -> Result<(), HistoryError> {
        // Reserve before mutating either segment, so a failed allocation
        // leaves the history untouched.
        self.applied
            .try_reserve(1)
            .map_err(|_| HistoryError::AllocationFailure)?;
        self.applied.push(EditRecord {
            row,
            col,
            old_expr,
            new_expr,
        });
        self.undone.clear();
        Ok(())
    }

    /// Undo the most recent applied edit.
    ///
    /// The record moves to the top of the undone segment, and the returned
    /// `CellEdit` carries the *old* expression to restore in the grid.
    pub fn undo(&mut self) -> Result<CellEdit, HistoryError> {
        if self.applied.is_empty() {
            return Err(HistoryError::NoEditsToUndo);
        }
        // The receiving segment may have to grow; check that before popping.
        self.undone
            .try_reserve(1)
            .map_err(|_| HistoryError::AllocationFailure)?;
        let Some(record) = self.applied.pop() else {
            return Err(HistoryError::NoEditsToUndo);
        };
        let edit = CellEdit {
            row: record.row,
            col: record.col,
            expr: record.old_expr.clone(),
        };
        self.undone.push(record);
        Ok(edit)
    }

    /// Redo the most recently undone edit.
    ///
    /// Symmetric to `undo`: the record moves back to the applied segment,
    /// and the returned `CellEdit` carries the *new* expression to re-apply.
    pub fn redo(&mut self) -> Result<CellEdit, HistoryError> {
        if self.undone.is_empty() {
            return Err(HistoryError::NoEditsToRedo);
        }
        self.applied
            .try_reserve(1)
            .map_err(|_| HistoryError::AllocationFailure)?;
        let Some(record) = self.undone.pop() else {
            return Err(HistoryError::NoEditsToRedo);
        };
        let edit = CellEdit {
            row: record.row,
            col: record.col,
            expr: record.new_expr.clone(),
        };
        self.applied.push(record);
        Ok(edit)
    }

    pub fn can_undo(&self) -> bool {
        !self.applied.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Drop every record in both segments.
    pub fn clear(&mut self) {
        self.applied.clear();
        self.undone.clear();
    }
}
