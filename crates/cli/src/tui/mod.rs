//! Full-screen grid editor.
//!
//! The `App` here is the editor controller: it owns the sheet and the edit
//! history, turns keystrokes into cell edits, and translates each undo/redo
//! selection into exactly one history call whose result it writes back into
//! the grid. All of that is plain state manipulation, tested below without
//! a terminal; only `run` touches the screen.

use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};

use unicode_width::UnicodeWidthStr;

use gridlet_engine::cell_ref::{cell_name, col_to_letters};
use gridlet_engine::history::{History, MAX_EXPR_LEN};
use gridlet_engine::sheet::Sheet;

use crate::util;

/// Fixed display width of one grid column.
const COL_WIDTH: usize = 9;
/// Rows taken by title, input line and status bar.
const CHROME_ROWS: u16 = 3;

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Navigate,
    /// Editing the cursor cell's expression
    Edit { buffer: String },
    /// Typing a file name for the first save
    SaveAs { buffer: String },
}

struct App {
    sheet: Sheet,
    history: History,
    path: Option<PathBuf>,
    cursor_row: usize,
    cursor_col: usize,
    scroll_row: usize,
    scroll_col: usize,
    mode: Mode,
    status: Option<String>,
    modified: bool,
    should_quit: bool,
}

impl App {
    fn new(sheet: Sheet, path: Option<PathBuf>) -> Self {
        Self {
            sheet,
            // A session always starts with an empty history, even when the
            // workspace was loaded from disk; history is never persisted.
            history: History::new(),
            path,
            cursor_row: 0,
            cursor_col: 0,
            scroll_row: 0,
            scroll_col: 0,
            mode: Mode::Navigate,
            status: None,
            modified: false,
            should_quit: false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.mode.clone() {
            Mode::Navigate => self.handle_navigate_key(key),
            Mode::Edit { buffer } => self.handle_edit_key(key, buffer),
            Mode::SaveAs { buffer } => self.handle_save_as_key(key, buffer),
        }
    }

    fn handle_navigate_key(&mut self, key: KeyEvent) {
        self.status = None;
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Up | KeyCode::Char('k') => self.move_cursor(-1, 0),
            KeyCode::Down | KeyCode::Char('j') => self.move_cursor(1, 0),
            KeyCode::Left | KeyCode::Char('h') => self.move_cursor(0, -1),
            KeyCode::Right | KeyCode::Char('l') => self.move_cursor(0, 1),
            KeyCode::PageUp => self.move_cursor(-10, 0),
            KeyCode::PageDown => self.move_cursor(10, 0),
            KeyCode::Home | KeyCode::Char('g') => self.cursor_row = 0,
            KeyCode::End | KeyCode::Char('G') => self.cursor_row = self.sheet.rows - 1,
            KeyCode::Char('0') => self.cursor_col = 0,
            KeyCode::Char('$') => self.cursor_col = self.sheet.cols - 1,
            KeyCode::Enter | KeyCode::Char('i') => {
                self.mode = Mode::Edit {
                    buffer: self.sheet.get_raw(self.cursor_row, self.cursor_col),
                };
            }
            KeyCode::Char('=') => {
                // Start a fresh formula, discarding the old text
                self.mode = Mode::Edit {
                    buffer: "=".to_string(),
                };
            }
            KeyCode::Delete | KeyCode::Char('x') => self.commit_edit(String::new()),
            KeyCode::Char('z') if key.modifiers.contains(KeyModifiers::CONTROL) => self.undo(),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => self.redo(),
            KeyCode::Char('u') => self.undo(),
            KeyCode::Char('U') => self.redo(),
            KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => self.save(),
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, key: KeyEvent, mut buffer: String) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Navigate,
            KeyCode::Enter => {
                self.mode = Mode::Navigate;
                self.commit_edit(buffer);
            }
            KeyCode::Backspace => {
                buffer.pop();
                self.mode = Mode::Edit { buffer };
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                // Expressions are bounded; extra keystrokes are dropped
                if buffer.chars().count() < MAX_EXPR_LEN {
                    buffer.push(c);
                } else {
                    self.status = Some(format!("expression limit is {} chars", MAX_EXPR_LEN));
                }
                self.mode = Mode::Edit { buffer };
            }
            _ => self.mode = Mode::Edit { buffer },
        }
    }

    fn handle_save_as_key(&mut self, key: KeyEvent, mut buffer: String) {
        match key.code {
            KeyCode::Esc => self.mode = Mode::Navigate,
            KeyCode::Enter => {
                self.mode = Mode::Navigate;
                let name = buffer.trim().to_string();
                if name.is_empty() {
                    self.status = Some("save cancelled: no file name".to_string());
                } else {
                    self.path = Some(PathBuf::from(name));
                    self.save();
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
                self.mode = Mode::SaveAs { buffer };
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                buffer.push(c);
                self.mode = Mode::SaveAs { buffer };
            }
            _ => self.mode = Mode::SaveAs { buffer },
        }
    }

    fn move_cursor(&mut self, drow: i32, dcol: i32) {
        self.cursor_row = step_clamped(self.cursor_row, drow, self.sheet.rows - 1);
        self.cursor_col = step_clamped(self.cursor_col, dcol, self.sheet.cols - 1);
    }

    /// Commit an edit of the cursor cell: capture the prior text, apply the
    /// new text, and record the pair. No-op edits are not recorded.
    fn commit_edit(&mut self, text: String) {
        let (row, col) = (self.cursor_row, self.cursor_col);
        let old = self.sheet.get_raw(row, col);
        let new = text.trim().to_string();
        if old == new {
            return;
        }
        // Record first: if the history cannot take the edit, the grid is
        // left alone and the edit is reported as not having happened.
        match self.history.record(row, col, old, new.clone()) {
            Ok(()) => {
                self.sheet.set_value(row, col, &new);
                self.modified = true;
            }
            Err(e) => self.status = Some(format!("edit dropped: {}", e)),
        }
    }

    /// One undo selection translates into exactly one history call; the
    /// returned expression is written back into the grid.
    fn undo(&mut self) {
        match self.history.undo() {
            Ok(edit) => {
                self.sheet.set_value(edit.row, edit.col, &edit.expr);
                self.cursor_row = edit.row;
                self.cursor_col = edit.col;
                self.modified = true;
                self.status = Some(format!("undid edit at {}", cell_name(edit.row, edit.col)));
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn redo(&mut self) {
        match self.history.redo() {
            Ok(edit) => {
                self.sheet.set_value(edit.row, edit.col, &edit.expr);
                self.cursor_row = edit.row;
                self.cursor_col = edit.col;
                self.modified = true;
                self.status = Some(format!("redid edit at {}", cell_name(edit.row, edit.col)));
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    fn save(&mut self) {
        let Some(path) = self.path.clone() else {
            self.mode = Mode::SaveAs {
                buffer: String::new(),
            };
            return;
        };
        match gridlet_io::save(&self.sheet, &path) {
            Ok(()) => {
                self.modified = false;
                self.status = Some(format!("saved {}", path.display()));
            }
            Err(e) => self.status = Some(format!("save failed: {}", e)),
        }
    }

    fn ensure_visible(&mut self, visible_rows: usize, visible_cols: usize) {
        if self.cursor_row < self.scroll_row {
            self.scroll_row = self.cursor_row;
        }
        if visible_rows > 0 && self.cursor_row >= self.scroll_row + visible_rows {
            self.scroll_row = self.cursor_row - visible_rows + 1;
        }
        if self.cursor_col < self.scroll_col {
            self.scroll_col = self.cursor_col;
        }
        if visible_cols > 0 && self.cursor_col >= self.scroll_col + visible_cols {
            self.scroll_col = self.cursor_col - visible_cols + 1;
        }
    }

    fn gutter_width(&self) -> usize {
        self.sheet.rows.to_string().len().max(3) + 1
    }

    fn visible_col_count(&self, area_width: u16) -> usize {
        (area_width as usize)
            .saturating_sub(self.gutter_width())
            .checked_div(COL_WIDTH + 1)
            .unwrap_or(0)
            .max(1)
    }

    // ---- drawing ----

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(2),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

        self.draw_title(frame, chunks[0]);
        self.draw_grid(frame, chunks[1]);
        self.draw_input_line(frame, chunks[2]);
        self.draw_status(frame, chunks[3]);
    }

    fn draw_title(&self, frame: &mut Frame, area: Rect) {
        let file = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(unsaved)".to_string());
        let marker = if self.modified { " *" } else { "" };
        let title = format!(
            " gridlet: {}{} | {} rows x {} cols ",
            file, marker, self.sheet.rows, self.sheet.cols
        );
        let para = Paragraph::new(Line::from(Span::styled(
            title,
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )))
        .style(Style::default().bg(Color::Cyan));
        frame.render_widget(para, area);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect) {
        let gutter = self.gutter_width();
        let vis_cols = self.visible_col_count(area.width);
        let col_end = (self.scroll_col + vis_cols).min(self.sheet.cols);

        let visible_rows = (area.height as usize).saturating_sub(1);
        let row_end = (self.scroll_row + visible_rows).min(self.sheet.rows);

        let mut lines: Vec<Line> = Vec::with_capacity(visible_rows + 1);

        // Header line with column letters
        let mut header = vec![Span::raw(" ".repeat(gutter))];
        for c in self.scroll_col..col_end {
            let label = util::pad_right(&col_to_letters(c), COL_WIDTH);
            let style = if c == self.cursor_col {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            };
            header.push(Span::styled(format!("{} ", label), style));
        }
        lines.push(Line::from(header));

        for r in self.scroll_row..row_end {
            let is_cursor_row = r == self.cursor_row;
            let gutter_style = if is_cursor_row {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let mut spans = vec![Span::styled(
                format!("{:>width$} ", r + 1, width = gutter - 1),
                gutter_style,
            )];

            for c in self.scroll_col..col_end {
                let text = self.sheet.get_display(r, c);
                let display = util::pad_right(&text, COL_WIDTH);
                let style = if is_cursor_row && c == self.cursor_col {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::White)
                        .add_modifier(Modifier::BOLD)
                } else if is_cursor_row || c == self.cursor_col {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::Gray)
                };
                spans.push(Span::styled(format!("{} ", display), style));
            }
            lines.push(Line::from(spans));
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    fn draw_input_line(&self, frame: &mut Frame, area: Rect) {
        let name = cell_name(self.cursor_row, self.cursor_col);
        let line = match &self.mode {
            Mode::Navigate => {
                let raw = self.sheet.get_raw(self.cursor_row, self.cursor_col);
                format!(" {}: {}", name, raw)
            }
            Mode::Edit { buffer } => format!(" {}> {}_", name, buffer),
            Mode::SaveAs { buffer } => format!(" save as> {}_", buffer),
        };
        let para = Paragraph::new(Line::from(Span::styled(
            line,
            Style::default().fg(Color::White),
        )));
        frame.render_widget(para, area);
    }

    /// Status bar text: message on the left, actions right-aligned.
    /// Undo/redo only appear as selectable actions while the history
    /// reports them possible.
    fn status_line(&self, width: usize) -> String {
        let mut actions: Vec<&str> = vec!["Enter:edit", "x:clear"];
        if self.history.can_undo() {
            actions.push("u:undo");
        }
        if self.history.can_redo() {
            actions.push("U:redo");
        }
        actions.push("^S:save");
        actions.push("q:quit");

        let left = match &self.status {
            Some(msg) => format!(" {}", msg),
            None => String::new(),
        };
        let right = format!("{} ", actions.join("  "));
        // Padding goes by display width, same as the grid cells; a wide
        // character in the message must not push the actions off the edge
        let padding = width.saturating_sub(left.width() + right.width());
        format!("{}{:pad$}{}", left, "", right, pad = padding)
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let para = Paragraph::new(Line::from(Span::styled(
            self.status_line(area.width as usize),
            Style::default().fg(Color::Black).bg(Color::DarkGray),
        )))
        .style(Style::default().bg(Color::DarkGray));
        frame.render_widget(para, area);
    }
}

/// Offset a cursor position, saturating at 0 and `max`. Stays in usize so
/// grids with more rows than i32 can count still navigate.
fn step_clamped(pos: usize, delta: i32, max: usize) -> usize {
    let moved = if delta < 0 {
        pos.saturating_sub(delta.unsigned_abs() as usize)
    } else {
        pos.saturating_add(delta as usize)
    };
    moved.min(max)
}

/// Run the editor until the user quits.
pub fn run(sheet: Sheet, path: Option<PathBuf>) -> Result<(), String> {
    let mut app = App::new(sheet, path);

    terminal::enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {}", e))?;
    stdout()
        .execute(EnterAlternateScreen)
        .map_err(|e| format!("failed to enter alternate screen: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        }
    }
    let _cleanup = Cleanup;

    let backend = CrosstermBackend::new(stdout());
    let mut terminal =
        Terminal::new(backend).map_err(|e| format!("failed to create terminal: {}", e))?;

    loop {
        let size = terminal.size().map_err(|e| format!("size error: {}", e))?;
        let visible_rows = size.height.saturating_sub(CHROME_ROWS + 1) as usize;
        let visible_cols = app.visible_col_count(size.width);
        app.ensure_visible(visible_rows, visible_cols);

        terminal
            .draw(|frame| app.draw(frame))
            .map_err(|e| format!("draw error: {}", e))?;

        if event::poll(Duration::from_millis(100)).map_err(|e| format!("event poll error: {}", e))?
        {
            if let Event::Key(key) = event::read().map_err(|e| format!("event read error: {}", e))?
            {
                app.handle_key(key);
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlet_engine::sheet::{DEFAULT_COLS, DEFAULT_ROWS};

    fn app() -> App {
        App::new(Sheet::new(DEFAULT_ROWS, DEFAULT_COLS), None)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(key(KeyCode::Char(ch)));
        }
    }

    fn edit_cell(app: &mut App, row: usize, col: usize, text: &str) {
        app.cursor_row = row;
        app.cursor_col = col;
        app.handle_key(key(KeyCode::Enter));
        // Clear whatever was there before typing the new text
        while matches!(&app.mode, Mode::Edit { buffer } if !buffer.is_empty()) {
            app.handle_key(key(KeyCode::Backspace));
        }
        type_text(app, text);
        app.handle_key(key(KeyCode::Enter));
    }

    #[test]
    fn test_committed_edit_reaches_sheet_and_history() {
        let mut app = app();
        edit_cell(&mut app, 0, 0, "=1+2");
        assert_eq!(app.sheet.get_raw(0, 0), "=1+2");
        assert_eq!(app.sheet.get_display(0, 0), "3");
        assert!(app.history.can_undo());
        assert!(!app.history.can_redo());
        assert!(app.modified);
    }

    #[test]
    fn test_noop_edit_is_not_recorded() {
        let mut app = app();
        edit_cell(&mut app, 0, 0, "5");
        edit_cell(&mut app, 0, 0, "5");
        app.undo();
        // Only one record existed, so the cell is back to empty
        assert_eq!(app.sheet.get_raw(0, 0), "");
        assert!(!app.history.can_undo());
    }

    #[test]
    fn test_cancelled_edit_changes_nothing() {
        let mut app = app();
        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, "99");
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.sheet.get_raw(0, 0), "");
        assert!(!app.history.can_undo());
        assert_eq!(app.mode, Mode::Navigate);
    }

    #[test]
    fn test_undo_writes_old_text_back() {
        let mut app = app();
        edit_cell(&mut app, 0, 0, "=1+2");
        edit_cell(&mut app, 0, 0, "=3+4");

        app.undo();
        assert_eq!(app.sheet.get_raw(0, 0), "=1+2");
        assert!(app.history.can_undo());
        assert!(app.history.can_redo());

        app.undo();
        assert_eq!(app.sheet.get_raw(0, 0), "");
        assert!(!app.history.can_undo());
    }

    #[test]
    fn test_redo_writes_new_text_back() {
        let mut app = app();
        edit_cell(&mut app, 2, 1, "7");
        app.undo();
        assert_eq!(app.sheet.get_raw(2, 1), "");

        app.redo();
        assert_eq!(app.sheet.get_raw(2, 1), "7");
        // Cursor follows the affected cell
        assert_eq!((app.cursor_row, app.cursor_col), (2, 1));
    }

    #[test]
    fn test_new_edit_after_undo_discards_redo() {
        let mut app = app();
        edit_cell(&mut app, 0, 0, "1");
        app.undo();
        assert!(app.history.can_redo());

        edit_cell(&mut app, 0, 1, "2");
        assert!(!app.history.can_redo());
        assert!(app.history.can_undo());
    }

    #[test]
    fn test_undo_with_nothing_to_undo_reports_status() {
        let mut app = app();
        app.undo();
        assert_eq!(app.status.as_deref(), Some("nothing to undo"));
        app.redo();
        assert_eq!(app.status.as_deref(), Some("nothing to redo"));
    }

    #[test]
    fn test_clear_cell_is_undoable() {
        let mut app = app();
        edit_cell(&mut app, 0, 0, "42");
        app.handle_key(key(KeyCode::Char('x')));
        assert_eq!(app.sheet.get_raw(0, 0), "");

        app.undo();
        assert_eq!(app.sheet.get_raw(0, 0), "42");
    }

    #[test]
    fn test_edit_buffer_is_bounded() {
        let mut app = app();
        app.handle_key(key(KeyCode::Enter));
        type_text(&mut app, &"9".repeat(MAX_EXPR_LEN + 10));
        match &app.mode {
            Mode::Edit { buffer } => assert_eq!(buffer.chars().count(), MAX_EXPR_LEN),
            other => panic!("expected edit mode, got {:?}", other),
        }
    }

    #[test]
    fn test_equals_key_starts_fresh_formula() {
        let mut app = app();
        edit_cell(&mut app, 0, 0, "old");
        app.handle_key(key(KeyCode::Char('=')));
        match &app.mode {
            Mode::Edit { buffer } => assert_eq!(buffer, "="),
            other => panic!("expected edit mode, got {:?}", other),
        }
    }

    #[test]
    fn test_cursor_stays_in_bounds() {
        let mut app = app();
        app.move_cursor(-5, -5);
        assert_eq!((app.cursor_row, app.cursor_col), (0, 0));
        app.move_cursor(1000, 1000);
        assert_eq!(
            (app.cursor_row, app.cursor_col),
            (app.sheet.rows - 1, app.sheet.cols - 1)
        );
    }

    #[test]
    fn test_cursor_survives_grids_larger_than_i32() {
        // The sheet is sparse, so a grid this tall costs nothing
        let rows = i32::MAX as usize + 5;
        let mut app = App::new(Sheet::new(rows, DEFAULT_COLS), None);

        app.move_cursor(1, 1);
        assert_eq!((app.cursor_row, app.cursor_col), (1, 1));
        app.move_cursor(-10, -10);
        assert_eq!((app.cursor_row, app.cursor_col), (0, 0));

        app.cursor_row = rows - 1;
        app.move_cursor(1, 0);
        assert_eq!(app.cursor_row, rows - 1);
    }

    #[test]
    fn test_status_line_pads_by_display_width() {
        let mut app = app();
        app.status = Some("保存しました out.gridlet".to_string());
        let line = app.status_line(70);
        assert_eq!(line.width(), 70);
        assert!(line.ends_with("q:quit "));
    }

    #[test]
    fn test_scrolling_follows_cursor() {
        let mut app = app();
        app.cursor_row = 15;
        app.ensure_visible(10, 5);
        assert_eq!(app.scroll_row, 6);
        app.cursor_row = 2;
        app.ensure_visible(10, 5);
        assert_eq!(app.scroll_row, 2);
    }

    #[test]
    fn test_save_without_path_prompts_for_name() {
        let mut app = app();
        app.save();
        assert!(matches!(app.mode, Mode::SaveAs { .. }));
    }

    #[test]
    fn test_save_as_writes_file_and_keeps_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.gridlet");

        let mut app = app();
        edit_cell(&mut app, 0, 0, "42");
        app.save();
        type_text(&mut app, path.to_str().unwrap());
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.path.as_deref(), Some(path.as_path()));
        assert!(!app.modified);
        let loaded = gridlet_io::load(&path).unwrap();
        assert_eq!(loaded.get_raw(0, 0), "42");
    }

    #[test]
    fn test_loaded_workspace_starts_with_empty_history() {
        let mut sheet = Sheet::new(DEFAULT_ROWS, DEFAULT_COLS);
        sheet.set_value(0, 0, "42");
        let app = App::new(sheet, None);
        assert!(!app.history.can_undo());
        assert!(!app.history.can_redo());
    }
}
