// gridlet - terminal grid-of-cells editor with undo/redo

mod tui;
mod util;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gridlet_engine::sheet::{Sheet, DEFAULT_COLS, DEFAULT_ROWS};

#[derive(Parser)]
#[command(name = "gridlet")]
#[command(about = "Terminal grid-of-cells editor with undo/redo")]
#[command(version)]
struct Cli {
    /// Workspace file to open (created on first save)
    file: Option<PathBuf>,

    /// Grid rows for a new workspace
    #[arg(long, default_value_t = DEFAULT_ROWS)]
    rows: usize,

    /// Grid columns for a new workspace
    #[arg(long, default_value_t = DEFAULT_COLS)]
    cols: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let sheet = match &cli.file {
        Some(path) if path.exists() => match gridlet_io::load(path) {
            Ok(sheet) => sheet,
            Err(e) => {
                eprintln!("gridlet: cannot open {}: {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        _ => Sheet::new(cli.rows.max(1), cli.cols.max(1)),
    };

    match tui::run(sheet, cli.file) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gridlet: {}", e);
            ExitCode::FAILURE
        }
    }
}
