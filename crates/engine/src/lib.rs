pub mod cell;
pub mod cell_ref;
pub mod formula;
pub mod history;
pub mod sheet;
