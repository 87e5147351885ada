pub mod eval;
pub mod parser;
