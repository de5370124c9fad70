//! Symbol table of declared objects, persisted per report across runs.

pub mod store;
pub mod table;

pub use store::{load_symbol_table, save_symbol_table, SymbolFileHeader};
pub use table::{ColumnInfo, SymbolEntry, SymbolTable, TABLE_FUNCTION_MARKER};
