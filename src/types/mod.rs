//! Grid data model: cells, sheets and workbooks.

mod cell;
mod sheet;
mod workbook;

pub use cell::*;
pub use sheet::*;
pub use workbook::*;
