mod admin;
mod dml;
mod handle;
mod select;

pub use handle::Database;
pub(crate) use handle::{SharedConnection, run_blocking};
