mod record;

pub use record::{ColumnIndex, Record};
