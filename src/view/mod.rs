//! Presentation of attempt results.

mod table;

pub use table::{Table, round_min};
