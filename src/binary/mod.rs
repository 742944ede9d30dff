//! Time log binary (`<id>.bin`) support.
//!
//! - [`writer`] encodes samples into rows with one bulk write per time log
//! - [`reader`] lazily decodes rows, tolerating a truncated trailing row
//! - [`geometry`] extracts a few values by order byte without full decoding

pub mod format;
pub mod geometry;
pub mod reader;
pub mod writer;

pub use format::{bin_file_name, bin_path, effective_value_count};
pub use geometry::{read_values_by_order, scan_bytes};
pub use reader::TimeLogReader;
pub use writer::{RowEncoder, encode_timestamp, write_time_log};
