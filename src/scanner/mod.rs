//! Directory scanning for the stripview reader.
//!
//! - `natural_order` - filename ordering where digit runs compare as numbers
//! - `file_scanner` - one-level directory listing and media classification

pub mod file_scanner;
pub mod natural_order;

pub use file_scanner::FileScanner;
pub use natural_order::compare as natural_compare;
