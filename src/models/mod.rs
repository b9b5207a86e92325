pub mod catalog;
pub mod media_item;

pub use catalog::*;
pub use media_item::*;
