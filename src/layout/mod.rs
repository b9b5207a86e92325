pub mod strip;

pub use strip::{CompositeLayout, LayoutSlot, SlotSizing, StripLayout};
