pub mod entry;
pub mod params;
pub mod randstrobes;
pub mod stats;
pub mod strobemer;

pub use entry::{Entry, MapEntry, RefRandstrobe};
pub use params::IndexParameters;
pub use randstrobes::{randstrobes_query, QueryRandstrobe};
pub use strobemer::{IndexMeta, Position, StrobemerIndex};
