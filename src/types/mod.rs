//! Type definitions

pub mod delivery;
pub mod geo;
pub mod restaurant;
pub mod schedule;

pub use delivery::*;
pub use geo::*;
pub use restaurant::*;
pub use schedule::*;
