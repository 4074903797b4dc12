//! Domain types for SectorLab

pub mod instrument;
pub mod observation;

pub use instrument::Instrument;
pub use observation::Observation;
