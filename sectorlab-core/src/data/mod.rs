//! Market data acquisition: provider trait, Yahoo and synthetic providers, universe.

pub mod circuit_breaker;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use provider::{DataError, DataProvider, DataSource, PriceHistory};
pub use synthetic::SyntheticProvider;
pub use universe::{Universe, UniverseError};
pub use yahoo::YahooProvider;
