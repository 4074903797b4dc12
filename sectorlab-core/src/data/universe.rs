//! Universe configuration: the fixed set of sector instruments.
//!
//! The default universe is the TOPIX-17 sector ETF family listed in Tokyo
//! (codes 1617 to 1633). Other universes come from the `[universe]` section
//! of the run configuration:
//!
//! ```toml
//! [universe]
//! ticker_suffix = ".T"
//!
//! [[universe.instruments]]
//! code = "1617"
//! label = "Foods"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::Instrument;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("universe has no instruments")]
    Empty,

    #[error("duplicate instrument code '{0}'")]
    DuplicateCode(String),
}

/// The complete instrument universe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Universe {
    /// Appended to each code to form the provider ticker.
    pub ticker_suffix: String,
    pub instruments: Vec<Instrument>,
}

impl Universe {
    /// Reject empty universes and repeated codes.
    pub fn validate(&self) -> Result<(), UniverseError> {
        if self.instruments.is_empty() {
            return Err(UniverseError::Empty);
        }
        let mut seen = HashSet::new();
        for inst in &self.instruments {
            if !seen.insert(inst.code.as_str()) {
                return Err(UniverseError::DuplicateCode(inst.code.clone()));
            }
        }
        Ok(())
    }

    /// Provider ticker for an instrument of this universe.
    pub fn ticker(&self, instrument: &Instrument) -> String {
        instrument.ticker(&self.ticker_suffix)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// TOPIX-17 sector ETFs.
    pub fn topix17() -> Self {
        let instruments = [
            ("1617", "Foods"),
            ("1618", "Energy Resources"),
            ("1619", "Construction & Materials"),
            ("1620", "Raw Materials & Chemicals"),
            ("1621", "Pharmaceutical"),
            ("1622", "Automobiles & Transportation Equipment"),
            ("1623", "Steel & Nonferrous Metals"),
            ("1624", "Machinery"),
            ("1625", "Electric Appliances & Precision Instruments"),
            ("1626", "IT & Services, Others"),
            ("1627", "Electric Power & Gas"),
            ("1628", "Transportation & Logistics"),
            ("1629", "Commercial & Wholesale Trade"),
            ("1630", "Retail Trade"),
            ("1631", "Banks"),
            ("1632", "Financials (ex Banks)"),
            ("1633", "Real Estate"),
        ]
        .into_iter()
        .map(|(code, label)| Instrument::new(code, label))
        .collect();

        Self {
            ticker_suffix: ".T".into(),
            instruments,
        }
    }
}

impl Default for Universe {
    fn default() -> Self {
        Self::topix17()
    }
}
