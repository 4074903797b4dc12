//! Instrument: a sector-tracking security identified by a fixed code.

use serde::{Deserialize, Serialize};

/// One tracked instrument: exchange code plus the sector label shown in reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub code: String,
    pub label: String,
}

impl Instrument {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
        }
    }

    /// Provider ticker for this instrument, e.g. `1617` + `.T` → `1617.T`.
    pub fn ticker(&self, suffix: &str) -> String {
        format!("{}{suffix}", self.code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticker_appends_suffix() {
        let inst = Instrument::new("1617", "Foods");
        assert_eq!(inst.ticker(".T"), "1617.T");
        assert_eq!(inst.ticker(""), "1617");
    }
}
