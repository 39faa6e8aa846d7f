//! Named entities and their derived severity tier.

use serde::{Deserialize, Serialize};

/// Coarse severity classification derived per entity from its active
/// signals. Ordered: upgrades only ever move rightward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Nominal,
    Warn,
    Critical,
}

impl Default for Tier {
    fn default() -> Self {
        Self::Nominal
    }
}

/// A named unit (merchant, tenant) signals may be attributed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,

    pub name: String,

    /// Business segment as reported by the backend (e.g. "enterprise"),
    /// used only as a filter value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,

    /// Short display glyph, when the backend provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Nominal < Tier::Warn);
        assert!(Tier::Warn < Tier::Critical);
        assert_eq!(Tier::Critical.max(Tier::Warn), Tier::Critical);
    }
}
