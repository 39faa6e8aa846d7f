//! Severity aggregation: projecting the signal stream onto entity tiers.

use std::collections::HashMap;

use crate::domain::{Severity, Signal, Tier};

/// Compute the severity tier of every entity with at least one active
/// signal.
///
/// Pure reducer over the signal slice: resolved signals and signals
/// without an entity are skipped, CRITICAL maps to critical, ERROR and
/// WARN both map to warn, and tiers only ever upgrade, so the result is
/// the per-entity maximum regardless of input order. INFO and SYSTEM
/// severities never affect tier. Entities with no active signals are
/// absent from the map; consumers report those as nominal.
pub fn aggregate(signals: &[Signal]) -> HashMap<String, Tier> {
    let mut tiers: HashMap<String, Tier> = HashMap::new();

    for signal in signals.iter().filter(|s| s.is_active()) {
        let Some(entity_id) = &signal.entity_id else {
            continue;
        };

        let tier = match signal.severity {
            Severity::Critical => Tier::Critical,
            Severity::Error | Severity::Warn => Tier::Warn,
            Severity::Info | Severity::System => continue,
        };

        tiers
            .entry(entity_id.clone())
            .and_modify(|current| *current = (*current).max(tier))
            .or_insert(tier);
    }

    tiers
}

/// Tier for a single entity, defaulting to nominal when it has no
/// active signals.
pub fn tier_for(tiers: &HashMap<String, Tier>, entity_id: &str) -> Tier {
    tiers.get(entity_id).copied().unwrap_or_default()
}
