use core_types::{HiveSignal, ReasonTag};
use std::collections::BTreeSet;

/// The strategy-side view of hive feedback: which reason tags are penalized and
/// which symbols are paused. Entries are filtered against it; exits never are.
#[derive(Debug, Clone, Default)]
pub struct HiveGuard {
    penalized: BTreeSet<ReasonTag>,
    paused: BTreeSet<String>,
}

impl HiveGuard {
    pub fn new(penalized: &[ReasonTag]) -> Self {
        Self {
            penalized: penalized.iter().copied().collect(),
            paused: BTreeSet::new(),
        }
    }

    pub fn apply(&mut self, signal: &HiveSignal) {
        for tag in &signal.penalized_tags {
            if self.penalized.insert(*tag) {
                tracing::info!(%tag, "Hive penalized reason tag");
            }
        }
        for tag in &signal.cleared_tags {
            if self.penalized.remove(tag) {
                tracing::info!(%tag, "Hive cleared reason tag");
            }
        }
        for symbol in &signal.paused_symbols {
            self.paused.insert(symbol.clone());
        }
        for symbol in &signal.resumed_symbols {
            self.paused.remove(symbol);
        }
    }

    pub fn is_penalized(&self, tag: ReasonTag) -> bool {
        self.penalized.contains(&tag)
    }

    pub fn is_paused(&self, symbol: &str) -> bool {
        self.paused.contains(symbol)
    }

    pub fn penalized_tags(&self) -> impl Iterator<Item = &ReasonTag> {
        self.penalized.iter()
    }
}
