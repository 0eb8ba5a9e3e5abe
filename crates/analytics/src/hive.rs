use crate::error::AnalyticsError;
use configuration::HiveSettings;
use core_types::{HiveSignal, ReasonTag, Trade};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// The hive penalty scorer.
///
/// Every losing trade adds the tag's weight (1 unless overridden) to the penalty of both
/// its entry and exit tag. Every winning trade multiplies those penalties by `decay`.
/// A tag is penalized when its penalty reaches `penalty_threshold` and cleared again once
/// it falls below half the threshold, so a tag near the line does not flap.
#[derive(Debug, Clone)]
pub struct HiveScorer {
    threshold: Decimal,
    decay: Decimal,
    weights: BTreeMap<ReasonTag, Decimal>,
    penalties: BTreeMap<ReasonTag, Decimal>,
    penalized: BTreeSet<ReasonTag>,
}

impl HiveScorer {
    pub fn new(settings: &HiveSettings) -> Result<Self, AnalyticsError> {
        if settings.penalty_threshold <= Decimal::ZERO {
            return Err(AnalyticsError::InvalidSettings(
                "penalty_threshold must be positive".to_string(),
            ));
        }
        if settings.decay < Decimal::ZERO || settings.decay > Decimal::ONE {
            return Err(AnalyticsError::InvalidSettings("decay must be in [0, 1]".to_string()));
        }
        // Tags penalized up front start at the threshold, so they need wins to clear.
        let penalized: BTreeSet<ReasonTag> = settings.penalized_tags.iter().copied().collect();
        let penalties = penalized
            .iter()
            .map(|tag| (*tag, settings.penalty_threshold))
            .collect();
        Ok(Self {
            threshold: settings.penalty_threshold,
            decay: settings.decay,
            weights: settings.tag_weights.clone(),
            penalties,
            penalized,
        })
    }

    fn weight(&self, tag: ReasonTag) -> Decimal {
        self.weights.get(&tag).copied().unwrap_or(Decimal::ONE)
    }

    /// Scores a closed trade. Returns a signal only when a tag changed state.
    pub fn record(&mut self, trade: &Trade) -> Option<HiveSignal> {
        let mut signal = HiveSignal {
            timestamp: Some(trade.exit_time),
            ..Default::default()
        };

        for tag in [trade.entry_reason, trade.exit_reason] {
            let weight = self.weight(tag);
            let penalty = self.penalties.entry(tag).or_insert(Decimal::ZERO);
            if trade.is_win() {
                *penalty *= self.decay;
            } else {
                *penalty += weight;
            }
            let penalty = *penalty;

            if penalty >= self.threshold && self.penalized.insert(tag) {
                tracing::warn!(%tag, %penalty, "Hive penalizing reason tag");
                signal.penalized_tags.push(tag);
            } else if penalty < self.threshold / Decimal::TWO && self.penalized.remove(&tag) {
                tracing::info!(%tag, %penalty, "Hive clearing reason tag");
                signal.cleared_tags.push(tag);
            }
        }

        (!signal.is_empty()).then_some(signal)
    }

    pub fn penalty(&self, tag: ReasonTag) -> Decimal {
        self.penalties.get(&tag).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn penalties(&self) -> &BTreeMap<ReasonTag, Decimal> {
        &self.penalties
    }

    pub fn is_penalized(&self, tag: ReasonTag) -> bool {
        self.penalized.contains(&tag)
    }

    /// Sum of all tag penalties; the analyzer ranks against it.
    pub fn total_penalty(&self) -> Decimal {
        self.penalties.values().copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn settings() -> HiveSettings {
        HiveSettings {
            penalized_tags: vec![],
            penalty_threshold: dec!(3),
            decay: dec!(0.5),
            tag_weights: BTreeMap::from([(ReasonTag::StopLoss, dec!(2))]),
        }
    }

    fn trade(exit: Decimal, exit_reason: ReasonTag) -> Trade {
        Trade {
            trade_id: Uuid::new_v4(),
            symbol: "BTCUSDT".to_string(),
            entry_time: Utc::now(),
            exit_time: Utc::now(),
            entry_price: dec!(100),
            exit_price: exit,
            quantity: dec!(1),
            fees: dec!(0),
            entry_reason: ReasonTag::ZScoreEntry,
            exit_reason,
            fills: 1,
        }
    }

    #[test]
    fn losses_accumulate_until_the_tag_is_penalized() {
        let mut scorer = HiveScorer::new(&settings()).unwrap();

        // StopLoss weighs 2, so one loss leaves it under the threshold of 3.
        assert!(scorer.record(&trade(dec!(90), ReasonTag::StopLoss)).is_none());
        assert_eq!(scorer.penalty(ReasonTag::StopLoss), dec!(2));

        let signal = scorer.record(&trade(dec!(90), ReasonTag::StopLoss)).unwrap();
        assert_eq!(signal.penalized_tags, vec![ReasonTag::StopLoss]);
        assert!(scorer.is_penalized(ReasonTag::StopLoss));

        // ZScoreEntry reaches 3 on the third loss.
        let signal = scorer.record(&trade(dec!(95), ReasonTag::Timeout)).unwrap();
        assert_eq!(signal.penalized_tags, vec![ReasonTag::ZScoreEntry]);
        assert_eq!(scorer.total_penalty(), dec!(8));
    }

    #[test]
    fn wins_decay_and_clear_below_half_threshold() {
        let mut scorer = HiveScorer::new(&settings()).unwrap();
        scorer.record(&trade(dec!(90), ReasonTag::StopLoss));
        scorer.record(&trade(dec!(90), ReasonTag::StopLoss));
        assert!(scorer.is_penalized(ReasonTag::StopLoss));

        // Win with a different exit: only the entry tag decays.
        scorer.record(&trade(dec!(110), ReasonTag::TakeProfit));
        assert!(scorer.is_penalized(ReasonTag::StopLoss));
        assert_eq!(scorer.penalty(ReasonTag::ZScoreEntry), dec!(1));

        // A winning trade tagged stop_loss is impossible in practice, but the decay
        // rule still applies: 4 -> 2 -> 1, cleared once under 1.5.
        scorer.record(&trade(dec!(101), ReasonTag::StopLoss));
        assert!(scorer.is_penalized(ReasonTag::StopLoss));
        let signal = scorer.record(&trade(dec!(101), ReasonTag::StopLoss)).unwrap();
        assert_eq!(signal.cleared_tags, vec![ReasonTag::StopLoss]);
    }

    #[test]
    fn configured_tags_start_penalized() {
        let mut seeded = settings();
        seeded.penalized_tags = vec![ReasonTag::Timeout];
        let mut scorer = HiveScorer::new(&seeded).unwrap();
        assert_eq!(scorer.penalty(ReasonTag::Timeout), dec!(3));

        // A further loss keeps it penalized without a new signal for it.
        let signal = scorer.record(&trade(dec!(95), ReasonTag::Timeout));
        assert!(signal.is_none());
        assert!(scorer.is_penalized(ReasonTag::Timeout));
    }

    #[test]
    fn rejects_non_positive_threshold() {
        let mut bad = settings();
        bad.penalty_threshold = dec!(0);
        assert!(HiveScorer::new(&bad).is_err());
    }
}
