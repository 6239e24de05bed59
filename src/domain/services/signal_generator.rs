//! Converts ranked composite scores into directional trade signals.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::domain::entities::asset::Asset;
use crate::domain::entities::score::Score;
use crate::domain::entities::signal::{Signal, TradeAction};
use crate::domain::entities::snapshot::Snapshot;

/// One asset with the cycle's snapshot and score attached.
#[derive(Debug, Clone)]
pub struct ScoredAsset {
    pub asset: Asset,
    pub snapshot: Snapshot,
    pub score: Score,
}

/// Entry/exit thresholds on the composite score.
#[derive(Debug, Clone, Copy)]
pub struct SignalPolicy {
    pub entry_threshold: f64,
    pub exit_threshold: f64,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        SignalPolicy {
            entry_threshold: 75.0,
            exit_threshold: 40.0,
        }
    }
}

pub struct SignalGenerator {
    policy: SignalPolicy,
}

impl SignalGenerator {
    pub fn new(policy: SignalPolicy) -> Self {
        SignalGenerator { policy }
    }

    /// Rank by composite score descending and emit signals.
    ///
    /// Composite above the entry threshold yields a BUY with
    /// confidence = composite. Composite below the exit threshold yields a
    /// SELL with confidence = 100 - composite, but only for assets with an
    /// open position. Equal composites keep their original relative order
    /// (stable sort).
    pub fn generate(&self, scored: &[ScoredAsset], open_assets: &HashSet<i64>) -> Vec<Signal> {
        let mut ranked: Vec<&ScoredAsset> = scored.iter().collect();
        ranked.sort_by(|a, b| {
            b.score
                .composite
                .partial_cmp(&a.score.composite)
                .unwrap_or(Ordering::Equal)
        });

        let mut signals = Vec::new();
        for entry in ranked {
            let composite = entry.score.composite;
            if composite > self.policy.entry_threshold {
                signals.push(Signal {
                    asset_id: entry.asset.id,
                    action: TradeAction::Buy,
                    confidence: composite.min(100.0),
                    reference_price: entry.snapshot.price,
                });
            } else if composite < self.policy.exit_threshold
                && open_assets.contains(&entry.asset.id)
            {
                signals.push(Signal {
                    asset_id: entry.asset.id,
                    action: TradeAction::Sell,
                    confidence: (100.0 - composite).clamp(0.0, 100.0),
                    reference_price: entry.snapshot.price,
                });
            }
        }
        signals
    }
}

impl Default for SignalGenerator {
    fn default() -> Self {
        Self::new(SignalPolicy::default())
    }
}
