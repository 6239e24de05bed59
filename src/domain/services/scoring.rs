//! Scoring engine: turns a market snapshot into a 0-100 composite score.
//!
//! The technical sub-score is computed here; fundamental and sentiment
//! sub-scores are pluggable strategies so tests can run deterministically.
//! The engine has no side effects.

use chrono::Utc;
use rand::Rng;

use crate::domain::entities::asset::{Asset, AssetClass};
use crate::domain::entities::score::Score;
use crate::domain::entities::snapshot::Snapshot;
use crate::domain::services::asset_class::AssetClassRegistry;
use std::sync::Arc;

/// Fundamental sub-score strategy, in [0, 100].
pub trait FundamentalStrategy: Send + Sync {
    fn score(&self, snapshot: &Snapshot) -> f64;
}

/// Sentiment sub-score strategy, in [0, 100].
pub trait SentimentStrategy: Send + Sync {
    fn score(&self, asset: &Asset) -> f64;
}

/// Market-cap tier scoring: 60 base, +20 above $1B, +10 above $100M.
pub struct MarketCapFundamentals;

impl FundamentalStrategy for MarketCapFundamentals {
    fn score(&self, snapshot: &Snapshot) -> f64 {
        let mut score: f64 = 60.0;
        let market_cap = snapshot.market_cap.unwrap_or(0.0);
        if market_cap > 1e9 {
            score += 20.0;
        } else if market_cap > 1e8 {
            score += 10.0;
        }
        score.min(100.0)
    }
}

/// Placeholder sentiment source; real feeds plug in through the trait.
pub struct RandomSentiment;

impl SentimentStrategy for RandomSentiment {
    fn score(&self, asset: &Asset) -> f64 {
        let mut rng = rand::thread_rng();
        match asset.class {
            AssetClass::Crypto => rng.gen_range(40.0..80.0),
            _ => rng.gen_range(50.0..70.0),
        }
    }
}

/// Composite scorer. Pure given its inputs and the active strategies.
pub struct ScoringEngine {
    registry: Arc<AssetClassRegistry>,
    fundamental: Box<dyn FundamentalStrategy>,
    sentiment: Box<dyn SentimentStrategy>,
}

impl ScoringEngine {
    pub fn new(
        registry: Arc<AssetClassRegistry>,
        fundamental: Box<dyn FundamentalStrategy>,
        sentiment: Box<dyn SentimentStrategy>,
    ) -> Self {
        ScoringEngine {
            registry,
            fundamental,
            sentiment,
        }
    }

    pub fn with_defaults(registry: Arc<AssetClassRegistry>) -> Self {
        Self::new(
            registry,
            Box::new(MarketCapFundamentals),
            Box::new(RandomSentiment),
        )
    }

    /// Technical sub-score in [0, 100].
    ///
    /// Shares: momentum 30, volume 20, intraday price position 25, trend
    /// strength 25. Each share is clamped before summing.
    pub fn technical_score(snapshot: &Snapshot) -> f64 {
        let momentum = snapshot.change_pct;
        let momentum_score = (30.0 * (1.0 + momentum / 100.0)).clamp(0.0, 30.0);

        let volume_score = if snapshot.volume > 0.0 {
            (10.0 * snapshot.volume.log10()).clamp(0.0, 20.0)
        } else {
            0.0
        };

        let position_score = match snapshot.intraday_position() {
            Some(ratio) => 25.0 * ratio.clamp(0.0, 1.0),
            None => 12.5,
        };

        let trend_score = if momentum.abs() > 2.0 { 25.0 } else { 10.0 };

        (momentum_score + volume_score + position_score + trend_score).clamp(0.0, 100.0)
    }

    /// Score one asset from its snapshot using the class-specific weights.
    pub fn score(&self, asset: &Asset, snapshot: &Snapshot) -> Score {
        let technical = Self::technical_score(snapshot);
        let fundamental = self.fundamental.score(snapshot).clamp(0.0, 100.0);
        let sentiment = self.sentiment.score(asset).clamp(0.0, 100.0);

        let weights = self.registry.get(asset.class).score_weights();
        let composite = (technical * weights.technical
            + fundamental * weights.fundamental
            + sentiment * weights.sentiment)
            .clamp(0.0, 100.0);

        Score {
            asset_id: asset.id,
            timestamp: Utc::now(),
            technical,
            fundamental,
            sentiment,
            composite,
        }
    }
}
