use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Composite analysis score for one asset, derived purely from a snapshot.
///
/// All sub-scores and the composite are in [0, 100]. Appended to history,
/// never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Score {
    pub asset_id: i64,
    pub timestamp: DateTime<Utc>,
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
    pub composite: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_fields() {
        let score = Score {
            asset_id: 7,
            timestamp: Utc::now(),
            technical: 70.0,
            fundamental: 60.0,
            sentiment: 50.0,
            composite: 62.0,
        };
        assert_eq!(score.asset_id, 7);
        assert!(score.composite >= 0.0 && score.composite <= 100.0);
    }
}
