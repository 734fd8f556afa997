//! Ordered pollution levels and their promotion rules

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discrete pollution level, ordered from cleanest to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PollutionLevel {
    BelowBackground,
    Elevated,
    ExceedsThreshold,
    SuspectedSource,
    ConfirmedSource,
}

/// Evidence that can move a label up the ladder during the clustering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Promotion {
    /// The item belongs to a cluster with enough exceeding members
    ClusterSize,
    /// The item's cluster also meets the stricter concentration criterion
    ClusterConcentration,
}

impl PollutionLevel {
    /// Every level in ascending order
    pub const ALL: [PollutionLevel; 5] = [
        PollutionLevel::BelowBackground,
        PollutionLevel::Elevated,
        PollutionLevel::ExceedsThreshold,
        PollutionLevel::SuspectedSource,
        PollutionLevel::ConfirmedSource,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PollutionLevel::BelowBackground => "below-background",
            PollutionLevel::Elevated => "elevated",
            PollutionLevel::ExceedsThreshold => "exceeds-threshold",
            PollutionLevel::SuspectedSource => "suspected-source",
            PollutionLevel::ConfirmedSource => "confirmed-source",
        }
    }

    /// Position in [`PollutionLevel::ALL`]
    pub fn rank(&self) -> usize {
        *self as usize
    }

    /// Apply one promotion event.
    ///
    /// Only two transitions exist: exceeds-threshold to suspected-source on
    /// cluster size, and suspected-source to confirmed-source on cluster
    /// concentration. Every other (level, event) pair leaves the level
    /// unchanged; labels are never demoted.
    pub fn promote(self, event: Promotion) -> PollutionLevel {
        match (self, event) {
            (PollutionLevel::ExceedsThreshold, Promotion::ClusterSize) => PollutionLevel::SuspectedSource,
            (PollutionLevel::SuspectedSource, Promotion::ClusterConcentration) => {
                PollutionLevel::ConfirmedSource
            }
            (level, _) => level,
        }
    }

    /// True for the two source levels
    pub fn is_source(&self) -> bool {
        *self >= PollutionLevel::SuspectedSource
    }
}

impl fmt::Display for PollutionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        for pair in PollutionLevel::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(PollutionLevel::ConfirmedSource.rank(), 4);
    }

    #[test]
    fn test_promotion_transitions() {
        use PollutionLevel::*;
        assert_eq!(ExceedsThreshold.promote(Promotion::ClusterSize), SuspectedSource);
        assert_eq!(SuspectedSource.promote(Promotion::ClusterConcentration), ConfirmedSource);
        // concentration alone cannot skip the size step
        assert_eq!(ExceedsThreshold.promote(Promotion::ClusterConcentration), ExceedsThreshold);
        assert_eq!(Elevated.promote(Promotion::ClusterSize), Elevated);
        assert_eq!(BelowBackground.promote(Promotion::ClusterSize), BelowBackground);
        assert_eq!(ConfirmedSource.promote(Promotion::ClusterSize), ConfirmedSource);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&PollutionLevel::SuspectedSource).unwrap();
        assert_eq!(json, "\"suspected-source\"");
        assert_eq!(PollutionLevel::ExceedsThreshold.to_string(), "exceeds-threshold");
    }
}
