//! Hazard domain types
//!
//! A `HazardReading` is a point-in-time measurement for one peril at one
//! location; a `HazardHistory` is the multi-year event series the pricing
//! engine consumes. Both are produced fresh per query and never persisted
//! by the core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Perils the protocol writes coverage for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolType {
    Earthquake,
    Flood,
    Hurricane,
    Drought,
    Wildfire,
}

impl PoolType {
    /// All pools, in display order.
    pub const ALL: [PoolType; 5] = [
        PoolType::Earthquake,
        PoolType::Flood,
        PoolType::Hurricane,
        PoolType::Drought,
        PoolType::Wildfire,
    ];

    /// Measurement unit for this peril's parametric index.
    pub fn unit(&self) -> &'static str {
        match self {
            PoolType::Earthquake => "Mw",
            PoolType::Flood => "m",
            PoolType::Hurricane => "km/h",
            PoolType::Drought => "days",
            PoolType::Wildfire => "FWI",
        }
    }

    /// Stable string form used in URLs and persisted records.
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolType::Earthquake => "earthquake",
            PoolType::Flood => "flood",
            PoolType::Hurricane => "hurricane",
            PoolType::Drought => "drought",
            PoolType::Wildfire => "wildfire",
        }
    }
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoolType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "earthquake" => Ok(PoolType::Earthquake),
            "flood" => Ok(PoolType::Flood),
            "hurricane" => Ok(PoolType::Hurricane),
            "drought" => Ok(PoolType::Drought),
            "wildfire" => Ok(PoolType::Wildfire),
            other => Err(format!("unknown pool type: {other}")),
        }
    }
}

/// One measurement of a hazard index at a location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardReading {
    /// Peril this reading belongs to
    pub pool_type: PoolType,

    /// Latitude in decimal degrees
    pub lat: f64,

    /// Longitude in decimal degrees
    pub lng: f64,

    /// Measured index value, in `unit`
    pub value: f64,

    /// Unit of `value` (mirrors `pool_type.unit()`)
    pub unit: String,

    /// Which upstream produced the measurement
    pub source: String,

    /// Source confidence, 0-100
    pub confidence: u8,

    /// When the measurement was taken
    pub timestamp: DateTime<Utc>,

    /// True when the value came from a parameterized model rather than
    /// an observation feed
    pub is_simulated: bool,
}

/// One historical event: the peril index peaked at `value` in `year`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HazardEvent {
    /// Calendar year of the event
    pub year: u16,

    /// Peak index value reached, in the pool's unit
    pub value: f64,
}

/// Multi-year event series for one peril, the pricing engine's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardHistory {
    /// Peril the series describes
    pub pool_type: PoolType,

    /// Recorded events, at most one peak per event occurrence
    pub events: Vec<HazardEvent>,

    /// Length of the observation window in years (covers event-free years)
    pub years_of_data: u32,

    /// Catalog or model the series came from
    pub source: String,

    /// Human-readable window label, e.g. "1994-2023"
    pub range_label: String,

    /// True when the series is curve-generated rather than observed
    pub is_simulated: bool,
}

impl HazardHistory {
    /// First calendar year of the window, if any events exist.
    pub fn first_year(&self) -> Option<u16> {
        self.events.iter().map(|e| e.year).min()
    }

    /// Events at or above `threshold`.
    pub fn events_at_or_above(&self, threshold: f64) -> impl Iterator<Item = &HazardEvent> {
        self.events.iter().filter(move |e| e.value >= threshold)
    }
}

/// How tightly a payout correlates with actual loss, inferred from how many
/// independent sources can attest the peril index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasisRisk {
    Low,
    Medium,
    High,
}

impl BasisRisk {
    /// Classify from the number of attestable sources for the pool.
    pub fn from_source_count(count: usize) -> Self {
        match count {
            n if n >= 3 => BasisRisk::Low,
            2 => BasisRisk::Medium,
            _ => BasisRisk::High,
        }
    }
}

impl fmt::Display for BasisRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BasisRisk::Low => "low",
            BasisRisk::Medium => "medium",
            BasisRisk::High => "high",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_type_round_trip() {
        for pool in PoolType::ALL {
            let parsed: PoolType = pool.as_str().parse().unwrap();
            assert_eq!(parsed, pool);
        }
        assert!("volcano".parse::<PoolType>().is_err());
    }

    #[test]
    fn test_pool_type_case_insensitive() {
        assert_eq!("Earthquake".parse::<PoolType>().unwrap(), PoolType::Earthquake);
        assert_eq!("FLOOD".parse::<PoolType>().unwrap(), PoolType::Flood);
    }

    #[test]
    fn test_basis_risk_thresholds() {
        assert_eq!(BasisRisk::from_source_count(0), BasisRisk::High);
        assert_eq!(BasisRisk::from_source_count(1), BasisRisk::High);
        assert_eq!(BasisRisk::from_source_count(2), BasisRisk::Medium);
        assert_eq!(BasisRisk::from_source_count(3), BasisRisk::Low);
        assert_eq!(BasisRisk::from_source_count(7), BasisRisk::Low);
    }

    #[test]
    fn test_history_filtering() {
        let history = HazardHistory {
            pool_type: PoolType::Earthquake,
            events: vec![
                HazardEvent { year: 2001, value: 5.4 },
                HazardEvent { year: 2004, value: 6.1 },
                HazardEvent { year: 2010, value: 4.8 },
            ],
            years_of_data: 30,
            source: "test".into(),
            range_label: "1994-2023".into(),
            is_simulated: false,
        };
        assert_eq!(history.events_at_or_above(5.0).count(), 2);
        assert_eq!(history.first_year(), Some(2001));
    }
}
