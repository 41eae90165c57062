//! Historical backtest
//!
//! Replays a trigger against each year of a hazard series: which years
//! would have paid, at which tier, and what the average annual payout rate
//! works out to. Quoted next to the gross premium rate it shows how much
//! of the premium the history would have consumed.

use std::collections::BTreeMap;

use parapet_common::{HazardHistory, PayoutTier};
use serde::{Deserialize, Serialize};

use crate::payout::trigger_ratio;

/// One simulated policy year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestYear {
    pub year: u16,

    /// Peak index value observed that year
    pub peak_value: f64,

    /// Peak value over the trigger
    pub ratio: f64,

    pub tier: PayoutTier,

    /// Fraction of coverage paid that year (0.0 to 1.0)
    pub payout_rate: f64,
}

/// Backtest aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    /// Window length, including years without events
    pub years_of_data: u32,

    /// Years with at least one recorded event
    pub years_with_events: u32,

    /// Years that would have paid something
    pub triggered_years: u32,

    pub minor_years: u32,
    pub moderate_years: u32,
    pub severe_years: u32,

    /// Mean of the per-year payout rates over the whole window
    pub average_annual_payout_rate: f64,
}

/// Full backtest output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Trigger the series was replayed against
    pub trigger_value: f64,

    /// One row per year with events, oldest first
    pub rows: Vec<BacktestYear>,

    pub summary: BacktestSummary,
}

/// Replay `trigger_value` against every year of the series.
pub fn run(history: &HazardHistory, trigger_value: f64) -> BacktestReport {
    // Peak per calendar year; multiple events in a year settle once.
    let mut peaks: BTreeMap<u16, f64> = BTreeMap::new();
    for event in &history.events {
        let peak = peaks.entry(event.year).or_insert(f64::NEG_INFINITY);
        if event.value > *peak {
            *peak = event.value;
        }
    }

    let rows: Vec<BacktestYear> = peaks
        .into_iter()
        .map(|(year, peak_value)| {
            let ratio = trigger_ratio(peak_value, trigger_value);
            let tier = PayoutTier::from_ratio(ratio);
            BacktestYear {
                year,
                peak_value,
                ratio,
                tier,
                payout_rate: f64::from(tier.percentage()) / 100.0,
            }
        })
        .collect();

    let mut minor = 0;
    let mut moderate = 0;
    let mut severe = 0;
    let mut total_rate = 0.0;
    for row in &rows {
        match row.tier {
            PayoutTier::None => {}
            PayoutTier::Minor => minor += 1,
            PayoutTier::Moderate => moderate += 1,
            PayoutTier::Severe => severe += 1,
        }
        total_rate += row.payout_rate;
    }

    let window = history.years_of_data.max(1);
    BacktestReport {
        trigger_value,
        summary: BacktestSummary {
            years_of_data: history.years_of_data,
            years_with_events: rows.len() as u32,
            triggered_years: minor + moderate + severe,
            minor_years: minor,
            moderate_years: moderate,
            severe_years: severe,
            average_annual_payout_rate: total_rate / f64::from(window),
        },
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use parapet_common::{HazardEvent, PoolType};

    fn history(years: u32, events: Vec<(u16, f64)>) -> HazardHistory {
        HazardHistory {
            pool_type: PoolType::Flood,
            events: events
                .into_iter()
                .map(|(year, value)| HazardEvent { year, value })
                .collect(),
            years_of_data: years,
            source: "test catalog".into(),
            range_label: "2004-2023".into(),
            is_simulated: false,
        }
    }

    #[test]
    fn test_yearly_peaks_drive_tiers() {
        // Two events in 2010; only the 4.2 peak settles.
        let h = history(20, vec![(2010, 3.1), (2010, 4.2), (2015, 2.4), (2019, 5.0)]);
        let report = run(&h, 3.0);

        assert_eq!(report.rows.len(), 3);
        let y2010 = &report.rows[0];
        assert_eq!(y2010.year, 2010);
        assert_relative_eq!(y2010.peak_value, 4.2);
        assert_eq!(y2010.tier, PayoutTier::Moderate);

        assert_eq!(report.rows[1].tier, PayoutTier::None);
        assert_eq!(report.rows[2].tier, PayoutTier::Severe);
    }

    #[test]
    fn test_summary_counts_and_rate() {
        let h = history(20, vec![(2010, 4.2), (2015, 2.4), (2019, 5.0)]);
        let report = run(&h, 3.0);

        assert_eq!(report.summary.years_of_data, 20);
        assert_eq!(report.summary.years_with_events, 3);
        assert_eq!(report.summary.triggered_years, 2);
        assert_eq!(report.summary.minor_years, 0);
        assert_eq!(report.summary.moderate_years, 1);
        assert_eq!(report.summary.severe_years, 1);
        // (0.5 + 1.0) over 20 years
        assert_relative_eq!(report.summary.average_annual_payout_rate, 0.075);
    }

    #[test]
    fn test_empty_history_produces_empty_report() {
        let report = run(&history(10, vec![]), 3.0);
        assert!(report.rows.is_empty());
        assert_eq!(report.summary.triggered_years, 0);
        assert_eq!(report.summary.average_annual_payout_rate, 0.0);
    }

    #[test]
    fn test_rows_are_oldest_first() {
        let h = history(20, vec![(2019, 5.0), (2010, 4.2), (2015, 2.4)]);
        let report = run(&h, 3.0);
        let years: Vec<u16> = report.rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2010, 2015, 2019]);
    }
}
