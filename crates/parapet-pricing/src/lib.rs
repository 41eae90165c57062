//! # Parapet Pricing
//!
//! Pure actuarial computation for the Parapet coverage engine.
//!
//! - [`actuarial::PricingEngine`]: frequency/severity premium pricing with
//!   credibility-weighted risk loading
//! - [`payout`]: the graded payout-tier table applied to money, shared by
//!   quotes and claims
//! - [`backtest`]: year-by-year replay of a trigger against history
//!
//! Nothing in this crate performs I/O; every function is deterministic in
//! its inputs.

pub mod actuarial;
pub mod backtest;
pub mod payout;

pub use actuarial::{PricingAssumptions, PricingEngine};
pub use backtest::{BacktestReport, BacktestSummary, BacktestYear};
pub use payout::{evaluate, preview, trigger_ratio, PayoutPreviewRow};
