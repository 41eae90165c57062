//! # Parapet Pipelines
//!
//! Composition layer of the Parapet engine: wires the collaborator
//! services into a [`ServiceBundle`] and exposes the product operations
//! as pipelines over it.
//!
//! ## Pipelines
//!
//! - [`pipelines::quote`] / [`pipelines::backtest`]: price coverage and
//!   replay the trigger against history
//! - [`pipelines::read_and_classify`]: live reading with attestation context
//! - [`pipelines::validate_and_mint`]: create a policy, on ledger and in
//!   the store
//! - [`pipelines::trigger_payout`]: evaluate and settle a claim through
//!   attestation consensus
//! - [`pipelines::aggregate_pool_stats`] / [`pipelines::snapshot_prices`]:
//!   pool accounting and feed capture
//!
//! ## Services
//!
//! - [`services::PriceFeedService`], [`services::LedgerService`],
//!   [`services::DatabaseService`]: the collaborator seams, with in-memory
//!   implementations for local runs and tests

pub mod config;
pub mod pipelines;
pub mod services;

pub use config::{EngineConfig, RetrySettings};
pub use pipelines::{
    aggregate_pool_stats, backtest, current_prices, price_history, quote, read_and_classify,
    snapshot_prices, trigger_payout, validate_and_mint, BacktestOutcome, ClaimOutcome,
    ClassifiedReading, MintOutcome, MintRequest, PoolReport, Quote, QuoteRequest, RoundSummary,
};
pub use services::{
    DatabaseService, InMemoryDatabase, InMemoryLedger, LedgerService, PriceFeedService,
    ServiceBundle, Signer, StaticPriceFeed,
};
