//! Core data types for the Parapet coverage engine

pub mod attestation;
pub mod feed;
pub mod hazard;
pub mod payout;
pub mod policy;
pub mod premium;
