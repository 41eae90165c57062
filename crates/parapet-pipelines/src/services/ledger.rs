//! Settlement ledger access.
//!
//! The ledger is the system of record for minted coverage and executed
//! payouts. Reads are idempotent and safe to retry; writes move funds
//! and are issued exactly once by the pipelines. [`InMemoryLedger`]
//! mirrors the deployed contract closely enough for end-to-end tests:
//! sequential policy ids, a pool balance fed by premiums and drained by
//! payouts, and deterministic transaction handles.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use parapet_common::{LedgerError, LedgerProof, NewPolicy, PoolType};

/// Signing capability for ledger writes.
///
/// Pipelines that hold no signer skip the ledger entirely; passing one
/// by reference is what authorizes a write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signer {
    pub account: String,
}

impl Signer {
    pub fn new(account: &str) -> Self {
        Self {
            account: account.to_string(),
        }
    }
}

/// Receipt for a successful policy mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MintReceipt {
    /// Transaction handle on the ledger.
    pub tx_handle: String,
    /// Ledger-assigned policy id, distinct from the store's UUID.
    pub ledger_policy_id: u64,
}

/// Receipt for an executed payout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutReceipt {
    pub tx_handle: String,
}

/// Ledger-side view of a policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerPolicy {
    pub ledger_policy_id: u64,
    pub owner: String,
    pub pool_type: PoolType,
    pub coverage_amount: Decimal,
    pub premium_amount: Decimal,
    pub paid_out: bool,
}

/// Read/write access to the settlement ledger.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerService: Send + Sync {
    /// Number of policies ever minted.
    async fn read_policy_count(&self) -> Result<u64, LedgerError>;

    /// Current pool balance backing payouts.
    async fn read_pool_balance(&self) -> Result<Decimal, LedgerError>;

    /// Ledger view of a single policy.
    async fn read_policy(&self, ledger_policy_id: u64) -> Result<LedgerPolicy, LedgerError>;

    /// Mints coverage on the ledger. The premium is credited to the pool.
    async fn mint_policy(
        &self,
        signer: &Signer,
        policy: &NewPolicy,
    ) -> Result<MintReceipt, LedgerError>;

    /// Pays out against a confirmed attestation proof and closes the policy.
    async fn trigger_payout(
        &self,
        signer: &Signer,
        ledger_policy_id: u64,
        proof: &LedgerProof,
        amount: Decimal,
    ) -> Result<PayoutReceipt, LedgerError>;
}

/// Read/write counters exposed by [`InMemoryLedger`].
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LedgerMetrics {
    pub reads: u64,
    pub writes: u64,
}

/// In-memory stand-in for the settlement contract.
pub struct InMemoryLedger {
    policies: DashMap<u64, LedgerPolicy>,
    next_id: AtomicU64,
    balance: RwLock<Decimal>,
    reads: AtomicU64,
    writes: AtomicU64,
    failing_reads: AtomicU32,
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            policies: DashMap::new(),
            next_id: AtomicU64::new(1),
            balance: RwLock::new(Decimal::ZERO),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            failing_reads: AtomicU32::new(0),
        }
    }

    /// Seeds the pool balance, as a funded deployment would be.
    pub fn with_balance(self, balance: Decimal) -> Self {
        *self.balance.write() = balance;
        self
    }

    /// Makes the next `count` reads fail with a transient error.
    pub fn with_failing_reads(self, count: u32) -> Self {
        self.failing_reads.store(count, Ordering::SeqCst);
        self
    }

    pub fn metrics(&self) -> LedgerMetrics {
        LedgerMetrics {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }

    fn record_read(&self) -> Result<(), LedgerError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        // Atomic decrement; reads race under try_join.
        let injected = self
            .failing_reads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(LedgerError::ReadFailed(
                "ledger endpoint unavailable".to_string(),
            ));
        }
        Ok(())
    }

    fn check_signer(signer: &Signer) -> Result<(), LedgerError> {
        if signer.account.trim().is_empty() {
            return Err(LedgerError::SignerRequired);
        }
        Ok(())
    }

    fn tx_handle(&self, op: &str, ledger_policy_id: u64, detail: &str) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(op.as_bytes());
        hasher.update(&ledger_policy_id.to_le_bytes());
        hasher.update(detail.as_bytes());
        format!("0x{}", hex::encode(&hasher.finalize().as_bytes()[..20]))
    }
}

#[async_trait]
impl LedgerService for InMemoryLedger {
    async fn read_policy_count(&self) -> Result<u64, LedgerError> {
        self.record_read()?;
        Ok(self.policies.len() as u64)
    }

    async fn read_pool_balance(&self) -> Result<Decimal, LedgerError> {
        self.record_read()?;
        Ok(*self.balance.read())
    }

    async fn read_policy(&self, ledger_policy_id: u64) -> Result<LedgerPolicy, LedgerError> {
        self.record_read()?;
        self.policies
            .get(&ledger_policy_id)
            .map(|entry| entry.value().clone())
            .ok_or(LedgerError::PolicyNotFound {
                policy_id: ledger_policy_id,
            })
    }

    async fn mint_policy(
        &self,
        signer: &Signer,
        policy: &NewPolicy,
    ) -> Result<MintReceipt, LedgerError> {
        Self::check_signer(signer)?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let ledger_policy_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let tx_handle = self.tx_handle("mint", ledger_policy_id, &signer.account);

        self.policies.insert(
            ledger_policy_id,
            LedgerPolicy {
                ledger_policy_id,
                owner: signer.account.clone(),
                pool_type: policy.pool_type,
                coverage_amount: policy.coverage_amount,
                premium_amount: policy.premium_amount,
                paid_out: false,
            },
        );
        *self.balance.write() += policy.premium_amount;

        info!(
            ledger_policy_id,
            tx_handle = %tx_handle,
            pool_type = %policy.pool_type,
            "policy minted on ledger"
        );
        Ok(MintReceipt {
            tx_handle,
            ledger_policy_id,
        })
    }

    async fn trigger_payout(
        &self,
        signer: &Signer,
        ledger_policy_id: u64,
        proof: &LedgerProof,
        amount: Decimal,
    ) -> Result<PayoutReceipt, LedgerError> {
        Self::check_signer(signer)?;
        self.writes.fetch_add(1, Ordering::SeqCst);

        let mut entry = self
            .policies
            .get_mut(&ledger_policy_id)
            .ok_or(LedgerError::PolicyNotFound {
                policy_id: ledger_policy_id,
            })?;
        if entry.paid_out {
            return Err(LedgerError::AlreadyPaidOut {
                policy_id: ledger_policy_id,
            });
        }

        let mut balance = self.balance.write();
        if *balance < amount {
            return Err(LedgerError::InsufficientPoolBalance {
                requested: amount.to_string(),
                available: balance.to_string(),
            });
        }
        *balance -= amount;
        entry.paid_out = true;

        let tx_handle = self.tx_handle("payout", ledger_policy_id, &proof.attestation_handle);
        info!(
            ledger_policy_id,
            tx_handle = %tx_handle,
            %amount,
            "payout executed on ledger"
        );
        Ok(PayoutReceipt { tx_handle })
    }
}
