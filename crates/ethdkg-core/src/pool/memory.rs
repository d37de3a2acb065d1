//! In-memory validator pool for local testing

use super::{RoundOutcome, Slash, ValidatorPool};
use crate::types::Address;
use dashmap::DashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory validator pool that records slashes instead of applying them
#[derive(Clone, Default)]
pub struct MemoryValidatorPool {
    validators: Arc<DashSet<Address>>,
    nonce: Arc<AtomicU64>,
    slashes: Arc<Mutex<Vec<Slash>>>,
    outcomes: Arc<Mutex<Vec<RoundOutcome>>>,
}

impl MemoryValidatorPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pool holding `validators`
    pub fn with_validators(validators: impl IntoIterator<Item = Address>) -> Self {
        let pool = Self::new();
        for validator in validators {
            pool.validators.insert(validator);
        }
        pool
    }

    /// Add a validator, bumping the set nonce
    pub fn add_validator(&self, address: Address) {
        if self.validators.insert(address) {
            self.nonce.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Remove a validator, bumping the set nonce
    pub fn remove_validator(&self, address: &Address) {
        if self.validators.remove(address).is_some() {
            self.nonce.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Slashes reported so far, oldest first
    pub fn slashes(&self) -> Vec<Slash> {
        lock(&self.slashes).clone()
    }

    /// Completed rounds reported so far
    pub fn outcomes(&self) -> Vec<RoundOutcome> {
        lock(&self.outcomes).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ValidatorPool for MemoryValidatorPool {
    fn is_validator(&self, address: &Address) -> bool {
        self.validators.contains(address)
    }

    fn validator_addresses(&self) -> Vec<Address> {
        let mut addresses: Vec<Address> = self.validators.iter().map(|a| *a).collect();
        addresses.sort();
        addresses
    }

    fn validator_count(&self) -> usize {
        self.validators.len()
    }

    fn nonce(&self) -> u64 {
        self.nonce.load(Ordering::SeqCst)
    }

    fn slash(&self, slash: &Slash) {
        lock(&self.slashes).push(slash.clone());
    }

    fn round_completed(&self, outcome: &RoundOutcome) {
        lock(&self.outcomes).push(outcome.clone());
    }
}
