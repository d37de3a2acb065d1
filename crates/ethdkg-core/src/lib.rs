//! # ETHDKG Core
//!
//! Phase state machine, share ledger and accusation engine for the ETHDKG
//! distributed key generation protocol.
//!
//! A round moves through registration, share distribution, key share
//! submission, master public key submission and GPKj submission. Each phase
//! is followed by a dispute window in which missing or malicious
//! participants can be accused and reported to the validator pool.
//!
//! Curve arithmetic is out of scope: every cryptographic check is delegated
//! to a [`Verifier`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use ethdkg_core::{Call, DkgConfig, Ethdkg, MemoryValidatorPool, ScriptedVerifier};
//!
//! let pool = MemoryValidatorPool::with_validators(validators);
//! let mut engine = Ethdkg::new(DkgConfig::default(), pool, ScriptedVerifier::new())?;
//!
//! let mut round = engine.initialize(height)?;
//! engine.register(&mut round, Call::new(validator, height), public_key)?;
//! ```

pub mod error;
pub mod ethdkg;
pub mod ledger;
pub mod phase;
pub mod pool;
pub mod types;
pub mod verify;

pub use error::{Error, ErrorCategory, Result};
pub use ethdkg::{Ethdkg, Event, Round};
pub use phase::{Phase, PhaseWindow, Schedule, Slot, Stage};
pub use pool::{MemoryValidatorPool, RoundOutcome, Slash, SlashKind, ValidatorPool};
pub use types::{threshold, Address, Call, DkgConfig, DleqProof, G1Point, G2Point, Height, KeyShare};
pub use verify::{Claim, ClaimKind, ScriptedVerifier, Verifier};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default length of a phase window, in blocks
pub const DEFAULT_PHASE_LENGTH: u64 = 40;

/// Smallest validator set a round can be opened with
pub const MIN_VALIDATORS: usize = 4;
