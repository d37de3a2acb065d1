//! Core types for the ETHDKG protocol

use primitive_types::{H160, U256};
use serde::{Deserialize, Serialize};

/// Account address of a validator or caller
pub type Address = H160;

/// Block height, the only clock the protocol knows about
pub type Height = u64;

/// Caller identity and the authoritative height at which a call executes.
///
/// Every state-mutating entry point takes a `Call`; the core never reads a
/// clock of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Account invoking the operation
    pub caller: Address,
    /// Height the operation executes at
    pub height: Height,
}

impl Call {
    /// Create a new call context
    pub fn new(caller: Address, height: Height) -> Self {
        Self { caller, height }
    }
}

/// Affine point on G1, as two field elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct G1Point {
    pub x: U256,
    pub y: U256,
}

impl G1Point {
    /// The point at infinity encoding
    pub const ZERO: G1Point = G1Point {
        x: U256([0; 4]),
        y: U256([0; 4]),
    };

    pub fn new(x: impl Into<U256>, y: impl Into<U256>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    /// Whether this is the identity encoding
    pub fn is_zero(&self) -> bool {
        self.x.is_zero() && self.y.is_zero()
    }

    /// Big-endian 64-byte encoding
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut bytes = [0u8; 64];
        self.x.to_big_endian(&mut bytes[..32]);
        self.y.to_big_endian(&mut bytes[32..]);
        bytes
    }
}

/// Affine point on G2, as four field elements (two per coordinate)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct G2Point {
    pub x0: U256,
    pub x1: U256,
    pub y0: U256,
    pub y1: U256,
}

impl G2Point {
    pub const ZERO: G2Point = G2Point {
        x0: U256([0; 4]),
        x1: U256([0; 4]),
        y0: U256([0; 4]),
        y1: U256([0; 4]),
    };

    pub fn new(coords: [U256; 4]) -> Self {
        Self {
            x0: coords[0],
            x1: coords[1],
            y0: coords[2],
            y1: coords[3],
        }
    }

    pub fn is_zero(&self) -> bool {
        self.x0.is_zero() && self.x1.is_zero() && self.y0.is_zero() && self.y1.is_zero()
    }
}

/// Discrete-log-equality proof `(c, r)` attached to key shares and shared keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DleqProof {
    pub c: U256,
    pub r: U256,
}

impl DleqProof {
    pub fn new(c: impl Into<U256>, r: impl Into<U256>) -> Self {
        Self {
            c: c.into(),
            r: r.into(),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.c.is_zero() && self.r.is_zero()
    }
}

/// A submitted key share: `g1` with its correctness proof, and the matching `g2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyShare {
    pub g1: G1Point,
    pub g1_proof: DleqProof,
    pub g2: G2Point,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DkgConfig {
    /// Length in blocks of every phase window
    pub phase_length: u64,

    /// Blocks between an early phase exit and the next phase's start
    pub confirmation_length: u64,

    /// Smallest validator set a round may be opened with
    pub min_validators: usize,

    /// Ceiling on bad participants accepted at completion (None: no ceiling)
    pub max_bad_participants: Option<u32>,
}

impl Default for DkgConfig {
    fn default() -> Self {
        Self {
            phase_length: crate::DEFAULT_PHASE_LENGTH,
            confirmation_length: 0,
            min_validators: crate::MIN_VALIDATORS,
            max_bad_participants: None,
        }
    }
}

impl DkgConfig {
    /// Create a validated configuration with the given phase length
    pub fn new(phase_length: u64, confirmation_length: u64) -> crate::Result<Self> {
        let config = Self {
            phase_length,
            confirmation_length,
            ..Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the scheduler cannot work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.phase_length == 0 {
            return Err(crate::Error::InvalidConfig(
                "Phase length must be positive".into(),
            ));
        }
        if self.min_validators == 0 {
            return Err(crate::Error::InvalidConfig(
                "Minimum validators must be at least 1".into(),
            ));
        }
        self.phase_length
            .checked_mul(2)
            .and_then(|twice| twice.checked_add(self.confirmation_length))
            .ok_or_else(|| crate::Error::InvalidConfig("Phase length overflows height".into()))?;
        Ok(())
    }
}

/// Polynomial degree `t` for `n` participants.
///
/// Consensus requires `t + 1 > 2n/3`.
pub fn threshold(n_participants: usize) -> usize {
    let quotient = n_participants / 3;
    let mut threshold = 2 * quotient;
    if n_participants - 3 * quotient == 2 {
        threshold += 1;
    }
    threshold
}
