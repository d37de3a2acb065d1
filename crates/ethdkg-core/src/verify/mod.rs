//! Cryptographic verification capability
//!
//! The state machine never does curve arithmetic itself. Whenever a
//! submission or accusation depends on a curve check, pairing check or
//! proof, it hands a [`Claim`] to a [`Verifier`] and only acts on the
//! accept/reject answer.

use crate::types::{Address, DleqProof, G1Point, G2Point, KeyShare};
use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// A statement the state machine needs checked
#[derive(Debug, Clone, Copy)]
pub enum Claim<'a> {
    /// Registration key is a point on G1
    PublicKey {
        participant: Address,
        public_key: &'a G1Point,
    },
    /// A polynomial commitment is a point on G1
    Commitment {
        participant: Address,
        commitment: &'a G1Point,
    },
    /// The DLEQ proof ties the key share to the participant's secret
    KeyShareProof {
        participant: Address,
        key_share: &'a KeyShare,
    },
    /// `e(g1, h2) == e(h1, g2)` for the submitted key share
    KeySharePairing {
        participant: Address,
        key_share: &'a KeyShare,
    },
    /// The master public key matches the sum of all key shares
    MasterPublicKey {
        master_public_key: &'a G2Point,
        key_shares: &'a [G1Point],
    },
    /// The accuser's Diffie-Hellman key with the accused is proven correct
    SharedKeyProof {
        accuser: Address,
        accused: Address,
        shared_key: &'a G1Point,
        proof: &'a DleqProof,
    },
    /// The share the accused encrypted for the accuser matches their
    /// commitments. Accepting means the share is good.
    DistributedShare {
        accuser: Address,
        accused: Address,
        encrypted_shares: &'a [U256],
        commitments: &'a [G1Point],
        shared_key: &'a G1Point,
    },
    /// The GPKj of `accused` is consistent with the round's commitments.
    /// Accepting means the GPKj is good.
    Gpkj {
        accused: Address,
        gpkj: &'a G2Point,
        proof: &'a [u8],
    },
}

/// Discriminant of a [`Claim`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClaimKind {
    PublicKey,
    Commitment,
    KeyShareProof,
    KeySharePairing,
    MasterPublicKey,
    SharedKeyProof,
    DistributedShare,
    Gpkj,
}

impl Claim<'_> {
    pub fn kind(&self) -> ClaimKind {
        match self {
            Claim::PublicKey { .. } => ClaimKind::PublicKey,
            Claim::Commitment { .. } => ClaimKind::Commitment,
            Claim::KeyShareProof { .. } => ClaimKind::KeyShareProof,
            Claim::KeySharePairing { .. } => ClaimKind::KeySharePairing,
            Claim::MasterPublicKey { .. } => ClaimKind::MasterPublicKey,
            Claim::SharedKeyProof { .. } => ClaimKind::SharedKeyProof,
            Claim::DistributedShare { .. } => ClaimKind::DistributedShare,
            Claim::Gpkj { .. } => ClaimKind::Gpkj,
        }
    }

    /// The participant whose data the claim is about, if any
    pub fn subject(&self) -> Option<Address> {
        match self {
            Claim::PublicKey { participant, .. }
            | Claim::Commitment { participant, .. }
            | Claim::KeyShareProof { participant, .. }
            | Claim::KeySharePairing { participant, .. } => Some(*participant),
            Claim::SharedKeyProof { accused, .. }
            | Claim::DistributedShare { accused, .. }
            | Claim::Gpkj { accused, .. } => Some(*accused),
            Claim::MasterPublicKey { .. } => None,
        }
    }
}

/// Accept/reject oracle for [`Claim`]s
pub trait Verifier: Send + Sync {
    fn verify(&self, claim: &Claim<'_>) -> bool;
}

impl<F> Verifier for F
where
    F: Fn(&Claim<'_>) -> bool + Send + Sync,
{
    fn verify(&self, claim: &Claim<'_>) -> bool {
        self(claim)
    }
}

/// Scripted verifier for testing
pub mod scripted;

pub use scripted::ScriptedVerifier;
