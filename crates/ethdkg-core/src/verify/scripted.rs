//! Scripted verifier for local testing and simulation

use super::{Claim, ClaimKind, Verifier};
use crate::types::Address;
use dashmap::DashSet;
use std::sync::Arc;

/// Accepts every claim except the ones scripted to fail.
///
/// A rejection can target a claim kind for everyone or only for one subject
/// address (see [`Claim::subject`]).
#[derive(Clone, Default)]
pub struct ScriptedVerifier {
    rejections: Arc<DashSet<(ClaimKind, Option<Address>)>>,
}

impl ScriptedVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every claim of `kind`
    pub fn reject(&self, kind: ClaimKind) -> &Self {
        self.rejections.insert((kind, None));
        self
    }

    /// Reject claims of `kind` about `subject`
    pub fn reject_for(&self, kind: ClaimKind, subject: Address) -> &Self {
        self.rejections.insert((kind, Some(subject)));
        self
    }

    /// Drop every scripted rejection
    pub fn clear(&self) {
        self.rejections.clear();
    }
}

impl Verifier for ScriptedVerifier {
    fn verify(&self, claim: &Claim<'_>) -> bool {
        let kind = claim.kind();
        if self.rejections.contains(&(kind, None)) {
            return false;
        }
        match claim.subject() {
            Some(subject) => !self.rejections.contains(&(kind, Some(subject))),
            None => true,
        }
    }
}
