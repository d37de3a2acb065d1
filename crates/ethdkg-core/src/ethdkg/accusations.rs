//! Accusation entry points
//!
//! Missing-submission accusations take a batch of addresses and are open to
//! any caller during the dispute window of the phase in question. The batch
//! is checked in full before anything is written.
//!
//! Malicious-submission accusations carry evidence and must come from a
//! registered participant in good standing.

use super::{Ethdkg, Round};
use crate::ledger::{shares_hash, Participant, ShareLedger};
use crate::phase::{Phase, Slot};
use crate::pool::{SlashKind, ValidatorPool};
use crate::types::{Address, Call, DleqProof, G1Point};
use crate::verify::{Claim, Verifier};
use crate::{Error, Result};
use primitive_types::U256;
use std::collections::BTreeSet;
use tracing::instrument;

/// Registered, then the per-phase submission check
fn missing(
    ledger: &ShareLedger,
    accused: Address,
    submitted: impl Fn(&Participant) -> bool,
    did_submit: fn(Address) -> Error,
) -> Result<()> {
    let participant = ledger
        .participant(&accused)
        .ok_or(Error::AccusedNotParticipatingInRound(accused))?;
    if submitted(participant) {
        return Err(did_submit(accused));
    }
    Ok(())
}

impl<P: ValidatorPool, V: Verifier> Ethdkg<P, V> {
    /// Validate a whole batch, then mark every accused bad
    fn accuse_missing(
        &self,
        round: &mut Round,
        call: Call,
        accused: &[Address],
        phase: Phase,
        check: impl Fn(&ShareLedger, Address) -> Result<()>,
    ) -> Result<()> {
        self.check_nonce(round)?;
        round.schedule.require(call.height, &[(phase, Slot::Dispute)])?;

        let mut seen = BTreeSet::new();
        for &address in accused {
            if !self.pool.is_validator(&address)
                || round.ledger.is_bad(&address)
                || !seen.insert(address)
            {
                return Err(Error::AccusedNotValidator(address));
            }
            check(&round.ledger, address)?;
        }

        for &address in accused {
            self.penalize(round, call.caller, address, phase, SlashKind::Minor);
        }
        Ok(())
    }

    /// Accuse validators that never registered
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height, accused = accused.len()))]
    pub fn accuse_participant_not_registered(
        &self,
        round: &mut Round,
        call: Call,
        accused: &[Address],
    ) -> Result<()> {
        self.accuse_missing(round, call, accused, Phase::RegistrationOpen, |ledger, address| {
            if ledger.is_registered(&address) {
                return Err(Error::AccusedParticipatingInRound(address));
            }
            Ok(())
        })
    }

    /// Accuse registered participants that did not distribute shares
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height, accused = accused.len()))]
    pub fn accuse_participant_did_not_distribute_shares(
        &self,
        round: &mut Round,
        call: Call,
        accused: &[Address],
    ) -> Result<()> {
        self.accuse_missing(round, call, accused, Phase::ShareDistribution, |ledger, address| {
            missing(
                ledger,
                address,
                Participant::has_distributed_shares,
                Error::AccusedDistributedSharesInRound,
            )
        })
    }

    /// Accuse registered participants that did not submit key shares
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height, accused = accused.len()))]
    pub fn accuse_participant_did_not_submit_key_shares(
        &self,
        round: &mut Round,
        call: Call,
        accused: &[Address],
    ) -> Result<()> {
        self.accuse_missing(round, call, accused, Phase::KeyShareSubmission, |ledger, address| {
            missing(
                ledger,
                address,
                Participant::has_key_share,
                Error::AccusedSubmittedSharesInRound,
            )
        })
    }

    /// Accuse registered participants that did not submit a GPKj
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height, accused = accused.len()))]
    pub fn accuse_participant_did_not_submit_gpkj(
        &self,
        round: &mut Round,
        call: Call,
        accused: &[Address],
    ) -> Result<()> {
        self.accuse_missing(round, call, accused, Phase::GPKJSubmission, |ledger, address| {
            missing(
                ledger,
                address,
                Participant::has_gpkj,
                Error::AccusedDidNotParticipateInGPKJSubmission,
            )
        })
    }

    /// Accused must be a validator in good standing that registered
    fn require_accused<'r>(&self, round: &'r Round, accused: Address) -> Result<&'r Participant> {
        if !self.pool.is_validator(&accused) || round.ledger.is_bad(&accused) {
            return Err(Error::AccusedNotValidator(accused));
        }
        round
            .ledger
            .participant(&accused)
            .ok_or(Error::AccusedNotParticipatingInRound(accused))
    }

    /// Prove that `dishonest` encrypted an inconsistent share for the caller.
    ///
    /// The caller republishes the accused's encrypted shares and commitments
    /// and reveals the shared key they use with the accused, together with a
    /// proof that the key is correct.
    #[allow(clippy::too_many_arguments)]
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height, ?dishonest))]
    pub fn accuse_participant_distributed_bad_shares(
        &self,
        round: &mut Round,
        call: Call,
        dishonest: Address,
        encrypted_shares: &[U256],
        commitments: &[G1Point],
        shared_key: G1Point,
        shared_key_proof: DleqProof,
    ) -> Result<()> {
        self.check_nonce(round)?;
        round
            .schedule
            .require(call.height, &[(Phase::DisputeShareDistribution, Slot::Open)])?;
        self.require_participant(round, call.caller)?;
        let accused = self.require_accused(round, dishonest)?;

        let stored = accused
            .distributed_shares_hash
            .ok_or(Error::AccusedDidNotDistributeSharesInRound(dishonest))?;
        let provided = shares_hash(encrypted_shares, commitments);
        if provided != stored {
            return Err(Error::SharesAndCommitmentsMismatch {
                expected: hex::encode(stored.as_bytes()),
                actual: hex::encode(provided.as_bytes()),
            });
        }

        let key_proof = Claim::SharedKeyProof {
            accuser: call.caller,
            accused: dishonest,
            shared_key: &shared_key,
            proof: &shared_key_proof,
        };
        if !self.verifier.verify(&key_proof) {
            return Err(Error::InvalidSharedSecretProof);
        }

        let share = Claim::DistributedShare {
            accuser: call.caller,
            accused: dishonest,
            encrypted_shares,
            commitments,
            shared_key: &shared_key,
        };
        if self.verifier.verify(&share) {
            return Err(Error::DistributedShareIsValid(dishonest));
        }

        self.penalize(
            round,
            call.caller,
            dishonest,
            Phase::DisputeShareDistribution,
            SlashKind::Major,
        );
        Ok(())
    }

    /// Prove that `accused` submitted a GPKj inconsistent with the round's
    /// commitments. `proof` is passed to the verifier untouched.
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height, ?accused))]
    pub fn accuse_participant_submitted_bad_gpkj(
        &self,
        round: &mut Round,
        call: Call,
        accused: Address,
        proof: &[u8],
    ) -> Result<()> {
        self.check_nonce(round)?;
        round
            .schedule
            .require(call.height, &[(Phase::DisputeGPKJSubmission, Slot::Open)])?;
        self.require_participant(round, call.caller)?;
        let participant = self.require_accused(round, accused)?;

        let gpkj = participant
            .gpkj
            .ok_or(Error::AccusedDidNotSubmitGPKJInRound(accused))?;
        let claim = Claim::Gpkj {
            accused,
            gpkj: &gpkj,
            proof,
        };
        if self.verifier.verify(&claim) {
            return Err(Error::GPKJIsValid(accused));
        }

        self.penalize(
            round,
            call.caller,
            accused,
            Phase::DisputeGPKJSubmission,
            SlashKind::Major,
        );
        Ok(())
    }
}
