//! Submission entry points
//!
//! Each stored phase has one submission call. A phase ends early once every
//! eligible participant has submitted; otherwise its dispute window follows.

use super::{Ethdkg, Event, Round};
use crate::ledger::shares_hash;
use crate::phase::{Phase, Slot};
use crate::pool::{RoundOutcome, ValidatorPool};
use crate::types::{threshold, Call, G1Point, G2Point, KeyShare};
use crate::verify::{Claim, Verifier};
use crate::{Error, Result};
use primitive_types::U256;
use tracing::{debug, info, instrument};

impl<P: ValidatorPool, V: Verifier> Ethdkg<P, V> {
    /// Register the caller's encryption public key
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height))]
    pub fn register(&self, round: &mut Round, call: Call, public_key: G1Point) -> Result<()> {
        self.check_nonce(round)?;
        round
            .schedule
            .require(call.height, &[(Phase::RegistrationOpen, Slot::Open)])?;
        self.require_validator(round, call.caller)?;

        if public_key.is_zero() {
            return Err(Error::PublicKeyZero);
        }
        let claim = Claim::PublicKey {
            participant: call.caller,
            public_key: &public_key,
        };
        if !self.verifier.verify(&claim) {
            return Err(Error::PublicKeyNotOnCurve);
        }
        if round.ledger.is_registered(&call.caller) {
            return Err(Error::ParticipantParticipatingInRound(call.caller));
        }

        let index = round.ledger.register(call.caller, public_key).index;
        round.emit(Event::AddressRegistered {
            account: call.caller,
            index,
            nonce: round.nonce,
            public_key,
        });
        debug!(index, "Address registered");

        if round.ledger.registered_count() == self.pool.validator_count() {
            round.emit(Event::RegistrationComplete {
                height: call.height,
            });
            self.advance(round, Phase::ShareDistribution, call.height);
        }
        Ok(())
    }

    /// Publish encrypted shares for every other participant and the
    /// commitments to the caller's polynomial
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height))]
    pub fn distribute_shares(
        &self,
        round: &mut Round,
        call: Call,
        encrypted_shares: Vec<U256>,
        commitments: Vec<G1Point>,
    ) -> Result<()> {
        self.check_nonce(round)?;
        round
            .schedule
            .require(call.height, &[(Phase::ShareDistribution, Slot::Open)])?;
        let participant = self.require_participant(round, call.caller)?;
        if participant.has_distributed_shares() {
            return Err(Error::ParticipantDistributedSharesInRound(call.caller));
        }

        let n = round.ledger.registered_count();
        let expected_shares = n.saturating_sub(1);
        if encrypted_shares.len() != expected_shares {
            return Err(Error::InvalidEncryptedSharesAmount {
                got: encrypted_shares.len(),
                expected: expected_shares,
            });
        }
        let expected_commitments = threshold(n) + 1;
        if commitments.len() != expected_commitments {
            return Err(Error::InvalidCommitmentsAmount {
                got: commitments.len(),
                expected: expected_commitments,
            });
        }
        for commitment in &commitments {
            if commitment.is_zero() {
                return Err(Error::CommitmentZero);
            }
            let claim = Claim::Commitment {
                participant: call.caller,
                commitment,
            };
            if !self.verifier.verify(&claim) {
                return Err(Error::CommitmentNotOnCurve);
            }
        }

        let hash = shares_hash(&encrypted_shares, &commitments);
        let (index, nonce) = (participant.index, round.nonce);
        if let Some(entry) = round.ledger.participant_mut(&call.caller) {
            entry.distributed_shares_hash = Some(hash);
            entry.commitments_first_coefficient = commitments.first().copied();
        }
        round.emit(Event::SharesDistributed {
            account: call.caller,
            index,
            nonce,
            shares_hash: hash,
            encrypted_shares,
            commitments,
        });
        debug!(index, shares_hash = %hex::encode(hash.as_bytes()), "Shares distributed");

        if round.ledger.all_eligible(|p| p.has_distributed_shares()) {
            round.emit(Event::ShareDistributionComplete {
                height: call.height,
            });
            self.advance(round, Phase::DisputeShareDistribution, call.height);
        }
        Ok(())
    }

    /// Submit the caller's key share.
    ///
    /// Accepted during key share submission and in the window after the
    /// bad-share dispute; the first submission in that later window moves the
    /// stored phase to key share submission starting at the current height.
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height))]
    pub fn submit_key_share(&self, round: &mut Round, call: Call, key_share: KeyShare) -> Result<()> {
        self.check_nonce(round)?;
        round.schedule.require(
            call.height,
            &[
                (Phase::KeyShareSubmission, Slot::Open),
                (Phase::DisputeShareDistribution, Slot::Dispute),
            ],
        )?;
        let participant = self.require_participant(round, call.caller)?;
        if participant.has_key_share() {
            return Err(Error::ParticipantSubmittedKeysharesInRound(call.caller));
        }

        if key_share.g1.is_zero() || key_share.g1_proof.is_zero() {
            return Err(Error::InvalidKeyshareG1);
        }
        let proof = Claim::KeyShareProof {
            participant: call.caller,
            key_share: &key_share,
        };
        if !self.verifier.verify(&proof) {
            return Err(Error::InvalidKeyshareG1);
        }
        if key_share.g2.is_zero() {
            return Err(Error::InvalidKeyshareG2);
        }
        let pairing = Claim::KeySharePairing {
            participant: call.caller,
            key_share: &key_share,
        };
        if !self.verifier.verify(&pairing) {
            return Err(Error::InvalidKeyshareG2);
        }

        let index = participant.index;
        if round.phase() == Phase::DisputeShareDistribution {
            round
                .schedule
                .advance(Phase::KeyShareSubmission, call.height);
            info!(round = round.number, start = call.height, "Key share submission opened");
        }
        if let Some(entry) = round.ledger.participant_mut(&call.caller) {
            entry.key_share = Some(key_share);
        }
        round.emit(Event::KeyShareSubmitted {
            account: call.caller,
            index,
            nonce: round.nonce,
            key_share,
        });
        debug!(index, "Key share submitted");

        if round.ledger.all_eligible(|p| p.has_key_share()) {
            round.emit(Event::KeyShareSubmissionComplete {
                height: call.height,
            });
            self.advance(round, Phase::MPKSubmission, call.height);
        }
        Ok(())
    }

    /// Submit the master public key assembled from every key share
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height))]
    pub fn submit_master_public_key(
        &self,
        round: &mut Round,
        call: Call,
        master_public_key: G2Point,
    ) -> Result<()> {
        self.check_nonce(round)?;
        round
            .schedule
            .require(call.height, &[(Phase::MPKSubmission, Slot::Open)])?;
        self.require_participant(round, call.caller)?;

        if master_public_key.is_zero() {
            return Err(Error::MasterPublicKeyZero);
        }
        let key_shares = round.ledger.key_share_g1s();
        let claim = Claim::MasterPublicKey {
            master_public_key: &master_public_key,
            key_shares: &key_shares,
        };
        if !self.verifier.verify(&claim) {
            return Err(Error::MasterPublicKeyPairingCheckFailure);
        }

        round.ledger.set_master_public_key(master_public_key);
        round.emit(Event::MPKSet {
            height: call.height,
            nonce: round.nonce,
            master_public_key,
        });
        info!(round = round.number, key_shares = key_shares.len(), "Master public key set");
        self.advance(round, Phase::GPKJSubmission, call.height);
        Ok(())
    }

    /// Submit the caller's group public key share
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height))]
    pub fn submit_gpkj(&self, round: &mut Round, call: Call, gpkj: G2Point) -> Result<()> {
        self.check_nonce(round)?;
        round
            .schedule
            .require(call.height, &[(Phase::GPKJSubmission, Slot::Open)])?;
        let participant = self.require_participant(round, call.caller)?;
        if participant.has_gpkj() {
            return Err(Error::ParticipantSubmittedGPKJInRound(call.caller));
        }
        if gpkj.is_zero() {
            return Err(Error::GPKJZero);
        }

        let index = participant.index;
        if let Some(entry) = round.ledger.participant_mut(&call.caller) {
            entry.gpkj = Some(gpkj);
        }
        round.emit(Event::ValidatorMemberAdded {
            account: call.caller,
            index,
            nonce: round.nonce,
            gpkj,
        });
        debug!(index, "GPKj submitted");

        if round.ledger.all_eligible(|p| p.has_gpkj()) {
            round.emit(Event::GPKJSubmissionComplete {
                height: call.height,
            });
            self.advance(round, Phase::DisputeGPKJSubmission, call.height);
        }
        Ok(())
    }

    /// Close the round once the bad-GPKj dispute window has passed and hand
    /// the resulting group to the validator pool
    #[instrument(skip_all, fields(round = round.number(), caller = ?call.caller, height = call.height))]
    pub fn complete(&self, round: &mut Round, call: Call) -> Result<()> {
        self.check_nonce(round)?;
        round
            .schedule
            .require(call.height, &[(Phase::DisputeGPKJSubmission, Slot::Dispute)])?;
        self.require_participant(round, call.caller)?;

        let bad = round.ledger.bad_participants();
        if let Some(allowed) = self.config.max_bad_participants {
            if bad > allowed {
                return Err(Error::TooManyBadParticipants {
                    allowed,
                    actual: bad,
                });
            }
        }

        round.schedule.advance(Phase::Completion, call.height);
        let outcome = RoundOutcome {
            round: round.number,
            nonce: round.nonce,
            master_public_key: round.ledger.master_public_key().copied().unwrap_or_default(),
            members: round.ledger.gpkj_members(),
            bad_participants: bad,
        };
        round.emit(Event::ValidatorSetCompleted {
            round: outcome.round,
            nonce: outcome.nonce,
            height: call.height,
            validator_count: outcome.members.len(),
            master_public_key: outcome.master_public_key,
        });
        self.pool.round_completed(&outcome);

        info!(
            round = round.number,
            members = outcome.members.len(),
            bad_participants = bad,
            "Round completed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::ethdkg::testing::*;
    use crate::ethdkg::Event;
    use crate::phase::{Phase, PhaseWindow, Stage};
    use crate::types::{threshold, Call, DkgConfig, G1Point, G2Point};
    use crate::verify::ClaimKind;
    use crate::Error;

    #[test]
    fn test_registration_closes_early() {
        let mut engine = engine(4);
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();

        register_all(&engine, &mut round, &all[..3], START + 2);
        assert_eq!(round.phase(), Phase::RegistrationOpen);

        register_all(&engine, &mut round, &all[3..], START + 3);
        assert_eq!(round.phase(), Phase::ShareDistribution);
        assert_eq!(round.schedule().start(), START + 3);
        assert!(round
            .events()
            .iter()
            .any(|e| matches!(e, Event::RegistrationComplete { height } if *height == START + 3)));
    }

    #[test]
    fn test_register_rejections() {
        let mut engine = engine(4);
        let mut round = engine.initialize(START).unwrap();
        let v = addr(1);

        assert_eq!(
            engine
                .register(&mut round, Call::new(addr(50), START), public_key(&addr(50)))
                .unwrap_err(),
            Error::OnlyValidatorsAllowed(addr(50))
        );
        assert_eq!(
            engine
                .register(&mut round, Call::new(v, START), G1Point::ZERO)
                .unwrap_err(),
            Error::PublicKeyZero
        );

        engine.verifier().reject_for(ClaimKind::PublicKey, v);
        assert_eq!(
            engine
                .register(&mut round, Call::new(v, START), public_key(&v))
                .unwrap_err(),
            Error::PublicKeyNotOnCurve
        );
        engine.verifier().clear();

        engine
            .register(&mut round, Call::new(v, START), public_key(&v))
            .unwrap();
        assert_eq!(
            engine
                .register(&mut round, Call::new(v, START + 1), public_key(&v))
                .unwrap_err(),
            Error::ParticipantParticipatingInRound(v)
        );
    }

    #[test]
    fn test_register_outside_window() {
        let mut engine = engine(4);
        let mut round = engine.initialize(START).unwrap();
        let height = START + PHASE_LENGTH;

        let err = engine
            .register(&mut round, Call::new(addr(1), height), public_key(&addr(1)))
            .unwrap_err();
        assert_eq!(
            err,
            Error::IncorrectPhase {
                current: Phase::RegistrationOpen,
                height,
                expected: vec![PhaseWindow {
                    phase: Phase::RegistrationOpen,
                    start: START,
                    end: START + PHASE_LENGTH,
                }],
            }
        );
        assert_eq!(err.category(), crate::ErrorCategory::PhaseViolation);
    }

    #[test]
    fn test_confirmation_delay() {
        let mut engine = engine_with(4, DkgConfig::new(PHASE_LENGTH, 6).unwrap());
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();
        register_all(&engine, &mut round, &all, START);

        assert_eq!(round.schedule().start(), START + 6);
        assert_eq!(round.stage_at(START + 5), Stage::Pending);
        let (shares, commitments) = shares_for(4, 1);
        assert!(matches!(
            engine.distribute_shares(&mut round, Call::new(all[0], START + 5), shares, commitments),
            Err(Error::IncorrectPhase { .. })
        ));
    }

    #[test]
    fn test_distribute_shares_validation() {
        let mut engine = engine(4);
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();
        register_all(&engine, &mut round, &all, START);
        let call = Call::new(all[0], START + 1);

        let (shares, commitments) = shares_for(4, 1);
        assert_eq!(
            engine
                .distribute_shares(&mut round, call, shares[..2].to_vec(), commitments.clone())
                .unwrap_err(),
            Error::InvalidEncryptedSharesAmount { got: 2, expected: 3 }
        );
        assert_eq!(
            engine
                .distribute_shares(&mut round, call, shares.clone(), commitments[..1].to_vec())
                .unwrap_err(),
            Error::InvalidCommitmentsAmount {
                got: 1,
                expected: threshold(4) + 1
            }
        );

        let mut zeroed = commitments.clone();
        zeroed[1] = G1Point::ZERO;
        assert_eq!(
            engine
                .distribute_shares(&mut round, call, shares.clone(), zeroed)
                .unwrap_err(),
            Error::CommitmentZero
        );

        engine.verifier().reject(ClaimKind::Commitment);
        assert_eq!(
            engine
                .distribute_shares(&mut round, call, shares.clone(), commitments.clone())
                .unwrap_err(),
            Error::CommitmentNotOnCurve
        );
        engine.verifier().clear();

        engine
            .distribute_shares(&mut round, call, shares.clone(), commitments.clone())
            .unwrap();
        let stored = round.participant(&all[0]).unwrap();
        assert_eq!(stored.commitments_first_coefficient, Some(commitments[0]));
        assert_eq!(
            engine
                .distribute_shares(&mut round, call, shares, commitments)
                .unwrap_err(),
            Error::ParticipantDistributedSharesInRound(all[0])
        );
    }

    #[test]
    fn test_unregistered_validator_cannot_distribute() {
        let mut engine = engine(4);
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();
        register_all(&engine, &mut round, &all[..3], START);

        // registration times out, then its dispute window passes
        let height = START + 2 * PHASE_LENGTH;
        assert_eq!(round.stage_at(height), Stage::Stalled);
        assert_eq!(round.phase(), Phase::RegistrationOpen);

        let (shares, commitments) = shares_for(3, 4);
        assert!(matches!(
            engine.distribute_shares(&mut round, Call::new(all[3], height), shares, commitments),
            Err(Error::IncorrectPhase { .. })
        ));
    }

    #[test]
    fn test_key_share_in_implicit_window_moves_phase() {
        let mut engine = engine(4);
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();
        register_all(&engine, &mut round, &all, START);
        distribute_all(&engine, &mut round, &all, START + 1);
        assert_eq!(round.phase(), Phase::DisputeShareDistribution);

        // still inside the bad-share dispute window
        let early = START + 2;
        let err = engine
            .submit_key_share(&mut round, Call::new(all[0], early), key_share(1))
            .unwrap_err();
        assert_eq!(
            err,
            Error::IncorrectPhase {
                current: Phase::DisputeShareDistribution,
                height: early,
                expected: vec![
                    PhaseWindow {
                        phase: Phase::KeyShareSubmission,
                        start: START + 1,
                        end: START + 1 + PHASE_LENGTH,
                    },
                    PhaseWindow {
                        phase: Phase::DisputeShareDistribution,
                        start: START + 1 + PHASE_LENGTH,
                        end: START + 1 + 2 * PHASE_LENGTH,
                    },
                ],
            }
        );

        let height = end_of_open(&round) + 3;
        submit_key_shares(&engine, &mut round, &all[..1], height);
        assert_eq!(round.phase(), Phase::KeyShareSubmission);
        assert_eq!(round.schedule().start(), height);
        assert_eq!(round.stage_at(height + PHASE_LENGTH), Stage::MissingKeyShareDispute);
    }

    #[test]
    fn test_key_share_rejections() {
        let mut engine = engine(4);
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();
        register_all(&engine, &mut round, &all, START);
        distribute_all(&engine, &mut round, &all, START + 1);
        let call = Call::new(all[0], end_of_open(&round));

        let mut bad = key_share(1);
        bad.g1 = G1Point::ZERO;
        assert_eq!(
            engine.submit_key_share(&mut round, call, bad).unwrap_err(),
            Error::InvalidKeyshareG1
        );
        let mut bad = key_share(1);
        bad.g1_proof = Default::default();
        assert_eq!(
            engine.submit_key_share(&mut round, call, bad).unwrap_err(),
            Error::InvalidKeyshareG1
        );
        let mut bad = key_share(1);
        bad.g2 = G2Point::ZERO;
        assert_eq!(
            engine.submit_key_share(&mut round, call, bad).unwrap_err(),
            Error::InvalidKeyshareG2
        );

        engine.verifier().reject(ClaimKind::KeyShareProof);
        assert_eq!(
            engine.submit_key_share(&mut round, call, key_share(1)).unwrap_err(),
            Error::InvalidKeyshareG1
        );
        engine.verifier().clear();
        engine.verifier().reject(ClaimKind::KeySharePairing);
        assert_eq!(
            engine.submit_key_share(&mut round, call, key_share(1)).unwrap_err(),
            Error::InvalidKeyshareG2
        );
        engine.verifier().clear();

        // failed submissions leave the phase alone
        assert_eq!(round.phase(), Phase::DisputeShareDistribution);
    }

    #[test]
    fn test_key_share_resubmission_leaves_state_unchanged() {
        let mut engine = engine(4);
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();
        register_all(&engine, &mut round, &all, START);
        distribute_all(&engine, &mut round, &all, START + 1);
        let height = end_of_open(&round);
        submit_key_shares(&engine, &mut round, &all[..1], height);

        let before = round.participant(&all[0]).unwrap().clone();
        let events = round.events().len();
        let err = engine
            .submit_key_share(&mut round, Call::new(all[0], height + 1), key_share(9))
            .unwrap_err();

        assert_eq!(err, Error::ParticipantSubmittedKeysharesInRound(all[0]));
        assert_eq!(round.participant(&all[0]).unwrap(), &before);
        assert_eq!(round.events().len(), events);
        assert_eq!(round.phase(), Phase::KeyShareSubmission);
    }

    #[test]
    fn test_master_public_key() {
        let mut engine = engine(4);
        let all = validators(4);
        let mut round = engine.initialize(START).unwrap();
        register_all(&engine, &mut round, &all, START);
        distribute_all(&engine, &mut round, &all, START + 1);
        let height = end_of_open(&round);
        submit_key_shares(&engine, &mut round, &all, height);
        assert_eq!(round.phase(), Phase::MPKSubmission);

        let call = Call::new(all[2], height + 1);
        assert_eq!(
            engine
                .submit_master_public_key(&mut round, call, G2Point::ZERO)
                .unwrap_err(),
            Error::MasterPublicKeyZero
        );
        engine.verifier().reject(ClaimKind::MasterPublicKey);
        assert_eq!(
            engine
                .submit_master_public_key(&mut round, call, mpk())
                .unwrap_err(),
            Error::MasterPublicKeyPairingCheckFailure
        );
        engine.verifier().clear();

        engine.submit_master_public_key(&mut round, call, mpk()).unwrap();
        assert_eq!(round.ledger().master_public_key(), Some(&mpk()));
        assert_eq!(round.phase(), Phase::GPKJSubmission);
        assert!(matches!(
            engine.submit_master_public_key(&mut round, call, mpk()),
            Err(Error::IncorrectPhase { .. })
        ));
    }

    #[test]
    fn test_gpkj_submission() {
        let mut engine = engine(4);
        let all = validators(4);
        let (mut round, height) = start_at_gpkj(&mut engine, 4);
        let call = Call::new(all[0], height);

        assert_eq!(
            engine.submit_gpkj(&mut round, call, G2Point::ZERO).unwrap_err(),
            Error::GPKJZero
        );
        engine.submit_gpkj(&mut round, call, gpkj(1)).unwrap();
        assert_eq!(
            engine.submit_gpkj(&mut round, call, gpkj(1)).unwrap_err(),
            Error::ParticipantSubmittedGPKJInRound(all[0])
        );
        assert_eq!(
            engine
                .submit_gpkj(&mut round, Call::new(addr(77), height), gpkj(77))
                .unwrap_err(),
            Error::OnlyValidatorsAllowed(addr(77))
        );

        submit_gpkjs(&engine, &mut round, &all[1..], height + 1);
        assert_eq!(round.phase(), Phase::DisputeGPKJSubmission);
    }

    #[test]
    fn test_happy_path_completes() {
        let mut engine = engine(4);
        let all = validators(4);
        let (mut round, height) = start_at_gpkj(&mut engine, 4);
        submit_gpkjs(&engine, &mut round, &all, height);

        let early = height + 1;
        assert!(matches!(
            engine.complete(&mut round, Call::new(all[0], early)),
            Err(Error::IncorrectPhase { .. })
        ));

        let height = end_of_open(&round);
        assert_eq!(round.stage_at(height), Stage::Completion);
        engine.complete(&mut round, Call::new(all[1], height)).unwrap();

        assert_eq!(round.phase(), Phase::Completion);
        assert_eq!(round.stage_at(height + 1000), Stage::Completed);
        let outcomes = engine.pool().outcomes();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].members, all);
        assert_eq!(outcomes[0].master_public_key, mpk());
        assert!(matches!(
            round.events().last(),
            Some(Event::ValidatorSetCompleted { validator_count: 4, .. })
        ));
    }

    #[test]
    fn test_complete_respects_bad_participant_ceiling() {
        let config = DkgConfig {
            phase_length: PHASE_LENGTH,
            max_bad_participants: Some(0),
            ..DkgConfig::default()
        };
        let mut engine = engine_with(4, config);
        let all = validators(4);
        let (mut round, height) = start_at_gpkj(&mut engine, 4);
        submit_gpkjs(&engine, &mut round, &all, height);
        assert_eq!(round.phase(), Phase::DisputeGPKJSubmission);

        engine.verifier().reject_for(ClaimKind::Gpkj, all[3]);
        engine
            .accuse_participant_submitted_bad_gpkj(&mut round, Call::new(all[0], height + 1), all[3], b"proof")
            .unwrap();

        let height = end_of_open(&round);
        assert_eq!(
            engine.complete(&mut round, Call::new(all[0], height)).unwrap_err(),
            Error::TooManyBadParticipants {
                allowed: 0,
                actual: 1
            }
        );
        assert_eq!(round.phase(), Phase::DisputeGPKJSubmission);
        assert!(engine.pool().outcomes().is_empty());
    }
}
