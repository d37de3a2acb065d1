//! ETHDKG round engine
//!
//! [`Ethdkg`] owns the configuration and the external collaborators (the
//! validator pool and the crypto verifier). Every round lives in an explicit
//! [`Round`] value that the caller passes back into each entry point, so
//! several engines or rounds never share hidden state.
//!
//! Every mutating entry point runs the same checks first, in this order:
//! 1. the validator set nonce still matches the round (`RoundInvalidated`)
//! 2. the height falls in an accepted window (`IncorrectPhase`)
//! 3. the caller may act (`OnlyValidatorsAllowed`)
//!
//! and either applies all of its effects or none.

mod accusations;
mod events;
mod phases;

pub use events::Event;

use crate::ledger::{Participant, ShareLedger};
use crate::phase::{Phase, Schedule, Stage};
use crate::pool::{Slash, SlashKind, ValidatorPool};
use crate::types::{Address, Call, DkgConfig, Height};
use crate::verify::Verifier;
use crate::{Error, Result};
use serde::Serialize;
use tracing::{info, instrument, warn};

/// State of one DKG round
#[derive(Debug, Clone, Serialize)]
pub struct Round {
    number: u64,
    nonce: u64,
    schedule: Schedule,
    ledger: ShareLedger,
    events: Vec<Event>,
}

impl Round {
    /// Round number, strictly increasing per engine
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Validator set nonce the round was opened under
    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    /// The stored phase; it does not move on timeout
    pub fn phase(&self) -> Phase {
        self.schedule.phase()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// The activity open at `height`
    pub fn stage_at(&self, height: Height) -> Stage {
        self.schedule.stage_at(height)
    }

    pub fn ledger(&self) -> &ShareLedger {
        &self.ledger
    }

    pub fn participant(&self, address: &Address) -> Option<&Participant> {
        self.ledger.participant(address)
    }

    pub fn bad_participants(&self) -> u32 {
        self.ledger.bad_participants()
    }

    /// Events not yet drained
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Take the buffered events, oldest first
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Buffered events as a JSON array
    pub fn events_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.events)?)
    }

    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// DKG engine bound to a validator pool and a verifier
pub struct Ethdkg<P, V> {
    config: DkgConfig,
    pool: P,
    verifier: V,
    rounds_started: u64,
}

impl<P: ValidatorPool, V: Verifier> Ethdkg<P, V> {
    /// Create an engine; the configuration is validated first
    pub fn new(config: DkgConfig, pool: P, verifier: V) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            pool,
            verifier,
            rounds_started: 0,
        })
    }

    pub fn config(&self) -> &DkgConfig {
        &self.config
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Open a new round with registration starting at `height`.
    ///
    /// Any previous round is superseded; the caller simply drops it.
    #[instrument(skip(self))]
    pub fn initialize(&mut self, height: Height) -> Result<Round> {
        let validators = self.pool.validator_count();
        if validators < self.config.min_validators {
            return Err(Error::MinimumValidatorsNotMet {
                required: self.config.min_validators,
                actual: validators,
            });
        }

        self.rounds_started += 1;
        let nonce = self.pool.nonce();
        let mut round = Round {
            number: self.rounds_started,
            nonce,
            schedule: Schedule::new(height, self.config.phase_length),
            ledger: ShareLedger::new(),
            events: Vec::new(),
        };
        round.emit(Event::RegistrationOpened {
            start: height,
            round: round.number,
            nonce,
            phase_length: self.config.phase_length,
            confirmation_length: self.config.confirmation_length,
        });

        info!(
            round = round.number,
            nonce,
            validators,
            phase_length = self.config.phase_length,
            "Registration opened"
        );
        Ok(round)
    }

    /// The validator set must not have changed since the round opened
    fn check_nonce(&self, round: &Round) -> Result<()> {
        let actual = self.pool.nonce();
        if actual != round.nonce {
            return Err(Error::RoundInvalidated {
                expected: round.nonce,
                actual,
            });
        }
        Ok(())
    }

    /// Caller is a current validator not found bad this round
    fn require_validator(&self, round: &Round, caller: Address) -> Result<()> {
        if !self.pool.is_validator(&caller) || round.ledger.is_bad(&caller) {
            return Err(Error::OnlyValidatorsAllowed(caller));
        }
        Ok(())
    }

    /// Caller is a current validator registered in the round and not bad
    fn require_participant<'r>(&self, round: &'r Round, caller: Address) -> Result<&'r Participant> {
        self.require_validator(round, caller)?;
        round
            .ledger
            .participant(&caller)
            .ok_or(Error::OnlyValidatorsAllowed(caller))
    }

    /// Early phase exit: the next phase opens after the confirmation delay
    fn advance(&self, round: &mut Round, phase: Phase, height: Height) {
        let start = height.saturating_add(self.config.confirmation_length);
        round.schedule.advance(phase, start);
        info!(round = round.number, ?phase, start, "Phase advanced");
    }

    /// Record a confirmed accusation and report it to the pool
    fn penalize(
        &self,
        round: &mut Round,
        accuser: Address,
        accused: Address,
        phase: Phase,
        kind: SlashKind,
    ) {
        round.ledger.mark_bad(accused);
        round.emit(Event::ParticipantAccused {
            accuser,
            accused,
            phase,
            kind,
        });
        self.pool.slash(&Slash {
            round: round.number,
            accused,
            accuser,
            phase,
            kind,
        });
        warn!(
            round = round.number,
            ?accuser,
            ?accused,
            ?phase,
            ?kind,
            bad_participants = round.ledger.bad_participants(),
            "Participant accused"
        );
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::phase::PhaseWindow;
    use crate::pool::MemoryValidatorPool;
    use crate::verify::ScriptedVerifier;

    #[test]
    fn test_initialize_requires_minimum_validators() {
        let mut engine = engine(3);
        assert_eq!(
            engine.initialize(START).unwrap_err(),
            Error::MinimumValidatorsNotMet {
                required: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_rounds_are_numbered() {
        let mut engine = engine(4);
        let first = engine.initialize(START).unwrap();
        let second = engine.initialize(START + 5).unwrap();
        assert_eq!(first.number(), 1);
        assert_eq!(second.number(), 2);
        assert_eq!(second.phase(), Phase::RegistrationOpen);
        assert_eq!(second.stage_at(START + 5), Stage::Registration);
        assert!(matches!(
            second.events()[0],
            Event::RegistrationOpened { round: 2, .. }
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = DkgConfig {
            phase_length: 0,
            ..DkgConfig::default()
        };
        let result = Ethdkg::new(config, MemoryValidatorPool::new(), ScriptedVerifier::new());
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validator_set_change_invalidates_round() {
        let mut engine = engine(4);
        let mut round = engine.initialize(START).unwrap();
        engine.pool().add_validator(addr(5));

        // nonce is checked before the window
        let err = engine
            .register(&mut round, Call::new(addr(1), START + 1000), public_key(&addr(1)))
            .unwrap_err();
        assert_eq!(err, Error::RoundInvalidated { expected: 0, actual: 1 });
        assert_eq!(err.category(), crate::ErrorCategory::Configuration);
        assert_eq!(round.ledger().registered_count(), 0);
    }

    #[test]
    fn test_four_validator_scenario() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let mut engine = engine(4);
        let all = validators(4);
        let (mut round, height) = start_at_gpkj(&mut engine, 4);
        let gpkj_start = round.schedule().start();
        assert_eq!(gpkj_start, height);

        // one submitter; the others stay silent
        submit_gpkjs(&engine, &mut round, &all[..1], height);
        let dispute = end_of_open(&round);
        assert_eq!(round.stage_at(dispute), Stage::MissingGpkjDispute);

        engine
            .accuse_participant_did_not_submit_gpkj(&mut round, Call::new(addr(99), dispute), &all[1..])
            .unwrap();
        assert_eq!(round.bad_participants(), 3);
        assert_eq!(round.phase(), Phase::GPKJSubmission);
        assert_eq!(engine.pool().slashes().len(), 3);

        let late = dispute + PHASE_LENGTH;
        let err = engine
            .complete(&mut round, Call::new(all[0], late))
            .unwrap_err();
        assert_eq!(
            err,
            Error::IncorrectPhase {
                current: Phase::GPKJSubmission,
                height: late,
                expected: vec![PhaseWindow {
                    phase: Phase::DisputeGPKJSubmission,
                    start: gpkj_start + PHASE_LENGTH,
                    end: gpkj_start + 2 * PHASE_LENGTH,
                }],
            }
        );
        assert_eq!(round.phase(), Phase::GPKJSubmission);
        assert_eq!(round.stage_at(late), Stage::Stalled);
    }

    #[test]
    fn test_events_serialize() {
        let mut engine = engine(4);
        let round = engine.initialize(START).unwrap();
        let json = round.events_json().unwrap();
        assert!(json.contains("\"event\": \"RegistrationOpened\""));
    }
}
