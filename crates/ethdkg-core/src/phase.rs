//! Phase scheduler
//!
//! A round stores one [`Phase`] and the height it started at. Every stored
//! phase owns two consecutive windows of `phase_length` blocks:
//!
//! ```text
//!   start            start+L            start+2L
//!     |---- Slot::Open ----|--- Slot::Dispute ---|---- stalled ...
//! ```
//!
//! The stored phase does not change on timeout; what a call may do at a
//! height is decided by the stored phase together with the slot the height
//! falls in. [`Schedule::stage_at`] names that combination.

use crate::types::Height;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Stored ETHDKG phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Phase {
    RegistrationOpen = 0,
    ShareDistribution = 1,
    DisputeShareDistribution = 2,
    KeyShareSubmission = 3,
    MPKSubmission = 4,
    GPKJSubmission = 5,
    DisputeGPKJSubmission = 6,
    Completion = 7,
}

/// Which half of a stored phase's lifetime a window covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `[start, start + L)`
    Open,
    /// `[start + L, start + 2L)`
    Dispute,
}

impl Slot {
    fn offset(self) -> u64 {
        match self {
            Slot::Open => 0,
            Slot::Dispute => 1,
        }
    }
}

/// A window an operation accepts: the stored phase that must be active and
/// the half-open height range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseWindow {
    pub phase: Phase,
    pub start: Height,
    pub end: Height,
}

impl PhaseWindow {
    /// Whether a call at `height` under stored phase `current` falls inside
    pub fn admits(&self, current: Phase, height: Height) -> bool {
        self.phase == current && height >= self.start && height < self.end
    }
}

/// The activity a round is open for at a given height
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    /// Phase switched but its confirmation delay has not elapsed
    Pending,
    Registration,
    MissingRegistrationDispute,
    ShareDistribution,
    /// Accusations of validators that did not distribute shares
    MissingShareDispute,
    /// Accusations of validators that distributed bad shares
    BadShareDispute,
    KeyShareSubmission,
    MissingKeyShareDispute,
    MpkSubmission,
    GpkjSubmission,
    MissingGpkjDispute,
    BadGpkjDispute,
    /// `complete()` may be called
    Completion,
    Completed,
    /// Every window of the stored phase has passed; the round must restart
    Stalled,
}

/// Stored phase and its timing for one round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    phase: Phase,
    start: Height,
    length: u64,
}

impl Schedule {
    /// Open registration at `start`
    pub fn new(start: Height, length: u64) -> Self {
        Self {
            phase: Phase::RegistrationOpen,
            start,
            length,
        }
    }

    /// The stored phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Height the stored phase started at
    pub fn start(&self) -> Height {
        self.start
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    /// The `slot` window of the current start height, labelled with `phase`
    pub fn window(&self, phase: Phase, slot: Slot) -> PhaseWindow {
        let start = self
            .start
            .saturating_add(slot.offset().saturating_mul(self.length));
        PhaseWindow {
            phase,
            start,
            end: start.saturating_add(self.length),
        }
    }

    /// Succeed if `height` falls in one of the `accepted` windows, otherwise
    /// report the stored phase, the height and every accepted window in order.
    pub fn require(&self, height: Height, accepted: &[(Phase, Slot)]) -> Result<()> {
        let windows: Vec<PhaseWindow> = accepted
            .iter()
            .map(|(phase, slot)| self.window(*phase, *slot))
            .collect();

        if windows.iter().any(|w| w.admits(self.phase, height)) {
            return Ok(());
        }

        Err(Error::IncorrectPhase {
            current: self.phase,
            height,
            expected: windows,
        })
    }

    /// The activity open at `height`
    pub fn stage_at(&self, height: Height) -> Stage {
        if self.phase == Phase::Completion {
            return Stage::Completed;
        }
        if height < self.start {
            return Stage::Pending;
        }

        let slot = match (height - self.start) / self.length {
            0 => Slot::Open,
            1 => Slot::Dispute,
            _ => return Stage::Stalled,
        };

        match (self.phase, slot) {
            (Phase::RegistrationOpen, Slot::Open) => Stage::Registration,
            (Phase::RegistrationOpen, Slot::Dispute) => Stage::MissingRegistrationDispute,
            (Phase::ShareDistribution, Slot::Open) => Stage::ShareDistribution,
            (Phase::ShareDistribution, Slot::Dispute) => Stage::MissingShareDispute,
            (Phase::DisputeShareDistribution, Slot::Open) => Stage::BadShareDispute,
            (Phase::DisputeShareDistribution, Slot::Dispute) => Stage::KeyShareSubmission,
            (Phase::KeyShareSubmission, Slot::Open) => Stage::KeyShareSubmission,
            (Phase::KeyShareSubmission, Slot::Dispute) => Stage::MissingKeyShareDispute,
            (Phase::MPKSubmission, Slot::Open) => Stage::MpkSubmission,
            (Phase::MPKSubmission, Slot::Dispute) => Stage::Stalled,
            (Phase::GPKJSubmission, Slot::Open) => Stage::GpkjSubmission,
            (Phase::GPKJSubmission, Slot::Dispute) => Stage::MissingGpkjDispute,
            (Phase::DisputeGPKJSubmission, Slot::Open) => Stage::BadGpkjDispute,
            (Phase::DisputeGPKJSubmission, Slot::Dispute) => Stage::Completion,
            (Phase::Completion, _) => Stage::Completed,
        }
    }

    /// Switch the stored phase; the new phase starts at `start`
    pub(crate) fn advance(&mut self, phase: Phase, start: Height) {
        self.phase = phase;
        self.start = start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PHASES: [Phase; 8] = [
        Phase::RegistrationOpen,
        Phase::ShareDistribution,
        Phase::DisputeShareDistribution,
        Phase::KeyShareSubmission,
        Phase::MPKSubmission,
        Phase::GPKJSubmission,
        Phase::DisputeGPKJSubmission,
        Phase::Completion,
    ];

    #[test]
    fn test_windows_are_contiguous() {
        let schedule = Schedule::new(100, 40);
        let open = schedule.window(Phase::GPKJSubmission, Slot::Open);
        let dispute = schedule.window(Phase::GPKJSubmission, Slot::Dispute);

        assert_eq!((open.start, open.end), (100, 140));
        assert_eq!((dispute.start, dispute.end), (140, 180));
        assert_eq!(open.end, dispute.start);
    }

    #[test]
    fn test_exactly_one_stage_per_height() {
        for phase in ALL_PHASES {
            let mut schedule = Schedule::new(0, 10);
            schedule.advance(phase, 50);

            let mut changes = Vec::new();
            let mut previous = schedule.stage_at(0);
            for height in 1..100 {
                let stage = schedule.stage_at(height);
                if stage != previous {
                    changes.push(height);
                    previous = stage;
                }
            }

            if phase == Phase::Completion {
                assert!(changes.is_empty());
            } else if phase == Phase::MPKSubmission {
                // open window, then stalled
                assert_eq!(changes, vec![50, 60]);
            } else {
                assert_eq!(changes, vec![50, 60, 70], "phase {phase:?}");
            }
        }
    }

    #[test]
    fn test_stage_mapping() {
        let mut schedule = Schedule::new(10, 5);
        assert_eq!(schedule.stage_at(9), Stage::Pending);
        assert_eq!(schedule.stage_at(10), Stage::Registration);
        assert_eq!(schedule.stage_at(15), Stage::MissingRegistrationDispute);
        assert_eq!(schedule.stage_at(20), Stage::Stalled);

        schedule.advance(Phase::ShareDistribution, 20);
        assert_eq!(schedule.stage_at(26), Stage::MissingShareDispute);

        schedule.advance(Phase::DisputeShareDistribution, 30);
        assert_eq!(schedule.stage_at(30), Stage::BadShareDispute);
        assert_eq!(schedule.stage_at(35), Stage::KeyShareSubmission);

        schedule.advance(Phase::DisputeGPKJSubmission, 40);
        assert_eq!(schedule.stage_at(44), Stage::BadGpkjDispute);
        assert_eq!(schedule.stage_at(45), Stage::Completion);
        assert_eq!(schedule.stage_at(50), Stage::Stalled);
    }

    #[test]
    fn test_require_reports_ordered_windows() {
        let mut schedule = Schedule::new(0, 40);
        schedule.advance(Phase::ShareDistribution, 200);

        let err = schedule
            .require(
                210,
                &[
                    (Phase::KeyShareSubmission, Slot::Open),
                    (Phase::DisputeShareDistribution, Slot::Dispute),
                ],
            )
            .unwrap_err();

        assert_eq!(
            err,
            Error::IncorrectPhase {
                current: Phase::ShareDistribution,
                height: 210,
                expected: vec![
                    PhaseWindow {
                        phase: Phase::KeyShareSubmission,
                        start: 200,
                        end: 240
                    },
                    PhaseWindow {
                        phase: Phase::DisputeShareDistribution,
                        start: 240,
                        end: 280
                    },
                ],
            }
        );
    }

    #[test]
    fn test_require_boundaries() {
        let mut schedule = Schedule::new(0, 40);
        schedule.advance(Phase::GPKJSubmission, 100);
        let accepted = [(Phase::GPKJSubmission, Slot::Dispute)];

        assert!(schedule.require(139, &accepted).is_err());
        assert!(schedule.require(140, &accepted).is_ok());
        assert!(schedule.require(179, &accepted).is_ok());
        assert!(schedule.require(180, &accepted).is_err());
    }
}
