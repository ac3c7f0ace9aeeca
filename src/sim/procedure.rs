//! Lockout-tagout checklist gate.
//!
//! The procedure is a strictly linear five-step sequence. Every mutating
//! operation either advances the state or returns a [`Rejection`] and leaves it
//! untouched, so `step` never decreases and no `done` flag is ever cleared.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(super) enum Step {
    Shutdown = 1,
    OpenBreakerBox = 2,
    FlipSwitch = 3,
    LockTag = 4,
    Verify = 5,
}

impl Step {
    pub(super) fn ordinal(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct DoneFlags {
    pub(super) shutdown: bool,
    pub(super) door: bool,
    pub(super) switch: bool,
    pub(super) lock: bool,
    pub(super) verify: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub(super) enum Rejection {
    #[error("This is not the correct step for this action.")]
    WrongStep,
    #[error("You must turn off the machine first.")]
    MachineRunning,
    #[error("You must open the breaker door first.")]
    DoorClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ButtonPress {
    Shutdown,
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct ProcedureState {
    step: Step,
    done: DoneFlags,
}

impl Default for ProcedureState {
    fn default() -> Self {
        Self {
            step: Step::Shutdown,
            done: DoneFlags::default(),
        }
    }
}

impl ProcedureState {
    pub(super) fn step(&self) -> Step {
        self.step
    }

    pub(super) fn done(&self) -> DoneFlags {
        self.done
    }

    pub(super) fn is_complete(&self) -> bool {
        self.done.verify
    }

    /// The drill press button shuts the machine down at step 1 and verifies
    /// zero energy once the lock is applied at step 5.
    pub(super) fn press_button(&mut self) -> Result<ButtonPress, Rejection> {
        if self.step == Step::Shutdown && !self.done.shutdown {
            self.done.shutdown = true;
            self.step = Step::OpenBreakerBox;
            return Ok(ButtonPress::Shutdown);
        }

        if self.step == Step::Verify && self.done.lock && !self.done.verify {
            self.done.verify = true;
            return Ok(ButtonPress::Verified);
        }

        Err(Rejection::WrongStep)
    }

    pub(super) fn inspect_breaker_box(&self) -> Result<(), Rejection> {
        if self.step != Step::OpenBreakerBox {
            return Err(Rejection::MachineRunning);
        }
        Ok(())
    }

    /// Returns `Ok(true)` only for the first opening of the door.
    pub(super) fn toggle_door(&mut self, opening: bool) -> Result<bool, Rejection> {
        if !(Step::OpenBreakerBox..=Step::FlipSwitch).contains(&self.step) {
            return Err(Rejection::WrongStep);
        }

        if opening && !self.done.door {
            self.done.door = true;
            self.step = Step::FlipSwitch;
            return Ok(true);
        }

        Ok(false)
    }

    /// Returns `Ok(true)` only for the first downward throw of the switch.
    pub(super) fn toggle_switch(&mut self, going_down: bool) -> Result<bool, Rejection> {
        if self.step != Step::FlipSwitch {
            return Err(Rejection::DoorClosed);
        }

        if going_down && !self.done.switch {
            self.done.switch = true;
            self.step = Step::LockTag;
            return Ok(true);
        }

        Ok(false)
    }

    pub(super) fn apply_lock(&mut self) -> bool {
        if self.step != Step::LockTag || !self.done.switch || self.done.lock {
            return false;
        }
        self.done.lock = true;
        true
    }

    pub(super) fn ready_for_verify(&mut self) -> bool {
        if self.step != Step::LockTag || !self.done.lock {
            return false;
        }
        self.step = Step::Verify;
        true
    }
}
