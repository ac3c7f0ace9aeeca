use super::config::SimTimings;
use super::effects::Effect;
use super::procedure::{ButtonPress, ProcedureState};
use super::scene::Role;
use super::scheduler::DeferredAction;
use super::tween::{CameraMove, CameraView, FollowUp};
use bevy::prelude::Resource;
use tracing::{debug, info};

/// One run through the lockout-tagout procedure, together with the toggle
/// state of the interactive parts it drives.
#[derive(Resource, Debug, Default, Clone, PartialEq, Eq)]
pub(super) struct LotoSession {
    procedure: ProcedureState,
    button_down: bool,
    door_open: bool,
    switch_down: bool,
}

impl LotoSession {
    pub(super) fn procedure(&self) -> &ProcedureState {
        &self.procedure
    }

    pub(super) fn reset(&mut self) {
        *self = Self::default();
    }

    pub(super) fn handle(&mut self, role: Role, timings: &SimTimings) -> Vec<Effect> {
        debug!(?role, step = self.procedure.step().ordinal(), "interaction");
        match role {
            Role::Button => self.press_button(timings),
            Role::BreakerBox => self.inspect_breaker_box(timings),
            Role::Door => self.toggle_door(timings),
            Role::Switch => self.toggle_switch(timings),
        }
    }

    pub(super) fn resume(&mut self, action: DeferredAction, timings: &SimTimings) -> Vec<Effect> {
        match action {
            DeferredAction::LockApplied => {
                if !self.procedure.apply_lock() {
                    return Vec::new();
                }
                vec![
                    Effect::Advise("Lock and tag applied.".to_string()),
                    Effect::Schedule {
                        delay: timings.verify_phase(),
                        action: DeferredAction::ReadyToVerify,
                    },
                ]
            }
            DeferredAction::ReadyToVerify => {
                if !self.procedure.ready_for_verify() {
                    return Vec::new();
                }
                vec![
                    Effect::Advise("Return to the machine to verify zero energy.".to_string()),
                    Effect::MoveCamera(
                        CameraMove::to(CameraView::Main, timings.main_view())
                            .then(FollowUp::RefreshChecklist),
                    ),
                ]
            }
            DeferredAction::MoveCamera(camera_move) => vec![Effect::MoveCamera(camera_move)],
        }
    }

    fn press_button(&mut self, timings: &SimTimings) -> Vec<Effect> {
        let press = match self.procedure.press_button() {
            Ok(press) => press,
            Err(rejection) => return vec![Effect::Advise(rejection.to_string())],
        };

        self.button_down = !self.button_down;
        let mut effects = vec![Effect::PressButton {
            down: self.button_down,
        }];

        match press {
            ButtonPress::Shutdown => {
                effects.push(Effect::RefreshChecklist);
                effects.push(Effect::Advise(
                    "Powered down. Returning to main view.".to_string(),
                ));
                effects.push(Effect::MoveCamera(
                    CameraMove::to(CameraView::OffSwitch, timings.off_view()).then(
                        FollowUp::ReturnTo {
                            pause: timings.return_pause(),
                            view: CameraView::Main,
                            duration: timings.main_view(),
                        },
                    ),
                ));
            }
            ButtonPress::Verified => {
                info!("zero energy verified, procedure finished");
                effects.push(Effect::Advise(
                    "Verification complete - zero energy. Procedure finished.".to_string(),
                ));
                effects.push(Effect::RefreshChecklist);
                effects.push(Effect::SignalCompletion);
            }
        }

        effects
    }

    fn inspect_breaker_box(&mut self, timings: &SimTimings) -> Vec<Effect> {
        if let Err(rejection) = self.procedure.inspect_breaker_box() {
            return vec![Effect::Advise(rejection.to_string())];
        }

        vec![
            Effect::Advise("Click the breaker box door to open it.".to_string()),
            Effect::MoveCamera(CameraMove::to(CameraView::BreakerBox, timings.breaker_view())),
        ]
    }

    fn toggle_door(&mut self, timings: &SimTimings) -> Vec<Effect> {
        let opening = !self.door_open;
        let first_open = match self.procedure.toggle_door(opening) {
            Ok(first_open) => first_open,
            Err(rejection) => return vec![Effect::Advise(rejection.to_string())],
        };

        self.door_open = opening;
        let mut effects = vec![Effect::RotateDoor { open: opening }];
        if first_open {
            effects.push(Effect::Advise(
                "Door open. Flip the main breaker to isolate.".to_string(),
            ));
            effects.push(Effect::MoveCamera(
                CameraMove::to(CameraView::BreakerSwitch, timings.switch_view())
                    .then(FollowUp::RefreshChecklist),
            ));
        }
        effects
    }

    fn toggle_switch(&mut self, timings: &SimTimings) -> Vec<Effect> {
        let going_down = !self.switch_down;
        let isolated = match self.procedure.toggle_switch(going_down) {
            Ok(isolated) => isolated,
            Err(rejection) => return vec![Effect::Advise(rejection.to_string())],
        };

        self.switch_down = going_down;
        if !isolated {
            return Vec::new();
        }

        vec![
            Effect::RemoveSwitch,
            Effect::RevealLockDevice,
            Effect::Advise("Energy isolated. Applying lock and tag...".to_string()),
            Effect::StopDrillBit,
            Effect::RefreshChecklist,
            Effect::Schedule {
                delay: timings.lock_phase(),
                action: DeferredAction::LockApplied,
            },
        ]
    }
}
