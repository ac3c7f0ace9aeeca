use super::camera::SimCamera;
use super::checklist::{Advisory, ChecklistView};
use super::completion::notify_host_completion;
use super::config::SimConfig;
use super::scene::{Role, SceneGraph};
use super::scheduler::{DeferredAction, DelayedTasks};
use super::session::LotoSession;
use super::tween::{CameraMove, CameraPose, CameraTween, FollowUp, TweenSlot};
use bevy::prelude::*;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, warn};

const BUTTON_TRAVEL: f32 = 0.02;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Effect {
    PressButton { down: bool },
    RotateDoor { open: bool },
    RemoveSwitch,
    RevealLockDevice,
    StopDrillBit,
    MoveCamera(CameraMove),
    Schedule {
        delay: Duration,
        action: DeferredAction,
    },
    Advise(String),
    RefreshChecklist,
    SignalCompletion,
}

#[derive(Resource, Debug, Default)]
pub(super) struct EffectQueue {
    pending: VecDeque<Effect>,
}

impl EffectQueue {
    pub(super) fn extend(&mut self, effects: impl IntoIterator<Item = Effect>) {
        self.pending.extend(effects);
    }

    pub(super) fn push_follow_up(&mut self, follow_up: FollowUp) {
        match follow_up {
            FollowUp::Nothing => {}
            FollowUp::RefreshChecklist => self.pending.push_back(Effect::RefreshChecklist),
            FollowUp::ReturnTo {
                pause,
                view,
                duration,
            } => self.pending.push_back(Effect::Schedule {
                delay: pause,
                action: DeferredAction::MoveCamera(CameraMove::to(view, duration)),
            }),
        }
    }

    pub(super) fn clear(&mut self) {
        self.pending.clear();
    }

    pub(super) fn drain(&mut self) -> impl Iterator<Item = Effect> + '_ {
        self.pending.drain(..)
    }

    pub(super) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub(super) fn apply_effects(
    config: Res<SimConfig>,
    session: Res<LotoSession>,
    mut queue: ResMut<EffectQueue>,
    mut scene: SceneGraph,
    mut tweens: ResMut<TweenSlot>,
    mut tasks: ResMut<DelayedTasks>,
    mut checklist: ResMut<ChecklistView>,
    mut advisory: ResMut<Advisory>,
    mut camera_query: Query<(&Transform, &mut Projection), With<SimCamera>>,
) {
    if queue.is_empty() {
        return;
    }

    for effect in queue.drain() {
        debug!(?effect, "applying effect");
        match effect {
            Effect::PressButton { down } => {
                let travel = if down { -BUTTON_TRAVEL } else { BUTTON_TRAVEL };
                scene.nudge_role_node(Role::Button, Vec3::new(0.0, 0.0, travel));
            }
            Effect::RotateDoor { open } => scene.set_door_open(open),
            Effect::RemoveSwitch => scene.remove_role_node(Role::Switch),
            Effect::RevealLockDevice => {
                scene.set_node_visible(&config.nodes.lock_device, true);
            }
            Effect::StopDrillBit => scene.stop_drill_bit(),
            Effect::MoveCamera(camera_move) => {
                let name = config.cameras.name_for(camera_move.view);
                let Some(target) = scene.camera_pose(name) else {
                    warn!(camera = name, "camera node not found");
                    continue;
                };
                let Ok((transform, mut projection)) = camera_query.single_mut() else {
                    continue;
                };
                if let Some(lens) = target.lens {
                    lens.apply_to(&mut projection);
                }
                let tween = CameraTween::new(
                    CameraPose::from_transform(transform),
                    target,
                    camera_move.duration,
                )
                .with_follow_up(camera_move.then);
                let handle = tweens.start(tween);
                debug!(?handle, camera = name, "camera tween started");
            }
            Effect::Schedule { delay, action } => {
                tasks.schedule(delay, action);
            }
            Effect::Advise(message) => {
                info!("{message}");
                advisory.show(message, config.timings.advisory());
            }
            Effect::RefreshChecklist => checklist.sync(session.procedure()),
            Effect::SignalCompletion => {
                let channel = notify_host_completion();
                info!(?channel, "simulation completion reported");
            }
        }
    }
}
