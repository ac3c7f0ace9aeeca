use super::camera::SimCamera;
use super::effects::EffectQueue;
use bevy::math::curve::{Curve, EaseFunction};
use bevy::prelude::*;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum CameraView {
    Main,
    OffSwitch,
    BreakerBox,
    BreakerSwitch,
}

/// What happens once a camera move reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum FollowUp {
    Nothing,
    RefreshChecklist,
    ReturnTo {
        pause: Duration,
        view: CameraView,
        duration: Duration,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct CameraMove {
    pub(super) view: CameraView,
    pub(super) duration: Duration,
    pub(super) then: FollowUp,
}

impl CameraMove {
    pub(super) fn to(view: CameraView, duration: Duration) -> Self {
        Self {
            view,
            duration,
            then: FollowUp::Nothing,
        }
    }

    pub(super) fn then(mut self, follow_up: FollowUp) -> Self {
        self.then = follow_up;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Lens {
    pub(super) fov: f32,
    pub(super) near: f32,
    pub(super) far: f32,
}

impl Lens {
    pub(super) fn from_projection(projection: &Projection) -> Option<Self> {
        match projection {
            Projection::Perspective(perspective) => Some(Self {
                fov: perspective.fov,
                near: perspective.near,
                far: perspective.far,
            }),
            _ => None,
        }
    }

    pub(super) fn apply_to(&self, projection: &mut Projection) {
        if let Projection::Perspective(perspective) = projection {
            perspective.fov = self.fov;
            perspective.near = self.near;
            perspective.far = self.far;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct CameraPose {
    pub(super) translation: Vec3,
    pub(super) rotation: Quat,
    pub(super) lens: Option<Lens>,
}

impl CameraPose {
    pub(super) fn from_transform(transform: &Transform) -> Self {
        Self {
            translation: transform.translation,
            rotation: transform.rotation,
            lens: None,
        }
    }

    pub(super) fn from_global(global: &GlobalTransform, lens: Option<Lens>) -> Self {
        let (_, rotation, translation) = global.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            lens,
        }
    }

    pub(super) fn interpolate(&self, to: &Self, k: f32) -> Self {
        Self {
            translation: self.translation.lerp(to.translation, k),
            rotation: self.rotation.slerp(to.rotation, k),
            lens: to.lens,
        }
    }

    pub(super) fn write_to(&self, transform: &mut Transform) {
        transform.translation = self.translation;
        transform.rotation = self.rotation;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct TweenHandle(u64);

#[derive(Debug, Clone)]
pub(super) struct CameraTween {
    from: CameraPose,
    to: CameraPose,
    duration: Duration,
    elapsed: Duration,
    ease: EaseFunction,
    follow_up: FollowUp,
    cancelled: bool,
}

impl CameraTween {
    pub(super) fn new(from: CameraPose, to: CameraPose, duration: Duration) -> Self {
        Self {
            from,
            to,
            duration,
            elapsed: Duration::ZERO,
            ease: EaseFunction::CubicInOut,
            follow_up: FollowUp::Nothing,
            cancelled: false,
        }
    }

    #[cfg(test)]
    pub(super) fn with_ease(mut self, ease: EaseFunction) -> Self {
        self.ease = ease;
        self
    }

    pub(super) fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = follow_up;
        self
    }

    pub(super) fn fraction(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0)
    }

    fn pose(&self) -> CameraPose {
        let k = self.ease.sample_clamped(self.fraction());
        self.from.interpolate(&self.to, k)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) struct TweenFrame {
    pub(super) pose: CameraPose,
    pub(super) finished: Option<FollowUp>,
}

/// Holds the single in-flight camera tween.
#[derive(Resource, Debug, Default)]
pub(super) struct TweenSlot {
    active: Option<(TweenHandle, CameraTween)>,
    next_handle: u64,
}

impl TweenSlot {
    pub(super) fn start(&mut self, tween: CameraTween) -> TweenHandle {
        self.cancel();
        let handle = TweenHandle(self.next_handle);
        self.next_handle += 1;
        let replaced = self.active.replace((handle, tween));
        if let Some((old, _)) = replaced {
            debug!(?old, ?handle, "camera tween superseded");
        }
        handle
    }

    pub(super) fn cancel(&mut self) {
        if let Some((_, tween)) = self.active.as_mut() {
            tween.cancelled = true;
        }
    }

    pub(super) fn active_handle(&self) -> Option<TweenHandle> {
        self.active
            .as_ref()
            .filter(|(_, tween)| !tween.cancelled)
            .map(|(handle, _)| *handle)
    }

    #[cfg(test)]
    pub(super) fn is_idle(&self) -> bool {
        self.active_handle().is_none()
    }

    /// Advances the active tween. The follow-up is handed out on the tick that
    /// reaches the target and the tween is dropped right after, so it fires once.
    pub(super) fn tick(&mut self, delta: Duration) -> Option<TweenFrame> {
        if self.active.as_ref().is_some_and(|(_, tween)| tween.cancelled) {
            self.active = None;
        }

        let (_, tween) = self.active.as_mut()?;
        tween.elapsed = tween.elapsed.saturating_add(delta);
        let pose = tween.pose();

        if tween.fraction() < 1.0 {
            return Some(TweenFrame {
                pose,
                finished: None,
            });
        }

        let (handle, tween) = self.active.take()?;
        debug!(?handle, "camera tween finished");
        Some(TweenFrame {
            pose,
            finished: Some(tween.follow_up),
        })
    }
}

pub(super) fn tick_camera_tween(
    time: Res<Time>,
    mut slot: ResMut<TweenSlot>,
    mut queue: ResMut<EffectQueue>,
    mut camera_query: Query<&mut Transform, With<SimCamera>>,
) {
    let Some(frame) = slot.tick(time.delta()) else {
        return;
    };

    if let Ok(mut transform) = camera_query.single_mut() {
        frame.pose.write_to(&mut transform);
    }

    if let Some(follow_up) = frame.finished {
        queue.push_follow_up(follow_up);
    }
}
