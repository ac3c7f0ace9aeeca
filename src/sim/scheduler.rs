use super::effects::EffectQueue;
use super::session::LotoSession;
use super::config::SimConfig;
use super::tween::CameraMove;
use bevy::prelude::*;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct TaskId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum DeferredAction {
    LockApplied,
    ReadyToVerify,
    MoveCamera(CameraMove),
}

#[derive(Debug)]
struct DelayedTask {
    id: TaskId,
    timer: Timer,
    action: DeferredAction,
}

/// Frame-driven one-shot timers. Tasks fire in the order they were scheduled
/// when several become due on the same tick.
#[derive(Resource, Debug, Default)]
pub(super) struct DelayedTasks {
    tasks: Vec<DelayedTask>,
    next_id: u64,
}

impl DelayedTasks {
    pub(super) fn schedule(&mut self, delay: Duration, action: DeferredAction) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.tasks.push(DelayedTask {
            id,
            timer: Timer::new(delay, TimerMode::Once),
            action,
        });
        debug!(?id, ?delay, ?action, "scheduled delayed task");
        id
    }

    #[cfg(test)]
    pub(super) fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        before != self.tasks.len()
    }

    pub(super) fn cancel_all(&mut self) {
        if !self.tasks.is_empty() {
            debug!(count = self.tasks.len(), "cancelling delayed tasks");
        }
        self.tasks.clear();
    }

    pub(super) fn pending(&self) -> usize {
        self.tasks.len()
    }

    pub(super) fn tick(&mut self, delta: Duration) -> Vec<DeferredAction> {
        let mut due = Vec::new();
        self.tasks.retain_mut(|task| {
            task.timer.tick(delta);
            if task.timer.just_finished() {
                debug!(id = ?task.id, action = ?task.action, "delayed task due");
                due.push(task.action);
                false
            } else {
                true
            }
        });
        due
    }
}

pub(super) fn run_delayed_tasks(
    time: Res<Time>,
    config: Res<SimConfig>,
    mut tasks: ResMut<DelayedTasks>,
    mut session: ResMut<LotoSession>,
    mut queue: ResMut<EffectQueue>,
) {
    for action in tasks.tick(time.delta()) {
        queue.extend(session.resume(action, &config.timings));
    }
}
