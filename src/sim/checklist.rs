use super::procedure::{DoneFlags, ProcedureState};
use bevy::prelude::*;
use std::time::Duration;
use tracing::debug;

const DONE_COLOR: Color = Color::srgb(124.0 / 255.0, 252.0 / 255.0, 0.0);
const PENDING_COLOR: Color = Color::WHITE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ChecklistEntry {
    Shutdown,
    Door,
    Switch,
    Lock,
    Verify,
}

pub(super) const CHECKLIST_ORDER: [ChecklistEntry; 5] = [
    ChecklistEntry::Shutdown,
    ChecklistEntry::Door,
    ChecklistEntry::Switch,
    ChecklistEntry::Lock,
    ChecklistEntry::Verify,
];

impl ChecklistEntry {
    pub(super) fn label(self) -> &'static str {
        match self {
            Self::Shutdown => "1. Turn Off the Machine",
            Self::Door => "2. Open the Breaker Box",
            Self::Switch => "3. Flip the Main Breaker Switch",
            Self::Lock => "4. Apply Lock and Tag",
            Self::Verify => "5. Verify Zero Energy",
        }
    }

    pub(super) fn is_done(self, done: &DoneFlags) -> bool {
        match self {
            Self::Shutdown => done.shutdown,
            Self::Door => done.door,
            Self::Switch => done.switch,
            Self::Lock => done.lock,
            Self::Verify => done.verify,
        }
    }
}

pub(super) fn item_color(done: bool) -> Color {
    if done { DONE_COLOR } else { PENDING_COLOR }
}

pub(super) fn checklist_text(done: &DoneFlags) -> String {
    CHECKLIST_ORDER
        .iter()
        .map(|entry| {
            let mark = if entry.is_done(done) { "x" } else { " " };
            format!("[{mark}] {}", entry.label())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Snapshot of the procedure the overlay currently shows. It only moves when a
/// refresh is applied, so the overlay can lag the procedure on purpose.
#[derive(Resource, Debug, Default)]
pub(super) struct ChecklistView {
    shown: DoneFlags,
}

impl ChecklistView {
    pub(super) fn sync(&mut self, procedure: &ProcedureState) {
        self.shown = procedure.done();
    }

    pub(super) fn shown(&self) -> DoneFlags {
        self.shown
    }

    pub(super) fn clear(&mut self) {
        self.shown = DoneFlags::default();
    }
}

#[derive(Resource, Debug, Default)]
pub(super) struct Advisory {
    message: Option<String>,
    timer: Timer,
}

impl Advisory {
    pub(super) fn show(&mut self, message: String, linger: Duration) {
        self.message = Some(message);
        self.timer = Timer::new(linger, TimerMode::Once);
    }

    pub(super) fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub(super) fn tick(&mut self, delta: Duration) -> bool {
        if self.message.is_none() {
            return false;
        }
        self.timer.tick(delta);
        if self.timer.just_finished() {
            self.message = None;
            return true;
        }
        false
    }

    pub(super) fn clear(&mut self) {
        self.message = None;
    }
}

#[derive(Component)]
pub(super) struct ChecklistItemText(ChecklistEntry);

#[derive(Component)]
pub(super) struct AdvisoryText;

pub(super) fn spawn_checklist_ui(mut commands: Commands) {
    commands
        .spawn((
            Node {
                position_type: PositionType::Absolute,
                top: px(20),
                left: px(20),
                padding: UiRect::all(px(10)),
                flex_direction: FlexDirection::Column,
                ..default()
            },
            BackgroundColor(Color::srgba(0.0, 0.0, 0.0, 0.7)),
        ))
        .with_children(|panel| {
            panel.spawn((
                Text::new("Checklist"),
                TextFont::from_font_size(20.0),
                Node {
                    margin: UiRect::bottom(px(8)),
                    ..default()
                },
            ));

            for entry in CHECKLIST_ORDER {
                panel.spawn((
                    ChecklistItemText(entry),
                    Text::new(entry.label()),
                    TextColor(item_color(false)),
                    Node {
                        margin: UiRect::bottom(px(4)),
                        ..default()
                    },
                ));
            }
        });

    commands.spawn((
        AdvisoryText,
        Text::new(""),
        TextColor(Color::srgb(1.0, 0.93, 0.55)),
        Node {
            position_type: PositionType::Absolute,
            bottom: px(24),
            left: px(20),
            ..default()
        },
    ));
}

pub(super) fn refresh_checklist(
    view: Res<ChecklistView>,
    mut items: Query<(&ChecklistItemText, &mut TextColor)>,
) {
    let shown = view.shown();
    debug!("checklist\n{}", checklist_text(&shown));
    for (item, mut color) in &mut items {
        color.0 = item_color(item.0.is_done(&shown));
    }
}

pub(super) fn update_advisory(
    time: Res<Time>,
    mut advisory: ResMut<Advisory>,
    mut text_query: Query<&mut Text, With<AdvisoryText>>,
) {
    if advisory.bypass_change_detection().tick(time.delta()) {
        advisory.set_changed();
    }
    if !advisory.is_changed() {
        return;
    }

    let message = advisory.message().unwrap_or_default().to_string();
    for mut text in &mut text_query {
        text.0 = message.clone();
    }
}
