use bevy::prelude::*;
use bevy::window::{PrimaryWindow, WindowResolution};
use std::env;
use tracing::{debug, info};

use assets::{AppState, SimAssets, add_asset_loading};
use camera::{setup_camera_and_lights, snap_to_initial_view, sync_projection_on_resize};
use checklist::{
    Advisory, ChecklistView, refresh_checklist, spawn_checklist_ui, update_advisory,
};
use config::{CliCommand, SimConfig, cli_help, parse_cli_args};
use effects::{EffectQueue, apply_effects};
use picking::{PendingPick, aim_pointer_ray, resolve_pick};
use scene::{SceneIndex, spawn_scene, spawn_scene_instance, spin_drill_bit};
use scheduler::{DelayedTasks, run_delayed_tasks};
use session::LotoSession;
use tween::{TweenSlot, tick_camera_tween};

mod assets;
mod camera;
mod checklist;
mod completion;
mod config;
mod effects;
mod error;
mod picking;
mod procedure;
mod scene;
mod scheduler;
mod session;
mod tween;

pub fn run() -> anyhow::Result<()> {
    let options = match parse_cli_args(env::args().skip(1))? {
        CliCommand::Help => {
            println!("{}", cli_help());
            return Ok(());
        }
        CliCommand::Run(options) => options,
    };

    let mut app = App::new();
    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: SimConfig::default().window_title,
            resolution: WindowResolution::new(1600, 900),
            fit_canvas_to_parent: true,
            ..default()
        }),
        ..default()
    }));

    // Loaded after the plugins so config warnings reach the log subscriber.
    #[cfg(not(target_arch = "wasm32"))]
    let config = config::load_sim_config(&options.config_path);
    #[cfg(target_arch = "wasm32")]
    let config = {
        info!(path = %options.config_path.display(), "no filesystem on the web, using built-in config");
        SimConfig::default()
    };

    add_asset_loading(&mut app);
    app.insert_resource(config)
        .init_resource::<LotoSession>()
        .init_resource::<SceneIndex>()
        .init_resource::<TweenSlot>()
        .init_resource::<DelayedTasks>()
        .init_resource::<EffectQueue>()
        .init_resource::<PendingPick>()
        .init_resource::<ChecklistView>()
        .init_resource::<Advisory>()
        .insert_resource(ClearColor(Color::srgb(0.12, 0.13, 0.15)))
        .insert_resource(GlobalAmbientLight {
            color: Color::srgb(0.85, 0.85, 0.9),
            brightness: 300.0,
            affects_lightmapped_meshes: true,
        })
        .add_systems(
            Startup,
            (apply_window_config, setup_camera_and_lights, spawn_checklist_ui),
        )
        .add_systems(OnEnter(AppState::Running), spawn_scene)
        .add_systems(
            Update,
            (
                snap_to_initial_view,
                restart_on_key,
                aim_pointer_ray,
                resolve_pick,
                run_delayed_tasks,
                apply_effects,
                tick_camera_tween,
            )
                .chain()
                .run_if(in_state(AppState::Running)),
        )
        .add_systems(
            Update,
            (
                refresh_checklist
                    .run_if(resource_changed::<ChecklistView>)
                    .after(apply_effects),
                update_advisory.after(apply_effects),
                spin_drill_bit,
                sync_projection_on_resize,
            ),
        );

    app.run();
    Ok(())
}

fn apply_window_config(
    config: Res<SimConfig>,
    mut primary_window: Single<&mut Window, With<PrimaryWindow>>,
) {
    primary_window.title = config.window_title.clone();
    primary_window
        .resolution
        .set(config.window_width as f32, config.window_height as f32);
}

/// Puts the whole simulation back to its first step: pending timers and the
/// camera tween are dropped and the scene is instantiated again.
fn restart_on_key(
    keys: Res<ButtonInput<KeyCode>>,
    config: Res<SimConfig>,
    assets: Option<Res<SimAssets>>,
    mut commands: Commands,
    mut index: ResMut<SceneIndex>,
    mut session: ResMut<LotoSession>,
    mut tasks: ResMut<DelayedTasks>,
    mut tweens: ResMut<TweenSlot>,
    mut queue: ResMut<EffectQueue>,
    mut pending: ResMut<PendingPick>,
    mut checklist: ResMut<ChecklistView>,
    mut advisory: ResMut<Advisory>,
) {
    if !keys.just_pressed(config.restart_key) {
        return;
    }

    tasks.cancel_all();
    if let Some(handle) = tweens.active_handle() {
        debug!(?handle, "dropping camera tween");
    }
    tweens.cancel();
    queue.clear();
    pending.0 = None;
    session.reset();
    checklist.clear();
    advisory.clear();

    spawn_scene_instance(&mut commands, assets.as_deref(), &mut index);
    info!("simulation restarted");
}
