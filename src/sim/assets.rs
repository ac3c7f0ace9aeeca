use bevy::prelude::*;
use bevy_asset_loader::prelude::*;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, States)]
pub(super) enum AppState {
    #[default]
    Loading,
    Running,
}

#[derive(AssetCollection, Resource)]
pub(super) struct SimAssets {
    #[asset(path = "models/lockout_scene.glb#Scene0")]
    pub(super) scene: Handle<Scene>,
}

pub(super) fn add_asset_loading(app: &mut App) {
    // A failed load still enters `Running`; the scene systems then find no
    // `SimAssets` and leave interactions disabled.
    app.init_state::<AppState>().add_loading_state(
        LoadingState::new(AppState::Loading)
            .continue_to_state(AppState::Running)
            .on_failure_continue_to_state(AppState::Running)
            .load_collection::<SimAssets>(),
    );
}
