use super::config::SimConfig;
use super::scene::SceneIndex;
use super::tween::{CameraPose, Lens};
use bevy::core_pipeline::tonemapping::Tonemapping;
use bevy::prelude::*;
use bevy::window::WindowResized;
use tracing::debug;

pub(super) const DEFAULT_FOV_DEGREES: f32 = 75.0;
pub(super) const DEFAULT_NEAR: f32 = 0.1;
pub(super) const DEFAULT_FAR: f32 = 1000.0;

/// The camera the user looks through; glTF camera nodes only provide poses.
#[derive(Component, Debug)]
pub(super) struct SimCamera;

pub(super) fn setup_camera_and_lights(mut commands: Commands) {
    commands.spawn((
        SimCamera,
        Camera3d::default(),
        Tonemapping::AcesFitted,
        Projection::Perspective(PerspectiveProjection {
            fov: DEFAULT_FOV_DEGREES.to_radians(),
            near: DEFAULT_NEAR,
            far: DEFAULT_FAR,
            ..default()
        }),
        Transform::from_xyz(2.0, 2.0, 4.0).looking_at(Vec3::new(0.0, 1.0, 0.0), Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 9_000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(3.0, 5.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 3_500.0,
            ..default()
        },
        Transform::from_xyz(-4.0, 2.0, -2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Places the live camera on the main camera node once the scene is indexed.
/// Runs a frame after indexing so the node's global transform is propagated.
pub(super) fn snap_to_initial_view(
    config: Res<SimConfig>,
    mut index: ResMut<SceneIndex>,
    globals: Query<&GlobalTransform>,
    projections: Query<&Projection, Without<SimCamera>>,
    mut camera_query: Query<(&mut Transform, &mut Projection), With<SimCamera>>,
) {
    if !index.take_initial_view_request() {
        return;
    }

    let Some(node) = index.camera(&config.cameras.main) else {
        return;
    };
    let Ok(global) = globals.get(node) else {
        return;
    };
    let lens = projections.get(node).ok().and_then(Lens::from_projection);
    let pose = CameraPose::from_global(global, lens);

    let Ok((mut transform, mut projection)) = camera_query.single_mut() else {
        return;
    };
    pose.write_to(&mut transform);
    if let Some(lens) = pose.lens {
        lens.apply_to(&mut projection);
    }
    debug!(camera = %config.cameras.main, "snapped to initial view");
}

pub(super) fn sync_projection_on_resize(
    mut resized: MessageReader<WindowResized>,
    mut camera_query: Query<&mut Projection, With<SimCamera>>,
) {
    let Some(last) = resized.read().last() else {
        return;
    };
    if last.width <= 0.0 || last.height <= 0.0 {
        return;
    }

    for mut projection in &mut camera_query {
        if let Projection::Perspective(perspective) = projection.as_mut() {
            perspective.aspect_ratio = last.width / last.height;
        }
    }
    debug!(width = last.width, height = last.height, "window resized");
}
