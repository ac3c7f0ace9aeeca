use super::assets::SimAssets;
use super::camera::SimCamera;
use super::config::SimConfig;
use super::tween::{CameraPose, Lens};
use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy::scene::SceneInstanceReady;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(super) enum Role {
    Button,
    BreakerBox,
    Door,
    Switch,
}

/// Mesh that takes part in pointer picking.
#[derive(Component, Debug)]
pub(super) struct PickTarget;

#[derive(Component, Debug)]
pub(super) struct SimSceneRoot;

#[derive(Component, Debug)]
pub(super) struct DrillBitSpin {
    pub(super) rotating: bool,
}

#[derive(Component, Debug)]
pub(super) struct DoorHinge {
    closed: Quat,
}

/// Named nodes of the loaded scene instance.
#[derive(Resource, Debug, Default)]
pub(super) struct SceneIndex {
    root: Option<Entity>,
    nodes: HashMap<String, Entity>,
    cameras: HashMap<String, Entity>,
    roles: HashMap<Role, Entity>,
    initial_view_pending: bool,
}

impl SceneIndex {
    pub(super) fn root(&self) -> Option<Entity> {
        self.root
    }

    pub(super) fn node(&self, name: &str) -> Option<Entity> {
        self.nodes.get(name).copied()
    }

    pub(super) fn camera(&self, name: &str) -> Option<Entity> {
        self.cameras.get(name).copied()
    }

    pub(super) fn role_node(&self, role: Role) -> Option<Entity> {
        self.roles.get(&role).copied()
    }

    pub(super) fn is_ready(&self) -> bool {
        !self.nodes.is_empty()
    }

    pub(super) fn take_initial_view_request(&mut self) -> bool {
        std::mem::take(&mut self.initial_view_pending)
    }

    pub(super) fn register_node(&mut self, name: &str, entity: Entity, role: Option<Role>) {
        self.nodes.insert(name.to_string(), entity);
        if let Some(role) = role {
            self.roles.insert(role, entity);
        }
    }

    pub(super) fn register_camera(&mut self, name: &str, entity: Entity) {
        self.cameras.insert(name.to_string(), entity);
    }

    fn forget(&mut self, entity: Entity) {
        self.nodes.retain(|_, node| *node != entity);
        self.cameras.retain(|_, node| *node != entity);
        self.roles.retain(|_, node| *node != entity);
    }

    pub(super) fn reset(&mut self, root: Option<Entity>) {
        *self = Self {
            root,
            ..Self::default()
        };
    }
}

/// Lookup and mutation of the scene's named parts. Absent nodes turn every
/// operation into a no-op.
#[derive(SystemParam)]
pub(super) struct SceneGraph<'w, 's> {
    commands: Commands<'w, 's>,
    index: ResMut<'w, SceneIndex>,
    transforms: Query<'w, 's, &'static mut Transform, Without<SimCamera>>,
    globals: Query<'w, 's, &'static GlobalTransform>,
    projections: Query<'w, 's, &'static Projection, Without<SimCamera>>,
    visibility: Query<'w, 's, &'static mut Visibility>,
    hinges: Query<'w, 's, &'static DoorHinge>,
    spinners: Query<'w, 's, &'static mut DrillBitSpin>,
}

impl SceneGraph<'_, '_> {
    pub(super) fn nudge_role_node(&mut self, role: Role, offset: Vec3) {
        let Some(entity) = self.index.role_node(role) else {
            return;
        };
        if let Ok(mut transform) = self.transforms.get_mut(entity) {
            transform.translation += offset;
        }
    }

    pub(super) fn set_door_open(&mut self, open: bool) {
        let Some(entity) = self.index.role_node(Role::Door) else {
            return;
        };
        let Ok(hinge) = self.hinges.get(entity) else {
            return;
        };
        let angle = if open { std::f32::consts::FRAC_PI_2 } else { 0.0 };
        let rotation = hinge.closed * Quat::from_rotation_y(angle);
        if let Ok(mut transform) = self.transforms.get_mut(entity) {
            transform.rotation = rotation;
        }
    }

    pub(super) fn remove_role_node(&mut self, role: Role) {
        let Some(entity) = self.index.role_node(role) else {
            return;
        };
        self.index.forget(entity);
        self.commands.entity(entity).despawn();
        debug!(?role, "removed scene node");
    }

    pub(super) fn set_node_visible(&mut self, name: &str, visible: bool) {
        let Some(entity) = self.index.node(name) else {
            return;
        };
        if let Ok(mut visibility) = self.visibility.get_mut(entity) {
            *visibility = if visible {
                Visibility::Inherited
            } else {
                Visibility::Hidden
            };
        }
    }

    pub(super) fn stop_drill_bit(&mut self) {
        for mut spin in &mut self.spinners {
            spin.rotating = false;
        }
    }

    pub(super) fn camera_pose(&self, name: &str) -> Option<CameraPose> {
        let entity = self.index.camera(name)?;
        let global = self.globals.get(entity).ok()?;
        let lens = self
            .projections
            .get(entity)
            .ok()
            .and_then(Lens::from_projection);
        Some(CameraPose::from_global(global, lens))
    }
}

pub(super) fn spawn_scene(
    mut commands: Commands,
    assets: Option<Res<SimAssets>>,
    mut index: ResMut<SceneIndex>,
) {
    spawn_scene_instance(&mut commands, assets.as_deref(), &mut index);
}

pub(super) fn spawn_scene_instance(
    commands: &mut Commands,
    assets: Option<&SimAssets>,
    index: &mut SceneIndex,
) {
    if let Some(old_root) = index.root() {
        commands.entity(old_root).despawn();
    }

    let Some(assets) = assets else {
        warn!("scene asset unavailable, interactions are disabled");
        index.reset(None);
        return;
    };

    let root = commands
        .spawn((SceneRoot(assets.scene.clone()), SimSceneRoot))
        .observe(index_scene_nodes)
        .id();
    index.reset(Some(root));
}

fn index_scene_nodes(
    _ready: On<SceneInstanceReady>,
    mut commands: Commands,
    config: Res<SimConfig>,
    mut index: ResMut<SceneIndex>,
    children: Query<&Children>,
    names: Query<&Name>,
    meshes: Query<(), With<Mesh3d>>,
    transforms: Query<&Transform>,
    mut cameras: Query<&mut Camera, Without<SimCamera>>,
) {
    let Some(root) = index.root() else {
        return;
    };

    for entity in children.iter_descendants(root) {
        let Ok(name) = names.get(entity) else {
            continue;
        };
        let name = name.as_str();

        if let Ok(mut camera) = cameras.get_mut(entity) {
            camera.is_active = false;
            index.register_camera(name, entity);
            continue;
        }

        let role = config.nodes.role_for(name);
        index.register_node(name, entity, role);

        if let Some(role) = role {
            commands.entity(entity).insert(role);
            let mut registered = 0;
            for part in std::iter::once(entity).chain(children.iter_descendants(entity)) {
                if meshes.contains(part) {
                    commands.entity(part).insert(PickTarget);
                    registered += 1;
                }
            }
            debug!(node = name, ?role, meshes = registered, "registered interactive node");

            if role == Role::Door {
                let closed = transforms
                    .get(entity)
                    .map(|transform| transform.rotation)
                    .unwrap_or(Quat::IDENTITY);
                commands.entity(entity).insert(DoorHinge { closed });
            }
        }

        if name == config.nodes.lock_device {
            commands.entity(entity).insert(Visibility::Hidden);
        }
        if name == config.nodes.drill_bit {
            commands
                .entity(entity)
                .insert(DrillBitSpin { rotating: true });
        }
    }

    for binding in &config.nodes.roles {
        if index.role_node(binding.role).is_none() {
            warn!(node = %binding.node, role = ?binding.role, "interactive node missing from scene");
        }
    }
    if index.camera(&config.cameras.main).is_none() {
        warn!(camera = %config.cameras.main, "main camera node missing from scene");
    }

    index.initial_view_pending = true;
    info!(
        nodes = index.nodes.len(),
        cameras = index.cameras.len(),
        "scene indexed"
    );
}

pub(super) fn spin_drill_bit(
    time: Res<Time>,
    config: Res<SimConfig>,
    mut query: Query<(&mut Transform, &DrillBitSpin)>,
) {
    for (mut transform, spin) in &mut query {
        if spin.rotating {
            transform.rotate_y(config.drill_spin_speed * time.delta_secs());
        }
    }
}
