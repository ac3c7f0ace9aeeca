use super::camera::SimCamera;
use super::config::SimConfig;
use super::effects::EffectQueue;
use super::scene::{PickTarget, Role, SceneIndex};
use super::session::LotoSession;
use bevy::picking::mesh_picking::ray_cast::{MeshRayCast, MeshRayCastSettings, RayCastVisibility};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PickHit {
    pub(super) entity: Entity,
    pub(super) distance: f32,
}

/// Ray of a click that still has to be resolved against the scene.
#[derive(Resource, Debug, Default)]
pub(super) struct PendingPick(pub(super) Option<Ray3d>);

/// Maps a cursor position inside `viewport` to `[-1, 1]` device coordinates
/// with +y pointing up.
pub(super) fn normalize_pointer(cursor: Vec2, viewport: Rect) -> Option<Vec2> {
    let size = viewport.size();
    if size.x <= 0.0 || size.y <= 0.0 {
        return None;
    }
    let local = cursor - viewport.min;
    Some(Vec2::new(
        local.x / size.x * 2.0 - 1.0,
        -(local.y / size.y * 2.0 - 1.0),
    ))
}

pub(super) fn pointer_ray(
    camera: &Camera,
    camera_transform: &GlobalTransform,
    ndc: Vec2,
) -> Option<Ray3d> {
    let near = camera.ndc_to_world(camera_transform, ndc.extend(1.0))?;
    let far = camera.ndc_to_world(camera_transform, ndc.extend(f32::EPSILON))?;
    let direction = Dir3::new(far - near).ok()?;
    Some(Ray3d::new(near, direction))
}

/// Nearest triangle hit among the meshes accepted by `is_target`. Visibility
/// is not consulted; only tagged meshes take part.
pub(super) fn nearest_target(
    ray_cast: &mut MeshRayCast,
    ray: Ray3d,
    is_target: impl Fn(Entity) -> bool,
) -> Option<PickHit> {
    let settings = MeshRayCastSettings::default()
        .with_visibility(RayCastVisibility::Any)
        .with_filter(&is_target);
    ray_cast
        .cast_ray(ray, &settings)
        .first()
        .map(|(entity, hit)| PickHit {
            entity: *entity,
            distance: hit.distance,
        })
}

/// Walks from `start` up the parent chain to the first entity carrying a role.
pub(super) fn resolve_role(
    start: Entity,
    parent_of: impl Fn(Entity) -> Option<Entity>,
    role_of: impl Fn(Entity) -> Option<Role>,
) -> Option<(Entity, Role)> {
    let mut current = Some(start);
    while let Some(entity) = current {
        if let Some(role) = role_of(entity) {
            return Some((entity, role));
        }
        current = parent_of(entity);
    }
    None
}

pub(super) fn aim_pointer_ray(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<SimCamera>>,
    index: Res<SceneIndex>,
    mut pending: ResMut<PendingPick>,
) {
    if !mouse_buttons.just_pressed(MouseButton::Left) || !index.is_ready() {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };

    let viewport = camera
        .logical_viewport_rect()
        .unwrap_or_else(|| Rect::new(0.0, 0.0, window.width(), window.height()));
    let Some(ndc) = normalize_pointer(cursor, viewport) else {
        return;
    };
    pending.0 = pointer_ray(camera, camera_transform, ndc);
}

pub(super) fn resolve_pick(
    mut pending: ResMut<PendingPick>,
    mut ray_cast: MeshRayCast,
    targets: Query<(), With<PickTarget>>,
    parents: Query<&ChildOf>,
    roles: Query<&Role>,
    config: Res<SimConfig>,
    mut session: ResMut<LotoSession>,
    mut queue: ResMut<EffectQueue>,
) {
    let Some(ray) = pending.0.take() else {
        return;
    };

    let Some(nearest) = nearest_target(&mut ray_cast, ray, |entity| targets.contains(entity)) else {
        debug!("no hits");
        return;
    };

    let resolved = resolve_role(
        nearest.entity,
        |entity| parents.get(entity).ok().map(ChildOf::parent),
        |entity| roles.get(entity).ok().copied(),
    );
    let Some((node, role)) = resolved else {
        debug!(entity = ?nearest.entity, "hit object has no interactive role");
        return;
    };

    debug!(?node, ?role, distance = nearest.distance, "picked");
    queue.extend(session.handle(role, &config.timings));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::config::SimTimings;
    use crate::sim::procedure::Step;
    use approx::assert_relative_eq;
    use bevy::asset::RenderAssetUsages;
    use bevy::camera::primitives::Aabb;
    use bevy::ecs::system::RunSystemOnce;
    use bevy::mesh::{Indices, PrimitiveTopology};
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::collections::HashMap;

    #[rstest]
    #[case(Vec2::new(0.0, 0.0), Vec2::new(-1.0, 1.0))]
    #[case(Vec2::new(800.0, 450.0), Vec2::new(0.0, 0.0))]
    #[case(Vec2::new(1600.0, 900.0), Vec2::new(1.0, -1.0))]
    #[case(Vec2::new(400.0, 675.0), Vec2::new(-0.5, -0.5))]
    fn pointer_is_normalized_with_y_up(#[case] cursor: Vec2, #[case] expected: Vec2) {
        let viewport = Rect::new(0.0, 0.0, 1600.0, 900.0);
        let ndc = normalize_pointer(cursor, viewport).expect("viewport has area");
        assert_relative_eq!(ndc.x, expected.x);
        assert_relative_eq!(ndc.y, expected.y);
    }

    #[test]
    fn offset_viewport_is_respected() {
        let viewport = Rect::new(100.0, 50.0, 300.0, 150.0);
        let ndc = normalize_pointer(Vec2::new(200.0, 100.0), viewport).expect("viewport has area");
        assert_relative_eq!(ndc.x, 0.0);
        assert_relative_eq!(ndc.y, 0.0);
    }

    #[test]
    fn empty_viewport_yields_nothing() {
        let viewport = Rect::new(0.0, 0.0, 0.0, 900.0);
        assert_eq!(normalize_pointer(Vec2::ZERO, viewport), None);
    }

    /// Cabinet shell open at the front: back wall at z = -0.15 facing +Z and
    /// two side walls, so its bounds enclose anything mounted inside.
    fn open_cabinet() -> Mesh {
        let positions = vec![
            [-0.3, -0.3, -0.15],
            [0.3, -0.3, -0.15],
            [0.3, 0.3, -0.15],
            [-0.3, 0.3, -0.15],
            [-0.3, -0.3, -0.15],
            [-0.3, -0.3, 0.15],
            [-0.3, 0.3, 0.15],
            [-0.3, 0.3, -0.15],
            [0.3, -0.3, 0.15],
            [0.3, -0.3, -0.15],
            [0.3, 0.3, -0.15],
            [0.3, 0.3, 0.15],
        ];
        Mesh::new(PrimitiveTopology::TriangleList, RenderAssetUsages::default())
            .with_inserted_attribute(Mesh::ATTRIBUTE_POSITION, positions)
            .with_inserted_indices(Indices::U32(vec![
                0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7, 8, 9, 10, 8, 10, 11,
            ]))
    }

    fn cabinet_bounds() -> Aabb {
        Aabb::from_min_max(Vec3::new(-0.3, -0.3, -0.15), Vec3::new(0.3, 0.3, 0.15))
    }

    fn switch_mesh() -> Mesh {
        Mesh::from(Cuboid::new(0.1, 0.1, 0.06))
    }

    fn switch_bounds() -> Aabb {
        Aabb::from_min_max(Vec3::new(-0.05, -0.05, -0.03), Vec3::new(0.05, 0.05, 0.03))
    }

    fn click_from_front() -> Ray3d {
        Ray3d::new(Vec3::new(0.0, 0.0, 2.0), Dir3::NEG_Z)
    }

    fn pick_world(ray: Ray3d) -> World {
        bevy::tasks::ComputeTaskPool::get_or_init(bevy::tasks::TaskPool::default);
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        world.insert_resource(SimConfig::default());
        world.init_resource::<LotoSession>();
        world.init_resource::<EffectQueue>();
        world.insert_resource(PendingPick(Some(ray)));
        world
    }

    fn spawn_target(world: &mut World, mesh: Mesh, translation: Vec3, bounds: Aabb) -> Entity {
        let handle = world.resource_mut::<Assets<Mesh>>().add(mesh);
        let transform = Transform::from_translation(translation);
        world
            .spawn((
                Mesh3d(handle),
                transform,
                GlobalTransform::from(transform),
                Visibility::default(),
                bounds,
                PickTarget,
            ))
            .id()
    }

    fn session_at_flip_switch() -> LotoSession {
        let timings = SimTimings::default();
        let mut session = LotoSession::default();
        for role in [Role::Button, Role::BreakerBox, Role::Door] {
            session.handle(role, &timings);
        }
        assert_eq!(session.procedure().step(), Step::FlipSwitch);
        session
    }

    #[test]
    fn mesh_inside_a_hollow_shell_is_hit_first() {
        let mut world = pick_world(click_from_front());
        let cabinet = spawn_target(&mut world, open_cabinet(), Vec3::ZERO, cabinet_bounds());
        let switch = spawn_target(
            &mut world,
            switch_mesh(),
            Vec3::new(0.0, 0.0, -0.05),
            switch_bounds(),
        );

        let ray = click_from_front();
        let nearest = world
            .run_system_once(
                move |mut ray_cast: MeshRayCast, targets: Query<(), With<PickTarget>>| {
                    nearest_target(&mut ray_cast, ray, |entity| targets.contains(entity))
                },
            )
            .expect("ray cast runs")
            .expect("something is hit");

        assert_ne!(nearest.entity, cabinet);
        assert_eq!(nearest.entity, switch);
        assert_relative_eq!(nearest.distance, 2.02, epsilon = 1e-4);
    }

    #[test]
    fn meshes_outside_the_target_set_are_ignored() {
        let mut world = pick_world(click_from_front());
        let handle = world.resource_mut::<Assets<Mesh>>().add(switch_mesh());
        let transform = Transform::from_xyz(0.0, 0.0, 1.0);
        world.spawn((
            Mesh3d(handle),
            transform,
            GlobalTransform::from(transform),
            Visibility::default(),
            switch_bounds(),
        ));
        let cabinet = spawn_target(&mut world, open_cabinet(), Vec3::ZERO, cabinet_bounds());

        let ray = click_from_front();
        let nearest = world
            .run_system_once(
                move |mut ray_cast: MeshRayCast, targets: Query<(), With<PickTarget>>| {
                    nearest_target(&mut ray_cast, ray, |entity| targets.contains(entity))
                },
            )
            .expect("ray cast runs");

        assert_eq!(nearest.map(|hit| hit.entity), Some(cabinet));
    }

    #[test]
    fn switch_inside_the_breaker_box_isolates_energy() {
        let mut world = pick_world(click_from_front());
        world.insert_resource(session_at_flip_switch());
        let cabinet = spawn_target(&mut world, open_cabinet(), Vec3::ZERO, cabinet_bounds());
        world.entity_mut(cabinet).insert(Role::BreakerBox);
        let switch = spawn_target(
            &mut world,
            switch_mesh(),
            Vec3::new(0.0, 0.0, -0.05),
            switch_bounds(),
        );
        world.entity_mut(switch).insert((Role::Switch, ChildOf(cabinet)));

        world.run_system_once(resolve_pick).expect("pick resolves");

        let session = world.resource::<LotoSession>();
        assert_eq!(session.procedure().step(), Step::LockTag);
        assert!(session.procedure().done().switch);
        assert!(!world.resource::<EffectQueue>().is_empty());
    }

    #[test]
    fn click_on_untagged_mesh_changes_nothing() {
        let mut world = pick_world(click_from_front());
        spawn_target(&mut world, switch_mesh(), Vec3::ZERO, switch_bounds());

        world.run_system_once(resolve_pick).expect("pick resolves");

        assert_eq!(*world.resource::<LotoSession>(), LotoSession::default());
        assert!(world.resource::<EffectQueue>().is_empty());
        assert_eq!(world.resource::<PendingPick>().0, None);
    }

    #[test]
    fn click_on_tagged_ancestor_advances_the_procedure() {
        let mut world = pick_world(click_from_front());
        let button = world.spawn((Role::Button, Transform::default())).id();
        let part = spawn_target(&mut world, switch_mesh(), Vec3::ZERO, switch_bounds());
        world.entity_mut(part).insert(ChildOf(button));

        world.run_system_once(resolve_pick).expect("pick resolves");

        let session = world.resource::<LotoSession>();
        assert_eq!(session.procedure().step(), Step::OpenBreakerBox);
        assert!(session.procedure().done().shutdown);
        assert!(!world.resource::<EffectQueue>().is_empty());
    }

    #[test]
    fn miss_consumes_the_click() {
        let mut world = pick_world(Ray3d::new(Vec3::new(5.0, 0.0, 2.0), Dir3::NEG_Z));
        let button = spawn_target(&mut world, switch_mesh(), Vec3::ZERO, switch_bounds());
        world.entity_mut(button).insert(Role::Button);

        world.run_system_once(resolve_pick).expect("pick resolves");

        assert_eq!(*world.resource::<LotoSession>(), LotoSession::default());
        assert_eq!(world.resource::<PendingPick>().0, None);
    }

    #[test]
    fn role_resolves_through_ancestors() {
        let mut world = World::new();
        let door = world.spawn_empty().id();
        let hinge = world.spawn_empty().id();
        let mesh = world.spawn_empty().id();

        let parents = HashMap::from([(mesh, hinge), (hinge, door)]);
        let roles = HashMap::from([(door, Role::Door)]);

        let resolved = resolve_role(
            mesh,
            |entity| parents.get(&entity).copied(),
            |entity| roles.get(&entity).copied(),
        );
        assert_eq!(resolved, Some((door, Role::Door)));
    }

    #[test]
    fn nearest_tagged_ancestor_wins() {
        let mut world = World::new();
        let breaker_box = world.spawn_empty().id();
        let switch = world.spawn_empty().id();
        let mesh = world.spawn_empty().id();

        let parents = HashMap::from([(mesh, switch), (switch, breaker_box)]);
        let roles = HashMap::from([(breaker_box, Role::BreakerBox), (switch, Role::Switch)]);

        let resolved = resolve_role(
            mesh,
            |entity| parents.get(&entity).copied(),
            |entity| roles.get(&entity).copied(),
        );
        assert_eq!(resolved, Some((switch, Role::Switch)));
    }

    #[test]
    fn untagged_hierarchy_resolves_to_nothing() {
        let mut world = World::new();
        let floor = world.spawn_empty().id();
        let mesh = world.spawn_empty().id();
        let parents = HashMap::from([(mesh, floor)]);

        let resolved = resolve_role(mesh, |entity| parents.get(&entity).copied(), |_| None);
        assert_eq!(resolved, None);
    }
}
