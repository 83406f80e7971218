//! Extraction of render objects from an ECS world

use super::{RenderObject, RenderQueue, RenderingLayers, Scene, Transform};
use crate::outline::OutlineVolume;
use bevy_ecs::prelude::*;

/// Index into `Scene::meshes`
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshRef(pub usize);

/// Index into `Scene::materials`
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialRef(pub usize);

/// Rebuild the scene's object list from the world.
///
/// Every entity with a transform, a mesh and a material becomes one object;
/// entities without `RenderingLayers` land on the default layer. The queue is
/// derived from the material's alpha. The `OutlineVolume` resource, if any,
/// is copied so passes see a stable per-frame value.
pub fn extract_scene(world: &mut World, scene: &mut Scene) {
    let mut query =
        world.query::<(Entity, &Transform, &MeshRef, &MaterialRef, Option<&RenderingLayers>)>();

    let mut extracted: Vec<(Entity, RenderObject)> = query
        .iter(world)
        .map(|(entity, transform, mesh, material, layers)| {
            let queue = match scene.material(material.0) {
                Some(m) if m.is_transparent() => RenderQueue::Transparent,
                _ => RenderQueue::Opaque,
            };
            let object = RenderObject::new(mesh.0, material.0)
                .with_transform(*transform)
                .with_queue(queue)
                .with_layers(layers.copied().unwrap_or_default());
            (entity, object)
        })
        .collect();

    // Archetype iteration order is not spawn order
    extracted.sort_by_key(|(entity, _)| *entity);

    scene.objects = extracted.into_iter().map(|(_, object)| object).collect();
    scene.outline_volume = world.get_resource::<OutlineVolume>().cloned();

    log::trace!(
        "Extracted {} objects (outline volume: {})",
        scene.objects.len(),
        scene.outline_volume.is_some()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Material;
    use glam::{Vec3, Vec4};

    #[test]
    fn extracts_objects_layers_and_volume() {
        let mut world = World::new();
        let mut scene = Scene::default();
        let opaque = scene.add_material(Material::default());
        let glass = scene
            .add_material(Material::new("glass").with_base_color(Vec4::new(1.0, 1.0, 1.0, 0.5)));

        world.spawn((Transform::from_position(Vec3::X), MeshRef(0), MaterialRef(opaque)));
        world.spawn((
            Transform::default(),
            MeshRef(0),
            MaterialRef(glass),
            RenderingLayers::layer(3),
        ));
        // No mesh: not renderable
        world.spawn((Transform::default(), MaterialRef(opaque)));

        extract_scene(&mut world, &mut scene);
        assert_eq!(scene.objects.len(), 2);
        assert!(scene.outline_volume.is_none());

        let first = &scene.objects[0];
        assert_eq!(first.transform.position, Vec3::X);
        assert_eq!(first.rendering_layers, RenderingLayers::DEFAULT);
        assert_eq!(first.queue, RenderQueue::Opaque);

        let second = &scene.objects[1];
        assert_eq!(second.rendering_layers.bits(), 1 << 3);
        assert_eq!(second.queue, RenderQueue::Transparent);

        world.insert_resource(OutlineVolume::default());
        extract_scene(&mut world, &mut scene);
        assert!(scene.outline_volume.is_some());
    }
}
