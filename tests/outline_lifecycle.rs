//! Outline pass lifecycle and orchestration tests.
//!
//! Everything here runs on the recording `DummyBackend`, so no GPU is needed.
//!
//! # Test Categories
//!
//! - **Target Tests**: mask target sizes, reallocation and lockstep release
//! - **Ordering Tests**: mask stage before edge stage, after the forward pass
//! - **Availability Tests**: missing shaders, toggling, teardown
//! - **Selection Tests**: rendering-layer filtering and uniform contents

mod common;

use glam::{Vec3, Vec4};
use rstest::rstest;

use common::{
    dummy_harness, find_pass, pass_pipeline, take_labels, Harness, EDGE_LABEL, FORWARD_LABEL,
    MASK_LABEL,
};
use outline_pass::backend::{BindGroupEntry, BlendState, LoadOp, TextureFormat};
use outline_pass::outline::kernel::{DEPTH_EPSILON, INWARD_BIAS};
use outline_pass::outline::shader::{property_binding, MASK_DEPTH, MASK_TEXTURE, OUTLINE_PARAMS, SCENE_DEPTH};
use outline_pass::outline::{
    OutlineFeature, OutlineFeatureConfig, OutlineShaders, OutlineUniform, OutlineVolume,
};
use outline_pass::resources::Mesh;
use outline_pass::scene::{RenderingLayers, Viewport};
use outline_pass::DummyBackend;

fn white() -> Vec4 {
    Vec4::ONE
}

// ============================================================================
// Target Tests
// ============================================================================

#[rstest]
#[case::single_pixel(1, 1)]
#[case::wide(64, 32)]
#[case::full_hd(1920, 1080)]
fn test_mask_targets_match_viewport(#[case] width: u32, #[case] height: u32) {
    let mut h = dummy_harness(width, height);
    h.render_frame();

    let targets = h.outline_pass().unwrap().targets();
    let color = targets.color_descriptor().unwrap();
    let depth = targets.depth_descriptor().unwrap();

    assert_eq!((color.width, color.height), (width, height));
    assert_eq!((depth.width, depth.height), (width, height));
    assert_eq!(color.sample_count, 1);
    assert_eq!(depth.sample_count, 1);
    assert_eq!(color.format, TextureFormat::Rgba8Unorm);
    assert!(color.format.has_alpha());
    assert!(depth.format.is_depth());
    assert!(depth.format.depth_bits() >= 24);
}

#[test]
fn test_identical_frames_do_not_reallocate() {
    let mut h = dummy_harness(64, 64);
    h.render_frame();
    let created = h.backend.textures_created();

    for _ in 0..5 {
        h.render_frame();
    }

    assert_eq!(h.backend.textures_created(), created);
    assert_eq!(h.backend.textures_destroyed(), 0);
}

#[test]
fn test_resize_reallocates_both_targets_once() {
    let mut h = dummy_harness(64, 64);
    h.render_frame();
    let old_color = h.outline_pass().unwrap().targets().color_view();

    h.resize(128, 96);
    let created = h.backend.textures_created();
    let destroyed = h.backend.textures_destroyed();
    h.render_frame();
    h.render_frame();

    assert_eq!(h.backend.textures_created() - created, 2);
    assert_eq!(h.backend.textures_destroyed() - destroyed, 2);
    let targets = h.outline_pass().unwrap().targets();
    assert_ne!(targets.color_view(), old_color);
    assert_eq!(targets.color_descriptor().unwrap().width, 128);
    assert_eq!(targets.depth_descriptor().unwrap().height, 96);
}

#[test]
fn test_camera_format_change_keeps_mask_targets() {
    let mut h = dummy_harness(64, 64);
    h.render_frame();
    let created = h.backend.textures_created();

    h.scene.camera.set_viewport(Viewport::new(64, 64).with_color_format(TextureFormat::Rgba16Float));
    h.render_frame();

    assert_eq!(h.backend.textures_created(), created);
}

#[test]
fn test_failed_allocation_releases_in_lockstep_and_recovers() {
    let mut h = dummy_harness(32, 32);
    h.render_frame();
    take_labels(&mut h.backend);

    // The camera grows but the mask cannot follow
    h.scene.camera.resize(48, 48);
    h.backend.set_fail_texture_creation(true);
    h.render_frame();

    let labels = take_labels(&mut h.backend);
    assert_eq!(labels, vec![FORWARD_LABEL.to_string()]);
    let targets = h.outline_pass().unwrap().targets();
    assert!(!targets.is_allocated());
    assert!(targets.color_view().is_none());
    assert!(targets.depth_view().is_none());

    h.backend.set_fail_texture_creation(false);
    h.render_frame();

    let labels = take_labels(&mut h.backend);
    assert_eq!(labels, vec![FORWARD_LABEL, MASK_LABEL, EDGE_LABEL]);
    assert!(h.outline_pass().unwrap().targets().is_allocated());
}

#[test]
fn test_zero_sized_viewport_skips_outline() {
    let mut h = dummy_harness(32, 32);
    h.scene.camera.resize(0, 32);
    h.render_frame();

    let labels = take_labels(&mut h.backend);
    assert!(!labels.iter().any(|l| l == MASK_LABEL || l == EDGE_LABEL));
    assert!(!h.outline_pass().unwrap().targets().is_allocated());
}

// ============================================================================
// Ordering Tests
// ============================================================================

#[test]
fn test_mask_stage_precedes_edge_stage() {
    let mut h = dummy_harness(64, 64);
    h.add_object(&Mesh::cube(), white(), Vec3::ZERO, RenderingLayers::DEFAULT);

    for _ in 0..3 {
        h.render_frame();
        let labels = take_labels(&mut h.backend);
        assert_eq!(labels, vec![FORWARD_LABEL, MASK_LABEL, EDGE_LABEL]);
    }
}

#[test]
fn test_edge_stage_reads_mask_and_scene_depth() {
    let mut h = dummy_harness(64, 64);
    h.render_frame();

    let passes = h.backend.take_passes();
    let edge = find_pass(&passes, EDGE_LABEL).unwrap();
    let mask = find_pass(&passes, MASK_LABEL).unwrap();
    let camera = h.targets.as_ref().unwrap();
    let targets = h.outline_pass().unwrap().targets();

    // Mask stage clears to transparent and far depth
    assert_eq!(mask.descriptor.color_attachments[0].view, targets.color_view().unwrap());
    assert_eq!(mask.descriptor.color_attachments[0].load_op, LoadOp::Clear([0.0; 4]));
    let mask_depth = mask.descriptor.depth_stencil_attachment.as_ref().unwrap();
    assert_eq!(mask_depth.view, targets.depth_view().unwrap());
    assert_eq!(mask_depth.depth_clear_value, 1.0);

    // Edge stage blends onto the camera color with one full-screen triangle
    assert_eq!(edge.descriptor.color_attachments.len(), 1);
    assert_eq!(edge.descriptor.color_attachments[0].view, camera.color_view);
    assert_eq!(edge.descriptor.color_attachments[0].load_op, LoadOp::Load);
    assert!(edge.descriptor.depth_stencil_attachment.is_none());
    assert_eq!(edge.draw_count(), 1);

    let pipeline = pass_pipeline(&h.backend, edge).unwrap();
    assert_eq!(pipeline.color_targets[0].blend, Some(BlendState::alpha_blending()));
    assert_eq!(pipeline.color_targets[0].format, h.scene.camera.viewport.color_format);

    let group = edge.bind_groups_at(0)[0];
    let entries = h.backend.bind_group_entries(group).unwrap();
    let texture_at = |name: &str| {
        let slot = property_binding(name).unwrap();
        entries.iter().find_map(|(binding, entry)| match entry {
            BindGroupEntry::Texture(view) if *binding == slot => Some(*view),
            _ => None,
        })
    };
    assert_eq!(texture_at(MASK_TEXTURE), targets.color_view());
    assert_eq!(texture_at(MASK_DEPTH), targets.depth_view());
    assert_eq!(texture_at(SCENE_DEPTH), Some(camera.depth_view));
}

#[test]
fn test_edge_bind_group_is_reused_across_frames() {
    let mut h = dummy_harness(64, 64);
    h.render_frame();
    let live = h.backend.live_bind_group_count();

    for _ in 0..4 {
        h.render_frame();
    }
    assert_eq!(h.backend.live_bind_group_count(), live);

    h.resize(32, 32);
    h.render_frame();
    assert_eq!(h.backend.live_bind_group_count(), live);
}

// ============================================================================
// Availability Tests
// ============================================================================

#[test]
fn test_missing_shaders_skip_registration() {
    let mut h = Harness::new(
        DummyBackend::new(),
        Viewport::new(32, 32),
        OutlineFeature::new(OutlineFeatureConfig::default(), None),
    );

    assert!(h.passes.outline.is_none());
    assert_eq!(h.graph.pass_count(), 1);
    for _ in 0..3 {
        assert!(h.feature.register(&mut h.graph).is_none());
        h.render_frame();
    }

    let labels = take_labels(&mut h.backend);
    assert!(labels.iter().all(|l| l == FORWARD_LABEL));
    assert_eq!(labels.len(), 3);
}

#[test]
fn test_unsupported_shaders_disable_effect() {
    let shaders = OutlineShaders {
        mask: OutlineShaders::builtin().mask,
        edge: "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }"
            .to_string(),
    };
    let h = Harness::new(
        DummyBackend::new(),
        Viewport::new(32, 32),
        OutlineFeature::new(OutlineFeatureConfig::default(), Some(shaders)),
    );

    assert!(!h.feature.is_enabled());
    assert!(h.passes.outline.is_none());
}

#[test]
fn test_teardown_releases_targets_exactly_once() {
    let mut h = dummy_harness(64, 64);
    h.render_frame();
    h.render_frame();
    let destroyed = h.backend.textures_destroyed();

    h.feature.dispose(&mut h.graph, &mut h.backend);
    assert_eq!(h.backend.textures_destroyed() - destroyed, 2);

    h.feature.dispose(&mut h.graph, &mut h.backend);
    h.executor.cleanup(&mut h.graph, &mut h.backend);
    assert_eq!(h.backend.textures_destroyed() - destroyed, 2);

    let backend = h.shutdown();
    assert_eq!(backend.live_texture_count(), 0);
    assert_eq!(backend.textures_created(), backend.textures_destroyed());
}

#[test]
fn test_teardown_without_frames_is_noop() {
    let mut h = dummy_harness(64, 64);
    h.feature.dispose(&mut h.graph, &mut h.backend);

    assert_eq!(h.backend.textures_destroyed(), 0);
    assert!(h.feature.pass_id().is_none());
}

/// Backend objects alive at one point in time
#[derive(Debug, Default, PartialEq, Eq)]
struct LiveObjects {
    textures: usize,
    views: usize,
    buffers: usize,
    bind_groups: usize,
    layouts: usize,
    samplers: usize,
    pipelines: usize,
}

fn live_objects(backend: &DummyBackend) -> LiveObjects {
    LiveObjects {
        textures: backend.live_texture_count(),
        views: backend.live_texture_view_count(),
        buffers: backend.live_buffer_count(),
        bind_groups: backend.live_bind_group_count(),
        layouts: backend.live_bind_group_layout_count(),
        samplers: backend.live_sampler_count(),
        pipelines: backend.live_render_pipeline_count(),
    }
}

#[rstest]
#[case::once(1)]
#[case::repeatedly(4)]
fn test_toggling_shaders_never_leaks(#[case] toggles: usize) {
    let mut h = dummy_harness(64, 32);
    h.add_object(&Mesh::cube(), white(), Vec3::ZERO, RenderingLayers::DEFAULT);
    h.render_frame();

    h.feature.set_shaders(None, &mut h.graph, &mut h.backend);
    h.render_frame();
    let baseline = live_objects(&h.backend);

    for _ in 0..toggles {
        h.feature
            .set_shaders(Some(OutlineShaders::builtin()), &mut h.graph, &mut h.backend);
        assert!(h.feature.pass_id().is_some());
        h.render_frame();
        h.render_frame();
        assert_eq!(h.backend.live_texture_count(), baseline.textures + 2);
        assert!(h.backend.live_render_pipeline_count() > baseline.pipelines);

        h.feature.set_shaders(None, &mut h.graph, &mut h.backend);
        assert!(h.feature.pass_id().is_none());
        h.render_frame();
        assert_eq!(live_objects(&h.backend), baseline);
    }

    let backend = h.shutdown();
    assert_eq!(live_objects(&backend), LiveObjects::default());
    assert_eq!(backend.textures_created(), backend.textures_destroyed());
}

#[test]
fn test_camera_format_change_replaces_edge_pipeline() {
    let mut h = dummy_harness(64, 32);
    h.render_frame();
    let pipelines = h.backend.live_render_pipeline_count();

    h.scene.camera.set_viewport(Viewport::new(64, 32).with_color_format(TextureFormat::Rgba16Float));
    h.render_frame();

    // Forward and edge pipelines are rebuilt, the old ones released
    assert_eq!(h.backend.live_render_pipeline_count(), pipelines);

    let backend = h.shutdown();
    assert_eq!(live_objects(&backend), LiveObjects::default());
}

// ============================================================================
// Selection Tests
// ============================================================================

fn layered_harness() -> Harness<DummyBackend> {
    let mut h = dummy_harness(64, 64);
    let cube = Mesh::cube();
    h.add_object(&cube, white(), Vec3::new(-2.0, 0.0, 0.0), RenderingLayers(0b0001));
    h.add_object(&cube, white(), Vec3::new(0.0, 0.0, 0.0), RenderingLayers(0b0010));
    h.add_object(&cube, white(), Vec3::new(2.0, 0.0, 0.0), RenderingLayers(0b0011));
    // Transparent objects are masked like opaque ones
    h.add_object(
        &cube,
        Vec4::new(1.0, 1.0, 1.0, 0.5),
        Vec3::new(0.0, 2.0, 0.0),
        RenderingLayers(0b0100),
    );
    h
}

#[rstest]
#[case::first_layer(0b0001, 2)]
#[case::second_layer(0b0010, 2)]
#[case::transparent_layer(0b0100, 1)]
#[case::all_layers(u32::MAX, 4)]
#[case::no_layers(0, 0)]
fn test_mask_draws_objects_on_selected_layers(#[case] mask: u32, #[case] expected: usize) {
    let mut h = layered_harness();
    h.scene.outline_volume = Some(OutlineVolume::default().with_rendering_layer_mask(mask));
    h.render_frame();

    let passes = h.backend.take_passes();
    assert_eq!(find_pass(&passes, FORWARD_LABEL).unwrap().draw_count(), 4);
    assert_eq!(find_pass(&passes, MASK_LABEL).unwrap().draw_count(), expected);
    assert_eq!(
        h.outline_pass().unwrap().filter().rendering_layer_mask(),
        mask
    );
}

#[test]
fn test_inactive_volume_falls_back_to_settings() {
    let mut h = layered_harness();
    h.scene.outline_volume = Some(
        OutlineVolume::default()
            .with_active(false)
            .with_rendering_layer_mask(u32::MAX),
    );
    h.render_frame();

    let passes = h.backend.take_passes();
    assert_eq!(find_pass(&passes, MASK_LABEL).unwrap().draw_count(), 2);
}

#[rstest]
#[case::default_width(None, 0.004)]
#[case::override_width(Some(0.007), 0.007)]
#[case::zero_width(Some(0.0), 0.0)]
#[case::clamped_width(Some(0.5), 0.01)]
fn test_edge_uniform_carries_resolved_configuration(
    #[case] width: Option<f32>,
    #[case] expected: f32,
) {
    let mut h = dummy_harness(64, 32);
    if let Some(width) = width {
        h.scene.outline_volume = Some(OutlineVolume::default().with_width(width));
    }
    h.render_frame();

    let passes = h.backend.take_passes();
    let edge = find_pass(&passes, EDGE_LABEL).unwrap();
    let group = edge.bind_groups_at(0)[0];
    let slot = property_binding(OUTLINE_PARAMS).unwrap();
    let buffer = h
        .backend
        .bind_group_entries(group)
        .unwrap()
        .iter()
        .find_map(|(binding, entry)| match entry {
            BindGroupEntry::Buffer { buffer, .. } if *binding == slot => Some(*buffer),
            _ => None,
        })
        .unwrap();

    let bytes = h.backend.buffer_contents(buffer).unwrap();
    let uniform: OutlineUniform = bytemuck::pod_read_unaligned(bytes);
    assert_eq!(uniform.color, Vec4::ONE);
    assert_eq!(uniform.params.x, expected);
    assert_eq!(uniform.params.y, 2.0);
    assert_eq!(uniform.params.z, DEPTH_EPSILON);
    assert_eq!(uniform.params.w, INWARD_BIAS);
}
