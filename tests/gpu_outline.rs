//! GPU integration tests for the outline pass.
//!
//! These render real frames through the headless wgpu backend and read the
//! camera color back. When no adapter is available the tests log and return.
//!
//! ```bash
//! cargo test --test gpu_outline
//! ```

mod common;

use glam::{Vec3, Vec4};
use rstest::rstest;

use common::{get_pixel, Harness};
use outline_pass::backend::{GraphicsBackend, TextureFormat, WgpuBackend};
use outline_pass::outline::{OutlineFeature, OutlineFeatureConfig, OutlineVolume};
use outline_pass::resources::Mesh;
use outline_pass::scene::{RenderingLayers, Viewport};

const SIZE: u32 = 256;

/// Outline pixels over the black clear have green around half intensity.
/// Neither the red cube nor the blue occluder gets close.
const OUTLINE_GREEN: u8 = 100;

fn gpu_harness() -> Option<Harness<WgpuBackend>> {
    common::init_logger();
    let backend = match WgpuBackend::new_headless() {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("wgpu backend not available, skipping: {}", e);
            return None;
        }
    };

    let viewport = Viewport::new(SIZE, SIZE).with_color_format(TextureFormat::Rgba8Unorm);
    let feature = OutlineFeature::with_builtin_shaders(OutlineFeatureConfig::default());
    let mut h = Harness::new(backend, viewport, feature);

    let red = Vec4::new(0.8, 0.1, 0.1, 1.0);
    h.add_object(&Mesh::cube(), red, Vec3::ZERO, RenderingLayers::DEFAULT);
    Some(h)
}

fn render(h: &mut Harness<WgpuBackend>) -> Vec<u8> {
    h.backend.begin_frame();
    h.execute();
    let color = h.targets.as_ref().unwrap().color;
    h.backend.read_texture(color, SIZE, SIZE).unwrap()
}

fn outline_pixels(pixels: &[u8]) -> usize {
    pixels
        .chunks_exact(4)
        .filter(|p| p[1] >= OUTLINE_GREEN)
        .count()
}

#[test]
fn test_cube_gets_silhouette_outline() {
    let Some(mut h) = gpu_harness() else {
        return;
    };
    h.scene.outline_volume = Some(OutlineVolume::default().with_width(0.01));
    let pixels = render(&mut h);

    assert!(outline_pixels(&pixels) > 0, "expected an outline around the cube");

    // Interior keeps the cube's shading, far exterior keeps the clear color
    let center = get_pixel(&pixels, SIZE, SIZE / 2, SIZE / 2);
    assert!(center[1] < 40, "interior should not be outlined: {:?}", center);
    assert_eq!(get_pixel(&pixels, SIZE, 2, 2), [0, 0, 0, 255]);
    assert_eq!(get_pixel(&pixels, SIZE, SIZE - 3, SIZE - 3), [0, 0, 0, 255]);

    h.shutdown();
}

/// Untagged blue quad: (size, depth along the view axis)
type Blocker = Option<(f32, f32)>;

#[rstest]
#[case::occluded(Some((3.0, 1.5)), 0.01)]
#[case::backdrop(Some((20.0, -1.5)), 0.01)]
#[case::zero_width(None, 0.0)]
fn test_outline_suppressed(#[case] blocker: Blocker, #[case] width: f32) {
    let Some(mut h) = gpu_harness() else {
        return;
    };
    if let Some((size, z)) = blocker {
        let blue = Vec4::new(0.1, 0.2, 0.9, 1.0);
        h.add_object(
            &Mesh::quad(size, size),
            blue,
            Vec3::new(0.0, 0.0, z),
            RenderingLayers::layer(1),
        );
    }
    h.scene.outline_volume = Some(OutlineVolume::default().with_width(width));
    let pixels = render(&mut h);

    assert_eq!(outline_pixels(&pixels), 0);

    h.shutdown();
}
