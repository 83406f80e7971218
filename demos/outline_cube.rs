//! Headless outline demo
//!
//! Renders a cube tagged for outlining and writes the frame to a PNG.
//!
//! Run with:
//!   cargo run --example outline_cube
//!   cargo run --example outline_cube -- --occluder --width 1024 --height 768
//!   cargo run --example outline_cube -- --outline-width 0.008 --output wide.png

use clap::Parser;
use glam::{Quat, Vec3, Vec4};
use outline_pass::{
    backend::{GraphicsBackend, WgpuBackend},
    outline::{OutlineFeature, OutlineFeatureConfig, OutlineSettings, OutlineVolume},
    pipeline::{build_outline_graph, CameraTargets, ForwardConfig},
    render_graph::{RenderGraph, RenderGraphExecutor},
    resources::{GpuMesh, Material, Mesh},
    scene::{Camera, RenderObject, RenderingLayers, Scene, Transform, Viewport},
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "outline_cube", about = "Render an outlined cube to a PNG")]
struct Args {
    /// Image width in pixels
    #[arg(long, default_value_t = 800)]
    width: u32,

    /// Image height in pixels
    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Where to write the PNG
    #[arg(short, long, default_value = "outline_cube.png")]
    output: PathBuf,

    /// Put an untagged bar between the camera and the cube
    #[arg(long)]
    occluder: bool,

    /// Override the outline width through a volume
    #[arg(long)]
    outline_width: Option<f32>,
}

fn build_scene(backend: &mut dyn GraphicsBackend, args: &Args) -> Result<Scene, Box<dyn std::error::Error>> {
    let viewport = Viewport::new(args.width, args.height);
    let camera = Camera::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO).with_viewport(viewport);
    let mut scene = Scene::new(camera);

    let cube = scene.add_mesh(GpuMesh::upload(backend, &Mesh::cube())?);
    let red = scene.add_material(Material::opaque("red", Vec3::new(0.8, 0.1, 0.1)));
    scene.add_object(
        RenderObject::new(cube, red)
            .with_transform(
                Transform::from_position(Vec3::ZERO)
                    .with_rotation(Quat::from_euler(glam::EulerRot::XYZ, 0.5, 0.7, 0.0)),
            )
            .with_layers(RenderingLayers::DEFAULT),
    );

    if args.occluder {
        let bar = scene.add_mesh(GpuMesh::upload(backend, &Mesh::quad(0.3, 3.0))?);
        let blue = scene.add_material(Material::opaque("blue", Vec3::new(0.1, 0.2, 0.9)));
        scene.add_object(
            RenderObject::new(bar, blue)
                .with_position(Vec3::new(0.0, 0.0, 1.5))
                .with_layers(RenderingLayers::layer(1)),
        );
    }

    if let Some(width) = args.outline_width {
        scene.outline_volume = Some(OutlineVolume::default().with_width(width));
    }

    Ok(scene)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut backend = WgpuBackend::new_headless()?;
    log::info!("Using backend: {}", backend.name());

    let mut graph = RenderGraph::new();
    let mut feature = OutlineFeature::with_builtin_shaders(OutlineFeatureConfig {
        settings: OutlineSettings::default().with_color(Vec4::new(1.0, 1.0, 0.2, 1.0)),
        ..Default::default()
    });
    let forward = ForwardConfig {
        clear_color: [0.05, 0.05, 0.08, 1.0],
        ..Default::default()
    };
    build_outline_graph(&mut graph, &mut feature, &forward);

    let scene = build_scene(&mut backend, &args)?;
    let targets = CameraTargets::create(&mut backend, &scene.camera.viewport, forward.depth_format)?;

    let mut executor = RenderGraphExecutor::new();
    targets.bind(&mut executor, &graph);

    backend.begin_frame();
    executor.execute(&mut graph, &mut backend, &scene);
    let pixels = backend.read_texture(targets.color, args.width, args.height)?;

    let image = image::RgbaImage::from_raw(args.width, args.height, pixels)
        .ok_or("readback size does not match the image")?;
    image.save(&args.output)?;
    log::info!("Wrote {}", args.output.display());

    feature.dispose(&mut graph, &mut backend);
    executor.cleanup(&mut graph, &mut backend);
    targets.destroy(&mut backend);
    for mesh in scene.meshes {
        mesh.destroy(&mut backend);
    }

    Ok(())
}
