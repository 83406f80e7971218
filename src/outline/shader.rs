//! Outline shader sources, validation and binding lookup

use crate::backend::types::ShaderStage;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors that make an outline shader unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("{label}: WGSL parse error: {message}")]
    Parse { label: &'static str, message: String },
    #[error("{label}: validation error: {message}")]
    Validation { label: &'static str, message: String },
    #[error("{label}: entry point '{entry_point}' not found for {stage:?} stage")]
    MissingEntryPoint {
        label: &'static str,
        entry_point: &'static str,
        stage: ShaderStage,
    },
}

/// Entry point names every outline shader must provide
pub const VERTEX_ENTRY: &str = "vs_main";
pub const FRAGMENT_ENTRY: &str = "fs_main";

// Edge compositor parameter names
pub const MASK_TEXTURE: &str = "mask_texture";
pub const MASK_SAMPLER: &str = "mask_sampler";
pub const MASK_DEPTH: &str = "mask_depth";
pub const SCENE_DEPTH: &str = "scene_depth";
pub const OUTLINE_PARAMS: &str = "outline_params";

const EDGE_PROPERTIES: [(&str, u32); 5] = [
    (MASK_TEXTURE, 0),
    (MASK_SAMPLER, 1),
    (MASK_DEPTH, 2),
    (SCENE_DEPTH, 3),
    (OUTLINE_PARAMS, 4),
];

/// Binding slot of an edge compositor parameter, by name.
///
/// The table is built on first use and never changes afterwards.
pub fn property_binding(name: &str) -> Option<u32> {
    static TABLE: OnceLock<HashMap<&'static str, u32>> = OnceLock::new();
    TABLE
        .get_or_init(|| EDGE_PROPERTIES.into_iter().collect())
        .get(name)
        .copied()
}

/// Draws tagged objects into the mask with their material color and alpha
pub const MASK_SHADER: &str = r#"
struct CameraUniforms {
    view_proj: mat4x4<f32>,
    position: vec4<f32>,
}

struct ObjectUniforms {
    model: mat4x4<f32>,
    normal_matrix: mat4x4<f32>,
    base_color: vec4<f32>,
}

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) uv: vec2<f32>,
    @location(3) tangent: vec4<f32>,
}

@group(0) @binding(0) var<uniform> camera: CameraUniforms;
@group(1) @binding(0) var<uniform> object: ObjectUniforms;

@vertex
fn vs_main(input: VertexInput) -> @builtin(position) vec4<f32> {
    return camera.view_proj * object.model * vec4<f32>(input.position, 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return object.base_color;
}
"#;

/// Full-screen Sobel edge over the mask alpha, occluded by scene depth.
///
/// Pixels outside the silhouette keep the cleared mask depth (far), so any
/// scene surface behind the object, such as a floor or a wall, also discards
/// the exterior ring there. The outline only shows over empty background.
pub const EDGE_SHADER: &str = r#"
struct OutlineParams {
    color: vec4<f32>,
    // x: width, y: aspect (width / height), z: depth epsilon, w: inward bias
    params: vec4<f32>,
}

@group(0) @binding(0) var mask_texture: texture_2d<f32>;
@group(0) @binding(1) var mask_sampler: sampler;
@group(0) @binding(2) var mask_depth: texture_depth_2d;
@group(0) @binding(3) var scene_depth: texture_depth_2d;
@group(0) @binding(4) var<uniform> outline_params: OutlineParams;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VertexOutput {
    let uv = vec2<f32>(f32((index << 1u) & 2u), f32(index & 2u));
    var out: VertexOutput;
    out.position = vec4<f32>(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0, 1.0);
    out.uv = uv;
    return out;
}

fn occupancy(uv: vec2<f32>) -> f32 {
    return textureSampleLevel(mask_texture, mask_sampler, uv, 0.0).a;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = vec2<i32>(in.position.xy);
    let scene = textureLoad(scene_depth, texel, 0);
    let masked = textureLoad(mask_depth, texel, 0);
    if scene < masked - outline_params.params.z {
        discard;
    }

    let w = outline_params.params.x;
    let d = w * 0.70710678;
    let aspect = outline_params.params.y;

    let n = occupancy(in.uv + vec2<f32>(0.0, -w * aspect));
    let ne = occupancy(in.uv + vec2<f32>(d, -d * aspect));
    let e = occupancy(in.uv + vec2<f32>(w, 0.0));
    let se = occupancy(in.uv + vec2<f32>(d, d * aspect));
    let s = occupancy(in.uv + vec2<f32>(0.0, w * aspect));
    let sw = occupancy(in.uv + vec2<f32>(-d, d * aspect));
    let west = occupancy(in.uv + vec2<f32>(-w, 0.0));
    let nw = occupancy(in.uv + vec2<f32>(-d, -d * aspect));

    let gx = (ne - nw) + 2.0 * (e - west) + (se - sw);
    let gy = (sw - nw) + 2.0 * (s - n) + (se - ne);
    let edge = clamp(abs(gx) + abs(gy), 0.0, 1.0);

    let center = occupancy(in.uv);
    let alpha = edge * clamp(1.0 - center - outline_params.params.w, 0.0, 1.0);
    return vec4<f32>(outline_params.color.rgb, alpha);
}
"#;

/// WGSL programs used by the outline pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineShaders {
    pub mask: String,
    pub edge: String,
}

impl OutlineShaders {
    /// The shaders shipped with the crate
    pub fn builtin() -> Self {
        Self {
            mask: MASK_SHADER.to_string(),
            edge: EDGE_SHADER.to_string(),
        }
    }

    /// Parse and validate both programs and check their entry points
    pub fn validate(&self) -> Result<(), ShaderError> {
        validate_wgsl("outline mask", &self.mask)?;
        validate_wgsl("outline edge", &self.edge)?;
        Ok(())
    }
}

fn validate_wgsl(label: &'static str, source: &str) -> Result<naga::Module, ShaderError> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| ShaderError::Parse {
        label,
        message: e.to_string(),
    })?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::default(),
    );
    validator.validate(&module).map_err(|e| ShaderError::Validation {
        label,
        message: e.to_string(),
    })?;

    for (entry_point, stage, naga_stage) in [
        (VERTEX_ENTRY, ShaderStage::Vertex, naga::ShaderStage::Vertex),
        (FRAGMENT_ENTRY, ShaderStage::Fragment, naga::ShaderStage::Fragment),
    ] {
        let found = module
            .entry_points
            .iter()
            .any(|ep| ep.name == entry_point && ep.stage == naga_stage);
        if !found {
            return Err(ShaderError::MissingEntryPoint {
                label,
                entry_point,
                stage,
            });
        }
    }

    Ok(module)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_shaders_validate() {
        OutlineShaders::builtin().validate().unwrap();
    }

    #[test]
    fn edge_bindings_match_property_table() {
        let module = validate_wgsl("edge", EDGE_SHADER).unwrap();
        let mut seen = 0;
        for (_, var) in module.global_variables.iter() {
            let (Some(name), Some(binding)) = (&var.name, &var.binding) else {
                continue;
            };
            assert_eq!(binding.group, 0);
            assert_eq!(property_binding(name), Some(binding.binding), "{name}");
            seen += 1;
        }
        assert_eq!(seen, EDGE_PROPERTIES.len());
        assert_eq!(property_binding("unknown"), None);
    }

    #[test]
    fn broken_source_is_rejected() {
        let shaders = OutlineShaders {
            edge: "fn fs_main( {".to_string(),
            ..OutlineShaders::builtin()
        };
        assert!(matches!(
            shaders.validate(),
            Err(ShaderError::Parse { label: "outline edge", .. })
        ));
    }

    #[test]
    fn missing_fragment_entry_is_rejected() {
        let source = MASK_SHADER.replace("fn fs_main", "fn fs_other");
        let shaders = OutlineShaders {
            mask: source,
            ..OutlineShaders::builtin()
        };
        assert_eq!(
            shaders.validate(),
            Err(ShaderError::MissingEntryPoint {
                label: "outline mask",
                entry_point: FRAGMENT_ENTRY,
                stage: ShaderStage::Fragment,
            })
        );
    }
}
