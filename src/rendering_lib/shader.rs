// src/rendering_lib/shader.rs

use super::backend::ProgramSource;

/// Shared by every program: the per-draw uniform block and world-to-clip mapping.
pub const WGSL_PRELUDE: &str = r#"
struct DrawUniforms {
    // xy = world origin of the view, zw = world size of the view
    view: vec4<f32>,
    light_center: vec2<f32>,
    light_radius: f32,
    light_intensity: f32,
}

@group(0) @binding(0)
var<uniform> u: DrawUniforms;

fn to_clip(p: vec2<f32>) -> vec4<f32> {
    let ndc = (p - u.view.xy) / u.view.zw * 2.0 - vec2<f32>(1.0, 1.0);
    return vec4<f32>(ndc, 0.0, 1.0);
}

fn light_falloff(world: vec2<f32>) -> f32 {
    let d = distance(world, u.light_center) / max(u.light_radius, 0.0001);
    return clamp(1.0 - d, 0.0, 1.0) * u.light_intensity;
}
"#;

pub const TEXTURE_BINDINGS: &str = r#"
@group(1) @binding(0)
var t_asset: texture_2d<f32>;
@group(1) @binding(1)
var s_asset: sampler;
"#;

const PLAIN_VERTEX: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) world: vec2<f32>,
}

@vertex
fn vs_main(model: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = to_clip(model.position);
    out.color = model.color;
    out.world = model.position;
    return out;
}
"#;

const TEXTURED_VERTEX: &str = r#"
struct VertexInput {
    @location(0) position: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) uv: vec2<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
    @location(1) world: vec2<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(model: VertexInput) -> VertexOutput {
    var out: VertexOutput;
    out.clip_position = to_clip(model.position);
    out.color = model.color;
    out.world = model.position;
    out.uv = model.uv;
    return out;
}
"#;

const GEOMETRY_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

const TEXTURE_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return textureSample(t_asset, s_asset, in.uv) * in.color;
}
"#;

// Radial glow across the quad, uv (0.5, 0.5) is the light centre.
const LIGHT_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let d = length(in.uv - vec2<f32>(0.5, 0.5)) * 2.0;
    let a = clamp(1.0 - d, 0.0, 1.0) * u.light_intensity * in.color.a;
    return vec4<f32>(in.color.rgb * a, a);
}
"#;

const VISION_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let lit = light_falloff(in.world);
    return vec4<f32>(in.color.rgb * lit, in.color.a);
}
"#;

const VISION_TEXTURE_FRAGMENT: &str = r#"
@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let texel = textureSample(t_asset, s_asset, in.uv) * in.color;
    let lit = light_falloff(in.world);
    return vec4<f32>(texel.rgb * lit, texel.a);
}
"#;

pub const PLAIN_ATTRIBUTES: &[&str] = &["vertexPosition", "vertexColor"];
pub const TEXTURED_ATTRIBUTES: &[&str] = &["vertexPosition", "vertexColor", "vertexUV"];

pub const UNIFORM_VIEW: &str = "view";
pub const UNIFORM_ASSET: &str = "asset";
pub const UNIFORM_LIGHT_CENTER: &str = "lightCenter";
pub const UNIFORM_LIGHT_RADIUS: &str = "lightRadius";
pub const UNIFORM_LIGHT_INTENSITY: &str = "lightIntensity";

pub const GEOMETRY_PROGRAM: ProgramSource<'static> = ProgramSource {
    label: "geometry",
    vertex: PLAIN_VERTEX,
    fragment: GEOMETRY_FRAGMENT,
    uniforms: &[UNIFORM_VIEW],
    textured: false,
};

pub const TEXTURE_PROGRAM: ProgramSource<'static> = ProgramSource {
    label: "texture",
    vertex: TEXTURED_VERTEX,
    fragment: TEXTURE_FRAGMENT,
    uniforms: &[UNIFORM_VIEW, UNIFORM_ASSET],
    textured: true,
};

pub const LIGHT_PROGRAM: ProgramSource<'static> = ProgramSource {
    label: "light",
    vertex: TEXTURED_VERTEX,
    fragment: LIGHT_FRAGMENT,
    uniforms: &[UNIFORM_VIEW, UNIFORM_LIGHT_INTENSITY],
    textured: false,
};

pub const VISION_PROGRAM: ProgramSource<'static> = ProgramSource {
    label: "vision",
    vertex: PLAIN_VERTEX,
    fragment: VISION_FRAGMENT,
    uniforms: &[UNIFORM_VIEW, UNIFORM_LIGHT_CENTER, UNIFORM_LIGHT_RADIUS, UNIFORM_LIGHT_INTENSITY],
    textured: false,
};

pub const VISION_TEXTURE_PROGRAM: ProgramSource<'static> = ProgramSource {
    label: "vision_texture",
    vertex: TEXTURED_VERTEX,
    fragment: VISION_TEXTURE_FRAGMENT,
    uniforms: &[UNIFORM_VIEW, UNIFORM_ASSET, UNIFORM_LIGHT_CENTER, UNIFORM_LIGHT_RADIUS, UNIFORM_LIGHT_INTENSITY],
    textured: true,
};

/// Full WGSL module for a program: prelude, texture bindings when sampled, then both stages.
pub fn compose_wgsl(source: &ProgramSource<'_>) -> String {
    let mut wgsl = String::with_capacity(
        WGSL_PRELUDE.len() + TEXTURE_BINDINGS.len() + source.vertex.len() + source.fragment.len(),
    );
    wgsl.push_str(WGSL_PRELUDE);
    if source.textured {
        wgsl.push_str(TEXTURE_BINDINGS);
    }
    wgsl.push_str(source.vertex);
    wgsl.push_str(source.fragment);
    wgsl
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn textured_programs_get_sampler_bindings() {
        assert!(compose_wgsl(&TEXTURE_PROGRAM).contains("var t_asset"));
        assert!(compose_wgsl(&VISION_TEXTURE_PROGRAM).contains("var s_asset"));
        assert!(!compose_wgsl(&GEOMETRY_PROGRAM).contains("t_asset"));
    }

    #[test]
    fn every_program_has_both_stages() {
        for program in [GEOMETRY_PROGRAM, TEXTURE_PROGRAM, LIGHT_PROGRAM, VISION_PROGRAM, VISION_TEXTURE_PROGRAM] {
            let wgsl = compose_wgsl(&program);
            assert!(wgsl.contains("fn vs_main"), "{}", program.label);
            assert!(wgsl.contains("fn fs_main"), "{}", program.label);
            assert!(program.uniforms.contains(&UNIFORM_VIEW));
        }
    }
}
