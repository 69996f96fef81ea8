// Copyright 2026 the Actfield Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! WGSL for the id and visible passes.

/// Both passes share the vertex stage. `fs_id` writes the quad's id colour;
/// `fs_visible` samples the channel and multiplies by the tint.
pub(crate) const FIELD_WGSL: &str = r#"
struct Camera {
    view_proj: mat4x4<f32>,
};

@group(0) @binding(0) var<uniform> camera: Camera;
@group(1) @binding(0) var channel_tex: texture_2d<f32>;
@group(1) @binding(1) var channel_sampler: sampler;

struct Instance {
    @location(1) model_0: vec4<f32>,
    @location(2) model_1: vec4<f32>,
    @location(3) model_2: vec4<f32>,
    @location(4) model_3: vec4<f32>,
    @location(5) id_color: vec4<f32>,
    @location(6) tint: vec4<f32>,
};

struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) id_color: vec3<f32>,
    @location(2) tint: vec3<f32>,
};

@vertex
fn vs_main(@location(0) corner: vec2<f32>, inst: Instance) -> VsOut {
    let model = mat4x4<f32>(inst.model_0, inst.model_1, inst.model_2, inst.model_3);
    var out: VsOut;
    out.position = camera.view_proj * model * vec4<f32>(corner, 0.0, 1.0);
    out.uv = vec2<f32>(corner.x * 0.5 + 0.5, 0.5 - corner.y * 0.5);
    out.id_color = inst.id_color.rgb;
    out.tint = inst.tint.rgb;
    return out;
}

@fragment
fn fs_id(v: VsOut) -> @location(0) vec4<f32> {
    return vec4<f32>(v.id_color, 1.0);
}

@fragment
fn fs_visible(v: VsOut) -> @location(0) vec4<f32> {
    let value = textureSample(channel_tex, channel_sampler, v.uv).r;
    return vec4<f32>(vec3<f32>(value) * v.tint, 1.0);
}
"#;
