//! WGSL sources for fullscreen quad programs
//!
//! Every quad program is the shared vertex stage, the shared bindings and a
//! fragment stage, concatenated by [`quad_program_source`].

/// Common fullscreen triangle vertex stage
pub const FULLSCREEN_VERTEX_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var output: VertexOutput;

    // Generate fullscreen triangle
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);

    output.position = vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, 0.0, 1.0);
    output.uv = vec2<f32>(x, 1.0 - y);

    return output;
}
"#;

/// Bindings matching `QuadUniforms` and the backend's quad bind group layout
pub const QUAD_BINDINGS: &str = r#"
struct QuadUniforms {
    // x = mip level, y = array layer
    source: vec4<f32>,
    params: vec4<f32>,
}

@group(0) @binding(0) var source_texture: texture_2d_array<f32>;
@group(0) @binding(1) var source_sampler: sampler;
@group(0) @binding(2) var<uniform> quad_uniforms: QuadUniforms;

fn sample_source(uv: vec2<f32>) -> vec4<f32> {
    let level = quad_uniforms.source.x;
    let layer = i32(quad_uniforms.source.y);
    return textureSampleLevel(source_texture, source_sampler, uv, layer, level);
}
"#;

/// Pass-through copy, resampling to the target size
pub const COPY_FRAGMENT: &str = r#"
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return sample_source(input.uv);
}
"#;

/// GGX prefilter of an equirectangular map.
///
/// `params.x` is the roughness, `params.y` the number of samples.
pub const PREFILTER_FRAGMENT: &str = r#"
const PI: f32 = 3.14159265359;

fn direction_from_uv(uv: vec2<f32>) -> vec3<f32> {
    let phi = (uv.x - 0.5) * 2.0 * PI;
    let theta = uv.y * PI;
    return vec3<f32>(sin(theta) * sin(phi), cos(theta), -sin(theta) * cos(phi));
}

fn uv_from_direction(dir: vec3<f32>) -> vec2<f32> {
    let phi = atan2(dir.x, -dir.z);
    let theta = acos(clamp(dir.y, -1.0, 1.0));
    return vec2<f32>(phi / (2.0 * PI) + 0.5, theta / PI);
}

fn hammersley(i: u32, count: u32) -> vec2<f32> {
    let radical_inverse = f32(reverseBits(i)) * 2.3283064365386963e-10;
    return vec2<f32>(f32(i) / f32(count), radical_inverse);
}

fn importance_sample_ggx(xi: vec2<f32>, n: vec3<f32>, roughness: f32) -> vec3<f32> {
    let a = roughness * roughness;
    let phi = 2.0 * PI * xi.x;
    let cos_theta = sqrt((1.0 - xi.y) / (1.0 + (a * a - 1.0) * xi.y));
    let sin_theta = sqrt(1.0 - cos_theta * cos_theta);
    let h = vec3<f32>(cos(phi) * sin_theta, sin(phi) * sin_theta, cos_theta);

    var up = vec3<f32>(0.0, 0.0, 1.0);
    if abs(n.z) > 0.999 {
        up = vec3<f32>(1.0, 0.0, 0.0);
    }
    let tangent = normalize(cross(up, n));
    let bitangent = cross(n, tangent);
    return normalize(tangent * h.x + bitangent * h.y + n * h.z);
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let n = direction_from_uv(input.uv);
    let roughness = quad_uniforms.params.x;
    let sample_count = max(u32(quad_uniforms.params.y), 1u);

    var colour = vec3<f32>(0.0);
    var weight = 0.0;
    for (var i = 0u; i < sample_count; i = i + 1u) {
        let h = importance_sample_ggx(hammersley(i, sample_count), n, roughness);
        let l = normalize(2.0 * dot(n, h) * h - n);
        let n_dot_l = dot(n, l);
        if n_dot_l > 0.0 {
            colour += sample_source(uv_from_direction(l)).rgb * n_dot_l;
            weight += n_dot_l;
        }
    }

    return vec4<f32>(colour / max(weight, 0.0001), 1.0);
}
"#;

/// Full program source for a fragment stage
pub fn quad_program_source(fragment: &str) -> String {
    format!("{}{}{}", FULLSCREEN_VERTEX_SHADER, QUAD_BINDINGS, fragment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn validate(source: &str) {
        let module = naga::front::wgsl::parse_str(source).unwrap();
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .unwrap();
    }

    #[rstest]
    #[case::copy(COPY_FRAGMENT)]
    #[case::prefilter(PREFILTER_FRAGMENT)]
    fn test_program_validates(#[case] fragment: &str) {
        let source = quad_program_source(fragment);
        validate(&source);
        assert!(source.contains("fn vs_main"));
        assert!(source.contains("fn fs_main"));
    }
}
