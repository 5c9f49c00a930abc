//! Handle usage inference and texture/sampler type reconstruction.

mod common;

use common::*;
use spv2wgsl::parse::Parser;
use spv2wgsl::parse_module;
use spv2wgsl::spv::spec::Op;

const F32T: u32 = 30;
const VEC2F: u32 = 31;
const VEC4F: u32 = 32;
const IMG: u32 = 33;
const SAMP: u32 = 34;
const PTR_IMG: u32 = 35;
const PTR_SAMP: u32 = 36;
const SAMPLED_IMG_T: u32 = 37;
const VAR_IMG: u32 = 38;
const VAR_SAMP: u32 = 39;
const F32_1: u32 = 41;
const COORD2F: u32 = 40;
const PTR_PRIV_VEC4: u32 = 43;
const VAR_OUT: u32 = 42;
const UVEC2: u32 = 60;
const UINT_1C: u32 = 63;
const COORD2U: u32 = 61;
const TEXEL4F: u32 = 62;

/// Image type operands: [sampled type, dim, depth, arrayed, ms, sampled,
/// format].
fn image_type(depth: u32, sampled: u32, format: u32) -> Vec<u32> {
    inst(Op::TypeImage, &[IMG, F32T, 1 /* 2D */, depth, 0, 0, sampled, format])
}

fn handle_preamble(image: Vec<u32>) -> Vec<Vec<u32>> {
    let mut instructions = common_types();
    instructions.extend([
        inst(Op::TypeFloat, &[F32T, 32]),
        inst(Op::TypeVector, &[VEC2F, F32T, 2]),
        inst(Op::TypeVector, &[VEC4F, F32T, 4]),
        image,
        inst(Op::TypeSampler, &[SAMP]),
        inst(Op::TypePointer, &[PTR_IMG, 0, IMG]),
        inst(Op::TypePointer, &[PTR_SAMP, 0, SAMP]),
        inst(Op::TypeSampledImage, &[SAMPLED_IMG_T, IMG]),
        inst(Op::Variable, &[PTR_IMG, VAR_IMG, 0]),
        inst(Op::Variable, &[PTR_SAMP, VAR_SAMP, 0]),
        inst(Op::Constant, &[F32T, F32_1, 0x3F80_0000]),
        inst(Op::ConstantComposite, &[VEC2F, COORD2F, F32_1, F32_1]),
        inst(Op::TypePointer, &[PTR_PRIV_VEC4, 6, VEC4F]),
        inst(Op::Variable, &[PTR_PRIV_VEC4, VAR_OUT, 6]),
        inst(Op::TypeVector, &[UVEC2, UINT, 2]),
        inst(Op::Constant, &[UINT, UINT_1C, 1]),
        inst(Op::ConstantComposite, &[UVEC2, COORD2U, UINT_1C, UINT_1C]),
        inst(Op::ConstantComposite, &[VEC4F, TEXEL4F, F32_1, F32_1, F32_1, F32_1]),
    ]);
    instructions
}

fn with_function(mut instructions: Vec<Vec<u32>>, body: &[Vec<u32>]) -> Vec<u32> {
    instructions.push(inst(Op::Function, &[VOID, FN, 0, VOIDFN]));
    instructions.extend(body.iter().cloned());
    instructions.push(inst(Op::FunctionEnd, &[]));
    assemble(&instructions)
}

fn sample_body() -> Vec<Vec<u32>> {
    vec![
        inst(Op::Label, &[10]),
        inst(Op::Load, &[IMG, 50, VAR_IMG]),
        inst(Op::Load, &[SAMP, 51, VAR_SAMP]),
        inst(Op::SampledImage, &[SAMPLED_IMG_T, 52, 50, 51]),
        inst(Op::ImageSampleImplicitLod, &[VEC4F, 53, 52, COORD2F]),
        inst(Op::Store, &[VAR_OUT, 53]),
        inst(Op::Return, &[]),
    ]
}

#[test]
fn sampled_texture_and_sampler_types_are_inferred() {
    let words = with_function(handle_preamble(image_type(0, 1, 0)), &sample_body());
    let module = parse_module(&words).expect("parses");
    let dump = module.to_wgsl_string();
    assert!(dump.contains("var<uniform_constant> x_38 : texture_2d<f32>;"), "{dump}");
    assert!(dump.contains("var<uniform_constant> x_39 : sampler;"), "{dump}");
    assert!(dump.contains("textureSample(x_38, x_39, vec2<f32>(1.0, 1.0))"), "{dump}");
}

#[test]
fn depth_texture_sampling_widens_to_vec4() {
    // The image type says depth=1; a plain sample still yields a 4-vector
    // in SPIR-V, so the scalar WGSL result is widened to (d, 0, 0, 0).
    let words = with_function(handle_preamble(image_type(1, 1, 0)), &sample_body());
    let module = parse_module(&words).expect("parses");
    let dump = module.to_wgsl_string();
    assert!(dump.contains(": texture_depth_2d;"), "{dump}");
    assert!(
        dump.contains("vec4<f32>(textureSample(x_38, x_39, vec2<f32>(1.0, 1.0)), 0.0, 0.0, 0.0)"),
        "{dump}"
    );
}

#[test]
fn depth_reference_usage_forces_depth_and_comparison_types() {
    // The image type does NOT say depth; the Dref usage alone forces a
    // depth texture and a comparison sampler.
    let body = vec![
        inst(Op::Label, &[10]),
        inst(Op::Load, &[IMG, 50, VAR_IMG]),
        inst(Op::Load, &[SAMP, 51, VAR_SAMP]),
        inst(Op::SampledImage, &[SAMPLED_IMG_T, 52, 50, 51]),
        inst(Op::ImageSampleDrefImplicitLod, &[F32T, 53, 52, COORD2F, F32_1]),
        inst(Op::Return, &[]),
    ];
    let words = with_function(handle_preamble(image_type(0, 1, 0)), &body);
    let module = parse_module(&words).expect("parses");
    let dump = module.to_wgsl_string();
    assert!(dump.contains(": texture_depth_2d;"), "{dump}");
    assert!(dump.contains(": sampler_comparison;"), "{dump}");
    // Dref results are scalar; no widening.
    assert!(
        dump.contains("textureSampleCompare(x_38, x_39, vec2<f32>(1.0, 1.0), 1.0)"),
        "{dump}"
    );
}

#[test]
fn storage_write_narrows_the_texel_by_swizzle() {
    // r32float has one channel; the vec4 texel narrows to .x.
    let mut instructions = handle_preamble(image_type(0, 2, 3 /* R32f */));
    instructions.push(inst(Op::Decorate, &[VAR_IMG, 25 /* NonReadable */]));
    let body = vec![
        inst(Op::Label, &[10]),
        inst(Op::Load, &[IMG, 50, VAR_IMG]),
        inst(Op::ImageWrite, &[50, COORD2U, TEXEL4F]),
        inst(Op::Return, &[]),
    ];
    let module = parse_module(&with_function(instructions, &body)).expect("parses");
    let dump = module.to_wgsl_string();
    assert!(dump.contains(": texture_storage_2d<r32float, write>;"), "{dump}");
    assert!(
        dump.contains(
            "textureStore(x_38, vec2<u32>(1u, 1u), vec4<f32>(1.0, 1.0, 1.0, 1.0).x);"
        ),
        "{dump}"
    );
}

#[test]
fn storage_write_with_too_few_components_fails() {
    // rg32float needs two channels; a scalar texel cannot supply them.
    let mut instructions = handle_preamble(image_type(0, 2, 6 /* Rg32f */));
    instructions.push(inst(Op::Decorate, &[VAR_IMG, 25]));
    let body = vec![
        inst(Op::Label, &[10]),
        inst(Op::Load, &[IMG, 50, VAR_IMG]),
        inst(Op::ImageWrite, &[50, COORD2U, F32_1]),
        inst(Op::Return, &[]),
    ];
    let error = parse_module(&with_function(instructions, &body)).unwrap_err();
    assert_eq!(
        error.message(),
        "texel has too few components for storage texture: 1 provided but 2 required"
    );
}

#[test]
fn contradictory_usage_fails() {
    // Sampled and storage-written: no single WGSL type covers both.
    let body = vec![
        inst(Op::Label, &[10]),
        inst(Op::Load, &[IMG, 50, VAR_IMG]),
        inst(Op::Load, &[SAMP, 51, VAR_SAMP]),
        inst(Op::SampledImage, &[SAMPLED_IMG_T, 52, 50, 51]),
        inst(Op::ImageSampleImplicitLod, &[VEC4F, 53, 52, COORD2F]),
        inst(Op::ImageWrite, &[50, COORD2U, TEXEL4F]),
        inst(Op::Return, &[]),
    ];
    let words = with_function(handle_preamble(image_type(0, 1, 0)), &body);
    let error = parse_module(&words).unwrap_err();
    assert!(
        error.message().contains("invalid sampler or texture usage"),
        "{error}"
    );
}

#[test]
fn const_offset_is_rejected_for_fetch() {
    let body = vec![
        inst(Op::Label, &[10]),
        inst(Op::Load, &[IMG, 50, VAR_IMG]),
        // Mask 0x8 = ConstOffset, with the offset constant following.
        inst(Op::ImageFetch, &[VEC4F, 53, 50, COORD2U, 0x8, COORD2U]),
        inst(Op::Store, &[VAR_OUT, 53]),
        inst(Op::Return, &[]),
    ];
    let words = with_function(handle_preamble(image_type(0, 1, 0)), &body);
    let error = parse_module(&words).unwrap_err();
    assert_eq!(error.message(), "ConstOffset is only permitted for sampling operations");
}

#[test]
fn combined_image_sampler_variables_are_rejected() {
    let mut instructions = handle_preamble(image_type(0, 1, 0));
    instructions.extend([
        inst(Op::TypePointer, &[70, 0, SAMPLED_IMG_T]),
        inst(Op::Variable, &[70, 71, 0]),
    ]);
    let error = parse_module(&with_function(instructions, &[
        inst(Op::Label, &[10]),
        inst(Op::Return, &[]),
    ]))
    .unwrap_err();
    assert!(
        error.message().contains("WGSL does not support combined image-samplers"),
        "{error}"
    );
}

#[test]
fn usage_converges_across_access_paths() {
    // Var A is sampled directly; var B through an OpCopyObject detour. The
    // accumulated usage records must be identical.
    const VAR_IMG2: u32 = 80;
    const VAR_SAMP2: u32 = 81;
    let mut instructions = handle_preamble(image_type(0, 1, 0));
    instructions.extend([
        inst(Op::Variable, &[PTR_IMG, VAR_IMG2, 0]),
        inst(Op::Variable, &[PTR_SAMP, VAR_SAMP2, 0]),
    ]);
    let body = vec![
        inst(Op::Label, &[10]),
        inst(Op::Load, &[IMG, 50, VAR_IMG]),
        inst(Op::Load, &[SAMP, 51, VAR_SAMP]),
        inst(Op::SampledImage, &[SAMPLED_IMG_T, 52, 50, 51]),
        inst(Op::ImageSampleImplicitLod, &[VEC4F, 53, 52, COORD2F]),
        inst(Op::Load, &[IMG, 54, VAR_IMG2]),
        inst(Op::CopyObject, &[IMG, 55, 54]),
        inst(Op::Load, &[SAMP, 56, VAR_SAMP2]),
        inst(Op::SampledImage, &[SAMPLED_IMG_T, 57, 55, 56]),
        inst(Op::ImageSampleImplicitLod, &[VEC4F, 58, 57, COORD2F]),
        inst(Op::Return, &[]),
    ];
    let words = with_function(instructions, &body);

    let mut parser = Parser::new(&words);
    parser.build_internal_module().unwrap();
    parser.parse_internal_module_except_functions().unwrap();
    let direct = parser.get_handle_usage(VAR_IMG);
    let indirect = parser.get_handle_usage(VAR_IMG2);
    assert_eq!(direct, indirect);
    assert!(direct.is_complete());
    assert!(direct.is_sampled_texture());
    assert_eq!(parser.get_handle_usage(VAR_SAMP), parser.get_handle_usage(VAR_SAMP2));
}
