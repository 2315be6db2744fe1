/// Unit tests for MockDevice
///
/// Verifies the mock honors the backend contract the core relies on,
/// including transitive descriptor-set release.

use crate::device::mock_device::MockDevice;
use crate::device::{
    BufferHandle, RenderDevice, SamplerFilter, SamplerState, ShaderHandle, SpirvBlob,
    TextureDesc, TextureFormat, TextureUsage, Uniform, UniformType,
};

fn test_texture_desc() -> TextureDesc {
    TextureDesc {
        width: 4,
        height: 4,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::SAMPLING,
    }
}

#[test]
fn test_shader_compile_and_create() {
    let mut device = MockDevice::new();
    let blob = device.shader_compile("void main() {}").unwrap();
    assert_eq!(blob.bytecode, b"void main() {}");

    let shader = device.shader_create(&blob);
    assert!(shader.is_valid());
    assert!(device.live_shaders.contains(&shader.raw()));
    assert_eq!(device.compiled_sources.len(), 1);
}

#[test]
fn test_shader_compile_failure_knob() {
    let mut device = MockDevice::new();
    device.fail_compile_containing = Some("BROKEN".to_string());

    let err = device.shader_compile("// BROKEN line").unwrap_err();
    assert!(err.contains("mock diagnostic"));

    // Sources without the token still compile
    assert!(device.shader_compile("void main() {}").is_ok());
}

#[test]
fn test_shader_create_failure_knob() {
    let mut device = MockDevice::new();
    device.fail_shader_create = true;
    let shader = device.shader_create(&SpirvBlob { bytecode: vec![1, 2, 3] });
    assert!(!shader.is_valid());
}

#[test]
fn test_shader_free_records_id() {
    let mut device = MockDevice::new();
    let blob = device.shader_compile("x").unwrap();
    let shader = device.shader_create(&blob);

    device.shader_free(shader);
    assert!(!device.live_shaders.contains(&shader.raw()));
    assert_eq!(device.freed_shaders, vec![shader.raw()]);

    // Double free is ignored
    device.shader_free(shader);
    assert_eq!(device.freed_shaders.len(), 1);
}

#[test]
fn test_pipeline_requires_live_shader() {
    let mut device = MockDevice::new();
    let pipeline = device.compute_pipeline_create(ShaderHandle::from_raw(999));
    assert!(!pipeline.is_valid());

    let blob = device.shader_compile("x").unwrap();
    let shader = device.shader_create(&blob);
    let pipeline = device.compute_pipeline_create(shader);
    assert!(pipeline.is_valid());
    assert!(device.compute_pipeline_is_valid(pipeline));

    device.compute_pipeline_free(pipeline);
    assert!(!device.compute_pipeline_is_valid(pipeline));
}

#[test]
fn test_buffer_create_and_update() {
    let mut device = MockDevice::new();
    let buffer = device.uniform_buffer_create(&[1, 2, 3, 4]);
    assert_eq!(device.live_buffers[&buffer.raw()], vec![1, 2, 3, 4]);

    device.buffer_update(buffer, 0, &[9, 9, 9, 9]).unwrap();
    assert_eq!(device.live_buffers[&buffer.raw()], vec![9, 9, 9, 9]);

    // Offset write past the end grows the buffer
    device.buffer_update(buffer, 2, &[7, 7, 7]).unwrap();
    assert_eq!(device.live_buffers[&buffer.raw()], vec![9, 9, 7, 7, 7]);
}

#[test]
fn test_buffer_update_unknown_buffer_fails() {
    let mut device = MockDevice::new();
    let result = device.buffer_update(BufferHandle::from_raw(42), 0, &[1]);
    assert!(result.is_err());
}

#[test]
fn test_transitive_descriptor_set_release() {
    let mut device = MockDevice::new();
    let blob = device.shader_compile("x").unwrap();
    let shader = device.shader_create(&blob);
    let buffer = device.uniform_buffer_create(&[0; 16]);

    let mut uniform = Uniform::new(UniformType::UniformBuffer, 0);
    uniform.add_id(buffer.raw());
    let set = device.uniform_set_create(&[uniform], shader, 0);
    assert!(device.uniform_set_is_valid(set));

    // Freeing the referenced buffer releases the set as well
    device.buffer_free(buffer);
    assert!(!device.uniform_set_is_valid(set));
}

#[test]
fn test_compute_list_recording() {
    let mut device = MockDevice::new();
    let list = device.compute_list_begin();
    device.compute_list_set_push_constant(list, &[0; 8]);
    device.compute_list_dispatch(list, 4, 2, 1);
    device.compute_list_end(list);

    assert_eq!(
        device.commands,
        vec![
            "compute_list_begin".to_string(),
            "set_push_constant len=8".to_string(),
            "dispatch 4x2x1".to_string(),
            "compute_list_end".to_string(),
        ]
    );
}

#[test]
fn test_live_object_count() {
    let mut device = MockDevice::new();
    assert_eq!(device.live_object_count(), 0);

    let blob = device.shader_compile("x").unwrap();
    let shader = device.shader_create(&blob);
    let buffer = device.uniform_buffer_create(&[0; 4]);
    let texture = device.texture_create(&test_texture_desc(), &[0; 64]);
    let sampler = device.sampler_create(&SamplerState {
        min_filter: SamplerFilter::Linear,
        mag_filter: SamplerFilter::Nearest,
    });
    assert_eq!(device.live_object_count(), 4);

    device.shader_free(shader);
    device.buffer_free(buffer);
    device.texture_free(texture);
    device.sampler_free(sampler);
    assert_eq!(device.live_object_count(), 0);
}
