/// Unit tests for ShaderRegistry
///
/// Covers compile-on-first-use caching, invalidation round trips,
/// retry-on-fix, change subscriptions, instance tracking, and the
/// suspend/resume reload lifecycle.

use std::cell::Cell;
use std::rc::Rc;

use crate::device::mock_device::MockDevice;
use crate::device::{TextureDesc, TextureFormat, TextureUsage, UniformType};
use crate::error::Error;
use crate::registry::{ShaderRegistry, SourceKey};

const VALID_SOURCE: &str = "\
#kernel Main
numthreads(8, 8, 1)
void Main() { }";

const BROKEN_SOURCE: &str = "\
#kernel Main
void Main() { }";

fn texture_desc() -> TextureDesc {
    TextureDesc {
        width: 4,
        height: 4,
        format: TextureFormat::R8G8B8A8_UNORM,
        usage: TextureUsage::STORAGE,
    }
}

// ============================================================================
// Compilation caching
// ============================================================================

#[test]
fn test_get_or_compile_compiles_once() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);

    let first: Vec<u64> = registry
        .get_or_compile(&mut device, key)
        .unwrap()
        .iter()
        .map(|k| k.shader.raw())
        .collect();
    let second: Vec<u64> = registry
        .get_or_compile(&mut device, key)
        .unwrap()
        .iter()
        .map(|k| k.shader.raw())
        .collect();

    // Cache hit: same handles, one backend compilation
    assert_eq!(first, second);
    assert_eq!(device.compiled_sources.len(), 1);
}

#[test]
fn test_add_source_does_not_compile_eagerly() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let _key = registry.add_source(VALID_SOURCE);
    assert!(device.compiled_sources.is_empty());
}

#[test]
fn test_unknown_key_is_invalid_resource() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let err = registry.get_or_compile(&mut device, SourceKey::default()).unwrap_err();
    assert!(matches!(err, Error::InvalidResource(_)));
}

#[test]
fn test_failed_compilation_is_not_cached() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(BROKEN_SOURCE);

    assert!(registry.get_or_compile(&mut device, key).is_err());
    assert!(registry.get_or_compile(&mut device, key).is_err());

    // Retry on fix: correcting the source is enough to recover
    registry.set_source(&mut device, key, VALID_SOURCE).unwrap();
    let kernels = registry.get_or_compile(&mut device, key).unwrap();
    assert_eq!(kernels.len(), 1);
}

#[test]
fn test_invalidate_round_trip_same_structure_fresh_handles() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);

    let before: Vec<(u64, [u32; 3])> = registry
        .get_or_compile(&mut device, key)
        .unwrap()
        .iter()
        .map(|k| (k.shader.raw(), k.thread_group))
        .collect();

    let after: Vec<(u64, [u32; 3])> = registry
        .invalidate(&mut device, key)
        .unwrap()
        .iter()
        .map(|k| (k.shader.raw(), k.thread_group))
        .collect();

    // Structurally equivalent, distinct backend handles
    assert_eq!(before.len(), after.len());
    assert_eq!(before[0].1, after[0].1);
    assert_ne!(before[0].0, after[0].0);

    // The old handle was freed exactly once
    assert_eq!(device.freed_shaders, vec![before[0].0]);
}

// ============================================================================
// Source changes and subscriptions
// ============================================================================

#[test]
fn test_set_source_frees_cached_kernels() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    registry.get_or_compile(&mut device, key).unwrap();
    assert_eq!(device.live_shaders.len(), 1);

    registry.set_source(&mut device, key, VALID_SOURCE).unwrap();
    assert!(device.live_shaders.is_empty());
    assert_eq!(registry.source(key), Some(VALID_SOURCE));
}

#[test]
fn test_subscription_fires_synchronously_on_change() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    let other = registry.add_source(VALID_SOURCE);

    let fired = Rc::new(Cell::new(0u32));
    let fired_in_callback = fired.clone();
    let sub = registry.subscribe(
        key,
        Box::new(move |changed| {
            assert_eq!(changed, key);
            fired_in_callback.set(fired_in_callback.get() + 1);
        }),
    );

    registry.set_source(&mut device, key, BROKEN_SOURCE).unwrap();
    assert_eq!(fired.get(), 1);

    // Changes to other sources do not fire this subscription
    registry.set_source(&mut device, other, BROKEN_SOURCE).unwrap();
    assert_eq!(fired.get(), 1);

    // Unsubscribed callbacks stop firing
    assert!(registry.unsubscribe(sub));
    registry.set_source(&mut device, key, VALID_SOURCE).unwrap();
    assert_eq!(fired.get(), 1);
    assert!(!registry.unsubscribe(sub));
}

#[test]
fn test_remove_source_frees_kernels_and_instances() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    let instance_key = registry.create_instance(&mut device, key).unwrap();

    registry.remove_source(&mut device, key);
    assert!(registry.instance(instance_key).is_none());
    assert!(registry.source(key).is_none());
    assert_eq!(device.live_object_count(), 0);
}

// ============================================================================
// Instance tracking
// ============================================================================

#[test]
fn test_create_instance_compiles_and_dispatches() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    let instance_key = registry.create_instance(&mut device, key).unwrap();

    let desc = texture_desc();
    let instance = registry.instance_mut(instance_key).unwrap();
    let texture = instance.create_texture(&mut device, &desc, &[]);
    instance.set_texture(0, 0, texture, UniformType::Image, None);
    instance.dispatch(&mut device, 0, 2, 2, 1);

    assert!(device.commands.iter().any(|c| c == "dispatch 2x2x1"));
}

#[test]
fn test_two_instances_share_compiled_kernels() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);

    let a = registry.create_instance(&mut device, key).unwrap();
    let b = registry.create_instance(&mut device, key).unwrap();
    assert_ne!(a, b);

    // One shader module, two pipelines
    assert_eq!(device.live_shaders.len(), 1);
    assert_eq!(device.live_pipelines.len(), 2);
}

#[test]
fn test_free_instance_releases_backend_state() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    let instance_key = registry.create_instance(&mut device, key).unwrap();

    assert!(registry.free_instance(&mut device, instance_key));
    assert!(!registry.free_instance(&mut device, instance_key));
    assert!(device.live_pipelines.is_empty());
    // The kernel cache survives instance teardown
    assert_eq!(device.live_shaders.len(), 1);
}

// ============================================================================
// Reload lifecycle
// ============================================================================

#[test]
fn test_suspend_frees_every_backend_handle() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    let instance_key = registry.create_instance(&mut device, key).unwrap();

    let desc = texture_desc();
    let instance = registry.instance_mut(instance_key).unwrap();
    let texture = instance.create_texture(&mut device, &desc, &[]);
    instance.set_texture(0, 0, texture, UniformType::Image, None);
    instance.dispatch(&mut device, 0, 1, 1, 1);

    registry.suspend(&mut device);
    assert_eq!(device.live_object_count(), 0);
}

#[test]
fn test_resume_replays_compilation_and_restores_instances() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    let instance_key = registry.create_instance(&mut device, key).unwrap();

    registry.suspend(&mut device);
    registry.resume(&mut device);

    assert_eq!(device.live_shaders.len(), 1);
    assert_eq!(device.live_pipelines.len(), 1);

    // The resumed instance dispatches again after re-binding
    let desc = texture_desc();
    let instance = registry.instance_mut(instance_key).unwrap();
    let texture = instance.create_texture(&mut device, &desc, &[]);
    instance.set_texture(0, 0, texture, UniformType::Image, None);
    device.commands.clear();
    instance.dispatch(&mut device, 0, 1, 1, 1);
    assert!(device.commands.iter().any(|c| c.starts_with("dispatch")));
}

#[test]
fn test_resume_drops_instances_of_sources_that_no_longer_compile() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key = registry.add_source(VALID_SOURCE);
    let instance_key = registry.create_instance(&mut device, key).unwrap();

    registry.suspend(&mut device);
    // The source breaks across the reload boundary
    registry.set_source(&mut device, key, BROKEN_SOURCE).unwrap();
    registry.resume(&mut device);

    assert!(registry.instance(instance_key).is_none());
    assert_eq!(device.live_object_count(), 0);
    // The source itself stays registered and retries on next use
    assert!(registry.get_or_compile(&mut device, key).is_err());
}

#[test]
fn test_uncompiled_sources_are_not_replayed_on_resume() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    registry.add_source(VALID_SOURCE);

    registry.suspend(&mut device);
    registry.resume(&mut device);
    assert!(device.compiled_sources.is_empty());
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn test_teardown_all_leaves_no_live_objects() {
    let mut device = MockDevice::new();
    let mut registry = ShaderRegistry::new();
    let key_a = registry.add_source(VALID_SOURCE);
    let key_b = registry.add_source(VALID_SOURCE);
    let instance_key = registry.create_instance(&mut device, key_a).unwrap();
    registry.get_or_compile(&mut device, key_b).unwrap();

    let desc = texture_desc();
    let instance = registry.instance_mut(instance_key).unwrap();
    let texture = instance.create_texture(&mut device, &desc, &[]);
    instance.set_texture(0, 0, texture, UniformType::Image, None);
    instance.set_uniform_buffer(&mut device, 0, 1, &[0; 16]).unwrap();
    instance.dispatch(&mut device, 0, 1, 1, 1);

    registry.teardown_all(&mut device);
    assert_eq!(device.live_object_count(), 0);
    assert!(registry.instance(instance_key).is_none());
    assert!(registry.source(key_a).is_none());
}
