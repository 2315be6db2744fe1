/*!
# acompute

Compute-kernel compiler and GPU dispatch cache for a small `#kernel` shader
dialect.

A shader source declares its kernels up front and the compiler turns each
one into an independently compiled compute shader module:

```text
#kernel Main
layout(set = 0, binding = 0, rgba16f) uniform image2D color;
numthreads(8, 8, 1)
void Main() { ... }
```

## Architecture

- **Kernel compiler** ([`compile_kernels`]): line-oriented extraction of
  kernel directives and `numthreads` annotations, per-kernel source
  transformation, backend compilation. All-or-nothing.
- **[`ShaderInstance`]**: one compute pipeline per kernel plus all
  per-dispatch state (descriptor sets, uniform buffers, push constants),
  with identity-based dirty tracking so steady-state per-frame uniform
  updates never rebuild descriptor sets.
- **[`ShaderRegistry`]**: explicitly owned compilation cache keyed by source
  identity, instance tracking, and the suspend/resume reload lifecycle.
- **[`device::RenderDevice`]**: the single backend capability everything
  depends on. Backends implement it; tests use a mock.

Single-threaded by design: every operation runs on the thread that owns the
GPU command-recording context.
*/

// Internal modules
mod error;
mod instance;
mod registry;
pub mod compiler;
pub mod device;
pub mod log;

// Error types
pub use error::{Error, Result};

// Compiler
pub use compiler::{compile_kernels, CompileError, CompiledKernel};

// Instance and registry
pub use instance::{ShaderInstance, UniformKey};
pub use registry::{InstanceKey, ShaderRegistry, SourceKey, SubscriptionKey};

// Backend boundary
pub use device::{
    BufferHandle, ComputeListId, DescriptorSetHandle, PipelineHandle, RenderDevice,
    SamplerFilter, SamplerHandle, SamplerState, ShaderHandle, SpirvBlob, TextureDesc,
    TextureFormat, TextureHandle, TextureUsage, Uniform, UniformType,
};

// Re-export math library for uniform/push-constant payload packing
pub use glam;
