/// Shared GPU types used across the backend boundary
///
/// Descriptors and enums passed to `RenderDevice` methods. Payload contents
/// (uniform buffers, push constants) are raw little-endian byte arrays; the
/// caller packs structured values before handing them over.

use bitflags::bitflags;

// ===== TEXTURES =====

/// Texture pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_SRGB,
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    R16G16B16A16_SFLOAT,
    R32G32B32A32_SFLOAT,
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        /// Texture can be sampled in shaders
        const SAMPLING = 1 << 0;
        /// Texture can be written as a storage image
        const STORAGE = 1 << 1;
        /// Texture can be updated from the CPU
        const CAN_UPDATE = 1 << 2;
        /// Texture can be copied from
        const CAN_COPY_FROM = 1 << 3;
    }
}

/// Descriptor for creating a texture
#[derive(Debug, Clone)]
pub struct TextureDesc {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel format
    pub format: TextureFormat,
    /// Usage flags
    pub usage: TextureUsage,
}

// ===== SAMPLERS =====

/// Sampler filtering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerFilter {
    /// Nearest-neighbor filtering
    Nearest,
    /// Linear filtering
    Linear,
}

/// Descriptor for creating a sampler
#[derive(Debug, Clone, Copy)]
pub struct SamplerState {
    /// Minification filter
    pub min_filter: SamplerFilter,
    /// Magnification filter
    pub mag_filter: SamplerFilter,
}

// ===== UNIFORMS =====

/// Kind of resource bound at a uniform slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    /// Storage image (read/write in compute shaders)
    Image,
    /// Sampled texture without an explicit sampler
    Texture,
    /// Sampler + texture pair bound together
    SamplerWithTexture,
    /// Uniform buffer
    UniformBuffer,
}

/// One resource binding slot, as passed to `uniform_set_create`
///
/// Stores the ordered raw-id list of the resources at this slot. For a
/// sampler + texture pair the sampler id comes first. The ordered list is
/// what the dirty-tracking in `ShaderInstance` compares: same ids in the
/// same order means the descriptor set can be reused as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uniform {
    /// Kind of resource at this slot
    pub uniform_type: UniformType,
    /// Binding index within the set
    pub binding: u32,
    ids: Vec<u64>,
}

impl Uniform {
    /// Create an empty uniform for a binding slot
    pub fn new(uniform_type: UniformType, binding: u32) -> Self {
        Self {
            uniform_type,
            binding,
            ids: Vec::new(),
        }
    }

    /// Append a raw resource id to the slot's ordered id list
    pub fn add_id(&mut self, raw: u64) {
        self.ids.push(raw);
    }

    /// Ordered raw resource ids bound at this slot
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }
}

/// Backend-compiled shader bytecode, ready for `shader_create`
#[derive(Debug, Clone)]
pub struct SpirvBlob {
    /// Raw SPIR-V words as bytes
    pub bytecode: Vec<u8>,
}
