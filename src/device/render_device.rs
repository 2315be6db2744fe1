/// RenderDevice trait - the single backend capability the core depends on
///
/// Backend implementations (Vulkan, a mock for tests, etc.) expose compute
/// shader compilation, GPU resource creation, and compute command list
/// recording through this trait. All methods are synchronous CPU-side work;
/// recorded command lists execute asynchronously on the device and ordering
/// between submitted lists is the backend's responsibility.
///
/// The model is single-threaded: every call happens on the thread that owns
/// the command-recording context, so methods take `&mut self` and no internal
/// locking exists.

use crate::error::Result;
use crate::device::{
    BufferHandle, ComputeListId, DescriptorSetHandle, PipelineHandle, SamplerHandle,
    SamplerState, ShaderHandle, SpirvBlob, TextureDesc, TextureHandle, Uniform,
};

/// Backend device trait
///
/// Handle ownership: the caller owns every handle a `create` method returns
/// and must release it exactly once through the matching `free` method.
/// Exception: descriptor sets are also released transitively by the backend
/// when any resource they reference is freed; callers rely on this at
/// teardown instead of freeing sets explicitly.
pub trait RenderDevice {
    // ===== SHADERS =====

    /// Compile GLSL compute source to SPIR-V
    ///
    /// # Returns
    ///
    /// The compiled blob, or the backend's diagnostic text on failure
    /// (a non-empty diagnostic is always a hard failure).
    fn shader_compile(&mut self, source: &str) -> std::result::Result<SpirvBlob, String>;

    /// Create a shader module from compiled bytecode
    ///
    /// Returns `ShaderHandle::INVALID` if the backend rejects the blob.
    fn shader_create(&mut self, spirv: &SpirvBlob) -> ShaderHandle;

    /// Free a shader module
    fn shader_free(&mut self, shader: ShaderHandle);

    // ===== PIPELINES =====

    /// Create a compute pipeline for a shader module
    ///
    /// Returns `PipelineHandle::INVALID` if the shader handle is invalid.
    fn compute_pipeline_create(&mut self, shader: ShaderHandle) -> PipelineHandle;

    /// True if the pipeline handle refers to a live backend pipeline
    fn compute_pipeline_is_valid(&self, pipeline: PipelineHandle) -> bool;

    /// Free a compute pipeline
    fn compute_pipeline_free(&mut self, pipeline: PipelineHandle);

    // ===== BUFFERS =====

    /// Create a uniform buffer sized and filled with `data`
    fn uniform_buffer_create(&mut self, data: &[u8]) -> BufferHandle;

    /// Overwrite buffer contents in place (same handle, no reallocation)
    ///
    /// # Arguments
    ///
    /// * `buffer` - Buffer to update
    /// * `offset` - Offset into the buffer in bytes
    /// * `data` - Bytes to write
    fn buffer_update(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Free a buffer
    fn buffer_free(&mut self, buffer: BufferHandle);

    // ===== TEXTURES =====

    /// Create a texture and upload `data` as its initial contents
    fn texture_create(&mut self, desc: &TextureDesc, data: &[u8]) -> TextureHandle;

    /// True if the texture handle refers to a live backend texture
    fn texture_is_valid(&self, texture: TextureHandle) -> bool;

    /// Free a texture
    fn texture_free(&mut self, texture: TextureHandle);

    // ===== SAMPLERS =====

    /// Create a texture sampler
    fn sampler_create(&mut self, state: &SamplerState) -> SamplerHandle;

    /// Free a sampler
    fn sampler_free(&mut self, sampler: SamplerHandle);

    // ===== DESCRIPTOR SETS =====

    /// Create a descriptor set from the bindings sharing one set index
    ///
    /// # Arguments
    ///
    /// * `uniforms` - Bindings for this set, ordered by binding index
    /// * `shader` - Shader whose reflection provides the set layout
    /// * `set_index` - Set index the bindings share
    fn uniform_set_create(
        &mut self,
        uniforms: &[Uniform],
        shader: ShaderHandle,
        set_index: u32,
    ) -> DescriptorSetHandle;

    /// True if the descriptor set handle refers to a live backend set
    fn uniform_set_is_valid(&self, set: DescriptorSetHandle) -> bool;

    /// Free a descriptor set
    fn uniform_set_free(&mut self, set: DescriptorSetHandle);

    // ===== COMPUTE LISTS =====

    /// Begin recording a compute command list
    fn compute_list_begin(&mut self) -> ComputeListId;

    /// Bind a compute pipeline
    fn compute_list_bind_pipeline(&mut self, list: ComputeListId, pipeline: PipelineHandle);

    /// Bind a descriptor set at a set index
    fn compute_list_bind_uniform_set(
        &mut self,
        list: ComputeListId,
        set: DescriptorSetHandle,
        set_index: u32,
    );

    /// Set the push-constant bytes for the next dispatch
    fn compute_list_set_push_constant(&mut self, list: ComputeListId, data: &[u8]);

    /// Record a dispatch with the given work-group counts
    fn compute_list_dispatch(
        &mut self,
        list: ComputeListId,
        x_groups: u32,
        y_groups: u32,
        z_groups: u32,
    );

    /// End recording and submit the compute list
    fn compute_list_end(&mut self, list: ComputeListId);
}
