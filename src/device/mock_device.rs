/// Mock RenderDevice for unit tests (no GPU required)
///
/// Allocates monotonically increasing raw ids, tracks live and freed objects
/// per handle class, counts descriptor-set creations, and records compute
/// list commands as strings so tests can assert on dispatch behavior.
///
/// Honors the transitive-release contract: freeing a resource referenced by
/// a live descriptor set releases that set as well.

#[cfg(test)]
use rustc_hash::{FxHashMap, FxHashSet};

#[cfg(test)]
use crate::device::{
    BufferHandle, ComputeListId, DescriptorSetHandle, PipelineHandle, RenderDevice,
    SamplerHandle, SamplerState, ShaderHandle, SpirvBlob, TextureDesc, TextureHandle, Uniform,
};
#[cfg(test)]
use crate::error::{Error, Result};

/// Mock backend device tracking all created and freed objects
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockDevice {
    next_id: u64,

    /// Live shader module ids
    pub live_shaders: FxHashSet<u64>,
    /// Live pipeline ids
    pub live_pipelines: FxHashSet<u64>,
    /// Live buffer ids with their current contents
    pub live_buffers: FxHashMap<u64, Vec<u8>>,
    /// Live texture ids
    pub live_textures: FxHashSet<u64>,
    /// Live sampler ids
    pub live_samplers: FxHashSet<u64>,
    /// Live descriptor set ids with the raw resource ids they reference
    pub live_uniform_sets: FxHashMap<u64, Vec<u64>>,

    /// Every shader id freed so far, in order
    pub freed_shaders: Vec<u64>,
    /// Number of uniform_set_create calls
    pub uniform_set_creations: u32,
    /// GLSL sources handed to shader_compile, in order
    pub compiled_sources: Vec<String>,
    /// Recorded compute list commands
    pub commands: Vec<String>,

    /// When set, shader_compile fails with a diagnostic for any source
    /// containing this token
    pub fail_compile_containing: Option<String>,
    /// When set, shader_create returns an invalid handle
    pub fail_shader_create: bool,
}

#[cfg(test)]
impl MockDevice {
    /// Create a new mock device
    pub fn new() -> Self {
        Self::default()
    }

    fn alloc(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Backend-specific behavior the core relies on: a descriptor set dies
    /// with any resource it references.
    fn release_dependent_sets(&mut self, raw: u64) {
        self.live_uniform_sets.retain(|_, ids| !ids.contains(&raw));
    }

    /// Total number of live backend objects (leak check helper)
    pub fn live_object_count(&self) -> usize {
        self.live_shaders.len()
            + self.live_pipelines.len()
            + self.live_buffers.len()
            + self.live_textures.len()
            + self.live_samplers.len()
            + self.live_uniform_sets.len()
    }
}

#[cfg(test)]
impl RenderDevice for MockDevice {
    fn shader_compile(&mut self, source: &str) -> std::result::Result<SpirvBlob, String> {
        self.compiled_sources.push(source.to_string());
        if let Some(token) = &self.fail_compile_containing {
            if source.contains(token.as_str()) {
                return Err(format!("mock diagnostic: source contains '{}'", token));
            }
        }
        Ok(SpirvBlob {
            bytecode: source.as_bytes().to_vec(),
        })
    }

    fn shader_create(&mut self, _spirv: &SpirvBlob) -> ShaderHandle {
        if self.fail_shader_create {
            return ShaderHandle::INVALID;
        }
        let id = self.alloc();
        self.live_shaders.insert(id);
        ShaderHandle::from_raw(id)
    }

    fn shader_free(&mut self, shader: ShaderHandle) {
        if self.live_shaders.remove(&shader.raw()) {
            self.freed_shaders.push(shader.raw());
            self.release_dependent_sets(shader.raw());
        }
    }

    fn compute_pipeline_create(&mut self, shader: ShaderHandle) -> PipelineHandle {
        if !self.live_shaders.contains(&shader.raw()) {
            return PipelineHandle::INVALID;
        }
        let id = self.alloc();
        self.live_pipelines.insert(id);
        PipelineHandle::from_raw(id)
    }

    fn compute_pipeline_is_valid(&self, pipeline: PipelineHandle) -> bool {
        self.live_pipelines.contains(&pipeline.raw())
    }

    fn compute_pipeline_free(&mut self, pipeline: PipelineHandle) {
        self.live_pipelines.remove(&pipeline.raw());
    }

    fn uniform_buffer_create(&mut self, data: &[u8]) -> BufferHandle {
        let id = self.alloc();
        self.live_buffers.insert(id, data.to_vec());
        BufferHandle::from_raw(id)
    }

    fn buffer_update(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        let contents = self.live_buffers.get_mut(&buffer.raw()).ok_or_else(|| {
            Error::InvalidResource(format!("buffer_update: unknown buffer id {}", buffer.raw()))
        })?;
        let offset = offset as usize;
        if contents.len() < offset + data.len() {
            contents.resize(offset + data.len(), 0);
        }
        contents[offset..offset + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn buffer_free(&mut self, buffer: BufferHandle) {
        if self.live_buffers.remove(&buffer.raw()).is_some() {
            self.release_dependent_sets(buffer.raw());
        }
    }

    fn texture_create(&mut self, _desc: &TextureDesc, _data: &[u8]) -> TextureHandle {
        let id = self.alloc();
        self.live_textures.insert(id);
        TextureHandle::from_raw(id)
    }

    fn texture_is_valid(&self, texture: TextureHandle) -> bool {
        self.live_textures.contains(&texture.raw())
    }

    fn texture_free(&mut self, texture: TextureHandle) {
        if self.live_textures.remove(&texture.raw()) {
            self.release_dependent_sets(texture.raw());
        }
    }

    fn sampler_create(&mut self, _state: &SamplerState) -> SamplerHandle {
        let id = self.alloc();
        self.live_samplers.insert(id);
        SamplerHandle::from_raw(id)
    }

    fn sampler_free(&mut self, sampler: SamplerHandle) {
        if self.live_samplers.remove(&sampler.raw()) {
            self.release_dependent_sets(sampler.raw());
        }
    }

    fn uniform_set_create(
        &mut self,
        uniforms: &[Uniform],
        _shader: ShaderHandle,
        set_index: u32,
    ) -> DescriptorSetHandle {
        let id = self.alloc();
        let referenced: Vec<u64> = uniforms.iter().flat_map(|u| u.ids().iter().copied()).collect();
        self.live_uniform_sets.insert(id, referenced);
        self.uniform_set_creations += 1;
        self.commands.push(format!(
            "uniform_set_create set={} bindings={}",
            set_index,
            uniforms.len()
        ));
        DescriptorSetHandle::from_raw(id)
    }

    fn uniform_set_is_valid(&self, set: DescriptorSetHandle) -> bool {
        self.live_uniform_sets.contains_key(&set.raw())
    }

    fn uniform_set_free(&mut self, set: DescriptorSetHandle) {
        self.live_uniform_sets.remove(&set.raw());
    }

    fn compute_list_begin(&mut self) -> ComputeListId {
        let id = self.alloc();
        self.commands.push("compute_list_begin".to_string());
        ComputeListId::from_raw(id)
    }

    fn compute_list_bind_pipeline(&mut self, _list: ComputeListId, pipeline: PipelineHandle) {
        self.commands.push(format!("bind_pipeline id={}", pipeline.raw()));
    }

    fn compute_list_bind_uniform_set(
        &mut self,
        _list: ComputeListId,
        set: DescriptorSetHandle,
        set_index: u32,
    ) {
        self.commands.push(format!("bind_uniform_set set={} id={}", set_index, set.raw()));
    }

    fn compute_list_set_push_constant(&mut self, _list: ComputeListId, data: &[u8]) {
        self.commands.push(format!("set_push_constant len={}", data.len()));
    }

    fn compute_list_dispatch(
        &mut self,
        _list: ComputeListId,
        x_groups: u32,
        y_groups: u32,
        z_groups: u32,
    ) {
        self.commands.push(format!("dispatch {}x{}x{}", x_groups, y_groups, z_groups));
    }

    fn compute_list_end(&mut self, _list: ComputeListId) {
        self.commands.push("compute_list_end".to_string());
    }
}

#[cfg(test)]
#[path = "mock_device_tests.rs"]
mod tests;
