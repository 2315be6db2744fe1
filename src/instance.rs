/// ShaderInstance - per-dispatch GPU state for one compiled kernel sequence
///
/// Owns one compute pipeline per kernel plus everything a dispatch binds:
/// descriptor sets, uniform buffers, push-constant bytes, and any samplers
/// or textures created through the convenience factories.
///
/// The central performance contract is the dirty-tracking rule: descriptor
/// sets are only rebuilt when a binding's resource *identity* changes (new
/// key, different id-list length, or a positionally different id). Updating
/// a uniform buffer's contents reuses the existing backend buffer handle and
/// never triggers a rebuild, so steady-state per-frame updates cost one
/// buffer write and zero descriptor-set creation.

use rustc_hash::FxHashMap;

use crate::compiler::CompiledKernel;
use crate::device::{
    BufferHandle, DescriptorSetHandle, PipelineHandle, RenderDevice, SamplerFilter,
    SamplerHandle, SamplerState, TextureDesc, TextureHandle, Uniform, UniformType,
};
use crate::error::Result;

/// Identifies one binding slot: (set index, binding index)
pub type UniformKey = (u32, u32);

/// Compiled kernels plus all per-dispatch GPU state
///
/// Constructed from an ordered kernel sequence; every backend handle it
/// creates is released by [`ShaderInstance::free`], which must run before
/// the device goes away.
pub struct ShaderInstance {
    kernels: Vec<CompiledKernel>,
    pipelines: Vec<PipelineHandle>,

    uniform_cache: FxHashMap<UniformKey, Uniform>,
    buffer_data: FxHashMap<UniformKey, Vec<u8>>,
    buffer_ids: FxHashMap<UniformKey, BufferHandle>,

    /// One slot per set index, 0..=max referenced set. Unused intermediate
    /// slots hold empty descriptor sets and are bound at dispatch anyway.
    descriptor_sets: Vec<DescriptorSetHandle>,

    push_constant: Vec<u8>,

    samplers: Vec<SamplerHandle>,
    textures: Vec<TextureHandle>,

    refresh_uniforms: bool,
    set_rebuilds: u64,
}

impl ShaderInstance {
    /// Create an instance and one compute pipeline per kernel
    ///
    /// # Panics
    ///
    /// Panics if a kernel handle is invalid or pipeline creation fails.
    /// Constructing an instance from a broken kernel sequence is a
    /// precondition violation, not a recoverable error: the compiler never
    /// returns a partial or invalid kernel set.
    pub fn new(device: &mut dyn RenderDevice, kernels: Vec<CompiledKernel>) -> Self {
        let mut pipelines = Vec::with_capacity(kernels.len());
        for kernel in &kernels {
            pipelines.push(create_pipeline_checked(device, kernel));
        }
        Self {
            kernels,
            pipelines,
            uniform_cache: FxHashMap::default(),
            buffer_data: FxHashMap::default(),
            buffer_ids: FxHashMap::default(),
            descriptor_sets: Vec::new(),
            push_constant: Vec::new(),
            samplers: Vec::new(),
            textures: Vec::new(),
            refresh_uniforms: true,
            set_rebuilds: 0,
        }
    }

    /// Number of kernels this instance dispatches
    pub fn kernel_count(&self) -> usize {
        self.kernels.len()
    }

    /// Running count of descriptor-set creations performed by this instance
    ///
    /// Steady-state dispatches (no binding identity changes) must not
    /// advance this counter.
    pub fn descriptor_set_rebuilds(&self) -> u64 {
        self.set_rebuilds
    }

    // ===== BINDING API =====

    /// Register or replace a texture binding at (set, binding)
    ///
    /// If a sampler is supplied its id leads the binding's ordered id list,
    /// followed by the texture id.
    pub fn set_texture(
        &mut self,
        set: u32,
        binding: u32,
        texture: TextureHandle,
        uniform_type: UniformType,
        sampler: Option<SamplerHandle>,
    ) {
        let mut uniform = Uniform::new(uniform_type, binding);
        if let Some(sampler) = sampler {
            if sampler.is_valid() {
                uniform.add_id(sampler.raw());
            }
        }
        uniform.add_id(texture.raw());
        self.cache_uniform(set, uniform);
    }

    /// Write uniform-buffer bytes at (set, binding)
    ///
    /// Reuses the existing backend buffer with an in-place content update
    /// when one exists (no descriptor-set rebuild); otherwise creates a new
    /// buffer sized to `data` and registers the binding, which marks the
    /// instance dirty.
    pub fn set_uniform_buffer(
        &mut self,
        device: &mut dyn RenderDevice,
        set: u32,
        binding: u32,
        data: &[u8],
    ) -> Result<()> {
        let key = (set, binding);
        if let Some(&buffer) = self.buffer_ids.get(&key) {
            device.buffer_update(buffer, 0, data)?;
            self.buffer_data.insert(key, data.to_vec());
        } else {
            let buffer = device.uniform_buffer_create(data);
            let mut uniform = Uniform::new(UniformType::UniformBuffer, binding);
            uniform.add_id(buffer.raw());
            self.buffer_data.insert(key, data.to_vec());
            self.buffer_ids.insert(key, buffer);
            self.cache_uniform(set, uniform);
        }
        Ok(())
    }

    /// Replace the push-constant bytes outright
    ///
    /// Not cached: the current bytes are applied fresh on every dispatch.
    pub fn set_push_constant(&mut self, data: &[u8]) {
        self.push_constant.clear();
        self.push_constant.extend_from_slice(data);
    }

    // ===== CONVENIENCE FACTORIES =====

    /// Create a sampler owned by this instance (freed on [`free`])
    ///
    /// [`free`]: ShaderInstance::free
    pub fn create_sampler(
        &mut self,
        device: &mut dyn RenderDevice,
        min_filter: SamplerFilter,
        mag_filter: SamplerFilter,
    ) -> SamplerHandle {
        let sampler = device.sampler_create(&SamplerState { min_filter, mag_filter });
        self.samplers.push(sampler);
        sampler
    }

    /// Create a texture owned by this instance (freed on [`free`])
    ///
    /// [`free`]: ShaderInstance::free
    pub fn create_texture(
        &mut self,
        device: &mut dyn RenderDevice,
        desc: &TextureDesc,
        data: &[u8],
    ) -> TextureHandle {
        let texture = device.texture_create(desc, data);
        self.textures.push(texture);
        texture
    }

    // ===== DISPATCH =====

    /// Record and submit one compute dispatch
    ///
    /// Silently returns if `kernel_index` is out of range or the kernel
    /// handle is invalid: dispatch legitimately races an in-flight
    /// recompilation during hot-reload, so a miss is a benign skip, not an
    /// error. When the instance is dirty every descriptor-set slot is
    /// rebuilt first, against kernel 0's binding layout (all kernels in one
    /// instance are assumed to share an identical layout).
    pub fn dispatch(
        &mut self,
        device: &mut dyn RenderDevice,
        kernel_index: usize,
        x_groups: u32,
        y_groups: u32,
        z_groups: u32,
    ) {
        let Some(kernel) = self.kernels.get(kernel_index) else {
            return;
        };
        if !kernel.shader.is_valid() {
            return;
        }

        if self.refresh_uniforms {
            self.rebuild_descriptor_sets(device);
        }

        let list = device.compute_list_begin();
        device.compute_list_bind_pipeline(list, self.pipelines[kernel_index]);
        for (set_index, set) in self.descriptor_sets.iter().enumerate() {
            device.compute_list_bind_uniform_set(list, *set, set_index as u32);
        }
        device.compute_list_set_push_constant(list, &self.push_constant);
        device.compute_list_dispatch(list, x_groups, y_groups, z_groups);
        device.compute_list_end(list);
    }

    // ===== LIFECYCLE =====

    /// Free every backend handle this instance owns
    ///
    /// Releases pipelines, uniform buffers, and factory-created samplers
    /// and textures, and clears all binding state. Descriptor sets are not
    /// freed explicitly: the backend releases them transitively when the
    /// resources they reference go away. Idempotent.
    pub fn free(&mut self, device: &mut dyn RenderDevice) {
        for pipeline in self.pipelines.drain(..) {
            if device.compute_pipeline_is_valid(pipeline) {
                device.compute_pipeline_free(pipeline);
            }
        }
        for (_, buffer) in self.buffer_ids.drain() {
            device.buffer_free(buffer);
        }
        for sampler in self.samplers.drain(..) {
            device.sampler_free(sampler);
        }
        for texture in self.textures.drain(..) {
            if device.texture_is_valid(texture) {
                device.texture_free(texture);
            }
        }
        self.kernels.clear();
        self.uniform_cache.clear();
        self.buffer_data.clear();
        self.descriptor_sets.clear();
        self.refresh_uniforms = true;
    }

    /// Release all backend handles ahead of a snapshot/reload boundary
    ///
    /// Retains only the logical shell; pair with [`resume`] after the
    /// boundary to recreate pipelines from freshly compiled kernels.
    ///
    /// [`resume`]: ShaderInstance::resume
    pub fn suspend(&mut self, device: &mut dyn RenderDevice) {
        self.free(device);
    }

    /// Recreate pipelines from freshly compiled kernels after [`suspend`]
    ///
    /// Bindings are gone at this point; the instance comes back dirty and
    /// callers re-bind before the next dispatch.
    ///
    /// # Panics
    ///
    /// Panics if a kernel handle is invalid or pipeline creation fails,
    /// same precondition as [`ShaderInstance::new`].
    ///
    /// [`suspend`]: ShaderInstance::suspend
    pub fn resume(&mut self, device: &mut dyn RenderDevice, kernels: Vec<CompiledKernel>) {
        debug_assert!(self.pipelines.is_empty(), "resume without suspend");
        self.pipelines = kernels
            .iter()
            .map(|kernel| create_pipeline_checked(device, kernel))
            .collect();
        self.kernels = kernels;
        self.refresh_uniforms = true;
    }

    // ===== INTERNAL =====

    /// Register a binding and update the dirty flag
    ///
    /// Dirty when: the key is new, the id-list length differs, or any id
    /// differs positionally. Equal ordered id lists leave the flag alone.
    fn cache_uniform(&mut self, set: u32, uniform: Uniform) {
        let key = (set, uniform.binding);
        match self.uniform_cache.get(&key) {
            Some(existing) if existing.ids() == uniform.ids() => {}
            _ => self.refresh_uniforms = true,
        }
        self.uniform_cache.insert(key, uniform);

        let slots = set as usize + 1;
        if self.descriptor_sets.len() < slots {
            self.descriptor_sets.resize(slots, DescriptorSetHandle::INVALID);
        }
    }

    fn rebuild_descriptor_sets(&mut self, device: &mut dyn RenderDevice) {
        for set_index in 0..self.descriptor_sets.len() {
            let old = self.descriptor_sets[set_index];
            if old.is_valid() && device.uniform_set_is_valid(old) {
                device.uniform_set_free(old);
            }

            let mut uniforms: Vec<Uniform> = self
                .uniform_cache
                .iter()
                .filter(|((set, _), _)| *set == set_index as u32)
                .map(|(_, uniform)| uniform.clone())
                .collect();
            uniforms.sort_by_key(|uniform| uniform.binding);

            // Layout reflection comes from kernel 0. dispatch() checked the
            // kernel sequence is non-empty before rebuilding.
            self.descriptor_sets[set_index] =
                device.uniform_set_create(&uniforms, self.kernels[0].shader, set_index as u32);
            self.set_rebuilds += 1;
        }
        self.refresh_uniforms = false;
    }
}

fn create_pipeline_checked(device: &mut dyn RenderDevice, kernel: &CompiledKernel) -> PipelineHandle {
    assert!(
        kernel.shader.is_valid(),
        "ShaderInstance: invalid shader handle for kernel '{}'",
        kernel.name
    );
    let pipeline = device.compute_pipeline_create(kernel.shader);
    assert!(
        pipeline.is_valid(),
        "ShaderInstance: compute pipeline creation failed for kernel '{}'",
        kernel.name
    );
    pipeline
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
