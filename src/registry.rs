/// ShaderRegistry - compilation cache, instance tracking, and reload lifecycle
///
/// Maps shader sources (by stable slotmap identity, not textual hash) to
/// their compiled kernel sequences, compiling on first use and never caching
/// failures, so a corrected source simply retries on the next call. Also
/// tracks every live `ShaderInstance` so teardown can release all backend
/// handles before the device goes away: GPU handles are not owned by any
/// language-level reference counting and leak silently otherwise.
///
/// The registry is an explicitly constructed value passed to its consumers;
/// its lifecycle is an explicit call pair (construction + `teardown_all`),
/// with `suspend`/`resume` around any snapshot/reload boundary.

use slotmap::{new_key_type, SlotMap};

use crate::compiler::{compile_kernels, release_kernels, CompiledKernel};
use crate::device::RenderDevice;
use crate::error::{Error, Result};
use crate::instance::ShaderInstance;
use crate::{acompute_error, acompute_info};

new_key_type! {
    /// Stable identity of a registered shader source
    pub struct SourceKey;
}

new_key_type! {
    /// Stable identity of a registry-tracked shader instance
    pub struct InstanceKey;
}

new_key_type! {
    /// Identity of a source-changed subscription
    pub struct SubscriptionKey;
}

struct SourceEntry {
    source: String,
    kernels: Option<Vec<CompiledKernel>>,
    /// Set by suspend() for sources that were compiled, so resume() knows
    /// what to replay
    resume_pending: bool,
}

struct InstanceEntry {
    source: SourceKey,
    instance: ShaderInstance,
}

struct Subscription {
    source: SourceKey,
    callback: Box<dyn FnMut(SourceKey)>,
}

/// Process-wide (but explicitly owned) shader compilation cache
pub struct ShaderRegistry {
    sources: SlotMap<SourceKey, SourceEntry>,
    instances: SlotMap<InstanceKey, InstanceEntry>,
    subscriptions: SlotMap<SubscriptionKey, Subscription>,
}

impl Default for ShaderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            sources: SlotMap::with_key(),
            instances: SlotMap::with_key(),
            subscriptions: SlotMap::with_key(),
        }
    }

    // ===== SOURCES =====

    /// Register a shader source and return its identity key
    ///
    /// Nothing is compiled until the source is first used.
    pub fn add_source(&mut self, source: impl Into<String>) -> SourceKey {
        self.sources.insert(SourceEntry {
            source: source.into(),
            kernels: None,
            resume_pending: false,
        })
    }

    /// Current source text for a key
    pub fn source(&self, key: SourceKey) -> Option<&str> {
        self.sources.get(key).map(|entry| entry.source.as_str())
    }

    /// Replace a source's text
    ///
    /// Frees any cached kernels (the entry recompiles on next use) and
    /// synchronously notifies every subscriber registered for this key.
    /// Instances created from the old kernels keep their stale handles and
    /// skip dispatches until reconstructed (the hot-reload window).
    pub fn set_source(
        &mut self,
        device: &mut dyn RenderDevice,
        key: SourceKey,
        source: impl Into<String>,
    ) -> Result<()> {
        let entry = self
            .sources
            .get_mut(key)
            .ok_or_else(|| Error::InvalidResource("set_source: unknown source key".to_string()))?;
        if let Some(kernels) = entry.kernels.take() {
            release_kernels(device, &kernels);
        }
        entry.source = source.into();

        for (_, sub) in self.subscriptions.iter_mut() {
            if sub.source == key {
                (sub.callback)(key);
            }
        }
        Ok(())
    }

    /// Remove a source entirely
    ///
    /// Frees its cached kernels, every instance created from it, and its
    /// subscriptions.
    pub fn remove_source(&mut self, device: &mut dyn RenderDevice, key: SourceKey) {
        let Some(mut entry) = self.sources.remove(key) else {
            return;
        };
        if let Some(kernels) = entry.kernels.take() {
            release_kernels(device, &kernels);
        }

        let dead: Vec<InstanceKey> = self
            .instances
            .iter()
            .filter(|(_, e)| e.source == key)
            .map(|(k, _)| k)
            .collect();
        for instance_key in dead {
            self.free_instance(device, instance_key);
        }

        self.subscriptions.retain(|_, sub| sub.source != key);
    }

    // ===== SUBSCRIPTIONS =====

    /// Register a callback invoked synchronously whenever the source changes
    pub fn subscribe(
        &mut self,
        key: SourceKey,
        callback: Box<dyn FnMut(SourceKey)>,
    ) -> SubscriptionKey {
        self.subscriptions.insert(Subscription { source: key, callback })
    }

    /// Remove a subscription; returns false if it was already gone
    pub fn unsubscribe(&mut self, key: SubscriptionKey) -> bool {
        self.subscriptions.remove(key).is_some()
    }

    // ===== COMPILATION =====

    /// Compiled kernels for a source, compiling and caching on first use
    ///
    /// Failures are never cached: each subsequent call retries from
    /// scratch, so fixing the source is enough to recover.
    pub fn get_or_compile(
        &mut self,
        device: &mut dyn RenderDevice,
        key: SourceKey,
    ) -> Result<&[CompiledKernel]> {
        let entry = self.sources.get_mut(key).ok_or_else(|| {
            Error::InvalidResource("get_or_compile: unknown source key".to_string())
        })?;
        if entry.kernels.is_none() {
            let compiled = compile_kernels(device, &entry.source).map_err(|err| {
                acompute_error!("acompute::registry", "compilation failed: {}", err);
                Error::from(err)
            })?;
            entry.kernels = Some(compiled);
        }
        Ok(entry.kernels.as_deref().unwrap_or(&[]))
    }

    /// Free a source's cached kernels and recompile it
    ///
    /// On failure the cache entry stays absent.
    pub fn invalidate(
        &mut self,
        device: &mut dyn RenderDevice,
        key: SourceKey,
    ) -> Result<&[CompiledKernel]> {
        let entry = self
            .sources
            .get_mut(key)
            .ok_or_else(|| Error::InvalidResource("invalidate: unknown source key".to_string()))?;
        if let Some(kernels) = entry.kernels.take() {
            release_kernels(device, &kernels);
        }
        self.get_or_compile(device, key)
    }

    // ===== INSTANCES =====

    /// Create a registry-tracked instance for a source
    ///
    /// Compiles the source first if needed. The registry keeps the instance
    /// so teardown and reload can release its backend handles.
    pub fn create_instance(
        &mut self,
        device: &mut dyn RenderDevice,
        key: SourceKey,
    ) -> Result<InstanceKey> {
        let kernels = self.get_or_compile(device, key)?.to_vec();
        let instance = ShaderInstance::new(device, kernels);
        Ok(self.instances.insert(InstanceEntry { source: key, instance }))
    }

    /// Shared access to a tracked instance
    pub fn instance(&self, key: InstanceKey) -> Option<&ShaderInstance> {
        self.instances.get(key).map(|entry| &entry.instance)
    }

    /// Mutable access to a tracked instance (binding and dispatch calls)
    pub fn instance_mut(&mut self, key: InstanceKey) -> Option<&mut ShaderInstance> {
        self.instances.get_mut(key).map(|entry| &mut entry.instance)
    }

    /// Free a tracked instance's backend handles and drop it
    ///
    /// Returns false if the key was already gone.
    pub fn free_instance(&mut self, device: &mut dyn RenderDevice, key: InstanceKey) -> bool {
        match self.instances.remove(key) {
            Some(mut entry) => {
                entry.instance.free(device);
                true
            }
            None => false,
        }
    }

    // ===== RELOAD LIFECYCLE =====

    /// Free every backend handle ahead of a snapshot/reload boundary
    ///
    /// Sources and instance shells stay registered; call [`resume`] after
    /// the boundary to replay compilation and rebuild pipelines.
    ///
    /// [`resume`]: ShaderRegistry::resume
    pub fn suspend(&mut self, device: &mut dyn RenderDevice) {
        for (_, entry) in self.instances.iter_mut() {
            entry.instance.suspend(device);
        }
        for (_, entry) in self.sources.iter_mut() {
            if let Some(kernels) = entry.kernels.take() {
                release_kernels(device, &kernels);
                entry.resume_pending = true;
            }
        }
        acompute_info!("acompute::registry", "suspended: all backend handles freed");
    }

    /// Replay compilation after [`suspend`] and resume tracked instances
    ///
    /// A source that no longer compiles is logged, left uncompiled (it
    /// retries on next use), and its instances are dropped since they
    /// cannot exist without kernels.
    ///
    /// [`suspend`]: ShaderRegistry::suspend
    pub fn resume(&mut self, device: &mut dyn RenderDevice) {
        let pending: Vec<SourceKey> = self
            .sources
            .iter()
            .filter(|(_, entry)| entry.resume_pending)
            .map(|(key, _)| key)
            .collect();

        for key in pending {
            let source = self.sources[key].source.clone();
            match compile_kernels(device, &source) {
                Ok(kernels) => {
                    for (_, entry) in self.instances.iter_mut() {
                        if entry.source == key {
                            entry.instance.resume(device, kernels.clone());
                        }
                    }
                    let entry = &mut self.sources[key];
                    entry.kernels = Some(kernels);
                    entry.resume_pending = false;
                }
                Err(err) => {
                    acompute_error!(
                        "acompute::registry",
                        "resume: recompilation failed, dropping instances: {}",
                        err
                    );
                    self.sources[key].resume_pending = false;
                    // Suspended instances hold no backend handles, so a
                    // plain removal is enough.
                    self.instances.retain(|_, entry| entry.source != key);
                }
            }
        }
    }

    // ===== TEARDOWN =====

    /// Free every cached kernel and every tracked instance
    ///
    /// Must run before the owning device disappears.
    pub fn teardown_all(&mut self, device: &mut dyn RenderDevice) {
        for (_, mut entry) in self.instances.drain() {
            entry.instance.free(device);
        }
        for (_, mut entry) in self.sources.drain() {
            if let Some(kernels) = entry.kernels.take() {
                release_kernels(device, &kernels);
            }
        }
        self.subscriptions.clear();
        acompute_info!("acompute::registry", "teardown: all kernels and instances freed");
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
