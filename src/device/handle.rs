/// Opaque backend handle types
///
/// Every GPU object the backend creates is identified by an opaque integer
/// id wrapped in a per-class newtype. Each handle is owned by exactly one
/// component, which releases it exactly once through the matching
/// `RenderDevice` free method. Raw id 0 means "no object".

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u64);

        impl $name {
            /// Handle value that refers to no backend object
            pub const INVALID: Self = Self(0);

            /// Wrap a raw backend id (0 = invalid)
            ///
            /// Intended for `RenderDevice` implementations handing out ids.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Raw backend id
            pub fn raw(&self) -> u64 {
                self.0
            }

            /// True if this handle refers to a backend object
            pub fn is_valid(&self) -> bool {
                self.0 != 0
            }
        }
    };
}

define_handle!(
    /// Compiled shader module handle (one compute entry point)
    ShaderHandle
);

define_handle!(
    /// Compute pipeline handle (one per compiled kernel)
    PipelineHandle
);

define_handle!(
    /// GPU buffer handle (uniform buffers)
    BufferHandle
);

define_handle!(
    /// GPU texture handle
    TextureHandle
);

define_handle!(
    /// Texture sampler handle
    SamplerHandle
);

define_handle!(
    /// Descriptor set handle (all bindings sharing one set index)
    DescriptorSetHandle
);

define_handle!(
    /// Transient id of an in-progress compute command list
    ComputeListId
);
