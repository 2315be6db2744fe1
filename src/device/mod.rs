/// Device module - the backend boundary
///
/// Everything the core needs from a GPU backend: the `RenderDevice` trait,
/// opaque per-class handle types, and the shared descriptor/enum types that
/// cross the boundary. A `MockDevice` implementation is compiled in for
/// tests only.

// Module declarations
pub mod handle;
pub mod render_device;
pub mod types;

pub mod mock_device;

// Re-exports
pub use handle::*;
pub use render_device::*;
pub use types::*;
