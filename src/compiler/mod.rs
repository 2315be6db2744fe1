/// Compiler module - shader-dialect kernel extraction and backend compilation

pub mod kernel_compiler;

pub use kernel_compiler::*;
