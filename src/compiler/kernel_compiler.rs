/// Kernel compiler - turns `#kernel` shader-dialect source into compiled
/// compute shader modules
///
/// A source file declares one or more kernels with leading `#kernel <name>`
/// directive lines, followed by shared declarations and one zero-argument
/// entry function per kernel, each directly preceded by a
/// `numthreads(x, y, z)` annotation:
///
/// ```text
/// #kernel Main
/// layout(set = 0, binding = 0, rgba16f) uniform image2D color;
/// numthreads(8, 8, 1)
/// void Main() { ... }
/// ```
///
/// Kernels share one physical source file so they can reference the shared
/// declarations, but each compiles as an independent translation unit with
/// its own entry point, because the backend compiles one entry point per
/// module. Per kernel the compiler prepends a version line and a
/// `layout(local_size_*)` declaration built from the recorded `numthreads`
/// triple, strips every `numthreads` line (emitting blanks to preserve line
/// numbers in backend diagnostics), and renames the kernel's entry function
/// to the backend-mandated entry-point name.
///
/// Compilation is all-or-nothing: any failure aborts the whole operation and
/// releases kernels already created for this call.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::acompute_info;
use crate::device::{RenderDevice, ShaderHandle};

/// Leading directive that declares a kernel
const KERNEL_DIRECTIVE: &str = "#kernel ";

/// Version line prepended to every generated compilation unit
const VERSION_HEADER: &str = "#version 450";

/// Entry-point name the backend requires
const ENTRY_POINT: &str = "main";

// ===== RESULT TYPES =====

/// One compiled compute entry point
#[derive(Debug, Clone)]
pub struct CompiledKernel {
    /// Kernel name as declared by its `#kernel` directive
    pub name: String,
    /// Backend shader module handle
    pub shader: ShaderHandle,
    /// Fixed work-group dimensions the kernel was compiled with
    pub thread_group: [u32; 3],
}

/// Structured compilation failure reasons
///
/// Source-format errors are detected entirely before any backend call;
/// backend errors carry the generated source for diagnosability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// No leading `#kernel` directive lines found
    NoKernelsFound,

    /// Nothing follows the kernel directives
    NoShaderBody,

    /// A declared kernel name never appears in the body
    KernelNotFound(String),

    /// A kernel entry function has no `numthreads` annotation on the
    /// immediately preceding line
    ThreadGroupMissing {
        /// Offending kernel
        kernel: String,
    },

    /// A `numthreads` annotation did not parse to exactly three integers
    ThreadGroupSyntax {
        /// Offending kernel
        kernel: String,
        /// The malformed annotation line
        line: String,
    },

    /// The backend compiler reported diagnostics
    Backend {
        /// Backend diagnostic text
        diagnostics: String,
        /// The generated compilation unit that failed
        generated_source: String,
    },

    /// The backend returned an invalid handle for compiled bytecode
    HandleCreationFailed {
        /// Offending kernel
        kernel: String,
    },
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::NoKernelsFound => write!(f, "no kernels found"),
            CompileError::NoShaderBody => write!(f, "no shader code found"),
            CompileError::KernelNotFound(name) => {
                write!(f, "kernel '{}' not found in shader body", name)
            }
            CompileError::ThreadGroupMissing { kernel } => {
                write!(f, "thread group annotation missing for kernel '{}'", kernel)
            }
            CompileError::ThreadGroupSyntax { kernel, line } => {
                write!(f, "thread group syntax error for kernel '{}': '{}'", kernel, line)
            }
            CompileError::Backend { diagnostics, .. } => {
                write!(f, "backend compilation failed: {}", diagnostics)
            }
            CompileError::HandleCreationFailed { kernel } => {
                write!(f, "failed to create shader module for kernel '{}'", kernel)
            }
        }
    }
}

impl std::error::Error for CompileError {}

// ===== COMPILATION =====

/// Compile every kernel declared in `source`
///
/// # Arguments
///
/// * `device` - Backend used to compile and create shader modules
/// * `source` - Raw shader-dialect source text
///
/// # Returns
///
/// Compiled kernels, index-aligned with the `#kernel` directive order.
/// Any failure aborts the whole operation; kernels already created for this
/// call are released before returning, so no partial set ever escapes.
pub fn compile_kernels(
    device: &mut dyn RenderDevice,
    source: &str,
) -> std::result::Result<Vec<CompiledKernel>, CompileError> {
    let lines: Vec<&str> = source.lines().collect();

    // Leading contiguous #kernel directives
    let mut kernel_names: Vec<String> = Vec::new();
    let mut body_start = lines.len();
    for (i, line) in lines.iter().enumerate() {
        match line.trim().strip_prefix(KERNEL_DIRECTIVE) {
            Some(name) => kernel_names.push(name.trim().to_string()),
            None => {
                body_start = i;
                break;
            }
        }
    }

    if kernel_names.is_empty() {
        return Err(CompileError::NoKernelsFound);
    }
    if body_start >= lines.len() {
        return Err(CompileError::NoShaderBody);
    }

    let body = &lines[body_start..];

    // Every declared kernel name must occur somewhere in the body. This is a
    // textual containment check, not a symbol lookup: a name that only occurs
    // as a substring of a longer identifier passes it.
    let body_text = body.join("\n");
    for name in &kernel_names {
        if !body_text.contains(name.as_str()) {
            return Err(CompileError::KernelNotFound(name.clone()));
        }
    }

    // Locate each kernel's entry line and record the numthreads triple from
    // the line directly above it. Annotation lines are stripped from every
    // generated unit.
    let entry_prefixes: Vec<String> =
        kernel_names.iter().map(|n| format!("void {}()", n)).collect();
    let mut thread_groups: FxHashMap<String, [u32; 3]> = FxHashMap::default();
    let mut lines_to_remove: FxHashSet<usize> = FxHashSet::default();

    for (i, line) in body.iter().enumerate() {
        for (name, prefix) in kernel_names.iter().zip(&entry_prefixes) {
            if !line.starts_with(prefix.as_str()) {
                continue;
            }
            if i == 0 {
                return Err(CompileError::ThreadGroupMissing { kernel: name.clone() });
            }
            let prev = body[i - 1].trim();
            if !prev.contains("numthreads") {
                return Err(CompileError::ThreadGroupMissing { kernel: name.clone() });
            }
            let triple = parse_numthreads(prev).ok_or_else(|| CompileError::ThreadGroupSyntax {
                kernel: name.clone(),
                line: prev.to_string(),
            })?;
            thread_groups.insert(name.clone(), triple);
            lines_to_remove.insert(i - 1);
        }
    }

    // One translation unit per kernel, in directive order. All-or-nothing:
    // a failure mid-sequence releases what was already created.
    let mut compiled: Vec<CompiledKernel> = Vec::with_capacity(kernel_names.len());
    for name in &kernel_names {
        match compile_one(device, name, &thread_groups, body, &lines_to_remove) {
            Ok(kernel) => compiled.push(kernel),
            Err(err) => {
                release_kernels(device, &compiled);
                return Err(err);
            }
        }
    }

    acompute_info!(
        "acompute::compiler",
        "compiled {} kernel(s): {}",
        compiled.len(),
        kernel_names.join(", ")
    );

    Ok(compiled)
}

/// Release the shader modules of already-compiled kernels
///
/// Used on the all-or-nothing failure path and by the registry when an
/// entry is invalidated or torn down.
pub fn release_kernels(device: &mut dyn RenderDevice, kernels: &[CompiledKernel]) {
    for kernel in kernels {
        if kernel.shader.is_valid() {
            device.shader_free(kernel.shader);
        }
    }
}

fn compile_one(
    device: &mut dyn RenderDevice,
    name: &str,
    thread_groups: &FxHashMap<String, [u32; 3]>,
    body: &[&str],
    lines_to_remove: &FxHashSet<usize>,
) -> std::result::Result<CompiledKernel, CompileError> {
    // A name that passed the containment check can still lack an entry
    // function definition (substring match), in which case no triple was
    // recorded for it.
    let thread_group = *thread_groups.get(name).ok_or_else(|| CompileError::ThreadGroupMissing {
        kernel: name.to_string(),
    })?;

    let generated = generate_kernel_source(name, thread_group, body, lines_to_remove);

    let blob = device.shader_compile(&generated).map_err(|diagnostics| CompileError::Backend {
        diagnostics,
        generated_source: generated.clone(),
    })?;

    let shader = device.shader_create(&blob);
    if !shader.is_valid() {
        return Err(CompileError::HandleCreationFailed { kernel: name.to_string() });
    }

    Ok(CompiledKernel {
        name: name.to_string(),
        shader,
        thread_group,
    })
}

/// Build one kernel's standalone compilation unit
///
/// Stripped `numthreads` lines are emitted as blanks so line numbers in
/// backend diagnostics still map back to the original source.
fn generate_kernel_source(
    name: &str,
    thread_group: [u32; 3],
    body: &[&str],
    lines_to_remove: &FxHashSet<usize>,
) -> String {
    let entry_prefix = format!("void {}()", name);
    let mut out = String::new();
    out.push_str(VERSION_HEADER);
    out.push('\n');
    out.push_str(&format!(
        "layout(local_size_x = {}, local_size_y = {}, local_size_z = {}) in;\n",
        thread_group[0], thread_group[1], thread_group[2]
    ));

    for (i, line) in body.iter().enumerate() {
        if lines_to_remove.contains(&i) {
            out.push('\n');
            continue;
        }
        if line.starts_with(entry_prefix.as_str()) {
            out.push_str(&line.replace(name, ENTRY_POINT));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    out
}

/// Parse exactly three positive integers from a `numthreads(x, y, z)` line
fn parse_numthreads(line: &str) -> Option<[u32; 3]> {
    let start = line.find('(')? + 1;
    let end = line.find(')')?;
    let inner = line.get(start..end)?;

    let mut triple = [0u32; 3];
    let mut count = 0;
    for part in inner.split(',') {
        if count == 3 {
            return None;
        }
        let value: u32 = part.trim().parse().ok()?;
        if value == 0 {
            return None;
        }
        triple[count] = value;
        count += 1;
    }
    if count != 3 {
        return None;
    }
    Some(triple)
}

#[cfg(test)]
#[path = "kernel_compiler_tests.rs"]
mod tests;
