//! Module resolution and interpreter dispatch.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

use crate::error::WpmError;
use crate::manifest::ModuleDescriptor;
use crate::runtime::Runtime;
use crate::store::{MetadataStore, PackageMap};
use crate::workspace::{MAIN_FILE, MODULE_DESCRIPTOR, SOURCE_DIR, Workspace};

/// Environment variable naming the interpreter executable. Its value is
/// trusted as-is, without probing.
pub const INTERPRETER_ENV: &str = "WS_INTERPRETER";

/// Interpreter executables probed on PATH, in order.
pub const INTERPRETER_CANDIDATES: &[&str] = &["ws", "wsx"];

/// Argument used to check whether a candidate interpreter answers at all.
const VERSION_ARG: &str = "--version";

/// Resolves `module` across the installed packages and runs it through the
/// external interpreter, returning the child's exit code.
#[tracing::instrument(skip(runtime, root_override))]
pub fn run_module<R: Runtime>(
    runtime: R,
    module: &str,
    root_override: Option<PathBuf>,
) -> Result<i32> {
    let ws = Workspace::resolve(&runtime, root_override)?;

    // Interpreter presence is a precondition; no module search happens
    // without one
    let interpreter = locate_interpreter(&runtime)?;

    let store = MetadataStore::new(ws.metadata_file());
    let packages = store.load(&runtime);
    let file = resolve_module(&runtime, &ws, &packages, module)?;

    info!("Running {:?} with {}", file, interpreter);
    runtime.run_program(&interpreter, &file)
}

/// Locates the interpreter executable: the environment override wins, then
/// each candidate name is probed with a version query.
#[tracing::instrument(skip(runtime))]
pub fn locate_interpreter<R: Runtime>(runtime: &R) -> Result<String> {
    if let Ok(custom) = runtime.env_var(INTERPRETER_ENV)
        && !custom.trim().is_empty()
    {
        debug!("Interpreter from {}: {}", INTERPRETER_ENV, custom);
        return Ok(custom);
    }

    for candidate in INTERPRETER_CANDIDATES {
        if runtime.probe_program(candidate, VERSION_ARG) {
            debug!("Interpreter found on PATH: {}", candidate);
            return Ok((*candidate).to_string());
        }
    }

    Err(WpmError::InterpreterNotFound.into())
}

/// Scans installed packages for `module` and returns its runnable file.
/// Packages are visited in name order, so the first declaring package in
/// lexicographic order wins when several define the same module.
#[tracing::instrument(skip(runtime, ws, packages))]
pub fn resolve_module<R: Runtime>(
    runtime: &R,
    ws: &Workspace,
    packages: &PackageMap,
    module: &str,
) -> Result<PathBuf> {
    for (name, record) in packages {
        let package_dir = ws.root().join(&record.path);

        let mut descriptors = vec![package_dir.join(MODULE_DESCRIPTOR)];
        descriptors.extend(record.assignments.iter().map(|rel| package_dir.join(rel)));

        for descriptor_path in descriptors {
            let Some(descriptor) = ModuleDescriptor::load(runtime, &descriptor_path) else {
                continue;
            };
            let Some(rel) = descriptor.modules.get(module) else {
                continue;
            };

            debug!("Module {} declared by package {}", module, name);
            let source_dir = package_dir.join(SOURCE_DIR);
            let base = if runtime.is_dir(&source_dir) {
                source_dir
            } else {
                package_dir.clone()
            };
            let candidate = base.join(rel);

            match entry_file(runtime, &candidate) {
                Some(file) => return Ok(file),
                // A dangling mapping does not end the search; later
                // descriptors and packages may still declare the module
                None => warn!(
                    "Module {} in {:?} maps to {:?}, which is not runnable",
                    module, descriptor_path, candidate
                ),
            }
        }
    }

    Err(WpmError::ModuleNotFound(module.to_string()).into())
}

/// Entry-file policy for a mapped path. A directory must contain the main
/// file; a plain file yields a sibling main file when present, else itself.
fn entry_file<R: Runtime>(runtime: &R, candidate: &Path) -> Option<PathBuf> {
    if runtime.is_dir(candidate) {
        let main = candidate.join(MAIN_FILE);
        return runtime.is_file(&main).then_some(main);
    }

    if runtime.is_file(candidate) {
        if let Some(parent) = candidate.parent() {
            let sibling = parent.join(MAIN_FILE);
            if runtime.is_file(&sibling) {
                return Some(sibling);
            }
        }
        return Some(candidate.to_path_buf());
    }

    None
}
