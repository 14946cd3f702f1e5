//! Pipeline module - Runs one render from resolved options: load the patch
//! file, read the manifests, patch and render.

use std::path::PathBuf;
use tracing::debug;

use crate::condition::{env_context, EnvContext};
use crate::error::Result;
use crate::patch::apply;
use crate::patchfile::{read_patch_file, SubstOptions};
use crate::resolve::read_docs;

/// Options for a single run.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Manifest files, directories, globs, or `-`.
    pub filenames: Vec<String>,
    pub patch_file: PathBuf,
    pub recursive: bool,
    pub subst: SubstOptions,
    /// Condition context entries layered over the process environment.
    pub context: Vec<(String, String)>,
}

impl Options {
    /// Builds the condition context: the process environment plus overrides.
    pub fn env_context(&self) -> EnvContext {
        let mut ctx = env_context();
        ctx.extend(self.context.iter().cloned());
        ctx
    }
}

/// Runs the pipeline against the process environment and returns the
/// rendered stream.
pub fn run(opts: &Options) -> Result<String> {
    run_with(opts, &opts.env_context())
}

/// Same as [`run`], evaluating conditions against `ctx`.
pub fn run_with(opts: &Options, ctx: &EnvContext) -> Result<String> {
    let spec = read_patch_file(&opts.patch_file, &opts.subst)?;
    let manifests = read_docs(&opts.filenames, opts.recursive)?;
    debug!(
        documents = manifests.len(),
        groups = spec.patches.len(),
        "rendering"
    );
    apply(manifests, &spec, ctx)
}
