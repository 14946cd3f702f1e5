//! Reading patch files from disk.

use std::path::Path;
use tracing::debug;

use super::model::PatchFile;
use crate::envsubst::Envsubst;
use crate::error::{Error, Result};

/// SubstOptions controls environment substitution on the raw patch-file text.
#[derive(Debug, Clone, Default)]
pub struct SubstOptions {
    pub allowed_vars: Vec<String>,
    pub allowed_prefixes: Vec<String>,
    pub verbose: bool,
}

impl SubstOptions {
    /// Substitution runs only when something is allowed.
    pub fn is_enabled(&self) -> bool {
        !self.allowed_vars.is_empty() || !self.allowed_prefixes.is_empty()
    }

    /// Builds the strict engine these options describe.
    pub fn engine(&self) -> Envsubst {
        Envsubst::new(
            self.allowed_vars.iter().cloned(),
            self.allowed_prefixes.iter().cloned(),
            true,
        )
        .with_verbose(self.verbose)
    }
}

/// Reads, substitutes and parses the patch file at `path`, then fills in the
/// default labels of named groups.
pub fn read_patch_file(path: impl AsRef<Path>, opts: &SubstOptions) -> Result<PatchFile> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_patch_file(&raw, &path.display().to_string(), opts, |name| {
        std::env::var(name).ok()
    })
}

/// Same as [`read_patch_file`], on text already in memory and with an explicit
/// variable lookup.
pub fn parse_patch_file<F>(
    raw: &str,
    what: &str,
    opts: &SubstOptions,
    lookup: F,
) -> Result<PatchFile>
where
    F: Fn(&str) -> Option<String>,
{
    let text = if opts.is_enabled() {
        opts.engine().substitute_with(raw, lookup)?
    } else {
        raw.to_string()
    };

    let mut patch_file = PatchFile::from_yaml(&text).map_err(|e| Error::parse(what, e))?;
    patch_file.apply_default_labels();

    debug!(
        file = what,
        groups = patch_file.patches.len(),
        operations = patch_file.operation_count(),
        "loaded patch file"
    );
    Ok(patch_file)
}
