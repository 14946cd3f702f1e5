//! Guarded `$VAR` / `${VAR}` substitution.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeSet;
use thiserror::Error;
use tracing::info;

/// Matches `${NAME}` or `$NAME`. Anything else after a `$` is not a token.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .expect("token pattern is valid")
});

/// SubstitutionError lists the allowed variables that stayed unresolved in
/// strict mode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("undefined variables: [{}]", names.join(", "))]
pub struct SubstitutionError {
    /// Sorted, deduplicated variable names.
    pub names: Vec<String>,
}

/// Envsubst substitutes only the variables that were explicitly allowed, by
/// exact name or by prefix.
///
/// Any other `$NAME` in the text is left alone, which keeps shell scripts and
/// nginx configs embedded in manifests intact.
#[derive(Debug, Clone, Default)]
pub struct Envsubst {
    allowed_vars: BTreeSet<String>,
    allowed_prefixes: Vec<String>,
    strict: bool,
    verbose: bool,
}

impl Envsubst {
    /// Creates a new substitution engine.
    pub fn new<V, P>(allowed_vars: V, allowed_prefixes: P, strict: bool) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Envsubst {
            allowed_vars: allowed_vars.into_iter().map(Into::into).collect(),
            allowed_prefixes: allowed_prefixes.into_iter().map(Into::into).collect(),
            strict,
            verbose: false,
        }
    }

    /// Enables logging of unresolved variables that are not allowed.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Returns true if `name` may be substituted.
    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed_vars.contains(name)
            || self
                .allowed_prefixes
                .iter()
                .any(|prefix| name.starts_with(prefix.as_str()))
    }

    /// Substitutes allowed variables from the process environment.
    pub fn substitute(&self, text: &str) -> Result<String, SubstitutionError> {
        self.substitute_with(text, |name| std::env::var(name).ok())
    }

    /// Substitutes allowed variables, resolving values through `lookup`.
    pub fn substitute_with<F>(&self, text: &str, lookup: F) -> Result<String, SubstitutionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let substituted = TOKEN_RE.replace_all(text, |caps: &Captures| {
            let name = token_name(caps);
            if self.is_allowed(name) {
                if let Some(value) = lookup(name) {
                    return value;
                }
            }
            caps[0].to_string()
        });

        let (eligible, ineligible): (BTreeSet<&str>, BTreeSet<&str>) =
            unresolved(&substituted).partition(|name| self.is_allowed(name));

        if self.strict && !eligible.is_empty() {
            return Err(SubstitutionError {
                names: eligible.into_iter().map(String::from).collect(),
            });
        }

        if self.verbose {
            for name in &ineligible {
                info!(
                    variable = name,
                    "unresolved variable is not in the allow list and remains unchanged"
                );
            }
        }

        Ok(substituted.into_owned())
    }
}

fn token_name<'t>(caps: &Captures<'t>) -> &'t str {
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str())
        .unwrap_or_default()
}

/// Returns the names of every token still present in `text`.
pub fn unresolved(text: &str) -> impl Iterator<Item = &str> {
    TOKEN_RE.captures_iter(text).map(|caps| token_name(&caps))
}
