//! Module-path to file-path resolution
//!
//! Turns a logical AMD module path (including loader-plugin `plugin!target`
//! syntax, relative specs and `paths` aliases) into a concrete file path.
//! Resolution never fails; malformed specs degrade to the best-effort path.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::config::{RequireConfig, ResolverConfig};

#[derive(Debug, Clone)]
pub struct PathResolver {
    module_root: PathBuf,
    plugin_extensions: HashMap<String, String>,
    aliases: HashMap<String, String>,
}

impl PathResolver {
    pub fn new(config: &ResolverConfig, require_config: Option<&RequireConfig>) -> Self {
        let mut module_root = config.module_root.clone();
        let mut aliases = HashMap::new();

        if let Some(require_config) = require_config {
            if let Some(base_url) = &require_config.base_url {
                module_root = join_base_url(&module_root, base_url);
            }
            aliases = require_config.paths.clone();
        }

        Self {
            module_root,
            plugin_extensions: config.plugin_extensions.clone(),
            aliases,
        }
    }

    pub fn module_root(&self) -> &Path {
        &self.module_root
    }

    /// Resolves `module_path` to a file path, relative specs against the
    /// directory of `current_file`, everything else against the module root.
    pub fn resolve(&self, module_path: &str, current_file: &Path) -> PathBuf {
        let (plugin, target) = match module_path.split_once('!') {
            Some((plugin, target)) => (Some(plugin), target),
            None => (None, module_path),
        };

        let mut spec = if is_relative(target) {
            target.to_string()
        } else {
            self.apply_alias(target)
        };

        match plugin {
            Some(plugin) => {
                if let Some(extension) = self.plugin_extensions.get(plugin) {
                    if !spec.ends_with(extension.as_str()) {
                        spec.push_str(extension);
                    }
                }
                // Unconfigured plugins keep the target spec exactly as given.
            }
            None => {
                if !spec.ends_with(".js") {
                    spec.push_str(".js");
                }
            }
        }

        let resolved = if is_relative(&spec) {
            let base = current_file.parent().unwrap_or_else(|| Path::new(""));
            base.join(&spec)
        } else {
            self.module_root.join(&spec)
        };

        normalize(&resolved)
    }

    /// RequireJS `paths` aliases apply to the first segment of a bare
    /// module id (or the whole id).
    fn apply_alias(&self, spec: &str) -> String {
        if let Some(replacement) = self.aliases.get(spec) {
            return replacement.clone();
        }
        if let Some((head, rest)) = spec.split_once('/') {
            if let Some(replacement) = self.aliases.get(head) {
                return format!("{replacement}/{rest}");
            }
        }
        spec.to_string()
    }
}

fn is_relative(spec: &str) -> bool {
    spec.starts_with("./") || spec.starts_with("../")
}

fn join_base_url(module_root: &Path, base_url: &str) -> PathBuf {
    let base = Path::new(base_url);
    if base.is_absolute() {
        base.to_path_buf()
    } else {
        module_root.join(base)
    }
}

/// Lexical normalization: drops `.` components and folds `..` into the
/// preceding segment where possible.
fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !result.pop() {
                    result.push(Component::ParentDir);
                }
            }
            other => result.push(other),
        }
    }
    result
}
