//! The definition-resolution pipeline
//!
//! `provide_definition` chains the whole query: current-file parse,
//! dependency extraction, identifier resolution and binding (all
//! CPU-bound, through the versioned caches), then target-file acquisition
//! (the only I/O point) and target parse/search. Expected dead ends —
//! parse errors in the current file, no identifier at the caret, no
//! binding — yield `Ok(None)`; only target-file I/O failure propagates.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::cache::VersionedCache;
use crate::config::{RequireConfig, ResolverConfig};
use crate::dependencies::{DependencyTable, extract_dependencies};
use crate::host::Host;
use crate::locator::find_identifier;
use crate::parser::{ParsedModule, Parser, Position, SourceRange};
use crate::paths::PathResolver;
use crate::resolver::{bind, reference_at};

/// Navigation target: a file, optionally narrowed to the range of the
/// matching identifier. Callers fall back to file start when `range` is
/// absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub path: PathBuf,
    pub range: Option<SourceRange>,
}

#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    #[error("Failed to read target module '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub struct DefinitionProvider<H: Host> {
    host: H,
    config: ResolverConfig,
    parser: Parser,
    paths: PathResolver,
    trees: VersionedCache<PathBuf, ParsedModule>,
    tables: VersionedCache<PathBuf, DependencyTable>,
}

impl<H: Host> DefinitionProvider<H> {
    /// The RequireJS configuration file, when configured, is parsed once
    /// here; a missing or unparsable file degrades to no override.
    pub fn new(host: H, config: ResolverConfig) -> Self {
        let require_config = config
            .require_config
            .as_deref()
            .and_then(RequireConfig::load);
        let paths = PathResolver::new(&config, require_config.as_ref());
        let capacity = config.cache_capacity;
        Self {
            host,
            config,
            parser: Parser::new(),
            paths,
            trees: VersionedCache::new(capacity),
            tables: VersionedCache::new(capacity),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Clears all cached trees and tables. Wired to configuration-change
    /// notifications by the host.
    pub fn invalidate(&mut self) {
        self.trees.clear();
        self.tables.clear();
    }

    /// Resolves "go to definition" for the identifier starting at
    /// `position` (1-based line, 0-based column) in the given source
    /// snapshot.
    pub fn provide_definition(
        &mut self,
        file: &Path,
        text: &str,
        revision: u64,
        position: Position,
    ) -> Result<Option<ResolvedLocation>, DefinitionError> {
        let started = self.config.log_timing.then(Instant::now);

        let result = self.lookup(file, text, revision, position);

        if let Some(started) = started {
            debug!(
                file = %file.display(),
                line = position.line,
                column = position.column,
                elapsed_us = started.elapsed().as_micros() as u64,
                "definition query finished"
            );
        }
        result
    }

    fn lookup(
        &mut self,
        file: &Path,
        text: &str,
        revision: u64,
        position: Position,
    ) -> Result<Option<ResolvedLocation>, DefinitionError> {
        let Some(tree) = self.parse_cached(file, text, revision) else {
            return Ok(None);
        };
        let table = self.table_cached(file, revision, &tree);

        let Some(reference) = reference_at(&tree, position) else {
            debug!(file = %file.display(), "no identifier at caret");
            return Ok(None);
        };
        let Some(binding) = bind(&tree, &table, &reference) else {
            debug!(
                selected = %reference.selected,
                imported = %reference.imported,
                "no dependency binding for identifier"
            );
            return Ok(None);
        };

        let target = self.paths.resolve(&binding.module_path, file);
        debug!(
            module_path = %binding.module_path,
            target = %target.display(),
            "resolved module path"
        );

        let (content, target_revision) =
            self.host
                .fetch(&target)
                .map_err(|source| DefinitionError::Io {
                    path: target.clone(),
                    source,
                })?;

        // A target that fails to parse still navigates to file start.
        let Some(target_tree) = self.parse_cached(&target, &content, target_revision) else {
            return Ok(Some(ResolvedLocation {
                path: target,
                range: None,
            }));
        };

        let range = if self.config.navigate_to_file_only {
            None
        } else {
            binding
                .search_for
                .as_deref()
                .and_then(|name| find_identifier(&target_tree, name))
        };

        Ok(Some(ResolvedLocation {
            path: target,
            range,
        }))
    }

    fn parse_cached(&mut self, file: &Path, text: &str, revision: u64) -> Option<Arc<ParsedModule>> {
        let key = file.to_path_buf();
        if let Some(tree) = self.trees.get(&key, revision) {
            return Some(tree);
        }
        match self.parser.parse(text) {
            Ok(parsed) => {
                let tree = Arc::new(parsed);
                self.trees.insert(key, revision, Arc::clone(&tree));
                Some(tree)
            }
            Err(error) => {
                debug!(file = %file.display(), %error, "parse failed");
                None
            }
        }
    }

    fn table_cached(
        &mut self,
        file: &Path,
        revision: u64,
        tree: &ParsedModule,
    ) -> Arc<DependencyTable> {
        let key = file.to_path_buf();
        if let Some(table) = self.tables.get(&key, revision) {
            return table;
        }
        let table = Arc::new(extract_dependencies(tree));
        self.tables.insert(key, revision, Arc::clone(&table));
        table
    }

    #[cfg(test)]
    pub(crate) fn cached_tree_count(&self) -> usize {
        self.trees.len()
    }

    #[cfg(test)]
    pub(crate) fn cached_table(
        &mut self,
        file: &Path,
        revision: u64,
    ) -> Option<Arc<DependencyTable>> {
        self.tables.get(&file.to_path_buf(), revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io;

    /// In-memory host that counts fetches per path.
    struct MapHost {
        files: HashMap<PathBuf, (String, u64)>,
        fetches: RefCell<usize>,
    }

    impl MapHost {
        fn new() -> Self {
            Self {
                files: HashMap::new(),
                fetches: RefCell::new(0),
            }
        }

        fn with(mut self, path: &str, content: &str) -> Self {
            self.files
                .insert(PathBuf::from(path), (content.to_string(), 1));
            self
        }

        fn fetch_count(&self) -> usize {
            *self.fetches.borrow()
        }
    }

    impl Host for MapHost {
        fn fetch(&self, path: &Path) -> io::Result<(String, u64)> {
            *self.fetches.borrow_mut() += 1;
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "missing"))
        }
    }

    fn provider(host: MapHost) -> DefinitionProvider<MapHost> {
        let config = ResolverConfig {
            module_root: PathBuf::from("/project/src"),
            ..Default::default()
        };
        DefinitionProvider::new(host, config)
    }

    const MAIN: &str =
        "define(['lib/foo'], function(foo) {\n  foo.setup();\n});";
    const FOO: &str = "define([], function() {\n  return {\n    setup: function() {}\n  };\n});";

    #[test]
    fn member_access_navigates_to_exported_name() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let mut provider = provider(host);

        let location = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                MAIN,
                1,
                Position::new(2, 6),
            )
            .unwrap()
            .unwrap();

        assert_eq!(location.path, PathBuf::from("/project/src/lib/foo.js"));
        let range = location.range.unwrap();
        assert_eq!(range.start, Position::new(3, 4));
    }

    #[test]
    fn missing_symbol_in_target_falls_back_to_file_start() {
        let host = MapHost::new().with("/project/src/lib/foo.js", "define([], function() {});");
        let mut provider = provider(host);

        let location = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                MAIN,
                1,
                Position::new(2, 6),
            )
            .unwrap()
            .unwrap();

        assert_eq!(location.path, PathBuf::from("/project/src/lib/foo.js"));
        assert!(location.range.is_none());
    }

    #[test]
    fn unparsable_target_falls_back_to_file_start() {
        let host = MapHost::new().with("/project/src/lib/foo.js", "define(['a'], function( {");
        let mut provider = provider(host);

        let location = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                MAIN,
                1,
                Position::new(2, 6),
            )
            .unwrap()
            .unwrap();

        assert!(location.range.is_none());
    }

    #[test]
    fn missing_target_file_propagates_io_error() {
        let mut provider = provider(MapHost::new());

        let result = provider.provide_definition(
            Path::new("/project/src/main.js"),
            MAIN,
            1,
            Position::new(2, 6),
        );

        assert!(matches!(result, Err(DefinitionError::Io { .. })));
    }

    #[test]
    fn caret_off_identifier_yields_none() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let mut provider = provider(host);

        let result = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                MAIN,
                1,
                Position::new(1, 6),
            )
            .unwrap();

        assert!(result.is_none());
        assert_eq!(provider.host.fetch_count(), 0);
    }

    #[test]
    fn unparsable_current_file_yields_none() {
        let mut provider = provider(MapHost::new());

        let result = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                "define(['a'], function( {",
                1,
                Position::new(1, 0),
            )
            .unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn repeated_queries_reuse_cached_trees() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let mut provider = provider(host);
        let main = Path::new("/project/src/main.js");

        provider
            .provide_definition(main, MAIN, 7, Position::new(2, 6))
            .unwrap();
        let trees_after_first = provider.cached_tree_count();
        provider
            .provide_definition(main, MAIN, 7, Position::new(2, 2))
            .unwrap();

        // Same revision: no new tree entries.
        assert_eq!(provider.cached_tree_count(), trees_after_first);
    }

    #[test]
    fn repeated_queries_reuse_cached_tables() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let mut provider = provider(host);
        let main = Path::new("/project/src/main.js");

        provider
            .provide_definition(main, MAIN, 7, Position::new(2, 6))
            .unwrap();
        let first = provider.cached_table(main, 7).unwrap();

        provider
            .provide_definition(main, MAIN, 7, Position::new(2, 2))
            .unwrap();
        let second = provider.cached_table(main, 7).unwrap();

        // Same revision: the exact table instance answers both queries.
        // Re-extraction would have inserted a fresh one.
        assert!(Arc::ptr_eq(&first, &second));

        provider
            .provide_definition(main, MAIN, 8, Position::new(2, 6))
            .unwrap();
        let replaced = provider.cached_table(main, 8).unwrap();
        assert!(!Arc::ptr_eq(&first, &replaced));
    }

    #[test]
    fn non_ascii_line_content_does_not_shift_columns() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let mut provider = provider(host);

        // 'é' is one UTF-16 unit but two bytes; `setup` sits at column 19.
        let text = "define(['lib/foo'], function(foo) {\n  var s = 'é'; foo.setup();\n});";
        let location = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                text,
                1,
                Position::new(2, 19),
            )
            .unwrap()
            .unwrap();

        assert_eq!(location.path, PathBuf::from("/project/src/lib/foo.js"));
        assert_eq!(location.range.unwrap().start, Position::new(3, 4));
    }

    #[test]
    fn revision_bump_forces_reparse() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let mut provider = provider(host);
        let main = Path::new("/project/src/main.js");

        provider
            .provide_definition(main, MAIN, 1, Position::new(2, 6))
            .unwrap();

        // Edit the source and bump the revision; the stale tree must not
        // answer the new query.
        let edited = "define(['lib/foo'], function(foo) {\n  var f = foo;\n  f.setup();\n});";
        let location = provider
            .provide_definition(main, edited, 2, Position::new(3, 4))
            .unwrap()
            .unwrap();

        assert_eq!(location.path, PathBuf::from("/project/src/lib/foo.js"));
        assert!(location.range.is_some());
    }

    #[test]
    fn navigate_to_file_only_skips_symbol_search() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let config = ResolverConfig {
            module_root: PathBuf::from("/project/src"),
            navigate_to_file_only: true,
            ..Default::default()
        };
        let mut provider = DefinitionProvider::new(host, config);

        let location = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                MAIN,
                1,
                Position::new(2, 6),
            )
            .unwrap()
            .unwrap();

        assert!(location.range.is_none());
    }

    #[test]
    fn inline_require_resolves_without_table_entry() {
        let host = MapHost::new().with(
            "/project/src/lib/util.js",
            "define([], function() {\n  return { format: function() {} };\n});",
        );
        let mut provider = provider(host);

        let location = provider
            .provide_definition(
                Path::new("/project/src/main.js"),
                "require('lib/util').format();",
                1,
                Position::new(1, 20),
            )
            .unwrap()
            .unwrap();

        assert_eq!(location.path, PathBuf::from("/project/src/lib/util.js"));
        let range = location.range.unwrap();
        assert_eq!(range.start, Position::new(2, 11));
    }

    #[test]
    fn invalidate_clears_cached_state() {
        let host = MapHost::new().with("/project/src/lib/foo.js", FOO);
        let mut provider = provider(host);
        let main = Path::new("/project/src/main.js");

        provider
            .provide_definition(main, MAIN, 1, Position::new(2, 6))
            .unwrap();
        assert!(provider.cached_tree_count() > 0);

        provider.invalidate();
        assert_eq!(provider.cached_tree_count(), 0);
    }
}
