//! End-to-end definition queries against an on-disk project tree.

use std::fs;
use std::path::PathBuf;

use compass_core::config::ResolverConfig;
use compass_core::{DefinitionError, DefinitionProvider, FsHost, Position};

struct Project {
    _dir: tempfile::TempDir,
    root: PathBuf,
}

impl Project {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("lib")).unwrap();
        Self { _dir: dir, root }
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn provider(&self) -> DefinitionProvider<FsHost> {
        let config = ResolverConfig {
            module_root: self.root.clone(),
            ..Default::default()
        };
        DefinitionProvider::new(FsHost, config)
    }
}

const WIDGET: &str = "define([], function() {\n  return {\n    render: function() {},\n    destroy: function() {}\n  };\n});";

#[test]
fn member_access_resolves_across_files() {
    let project = Project::new();
    let widget = project.write("lib/widget.js", WIDGET);
    let main = project.write(
        "main.js",
        "define(['lib/widget'], function(widget) {\n  widget.destroy();\n});",
    );
    let text = fs::read_to_string(&main).unwrap();

    let mut provider = project.provider();
    let location = provider
        .provide_definition(&main, &text, 1, Position::new(2, 9))
        .unwrap()
        .unwrap();

    assert_eq!(location.path, widget);
    let range = location.range.unwrap();
    assert_eq!(range.start, Position::new(4, 4));
}

#[test]
fn relative_dependency_resolves_against_current_directory() {
    let project = Project::new();
    let sibling = project.write("app/helper.js", "function assist() {}");
    let main = project.write(
        "app/main.js",
        "define(['./helper'], function(helper) {\n  helper();\n});",
    );
    let text = fs::read_to_string(&main).unwrap();

    let mut provider = project.provider();
    let location = provider
        .provide_definition(&main, &text, 1, Position::new(2, 2))
        .unwrap()
        .unwrap();

    assert_eq!(location.path, sibling);
}

#[test]
fn reassigned_local_resolves_through_the_chain() {
    let project = Project::new();
    project.write("lib/widget.js", WIDGET);
    let main = project.write(
        "main.js",
        "define(['lib/widget'], function(widget) {\n  var w = widget;\n  w.render();\n});",
    );
    let text = fs::read_to_string(&main).unwrap();

    let mut provider = project.provider();
    let location = provider
        .provide_definition(&main, &text, 1, Position::new(3, 4))
        .unwrap()
        .unwrap();

    let range = location.range.unwrap();
    assert_eq!(range.start, Position::new(3, 4));
}

#[test]
fn inline_require_navigates_to_member() {
    let project = Project::new();
    let widget = project.write("lib/widget.js", WIDGET);
    let main = project.write("main.js", "require('lib/widget').render();");
    let text = fs::read_to_string(&main).unwrap();

    let mut provider = project.provider();
    let location = provider
        .provide_definition(&main, &text, 1, Position::new(1, 22))
        .unwrap()
        .unwrap();

    assert_eq!(location.path, widget);
    assert_eq!(location.range.unwrap().start, Position::new(3, 4));
}

#[test]
fn plugin_dependency_navigates_to_the_raw_file() {
    let project = Project::new();
    let template = project.write("tmpl/row.html", "<tr></tr>");
    let main = project.write(
        "main.js",
        "define(['text!tmpl/row.html'], function(rowTemplate) {\n  rowTemplate.trim();\n});",
    );
    let text = fs::read_to_string(&main).unwrap();

    let mut config = ResolverConfig {
        module_root: project.root.clone(),
        ..Default::default()
    };
    config
        .plugin_extensions
        .insert("text".to_string(), ".html".to_string());
    let mut provider = DefinitionProvider::new(FsHost, config);

    // Caret on `rowTemplate`; the HTML file does not parse as a module,
    // so navigation falls back to file start.
    let location = provider
        .provide_definition(&main, &text, 1, Position::new(2, 2))
        .unwrap()
        .unwrap();

    assert_eq!(location.path, template);
    assert!(location.range.is_none());
}

#[test]
fn missing_target_file_is_an_io_error() {
    let project = Project::new();
    let main = project.write(
        "main.js",
        "define(['lib/gone'], function(gone) {\n  gone.run();\n});",
    );
    let text = fs::read_to_string(&main).unwrap();

    let mut provider = project.provider();
    let result = provider.provide_definition(&main, &text, 1, Position::new(2, 7));

    assert!(matches!(result, Err(DefinitionError::Io { .. })));
}

#[test]
fn navigate_to_file_only_returns_no_range() {
    let project = Project::new();
    let widget = project.write("lib/widget.js", WIDGET);
    let main = project.write(
        "main.js",
        "define(['lib/widget'], function(widget) {\n  widget.render();\n});",
    );
    let text = fs::read_to_string(&main).unwrap();

    let config = ResolverConfig {
        module_root: project.root.clone(),
        navigate_to_file_only: true,
        ..Default::default()
    };
    let mut provider = DefinitionProvider::new(FsHost, config);

    let location = provider
        .provide_definition(&main, &text, 1, Position::new(2, 9))
        .unwrap()
        .unwrap();

    assert_eq!(location.path, widget);
    assert!(location.range.is_none());
}

#[test]
fn base_url_from_require_config_overrides_module_root() {
    let project = Project::new();
    project.write("scripts/lib/api.js", "define([], function() {\n  return { call: function() {} };\n});");
    let require_config = project.write(
        "require.config.js",
        "requirejs.config({\n  \"baseUrl\": \"scripts\"\n});",
    );
    let main = project.write(
        "main.js",
        "define(['lib/api'], function(api) {\n  api.call();\n});",
    );
    let text = fs::read_to_string(&main).unwrap();

    let config = ResolverConfig {
        module_root: project.root.clone(),
        require_config: Some(require_config),
        ..Default::default()
    };
    let mut provider = DefinitionProvider::new(FsHost, config);

    let location = provider
        .provide_definition(&main, &text, 1, Position::new(2, 6))
        .unwrap()
        .unwrap();

    assert_eq!(location.path, project.root.join("scripts/lib/api.js"));
    assert!(location.range.is_some());
}
