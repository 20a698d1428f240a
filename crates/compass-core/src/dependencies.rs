//! Dependency extraction from AMD `define`/`require` calls
//!
//! Walks a parsed module for the first `define(...)`, `require(...)` or
//! `requirejs(...)` call carrying a literal dependency array, and zips the
//! factory's formal parameters against the module paths by position.

use swc_ecma_ast::{ArrayLit, CallExpr, Callee, Expr, Lit, Pat};
use swc_ecma_visit::{Visit, VisitWith};

use crate::parser::ParsedModule;

/// One positional `(parameter name, module path)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyBinding {
    pub name: String,
    pub path: String,
}

/// Ordered bindings extracted from exactly one dependency-declaring call.
///
/// `paths` keeps the full dependency list in declaration order, including
/// trailing paths that no factory parameter binds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyTable {
    bindings: Vec<DependencyBinding>,
    paths: Vec<String>,
}

impl DependencyTable {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| binding.path.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Every declared module path, bound or not.
    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

/// Extracts the dependency table from the first matching call in the tree.
/// Modules without a recognizable call yield an empty table.
pub fn extract_dependencies(parsed: &ParsedModule) -> DependencyTable {
    let mut visitor = DependencyVisitor { table: None };
    parsed.module().visit_with(&mut visitor);
    visitor.table.unwrap_or_default()
}

struct DependencyVisitor {
    table: Option<DependencyTable>,
}

impl Visit for DependencyVisitor {
    fn visit_call_expr(&mut self, call: &CallExpr) {
        if self.table.is_some() {
            return;
        }
        if let Some(table) = table_from_call(call) {
            self.table = Some(table);
            return;
        }
        call.visit_children_with(self);
    }
}

fn table_from_call(call: &CallExpr) -> Option<DependencyTable> {
    let callee = match &call.callee {
        Callee::Expr(expr) => expr,
        _ => return None,
    };
    match &**callee {
        Expr::Ident(ident) if matches!(&*ident.sym, "define" | "require" | "requirejs") => {}
        _ => return None,
    }

    // Shapes: (paths, factory), (name, paths, factory), (paths).
    let (paths_arg, factory_arg) = match call.args.first().map(|arg| &*arg.expr) {
        Some(Expr::Array(array)) => (array, call.args.get(1)),
        Some(Expr::Lit(Lit::Str(_))) => match call.args.get(1).map(|arg| &*arg.expr) {
            Some(Expr::Array(array)) => (array, call.args.get(2)),
            _ => return None,
        },
        _ => return None,
    };

    let path_slots = literal_paths(paths_arg);
    let paths: Vec<String> = path_slots.iter().flatten().cloned().collect();

    let params = factory_arg
        .map(|arg| factory_params(&arg.expr))
        .unwrap_or_default();

    let bindings = params
        .into_iter()
        .enumerate()
        .filter_map(|(index, name)| {
            let name = name?;
            let path = path_slots.get(index)?.clone()?;
            Some(DependencyBinding { name, path })
        })
        .collect();

    Some(DependencyTable { bindings, paths })
}

/// Module paths by position; non-string-literal entries occupy their slot
/// but produce no path.
fn literal_paths(array: &ArrayLit) -> Vec<Option<String>> {
    array
        .elems
        .iter()
        .map(|elem| match elem {
            Some(element) => match &*element.expr {
                Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
                _ => None,
            },
            None => None,
        })
        .collect()
}

/// Formal parameter names by position; destructured parameters occupy
/// their slot but produce no name.
fn factory_params(factory: &Expr) -> Vec<Option<String>> {
    let pats: Vec<&Pat> = match factory {
        Expr::Fn(fn_expr) => fn_expr.function.params.iter().map(|p| &p.pat).collect(),
        Expr::Arrow(arrow) => arrow.params.iter().collect(),
        _ => return Vec::new(),
    };
    pats.into_iter()
        .map(|pat| match pat {
            Pat::Ident(binding) => Some(binding.id.sym.to_string()),
            _ => None,
        })
        .collect()
}
