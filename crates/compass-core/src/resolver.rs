//! Caret-to-import resolution
//!
//! Maps a caret position onto the identifier under it, decides which
//! imported name that identifier logically refers to (direct use, member
//! access, or a chain of local reassignments), and binds it to a module
//! path from the dependency table.

use std::collections::HashSet;

use swc_common::BytePos;
use swc_ecma_ast::{
    AssignExpr, AssignOp, AssignTarget, Callee, Expr, Lit, MemberExpr, MemberProp, Pat,
    SimpleAssignTarget, VarDeclarator,
};
use swc_ecma_visit::{Visit, VisitWith};

use crate::dependencies::DependencyTable;
use crate::parser::{ParsedModule, Position};

/// A resolved caret selection.
///
/// `selected` is the identifier under the caret; `imported` is the name to
/// look up in the dependency table (the object's name for `obj.member`
/// selections). `module_path` is set only for the inline
/// `require('mod').member` short-circuit, which needs no table lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierReference {
    pub selected: String,
    pub imported: String,
    pub module_path: Option<String>,
    pub member_access: bool,
    pub position: BytePos,
}

/// A table hit: the module path to navigate to and the exported name to
/// search for in the target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBinding {
    pub module_path: String,
    pub search_for: Option<String>,
}

/// Finds the innermost identifier whose start equals `position` exactly.
/// Not every caret position sits on an identifier; those yield `None`.
pub fn reference_at(parsed: &ParsedModule, position: Position) -> Option<IdentifierReference> {
    let target = parsed.position_at(position)?;
    let mut visitor = ReferenceVisitor {
        target,
        found: None,
    };
    parsed.module().visit_with(&mut visitor);
    visitor.found
}

/// Binds a reference to a dependency-table entry, following local
/// reassignment chains (`var local = imported;`, `x = new Thing()`) that
/// precede the point of use. Cycles terminate as "no binding".
pub fn bind(
    parsed: &ParsedModule,
    table: &DependencyTable,
    reference: &IdentifierReference,
) -> Option<ResolvedBinding> {
    if let Some(path) = &reference.module_path {
        return Some(ResolvedBinding {
            module_path: path.clone(),
            search_for: Some(reference.selected.clone()),
        });
    }

    let mut current = reference.imported.clone();
    let mut seen: HashSet<String> = HashSet::new();
    loop {
        if let Some(path) = table.get(&current) {
            // A rename chain on a plain selection retargets the searched
            // name to the final resolved one.
            let search_for = if reference.member_access {
                reference.selected.clone()
            } else {
                current.clone()
            };
            return Some(ResolvedBinding {
                module_path: path.to_string(),
                search_for: Some(search_for),
            });
        }
        if !seen.insert(current.clone()) {
            return None;
        }
        current = find_rename(parsed, &current, reference.position)?;
    }
}

struct ReferenceVisitor {
    target: BytePos,
    found: Option<IdentifierReference>,
}

impl Visit for ReferenceVisitor {
    fn visit_ident(&mut self, ident: &swc_ecma_ast::Ident) {
        if self.found.is_some() {
            return;
        }
        if ident.span.lo == self.target {
            let name = ident.sym.to_string();
            self.found = Some(IdentifierReference {
                selected: name.clone(),
                imported: name,
                module_path: None,
                member_access: false,
                position: ident.span.lo,
            });
        }
    }

    fn visit_member_expr(&mut self, member: &MemberExpr) {
        if self.found.is_some() {
            return;
        }
        if let MemberProp::Ident(prop) = &member.prop {
            if prop.span.lo == self.target {
                self.found = Some(member_reference(member, prop));
                return;
            }
        }
        member.visit_children_with(self);
    }
}

fn member_reference(member: &MemberExpr, prop: &swc_ecma_ast::IdentName) -> IdentifierReference {
    let selected = prop.sym.to_string();

    if let Some(path) = inline_require_path(&member.obj) {
        return IdentifierReference {
            imported: selected.clone(),
            selected,
            module_path: Some(path),
            member_access: true,
            position: prop.span.lo,
        };
    }

    let imported = match &*member.obj {
        Expr::Ident(object) => object.sym.to_string(),
        _ => selected.clone(),
    };
    let member_access = matches!(&*member.obj, Expr::Ident(_));

    IdentifierReference {
        selected,
        imported,
        module_path: None,
        member_access,
        position: prop.span.lo,
    }
}

/// `require('mod')` / `requirejs('mod')` with exactly one string-literal
/// argument, used as the object of a member access.
fn inline_require_path(object: &Expr) -> Option<String> {
    let call = match object {
        Expr::Call(call) => call,
        _ => return None,
    };
    let callee = match &call.callee {
        Callee::Expr(expr) => expr,
        _ => return None,
    };
    match &**callee {
        Expr::Ident(ident) if matches!(&*ident.sym, "require" | "requirejs") => {}
        _ => return None,
    }
    if call.args.len() != 1 {
        return None;
    }
    match &*call.args[0].expr {
        Expr::Lit(Lit::Str(s)) => Some(s.value.to_string()),
        _ => None,
    }
}

/// First `name = otherIdent` or `name = new OtherIdent(...)` declared or
/// assigned strictly before `before`.
fn find_rename(parsed: &ParsedModule, name: &str, before: BytePos) -> Option<String> {
    let mut visitor = RenameVisitor {
        name,
        before,
        found: None,
    };
    parsed.module().visit_with(&mut visitor);
    visitor.found
}

struct RenameVisitor<'a> {
    name: &'a str,
    before: BytePos,
    found: Option<String>,
}

impl Visit for RenameVisitor<'_> {
    fn visit_var_declarator(&mut self, declarator: &VarDeclarator) {
        if self.found.is_some() || declarator.span.lo >= self.before {
            return;
        }
        if let Pat::Ident(binding) = &declarator.name {
            if &*binding.id.sym == self.name {
                if let Some(init) = &declarator.init {
                    if let Some(origin) = rename_origin(init) {
                        self.found = Some(origin);
                        return;
                    }
                }
            }
        }
        declarator.visit_children_with(self);
    }

    fn visit_assign_expr(&mut self, assign: &AssignExpr) {
        if self.found.is_some() || assign.span.lo >= self.before {
            return;
        }
        if assign.op == AssignOp::Assign {
            if let AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) = &assign.left {
                if &*binding.id.sym == self.name {
                    if let Some(origin) = rename_origin(&assign.right) {
                        self.found = Some(origin);
                        return;
                    }
                }
            }
        }
        assign.visit_children_with(self);
    }
}

fn rename_origin(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::New(new_expr) => match &*new_expr.callee {
            Expr::Ident(ident) => Some(ident.sym.to_string()),
            _ => None,
        },
        _ => None,
    }
}
