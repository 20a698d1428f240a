//! Identifier search inside a target module
//!
//! Finds the source range of the first occurrence of an exported name in a
//! parsed target file, in source order. Object-literal keys and member
//! property names count as occurrences.

use swc_common::{Span, Spanned};
use swc_ecma_ast::{Ident, IdentName};
use swc_ecma_visit::{Visit, VisitWith};

use crate::parser::{ParsedModule, SourceRange};

pub fn find_identifier(parsed: &ParsedModule, name: &str) -> Option<SourceRange> {
    let mut visitor = IdentifierFinder { name, found: None };
    parsed.module().visit_with(&mut visitor);
    visitor.found.map(|span| parsed.range_of(span))
}

struct IdentifierFinder<'a> {
    name: &'a str,
    found: Option<Span>,
}

impl Visit for IdentifierFinder<'_> {
    fn visit_ident(&mut self, ident: &Ident) {
        if self.found.is_some() {
            return;
        }
        if &*ident.sym == self.name {
            self.found = Some(ident.span());
        }
    }

    fn visit_ident_name(&mut self, ident: &IdentName) {
        if self.found.is_some() {
            return;
        }
        if &*ident.sym == self.name {
            self.found = Some(ident.span());
        }
    }
}
