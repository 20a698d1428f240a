//! Parser module for AMD/RequireJS module source code
//!
//! Integrates with SWC for parsing source files into AST, annotated with
//! the position conventions used throughout the crate (1-based lines,
//! 0-based UTF-16 columns, as LSP clients count them).

use std::ops::Range;
use std::sync::OnceLock;

use swc_common::sync::Lrc;
use swc_common::{BytePos, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::Module;
use swc_ecma_parser::{StringInput, Syntax, lexer::Lexer};

/// A point in a source file. Lines are 1-based; columns are 0-based and
/// counted in UTF-16 code units, the units LSP clients send and expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A half-open source range between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceRange {
    pub start: Position,
    pub end: Position,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} at {line}:{column}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// An immutable parsed snapshot of one module source text.
///
/// Owns the source and the AST; never mutated after creation. Cache entries
/// hand these out behind an `Arc`.
pub struct ParsedModule {
    source: String,
    module: Module,
    start_pos: BytePos,
    line_offsets: OnceLock<Vec<usize>>,
}

impl std::fmt::Debug for ParsedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsedModule")
            .field("source_len", &self.source.len())
            .field("items", &self.module.body.len())
            .finish()
    }
}

impl ParsedModule {
    pub fn module(&self) -> &Module {
        &self.module
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Byte position of `position` in this module, or `None` when the line
    /// does not exist or the column runs past the end of the line. The
    /// UTF-16 column is converted to a byte offset against the line text.
    pub fn position_at(&self, position: Position) -> Option<BytePos> {
        if position.line == 0 {
            return None;
        }
        let offsets = self.line_offsets();
        let index = (position.line - 1) as usize;
        let start = *offsets.get(index)?;
        let end = offsets
            .get(index + 1)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        let byte_in_line = utf16_to_byte_offset(&self.source[start..end], position.column)?;
        Some(BytePos(self.start_pos.0 + (start + byte_in_line) as u32))
    }

    /// Line/column of a byte position produced by this module's spans.
    pub fn location_of(&self, pos: BytePos) -> Position {
        let rel = (pos.0.saturating_sub(self.start_pos.0)) as usize;
        let rel = rel.min(self.source.len());
        let offsets = self.line_offsets();
        let line = match offsets.binary_search(&rel) {
            Ok(index) => index,
            Err(index) => index.saturating_sub(1),
        };
        Position {
            line: line as u32 + 1,
            column: utf16_len(&self.source[offsets[line]..rel]),
        }
    }

    pub fn range_of(&self, span: Span) -> SourceRange {
        SourceRange {
            start: self.location_of(span.lo),
            end: self.location_of(span.hi),
        }
    }

    fn line_offsets(&self) -> &[usize] {
        self.line_offsets.get_or_init(|| {
            let mut offsets = vec![0];
            for (i, c) in self.source.char_indices() {
                if c == '\n' {
                    offsets.push(i + 1);
                }
            }
            offsets
        })
    }

    #[allow(dead_code)]
    fn line_range(&self, line_number: usize) -> Option<Range<usize>> {
        if line_number == 0 {
            return None;
        }
        let offsets = self.line_offsets();
        let start = *offsets.get(line_number - 1)?;
        let end = offsets
            .get(line_number)
            .map(|next| next - 1)
            .unwrap_or(self.source.len());
        Some(start..end)
    }
}

/// Thin wrapper over the SWC ES parser. Parsing is a deterministic, pure
/// function of the source text.
#[derive(Debug, Clone)]
pub struct Parser {
    syntax: Syntax,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            syntax: Syntax::Es(Default::default()),
        }
    }

    pub fn parse(&self, code: &str) -> Result<ParsedModule, ParseError> {
        let source_map: Lrc<SourceMap> = Default::default();
        let fm = source_map
            .new_source_file(FileName::Custom("input.js".into()).into(), code.to_string());

        let lexer = Lexer::new(
            self.syntax,
            Default::default(),
            StringInput::from(&*fm),
            None,
        );

        let mut parser = swc_ecma_parser::Parser::new_from(lexer);

        let module = parser.parse_module().map_err(|e| {
            let span = e.span();
            let loc = source_map.lookup_char_pos(span.lo);
            ParseError {
                line: loc.line,
                column: loc.col_display,
                message: e.kind().msg().to_string(),
            }
        })?;

        Ok(ParsedModule {
            source: code.to_string(),
            module,
            start_pos: fm.start_pos,
            line_offsets: OnceLock::new(),
        })
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper for one-off parses.
pub fn parse(code: &str) -> Result<ParsedModule, ParseError> {
    Parser::new().parse(code)
}

fn utf16_len(text: &str) -> u32 {
    text.chars().map(|c| c.len_utf16() as u32).sum()
}

/// Byte offset of a UTF-16 column inside `line`. `None` when the column
/// runs past the end of the line or lands inside a surrogate pair.
fn utf16_to_byte_offset(line: &str, column: u32) -> Option<usize> {
    let mut units = 0u32;
    for (offset, c) in line.char_indices() {
        if units == column {
            return Some(offset);
        }
        if units > column {
            return None;
        }
        units += c.len_utf16() as u32;
    }
    if units == column { Some(line.len()) } else { None }
}
