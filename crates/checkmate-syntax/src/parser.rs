//! Tree-sitter parsing wrapper for Python sources.
//!
//! Tree-sitter is error-tolerant: it always produces a tree and marks the
//! unparseable regions with ERROR or MISSING nodes. [`ParseResult`] exposes
//! those nodes as they are, positioned at the start of the recovered region.
//! [`crate::check_source`] builds Python's own error report on top of them.

use std::ops::Range;

use tree_sitter::Node;

use crate::diagnostic::Diagnostic;
use crate::error::SyntaxError;

/// Longest context snippet, in bytes, before it is truncated.
const MAX_CONTEXT_LEN: usize = 50;

/// Result of parsing Python source.
#[derive(Debug)]
pub struct ParseResult {
    tree: tree_sitter::Tree,
    source: String,
}

impl ParseResult {
    /// Returns the parsed syntax tree.
    #[must_use]
    pub const fn tree(&self) -> &tree_sitter::Tree {
        &self.tree
    }

    /// Returns the source code that was parsed.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Returns whether the tree contains any ERROR or MISSING nodes.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        has_error_nodes(self.tree.root_node())
    }

    /// Collects every syntax error in document order.
    #[must_use]
    pub fn errors(&self) -> Vec<SyntaxErrorInfo> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &self.source, &mut errors);
        errors
    }

    /// Returns the earliest syntax error, if any.
    ///
    /// This is what the built-in check reports: later errors are frequently
    /// cascades of the first one.
    #[must_use]
    pub fn first_error(&self) -> Option<SyntaxErrorInfo> {
        first_error_node(self.tree.root_node())
            .map(|node| SyntaxErrorInfo::from_node(node, &self.source))
    }
}

/// A syntax error located in the parsed source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxErrorInfo {
    /// Byte range of the error in the source.
    pub byte_range: Range<usize>,
    /// Line number (one-based) where the error starts.
    pub line: u32,
    /// Column number (one-based) where the error starts.
    pub column: u32,
    /// A snippet of the problematic source text.
    pub context: String,
    /// Human-readable description of the error.
    pub message: String,
}

impl SyntaxErrorInfo {
    fn from_node(node: Node<'_>, source: &str) -> Self {
        let byte_range = node.byte_range();
        let context = source
            .get(byte_range.clone())
            .map(snippet)
            .unwrap_or_default();

        let message = if node.is_missing() {
            format!("missing {}", node.kind())
        } else {
            String::from("invalid syntax")
        };

        let (line, column) = point_to_one_based(node.start_position());

        Self {
            byte_range,
            line,
            column,
            context,
            message,
        }
    }

    /// Builds the report for `diagnostic`. The range covers the blamed
    /// character and the context is the line holding it.
    pub(crate) fn from_diagnostic(diagnostic: Diagnostic, source: &str) -> Self {
        let start = diagnostic.at.offset_in(source);
        let end = source
            .get(start..)
            .and_then(|rest| rest.chars().next())
            .map_or(start, |blamed| start + blamed.len_utf8());
        let line_start = source
            .get(..start)
            .and_then(|before| before.rfind('\n'))
            .map_or(0, |newline| newline + 1);
        let line_end = source
            .get(start..)
            .and_then(|rest| rest.find('\n'))
            .map_or(source.len(), |newline| start + newline);
        let context = source
            .get(line_start..line_end)
            .map(|text| snippet(text.trim()))
            .unwrap_or_default();

        Self {
            byte_range: start..end,
            line: diagnostic.at.line,
            column: diagnostic.at.column,
            context,
            message: diagnostic.message,
        }
    }
}

fn snippet(text: &str) -> String {
    if text.len() > MAX_CONTEXT_LEN {
        let truncated: String = text.chars().take(MAX_CONTEXT_LEN - 3).collect();
        format!("{truncated}...")
    } else {
        text.to_owned()
    }
}

/// Tree-sitter parser configured with the Python grammar.
pub struct PythonParser {
    inner: tree_sitter::Parser,
}

impl PythonParser {
    /// Creates a parser for Python source.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar is incompatible with the linked
    /// Tree-sitter runtime.
    pub fn new() -> Result<Self, SyntaxError> {
        let mut inner = tree_sitter::Parser::new();
        inner
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| SyntaxError::parser_init(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Parses `source` and returns the tree with its error metadata.
    ///
    /// # Errors
    ///
    /// Returns an error only when Tree-sitter yields no tree, which points
    /// at a parser configuration problem rather than bad input.
    pub fn parse(&mut self, source: &str) -> Result<ParseResult, SyntaxError> {
        let tree = self
            .inner
            .parse(source, None)
            .ok_or_else(|| SyntaxError::parse("parsing failed"))?;

        Ok(ParseResult {
            tree,
            source: source.to_owned(),
        })
    }
}

/// Converts a zero-based Tree-sitter point to one-based line and column.
fn point_to_one_based(pos: tree_sitter::Point) -> (u32, u32) {
    let line = u32::try_from(pos.row.saturating_add(1)).unwrap_or(u32::MAX);
    let column = u32::try_from(pos.column.saturating_add(1)).unwrap_or(u32::MAX);
    (line, column)
}

fn is_error_node(node: Node<'_>) -> bool {
    node.is_error() || node.is_missing()
}

/// Calls `visit` on every node under `root` in document order, together
/// with the node's ancestors from `root` down to its parent.
///
/// The walk keeps its own stack, so deeply nested expressions cannot
/// exhaust the call stack.
pub(crate) fn walk_tree<'t>(root: Node<'t>, mut visit: impl FnMut(Node<'t>, &[Node<'t>])) {
    let mut cursor = root.walk();
    let mut ancestors = Vec::new();
    loop {
        let node = cursor.node();
        visit(node, &ancestors);
        if cursor.goto_first_child() {
            ancestors.push(node);
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
            ancestors.pop();
        }
    }
}

/// First direct child of `node` whose kind is `kind`.
pub(crate) fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).find(|child| child.kind() == kind)
}

fn has_error_nodes(node: Node<'_>) -> bool {
    if is_error_node(node) {
        return true;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if has_error_nodes(child) {
            return true;
        }
    }

    false
}

/// Pre-order search, so the first hit is also the earliest in the source.
fn first_error_node(node: Node<'_>) -> Option<Node<'_>> {
    if is_error_node(node) {
        return Some(node);
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(found) = first_error_node(child) {
            return Some(found);
        }
    }

    None
}

fn collect_error_nodes(
    node: Node<'_>,
    source: &str,
    errors: &mut Vec<SyntaxErrorInfo>,
) {
    if is_error_node(node) {
        errors.push(SyntaxErrorInfo::from_node(node, source));
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, source, errors);
    }
}
