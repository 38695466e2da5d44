//! Placement of Tree-sitter error nodes at the token Python would blame.
//!
//! An ERROR node covers whatever Tree-sitter skipped to recover, which
//! usually starts well before the offending token. The rules below pick the
//! token from the node's surroundings instead.

use tree_sitter::Node;

use crate::diagnostic::{Diagnostic, Position};
use crate::lexer::{Token, TokenKind};

const COMMA_HINT: &str = "invalid syntax. Perhaps you forgot a comma?";
const ASSIGNMENT_HINT: &str = "invalid syntax. Maybe you meant '==' or ':=' instead of '='?";

/// Keywords that can begin a statement.
const STATEMENT_KEYWORDS: [&str; 26] = [
    "assert", "async", "await", "break", "class", "continue", "def", "del", "for", "from",
    "global", "if", "import", "lambda", "nonlocal", "not", "pass", "raise", "return", "try",
    "while", "with", "yield", "False", "None", "True",
];

/// Keywords that may appear inside an expression without ending it.
const EXPRESSION_KEYWORDS: [&str; 8] = ["not", "and", "or", "is", "await", "None", "True", "False"];

/// Operators that separate one expression from the next.
const BOUNDARY_OPERATORS: [&str; 19] = [
    ",", ":", "=", ":=", "->", ";", "+=", "-=", "*=", "/=", "//=", "%=", "**=", "@=", "&=", "|=",
    "^=", ">>=", "<<=",
];

/// Finds where Python reports the error Tree-sitter marked with `node`.
pub(crate) fn locate_error(node: Node<'_>, tokens: &[Token<'_>]) -> Option<Diagnostic> {
    let stream = TokenStream { tokens };
    if node.is_missing() {
        return stream.blame_from(node.start_byte());
    }
    let childless_error = |child: Node<'_>| child.is_error() && child.child_count() == 0;
    if let Some(inner) = first_descendant(node, &childless_error) {
        return stream.blame_from(inner.start_byte());
    }

    let inside: Vec<usize> = tokens
        .iter()
        .enumerate()
        .filter(|(_, token)| {
            token.kind.is_significant() && node.byte_range().contains(&token.start)
        })
        .map(|(index, _)| index)
        .collect();
    let Some(&first) = inside.first() else {
        return stream.blame_from(node.start_byte());
    };
    let previous = stream.previous(first);

    stream
        .unnamed_definition(&inside)
        .or_else(|| stream.assignment_in_condition(first, previous))
        .or_else(|| stream.juxtaposition(first, previous, &inside))
        .or_else(|| {
            (node.named_child_count() == 0)
                .then(|| stream.bare_tokens(first, previous))
                .flatten()
        })
        .or_else(|| stream.blame_from(node.end_byte()))
}

struct TokenStream<'t, 'a> {
    tokens: &'t [Token<'a>],
}

impl<'t, 'a> TokenStream<'t, 'a> {
    fn get(&self, index: usize) -> Option<&'t Token<'a>> {
        self.tokens.get(index)
    }

    /// `invalid syntax` at the first real token at or after `offset`.
    fn blame_from(&self, offset: usize) -> Option<Diagnostic> {
        self.tokens
            .iter()
            .find(|token| {
                token.start >= offset
                    && !matches!(token.kind, TokenKind::Indent | TokenKind::Dedent)
            })
            .map(|token| Diagnostic::invalid_syntax(token.at))
    }

    /// The significant token straight before `index`, ignoring layout tokens
    /// that share its offset.
    fn previous(&self, index: usize) -> Option<usize> {
        let start = self.get(index)?.start;
        let before = self.tokens.partition_point(|token| token.start < start);
        let candidate = before.checked_sub(1)?;
        self.get(candidate)
            .filter(|token| token.kind.is_significant())
            .map(|_| candidate)
    }

    /// `def` or `class` followed by something other than a name.
    fn unnamed_definition(&self, inside: &[usize]) -> Option<Diagnostic> {
        let [opener, following, ..] = inside else {
            return None;
        };
        let keyword = self.get(*opener)?;
        let name = self.get(*following)?;
        ((keyword.is_keyword("def") || keyword.is_keyword("class")) && !name.is_identifier())
            .then(|| Diagnostic::invalid_syntax(name.at))
    }

    /// `if x = 1:` and the like.
    fn assignment_in_condition(&self, first: usize, previous: Option<usize>) -> Option<Diagnostic> {
        let before = previous?;
        if !self.get(first)?.is_op("=") {
            return None;
        }
        let target = self.get(before)?;
        let lead = self.get(self.line_lead(before))?;
        ["if", "elif", "while"]
            .iter()
            .any(|keyword| lead.is_keyword(keyword))
            .then(|| Diagnostic::new(target.at, ASSIGNMENT_HINT))
    }

    /// Two expressions side by side, as in `f(a b)` or `x y`.
    fn juxtaposition(
        &self,
        first: usize,
        previous: Option<usize>,
        inside: &[usize],
    ) -> Option<Diagnostic> {
        let leading = previous.map(|before| (before, first));
        let pairs = inside.windows(2).filter_map(|pair| match pair {
            [left, right] => Some((*left, *right)),
            _ => None,
        });
        leading
            .into_iter()
            .chain(pairs)
            .find_map(|(left, right)| self.juxtaposed(left, right))
    }

    fn juxtaposed(&self, left: usize, right: usize) -> Option<Diagnostic> {
        let left_token = self.get(left)?;
        let right_token = self.get(right)?;
        if !(left_token.ends_expression()
            && right_token.starts_atom()
            && left_token.at.line == right_token.at.line)
        {
            return None;
        }
        if right_token.depth > 0
            && let Some((start, boundary)) = self.expression_start(left)
        {
            let after_default = boundary.is_some_and(|token| token.is_op("="));
            if !self.in_def_parameters(left) || after_default {
                return Some(Diagnostic::new(start.at, COMMA_HINT));
            }
        }
        Some(Diagnostic::invalid_syntax(right_token.at))
    }

    /// An ERROR node holding only tokens, such as a stray operator.
    fn bare_tokens(&self, first: usize, previous: Option<usize>) -> Option<Diagnostic> {
        let first_token = self.get(first)?;
        let blamed = previous.map_or_else(
            || {
                first_token
                    .keyword()
                    .is_some_and(|word| !STATEMENT_KEYWORDS.contains(&word))
            },
            |before| {
                self.get(before).is_some_and(|token| {
                    token.kind == TokenKind::Op && !matches!(token.text, "(" | "[" | "{")
                })
            },
        );
        blamed.then(|| Diagnostic::invalid_syntax(first_token.at))
    }

    /// First significant token of the logical line holding `index`.
    fn line_lead(&self, index: usize) -> usize {
        let mut lead = index;
        for before in (0..index).rev() {
            let Some(token) = self.get(before) else {
                break;
            };
            if token.kind == TokenKind::Newline {
                break;
            }
            if token.kind.is_significant() {
                lead = before;
            }
        }
        lead
    }

    /// Walks back from `index` to the start of its expression. Returns the
    /// first token of the expression and the token that bounds it, if any.
    fn expression_start(&self, index: usize) -> Option<(&'t Token<'a>, Option<&'t Token<'a>>)> {
        let depth = self.get(index)?.depth;
        let mut start = index;
        let mut boundary = None;
        while let Some(before) = start.checked_sub(1) {
            let Some(token) = self.get(before) else {
                break;
            };
            if !token.kind.is_significant() {
                break;
            }
            if token.depth < depth || (token.depth == depth && is_boundary(token)) {
                boundary = Some(token);
                break;
            }
            start = before;
        }
        self.get(start).map(|token| (token, boundary))
    }

    /// Whether `index` sits directly inside the parentheses of a `def`.
    fn in_def_parameters(&self, index: usize) -> bool {
        let depth = self.get(index).map_or(0, |token| token.depth);
        for before in (0..index).rev() {
            let Some(token) = self.get(before) else {
                return false;
            };
            if !token.kind.is_significant() {
                return false;
            }
            if token.depth < depth {
                let name = before.checked_sub(1).and_then(|at| self.get(at));
                let keyword = before.checked_sub(2).and_then(|at| self.get(at));
                return token.is_op("(")
                    && name.is_some_and(|found| found.kind == TokenKind::Name)
                    && keyword.is_some_and(|found| found.is_keyword("def"));
            }
        }
        false
    }
}

fn is_boundary(token: &Token<'_>) -> bool {
    (token.kind == TokenKind::Op && BOUNDARY_OPERATORS.contains(&token.text))
        || token
            .keyword()
            .is_some_and(|word| !EXPRESSION_KEYWORDS.contains(&word))
}

/// First descendant of `node`, in document order, accepted by `accepts`.
fn first_descendant<'t>(node: Node<'t>, accepts: &impl Fn(Node<'t>) -> bool) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if accepts(child) {
            return Some(child);
        }
        if let Some(found) = first_descendant(child, accepts) {
            return Some(found);
        }
    }
    None
}

/// Position where `node` starts.
pub(crate) fn node_position(source: &str, node: Node<'_>) -> Position {
    Position::of_offset(source, node.start_byte())
}
