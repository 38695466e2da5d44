//! Checks on the shape of logical lines: indented blocks, clause order and
//! the headers of compound statements.
//!
//! Tree-sitter accepts many of these mistakes silently or buries them in a
//! large ERROR node, while Python reports them at a precise token.

use crate::diagnostic::{Diagnostic, INVALID_SYNTAX, Position};
use crate::lexer::{Lexed, Token, TokenKind};

/// Statements that open an indented block.
const COMPOUND: [&str; 11] = [
    "if", "elif", "else", "while", "for", "try", "except", "finally", "with", "def", "class",
];

/// Operators that may start an expression statement.
const STATEMENT_OPERATORS: [&str; 10] = ["(", "[", "{", "-", "+", "~", "*", "@", "...", "**"];

/// Operators that cannot end a logical line.
const TRAILING_OPERATORS: [&str; 36] = [
    "=", "+=", "-=", "*=", "/=", "//=", "%=", "**=", "@=", "&=", "|=", "^=", ">>=", "<<=", ":=",
    "+", "-", "*", "/", "//", "%", "**", "@", "<<", ">>", "&", "|", "^", "~", "<", ">", "<=", ">=",
    "==", "!=", ".",
];

/// Keywords that cannot end a logical line.
const TRAILING_KEYWORDS: [&str; 15] = [
    "and", "or", "not", "in", "is", "if", "else", "import", "from", "as", "del", "global",
    "nonlocal", "assert", "lambda",
];

/// Findings of the layout pass.
#[derive(Debug, Default)]
pub(crate) struct LayoutFindings {
    /// A block or header error; Python reports these ahead of any later
    /// parser error.
    pub(crate) structural: Option<Diagnostic>,
    /// Stray operators and keywords, ranked with parser errors by position.
    pub(crate) soft: Vec<Diagnostic>,
}

/// One logical line: its leading indent and dedent tokens, then its body up
/// to and including the newline.
struct LogicalLine<'t, 'a> {
    lead: &'t [Token<'a>],
    body: &'t [Token<'a>],
}

impl LogicalLine<'_, '_> {
    fn indent(&self) -> Option<&Token<'_>> {
        self.lead
            .iter()
            .find(|token| token.kind == TokenKind::Indent)
    }

    fn depth_change(&self) -> (usize, usize) {
        let indents = self
            .lead
            .iter()
            .filter(|token| token.kind == TokenKind::Indent)
            .count();
        (indents, self.lead.len() - indents)
    }
}

fn logical_lines<'t, 'a>(tokens: &'t [Token<'a>]) -> Vec<LogicalLine<'t, 'a>> {
    let mut lines = Vec::new();
    let mut rest = tokens;
    loop {
        let lead_len = rest
            .iter()
            .take_while(|token| matches!(token.kind, TokenKind::Indent | TokenKind::Dedent))
            .count();
        let (lead, after) = rest.split_at(lead_len);
        if after
            .first()
            .is_none_or(|token| token.kind == TokenKind::EndMarker)
        {
            return lines;
        }
        let body_len = after
            .iter()
            .position(|token| token.kind == TokenKind::Newline)
            .map_or(after.len(), |newline| newline + 1);
        let (body, next) = after.split_at(body_len);
        lines.push(LogicalLine { lead, body });
        rest = next;
    }
}

/// A header ending in `:` whose block has not started yet.
struct OpenBlock {
    label: String,
    line: u32,
}

impl OpenBlock {
    fn expected_at(&self, at: Position) -> Diagnostic {
        Diagnostic::new(
            at,
            format!(
                "expected an indented block after {} on line {}",
                self.label, self.line
            ),
        )
    }
}

/// Runs the layout checks over the token stream.
pub(crate) fn check_layout(lexed: &Lexed<'_>) -> LayoutFindings {
    let mut findings = LayoutFindings::default();
    let mut walker = Walker::default();
    for line in logical_lines(&lexed.tokens) {
        if let Err(error) = walker.line(&line, &mut findings.soft) {
            findings.structural = Some(error);
            return findings;
        }
    }
    if lexed.complete {
        findings.structural = walker.open.map(|open| open.expected_at(lexed.eof));
    }
    findings
}

#[derive(Default)]
struct Walker<'a> {
    open: Option<OpenBlock>,
    depth: usize,
    /// Leading keyword of the latest line at each indentation depth.
    heads: Vec<Option<&'a str>>,
}

impl<'a> Walker<'a> {
    fn line(
        &mut self,
        line: &LogicalLine<'_, 'a>,
        soft: &mut Vec<Diagnostic>,
    ) -> Result<(), Diagnostic> {
        let tokens: Vec<&Token<'a>> = line
            .body
            .iter()
            .filter(|token| token.kind.is_significant())
            .collect();
        let Some(&&first_token) = tokens.first() else {
            return Ok(());
        };
        let (indents, dedents) = line.depth_change();
        self.depth = (self.depth + indents).saturating_sub(dedents);

        // `async def` and friends are checked as the statement they prefix.
        let header = match tokens.split_first() {
            Some((head, rest)) if head.is_keyword("async") && !rest.is_empty() => rest,
            _ => tokens.as_slice(),
        };
        let lead_word = header.first().map_or(first_token.text, |token| token.text);

        self.check_clause_order(&first_token)?;
        self.heads.resize(self.depth + 1, None);
        if let Some(slot) = self.heads.get_mut(self.depth) {
            *slot = Some(lead_word);
        }
        self.check_block_start(line, &first_token)?;
        check_definition(header)?;
        check_clause_colon(header)?;
        check_missing_colon(header, &tokens)?;
        soft.extend(stray_operators(line, &tokens));

        let ends_with_colon = tokens.last().is_some_and(|token| token.is_op(":"));
        self.open = (opens_block(header, &tokens) && ends_with_colon).then(|| OpenBlock {
            label: block_label(lead_word),
            line: first_token.at.line,
        });
        Ok(())
    }

    /// `elif`, `else`, `except` and `finally` must follow a matching clause at
    /// the same depth.
    fn check_clause_order(&mut self, first: &Token<'_>) -> Result<(), Diagnostic> {
        self.heads.truncate(self.depth + 1);
        let allowed: &[&str] = match first.keyword() {
            Some("elif") => &["if", "elif"],
            Some("else") => &["if", "elif", "for", "while", "except"],
            Some("except") => &["try", "except"],
            Some("finally") => &["try", "except", "else"],
            _ => return Ok(()),
        };
        let before = self.heads.get(self.depth).copied().flatten();
        if before.is_some_and(|word| allowed.contains(&word)) {
            Ok(())
        } else {
            Err(Diagnostic::invalid_syntax(first.at))
        }
    }

    fn check_block_start(
        &self,
        line: &LogicalLine<'_, '_>,
        first: &Token<'_>,
    ) -> Result<(), Diagnostic> {
        match (&self.open, line.indent()) {
            (Some(open), None) => Err(open.expected_at(first.at)),
            (None, Some(indent)) => Err(Diagnostic::new(indent.at, "unexpected indent")),
            _ => Ok(()),
        }
    }
}

fn block_label(head: &str) -> String {
    match head {
        "def" => String::from("function definition"),
        "class" => String::from("class definition"),
        _ => format!("'{head}' statement"),
    }
}

fn opens_block(header: &[&Token<'_>], tokens: &[&Token<'_>]) -> bool {
    let Some(first) = header.first() else {
        return false;
    };
    if first.kind != TokenKind::Name {
        return false;
    }
    if COMPOUND.contains(&first.text) {
        return true;
    }
    // Soft keywords only open a block when the line ends in a colon.
    matches!(first.text, "match" | "case") && tokens.last().is_some_and(|token| token.is_op(":"))
}

/// `def` must be followed by a name and a parameter list.
fn check_definition(header: &[&Token<'_>]) -> Result<(), Diagnostic> {
    let [def, rest @ ..] = header else {
        return Ok(());
    };
    if !def.is_keyword("def") {
        return Ok(());
    }
    let [name, rest @ ..] = rest else {
        return Ok(());
    };
    if !name.is_identifier() {
        return Err(Diagnostic::invalid_syntax(name.at));
    }
    let [open, rest @ ..] = rest else {
        return Ok(());
    };
    if !(open.is_op("(") || open.is_op("[")) {
        return Err(Diagnostic::new(open.at, "expected '('"));
    }
    match rest {
        [inner, names @ ..] if open.is_op("(") && inner.is_op("(") => {
            let message = if parenthesized_names(names) {
                "Function parameters cannot be parenthesized"
            } else {
                INVALID_SYNTAX
            };
            Err(Diagnostic::new(inner.at, message))
        }
        _ => Ok(()),
    }
}

/// Whether `names` reads `a, b)`: a parenthesized parameter list.
fn parenthesized_names(names: &[&Token<'_>]) -> bool {
    let mut tokens = names.iter().peekable();
    let mut seen_name = false;
    while let Some(token) = tokens.next() {
        if token.is_op(")") {
            return seen_name;
        }
        if !token.is_identifier() {
            return false;
        }
        seen_name = true;
        if tokens.next_if(|next| next.is_op(",")).is_none() {
            return tokens.next().is_some_and(|next| next.is_op(")"));
        }
    }
    false
}

/// `try`, `finally` and `else` take nothing before their colon.
fn check_clause_colon(header: &[&Token<'_>]) -> Result<(), Diagnostic> {
    let [keyword, next, ..] = header else {
        return Ok(());
    };
    let bare = matches!(keyword.keyword(), Some("try" | "finally" | "else"));
    if bare && !next.is_op(":") {
        return Err(Diagnostic::new(next.at, "expected ':'"));
    }
    Ok(())
}

/// A compound statement header needs a colon outside any brackets.
fn check_missing_colon(header: &[&Token<'_>], tokens: &[&Token<'_>]) -> Result<(), Diagnostic> {
    let is_compound = header
        .first()
        .and_then(|token| token.keyword())
        .is_some_and(|word| COMPOUND.contains(&word));
    if !is_compound {
        return Ok(());
    }
    if tokens
        .iter()
        .any(|token| token.depth == 0 && token.is_op(":"))
    {
        return Ok(());
    }
    let end = tokens.last().map_or_else(Position::default, |last| last.end());
    Err(Diagnostic::new(end, "expected ':'"))
}

/// Operators that cannot start or end a statement.
fn stray_operators(line: &LogicalLine<'_, '_>, tokens: &[&Token<'_>]) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    if let Some(first) = tokens
        .first()
        .filter(|token| token.kind == TokenKind::Op)
        .filter(|token| !STATEMENT_OPERATORS.contains(&token.text))
    {
        found.push(Diagnostic::invalid_syntax(first.at));
    }

    let trailing = match tokens {
        [.., before, last] if last.is_op("*") && before.is_keyword("import") => false,
        [.., last] => match last.kind {
            TokenKind::Op => TRAILING_OPERATORS.contains(&last.text),
            TokenKind::Name => TRAILING_KEYWORDS.contains(&last.text),
            _ => false,
        },
        [] => false,
    };
    if trailing && let Some(end) = line.body.last() {
        found.push(Diagnostic::invalid_syntax(end.at));
    }
    found
}
