//! Tokenizer for Python source.
//!
//! Tree-sitter recovers from bad input without saying where Python's own
//! compiler would complain, so reported positions are derived from this
//! token stream. Errors that stop Python's tokenizer outright are kept apart
//! from those that only compete on position with parser errors.

use std::cmp::Ordering;
use std::ops::ControlFlow;

use crate::diagnostic::{Diagnostic, Position, to_u32};

const TAB_SIZE: usize = 8;

/// Reserved words; soft keywords such as `match` are plain names.
const KEYWORDS: [&str; 35] = [
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Longest spellings first, so a prefix never shadows a longer operator.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "**", "//", ">>", "<<", "<=", ">=", "==", "!=", "->", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", ":=", "<>", "+", "-", "*", "/", "%", "&", "|",
    "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ";", ".", "=", "@",
];

/// Keywords Python accepts straight after a number, as in `1if x else 2`.
const NUMBER_SUFFIX_KEYWORDS: [&str; 8] = ["and", "else", "for", "if", "in", "is", "not", "or"];

const LEADING_ZEROS: &str = "leading zeros in decimal integer literals are not permitted; \
                             use an 0o prefix for octal integers";

/// Whether `word` is a reserved word.
pub(crate) fn is_reserved(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TokenKind {
    Name,
    Number,
    String,
    Op,
    /// An ASCII character Python has no use for, such as `$`.
    Unknown,
    Newline,
    Indent,
    Dedent,
    EndMarker,
}

impl TokenKind {
    /// Whether the token stands for source text rather than layout.
    pub(crate) const fn is_significant(self) -> bool {
        !matches!(
            self,
            Self::Newline | Self::Indent | Self::Dedent | Self::EndMarker
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub(crate) kind: TokenKind,
    pub(crate) text: &'a str,
    /// Byte offset of the first character.
    pub(crate) start: usize,
    pub(crate) at: Position,
    /// Brackets open before the token.
    pub(crate) depth: usize,
}

impl Token<'_> {
    pub(crate) fn is_op(&self, op: &str) -> bool {
        self.kind == TokenKind::Op && self.text == op
    }

    pub(crate) fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Name && self.text == word
    }

    /// The reserved word this token spells, if any.
    pub(crate) fn keyword(&self) -> Option<&str> {
        (self.kind == TokenKind::Name && is_reserved(self.text)).then_some(self.text)
    }

    pub(crate) fn is_identifier(&self) -> bool {
        self.kind == TokenKind::Name && !is_reserved(self.text)
    }

    /// Whether an atom such as a name, literal or constant starts here.
    pub(crate) fn starts_atom(&self) -> bool {
        match self.kind {
            TokenKind::Name => {
                !is_reserved(self.text) || matches!(self.text, "True" | "False" | "None")
            }
            TokenKind::Number | TokenKind::String => true,
            _ => false,
        }
    }

    /// Whether an expression can end with this token.
    pub(crate) fn ends_expression(&self) -> bool {
        self.starts_atom()
            || (self.kind == TokenKind::Op && matches!(self.text, ")" | "]" | "}"))
    }

    /// Position just past the last character.
    pub(crate) fn end(&self) -> Position {
        self.text.rsplit_once('\n').map_or_else(
            || {
                let width = to_u32(self.text.chars().count());
                Position::new(self.at.line, self.at.column.saturating_add(width))
            },
            |(head, tail)| {
                let lines = to_u32(head.matches('\n').count().saturating_add(1));
                let width = to_u32(tail.chars().count().saturating_add(1));
                Position::new(self.at.line.saturating_add(lines), width)
            },
        )
    }
}

/// Token stream plus everything the tokenizer noticed on the way.
#[derive(Debug, Default)]
pub(crate) struct Lexed<'a> {
    pub(crate) tokens: Vec<Token<'a>>,
    /// Error that stopped tokenizing; it outranks every other finding.
    pub(crate) fatal: Option<Diagnostic>,
    /// Errors competing on position with the parser's.
    pub(crate) positional: Vec<Diagnostic>,
    /// Innermost bracket still open at the end of input.
    pub(crate) unclosed: Option<Diagnostic>,
    /// Where Python reports problems found at the end of input.
    pub(crate) eof: Position,
    /// Whether tokenizing reached the end of input.
    pub(crate) complete: bool,
}

impl<'a> Lexed<'a> {
    pub(crate) fn last_significant(&self) -> Option<&Token<'a>> {
        self.tokens
            .iter()
            .rev()
            .find(|token| token.kind.is_significant())
    }
}

/// Splits `source` into tokens, stopping at the first error Python's
/// tokenizer would raise.
pub(crate) fn lex(source: &str) -> Lexed<'_> {
    let mut lexer = Lexer::new(source);
    if lexer.run().is_continue() {
        lexer.finish();
    }
    lexer.out
}

/// Where errors at the end of input are reported: on the final newline if
/// there is one, otherwise just past the last character.
fn eof_anchor(source: &str) -> Position {
    let body = source.strip_suffix('\n').unwrap_or(source);
    Position::of_offset(body, body.len())
}

/// Indentation width with tab stops of eight, and with each tab counted
/// as one column. Python requires both to agree on the nesting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Indentation {
    column: usize,
    alternate: usize,
}

impl Indentation {
    /// Measures leading whitespace, returning the width and its byte length.
    fn measure(text: &str) -> (Self, usize) {
        let mut width = Self::default();
        let mut len = 0;
        for c in text.chars() {
            match c {
                ' ' => {
                    width.column += 1;
                    width.alternate += 1;
                }
                '\t' => {
                    width.column = (width.column + 1).next_multiple_of(TAB_SIZE);
                    width.alternate += 1;
                }
                '\x0c' => width = Self::default(),
                _ => break,
            }
            len += 1;
        }
        (width, len)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bracket {
    opener: char,
    at: Position,
}

struct Lexer<'a> {
    source: &'a str,
    pos: usize,
    line: u32,
    line_start: usize,
    indents: Vec<Indentation>,
    brackets: Vec<Bracket>,
    line_has_tokens: bool,
    at_line_start: bool,
    comment: Option<(usize, Position)>,
    out: Lexed<'a>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            line: 1,
            line_start: 0,
            indents: vec![Indentation::default()],
            brackets: Vec::new(),
            line_has_tokens: false,
            at_line_start: true,
            comment: None,
            out: Lexed {
                eof: eof_anchor(source),
                ..Lexed::default()
            },
        }
    }

    fn rest(&self) -> &'a str {
        self.source.get(self.pos..).unwrap_or_default()
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn column(&self, offset: usize) -> u32 {
        let width = self
            .source
            .get(self.line_start..offset)
            .map_or(0, |text| text.chars().count());
        to_u32(width.saturating_add(1))
    }

    fn position(&self, offset: usize) -> Position {
        Position::new(self.line, self.column(offset))
    }

    fn line_end(&self) -> usize {
        self.rest()
            .find(['\r', '\n'])
            .map_or(self.source.len(), |len| self.pos + len)
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let at = self.position(start);
        self.push_at(kind, start, end, at);
    }

    fn push_at(&mut self, kind: TokenKind, start: usize, end: usize, at: Position) {
        if kind.is_significant() {
            self.line_has_tokens = true;
        }
        self.out.tokens.push(Token {
            kind,
            text: self.source.get(start..end).unwrap_or_default(),
            start,
            at,
            depth: self.brackets.len(),
        });
    }

    /// Records an error that ends tokenizing and outranks all others.
    fn fail(&mut self, at: Position, message: impl Into<String>) -> ControlFlow<()> {
        self.out.fatal = Some(Diagnostic::new(at, message));
        ControlFlow::Break(())
    }

    /// Records an indentation error; the tokens so far are still checked.
    fn stop(&mut self, at: Position, message: &str) -> ControlFlow<()> {
        self.out.positional.push(Diagnostic::new(at, message));
        ControlFlow::Break(())
    }

    fn run(&mut self) -> ControlFlow<()> {
        loop {
            if self.at_line_start && self.brackets.is_empty() {
                self.at_line_start = false;
                self.indentation()?;
            }
            let Some(c) = self.peek() else {
                return ControlFlow::Continue(());
            };
            self.token(c)?;
        }
    }

    fn token(&mut self, c: char) -> ControlFlow<()> {
        match c {
            ' ' | '\t' | '\x0c' => {
                self.pos += 1;
                ControlFlow::Continue(())
            }
            '#' => {
                self.comment = Some((self.pos, self.position(self.pos)));
                self.pos = self.line_end();
                ControlFlow::Continue(())
            }
            '\r' | '\n' => {
                self.newline();
                ControlFlow::Continue(())
            }
            '\\' => self.continuation(),
            '\'' | '"' => self.string(self.pos),
            '0'..='9' => self.number(),
            '.' if self.rest().as_bytes().get(1).is_some_and(u8::is_ascii_digit) => {
                self.number()
            }
            _ if c == '_' || c.is_alphabetic() => self.name(),
            _ => self.operator(c),
        }
    }

    fn indentation(&mut self) -> ControlFlow<()> {
        let start = self.pos;
        let (width, len) = Indentation::measure(self.rest());
        self.pos += len;
        if matches!(self.peek(), None | Some('#' | '\r' | '\n')) {
            return ControlFlow::Continue(());
        }

        let top = self.indents.last().copied().unwrap_or_default();
        match width.column.cmp(&top.column) {
            Ordering::Equal if width.alternate != top.alternate => self.tab_error(),
            Ordering::Greater if width.alternate <= top.alternate => self.tab_error(),
            Ordering::Equal => ControlFlow::Continue(()),
            Ordering::Greater => {
                self.indents.push(width);
                // Python reports an unexpected indent at the indentation width.
                let at = Position::new(self.line, to_u32(len));
                self.push_at(TokenKind::Indent, start, self.pos, at);
                ControlFlow::Continue(())
            }
            Ordering::Less => self.dedent(width),
        }
    }

    fn dedent(&mut self, width: Indentation) -> ControlFlow<()> {
        while self.indents.len() > 1
            && self
                .indents
                .last()
                .is_some_and(|top| width.column < top.column)
        {
            self.indents.pop();
            self.push(TokenKind::Dedent, self.pos, self.pos);
        }

        let top = self.indents.last().copied().unwrap_or_default();
        if width.column != top.column {
            let at = self.position(self.line_end());
            return self.stop(at, "unindent does not match any outer indentation level");
        }
        if width.alternate != top.alternate {
            return self.tab_error();
        }
        ControlFlow::Continue(())
    }

    fn tab_error(&mut self) -> ControlFlow<()> {
        let at = Position::new(self.line, 1);
        self.stop(at, "inconsistent use of tabs and spaces in indentation")
    }

    fn newline(&mut self) {
        let start = self.pos;
        self.pos += if self.rest().starts_with("\r\n") { 2 } else { 1 };
        if self.brackets.is_empty() && self.line_has_tokens {
            // A trailing comment is where Python places the end of the line.
            let line = self.line;
            let (offset, at) = self
                .comment
                .filter(|(_, at)| at.line == line)
                .unwrap_or_else(|| (start, self.position(start)));
            self.push_at(TokenKind::Newline, offset, offset, at);
            self.line_has_tokens = false;
        }
        self.line = self.line.saturating_add(1);
        self.line_start = self.pos;
        if self.brackets.is_empty() {
            self.at_line_start = true;
        }
    }

    fn continuation(&mut self) -> ControlFlow<()> {
        let at = self.position(self.pos + 1);
        let after = self.source.get(self.pos + 1..).unwrap_or_default();
        let skip = if after.starts_with("\r\n") {
            2
        } else if after.starts_with(['\r', '\n']) {
            1
        } else if after.is_empty() {
            return self.fail(at, "unexpected EOF while parsing");
        } else {
            return self.fail(
                at,
                "unexpected character after line continuation character",
            );
        };

        self.pos += 1 + skip;
        self.line = self.line.saturating_add(1);
        self.line_start = self.pos;
        if self.pos >= self.source.len() {
            return self.fail(at, "unexpected EOF while parsing");
        }
        ControlFlow::Continue(())
    }

    fn name(&mut self) -> ControlFlow<()> {
        let start = self.pos;
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c == '_' || c.is_alphanumeric()))
            .unwrap_or(rest.len());
        self.pos += len;
        let word = rest.get(..len).unwrap_or_default();
        if is_string_prefix(word) && matches!(self.peek(), Some('\'' | '"')) {
            return self.string(start);
        }
        self.push(TokenKind::Name, start, self.pos);
        ControlFlow::Continue(())
    }

    /// Scans a string literal whose prefix starts at `start`; the opening
    /// quote is at the current position.
    fn string(&mut self, start: usize) -> ControlFlow<()> {
        let source = self.source;
        let at = self.position(start);
        let quote = if self.rest().starts_with('"') { '"' } else { '\'' };
        let triple = self.rest().starts_with(closing_quotes(quote, true));
        let closing = closing_quotes(quote, triple);
        let body = self.pos + closing.len();
        let mut line = self.line;
        let mut line_start = self.line_start;
        let mut chars = source
            .get(body..)
            .unwrap_or_default()
            .char_indices()
            .peekable();

        let end = loop {
            let Some((offset, c)) = chars.next() else {
                return self.unterminated(at, triple, line);
            };
            let here = body + offset;
            match c {
                '\\' => match chars.next() {
                    Some((next, '\n')) => {
                        line = line.saturating_add(1);
                        line_start = body + next + 1;
                    }
                    Some((next, '\r')) => {
                        let lf = chars.next_if(|&(_, following)| following == '\n');
                        line = line.saturating_add(1);
                        line_start = body + lf.map_or(next, |(lf_at, _)| lf_at) + 1;
                    }
                    Some(_) => {}
                    None => return self.unterminated(at, triple, line),
                },
                _ if c == quote
                    && source
                        .get(here..)
                        .is_some_and(|tail| tail.starts_with(closing)) =>
                {
                    break here + closing.len();
                }
                '\n' if triple => {
                    line = line.saturating_add(1);
                    line_start = here + 1;
                }
                '\r' | '\n' if !triple => return self.unterminated(at, false, line),
                _ => {}
            }
        };

        self.push_at(TokenKind::String, start, end, at);
        self.pos = end;
        self.line = line;
        self.line_start = line_start;
        ControlFlow::Continue(())
    }

    fn unterminated(&mut self, at: Position, triple: bool, line: u32) -> ControlFlow<()> {
        let message = if triple {
            // A final newline belongs to the line it ends.
            let last = if self.source.ends_with('\n') && line > at.line {
                line - 1
            } else {
                line
            };
            format!("unterminated triple-quoted string literal (detected at line {last})")
        } else {
            format!("unterminated string literal (detected at line {line})")
        };
        self.fail(at, message)
    }

    fn number(&mut self) -> ControlFlow<()> {
        let start = self.pos;
        match scan_number(self.source, start) {
            Ok(end) => {
                self.push(TokenKind::Number, start, end);
                self.pos = end;
                ControlFlow::Continue(())
            }
            Err(error) => {
                let at = self.position(error.offset);
                self.fail(at, error.message)
            }
        }
    }

    fn operator(&mut self, c: char) -> ControlFlow<()> {
        let start = self.pos;
        let rest = self.rest();
        let Some(op) = OPERATORS.iter().copied().find(|op| rest.starts_with(op)) else {
            return self.unknown(c);
        };
        match op {
            "(" | "[" | "{" => {
                let at = self.position(start);
                self.push(TokenKind::Op, start, start + 1);
                self.brackets.push(Bracket { opener: c, at });
            }
            ")" | "]" | "}" => return self.close(c),
            _ => {
                if op == "<>" {
                    let at = self.position(start);
                    self.out.positional.push(Diagnostic::invalid_syntax(at));
                }
                self.push(TokenKind::Op, start, start + op.len());
            }
        }
        self.pos = start + op.len();
        ControlFlow::Continue(())
    }

    fn close(&mut self, closer: char) -> ControlFlow<()> {
        let at = self.position(self.pos);
        let Some(open) = self.brackets.last().copied() else {
            return self.fail(at, format!("unmatched '{closer}'"));
        };
        if open.opener != matching_opener(closer) {
            let opener = open.opener;
            let message = if open.at.line == at.line {
                format!("closing parenthesis '{closer}' does not match opening parenthesis '{opener}'")
            } else {
                format!(
                    "closing parenthesis '{closer}' does not match opening parenthesis \
                     '{opener}' on line {}",
                    open.at.line
                )
            };
            return self.fail(at, message);
        }
        self.brackets.pop();
        self.push(TokenKind::Op, self.pos, self.pos + 1);
        self.pos += 1;
        ControlFlow::Continue(())
    }

    fn unknown(&mut self, c: char) -> ControlFlow<()> {
        let at = self.position(self.pos);
        let code = u32::from(c);
        if is_non_printable(c) {
            return self.fail(at, format!("invalid non-printable character U+{code:04X}"));
        }
        if !c.is_ascii() {
            return self.fail(at, format!("invalid character '{c}' (U+{code:04X})"));
        }
        self.out.positional.push(Diagnostic::invalid_syntax(at));
        let end = self.pos + c.len_utf8();
        self.push(TokenKind::Unknown, self.pos, end);
        self.pos = end;
        ControlFlow::Continue(())
    }

    fn finish(&mut self) {
        if let Some(open) = self.brackets.last() {
            let message = format!("'{}' was never closed", open.opener);
            self.out.unclosed = Some(Diagnostic::new(open.at, message));
        }
        let end = self.source.len();
        if self.line_has_tokens {
            self.push(TokenKind::Newline, end, end);
        }
        for _ in 1..self.indents.len() {
            self.push(TokenKind::Dedent, end, end);
        }
        self.push(TokenKind::EndMarker, end, end);
        self.out.complete = true;
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

const fn closing_quotes(quote: char, triple: bool) -> &'static str {
    match (quote, triple) {
        ('"', true) => "\"\"\"",
        ('"', false) => "\"",
        (_, true) => "'''",
        (_, false) => "'",
    }
}

const fn matching_opener(closer: char) -> char {
    match closer {
        ')' => '(',
        ']' => '[',
        _ => '{',
    }
}

fn is_non_printable(c: char) -> bool {
    c.is_control()
        || (!c.is_ascii() && c.is_whitespace())
        || matches!(
            c,
            '\u{ad}' | '\u{200b}'..='\u{200f}' | '\u{202a}'..='\u{202e}' | '\u{2060}'..='\u{2064}'
                | '\u{feff}'
        )
}

#[derive(Debug, Clone, Copy)]
enum Radix {
    Hexadecimal,
    Octal,
    Binary,
}

impl Radix {
    const fn from_marker(marker: u8) -> Option<Self> {
        match marker {
            b'x' | b'X' => Some(Self::Hexadecimal),
            b'o' | b'O' => Some(Self::Octal),
            b'b' | b'B' => Some(Self::Binary),
            _ => None,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Hexadecimal => "hexadecimal",
            Self::Octal => "octal",
            Self::Binary => "binary",
        }
    }

    const fn accepts(self, digit: u8) -> bool {
        match self {
            Self::Hexadecimal => digit.is_ascii_hexdigit(),
            Self::Octal => matches!(digit, b'0'..=b'7'),
            Self::Binary => matches!(digit, b'0' | b'1'),
        }
    }
}

#[derive(Debug)]
struct NumberError {
    offset: usize,
    message: String,
}

impl NumberError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }

    /// Python points one character before whatever broke the literal.
    fn before(offset: usize, message: impl Into<String>) -> Self {
        Self::new(offset.saturating_sub(1), message)
    }
}

/// Scans the numeric literal at `start`, returning its end offset.
fn scan_number(source: &str, start: usize) -> Result<usize, NumberError> {
    let bytes = source.as_bytes();
    if let Some(radix) = bytes
        .get(start + 1)
        .copied()
        .and_then(Radix::from_marker)
        .filter(|_| bytes.get(start) == Some(&b'0'))
    {
        return scan_radix(source, start + 2, radix);
    }

    let int_end = skip_digits(bytes, start, u8::is_ascii_digit);
    let mut end = int_end;
    let mut fractional = false;
    if bytes.get(end) == Some(&b'.') {
        fractional = true;
        end = skip_digits(bytes, end + 1, u8::is_ascii_digit);
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let sign = usize::from(matches!(bytes.get(end + 1), Some(b'+' | b'-')));
        let exponent = end + 1 + sign;
        if bytes.get(exponent).is_some_and(u8::is_ascii_digit) {
            fractional = true;
            end = skip_digits(bytes, exponent, u8::is_ascii_digit);
        } else if !keyword_follows(source, end) {
            return Err(NumberError::before(end, "invalid decimal literal"));
        }
    }
    let imaginary = matches!(bytes.get(end), Some(b'j' | b'J'));
    if imaginary {
        end += 1;
    }
    if identifier_follows(source, end) && !keyword_follows(source, end) {
        return Err(NumberError::before(end, "invalid decimal literal"));
    }

    let digits = source.get(start..int_end).unwrap_or_default();
    let nonzero = digits.contains(|c: char| c.is_ascii_digit() && c != '0');
    if !fractional && !imaginary && digits.starts_with('0') && nonzero {
        return Err(NumberError::new(start, LEADING_ZEROS));
    }
    Ok(end)
}

fn scan_radix(source: &str, digits_start: usize, radix: Radix) -> Result<usize, NumberError> {
    let bytes = source.as_bytes();
    let end = skip_digits(bytes, digits_start, |digit| radix.accepts(*digit));
    if let Some(digit) = bytes.get(end).copied().filter(u8::is_ascii_digit) {
        let message = format!(
            "invalid digit '{}' in {} literal",
            char::from(digit),
            radix.name()
        );
        return Err(NumberError::new(end, message));
    }
    if end == digits_start || (identifier_follows(source, end) && !keyword_follows(source, end)) {
        return Err(NumberError::before(
            end,
            format!("invalid {} literal", radix.name()),
        ));
    }
    Ok(end)
}

/// End of a run of digits accepted by `accepts`, with `_` separators.
fn skip_digits(bytes: &[u8], from: usize, accepts: impl Fn(&u8) -> bool) -> usize {
    let len = bytes.get(from..).map_or(0, |rest| {
        rest.iter()
            .take_while(|&byte| *byte == b'_' || accepts(byte))
            .count()
    });
    from + len
}

fn identifier_follows(source: &str, offset: usize) -> bool {
    source
        .get(offset..)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == '_' || c.is_alphanumeric())
}

fn keyword_follows(source: &str, offset: usize) -> bool {
    source.get(offset..).is_some_and(|rest| {
        NUMBER_SUFFIX_KEYWORDS
            .iter()
            .any(|keyword| rest.starts_with(keyword))
    })
}
