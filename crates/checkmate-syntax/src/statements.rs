//! Findings read off the Tree-sitter parse.
//!
//! The grammar still accepts a few Python 2 statements, which Python 3
//! rejects with dedicated messages. Everything else comes from the first
//! ERROR or MISSING node.

use tree_sitter::Node;

use crate::diagnostic::{Diagnostic, INVALID_SYNTAX};
use crate::lexer::Token;
use crate::locate::{locate_error, node_position};
use crate::parser::{child_of_kind, walk_tree};

const MULTIPLE_EXCEPTIONS: &str = "multiple exception types must be parenthesized";

/// Positioned findings from the tree, in document order apart from the
/// located error node, which comes last.
pub(crate) fn tree_findings(
    root: Node<'_>,
    tokens: &[Token<'_>],
    source: &str,
) -> Vec<Diagnostic> {
    let mut findings = Vec::new();
    let mut first_error = None;
    walk_tree(root, |node, _| {
        if first_error.is_none() && (node.is_error() || node.is_missing()) {
            first_error = Some(node);
        }
        findings.extend(legacy_statement(node, source));
    });
    findings.extend(first_error.and_then(|node| locate_error(node, tokens)));
    findings
}

/// Python 2 forms the grammar parses but Python 3 names explicitly.
fn legacy_statement(node: Node<'_>, source: &str) -> Option<Diagnostic> {
    match node.kind() {
        "print_statement" if child_of_kind(node, "chevron").is_none() => {
            Some(missing_parentheses(node, source, "print"))
        }
        "exec_statement" => Some(missing_parentheses(node, source, "exec")),
        "raise_statement" => child_of_kind(node, "expression_list")
            .and_then(|values| child_of_kind(values, ","))
            .map(|comma| Diagnostic::new(node_position(source, comma), INVALID_SYNTAX)),
        "except_clause" if child_of_kind(node, ",").is_some() => node
            .named_child(0)
            .map(|types| Diagnostic::new(node_position(source, types), MULTIPLE_EXCEPTIONS)),
        _ => None,
    }
}

fn missing_parentheses(node: Node<'_>, source: &str, name: &str) -> Diagnostic {
    Diagnostic::new(
        node_position(source, node),
        format!("Missing parentheses in call to '{name}'. Did you mean {name}(...)?"),
    )
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::lexer::lex;
    use crate::parser::PythonParser;

    fn findings(source: &str) -> Vec<(u32, u32, String)> {
        let lexed = lex(source);
        let mut parser = PythonParser::new().expect("parser init");
        let parsed = parser.parse(source).expect("parse");
        tree_findings(parsed.tree().root_node(), &lexed.tokens, source)
            .into_iter()
            .map(|found| (found.at.line, found.at.column, found.message))
            .collect()
    }

    #[rstest]
    #[case(
        "print \"hello\"\n",
        1,
        1,
        "Missing parentheses in call to 'print'. Did you mean print(...)?"
    )]
    #[case(
        "x = 1\nexec 'x'\n",
        2,
        1,
        "Missing parentheses in call to 'exec'. Did you mean exec(...)?"
    )]
    #[case("raise E, v\n", 1, 8, "invalid syntax")]
    #[case(
        "try:\n    pass\nexcept A, B:\n    pass\n",
        3,
        8,
        "multiple exception types must be parenthesized"
    )]
    fn names_python2_statements(
        #[case] source: &str,
        #[case] line: u32,
        #[case] column: u32,
        #[case] message: &str,
    ) {
        let found = findings(source);
        assert_eq!(
            found.first(),
            Some(&(line, column, message.to_owned())),
            "findings: {found:?}"
        );
    }

    #[rstest]
    #[case("f(a b)\n", 1, 3, "invalid syntax. Perhaps you forgot a comma?")]
    #[case("x = [1 2]\n", 1, 6, "invalid syntax. Perhaps you forgot a comma?")]
    #[case("def f(a b):\n    pass\n", 1, 9, "invalid syntax")]
    #[case("x = 1\nx y\n", 2, 3, "invalid syntax")]
    #[case("é = 1\nb = é é\n", 2, 7, "invalid syntax")]
    #[case(
        "if x = 1:\n    pass\n",
        1,
        4,
        "invalid syntax. Maybe you meant '==' or ':=' instead of '='?"
    )]
    fn places_error_nodes_at_blamed_token(
        #[case] source: &str,
        #[case] line: u32,
        #[case] column: u32,
        #[case] message: &str,
    ) {
        let found = findings(source);
        let expected = (line, column, message.to_owned());
        assert!(found.contains(&expected), "findings: {found:?}");
    }

    #[test]
    fn clean_source_has_no_findings() {
        assert!(findings("print(1)\nraise E(v)\n").is_empty());
    }

    #[test]
    fn print_chevron_is_a_shift_expression() {
        assert!(findings("print >> f, x\n").is_empty());
    }
}
