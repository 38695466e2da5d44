//! Checks Python's compiler makes once the source has parsed: parameter
//! lists, repeated keyword arguments and statements used outside the scope
//! they belong to.
//!
//! Python builds its symbol table before generating code, so a symbol-table
//! finding outranks a code-generation finding even when it comes later in
//! the file.

use std::collections::HashSet;

use tree_sitter::Node;

use crate::diagnostic::Diagnostic;
use crate::locate::node_position;
use crate::parser::{child_of_kind, walk_tree};

const ASYNC_COMPREHENSION: &str = "asynchronous comprehension outside of an asynchronous function";

/// Returns the error Python's compiler reports for a tree that parsed.
pub(crate) fn check_scopes(root: Node<'_>, source: &str) -> Option<Diagnostic> {
    let mut checker = ScopeChecker {
        source,
        symtable: None,
        compiler: None,
    };
    walk_tree(root, |node, ancestors| checker.visit(node, ancestors));
    checker.symtable.or(checker.compiler)
}

struct ScopeChecker<'s> {
    source: &'s str,
    /// First symbol-table error.
    symtable: Option<Diagnostic>,
    /// First code-generation error.
    compiler: Option<Diagnostic>,
}

impl<'s> ScopeChecker<'s> {
    fn visit(&mut self, node: Node<'_>, ancestors: &[Node<'_>]) {
        match node.kind() {
            "parameters" | "lambda_parameters" => self.parameters(node),
            "argument_list" => self.keyword_arguments(node),
            "nonlocal_statement" => self.nonlocal(node, ancestors),
            "return_statement" => self.return_statement(node, ancestors),
            "yield" if node.is_named() => self.yield_expression(node, ancestors),
            "await" if node.is_named() => self.await_expression(node, ancestors),
            "for_in_clause" if node.child(0).is_some_and(|first| first.kind() == "async") => {
                if let Some(owner) = ancestors.len().checked_sub(1) {
                    self.async_comprehension(ancestors, owner);
                }
            }
            "break_statement" => self.loop_control(node, ancestors, "'break' outside loop"),
            "continue_statement" => {
                self.loop_control(node, ancestors, "'continue' not properly in loop");
            }
            _ => {}
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn report_symtable(&mut self, node: Node<'_>, message: impl Into<String>) {
        if self.symtable.is_none() {
            self.symtable = Some(Diagnostic::new(node_position(self.source, node), message));
        }
    }

    fn report_compiler(&mut self, node: Node<'_>, message: impl Into<String>) {
        if self.compiler.is_none() {
            self.compiler = Some(Diagnostic::new(node_position(self.source, node), message));
        }
    }

    fn parameters(&mut self, node: Node<'_>) {
        let mut seen = HashSet::new();
        let mut after_var_keyword = false;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if after_var_keyword && child.is_named() && child.kind() != "comment" {
                self.report_symtable(child, "arguments cannot follow var-keyword argument");
                return;
            }
            if child.kind() == "dictionary_splat_pattern" {
                after_var_keyword = true;
            }
            let Some(ident) = parameter_name(child) else {
                continue;
            };
            let name = self.text(ident);
            if !seen.insert(name) {
                self.report_symtable(
                    ident,
                    format!("duplicate argument '{name}' in function definition"),
                );
                return;
            }
        }
    }

    fn keyword_arguments(&mut self, node: Node<'_>) {
        let mut seen = HashSet::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "keyword_argument" {
                continue;
            }
            let Some(ident) = child.child(0) else {
                continue;
            };
            let name = self.text(ident);
            if !seen.insert(name) {
                self.report_compiler(ident, format!("keyword argument repeated: {name}"));
                return;
            }
        }
    }

    fn nonlocal(&mut self, node: Node<'_>, ancestors: &[Node<'_>]) {
        if enclosing_scope(ancestors, node, false).is_none() {
            self.report_symtable(node, "nonlocal declaration not allowed at module level");
        } else if !ancestors
            .iter()
            .any(|ancestor| ancestor.kind() == "function_definition")
        {
            let name = child_of_kind(node, "identifier").map_or("", |ident| self.text(ident));
            self.report_symtable(node, format!("no binding for nonlocal '{name}' found"));
        }
    }

    fn return_statement(&mut self, node: Node<'_>, ancestors: &[Node<'_>]) {
        let scope = enclosing_scope(ancestors, node, false).and_then(|at| ancestors.get(at));
        if scope.is_none_or(|found| found.kind() != "function_definition") {
            self.report_compiler(node, "'return' outside function");
        }
    }

    fn yield_expression(&mut self, node: Node<'_>, ancestors: &[Node<'_>]) {
        let kind = enclosing_scope(ancestors, node, true)
            .and_then(|at| ancestors.get(at))
            .map(Node::kind);
        if let Some(label) = kind.and_then(comprehension_label) {
            self.report_compiler(node, format!("'yield' inside {label}"));
        } else if kind.is_none_or(|found| found == "class_definition") {
            self.report_compiler(node, "'yield' outside function");
        }
    }

    fn await_expression(&mut self, node: Node<'_>, ancestors: &[Node<'_>]) {
        let Some(at) = enclosing_scope(ancestors, node, true) else {
            self.report_compiler(node, "'await' outside function");
            return;
        };
        let Some(scope) = ancestors.get(at) else {
            return;
        };
        if comprehension_label(scope.kind()).is_some() {
            self.async_comprehension(ancestors, at);
        } else if scope.kind() == "class_definition" {
            self.report_compiler(node, "'await' outside function");
        } else if scope.kind() == "function_definition" && !is_async(*scope) {
            self.report_compiler(node, "'await' outside async function");
        }
    }

    /// The comprehension at `ancestors[at]` is asynchronous. Python accepts
    /// that inside an `async def`, or when a generator expression wraps it;
    /// otherwise it blames the outermost comprehension of the chain.
    fn async_comprehension(&mut self, ancestors: &[Node<'_>], at: usize) {
        let mut current = at;
        loop {
            let Some(comprehension) = ancestors.get(current).copied() else {
                return;
            };
            if comprehension.kind() == "generator_expression" {
                return;
            }
            let outer = ancestors.get(..current).unwrap_or_default();
            let next = enclosing_scope(outer, comprehension, true)
                .and_then(|index| outer.get(index).map(|scope| (index, *scope)));
            match next {
                Some((index, scope)) if comprehension_label(scope.kind()).is_some() => {
                    current = index;
                }
                Some((_, scope)) if scope.kind() == "function_definition" && is_async(scope) => {
                    return;
                }
                _ => {
                    self.report_compiler(comprehension, ASYNC_COMPREHENSION);
                    return;
                }
            }
        }
    }

    fn loop_control(&mut self, node: Node<'_>, ancestors: &[Node<'_>], message: &str) {
        let mut child = node;
        for parent in ancestors.iter().rev() {
            match parent.kind() {
                "function_definition" | "class_definition" => break,
                "for_statement" | "while_statement" if child.kind() == "block" => return,
                _ => {}
            }
            child = *parent;
        }
        self.report_compiler(node, message);
    }
}

/// Index in `ancestors` of the innermost scope around `node`. Comprehensions
/// count as scopes when `comprehensions` is set, except for their outermost
/// iterable, which Python evaluates in the enclosing scope.
fn enclosing_scope(ancestors: &[Node<'_>], node: Node<'_>, comprehensions: bool) -> Option<usize> {
    ancestors.iter().rposition(|ancestor| {
        matches!(
            ancestor.kind(),
            "function_definition" | "class_definition" | "lambda"
        ) || (comprehensions
            && comprehension_label(ancestor.kind()).is_some()
            && !in_outer_iterable(*ancestor, node))
    })
}

fn comprehension_label(kind: &str) -> Option<&'static str> {
    match kind {
        "list_comprehension" => Some("list comprehension"),
        "set_comprehension" => Some("set comprehension"),
        "dictionary_comprehension" => Some("dict comprehension"),
        "generator_expression" => Some("generator expression"),
        _ => None,
    }
}

fn in_outer_iterable(comprehension: Node<'_>, node: Node<'_>) -> bool {
    let Some(clause) = child_of_kind(comprehension, "for_in_clause") else {
        return false;
    };
    child_of_kind(clause, "in").is_some_and(|keyword| {
        node.start_byte() >= keyword.end_byte() && node.end_byte() <= clause.end_byte()
    })
}

fn is_async(definition: Node<'_>) -> bool {
    definition
        .child(0)
        .is_some_and(|first| first.kind() == "async")
}

/// The identifier a parameter binds, if it binds one directly.
fn parameter_name(parameter: Node<'_>) -> Option<Node<'_>> {
    match parameter.kind() {
        "identifier" => Some(parameter),
        "default_parameter" | "typed_default_parameter" => parameter
            .child(0)
            .filter(|name| name.kind() == "identifier"),
        "list_splat_pattern" | "dictionary_splat_pattern" => child_of_kind(parameter, "identifier"),
        "typed_parameter" => parameter.child(0).and_then(parameter_name),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::parser::PythonParser;

    fn scope_error(source: &str) -> Option<(u32, u32, String)> {
        let mut parser = PythonParser::new().expect("parser init");
        let parsed = parser.parse(source).expect("parse");
        assert!(!parsed.has_errors(), "fixture must parse: {source:?}");
        check_scopes(parsed.tree().root_node(), source)
            .map(|found| (found.at.line, found.at.column, found.message))
    }

    #[rstest]
    #[case("return 5\n", 1, 1, "'return' outside function")]
    #[case(
        "def f(x, x):\n    pass\n",
        1,
        10,
        "duplicate argument 'x' in function definition"
    )]
    #[case(
        "f = lambda a, *a: a\n",
        1,
        16,
        "duplicate argument 'a' in function definition"
    )]
    #[case(
        "def f(**kw, a):\n    pass\n",
        1,
        13,
        "arguments cannot follow var-keyword argument"
    )]
    #[case("nonlocal x\n", 1, 1, "nonlocal declaration not allowed at module level")]
    #[case(
        "class C:\n    nonlocal x\n",
        2,
        5,
        "no binding for nonlocal 'x' found"
    )]
    #[case("f(a=1, a=2)\n", 1, 8, "keyword argument repeated: a")]
    #[case("yield x\n", 1, 1, "'yield' outside function")]
    #[case("class C:\n    yield 1\n", 2, 5, "'yield' outside function")]
    #[case(
        "def f():\n    return [(yield x) for x in y]\n",
        2,
        14,
        "'yield' inside list comprehension"
    )]
    #[case("await x\n", 1, 1, "'await' outside function")]
    #[case("def f():\n    await x\n", 2, 5, "'await' outside async function")]
    #[case(
        "def f():\n    return [y for y in await z]\n",
        2,
        24,
        "'await' outside async function"
    )]
    #[case("break\n", 1, 1, "'break' outside loop")]
    #[case(
        "while x:\n    pass\nelse:\n    continue\n",
        4,
        5,
        "'continue' not properly in loop"
    )]
    #[case(
        "for x in y:\n    def g():\n        break\n",
        3,
        9,
        "'break' outside loop"
    )]
    fn reports_scope_errors(
        #[case] source: &str,
        #[case] line: u32,
        #[case] column: u32,
        #[case] message: &str,
    ) {
        assert_eq!(
            scope_error(source),
            Some((line, column, message.to_owned()))
        );
    }

    #[rstest]
    #[case(
        "x = [await y for y in z]\n",
        1,
        5
    )]
    #[case(
        "def f():\n    return [await y for y in z]\n",
        2,
        12
    )]
    #[case(
        "def f():\n    return [[await y for y in w] for w in v]\n",
        2,
        12
    )]
    #[case(
        "def f():\n    return [y async for y in z]\n",
        2,
        12
    )]
    fn reports_async_comprehensions_outside_async_functions(
        #[case] source: &str,
        #[case] line: u32,
        #[case] column: u32,
    ) {
        assert_eq!(
            scope_error(source),
            Some((line, column, ASYNC_COMPREHENSION.to_owned()))
        );
    }

    #[rstest]
    #[case("async def f():\n    return [await y for y in z]\n")]
    #[case("def f():\n    return (await y for y in z)\n")]
    #[case("f = lambda: (yield)\n")]
    #[case("def f(a, *, b, **c):\n    return a\n")]
    #[case("for x in y:\n    if x:\n        break\n    else:\n        continue\n")]
    #[case("def outer():\n    x = 1\n    def inner():\n        nonlocal x\n")]
    #[case("f(a=1, b=2, *c, **d)\n")]
    fn accepts_well_scoped_code(#[case] source: &str) {
        assert_eq!(scope_error(source), None);
    }

    #[test]
    fn symbol_table_errors_outrank_later_compiler_errors() {
        let source = "return 1\ndef f(a, a):\n    pass\n";
        assert_eq!(
            scope_error(source),
            Some((
                2,
                10,
                "duplicate argument 'a' in function definition".to_owned()
            ))
        );
    }
}
