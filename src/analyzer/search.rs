//! Depth-first search over the syntax tree.
//!
//! Statements are visited in document order, descending into every nested
//! block. Names are matched with regular expressions, so callers choose
//! between substring search ([`pattern`]) and exact lookup
//! ([`exact_pattern`]).

use regex::Regex;
use std::fmt;
use tracing::trace;

use super::ast::{Expr, Module, Stmt, StmtKind};
use super::{AnalyzerError, Result, python};

/// Statement shapes that [`SearchableTree::find_first`] and
/// [`SearchableTree::find_all`] can look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// `a = value`
    Assign,
    /// `a: T = value`
    AnnAssign,
    /// `a += value`
    AugAssign,
    /// Bare expression statement.
    Expr,
    /// `if`
    If,
    /// `for`
    For,
    /// `while`
    While,
    /// `with`
    With,
    /// `def`
    FunctionDef,
    /// `class`
    ClassDef,
    /// `try`
    Try,
    /// `return`
    Return,
    /// `import` / `from ... import`
    Import,
}

impl Shape {
    /// Whether a statement has this shape.
    pub fn matches(self, kind: &StmtKind) -> bool {
        matches!(
            (self, kind),
            (Shape::Assign, StmtKind::Assign { .. })
                | (Shape::AnnAssign, StmtKind::AnnAssign { .. })
                | (Shape::AugAssign, StmtKind::AugAssign { .. })
                | (Shape::Expr, StmtKind::Expr { .. })
                | (Shape::If, StmtKind::If { .. })
                | (Shape::For, StmtKind::For { .. })
                | (Shape::While, StmtKind::While { .. })
                | (Shape::With, StmtKind::With { .. })
                | (Shape::FunctionDef, StmtKind::FunctionDef { .. })
                | (Shape::ClassDef, StmtKind::ClassDef { .. })
                | (Shape::Try, StmtKind::Try { .. })
                | (Shape::Return, StmtKind::Return { .. })
                | (Shape::Import, StmtKind::Import { .. })
        )
    }
}

/// Borrowed handle to either a statement or an expression in the tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Node<'a> {
    /// A statement.
    Stmt(&'a Stmt),
    /// An expression.
    Expr(&'a Expr),
}

impl<'a> Node<'a> {
    /// The expression behind this node, if it is one.
    pub fn as_expr(self) -> Option<&'a Expr> {
        match self {
            Node::Expr(expr) => Some(expr),
            Node::Stmt(_) => None,
        }
    }
}

impl fmt::Display for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Expr(expr) => write!(f, "{expr}"),
            Node::Stmt(stmt) => write!(f, "<statement at line {}>", stmt.line),
        }
    }
}

/// Parsed source plus the search operations the analyzer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchableTree {
    module: Module,
}

impl SearchableTree {
    /// Wrap an already parsed module.
    pub fn new(module: Module) -> Self {
        Self { module }
    }

    /// Parse source text into a searchable tree.
    pub fn parse(source: &str) -> Result<Self> {
        python::parse_module(source).map(Self::new)
    }

    /// The underlying module.
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Top-level statements.
    pub fn body(&self) -> &[Stmt] {
        &self.module.body
    }

    /// First statement of the given shape, depth-first in document order.
    ///
    /// Searches `scope` when given, the whole module otherwise.
    pub fn find_first<'a>(&'a self, shape: Shape, scope: Option<&'a [Stmt]>) -> Option<&'a Stmt> {
        find_first_in(scope.unwrap_or(self.body()), shape)
    }

    /// Every statement of the given shape, depth-first in document order.
    pub fn find_all<'a>(&'a self, shape: Shape, scope: Option<&'a [Stmt]>) -> Vec<&'a Stmt> {
        let mut found = Vec::new();
        collect_all(scope.unwrap_or(self.body()), shape, &mut found);
        found
    }

    /// First assignment whose target identifier matches `pattern`.
    ///
    /// Assignments to subscripts never match. Any other target shape that is
    /// not a name, attribute or unpacking pattern is an error.
    pub fn find_binding<'a>(
        &'a self,
        pattern: &Regex,
        scope: Option<&'a [Stmt]>,
    ) -> Result<Option<&'a Stmt>> {
        find_binding_in(scope.unwrap_or(self.body()), pattern)
    }

    /// Assignment statement binding exactly `name`.
    pub fn binding_of(&self, name: &str) -> Result<Option<&Stmt>> {
        self.find_binding(&exact_pattern(name)?, None)
    }

    /// First top-level statement containing a matching call, as the outermost
    /// matching node inside it.
    pub fn find_first_call_named(&self, pattern: &Regex) -> Option<Node<'_>> {
        self.body()
            .iter()
            .find_map(|stmt| find_all_calls_named(Node::Stmt(stmt), pattern).into_iter().next())
    }

    /// Every outermost matching call across the module, in document order.
    pub fn find_calls_named(&self, pattern: &Regex) -> Vec<Node<'_>> {
        self.body()
            .iter()
            .flat_map(|stmt| find_all_calls_named(Node::Stmt(stmt), pattern))
            .collect()
    }
}

/// Compile a search pattern.
pub fn pattern(text: &str) -> Result<Regex> {
    Ok(Regex::new(text)?)
}

/// Pattern that matches `name` and nothing else.
pub fn exact_pattern(name: &str) -> Result<Regex> {
    pattern(&format!("^{}$", regex::escape(name)))
}

fn find_first_in(body: &[Stmt], shape: Shape) -> Option<&Stmt> {
    for stmt in body {
        if shape.matches(&stmt.kind) {
            return Some(stmt);
        }
        for block in stmt.kind.blocks() {
            if let Some(found) = find_first_in(block, shape) {
                return Some(found);
            }
        }
    }
    None
}

fn collect_all<'a>(body: &'a [Stmt], shape: Shape, found: &mut Vec<&'a Stmt>) {
    for stmt in body {
        if shape.matches(&stmt.kind) {
            found.push(stmt);
        }
        for block in stmt.kind.blocks() {
            collect_all(block, shape, found);
        }
    }
}

fn find_binding_in<'a>(body: &'a [Stmt], pattern: &Regex) -> Result<Option<&'a Stmt>> {
    for stmt in body {
        match &stmt.kind {
            StmtKind::Assign { targets, .. } => {
                for target in targets {
                    if target_matches(target, pattern)? {
                        trace!(line = stmt.line, %target, "binding found");
                        return Ok(Some(stmt));
                    }
                }
            }
            kind => {
                for block in kind.blocks() {
                    if let Some(found) = find_binding_in(block, pattern)? {
                        return Ok(Some(found));
                    }
                }
            }
        }
    }
    Ok(None)
}

fn target_matches(target: &Expr, pattern: &Regex) -> Result<bool> {
    match target {
        Expr::Name { id } => Ok(pattern.is_match(id)),
        Expr::Attribute { attr, .. } => Ok(pattern.is_match(attr)),
        Expr::Subscript { .. } => Ok(false),
        Expr::Starred { value } => target_matches(value, pattern),
        Expr::Tuple { elts } | Expr::List { elts } => {
            for element in elts {
                if target_matches(element, pattern)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        other => Err(AnalyzerError::UnsupportedConstruct(format!(
            "assignment target `{other}`"
        ))),
    }
}

/// Whether `node` contains a call, name or attribute matching `pattern`.
///
/// Statements are looked at through their assigned or evaluated expression,
/// compound statements through their nested blocks. A call matches when its
/// callee, any positional argument or any keyword value matches.
pub fn has_call_named(node: Node<'_>, pattern: &Regex) -> bool {
    match node {
        Node::Stmt(stmt) => match &stmt.kind {
            StmtKind::Assign { value, .. } | StmtKind::Expr { value } => {
                has_call_named(Node::Expr(value), pattern)
            }
            kind => kind
                .blocks()
                .into_iter()
                .flatten()
                .any(|stmt| has_call_named(Node::Stmt(stmt), pattern)),
        },
        Node::Expr(expr) => match expr {
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                has_call_named(Node::Expr(func), pattern)
                    || args
                        .iter()
                        .any(|arg| has_call_named(Node::Expr(arg), pattern))
                    || keywords
                        .iter()
                        .any(|keyword| has_call_named(Node::Expr(&keyword.value), pattern))
            }
            Expr::Name { id } => pattern.is_match(id),
            Expr::Attribute { value, attr } => {
                pattern.is_match(attr) || has_call_named(Node::Expr(value), pattern)
            }
            _ => false,
        },
    }
}

/// Outermost matching calls, names or attributes within `node`, in document
/// order.
///
/// A matching call is returned whole and not searched further; a
/// non-matching attribute is searched through its base.
pub fn find_all_calls_named<'a>(node: Node<'a>, pattern: &Regex) -> Vec<Node<'a>> {
    match node {
        Node::Stmt(stmt) => match &stmt.kind {
            StmtKind::Assign { value, .. } | StmtKind::Expr { value } => {
                find_all_calls_named(Node::Expr(value), pattern)
            }
            kind => kind
                .blocks()
                .into_iter()
                .flatten()
                .flat_map(|stmt| find_all_calls_named(Node::Stmt(stmt), pattern))
                .collect(),
        },
        Node::Expr(expr) => match expr {
            Expr::Call { .. } | Expr::Name { .. } if has_call_named(node, pattern) => vec![node],
            Expr::Attribute { value, attr } => {
                if pattern.is_match(attr) {
                    vec![node]
                } else {
                    find_all_calls_named(Node::Expr(value), pattern)
                }
            }
            _ => Vec::new(),
        },
    }
}

/// Innermost call in a matched chain whose own callee identifier matches.
///
/// For `gr.Interface(...).launch()` the whole statement matches through the
/// callee's base; this steps into the callee and arguments until it reaches
/// the call named by `pattern`. Nodes with no such call come back unchanged.
pub fn narrow_call<'a>(node: Node<'a>, pattern: &Regex) -> Node<'a> {
    fn callee_matches(expr: &Expr, pattern: &Regex) -> bool {
        match expr {
            Expr::Call { func, .. } => func.identifier().is_some_and(|id| pattern.is_match(id)),
            _ => false,
        }
    }

    fn search<'a>(expr: &'a Expr, pattern: &Regex) -> Option<&'a Expr> {
        if callee_matches(expr, pattern) {
            return Some(expr);
        }
        match expr {
            Expr::Call {
                func,
                args,
                keywords,
            } => search(func, pattern)
                .or_else(|| args.iter().find_map(|arg| search(arg, pattern)))
                .or_else(|| {
                    keywords
                        .iter()
                        .find_map(|keyword| search(&keyword.value, pattern))
                }),
            Expr::Attribute { value, .. } => search(value, pattern),
            _ => None,
        }
    }

    match node {
        Node::Expr(expr) => search(expr, pattern).map_or(node, Node::Expr),
        Node::Stmt(_) => node,
    }
}

/// Value of the keyword argument `name` on a call expression.
pub fn keyword_argument<'a>(call: &'a Expr, name: &str) -> Option<&'a Expr> {
    match call {
        Expr::Call { keywords, .. } => keywords
            .iter()
            .find(|keyword| keyword.arg.as_deref() == Some(name))
            .map(|keyword| &keyword.value),
        _ => None,
    }
}

/// Positional argument `index` on a call expression.
pub fn positional_argument(call: &Expr, index: usize) -> Option<&Expr> {
    match call {
        Expr::Call { args, .. } => args.get(index),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::ast::Constant;

    const APP: &str = r#"
import gradio as gr

def greet(name):
    return "Hello " + name

with gr.Blocks() as demo:
    name = gr.Textbox(label="Name")
    out = gr.Textbox()
    if True:
        btn = gr.Button("Go")
    btn.click(fn=greet, inputs=name, outputs=out)

demo.launch()
"#;

    fn tree() -> SearchableTree {
        SearchableTree::parse(APP).unwrap()
    }

    #[test]
    fn find_first_walks_nested_blocks() {
        let tree = tree();
        let first = tree.find_first(Shape::Assign, None).unwrap();
        assert_eq!(first.line, 8);
        let ret = tree.find_first(Shape::Return, None).unwrap();
        assert_eq!(ret.line, 5);
        assert!(tree.find_first(Shape::While, None).is_none());
    }

    #[test]
    fn find_all_is_in_document_order() {
        let tree = tree();
        let lines: Vec<usize> = tree
            .find_all(Shape::Assign, None)
            .into_iter()
            .map(|stmt| stmt.line)
            .collect();
        assert_eq!(lines, vec![8, 9, 11]);
    }

    #[test]
    fn scope_restricts_the_search() {
        let tree = tree();
        let with = tree.find_first(Shape::With, None).unwrap();
        let blocks = with.kind.blocks();
        let inner = tree.find_all(Shape::Expr, Some(blocks[0]));
        assert_eq!(inner.len(), 1);
        assert_eq!(tree.find_all(Shape::Expr, None).len(), 2);
    }

    #[test]
    fn binding_lookup_is_first_match_wins() {
        let tree = SearchableTree::parse("x = 1\nif c:\n    x = 2\n").unwrap();
        let stmt = tree.binding_of("x").unwrap().unwrap();
        assert_eq!(stmt.line, 1);
        assert!(tree.binding_of("y").unwrap().is_none());
    }

    #[test]
    fn binding_lookup_sees_unpacking_and_skips_subscripts() {
        let tree = SearchableTree::parse("d[k] = 0\na, (b, *c) = f()\nself.k = 3\n").unwrap();
        assert_eq!(tree.binding_of("c").unwrap().unwrap().line, 2);
        assert_eq!(tree.binding_of("k").unwrap().unwrap().line, 3);
    }

    #[test]
    fn unsupported_target_is_an_error() {
        let module = Module {
            body: vec![Stmt {
                line: 1,
                kind: StmtKind::Assign {
                    targets: vec![Expr::constant(Constant::Int(1))],
                    value: Expr::name("x"),
                },
            }],
        };
        let tree = SearchableTree::new(module);
        assert!(matches!(
            tree.binding_of("x"),
            Err(AnalyzerError::UnsupportedConstruct(_))
        ));
    }

    #[test]
    fn calls_match_through_callee_and_arguments() {
        let tree = tree();
        let click = pattern("(click|submit)").unwrap();
        let found = tree.find_calls_named(&click);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].to_string(),
            "btn.click(fn=greet, inputs=name, outputs=out)"
        );

        let stmt = tree.find_first(Shape::With, None).unwrap();
        assert!(has_call_named(Node::Stmt(stmt), &click));
        assert!(!has_call_named(
            Node::Stmt(tree.find_first(Shape::FunctionDef, None).unwrap()),
            &click
        ));
    }

    #[test]
    fn matching_call_is_not_searched_further() {
        let tree = SearchableTree::parse("x = Outer(Inner(1), k=Inner(2))\n").unwrap();
        let inner = pattern("Inner").unwrap();
        let found = tree.find_calls_named(&inner);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].to_string(), "Outer(Inner(1), k=Inner(2))");
        assert_eq!(narrow_call(found[0], &inner).to_string(), "Inner(1)");
    }

    #[test]
    fn chained_calls_narrow_to_the_named_call() {
        let tree = SearchableTree::parse("gr.Interface(f, 'text', 'text').launch(share=True)\n").unwrap();
        let interface = pattern("Interface").unwrap();
        let found = tree.find_calls_named(&interface);
        assert_eq!(found.len(), 1);
        assert_eq!(
            narrow_call(found[0], &interface).to_string(),
            "gr.Interface(f, \"text\", \"text\")"
        );

        let click = pattern("click").unwrap();
        let direct = SearchableTree::parse("btn.click(f)\n").unwrap();
        let found = direct.find_calls_named(&click);
        assert_eq!(narrow_call(found[0], &click), found[0]);
    }

    #[test]
    fn keyword_lookup() {
        let tree = tree();
        let call = tree
            .find_first_call_named(&pattern("click").unwrap())
            .and_then(Node::as_expr)
            .unwrap();
        assert_eq!(keyword_argument(call, "inputs"), Some(&Expr::name("name")));
        assert!(keyword_argument(call, "missing").is_none());
        assert!(positional_argument(call, 0).is_none());
    }

    #[test]
    fn invalid_pattern_is_reported() {
        assert!(matches!(
            pattern("(unclosed"),
            Err(AnalyzerError::InvalidPattern(_))
        ));
    }
}
