//! Reference resolution.
//!
//! Names are followed to their first binding, calls to their callee and
//! attribute chains to the call they hang off. What cannot be followed is
//! kept as rendered source.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use super::ast::{Constant, Expr, StmtKind};
use super::component::{ComponentType, UNKNOWN_COMPONENT};
use super::search::{Node, SearchableTree};
use super::{AnalyzerError, Result};

/// Longest chain of name-to-binding hops followed before giving up.
const MAX_BINDING_DEPTH: usize = 64;

/// Result of resolving an expression against the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    /// A literal value (identifiers resolve to their text).
    Literal(Constant),
    /// Element-wise resolution of a list display.
    List(Vec<ResolvedValue>),
    /// An expression the resolver leaves as written.
    Expression {
        /// Source rendering of the expression.
        expr: String,
    },
}

impl ResolvedValue {
    /// Shorthand for a string literal.
    pub fn text(value: impl Into<String>) -> Self {
        ResolvedValue::Literal(Constant::Str(value.into()))
    }

    /// The string payload, when this is a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::Literal(Constant::Str(text)) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for ResolvedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedValue::Literal(Constant::Str(text)) => f.write_str(text),
            ResolvedValue::Literal(value) => write!(f, "{value}"),
            ResolvedValue::List(items) => {
                f.write_str("[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            ResolvedValue::Expression { expr } => f.write_str(expr),
        }
    }
}

/// Follows references through the assignments of one tree.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    tree: &'a SearchableTree,
}

impl<'a> Resolver<'a> {
    /// Resolver over `tree`.
    pub fn new(tree: &'a SearchableTree) -> Self {
        Self { tree }
    }

    /// Resolve `node` to a value.
    ///
    /// In component mode the outcome is classified against the component
    /// vocabulary: a known constructor name stays as is, lists are classified
    /// element-wise and everything else becomes `"Unknown"`.
    pub fn resolve(&self, node: Node<'a>, component_mode: bool) -> Result<ResolvedValue> {
        let mut in_progress = Vec::new();
        let value = self.value_of(node, &mut in_progress)?;
        Ok(if component_mode {
            classify(value)
        } else {
            value
        })
    }

    /// Component type name for a constructor expression.
    pub fn component_type(&self, expr: &'a Expr) -> Result<String> {
        Ok(match self.resolve(Node::Expr(expr), true)? {
            ResolvedValue::Literal(Constant::Str(name)) => name,
            _ => UNKNOWN_COMPONENT.to_string(),
        })
    }

    /// Expression assigned to `name` by its first binding.
    pub fn binding_value(&self, name: &str) -> Result<&'a Expr> {
        match self.tree.binding_of(name)? {
            Some(stmt) => match &stmt.kind {
                StmtKind::Assign { value, .. } => Ok(value),
                _ => Err(AnalyzerError::UnsupportedConstruct(format!(
                    "binding of `{name}` at line {} is not an assignment",
                    stmt.line
                ))),
            },
            None => Err(AnalyzerError::UnresolvedName(name.to_string())),
        }
    }

    fn value_of(&self, node: Node<'a>, in_progress: &mut Vec<String>) -> Result<ResolvedValue> {
        let expr = match node {
            Node::Expr(expr) => expr,
            Node::Stmt(stmt) => match &stmt.kind {
                StmtKind::Assign { targets, .. } => match targets.first() {
                    Some(target) => target,
                    None => {
                        return Err(AnalyzerError::UnsupportedConstruct(format!(
                            "assignment without target at line {}",
                            stmt.line
                        )));
                    }
                },
                _ => {
                    return Err(AnalyzerError::UnsupportedConstruct(format!(
                        "statement at line {} has no value",
                        stmt.line
                    )));
                }
            },
        };

        match expr {
            Expr::Name { id } => self.name_value(id, in_progress),
            Expr::Constant { value } => Ok(ResolvedValue::Literal(value.clone())),
            Expr::Attribute { value, attr } => match value.as_ref() {
                Expr::Call { .. } => self.value_of(Node::Expr(value), in_progress),
                _ => Ok(ResolvedValue::text(attr.clone())),
            },
            Expr::Subscript { value, .. } => match value.as_ref() {
                Expr::Name { id } => match self.tree.binding_of(id)? {
                    Some(stmt) => self.value_of(Node::Stmt(stmt), in_progress),
                    None => Err(AnalyzerError::UnresolvedName(id.clone())),
                },
                base => self.value_of(Node::Expr(base), in_progress),
            },
            Expr::Call { func, .. } => match func.as_ref() {
                Expr::Name { id } => {
                    if self.tree.binding_of(id)?.is_some() {
                        self.name_value(id, in_progress)
                    } else {
                        Ok(ResolvedValue::text(id.clone()))
                    }
                }
                callee => self.value_of(Node::Expr(callee), in_progress),
            },
            Expr::List { elts } => elts
                .iter()
                .map(|element| self.value_of(Node::Expr(element), in_progress))
                .collect::<Result<Vec<_>>>()
                .map(ResolvedValue::List),
            other => Ok(ResolvedValue::Expression {
                expr: other.to_string(),
            }),
        }
    }

    fn name_value(&self, name: &str, in_progress: &mut Vec<String>) -> Result<ResolvedValue> {
        if in_progress.iter().any(|pending| pending == name) {
            return Err(AnalyzerError::UnsupportedConstruct(format!(
                "cyclic binding through `{name}`"
            )));
        }
        if in_progress.len() >= MAX_BINDING_DEPTH {
            return Err(AnalyzerError::UnsupportedConstruct(format!(
                "binding chain through `{name}` is too deep"
            )));
        }

        let value = self.binding_value(name)?;
        trace!(name, %value, "resolving binding");
        in_progress.push(name.to_string());
        let resolved = self.value_of(Node::Expr(value), in_progress);
        in_progress.pop();
        resolved
    }
}

fn classify(value: ResolvedValue) -> ResolvedValue {
    match value {
        ResolvedValue::Literal(Constant::Str(name)) if ComponentType::from_name(&name).is_some() => {
            ResolvedValue::Literal(Constant::Str(name))
        }
        ResolvedValue::List(items) => ResolvedValue::List(items.into_iter().map(classify).collect()),
        _ => ResolvedValue::text(UNKNOWN_COMPONENT),
    }
}
