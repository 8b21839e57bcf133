//! Static schema extraction for Gradio application source.
//!
//! Python source is parsed with tree-sitter and lowered into a small syntax
//! tree, which the search engine walks to locate component constructors and event bindings.
//! The resolver turns references back into the expressions assigned to them,
//! and the schema builder reconstructs the ordered inputs of each binding.

/// Syntax tree definitions for the analyzed Python subset.
pub mod ast;
/// Fixed component vocabulary and payload datatype table.
pub mod component;
/// tree-sitter parsing lowered into [`ast::Module`].
pub mod python;
/// Reference resolution over the syntax tree.
pub mod resolve;
/// Input schema reconstruction for event bindings.
pub mod schema;
/// Depth-first search utilities over the syntax tree.
pub mod search;

pub use ast::{Constant, Expr, Keyword, Module, Stmt, StmtKind};
pub use component::{ComponentType, UNKNOWN_COMPONENT, UNKNOWN_DATATYPE};
pub use python::parse_module;
pub use resolve::{ResolvedValue, Resolver};
pub use schema::{ComponentDescriptor, InvocationSchema, SchemaBuilder};
pub use search::{
    Node, SearchableTree, Shape, find_all_calls_named, has_call_named, keyword_argument, narrow_call,
};

use thiserror::Error;

/// Convenience result alias for analyzer operations.
pub type Result<T> = std::result::Result<T, AnalyzerError>;

/// Errors surfaced while parsing or analyzing application source.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The source is not valid Python.
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-based line of the first error node.
        line: usize,
        /// 1-based byte column of the first error node.
        column: usize,
        /// What the parser found or expected.
        message: String,
    },

    /// The Python grammar could not be loaded into the parser.
    #[error("python grammar unavailable: {0}")]
    Grammar(String),

    /// An assignment target, inputs element or binding has a shape the
    /// analyzer does not handle.
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// A name is referenced but never assigned in the searched scope.
    #[error("name `{0}` is never assigned in the searched scope")]
    UnresolvedName(String),

    /// A search pattern failed to compile.
    #[error("invalid search pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}
