//! # Parser Module
//!
//! @title AST Parsing for Submitted Programs
//! @author Ramprasad
//!
//! This module parses submitted Python source with the `rustpython-parser`
//! crate and defines the structures the extractor derives from the syntax
//! tree. A submission that fails to parse produces no partial structure;
//! the whole analysis aborts with a syntax diagnostic.
//!
//! ## Submodules
//!
//! - [`extractor`] - Scope-aware AST walk producing the exposure graph
//!
//! ## Key Types
//!
//! - [`ParsedProgram`] - Source text plus its parsed module body
//! - [`EntryPoint`] - A route-decorated handler function
//! - [`DangerousCall`] - A call whose resolved name is a configured sink
//! - [`FunctionInfo`] - Per-function facts consumed by correlation
//! - [`Visibility`] - Public or internal classification of a route path

mod extractor;

pub use extractor::{extract, Extraction};

use indexmap::IndexMap;
use rustpython_parser::{ast, parse, Mode};
use thiserror::Error;

/// Per-function facts keyed by function name, in definition order.
pub type FunctionMap = IndexMap<String, FunctionInfo>;

/// Errors that abort extraction of a submission.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The submission is not syntactically valid Python.
    #[error("Syntax Error: {0}")]
    Syntax(#[from] rustpython_parser::ParseError),

    /// The submission parsed to something other than a module.
    #[error("Syntax Error: submission is not a module")]
    NotAModule,
}

/// A successfully parsed submission.
#[derive(Debug)]
pub struct ParsedProgram {
    /// Raw source text of the submission.
    pub source: String,

    /// Parsed statements of the module body.
    pub body: ast::Suite,
}

impl ParsedProgram {
    /// Parses submitted source into a module body.
    ///
    /// # Arguments
    ///
    /// * `source` - Raw Python source text
    ///
    /// # Returns
    ///
    /// Returns `Ok(ParsedProgram)` on success.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Syntax`] when the source does not parse.
    pub fn from_source(source: &str) -> Result<Self, ExtractError> {
        let module = parse(source, Mode::Module, "<submission>")?;
        let body = match module {
            ast::Mod::Module(module) => module.body,
            _ => return Err(ExtractError::NotAModule),
        };
        Ok(Self {
            source: source.to_string(),
            body,
        })
    }
}

/// Classification of a route path, computed once at extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Exposed to untrusted callers.
    Public,

    /// Behind an internal path prefix, not reachable from outside.
    Internal,
}

impl Visibility {
    /// Classifies a route path against the configured internal prefixes.
    ///
    /// # Arguments
    ///
    /// * `route_path` - The literal route path from the decorator
    /// * `internal_prefixes` - Path prefixes considered internal
    pub fn classify(route_path: &str, internal_prefixes: &[String]) -> Self {
        if internal_prefixes
            .iter()
            .any(|prefix| route_path.starts_with(prefix.as_str()))
        {
            Visibility::Internal
        } else {
            Visibility::Public
        }
    }
}

/// A route-decorated handler discovered in the submission.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryPoint {
    /// Name of the handler function.
    pub function: String,

    /// Literal route path from the decorator.
    pub route_path: String,

    /// Route verb that matched (get, post, ...).
    pub verb: String,

    /// Public or internal classification of the path.
    pub visibility: Visibility,

    /// 1-based line of the handler definition.
    pub line: usize,
}

/// A call whose resolved name is one of the configured sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct DangerousCall {
    /// Innermost enclosing function, or `None` at module level.
    pub caller: Option<String>,

    /// Resolved call name (bare or `module.function`).
    pub callee: String,

    /// 1-based line of the call.
    pub line: usize,
}

/// Facts recorded for one function definition.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    /// Function name, also its graph node identifier.
    pub name: String,

    /// 1-based line of the definition.
    pub line: usize,

    /// Whether a route decorator marked this function as an entry point.
    pub is_entry: bool,

    /// Route path of the first matching decorator, when an entry.
    pub route_path: Option<String>,

    /// Visibility of the first matching decorator, when an entry.
    pub visibility: Option<Visibility>,

    /// Every resolved call name in the body, in source order.
    pub called_names: Vec<String>,
}

impl FunctionInfo {
    /// Creates a record for a function that is not (yet) an entry point.
    pub fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_string(),
            line,
            is_entry: false,
            route_path: None,
            visibility: None,
            called_names: Vec::new(),
        }
    }
}
