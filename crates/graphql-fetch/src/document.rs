//! Operation documents and operation name extraction.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use apollo_compiler::{Name, ast};

use crate::error::DocumentError;

/// Source path reported in syntax diagnostics.
const SOURCE_PATH: &str = "operation.graphql";

/// A parsed GraphQL document holding one operation.
///
/// The printed form used on the wire is computed once at construction.
#[derive(Debug, Clone)]
pub struct OperationDocument {
    ast: ast::Document,
    query: String,
}

impl OperationDocument {
    /// Parse GraphQL source text.
    ///
    /// The document must contain exactly one operation definition (named or
    /// anonymous). Fragments are allowed alongside it.
    pub fn parse(source: impl Into<String>) -> Result<Self, DocumentError> {
        let document = ast::Document::parse(source, SOURCE_PATH)
            .map_err(|invalid| DocumentError::Syntax(invalid.errors.to_string()))?;
        match operation_count(&document) {
            0 => Err(DocumentError::NoOperation),
            1 => Ok(Self::from_ast(document)),
            count => Err(DocumentError::MultipleOperations { count }),
        }
    }

    /// Wrap an already compiled document without further checks.
    ///
    /// A document holding several operations is accepted; its operation name
    /// is that of the first operation definition, and the whole document is
    /// sent as the query text.
    #[must_use]
    pub fn from_ast(ast: ast::Document) -> Self {
        let query = ast.to_string();
        Self { ast, query }
    }

    /// Declared operation name, or `None` for anonymous operations.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        operation_name(&self.ast)
    }

    /// Canonical printed query text.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Underlying syntax tree.
    #[must_use]
    pub const fn as_ast(&self) -> &ast::Document {
        &self.ast
    }
}

impl fmt::Display for OperationDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.query)
    }
}

/// Return the name of the first operation definition in `document`.
///
/// Anonymous operations, and documents without any operation, yield `None`.
#[must_use]
pub fn operation_name(document: &ast::Document) -> Option<&str> {
    document
        .definitions
        .iter()
        .find_map(|definition| match definition {
            ast::Definition::OperationDefinition(operation) => Some(operation.name.as_ref()),
            _ => None,
        })
        .flatten()
        .map(Name::as_str)
}

fn operation_count(document: &ast::Document) -> usize {
    document
        .definitions
        .iter()
        .filter(|definition| matches!(definition, ast::Definition::OperationDefinition(_)))
        .count()
}

/// An [`OperationDocument`] bound to its response data and variables types.
///
/// Cloning is cheap; the document is shared.
pub struct TypedDocument<TData, TVariables = serde_json::Value> {
    document: Arc<OperationDocument>,
    _types: PhantomData<fn() -> (TData, TVariables)>,
}

impl<TData, TVariables> TypedDocument<TData, TVariables> {
    /// Parse GraphQL source text into a typed document.
    pub fn parse(source: impl Into<String>) -> Result<Self, DocumentError> {
        OperationDocument::parse(source).map(Self::new)
    }

    /// Bind an existing document to `TData` and `TVariables`.
    #[must_use]
    pub fn new(document: OperationDocument) -> Self {
        Self {
            document: Arc::new(document),
            _types: PhantomData,
        }
    }

    /// The untyped document.
    #[must_use]
    pub fn document(&self) -> &OperationDocument {
        &self.document
    }

    /// Shared handle to the untyped document.
    pub(crate) fn shared(&self) -> Arc<OperationDocument> {
        Arc::clone(&self.document)
    }

    /// Declared operation name, or `None` for anonymous operations.
    #[must_use]
    pub fn operation_name(&self) -> Option<&str> {
        self.document.operation_name()
    }

    /// Canonical printed query text.
    #[must_use]
    pub fn query(&self) -> &str {
        self.document.query()
    }
}

impl<TData, TVariables> Clone for TypedDocument<TData, TVariables> {
    fn clone(&self) -> Self {
        Self {
            document: Arc::clone(&self.document),
            _types: PhantomData,
        }
    }
}

impl<TData, TVariables> fmt::Debug for TypedDocument<TData, TVariables> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedDocument")
            .field("operation_name", &self.operation_name())
            .field("query", &self.query())
            .finish()
    }
}

impl<TData, TVariables> From<OperationDocument> for TypedDocument<TData, TVariables> {
    fn from(document: OperationDocument) -> Self {
        Self::new(document)
    }
}
