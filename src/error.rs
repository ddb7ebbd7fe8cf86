//! Error types for loading, validating, and generating from WSDL documents.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by any stage of a generation run.
///
/// Every variant is fatal: the run stops at the first one and reports it.
#[derive(Debug, Error)]
pub enum GenError {
    // IO errors (exit code 3)
    #[error("document not found: {path}")]
    LoadError { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Document errors (exit code 2)
    #[error("invalid XML in {path}: {message}")]
    InvalidXml { path: PathBuf, message: String },

    #[error("namespace \"{namespace}\" referenced from {location} is not in the allow-list")]
    UnknownNamespace { namespace: String, location: String },

    #[error("schema shape violation at {path}: {message}")]
    SchemaShapeViolation { path: String, message: String },

    #[error("unresolved type reference \"{name}\" (referenced by {referenced_by})")]
    UnresolvedTypeReference { name: String, referenced_by: String },

    #[error("invalid enrichment document: {source}")]
    InvalidEnrichment {
        #[source]
        source: serde_json::Error,
    },

    #[error("document target namespace \"{actual}\" does not match requested target \"{expected}\"")]
    TargetMismatch { expected: String, actual: String },
}

impl GenError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            GenError::LoadError { .. }
            | GenError::ReadError { .. }
            | GenError::WriteError { .. } => 3,
            _ => 2,
        }
    }

    pub(crate) fn shape(path: impl Into<String>, message: impl Into<String>) -> Self {
        GenError::SchemaShapeViolation {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        let err = GenError::LoadError {
            path: PathBuf::from("vim.wsdl"),
        };
        assert_eq!(err.exit_code(), 3);

        let err = GenError::shape("/schema/complexType[Foo]", "expected one child");
        assert_eq!(err.exit_code(), 2);

        let err = GenError::UnresolvedTypeReference {
            name: "vim25:Missing".into(),
            referenced_by: "Foo".into(),
        };
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn shape_violation_display_carries_path() {
        let err = GenError::shape("/schema/simpleType[Power]", "restriction base must be xsd:string");
        assert_eq!(
            err.to_string(),
            "schema shape violation at /schema/simpleType[Power]: restriction base must be xsd:string"
        );
    }
}
