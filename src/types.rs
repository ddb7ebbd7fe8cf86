//! Core types shared by every generation stage.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::error::GenError;

/// Prefix used by the documents for built-in schema types.
pub const XSD_PREFIX: &str = "xsd";

/// The base structural namespace every other namespace builds on.
pub const CORE_NAMESPACE: &str = "vim25";

/// Default Go import root for emitted packages.
pub const DEFAULT_MODULE: &str = "github.com/vmware/govmomi";

/// Upper-case the first character of a wire name.
///
/// `ArrayOf` prefixes are kept and the remainder is upper-cased instead, so
/// `ArrayOfvslmInfrastructureObjectPolicy` becomes
/// `ArrayOfVslmInfrastructureObjectPolicy`.
pub fn ucfirst(v: &str) -> String {
    const ARRAY_OF: &str = "ArrayOf";
    if let Some(rest) = v.strip_prefix(ARRAY_OF) {
        return format!("{}{}", ARRAY_OF, ucfirst(rest));
    }

    let mut chars = v.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Short namespace name from a `targetNamespace` URI (`urn:vim25` -> `vim25`).
pub fn short_namespace(uri: &str) -> &str {
    match uri.split_once(':') {
        Some((_, rest)) => rest,
        None => uri,
    }
}

/// Closed set of namespaces documents may reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Namespaces(BTreeSet<String>);

impl Namespaces {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn insert(&mut self, name: impl Into<String>) {
        self.0.insert(name.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains(name)
    }

    /// Fail with `UnknownNamespace` unless `name` is allowed.
    pub fn check(&self, name: &str, location: &str) -> Result<(), GenError> {
        if self.contains(name) {
            Ok(())
        } else {
            Err(GenError::UnknownNamespace {
                namespace: name.to_string(),
                location: location.to_string(),
            })
        }
    }
}

/// Namespace-qualified wire name of a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.local)
    }
}

/// Built-in schema types the documents use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    String,
    Int,
    Boolean,
    Long,
    DateTime,
    AnyType,
    Byte,
    Double,
    Float,
    Short,
    Base64Binary,
    AnyUri,
}

impl Primitive {
    /// Parse the local part of an `xsd:` reference.
    ///
    /// Returns `None` for types outside the supported dialect.
    pub fn parse(local: &str) -> Option<Self> {
        match local {
            "string" => Some(Primitive::String),
            "int" => Some(Primitive::Int),
            "boolean" => Some(Primitive::Boolean),
            "long" => Some(Primitive::Long),
            "dateTime" => Some(Primitive::DateTime),
            "anyType" => Some(Primitive::AnyType),
            "byte" => Some(Primitive::Byte),
            "double" => Some(Primitive::Double),
            "float" => Some(Primitive::Float),
            "short" => Some(Primitive::Short),
            "base64Binary" => Some(Primitive::Base64Binary),
            "anyURI" => Some(Primitive::AnyUri),
            _ => None,
        }
    }
}

/// A reference to either a built-in type or a named type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Primitive(Primitive),
    Named(QName),
}

impl TypeRef {
    /// Parse a `prefix:local` reference, checking the prefix against the
    /// allow-list.
    ///
    /// # Errors
    ///
    /// `UnknownNamespace` for a prefix outside the allow-list,
    /// `UnresolvedTypeReference` for an unsupported `xsd:` type, and
    /// `SchemaShapeViolation` for an unqualified reference.
    pub fn parse(raw: &str, namespaces: &Namespaces, location: &str) -> Result<Self, GenError> {
        let (prefix, local) = raw
            .split_once(':')
            .ok_or_else(|| GenError::shape(location, format!("unqualified type reference \"{}\"", raw)))?;

        if prefix == XSD_PREFIX {
            return Primitive::parse(local).map(TypeRef::Primitive).ok_or_else(|| {
                GenError::UnresolvedTypeReference {
                    name: raw.to_string(),
                    referenced_by: location.to_string(),
                }
            });
        }

        namespaces.check(prefix, location)?;
        Ok(TypeRef::Named(QName::new(prefix, local)))
    }

    pub fn as_named(&self) -> Option<&QName> {
        match self {
            TypeRef::Named(q) => Some(q),
            TypeRef::Primitive(_) => None,
        }
    }
}

/// Options for a generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Root interface-description document.
    pub wsdl: PathBuf,
    /// Expected target namespace; checked against the document when set.
    pub target: Option<String>,
    /// Optional documentation/version enrichment document.
    pub enrichment: Option<PathBuf>,
    /// Additional namespaces documents may reference.
    /// `vim25` and the document's own target are always allowed.
    pub namespaces: Vec<String>,
    /// Type names forced to be polymorphic bases regardless of children.
    pub force_base: Vec<String>,
    /// Go import root for cross-package references.
    pub module: String,
}

impl GenerateOptions {
    pub fn new(wsdl: impl Into<PathBuf>) -> Self {
        Self {
            wsdl: wsdl.into(),
            target: None,
            enrichment: None,
            namespaces: Vec::new(),
            force_base: Vec::new(),
            module: DEFAULT_MODULE.to_string(),
        }
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn enrichment(mut self, path: impl Into<PathBuf>) -> Self {
        self.enrichment = Some(path.into());
        self
    }

    pub fn namespace(mut self, name: impl Into<String>) -> Self {
        self.namespaces.push(name.into());
        self
    }

    /// Set forced base names from a comma-separated list, as found in the
    /// `FORCE_BASE_INTERFACE_FOR_TYPES` environment variable.
    pub fn force_base_list(mut self, list: &str) -> Self {
        self.force_base = parse_name_list(list);
        self
    }

    pub fn module(mut self, module: impl Into<String>) -> Self {
        self.module = module.into();
        self
    }
}

/// Split a comma-separated name list, dropping empty entries.
pub fn parse_name_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
