//! Typed schema node model.
//!
//! Built once from validated trees. Structural content is a closed variant so
//! later stages match exhaustively instead of inspecting child tags.

use std::collections::HashMap;

use crate::error::GenError;
use crate::loader::{RawNode, SchemaDocument};
use crate::types::{ucfirst, Namespaces, QName, TypeRef};

/// How many values a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    Required,
    Optional,
    Repeated,
}

/// Where a field's value lives on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    Element,
    Attribute,
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Ref(TypeRef),
    /// Anonymous structure declared in place, registered under the field's name.
    Inline(Box<StructDef>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Wire name.
    pub name: String,
    pub ty: FieldType,
    /// `minOccurs="0"`
    pub optional: bool,
    /// `maxOccurs="unbounded"`
    pub repeated: bool,
    pub source: FieldSource,
}

impl FieldDecl {
    pub fn cardinality(&self) -> Cardinality {
        if self.repeated {
            Cardinality::Repeated
        } else if self.optional {
            Cardinality::Optional
        } else {
            Cardinality::Required
        }
    }

    /// Host identifier: leading `_` stripped, first letter upper-cased.
    pub fn var_name(&self) -> String {
        ucfirst(self.name.strip_prefix('_').unwrap_or(&self.name))
    }

    /// Named type this field refers to, inline structures included.
    pub fn named_type(&self) -> Option<&QName> {
        match &self.ty {
            FieldType::Ref(r) => r.as_named(),
            FieldType::Inline(def) => Some(&def.name),
        }
    }
}

/// The three content shapes of a structure, plus the empty structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Empty,
    /// Character data of type `base` carrying one or more attributes.
    Value {
        base: TypeRef,
        attributes: Vec<FieldDecl>,
    },
    /// Inherits all of `base`'s fields and adds its own.
    Extension { base: QName, fields: Vec<FieldDecl> },
    Sequence { fields: Vec<FieldDecl> },
}

impl Content {
    pub fn fields(&self) -> &[FieldDecl] {
        match self {
            Content::Empty => &[],
            Content::Value { attributes, .. } => attributes,
            Content::Extension { fields, .. } | Content::Sequence { fields } => fields,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    pub name: QName,
    pub content: Content,
}

impl StructDef {
    /// `ArrayOf*` containers tag their items differently in the secondary protocol.
    pub fn is_array_of(&self) -> bool {
        self.name.local.starts_with("ArrayOf")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    pub name: QName,
    /// Literal wire values in declaration order.
    pub values: Vec<String>,
}

/// A top-level element with a declared type: `type Name Target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDef {
    pub name: QName,
    pub target: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Definition {
    Enum(EnumDef),
    Struct(StructDef),
    /// Structure wrapped by an untyped top-level element. It is a message
    /// body, not a named schema type, and gets no registry entry.
    Element(StructDef),
    Alias(AliasDef),
}

impl Definition {
    pub fn name(&self) -> &QName {
        match self {
            Definition::Enum(d) => &d.name,
            Definition::Struct(d) | Definition::Element(d) => &d.name,
            Definition::Alias(d) => &d.name,
        }
    }

    /// The structure behind a `Struct` or `Element` definition.
    pub fn as_struct(&self) -> Option<&StructDef> {
        match self {
            Definition::Struct(d) | Definition::Element(d) => Some(d),
            _ => None,
        }
    }
}

/// Hoist inline structures to the top level, then sort by name and drop
/// duplicates. The first definition of a name wins.
///
/// # Errors
///
/// Returns `GenError::SchemaShapeViolation` when two distinct names of one
/// namespace upper-case to the same host identifier (`inner` and `Inner`).
pub fn normalize(defs: Vec<Definition>) -> Result<Vec<Definition>, GenError> {
    let mut out = Vec::with_capacity(defs.len());
    for def in defs {
        if let Some(s) = def.as_struct() {
            hoist_inline(s, &mut out);
        }
        out.push(def);
    }
    out.sort_by(|a, b| a.name().cmp(b.name()));
    out.dedup_by(|a, b| a.name() == b.name());

    let mut identifiers: HashMap<(&str, String), &QName> = HashMap::new();
    for def in &out {
        let name = def.name();
        let key = (name.namespace.as_str(), ucfirst(&name.local));
        if let Some(previous) = identifiers.insert(key, name) {
            return Err(GenError::shape(
                name.to_string(),
                format!(
                    "\"{}\" and \"{}\" map to the same identifier \"{}\"",
                    previous,
                    name,
                    ucfirst(&name.local)
                ),
            ));
        }
    }

    Ok(out)
}

fn hoist_inline(def: &StructDef, out: &mut Vec<Definition>) {
    for field in def.content.fields() {
        if let FieldType::Inline(inner) = &field.ty {
            hoist_inline(inner, out);
            out.push(Definition::Struct(inner.as_ref().clone()));
        }
    }
}

/// Build the top-level definitions of one validated schema document.
///
/// # Errors
///
/// Fails on type references outside the allow-list or to unsupported
/// primitives; shape has already been checked by the validator.
pub fn definitions(
    schema: &SchemaDocument,
    namespaces: &Namespaces,
) -> Result<Vec<Definition>, GenError> {
    let builder = Builder {
        namespace: &schema.namespace,
        namespaces,
    };

    let mut defs = Vec::new();
    for node in &schema.root.children {
        let def = match node.name.as_str() {
            "simpleType" => Definition::Enum(builder.enum_def(node)?),
            "complexType" => {
                let name = node.required_attr("name")?;
                Definition::Struct(builder.struct_def(name, node)?)
            }
            "element" => builder.top_level_element(node)?,
            _ => continue,
        };
        defs.push(def);
    }
    Ok(defs)
}

struct Builder<'a> {
    namespace: &'a str,
    namespaces: &'a Namespaces,
}

impl Builder<'_> {
    fn qname(&self, local: &str) -> QName {
        QName::new(self.namespace, local)
    }

    fn type_ref(&self, node: &RawNode, attr: &str) -> Result<TypeRef, GenError> {
        TypeRef::parse(node.required_attr(attr)?, self.namespaces, &node.path)
    }

    fn enum_def(&self, node: &RawNode) -> Result<EnumDef, GenError> {
        let values = node
            .descendants_named("enumeration")
            .into_iter()
            .map(|e| e.required_attr("value").map(String::from))
            .collect::<Result<_, _>>()?;

        Ok(EnumDef {
            name: self.qname(node.required_attr("name")?),
            values,
        })
    }

    fn top_level_element(&self, node: &RawNode) -> Result<Definition, GenError> {
        let name = node.required_attr("name")?;
        if node.attr("type").is_some() {
            return Ok(Definition::Alias(AliasDef {
                name: self.qname(name),
                target: self.type_ref(node, "type")?,
            }));
        }
        Ok(Definition::Element(self.wrapped_struct(name, node)?))
    }

    /// Anonymous complexType wrapped by an untyped element.
    fn wrapped_struct(&self, name: &str, element: &RawNode) -> Result<StructDef, GenError> {
        let inner = element
            .children_named("complexType")
            .next()
            .ok_or_else(|| GenError::shape(&element.path, "untyped element without complexType"))?;
        self.struct_def(name, inner)
    }

    fn struct_def(&self, name: &str, node: &RawNode) -> Result<StructDef, GenError> {
        let content = match node.children.first() {
            None => Content::Empty,
            Some(c) => match c.name.as_str() {
                "sequence" => Content::Sequence {
                    fields: self.sequence_fields(c)?,
                },
                "complexContent" => {
                    let ext = single_child(c)?;
                    let base = match self.type_ref(ext, "base")? {
                        TypeRef::Named(q) => q,
                        TypeRef::Primitive(_) => {
                            return Err(GenError::shape(
                                &ext.path,
                                "complexContent cannot extend a primitive",
                            ))
                        }
                    };
                    Content::Extension {
                        base,
                        fields: self.sequence_fields(single_child(ext)?)?,
                    }
                }
                "simpleContent" => {
                    let ext = single_child(c)?;
                    let attributes = ext
                        .children_named("attribute")
                        .map(|a| self.attribute(a))
                        .collect::<Result<_, _>>()?;
                    Content::Value {
                        base: self.type_ref(ext, "base")?,
                        attributes,
                    }
                }
                other => {
                    return Err(GenError::shape(
                        &c.path,
                        format!("unknown complexType content \"{}\"", other),
                    ))
                }
            },
        };

        Ok(StructDef {
            name: self.qname(name),
            content,
        })
    }

    fn sequence_fields(&self, sequence: &RawNode) -> Result<Vec<FieldDecl>, GenError> {
        sequence
            .children_named("element")
            .map(|e| self.element_field(e))
            .collect()
    }

    fn element_field(&self, node: &RawNode) -> Result<FieldDecl, GenError> {
        let name = node.required_attr("name")?;
        let ty = if node.attr("type").is_some() {
            FieldType::Ref(self.type_ref(node, "type")?)
        } else {
            FieldType::Inline(Box::new(self.wrapped_struct(name, node)?))
        };

        Ok(FieldDecl {
            name: name.to_string(),
            ty,
            optional: node.attr("minOccurs") == Some("0"),
            repeated: node.attr("maxOccurs") == Some("unbounded"),
            source: FieldSource::Element,
        })
    }

    fn attribute(&self, node: &RawNode) -> Result<FieldDecl, GenError> {
        Ok(FieldDecl {
            name: node.required_attr("name")?.to_string(),
            ty: FieldType::Ref(self.type_ref(node, "type")?),
            // Attributes are always emitted, whatever their `use`.
            optional: false,
            repeated: false,
            source: FieldSource::Attribute,
        })
    }
}

fn single_child(node: &RawNode) -> Result<&RawNode, GenError> {
    match node.children.as_slice() {
        [only] => Ok(only),
        _ => Err(GenError::shape(&node.path, "expected exactly one child")),
    }
}
