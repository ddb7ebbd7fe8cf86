//! Field representation and serialization tags.
//!
//! Rules apply in precedence order:
//!
//! | Declared type | Representation |
//! |---------------|----------------|
//! | primitive | fixed host type; optional `boolean`/`dateTime` become pointers |
//! | polymorphic base | `Base<Name>` accessor, never a pointer, discriminator tag |
//! | enum | enum type, never a pointer |
//! | other named type | pointer if optional, sequence if repeated, value otherwise |
//!
//! The name tables in [`crate::overrides`] take precedence over all of them.

use std::fmt;

use crate::model::{FieldDecl, FieldSource, FieldType};
use crate::overrides::{
    listed, KEEP_EMPTY_ANY, KEEP_EMPTY_SEQUENCE, KEEP_EMPTY_STRING, POINTER_ALWAYS,
    POINTER_WHEN_OPTIONAL, SECONDARY_SUPPRESSED, SYNTHETIC_VALUE_ATTRIBUTE,
};
use crate::resolver::TypeGraph;
use crate::types::{Primitive, QName, TypeRef, CORE_NAMESPACE};

/// Package name under which the base structural unit is imported.
pub const CORE_PACKAGE: &str = "types";

/// A host type expression without wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostType {
    Builtin(&'static str),
    Named {
        package: Option<&'static str>,
        name: String,
    },
    /// Accessor interface of a polymorphic base.
    Polymorphic {
        package: Option<&'static str>,
        name: String,
    },
}

impl HostType {
    pub fn package(&self) -> Option<&'static str> {
        match self {
            HostType::Builtin(_) => None,
            HostType::Named { package, .. } | HostType::Polymorphic { package, .. } => *package,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (package, prefix, name) = match self {
            HostType::Builtin(name) => return f.write_str(name),
            HostType::Named { package, name } => (package, "", name),
            HostType::Polymorphic { package, name } => (package, "Base", name),
        };
        if let Some(pkg) = package {
            write!(f, "{}.", pkg)?;
        }
        write!(f, "{}{}", prefix, name)
    }
}

/// Field representation: optional sequence, optional pointer, host type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repr {
    pub ty: HostType,
    pub repeated: bool,
    pub pointer: bool,
}

impl Repr {
    fn value(ty: HostType) -> Self {
        Self {
            ty,
            repeated: false,
            pointer: false,
        }
    }
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repeated {
            f.write_str("[]")?;
        }
        if self.pointer {
            f.write_str("*")?;
        }
        write!(f, "{}", self.ty)
    }
}

/// Primary protocol (`xml`) tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimaryTag {
    pub name: String,
    pub omit_empty: bool,
    pub attr: bool,
    pub type_attr: bool,
    pub chardata: bool,
}

impl fmt::Display for PrimaryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.chardata {
            return f.write_str("xml:\",chardata\"");
        }
        write!(f, "xml:\"{}", self.name)?;
        if self.omit_empty {
            f.write_str(",omitempty")?;
        }
        if self.attr {
            f.write_str(",attr")?;
        }
        if self.type_attr {
            f.write_str(",typeattr")?;
        }
        f.write_str("\"")
    }
}

/// Secondary protocol (`json`) tag.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecondaryTag {
    pub name: String,
    pub omit_empty: bool,
    pub suppressed: bool,
}

impl fmt::Display for SecondaryTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.suppressed {
            return f.write_str("json:\"-\"");
        }
        write!(f, "json:\"{}", self.name)?;
        if self.omit_empty {
            f.write_str(",omitempty")?;
        }
        f.write_str("\"")
    }
}

/// Everything the emitter needs to print one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub var_name: String,
    pub repr: Repr,
    pub primary: PrimaryTag,
    pub secondary: SecondaryTag,
}

impl FieldMapping {
    /// The static type is ambiguous and the wire value names its subtype.
    pub fn needs_discriminator(&self) -> bool {
        self.primary.type_attr
    }
}

/// Applies the rule table against a frozen type graph.
#[derive(Debug, Clone, Copy)]
pub struct Mapper<'a> {
    graph: &'a TypeGraph,
    target: &'a str,
}

/// Omit-if-empty decisions made while choosing the representation.
#[derive(Default)]
struct Omit {
    primary: Option<bool>,
    secondary: Option<bool>,
}

impl Omit {
    fn pointer_wrapped(&mut self) {
        self.primary = Some(false);
        self.secondary = Some(true);
    }
}

impl<'a> Mapper<'a> {
    pub fn new(graph: &'a TypeGraph, target: &'a str) -> Self {
        Self { graph, target }
    }

    pub fn graph(&self) -> &'a TypeGraph {
        self.graph
    }

    /// Qualifier for a type living in `namespace`.
    pub fn package_for(&self, namespace: &str) -> Option<&'static str> {
        if namespace == self.target {
            None
        } else {
            Some(CORE_PACKAGE)
        }
    }

    fn core_type(&self, name: &str) -> HostType {
        HostType::Named {
            package: self.package_for(CORE_NAMESPACE),
            name: name.to_string(),
        }
    }

    /// Plain host type of a named type: accessor form for bases.
    pub fn named_type(&self, q: &QName) -> HostType {
        let package = self.package_for(&q.namespace);
        let name = crate::types::ucfirst(&q.local);
        if self.graph.is_base(q) {
            HostType::Polymorphic { package, name }
        } else {
            HostType::Named { package, name }
        }
    }

    /// Representation of a bare type reference (alias targets).
    pub fn type_ref(&self, r: &TypeRef) -> Repr {
        match r {
            TypeRef::Named(q) => Repr::value(self.named_type(q)),
            TypeRef::Primitive(p) => Repr::value(self.primitive(*p)),
        }
    }

    fn primitive(&self, p: Primitive) -> HostType {
        match p {
            Primitive::String | Primitive::AnyUri => HostType::Builtin("string"),
            Primitive::Int => HostType::Builtin("int32"),
            Primitive::Long => HostType::Builtin("int64"),
            Primitive::Short => HostType::Builtin("int16"),
            Primitive::Boolean => HostType::Builtin("bool"),
            Primitive::Double => HostType::Builtin("float64"),
            Primitive::Float => HostType::Builtin("float32"),
            Primitive::Byte => HostType::Builtin("byte"),
            Primitive::DateTime => HostType::Builtin("time.Time"),
            Primitive::Base64Binary => HostType::Builtin("[]byte"),
            Primitive::AnyType => self.core_type("AnyType"),
        }
    }

    /// Map one declared field.
    ///
    /// `array_of` is set for fields of `ArrayOf*` containers.
    pub fn field(&self, field: &FieldDecl, array_of: bool) -> FieldMapping {
        let var_name = field.var_name();
        let optional = field.optional;
        let mut omit = Omit::default();
        let mut type_attr = false;

        let mut repr = Repr {
            ty: HostType::Builtin(""),
            repeated: field.repeated,
            pointer: false,
        };
        if field.repeated && listed(KEEP_EMPTY_SEQUENCE, &var_name) {
            omit.primary = Some(false);
        }

        match &field.ty {
            FieldType::Ref(TypeRef::Primitive(p)) => {
                repr.ty = self.primitive(*p);
                match p {
                    Primitive::String => {
                        if listed(KEEP_EMPTY_STRING, &var_name) {
                            omit.primary = Some(false);
                        }
                    }
                    Primitive::Int | Primitive::Long => {
                        if pointer_override(&var_name, optional) {
                            repr.pointer = true;
                            omit.pointer_wrapped();
                        }
                    }
                    Primitive::Boolean | Primitive::DateTime => {
                        if !field.repeated && optional {
                            repr.pointer = true;
                            omit.pointer_wrapped();
                        }
                    }
                    Primitive::AnyType => {
                        type_attr = true;
                        if listed(KEEP_EMPTY_ANY, &var_name) {
                            omit.primary = Some(false);
                        }
                    }
                    Primitive::Byte => {
                        if field.repeated {
                            repr.repeated = false;
                            repr.ty = self.core_type("ByteSlice");
                        }
                    }
                    _ => {}
                }
            }
            FieldType::Ref(TypeRef::Named(q)) => {
                type_attr = self.named(q, field, &mut repr);
            }
            FieldType::Inline(def) => {
                type_attr = self.named(&def.name, field, &mut repr);
            }
        }

        let primary_omit = omit.primary.unwrap_or(optional);
        let secondary_omit = omit.secondary.unwrap_or(primary_omit);

        let primary = PrimaryTag {
            name: field.name.clone(),
            omit_empty: primary_omit,
            attr: field.source == FieldSource::Attribute,
            type_attr,
            chardata: false,
        };

        let secondary = if field.source == FieldSource::Attribute {
            SecondaryTag {
                name: field.name.clone(),
                omit_empty: secondary_omit,
                suppressed: false,
            }
        } else if array_of {
            SecondaryTag {
                name: "_value".to_string(),
                omit_empty: false,
                suppressed: false,
            }
        } else {
            let rendered = repr.to_string();
            let suppressed = SECONDARY_SUPPRESSED
                .iter()
                .any(|(n, t)| *n == var_name && *t == rendered);
            SecondaryTag {
                name: field.name.clone(),
                omit_empty: secondary_omit && !suppressed,
                suppressed,
            }
        };

        FieldMapping {
            var_name,
            repr,
            primary,
            secondary,
        }
    }

    /// Rules 2-4 for a named type. Returns whether a discriminator is needed.
    fn named(&self, q: &QName, field: &FieldDecl, repr: &mut Repr) -> bool {
        repr.ty = self.named_type(q);
        if self.graph.is_base(q) {
            return true;
        }
        repr.pointer = !field.repeated && !self.graph.is_enum(q) && field.optional;
        false
    }

    /// Character data field of a value-with-attributes structure.
    pub fn value_field(&self, base: &TypeRef) -> FieldMapping {
        FieldMapping {
            var_name: "Value".to_string(),
            repr: self.type_ref(base),
            primary: PrimaryTag {
                chardata: true,
                ..PrimaryTag::default()
            },
            secondary: SecondaryTag {
                name: "value".to_string(),
                ..SecondaryTag::default()
            },
        }
    }

    /// Attribute appended to every value-with-attributes structure.
    pub fn synthetic_attribute(&self, base: &TypeRef) -> FieldMapping {
        FieldMapping {
            var_name: "ServerGUID".to_string(),
            repr: self.type_ref(base),
            primary: PrimaryTag {
                name: SYNTHETIC_VALUE_ATTRIBUTE.to_string(),
                omit_empty: true,
                attr: true,
                ..PrimaryTag::default()
            },
            secondary: SecondaryTag {
                name: SYNTHETIC_VALUE_ATTRIBUTE.to_string(),
                omit_empty: true,
                suppressed: false,
            },
        }
    }
}

fn pointer_override(var_name: &str, optional: bool) -> bool {
    listed(POINTER_ALWAYS, var_name) || (optional && listed(POINTER_WHEN_OPTIONAL, var_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Content, Definition, EnumDef, StructDef};
    use crate::resolver::resolve;

    fn q(local: &str) -> QName {
        QName::new("vim25", local)
    }

    fn graph() -> TypeGraph {
        let seq = |name: &str| {
            Definition::Struct(StructDef {
                name: q(name),
                content: Content::Sequence { fields: vec![] },
            })
        };
        let ext = |name: &str, base: &str| {
            Definition::Struct(StructDef {
                name: q(name),
                content: Content::Extension {
                    base: q(base),
                    fields: vec![],
                },
            })
        };
        let defs = vec![
            seq("VirtualDevice"),
            ext("VirtualDisk", "VirtualDevice"),
            seq("Description"),
            seq("ManagedObjectReference"),
            Definition::Enum(EnumDef {
                name: q("PowerState"),
                values: vec!["on".into()],
            }),
        ];
        resolve(&defs, &[] as &[&str]).unwrap()
    }

    fn field(name: &str, ty: TypeRef, optional: bool, repeated: bool) -> FieldDecl {
        FieldDecl {
            name: name.into(),
            ty: FieldType::Ref(ty),
            optional,
            repeated,
            source: FieldSource::Element,
        }
    }

    fn prim(p: Primitive) -> TypeRef {
        TypeRef::Primitive(p)
    }

    fn named(local: &str) -> TypeRef {
        TypeRef::Named(q(local))
    }

    fn render(m: &FieldMapping) -> String {
        format!("{} {} `{} {}`", m.var_name, m.repr, m.primary, m.secondary)
    }

    #[test]
    fn primitives_map_to_fixed_host_types() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let cases = [
            (Primitive::String, "string"),
            (Primitive::Int, "int32"),
            (Primitive::Long, "int64"),
            (Primitive::Short, "int16"),
            (Primitive::Double, "float64"),
            (Primitive::Float, "float32"),
            (Primitive::Base64Binary, "[]byte"),
            (Primitive::AnyUri, "string"),
            (Primitive::AnyType, "AnyType"),
            (Primitive::DateTime, "time.Time"),
        ];
        for (p, expected) in cases {
            let f = m.field(&field("x", prim(p), false, false), false);
            assert_eq!(f.repr.to_string(), expected, "{:?}", p);
        }
    }

    #[test]
    fn optional_string_omits_when_empty() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let f = m.field(&field("name", prim(Primitive::String), true, false), false);
        assert_eq!(render(&f), r#"Name string `xml:"name,omitempty" json:"name,omitempty"`"#);
    }

    #[test]
    fn optional_boolean_is_pointer_wrapped() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let f = m.field(&field("connected", prim(Primitive::Boolean), true, false), false);
        assert_eq!(
            render(&f),
            r#"Connected *bool `xml:"connected" json:"connected,omitempty"`"#
        );

        let f = m.field(&field("flags", prim(Primitive::Boolean), true, true), false);
        assert_eq!(f.repr.to_string(), "[]bool");
    }

    #[test]
    fn repeated_byte_is_blob() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let f = m.field(&field("data", prim(Primitive::Byte), true, true), false);
        assert_eq!(f.repr.to_string(), "ByteSlice");

        let m = Mapper::new(&g, "pbm");
        let f = m.field(&field("data", prim(Primitive::Byte), true, true), false);
        assert_eq!(f.repr.to_string(), "types.ByteSlice");
    }

    #[test]
    fn base_type_field_uses_accessor_and_discriminator() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let f = m.field(&field("device", named("VirtualDevice"), true, false), false);
        assert_eq!(
            render(&f),
            r#"Device BaseVirtualDevice `xml:"device,omitempty,typeattr" json:"device,omitempty"`"#
        );
        assert!(f.needs_discriminator());

        let f = m.field(&field("device", named("VirtualDevice"), true, true), false);
        assert_eq!(f.repr.to_string(), "[]BaseVirtualDevice");
    }

    #[test]
    fn enum_field_never_pointer() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let f = m.field(&field("powerState", named("PowerState"), true, false), false);
        assert_eq!(f.repr.to_string(), "PowerState");
        assert!(f.primary.omit_empty);
    }

    #[test]
    fn struct_field_cardinality_rules() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let optional = m.field(&field("description", named("Description"), true, false), false);
        assert_eq!(optional.repr.to_string(), "*Description");

        let repeated = m.field(&field("description", named("Description"), true, true), false);
        assert_eq!(repeated.repr.to_string(), "[]Description");

        let required = m.field(&field("description", named("Description"), false, false), false);
        assert_eq!(required.repr.to_string(), "Description");
        assert!(!required.primary.omit_empty);
    }

    #[test]
    fn cross_namespace_types_are_qualified() {
        let g = graph();
        let m = Mapper::new(&g, "pbm");
        let f = m.field(&field("device", named("VirtualDevice"), false, false), false);
        assert_eq!(f.repr.to_string(), "types.BaseVirtualDevice");
        let f = m.field(&field("d", named("Description"), true, false), false);
        assert_eq!(f.repr.to_string(), "*types.Description");
        let f = m.field(&field("value", prim(Primitive::AnyType), false, false), false);
        assert_eq!(f.repr.to_string(), "types.AnyType");
    }

    #[test]
    fn pointer_override_table() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");

        let f = m.field(&field("reservation", prim(Primitive::Long), true, false), false);
        assert_eq!(
            render(&f),
            r#"Reservation *int64 `xml:"reservation" json:"reservation,omitempty"`"#
        );

        // Only optional fields in the conditional table.
        let f = m.field(&field("reservation", prim(Primitive::Long), false, false), false);
        assert_eq!(f.repr.to_string(), "int64");

        // Unlisted optional integers stay by value.
        let f = m.field(&field("shares", prim(Primitive::Int), true, false), false);
        assert_eq!(f.repr.to_string(), "int32");

        let f = m.field(&field("unitNumber", prim(Primitive::Int), false, false), false);
        assert_eq!(f.repr.to_string(), "*int32");
    }

    #[test]
    fn keep_empty_overrides() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");

        let f = m.field(&field("ipPoolName", prim(Primitive::String), true, false), false);
        assert_eq!(render(&f), r#"IpPoolName string `xml:"ipPoolName" json:"ipPoolName"`"#);

        let f = m.field(&field("affinitySet", prim(Primitive::Int), true, true), false);
        assert_eq!(
            render(&f),
            r#"AffinitySet []int32 `xml:"affinitySet" json:"affinitySet"`"#
        );

        let f = m.field(&field("value", prim(Primitive::AnyType), true, false), false);
        assert_eq!(
            render(&f),
            r#"Value AnyType `xml:"value,typeattr" json:"value"`"#
        );
    }

    #[test]
    fn this_reference_suppressed_in_secondary_protocol() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let f = m.field(&field("_this", named("ManagedObjectReference"), false, false), false);
        assert_eq!(
            render(&f),
            r#"This ManagedObjectReference `xml:"_this" json:"-"`"#
        );
    }

    #[test]
    fn array_of_items_use_value_tag() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let f = m.field(&field("string", prim(Primitive::String), true, true), true);
        assert_eq!(
            render(&f),
            r#"String []string `xml:"string,omitempty" json:"_value"`"#
        );
    }

    #[test]
    fn attributes_and_value_fields() {
        let g = graph();
        let m = Mapper::new(&g, "vim25");
        let attr = FieldDecl {
            name: "type".into(),
            ty: FieldType::Ref(prim(Primitive::String)),
            optional: false,
            repeated: false,
            source: FieldSource::Attribute,
        };
        let f = m.field(&attr, false);
        assert_eq!(render(&f), r#"Type string `xml:"type,attr" json:"type"`"#);

        let base = prim(Primitive::String);
        let v = m.value_field(&base);
        assert_eq!(render(&v), r#"Value string `xml:",chardata" json:"value"`"#);

        let s = m.synthetic_attribute(&base);
        assert_eq!(
            render(&s),
            r#"ServerGUID string `xml:"serverGuid,omitempty,attr" json:"serverGuid,omitempty"`"#
        );
    }
}
