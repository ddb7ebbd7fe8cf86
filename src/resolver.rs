//! Whole-forest type graph resolution.
//!
//! Resolution is two-phase. [`TypeGraphBuilder`] collects every definition,
//! recording kinds, extension edges, and references. [`TypeGraphBuilder::finish`]
//! consumes the builder and yields a [`TypeGraph`], which has no mutating API:
//! whether a type is a polymorphic base is only queryable once every
//! definition has contributed its edges.

use std::collections::{BTreeSet, HashMap};

use tracing::info;

use crate::error::GenError;
use crate::model::{Content, Definition, FieldDecl};
use crate::overrides::LEGACY_NON_BASE;
use crate::types::QName;

/// Index of a type in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Enum,
    Struct,
}

/// One named type record.
#[derive(Debug, Clone)]
pub struct NamedType {
    pub name: QName,
    /// `None` while the type is only known as an extension base.
    kind: Option<TypeKind>,
    parent: Option<TypeId>,
    children: BTreeSet<TypeId>,
}

impl NamedType {
    fn placeholder(name: QName) -> Self {
        Self {
            name,
            kind: None,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> Option<TypeKind> {
        self.kind
    }
}

/// Collect phase.
#[derive(Debug, Default)]
pub struct TypeGraphBuilder {
    types: Vec<NamedType>,
    index: HashMap<QName, TypeId>,
    /// (referenced name, referencing definition)
    references: Vec<(QName, String)>,
    forced: BTreeSet<String>,
}

impl TypeGraphBuilder {
    /// Create a builder with names forced to be polymorphic bases.
    pub fn new<I, S>(forced: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            forced: forced.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Register a name, returning its id. Idempotent.
    pub fn register(&mut self, name: &QName) -> TypeId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = TypeId(self.types.len() as u32);
        self.types.push(NamedType::placeholder(name.clone()));
        self.index.insert(name.clone(), id);
        id
    }

    fn define(&mut self, name: &QName, kind: TypeKind) -> TypeId {
        let id = self.register(name);
        self.types[id.0 as usize].kind = Some(kind);
        id
    }

    fn reference(&mut self, name: &QName, from: &QName) {
        self.references.push((name.clone(), from.to_string()));
    }

    fn reference_fields(&mut self, fields: &[FieldDecl], from: &QName) {
        for field in fields {
            if let Some(name) = field.named_type() {
                self.reference(name, from);
            }
        }
    }

    /// Record one definition.
    pub fn collect(&mut self, def: &Definition) {
        match def {
            Definition::Enum(e) => {
                self.define(&e.name, TypeKind::Enum);
            }
            Definition::Alias(a) => {
                if let Some(target) = a.target.as_named() {
                    self.reference(target, &a.name);
                }
            }
            Definition::Struct(s) | Definition::Element(s) => {
                let id = self.define(&s.name, TypeKind::Struct);
                match &s.content {
                    Content::Empty => {}
                    Content::Value { base, attributes } => {
                        if let Some(base) = base.as_named() {
                            self.reference(base, &s.name);
                        }
                        self.reference_fields(attributes, &s.name);
                    }
                    Content::Sequence { fields } => self.reference_fields(fields, &s.name),
                    Content::Extension { base, fields } => {
                        self.reference_fields(fields, &s.name);
                        self.reference(base, &s.name);
                        let base_id = self.register(base);
                        self.types[id.0 as usize].parent = Some(base_id);
                        self.types[base_id.0 as usize].children.insert(id);
                    }
                }
            }
        }
    }

    /// Freeze the graph.
    ///
    /// # Errors
    ///
    /// Returns `GenError::UnresolvedTypeReference` for the first reference
    /// (field type, extension base, alias target) whose name was never
    /// defined.
    pub fn finish(self) -> Result<TypeGraph, GenError> {
        for (name, from) in &self.references {
            let defined = self
                .index
                .get(name)
                .map(|id| self.types[id.0 as usize].kind.is_some())
                .unwrap_or(false);
            if !defined {
                return Err(GenError::UnresolvedTypeReference {
                    name: name.to_string(),
                    referenced_by: from.clone(),
                });
            }
        }

        let graph = TypeGraph {
            types: self.types,
            index: self.index,
            forced: self.forced,
        };
        info!(
            types = graph.len(),
            base_types = graph.base_count(),
            "resolved type graph"
        );
        Ok(graph)
    }
}

/// Build the frozen graph from definitions.
///
/// Definitions are visited sorted by name with duplicates dropped, so the
/// result does not depend on document order.
pub fn resolve<'a, I, S>(defs: I, forced: &[S]) -> Result<TypeGraph, GenError>
where
    I: IntoIterator<Item = &'a Definition>,
    S: AsRef<str>,
{
    let mut sorted: Vec<&Definition> = defs.into_iter().collect();
    sorted.sort_by(|a, b| a.name().cmp(b.name()));
    sorted.dedup_by(|a, b| a.name() == b.name());

    let mut builder = TypeGraphBuilder::new(forced.iter().map(|s| s.as_ref().to_string()));
    for def in sorted {
        builder.collect(def);
    }
    builder.finish()
}

/// Frozen, read-only type graph.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    types: Vec<NamedType>,
    index: HashMap<QName, TypeId>,
    forced: BTreeSet<String>,
}

impl TypeGraph {
    pub fn get(&self, name: &QName) -> Option<&NamedType> {
        self.index.get(name).map(|id| &self.types[id.0 as usize])
    }

    pub fn kind(&self, name: &QName) -> Option<TypeKind> {
        self.get(name).and_then(NamedType::kind)
    }

    pub fn is_enum(&self, name: &QName) -> bool {
        self.kind(name) == Some(TypeKind::Enum)
    }

    /// Whether fields of this type need the polymorphic accessor form.
    ///
    /// True when another type extends it or the name is forced, unless the
    /// name is one of the legacy types that are never bases. Enums are
    /// never bases.
    pub fn is_base(&self, name: &QName) -> bool {
        if LEGACY_NON_BASE.contains(&name.local.as_str()) || self.is_enum(name) {
            return false;
        }
        let has_children = self
            .get(name)
            .map(|t| !t.children.is_empty())
            .unwrap_or(false);
        has_children || self.forced.contains(&name.local)
    }

    pub fn parent(&self, name: &QName) -> Option<&QName> {
        let parent = self.get(name)?.parent?;
        Some(&self.types[parent.0 as usize].name)
    }

    /// Types extending `name`, sorted.
    pub fn children(&self, name: &QName) -> Vec<&QName> {
        let mut names: Vec<&QName> = self
            .get(name)
            .map(|t| {
                t.children
                    .iter()
                    .map(|c| &self.types[c.0 as usize].name)
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Number of defined types.
    pub fn len(&self) -> usize {
        self.types.iter().filter(|t| t.kind.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of defined types that are polymorphic bases.
    pub fn base_count(&self) -> usize {
        self.types
            .iter()
            .filter(|t| t.kind.is_some() && self.is_base(&t.name))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EnumDef, FieldSource, FieldType, StructDef};
    use crate::types::{Primitive, TypeRef};

    fn q(local: &str) -> QName {
        QName::new("vim25", local)
    }

    fn sequence(name: &str, fields: Vec<FieldDecl>) -> Definition {
        Definition::Struct(StructDef {
            name: q(name),
            content: Content::Sequence { fields },
        })
    }

    fn extension(name: &str, base: &str) -> Definition {
        Definition::Struct(StructDef {
            name: q(name),
            content: Content::Extension {
                base: q(base),
                fields: vec![],
            },
        })
    }

    fn field(name: &str, ty: &str) -> FieldDecl {
        FieldDecl {
            name: name.into(),
            ty: FieldType::Ref(TypeRef::Named(q(ty))),
            optional: true,
            repeated: false,
            source: FieldSource::Element,
        }
    }

    const NONE: &[&str] = &[];

    #[test]
    fn base_iff_extended() {
        let defs = vec![
            sequence("A", vec![]),
            extension("B", "A"),
            extension("C", "A"),
            sequence("D", vec![]),
        ];
        let graph = resolve(&defs, NONE).unwrap();

        assert!(graph.is_base(&q("A")));
        assert!(!graph.is_base(&q("B")));
        assert!(!graph.is_base(&q("D")));
        assert_eq!(graph.children(&q("A")), vec![&q("B"), &q("C")]);
        assert_eq!(graph.parent(&q("B")), Some(&q("A")));
        assert_eq!(graph.len(), 4);
        assert_eq!(graph.base_count(), 1);
    }

    #[test]
    fn forced_names_are_bases_without_children() {
        let defs = vec![sequence("HostProfile", vec![])];
        let graph = resolve(&defs, &["HostProfile"]).unwrap();
        assert!(graph.is_base(&q("HostProfile")));
    }

    #[test]
    fn legacy_names_never_bases() {
        let defs = vec![
            sequence("ResourceAllocationInfo", vec![]),
            extension("VrpResourceAllocationInfo", "ResourceAllocationInfo"),
        ];
        let graph = resolve(&defs, &["ResourceAllocationInfo"]).unwrap();
        assert!(!graph.is_base(&q("ResourceAllocationInfo")));
        assert_eq!(graph.children(&q("ResourceAllocationInfo")).len(), 1);
    }

    #[test]
    fn order_independent() {
        let forward = vec![
            sequence("A", vec![field("x", "B")]),
            extension("B", "A"),
            extension("C", "B"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let g1 = resolve(&forward, NONE).unwrap();
        let g2 = resolve(&reversed, NONE).unwrap();
        for name in ["A", "B", "C"] {
            assert_eq!(g1.is_base(&q(name)), g2.is_base(&q(name)), "{}", name);
        }
        assert!(g1.is_base(&q("B")));
    }

    #[test]
    fn duplicate_definitions_register_once() {
        let defs = vec![sequence("A", vec![]), sequence("A", vec![]), extension("B", "A")];
        let graph = resolve(&defs, NONE).unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn enum_kind_recorded() {
        let defs = vec![Definition::Enum(EnumDef {
            name: q("Power"),
            values: vec!["on".into(), "off".into()],
        })];
        let graph = resolve(&defs, &["Power"]).unwrap();
        assert!(graph.is_enum(&q("Power")));
        assert_eq!(graph.kind(&q("Power")), Some(TypeKind::Enum));
        assert!(!graph.is_base(&q("Power")));
    }

    #[test]
    fn undefined_extension_base_is_unresolved() {
        let defs = vec![extension("B", "Missing")];
        let err = resolve(&defs, NONE).unwrap_err();
        assert!(matches!(
            err,
            GenError::UnresolvedTypeReference { ref name, .. } if name == "vim25:Missing"
        ));
    }

    #[test]
    fn undefined_field_type_is_unresolved() {
        let defs = vec![sequence("A", vec![field("x", "Nowhere")])];
        assert!(resolve(&defs, NONE).is_err());
    }

    #[test]
    fn primitive_fields_need_no_definition() {
        let defs = vec![sequence(
            "A",
            vec![FieldDecl {
                name: "n".into(),
                ty: FieldType::Ref(TypeRef::Primitive(Primitive::Int)),
                optional: false,
                repeated: false,
                source: FieldSource::Element,
            }],
        )];
        assert!(resolve(&defs, NONE).is_ok());
    }
}
