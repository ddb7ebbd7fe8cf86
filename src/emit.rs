//! Artifact emission.
//!
//! Produces the four Go units: enum declarations, structure declarations,
//! polymorphic interfaces with their registry entries, and operation stubs.
//! Output depends only on the frozen type graph, the sorted definitions, and
//! the enrichment text, so identical inputs yield identical bytes.

use std::collections::BTreeSet;

use crate::enrich::Enrichment;
use crate::mapping::{FieldMapping, HostType, Mapper, CORE_PACKAGE};
use crate::model::{AliasDef, Content, Definition, EnumDef, StructDef};
use crate::operation::Operation;
use crate::overrides::SYNTHETIC_VALUE_ATTRIBUTE;
use crate::types::{ucfirst, TypeRef, CORE_NAMESPACE};
use crate::version::{comment_lines, DocBlock};

const HEADER: &str = "// Code generated by wsdl-gen. DO NOT EDIT.\n";
const SOAP_FAULT_TAG: &str = "http://schemas.xmlsoap.org/soap/envelope/ Fault,omitempty";

/// The four output units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnitKind {
    Enums,
    Types,
    Interfaces,
    Methods,
}

impl UnitKind {
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Enums,
        UnitKind::Types,
        UnitKind::Interfaces,
        UnitKind::Methods,
    ];

    /// Path relative to the target's output directory.
    pub fn path(&self) -> &'static str {
        match self {
            UnitKind::Enums => "types/enum.go",
            UnitKind::Types => "types/types.go",
            UnitKind::Interfaces => "types/if.go",
            UnitKind::Methods => "methods/methods.go",
        }
    }

    fn package(&self) -> &'static str {
        match self {
            UnitKind::Methods => "methods",
            _ => "types",
        }
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub kind: UnitKind,
    pub contents: String,
}

/// Body text plus the imports it needs.
struct UnitWriter {
    kind: UnitKind,
    body: String,
    imports: BTreeSet<String>,
}

impl UnitWriter {
    fn new(kind: UnitKind) -> Self {
        Self {
            kind,
            body: String::new(),
            imports: BTreeSet::new(),
        }
    }

    fn push(&mut self, text: &str) {
        self.body.push_str(text);
    }

    fn import(&mut self, path: impl Into<String>) {
        self.imports.insert(path.into());
    }

    fn finish(self) -> Unit {
        let mut out = String::new();
        out.push_str(HEADER);
        out.push('\n');
        out.push_str(&format!("package {}\n\n", self.kind.package()));

        if !self.imports.is_empty() {
            let (std, external): (Vec<&String>, Vec<&String>) = self
                .imports
                .iter()
                .partition(|p| !p.split('/').next().unwrap_or("").contains('.'));

            out.push_str("import (\n");
            for p in &std {
                out.push_str(&format!("\t\"{}\"\n", p));
            }
            if !std.is_empty() && !external.is_empty() {
                out.push('\n');
            }
            for p in &external {
                out.push_str(&format!("\t\"{}\"\n", p));
            }
            out.push_str(")\n\n");
        }

        out.push_str(&self.body);
        Unit {
            kind: self.kind,
            contents: out,
        }
    }
}

/// Prints units for one target namespace.
pub struct Emitter<'a> {
    mapper: Mapper<'a>,
    target: &'a str,
    module: &'a str,
    enrichment: &'a Enrichment,
}

impl<'a> Emitter<'a> {
    pub fn new(
        mapper: Mapper<'a>,
        target: &'a str,
        module: &'a str,
        enrichment: &'a Enrichment,
    ) -> Self {
        Self {
            mapper,
            target,
            module,
            enrichment,
        }
    }

    fn is_core(&self) -> bool {
        self.target == CORE_NAMESPACE
    }

    fn core_import(&self) -> String {
        format!("{}/{}/types", self.module, CORE_NAMESPACE)
    }

    /// Qualifier for helpers living in the base structural package.
    fn core_prefix(&self) -> &'static str {
        if self.is_core() {
            ""
        } else {
            "types."
        }
    }

    /// Emit all four units. `defs` must be sorted and deduplicated.
    pub fn emit_all(&self, defs: &[Definition], operations: &[Operation]) -> Vec<Unit> {
        vec![
            self.enums(defs),
            self.types(defs),
            self.interfaces(defs),
            self.methods(operations),
        ]
    }

    fn own<'d>(&self, defs: &'d [Definition]) -> impl Iterator<Item = &'d Definition> + 'd {
        let target = self.target.to_string();
        defs.iter().filter(move |d| d.name().namespace == target)
    }

    pub fn enums(&self, defs: &[Definition]) -> Unit {
        let mut w = UnitWriter::new(UnitKind::Enums);
        for def in self.own(defs) {
            if let Definition::Enum(e) = def {
                self.enum_block(&mut w, e);
            }
        }
        w.finish()
    }

    pub fn types(&self, defs: &[Definition]) -> Unit {
        let mut w = UnitWriter::new(UnitKind::Types);
        for def in self.own(defs) {
            match def {
                Definition::Struct(s) => self.struct_block(&mut w, s, true),
                Definition::Element(s) => self.struct_block(&mut w, s, false),
                Definition::Alias(a) => self.alias_block(&mut w, a),
                Definition::Enum(_) => {}
            }
        }
        w.finish()
    }

    pub fn interfaces(&self, defs: &[Definition]) -> Unit {
        let mut w = UnitWriter::new(UnitKind::Interfaces);
        let graph = self.mapper.graph();
        for def in self.own(defs) {
            if let Definition::Struct(s) = def {
                if graph.is_base(&s.name) {
                    self.interface_block(&mut w, &s.name.local);
                }
            }
        }
        w.finish()
    }

    pub fn methods(&self, operations: &[Operation]) -> Unit {
        let mut w = UnitWriter::new(UnitKind::Methods);
        if !operations.is_empty() {
            w.import("context");
            w.import(format!("{}/{}/soap", self.module, CORE_NAMESPACE));
            w.import(format!("{}/{}/types", self.module, self.target));
        }
        for op in operations {
            self.operation_block(&mut w, op);
        }
        w.finish()
    }

    fn enum_block(&self, w: &mut UnitWriter, e: &EnumDef) {
        let type_name = ucfirst(&e.name.local);
        let docs = self
            .enrichment
            .enum_description(&e.name.local)
            .map(DocBlock::scan_enum)
            .unwrap_or_default();

        w.push(&comment_lines(&docs.prose, ""));
        w.push(&format!("type {} string\n\n", type_name));

        let var_names: Vec<String> = e.values.iter().map(|v| enum_var_name(&type_name, v)).collect();

        w.push("const (\n");
        for (value, var) in e.values.iter().zip(&var_names) {
            if let Some(doc) = docs.value(value) {
                w.push(&comment_lines(&doc.prose, "\t"));
            }
            w.push(&format!("\t{} = {}(\"{}\")\n", var, type_name, value));
        }
        w.push(")\n\n");

        w.push(&format!("func (e {0}) Values() []{0} {{\n\treturn []{0}{{\n", type_name));
        for var in &var_names {
            w.push(&format!("\t\t{},\n", var));
        }
        w.push("\t}\n}\n\n");

        if !self.is_core() {
            w.import(self.core_import());
        }
        w.push(&format!(
            "func (e {}) Strings() []string {{\n\treturn {}EnumValuesAsStrings(e.Values())\n}}\n\n",
            type_name,
            self.core_prefix()
        ));

        // Versions are keyed by values the type actually declares.
        let value_versions: Vec<(&str, &str)> = docs
            .value_versions()
            .into_iter()
            .filter(|(v, _)| e.values.iter().any(|d| d == v))
            .collect();
        self.registry(w, &e.name.local, &e.name.local, docs.version.as_deref(), &value_versions);
    }

    /// Element-wrapped structures pass `register: false`; they are not
    /// looked up by type name.
    fn struct_block(&self, w: &mut UnitWriter, s: &StructDef, register: bool) {
        let docs = self
            .enrichment
            .type_description(&s.name.local)
            .map(DocBlock::scan_prose)
            .unwrap_or_default();

        w.push(&comment_lines(&docs.prose, ""));
        w.push(&format!("type {} struct {{\n", ucfirst(&s.name.local)));

        match &s.content {
            Content::Empty => {}
            Content::Value { base, attributes } => {
                for attr in attributes {
                    let mapping = self.mapper.field(attr, false);
                    self.field_line(w, s, &attr.name, &mapping);
                }
                let value = self.mapper.value_field(base);
                self.field_line(w, s, "", &value);
                if !attributes.iter().any(|a| a.name == SYNTHETIC_VALUE_ATTRIBUTE) {
                    let extra = self.mapper.synthetic_attribute(base);
                    self.field_line(w, s, "", &extra);
                }
            }
            Content::Extension { base, fields } => {
                let embedded = HostType::Named {
                    package: self.mapper.package_for(&base.namespace),
                    name: ucfirst(&base.local),
                };
                self.note_type(w, &embedded);
                w.push(&format!("\t{}\n\n", embedded));
                for f in fields {
                    let mapping = self.mapper.field(f, false);
                    self.field_line(w, s, &f.name, &mapping);
                }
            }
            Content::Sequence { fields } => {
                let array_of = s.is_array_of();
                for f in fields {
                    let mapping = self.mapper.field(f, array_of);
                    self.field_line(w, s, &f.name, &mapping);
                }
            }
        }

        w.push("}\n\n");
        if register {
            self.registry(w, &s.name.local, &s.name.local, docs.version.as_deref(), &[]);
        }
    }

    /// One struct field with its comments and tags. `wire` is empty for
    /// synthesized fields, which carry no documentation.
    fn field_line(&self, w: &mut UnitWriter, owner: &StructDef, wire: &str, m: &FieldMapping) {
        self.note_type(w, &m.repr.ty);

        let docs = if wire.is_empty() {
            DocBlock::default()
        } else {
            self.enrichment
                .property_description(&owner.name.local, wire)
                .map(DocBlock::scan_prose)
                .unwrap_or_default()
        };
        w.push(&comment_lines(&docs.prose, "\t"));

        let mut tags = format!("{} {}", m.primary, m.secondary);
        if let Some(v) = &docs.version {
            tags.push_str(&format!(" vim:\"{}\"", v));
        }
        w.push(&format!("\t{} {} `{}`\n", m.var_name, m.repr, tags));
    }

    fn alias_block(&self, w: &mut UnitWriter, a: &AliasDef) {
        // Aliases of other namespaces' types live with those types.
        if let TypeRef::Named(q) = &a.target {
            if q.namespace != self.target {
                return;
            }
        }

        let docs = self
            .enrichment
            .type_description(&a.name.local)
            .map(DocBlock::scan_prose)
            .unwrap_or_default();
        let repr = self.mapper.type_ref(&a.target);
        self.note_type(w, &repr.ty);

        w.push(&comment_lines(&docs.prose, ""));
        w.push(&format!("type {} {}\n\n", ucfirst(&a.name.local), repr));
        self.registry(w, &a.name.local, &a.name.local, None, &[]);
    }

    fn interface_block(&self, w: &mut UnitWriter, local: &str) {
        let name = ucfirst(local);
        let method = format!("Get{0}() *{0}", name);
        w.push(&format!("func (b *{}) {} {{ return b }}\n\n", name, method));
        w.push(&format!("type Base{} interface {{\n\t{}\n}}\n\n", name, method));
        self.registry(w, &format!("Base{}", name), local, None, &[]);
    }

    fn operation_block(&self, w: &mut UnitWriter, op: &Operation) {
        let func = op.func_name();
        let input = format!("{}.{}", CORE_PACKAGE, ucfirst(&op.input));
        let output = format!("{}.{}", CORE_PACKAGE, ucfirst(&op.output));
        let response_ns = if op.namespace == CORE_NAMESPACE {
            String::new()
        } else {
            format!("urn:{} ", op.namespace)
        };

        w.push(&format!("type {}Body struct {{\n", func));
        w.push(&format!(
            "\tReq *{} `xml:\"urn:{} {},omitempty\"`\n",
            input, op.namespace, op.input
        ));
        w.push(&format!(
            "\tRes *{} `xml:\"{}{},omitempty\"`\n",
            output, response_ns, op.output
        ));
        w.push(&format!("\tFault_ *soap.Fault `xml:\"{}\"`\n", SOAP_FAULT_TAG));
        w.push("}\n\n");

        w.push(&format!(
            "func (b *{}Body) Fault() *soap.Fault {{ return b.Fault_ }}\n\n",
            func
        ));

        w.push(&format!(
            "func {0}(ctx context.Context, r soap.RoundTripper, req *{1}) (*{2}, error) {{\n",
            func, input, output
        ));
        w.push(&format!("\tvar reqBody, resBody {}Body\n\n", func));
        w.push("\treqBody.Req = req\n\n");
        w.push("\tif err := r.RoundTrip(ctx, &reqBody, &resBody); err != nil {\n");
        w.push("\t\treturn nil, err\n\t}\n\n");
        w.push("\treturn resBody.Res, nil\n}\n\n");
    }

    /// Registry `init()` binding a wire name to a reflected type.
    fn registry(
        &self,
        w: &mut UnitWriter,
        name: &str,
        kind: &str,
        version: Option<&str>,
        value_versions: &[(&str, &str)],
    ) {
        w.import("reflect");
        let reflected = format!("reflect.TypeOf((*{})(nil)).Elem()", ucfirst(kind));

        w.push("func init() {\n");
        if self.is_core() {
            w.push(&format!("\tt[\"{}\"] = {}\n", name, reflected));
            if let Some(v) = version {
                w.push(&format!("\tminAPIVersionForType[\"{}\"] = \"{}\"\n", name, v));
            }
            if !value_versions.is_empty() {
                w.push(&format!(
                    "\tminAPIVersionForEnumValue[\"{}\"] = map[string]string{{\n",
                    name
                ));
                for (value, v) in value_versions {
                    w.push(&format!("\t\t\"{}\": \"{}\",\n", value, v));
                }
                w.push("\t}\n");
            }
        } else {
            w.import(self.core_import());
            let name = if name.starts_with("Base") {
                name.to_string()
            } else {
                format!("{}:{}", self.target, name)
            };
            w.push(&format!("\ttypes.Add(\"{}\", {})\n", name, reflected));
            if let Some(v) = version {
                w.push(&format!(
                    "\ttypes.AddMinAPIVersionForType(\"{}\", \"{}\")\n",
                    name, v
                ));
            }
            for (value, v) in value_versions {
                w.push(&format!(
                    "\ttypes.AddMinAPIVersionForEnumValue(\"{}\", \"{}\", \"{}\")\n",
                    name, value, v
                ));
            }
        }
        w.push("}\n\n");
    }

    /// Record imports a host type pulls in.
    fn note_type(&self, w: &mut UnitWriter, ty: &HostType) {
        if ty.package().is_some() {
            w.import(self.core_import());
        }
        if *ty == HostType::Builtin("time.Time") {
            w.import("time");
        }
    }
}

/// Constant identifier for an enum value; the empty value becomes `Null`.
pub fn enum_var_name(type_name: &str, value: &str) -> String {
    if value.is_empty() {
        format!("{}Null", type_name)
    } else {
        format!("{}{}", type_name, ucfirst(value))
    }
}
