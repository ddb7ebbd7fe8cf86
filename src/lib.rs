//! WSDL Binding Generator
//!
//! Offline compiler from a vSphere-style interface description (a WSDL
//! document plus the XSD schemas it embeds or links) to Go source units.
//!
//! # Example
//!
//! ```no_run
//! use wsdl_gen::{generate, write_units, GenerateOptions};
//!
//! let options = GenerateOptions::new("sdk/vim25.wsdl")
//!     .target("vim25")
//!     .enrichment("sdk/vim25.json");
//! let generation = generate(&options).unwrap();
//! write_units("out".as_ref(), &generation).unwrap();
//! ```
//!
//! # Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | load | `loader` | raw document forest |
//! | validate | `validator` | shape-checked forest |
//! | model | `model` | sorted definitions |
//! | resolve | `resolver` | frozen type graph |
//! | map | `mapping` | field representations and tags |
//! | emit | `emit` | enum, struct, interface, and method units |
//!
//! Each stage completes before the next begins, and the first error stops
//! the run. No unit is written unless generation as a whole succeeded.

mod emit;
mod enrich;
mod error;
mod loader;
mod mapping;
mod model;
mod operation;
mod overrides;
mod resolver;
mod types;
mod validator;
mod version;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

pub use emit::{enum_var_name, Emitter, Unit, UnitKind};
pub use enrich::{Enrichment, PropertyDoc, TypeDoc};
pub use error::GenError;
pub use loader::{load_enrichment, load_forest, parse_document, Forest, RawNode, SchemaDocument};
pub use mapping::{FieldMapping, HostType, Mapper, PrimaryTag, Repr, SecondaryTag};
pub use model::{definitions, normalize, Content, Definition, FieldDecl, StructDef};
pub use operation::{operations, Operation};
pub use resolver::{resolve, TypeGraph, TypeGraphBuilder, TypeKind};
pub use types::{parse_name_list, GenerateOptions, Namespaces, QName, TypeRef, DEFAULT_MODULE};
pub use validator::{validate, validate_schema};
pub use version::{since_version, DocBlock, ValueDoc};

/// Result of a successful generation run, not yet written to disk.
#[derive(Debug, Clone)]
pub struct Generation {
    /// Target namespace of the root document.
    pub target: String,
    pub units: Vec<Unit>,
    /// Defined types across every loaded namespace.
    pub total_types: usize,
    /// Defined types that are polymorphic bases.
    pub base_types: usize,
}

/// Run the whole pipeline in memory.
///
/// # Errors
///
/// Returns the first error raised by any stage; see [`GenError`].
pub fn generate(options: &GenerateOptions) -> Result<Generation, GenError> {
    let forest = load_forest(&options.wsdl, &options.namespaces)?;
    let target = forest.wsdl.target.clone();

    if let Some(expected) = &options.target {
        if *expected != target {
            return Err(GenError::TargetMismatch {
                expected: expected.clone(),
                actual: target,
            });
        }
    }

    validate(&forest)?;

    let enrichment = match &options.enrichment {
        Some(path) => load_enrichment(path)?,
        None => Enrichment::default(),
    };

    let mut defs = Vec::new();
    for schema in &forest.schemas {
        let found = definitions(schema, &forest.namespaces)?;
        debug!(location = %schema.location, definitions = found.len(), "modeled schema");
        defs.extend(found);
    }
    let defs = normalize(defs)?;

    let graph = resolve(&defs, &options.force_base)?;
    let ops = operations(&forest.wsdl, &forest.namespaces)?;
    info!(operations = ops.len(), "collected operations");

    let emitter = Emitter::new(
        Mapper::new(&graph, &target),
        &target,
        &options.module,
        &enrichment,
    );
    let units = emitter.emit_all(&defs, &ops);

    Ok(Generation {
        total_types: graph.len(),
        base_types: graph.base_count(),
        target,
        units,
    })
}

/// Write every unit under `<root>/<target>/`, creating directories as needed.
///
/// # Errors
///
/// Returns `GenError::WriteError` for the first path that cannot be written.
pub fn write_units(root: &Path, generation: &Generation) -> Result<Vec<PathBuf>, GenError> {
    let base = root.join(&generation.target);
    let mut written = Vec::with_capacity(generation.units.len());

    for unit in &generation.units {
        let path = base.join(unit.kind.path());
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| GenError::WriteError {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, &unit.contents).map_err(|source| GenError::WriteError {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "wrote unit");
        written.push(path);
    }

    Ok(written)
}
