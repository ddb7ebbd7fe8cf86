//! Document loading.
//!
//! Reads the root WSDL document, follows the import/include graph of its
//! embedded schemas, and produces a deduplicated forest of owned element trees.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::enrich::Enrichment;
use crate::error::GenError;
use crate::types::{short_namespace, Namespaces, CORE_NAMESPACE};

/// Owned element node.
///
/// Only element children are kept; text and comments carry no meaning in the
/// schema dialect. Tag and attribute names are local names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<RawNode>,
    /// Location of the node within its document, for error reporting.
    pub path: String,
}

impl RawNode {
    fn from_xml(node: roxmltree::Node<'_, '_>, parent_path: &str) -> Self {
        let name = node.tag_name().name().to_string();
        let path = match node.attribute("name") {
            Some(n) => format!("{}/{}[{}]", parent_path, name, n),
            None => format!("{}/{}", parent_path, name),
        };

        let attributes = node
            .attributes()
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();

        let children = node
            .children()
            .filter(|c| c.is_element())
            .map(|c| RawNode::from_xml(c, &path))
            .collect();

        RawNode {
            name,
            attributes,
            children,
            path,
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute that the dialect requires to be present.
    pub fn required_attr(&self, name: &str) -> Result<&str, GenError> {
        self.attr(name)
            .ok_or_else(|| GenError::shape(&self.path, format!("missing \"{}\" attribute", name)))
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RawNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// All descendants (excluding self) with the given tag, in document order.
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a RawNode> {
        let mut out = Vec::new();
        self.collect_descendants(name, &mut out);
        out
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a RawNode>) {
        for child in &self.children {
            if child.name == name {
                out.push(child);
            }
            child.collect_descendants(name, out);
        }
    }
}

/// One structural document (embedded or linked schema).
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// Identity used for deduplication and error messages.
    pub location: String,
    /// Short target namespace (`vim25`, `pbm`, ...).
    pub namespace: String,
    pub root: RawNode,
}

/// The root interface-description document.
#[derive(Debug, Clone)]
pub struct WsdlDocument {
    pub path: PathBuf,
    /// Short target namespace of the whole run.
    pub target: String,
    pub root: RawNode,
}

/// Everything reachable from the root document.
#[derive(Debug, Clone)]
pub struct Forest {
    pub wsdl: WsdlDocument,
    /// Structural documents in visit order, each appearing once.
    pub schemas: Vec<SchemaDocument>,
    pub namespaces: Namespaces,
}

/// Read a document from disk.
///
/// # Errors
///
/// Returns `GenError::LoadError` if the file doesn't exist,
/// or `GenError::ReadError` if it can't be read.
pub fn read_document(path: &Path) -> Result<String, GenError> {
    if !path.exists() {
        return Err(GenError::LoadError {
            path: path.to_path_buf(),
        });
    }

    std::fs::read_to_string(path).map_err(|source| GenError::ReadError {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse XML text into an owned tree rooted at the document element.
pub fn parse_document(text: &str, path: &Path) -> Result<RawNode, GenError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options).map_err(|e| {
        GenError::InvalidXml {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    Ok(RawNode::from_xml(doc.root_element(), ""))
}

/// Load the root document and its transitive import/include graph.
///
/// `extra_namespaces` extends the allow-list; the core namespace and the
/// root document's own target are always allowed. Linked documents are
/// resolved relative to the referencing document and visited once each.
///
/// # Errors
///
/// `LoadError` for a missing document, `UnknownNamespace` for a document
/// outside the allow-list, `InvalidXml` for unparsable text.
pub fn load_forest(wsdl_path: &Path, extra_namespaces: &[String]) -> Result<Forest, GenError> {
    let root = parse_document(&read_document(wsdl_path)?, wsdl_path)?;
    let target = short_namespace(root.required_attr("targetNamespace")?).to_string();
    debug!(path = %wsdl_path.display(), target = %target, "loaded root document");

    let mut namespaces = Namespaces::new(extra_namespaces.iter().cloned());
    namespaces.insert(CORE_NAMESPACE);
    namespaces.insert(target.clone());

    let base_dir = wsdl_path.parent().unwrap_or(Path::new("."));
    let mut loader = ForestLoader {
        namespaces: &namespaces,
        visited: HashSet::new(),
        schemas: Vec::new(),
    };

    let embedded: Vec<&RawNode> = root
        .children_named("types")
        .flat_map(|t| t.children_named("schema"))
        .collect();

    for (i, schema) in embedded.into_iter().enumerate() {
        let location = format!("{}#schema[{}]", wsdl_path.display(), i);
        loader.add(location, schema.clone(), base_dir)?;
    }

    let schemas = loader.schemas;
    debug!(documents = schemas.len(), "loaded structural documents");

    Ok(Forest {
        wsdl: WsdlDocument {
            path: wsdl_path.to_path_buf(),
            target,
            root,
        },
        schemas,
        namespaces,
    })
}

struct ForestLoader<'a> {
    namespaces: &'a Namespaces,
    visited: HashSet<PathBuf>,
    schemas: Vec<SchemaDocument>,
}

impl ForestLoader<'_> {
    fn add(&mut self, location: String, root: RawNode, base_dir: &Path) -> Result<(), GenError> {
        let namespace = short_namespace(root.required_attr("targetNamespace")?).to_string();
        self.namespaces.check(&namespace, &location)?;

        let links: Vec<String> = root
            .children
            .iter()
            .filter(|c| c.name == "import" || c.name == "include")
            .map(|c| c.required_attr("schemaLocation").map(String::from))
            .collect::<Result<_, _>>()?;

        self.schemas.push(SchemaDocument {
            location,
            namespace,
            root,
        });

        for link in links {
            let path = base_dir.join(&link);
            let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
            if !self.visited.insert(canonical) {
                continue;
            }

            let text = read_document(&path)?;
            let linked = parse_document(&text, &path)?;
            debug!(path = %path.display(), "loaded linked document");

            let dir = path.parent().unwrap_or(base_dir).to_path_buf();
            self.add(path.display().to_string(), linked, &dir)?;
        }

        Ok(())
    }
}

/// Load the optional enrichment document.
///
/// # Errors
///
/// `LoadError`/`ReadError` for I/O failures, `InvalidEnrichment` for
/// malformed JSON.
pub fn load_enrichment(path: &Path) -> Result<Enrichment, GenError> {
    let content = read_document(path)?;
    Enrichment::from_json(&content)
}
