//! Shape validation of the restricted schema dialect.
//!
//! Runs over the whole forest before any type resolution. Later stages build
//! closed variants from the trees and rely on these checks instead of
//! re-validating.

use crate::error::GenError;
use crate::loader::{Forest, RawNode};

/// Top-level children a schema document may contain.
const SCHEMA_CHILDREN: &[&str] = &["include", "import", "element", "simpleType", "complexType"];

/// Validate every structural document in the forest.
///
/// # Errors
///
/// Returns `GenError::SchemaShapeViolation` for the first node that breaks
/// the dialect, carrying that node's path.
pub fn validate(forest: &Forest) -> Result<(), GenError> {
    for schema in &forest.schemas {
        validate_schema(&schema.root)?;
    }
    Ok(())
}

/// Validate one schema tree.
pub fn validate_schema(root: &RawNode) -> Result<(), GenError> {
    for child in &root.children {
        if !SCHEMA_CHILDREN.contains(&child.name.as_str()) {
            return Err(GenError::shape(
                &child.path,
                format!("unknown schema child \"{}\"", child.name),
            ));
        }
    }
    walk(root, None)
}

fn walk(node: &RawNode, parent: Option<&RawNode>) -> Result<(), GenError> {
    match node.name.as_str() {
        "enumeration" => check_enumeration(node, parent)?,
        "restriction" => check_restriction(node, parent)?,
        "simpleType" => check_simple_type(node)?,
        "complexContent" => check_complex_content(node, parent)?,
        "complexType" => check_complex_type(node)?,
        "element" if parent.is_some() => check_element(node)?,
        "attribute" => check_attribute(node)?,
        _ => {}
    }

    for child in &node.children {
        walk(child, Some(node))?;
    }
    Ok(())
}

fn check_enumeration(node: &RawNode, parent: Option<&RawNode>) -> Result<(), GenError> {
    match parent {
        Some(p) if p.name == "restriction" => {
            node.required_attr("value")?;
            Ok(())
        }
        _ => Err(GenError::shape(&node.path, "enumeration outside a restriction")),
    }
}

fn check_restriction(node: &RawNode, parent: Option<&RawNode>) -> Result<(), GenError> {
    if node.attr("base") != Some("xsd:string") {
        return Err(GenError::shape(&node.path, "restriction base must be xsd:string"));
    }

    let Some(parent) = parent.filter(|p| p.name == "simpleType") else {
        return Err(GenError::shape(&node.path, "restriction outside a simpleType"));
    };
    if parent.children.len() != 1 {
        return Err(GenError::shape(&parent.path, "restriction must be the only child"));
    }

    if let Some(other) = node.children.iter().find(|c| c.name != "enumeration") {
        return Err(GenError::shape(
            &other.path,
            "restriction may only contain enumeration values",
        ));
    }
    Ok(())
}

fn check_simple_type(node: &RawNode) -> Result<(), GenError> {
    node.required_attr("name")?;
    match node.children.as_slice() {
        [only] if only.name == "restriction" => Ok(()),
        _ => Err(GenError::shape(
            &node.path,
            "simpleType must contain exactly one restriction",
        )),
    }
}

fn check_complex_content(node: &RawNode, parent: Option<&RawNode>) -> Result<(), GenError> {
    match parent {
        Some(p) if p.name == "complexType" => Ok(()),
        _ => Err(GenError::shape(&node.path, "complexContent outside a complexType")),
    }
}

fn check_complex_type(node: &RawNode) -> Result<(), GenError> {
    let content = match node.children.as_slice() {
        // An empty structure is allowed.
        [] => return Ok(()),
        [only] => only,
        _ => {
            return Err(GenError::shape(
                &node.path,
                "complexType must have at most one content child",
            ))
        }
    };

    match content.name.as_str() {
        "complexContent" => {
            let extension = single_extension(content)?;
            match extension.children.as_slice() {
                [seq] if seq.name == "sequence" => only_elements(seq),
                _ => Err(GenError::shape(
                    &extension.path,
                    "extension must contain exactly one sequence",
                )),
            }
        }
        "simpleContent" => {
            let extension = single_extension(content)?;
            if extension.children.is_empty() {
                return Err(GenError::shape(
                    &extension.path,
                    "simpleContent extension needs at least one attribute",
                ));
            }
            match extension.children.iter().find(|c| c.name != "attribute") {
                Some(other) => Err(GenError::shape(
                    &other.path,
                    "simpleContent extension may only contain attributes",
                )),
                None => Ok(()),
            }
        }
        "sequence" => only_elements(content),
        other => Err(GenError::shape(
            &content.path,
            format!("unknown complexType content \"{}\"", other),
        )),
    }
}

fn single_extension(content: &RawNode) -> Result<&RawNode, GenError> {
    match content.children.as_slice() {
        [ext] if ext.name == "extension" => {
            ext.required_attr("base")?;
            Ok(ext)
        }
        _ => Err(GenError::shape(
            &content.path,
            format!("{} must contain exactly one extension", content.name),
        )),
    }
}

fn only_elements(sequence: &RawNode) -> Result<(), GenError> {
    match sequence.children.iter().find(|c| c.name != "element") {
        Some(other) => Err(GenError::shape(
            &other.path,
            "sequence may only contain elements",
        )),
        None => Ok(()),
    }
}

fn check_element(node: &RawNode) -> Result<(), GenError> {
    node.required_attr("name")?;

    if let Some(min) = node.attr("minOccurs") {
        if min != "0" {
            return Err(GenError::shape(&node.path, format!("minOccurs={}", min)));
        }
    }
    if let Some(max) = node.attr("maxOccurs") {
        if max != "unbounded" {
            return Err(GenError::shape(&node.path, format!("maxOccurs={}", max)));
        }
    }

    if node.attr("type").is_some() {
        return Ok(());
    }
    match node.children.as_slice() {
        [only] if only.name == "complexType" => Ok(()),
        _ => Err(GenError::shape(
            &node.path,
            "untyped element must wrap exactly one complexType",
        )),
    }
}

fn check_attribute(node: &RawNode) -> Result<(), GenError> {
    node.required_attr("name")?;
    node.required_attr("type")?;
    Ok(())
}
