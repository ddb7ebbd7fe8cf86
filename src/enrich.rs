//! Enrichment document: documentation text keyed by wire type name.
//!
//! Consulted only for comments and version annotations; it never changes a
//! type's shape.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::GenError;
use crate::types::ucfirst;

/// Documentation for one type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeDoc {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyDoc>,
}

/// Documentation for one field of a type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyDoc {
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Enrichment {
    types: BTreeMap<String, TypeDoc>,
}

impl Enrichment {
    pub fn from_json(content: &str) -> Result<Self, GenError> {
        let types = serde_json::from_str(content)
            .map_err(|source| GenError::InvalidEnrichment { source })?;
        Ok(Self { types })
    }

    /// Documentation of a structure or alias.
    pub fn type_doc(&self, name: &str) -> Option<&TypeDoc> {
        self.types.get(&ucfirst(name))
    }

    /// Documentation of an enum, stored under `<Type>_enum`.
    pub fn enum_doc(&self, name: &str) -> Option<&TypeDoc> {
        self.types.get(&format!("{}_enum", ucfirst(name)))
    }

    pub fn type_description(&self, name: &str) -> Option<&str> {
        self.type_doc(name)?.description.as_deref()
    }

    pub fn enum_description(&self, name: &str) -> Option<&str> {
        self.enum_doc(name)?.description.as_deref()
    }

    /// Description of field `field` (wire name) on type `name`.
    pub fn property_description(&self, name: &str, field: &str) -> Option<&str> {
        self.type_doc(name)?
            .properties
            .get(field)?
            .description
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"{
        "VirtualMachineConfigSpec": {
            "description": "Spec for a VM.",
            "properties": {
                "numCPUs": { "description": "Number of CPUs." }
            }
        },
        "PowerState_enum": { "description": "Power states." }
    }"#;

    #[test]
    fn lookups_use_upper_cased_names() {
        let e = Enrichment::from_json(DOC).unwrap();
        assert_eq!(e.type_description("virtualMachineConfigSpec"), Some("Spec for a VM."));
        assert_eq!(
            e.property_description("VirtualMachineConfigSpec", "numCPUs"),
            Some("Number of CPUs.")
        );
        assert_eq!(e.enum_description("PowerState"), Some("Power states."));
        assert_eq!(e.type_description("PowerState"), None);
    }

    #[test]
    fn missing_entries_are_none() {
        let e = Enrichment::from_json(DOC).unwrap();
        assert_eq!(e.property_description("VirtualMachineConfigSpec", "memoryMB"), None);
        assert_eq!(e.type_description("Unknown"), None);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let result = Enrichment::from_json("{ not json");
        assert!(matches!(result, Err(GenError::InvalidEnrichment { .. })));
    }
}
