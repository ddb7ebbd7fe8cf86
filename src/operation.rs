//! RPC operations declared by the root document.

use std::collections::BTreeMap;

use crate::error::GenError;
use crate::loader::{RawNode, WsdlDocument};
use crate::types::{ucfirst, Namespaces};

/// One request/response exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    /// Namespace of the input message.
    pub namespace: String,
    /// Wire element name of the request body.
    pub input: String,
    /// Wire element name of the response body.
    pub output: String,
}

impl Operation {
    /// Host identifier of the stub function.
    pub fn func_name(&self) -> String {
        ucfirst(&self.name)
    }
}

/// Collect `portType/operation` entries, sorted by name.
///
/// Message references are resolved through the document's `message`
/// definitions to the element each message's part carries.
///
/// # Errors
///
/// `UnknownNamespace` for a message reference outside the allow-list,
/// `UnresolvedTypeReference` for a message that isn't defined.
pub fn operations(wsdl: &WsdlDocument, namespaces: &Namespaces) -> Result<Vec<Operation>, GenError> {
    let messages: BTreeMap<&str, &RawNode> = wsdl
        .root
        .children_named("message")
        .filter_map(|m| m.attr("name").map(|n| (n, m)))
        .collect();

    let mut ops = Vec::new();
    for port_type in wsdl.root.children_named("portType") {
        for node in port_type.children_named("operation") {
            let input = message_ref(node, "input")?;
            let output = message_ref(node, "output")?;
            let (namespace, _) = split_ref(input, node)?;
            namespaces.check(namespace, &node.path)?;

            ops.push(Operation {
                name: node.required_attr("name")?.to_string(),
                namespace: namespace.to_string(),
                input: element_for(input, node, &messages, namespaces)?,
                output: element_for(output, node, &messages, namespaces)?,
            });
        }
    }

    ops.sort_by(|a, b| a.name.cmp(&b.name));
    ops.dedup_by(|a, b| a.name == b.name);
    Ok(ops)
}

fn message_ref<'a>(op: &'a RawNode, direction: &'a str) -> Result<&'a str, GenError> {
    op.children_named(direction)
        .next()
        .ok_or_else(|| GenError::shape(&op.path, format!("operation without {}", direction)))?
        .required_attr("message")
}

fn split_ref<'a>(raw: &'a str, node: &RawNode) -> Result<(&'a str, &'a str), GenError> {
    raw.split_once(':')
        .ok_or_else(|| GenError::shape(&node.path, format!("unqualified reference \"{}\"", raw)))
}

fn element_for(
    message: &str,
    op: &RawNode,
    messages: &BTreeMap<&str, &RawNode>,
    namespaces: &Namespaces,
) -> Result<String, GenError> {
    let (ns, local) = split_ref(message, op)?;
    namespaces.check(ns, &op.path)?;

    let def = messages
        .get(local)
        .ok_or_else(|| GenError::UnresolvedTypeReference {
            name: message.to_string(),
            referenced_by: op.path.clone(),
        })?;
    let part = def
        .children_named("part")
        .next()
        .ok_or_else(|| GenError::shape(&def.path, "message without part"))?;

    let element = part.required_attr("element")?;
    let (ns, local) = split_ref(element, part)?;
    namespaces.check(ns, &part.path)?;
    Ok(local.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_document;
    use std::path::{Path, PathBuf};

    const WSDL: &str = r#"<definitions targetNamespace="urn:vim25">
  <message name="RetrieveServiceContentRequestMsg"><part name="parameters" element="vim25:RetrieveServiceContent"/></message>
  <message name="RetrieveServiceContentResponseMsg"><part name="parameters" element="vim25:RetrieveServiceContentResponse"/></message>
  <message name="LogoutRequestMsg"><part name="parameters" element="vim25:Logout"/></message>
  <message name="LogoutResponseMsg"><part name="parameters" element="vim25:LogoutResponse"/></message>
  <portType name="VimPortType">
    <operation name="RetrieveServiceContent">
      <input message="vim25:RetrieveServiceContentRequestMsg"/>
      <output message="vim25:RetrieveServiceContentResponseMsg"/>
    </operation>
    <operation name="Logout">
      <input message="vim25:LogoutRequestMsg"/>
      <output message="vim25:LogoutResponseMsg"/>
    </operation>
  </portType>
</definitions>"#;

    fn wsdl(text: &str) -> WsdlDocument {
        WsdlDocument {
            path: PathBuf::from("vim.wsdl"),
            target: "vim25".into(),
            root: parse_document(text, Path::new("vim.wsdl")).unwrap(),
        }
    }

    #[test]
    fn operations_resolve_messages_and_sort() {
        let ops = operations(&wsdl(WSDL), &Namespaces::new(["vim25"])).unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[0].name, "Logout");
        assert_eq!(ops[1].input, "RetrieveServiceContent");
        assert_eq!(ops[1].output, "RetrieveServiceContentResponse");
        assert_eq!(ops[1].namespace, "vim25");
    }

    #[test]
    fn missing_message_is_unresolved() {
        let text = WSDL.replace("vim25:LogoutResponseMsg\"", "vim25:NopeMsg\"");
        let result = operations(&wsdl(&text), &Namespaces::new(["vim25"]));
        assert!(matches!(result, Err(GenError::UnresolvedTypeReference { .. })));
    }

    #[test]
    fn operation_without_output_is_shape_violation() {
        let text = WSDL.replace("<output message=\"vim25:LogoutResponseMsg\"/>", "");
        let result = operations(&wsdl(&text), &Namespaces::new(["vim25"]));
        match result {
            Err(GenError::SchemaShapeViolation { path, message }) => {
                assert!(path.ends_with("operation[Logout]"), "{}", path);
                assert_eq!(message, "operation without output");
            }
            other => panic!("expected shape violation, got {:?}", other),
        }
    }

    #[test]
    fn message_namespace_must_be_allowed() {
        let result = operations(&wsdl(WSDL), &Namespaces::new(["pbm"]));
        assert!(matches!(result, Err(GenError::UnknownNamespace { .. })));
    }
}
