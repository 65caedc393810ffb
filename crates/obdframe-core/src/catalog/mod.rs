//! In-memory catalog index.
//!
//! Built once from the declarative [`Node`] tree and immutable afterwards.
//! The tree has four levels: spec → protocol → address, with parameter
//! groups attached to spec by address name:
//!
//! ```text
//! spec ── protocol ── address (request/response header descriptors)
//!    └─── parameters (address) ── parameter ── script*
//! ```
//!
//! Script bodies are registered with the evaluator while the index is
//! built, keyed `spec:address:parameter:protocols`; the index keeps the
//! returned handles so lookups stay allocation-free at build time.

mod node;

use std::collections::BTreeMap;

use crate::error::{EngineError, LookupLevel, Result};
use crate::eval::{Evaluator, ScriptHandle};
use crate::message::{ParseMode, ProtocolOptions};

pub use node::Node;

/// Catalog option name enabling the ISO 14230 explicit length byte.
pub const OPTION_LENGTH_BYTE: &str = "Length Byte";

/// Catalog option name enabling ISO 15765 extended addressing.
pub const OPTION_EXTENDED_ADDRESS: &str = "Extended Address";

/// Immutable index over a declarative parameter catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    specs: Vec<SpecEntry>,
}

#[derive(Debug, Clone)]
struct SpecEntry {
    name: String,
    protocols: Vec<ProtocolEntry>,
    groups: Vec<GroupEntry>,
}

/// One protocol under a spec: a name the builder classifies plus resolved
/// boolean options.
#[derive(Debug, Clone)]
pub(crate) struct ProtocolEntry {
    pub(crate) name: String,
    pub(crate) options: ProtocolOptions,
    pub(crate) addresses: Vec<AddressEntry>,
}

/// One named endpoint with optional request/response header descriptors.
#[derive(Debug, Clone)]
pub(crate) struct AddressEntry {
    pub(crate) name: String,
    pub(crate) request: Option<HeaderSpec>,
    pub(crate) response: Option<HeaderSpec>,
}

/// Raw header attribute strings from an address descriptor. Which keys are
/// meaningful depends on the protocol; empty values count as absent.
#[derive(Debug, Clone, Default)]
pub(crate) struct HeaderSpec {
    pub(crate) prio: Option<String>,
    pub(crate) target: Option<String>,
    pub(crate) source: Option<String>,
    pub(crate) format: Option<String>,
    pub(crate) identifier: Option<String>,
}

impl HeaderSpec {
    fn from_node(node: &Node) -> Self {
        Self {
            prio: node.attribute_non_empty("prio").map(String::from),
            target: node.attribute_non_empty("target").map(String::from),
            source: node.attribute_non_empty("source").map(String::from),
            format: node.attribute_non_empty("format").map(String::from),
            identifier: node.attribute_non_empty("identifier").map(String::from),
        }
    }
}

#[derive(Debug, Clone)]
struct GroupEntry {
    address: String,
    parameters: Vec<ParameterEntry>,
}

/// One parameter: its raw data attributes, parse mode, and registered
/// scripts.
#[derive(Debug, Clone)]
pub(crate) struct ParameterEntry {
    pub(crate) name: String,
    pub(crate) parse_mode: ParseMode,
    pub(crate) attributes: BTreeMap<String, String>,
    pub(crate) scripts: Vec<ScriptBinding>,
}

/// A registered script and the protocol pattern it applies to. An empty
/// pattern is the default script for every protocol.
#[derive(Debug, Clone)]
pub(crate) struct ScriptBinding {
    pub(crate) protocols: String,
    pub(crate) handle: ScriptHandle,
}

/// A fully resolved parameter lookup.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Resolved<'a> {
    pub(crate) protocol: &'a ProtocolEntry,
    pub(crate) address: &'a AddressEntry,
    pub(crate) parameter: &'a ParameterEntry,
}

impl Catalog {
    /// Build the index from a node tree, registering every script body
    /// with the evaluator.
    ///
    /// # Errors
    ///
    /// `EngineError::Evaluator` when the evaluator rejects a script body.
    pub fn from_node<E: Evaluator>(root: &Node, evaluator: &mut E) -> Result<Self> {
        let mut specs = Vec::new();

        for spec_node in root.children_named("spec") {
            let spec_name = spec_node.attribute("name").unwrap_or_default().to_string();

            let mut protocols = Vec::new();
            for protocol_node in spec_node.children_named("protocol") {
                protocols.push(ProtocolEntry {
                    name: protocol_node.attribute("name").unwrap_or_default().to_string(),
                    options: read_options(protocol_node),
                    addresses: protocol_node
                        .children_named("address")
                        .map(|address_node| AddressEntry {
                            name: address_node.attribute("name").unwrap_or_default().to_string(),
                            request: address_node.child_named("request").map(HeaderSpec::from_node),
                            response: address_node
                                .child_named("response")
                                .map(HeaderSpec::from_node),
                        })
                        .collect(),
                });
            }

            let mut groups = Vec::new();
            for group_node in spec_node.children_named("parameters") {
                let address = group_node.attribute("address").unwrap_or_default().to_string();

                let mut parameters = Vec::new();
                for parameter_node in group_node.children_named("parameter") {
                    let name = parameter_node.attribute("name").unwrap_or_default().to_string();

                    let mut scripts = Vec::new();
                    for script_node in parameter_node.children_named("script") {
                        let protocols =
                            script_node.attribute("protocols").unwrap_or_default().to_string();
                        let key = format!("{spec_name}:{address}:{name}:{protocols}");
                        let handle = evaluator.register(&key, &script_node.text)?;
                        scripts.push(ScriptBinding { protocols, handle });
                    }

                    parameters.push(ParameterEntry {
                        name,
                        parse_mode: parse_mode(parameter_node),
                        attributes: parameter_node.attributes.clone(),
                        scripts,
                    });
                }

                groups.push(GroupEntry {
                    address,
                    parameters,
                });
            }

            specs.push(SpecEntry {
                name: spec_name,
                protocols,
                groups,
            });
        }

        Ok(Self { specs })
    }

    /// Parameter names available under `(spec, protocol, address)`, in
    /// source order.
    ///
    /// # Errors
    ///
    /// `EngineError::CatalogLookup` naming the first level that did not
    /// resolve.
    pub fn parameter_names(
        &self,
        spec: &str,
        protocol: &str,
        address: &str,
    ) -> Result<Vec<String>> {
        let (spec_entry, _, _) = self.resolve_address(spec, protocol, address)?;
        let group = spec_entry.group(address)?;
        Ok(group.parameters.iter().map(|p| p.name.clone()).collect())
    }

    /// Resolve a parameter selection down to its catalog entries.
    pub(crate) fn resolve(
        &self,
        spec: &str,
        protocol: &str,
        address: &str,
        name: &str,
    ) -> Result<Resolved<'_>> {
        let (spec_entry, protocol_entry, address_entry) =
            self.resolve_address(spec, protocol, address)?;
        let group = spec_entry.group(address)?;

        let parameter = group
            .parameters
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| EngineError::CatalogLookup {
                level: LookupLevel::Parameter,
                name: name.to_string(),
            })?;

        Ok(Resolved {
            protocol: protocol_entry,
            address: address_entry,
            parameter,
        })
    }

    fn resolve_address(
        &self,
        spec: &str,
        protocol: &str,
        address: &str,
    ) -> Result<(&SpecEntry, &ProtocolEntry, &AddressEntry)> {
        let spec_entry = self
            .specs
            .iter()
            .find(|s| s.name == spec)
            .ok_or_else(|| EngineError::CatalogLookup {
                level: LookupLevel::Spec,
                name: spec.to_string(),
            })?;

        let protocol_entry = spec_entry
            .protocols
            .iter()
            .find(|p| p.name == protocol)
            .ok_or_else(|| EngineError::CatalogLookup {
                level: LookupLevel::Protocol,
                name: protocol.to_string(),
            })?;

        let address_entry = protocol_entry
            .addresses
            .iter()
            .find(|a| a.name == address)
            .ok_or_else(|| EngineError::CatalogLookup {
                level: LookupLevel::Address,
                name: address.to_string(),
            })?;

        Ok((spec_entry, protocol_entry, address_entry))
    }
}

impl SpecEntry {
    fn group(&self, address: &str) -> Result<&GroupEntry> {
        self.groups
            .iter()
            .find(|g| g.address == address)
            .ok_or_else(|| EngineError::CatalogLookup {
                level: LookupLevel::ParameterGroup,
                name: address.to_string(),
            })
    }
}

fn read_options(protocol_node: &Node) -> ProtocolOptions {
    let mut options = ProtocolOptions::default();
    for option in protocol_node.children_named("option") {
        let enabled = option.attribute("value") == Some("true");
        match option.attribute("name") {
            Some(OPTION_LENGTH_BYTE) => options.length_byte = enabled,
            Some(OPTION_EXTENDED_ADDRESS) => options.extended_address = enabled,
            _ => {}
        }
    }
    options
}

fn parse_mode(parameter_node: &Node) -> ParseMode {
    if parameter_node.attribute("parse") == Some("combined") {
        ParseMode::Combined
    } else {
        ParseMode::Separately
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{NullEvaluator, test_root};

    #[test]
    fn names_preserve_source_order() {
        let mut evaluator = NullEvaluator::default();
        let catalog = Catalog::from_node(&test_root(), &mut evaluator).unwrap();

        let names = catalog.parameter_names("TEST", "ISO 9141-2", "Default").unwrap();
        assert!(names.len() > 1);
        assert_eq!(names[0], "Engine RPM");
    }

    #[test]
    fn lookup_reports_missing_level() {
        let mut evaluator = NullEvaluator::default();
        let catalog = Catalog::from_node(&test_root(), &mut evaluator).unwrap();

        let err = catalog.parameter_names("NOPE", "ISO 9141-2", "Default").unwrap_err();
        assert!(matches!(
            err,
            EngineError::CatalogLookup {
                level: LookupLevel::Spec,
                ..
            }
        ));

        let err = catalog.parameter_names("TEST", "ISO 11898", "Default").unwrap_err();
        assert!(matches!(
            err,
            EngineError::CatalogLookup {
                level: LookupLevel::Protocol,
                ..
            }
        ));

        let err = catalog.parameter_names("TEST", "ISO 9141-2", "Gateway").unwrap_err();
        assert!(matches!(
            err,
            EngineError::CatalogLookup {
                level: LookupLevel::Address,
                ..
            }
        ));

        let err = catalog
            .resolve("TEST", "ISO 9141-2", "Default", "No Such Parameter")
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::CatalogLookup {
                level: LookupLevel::Parameter,
                ..
            }
        ));
    }

    #[test]
    fn options_resolve_per_protocol() {
        let mut evaluator = NullEvaluator::default();
        let catalog = Catalog::from_node(&test_root(), &mut evaluator).unwrap();

        let resolved = catalog.resolve("TEST", "ISO 14230", "Default", "Engine RPM").unwrap();
        assert!(!resolved.protocol.options.length_byte);

        let resolved = catalog.resolve("TEST-LB", "ISO 14230", "Default", "Engine RPM").unwrap();
        assert!(resolved.protocol.options.length_byte);
    }

    #[test]
    fn scripts_register_with_joined_keys() {
        let mut evaluator = NullEvaluator::default();
        let catalog = Catalog::from_node(&test_root(), &mut evaluator).unwrap();
        let resolved = catalog.resolve("TEST", "ISO 9141-2", "Default", "Engine RPM").unwrap();

        assert_eq!(resolved.parameter.scripts.len(), 1);
        assert!(
            evaluator
                .keys
                .iter()
                .any(|k| k.starts_with("TEST:Default:Engine RPM:"))
        );
    }
}
