//! XML document probing with quick-xml.
//!
//! Two concerns live here: a well-formedness check used before schema
//! validation and on converter output, and best-effort extraction of the root
//! element summary reported back to the client. quick-xml performs no DTD or
//! external-entity processing, so neither operation can be driven into entity
//! expansion by hostile input.

use std::collections::BTreeMap;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Serialize};

/// Root-element summary included in the validation report.
///
/// Empty (all fields absent) when extraction fails; extraction never fails the
/// surrounding request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XmlSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub attributes: BTreeMap<String, String>,
}

impl XmlSummary {
    pub fn is_empty(&self) -> bool {
        self.root_element.is_none() && self.version.is_none() && self.attributes.is_empty()
    }
}

/// Check that the file parses as XML, consuming every event.
///
/// Returns the parser's diagnostic text on failure; callers prefix it for
/// their own report context.
pub fn check_well_formed(path: &Path) -> std::result::Result<(), String> {
    let mut reader = Reader::from_file(path).map_err(|e| e.to_string())?;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(format!("{} at position {}", e, reader.buffer_position()));
            }
        }
        buf.clear();
    }
}

/// Extract the root element name, its `version` attribute (default
/// `"unknown"`), and its full attribute map.
///
/// Best-effort: any parse or decode failure yields an empty summary.
pub fn extract_summary(path: &Path) -> XmlSummary {
    match try_extract_summary(path) {
        Some(summary) => summary,
        None => {
            tracing::warn!(path = %path.display(), "could not extract XML information");
            XmlSummary::default()
        }
    }
}

fn try_extract_summary(path: &Path) -> Option<XmlSummary> {
    let mut reader = Reader::from_file(path).ok()?;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let root_element = String::from_utf8(e.name().as_ref().to_vec()).ok()?;

                let mut attributes = BTreeMap::new();
                for attr in e.attributes() {
                    let attr = attr.ok()?;
                    let key = String::from_utf8(attr.key.as_ref().to_vec()).ok()?;
                    let value = attr.unescape_value().ok()?.into_owned();
                    attributes.insert(key, value);
                }

                let version = attributes
                    .get("version")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string());

                return Some(XmlSummary {
                    root_element: Some(root_element),
                    version: Some(version),
                    attributes,
                });
            }
            Ok(Event::Eof) => return None,
            // Declarations, comments, PIs and whitespace precede the root.
            Ok(_) => {}
            Err(_) => return None,
        }
        buf.clear();
    }
}
