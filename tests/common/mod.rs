#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use ades_validator::convert::{ConverterRunner, DirConverterResolver};
use ades_validator::pipeline::ValidationPipeline;
use ades_validator::schema::SchemaStore;
use ades_validator::validator::SchemaValidator;

/// Minimal schema for the ADES shapes the tests exercise: an `ades` root with
/// a `version` attribute and optical observation blocks.
pub const ADES_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
  <xs:element name="ades">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="obsBlock" maxOccurs="unbounded">
          <xs:complexType>
            <xs:sequence>
              <xs:element name="optical" maxOccurs="unbounded">
                <xs:complexType>
                  <xs:sequence>
                    <xs:element name="observatory">
                      <xs:complexType>
                        <xs:sequence>
                          <xs:element name="mpcCode" type="xs:string"/>
                        </xs:sequence>
                      </xs:complexType>
                    </xs:element>
                    <xs:element name="observers" minOccurs="0">
                      <xs:complexType>
                        <xs:sequence>
                          <xs:element name="name" type="xs:string" maxOccurs="unbounded"/>
                        </xs:sequence>
                      </xs:complexType>
                    </xs:element>
                  </xs:sequence>
                </xs:complexType>
              </xs:element>
            </xs:sequence>
          </xs:complexType>
        </xs:element>
      </xs:sequence>
      <xs:attribute name="version" type="xs:string"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

pub const VALID_ADES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ades version="2022">
  <obsBlock>
    <optical>
      <observatory>
        <mpcCode>F51</mpcCode>
      </observatory>
      <observers>
        <name>J. Smith</name>
      </observers>
    </optical>
  </obsBlock>
</ades>
"#;

/// Well-formed, but an unrecognized structure under the root.
pub const INVALID_ADES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ades version="2017">
  <radar>
    <observatory>
      <mpcCode>F51</mpcCode>
    </observatory>
  </radar>
</ades>
"#;

pub const SAMPLE_PSV: &str = "# version=2022\n# observatory\nmpcCode|name\nF51|Pan-STARRS 1\n";

pub const SAMPLE_MPC: &str =
    "     J99001  C2019 04 30.26891 17 47 44.91 +39 03 22.7          20.1 g      F51\n";

pub struct TestGateway {
    pub pipeline: ValidationPipeline,
    pub schema_dir: TempDir,
    pub converter_dir: TempDir,
}

/// Gateway with both schemas installed and an empty converter directory.
pub fn gateway() -> TestGateway {
    gateway_with_schemas(&[("submit", ADES_XSD), ("general", ADES_XSD)])
}

pub fn gateway_with_schemas(schemas: &[(&str, &str)]) -> TestGateway {
    let schema_dir = TempDir::new().unwrap();
    for (name, content) in schemas {
        std::fs::write(schema_dir.path().join(format!("{name}.xsd")), content).unwrap();
    }
    let converter_dir = TempDir::new().unwrap();

    let store = Arc::new(SchemaStore::new(schema_dir.path().to_path_buf()));
    let resolver = Arc::new(DirConverterResolver::new(converter_dir.path().to_path_buf()));
    let runner = ConverterRunner::new(resolver, Duration::from_secs(10), 2);
    let pipeline = ValidationPipeline::new(runner, SchemaValidator::new(store));

    TestGateway {
        pipeline,
        schema_dir,
        converter_dir,
    }
}

/// Install a shell script as a named conversion capability.
#[cfg(unix)]
pub fn install_converter(gateway: &TestGateway, name: &str, script: &str) {
    use std::os::unix::fs::PermissionsExt;

    let path = gateway.converter_dir.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{script}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// Converter script that emits a fixed valid ADES document.
#[cfg(unix)]
pub fn passthrough_converter_script() -> String {
    // Writes a well-formed document regardless of input, silently.
    format!(
        "cat > /dev/null < \"$1\"\nprintf '%s' '{}' > \"$2\"",
        VALID_ADES_XML.replace('\n', "").replace('\'', "")
    )
}

/// Count leftover staged artifacts in the scratch directory.
pub fn staged_artifact_count() -> usize {
    std::fs::read_dir(std::env::temp_dir())
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with("ades-upload-"))
                .count()
        })
        .unwrap_or(0)
}
