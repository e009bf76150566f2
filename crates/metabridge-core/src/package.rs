//! Exchange packages: a zip archive holding an RO-Crate style manifest and one role-tagged
//! JSON payload.

use std::io::{Cursor, Read, Write};

use serde::{Deserialize, Serialize};
use tracing::debug;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::{ExchangeError, ExchangeResult};

pub const MANIFEST_NAME: &str = "ro-crate-metadata.json";
const CRATE_CONTEXT: &str = "https://w3id.org/ro/crate/1.1/context";

/// Which operation produced a payload; stored as the payload's `@type` in the manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayloadRole {
    Response,
    Export,
    Put,
}

impl PayloadRole {
    pub fn as_str(self) -> &'static str {
        match self {
            PayloadRole::Response => "RESPONSE",
            PayloadRole::Export => "EXPORT",
            PayloadRole::Put => "PUT",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            PayloadRole::Response => "response.json",
            PayloadRole::Export => "export.json",
            PayloadRole::Put => "query.json",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    #[serde(rename = "@context")]
    context: serde_json::Value,
    #[serde(rename = "@graph")]
    graph: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ManifestEntry {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: serde_json::Value,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl ManifestEntry {
    /// `@type` may be a single string or a list of strings.
    fn has_type(&self, wanted: &str) -> bool {
        match &self.kind {
            serde_json::Value::String(s) => s == wanted,
            serde_json::Value::Array(items) => items.iter().any(|v| v.as_str() == Some(wanted)),
            _ => false,
        }
    }
}

fn manifest_for(role: PayloadRole) -> Manifest {
    let file = role.file_name();
    let entry = |id: &str, kind: &str, extra: serde_json::Value| ManifestEntry {
        id: id.to_string(),
        kind: serde_json::Value::String(kind.to_string()),
        extra: extra.as_object().cloned().unwrap_or_default(),
    };
    Manifest {
        context: serde_json::Value::String(CRATE_CONTEXT.to_string()),
        graph: vec![
            entry(
                MANIFEST_NAME,
                "CreativeWork",
                serde_json::json!({
                    "about": { "@id": "./" },
                    "conformsTo": { "@id": "https://w3id.org/ro/crate/1.1" },
                }),
            ),
            entry(
                "./",
                "Dataset",
                serde_json::json!({
                    "datePublished": chrono::Utc::now().to_rfc3339(),
                    "hasPart": [{ "@id": file }],
                }),
            ),
            entry(file, role.as_str(), serde_json::json!({ "name": file })),
        ],
    }
}

/// Serialize `payload` into a package whose single payload entry carries `role`.
pub fn build_package<T: Serialize>(role: PayloadRole, payload: &T) -> ExchangeResult<Vec<u8>> {
    let manifest = serde_json::to_vec_pretty(&manifest_for(role))
        .map_err(|e| ExchangeError::Package(e.to_string()))?;
    let body =
        serde_json::to_vec_pretty(payload).map_err(|e| ExchangeError::Package(e.to_string()))?;

    let mut buffer = Vec::new();
    let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
    let options = FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    write_entry(&mut zip, options, MANIFEST_NAME, &manifest)?;
    write_entry(&mut zip, options, role.file_name(), &body)?;
    zip.finish()
        .map_err(|e| ExchangeError::Package(e.to_string()))?;
    drop(zip);

    debug!(role = role.as_str(), bytes = buffer.len(), "built exchange package");
    Ok(buffer)
}

fn write_entry<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    options: FileOptions,
    name: &str,
    bytes: &[u8],
) -> ExchangeResult<()> {
    zip.start_file(name, options)
        .map_err(|e| ExchangeError::Package(e.to_string()))?;
    zip.write_all(bytes)
        .map_err(|e| ExchangeError::Package(e.to_string()))
}

/// Locate the payload tagged `role` and return its raw bytes.
pub fn read_payload_bytes(bytes: &[u8], role: PayloadRole) -> ExchangeResult<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let manifest: Manifest = {
        let mut file = archive
            .by_name(MANIFEST_NAME)
            .map_err(|_| ExchangeError::MalformedPackage(format!("no {}", MANIFEST_NAME)))?;
        let mut raw = Vec::new();
        file.read_to_end(&mut raw)
            .map_err(|e| ExchangeError::MalformedPackage(e.to_string()))?;
        serde_json::from_slice(&raw)
            .map_err(|e| ExchangeError::MalformedPackage(format!("manifest: {}", e)))?
    };

    let target = manifest
        .graph
        .iter()
        .find(|entry| entry.has_type(role.as_str()))
        .ok_or_else(|| {
            ExchangeError::MalformedPackage(format!("no entry with role {}", role.as_str()))
        })?;

    let name = target.id.trim_start_matches("./");
    let mut file = archive.by_name(name).map_err(|_| {
        ExchangeError::MalformedPackage(format!("payload {} missing from archive", name))
    })?;
    let mut raw = Vec::new();
    file.read_to_end(&mut raw)
        .map_err(|e| ExchangeError::MalformedPackage(e.to_string()))?;
    Ok(raw)
}

/// Locate the payload tagged `role` and deserialize it.
pub fn read_payload<T: for<'de> Deserialize<'de>>(
    bytes: &[u8],
    role: PayloadRole,
) -> ExchangeResult<T> {
    let raw = read_payload_bytes(bytes, role)?;
    serde_json::from_slice(&raw)
        .map_err(|e| ExchangeError::MalformedPackage(format!("payload: {}", e)))
}
