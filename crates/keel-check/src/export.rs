//! Persisted artifact format: JSON export and reload.
//!
//! The exported document carries everything a portable runtime in any
//! language needs to reconstitute the O(1) apply surface: variable specs
//! (widths and offsets are recoverable from kind + labels/min/max in
//! declaration order), event names, the normal-form array, and the step
//! arrays. A reloaded runtime never re-verifies; the verification stamp
//! travels with the tables for provenance.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use keel_core::{Layout, VarKind, MAX_STATE_BITS};

use crate::artifact::{Machine, VerificationStamp};

/// Current version of the artifact document format.
pub const ARTIFACT_VERSION: u32 = 1;

/// A failure writing an artifact to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize artifact: {0}")]
    Json(#[from] serde_json::Error),
}

/// A failure reconstituting a machine from an exported artifact.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed artifact json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported artifact version {found} (expected {expected})")]
    Version { found: u32, expected: u32 },
    #[error("artifact is internally inconsistent: {detail}")]
    Corrupt { detail: String },
}

#[derive(Debug, Serialize, Deserialize)]
struct ArtifactDoc {
    name: String,
    version: u32,
    vars: Vec<VarDoc>,
    events: Vec<String>,
    nf: Vec<u32>,
    step: Vec<Vec<u32>>,
    verification: VerificationStamp,
    exported_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VarDoc {
    name: String,
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max: Option<i64>,
}

impl Machine {
    /// Serialize the artifact to the JSON document format.
    pub fn export_json(&self) -> Result<String, ExportError> {
        let doc = self.to_doc();
        Ok(serde_json::to_string(&doc)?)
    }

    /// Write the artifact to a file.
    pub fn export_to(&self, path: impl AsRef<Path>) -> Result<(), ExportError> {
        fs::write(path, self.export_json()?)?;
        Ok(())
    }

    /// Reconstitute a machine from the JSON document format.
    pub fn import_json(json: &str) -> Result<Machine, ImportError> {
        let doc: ArtifactDoc = serde_json::from_str(json)?;
        Machine::from_doc(doc)
    }

    /// Reconstitute a machine from a file written by
    /// [`export_to`](Machine::export_to).
    pub fn import_from(path: impl AsRef<Path>) -> Result<Machine, ImportError> {
        let json = fs::read_to_string(path)?;
        Machine::import_json(&json)
    }

    fn to_doc(&self) -> ArtifactDoc {
        let vars = self
            .layout
            .vars()
            .iter()
            .map(|vi| {
                let v = vi.var();
                match v.kind() {
                    VarKind::Bool => VarDoc {
                        name: vi.name().to_string(),
                        kind: "bool".to_string(),
                        labels: None,
                        min: None,
                        max: None,
                    },
                    VarKind::Enum => VarDoc {
                        name: vi.name().to_string(),
                        kind: "enum".to_string(),
                        labels: Some(vi.labels().iter().map(|l| l.to_string()).collect()),
                        min: None,
                        max: None,
                    },
                    VarKind::Int => VarDoc {
                        name: vi.name().to_string(),
                        kind: "int".to_string(),
                        labels: None,
                        min: Some(v.min()),
                        max: Some(v.max()),
                    },
                }
            })
            .collect();

        ArtifactDoc {
            name: self.name.clone(),
            version: ARTIFACT_VERSION,
            vars,
            events: self.event_names.iter().map(|n| n.to_string()).collect(),
            nf: self.nf.clone(),
            step: self.step.clone(),
            verification: self.stamp.clone(),
            exported_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    fn from_doc(doc: ArtifactDoc) -> Result<Machine, ImportError> {
        if doc.version != ARTIFACT_VERSION {
            return Err(ImportError::Version {
                found: doc.version,
                expected: ARTIFACT_VERSION,
            });
        }

        // Re-deriving the layout from the specs reproduces the original
        // offsets because field assignment follows declaration order.
        let mut layout = Layout::new();
        for var in &doc.vars {
            match var.kind.as_str() {
                "bool" => {
                    layout.add_bool(&var.name);
                }
                "enum" => {
                    let labels = var.labels.as_ref().ok_or_else(|| ImportError::Corrupt {
                        detail: format!("enum variable {:?} has no labels", var.name),
                    })?;
                    let refs: Vec<&str> = labels.iter().map(|l| l.as_str()).collect();
                    layout.add_enum(&var.name, &refs);
                }
                "int" => {
                    let (min, max) = match (var.min, var.max) {
                        (Some(min), Some(max)) => (min, max),
                        _ => {
                            return Err(ImportError::Corrupt {
                                detail: format!("int variable {:?} has no range", var.name),
                            })
                        }
                    };
                    layout.add_int(&var.name, min, max);
                }
                other => {
                    return Err(ImportError::Corrupt {
                        detail: format!("variable {:?} has unknown kind {:?}", var.name, other),
                    })
                }
            }
        }
        if let Some(detail) = layout.declaration_errors().first() {
            return Err(ImportError::Corrupt {
                detail: detail.clone(),
            });
        }
        if layout.total_bits() > MAX_STATE_BITS {
            return Err(ImportError::Corrupt {
                detail: format!(
                    "variables pack into {} bits, over the {}-bit ceiling",
                    layout.total_bits(),
                    MAX_STATE_BITS
                ),
            });
        }

        let padded = layout.padded_len();
        if doc.nf.len() != padded {
            return Err(ImportError::Corrupt {
                detail: format!("nf table has {} entries, expected {}", doc.nf.len(), padded),
            });
        }
        if doc.step.len() != doc.events.len() {
            return Err(ImportError::Corrupt {
                detail: format!(
                    "step table has {} rows for {} events",
                    doc.step.len(),
                    doc.events.len()
                ),
            });
        }
        for (i, row) in doc.step.iter().enumerate() {
            if row.len() != padded {
                return Err(ImportError::Corrupt {
                    detail: format!(
                        "step table for event {:?} has {} entries, expected {}",
                        doc.events[i],
                        row.len(),
                        padded
                    ),
                });
            }
        }
        let limit = padded as u32;
        let mut tables = doc.nf.iter().chain(doc.step.iter().flatten());
        if let Some(&bad) = tables.find(|&&t| t >= limit) {
            return Err(ImportError::Corrupt {
                detail: format!("table entry {} is outside the {}-id address space", bad, limit),
            });
        }

        let event_names: Vec<Arc<str>> = doc.events.iter().map(|n| Arc::from(n.as_str())).collect();
        Ok(Machine::assemble(
            doc.name,
            Arc::new(layout),
            event_names,
            doc.nf,
            doc.step,
            doc.verification,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MachineBuilder;

    fn toggle_machine() -> Machine {
        let mut b = MachineBuilder::new("simple");
        let power = b.bool_var("power");
        b.event("toggle")
            .writes(&[power])
            .effect(move |s| {
                let on = s.get_bool(power);
                s.set_bool(power, !on)
            })
            .add();
        b.build().into_machine().unwrap()
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let machine = toggle_machine();
        let json = machine.export_json().unwrap();
        let bumped = json.replace("\"version\":1", "\"version\":7");
        match Machine::import_json(&bumped) {
            Err(ImportError::Version { found: 7, expected: 1 }) => {}
            other => panic!("expected version error, got {:?}", other.err()),
        }
    }

    #[test]
    fn truncated_tables_are_rejected() {
        let machine = toggle_machine();
        let mut doc: serde_json::Value =
            serde_json::from_str(&machine.export_json().unwrap()).unwrap();
        doc["nf"] = serde_json::json!([0]);
        match Machine::import_json(&doc.to_string()) {
            Err(ImportError::Corrupt { detail }) => {
                assert!(detail.contains("nf table"), "{detail}");
            }
            other => panic!("expected corrupt error, got {:?}", other.err()),
        }
    }

    #[test]
    fn out_of_range_table_entries_are_rejected() {
        let machine = toggle_machine();
        let mut doc: serde_json::Value =
            serde_json::from_str(&machine.export_json().unwrap()).unwrap();
        doc["nf"] = serde_json::json!([0, 9]);
        match Machine::import_json(&doc.to_string()) {
            Err(ImportError::Corrupt { detail }) => {
                assert!(detail.contains("address space"), "{detail}");
            }
            other => panic!("expected corrupt error, got {:?}", other.err()),
        }
    }

    #[test]
    fn optional_fields_are_omitted_per_kind() {
        let mut b = MachineBuilder::new("doc");
        b.bool_var("flag");
        b.enum_var("mode", &["off", "on"]);
        b.int_var("level", 1, 3);
        let machine = b.build().into_machine().unwrap();
        let doc: serde_json::Value =
            serde_json::from_str(&machine.export_json().unwrap()).unwrap();
        let vars = doc["vars"].as_array().unwrap();
        assert!(vars[0].get("labels").is_none());
        assert!(vars[0].get("min").is_none());
        assert_eq!(vars[1]["labels"][1], "on");
        assert_eq!(vars[2]["min"], 1);
        assert_eq!(vars[2]["max"], 3);
    }
}
