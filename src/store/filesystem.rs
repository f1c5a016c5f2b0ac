//! Filesystem persistence: one Turtle document per named graph.
//!
//! Layout under the data directory:
//!
//! ```text
//! manifest.json        public graph name -> document file name
//! <sha256(name)>.ttl   the graph's triples as Turtle
//! ```
//!
//! File names are the SHA-256 of the graph name, so any name is a safe file
//! name. Documents and the manifest are written to a temp file and renamed
//! into place. Every I/O failure maps to `Error::StoreUnavailable`; the
//! caller decides whether to retry.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::model::TripleSet;
use crate::store::StorageBackend;

const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    graphs: BTreeMap<String, String>,
}

pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Opens a data directory, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            Error::StoreUnavailable(format!(
                "cannot create data directory {}: {e}",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn read_manifest(&self) -> Result<Manifest> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(Manifest::default());
        }
        let data = fs::read_to_string(&path)
            .map_err(|e| Error::StoreUnavailable(format!("cannot read manifest: {e}")))?;
        serde_json::from_str(&data)
            .map_err(|e| Error::StoreUnavailable(format!("corrupt manifest: {e}")))
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<()> {
        let data = serde_json::to_string_pretty(manifest)
            .map_err(|e| Error::StoreUnavailable(format!("cannot encode manifest: {e}")))?;
        self.write_atomic(&self.manifest_path(), data.as_bytes())
    }

    /// Temp-file-then-rename, so a crashed write never truncates the
    /// previous document.
    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, data).map_err(|e| {
            Error::StoreUnavailable(format!("cannot write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            Error::StoreUnavailable(format!("cannot replace {}: {e}", path.display()))
        })
    }

    fn document_name(graph_name: &str) -> String {
        let digest = Sha256::digest(graph_name.as_bytes());
        let mut name = String::with_capacity(digest.len() * 2 + 4);
        for byte in digest {
            name.push_str(&format!("{byte:02x}"));
        }
        name.push_str(".ttl");
        name
    }
}

impl StorageBackend for FilesystemBackend {
    fn load_all(&self) -> Result<Vec<(String, TripleSet)>> {
        let manifest = self.read_manifest()?;
        let mut graphs = Vec::with_capacity(manifest.graphs.len());
        for (name, file) in manifest.graphs {
            let path = self.root.join(&file);
            let data = fs::read_to_string(&path).map_err(|e| {
                Error::StoreUnavailable(format!(
                    "cannot read graph document {}: {e}",
                    path.display()
                ))
            })?;
            graphs.push((name, TripleSet::from_turtle(&data)?));
        }
        Ok(graphs)
    }

    fn persist(&self, graph_name: &str, graph: &TripleSet) -> Result<()> {
        let file = Self::document_name(graph_name);
        let document = graph.to_turtle()?;
        self.write_atomic(&self.root.join(&file), document.as_bytes())?;

        let mut manifest = self.read_manifest()?;
        if manifest.graphs.get(graph_name).map(String::as_str) != Some(file.as_str()) {
            manifest.graphs.insert(graph_name.to_string(), file);
            self.write_manifest(&manifest)?;
        }
        Ok(())
    }
}
