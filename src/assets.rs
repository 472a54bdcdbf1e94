use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use log::{info, warn};
use thiserror::Error;

use crate::obj::{load_obj_merged, load_obj_objects, MeshData, NamedMesh};

/// What can go wrong loading a single asset file. Every variant is
/// non-fatal: the affected component is simply absent from the scene.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Meshes gathered from the asset directory in one pass.
///
/// Missing files leave their slot empty; the render loop tolerates a
/// partially loaded bundle and never blocks on one.
#[derive(Debug, Default)]
pub struct AssetBundle {
    /// Tree sub-meshes with their authored names, for classification.
    pub tree: Option<Vec<NamedMesh>>,
    /// Pre-extruded greeting text meshes keyed by stem (`greeting_0`, ...).
    pub greetings: HashMap<String, MeshData>,
}

impl AssetBundle {
    /// Loads `tree.obj` and every `greeting_*.obj` from a directory.
    ///
    /// Load failures are logged and skipped; a single attempt per file, no
    /// retries.
    pub fn load_dir(dir: &Path) -> Self {
        let mut bundle = Self::default();

        match load_named_meshes(&dir.join("tree.obj")) {
            Ok(meshes) => {
                info!("loaded tree with {} sub-meshes", meshes.len());
                bundle.tree = Some(meshes);
            }
            Err(err) => warn!("tree unavailable, continuing without it: {err}"),
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("unable to scan asset directory {}: {err}", dir.display());
                return bundle;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !stem.starts_with("greeting_")
                || path.extension().and_then(|e| e.to_str()) != Some("obj")
            {
                continue;
            }
            match load_merged_mesh(&path) {
                Ok(mesh) => {
                    bundle.greetings.insert(stem.to_string(), mesh);
                }
                Err(err) => warn!("greeting mesh skipped: {err}"),
            }
        }
        if !bundle.greetings.is_empty() {
            info!("loaded {} greeting meshes", bundle.greetings.len());
        }

        bundle
    }

    /// Loads the bundle on a worker thread. The receiver yields exactly one
    /// bundle; the render loop polls it with `try_recv` and starts drawing
    /// immediately.
    pub fn load_dir_background(dir: PathBuf) -> Receiver<AssetBundle> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let bundle = AssetBundle::load_dir(&dir);
            // The receiver may already be gone if the window closed.
            let _ = tx.send(bundle);
        });
        rx
    }
}

fn read_asset(path: &Path) -> Result<String, AssetError> {
    fs::read_to_string(path).map_err(|source| AssetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and parses an OBJ file into named sub-meshes.
pub fn load_named_meshes(path: &Path) -> Result<Vec<NamedMesh>, AssetError> {
    let text = read_asset(path)?;
    load_obj_objects(&text).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and parses an OBJ file into a single merged mesh.
pub fn load_merged_mesh(path: &Path) -> Result<MeshData, AssetError> {
    let text = read_asset(path)?;
    load_obj_merged(&text).map_err(|source| AssetError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn write_file(dir: &Path, name: &str, contents: &str) {
        let mut file = fs::File::create(dir.join(name)).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn loads_tree_and_greetings() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "tree.obj", "o trunk\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        write_file(dir.path(), "greeting_0.obj", TRIANGLE);
        write_file(dir.path(), "greeting_1.obj", TRIANGLE);
        write_file(dir.path(), "notes.txt", "not a mesh");

        let bundle = AssetBundle::load_dir(dir.path());
        let tree = bundle.tree.unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "trunk");
        assert_eq!(bundle.greetings.len(), 2);
        assert!(bundle.greetings.contains_key("greeting_0"));
    }

    #[test]
    fn missing_tree_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = AssetBundle::load_dir(dir.path());
        assert!(bundle.tree.is_none());
        assert!(bundle.greetings.is_empty());
    }

    #[test]
    fn malformed_greeting_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "greeting_0.obj", "not an obj at all");
        write_file(dir.path(), "greeting_1.obj", TRIANGLE);
        let bundle = AssetBundle::load_dir(dir.path());
        assert_eq!(bundle.greetings.len(), 1);
        assert!(bundle.greetings.contains_key("greeting_1"));
    }

    #[test]
    fn background_load_delivers_one_bundle() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "greeting_0.obj", TRIANGLE);
        let rx = AssetBundle::load_dir_background(dir.path().to_path_buf());
        let bundle = rx.recv().unwrap();
        assert_eq!(bundle.greetings.len(), 1);
    }

    #[test]
    fn io_error_names_the_path() {
        let err = load_merged_mesh(Path::new("/definitely/missing.obj")).unwrap_err();
        assert!(err.to_string().contains("missing.obj"));
    }
}
