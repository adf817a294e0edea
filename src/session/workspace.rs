//! Session workspace
//!
//! Owns every script and mesh file written during a session. A temporary
//! workspace is removed from disk when dropped; a workspace rooted at a
//! caller-chosen directory is kept.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::compiler::{GeometryCompiler, MeshArtifact, MeshFormat};
use crate::error::{CompilationError, ForgeError, Result};
use crate::script::ScriptText;

/// Extension for script files
pub const SCRIPT_EXTENSION: &str = "scad";

/// Storage usage statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkspaceUsage {
    /// Number of files.
    pub file_count: usize,
    /// Total size in bytes.
    pub total_size_bytes: u64,
    /// Total size in megabytes.
    pub total_size_mb: f64,
}

/// Directory arena for one session
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    /// Held only so the directory lives exactly as long as the workspace
    temp: Option<TempDir>,
}

impl Workspace {
    /// Create a temporary workspace under the system temp directory
    pub fn temporary() -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix("scadforge-")
            .tempdir()
            .map_err(|e| ForgeError::WorkspaceCreate {
                path: std::env::temp_dir(),
                source: e,
            })?;

        Ok(Self {
            root: temp.path().to_path_buf(),
            temp: Some(temp),
        })
    }

    /// Use (and create if needed) a directory that outlives the session
    pub fn persistent(root: &Path) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| ForgeError::WorkspaceCreate {
            path: root.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            root: root.to_path_buf(),
            temp: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Whether the directory is removed on drop
    pub fn is_temporary(&self) -> bool {
        self.temp.is_some()
    }

    pub fn script_path(&self, id: Uuid) -> PathBuf {
        self.root.join(format!("{}.{}", id, SCRIPT_EXTENSION))
    }

    pub fn artifact_path(&self, id: Uuid, format: MeshFormat) -> PathBuf {
        self.root.join(format!("{}.{}", id, format.extension()))
    }

    /// Write a script version to a fresh file
    pub fn write_script(&self, script: &ScriptText) -> std::result::Result<(Uuid, PathBuf), CompilationError> {
        let id = Uuid::new_v4();
        let path = self.script_path(id);
        fs::write(&path, script.as_str()).map_err(|e| CompilationError::Io {
            path: path.clone(),
            source: e,
        })?;
        Ok((id, path))
    }

    /// Write `script` and compile it into each format, one after another
    ///
    /// All outputs share the script's id. On any failure every file this call
    /// wrote, the script included, is removed and no handle is returned.
    pub fn compile_script<C: GeometryCompiler + ?Sized>(
        &self,
        compiler: &C,
        script: &ScriptText,
        formats: &[MeshFormat],
    ) -> std::result::Result<BTreeMap<MeshFormat, MeshArtifact>, CompilationError> {
        let (id, script_path) = self.write_script(script)?;
        self.compile_file(compiler, &script_path, id, formats)
            .map_err(|err| {
                self.discard(&script_path);
                err
            })
    }

    /// Compile an existing script file into workspace outputs named by `id`
    ///
    /// The script itself may live anywhere. On any failure the outputs this
    /// call wrote are removed and no handle is returned.
    pub fn compile_file<C: GeometryCompiler + ?Sized>(
        &self,
        compiler: &C,
        script_path: &Path,
        id: Uuid,
        formats: &[MeshFormat],
    ) -> std::result::Result<BTreeMap<MeshFormat, MeshArtifact>, CompilationError> {
        let mut artifacts = BTreeMap::new();

        for &format in formats {
            let output_path = self.artifact_path(id, format);
            let result = compiler.compile(script_path, &output_path).and_then(|output| {
                for warning in output.warnings() {
                    tracing::warn!(%format, "{}", warning);
                }
                MeshArtifact::from_file(id, format, &output_path)
            });

            match result {
                Ok(artifact) => {
                    artifacts.insert(format, artifact);
                }
                Err(err) => {
                    self.discard(&output_path);
                    for artifact in artifacts.values() {
                        self.discard(&artifact.path);
                    }
                    return Err(err);
                }
            }
        }

        Ok(artifacts)
    }

    /// Remove an artifact together with the script version it came from
    pub fn discard_artifact(&self, artifact: &MeshArtifact) {
        self.discard(&artifact.path);
        self.discard(&self.script_path(artifact.id));
    }

    /// Best-effort removal of a file this workspace owns
    pub fn discard(&self, path: &Path) {
        if !path.starts_with(&self.root) {
            tracing::warn!(path = %path.display(), "refusing to delete file outside workspace");
            return;
        }
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove workspace file");
            }
        }
    }

    /// Copy an artifact out of the workspace as `<dest_dir>/<stem>.<ext>`
    pub fn export(&self, artifact: &MeshArtifact, dest_dir: &Path, stem: &str) -> Result<PathBuf> {
        let dest = dest_dir.join(artifact.download_name(stem));
        copy_out(&artifact.path, dest_dir, &dest)?;
        Ok(dest)
    }

    /// Write a script out of the workspace as `<dest_dir>/<stem>.scad`
    pub fn export_script(&self, script: &ScriptText, dest_dir: &Path, stem: &str) -> Result<PathBuf> {
        let dest = dest_dir.join(format!("{}.{}", stem, SCRIPT_EXTENSION));
        fs::create_dir_all(dest_dir).map_err(|e| ForgeError::ExportError {
            path: dest_dir.to_path_buf(),
            source: e,
        })?;
        fs::write(&dest, script.as_str()).map_err(|e| ForgeError::ExportError {
            path: dest.clone(),
            source: e,
        })?;
        Ok(dest)
    }

    /// Files and bytes currently held
    pub fn usage(&self) -> WorkspaceUsage {
        let (file_count, total_size_bytes) = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .fold((0usize, 0u64), |(count, bytes), meta| (count + 1, bytes + meta.len()));

        WorkspaceUsage {
            file_count,
            total_size_bytes,
            total_size_mb: total_size_bytes as f64 / (1024.0 * 1024.0),
        }
    }
}

fn copy_out(source: &Path, dest_dir: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest_dir).map_err(|e| ForgeError::ExportError {
        path: dest_dir.to_path_buf(),
        source: e,
    })?;
    fs::copy(source, dest).map_err(|e| ForgeError::ExportError {
        path: source.to_path_buf(),
        source: e,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{MockCompiler, MockFailure};

    #[test]
    fn test_temporary_removed_on_drop() {
        let workspace = Workspace::temporary().unwrap();
        let root = workspace.path().to_path_buf();
        let (_, script) = workspace.write_script(&ScriptText::from("cube(1);")).unwrap();

        assert!(workspace.is_temporary());
        assert!(script.exists());
        drop(workspace);
        assert!(!root.exists());
    }

    #[test]
    fn test_persistent_survives_drop() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("session");
        let workspace = Workspace::persistent(&root).unwrap();
        workspace.write_script(&ScriptText::from("cube(1);")).unwrap();
        drop(workspace);

        assert!(root.exists());
        assert_eq!(fs::read_dir(&root).unwrap().count(), 1);
    }

    #[test]
    fn test_usage_and_discard() {
        let workspace = Workspace::temporary().unwrap();
        let (_, a) = workspace.write_script(&ScriptText::from("aaaa")).unwrap();
        workspace.write_script(&ScriptText::from("bb")).unwrap();

        let usage = workspace.usage();
        assert_eq!(usage.file_count, 2);
        assert_eq!(usage.total_size_bytes, 6);

        workspace.discard(&a);
        assert_eq!(workspace.usage().file_count, 1);
    }

    #[test]
    fn test_discard_ignores_outside_paths() {
        let outside = TempDir::new().unwrap();
        let file = outside.path().join("keep.txt");
        fs::write(&file, "x").unwrap();

        let workspace = Workspace::temporary().unwrap();
        workspace.discard(&file);
        assert!(file.exists());
    }

    #[test]
    fn test_compile_script_all_formats() {
        let workspace = Workspace::temporary().unwrap();
        let compiler = MockCompiler::new();

        let artifacts = workspace
            .compile_script(&compiler, &ScriptText::from("cube(1);"), &MeshFormat::DEFAULT_SET)
            .unwrap();

        assert_eq!(artifacts.len(), 2);
        let ids: Vec<_> = artifacts.values().map(|a| a.id).collect();
        assert_eq!(ids[0], ids[1]);
        assert!(workspace.script_path(ids[0]).exists());
        assert_eq!(workspace.usage().file_count, 3);
    }

    #[test]
    fn test_compile_script_failure_removes_everything() {
        let workspace = Workspace::temporary().unwrap();
        let compiler = MockCompiler::new();
        compiler.fail_format(MeshFormat::ThreeMf, MockFailure::new(1, "", "export failed"));

        let err = workspace
            .compile_script(&compiler, &ScriptText::from("cube(1);"), &MeshFormat::DEFAULT_SET)
            .unwrap_err();

        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(compiler.calls(MeshFormat::Stl), 1);
        assert_eq!(workspace.usage().file_count, 0);
    }

    #[test]
    fn test_discard_artifact_removes_its_script() {
        let workspace = Workspace::temporary().unwrap();
        let artifacts = workspace
            .compile_script(&MockCompiler::new(), &ScriptText::from("cube(1);"), &[MeshFormat::Stl])
            .unwrap();
        let stl = &artifacts[&MeshFormat::Stl];

        workspace.discard_artifact(stl);
        assert!(!stl.path.exists());
        assert!(!workspace.script_path(stl.id).exists());
        assert_eq!(workspace.usage().file_count, 0);
    }

    #[test]
    fn test_export_copies_with_download_name() {
        let workspace = Workspace::temporary().unwrap();
        let id = Uuid::new_v4();
        let path = workspace.artifact_path(id, MeshFormat::Stl);
        fs::write(&path, "solid m\nendsolid m\n").unwrap();
        let artifact = MeshArtifact::from_file(id, MeshFormat::Stl, &path).unwrap();

        let out = TempDir::new().unwrap();
        let dest = workspace.export(&artifact, &out.path().join("downloads"), "model").unwrap();

        assert_eq!(dest.file_name().unwrap(), "model.stl");
        assert_eq!(fs::read(&dest).unwrap(), fs::read(&path).unwrap());

        let script = workspace
            .export_script(&ScriptText::from("cube(2);"), out.path(), "model")
            .unwrap();
        assert_eq!(fs::read_to_string(script).unwrap(), "cube(2);");
    }
}
