use crate::LambdaError;
use std::path::{Path, PathBuf};

/// A built deployment zip. The file is complete on disk before this value
/// exists; removing it is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    pub path: PathBuf,
    /// Hex encoded SHA-256 of the zip bytes.
    pub sha256: String,
    pub size: u64,
}

impl BuildArtifact {
    pub fn read_bytes(&self) -> Result<Vec<u8>, LambdaError> {
        std::fs::read(&self.path).map_err(|e| LambdaError::InternalError {
            reason: format!("failed to read artifact {}: {e}", self.path.display()),
        })
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }
}

/// Append `.zip` unless the name already ends with it.
pub fn ensure_zip_suffix(name: &str) -> String {
    if name.ends_with(".zip") {
        name.to_string()
    } else {
        format!("{name}.zip")
    }
}

/// Output path of an artifact inside the project's dist directory.
pub fn artifact_path(project_dir: &Path, dist_directory: &str, file_name: &str) -> PathBuf {
    project_dir
        .join(dist_directory)
        .join(ensure_zip_suffix(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_suffix_added_once() {
        assert_eq!(ensure_zip_suffix("bundle"), "bundle.zip");
        assert_eq!(ensure_zip_suffix("bundle.zip"), "bundle.zip");
        assert_eq!(ensure_zip_suffix("bundle.tar"), "bundle.tar.zip");
    }

    #[test]
    fn artifact_path_lands_in_dist() {
        let path = artifact_path(Path::new("/p"), "dist", "x");
        assert_eq!(path, PathBuf::from("/p/dist/x.zip"));
    }
}
