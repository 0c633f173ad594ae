use crate::zip_handler::sha256_hex;
use lambda_models::{BuildArtifact, LambdaError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Files never bundled from the project root.
pub const OS_METADATA_FILES: &[&str] = &[".DS_Store", "Thumbs.db", "desktop.ini"];

/// A project entry selected for bundling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEntry {
    /// Top-level file; copied flat into the staging root.
    File(PathBuf),
    /// Configured source directory; copied recursively under its own name.
    Directory(PathBuf),
}

/// Assembles a staging directory and zips it.
pub struct ArchiveBuilder {
    config_file_name: String,
}

impl ArchiveBuilder {
    pub fn new(config_file_name: impl Into<String>) -> Self {
        Self {
            config_file_name: config_file_name.into(),
        }
    }

    /// Top-level files of `project_dir` plus the subdirectories named in
    /// `source_directories`, sorted by name.
    pub fn collect_sources(
        &self,
        project_dir: &Path,
        source_directories: &[String],
    ) -> Result<Vec<SourceEntry>, LambdaError> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(project_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();

            if path.is_file() {
                if OS_METADATA_FILES.contains(&name.as_str()) || name == self.config_file_name {
                    continue;
                }
                info!("Bundling: {:?}", name);
                entries.push(SourceEntry::File(path));
            } else if path.is_dir() && source_directories.iter().any(|d| d == &name) {
                info!("Bundling directory: {:?}", name);
                entries.push(SourceEntry::Directory(path));
            }
        }
        entries.sort_by(|a, b| a.path().cmp(b.path()));
        Ok(entries)
    }

    /// Copy collected entries into `staging_dir`.
    pub fn stage_sources(
        &self,
        entries: &[SourceEntry],
        staging_dir: &Path,
    ) -> Result<(), LambdaError> {
        for entry in entries {
            match entry {
                SourceEntry::File(path) => {
                    let Some(name) = path.file_name() else {
                        continue;
                    };
                    fs::copy(path, staging_dir.join(name))?;
                }
                SourceEntry::Directory(path) => {
                    let Some(name) = path.file_name() else {
                        continue;
                    };
                    copy_dir_recursive(path, &staging_dir.join(name))?;
                }
            }
        }
        Ok(())
    }

    /// Zip the contents of `staging_dir` into `output`. Entry names are
    /// relative to the staging root, `/` separated and sorted. The zip is
    /// written next to `output` and renamed into place once complete.
    #[instrument(skip(self))]
    pub fn write_zip(&self, staging_dir: &Path, output: &Path) -> Result<BuildArtifact, LambdaError> {
        let parent = output
            .parent()
            .ok_or_else(|| LambdaError::internal(format!("{} has no parent", output.display())))?;
        fs::create_dir_all(parent)?;

        let tmp = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(".zip")
            .tempfile_in(parent)?;

        let mut zip = ZipWriter::new(tmp.reopen()?);
        let mut count = 0usize;
        for entry in WalkDir::new(staging_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| LambdaError::internal(e))?;
            if !entry.file_type().is_file() && !is_symlink_to_file(&entry) {
                continue;
            }
            let name = archive_name(staging_dir, entry.path())?;
            let options = FileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .unix_permissions(file_mode(entry.path()));
            zip.start_file(name.as_str(), options)
                .map_err(|e| LambdaError::internal(e))?;
            zip.write_all(&fs::read(entry.path())?)?;
            debug!("Archived {}", name);
            count += 1;
        }
        zip.finish().map_err(|e| LambdaError::internal(e))?;

        tmp.persist(output)
            .map_err(|e| LambdaError::internal(format!("failed to persist {}: {e}", output.display())))?;

        let bytes = fs::read(output)?;
        info!("Wrote {} entries to {}", count, output.display());
        Ok(BuildArtifact {
            path: output.to_path_buf(),
            sha256: sha256_hex(&bytes),
            size: bytes.len() as u64,
        })
    }

    /// Collect, stage and zip in one step.
    pub fn build(
        &self,
        project_dir: &Path,
        staging_dir: &Path,
        source_directories: &[String],
        output: &Path,
    ) -> Result<BuildArtifact, LambdaError> {
        let entries = self.collect_sources(project_dir, source_directories)?;
        self.stage_sources(&entries, staging_dir)?;
        self.write_zip(staging_dir, output)
    }
}

impl SourceEntry {
    pub fn path(&self) -> &Path {
        match self {
            SourceEntry::File(p) | SourceEntry::Directory(p) => p,
        }
    }
}

fn is_symlink_to_file(entry: &walkdir::DirEntry) -> bool {
    entry.path_is_symlink() && entry.path().is_file()
}

/// Entry name for `path` relative to `root`, never absolute.
pub fn archive_name(root: &Path, path: &Path) -> Result<String, LambdaError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        LambdaError::internal(format!(
            "{} is outside the staging directory {}",
            path.display(),
            root.display()
        ))
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<(), LambdaError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| LambdaError::internal(e))?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| LambdaError::internal(e))?;
        let target = dest.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn file_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o777)
        .unwrap_or(0o644)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> u32 {
    0o644
}
