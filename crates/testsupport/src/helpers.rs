use anyhow::Result;
use lambda_models::ProjectConfig;
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use zip::ZipArchive;

pub const SAMPLE_HANDLER: &str = "def handler(event, context):\n    return {\"echo\": event}\n";

/// Minimal valid config for a function named `name`.
pub fn sample_config(name: &str) -> ProjectConfig {
    ProjectConfig {
        function_name: name.to_string(),
        handler: "service.handler".to_string(),
        description: "test function".to_string(),
        ..Default::default()
    }
}

/// Write `contents` to `relative` under `root`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, contents: &str) -> Result<()> {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// A project directory with `service.py`, `config.yaml` and the given
/// extra files.
pub fn project_fixture(extra: &[(&str, &str)]) -> Result<TempDir> {
    let dir = tempfile::tempdir()?;
    write_file(dir.path(), "service.py", SAMPLE_HANDLER)?;
    write_file(
        dir.path(),
        "config.yaml",
        "function_name: fixture\nhandler: service.handler\n",
    )?;
    for (relative, contents) in extra {
        write_file(dir.path(), relative, contents)?;
    }
    Ok(dir)
}

/// Sorted entry names of a zip file.
pub fn zip_entries(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut names = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        names.push(archive.by_index(i)?.name().to_string());
    }
    names.sort();
    Ok(names)
}

/// Contents of one zip entry.
pub fn zip_entry(path: &Path, name: &str) -> Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut entry = archive.by_name(name)?;
    let mut contents = String::new();
    entry.read_to_string(&mut contents)?;
    Ok(contents)
}
