use lambda_models::LambdaError;
use rust_embed::RustEmbed;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(RustEmbed)]
#[folder = "templates"]
struct ProjectTemplates;

/// Files written by `init`, in order.
pub const TEMPLATE_FILES: &[&str] = &["service.py", "config.yaml", "event.json", "requirements.txt"];

/// Skipped by `init --minimal`.
const OPTIONAL_FILES: &[&str] = &["event.json"];

fn template(name: &str) -> Result<std::borrow::Cow<'static, [u8]>, LambdaError> {
    ProjectTemplates::get(name)
        .map(|file| file.data)
        .ok_or_else(|| LambdaError::InternalError {
            reason: format!("Template not found: {}", name),
        })
}

/// Copy the starter project into `folder`. Files that already exist are
/// left alone. Returns the paths that were written.
pub fn init(folder: &Path, minimal: bool) -> Result<Vec<PathBuf>, LambdaError> {
    std::fs::create_dir_all(folder)?;

    let mut written = Vec::new();
    for name in TEMPLATE_FILES {
        if minimal && OPTIONAL_FILES.contains(name) {
            continue;
        }
        let destination = folder.join(name);
        if destination.exists() {
            debug!("Keeping existing {}", destination.display());
            continue;
        }
        std::fs::write(&destination, template(name)?)?;
        written.push(destination);
    }

    info!("Initialised {} ({} files)", folder.display(), written.len());
    Ok(written)
}
