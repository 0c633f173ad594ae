use async_trait::async_trait;
use lambda_models::LambdaError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, error, info, instrument, warn};

/// Requirement lines that are never installed into the bundle: index
/// options, comments, the interpreter itself and this tool's own package.
pub const EXCLUDED_PREFIXES: &[&str] = &["-i", "#", "Python==", "python-lambda=="];

/// Editable install marker stripped before installation.
pub const EDITABLE_MARKER: &str = "-e ";

/// Namespace packages that ship without an `__init__.py` and are not
/// importable from a flat zip without one.
pub const NAMESPACE_PACKAGES: &[&str] = &["zope"];

/// Where the list of third-party packages comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMode {
    /// Every package installed in the current environment.
    Freeze,
    /// Packages listed in a requirements file.
    Requirements(PathBuf),
}

#[async_trait]
pub trait PackageManager: Send + Sync {
    /// `name==version` specifiers of everything currently installed.
    async fn freeze(&self) -> Result<Vec<String>, LambdaError>;

    /// Install one package into `target`, ignoring system-wide copies.
    async fn install(&self, package: &str, target: &Path) -> Result<(), LambdaError>;
}

/// `pip` driven through the configured interpreter.
#[derive(Debug, Clone)]
pub struct PipPackageManager {
    python: String,
}

impl PipPackageManager {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

#[async_trait]
impl PackageManager for PipPackageManager {
    #[instrument(skip(self))]
    async fn freeze(&self) -> Result<Vec<String>, LambdaError> {
        let output = Command::new(&self.python)
            .args(["-m", "pip", "freeze"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| LambdaError::DependencyInstallError {
                package: "<freeze>".to_string(),
                reason: format!("failed to run {} -m pip freeze: {e}", self.python),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("pip freeze failed - stderr: {}", stderr);
            return Err(LambdaError::DependencyInstallError {
                package: "<freeze>".to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect())
    }

    #[instrument(skip(self))]
    async fn install(&self, package: &str, target: &Path) -> Result<(), LambdaError> {
        let output = Command::new(&self.python)
            .args(["-m", "pip", "install", package, "-t"])
            .arg(target)
            .arg("--ignore-installed")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| LambdaError::DependencyInstallError {
                package: package.to_string(),
                reason: format!("failed to run {} -m pip install: {e}", self.python),
            })?;

        debug!("pip install stdout: {}", String::from_utf8_lossy(&output.stdout));

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("pip install {} failed - stderr: {}", package, stderr);
            return Err(LambdaError::DependencyInstallError {
                package: package.to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

/// Drop excluded and blank entries and strip editable markers.
pub fn filter_packages<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let line = line.as_ref().trim();
            if line.is_empty() || EXCLUDED_PREFIXES.iter().any(|p| line.starts_with(p)) {
                return None;
            }
            let line = line.strip_prefix(EDITABLE_MARKER).unwrap_or(line).trim();
            Some(line.to_string())
        })
        .collect()
}

/// Create missing `__init__.py` markers for known namespace packages.
/// Returns the packages that were patched.
pub fn apply_namespace_fixes(target: &Path) -> Result<Vec<String>, LambdaError> {
    let mut patched = Vec::new();
    for name in NAMESPACE_PACKAGES {
        let package_dir = target.join(name);
        let marker = package_dir.join("__init__.py");
        if package_dir.is_dir() && !marker.exists() {
            info!(
                "{} namespace package detected; adding __init__.py to make it importable",
                name
            );
            std::fs::write(&marker, b"")?;
            patched.push(name.to_string());
        }
    }
    Ok(patched)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    pub installed: Vec<String>,
    pub namespace_fixes: Vec<String>,
}

pub struct DependencyInstaller<'a> {
    package_manager: &'a dyn PackageManager,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(package_manager: &'a dyn PackageManager) -> Self {
        Self { package_manager }
    }

    /// Resolve the package list for `mode`, append `local_packages`, and
    /// install each entry into `target`. The first failed install aborts.
    #[instrument(skip(self, local_packages))]
    pub async fn install(
        &self,
        target: &Path,
        mode: &InstallMode,
        local_packages: &[String],
    ) -> Result<InstallReport, LambdaError> {
        let lines = match mode {
            InstallMode::Freeze => {
                info!("Gathering pip packages");
                self.package_manager.freeze().await?
            }
            InstallMode::Requirements(path) => {
                if path.exists() {
                    info!("Gathering requirement packages from {}", path.display());
                    std::fs::read_to_string(path)?
                        .lines()
                        .map(str::to_string)
                        .collect()
                } else {
                    warn!("Requirements file {} not found", path.display());
                    Vec::new()
                }
            }
        };

        let mut packages = filter_packages(&lines);
        if packages.is_empty() {
            warn!("No dependency packages installed!");
        }
        packages.extend(local_packages.iter().cloned());

        for package in &packages {
            info!("Installing {}", package);
            self.package_manager.install(package, target).await?;
        }

        let namespace_fixes = apply_namespace_fixes(target)?;

        debug!(
            "Install directory contents are now: {:?}",
            std::fs::read_dir(target)
                .map(|entries| entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect::<Vec<_>>())
                .unwrap_or_default()
        );

        Ok(InstallReport {
            installed: packages,
            namespace_fixes,
        })
    }
}
