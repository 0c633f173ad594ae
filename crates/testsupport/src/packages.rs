use async_trait::async_trait;
use lambda_models::LambdaError;
use lambda_packaging::PackageManager;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Package manager that "installs" a package by creating a directory
/// named after it in the target, with an `__init__.py` inside.
#[derive(Debug, Clone, Default)]
pub struct FakePackageManager {
    pub frozen: Vec<String>,
    pub installed: Arc<Mutex<Vec<String>>>,
    pub failing: BTreeSet<String>,
    /// Packages installed as namespace packages, without `__init__.py`.
    pub namespace: BTreeSet<String>,
}

impl FakePackageManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frozen<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.frozen = packages.into_iter().map(Into::into).collect();
        self
    }

    pub fn failing_on(mut self, package: &str) -> Self {
        self.failing.insert(package.to_string());
        self
    }

    pub fn as_namespace(mut self, package: &str) -> Self {
        self.namespace.insert(package.to_string());
        self
    }

    pub async fn installed(&self) -> Vec<String> {
        self.installed.lock().await.clone()
    }
}

/// Directory name for a requirement specifier (`requests==2.31` -> `requests`,
/// `zope.interface` -> `zope`, `./libs/shared` -> `shared`).
pub fn package_dir_name(package: &str) -> String {
    if package.starts_with('.') || package.starts_with('/') {
        return std::path::Path::new(package)
            .file_name()
            .map(|n| n.to_string_lossy().replace('-', "_"))
            .unwrap_or_else(|| "local".to_string());
    }
    let end = package
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(package.len());
    package[..end].replace('-', "_").to_lowercase()
}

#[async_trait]
impl PackageManager for FakePackageManager {
    async fn freeze(&self) -> Result<Vec<String>, LambdaError> {
        Ok(self.frozen.clone())
    }

    async fn install(&self, package: &str, target: &Path) -> Result<(), LambdaError> {
        self.installed.lock().await.push(package.to_string());
        if self.failing.contains(package) {
            return Err(LambdaError::DependencyInstallError {
                package: package.to_string(),
                reason: "No matching distribution found".to_string(),
            });
        }

        let name = package_dir_name(package);
        let dir = target.join(&name);
        std::fs::create_dir_all(&dir)?;
        if self.namespace.contains(&name) {
            std::fs::create_dir_all(dir.join("interface"))?;
            std::fs::write(dir.join("interface").join("__init__.py"), b"")?;
        } else {
            std::fs::write(dir.join("__init__.py"), b"")?;
        }
        Ok(())
    }
}
