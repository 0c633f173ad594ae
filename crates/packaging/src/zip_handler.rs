use lambda_models::LambdaError;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{info, instrument};
use zip::ZipArchive;

/// Reads built artifacts back for reporting and verification.
pub struct ZipHandler;

impl ZipHandler {
    #[instrument(skip(zip_data))]
    pub fn process_zip(zip_data: &[u8]) -> Result<ZipInfo, LambdaError> {
        let sha256 = sha256_hex(zip_data);

        let mut archive = ZipArchive::new(std::io::Cursor::new(zip_data))
            .map_err(|e| LambdaError::InvalidZipFile {
                reason: e.to_string(),
            })?;

        let mut files = Vec::with_capacity(archive.len());
        let mut total_size = 0;

        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| LambdaError::InvalidZipFile {
                    reason: e.to_string(),
                })?;

            total_size += file.size();
            files.push(ZipFileInfo {
                name: file.name().to_string(),
                size: file.size(),
                is_executable: file.unix_mode().map_or(false, |mode| mode & 0o111 != 0),
            });
        }

        info!(
            "Processed ZIP with {} files, total size: {} bytes, SHA256: {}",
            files.len(),
            total_size,
            sha256
        );

        Ok(ZipInfo {
            sha256,
            files,
            total_size,
        })
    }

    pub fn process_file(path: &Path) -> Result<ZipInfo, LambdaError> {
        let data = std::fs::read(path)?;
        Self::process_zip(&data)
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ZipInfo {
    pub sha256: String,
    pub files: Vec<ZipFileInfo>,
    pub total_size: u64,
}

impl ZipInfo {
    pub fn names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ZipFileInfo {
    pub name: String,
    pub size: u64,
    pub is_executable: bool,
}
