use crate::provider::FunctionApi;
use lambda_models::{FunctionVersion, LambdaError};
use lambda_telemetry::TracingService;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub deleted: Vec<String>,
    /// Versions that could not be deleted, usually because an alias
    /// points at them.
    pub skipped: Vec<(String, String)>,
}

/// Versions eligible for deletion: everything but the first entry of the
/// listing (`$LATEST`) and the last `keep` entries.
pub fn deletion_candidates(versions: &[FunctionVersion], keep: usize) -> &[FunctionVersion] {
    if versions.len() < keep {
        return &[];
    }
    let end = versions.len() - keep;
    if end <= 1 {
        return &[];
    }
    &versions[1..end]
}

#[instrument(skip(functions))]
pub async fn prune(
    functions: &dyn FunctionApi,
    function_name: &str,
    keep_last: i64,
) -> Result<PruneReport, LambdaError> {
    if keep_last <= 0 {
        warn!("Won't delete all versions. Please do this manually");
        return Ok(PruneReport::default());
    }
    let keep = usize::try_from(keep_last).unwrap_or(usize::MAX);

    let versions = functions.list_versions_by_function(function_name).await?;
    let candidates = deletion_candidates(&versions, keep);
    info!(
        "{} versions listed, {} to delete, keeping the last {}",
        versions.len(),
        candidates.len(),
        keep
    );

    let mut report = PruneReport::default();
    for candidate in candidates {
        match functions
            .delete_function(function_name, Some(&candidate.version))
            .await
        {
            Ok(()) => {
                TracingService::log_version_deleted(function_name, &candidate.version);
                report.deleted.push(candidate.version.clone());
            }
            Err(e) => {
                let err = LambdaError::VersionDeletionError {
                    version: candidate.version.clone(),
                    reason: e.to_string(),
                };
                TracingService::log_version_skipped(function_name, &candidate.version, &err.to_string());
                report.skipped.push((candidate.version.clone(), e.to_string()));
            }
        }
    }
    Ok(report)
}
