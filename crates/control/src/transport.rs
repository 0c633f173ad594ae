use crate::provider::ObjectStore;
use chrono::{DateTime, Utc};
use lambda_models::{BuildArtifact, LambdaError};
use lambda_telemetry::TracingService;
use tracing::instrument;

/// `<prefix><md5>-<seconds>.<micros>.zip`. The checksum only keeps keys
/// apart; the timestamp makes re-uploads of identical bytes distinct.
pub fn object_key(prefix: &str, body: &[u8], at: DateTime<Utc>) -> String {
    format!(
        "{}{:x}-{}.{:06}.zip",
        prefix,
        md5::compute(body),
        at.timestamp(),
        at.timestamp_subsec_micros()
    )
}

/// Upload the artifact and return the key it was stored under.
#[instrument(skip(artifact, store), fields(artifact = %artifact.path.display()))]
pub async fn stage(
    artifact: &BuildArtifact,
    bucket: &str,
    key_prefix: &str,
    store: &dyn ObjectStore,
) -> Result<String, LambdaError> {
    let body = artifact.read_bytes()?;
    let key = object_key(key_prefix, &body, Utc::now());
    let size = body.len();

    store
        .put_object(bucket, &key, body)
        .await
        .map_err(|e| match e {
            LambdaError::TransportError { .. } => e,
            other => LambdaError::TransportError {
                bucket: bucket.to_string(),
                key: key.clone(),
                reason: other.to_string(),
            },
        })?;

    TracingService::log_artifact_staged(bucket, &key, size);
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn key_embeds_prefix_checksum_and_time() {
        let at = Utc.timestamp_opt(1_700_000_000, 123_456_000).unwrap();
        let key = object_key("dist/", b"hello", at);
        assert_eq!(
            key,
            "dist/5d41402abc4b2a76b9719d911017c592-1700000000.123456.zip"
        );
    }

    #[test]
    fn identical_bytes_get_distinct_keys_over_time() {
        let first = object_key("", b"same", Utc.timestamp_opt(10, 0).unwrap());
        let second = object_key("", b"same", Utc.timestamp_opt(11, 0).unwrap());
        assert_ne!(first, second);
        assert_eq!(first.split('-').next(), second.split('-').next());
    }
}
