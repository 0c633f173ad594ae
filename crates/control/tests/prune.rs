use lambda_control::prune;
use lambda_testsupport::{FakeProvider, ProviderCall};
use lambda_models::RemoteFunctionState;

async fn provider_with_versions(name: &str, published: usize) -> FakeProvider {
    let provider = FakeProvider::new();
    provider
        .with_function(
            RemoteFunctionState {
                function_name: name.to_string(),
                ..Default::default()
            },
            published,
        )
        .await;
    provider
}

async fn deleted_qualifiers(provider: &FakeProvider) -> Vec<String> {
    provider
        .calls()
        .await
        .into_iter()
        .filter_map(|c| match c {
            ProviderCall::DeleteFunction { qualifier, .. } => qualifier,
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn keeps_latest_and_most_recent_versions() {
    let provider = provider_with_versions("pruned", 5).await;

    let report = prune(&provider, "pruned", 2).await.unwrap();

    assert_eq!(report.deleted, vec!["1", "2", "3"]);
    assert!(report.skipped.is_empty());
    assert_eq!(
        provider.function("pruned").await.unwrap().versions,
        vec!["4".to_string(), "5".to_string()]
    );
}

#[tokio::test]
async fn fewer_versions_than_keep_deletes_nothing() {
    let provider = provider_with_versions("small", 3).await;

    let report = prune(&provider, "small", 5).await.unwrap();

    assert!(report.deleted.is_empty());
    assert!(deleted_qualifiers(&provider).await.is_empty());
}

#[tokio::test]
async fn non_positive_keep_never_lists_or_deletes() {
    let provider = provider_with_versions("guarded", 4).await;

    prune(&provider, "guarded", 0).await.unwrap();
    prune(&provider, "guarded", -3).await.unwrap();

    assert!(provider.calls().await.is_empty());
}

#[tokio::test]
async fn aliased_version_is_skipped_and_batch_continues() {
    let provider = provider_with_versions("aliased", 6).await;
    provider.alias_version("2").await;

    let report = prune(&provider, "aliased", 2).await.unwrap();

    assert_eq!(deleted_qualifiers(&provider).await, vec!["1", "2", "3", "4"]);
    assert_eq!(report.deleted, vec!["1", "3", "4"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "2");
}

#[tokio::test]
async fn listing_failure_is_fatal() {
    let provider = provider_with_versions("broken", 4).await;
    provider.fail_on("ListVersionsByFunction", "throttled").await;

    assert!(prune(&provider, "broken", 1).await.is_err());
}

#[tokio::test]
async fn version_numbers_are_not_reused_after_pruning() {
    use lambda_control::{DeployOptions, Reconciler};
    use lambda_models::FunctionCode;
    use lambda_testsupport::sample_config;

    let provider = provider_with_versions("renumbered", 5).await;
    prune(&provider, "renumbered", 2).await.unwrap();

    let outcome = Reconciler::new(&provider, &provider)
        .reconcile(
            &sample_config("renumbered"),
            FunctionCode::ZipFile(b"PK".to_vec()),
            DeployOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.version.as_deref(), Some("6"));
    assert_eq!(
        provider.function("renumbered").await.unwrap().versions,
        vec!["4".to_string(), "5".to_string(), "6".to_string()]
    );
}
