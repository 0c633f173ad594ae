use crate::provider::IdentityApi;
use lambda_models::{LambdaError, RoleSetting};
use tracing::debug;

/// Regions that live outside the standard `aws` partition.
const PARTITIONS: &[(&str, &str)] = &[
    ("cn-north-1", "aws-cn"),
    ("cn-northwest-1", "aws-cn"),
    ("us-gov-west-1", "aws-us-gov"),
];

pub fn partition_for_region(region: Option<&str>) -> &'static str {
    region
        .and_then(|r| {
            PARTITIONS
                .iter()
                .find(|(name, _)| *name == r)
                .map(|(_, partition)| *partition)
        })
        .unwrap_or("aws")
}

pub fn role_arn(partition: &str, account_id: &str, role_name: &str) -> String {
    format!("arn:{partition}:iam::{account_id}:role/{role_name}")
}

/// Turn the configured role into the value sent to the provider. The
/// identity service is only asked for the account id when a role name has
/// to be expanded.
pub async fn resolve_role(
    role: &RoleSetting,
    region: Option<&str>,
    identity: &dyn IdentityApi,
) -> Result<Option<String>, LambdaError> {
    match role {
        RoleSetting::Disabled => Ok(None),
        RoleSetting::Arn(arn) => Ok(Some(arn.clone())),
        RoleSetting::Named(name) => {
            let account_id = identity.caller_account_id().await?;
            let arn = role_arn(partition_for_region(region), &account_id, name);
            debug!("Resolved role {} to {}", name, arn);
            Ok(Some(arn))
        }
    }
}
