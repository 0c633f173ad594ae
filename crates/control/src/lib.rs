pub mod aws;
pub mod deploy;
pub mod provider;
pub mod pruner;
pub mod reconciler;
pub mod role;
pub mod transport;

pub use aws::AwsProvider;
pub use deploy::{CodeDelivery, Deployer};
pub use provider::{FunctionApi, IdentityApi, ObjectStore};
pub use pruner::{deletion_candidates, prune, PruneReport};
pub use reconciler::{
    ConcurrencyAction, DeployAction, DeployOptions, DeployOutcome, DesiredFunction, Reconciler,
    TagChanges,
};
pub use role::{partition_for_region, resolve_role, role_arn};
pub use transport::{object_key, stage};
