//! Request-time authorization.
//!
//! [`AuthorizationPipeline::decide`] runs a fixed sequence of stages under a
//! deadline: validate the token, resolve the principal's groups, resolve and
//! union their permissions, then build the gateway decision. Any failure is
//! logged with its stage and reported to the caller as a bare
//! [`Unauthorized`].

use crate::headers::ClientCacheControl;
use crate::identity::{AuthenticationError, TokenValidator};
use crate::models::{AggregatedPermissions, Group, Principal};
use crate::policy::{self, ApiContext, Decision, PolicyError};
use crate::resolver::aggregate::union;
use crate::resolver::{MembershipResolver, PermissionAggregator, Resolution};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{timeout_at, Instant};

pub mod guard;

pub use guard::{Denial, Guard};

/// Opaque failure returned for every denied or failed decision
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("Unauthorized")]
pub struct Unauthorized;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ReceiveRequest,
    ValidateToken,
    ResolveMembership,
    ResolvePermissions,
    Aggregate,
    BuildPolicy,
    Respond,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::ReceiveRequest => "receive_request",
            Stage::ValidateToken => "validate_token",
            Stage::ResolveMembership => "resolve_membership",
            Stage::ResolvePermissions => "resolve_permissions",
            Stage::Aggregate => "aggregate",
            Stage::BuildPolicy => "build_policy",
            Stage::Respond => "respond",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Invalid request context: {0}")]
    InvalidRequest(#[source] PolicyError),
    #[error(transparent)]
    Authentication(#[from] AuthenticationError),
    #[error("Principal {0} is unknown")]
    UnknownPrincipal(Principal),
    #[error("Principal {0} belongs to no groups")]
    NoGroups(Principal),
    #[error("Membership of {0} is unavailable")]
    MembershipUnavailable(Principal),
    #[error(transparent)]
    Policy(#[from] PolicyError),
    #[error("Decision deadline exceeded")]
    DeadlineExceeded,
}

impl PipelineError {
    /// Stage the failure was raised in; `None` when the deadline cut the run short
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::InvalidRequest(_) => Some(Stage::ReceiveRequest),
            PipelineError::Authentication(_) => Some(Stage::ValidateToken),
            PipelineError::UnknownPrincipal(_)
            | PipelineError::NoGroups(_)
            | PipelineError::MembershipUnavailable(_) => Some(Stage::ResolveMembership),
            PipelineError::Policy(_) => Some(Stage::BuildPolicy),
            PipelineError::DeadlineExceeded => None,
        }
    }
}

/// A gateway authorizer invocation
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub authorization: String,
    pub method_arn: String,
    pub cache_control: ClientCacheControl,
    pub deadline: Instant,
}

impl AuthorizationRequest {
    pub fn new<A, M>(
        authorization: A,
        method_arn: M,
        cache_control: ClientCacheControl,
        timeout: Duration,
    ) -> Self
    where
        A: Into<String>,
        M: Into<String>,
    {
        Self {
            authorization: authorization.into(),
            method_arn: method_arn.into(),
            cache_control,
            deadline: Instant::now() + timeout,
        }
    }
}

#[derive(Clone)]
pub struct AuthorizationPipeline {
    validator: Arc<TokenValidator>,
    membership: MembershipResolver,
    aggregator: PermissionAggregator,
}

impl AuthorizationPipeline {
    pub fn new(
        validator: Arc<TokenValidator>,
        membership: MembershipResolver,
        aggregator: PermissionAggregator,
    ) -> Self {
        Self {
            validator,
            membership,
            aggregator,
        }
    }

    /// Produce a decision for the request, or `Unauthorized`
    pub async fn decide(&self, request: &AuthorizationRequest) -> Result<Decision, Unauthorized> {
        match self.evaluate(request).await {
            Ok(decision) => {
                info!(
                    "Authorized {} for {} resources",
                    decision.principal_id,
                    decision.allowed_resources().len()
                );
                Ok(decision)
            }
            Err(err) => {
                let stage = err
                    .stage()
                    .map(|stage| stage.to_string())
                    .unwrap_or_else(|| "deadline".to_string());
                warn!("Authorization denied at stage {}: {}", stage, err);
                Err(Unauthorized)
            }
        }
    }

    /// Run every stage under the request deadline and keep the failure detail
    pub async fn evaluate(&self, request: &AuthorizationRequest) -> Result<Decision, PipelineError> {
        timeout_at(request.deadline, self.run(request))
            .await
            .unwrap_or(Err(PipelineError::DeadlineExceeded))
    }

    async fn run(&self, request: &AuthorizationRequest) -> Result<Decision, PipelineError> {
        let cache_control = &request.cache_control;

        debug!("Stage {}", Stage::ReceiveRequest);
        let context =
            ApiContext::from_method_arn(&request.method_arn).map_err(PipelineError::InvalidRequest)?;

        debug!("Stage {}", Stage::ValidateToken);
        let principal = self.validator.validate(&request.authorization).await?;

        debug!("Stage {} for {}", Stage::ResolveMembership, principal);
        let groups = self.groups(&principal, cache_control).await?;

        debug!("Stage {} for {} groups", Stage::ResolvePermissions, groups.len());
        let maps = self.aggregator.resolve_all(&groups, cache_control).await;

        debug!("Stage {}", Stage::Aggregate);
        let aggregated = union(maps);

        debug!("Stage {}", Stage::BuildPolicy);
        let decision = policy::build(&principal, &aggregated, &context)?;

        debug!("Stage {}", Stage::Respond);
        Ok(decision)
    }

    async fn groups(
        &self,
        principal: &Principal,
        cache_control: &ClientCacheControl,
    ) -> Result<BTreeSet<Group>, PipelineError> {
        match self.membership.resolve_groups(principal, cache_control).await {
            Resolution::Found(groups) if groups.is_empty() => {
                Err(PipelineError::NoGroups(principal.clone()))
            }
            Resolution::Found(groups) => Ok(groups),
            Resolution::NotFound => Err(PipelineError::UnknownPrincipal(principal.clone())),
            Resolution::Unavailable => Err(PipelineError::MembershipUnavailable(principal.clone())),
        }
    }

    /// Aggregated permissions of an already authenticated principal.
    ///
    /// Unknown principals and principals without groups hold nothing.
    pub async fn permissions_for(
        &self,
        principal: &Principal,
        cache_control: &ClientCacheControl,
        deadline: Instant,
    ) -> Result<AggregatedPermissions, Unauthorized> {
        let lookup = async {
            let groups = self
                .membership
                .resolve_groups(principal, cache_control)
                .await
                .into_value();
            self.aggregator.aggregate(&groups, cache_control).await
        };
        timeout_at(deadline, lookup).await.map_err(|_| {
            warn!("Permission lookup for {} exceeded its deadline", principal);
            Unauthorized
        })
    }
}
