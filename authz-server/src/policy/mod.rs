//! Decision construction for the API gateway.
//!
//! Aggregated permissions are turned into gateway verbs and resource ARNs and
//! collected into a [`Decision`] by the immutable [`PolicyBuilder`].

use crate::models::{Action, AggregatedPermissions, Principal};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

pub mod builder;
pub mod context;

pub use builder::PolicyBuilder;
pub use context::ApiContext;

/// Version string the gateway expects in every policy document
pub const POLICY_VERSION: &str = "2012-10-17";

static RESOURCE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._\-/*]+$").expect("resource path pattern is a valid regex")
});

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Invalid verb or action: {0}")]
    InvalidVerb(String),
    #[error("Invalid resource path: {0:?}")]
    InvalidResource(String),
    #[error("Policy has no statements")]
    NoStatements,
    #[error("Invalid method ARN: {0:?}")]
    InvalidContext(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Effect {
    Allow,
    Deny,
}

/// HTTP verb a domain action maps to in a resource ARN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gateway verbs a domain action grants
pub fn verbs_for(action: Action) -> &'static [HttpVerb] {
    match action {
        Action::Read => &[HttpVerb::Get],
        Action::Write => &[HttpVerb::Post, HttpVerb::Put],
        Action::Delete => &[HttpVerb::Delete],
        Action::Admin => &[HttpVerb::Get, HttpVerb::Post, HttpVerb::Put, HttpVerb::Delete],
    }
}

pub fn validate_resource(resource: &str) -> Result<(), PolicyError> {
    if RESOURCE_PATH.is_match(resource) {
        Ok(())
    } else {
        Err(PolicyError::InvalidResource(resource.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Statement {
    /// Always `invoke`
    pub action: String,
    pub effect: Effect,
    pub resource: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

/// Allow/deny decision handed back to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

impl Decision {
    /// Statements with the given effect
    pub fn statements(&self, effect: Effect) -> impl Iterator<Item = &Statement> {
        self.policy_document
            .statement
            .iter()
            .filter(move |statement| statement.effect == effect)
    }

    /// Every resource ARN allowed by this decision
    pub fn allowed_resources(&self) -> Vec<&str> {
        self.statements(Effect::Allow)
            .flat_map(|statement| statement.resource.iter().map(String::as_str))
            .collect()
    }
}

/// Build the gateway decision for a principal's aggregated permissions.
///
/// Every resource path is validated and every action name must be known;
/// an input that yields no statement at all is rejected.
pub fn build(
    principal: &Principal,
    permissions: &AggregatedPermissions,
    context: &ApiContext,
) -> Result<Decision, PolicyError> {
    let mut builder = PolicyBuilder::new(principal.as_str(), context.clone());

    for (resource, actions) in permissions {
        validate_resource(resource)?;
        for action in actions {
            let action = action
                .parse::<Action>()
                .map_err(|_| PolicyError::InvalidVerb(action.clone()))?;
            for verb in verbs_for(action) {
                builder = builder.allow_method(*verb, resource)?;
            }
        }
    }

    let decision = builder.build()?;
    debug!(
        "Built decision for {} with {} allowed resources",
        principal,
        decision.allowed_resources().len()
    );
    Ok(decision)
}
