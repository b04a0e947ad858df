use super::PolicyError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Gateway deployment a decision applies to.
///
/// Parsed from the method ARN of the incoming request:
/// `arn:aws:execute-api:{region}:{account_id}:{api_id}/{stage}/{verb}/{path}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ApiContext {
    pub region: String,
    pub account_id: String,
    pub api_id: String,
    pub stage: String,
}

impl ApiContext {
    pub fn from_method_arn(method_arn: &str) -> Result<Self, PolicyError> {
        let invalid = || PolicyError::InvalidContext(method_arn.to_string());

        let parts: Vec<&str> = method_arn.splitn(6, ':').collect();
        let [arn, partition, service, region, account_id, api_path] = parts[..] else {
            return Err(invalid());
        };
        if arn != "arn" || partition.is_empty() || service != "execute-api" {
            return Err(invalid());
        }

        let mut api_path = api_path.splitn(3, '/');
        let api_id = api_path.next().unwrap_or_default();
        let stage = api_path.next().unwrap_or_default();

        let context = Self {
            region: region.to_string(),
            account_id: account_id.to_string(),
            api_id: api_id.to_string(),
            stage: stage.to_string(),
        };
        if [&context.region, &context.account_id, &context.api_id, &context.stage]
            .iter()
            .any(|part| part.is_empty())
        {
            return Err(invalid());
        }
        Ok(context)
    }

    /// Identifier the gateway matches statements against
    pub fn resource_arn(&self, verb: &str, path: &str) -> String {
        format!(
            "arn:aws:execute-api:{}:{}:{}/{}/{}/{}",
            self.region,
            self.account_id,
            self.api_id,
            self.stage,
            verb,
            path.trim_start_matches('/')
        )
    }
}
