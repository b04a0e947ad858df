use super::{
    validate_resource, ApiContext, Decision, Effect, HttpVerb, PolicyDocument, PolicyError,
    Statement, POLICY_VERSION,
};

/// Immutable builder for gateway decisions.
///
/// Each method consumes the builder and returns a new one, so a partially
/// built policy is never shared between callers.
#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    principal_id: String,
    context: ApiContext,
    allow: Vec<String>,
    deny: Vec<String>,
}

impl PolicyBuilder {
    pub fn new<S: Into<String>>(principal_id: S, context: ApiContext) -> Self {
        Self {
            principal_id: principal_id.into(),
            context,
            allow: Vec::new(),
            deny: Vec::new(),
        }
    }

    pub fn allow_method(self, verb: HttpVerb, resource: &str) -> Result<Self, PolicyError> {
        self.add_method(Effect::Allow, verb, resource)
    }

    // Decisions only grant; explicit denies are built by tests
    #[cfg_attr(not(test), allow(dead_code))]
    pub fn deny_method(self, verb: HttpVerb, resource: &str) -> Result<Self, PolicyError> {
        self.add_method(Effect::Deny, verb, resource)
    }

    fn add_method(
        mut self,
        effect: Effect,
        verb: HttpVerb,
        resource: &str,
    ) -> Result<Self, PolicyError> {
        validate_resource(resource)?;
        let arn = self.context.resource_arn(verb.as_str(), resource);
        let target = match effect {
            Effect::Allow => &mut self.allow,
            Effect::Deny => &mut self.deny,
        };
        if !target.contains(&arn) {
            target.push(arn);
        }
        Ok(self)
    }

    /// Group collected methods into one Allow then one Deny statement
    pub fn build(self) -> Result<Decision, PolicyError> {
        if self.allow.is_empty() && self.deny.is_empty() {
            return Err(PolicyError::NoStatements);
        }

        let statement = [(Effect::Allow, self.allow), (Effect::Deny, self.deny)]
            .into_iter()
            .filter(|(_, resources)| !resources.is_empty())
            .map(|(effect, resource)| Statement {
                action: "invoke".to_string(),
                effect,
                resource,
            })
            .collect();

        Ok(Decision {
            principal_id: self.principal_id,
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement,
            },
        })
    }
}
