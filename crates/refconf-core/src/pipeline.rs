//! Resolution pipeline
//!
//! A [`Resolver`] runs an ordered list of [`Stage`]s. Each stage consumes
//! the context produced by the previous one and returns a new context, so no
//! stage observes another stage's half-finished work. The standard order is:
//!
//! 1. secret validation (`$secret{}`, no rewriting)
//! 2. system properties (`$sys{}`)
//! 3. environment variables (`$env{}`)
//! 4. internal references (`$ref{}`)

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Result;
use crate::placeholder::PlaceholderKind;
use crate::references;
use crate::secrets::{self, SecretPolicy, SecretStore};
use crate::source::{Environment, PropertySource, SystemProperties};
use crate::substitute;

/// Per-call state shared by the stages of one resolution
pub struct ResolutionState<'a> {
    /// Secret store consulted by the secret stage
    pub secrets: &'a dyn SecretStore,
    /// Set when at least one valid `$secret{}` placeholder was seen
    pub secret_vault_enabled: bool,
}

impl<'a> ResolutionState<'a> {
    /// Create the state for one resolution call
    pub fn new(secrets: &'a dyn SecretStore) -> Self {
        Self {
            secrets,
            secret_vault_enabled: false,
        }
    }
}

/// A single transform of the pipeline
pub trait Stage: Send + Sync {
    /// Apply the stage, returning the transformed context
    fn apply(&self, context: Context, state: &mut ResolutionState<'_>) -> Result<Context>;

    /// Get the name of this stage
    fn name(&self) -> &str;
}

/// Validates `$secret{}` placeholders and records the secret-vault signal
#[derive(Debug, Clone, Default)]
pub struct SecretStage {
    policy: SecretPolicy,
}

impl SecretStage {
    /// Create a secret stage with the given policy
    pub fn new(policy: SecretPolicy) -> Self {
        Self { policy }
    }
}

impl Stage for SecretStage {
    fn apply(&self, context: Context, state: &mut ResolutionState<'_>) -> Result<Context> {
        state.secret_vault_enabled =
            secrets::validate_secrets(&context, state.secrets, &self.policy)?;
        Ok(context)
    }

    fn name(&self) -> &str {
        "secret"
    }
}

/// Substitutes `$sys{}` or `$env{}` placeholders from a property source
pub struct SubstituteStage {
    kind: PlaceholderKind,
    source: Arc<dyn PropertySource>,
}

impl SubstituteStage {
    /// Create a substitution stage for `kind` backed by `source`
    pub fn new(kind: PlaceholderKind, source: Arc<dyn PropertySource>) -> Self {
        Self { kind, source }
    }

    /// `$sys{}` stage reading the process-wide system property table
    pub fn system_properties() -> Self {
        Self::new(PlaceholderKind::Sys, Arc::new(SystemProperties))
    }

    /// `$env{}` stage reading the process environment
    pub fn environment() -> Self {
        Self::new(PlaceholderKind::Env, Arc::new(Environment))
    }
}

impl Stage for SubstituteStage {
    fn apply(&self, context: Context, _state: &mut ResolutionState<'_>) -> Result<Context> {
        substitute::substitute(context, self.kind, self.source.as_ref())
    }

    fn name(&self) -> &str {
        self.kind.name()
    }
}

/// Resolves `$ref{}` placeholders between keys
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceStage;

impl Stage for ReferenceStage {
    fn apply(&self, context: Context, _state: &mut ResolutionState<'_>) -> Result<Context> {
        references::resolve_references(context)
    }

    fn name(&self) -> &str {
        "ref"
    }
}

/// Options for building a standard resolver
#[derive(Clone, Default)]
pub struct ResolverOptions {
    /// Policy for looked-up secrets
    pub secret_policy: SecretPolicy,
    /// Source for `$sys{}` (defaults to the process-wide table)
    pub system_properties: Option<Arc<dyn PropertySource>>,
    /// Source for `$env{}` (defaults to the process environment)
    pub environment: Option<Arc<dyn PropertySource>>,
}

impl ResolverOptions {
    /// Set whether plain-text `[...]` secrets are rejected
    pub fn with_require_encrypted_secrets(mut self, required: bool) -> Self {
        self.secret_policy.require_encrypted = required;
        self
    }

    /// Use a custom source for `$sys{}` placeholders
    pub fn with_system_properties(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.system_properties = Some(source);
        self
    }

    /// Use a custom source for `$env{}` placeholders
    pub fn with_environment(mut self, source: Arc<dyn PropertySource>) -> Self {
        self.environment = Some(source);
        self
    }
}

impl fmt::Debug for ResolverOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverOptions")
            .field("secret_policy", &self.secret_policy)
            .field(
                "system_properties",
                &self.system_properties.as_ref().map(|s| s.name().to_string()),
            )
            .field(
                "environment",
                &self.environment.as_ref().map(|s| s.name().to_string()),
            )
            .finish()
    }
}

/// Result of a successful resolution
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The resolved context (`$secret{}` placeholders left in place)
    pub context: Context,
    /// Whether any valid `$secret{}` placeholder was present
    pub secret_vault_enabled: bool,
}

/// Ordered pipeline of resolution stages
pub struct Resolver {
    stages: Vec<Box<dyn Stage>>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver {
    /// Create a resolver with the standard stages and default options
    pub fn new() -> Self {
        Self::with_options(ResolverOptions::default())
    }

    /// Create a resolver with the standard stages
    pub fn with_options(options: ResolverOptions) -> Self {
        let system_properties = options
            .system_properties
            .unwrap_or_else(|| Arc::new(SystemProperties));
        let environment = options
            .environment
            .unwrap_or_else(|| Arc::new(Environment));

        Self::empty()
            .with_stage(SecretStage::new(options.secret_policy))
            .with_stage(SubstituteStage::new(PlaceholderKind::Sys, system_properties))
            .with_stage(SubstituteStage::new(PlaceholderKind::Env, environment))
            .with_stage(ReferenceStage)
    }

    /// Create a resolver with no stages
    pub fn empty() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append a stage to the pipeline
    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Names of the stages, in execution order
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage over an owned context
    pub fn run(&self, context: Context, secrets: &dyn SecretStore) -> Result<Resolution> {
        let mut state = ResolutionState::new(secrets);
        let mut context = context;

        for stage in &self.stages {
            log::trace!("Running '{}' stage over {} key(s)", stage.name(), context.len());
            context = stage.apply(context, &mut state)?;
        }

        Ok(Resolution {
            context,
            secret_vault_enabled: state.secret_vault_enabled,
        })
    }

    /// Resolve a snapshot of the context, leaving the caller's copy untouched
    pub fn resolve(&self, context: &Context, secrets: &dyn SecretStore) -> Result<Resolution> {
        self.run(context.clone(), secrets)
    }

    /// Resolve the context in place, returning the secret-vault signal
    ///
    /// On error the context is left exactly as it was.
    pub fn resolve_in_place(
        &self,
        context: &mut Context,
        secrets: &dyn SecretStore,
    ) -> Result<bool> {
        let resolution = self.resolve(context, secrets)?;
        *context = resolution.context;
        Ok(resolution.secret_vault_enabled)
    }
}

/// Resolve the context in place with the standard stages and default options
pub fn resolve(context: &mut Context, secrets: &dyn SecretStore) -> Result<bool> {
    Resolver::new().resolve_in_place(context, secrets)
}
