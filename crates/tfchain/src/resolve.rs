//! value resolution
//!
//! Every variable of a stack is described by a [Request]: the key, an ordered chain of
//! [Strategy]s and what to do when the chain yields nothing ([Presence]). The chain is walked
//! front to back and the first strategy producing a value wins.
//!
//! Chains are written in precedence order:
//!
//! 1. environment variables, so operators can pin any value
//! 2. values persisted in a stack's variable file by an earlier run
//! 3. outputs of other stacks and values discovered from the cloud CLI or the network
//! 4. generated values (only where a fresh value is acceptable, e.g. a first-time password)
//! 5. static defaults
//!
//! Persisted values come before discovery and generation, so a password or client address is
//! only produced once and every later run reads it back.
use crate::config::Config;
use crate::discovery::{Discover, SignedInUser};
use crate::env::Environment;
use crate::outputs::OutputReader;
use crate::stack::Stack;
use crate::tfvars::{self, VariableSet};
use crate::value::Value;
use crate::Error;
use std::cell::OnceCell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Deploy,
    Destroy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    SignedInUserLogin,
    SignedInUserObjectId,
    PublicIp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generator {
    Password,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// First non-empty variable out of the list
    Env(&'static [&'static str]),
    /// Key in a stack's existing variable file
    Persisted { stack: Stack, key: &'static str },
    /// Output of another stack
    Output { stack: Stack, name: &'static str },
    Discover(Discovery),
    Generate(Generator),
    Default(Value),
}

/// What happens when no strategy yields a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Resolution fails
    Required,
    /// The variable is written as `null`
    Nullable,
    /// The variable is left out of the file
    Omit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub key: &'static str,
    pub chain: Vec<Strategy>,
    pub presence: Presence,
}

impl Request {
    pub fn required(key: &'static str) -> Self {
        Self::new(key, Presence::Required)
    }

    pub fn nullable(key: &'static str) -> Self {
        Self::new(key, Presence::Nullable)
    }

    pub fn omit_if_absent(key: &'static str) -> Self {
        Self::new(key, Presence::Omit)
    }

    fn new(key: &'static str, presence: Presence) -> Self {
        Self {
            key,
            chain: vec![],
            presence,
        }
    }

    /// A fixed value
    pub fn fixed(key: &'static str, value: impl Into<Value>) -> Self {
        Self::required(key).default(value)
    }

    pub fn env(mut self, names: &'static [&'static str]) -> Self {
        self.chain.push(Strategy::Env(names));
        self
    }

    pub fn persisted(mut self, stack: Stack, key: &'static str) -> Self {
        self.chain.push(Strategy::Persisted { stack, key });
        self
    }

    pub fn output(mut self, stack: Stack, name: &'static str) -> Self {
        self.chain.push(Strategy::Output { stack, name });
        self
    }

    pub fn discover(mut self, discovery: Discovery) -> Self {
        self.chain.push(Strategy::Discover(discovery));
        self
    }

    pub fn generate(mut self, generator: Generator) -> Self {
        self.chain.push(Strategy::Generate(generator));
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.chain.push(Strategy::Default(value.into()));
        self
    }

    /// Error for a required request whose chain came up empty
    fn missing(&self, stack: Stack) -> Error {
        let outputs_only = self
            .chain
            .iter()
            .all(|s| matches!(s, Strategy::Env(_) | Strategy::Output { .. }));
        let first_output = self.chain.iter().find_map(|s| match s {
            Strategy::Output { stack, name } => Some((*stack, *name)),
            _ => None,
        });

        if let (true, Some((source_stack, output))) = (outputs_only, first_output) {
            return Error::MissingCollaboratorOutput {
                stack,
                source_stack,
                output,
            };
        }

        let sources: Vec<String> = self
            .chain
            .iter()
            .filter_map(|s| match s {
                Strategy::Env(names) => Some(format!("set {}", names.join(" or "))),
                Strategy::Persisted { stack: owner, .. } if *owner == stack => None,
                Strategy::Persisted { stack: owner, .. } => Some(format!("deploy {owner}")),
                Strategy::Output { stack, name } => Some(format!("deploy {stack} (output {name})")),
                Strategy::Discover(Discovery::PublicIp) => None,
                Strategy::Discover(_) => Some("sign in with `az login`".to_string()),
                _ => None,
            })
            .collect();

        Error::MissingRequiredValue {
            stack,
            key: self.key,
            hint: match sources.as_slice() {
                [] => String::new(),
                [only] => format!("To provide it, {only}."),
                _ => format!("Either {}.", sources.join(" or ")),
            },
        }
    }
}

/// Where a resolved value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Env(&'static str),
    Persisted(Stack),
    Output(Stack),
    Discovered(Discovery),
    Generated(Generator),
    Default,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub value: Value,
    pub source: Source,
}

/// Variables of one stack together with where each came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub variables: VariableSet,
    pub sources: Vec<(&'static str, Source)>,
}

impl Resolution {
    /// Keys whose value was produced in this run and must be persisted before use
    pub fn fresh(&self) -> impl Iterator<Item = (&'static str, Source)> + '_ {
        self.sources.iter().copied().filter(|(_, source)| {
            matches!(
                source,
                Source::Generated(_) | Source::Discovered(Discovery::PublicIp)
            )
        })
    }
}

pub struct Resolver<'a> {
    config: &'a Config,
    env: &'a Environment,
    outputs: OutputReader<'a>,
    discovery: &'a dyn Discover,
    signed_in_user: OnceCell<SignedInUser>,
}

impl<'a> Resolver<'a> {
    pub fn new(
        config: &'a Config,
        env: &'a Environment,
        outputs: OutputReader<'a>,
        discovery: &'a dyn Discover,
    ) -> Self {
        Self {
            config,
            env,
            outputs,
            discovery,
            signed_in_user: OnceCell::new(),
        }
    }

    pub fn outputs(&self) -> &OutputReader<'a> {
        &self.outputs
    }

    /// Resolve every request; nothing is returned unless all of them succeed
    #[tracing::instrument(level = "debug", skip(self, requests))]
    pub fn resolve_all(&self, stack: Stack, requests: &[Request]) -> Result<Resolution, Error> {
        let mut resolution = Resolution::default();

        for request in requests {
            match self.resolve(stack, request)? {
                Some(resolved) => {
                    resolution.variables.insert(request.key, resolved.value);
                    resolution.sources.push((request.key, resolved.source));
                }
                None if request.presence == Presence::Nullable => {
                    resolution.variables.insert(request.key, Value::Null);
                }
                None => {}
            }
        }

        Ok(resolution)
    }

    /// Walk the chain of `request`
    ///
    /// Returns `None` only for requests that are not [Presence::Required].
    pub fn resolve(&self, stack: Stack, request: &Request) -> Result<Option<Resolved>, Error> {
        for strategy in &request.chain {
            if let Some(resolved) = self.attempt(strategy)? {
                tracing::debug!(%stack, key = request.key, source = ?resolved.source, "resolved");
                return Ok(Some(resolved));
            }
            tracing::trace!(%stack, key = request.key, ?strategy, "no value");
        }

        match request.presence {
            Presence::Required => Err(request.missing(stack)),
            Presence::Nullable | Presence::Omit => Ok(None),
        }
    }

    fn attempt(&self, strategy: &Strategy) -> Result<Option<Resolved>, Error> {
        let resolved = |value: Value, source| Resolved { value, source };

        Ok(match strategy {
            Strategy::Env(names) => self
                .env
                .first_of(names)
                .map(|(name, value)| resolved(value.into(), Source::Env(name))),
            Strategy::Persisted { stack, key } => self
                .persisted(*stack, key)?
                .map(|value| resolved(value, Source::Persisted(*stack))),
            Strategy::Output { stack, name } => self
                .outputs
                .read(&self.config.stack_dir(*stack), name)
                .map(|value| resolved(value.into(), Source::Output(*stack))),
            Strategy::Discover(discovery) => self
                .discover(*discovery)
                .map(|value| resolved(value.into(), Source::Discovered(*discovery))),
            Strategy::Generate(generator) => {
                let value = match generator {
                    Generator::Password => crate::secret::generate_password(),
                };
                Some(resolved(value.into(), Source::Generated(*generator)))
            }
            Strategy::Default(value) => Some(resolved(value.clone(), Source::Default)),
        })
    }

    fn persisted(&self, stack: Stack, key: &str) -> Result<Option<Value>, Error> {
        let path = self.config.stack_dir(stack).join(tfvars::FILE_NAME);
        let Some(variables) = tfvars::read(&path)? else {
            return Ok(None);
        };

        Ok(variables.get(key).cloned().filter(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.is_empty(),
            _ => true,
        }))
    }

    fn discover(&self, discovery: Discovery) -> Option<String> {
        match discovery {
            Discovery::SignedInUserLogin => self.signed_in_user().login.clone(),
            Discovery::SignedInUserObjectId => self.signed_in_user().object_id.clone(),
            Discovery::PublicIp => self.discovery.public_ip(),
        }
    }

    fn signed_in_user(&self) -> &SignedInUser {
        self.signed_in_user
            .get_or_init(|| self.discovery.signed_in_user())
    }
}
