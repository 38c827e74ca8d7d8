//! runs terraform against stack directories
use crate::config::Config;
use crate::stack::{ApplyKind, Stack};
use crate::terraform::Terraform;
use crate::Error;
use std::collections::HashMap;
use std::path::PathBuf;

/// Where a stack is within the current run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StackState {
    #[default]
    Undefined,
    Initialized,
    Applied,
    Destroyed,
}

pub struct Executor<'a> {
    config: &'a Config,
    terraform: Terraform<'a>,
    states: HashMap<Stack, StackState>,
}

impl<'a> Executor<'a> {
    pub fn new(config: &'a Config, terraform: Terraform<'a>) -> Self {
        Self {
            config,
            terraform,
            states: HashMap::new(),
        }
    }

    pub fn state(&self, stack: Stack) -> StackState {
        self.states.get(&stack).copied().unwrap_or_default()
    }

    fn dir(&self, stack: Stack) -> Result<PathBuf, Error> {
        self.config.existing_stack_dir(stack)
    }

    /// `terraform init`, at most once per stack and run
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn init(&mut self, stack: Stack) -> Result<(), Error> {
        if self.state(stack) != StackState::Undefined {
            return Ok(());
        }

        let dir = self.dir(stack)?;
        tracing::info!(%stack, "initializing");
        self.terraform.init(&dir)?;
        self.states.insert(stack, StackState::Initialized);
        Ok(())
    }

    /// Initialize if needed, then apply according to the stack's [ApplyKind]
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn apply(&mut self, stack: Stack) -> Result<(), Error> {
        self.init(stack)?;
        let dir = self.dir(stack)?;

        tracing::info!(%stack, "applying");
        if let ApplyKind::TwoPhase { target } = stack.apply_kind() {
            self.terraform.apply(&dir, Some(target))?;
        }
        self.terraform.apply(&dir, None)?;

        self.states.insert(stack, StackState::Applied);
        Ok(())
    }

    /// `terraform destroy`, relying on the stack having been initialized earlier
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, stack: Stack) -> Result<(), Error> {
        let dir = self.dir(stack)?;

        tracing::info!(%stack, "destroying");
        self.terraform.destroy(&dir)?;

        self.states.insert(stack, StackState::Destroyed);
        Ok(())
    }
}
