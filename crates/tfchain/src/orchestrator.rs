//! deploy and destroy runs
//!
//! Every stack goes through the same steps: resolve its variables, write them to its variable
//! file, then hand the directory to terraform. Whole-chain runs walk [Stack::ALL]; single-stack
//! runs first initialize the stacks whose outputs are needed.
use crate::config::Config;
use crate::discovery::Discover;
use crate::env::Environment;
use crate::executor::Executor;
use crate::outputs::OutputReader;
use crate::process::CommandRunner;
use crate::resolve::{Mode, Resolution, Resolver, Source};
use crate::sqlcmd::{SqlInit, SqlTarget};
use crate::stack::Stack;
use crate::terraform::Terraform;
use crate::tfvars::VariableSet;
use crate::{variables, Error};
use std::path::PathBuf;

/// Which stacks a run covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Only(Stack),
}

impl Scope {
    fn stacks(self) -> Vec<Stack> {
        match self {
            Scope::All => Stack::ALL.to_vec(),
            Scope::Only(stack) => vec![stack],
        }
    }
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub scope: Scope,
    /// Run the database script after the sql stack, even for a single-stack deploy
    pub sql_init: bool,
    /// Don't run the database script on a whole-chain deploy
    pub skip_sql_init: bool,
    /// Use this `sqlcmd` instead of searching for one
    pub sqlcmd: Option<PathBuf>,
}

impl DeployOptions {
    pub fn new(scope: Scope) -> Self {
        Self {
            scope,
            sql_init: false,
            skip_sql_init: false,
            sqlcmd: None,
        }
    }

    pub fn run_sql_init(&self) -> bool {
        self.sql_init || (self.scope == Scope::All && !self.skip_sql_init)
    }
}

pub struct Orchestrator<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
    resolver: Resolver<'a>,
    executor: Executor<'a>,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        config: &'a Config,
        env: &'a Environment,
        runner: &'a dyn CommandRunner,
        discovery: &'a dyn Discover,
    ) -> Self {
        let terraform = Terraform::new(runner, &config.terraform_bin);
        Self {
            config,
            runner,
            resolver: Resolver::new(config, env, OutputReader::new(terraform), discovery),
            executor: Executor::new(config, terraform),
        }
    }

    pub fn executor(&self) -> &Executor<'a> {
        &self.executor
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn deploy(&mut self, options: &DeployOptions) -> Result<(), Error> {
        if let Scope::Only(stack) = options.scope {
            self.init_prerequisites(stack)?;
        }

        for stack in options.scope.stacks() {
            let resolution = self.prepare(stack, Mode::Deploy)?;
            self.executor.apply(stack)?;

            if stack == Stack::Sql && options.run_sql_init() {
                self.sql_init(&resolution.variables, options.sqlcmd.as_deref())?;
            }
        }

        tracing::info!(scope = ?options.scope, "deploy finished");
        Ok(())
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn destroy(&mut self, scope: Scope) -> Result<(), Error> {
        match scope {
            Scope::Only(stack) => {
                self.init_prerequisites(stack)?;
                self.prepare(stack, Mode::Destroy)?;
                self.executor.init(stack)?;
                self.executor.destroy(stack)?;
            }
            Scope::All => {
                for stack in Stack::shared() {
                    self.executor.init(stack)?;
                }

                // nothing is written unless every stack resolves
                let resolved = Stack::ALL
                    .into_iter()
                    .map(|stack| Ok((stack, self.resolve(stack, Mode::Destroy)?)))
                    .collect::<Result<Vec<_>, Error>>()?;
                for (stack, resolution) in &resolved {
                    variables::materialize(self.config, *stack, &resolution.variables)?;
                }

                for stack in Stack::destroy_order() {
                    self.executor.init(stack)?;
                    self.executor.destroy(stack)?;
                }
            }
        }

        tracing::info!(?scope, "destroy finished");
        Ok(())
    }

    fn init_prerequisites(&mut self, stack: Stack) -> Result<(), Error> {
        for prerequisite in stack.prerequisites() {
            self.executor.init(*prerequisite)?;
        }
        Ok(())
    }

    /// Resolve the variables of `stack`, whose directory has to exist
    fn resolve(&self, stack: Stack, mode: Mode) -> Result<Resolution, Error> {
        self.config.existing_stack_dir(stack)?;
        let requests = variables::requests(stack, &self.config.defaults, mode);
        self.resolver.resolve_all(stack, &requests)
    }

    /// Resolve and write the variable file of `stack`
    fn prepare(&self, stack: Stack, mode: Mode) -> Result<Resolution, Error> {
        let resolution = self.resolve(stack, mode)?;
        let path = variables::materialize(self.config, stack, &resolution.variables)?;

        for (key, source) in resolution.fresh() {
            match source {
                Source::Generated(_) => {
                    tracing::info!(%stack, key, path=%path.display(), "generated and stored new value")
                }
                _ => tracing::info!(
                    %stack,
                    key,
                    value = resolution
                        .variables
                        .get(key)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default(),
                    path=%path.display(),
                    "detected and stored value"
                ),
            }
        }

        Ok(resolution)
    }

    fn sql_init(&self, variables: &VariableSet, sqlcmd: Option<&std::path::Path>) -> Result<(), Error> {
        let sql_init = SqlInit::locate(&self.config.sql_script, sqlcmd)?;

        let output = |name: &'static str| {
            self.resolver
                .outputs()
                .read(&self.config.stack_dir(Stack::Sql), name)
                .ok_or(Error::MissingCollaboratorOutput {
                    stack: Stack::Sql,
                    source_stack: Stack::Sql,
                    output: name,
                })
        };
        let variable = |key: &'static str| {
            variables
                .get(key)
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .ok_or(Error::MissingRequiredValue {
                    stack: Stack::Sql,
                    key,
                    hint: String::new(),
                })
        };

        let target = SqlTarget::new(
            output("sql_server_fqdn")?,
            output("sql_database_name")?,
            variable("sql_admin_login")?,
            variable("sql_admin_password")?,
        );
        sql_init.run(self.runner, &target)
    }
}
