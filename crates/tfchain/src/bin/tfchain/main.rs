mod cli;

use anyhow::Context;
use tfchain::config::Config;
use tfchain::discovery::CloudDiscovery;
use tfchain::env::Environment;
use tfchain::orchestrator::{DeployOptions, Orchestrator, Scope};
use tfchain::process::SystemRunner;
use tfchain::stack::{Stack, StackInfo};
use tfchain::tfvars::VariableSet;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("TFCHAIN_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Deploy(deploy_cli) => deploy(cli.defaults, deploy_cli),
        cli::Command::Destroy(destroy_cli) => destroy(cli.defaults, destroy_cli),
        cli::Command::Graph(graph_cli) => graph(graph_cli),
        cli::Command::Vars(vars_cli) => vars(cli.defaults, vars_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(exit_code(&e));
    }
}

/// Exit code of the first library error in the chain
fn exit_code(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|e| e.downcast_ref::<tfchain::Error>())
        .map(tfchain::Error::exit_code)
        .unwrap_or(1)
}

fn load_config(defaults: Option<std::path::PathBuf>) -> anyhow::Result<Config> {
    let root = std::env::current_dir()?;
    let config = Config::load(root, defaults.as_deref())?;
    tracing::debug!(root=%config.root.display(), terraform=%config.terraform_bin, "configuration loaded");
    Ok(config)
}

pub fn deploy(
    defaults: Option<std::path::PathBuf>,
    cli: cli::DeployCommand,
) -> anyhow::Result<()> {
    let mut config = load_config(defaults)?;
    if let Some(script) = cli.sql_script {
        config.sql_script = script;
    }
    let env = Environment::load(&config.env_file());
    let runner = SystemRunner;
    let discovery = CloudDiscovery::new(&runner, &config);

    let scope = cli.only.map_or(Scope::All, Scope::Only);
    let options = DeployOptions {
        sql_init: cli.sql_init,
        skip_sql_init: cli.skip_sql_init,
        ..DeployOptions::new(scope)
    };

    Orchestrator::new(&config, &env, &runner, &discovery)
        .deploy(&options)
        .with_context(|| format!("Deploy of {} failed", describe(scope)))
}

pub fn destroy(
    defaults: Option<std::path::PathBuf>,
    cli: cli::DestroyCommand,
) -> anyhow::Result<()> {
    let config = load_config(defaults)?;
    let env = Environment::load(&config.env_file());
    let runner = SystemRunner;
    let discovery = CloudDiscovery::new(&runner, &config);

    let scope = cli.only.map_or(Scope::All, Scope::Only);
    Orchestrator::new(&config, &env, &runner, &discovery)
        .destroy(scope)
        .with_context(|| format!("Destroy of {} failed", describe(scope)))
}

fn describe(scope: Scope) -> String {
    match scope {
        Scope::All => "all stacks".to_string(),
        Scope::Only(stack) => format!("stack {stack}"),
    }
}

pub fn graph(cli: cli::GraphCommand) -> anyhow::Result<()> {
    let stacks: Vec<StackInfo> = Stack::ALL.into_iter().map(StackInfo::from).collect();
    output(&cli.output, &stacks)
}

pub fn vars(defaults: Option<std::path::PathBuf>, cli: cli::VarsCommand) -> anyhow::Result<()> {
    let config = load_config(defaults)?;
    let variables = stack_variables(&config, cli.stack)?;
    output(&cli.output, &variables)
}

fn stack_variables(config: &Config, stack: Stack) -> anyhow::Result<VariableSet> {
    let path = config.stack_dir(stack).join(tfchain::tfvars::FILE_NAME);

    tfchain::tfvars::read(&path)?.with_context(|| format!("No variable file at {}", path.display()))
}

fn output<T: serde::Serialize>(output: &cli::OutputArgs, value: &T) -> anyhow::Result<()> {
    write_output(std::io::stdout(), &output.format, value)
}

fn write_output<T: serde::Serialize>(
    writer: impl std::io::Write,
    format: &cli::OutputFormat,
    value: &T,
) -> anyhow::Result<()> {
    match format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(writer, value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(writer, value)?,
    };

    Ok(())
}
