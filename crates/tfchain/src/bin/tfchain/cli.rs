//! tfchain cli interface

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;
use tfchain::stack::Stack;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// The final work directory is the repository root
    /// containing `terraform/`, `.env` and `sql_scripts/`.
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    /// HCL file overriding the built-in defaults
    ///
    /// Defaults to `tfchain.hcl` in the work directory if present.
    #[clap(long = "defaults", global(true))]
    pub defaults: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write variable files and apply stacks in dependency order
    Deploy(DeployCommand),

    /// Write variable files and destroy stacks in reverse dependency order
    Destroy(DestroyCommand),

    /// Print the stack table
    Graph(GraphCommand),

    /// Print the variable file of a stack
    Vars(VarsCommand),
}

#[derive(Args, Debug)]
pub struct DeployCommand {
    /// Deploy only this stack
    ///
    /// Stacks it reads outputs from are initialized but not applied.
    #[clap(long = "only", value_name = "STACK")]
    pub only: Option<Stack>,

    /// Run the SQL init script after deploying the sql stack
    #[clap(long = "sql-init", conflicts_with("skip_sql_init"))]
    pub sql_init: bool,

    /// Skip the SQL init script on a full deploy
    #[clap(long = "skip-sql-init")]
    pub skip_sql_init: bool,

    /// SQL init script
    ///
    /// Defaults to `sql_scripts/fact_bookings_full.sql` in the work directory.
    #[clap(long = "sql-script")]
    pub sql_script: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DestroyCommand {
    /// Destroy only this stack
    #[clap(long = "only", value_name = "STACK")]
    pub only: Option<Stack>,
}

#[derive(Args, Debug)]
pub struct GraphCommand {
    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct VarsCommand {
    pub stack: Stack,

    #[clap(flatten)]
    pub output: OutputArgs,
}

#[derive(Args, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    Json,
    #[default]
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn sql_init_flags_conflict() {
        let result = Cli::try_parse_from(["tfchain", "deploy", "--sql-init", "--skip-sql-init"]);
        assert!(result.is_err());
    }

    #[test]
    fn only_takes_stack_ids() {
        let cli = Cli::try_parse_from(["tfchain", "-C", "repo", "destroy", "--only", "adf-links"])
            .unwrap();
        match cli.command {
            Command::Destroy(destroy) => assert_eq!(destroy.only, Some(Stack::AdfLinks)),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["tfchain", "deploy", "--only", "links"]).is_err());
    }
}
