//! # tfchain - ordered terraform stack deployment
//!
//! `tfchain` deploys and destroys a fixed chain of terraform stacks that together make up an
//! Azure data platform: resource group, storage, SQL database, data factory and the linked
//! services, pipelines and data flows living in it.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfchain` works internally.
//!
//! ### Stacks
//!
//! A stack is a terraform root module in its own directory below `terraform/`. The set of stacks
//! and their order is fixed and described by [stack::Stack]. Stacks talk to each other only through
//! terraform outputs: the data factory stack outputs `data_factory_id`, the pipeline stacks read it.
//!
//! | **stack**      | **reads outputs of**                        | **apply**                               |
//! |----------------|---------------------------------------------|-----------------------------------------|
//! | `rg`           |                                             | plain                                   |
//! | `storage`      | `rg`                                        | plain                                   |
//! | `sql`          | `rg`                                        | plain                                   |
//! | `datafactory`  | `rg`                                        | plain                                   |
//! | `adf-links`    | `datafactory`, `storage`, `sql`             | plain                                   |
//! | `adf-*pipeline`| `datafactory`, `adf-links` (or pipelines)   | `-target=azapi_resource.pipeline` first |
//! | `adf-*dataflow`| `datafactory`, `adf-links`                  | `-target=azapi_resource.dataflow` first |
//!
//! ### Variable files
//!
//! terraform takes the inputs of a stack from `terraform.tfvars` in its directory. Before each
//! apply or destroy we write that file ([tfvars]). Files are rewritten completely every time and
//! their content only depends on the resolved values, so running twice with the same inputs
//! produces the same file.
//!
//! ```hcl
//! resource_group_name = "rg-airline-a1b2"
//! location = "eastus2"
//! max_size_gb = 1
//! min_capacity = 0.5
//! ```
//!
//! ### Resolution
//!
//! Each variable is described by a [resolve::Request] ([variables::requests] holds the table). A
//! request carries a chain of strategies that are tried in order:
//!
//! - environment variables (the `.env` file in the repository root is loaded first)
//! - a value persisted in some stack's variable file by an earlier run
//! - the output of another stack, read live through `terraform output` and falling back to the
//!   state file ([outputs])
//! - the signed in Azure CLI user or the public address of this machine ([discovery])
//! - a freshly generated password ([secret])
//! - a static default ([config::Defaults])
//!
//! Because persisted values rank above generated and discovered ones, a password is generated
//! once and read back on every later run.
//!
//! ### Execution
//!
//! [executor::Executor] runs terraform for a stack and remembers which stacks were initialized
//! within the run. [orchestrator::Orchestrator] ties everything together for whole-chain and
//! single-stack deploys and destroys. Every external program is started through
//! [process::CommandRunner], so tests run without terraform or the Azure CLI installed.
//!
pub mod config;
pub mod discovery;
pub mod env;
mod error;
pub mod executor;
pub mod orchestrator;
pub mod outputs;
pub mod process;
pub mod resolve;
pub mod secret;
pub mod sqlcmd;
pub mod stack;
pub mod terraform;
pub mod tfvars;
pub mod value;
pub mod variables;

pub use error::Error;
