//! the stack dependency graph
//!
//! Stacks form a fixed chain. [Stack::ALL] lists them in deploy order; destroy walks the same
//! list backwards. Each stack knows which stacks it reads outputs from ([Stack::prerequisites])
//! so those can be initialized before its variables are resolved.
use serde::Serialize;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum, Serialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stack {
    /// Resource group
    Rg,
    /// Storage account (ADLS Gen2)
    Storage,
    /// SQL server and database
    Sql,
    /// Data factory
    #[value(name = "datafactory")]
    #[serde(rename = "datafactory")]
    DataFactory,
    /// Linked services for HTTP, ADLS and SQL
    AdfLinks,
    /// HTTP copy pipeline
    AdfPipeline,
    /// Airport JSON pipeline
    AdfAirportPipeline,
    /// Incremental bookings pipeline
    AdfBookingsPipeline,
    /// Bronze to silver data flow
    AdfDataflow,
    /// Pipeline running the silver data flow
    AdfSilverPipeline,
    /// Gold sales data flow
    AdfGoldDataflow,
    /// Master pipeline orchestrating all other pipelines
    AdfMasterPipeline,
}

/// How a stack is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyKind {
    /// Single full apply
    Plain,
    /// Targeted apply of the core resource, then a full apply
    ///
    /// The orchestration service needs the pipeline or data flow to exist before the rest of the
    /// configuration can attach to it.
    TwoPhase { target: &'static str },
}

impl Stack {
    /// Deploy order
    pub const ALL: [Stack; 12] = [
        Stack::Rg,
        Stack::Storage,
        Stack::Sql,
        Stack::DataFactory,
        Stack::AdfLinks,
        Stack::AdfPipeline,
        Stack::AdfAirportPipeline,
        Stack::AdfBookingsPipeline,
        Stack::AdfDataflow,
        Stack::AdfSilverPipeline,
        Stack::AdfGoldDataflow,
        Stack::AdfMasterPipeline,
    ];

    /// Destroy order
    pub fn destroy_order() -> impl Iterator<Item = Stack> {
        Self::ALL.into_iter().rev()
    }

    pub fn id(self) -> &'static str {
        match self {
            Stack::Rg => "rg",
            Stack::Storage => "storage",
            Stack::Sql => "sql",
            Stack::DataFactory => "datafactory",
            Stack::AdfLinks => "adf-links",
            Stack::AdfPipeline => "adf-pipeline",
            Stack::AdfAirportPipeline => "adf-airport-pipeline",
            Stack::AdfBookingsPipeline => "adf-bookings-pipeline",
            Stack::AdfDataflow => "adf-dataflow",
            Stack::AdfSilverPipeline => "adf-silver-pipeline",
            Stack::AdfGoldDataflow => "adf-gold-dataflow",
            Stack::AdfMasterPipeline => "adf-master-pipeline",
        }
    }

    /// Directory below `terraform/`
    pub fn directory(self) -> &'static str {
        match self {
            Stack::Rg => "01_resource_group",
            Stack::Storage => "02_storage_account",
            Stack::DataFactory => "03_data_factory",
            Stack::AdfLinks => "04_adf_linked_services",
            Stack::AdfPipeline => "05_adf_pipeline_http",
            Stack::AdfAirportPipeline => "06_adf_pipeline_airport_json",
            Stack::Sql => "07_sql_database",
            Stack::AdfBookingsPipeline => "08_adf_pipeline_fact_bookings_incremental",
            Stack::AdfMasterPipeline => "09_adf_pipeline_master",
            Stack::AdfDataflow => "10_adf_dataflow_bronze_silver",
            Stack::AdfSilverPipeline => "11_adf_pipeline_silver_dataflow",
            Stack::AdfGoldDataflow => "12_adf_dataflow_gold_sales",
        }
    }

    pub fn apply_kind(self) -> ApplyKind {
        match self {
            Stack::AdfPipeline
            | Stack::AdfAirportPipeline
            | Stack::AdfBookingsPipeline
            | Stack::AdfSilverPipeline
            | Stack::AdfMasterPipeline => ApplyKind::TwoPhase {
                target: "azapi_resource.pipeline",
            },
            Stack::AdfDataflow | Stack::AdfGoldDataflow => ApplyKind::TwoPhase {
                target: "azapi_resource.dataflow",
            },
            _ => ApplyKind::Plain,
        }
    }

    /// Stacks whose outputs this stack's variables are built from
    pub fn prerequisites(self) -> &'static [Stack] {
        use Stack::*;
        match self {
            Rg => &[],
            Storage | Sql | DataFactory => &[Rg],
            AdfLinks => &[DataFactory, Storage, Sql],
            AdfPipeline | AdfAirportPipeline | AdfBookingsPipeline | AdfDataflow
            | AdfGoldDataflow => &[DataFactory, AdfLinks],
            AdfSilverPipeline => &[DataFactory, AdfDataflow],
            AdfMasterPipeline => &[
                DataFactory,
                AdfPipeline,
                AdfAirportPipeline,
                AdfBookingsPipeline,
                AdfSilverPipeline,
            ],
        }
    }

    /// Outputs other stacks read from this one
    pub fn outputs(self) -> &'static [&'static str] {
        match self {
            Stack::Rg => &["resource_group_name"],
            Stack::Storage => &["primary_dfs_endpoint", "storage_account_primary_access_key"],
            Stack::Sql => &["sql_server_fqdn", "sql_database_name"],
            Stack::DataFactory => &["data_factory_id"],
            Stack::AdfLinks => &[
                "http_linked_service_name",
                "adls_linked_service_name",
                "sql_linked_service_name",
            ],
            Stack::AdfDataflow | Stack::AdfGoldDataflow => &["dataflow_name"],
            Stack::AdfPipeline
            | Stack::AdfAirportPipeline
            | Stack::AdfBookingsPipeline
            | Stack::AdfSilverPipeline
            | Stack::AdfMasterPipeline => &["pipeline_name"],
        }
    }

    /// Every stack that some other stack reads outputs from, in deploy order
    pub fn shared() -> impl Iterator<Item = Stack> {
        Self::ALL
            .into_iter()
            .filter(|candidate| Self::ALL.iter().any(|s| s.prerequisites().contains(candidate)))
    }
}

impl std::fmt::Display for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Row of the stack table as printed by `tfchain graph`
#[derive(Debug, Serialize)]
pub struct StackInfo {
    pub stack: Stack,
    pub directory: &'static str,
    pub apply: ApplyKind,
    pub prerequisites: &'static [Stack],
    pub outputs: &'static [&'static str],
}

impl From<Stack> for StackInfo {
    fn from(stack: Stack) -> Self {
        Self {
            stack,
            directory: stack.directory(),
            apply: stack.apply_kind(),
            prerequisites: stack.prerequisites(),
            outputs: stack.outputs(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::ValueEnum;
    use pretty_assertions::assert_eq;

    fn position(stack: Stack) -> usize {
        Stack::ALL.iter().position(|s| *s == stack).unwrap()
    }

    #[test]
    fn prerequisites_come_first() {
        for stack in Stack::ALL {
            for prerequisite in stack.prerequisites() {
                assert!(
                    position(*prerequisite) < position(stack),
                    "{prerequisite} must be deployed before {stack}"
                );
            }
        }
    }

    #[test]
    fn destroy_is_reverse_of_deploy() {
        let mut destroy: Vec<_> = Stack::destroy_order().collect();
        destroy.reverse();
        assert_eq!(destroy, Stack::ALL.to_vec());
        assert_eq!(Stack::destroy_order().next(), Some(Stack::AdfMasterPipeline));
        assert_eq!(Stack::destroy_order().last(), Some(Stack::Rg));
    }

    #[test]
    fn ids_match_cli_names() {
        for stack in Stack::ALL {
            assert_eq!(Stack::from_str(stack.id(), false), Ok(stack));
        }
    }

    #[test]
    fn directories_are_unique() {
        let mut dirs: Vec<_> = Stack::ALL.iter().map(|s| s.directory()).collect();
        dirs.sort();
        dirs.dedup();
        assert_eq!(dirs.len(), Stack::ALL.len());
    }

    #[test]
    fn shared_stacks() {
        let shared: Vec<_> = Stack::shared().collect();
        assert_eq!(
            shared,
            vec![
                Stack::Rg,
                Stack::Storage,
                Stack::Sql,
                Stack::DataFactory,
                Stack::AdfLinks,
                Stack::AdfPipeline,
                Stack::AdfAirportPipeline,
                Stack::AdfBookingsPipeline,
                Stack::AdfDataflow,
                Stack::AdfSilverPipeline,
            ]
        );
    }

    #[test]
    fn two_phase_targets() {
        assert_eq!(
            Stack::AdfGoldDataflow.apply_kind(),
            ApplyKind::TwoPhase {
                target: "azapi_resource.dataflow"
            }
        );
        assert_eq!(Stack::Sql.apply_kind(), ApplyKind::Plain);
    }
}
