//! run configuration
//!
//! [Config] is built once per invocation and handed to everything that needs it. The static
//! values that end up in variable files live in [Defaults]; any of them can be overridden from an
//! HCL file:
//!
//! ```hcl
//! location = "westeurope"
//! sql_database_name = "airline-prod"
//! sql_min_capacity = 1.0
//! ```
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File picked up from the repository root when no `--defaults` file is given
pub const DEFAULTS_FILE_NAME: &str = "tfchain.hcl";

#[derive(Debug, Clone)]
pub struct Config {
    /// Repository root: contains `terraform/`, `.env` and `sql_scripts/`
    pub root: PathBuf,
    /// Parent directory of all stack directories
    pub terraform_dir: PathBuf,
    /// Script executed against the database after the SQL stack is applied
    pub sql_script: PathBuf,
    /// Provisioner executable
    pub terraform_bin: String,
    pub ip_lookup_url: String,
    pub ip_lookup_timeout: Duration,
    pub defaults: Defaults,
}

impl Config {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            terraform_dir: root.join("terraform"),
            sql_script: root.join("sql_scripts").join("fact_bookings_full.sql"),
            terraform_bin: "terraform".to_string(),
            ip_lookup_url: "https://api.ipify.org".to_string(),
            ip_lookup_timeout: Duration::from_secs(10),
            defaults: Defaults::default(),
            root,
        }
    }

    /// Build the configuration for a repository root
    ///
    /// Defaults are read from `defaults_file` when given, otherwise from [DEFAULTS_FILE_NAME] in
    /// the root if it exists.
    pub fn load(root: impl Into<PathBuf>, defaults_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::new(root);

        let implicit = config.root.join(DEFAULTS_FILE_NAME);
        let defaults_file = match defaults_file {
            Some(path) => Some(path.to_owned()),
            None if implicit.is_file() => Some(implicit),
            None => None,
        };

        if let Some(path) = defaults_file {
            tracing::info!(path=%path.display(), "loading defaults");
            config.defaults = Defaults::from_file(&path)?;
        }

        if let Ok(bin) = std::env::var("TFCHAIN_TERRAFORM") {
            if !bin.is_empty() {
                config.terraform_bin = bin;
            }
        }

        Ok(config)
    }

    pub fn stack_dir(&self, stack: crate::stack::Stack) -> PathBuf {
        self.terraform_dir.join(stack.directory())
    }

    /// Like [Config::stack_dir], but the directory has to exist
    pub fn existing_stack_dir(&self, stack: crate::stack::Stack) -> Result<PathBuf, crate::Error> {
        let dir = self.stack_dir(stack);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(crate::Error::MissingStackDirectory(dir))
        }
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(".env")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Unable to read defaults file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid defaults file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: hcl::Error,
    },
}

/// Static values written into variable files
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Defaults {
    pub resource_group_name_prefix: String,
    pub location: String,

    pub storage_account_name_prefix: String,
    pub account_replication_type: String,
    pub account_tier: String,
    pub public_network_access_enabled: bool,
    pub is_hns_enabled: bool,

    pub data_factory_name_prefix: String,

    pub http_linked_service_name_prefix: String,
    pub http_base_url: String,
    pub http_authentication_type: String,
    pub http_enable_certificate_validation: bool,
    pub adls_linked_service_name_prefix: String,
    pub linked_services_description: String,
    pub sql_linked_service_name_prefix: String,

    pub pipeline_name_prefix: String,
    pub http_dataset_name_prefix: String,
    pub sink_dataset_name_prefix: String,
    pub sink_file_system: String,

    pub airport_pipeline_name_prefix: String,
    pub http_airport_dataset_name_prefix: String,
    pub sink_airport_dataset_name_prefix: String,
    pub airport_url: String,
    pub airport_rel_url: String,
    pub airport_sink_folder: String,
    pub airport_sink_file: String,

    pub bookings_pipeline_name_prefix: String,
    pub bookings_sql_dataset_name_prefix: String,
    pub bookings_json_dataset_name_prefix: String,
    pub bookings_parquet_dataset_name_prefix: String,
    pub monitor_container: String,
    pub monitor_empty_folder: String,
    pub monitor_empty_file: String,
    pub monitor_lastload_folder: String,
    pub monitor_lastload_file: String,
    pub bookings_sink_container: String,
    pub bookings_sink_folder: String,
    pub bookings_sink_file: String,
    pub bookings_sql_schema: String,
    pub bookings_sql_table: String,

    pub master_pipeline_name_prefix: String,
    pub silver_pipeline_name_prefix: String,

    pub dataflow_name_prefix: String,
    pub dataflow_source_container: String,
    pub dataflow_source_folder: String,
    pub dataflow_airline_source_file: String,
    pub dataflow_flight_source_file: String,
    pub dataflow_passenger_source_file: String,
    pub dataflow_airport_source_file: String,
    pub dataflow_bookings_source_file: String,
    pub dataflow_sink_container: String,
    pub dataflow_sink_folder: String,
    pub dataflow_airline_sink_file: String,
    pub dataflow_flight_sink_file: String,
    pub dataflow_passenger_sink_file: String,
    pub dataflow_airport_sink_file: String,
    pub dataflow_bookings_sink_file: String,

    pub gold_dataflow_name_prefix: String,
    pub gold_source_container: String,
    pub gold_source_folder: String,
    pub gold_airline_source_file: String,
    pub gold_bookings_source_file: String,
    pub gold_sink_container: String,
    pub gold_sink_folder: String,
    pub gold_sink_name: String,

    pub sql_server_name_prefix: String,
    pub sql_admin_login: String,
    pub sql_database_name: String,
    pub sql_database_sku_name: String,
    pub sql_max_size_gb: i64,
    pub sql_min_capacity: f64,
    pub sql_auto_pause_delay_in_minutes: i64,
    pub sql_public_network_access_enabled: bool,
    pub sql_zone_redundant: bool,
}

impl Defaults {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        hcl::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }
}

impl Default for Defaults {
    fn default() -> Self {
        let s = str::to_string;
        let airport_rel_url =
            s("Ch3rry-Pi3-Data-Engineering/DataEng-Azure-Airline/refs/heads/main/data/DimAirport.json");

        Self {
            resource_group_name_prefix: s("rg-airline"),
            location: s("eastus2"),

            storage_account_name_prefix: s("stairline"),
            account_replication_type: s("LRS"),
            account_tier: s("Standard"),
            public_network_access_enabled: true,
            is_hns_enabled: true,

            data_factory_name_prefix: s("adf-airline"),

            http_linked_service_name_prefix: s("ls-http-airline"),
            http_base_url: s("https://raw.githubusercontent.com"),
            http_authentication_type: s("Anonymous"),
            http_enable_certificate_validation: true,
            adls_linked_service_name_prefix: s("ls-adls-airline"),
            linked_services_description: s(
                "Linked services for HTTP source, SQL, and ADLS Gen2 sink",
            ),
            sql_linked_service_name_prefix: s("ls-sql-airline"),

            pipeline_name_prefix: s("pl-airline-http"),
            http_dataset_name_prefix: s("ds_http_airline"),
            sink_dataset_name_prefix: s("ds_adls_bronze_airline"),
            sink_file_system: s("bronze"),

            airport_pipeline_name_prefix: s("pl-airline-airport-json"),
            http_airport_dataset_name_prefix: s("ds_http_airport_json"),
            sink_airport_dataset_name_prefix: s("ds_adls_bronze_airport_json"),
            airport_url: format!("https://raw.githubusercontent.com/{airport_rel_url}"),
            airport_rel_url,
            airport_sink_folder: s("airport"),
            airport_sink_file: s("airport.json"),

            bookings_pipeline_name_prefix: s("pl-airline-bookings"),
            bookings_sql_dataset_name_prefix: s("ds_sql_airline"),
            bookings_json_dataset_name_prefix: s("ds_json_airline"),
            bookings_parquet_dataset_name_prefix: s("ds_parquet_airline"),
            monitor_container: s("bronze"),
            monitor_empty_folder: s("monitor/emptyjson"),
            monitor_empty_file: s("empty.json"),
            monitor_lastload_folder: s("monitor/lastload"),
            monitor_lastload_file: s("last_load.json"),
            bookings_sink_container: s("bronze"),
            bookings_sink_folder: s("airport"),
            bookings_sink_file: s("fact_bookings.parquet"),
            bookings_sql_schema: s("dbo"),
            bookings_sql_table: s("FactBookings"),

            master_pipeline_name_prefix: s("pl-airline-master"),
            silver_pipeline_name_prefix: s("pl-airline-silver-dataflow"),

            dataflow_name_prefix: s("df-airline-bronze-silver"),
            dataflow_source_container: s("bronze"),
            dataflow_source_folder: s("airport"),
            dataflow_airline_source_file: s("airline.csv"),
            dataflow_flight_source_file: s("flight.csv"),
            dataflow_passenger_source_file: s("passenger.csv"),
            dataflow_airport_source_file: s("airport.json"),
            dataflow_bookings_source_file: s("fact_bookings.parquet"),
            dataflow_sink_container: s("silver"),
            dataflow_sink_folder: s("airport"),
            dataflow_airline_sink_file: s("airline.parquet"),
            dataflow_flight_sink_file: s("flight.parquet"),
            dataflow_passenger_sink_file: s("passenger.parquet"),
            dataflow_airport_sink_file: s("airport.parquet"),
            dataflow_bookings_sink_file: s("fact_bookings.parquet"),

            gold_dataflow_name_prefix: s("df-airline-gold-sales"),
            gold_source_container: s("silver"),
            gold_source_folder: s("airport"),
            gold_airline_source_file: s("airline.parquet"),
            gold_bookings_source_file: s("fact_bookings.parquet"),
            gold_sink_container: s("gold"),
            gold_sink_folder: s("airport"),
            gold_sink_name: s("airline_sales_top5"),

            sql_server_name_prefix: s("sql-airline"),
            sql_admin_login: s("sqladmin"),
            sql_database_name: s("airline-dev"),
            sql_database_sku_name: s("GP_S_Gen5_1"),
            sql_max_size_gb: 1,
            sql_min_capacity: 0.5,
            sql_auto_pause_delay_in_minutes: 60,
            sql_public_network_access_enabled: true,
            sql_zone_redundant: false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_file_overrides_selected_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(DEFAULTS_FILE_NAME),
            "location = \"westeurope\"\nsql_max_size_gb = 4\n",
        )
        .unwrap();

        let config = Config::load(dir.path(), None).unwrap();

        let expected = Defaults {
            location: "westeurope".into(),
            sql_max_size_gb: 4,
            ..Defaults::default()
        };
        assert_eq!(config.defaults, expected);
    }

    #[test]
    fn unknown_default_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.hcl");
        std::fs::write(&path, "locaton = \"typo\"\n").unwrap();

        let err = Config::load(dir.path(), Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn airport_url_is_built_from_relative_url() {
        let defaults = Defaults::default();
        assert!(defaults.airport_url.ends_with(&defaults.airport_rel_url));
    }
}
