//! variables of each stack
//!
//! [requests] is the single table describing what ends up in every stack's variable file and in
//! which order. [materialize] writes a resolved set to disk.
use crate::config::{Config, Defaults};
use crate::resolve::{Discovery, Generator, Mode, Request, Strategy};
use crate::stack::Stack;
use crate::tfvars::{self, VariableSet};
use crate::Error;
use std::path::PathBuf;

const RESOURCE_GROUP_ENV: &[&str] = &["RESOURCE_GROUP_NAME", "RG_NAME"];

/// Requests for every variable of `stack`, in file order
pub fn requests(stack: Stack, defaults: &Defaults, mode: Mode) -> Vec<Request> {
    let d = defaults;
    match stack {
        Stack::Rg => vec![
            Request::nullable("resource_group_name"),
            Request::fixed("resource_group_name_prefix", &*d.resource_group_name_prefix),
            Request::fixed("location", &*d.location),
        ],
        Stack::Storage => vec![
            resource_group_name(),
            Request::fixed("location", &*d.location),
            Request::fixed("storage_account_name_prefix", &*d.storage_account_name_prefix),
            Request::fixed("account_replication_type", &*d.account_replication_type),
            Request::fixed("account_tier", &*d.account_tier),
            Request::fixed("public_network_access_enabled", d.public_network_access_enabled),
            Request::fixed("is_hns_enabled", d.is_hns_enabled),
            Request::omit_if_absent("storage_blob_contributor_object_id")
                .env(&["STORAGE_BLOB_CONTRIBUTOR_OBJECT_ID"])
                .discover(Discovery::SignedInUserObjectId),
        ],
        Stack::Sql => vec![
            resource_group_name(),
            Request::fixed("location", &*d.location),
            Request::fixed("sql_server_name_prefix", &*d.sql_server_name_prefix),
            sql_admin_login("sql_admin_login", d),
            sql_admin_password("sql_admin_password", mode),
            Request::required("azuread_admin_login")
                .env(&["AZUREAD_ADMIN_LOGIN"])
                .persisted(Stack::Sql, "azuread_admin_login")
                .discover(Discovery::SignedInUserLogin),
            Request::nullable("azuread_admin_object_id")
                .env(&["AZUREAD_ADMIN_OBJECT_ID"])
                .persisted(Stack::Sql, "azuread_admin_object_id")
                .discover(Discovery::SignedInUserObjectId),
            client_ip_address(mode),
            Request::fixed("database_name", &*d.sql_database_name),
            Request::fixed("database_sku_name", &*d.sql_database_sku_name),
            Request::fixed("max_size_gb", d.sql_max_size_gb),
            Request::fixed("min_capacity", d.sql_min_capacity),
            Request::fixed("auto_pause_delay_in_minutes", d.sql_auto_pause_delay_in_minutes),
            Request::fixed("public_network_access_enabled", d.sql_public_network_access_enabled),
            Request::fixed("zone_redundant", d.sql_zone_redundant),
        ],
        Stack::DataFactory => vec![
            resource_group_name(),
            Request::fixed("location", &*d.location),
            Request::fixed("data_factory_name_prefix", &*d.data_factory_name_prefix),
        ],
        Stack::AdfLinks => vec![
            data_factory_id(),
            Request::fixed("http_linked_service_name_prefix", &*d.http_linked_service_name_prefix),
            Request::fixed("http_base_url", &*d.http_base_url),
            Request::fixed("http_authentication_type", &*d.http_authentication_type),
            Request::fixed(
                "http_enable_certificate_validation",
                d.http_enable_certificate_validation,
            ),
            Request::fixed("adls_linked_service_name_prefix", &*d.adls_linked_service_name_prefix),
            output("storage_dfs_endpoint", Stack::Storage, "primary_dfs_endpoint"),
            output(
                "storage_account_key",
                Stack::Storage,
                "storage_account_primary_access_key",
            ),
            Request::fixed("sql_linked_service_name_prefix", &*d.sql_linked_service_name_prefix),
            output("sql_server_fqdn", Stack::Sql, "sql_server_fqdn"),
            output("sql_database_name", Stack::Sql, "sql_database_name"),
            sql_admin_login("sql_username", d),
            // never generated here, a new password would not match the server
            sql_admin_password("sql_password", Mode::Destroy),
            Request::fixed("description", &*d.linked_services_description),
        ],
        Stack::AdfPipeline => vec![
            data_factory_id(),
            output("http_linked_service_name", Stack::AdfLinks, "http_linked_service_name"),
            output("adls_linked_service_name", Stack::AdfLinks, "adls_linked_service_name"),
            Request::fixed("pipeline_name_prefix", &*d.pipeline_name_prefix),
            Request::fixed("http_dataset_name_prefix", &*d.http_dataset_name_prefix),
            Request::fixed("sink_dataset_name_prefix", &*d.sink_dataset_name_prefix),
            Request::fixed("sink_file_system", &*d.sink_file_system),
        ],
        Stack::AdfAirportPipeline => vec![
            data_factory_id(),
            output("http_linked_service_name", Stack::AdfLinks, "http_linked_service_name"),
            output("adls_linked_service_name", Stack::AdfLinks, "adls_linked_service_name"),
            Request::fixed("pipeline_name_prefix", &*d.airport_pipeline_name_prefix),
            Request::fixed("http_dataset_name_prefix", &*d.http_airport_dataset_name_prefix),
            Request::fixed("sink_dataset_name_prefix", &*d.sink_airport_dataset_name_prefix),
            Request::fixed("sink_file_system", &*d.sink_file_system),
            Request::fixed("sink_folder", &*d.airport_sink_folder),
            Request::fixed("sink_file", &*d.airport_sink_file),
            Request::fixed("airport_url", &*d.airport_url),
            Request::fixed("airport_rel_url", &*d.airport_rel_url),
        ],
        Stack::AdfBookingsPipeline => vec![
            data_factory_id(),
            output("sql_linked_service_name", Stack::AdfLinks, "sql_linked_service_name"),
            output("adls_linked_service_name", Stack::AdfLinks, "adls_linked_service_name"),
            Request::fixed("pipeline_name_prefix", &*d.bookings_pipeline_name_prefix),
            Request::fixed("sql_dataset_name_prefix", &*d.bookings_sql_dataset_name_prefix),
            Request::fixed("json_dataset_name_prefix", &*d.bookings_json_dataset_name_prefix),
            Request::fixed(
                "parquet_dataset_name_prefix",
                &*d.bookings_parquet_dataset_name_prefix,
            ),
            Request::fixed("monitor_container", &*d.monitor_container),
            Request::fixed("monitor_empty_folder", &*d.monitor_empty_folder),
            Request::fixed("monitor_empty_file", &*d.monitor_empty_file),
            Request::fixed("monitor_lastload_folder", &*d.monitor_lastload_folder),
            Request::fixed("monitor_lastload_file", &*d.monitor_lastload_file),
            Request::fixed("sink_container", &*d.bookings_sink_container),
            Request::fixed("sink_folder", &*d.bookings_sink_folder),
            Request::fixed("sink_file", &*d.bookings_sink_file),
            Request::fixed("sql_schema", &*d.bookings_sql_schema),
            Request::fixed("sql_table", &*d.bookings_sql_table),
        ],
        Stack::AdfDataflow => vec![
            data_factory_id(),
            output("adls_linked_service_name", Stack::AdfLinks, "adls_linked_service_name"),
            Request::fixed("dataflow_name_prefix", &*d.dataflow_name_prefix),
            Request::fixed("source_container", &*d.dataflow_source_container),
            Request::fixed("source_folder", &*d.dataflow_source_folder),
            Request::fixed("airline_source_file", &*d.dataflow_airline_source_file),
            Request::fixed("flight_source_file", &*d.dataflow_flight_source_file),
            Request::fixed("passenger_source_file", &*d.dataflow_passenger_source_file),
            Request::fixed("airport_source_file", &*d.dataflow_airport_source_file),
            Request::fixed("bookings_source_file", &*d.dataflow_bookings_source_file),
            Request::fixed("sink_container", &*d.dataflow_sink_container),
            Request::fixed("sink_folder", &*d.dataflow_sink_folder),
            Request::fixed("airline_sink_file", &*d.dataflow_airline_sink_file),
            Request::fixed("flight_sink_file", &*d.dataflow_flight_sink_file),
            Request::fixed("passenger_sink_file", &*d.dataflow_passenger_sink_file),
            Request::fixed("airport_sink_file", &*d.dataflow_airport_sink_file),
            Request::fixed("bookings_sink_file", &*d.dataflow_bookings_sink_file),
        ],
        Stack::AdfSilverPipeline => vec![
            data_factory_id(),
            output("dataflow_name", Stack::AdfDataflow, "dataflow_name"),
            Request::fixed("pipeline_name_prefix", &*d.silver_pipeline_name_prefix),
        ],
        Stack::AdfGoldDataflow => vec![
            data_factory_id(),
            output("adls_linked_service_name", Stack::AdfLinks, "adls_linked_service_name"),
            Request::fixed("dataflow_name_prefix", &*d.gold_dataflow_name_prefix),
            Request::fixed("source_container", &*d.gold_source_container),
            Request::fixed("source_folder", &*d.gold_source_folder),
            Request::fixed("airline_source_file", &*d.gold_airline_source_file),
            Request::fixed("bookings_source_file", &*d.gold_bookings_source_file),
            Request::fixed("sink_container", &*d.gold_sink_container),
            Request::fixed("sink_folder", &*d.gold_sink_folder),
            Request::fixed("sink_name", &*d.gold_sink_name),
        ],
        Stack::AdfMasterPipeline => vec![
            data_factory_id(),
            output("http_pipeline_name", Stack::AdfPipeline, "pipeline_name"),
            output("airport_pipeline_name", Stack::AdfAirportPipeline, "pipeline_name"),
            output("bookings_pipeline_name", Stack::AdfBookingsPipeline, "pipeline_name"),
            output("silver_pipeline_name", Stack::AdfSilverPipeline, "pipeline_name"),
            Request::fixed("pipeline_name_prefix", &*d.master_pipeline_name_prefix),
            Request::fixed("airport_url", &*d.airport_url),
            Request::fixed("airport_rel_url", &*d.airport_rel_url),
        ],
    }
}

fn output(key: &'static str, stack: Stack, name: &'static str) -> Request {
    Request::required(key).output(stack, name)
}

fn data_factory_id() -> Request {
    output("data_factory_id", Stack::DataFactory, "data_factory_id")
}

fn resource_group_name() -> Request {
    Request::required("resource_group_name")
        .env(RESOURCE_GROUP_ENV)
        .output(Stack::Rg, "resource_group_name")
        .persisted(Stack::Storage, "resource_group_name")
        .persisted(Stack::DataFactory, "resource_group_name")
        .persisted(Stack::Sql, "resource_group_name")
}

fn sql_admin_login(key: &'static str, d: &Defaults) -> Request {
    Request::required(key)
        .env(&["SQL_ADMIN_LOGIN"])
        .persisted(Stack::Sql, "sql_admin_login")
        .default(&*d.sql_admin_login)
}

fn sql_admin_password(key: &'static str, mode: Mode) -> Request {
    let request = Request::required(key)
        .env(&["SQL_ADMIN_PASSWORD"])
        .persisted(Stack::Sql, "sql_admin_password");
    match mode {
        Mode::Deploy => request.generate(Generator::Password),
        Mode::Destroy => request,
    }
}

fn client_ip_address(mode: Mode) -> Request {
    match mode {
        Mode::Deploy => Request::required("client_ip_address")
            .env(&["SQL_CLIENT_IP"])
            .persisted(Stack::Sql, "client_ip_address")
            .discover(Discovery::PublicIp),
        Mode::Destroy => Request::nullable("client_ip_address")
            .env(&["SQL_CLIENT_IP"])
            .persisted(Stack::Sql, "client_ip_address"),
    }
}

/// Write `variables` as the variable file of `stack`, returning its path
pub fn materialize(
    config: &Config,
    stack: Stack,
    variables: &VariableSet,
) -> Result<PathBuf, Error> {
    let path = config.stack_dir(stack).join(tfvars::FILE_NAME);
    tfvars::write(&path, variables).map_err(|source| Error::Io {
        path: path.clone(),
        source,
    })?;
    tracing::info!(%stack, path=%path.display(), "wrote variables");
    Ok(path)
}

/// Variables a stack reads from other stacks, keyed by variable name
pub fn collaborator_outputs(stack: Stack) -> Vec<(&'static str, Stack, &'static str)> {
    requests(stack, &Defaults::default(), Mode::Destroy)
        .into_iter()
        .filter_map(|request| {
            request.chain.iter().find_map(|strategy| match strategy {
                Strategy::Output { stack, name } => Some((request.key, *stack, *name)),
                _ => None,
            })
        })
        .collect()
}
