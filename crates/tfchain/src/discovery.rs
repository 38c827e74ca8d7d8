//! values looked up from the environment we are running in
//!
//! Discovery never fails loudly: a missing `az` login or an unreachable lookup service simply
//! yields nothing and resolution moves on.
use crate::process::{Cmd, CommandRunner};
use std::time::Duration;

/// Identity of the user signed in to the cloud CLI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedInUser {
    pub login: Option<String>,
    pub object_id: Option<String>,
}

pub trait Discover {
    fn signed_in_user(&self) -> SignedInUser;

    /// Public address this machine is seen as
    fn public_ip(&self) -> Option<String>;
}

/// Azure CLI for identity, an HTTPS echo service for the public address
pub struct CloudDiscovery<'r> {
    runner: &'r dyn CommandRunner,
    ip_lookup_url: String,
    ip_lookup_timeout: Duration,
}

impl<'r> CloudDiscovery<'r> {
    pub fn new(runner: &'r dyn CommandRunner, config: &crate::config::Config) -> Self {
        Self {
            runner,
            ip_lookup_url: config.ip_lookup_url.clone(),
            ip_lookup_timeout: config.ip_lookup_timeout,
        }
    }
}

fn az() -> Cmd {
    Cmd::new(if cfg!(windows) { "az.cmd" } else { "az" })
}

impl Discover for CloudDiscovery<'_> {
    fn signed_in_user(&self) -> SignedInUser {
        let login = self.runner.capture_optional(
            &az().args(["account", "show", "--query", "user.name", "-o", "tsv"]),
        );
        let object_id = self.runner.capture_optional(&az().args([
            "ad",
            "signed-in-user",
            "show",
            "--query",
            "id",
            "-o",
            "tsv",
        ]));

        tracing::debug!(?login, ?object_id, "signed in user");
        SignedInUser { login, object_id }
    }

    fn public_ip(&self) -> Option<String> {
        tracing::info!(url = %self.ip_lookup_url, "detecting public ip");
        let response = reqwest::blocking::Client::builder()
            .timeout(self.ip_lookup_timeout)
            .build()
            .and_then(|client| client.get(&self.ip_lookup_url).send())
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text());

        match response {
            Ok(body) => {
                let ip = body.trim();
                (!ip.is_empty()).then(|| ip.to_string())
            }
            Err(err) => {
                tracing::warn!(%err, "public ip lookup failed");
                None
            }
        }
    }
}
