//! Access link CLI commands.

use std::net::IpAddr;
use std::sync::Arc;

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;
use uuid::Uuid;

use defdrive_core::error::AppError;
use defdrive_entity::access::AccessRecord;
use defdrive_service::{Caller, Decision, DenyReason, LinkService};
use defdrive_storage::LocalStorageProvider;

use crate::output::{self, OutputFormat};

/// Arguments for access commands
#[derive(Debug, Args)]
pub struct AccessArgs {
    /// Access subcommand
    #[command(subcommand)]
    pub command: AccessCommand,
}

/// Access subcommands
#[derive(Debug, Subcommand)]
pub enum AccessCommand {
    /// List the access links of a file
    List {
        /// File ID
        #[arg(long)]
        file: Uuid,
    },
    /// Evaluate a link for a hypothetical request without consuming it
    Inspect {
        /// Link token
        link: String,
        /// Client IP address to evaluate
        #[arg(long)]
        ip: IpAddr,
        /// Evaluate as a signed-in caller
        #[arg(long)]
        authenticated: bool,
    },
}

/// Access link display row for table output
#[derive(Debug, Serialize, Tabled)]
struct AccessRow {
    /// Record ID
    id: String,
    /// Label
    name: String,
    /// Link token
    link: String,
    /// Public flag
    public: bool,
    /// One-time link
    one_time_use: bool,
    /// Consumed
    used: bool,
    /// Remaining hops
    ttl: String,
    /// Expiry
    expires: String,
    /// Restrictions
    allow: String,
    /// Save counter
    version: i64,
}

impl From<&AccessRecord> for AccessRow {
    fn from(a: &AccessRecord) -> Self {
        let mut allow = a.subnets.clone();
        allow.extend(a.ips.iter().cloned());
        Self {
            id: a.id.to_string(),
            name: a.name.clone(),
            link: a.link.clone(),
            public: a.public,
            one_time_use: a.one_time_use,
            used: a.used,
            ttl: if a.enable_ttl {
                a.ttl.to_string()
            } else {
                "-".to_string()
            },
            expires: a.expires.clone().unwrap_or_else(|| "never".to_string()),
            allow: if allow.is_empty() {
                "any".to_string()
            } else {
                allow.join(", ")
            },
            version: a.version,
        }
    }
}

/// Outcome of a dry-run evaluation
#[derive(Debug, Serialize)]
struct InspectReport {
    link: String,
    client_ip: String,
    authenticated: bool,
    admitted: bool,
    reason: Option<DenyReason>,
    would_mark_used: bool,
    would_decrement_ttl: bool,
}

/// Execute access commands
pub async fn execute(
    args: &AccessArgs,
    config_path: &str,
    format: OutputFormat,
) -> Result<(), AppError> {
    let config = super::load_config(config_path)?;
    let stores = super::open_stores(&config).await?;

    match &args.command {
        AccessCommand::List { file } => {
            if stores.files.find_file_by_id(*file).await?.is_none() {
                return Err(AppError::not_found(format!("File '{file}' not found")));
            }
            let records = stores.accesses.find_accesses_by_file(*file).await?;
            let rows: Vec<AccessRow> = records.iter().map(AccessRow::from).collect();
            output::print_list(&rows, format);
        }
        AccessCommand::Inspect {
            link,
            ip,
            authenticated,
        } => {
            let storage = Arc::new(LocalStorageProvider::new(&config.storage.data_root).await?);
            let link_service = LinkService::new(
                stores.accesses.clone(),
                stores.files.clone(),
                storage,
                config.link.clone(),
            );

            // Only whether a caller is signed in matters to the evaluator.
            let caller = if *authenticated {
                Caller::User(Uuid::nil())
            } else {
                Caller::Anonymous
            };
            let client_ip = ip.to_canonical().to_string();
            let decision = link_service.inspect(link, &client_ip, caller).await?;

            let (admitted, reason, mutations) = match decision {
                Decision::Admit(m) => (true, None, Some(m)),
                Decision::Deny(r) => (false, Some(r), None),
            };
            let report = InspectReport {
                link: link.clone(),
                client_ip,
                authenticated: *authenticated,
                admitted,
                reason,
                would_mark_used: mutations.is_some_and(|m| m.mark_used),
                would_decrement_ttl: mutations.is_some_and(|m| m.decrement_ttl),
            };
            print_report(&report, format);
        }
    }

    Ok(())
}

fn print_report(report: &InspectReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
            println!("{json}");
        }
        OutputFormat::Table => {
            output::print_kv("Link", &report.link);
            output::print_kv("Client IP", &report.client_ip);
            output::print_kv("Authenticated", &report.authenticated.to_string());
            match report.reason {
                None => {
                    output::print_kv("Marks used", &report.would_mark_used.to_string());
                    output::print_kv("Spends a hop", &report.would_decrement_ttl.to_string());
                    output::print_success("Request would be admitted");
                }
                Some(reason) => {
                    output::print_warning(&format!(
                        "Request would be denied: {reason} ({})",
                        reason.message()
                    ));
                }
            }
        }
    }
}
