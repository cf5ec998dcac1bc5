//! `cluster-transport`: command-line access to a cluster through the transport.
//!
//! ```text
//! cluster-transport [--config FILE] [--hosts LIST] [--retry N] <COMMAND>
//!     request <METHOD> <PATH> [--param k=v]... [--body JSON]
//!     sniff      discover nodes and print the reconciled pool
//!     nodes      print the configured pool
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use http::{HeaderMap, Method};
use serde_json::Value;

use cluster_transport::config::hosts::HostEntry;
use cluster_transport::config::loader::load_config;
use cluster_transport::config::schema::RetryOnFailure;
use cluster_transport::observability::logging::init_logging;
use cluster_transport::transport::{Body, RequestOptions};
use cluster_transport::{Transport, TransportConfig, TransportError};

#[derive(Parser)]
#[command(name = "cluster-transport")]
#[command(about = "Send requests to a cluster with failover and sniffing", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Comma-separated hosts, overriding the configuration
    #[arg(long, global = true)]
    hosts: Option<String>,

    /// Retries after the first attempt
    #[arg(long, global = true)]
    retry: Option<u32>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Perform a single request
    Request {
        method: String,
        path: String,
        /// Query parameter as key=value
        #[arg(short, long = "param")]
        params: Vec<String>,
        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Discover cluster nodes and reconcile them into the pool
    Sniff,
    /// Show the pool and each node's health
    Nodes,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TransportConfig::default(),
    };
    if let Some(hosts) = cli.hosts {
        config.hosts = vec![HostEntry::Url(hosts)];
    }
    if let Some(retry) = cli.retry {
        config.retry_on_failure = RetryOnFailure::Count(retry);
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    init_logging(&config.log_level);
    let transport = Transport::new(config)?;

    match cli.command {
        Commands::Request {
            method,
            path,
            params,
            body,
        } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())?;
            let params = params
                .iter()
                .map(|p| match p.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (p.clone(), String::new()),
                })
                .collect::<Vec<_>>();
            let body = body
                .map(|raw| serde_json::from_str::<Value>(&raw))
                .transpose()?
                .map(Body::Json);

            let result = transport
                .perform_request(method, &path, &params, body, HeaderMap::new(), RequestOptions::default())
                .await;
            let response = match result {
                Ok(response) => response,
                Err(TransportError::ClientError { response, .. })
                | Err(TransportError::ServerError { response, .. }) => {
                    eprintln!("Status: {}", response.status);
                    response
                }
                Err(e) => return Err(e.into()),
            };
            match transport.deserialize(&response) {
                Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
                Err(_) => println!("{}", response.text()),
            }
        }
        Commands::Sniff => {
            let report = transport.reload_connections().await?;
            println!(
                "added: {}, removed: {}, retained: {}",
                report.added.len(),
                report.removed.len(),
                report.retained
            );
            print_nodes(&transport);
        }
        Commands::Nodes => print_nodes(&transport),
    }

    Ok(())
}

fn print_nodes(transport: &Transport) {
    for (id, state, failures) in transport.pool().states() {
        println!("{id}\t{state}\tfailures={failures}");
    }
}
