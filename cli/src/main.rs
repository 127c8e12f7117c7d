//! Edgewatch CLI
//!
//! Command-line interface for operating the Edgewatch ingestion service.
//!
//! # Usage
//!
//! ```bash
//! edgewatch --help
//! edgewatch health
//! edgewatch push --metric cpu_pct --cluster edge-1 --value 97.5
//! edgewatch explore --cluster edge-1 --kind metric --limit 20
//! ```

#![deny(unsafe_code)]

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use shared::storage::{ClickHouseStore, ItemKind, TableNames, TelemetryStore};
use std::sync::Arc;
use std::time::Duration;

/// Edgewatch CLI - telemetry ingestion operator tooling
#[derive(Parser)]
#[command(name = "edgewatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API server URL
    #[arg(
        short,
        long,
        env = "EDGEWATCH_API_URL",
        default_value = "http://localhost:8080"
    )]
    api_url: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API server health
    Health,

    /// Push one synthetic metric sample as plain JSON
    Push {
        /// Metric name
        #[arg(long, default_value = "edgewatch_synthetic")]
        metric: String,
        /// Cluster (tenant) id
        #[arg(long, default_value = "local-test")]
        cluster: String,
        /// Sample value
        #[arg(long, default_value_t = 1.0)]
        value: f64,
        /// `instance` label
        #[arg(long, default_value = "cli")]
        instance: String,
        /// `job` label
        #[arg(long, default_value = "edgewatch-cli")]
        job: String,
        /// API key sent as `x-api-key`
        #[arg(long, env = "EDGEWATCH_API_KEY", default_value = "dev-test-key-123")]
        api_key: String,
    },

    /// Show the newest stored items of one cluster
    Explore {
        /// Cluster (tenant) id
        #[arg(long)]
        cluster: String,
        /// Record kind: metric, log or span
        #[arg(long, default_value = "metric")]
        kind: ItemKind,
        /// Maximum number of items
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// `ClickHouse` URL
        #[arg(long, env = "EDGEWATCH_DB_URL", default_value = "http://localhost:8123")]
        db_url: String,
        /// `ClickHouse` database
        #[arg(long, env = "EDGEWATCH_DB_NAME", default_value = "edgewatch")]
        db_name: String,
        /// `ClickHouse` user
        #[arg(long, env = "EDGEWATCH_DB_USER", default_value = "default")]
        db_user: String,
        /// `ClickHouse` password
        #[arg(long, env = "EDGEWATCH_DB_PASSWORD", default_value = "")]
        db_password: String,
        #[command(flatten)]
        tables: TableArgs,
    },
}

/// Item tables, matching the server's table settings.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
struct TableArgs {
    /// Metric samples table
    #[arg(long, env = "EDGEWATCH_METRICS_TABLE", default_value = "edgewatch_metrics")]
    metrics_table: String,
    /// Log records table
    #[arg(long, env = "EDGEWATCH_LOGS_TABLE", default_value = "edgewatch_logs")]
    logs_table: String,
    /// Spans table
    #[arg(long, env = "EDGEWATCH_TRACES_TABLE", default_value = "edgewatch_traces")]
    traces_table: String,
}

impl From<TableArgs> for TableNames {
    fn from(args: TableArgs) -> Self {
        Self {
            metrics: args.metrics_table,
            logs: args.logs_table,
            traces: args.traces_table,
        }
    }
}

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}

fn sample_body(metric: &str, cluster: &str, value: f64, instance: &str, job: &str) -> Value {
    json!({
        "timeseries": [{
            "labels": {
                "__name__": metric,
                "cluster_id": cluster,
                "instance": instance,
                "job": job
            },
            "samples": [{
                "timestamp_ms": chrono::Utc::now().timestamp_millis(),
                "value": value
            }]
        }]
    })
}

async fn health(api_url: &str) -> Result<()> {
    let url = format!("{}/health", api_url.trim_end_matches('/'));
    let response = http_client()?
        .get(&url)
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        bail!("Health check failed with {status}: {body}");
    }

    println!(
        "{} {} is {}",
        body["service"].as_str().unwrap_or("edgewatch-api"),
        body["version"].as_str().unwrap_or("?"),
        body["status"].as_str().unwrap_or("unknown")
    );
    Ok(())
}

async fn push(api_url: &str, api_key: &str, body: &Value) -> Result<()> {
    let url = format!("{}/ingest", api_url.trim_end_matches('/'));
    tracing::debug!(%url, "Pushing synthetic sample");

    let response = http_client()?
        .post(&url)
        .header("x-api-key", api_key)
        .json(body)
        .send()
        .await
        .with_context(|| format!("Failed to reach {url}"))?;

    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    println!("{status}");
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(_) => println!("{text}"),
    }

    if !status.is_success() {
        bail!("Push rejected with {status}");
    }
    Ok(())
}

async fn explore(
    store: &dyn TelemetryStore,
    kind: ItemKind,
    cluster: &str,
    limit: usize,
) -> Result<()> {
    let items = store
        .query_partition(kind, cluster, limit)
        .await
        .with_context(|| format!("Failed to read {kind} items for '{cluster}'"))?;

    if items.is_empty() {
        println!("No {kind} items stored for '{cluster}'");
        return Ok(());
    }
    for item in &items {
        println!("{}", serde_json::to_string_pretty(item)?);
    }
    println!("{} {kind} item(s)", items.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Health) => health(&cli.api_url).await?,
        Some(Commands::Push {
            metric,
            cluster,
            value,
            instance,
            job,
            api_key,
        }) => {
            let body = sample_body(&metric, &cluster, value, &instance, &job);
            push(&cli.api_url, &api_key, &body).await?;
        }
        Some(Commands::Explore {
            cluster,
            kind,
            limit,
            db_url,
            db_name,
            db_user,
            db_password,
            tables,
        }) => {
            let client = clickhouse::Client::default()
                .with_url(db_url)
                .with_database(db_name)
                .with_user(db_user)
                .with_password(db_password);
            let store = ClickHouseStore::new(Arc::new(client), tables.into())?;
            explore(&store, kind, &cluster, limit).await?;
        }
        None => {
            println!("Edgewatch CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::MetricSample;
    use shared::storage::{InMemoryStore, StoredItem};

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["edgewatch"]);
        assert!(cli.is_ok());
    }

    #[test]
    fn test_cli_health_command() {
        let cli = Cli::try_parse_from(["edgewatch", "health"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Health)));
    }

    #[test]
    fn test_cli_push_command() {
        let cli = Cli::try_parse_from([
            "edgewatch", "push", "--metric", "cpu_pct", "--cluster", "edge-1", "--value", "97.5",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Push {
                metric,
                cluster,
                value,
                ..
            }) => {
                assert_eq!(metric, "cpu_pct");
                assert_eq!(cluster, "edge-1");
                assert!((value - 97.5).abs() < f64::EPSILON);
            }
            _ => panic!("expected push"),
        }
    }

    #[test]
    fn test_cli_explore_requires_cluster() {
        assert!(Cli::try_parse_from(["edgewatch", "explore"]).is_err());
        let cli =
            Cli::try_parse_from(["edgewatch", "explore", "--cluster", "edge-1", "--kind", "span"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Explore {
                kind: ItemKind::Span,
                ..
            })
        ));
        assert!(Cli::try_parse_from([
            "edgewatch", "explore", "--cluster", "edge-1", "--kind", "bogus"
        ])
        .is_err());
    }

    #[test]
    fn test_cli_explore_table_overrides() {
        let cli = Cli::try_parse_from([
            "edgewatch",
            "explore",
            "--cluster",
            "edge-1",
            "--metrics-table",
            "prod_metrics",
            "--traces-table",
            "prod_spans",
        ])
        .unwrap();
        let Some(Commands::Explore { tables, .. }) = cli.command else {
            panic!("expected explore");
        };
        let tables = TableNames::from(tables);
        assert_eq!(tables.for_kind(ItemKind::Metric), "prod_metrics");
        assert_eq!(tables.for_kind(ItemKind::Span), "prod_spans");
        assert_eq!(tables.for_kind(ItemKind::Log), TableNames::default().logs);
    }

    #[test]
    fn test_sample_body_shape() {
        let body = sample_body("cpu_pct", "edge-1", 2.5, "n1", "node");
        let series = &body["timeseries"][0];
        assert_eq!(series["labels"]["__name__"], "cpu_pct");
        assert_eq!(series["labels"]["cluster_id"], "edge-1");
        assert_eq!(series["samples"][0]["value"], 2.5);
        assert!(series["samples"][0]["timestamp_ms"].is_i64());
    }

    #[test]
    fn test_sample_body_is_accepted_by_decoder() {
        let body = serde_json::to_vec(&sample_body("up", "edge-1", 1.0, "n1", "node")).unwrap();
        let decoded = shared::decode::decode(&body, shared::decode::FormatHint::Auto).unwrap();
        assert_eq!(decoded.batch.len(), 1);
    }

    #[tokio::test]
    async fn test_explore_reads_store() {
        let store = InMemoryStore::new();
        let sample = MetricSample::new("up", 1.0, 1.0).with_tenant("edge-1");
        store
            .batch_put(&[StoredItem::from_sample(&sample, i64::MAX)])
            .await
            .unwrap();

        assert!(explore(&store, ItemKind::Metric, "edge-1", 5).await.is_ok());
        assert!(explore(&store, ItemKind::Log, "edge-1", 5).await.is_ok());
    }
}
