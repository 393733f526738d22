use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use tracing::debug;
use wh_core::{DiagnosticReport, Stats, Warehouse, WarehouseConfig};
use wh_server::{ServerConfig, WarehouseServer};
use wh_store::JsonFilePersistence;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Config(args) => cmd_config(args),
        Command::Check(args) => cmd_check(&args.state, format).await,
        Command::Feeds(args) => cmd_feeds(&args.state, format).await,
        Command::Stats(args) => cmd_stats(&args.state, format).await,
        Command::Graph(args) => cmd_graph(args).await,
    }
}

/// Server configuration from an optional TOML file.
fn server_config(path: Option<&Path>) -> anyhow::Result<ServerConfig> {
    match path {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("reading configuration {}", path.display())),
        None => Ok(ServerConfig::default()),
    }
}

/// Open a saved state file without starting a server.
async fn open_state(path: &Path) -> anyhow::Result<Warehouse> {
    let warehouse = Warehouse::with_persistence(
        WarehouseConfig::default(),
        Arc::new(JsonFilePersistence::new(path)),
    );
    if !warehouse.load().await? {
        anyhow::bail!("no saved state at {}", path.display());
    }
    debug!(path = %path.display(), "state file opened");
    Ok(warehouse)
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = server_config(args.config.as_deref())?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if args.state.is_some() {
        config.state_path = args.state;
    }
    println!("{} Warehouse server on {}", "✓".green().bold(), config.bind_addr.to_string().bold());
    match &config.state_path {
        Some(path) => println!("  State: {}", path.display().to_string().cyan()),
        None => println!("  State: {}", "in memory".dimmed()),
    }
    WarehouseServer::new(config).serve().await?;
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = server_config(args.config.as_deref())?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

async fn cmd_check(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let warehouse = open_state(path).await?;
    let report = warehouse.check()?;
    warehouse.shutdown();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    if !report.is_clean() {
        anyhow::bail!("{} issue(s) found", report.len());
    }
    Ok(())
}

fn print_report(report: &DiagnosticReport) {
    if report.is_clean() {
        println!("{} No issues.", "✓".green().bold());
        return;
    }
    for d in &report.dangling {
        println!(
            "{} {} references missing parent {} in feed {}",
            "dangling".red().bold(),
            d.branch.to_string().yellow(),
            d.parent.to_string().yellow(),
            d.feed.to_string().cyan()
        );
    }
    for e in &report.broken_edges {
        let side = if e.missing_on_child { "child" } else { "parent" };
        println!(
            "{} {} -> {} in feed {} (missing on {side})",
            "broken".red().bold(),
            e.parent.to_string().yellow(),
            e.child.to_string().yellow(),
            e.feed.to_string().cyan()
        );
    }
    for u in &report.unreachable {
        println!(
            "{} {} in feed {}",
            "unreachable".red().bold(),
            u.branch.to_string().yellow(),
            u.feed.to_string().cyan()
        );
    }
    for branch in &report.orphans {
        println!("{} {}", "orphan".red().bold(), branch.to_string().yellow());
    }
}

async fn cmd_feeds(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let warehouse = open_state(path).await?;
    let feeds = warehouse.list_feeds()?;
    warehouse.shutdown();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&feeds)?),
        OutputFormat::Text if feeds.is_empty() => println!("No feeds."),
        OutputFormat::Text => {
            for feed in &feeds {
                println!("  {}", feed.to_string().cyan());
            }
        }
    }
    Ok(())
}

async fn cmd_stats(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let warehouse = open_state(path).await?;
    let stats = warehouse.stats()?;
    warehouse.shutdown();
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Text => print_stats(&stats),
    }
    Ok(())
}

fn print_stats(stats: &Stats) {
    println!("Branches: {}", stats.branches.to_string().bold());
    println!("Feeds: {}", stats.feeds.to_string().bold());
    println!("Pending releases: {}", stats.pending_releases);
    if let Some(m) = &stats.maintenance {
        println!("Maintenance: {} ({})", m.description.yellow(), m.holder);
    }
}

async fn cmd_graph(args: GraphArgs) -> anyhow::Result<()> {
    let warehouse = open_state(&args.state).await?;
    let result = match &args.output {
        Some(output) => warehouse
            .export_graph(output, args.style)
            .await
            .map(|()| println!("{} Graph written to {}", "✓".green(), output.display())),
        None => warehouse.render_graph(args.style).map(|dot| print!("{dot}")),
    };
    warehouse.shutdown();
    result?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wh_core::UpsertRequest;
    use wh_types::FeedId;

    async fn saved_state(path: &Path) {
        let warehouse = Warehouse::with_persistence(
            WarehouseConfig::default(),
            Arc::new(JsonFilePersistence::new(path)),
        );
        warehouse
            .upsert(UpsertRequest::new("workshop@main").parent("workshop@main").feed("desktop"))
            .unwrap();
        warehouse.save().await.unwrap();
        warehouse.shutdown();
    }

    #[tokio::test]
    async fn open_state_reads_a_saved_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        saved_state(&path).await;

        let warehouse = open_state(&path).await.unwrap();
        assert!(warehouse.has("workshop@main").unwrap());
        assert_eq!(warehouse.list_feeds().unwrap(), vec![FeedId::new("desktop")]);
        assert!(warehouse.check().unwrap().is_clean());
    }

    #[tokio::test]
    async fn open_state_fails_without_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_state(&dir.path().join("missing.json")).await.unwrap_err();
        assert!(err.to_string().starts_with("no saved state"));
    }

    #[tokio::test]
    async fn graph_is_written_to_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("state.json");
        let output = dir.path().join("graph.dot");
        saved_state(&state).await;

        cmd_graph(GraphArgs {
            state,
            style: wh_core::GraphStyle::Simple,
            output: Some(output.clone()),
        })
        .await
        .unwrap();
        let dot = std::fs::read_to_string(output).unwrap();
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("workshop@main"));
    }

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("warehouse.toml");
        std::fs::write(&path, "bind_addr = \"0.0.0.0:9000\"\n").unwrap();
        let config = server_config(Some(&path)).unwrap();
        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.warehouse, WarehouseConfig::default());
        assert_eq!(server_config(None).unwrap(), ServerConfig::default());
    }
}
