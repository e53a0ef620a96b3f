// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scanner CLI
 * Runs one scan and prints the summary or the JSON report
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lonkero_mapper::config::AppConfig;
use lonkero_mapper::event_bus::{EventKind, ScanEvent};
use lonkero_mapper::scanners::{ScanEngine, ScanReport};

#[derive(Parser)]
#[command(name = "lonkero-mapper")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "Scan a web application and map its structure", long_about = None)]
struct Cli {
    /// Target URL
    target: String,

    /// Scan profile: mapping, quick, balanced, intense, stealth
    /// [default: LONKERO_PROFILE, else balanced]
    #[arg(short, long)]
    profile: Option<String>,

    /// HTTP Basic credentials as username:password
    #[arg(long, env = "LONKERO_AUTH_BASIC")]
    auth_basic: Option<String>,

    /// Bearer token
    #[arg(long, env = "LONKERO_AUTH_TOKEN")]
    auth_token: Option<String>,

    /// Session cookies as "name=value; name2=value2"
    #[arg(long, env = "LONKERO_AUTH_COOKIE")]
    cookie: Option<String>,

    /// Maximum pages the mapper fetches
    #[arg(long)]
    max_pages: Option<usize>,

    /// Skip subdomain discovery
    #[arg(long)]
    no_subdomains: bool,

    /// Print the full report as JSON
    #[arg(long)]
    json: bool,

    /// Write the JSON report to a file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = AppConfig::from_env()?;
    if cli.auth_basic.is_some() {
        config.scanner.auth_basic = cli.auth_basic.clone();
    }
    if cli.auth_token.is_some() {
        config.scanner.auth_token = cli.auth_token.clone();
    }
    if cli.cookie.is_some() {
        config.scanner.auth_cookie = cli.cookie.clone();
    }
    if let Some(max_pages) = cli.max_pages {
        config.scanner.max_pages = max_pages;
    }
    if cli.no_subdomains {
        config.scanner.discover_subdomains = false;
    }

    let engine = Arc::new(ScanEngine::from_app_config(&config)?);
    subscribe_console(&engine, cli.json);

    let abort = Arc::clone(&engine);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling scan");
            abort.cancel();
        }
    });

    let profile = cli.profile.clone().unwrap_or_else(|| config.profile.to_string());
    let report = engine.scan(&cli.target, &profile).await?;

    if let Some(path) = &cli.output {
        std::fs::write(path, report.to_json()?)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!("Report written to {}", path.display());
    }

    if cli.json {
        println!("{}", report.to_json()?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

/// Console output driven purely by the event bus
fn subscribe_console(engine: &ScanEngine, quiet: bool) {
    let bus = engine.bus();

    if !quiet {
        bus.subscribe(EventKind::VulnerabilityFound, |event| {
            if let ScanEvent::VulnerabilityFound(finding) = event {
                println!(
                    "[{}] {} at {} ({})",
                    finding.severity,
                    finding.vuln_type,
                    finding.url,
                    finding.parameter.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        });
    }

    bus.subscribe(EventKind::Progress, |event| {
        if let ScanEvent::Progress { message, percent } = event {
            match percent {
                Some(p) => info!("[{:>3}%] {}", p, message),
                None => info!("{}", message),
            }
        }
        Ok(())
    });

    bus.subscribe(EventKind::Error, |event| {
        if let ScanEvent::Error { source, message } = event {
            warn!("{}: {}", source, message);
        }
        Ok(())
    });
}

fn print_summary(report: &ScanReport) {
    let map = &report.site_map;
    println!();
    println!("Target:      {}", report.target);
    println!("Profile:     {}", report.profile);
    println!("Duration:    {}ms", report.duration_ms);
    println!("Findings:    {}", report.findings.len());
    println!(
        "Pages:       {} visited, {} failed",
        map.statistics.total_urls,
        map.failures.len()
    );
    println!("Forms:       {}", map.statistics.total_forms);
    println!(
        "Links:       {} internal, {} external",
        map.statistics.total_internal_links, map.statistics.total_external_links
    );
    println!("Subdomains:  {}", map.statistics.total_subdomains);
    println!(
        "Requests:    {} sent, {} cached, {} failed",
        report.statistics.total_requests,
        report.statistics.cached_responses,
        report.statistics.failed_requests
    );

    for (host, technologies) in &map.technologies {
        for (category, names) in technologies {
            println!("Tech:        {} {}: {}", host, category, names.join(", "));
        }
    }
    for error in &report.tester_errors {
        println!("Tester error: {} - {}", error.tester, error.message);
    }
    if report.cancelled {
        println!("Scan was cancelled; results are partial.");
    }
}
