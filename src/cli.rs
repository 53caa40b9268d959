use crate::api::{self, CommandHandler};
use crate::config::Config;
use crate::engine::{self, Monitor, MonitorOptions};
use crate::runtime;
use crate::services::{notify, ActivityLogger, FileRegistry, Registry};
use crate::tools::classify::{self, Classifier};
use crate::tools::fetch::HttpFetcher;
use crate::types::*;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

#[derive(Parser)]
#[command(name = "roomwatch", version, about = "Watch hotel booking pages for free rooms (JSON output)")]
pub struct Cli {
    /// Config file; defaults to the platform config dir
    #[arg(long, global = true, env = "ROOMWATCH_CONFIG")]
    pub config: Option<PathBuf>,
    /// Debug logging (RUST_LOG wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll until Ctrl-C; stdin lines `<owner> <text…>` are chat commands
    Run(RunArgs),
    /// Fetch and classify one page now
    Check(CheckArgs),
    /// Classify a saved page (`-` reads stdin)
    Classify { file: String },
    /// Start watching for an owner (runs the first check)
    Watch(WatchArgs),
    /// Stop every active request of an owner
    Stop { owner: String },
    /// Active requests of an owner
    Status { owner: String },
    /// Active requests (`--all` includes finished ones)
    List {
        #[arg(long)]
        all: bool,
    },
    /// Activity log, newest first
    Logs {
        #[arg(long)]
        owner: Option<String>,
        #[arg(long)]
        errors: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct RunArgs {
    /// One cycle, print its report, exit
    #[arg(long)]
    once: bool,
    /// Ignore stdin
    #[arg(long)]
    no_stdin: bool,
}

#[derive(Args)]
struct CheckArgs {
    url: String,
    checkin: String,
    checkout: String,
    #[arg(long, default_value_t = 2)]
    occupancy: i64,
}

#[derive(Args)]
struct WatchArgs {
    owner: String,
    /// Hotel page; the configured `[target]` when omitted
    #[arg(long)]
    url: Option<String>,
    checkin: String,
    checkout: String,
    occupancy: Option<String>,
}

impl Cli {
    pub fn execute(self) -> anyhow::Result<()> {
        let cfg = Config::load(self.config.as_deref()).context("loading configuration")?;

        match self.cmd {
            Command::Config => println!("{}", cfg.to_toml()?),
            Command::Classify { file } => {
                let content = read_input(&file)?;
                print_json(ApiResponse::ok(classify::classify(&content, &cfg.classifier)));
            }
            Command::Check(args) => finish(runtime::block_on(check(&cfg, args))),
            Command::List { all } => {
                let registry = open_registry(&cfg)?;
                finish(if all {
                    registry.list_all()
                } else {
                    registry.list_active()
                });
            }
            Command::Status { owner } => {
                let registry = open_registry(&cfg)?;
                finish(api::active_for(registry.as_ref(), &Owner::new(owner)));
            }
            Command::Stop { owner } => {
                let registry = open_registry(&cfg)?;
                finish(api::stop_owner(registry.as_ref(), &Owner::new(owner)));
            }
            Command::Logs { owner, errors } => {
                finish(activity_log(&cfg).and_then(|log| log.read_logs(owner.as_deref(), errors)));
            }
            Command::Watch(args) => {
                let monitor = build_monitor(&cfg)?;
                let handler = CommandHandler::new(
                    monitor.clone(),
                    cfg.target.clone(),
                    cfg.scheduler.max_background_checks,
                );
                let owner = Owner::new(args.owner.clone());
                let text = watch_text(&args);
                let reply = runtime::block_on(async {
                    let reply = handler.handle(InboundEvent::new(owner.clone(), text)).await;
                    handler.shutdown().await;
                    reply
                });
                finish(
                    api::active_for(monitor.registry().as_ref(), &owner).map(|requests| {
                        serde_json::json!({ "reply": reply.text, "requests": requests })
                    }),
                );
            }
            Command::Run(args) => {
                let monitor = build_monitor(&cfg)?;
                if args.once {
                    print_json(ApiResponse::ok(runtime::block_on(monitor.run_cycle())));
                } else {
                    let handler = Arc::new(CommandHandler::new(
                        monitor.clone(),
                        cfg.target.clone(),
                        cfg.scheduler.max_background_checks,
                    ));
                    runtime::block_on(serve(monitor, handler, !args.no_stdin))?;
                }
            }
        }
        Ok(())
    }
}

fn watch_text(args: &WatchArgs) -> String {
    let mut parts: Vec<&str> = Vec::new();
    if let Some(url) = &args.url {
        parts.push(url);
    }
    parts.push(&args.checkin);
    parts.push(&args.checkout);
    if let Some(occ) = &args.occupancy {
        parts.push(occ);
    }
    parts.join(" ")
}

fn read_input(file: &str) -> anyhow::Result<String> {
    if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(file).with_context(|| format!("reading {file}"))
    }
}

fn open_registry(cfg: &Config) -> crate::Result<Arc<dyn Registry>> {
    let registry = match &cfg.store.path {
        Some(path) => FileRegistry::open(path)?,
        None => FileRegistry::open_default()?,
    };
    Ok(Arc::new(registry))
}

fn activity_log(cfg: &Config) -> crate::Result<ActivityLogger> {
    match &cfg.store.activity_log {
        Some(path) => ActivityLogger::at(path),
        None => ActivityLogger::new(),
    }
}

fn build_monitor(cfg: &Config) -> crate::Result<Arc<Monitor>> {
    let notifier: Arc<dyn notify::Notifier> = Arc::from(notify::from_config(&cfg.notify)?);
    let mut monitor = Monitor::new(
        open_registry(cfg)?,
        Arc::new(HttpFetcher::new(cfg.fetch.clone())?),
        Classifier::new(cfg.classifier.clone()),
        notifier,
        MonitorOptions::from_config(&cfg.scheduler),
    );
    match activity_log(cfg) {
        Ok(log) => monitor = monitor.with_activity_log(log),
        Err(e) => tracing::warn!(error = %e, "activity log disabled"),
    }
    Ok(Arc::new(monitor))
}

async fn check(cfg: &Config, args: CheckArgs) -> crate::Result<serde_json::Value> {
    let target = Target::new(&args.url)?;
    let params = SearchParams::new(
        parse_date(&args.checkin)?,
        parse_date(&args.checkout)?,
        Occupancy::new(args.occupancy)?,
    )?;
    let fetcher = HttpFetcher::new(cfg.fetch.clone())?;
    let classifier = Classifier::new(cfg.classifier.clone());
    let ins = engine::inspect(&fetcher, &classifier, &target, &params).await?;
    Ok(serde_json::json!({
        "available": ins.verdict.available,
        "reason": ins.verdict.reason,
        "rule": ins.verdict.rule,
        "url": ins.page.final_url,
        "status": ins.page.status,
        "bytes": ins.page.body.len(),
    }))
}

/// Poll in the background, feed stdin to the handler, stop on Ctrl-C.
async fn serve(
    monitor: Arc<Monitor>,
    handler: Arc<CommandHandler>,
    read_stdin: bool,
) -> anyhow::Result<()> {
    let (stop_tx, stop_rx) = watch::channel(false);
    let poller = {
        let monitor = monitor.clone();
        runtime::spawn(async move { monitor.run(stop_rx).await })
    };
    let console = read_stdin.then(|| runtime::spawn(console(handler.clone())));

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    tracing::info!("shutting down");
    let _ = stop_tx.send(true);
    if let Some(console) = console {
        console.abort();
    }
    handler.shutdown().await;
    poller.await.context("poll loop panicked")?;
    Ok(())
}

async fn console(handler: Arc<CommandHandler>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some((owner, text)) = line.trim().split_once(char::is_whitespace) else {
                    if !line.trim().is_empty() {
                        eprintln!("expected: <owner> <command…>");
                    }
                    continue;
                };
                let owner = Owner::new(owner);
                let reply = handler.handle(InboundEvent::new(owner.clone(), text)).await;
                println!("[{owner}] {}", reply.text);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        }
    }
}

fn finish<T: serde::Serialize>(res: crate::Result<T>) {
    match res {
        Ok(v) => print_json(ApiResponse::ok(v)),
        Err(e) => print_json(ApiResponse::<()>::err(e.to_string())),
    }
}

fn print_json<T: serde::Serialize>(val: T) {
    match serde_json::to_string_pretty(&val) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("cannot serialize output: {e}"),
    }
}
