use anyhow::Result;
use clap::{CommandFactory, Parser};
use gpuview::cli::{Cli, Commands};
use gpuview::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let debug = matches!(cli.command, Some(Commands::Run { debug: true, .. }));
    init_tracing(debug);

    let mut app_config = config::AppConfig::load()?;
    let registry = Arc::new(registry::HostRegistry::new(&app_config.registry.path));

    match cli.command {
        Some(Commands::Run {
            host,
            port,
            debug: _,
            exclude_self,
        }) => {
            if let Some(h) = host {
                app_config.server.host = h;
            }
            if let Some(p) = port {
                app_config.server.port = p;
            }
            app_config.peers.exclude_self |= exclude_self;
            serve(app_config, registry).await?;
        }
        Some(Commands::Add { url, name }) => {
            let entry = registry.add(&url, name.as_deref())?;
            println!("Successfully added host {} ({})!", entry.display_name, entry.url);
        }
        Some(Commands::Remove { url }) => {
            if registry.remove(&url)? {
                println!("Removed host: {}!", url);
            } else {
                println!("Couldn't find host: {}!", url);
            }
        }
        Some(Commands::Hosts) => {
            let entries = registry.list()?;
            if !entries.is_empty() {
                print!("{}", registry::format_listing(&entries));
            }
        }
        Some(Commands::Service { host, port }) => {
            let args = cli::service_args(host.as_deref(), port);
            let script = cli::resolve_script(&app_config.service.script, &std::env::current_dir()?);
            cli::run_service_script(&script, &args).await?;
        }
        None => {
            Cli::command().print_help()?;
        }
    }

    Ok(())
}

async fn serve(app_config: config::AppConfig, registry: Arc<registry::HostRegistry>) -> Result<()> {
    let sysinfo_repo = Arc::new(sysinfo_repo::SysinfoRepo::new(Duration::from_millis(
        app_config.sampling.cpu_window_ms,
    )));
    let docker_repo = Arc::new(docker_repo::DockerRepo::connect_or_disabled());
    let inspector = Arc::new(attribution::SystemInspector::new(
        docker_repo,
        sysinfo_repo.clone(),
    ));
    let collector = Arc::new(collector::LocalCollector::new(
        Arc::new(gpu_repo::NvidiaSmi::default()),
        sysinfo_repo,
        attribution::ProcessAttributor::new(inspector),
        app_config.disks.clone(),
    ));
    let aggregator = Arc::new(aggregator::FleetAggregator::new(
        collector.clone(),
        registry,
        &app_config.peers,
    )?);

    let app = routes::app(collector, aggregator);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
        }
    }

    Ok(())
}
