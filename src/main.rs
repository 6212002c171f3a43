use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use teamguide::cache::{ScoreboardCache, TeamLeagueCache, TeamLeagueSnapshot};
use teamguide::config::Config;
use teamguide::database::{
    leagues::default_mappings, ChannelRepository, Database, LeagueRepository,
};
use teamguide::epg::orchestrator::EpgOrchestrator;
use teamguide::lifecycle::engine::{CreateTiming, LifecycleEngine};
use teamguide::lifecycle::middleware::{ChannelMiddleware, HttpMiddleware};
use teamguide::lifecycle::reconcile::Reconciler;
use teamguide::lifecycle::scheduler::LifecycleScheduler;
use teamguide::matching::classifier::Classifier;
use teamguide::matching::multi_tier::{
    MatcherConfig, MultiTierMatcher, RegistryEventSource, SnapshotIndexProvider,
};
use teamguide::matching::normalizer::Normalizer;
use teamguide::providers::espn::EspnClient;
use teamguide::providers::tsdb::TsdbClient;
use teamguide::providers::{LeagueMappingStore, ProviderRegistry};
use teamguide::templates::TemplateResolver;
use teamguide::web::{AppState, WebServer};

#[derive(Parser)]
#[command(name = "teamguide")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sports-team EPG generator with event channel lifecycle management")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Listening IP address
    #[arg(short = 'H', long, value_name = "IP")]
    host: Option<String>,

    /// Listening port
    #[arg(short, long, value_name = "PORT")]
    port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(short = 'd', long, value_name = "URL")]
    database_url: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("teamguide={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting teamguide v{}", env!("CARGO_PKG_VERSION"));

    std::env::set_var("CONFIG_FILE", &cli.config);
    let mut config = Config::load()?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(host) = cli.host {
        config.web.host = host;
    }
    if let Some(port) = cli.port {
        config.web.port = port;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    info!("Using database: {}", config.database.url);
    let database = Database::new(&config.database).await?;
    database.migrate().await?;
    info!("Database connection established and migrations applied");

    // League mappings: seed the built-in set on first run, then serve the
    // whole table from memory
    let league_repo = LeagueRepository::new(database.pool().clone());
    if league_repo.list_mappings().await?.is_empty() {
        for mapping in default_mappings() {
            league_repo.upsert_mapping(&mapping).await?;
        }
        info!("Seeded default league mappings");
    }
    let mappings = Arc::new(LeagueMappingStore::new(league_repo.list_mappings().await?));

    // Providers, priority order: ESPN first, TheSportsDB fallback
    let timeout = Duration::from_secs(config.providers.request_timeout_secs);
    let retry_delay = Duration::from_secs(config.providers.retry_delay_secs);
    let mut registry = ProviderRegistry::new();
    registry.register(
        "espn",
        0,
        true,
        Arc::new(EspnClient::new(
            mappings.clone(),
            timeout,
            config.providers.retry_count,
            retry_delay,
        )),
    );
    registry.register(
        "tsdb",
        10,
        true,
        Arc::new(TsdbClient::new(
            mappings.clone(),
            config.providers.tsdb_api_key.clone(),
            config.providers.tsdb_requests_per_minute,
            timeout,
            config.providers.retry_count,
            retry_delay,
        )),
    );
    let registry = Arc::new(registry);

    // Team/league cache: warm from the database immediately, then refresh
    // from providers on a schedule
    let team_league = Arc::new(TeamLeagueCache::new());
    let cached_rows = league_repo.load_team_cache().await?;
    let memberships = league_repo.load_soccer_memberships().await?;
    if !cached_rows.is_empty() {
        team_league.install(TeamLeagueSnapshot::build(cached_rows, memberships.clone()));
        info!("Team/league cache warmed from database");
    }
    {
        let team_league = team_league.clone();
        let registry = registry.clone();
        let mappings = mappings.clone();
        let league_repo = league_repo.clone();
        let refresh_days = config.providers.team_cache_refresh_days.max(1);
        let workers = config.providers.team_cache_refresh_workers;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(
                u64::from(refresh_days) * 24 * 3600,
            ));
            loop {
                ticker.tick().await;
                let memberships = league_repo
                    .load_soccer_memberships()
                    .await
                    .unwrap_or_default();
                match team_league
                    .refresh_from_providers(&registry, &mappings, memberships, workers)
                    .await
                {
                    Ok(rows) => {
                        if let Err(err) = league_repo.replace_team_cache(&rows).await {
                            warn!("Persisting team/league cache failed: {err}");
                        }
                    }
                    Err(err) => warn!("Team/league cache refresh failed: {err}"),
                }
            }
        });
    }

    let resolver = Arc::new(TemplateResolver::standard());
    let scoreboard_cache = Arc::new(ScoreboardCache::new());
    let orchestrator = Arc::new(EpgOrchestrator::new(
        registry.clone(),
        mappings.clone(),
        scoreboard_cache.clone(),
        team_league.clone(),
        resolver.clone(),
        config.epg.clone(),
    ));

    // Downstream middleware is optional; without it, event groups are off
    let middleware: Option<Arc<dyn ChannelMiddleware>> =
        config.lifecycle.middleware_url.clone().map(|url| {
            Arc::new(HttpMiddleware::new(
                url,
                config.lifecycle.middleware_token.clone(),
                timeout,
            )) as Arc<dyn ChannelMiddleware>
        });

    let channel_store = Arc::new(ChannelRepository::new(database.pool().clone()));
    let scheduler = match &middleware {
        Some(middleware) => {
            // The scheduler's engine only processes deletions; its matcher
            // never runs, so an empty candidate set is fine
            let snapshot = team_league.snapshot();
            let idle_matcher = Arc::new(MultiTierMatcher::new(
                Normalizer::new(Vec::new()),
                Classifier::new(Vec::new()),
                Arc::new(RegistryEventSource::new(registry.clone())),
                Arc::new(SnapshotIndexProvider::new(snapshot.clone(), Vec::new())),
                snapshot,
                mappings.clone(),
                MatcherConfig::default(),
            ));
            let engine = Arc::new(LifecycleEngine::new(
                channel_store.clone(),
                middleware.clone(),
                idle_matcher,
                "espn".to_string(),
                Vec::new(),
                CreateTiming::Immediate,
                config.lifecycle.delete_grace_minutes,
                config.epg.sport_durations.clone(),
                config.epg.default_game_duration_hours,
                None,
            ));
            let reconciler = Arc::new(Reconciler::new(
                channel_store.clone(),
                middleware.clone(),
                "espn.".to_string(),
            ));
            Arc::new(LifecycleScheduler::new(
                engine,
                reconciler,
                channel_store.clone(),
                config.lifecycle.interval_minutes,
                config.lifecycle.history_retention_days,
                config.lifecycle.reconcile_on_tick,
            ))
        }
        None => {
            info!("No middleware configured; lifecycle scheduler runs maintenance only");
            let snapshot = team_league.snapshot();
            let idle_matcher = Arc::new(MultiTierMatcher::new(
                Normalizer::new(Vec::new()),
                Classifier::new(Vec::new()),
                Arc::new(RegistryEventSource::new(registry.clone())),
                Arc::new(SnapshotIndexProvider::new(snapshot.clone(), Vec::new())),
                snapshot,
                mappings.clone(),
                MatcherConfig::default(),
            ));
            let noop: Arc<dyn ChannelMiddleware> =
                Arc::new(teamguide::lifecycle::middleware::NoopMiddleware);
            let engine = Arc::new(LifecycleEngine::new(
                channel_store.clone(),
                noop.clone(),
                idle_matcher,
                "espn".to_string(),
                Vec::new(),
                CreateTiming::Immediate,
                config.lifecycle.delete_grace_minutes,
                config.epg.sport_durations.clone(),
                config.epg.default_game_duration_hours,
                None,
            ));
            let reconciler = Arc::new(Reconciler::new(
                channel_store.clone(),
                noop,
                "espn.".to_string(),
            ));
            Arc::new(LifecycleScheduler::new(
                engine,
                reconciler,
                channel_store.clone(),
                config.lifecycle.interval_minutes,
                config.lifecycle.history_retention_days,
                false,
            ))
        }
    };

    {
        let scheduler = scheduler.clone();
        tokio::spawn(async move {
            scheduler.run().await;
        });
    }
    info!("Lifecycle scheduler started");

    let state = Arc::new(AppState {
        config: config.clone(),
        database,
        registry,
        mappings,
        team_league,
        scoreboard_cache,
        orchestrator,
        resolver,
        middleware,
        scheduler,
        last_xmltv: tokio::sync::RwLock::new(None),
    });

    // Scheduled EPG regeneration
    match config.epg.refresh_cron.parse::<cron::Schedule>() {
        Ok(schedule) => {
            let state = state.clone();
            tokio::spawn(async move {
                loop {
                    let Some(next) = schedule.upcoming(chrono::Utc).next() else {
                        break;
                    };
                    let wait = (next - chrono::Utc::now())
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    tokio::time::sleep(wait).await;
                    info!("Scheduled EPG refresh starting");
                    match state.run_generation().await {
                        Ok(report) => info!(
                            "Scheduled EPG refresh complete: {} channels, {} programs",
                            report.channels_generated, report.num_programs
                        ),
                        Err(err) => warn!("Scheduled EPG refresh failed: {err}"),
                    }
                }
            });
        }
        Err(err) => warn!(
            "Invalid refresh cron '{}', scheduled generation disabled: {err}",
            config.epg.refresh_cron
        ),
    }

    let web_server = WebServer::new(state)?;
    info!(
        "Starting web server on {}:{}",
        web_server.host(),
        web_server.port()
    );
    if let Err(err) = web_server.serve().await {
        error!("Web server failed: {err}");
        return Err(err);
    }

    Ok(())
}
