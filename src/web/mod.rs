//! Web layer
//!
//! Thin HTTP facade over the core services: handlers validate input,
//! delegate, and map results to status codes. Business logic stays in the
//! orchestrator, lifecycle engine, and repositories.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;

use crate::cache::{ScoreboardCache, TeamLeagueCache};
use crate::config::Config;
use crate::database::Database;
use crate::epg::orchestrator::EpgOrchestrator;
use crate::lifecycle::middleware::ChannelMiddleware;
use crate::lifecycle::scheduler::LifecycleScheduler;
use crate::matching::classifier::{Classifier, CustomExtractors};
use crate::matching::multi_tier::{
    MatcherConfig, MultiTierMatcher, RegistryEventSource, SingleEventLeague,
    SnapshotIndexProvider,
};
use crate::matching::normalizer::Normalizer;
use crate::models::EventGroup;
use crate::providers::{LeagueMappingStore, ProviderRegistry};
use crate::templates::TemplateResolver;

pub mod handlers;

/// Shared application state handed to every handler
pub struct AppState {
    pub config: Config,
    pub database: Database,
    pub registry: Arc<ProviderRegistry>,
    pub mappings: Arc<LeagueMappingStore>,
    pub team_league: Arc<TeamLeagueCache>,
    pub scoreboard_cache: Arc<ScoreboardCache>,
    pub orchestrator: Arc<EpgOrchestrator>,
    pub resolver: Arc<TemplateResolver>,
    pub middleware: Option<Arc<dyn ChannelMiddleware>>,
    pub scheduler: Arc<LifecycleScheduler>,
    /// Last rendered XMLTV document, served until the next generation
    pub last_xmltv: RwLock<Option<String>>,
}

impl AppState {
    /// Run a full EPG generation and cache the rendered XMLTV document
    ///
    /// Shared by the manual API trigger and the cron-driven refresh task.
    pub async fn run_generation(
        &self,
    ) -> Result<crate::models::GenerationReport, crate::errors::AppError> {
        use crate::database::{ChannelRepository, TeamRepository, TemplateRepository};
        use crate::epg::event_channels::build_event_channel_timeline;
        use crate::epg::orchestrator::TeamChannel;
        use crate::lifecycle::engine::ChannelStore;
        use crate::xmltv::{XmltvChannel, XmltvEmitter};

        let team_repo = TeamRepository::new(self.database.pool().clone());
        let template_repo = TemplateRepository::new(self.database.pool().clone());

        let mut teams = Vec::new();
        for config in team_repo.list_active().await? {
            let template = template_repo.for_channel(config.template_id).await?;
            teams.push(TeamChannel { config, template });
        }

        let now = chrono::Utc::now();
        let output = self
            .orchestrator
            .generate(teams.clone(), now, now.timestamp() as u64)
            .await;

        let timezone = self
            .config
            .epg
            .timezone
            .parse()
            .unwrap_or(chrono_tz::America::New_York);
        let mut channels = Vec::new();
        for team in &teams {
            let programs = output
                .programs
                .get(&team.config.channel_id)
                .cloned()
                .unwrap_or_default();
            channels.push((
                XmltvChannel {
                    id: team.config.channel_id.clone(),
                    display_name: team.config.team_name.clone(),
                    icon_url: team.config.team_logo_url.clone(),
                },
                programs,
            ));
        }

        // Live managed event channels ride along in the same document
        let channel_repo = ChannelRepository::new(self.database.pool().clone());
        let default_template = template_repo.for_channel(None).await?;
        for channel in channel_repo.list_live_channels(None).await? {
            let duration = channel
                .sport
                .as_deref()
                .and_then(|sport| self.config.epg.sport_durations.get(sport).copied())
                .unwrap_or(self.config.epg.default_game_duration_hours);
            let programs = build_event_channel_timeline(
                &channel,
                &default_template,
                &self.resolver,
                timezone,
                now,
                duration,
            );
            channels.push((
                XmltvChannel {
                    id: channel.tvg_id.clone(),
                    display_name: channel.channel_name.clone(),
                    icon_url: channel.logo_url.clone(),
                },
                programs,
            ));
        }

        let document = XmltvEmitter::new(timezone)
            .emit(&channels)
            .map_err(|err| crate::errors::AppError::internal(err.to_string()))?;
        *self.last_xmltv.write().await = Some(document);

        Ok(output.report)
    }

    /// Build the group-scoped matcher: the group's candidate leagues,
    /// custom regexes, and exception keywords all shape the pipeline
    pub async fn matcher_for_group(
        &self,
        group: &EventGroup,
    ) -> Result<MultiTierMatcher, crate::errors::AppError> {
        let group_repo = crate::database::GroupRepository::new(self.database.pool().clone());
        let keywords = group_repo
            .list_exception_keywords(&group.exception_keyword_ids)
            .await?;

        let (custom, regex_errors) = CustomExtractors::compile(&group.custom_regex);
        for error in regex_errors {
            tracing::warn!("Group '{}' custom regex ignored: {error}", group.name);
        }

        // Single-event leagues and their keywords come from the league
        // mappings, restricted to this group's candidate set
        let single_event_leagues: Vec<SingleEventLeague> = group
            .candidate_leagues()
            .iter()
            .filter_map(|league| {
                let keywords = self.mappings.single_event_keywords(league);
                if keywords.is_empty() {
                    None
                } else {
                    Some(SingleEventLeague {
                        league: league.clone(),
                        keywords,
                    })
                }
            })
            .collect();
        let mut event_card_keywords: Vec<String> = single_event_leagues
            .iter()
            .flat_map(|league| league.keywords.iter().cloned())
            .collect();
        event_card_keywords.sort();
        event_card_keywords.dedup();

        let league_repo = crate::database::LeagueRepository::new(self.database.pool().clone());
        let aliases = league_repo.list_aliases().await?;

        let snapshot = self.team_league.snapshot();
        Ok(MultiTierMatcher::new(
            Normalizer::new(keywords),
            Classifier::new(event_card_keywords).with_custom_extractors(custom),
            Arc::new(RegistryEventSource::new(self.registry.clone())),
            Arc::new(SnapshotIndexProvider::new(snapshot.clone(), aliases)),
            snapshot,
            self.mappings.clone(),
            MatcherConfig {
                candidate_leagues: group.candidate_leagues().to_vec(),
                include_final_events: false,
                single_event_leagues,
                max_alternates: 5,
            },
        ))
    }
}

pub struct WebServer {
    app: Router,
    addr: SocketAddr,
}

impl WebServer {
    pub fn new(state: Arc<AppState>) -> Result<Self> {
        let addr: SocketAddr =
            format!("{}:{}", state.config.web.host, state.config.web.port).parse()?;

        let app = Router::new()
            .route("/health", get(handlers::health))
            .route("/xmltv", get(handlers::xmltv))
            .route("/api/epg/generate", post(handlers::generate_epg))
            .route("/api/providers/status", get(handlers::provider_status))
            .route("/api/teams", get(handlers::list_teams).post(handlers::create_team))
            .route(
                "/api/groups",
                get(handlers::list_groups).post(handlers::create_group),
            )
            .route("/api/groups/:id/refresh", post(handlers::refresh_group))
            .route("/api/lifecycle/run", post(handlers::run_lifecycle))
            .layer(CorsLayer::permissive())
            .with_state(state);

        Ok(Self { app, addr })
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub async fn serve(self) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        axum::serve(listener, self.app).await?;
        Ok(())
    }
}
