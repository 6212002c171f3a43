//! Channel lifecycle engine
//!
//! Given an event group and the middleware's stream pool: filter the pool,
//! match every remaining stream to an event, then drive managed channels to
//! the matching state. Create-timing and delete-timing policies decide when
//! channels appear and when they retire; exception keywords can split a
//! stream onto its own channel or consolidate it onto the event's main one.
//! At most one live managed channel exists per (event, group, keyword).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::errors::RepositoryError;
use crate::matching::keywords::check_exception_keyword;
use crate::matching::multi_tier::{MatchOutcome, MultiTierMatcher, StreamMatch};
use crate::matching::stream_filter::filter_game_streams;
use crate::matching::{stream_fingerprint, MatchTier};
use crate::models::{
    EventGroup, ExceptionKeyword, KeywordBehavior, ManagedChannel, Stream, StreamCacheEntry,
    SyncStatus,
};

use super::middleware::{ChannelMiddleware, ChannelPatch, ChannelSpec};

/// When a channel is created relative to its event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateTiming {
    Immediate,
    /// Create no earlier than N hours before the event start
    HoursBefore(i64),
}

/// A stream attachment as persisted
#[derive(Debug, Clone)]
pub struct StreamAttachment {
    pub stream_id: i64,
    pub stream_name: String,
    pub m3u_account: Option<String>,
    pub priority: i64,
    pub exception_keyword: Option<String>,
}

/// Fields for a new managed channel row
#[derive(Debug, Clone)]
pub struct NewManagedChannel {
    pub group_id: i64,
    pub event_id: String,
    pub provider: String,
    pub tvg_id: String,
    pub channel_name: String,
    pub logo_url: Option<String>,
    pub exception_keyword: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub event_start: Option<DateTime<Utc>>,
    pub event_name: Option<String>,
    pub league: Option<String>,
    pub sport: Option<String>,
    pub scheduled_delete_at: Option<DateTime<Utc>>,
}

/// Persistence surface the engine drives
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Live or deleted channel for (group, event, keyword)
    async fn find_channel(
        &self,
        group_id: i64,
        event_id: &str,
        keyword: Option<&str>,
    ) -> Result<Option<ManagedChannel>, RepositoryError>;

    async fn insert_channel(
        &self,
        channel: NewManagedChannel,
    ) -> Result<ManagedChannel, RepositoryError>;

    async fn set_middleware_id(
        &self,
        channel_id: i64,
        middleware_id: Option<i64>,
    ) -> Result<(), RepositoryError>;

    async fn set_sync_status(
        &self,
        channel_id: i64,
        status: SyncStatus,
        message: Option<String>,
    ) -> Result<(), RepositoryError>;

    async fn set_scheduled_delete(
        &self,
        channel_id: i64,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError>;

    /// Clear deleted_at/delete_reason on a soft-deleted channel
    async fn reactivate_channel(&self, channel_id: i64) -> Result<(), RepositoryError>;

    async fn mark_deleted(
        &self,
        channel_id: i64,
        reason: &str,
    ) -> Result<(), RepositoryError>;

    async fn replace_streams(
        &self,
        channel_id: i64,
        streams: Vec<StreamAttachment>,
    ) -> Result<(), RepositoryError>;

    async fn list_live_channels(
        &self,
        group_id: Option<i64>,
    ) -> Result<Vec<ManagedChannel>, RepositoryError>;

    async fn list_due_for_deletion(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ManagedChannel>, RepositoryError>;

    async fn prune_history(&self, older_than: DateTime<Utc>) -> Result<u64, RepositoryError>;

    async fn get_cached_match(
        &self,
        fingerprint: &str,
    ) -> Result<Option<StreamCacheEntry>, RepositoryError>;

    async fn put_cached_match(&self, entry: StreamCacheEntry) -> Result<(), RepositoryError>;
}

#[derive(Debug, Default, Clone)]
pub struct RefreshSummary {
    pub total_streams: usize,
    pub game_streams: usize,
    pub matched: usize,
    pub matched_from_cache: usize,
    pub channels_created: usize,
    pub channels_updated: usize,
    pub channels_reactivated: usize,
    pub skipped_not_due: usize,
    pub errors: Vec<String>,
}

struct MatchedStream {
    stream: Stream,
    matched: StreamMatch,
    keyword: Option<(String, KeywordBehavior)>,
}

/// What applying a channel decision did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ApplyOutcome {
    Created,
    Updated,
    Reactivated,
}

pub struct LifecycleEngine {
    store: Arc<dyn ChannelStore>,
    middleware: Arc<dyn ChannelMiddleware>,
    matcher: Arc<MultiTierMatcher>,
    /// Provider namespace stamped into tvg-ids and channel rows
    provider_name: String,
    exception_keywords: Vec<ExceptionKeyword>,
    create_timing: CreateTiming,
    delete_grace: Duration,
    /// Per-sport event duration assumptions (sport code -> hours)
    sport_durations: HashMap<String, f64>,
    /// Fallback hours when a sport has no entry
    default_duration_hours: f64,
    /// Template duration override for this group, beating the sport table
    duration_override_hours: Option<f64>,
}

impl LifecycleEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn ChannelStore>,
        middleware: Arc<dyn ChannelMiddleware>,
        matcher: Arc<MultiTierMatcher>,
        provider_name: String,
        exception_keywords: Vec<ExceptionKeyword>,
        create_timing: CreateTiming,
        delete_grace_minutes: i64,
        sport_durations: HashMap<String, f64>,
        default_duration_hours: f64,
        duration_override_hours: Option<f64>,
    ) -> Self {
        Self {
            store,
            middleware,
            matcher,
            provider_name,
            exception_keywords,
            create_timing,
            delete_grace: Duration::minutes(delete_grace_minutes),
            sport_durations,
            default_duration_hours,
            duration_override_hours,
        }
    }

    /// Estimated event duration: template override, then the sport's
    /// configured duration, then the global default
    fn event_duration(&self, sport: &str) -> Duration {
        let hours = self
            .duration_override_hours
            .or_else(|| self.sport_durations.get(&sport.to_lowercase()).copied())
            .unwrap_or(self.default_duration_hours);
        Duration::seconds((hours * 3600.0) as i64)
    }

    /// Stable EPG key for an event's channel, unchanged for the event's
    /// lifetime; keyword channels get their own suffix
    pub fn event_tvg_id(provider: &str, event_id: &str, keyword: Option<&str>) -> String {
        match keyword {
            Some(keyword) => format!(
                "{provider}.{event_id}.{}",
                keyword.to_lowercase().replace(' ', "-")
            ),
            None => format!("{provider}.{event_id}"),
        }
    }

    /// Run one event group against a stream pool
    pub async fn refresh_group(
        &self,
        group: &EventGroup,
        streams: Vec<Stream>,
        now: DateTime<Utc>,
    ) -> RefreshSummary {
        let mut summary = RefreshSummary {
            total_streams: streams.len(),
            ..Default::default()
        };

        let include = group
            .include_regex
            .as_deref()
            .and_then(|pattern| regex::Regex::new(pattern).ok());
        let exclude = group
            .exclude_regex
            .as_deref()
            .and_then(|pattern| regex::Regex::new(pattern).ok());
        let filtered = filter_game_streams(streams, include.as_ref(), exclude.as_ref());
        summary.game_streams = filtered.game_streams.len();

        // Match every surviving stream; exception-keyword streams are
        // partitioned up front and carry their keyword through
        let mut matched_streams: Vec<MatchedStream> = Vec::new();
        for stream in filtered.game_streams {
            let keyword = check_exception_keyword(&stream.name, &self.exception_keywords)
                .map(|hit| (hit.canonical, hit.behavior));

            match self.match_with_cache(group, &stream, now, &mut summary).await {
                Some(matched) => {
                    summary.matched += 1;
                    matched_streams.push(MatchedStream {
                        stream,
                        matched,
                        keyword,
                    });
                }
                None => {
                    debug!("No match for stream '{}'", stream.name);
                }
            }
        }

        // Group onto channel keys: consolidated keywords join the event's
        // main channel, separate keywords get their own
        let mut by_channel: HashMap<(String, Option<String>), Vec<MatchedStream>> = HashMap::new();
        for matched in matched_streams {
            let key = match &matched.keyword {
                Some((canonical, KeywordBehavior::Separate)) => (
                    matched.matched.event.id.clone(),
                    Some(canonical.clone()),
                ),
                _ => (matched.matched.event.id.clone(), None),
            };
            by_channel.entry(key).or_default().push(matched);
        }

        for ((event_id, keyword), mut members) in by_channel {
            // Primary stream priority: lowest stream id leads unless pinned
            members.sort_by_key(|member| member.stream.id);

            let event = &members[0].matched.event;

            // Create-timing policy
            if let CreateTiming::HoursBefore(hours) = self.create_timing {
                if event.start - Duration::hours(hours) > now {
                    summary.skipped_not_due += 1;
                    continue;
                }
            }

            match self
                .apply_channel(group, &event_id, keyword.as_deref(), &members, now)
                .await
            {
                Ok(ApplyOutcome::Created) => summary.channels_created += 1,
                Ok(ApplyOutcome::Updated) => summary.channels_updated += 1,
                Ok(ApplyOutcome::Reactivated) => summary.channels_reactivated += 1,
                Err(err) => {
                    warn!("Channel apply failed for event {event_id}: {err}");
                    summary.errors.push(format!("event {event_id}: {err}"));
                }
            }
        }

        summary
    }

    async fn match_with_cache(
        &self,
        group: &EventGroup,
        stream: &Stream,
        now: DateTime<Utc>,
        summary: &mut RefreshSummary,
    ) -> Option<StreamMatch> {
        let today = now.date_naive();
        let fingerprint = stream_fingerprint(&stream.name.to_lowercase(), today);

        // A valid cache entry pins the (event, league) pair from the last
        // generation, so only a targeted single-league match is needed
        if let Ok(Some(entry)) = self.store.get_cached_match(&fingerprint).await {
            if entry.group_id == group.id && entry.generation == group.generation {
                let tier = MatchTier::parse(&entry.match_tier).unwrap_or(MatchTier::Tier3c);
                if let Some(matched) = self
                    .matcher
                    .match_in_league(&entry.league, &stream.name, tier, now)
                    .await
                {
                    if matched.event.id == entry.event_id {
                        summary.matched_from_cache += 1;
                        return Some(matched);
                    }
                }
                // Fingerprint matched but the event moved; fall through to a
                // full re-match
            }
        }

        match self.matcher.match_stream(&stream.name, now).await {
            MatchOutcome::Matched(matched) => {
                let entry = StreamCacheEntry {
                    fingerprint,
                    group_id: group.id,
                    event_id: matched.event.id.clone(),
                    league: matched.league.clone(),
                    match_tier: matched.tier.as_str().to_string(),
                    generation: group.generation,
                    last_seen: now,
                };
                if let Err(err) = self.store.put_cached_match(entry).await {
                    debug!("Stream match cache write failed: {err}");
                }
                Some(matched)
            }
            MatchOutcome::Miss(_) => None,
        }
    }

    async fn apply_channel(
        &self,
        group: &EventGroup,
        event_id: &str,
        keyword: Option<&str>,
        members: &[MatchedStream],
        now: DateTime<Utc>,
    ) -> Result<ApplyOutcome, RepositoryError> {
        let event = &members[0].matched.event;
        let league = &members[0].matched.league;
        let provider = self.provider_name.as_str();

        let grace = group
            .delete_grace_minutes
            .map(Duration::minutes)
            .unwrap_or(self.delete_grace);
        let event_end = event.start + self.event_duration(&event.sport);
        let scheduled_delete_at = event_end + grace;

        let attachments: Vec<StreamAttachment> = members
            .iter()
            .enumerate()
            .map(|(idx, member)| StreamAttachment {
                stream_id: member.stream.id,
                stream_name: member.stream.name.clone(),
                m3u_account: member.stream.m3u_account.clone(),
                priority: idx as i64,
                exception_keyword: member
                    .keyword
                    .as_ref()
                    .map(|(canonical, _)| canonical.clone()),
            })
            .collect();
        let stream_ids: Vec<i64> = attachments.iter().map(|a| a.stream_id).collect();

        let channel_name = match keyword {
            Some(keyword) => format!(
                "{} ({keyword})",
                event.name.clone().unwrap_or_else(|| format!(
                    "{} @ {}",
                    event.away_team.name, event.home_team.name
                ))
            ),
            None => event.name.clone().unwrap_or_else(|| {
                format!("{} @ {}", event.away_team.name, event.home_team.name)
            }),
        };

        let existing = self.store.find_channel(group.id, event_id, keyword).await?;

        let mut outcome = ApplyOutcome::Updated;
        let channel = match existing {
            None => {
                outcome = ApplyOutcome::Created;
                let created = self
                    .store
                    .insert_channel(NewManagedChannel {
                        group_id: group.id,
                        event_id: event_id.to_string(),
                        provider: provider.to_string(),
                        tvg_id: Self::event_tvg_id(provider, event_id, keyword),
                        channel_name: channel_name.clone(),
                        logo_url: event.home_team.logo_url.clone(),
                        exception_keyword: keyword.map(String::from),
                        home_team: Some(event.home_team.name.clone()),
                        away_team: Some(event.away_team.name.clone()),
                        event_start: Some(event.start),
                        event_name: event.name.clone(),
                        league: Some(league.clone()),
                        sport: Some(event.sport.clone()),
                        scheduled_delete_at: Some(scheduled_delete_at),
                    })
                    .await?;
                info!(
                    "Created managed channel '{}' for event {event_id}",
                    created.channel_name
                );
                created
            }
            Some(channel) if channel.is_deleted() => {
                // Event still in window: bring the channel back
                if event_end + grace > now {
                    self.store.reactivate_channel(channel.id).await?;
                    info!("Reactivated managed channel '{}'", channel.channel_name);
                    outcome = ApplyOutcome::Reactivated;
                }
                channel
            }
            Some(channel) => channel,
        };

        self.store
            .set_scheduled_delete(channel.id, scheduled_delete_at)
            .await?;
        self.store
            .replace_streams(channel.id, attachments)
            .await?;

        // Pinned primary stream overrides lowest-id ordering
        let ordered_ids: Vec<i64> = match channel.primary_stream_id {
            Some(pinned) if stream_ids.contains(&pinned) => {
                let mut ids = vec![pinned];
                ids.extend(stream_ids.iter().copied().filter(|id| *id != pinned));
                ids
            }
            _ => stream_ids,
        };

        // Push to the middleware and track sync state
        let sync_result = match channel.middleware_channel_id {
            None => {
                self.middleware
                    .create_channel(ChannelSpec {
                        tvg_id: channel.tvg_id.clone(),
                        name: channel_name.clone(),
                        logo_url: channel.logo_url.clone(),
                        group_id: None,
                        stream_ids: ordered_ids,
                    })
                    .await
                    .map(|created| Some(created.id))
            }
            Some(middleware_id) => self
                .middleware
                .update_channel(
                    middleware_id,
                    ChannelPatch {
                        name: Some(channel_name.clone()),
                        logo_url: None,
                        stream_ids: Some(ordered_ids),
                    },
                )
                .await
                .map(|_| Some(middleware_id)),
        };

        match sync_result {
            Ok(middleware_id) => {
                self.store.set_middleware_id(channel.id, middleware_id).await?;
                self.store
                    .set_sync_status(channel.id, SyncStatus::Synced, None)
                    .await?;
            }
            Err(err) => {
                self.store
                    .set_sync_status(channel.id, SyncStatus::Error, Some(err.to_string()))
                    .await?;
            }
        }

        Ok(outcome)
    }

    /// Delete every channel past its scheduled delete time
    pub async fn process_scheduled_deletions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<ManagedChannel>, RepositoryError> {
        let due = self.store.list_due_for_deletion(now).await?;
        let mut deleted = Vec::new();

        for channel in due {
            if let Some(middleware_id) = channel.middleware_channel_id {
                if let Err(err) = self.middleware.delete_channel(middleware_id).await {
                    warn!(
                        "Middleware delete failed for channel {}: {err}",
                        channel.channel_name
                    );
                    self.store
                        .set_sync_status(channel.id, SyncStatus::Error, Some(err.to_string()))
                        .await?;
                    continue;
                }
            }
            self.store
                .mark_deleted(channel.id, "scheduled deletion after event end")
                .await?;
            info!("Deleted managed channel '{}'", channel.channel_name);
            deleted.push(channel);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
pub(crate) mod memory_store {
    use super::*;
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::Mutex;

    /// In-memory ChannelStore for engine and scheduler tests
    #[derive(Default)]
    pub struct MemoryStore {
        next_id: AtomicI64,
        pub channels: Mutex<Vec<ManagedChannel>>,
        pub streams: Mutex<HashMap<i64, Vec<StreamAttachment>>>,
        pub cache: Mutex<HashMap<String, StreamCacheEntry>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self {
                next_id: AtomicI64::new(1),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl ChannelStore for MemoryStore {
        async fn find_channel(
            &self,
            group_id: i64,
            event_id: &str,
            keyword: Option<&str>,
        ) -> Result<Option<ManagedChannel>, RepositoryError> {
            Ok(self
                .channels
                .lock()
                .expect("lock poisoned")
                .iter()
                .find(|channel| {
                    channel.group_id == group_id
                        && channel.event_id == event_id
                        && channel.exception_keyword.as_deref() == keyword
                })
                .cloned())
        }

        async fn insert_channel(
            &self,
            new: NewManagedChannel,
        ) -> Result<ManagedChannel, RepositoryError> {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            let now = Utc::now();
            let channel = ManagedChannel {
                id,
                group_id: new.group_id,
                event_id: new.event_id,
                provider: new.provider,
                tvg_id: new.tvg_id,
                channel_name: new.channel_name,
                logo_url: new.logo_url,
                middleware_channel_id: None,
                exception_keyword: new.exception_keyword,
                primary_stream_id: None,
                home_team: new.home_team,
                away_team: new.away_team,
                event_start: new.event_start,
                event_name: new.event_name,
                league: new.league,
                sport: new.sport,
                scheduled_delete_at: new.scheduled_delete_at,
                deleted_at: None,
                delete_reason: None,
                sync_status: SyncStatus::Pending,
                sync_message: None,
                created_at: now,
                updated_at: now,
            };
            self.channels
                .lock()
                .expect("lock poisoned")
                .push(channel.clone());
            Ok(channel)
        }

        async fn set_middleware_id(
            &self,
            channel_id: i64,
            middleware_id: Option<i64>,
        ) -> Result<(), RepositoryError> {
            let mut channels = self.channels.lock().expect("lock poisoned");
            if let Some(channel) = channels.iter_mut().find(|c| c.id == channel_id) {
                channel.middleware_channel_id = middleware_id;
            }
            Ok(())
        }

        async fn set_sync_status(
            &self,
            channel_id: i64,
            status: SyncStatus,
            message: Option<String>,
        ) -> Result<(), RepositoryError> {
            let mut channels = self.channels.lock().expect("lock poisoned");
            if let Some(channel) = channels.iter_mut().find(|c| c.id == channel_id) {
                channel.sync_status = status;
                channel.sync_message = message;
            }
            Ok(())
        }

        async fn set_scheduled_delete(
            &self,
            channel_id: i64,
            at: DateTime<Utc>,
        ) -> Result<(), RepositoryError> {
            let mut channels = self.channels.lock().expect("lock poisoned");
            if let Some(channel) = channels.iter_mut().find(|c| c.id == channel_id) {
                channel.scheduled_delete_at = Some(at);
            }
            Ok(())
        }

        async fn reactivate_channel(&self, channel_id: i64) -> Result<(), RepositoryError> {
            let mut channels = self.channels.lock().expect("lock poisoned");
            if let Some(channel) = channels.iter_mut().find(|c| c.id == channel_id) {
                channel.deleted_at = None;
                channel.delete_reason = None;
            }
            Ok(())
        }

        async fn mark_deleted(
            &self,
            channel_id: i64,
            reason: &str,
        ) -> Result<(), RepositoryError> {
            let mut channels = self.channels.lock().expect("lock poisoned");
            if let Some(channel) = channels.iter_mut().find(|c| c.id == channel_id) {
                channel.deleted_at = Some(Utc::now());
                channel.delete_reason = Some(reason.to_string());
            }
            Ok(())
        }

        async fn replace_streams(
            &self,
            channel_id: i64,
            streams: Vec<StreamAttachment>,
        ) -> Result<(), RepositoryError> {
            self.streams
                .lock()
                .expect("lock poisoned")
                .insert(channel_id, streams);
            Ok(())
        }

        async fn list_live_channels(
            &self,
            group_id: Option<i64>,
        ) -> Result<Vec<ManagedChannel>, RepositoryError> {
            Ok(self
                .channels
                .lock()
                .expect("lock poisoned")
                .iter()
                .filter(|channel| !channel.is_deleted())
                .filter(|channel| group_id.map(|id| channel.group_id == id).unwrap_or(true))
                .cloned()
                .collect())
        }

        async fn list_due_for_deletion(
            &self,
            now: DateTime<Utc>,
        ) -> Result<Vec<ManagedChannel>, RepositoryError> {
            Ok(self
                .channels
                .lock()
                .expect("lock poisoned")
                .iter()
                .filter(|channel| channel.is_due_for_deletion(now))
                .cloned()
                .collect())
        }

        async fn prune_history(
            &self,
            older_than: DateTime<Utc>,
        ) -> Result<u64, RepositoryError> {
            let mut channels = self.channels.lock().expect("lock poisoned");
            let before = channels.len();
            channels.retain(|channel| {
                channel
                    .deleted_at
                    .map(|deleted| deleted >= older_than)
                    .unwrap_or(true)
            });
            Ok((before - channels.len()) as u64)
        }

        async fn get_cached_match(
            &self,
            fingerprint: &str,
        ) -> Result<Option<StreamCacheEntry>, RepositoryError> {
            Ok(self
                .cache
                .lock()
                .expect("lock poisoned")
                .get(fingerprint)
                .cloned())
        }

        async fn put_cached_match(&self, entry: StreamCacheEntry) -> Result<(), RepositoryError> {
            self.cache
                .lock()
                .expect("lock poisoned")
                .insert(entry.fingerprint.clone(), entry);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory_store::MemoryStore;
    use super::*;
    use crate::cache::TeamLeagueSnapshot;
    use crate::lifecycle::middleware::mock::MockMiddleware;
    use crate::matching::classifier::Classifier;
    use crate::matching::multi_tier::{
        EventSource, MatcherConfig, SnapshotIndexProvider, TeamIndexProvider,
    };
    use crate::matching::normalizer::Normalizer;
    use crate::models::group::CustomRegexConfig;
    use crate::models::{Event, EventStatus, LeagueMapping, Team, TeamLeagueRow, Venue};
    use crate::providers::LeagueMappingStore;
    use chrono::{NaiveDate, TimeZone};

    struct FixtureEvents {
        schedule: Vec<Event>,
    }

    #[async_trait]
    impl EventSource for FixtureEvents {
        async fn team_schedule(&self, team_id: &str, _league: &str) -> Vec<Event> {
            self.schedule
                .iter()
                .filter(|event| event.involves_team(team_id))
                .cloned()
                .collect()
        }
        async fn league_events(&self, _league: &str, _date: NaiveDate) -> Vec<Event> {
            Vec::new()
        }
    }

    fn game_event(id: &str, start: DateTime<Utc>) -> Event {
        Event {
            id: id.to_string(),
            league: "nfl".to_string(),
            sport: "football".to_string(),
            name: Some("Chicago Bears at Detroit Lions".to_string()),
            short_name: None,
            start,
            home_team: Team {
                id: "8".to_string(),
                name: "Detroit Lions".to_string(),
                ..Default::default()
            },
            away_team: Team {
                id: "3".to_string(),
                name: "Chicago Bears".to_string(),
                ..Default::default()
            },
            home_score: None,
            away_score: None,
            home_record: None,
            away_record: None,
            venue: Venue::default(),
            broadcasts: Vec::new(),
            season_type: Default::default(),
            status: EventStatus::default(),
            odds: None,
            conference_competition: false,
            source_league: None,
            leaders: Vec::new(),
        }
    }

    fn row(league: &str, id: &str, name: &str) -> TeamLeagueRow {
        TeamLeagueRow {
            league: league.to_string(),
            team_id: id.to_string(),
            team_name: name.to_string(),
            team_abbrev: None,
            team_short_name: None,
            sport: "football".to_string(),
        }
    }

    fn matcher(schedule: Vec<Event>) -> Arc<MultiTierMatcher> {
        let snapshot = Arc::new(TeamLeagueSnapshot::build(
            vec![
                row("nfl", "8", "Detroit Lions"),
                row("nfl", "3", "Chicago Bears"),
            ],
            Vec::new(),
        ));
        let indexes: Arc<dyn TeamIndexProvider> =
            Arc::new(SnapshotIndexProvider::new(snapshot.clone(), Vec::new()));
        let mappings = Arc::new(LeagueMappingStore::new(vec![LeagueMapping {
            league: "nfl".to_string(),
            provider: "espn".to_string(),
            provider_league_id: Some("nfl".to_string()),
            provider_league_name: Some("NFL".to_string()),
            sport: "football".to_string(),
            display_name: Some("NFL".to_string()),
            logo_url: None,
            enabled: true,
            single_event_keywords: Vec::new(),
        }]));
        Arc::new(MultiTierMatcher::new(
            Normalizer::new(Vec::new()),
            Classifier::new(Vec::new()),
            Arc::new(FixtureEvents { schedule }),
            indexes,
            snapshot,
            mappings,
            MatcherConfig {
                candidate_leagues: vec!["nfl".to_string()],
                include_final_events: false,
                single_event_leagues: Vec::new(),
                max_alternates: 5,
            },
        ))
    }

    fn group() -> EventGroup {
        EventGroup {
            id: 1,
            name: "nfl sunday".to_string(),
            include_leagues: vec!["nfl".to_string()],
            candidate_leagues: vec!["nfl".to_string()],
            include_regex: None,
            exclude_regex: None,
            exception_keyword_ids: Vec::new(),
            custom_regex: CustomRegexConfig::default(),
            template_id: None,
            create_lead_hours: None,
            delete_grace_minutes: Some(60),
            generation: 1,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn stream(id: i64, name: &str) -> Stream {
        Stream {
            id,
            name: name.to_string(),
            m3u_account: None,
        }
    }

    fn engine(
        store: Arc<MemoryStore>,
        middleware: Arc<MockMiddleware>,
        schedule: Vec<Event>,
        keywords: Vec<ExceptionKeyword>,
    ) -> LifecycleEngine {
        LifecycleEngine::new(
            store,
            middleware,
            matcher(schedule),
            "espn".to_string(),
            keywords,
            CreateTiming::Immediate,
            60,
            [("football".to_string(), 3.5), ("hockey".to_string(), 3.0)]
                .into_iter()
                .collect(),
            2.5,
            None,
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 7, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn matched_stream_creates_exactly_one_channel() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let game = game_event("401", Utc.with_ymd_and_hms(2025, 12, 7, 18, 0, 0).unwrap());
        let engine = engine(store.clone(), middleware.clone(), vec![game], Vec::new());

        let summary = engine
            .refresh_group(
                &group(),
                vec![
                    stream(11, "NFL 01: Bears @ Lions"),
                    stream(12, "NFL 02: Bears @ Lions (alt feed)"),
                ],
                now(),
            )
            .await;

        assert_eq!(summary.matched, 2);
        assert_eq!(summary.channels_created, 1);
        // Invariant: one live channel per (event, group)
        let live = store.list_live_channels(Some(1)).await.unwrap();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].event_id, "401");
        assert_eq!(live[0].tvg_id, "espn.401");
        assert_eq!(live[0].sync_status, SyncStatus::Synced);
        // Delete schedule uses the sport's duration (football 3.5h) + grace
        assert_eq!(
            live[0].scheduled_delete_at,
            Some(
                Utc.with_ymd_and_hms(2025, 12, 7, 18, 0, 0).unwrap()
                    + Duration::minutes(210)
                    + Duration::minutes(60)
            )
        );
        // Both streams attached, lowest id first
        let streams = store.streams.lock().unwrap();
        let attached = &streams[&live[0].id];
        assert_eq!(attached.len(), 2);
        assert_eq!(attached[0].stream_id, 11);
        // Downstream channel exists
        assert_eq!(middleware.channels.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn second_refresh_updates_instead_of_creating() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let game = game_event("401", Utc.with_ymd_and_hms(2025, 12, 7, 18, 0, 0).unwrap());
        let engine = engine(store.clone(), middleware.clone(), vec![game], Vec::new());

        let pool = vec![stream(11, "NFL 01: Bears @ Lions")];
        let first = engine.refresh_group(&group(), pool.clone(), now()).await;
        assert_eq!(first.channels_created, 1);

        let second = engine.refresh_group(&group(), pool, now()).await;
        assert_eq!(second.channels_created, 0);
        assert_eq!(second.channels_updated, 1);
        assert!(second.matched_from_cache >= 1);
        assert_eq!(store.list_live_channels(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn separate_keyword_gets_its_own_channel() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let game = game_event("401", Utc.with_ymd_and_hms(2025, 12, 7, 18, 0, 0).unwrap());
        let keywords = vec![ExceptionKeyword {
            id: 1,
            keywords: vec!["prime vision".to_string()],
            behavior: KeywordBehavior::Separate,
        }];
        let engine = engine(store.clone(), middleware.clone(), vec![game], keywords);

        let summary = engine
            .refresh_group(
                &group(),
                vec![
                    stream(11, "NFL 01: Bears @ Lions"),
                    stream(12, "NFL 02: Bears @ Lions (Prime Vision)"),
                ],
                now(),
            )
            .await;

        assert_eq!(summary.channels_created, 2);
        let live = store.list_live_channels(None).await.unwrap();
        assert_eq!(live.len(), 2);
        let keyword_channel = live
            .iter()
            .find(|channel| channel.exception_keyword.is_some())
            .unwrap();
        assert_eq!(keyword_channel.tvg_id, "espn.401.prime-vision");
        assert!(keyword_channel.channel_name.contains("prime vision"));
    }

    #[tokio::test]
    async fn consolidate_keyword_joins_main_channel() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let game = game_event("401", Utc.with_ymd_and_hms(2025, 12, 7, 18, 0, 0).unwrap());
        let keywords = vec![ExceptionKeyword {
            id: 1,
            keywords: vec!["manningcast".to_string()],
            behavior: KeywordBehavior::Consolidate,
        }];
        let engine = engine(store.clone(), middleware.clone(), vec![game], keywords);

        let summary = engine
            .refresh_group(
                &group(),
                vec![
                    stream(11, "NFL 01: Bears @ Lions"),
                    stream(12, "NFL 02: Bears @ Lions ManningCast"),
                ],
                now(),
            )
            .await;

        assert_eq!(summary.channels_created, 1);
        let live = store.list_live_channels(None).await.unwrap();
        assert_eq!(live.len(), 1);
        let streams = store.streams.lock().unwrap();
        assert_eq!(streams[&live[0].id].len(), 2);
    }

    #[tokio::test]
    async fn create_timing_defers_far_future_events() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let game = game_event("401", Utc.with_ymd_and_hms(2025, 12, 9, 18, 0, 0).unwrap());
        let mut engine = engine(store.clone(), middleware.clone(), vec![game], Vec::new());
        engine.create_timing = CreateTiming::HoursBefore(6);

        let summary = engine
            .refresh_group(&group(), vec![stream(11, "NFL 01: Bears @ Lions")], now())
            .await;

        assert_eq!(summary.matched, 1);
        assert_eq!(summary.channels_created, 0);
        assert_eq!(summary.skipped_not_due, 1);
        assert!(store.list_live_channels(None).await.unwrap().is_empty());
    }

    #[test]
    fn event_duration_resolves_override_then_sport_then_default() {
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let engine = engine(store, middleware, Vec::new(), Vec::new());

        assert_eq!(engine.event_duration("football"), Duration::minutes(210));
        assert_eq!(engine.event_duration("Hockey"), Duration::minutes(180));
        // Unknown sport falls back to the global default
        assert_eq!(engine.event_duration("cricket"), Duration::minutes(150));

        let mut with_override = engine;
        with_override.duration_override_hours = Some(2.0);
        assert_eq!(
            with_override.event_duration("football"),
            Duration::minutes(120)
        );
    }

    #[tokio::test]
    async fn scheduler_tick_deletes_expired_channel() {
        // Scenario G: event ended 90 minutes ago, delete grace 60 minutes
        let store = Arc::new(MemoryStore::new());
        let middleware = Arc::new(MockMiddleware::new());
        let event_start = Utc.with_ymd_and_hms(2025, 12, 7, 6, 30, 0).unwrap();
        let game = game_event("401", event_start);
        let engine = engine(store.clone(), middleware.clone(), vec![game], Vec::new());

        // Create the channel as if matched earlier in the day
        let created = store
            .insert_channel(NewManagedChannel {
                group_id: 1,
                event_id: "401".to_string(),
                provider: "espn".to_string(),
                tvg_id: "espn.401".to_string(),
                channel_name: "CHI @ DET".to_string(),
                logo_url: None,
                exception_keyword: None,
                home_team: None,
                away_team: None,
                event_start: Some(event_start),
                event_name: None,
                league: Some("nfl".to_string()),
                sport: Some("football".to_string()),
                // event.end (10:30) + 60 min grace = 11:30, now is 12:00
                scheduled_delete_at: Some(
                    Utc.with_ymd_and_hms(2025, 12, 7, 11, 30, 0).unwrap(),
                ),
            })
            .await
            .unwrap();
        let downstream = middleware
            .create_channel(ChannelSpec {
                tvg_id: "espn.401".to_string(),
                name: "CHI @ DET".to_string(),
                logo_url: None,
                group_id: None,
                stream_ids: vec![11],
            })
            .await
            .unwrap();
        store
            .set_middleware_id(created.id, Some(downstream.id))
            .await
            .unwrap();

        let deleted = engine.process_scheduled_deletions(now()).await.unwrap();
        assert_eq!(deleted.len(), 1);

        // Marked deleted locally with a reason
        let channels = store.channels.lock().unwrap();
        let local = channels.iter().find(|c| c.id == created.id).unwrap();
        assert!(local.is_deleted());
        assert!(local.delete_reason.as_deref().unwrap().contains("scheduled"));
        drop(channels);

        // Gone downstream, confirmed by listing
        assert!(middleware.channels.lock().unwrap().is_empty());
    }
}
