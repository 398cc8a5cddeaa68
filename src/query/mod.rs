//! Analytics queries over a record source.

mod args;
mod error;
mod export;
mod models;

pub use args::{
    parse_boundary, parse_limit, parse_months, parse_window, Boundary, MAX_TRAILING_MONTHS,
};
pub use error::QueryError;
pub use models::{EnrichSummary, MonthlySummary, PayoutReport, RankedSong};

use crate::engine::{
    months::months_before, scan_events, DurationTally, FrequencyTable, InlineMetadata,
    MonthlyBuckets, PayoutAmount, PayoutPolicy, ScanError, ScanStats, TimeWindow,
};
use crate::records::{PlayEvent, RecordSource};
use crate::resolver::{ResolutionCache, ResolverFailurePolicy, SongResolver};
use chrono::{DateTime, Utc};
use export::ExportSink;
use std::collections::HashSet;
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_RESOLVER_CONCURRENCY: usize = 8;
pub const DEFAULT_QUERY_TIMEOUT_SEC: u64 = 300;

#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    /// Maximum number of metadata lookups in flight.
    pub resolver_concurrency: usize,
    pub failure_policy: ResolverFailurePolicy,
    /// `None` lets queries run for as long as they need.
    pub timeout: Option<Duration>,
    pub payout: PayoutPolicy,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            resolver_concurrency: DEFAULT_RESOLVER_CONCURRENCY,
            failure_policy: ResolverFailurePolicy::default(),
            timeout: Some(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SEC)),
            payout: PayoutPolicy::default(),
        }
    }
}

/// Runs analytics queries against one record source.
///
/// Every query makes a single pass over the source (the enrichment export
/// makes two) and keeps no state between calls. Metadata is looked up once
/// per distinct song touched by the query.
pub struct AnalyticsService {
    source: Arc<dyn RecordSource>,
    resolver: Option<Arc<dyn SongResolver>>,
    settings: QuerySettings,
    cancellation_token: CancellationToken,
}

impl AnalyticsService {
    pub fn new(
        source: Arc<dyn RecordSource>,
        resolver: Option<Arc<dyn SongResolver>>,
        settings: QuerySettings,
    ) -> Self {
        Self {
            source,
            resolver,
            settings,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Queries stop with [`QueryError::Cancelled`] once `token` is cancelled.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// The `n` most played songs within `window`.
    pub async fn top_songs(
        &self,
        window: TimeWindow,
        n: usize,
    ) -> Result<Vec<RankedSong>, QueryError> {
        if window.is_empty() || n == 0 {
            debug!("Empty top-songs request, nothing to scan");
            return Ok(Vec::new());
        }

        self.run("top-songs", |token| async move {
            let ((plays, inline), _) = self
                .scan(
                    token,
                    (FrequencyTable::new(), InlineMetadata::default()),
                    move |(plays, inline), mut event| {
                        if window.contains(event.timestamp) {
                            inline.remember(&mut event);
                            plays.increment(&event.song_id);
                        }
                        Ok(())
                    },
                )
                .await?;

            let ranked = plays.top_n(n);
            let cache = self
                .resolve(inline, ranked.iter().map(|(song_id, _)| song_id.clone()))
                .await?;

            Ok(ranked
                .into_iter()
                .map(|(song_id, plays)| {
                    let metadata = cache.get(&song_id).cloned();
                    RankedSong::new(song_id, plays, metadata.as_ref())
                })
                .collect())
        })
        .await
    }

    /// Top song and top artist of `user_id` for each of the `months` calendar
    /// months ending with the month of `now`, most recent first.
    pub async fn timeline(
        &self,
        user_id: &str,
        months: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<MonthlySummary>, QueryError> {
        check_months(months)?;
        let buckets = MonthlyBuckets::trailing(now, months);
        let Some(span) = buckets.span() else {
            return Ok(Vec::new());
        };
        let user_id = user_id.to_owned();

        self.run("timeline", |token| async move {
            let ((buckets, inline), _) = self
                .scan(
                    token,
                    (buckets, InlineMetadata::default()),
                    move |(buckets, inline), mut event| {
                        if event.user_id != user_id || !span.contains(event.timestamp) {
                            return Ok(());
                        }
                        if let Some(bucket) = buckets.bucket_for(event.timestamp) {
                            inline.remember(&mut event);
                            bucket.plays.increment(&event.song_id);
                        }
                        Ok(())
                    },
                )
                .await?;

            let song_ids: Vec<String> = buckets.song_ids().map(str::to_owned).collect();
            let cache = self.resolve(inline, song_ids).await?;

            Ok(buckets
                .iter()
                .map(|bucket| MonthlySummary {
                    month: bucket.month_key.clone(),
                    top_song: bucket.song_counts(&cache).top().map(|(title, _)| title),
                    top_artist: bucket.artist_counts(&cache).top().map(|(artist, _)| artist),
                })
                .collect())
        })
        .await
    }

    /// What `artist` earned from qualifying plays over the last `months`
    /// months before `now`.
    pub async fn payout(
        &self,
        artist: &str,
        months: u32,
        now: DateTime<Utc>,
    ) -> Result<PayoutReport, QueryError> {
        check_months(months)?;
        let policy = self.settings.payout;
        let artist = artist.to_owned();
        if months == 0 {
            return Ok(PayoutReport {
                artist,
                months,
                qualifying_plays: 0,
                total_minutes: 0.0,
                amount: PayoutAmount::default(),
            });
        }
        let start = months_before(now, months).ok_or_else(|| {
            QueryError::InvalidArgument(format!("{} months before {} is out of range", months, now))
        })?;
        let window = TimeWindow::new(start, now);

        self.run("payout", |token| async move {
            let ((tally, inline), _) = self
                .scan(
                    token,
                    (DurationTally::default(), InlineMetadata::default()),
                    move |(tally, inline), mut event| {
                        if window.contains(event.timestamp) && policy.qualifies(event.duration_ms)
                        {
                            inline.remember(&mut event);
                            tally.add(&event.song_id, event.duration_ms);
                        }
                        Ok(())
                    },
                )
                .await?;

            let song_ids: Vec<String> = tally.song_ids().map(str::to_owned).collect();
            let cache = self.resolve(inline, song_ids).await?;
            let time = tally.for_artist(&artist, &cache);

            Ok(PayoutReport {
                artist,
                months,
                qualifying_plays: time.plays,
                total_minutes: time.minutes,
                amount: policy.amount(time.minutes),
            })
        })
        .await
    }

    /// Writes every event joined with its song metadata to `writer`, as a JSON
    /// array the JSON record source can read back. Events of songs that cannot
    /// be resolved are left out.
    pub async fn enrich<W>(&self, writer: W) -> Result<EnrichSummary, QueryError>
    where
        W: Write + Send + 'static,
    {
        self.run("enrich", |token| async move {
            let ((songs, inline), _) = self
                .scan(
                    token.clone(),
                    (HashSet::<String>::new(), InlineMetadata::default()),
                    |(songs, inline), mut event| {
                        inline.remember(&mut event);
                        if !songs.contains(&event.song_id) {
                            songs.insert(event.song_id);
                        }
                        Ok(())
                    },
                )
                .await?;
            info!("Resolving {} distinct songs for export", songs.len());

            let cache = self.resolve(inline, songs).await?;
            let (sink, scan) = self
                .scan(
                    token,
                    ExportSink::new(writer, cache.into_resolved()),
                    |sink, event| sink.write(event),
                )
                .await?;
            let (written, dropped) = sink.finish().map_err(QueryError::Output)?;
            if dropped > 0 {
                info!("Dropped {} events of songs missing from the catalog", dropped);
            }

            Ok(EnrichSummary {
                written,
                dropped,
                scan,
            })
        })
        .await
    }

    /// Runs one query under a child cancellation token and the configured
    /// timeout.
    async fn run<T, F, Fut>(&self, query: &'static str, work: F) -> Result<T, QueryError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, QueryError>>,
    {
        let token = self.cancellation_token.child_token();
        // Stops the blocking scan if this future is dropped or times out.
        let _guard = token.clone().drop_guard();
        let start_time = Instant::now();
        info!("Running {} query over {}", query, self.source.describe());

        let work = work(token.clone());
        let cancellable = async {
            tokio::select! {
                result = work => result,
                _ = token.cancelled() => Err(QueryError::Cancelled),
            }
        };
        let result = match self.settings.timeout {
            Some(limit) => match tokio::time::timeout(limit, cancellable).await {
                Ok(result) => result,
                Err(_) => Err(QueryError::TimedOut(limit)),
            },
            None => cancellable.await,
        };

        let elapsed = start_time.elapsed();
        match &result {
            Ok(_) => info!("Query {} completed in {:?}", query, elapsed),
            Err(QueryError::Cancelled) => {
                info!("Query {} was cancelled after {:?}", query, elapsed)
            }
            Err(err) => warn!("Query {} failed after {:?}: {}", query, elapsed, err),
        }
        result
    }

    /// Folds every event of the source into `state` on the blocking pool.
    async fn scan<S, F>(
        &self,
        token: CancellationToken,
        state: S,
        mut fold: F,
    ) -> Result<(S, ScanStats), QueryError>
    where
        S: Send + 'static,
        F: FnMut(&mut S, PlayEvent) -> Result<(), ScanError> + Send + 'static,
    {
        let source = Arc::clone(&self.source);
        let result = tokio::task::spawn_blocking(move || {
            let mut state = state;
            let stats = scan_events(source.as_ref(), &token, |event| fold(&mut state, event))?;
            Ok::<_, ScanError>((state, stats))
        })
        .await;

        match result {
            Ok(Ok((state, stats))) => {
                if stats.skipped > 0 {
                    info!(
                        "Skipped {} malformed rows out of {}",
                        stats.skipped, stats.rows
                    );
                }
                debug!("Scanned {} events", stats.events);
                Ok((state, stats))
            }
            Ok(Err(err)) => Err(err.into()),
            Err(err) => Err(QueryError::Panicked(err.to_string())),
        }
    }

    /// Joins metadata for `song_ids`, inline metadata first.
    async fn resolve<I>(
        &self,
        inline: InlineMetadata,
        song_ids: I,
    ) -> Result<ResolutionCache, QueryError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut cache = ResolutionCache::new(
            self.resolver.clone(),
            self.settings.resolver_concurrency,
            self.settings.failure_policy,
        );
        inline.seed_into(&mut cache);
        cache.resolve_all(song_ids).await?;
        if cache.failures() > 0 {
            warn!(
                "{} of {} song lookups failed, those songs are left unattributed",
                cache.failures(),
                cache.lookups()
            );
        }
        Ok(cache)
    }
}

fn check_months(months: u32) -> Result<(), QueryError> {
    if months > MAX_TRAILING_MONTHS {
        return Err(QueryError::InvalidArgument(format!(
            "months must be at most {}, got {}",
            MAX_TRAILING_MONTHS, months
        )));
    }
    Ok(())
}
