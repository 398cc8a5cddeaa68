use super::{ResolveError, ResolverFailurePolicy, SongResolver};
use crate::catalog::SongMetadata;
use crate::engine::MetadataLookup;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Metadata lookups made during a single query.
///
/// Each distinct song id is resolved at most once, so the number of external
/// calls is bounded by the number of songs a query touches rather than by the
/// number of events. Lookups for different songs run concurrently, up to
/// `concurrency` at a time.
pub struct ResolutionCache {
    resolver: Option<Arc<dyn SongResolver>>,
    concurrency: usize,
    failure_policy: ResolverFailurePolicy,
    entries: HashMap<String, Option<SongMetadata>>,
    lookups: usize,
    failures: usize,
}

impl ResolutionCache {
    pub fn new(
        resolver: Option<Arc<dyn SongResolver>>,
        concurrency: usize,
        failure_policy: ResolverFailurePolicy,
    ) -> Self {
        Self {
            resolver,
            concurrency: concurrency.max(1),
            failure_policy,
            entries: HashMap::new(),
            lookups: 0,
            failures: 0,
        }
    }

    /// Records metadata that arrived inline with the events. Seeded songs are
    /// never looked up.
    pub fn seed(&mut self, metadata: SongMetadata) {
        self.entries
            .entry(metadata.song_id.clone())
            .or_insert(Some(metadata));
    }

    /// Resolves every id not already known.
    pub async fn resolve_all<I>(&mut self, song_ids: I) -> Result<(), ResolveError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut seen = HashSet::new();
        let pending: Vec<String> = song_ids
            .into_iter()
            .filter(|id| !self.entries.contains_key(id) && seen.insert(id.clone()))
            .collect();
        if pending.is_empty() {
            return Ok(());
        }

        let resolver = match &self.resolver {
            Some(resolver) => Arc::clone(resolver),
            None => {
                for song_id in pending {
                    self.entries.insert(song_id, None);
                }
                return Ok(());
            }
        };

        debug!(
            "Resolving {} songs with concurrency {}",
            pending.len(),
            self.concurrency
        );
        self.lookups += pending.len();

        let mut results = stream::iter(pending.into_iter().map(|song_id| {
            let resolver = Arc::clone(&resolver);
            async move {
                let result = resolver.resolve(&song_id).await;
                (song_id, result)
            }
        }))
        .buffer_unordered(self.concurrency);

        while let Some((song_id, result)) = results.next().await {
            match result {
                Ok(found) => {
                    if found.is_none() {
                        debug!("Song {} not found in catalog", song_id);
                    }
                    self.entries.insert(song_id, found);
                }
                Err(err) => match self.failure_policy {
                    ResolverFailurePolicy::Skip => {
                        warn!("Could not resolve song {}: {}", song_id, err);
                        self.failures += 1;
                        self.entries.insert(song_id, None);
                    }
                    ResolverFailurePolicy::Abort => return Err(err),
                },
            }
        }

        Ok(())
    }

    pub fn get(&self, song_id: &str) -> Option<&SongMetadata> {
        self.entries.get(song_id).and_then(|entry| entry.as_ref())
    }

    /// Every song that resolved to metadata.
    pub fn into_resolved(self) -> HashMap<String, SongMetadata> {
        self.entries
            .into_iter()
            .filter_map(|(song_id, entry)| entry.map(|metadata| (song_id, metadata)))
            .collect()
    }

    /// Number of calls made to the underlying resolver.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// Number of lookups that failed and were skipped.
    pub fn failures(&self) -> usize {
        self.failures
    }
}

impl MetadataLookup for ResolutionCache {
    fn metadata(&self, song_id: &str) -> Option<&SongMetadata> {
        self.get(song_id)
    }
}
