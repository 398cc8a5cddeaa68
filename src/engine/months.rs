//! Calendar month bucketing, in UTC.

use super::{FrequencyTable, KeyProjection, MetadataLookup, TimeWindow};
use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveTime, Utc};

/// Start of the calendar month containing `instant`.
pub fn month_start(instant: DateTime<Utc>) -> DateTime<Utc> {
    let first = instant.date_naive() - Days::new(u64::from(instant.day0()));
    first.and_time(NaiveTime::MIN).and_utc()
}

/// `"YYYY-MM"` of the month containing `instant`.
pub fn month_key(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m").to_string()
}

/// `instant` moved back by whole calendar months. Days past the end of the
/// target month are clamped to its last day.
pub fn months_before(instant: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    instant.checked_sub_months(Months::new(months))
}

/// Plays of one calendar month, keyed by song id.
#[derive(Debug, Clone)]
pub struct MonthlyBucket {
    pub month_key: String,
    pub window: TimeWindow,
    pub plays: FrequencyTable,
}

impl MonthlyBucket {
    fn starting_at(start: DateTime<Utc>) -> Option<Self> {
        let next = start.checked_add_months(Months::new(1))?;
        Some(Self {
            month_key: month_key(start),
            window: TimeWindow::new(start, next - Duration::nanoseconds(1)),
            plays: FrequencyTable::new(),
        })
    }

    /// Counts keyed by song title. Songs with no known title are counted
    /// under their id.
    pub fn song_counts(&self, lookup: &dyn MetadataLookup) -> FrequencyTable {
        self.plays.rekey(|song_id| {
            KeyProjection::Title
                .key(song_id, lookup.metadata(song_id))
                .or_else(|| Some(song_id.to_owned()))
        })
    }

    /// Counts keyed by artist. Songs with no known artist are left out.
    pub fn artist_counts(&self, lookup: &dyn MetadataLookup) -> FrequencyTable {
        KeyProjection::Artist.apply(&self.plays, lookup)
    }
}

/// The `M` calendar months ending with the month of `now`, most recent
/// first.
#[derive(Debug, Clone, Default)]
pub struct MonthlyBuckets {
    buckets: Vec<MonthlyBucket>,
}

impl MonthlyBuckets {
    pub fn trailing(now: DateTime<Utc>, months: u32) -> Self {
        let current = month_start(now);
        let buckets = (0..months)
            .map_while(|offset| {
                months_before(current, offset).and_then(MonthlyBucket::starting_at)
            })
            .collect();
        Self { buckets }
    }

    /// Bucket whose month contains `instant`.
    pub fn bucket_for(&mut self, instant: DateTime<Utc>) -> Option<&mut MonthlyBucket> {
        self.buckets
            .iter_mut()
            .find(|bucket| bucket.window.contains(instant))
    }

    /// Whole span covered by the buckets.
    pub fn span(&self) -> Option<TimeWindow> {
        let newest = self.buckets.first()?;
        let oldest = self.buckets.last()?;
        Some(TimeWindow::new(oldest.window.start, newest.window.end))
    }

    pub fn song_ids(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().flat_map(|bucket| bucket.plays.keys())
    }

    pub fn iter(&self) -> impl Iterator<Item = &MonthlyBucket> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
