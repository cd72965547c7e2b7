// src/services/planner.rs

//! Snapshot query planning.
//!
//! The sweep walks query dates from newest to oldest and, for every date,
//! every forum × style × page. Before a lookup is issued the observation
//! history of its [`SnapshotQueryKey`] decides whether the archive could
//! possibly answer anything new.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{
    Config, ForumEntry, ForumStyle, Observation, SnapshotQuery, SnapshotQueryKey, SweepConfig,
};
use crate::utils::url::availability_url;

/// Why a query was not issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A newer query for the key found nothing.
    NoSnapshot,
    /// The closest snapshot already found is not newer than the query date.
    AlreadyResolved { snapshot: NaiveDateTime },
    /// The key was already queried at this date or an older one (resumed run).
    AlreadyQueried { last_query: NaiveDate },
}

/// Observation list of one key, as persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub key: SnapshotQueryKey,
    pub observations: Vec<Observation>,
}

/// Per-key observation lists, newest query date first.
///
/// The only shared mutable state of a sweep; all access goes through the
/// lock so concurrent fetches for different keys can record safely.
#[derive(Debug, Default)]
pub struct ObservationHistory {
    inner: Mutex<HashMap<SnapshotQueryKey, Vec<Observation>>>,
}

impl ObservationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a history from persisted entries.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Result<Self> {
        let history = Self::new();
        for entry in entries {
            for observation in entry.observations {
                history.record(entry.key.clone(), observation)?;
            }
        }
        Ok(history)
    }

    /// Snapshot of the history, sorted by key.
    pub fn entries(&self) -> Vec<HistoryEntry> {
        let map = self.lock();
        let mut entries: Vec<HistoryEntry> = map
            .iter()
            .map(|(key, observations)| HistoryEntry {
                key: key.clone(),
                observations: observations.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Append an observation for `key`.
    ///
    /// Query dates must strictly decrease per key; anything else would make
    /// the skip rules unsound and is rejected.
    pub fn record(&self, key: SnapshotQueryKey, observation: Observation) -> Result<()> {
        let mut map = self.lock();
        let list = map.entry(key.clone()).or_default();
        if let Some(last) = list.last().copied() {
            if observation.query_date >= last.query_date {
                return Err(AppError::ObservationOrder {
                    key: key.to_string(),
                    last: last.query_date,
                    attempted: observation.query_date,
                });
            }
        }
        list.push(observation);
        Ok(())
    }

    /// Most recently appended observation of a key.
    pub fn last(&self, key: &SnapshotQueryKey) -> Option<Observation> {
        self.lock().get(key).and_then(|list| list.last().copied())
    }

    pub fn observations(&self, key: &SnapshotQueryKey) -> Vec<Observation> {
        self.lock().get(key).cloned().unwrap_or_default()
    }

    /// Decide whether a lookup of `key` at `query_date` can be skipped.
    pub fn skip_reason(&self, key: &SnapshotQueryKey, query_date: NaiveDate) -> Option<SkipReason> {
        let last = self.last(key)?;
        if last.query_date <= query_date {
            return Some(SkipReason::AlreadyQueried {
                last_query: last.query_date,
            });
        }
        match last.snapshot {
            None => Some(SkipReason::NoSnapshot),
            Some(snapshot) if snapshot <= query_date.and_time(NaiveTime::MIN) => {
                Some(SkipReason::AlreadyResolved { snapshot })
            }
            Some(_) => None,
        }
    }

    pub fn should_skip(&self, key: &SnapshotQueryKey, query_date: NaiveDate) -> bool {
        self.skip_reason(key, query_date).is_some()
    }

    /// Number of keys with at least one observation.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SnapshotQueryKey, Vec<Observation>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Plans the availability lookups of a sweep.
#[derive(Debug)]
pub struct SnapshotPlanner {
    forums: Vec<ForumEntry>,
    styles: Vec<ForumStyle>,
    sweep: SweepConfig,
    endpoint: String,
    history: ObservationHistory,
}

impl SnapshotPlanner {
    pub fn new(config: &Config) -> Self {
        Self {
            forums: config.forums.clone(),
            styles: config.styles.clone(),
            sweep: config.sweep.clone(),
            endpoint: config.archive.availability_endpoint.clone(),
            history: ObservationHistory::new(),
        }
    }

    /// Continue from a previous run's observations.
    pub fn with_history(mut self, history: ObservationHistory) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &ObservationHistory {
        &self.history
    }

    /// Query dates, newest first, strictly after `min_date`.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        let step = Days::new(u64::from(self.sweep.step_days.max(1)));
        std::iter::successors(Some(self.sweep.latest_date), move |date| {
            date.checked_sub_days(step)
        })
        .take_while(|date| *date > self.sweep.min_date)
    }

    /// Every query of one date: forums, then styles, then pages.
    pub fn queries_for(&self, date: NaiveDate) -> impl Iterator<Item = Result<SnapshotQuery>> + '_ {
        self.forums.iter().flat_map(move |forum| {
            self.styles.iter().flat_map(move |style| {
                (self.sweep.page_from..self.sweep.page_to)
                    .map(move |page| self.build_query(forum, style, page, date))
            })
        })
    }

    /// The whole search space, date-major.
    pub fn queries(&self) -> impl Iterator<Item = Result<SnapshotQuery>> + '_ {
        self.dates().flat_map(move |date| self.queries_for(date))
    }

    /// Queries of one date that are worth issuing given the history so far.
    ///
    /// Returns the queries to issue and the number skipped.
    pub fn plan(&self, date: NaiveDate) -> Result<(Vec<SnapshotQuery>, usize)> {
        let mut issued = Vec::new();
        let mut skipped = 0;
        for query in self.queries_for(date) {
            let query = query?;
            match self.history.skip_reason(&query.key(), date) {
                Some(reason) => {
                    log::debug!(
                        "Skipping {} at {}: {:?} ({})",
                        query.key(),
                        date,
                        reason,
                        query.page_url
                    );
                    skipped += 1;
                }
                None => issued.push(query),
            }
        }
        Ok((issued, skipped))
    }

    pub fn should_skip(&self, key: &SnapshotQueryKey, query_date: NaiveDate) -> bool {
        self.history.should_skip(key, query_date)
    }

    pub fn record_observation(&self, key: SnapshotQueryKey, observation: Observation) -> Result<()> {
        self.history.record(key, observation)
    }

    fn build_query(
        &self,
        forum: &ForumEntry,
        style: &ForumStyle,
        page: u32,
        date: NaiveDate,
    ) -> Result<SnapshotQuery> {
        let page_url = style.page_url(forum.id, page);
        let target_url = availability_url(&self.endpoint, &page_url, date)?;
        Ok(SnapshotQuery {
            forum_name: forum.name.clone(),
            forum_id: forum.id,
            forum_style: style.name.clone(),
            page,
            query_date: date,
            page_url,
            target_url,
        })
    }
}
