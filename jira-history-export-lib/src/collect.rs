
use crate::{
    InterruptFlag,
    Transport,
    auth::CredentialSource,
    client::{Fetch, TrackerClient},
    error::*,
    model::{IssueKey, RawIssue},
    store::TicketStore,
};

use std::{
    collections::BTreeSet,
    ops::Range,
};

use chrono::NaiveDate;

/// Calendar dates whose changelog entries are excluded from
/// conversion, e.g. known bulk-import noise.
#[derive(Clone, Debug, Default)]
pub struct SkipDates {
    dates: BTreeSet<NaiveDate>,
}

impl SkipDates {
    pub fn none() -> Self {
        SkipDates::default()
    }

    /// Parse a comma-separated list of `%Y-%m-%d` dates.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut dates = BTreeSet::new();
        for part in raw.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            dates.insert(NaiveDate::parse_from_str(part, "%Y-%m-%d")?);
        }
        Ok(SkipDates { dates })
    }

    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.dates.contains(date)
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Drop changelog entries whose local calendar date is excluded.
    ///
    /// Entry order is preserved. Fails without modifying the issue
    /// when any entry's timestamp does not parse.
    pub fn apply(&self, issue: &mut RawIssue) -> Result<()> {
        if self.dates.is_empty() {
            return Ok(());
        }
        let mut keep = Vec::with_capacity(issue.changelog.histories.len());
        for entry in &issue.changelog.histories {
            keep.push(!self.dates.contains(&entry.created_date()?));
        }
        let mut keep = keep.into_iter();
        issue.changelog.histories.retain(|_| keep.next().unwrap_or(true));
        Ok(())
    }
}

/// Walks a contiguous key range and fills the ticket store.
pub struct Collector<T, C> {
    client: TrackerClient<T, C>,
    skip_dates: SkipDates,
    interrupt: InterruptFlag,
}

impl<T, C> Collector<T, C>
where
    T: Transport,
    C: CredentialSource,
{
    pub fn new(
        client: TrackerClient<T, C>,
        skip_dates: SkipDates,
        interrupt: InterruptFlag,
    ) -> Self {
        Collector {
            client,
            skip_dates,
            interrupt,
        }
    }

    /// Collect `project`'s issues over a key range into the store.
    ///
    /// The store and the missing set are persisted on every exit
    /// path: end of range, user interruption, or error. A persist
    /// failure after an otherwise clean run is itself an error.
    pub fn collect(
        &mut self,
        store: &mut TicketStore,
        project: &str,
        keys: Range<u32>,
    ) -> Result<()> {
        let result = self.collect_range(store, project, keys);
        info!("total number of tickets: {}", store.len());
        match store.save() {
            Ok(()) => result,
            Err(save_err) => {
                error!("could not persist the ticket store: {}", save_err);
                match result {
                    Ok(()) => Err(save_err),
                    Err(err) => Err(err),
                }
            }
        }
    }

    fn collect_range(
        &mut self,
        store: &mut TicketStore,
        project: &str,
        keys: Range<u32>,
    ) -> Result<()> {
        for number in keys {
            let key = IssueKey::new(project, number);
            if let Err(err) = self.interrupt.check() {
                info!("interrupted by the user");
                return Err(err);
            }
            if let Err(err) = self.visit(store, &key) {
                // a ticket without its completion marker is discarded,
                // never persisted half-populated
                store.clear_pending(&key);
                match *err.kind() {
                    ErrorKind::Interrupted => {
                        info!("interrupted by the user");
                    }
                    _ => error!("unexpected error on key {}: {}", key, err),
                }
                return Err(err);
            }
        }
        Ok(())
    }

    fn visit(&mut self, store: &mut TicketStore, key: &IssueKey) -> Result<()> {
        if store.get(key).is_none() {
            let raw = match self.client.fetch(store.missing_mut(), key)? {
                Fetch::Issue(raw) => raw,
                Fetch::NotFound | Fetch::Skipped => return Ok(()),
            };
            match raw.changelog.histories.first() {
                Some(first) => info!("first recorded change: {}", first.created),
                None => info!("empty history"),
            }
            store.insert_pending(key.clone(), raw);
        }
        if let Some(ticket) = store.get_mut(key) {
            if !ticket.filtered {
                self.skip_dates.apply(&mut ticket.source)?;
                ticket.filtered = true;
            }
            // completion marker; the ticket survives interruption from
            // here on
            ticket.downloaded = true;
        }
        Ok(())
    }

    pub fn into_client(self) -> TrackerClient<T, C> {
        self.client
    }
}
