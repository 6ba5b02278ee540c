
use crate::{
    InterruptFlag,
    error::*,
    model::{HistoryEntry, IssueKey},
    paths::PathDeriver,
    store::{NamesFile, TicketStore},
};

use chrono::{DateTime, FixedOffset};

/// What an emitted event means for the synthetic file.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum EventKind {
    /// An ordinary change.
    #[serde(rename = "M")]
    Modification,
    /// The final change on the issue; the file conceptually closes.
    #[serde(rename = "D")]
    Deletion,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match *self {
            EventKind::Modification => "M",
            EventKind::Deletion => "D",
        }
    }
}

/// One entry of the converted history.
#[derive(Clone, Debug, Serialize)]
pub struct EventLine {
    /// Unix time of the change, in seconds.
    pub time: i64,
    pub author: String,
    /// Rides along for repository-backed sinks; the rendered line
    /// format does not include it.
    pub email: String,
    pub kind: EventKind,
    pub path: String,
}

/// Consumer of the converted event sequence.
///
/// The bundled implementation renders log lines; a repository-backed
/// implementation would create a commit per event instead.
pub trait EventSink {
    fn emit(&mut self, event: &EventLine) -> Result<()>;
}

/// Merges every stored changelog into one timestamp-ordered event
/// sequence.
pub struct HistoryConverter<'a> {
    store: &'a TicketStore,
    paths: PathDeriver<'a>,
    interrupt: InterruptFlag,
}

impl<'a> HistoryConverter<'a> {
    pub fn new(store: &'a TicketStore, interrupt: InterruptFlag) -> Self {
        HistoryConverter {
            store,
            paths: PathDeriver::new(store),
            interrupt,
        }
    }

    /// Use a pre-configured deriver, e.g. one carrying a segment hook.
    pub fn with_deriver(
        store: &'a TicketStore,
        paths: PathDeriver<'a>,
        interrupt: InterruptFlag,
    ) -> Self {
        HistoryConverter {
            store,
            paths,
            interrupt,
        }
    }

    /// Convert the store's merged history into emitted events.
    ///
    /// Contributor names accumulated up to an interruption or error
    /// are persisted regardless of how the run ends.
    pub fn convert(
        &mut self,
        names: &mut NamesFile,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let result = self.convert_inner(names, sink);
        info!("saving names of committers");
        match names.save() {
            Ok(()) => result,
            Err(save_err) => {
                error!("could not persist contributor names: {}", save_err);
                match result {
                    Ok(()) => Err(save_err),
                    Err(err) => Err(err),
                }
            }
        }
    }

    fn convert_inner(
        &mut self,
        names: &mut NamesFile,
        sink: &mut dyn EventSink,
    ) -> Result<()> {
        let store = self.store;

        let mut entries: Vec<(DateTime<FixedOffset>, IssueKey, &HistoryEntry)> =
            Vec::new();
        for (key, ticket) in store.iter() {
            for entry in &ticket.source.changelog.histories {
                let created = entry.created_at().chain_err(|| format!(
                    "unreadable changelog timestamp on {}",
                    key,
                ))?;
                entries.push((created, key.clone(), entry));
            }
        }
        // timestamp first, identifier as the deterministic tie-break
        entries.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

        for (created, key, entry) in entries {
            if let Err(err) = self.interrupt.check() {
                info!("interrupted by user, stopping...");
                return Err(err);
            }
            names.insert(entry.author.display_name.clone());
            let path = self.paths.derive(&key)?;
            let kind = match self.last_change_instant(&key)? {
                Some(last) if last == created => EventKind::Deletion,
                _ => EventKind::Modification,
            };
            debug!(
                "{}: @{}: {} <{}>",
                key,
                created,
                entry.author.display_name,
                entry.author.email_address,
            );
            sink.emit(&EventLine {
                time: created.timestamp(),
                author: entry.author.display_name.clone(),
                email: entry.author.email_address.clone(),
                kind,
                path,
            })?;
        }
        Ok(())
    }

    /// Instant of the last entry of the issue's live changelog,
    /// re-queried from the store rather than the sorted snapshot.
    fn last_change_instant(
        &self,
        key: &IssueKey,
    ) -> Result<Option<DateTime<FixedOffset>>> {
        match self.store.get(key)
            .and_then(|ticket| ticket.source.changelog.histories.last())
        {
            Some(entry) => Ok(Some(entry.created_at()?)),
            None => Ok(None),
        }
    }
}
