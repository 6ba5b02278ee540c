
use crate::{
    error::*,
    model::{IssueKey, RawIssue},
};

use std::{
    collections::{BTreeMap, BTreeSet},
    fs::{self, File},
    io::ErrorKind as IoErrorKind,
    path::{Path, PathBuf},
};

/// One cached tracker record with its run markers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredTicket {
    /// The consumed projection of the tracker's response.
    pub source: RawIssue,
    /// Completion marker. A ticket lacking it is discarded on the next
    /// orderly stop rather than persisted half-populated.
    #[serde(default)]
    pub downloaded: bool,
    /// Skip-dates were applied to `source.changelog` exactly once.
    #[serde(default)]
    pub filtered: bool,
}

/// Durable cache of downloaded tickets plus the known-missing set.
///
/// Additive across runs: tickets are only ever inserted, never
/// dropped, except for the pending entry cleared on an interrupted
/// download.
#[derive(Debug)]
pub struct TicketStore {
    tickets_path: PathBuf,
    missing_path: PathBuf,
    tickets: BTreeMap<IssueKey, StoredTicket>,
    missing: MissingSet,
}

impl TicketStore {
    /// Load the store for `project` from `data_dir`, creating the
    /// directory on first use.
    ///
    /// An absent tickets file is an empty store. An unreadable or
    /// unparsable one is an error: saving over it at the end of the
    /// run would destroy data.
    pub fn open(data_dir: &Path, project: &str) -> Result<Self> {
        if let Err(err) = fs::create_dir(data_dir) {
            match err.kind() {
                IoErrorKind::AlreadyExists => (),
                _ => return Err(err.into()),
            }
        }
        let tickets_path = data_dir.join(format!("{}-tickets.json", project));
        let missing_path = data_dir.join("missing-tickets.txt");

        info!("loading json: {}", tickets_path.display());
        let tickets: BTreeMap<IssueKey, StoredTicket> =
            match File::open(&tickets_path) {
                Ok(file) => serde_json::from_reader(file).chain_err(|| format!(
                    "corrupt ticket store: {}",
                    tickets_path.display(),
                ))?,
                Err(ref err) if err.kind() == IoErrorKind::NotFound => {
                    info!("no file: {}", tickets_path.display());
                    BTreeMap::new()
                }
                Err(err) => return Err(err.into()),
            };
        let mut missing = MissingSet::load(&missing_path);

        // an identifier that gained a successful download is never
        // simultaneously missing
        for key in tickets.keys() {
            if missing.remove(key) {
                warn!(
                    "{} is both stored and marked missing, \
                     dropping the missing mark",
                    key,
                );
            }
        }

        info!("already saved: {} tickets", tickets.len());
        info!("missing tickets count = {}", missing.len());

        Ok(TicketStore {
            tickets_path,
            missing_path,
            tickets,
            missing,
        })
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    pub fn get(&self, key: &IssueKey) -> Option<&StoredTicket> {
        self.tickets.get(key)
    }

    pub fn get_mut(&mut self, key: &IssueKey) -> Option<&mut StoredTicket> {
        self.tickets.get_mut(key)
    }

    /// Tickets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&IssueKey, &StoredTicket)> {
        self.tickets.iter()
    }

    /// Insert a freshly downloaded record without its completion
    /// marker.
    pub fn insert_pending(&mut self, key: IssueKey, source: RawIssue) {
        self.tickets.insert(key, StoredTicket {
            source,
            downloaded: false,
            filtered: false,
        });
    }

    /// Drop `key` only if its download never completed.
    pub fn clear_pending(&mut self, key: &IssueKey) {
        let pending = match self.tickets.get(key) {
            Some(ticket) => !ticket.downloaded,
            None => false,
        };
        if pending {
            info!("discarding partially downloaded {}", key);
            self.tickets.remove(key);
        }
    }

    pub fn missing(&self) -> &MissingSet {
        &self.missing
    }

    pub fn missing_mut(&mut self) -> &mut MissingSet {
        &mut self.missing
    }

    /// Persist the tickets document and the missing file.
    pub fn save(&self) -> Result<()> {
        info!("saving {}", self.tickets_path.display());
        let file = File::create(&self.tickets_path)?;
        serde_json::to_writer(file, &self.tickets)?;
        self.missing.save(&self.missing_path)?;
        info!("saved!");
        Ok(())
    }
}

/// Issue identifiers confirmed not to exist on the tracker.
///
/// Only a manual file edit removes an identifier; the program itself
/// never un-marks one.
#[derive(Clone, Debug, Default)]
pub struct MissingSet {
    keys: BTreeSet<IssueKey>,
}

impl MissingSet {
    pub fn new() -> Self {
        MissingSet::default()
    }

    /// Tolerant load: an absent or unreadable file is an empty set.
    pub fn load(path: &Path) -> Self {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                info!("could not read {}", path.display());
                return MissingSet::new();
            }
        };
        let mut set = MissingSet::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match line.parse() {
                Ok(key) => {
                    set.keys.insert(key);
                }
                Err(_) => warn!(
                    "ignoring malformed missing-ticket line: '{}'",
                    line,
                ),
            }
        }
        set
    }

    /// Newline-separated sorted rewrite.
    pub fn save(&self, path: &Path) -> Result<()> {
        let lines = self.keys.iter()
            .map(|key| key.to_string())
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(path, lines)?;
        Ok(())
    }

    pub fn contains(&self, key: &IssueKey) -> bool {
        self.keys.contains(key)
    }

    pub fn insert(&mut self, key: IssueKey) -> bool {
        self.keys.insert(key)
    }

    pub fn remove(&mut self, key: &IssueKey) -> bool {
        self.keys.remove(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Contributor display names observed across all processed entries.
///
/// Persisted as a full sorted rewrite; names loaded at open stay in
/// the set, so every save is a union with the previous file contents,
/// never a replacement.
#[derive(Debug)]
pub struct NamesFile {
    path: PathBuf,
    names: BTreeSet<String>,
}

impl NamesFile {
    /// Tolerant load: an absent or unreadable file is an empty set.
    pub fn load(path: &Path) -> Self {
        let mut names = BTreeSet::new();
        match fs::read_to_string(path) {
            Ok(raw) => {
                for line in raw.lines() {
                    let line = line.trim();
                    if !line.is_empty() {
                        names.insert(line.to_owned());
                    }
                }
            }
            Err(_) => info!("could not read {}", path.display()),
        }
        NamesFile {
            path: path.to_owned(),
            names,
        }
    }

    pub fn insert(&mut self, name: String) -> bool {
        if name.is_empty() {
            return false;
        }
        self.names.insert(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Newline-separated sorted rewrite.
    pub fn save(&self) -> Result<()> {
        let lines = self.names.iter()
            .cloned()
            .collect::<Vec<_>>()
            .join("\n");
        fs::write(&self.path, lines)?;
        Ok(())
    }
}
