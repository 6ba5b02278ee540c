
use crate::{
    InterruptFlag,
    Transport,
    auth::CredentialSource,
    error::*,
    model::{IssueKey, RawIssue},
    store::MissingSet,
};

use std::{
    thread,
    time::{Duration, Instant},
};

use hyper::StatusCode;

/// Fixed wait between retries of a request that failed at the
/// transport level.
pub const NETWORK_ERROR_WAIT_DELAY: Duration = Duration::from_secs(5);

/// Outcome of a single-issue fetch.
#[derive(Debug)]
pub enum Fetch {
    /// The tracker returned the record, changelog included.
    Issue(RawIssue),
    /// The tracker does not have the issue, or answered with a status
    /// treated as permanent for this run.
    NotFound,
    /// The issue is known missing; no request was made.
    Skipped,
}

/// When and whether a failed request is retried.
///
/// Both knobs are data rather than control flow so tests can inject a
/// zero delay and arbitrary retryability decisions.
#[derive(Clone)]
pub struct RetryPolicy {
    pub delay: Duration,
    pub retryable: fn(&Error) -> bool,
}

impl RetryPolicy {
    pub fn fixed(delay: Duration) -> Self {
        RetryPolicy {
            delay,
            retryable: is_connection_error,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::fixed(NETWORK_ERROR_WAIT_DELAY)
    }
}

/// Transport-level failures are worth retrying; everything else is
/// not.
pub fn is_connection_error(err: &Error) -> bool {
    match *err.kind() {
        ErrorKind::Hyper(_) | ErrorKind::Io(_) => true,
        _ => false,
    }
}

/// Single-issue fetching with unbounded retry behind credential
/// re-entry.
pub struct TrackerClient<T, C> {
    transport: T,
    credentials: C,
    policy: RetryPolicy,
    interrupt: InterruptFlag,
}

impl<T, C> TrackerClient<T, C>
where
    T: Transport,
    C: CredentialSource,
{
    pub fn new(
        transport: T,
        credentials: C,
        policy: RetryPolicy,
        interrupt: InterruptFlag,
    ) -> Self {
        TrackerClient {
            transport,
            credentials,
            policy,
            interrupt,
        }
    }

    /// Fetch one issue record.
    ///
    /// Known-missing issues are skipped without a request. Connection
    /// failures retry the same request with a fixed delay and no
    /// attempt cap: the contract is to never silently give up on a
    /// transient network error. Authentication denials discard the
    /// cached credentials and retry with freshly entered ones, also
    /// without a cap.
    pub fn fetch(
        &mut self,
        missing: &mut MissingSet,
        key: &IssueKey,
    ) -> Result<Fetch> {
        if missing.contains(key) {
            info!("skipping missing ticket {}", key);
            return Ok(Fetch::Skipped);
        }
        info!("downloading: {}", key);
        loop {
            self.interrupt.check()?;
            let auth = self.credentials.credentials()?;
            let (status, body) = match self.transport.get_issue(key, &auth) {
                Ok(resp) => resp,
                Err(err) => {
                    if !(self.policy.retryable)(&err) {
                        return Err(err);
                    }
                    warn!("connection error: {}", err);
                    info!(
                        "waiting for {} seconds...",
                        self.policy.delay.as_secs(),
                    );
                    self.wait()?;
                    continue;
                }
            };
            match status {
                StatusCode::Ok => {
                    let issue = serde_json::from_slice(&body)
                        .chain_err(|| format!(
                            "could not parse tracker response for {}",
                            key,
                        ))?;
                    debug!("request successful");
                    return Ok(Fetch::Issue(issue));
                }
                StatusCode::Unauthorized => {
                    warn!("download failed for ticket {}: wrong password", key);
                    self.credentials.invalidate();
                }
                // usually a captcha lockout rather than a stale
                // password, but it gets the same re-prompt treatment
                StatusCode::Forbidden => {
                    warn!(
                        "download failed for ticket {}: denied, \
                         enter the captcha in the web interface",
                        key,
                    );
                    self.credentials.invalidate();
                }
                StatusCode::NotFound => {
                    info!("no issue {}", key);
                    missing.insert(key.clone());
                    return Ok(Fetch::NotFound);
                }
                status => {
                    warn!("download failed for ticket {}: {}", key, status);
                    return Ok(Fetch::NotFound);
                }
            }
        }
    }

    /// Sleep out the retry delay in short slices so a user interrupt
    /// still lands promptly.
    fn wait(&self) -> Result<()> {
        let deadline = Instant::now() + self.policy.delay;
        loop {
            self.interrupt.check()?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            thread::sleep((deadline - now).min(Duration::from_millis(250)));
        }
    }

    pub fn into_parts(self) -> (T, C) {
        (self.transport, self.credentials)
    }
}
