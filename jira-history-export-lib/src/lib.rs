#[macro_use]
extern crate error_chain;
extern crate chrono;
extern crate dialoguer;
extern crate futures;
extern crate handlebars;
extern crate hyper;
extern crate hyper_tls;
#[macro_use]
extern crate log;
extern crate native_tls;
#[macro_use]
extern crate redacted_debug;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;

pub extern crate tokio_core;

use crate::{
    error::*,
    auth::JiraAuth,
    model::IssueKey,
};

use std::{
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use futures::{Future, Stream};
use hyper::{
    {Client, Method, Request, StatusCode, Uri},
    client::HttpConnector,
    header::{
        Authorization,
        Basic,
        ContentLength,
        ContentType,
        UserAgent,
    },
};
use hyper_tls::HttpsConnector;

pub use tokio_core::reactor::Core as TokioCore;

/// Tracker resource data model.
pub mod model;

/// Error types for this crate.
pub mod error;

/// Tracker credential handling.
pub mod auth;

/// Durable ticket, missing-set, and contributor storage.
pub mod store;

/// Single-issue fetching with retry and credential re-entry.
pub mod client;

/// Key-range collection into the ticket store.
pub mod collect;

/// Synthetic file path derivation.
pub mod paths;

/// Merging changelogs into an ordered event sequence.
pub mod convert;

/// Rendering events to log lines.
pub mod render;

pub mod prelude {
    pub use crate::{
        Jira,
        Transport,
        InterruptFlag,
        auth::{CredentialSource, JiraAuth, PromptCredentials},
        client::{Fetch, RetryPolicy, TrackerClient},
        collect::{Collector, SkipDates},
        convert::{EventKind, EventLine, EventSink, HistoryConverter},
        model::{IssueKey, RawIssue},
        paths::PathDeriver,
        render::{EventRenderer, WriteSink},
        store::{MissingSet, NamesFile, TicketStore},
        model as jira_model,
        error as jira_error,
    };
    pub use tokio_core::reactor::Core as TokioCore;
}

/// Issue fields requested from the tracker. The path deriver consumes
/// the issue type, so it rides along with the key and summary.
const ISSUE_FIELDS: &'static str = "key,summary,issuetype";

/// Blocking retrieval of one issue record from the remote tracker.
///
/// `Jira` is the production implementation; tests substitute scripted
/// responses.
pub trait Transport {
    fn get_issue(
        &mut self,
        key: &IssueKey,
        auth: &JiraAuth,
    ) -> Result<(StatusCode, Vec<u8>)>;
}

/// Jira access service.
pub struct Jira {
    client: Client<HttpsConnector<HttpConnector>>,
    core: TokioCore,
    user_agent: UserAgent,
    base_url: String,
}

impl Jira {
    pub fn new(base_url: &str) -> Result<Self> {
        // resolve user agent at compile time
        let user_agent = UserAgent::new(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION"),
        ));

        let core = TokioCore::new()?;
        let client = hyper::Client::configure()
            .connector(HttpsConnector::new(4, &core.handle())?)
            .build(&core.handle());

        Ok(Jira {
            client,
            core,
            user_agent,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn issue_url(&self, key: &IssueKey) -> String {
        format!(
            "{}/rest/api/2/issue/{}?fields={}&expand=changelog",
            self.base_url,
            key,
            ISSUE_FIELDS,
        )
    }
}

impl Transport for Jira {
    /// GET request, retrieve status and body.
    ///
    /// Drives the reactor until the response is complete, so this call
    /// blocks like the rest of the pipeline.
    fn get_issue(
        &mut self,
        key: &IssueKey,
        auth: &JiraAuth,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let url = Uri::from_str(&self.issue_url(key))?;
        let mut req = Request::new(Method::Get, url);
        req.headers_mut().set(self.user_agent.clone());
        req.headers_mut().set(Authorization(Basic {
            username: auth.login.clone(),
            password: Some(auth.password.clone()),
        }));
        req.headers_mut().set(ContentType::json());
        req.headers_mut().set(ContentLength(0));

        let resp = self.client.request(req);
        let resp = resp.from_err::<Error>().and_then(|resp| {
            let status = resp.status();
            resp.body().concat2().from_err()
                .map(move |chunk| (status, chunk.to_vec()))
        });
        self.core.run(resp)
    }
}

/// Cooperative user-interrupt flag.
///
/// Set from a signal handler, checked at the outer loops of collection
/// and conversion. Both stop orderly and flush durable state.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        InterruptFlag::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Error out with `ErrorKind::Interrupted` if the flag is set.
    pub fn check(&self) -> Result<()> {
        if self.is_set() {
            Err(ErrorKind::Interrupted.into())
        } else {
            Ok(())
        }
    }
}
