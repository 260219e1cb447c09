//! Fetch Controller Module
//!
//! Drives paginated provider fetches for the current search criteria and
//! publishes a single `FetchState`.
//!
//! Every trigger (new criteria, page move, page size change, refresh) takes a
//! fresh token from a monotonically increasing counter. A response is applied
//! only if its token is still the latest one; anything older is dropped
//! without touching state. Provider calls are bounded by a timeout and can be
//! aborted once superseded.
//!
//! Triggers spawn their fetch onto the ambient tokio runtime, so they must be
//! called from within one. The returned handle may be dropped; the fetch still
//! runs to completion and publishes its result.

use chrono::Utc;
use futures::future::{AbortHandle, Abortable};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::config::SearchConfig;
use crate::error::{SearchError, SearchResult};
use crate::fields::FieldMap;
use crate::filter::accepts;
use crate::flatten::unflatten;
use crate::provider::{RawPage, RecordProvider};
use crate::query::QueryBuilder;
use crate::record::{ClassifiedRecord, SchoolRecord};
use crate::types::{page_count, FetchState, FilterCriteria, Page};

/// Handle to a spawned fetch. Awaiting it is optional.
pub type FetchTask = JoinHandle<FetchOutcome>;

/// What happened to one dispatched fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Loaded { token: u64 },
    Failed { token: u64 },
    /// A newer request was issued before this one resolved
    Discarded { token: u64, latest: u64 },
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub page_size: u32,
    pub fetch_timeout: Duration,
    pub cancel_superseded: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: 20,
            fetch_timeout: Duration::from_secs(30),
            cancel_superseded: true,
        }
    }
}

impl From<&SearchConfig> for ControllerOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            page_size: config.page_size,
            fetch_timeout: config.fetch_timeout(),
            cancel_superseded: config.cancel_superseded,
        }
    }
}

struct Session {
    criteria: FilterCriteria,
    page_index: u32,
    page_size: u32,
    latest_token: u64,
    page_count: Option<u32>,
    in_flight: Option<AbortHandle>,
}

struct Shared<P> {
    provider: P,
    builder: QueryBuilder,
    options: ControllerOptions,
    session: Mutex<Session>,
    state_tx: watch::Sender<FetchState>,
}

impl<P> Shared<P> {
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cheap to clone; all clones drive the same session
pub struct FetchController<P> {
    shared: Arc<Shared<P>>,
}

impl<P> Clone for FetchController<P> {
    fn clone(&self) -> Self {
        Self { shared: Arc::clone(&self.shared) }
    }
}

impl<P> FetchController<P>
where
    P: RecordProvider + 'static,
{
    pub fn new(provider: P, builder: QueryBuilder, options: ControllerOptions) -> Self {
        let (state_tx, _) = watch::channel(FetchState::Idle);
        let session = Session {
            criteria: FilterCriteria::default(),
            page_index: 0,
            page_size: options.page_size,
            latest_token: 0,
            page_count: None,
            in_flight: None,
        };
        Self {
            shared: Arc::new(Shared {
                provider,
                builder,
                options,
                session: Mutex::new(session),
                state_tx,
            }),
        }
    }

    pub fn from_config(provider: P, config: &SearchConfig) -> Self {
        Self::new(
            provider,
            QueryBuilder::new(config.fields.clone()),
            ControllerOptions::from(config),
        )
    }

    /// Snapshot of the current state
    pub fn state(&self) -> FetchState {
        self.shared.state_tx.borrow().clone()
    }

    /// Receiver that observes every published state change
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.shared.state_tx.subscribe()
    }

    pub fn criteria(&self) -> FilterCriteria {
        self.shared.session().criteria.clone()
    }

    pub fn page_index(&self) -> u32 {
        self.shared.session().page_index
    }

    pub fn page_size(&self) -> u32 {
        self.shared.session().page_size
    }

    /// Known once a page has loaded for the current criteria and page size
    pub fn page_count(&self) -> Option<u32> {
        self.shared.session().page_count
    }

    pub fn latest_token(&self) -> u64 {
        self.shared.session().latest_token
    }

    /// New search: replaces the criteria and starts over at the first page
    pub fn set_criteria(&self, criteria: FilterCriteria) -> FetchTask {
        let mut session = self.shared.session();
        session.criteria = criteria;
        session.page_index = 0;
        session.page_count = None;
        self.dispatch(session)
    }

    /// Jump to a page. Fails if the page count is known and `page_index` is past it.
    pub fn goto_page(&self, page_index: u32) -> SearchResult<FetchTask> {
        let mut session = self.shared.session();
        if let Some(count) = session.page_count {
            if page_index >= count.max(1) {
                return Err(SearchError::invalid(format!(
                    "page {} out of range, {} pages available",
                    page_index, count
                )));
            }
        }
        session.page_index = page_index;
        Ok(self.dispatch(session))
    }

    /// `None` when already on the last known page
    pub fn next_page(&self) -> Option<FetchTask> {
        let mut session = self.shared.session();
        let next = session.page_index.checked_add(1)?;
        if let Some(count) = session.page_count {
            if next >= count {
                return None;
            }
        }
        session.page_index = next;
        Some(self.dispatch(session))
    }

    /// `None` when already on the first page
    pub fn previous_page(&self) -> Option<FetchTask> {
        let mut session = self.shared.session();
        let previous = session.page_index.checked_sub(1)?;
        session.page_index = previous;
        Some(self.dispatch(session))
    }

    /// Change rows per page and go back to the first page
    pub fn set_page_size(&self, page_size: u32) -> FetchTask {
        let mut session = self.shared.session();
        session.page_size = page_size;
        session.page_index = 0;
        session.page_count = None;
        self.dispatch(session)
    }

    /// Re-issue the current request, e.g. after an error
    pub fn refresh(&self) -> FetchTask {
        let session = self.shared.session();
        self.dispatch(session)
    }

    fn dispatch(&self, mut session: MutexGuard<'_, Session>) -> FetchTask {
        session.latest_token += 1;
        let token = session.latest_token;

        if let Some(previous) = session.in_flight.take() {
            if self.shared.options.cancel_superseded {
                previous.abort();
            }
        }

        let criteria = session.criteria.clone();
        let page_index = session.page_index;
        let page_size = session.page_size;

        let request = match self.shared.builder.build(&criteria, page_index, page_size) {
            Ok(request) => request,
            Err(err) => {
                warn!(token, error = %err, "rejected search request");
                self.shared.state_tx.send_replace(FetchState::Error(err));
                return tokio::spawn(async move { FetchOutcome::Failed { token } });
            }
        };

        let (abort_handle, registration) = AbortHandle::new_pair();
        session.in_flight = Some(abort_handle);
        self.shared.state_tx.send_replace(FetchState::Loading { token });
        drop(session);

        debug!(token, page_index, page_size, "dispatching fetch");

        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            let timeout = shared.options.fetch_timeout;
            let call = Abortable::new(shared.provider.fetch(&request), registration);
            let result = match tokio::time::timeout(timeout, call).await {
                Ok(Ok(result)) => result,
                Ok(Err(_aborted)) => Err(SearchError::Cancelled),
                Err(_elapsed) => Err(SearchError::Timeout(timeout)),
            };

            let result = result.and_then(|raw| {
                assemble_page(raw, &criteria, page_index, page_size, shared.builder.fields())
            });

            shared.resolve(token, result)
        })
    }
}

impl<P> Shared<P> {
    fn resolve(&self, token: u64, result: SearchResult<Page>) -> FetchOutcome {
        let mut session = self.session();
        if token != session.latest_token {
            debug!(token, latest = session.latest_token, "discarding stale response");
            return FetchOutcome::Discarded { token, latest: session.latest_token };
        }
        session.in_flight = None;

        match result {
            Ok(page) => {
                info!(
                    token,
                    page_index = page.page_index,
                    page_count = page.page_count,
                    shown = page.records.len(),
                    total = page.total_count,
                    "page loaded"
                );
                session.page_count = Some(page.page_count);
                self.state_tx.send_replace(FetchState::Loaded(page));
                FetchOutcome::Loaded { token }
            }
            Err(err) => {
                warn!(token, error = %err, "fetch failed");
                self.state_tx.send_replace(FetchState::Error(err));
                FetchOutcome::Failed { token }
            }
        }
    }
}

/// Unflatten, classify and filter one provider page. Any bad record fails
/// the whole page.
pub fn assemble_page(
    raw: RawPage,
    criteria: &FilterCriteria,
    page_index: u32,
    page_size: u32,
    fields: &FieldMap,
) -> SearchResult<Page> {
    let mut records = Vec::with_capacity(raw.results.len());
    for flat in &raw.results {
        let nested: Value = unflatten(flat);
        let record = SchoolRecord::from_nested(&nested, fields)?;
        let category = classify(&record, criteria)?;
        let classified = ClassifiedRecord { record, category };
        if accepts(&classified, criteria) {
            records.push(classified);
        }
    }

    Ok(Page {
        records,
        total_count: raw.total,
        page_index,
        page_size,
        page_count: page_count(raw.total, page_size),
        fetched_at: Utc::now(),
    })
}
