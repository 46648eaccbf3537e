use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use itertools::Itertools;
use log::{debug, error, info};

use crate::config::ClientConfig;
use crate::error::Error;
use crate::fetch::{FetchError, Fetcher};
use crate::flag::Flag;
use crate::flag_value::FlagValue;
use crate::parse::parse_flags_slice;
use crate::snapshot::{FlagSet, SnapshotCell};
use crate::store::Store;

const REFRESH_THREAD_NAME: &str = "flagsync-refresh";

/// FlagClient keeps a local copy of the remote flag set and refreshes it in the background.
///
/// Construction performs one synchronous fetch. If it yields flags they are served immediately;
/// otherwise the supplied defaults are served until the first successful refresh. After that a
/// background thread refetches every [ClientConfig::interval]. A failed or empty refresh keeps
/// the current flags, so the client never reverts to its defaults once live data has arrived.
///
/// No operation on the client returns an error or panics because of the remote source. The
/// only visible failure mode is stale flags, observable through [FlagClient::last_update].
///
/// The refresh thread stops when [FlagClient::shutdown] is called or the client is dropped. It
/// is never joined, so process exit does not wait for an in-flight fetch.
pub struct FlagClient {
    refresher: Arc<Refresher>,
    shutdown: Mutex<Option<Sender<()>>>,
}

struct Refresher {
    config: ClientConfig,
    fetcher: Box<dyn Fetcher>,
    snapshot: SnapshotCell,
}

#[derive(Debug, thiserror::Error)]
enum RefreshError {
    #[error(transparent)]
    Transport(#[from] FetchError),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error(transparent)]
    Document(#[from] Error),
}

impl FlagClient {
    /// Create a client that fetches flags over HTTP.
    #[cfg(feature = "http")]
    pub fn new(config: ClientConfig, default_flags: HashMap<String, Flag>) -> Self {
        Self::with_fetcher(config, default_flags, crate::fetch::HttpFetcher::new())
    }

    /// Create a client that fetches flags with a custom [Fetcher].
    pub fn with_fetcher<F>(
        config: ClientConfig,
        default_flags: HashMap<String, Flag>,
        fetcher: F,
    ) -> Self
    where
        F: Fetcher + 'static,
    {
        Self::with_spawner(config, default_flags, fetcher, spawn_refresh_thread)
    }

    fn with_spawner<F, S>(
        config: ClientConfig,
        default_flags: HashMap<String, Flag>,
        fetcher: F,
        spawn: S,
    ) -> Self
    where
        F: Fetcher + 'static,
        S: FnOnce(Arc<Refresher>, Receiver<()>) -> std::io::Result<()>,
    {
        let refresher = Arc::new(Refresher {
            config,
            fetcher: Box::new(fetcher),
            snapshot: SnapshotCell::new(FlagSet::new(default_flags)),
        });

        refresher.refresh_once();

        let (sender, receiver) = mpsc::channel();
        let shutdown = match spawn(Arc::clone(&refresher), receiver) {
            Ok(()) => Some(sender),
            Err(e) => {
                error!("failed to schedule recurring flag update: {}", e);
                None
            }
        };

        Self {
            refresher,
            shutdown: Mutex::new(shutdown),
        }
    }

    /// The current snapshot. It stays consistent for as long as it is held, even while newer
    /// snapshots replace it.
    pub fn flags(&self) -> Arc<FlagSet> {
        self.refresher.snapshot.load()
    }

    /// When the current snapshot was produced.
    pub fn last_update(&self) -> DateTime<Utc> {
        self.flags().last_update()
    }

    pub fn flag(&self, name: &str) -> Option<Flag> {
        self.flags().flag(name).cloned()
    }

    /// Evaluate the flag named `name` against the current snapshot. Unknown flags are off.
    pub fn is_enabled(&self, name: &str, context: Option<&FlagValue>) -> bool {
        self.flags().is_enabled(name, context)
    }

    pub fn url(&self) -> &str {
        &self.refresher.config.url
    }

    pub fn interval(&self) -> Duration {
        self.refresher.config.interval
    }

    pub fn timeout(&self) -> Duration {
        self.refresher.config.timeout
    }

    pub fn verify_tls(&self) -> bool {
        self.refresher.config.verify_tls
    }

    pub fn config(&self) -> &ClientConfig {
        &self.refresher.config
    }

    /// Run one refresh cycle on the calling thread. Returns true if the snapshot was replaced.
    pub fn refresh(&self) -> bool {
        self.refresher.refresh_once()
    }

    /// Stop the background refresh. The current snapshot stays available. Calling this more
    /// than once has no further effect.
    pub fn shutdown(&self) {
        let sender = self
            .shutdown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            // the thread may already be gone, in which case there is nobody to notify
            let _ = sender.send(());
        }
    }
}

impl Refresher {
    /// Fetch and parse the remote flag set. Every failure is logged and yields an empty map.
    fn fetch_remote(&self) -> HashMap<String, Flag> {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_fetch_remote())) {
            Ok(Ok(flags)) => flags,
            Ok(Err(RefreshError::Document(e))) => {
                error!("invalid flag document from {}: {}", self.config.url, e);
                HashMap::new()
            }
            Ok(Err(e)) => {
                error!("error fetching flags from {}: {}", self.config.url, e);
                HashMap::new()
            }
            Err(panic) => {
                error!(
                    "unexpected error during flag fetch: {}",
                    panic_message(panic.as_ref())
                );
                HashMap::new()
            }
        }
    }

    fn try_fetch_remote(&self) -> Result<HashMap<String, Flag>, RefreshError> {
        let response = self.fetcher.fetch(
            &self.config.url,
            self.config.timeout,
            self.config.verify_tls,
        )?;
        if !response.is_success() {
            return Err(RefreshError::Status(response.status));
        }
        Ok(parse_flags_slice(&response.body)?)
    }

    fn refresh_once(&self) -> bool {
        self.refresh_with(|| self.fetch_remote())
    }

    fn refresh_with<F>(&self, fetch: F) -> bool
    where
        F: FnOnce() -> HashMap<String, Flag>,
    {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let flags = fetch();
            if flags.is_empty() {
                debug!("no flags fetched, keeping current flags");
                return false;
            }

            let next = FlagSet::new(flags);
            info!("updated {} flags: {}", next.len(), next.names().iter().join(", "));
            self.snapshot.store(next);
            true
        }));

        result.unwrap_or_else(|panic| {
            error!(
                "unexpected error during flag update: {}",
                panic_message(panic.as_ref())
            );
            false
        })
    }

    fn tick(&self) {
        self.tick_with(|| self.refresh_once())
    }

    fn tick_with<F>(&self, refresh: F)
    where
        F: FnOnce() -> bool,
    {
        if let Err(panic) = panic::catch_unwind(AssertUnwindSafe(refresh)) {
            error!(
                "error during recurring flag update: {}",
                panic_message(panic.as_ref())
            );
        }
    }
}

fn spawn_refresh_thread(
    refresher: Arc<Refresher>,
    shutdown: Receiver<()>,
) -> std::io::Result<()> {
    // the handle is dropped, detaching the thread
    thread::Builder::new()
        .name(REFRESH_THREAD_NAME.to_string())
        .spawn(move || run_refresh_loop(&refresher, &shutdown))
        .map(|_| ())
}

fn run_refresh_loop(refresher: &Refresher, shutdown: &Receiver<()>) {
    loop {
        match shutdown.recv_timeout(refresher.config.refresh_interval()) {
            Err(RecvTimeoutError::Timeout) => refresher.tick(),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("stopping recurring flag update for {}", refresher.config.url);
                return;
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
