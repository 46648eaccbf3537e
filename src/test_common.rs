#![cfg(test)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::fetch::{FetchError, FetchResponse, Fetcher};

thread_local! {
    static CAPTURED: RefCell<Option<Vec<(Level, String)>>> = const { RefCell::new(None) };
}

/// Records log messages emitted on the thread that is currently inside [captured_logs].
struct CapturingLogger;

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|captured| {
            if let Some(records) = captured.borrow_mut().as_mut() {
                records.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

static LOGGER: CapturingLogger = CapturingLogger;
static INIT_LOGGER: Once = Once::new();

/// Run `f` and return its result together with every message it logged on this thread.
pub fn captured_logs<R, F: FnOnce() -> R>(f: F) -> (R, Vec<(Level, String)>) {
    INIT_LOGGER.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });

    CAPTURED.with(|captured| *captured.borrow_mut() = Some(Vec::new()));
    let result = f();
    let records = CAPTURED.with(|captured| captured.borrow_mut().take().unwrap_or_default());
    (result, records)
}

/// One scripted outcome of a [ScriptedFetcher] call.
#[derive(Clone, Debug)]
pub enum Scripted {
    Response(u16, String),
    Transport,
    Panic,
}

impl Scripted {
    pub fn ok(document: serde_json::Value) -> Self {
        Scripted::Response(200, document.to_string())
    }
}

/// A [Fetcher] that plays back a fixed list of outcomes and records how it was called. Once the
/// script runs out every call fails with a transport error, unless it was built with
/// [ScriptedFetcher::repeating].
#[derive(Clone)]
pub struct ScriptedFetcher {
    state: Arc<Mutex<ScriptState>>,
}

struct ScriptState {
    script: VecDeque<Scripted>,
    repeat: bool,
    calls: Vec<(String, Duration, bool)>,
}

impl ScriptedFetcher {
    pub fn new(script: Vec<Scripted>) -> Self {
        Self::build(script, false)
    }

    pub fn repeating(script: Vec<Scripted>) -> Self {
        Self::build(script, true)
    }

    fn build(script: Vec<Scripted>, repeat: bool) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                script: script.into(),
                repeat,
                calls: Vec::new(),
            })),
        }
    }

    pub fn calls(&self) -> Vec<(String, Duration, bool)> {
        self.state.lock().unwrap().calls.clone()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
        verify_tls: bool,
    ) -> Result<FetchResponse, FetchError> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.calls.push((url.to_string(), timeout, verify_tls));
            let next = state.script.pop_front();
            if let (Some(outcome), true) = (&next, state.repeat) {
                state.script.push_back(outcome.clone());
            }
            next
        };

        // the lock is released before panicking so later calls still work
        match next {
            Some(Scripted::Response(status, body)) => Ok(FetchResponse::new(status, body)),
            Some(Scripted::Panic) => panic!("scripted fetch failure"),
            Some(Scripted::Transport) | None => {
                Err(FetchError::Transport("connection refused".to_string()))
            }
        }
    }
}
