use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::backtrace::Backtrace;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use super::recorder::{CallStats, Profiler};

/// Named values handed to the code under measurement. Lookups see locals
/// before globals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bindings {
    #[serde(default)]
    pub globals: BTreeMap<String, Value>,
    #[serde(default)]
    pub locals: BTreeMap<String, Value>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.globals.insert(name.into(), value.into());
        self
    }

    pub fn with_local(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.locals.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.locals.get(name).or_else(|| self.globals.get(name))
    }
}

/// Outcome of one measured execution.
#[derive(Debug)]
pub struct ProfileRun<T, E> {
    pub elapsed: Duration,
    /// Whatever the measured code returned, failures included.
    pub outcome: Result<T, E>,
    pub stats: CallStats,
}

impl<T, E> ProfileRun<T, E> {
    pub fn into_outcome(self) -> Result<T, E> {
        self.outcome
    }
}

/// Execute `body` once under a fresh [`Profiler`]. The whole call is recorded
/// as a span named `snippet`; the body adds its own spans beneath it.
pub fn run_profile<T, E, F>(snippet: &str, bindings: &Bindings, body: F) -> ProfileRun<T, E>
where
    F: FnOnce(&Profiler, &Bindings) -> Result<T, E>,
{
    let profiler = Profiler::new();
    let started = Instant::now();
    let outcome = {
        let _root = profiler.span(snippet);
        body(&profiler, bindings)
    };
    let elapsed = started.elapsed();

    tracing::debug!("Profiled '{}' in {:?}", snippet, elapsed);

    ProfileRun {
        elapsed,
        outcome,
        stats: profiler.stats(snippet, elapsed),
    }
}

/// Title placed on the rendered graph: the snippet and its run time, or the
/// current stack when `show_stack` is set.
pub fn summary_label(snippet: &str, elapsed: Duration, show_stack: bool) -> String {
    if show_stack {
        return Backtrace::force_capture().to_string();
    }
    format!("{snippet} | Total Time: {:.6}s", elapsed.as_secs_f64())
}
