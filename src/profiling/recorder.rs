use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Per-function totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionStats {
    pub name: String,
    pub calls: u64,
    /// Time inside the function including callees. Recursive re-entries are
    /// counted once.
    #[serde(with = "duration_micros")]
    pub inclusive: Duration,
    /// Time inside the function excluding callees.
    #[serde(with = "duration_micros")]
    pub own: Duration,
}

/// Caller to callee totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeStats {
    pub caller: String,
    pub callee: String,
    pub calls: u64,
    #[serde(with = "duration_micros")]
    pub inclusive: Duration,
}

/// Everything a profiling run collected. This is the on-disk artifact format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallStats {
    pub snippet: String,
    pub recorded_at: DateTime<Utc>,
    #[serde(with = "duration_micros")]
    pub total_time: Duration,
    pub functions: Vec<FunctionStats>,
    pub edges: Vec<EdgeStats>,
}

impl CallStats {
    pub fn function(&self, name: &str) -> Option<&FunctionStats> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn edge(&self, caller: &str, callee: &str) -> Option<&EdgeStats> {
        self.edges
            .iter()
            .find(|e| e.caller == caller && e.callee == callee)
    }
}

struct Frame {
    id: u64,
    name: String,
    started: Instant,
    child_time: Duration,
}

#[derive(Default)]
struct Totals {
    calls: u64,
    inclusive: Duration,
    own: Duration,
}

#[derive(Default)]
struct EdgeTotals {
    calls: u64,
    inclusive: Duration,
}

#[derive(Default)]
struct State {
    next_id: u64,
    stack: Vec<Frame>,
    functions: BTreeMap<String, Totals>,
    edges: BTreeMap<(String, String), EdgeTotals>,
}

/// Deterministic call recorder. Code under measurement marks its functions with
/// [`span`](Self::span); nesting of the returned guards defines the call graph.
#[derive(Default)]
pub struct Profiler {
    state: RefCell<State>,
}

/// Closes its span when dropped. Dropping an outer guard first also closes the
/// spans opened inside it.
#[must_use = "the span ends as soon as the guard is dropped"]
pub struct SpanGuard<'a> {
    profiler: &'a Profiler,
    frame: u64,
}

impl Drop for SpanGuard<'_> {
    fn drop(&mut self) {
        self.profiler.exit(self.frame);
    }
}

impl Profiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn span(&self, name: impl Into<String>) -> SpanGuard<'_> {
        let name = name.into();
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        state.functions.entry(name.clone()).or_default().calls += 1;
        if let Some(caller) = state.stack.last().map(|frame| frame.name.clone()) {
            state.edges.entry((caller, name.clone())).or_default().calls += 1;
        }
        let id = state.next_id;
        state.next_id += 1;
        state.stack.push(Frame {
            id,
            name,
            started: Instant::now(),
            child_time: Duration::ZERO,
        });

        SpanGuard {
            profiler: self,
            frame: id,
        }
    }

    /// Run `f` inside a span called `name`.
    pub fn time<R>(&self, name: impl Into<String>, f: impl FnOnce() -> R) -> R {
        let _guard = self.span(name);
        f()
    }

    pub fn depth(&self) -> usize {
        self.state.borrow().stack.len()
    }

    /// Close the span `id` along with any spans still open inside it. A guard
    /// whose span was already closed that way does nothing.
    fn exit(&self, id: u64) {
        let mut guard = self.state.borrow_mut();
        let Some(position) = guard.stack.iter().position(|frame| frame.id == id) else {
            return;
        };
        while guard.stack.len() > position {
            close_top(&mut guard);
        }
    }

    /// Snapshot of everything recorded so far. Open spans are not included.
    pub fn stats(&self, snippet: &str, total_time: Duration) -> CallStats {
        let state = self.state.borrow();
        CallStats {
            snippet: snippet.to_string(),
            recorded_at: Utc::now(),
            total_time,
            functions: state
                .functions
                .iter()
                .map(|(name, totals)| FunctionStats {
                    name: name.clone(),
                    calls: totals.calls,
                    inclusive: totals.inclusive,
                    own: totals.own,
                })
                .collect(),
            edges: state
                .edges
                .iter()
                .map(|((caller, callee), totals)| EdgeStats {
                    caller: caller.clone(),
                    callee: callee.clone(),
                    calls: totals.calls,
                    inclusive: totals.inclusive,
                })
                .collect(),
        }
    }
}

// Microsecond precision; millisecond totals would flatten most call graphs.
mod duration_micros {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_micros() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let micros = u64::deserialize(deserializer)?;
        Ok(Duration::from_micros(micros))
    }
}


fn close_top(state: &mut State) {
    let Some(frame) = state.stack.pop() else {
        return;
    };
    let elapsed = frame.started.elapsed();
    let own = elapsed.saturating_sub(frame.child_time);
    let recursive = state.stack.iter().any(|outer| outer.name == frame.name);

    let totals = state.functions.entry(frame.name.clone()).or_default();
    totals.own += own;
    if !recursive {
        totals.inclusive += elapsed;
    }

    if let Some(caller) = state.stack.last_mut() {
        caller.child_time += elapsed;
        let key = (caller.name.clone(), frame.name);
        state.edges.entry(key).or_default().inclusive += elapsed;
    }
}
