//! Pattern-matched pub/sub event dispatch.
//!
//! The dispatcher decouples "something changed in the graph" from "who cares
//! and what they do about it". Stores notify it once per triple actually
//! written or erased; it scans the registered subscriptions and invokes every
//! callback whose pattern and event kind match.
//!
//! # Architecture
//!
//! 1. Subscriptions live in a registry keyed by `SubscriptionId`
//! 2. `dispatch` collects the matching callbacks under a read guard, then
//!    releases it before invoking anything, so callbacks may re-enter the
//!    store or the registry
//! 3. Synchronous callbacks run inline and block the triggering write;
//!    deferred ones are queued to a bounded channel drained by a background
//!    worker thread
//! 4. A callback that fails or panics is isolated and logged; it never unwinds
//!    into the write that triggered it and never stops the other callbacks
//!
//! The dispatcher is an explicit object handed to each store at construction.
//! There is no process-global registry, so independent stores and tests stay
//! isolated.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use oxigraph::model::{NamedNode, NamedOrBlankNode, Term, Triple};

use crate::error::Error;

mod worker;

/// Kind of graph mutation an event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Insert,
    Delete,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Insert => write!(f, "INSERT"),
            EventKind::Delete => write!(f, "DELETE"),
        }
    }
}

/// Whether a callback blocks the triggering write or runs on the background
/// worker.
///
/// Deferred callbacks change read-after-write expectations downstream: a
/// trigger chain that queries the store immediately may observe state from
/// before the deferred callback has run. Callers that re-read what they react
/// to should subscribe synchronously.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    #[default]
    Sync,
    Deferred,
}

/// Opaque handle identifying one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A triple template where `None` is a wildcard. A pattern matches any triple
/// that agrees on every concrete position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Option<NamedNode>,
    pub predicate: Option<NamedNode>,
    pub object: Option<Term>,
}

impl TriplePattern {
    /// The all-wildcard pattern.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn new(
        subject: Option<NamedNode>,
        predicate: Option<NamedNode>,
        object: Option<Term>,
    ) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<NamedNode>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_predicate(mut self, predicate: impl Into<NamedNode>) -> Self {
        self.predicate = Some(predicate.into());
        self
    }

    pub fn with_object(mut self, object: impl Into<Term>) -> Self {
        self.object = Some(object.into());
        self
    }

    pub fn matches(&self, triple: &Triple) -> bool {
        let subject_ok = match &self.subject {
            None => true,
            Some(want) => {
                matches!(&triple.subject, NamedOrBlankNode::NamedNode(n) if n == want)
            }
        };
        let predicate_ok = match &self.predicate {
            None => true,
            Some(want) => &triple.predicate == want,
        };
        let object_ok = match &self.object {
            None => true,
            Some(want) => &triple.object == want,
        };
        subject_ok && predicate_ok && object_ok
    }
}

/// One mutation notification: what happened, in which named graph, to which
/// triple.
#[derive(Debug, Clone)]
pub struct TripleEvent {
    pub kind: EventKind,
    pub graph: String,
    pub triple: Triple,
}

/// What a callback returns. An `Err` is logged and contained by the
/// dispatcher.
pub type CallbackResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

pub(crate) type EventCallback = Arc<dyn Fn(&TripleEvent) -> CallbackResult + Send + Sync>;

struct Subscription {
    pattern: TriplePattern,
    kind: EventKind,
    mode: RunMode,
    callback: EventCallback,
}

/// Dispatcher tuning knobs.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Bound of the deferred event queue. A full queue blocks the dispatching
    /// write until the worker catches up.
    pub deferred_queue_capacity: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            deferred_queue_capacity: 256,
        }
    }
}

/// Registry of subscriptions plus the deferred-execution worker.
pub struct EventDispatcher {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
    worker: worker::DeferredWorker,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::with_config(DispatcherConfig::default())
    }

    pub fn with_config(config: DispatcherConfig) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            worker: worker::DeferredWorker::start(config.deferred_queue_capacity),
        }
    }

    /// Registers a callback for every future event whose kind and triple
    /// match. Returns the id used to unsubscribe.
    pub fn subscribe<F>(
        &self,
        pattern: TriplePattern,
        kind: EventKind,
        mode: RunMode,
        callback: F,
    ) -> SubscriptionId
    where
        F: Fn(&TripleEvent) -> CallbackResult + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Subscription {
            pattern,
            kind,
            mode,
            callback: Arc::new(callback),
        };
        self.subscriptions
            .write()
            .unwrap()
            .insert(id, subscription);
        id
    }

    /// Removes a subscription. Returns `false` when the id was not
    /// registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.write().unwrap().remove(&id).is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().unwrap().len()
    }

    /// Delivers one event to every matching subscription.
    ///
    /// The relative order in which independently registered callbacks run is
    /// unspecified. The store mutation that produced the event has already
    /// committed; nothing a callback does can roll it back.
    pub fn dispatch(&self, event: &TripleEvent) {
        // Collect matches under the read guard, invoke after releasing it.
        let matched: Vec<(SubscriptionId, RunMode, EventCallback)> = {
            let subscriptions = self.subscriptions.read().unwrap();
            subscriptions
                .iter()
                .filter(|(_, s)| s.kind == event.kind && s.pattern.matches(&event.triple))
                .map(|(id, s)| (*id, s.mode, Arc::clone(&s.callback)))
                .collect()
        };

        for (id, mode, callback) in matched {
            match mode {
                RunMode::Sync => run_callback(id, &callback, event),
                RunMode::Deferred => {
                    let job = worker::DeferredJob {
                        subscription: id,
                        callback,
                        event: event.clone(),
                    };
                    if !self.worker.submit(job) {
                        tracing::warn!(
                            subscription = %id,
                            "deferred event queue is shut down; event dropped"
                        );
                    }
                }
            }
        }
    }

    /// Stops the deferred worker after draining everything already queued.
    /// Further deferred events are dropped with a warning. Idempotent.
    pub fn shutdown(&self) {
        self.worker.shutdown();
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EventDispatcher {
    fn drop(&mut self) {
        self.worker.shutdown();
    }
}

/// Runs one callback with full isolation: a returned error or a panic is
/// logged as a `CallbackFailure` and goes no further.
pub(crate) fn run_callback(
    subscription: SubscriptionId,
    callback: &EventCallback,
    event: &TripleEvent,
) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
    let message = match outcome {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(payload) => panic_message(payload.as_ref()),
    };
    let failure = Error::CallbackFailure {
        subscription,
        message,
    };
    tracing::error!(error = %failure, "event callback failed; write already committed");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "callback panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(value: &str) -> NamedNode {
        NamedNode::new(value).unwrap()
    }

    fn triple(s: &str, p: &str, o: &str) -> Triple {
        Triple::new(uri(s), uri(p), uri(o))
    }

    #[test]
    fn test_wildcard_pattern_matches_everything() {
        let t = triple("http://e/s", "http://e/p", "http://e/o");
        assert!(TriplePattern::any().matches(&t));
    }

    #[test]
    fn test_predicate_pattern_matches_only_that_predicate() {
        let pattern = TriplePattern::any().with_predicate(uri("http://e/p"));
        assert!(pattern.matches(&triple("http://e/s", "http://e/p", "http://e/o")));
        assert!(!pattern.matches(&triple("http://e/s", "http://e/q", "http://e/o")));
    }

    #[test]
    fn test_concrete_pattern_requires_exact_triple() {
        let pattern = TriplePattern::any()
            .with_subject(uri("http://e/s"))
            .with_predicate(uri("http://e/p"))
            .with_object(uri("http://e/o"));
        assert!(pattern.matches(&triple("http://e/s", "http://e/p", "http://e/o")));
        assert!(!pattern.matches(&triple("http://e/s2", "http://e/p", "http://e/o")));
        assert!(!pattern.matches(&triple("http://e/s", "http://e/p", "http://e/o2")));
    }

    #[test]
    fn test_literal_object_pattern_distinguishes_terms() {
        use oxigraph::model::Literal;

        let pattern =
            TriplePattern::any().with_object(Term::Literal(Literal::new_simple_literal("x")));
        let matching = Triple::new(
            uri("http://e/s"),
            uri("http://e/p"),
            Literal::new_simple_literal("x"),
        );
        let other = Triple::new(
            uri("http://e/s"),
            uri("http://e/p"),
            Literal::new_simple_literal("y"),
        );
        assert!(pattern.matches(&matching));
        assert!(!pattern.matches(&other));
    }
}
