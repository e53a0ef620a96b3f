// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Event Bus - scan lifecycle notifications
//!
//! Decouples scan execution from whatever presents it. Reporters and front
//! ends subscribe here and never touch the executor or testers directly.
//!
//! # Dispatch rules
//!
//! - Handlers for one event kind run in subscription order.
//! - A handler that returns an error or panics is logged and skipped; the
//!   remaining handlers still run and the publisher never sees the failure.
//! - The bus keeps no history: events published before a subscription are
//!   not replayed.
//!
//! # Example
//!
//! ```rust,ignore
//! use lonkero_mapper::event_bus::{EventBus, EventKind, ScanEvent};
//!
//! let bus = EventBus::new();
//! bus.subscribe(EventKind::VulnerabilityFound, |event| {
//!     if let ScanEvent::VulnerabilityFound(finding) = event {
//!         println!("{} at {}", finding.vuln_type, finding.url);
//!     }
//!     Ok(())
//! });
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, warn};

use crate::types::Finding;

/// Closed set of event kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ScanStart,
    Progress,
    VulnerabilityFound,
    ScanComplete,
    Error,
    LogMessage,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventKind::ScanStart => "scan_start",
            EventKind::Progress => "progress",
            EventKind::VulnerabilityFound => "vulnerability_found",
            EventKind::ScanComplete => "scan_complete",
            EventKind::Error => "error",
            EventKind::LogMessage => "log_message",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
}

/// A scan lifecycle notification
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    ScanStart {
        target: String,
        profile: String,
    },
    Progress {
        message: String,
        percent: Option<u8>,
    },
    VulnerabilityFound(Finding),
    ScanComplete {
        target: String,
        findings: usize,
        duration_ms: u64,
    },
    Error {
        source: String,
        message: String,
    },
    LogMessage {
        level: LogLevel,
        message: String,
    },
}

impl ScanEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ScanEvent::ScanStart { .. } => EventKind::ScanStart,
            ScanEvent::Progress { .. } => EventKind::Progress,
            ScanEvent::VulnerabilityFound(_) => EventKind::VulnerabilityFound,
            ScanEvent::ScanComplete { .. } => EventKind::ScanComplete,
            ScanEvent::Error { .. } => EventKind::Error,
            ScanEvent::LogMessage { .. } => EventKind::LogMessage,
        }
    }

    pub fn progress(message: impl Into<String>, percent: Option<u8>) -> Self {
        ScanEvent::Progress {
            message: message.into(),
            percent,
        }
    }

    pub fn error(source: impl Into<String>, message: impl Into<String>) -> Self {
        ScanEvent::Error {
            source: source.into(),
            message: message.into(),
        }
    }

    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        ScanEvent::LogMessage {
            level,
            message: message.into(),
        }
    }
}

pub type SyncHandler = Arc<dyn Fn(&ScanEvent) -> anyhow::Result<()> + Send + Sync>;
pub type AsyncHandler = Arc<dyn Fn(ScanEvent) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

#[derive(Clone)]
enum Handler {
    /// Runs inline on the publishing thread
    Sync(SyncHandler),
    /// Needs the async runtime
    Async(AsyncHandler),
}

/// Typed publish/subscribe channel
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
    /// Runtime that async handlers are queued onto from `publish_sync`
    runtime: Mutex<Option<Handle>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.handlers.read();
        f.debug_struct("EventBus")
            .field("subscriptions", &handlers.values().map(Vec::len).sum::<usize>())
            .finish()
    }
}

impl EventBus {
    /// Create a bus, remembering the current runtime if there is one
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
            runtime: Mutex::new(Handle::try_current().ok()),
        }
    }

    /// Bind the runtime used for async handlers published from foreign threads
    pub fn with_runtime(self, handle: Handle) -> Self {
        *self.runtime.lock() = Some(handle);
        self
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&ScanEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Handler::Sync(Arc::new(handler)));
    }

    pub fn subscribe_async<F, Fut>(&self, kind: EventKind, handler: F)
    where
        F: Fn(ScanEvent) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let handler: AsyncHandler = Arc::new(move |event| handler(event).boxed());
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push(Handler::Async(handler));
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    fn handlers_for(&self, kind: EventKind) -> Vec<Handler> {
        self.handlers.read().get(&kind).cloned().unwrap_or_default()
    }

    /// Deliver `event` to every handler of its kind, in subscription order,
    /// awaiting async handlers one after another.
    pub async fn publish(&self, event: ScanEvent) {
        let kind = event.kind();
        for handler in self.handlers_for(kind) {
            match handler {
                Handler::Sync(handler) => invoke_sync(kind, &handler, &event),
                Handler::Async(handler) => invoke_async(kind, handler, event.clone()).await,
            }
        }
    }

    /// Publish without awaiting.
    ///
    /// Sync handlers run inline right away. Async handlers are queued, in
    /// order, onto the active runtime if the caller is inside one, otherwise
    /// onto the runtime bound to the bus. With no runtime at all they are
    /// dropped with a warning.
    pub fn publish_sync(&self, event: ScanEvent) {
        let kind = event.kind();
        let mut deferred = Vec::new();

        for handler in self.handlers_for(kind) {
            match handler {
                Handler::Sync(handler) => invoke_sync(kind, &handler, &event),
                Handler::Async(handler) => deferred.push(handler),
            }
        }

        if deferred.is_empty() {
            return;
        }

        let handle = Handle::try_current()
            .ok()
            .or_else(|| self.runtime.lock().clone());

        match handle {
            Some(handle) => {
                handle.spawn(async move {
                    for handler in deferred {
                        invoke_async(kind, handler, event.clone()).await;
                    }
                });
            }
            None => warn!(
                "[EventBus] No runtime available, dropped {} async handler(s) for {}",
                deferred.len(),
                kind
            ),
        }
    }
}

fn invoke_sync(kind: EventKind, handler: &SyncHandler, event: &ScanEvent) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("[EventBus] Handler for {} failed: {:#}", kind, e),
        Err(_) => warn!("[EventBus] Handler for {} panicked", kind),
    }
}

async fn invoke_async(kind: EventKind, handler: AsyncHandler, event: ScanEvent) {
    let outcome = match std::panic::catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(future) => AssertUnwindSafe(future).catch_unwind().await,
        Err(panic) => Err(panic),
    };

    match outcome {
        Ok(Ok(())) => debug!("[EventBus] Async handler for {} completed", kind),
        Ok(Err(e)) => warn!("[EventBus] Async handler for {} failed: {:#}", kind, e),
        Err(_) => warn!("[EventBus] Async handler for {} panicked", kind),
    }
}
