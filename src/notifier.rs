//! Status Notifier
//!
//! Holds the single user-visible workflow notification. A new notification
//! always replaces the current one and cancels its pending auto-dismiss.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;

use crate::config::WorkflowConfig;

/// Phase of the current notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusPhase {
    Pending,
    Success,
    Error,
}

impl StatusPhase {
    pub fn icon(&self) -> &'static str {
        match self {
            StatusPhase::Pending => "⏳",
            StatusPhase::Success => "✅",
            StatusPhase::Error => "❌",
        }
    }
}

/// The process-wide notification value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowStatus {
    pub visible: bool,
    pub phase: StatusPhase,
    pub message: String,
    /// Bumped on every notification; used to ignore stale dismiss timers
    #[serde(skip)]
    pub generation: u64,
}

impl WorkflowStatus {
    /// The hidden state shown when nothing is being reported
    pub fn hidden(generation: u64) -> Self {
        Self {
            visible: false,
            phase: StatusPhase::Pending,
            message: String::new(),
            generation,
        }
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::hidden(0)
    }
}

/// Auto-dismiss delays per phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissPolicy {
    pub success: Duration,
    pub error: Duration,
    pub pending: Option<Duration>,
}

impl DismissPolicy {
    pub fn delay_for(&self, phase: StatusPhase) -> Option<Duration> {
        match phase {
            StatusPhase::Success => Some(self.success),
            StatusPhase::Error => Some(self.error),
            StatusPhase::Pending => self.pending,
        }
    }
}

impl Default for DismissPolicy {
    fn default() -> Self {
        Self::from(&WorkflowConfig::default())
    }
}

impl From<&WorkflowConfig> for DismissPolicy {
    fn from(config: &WorkflowConfig) -> Self {
        Self {
            success: config.success_dismiss(),
            error: config.error_dismiss(),
            pending: config.pending_dismiss(),
        }
    }
}

const EVENT_CAPACITY: usize = 64;

/// Owner of the single notification and its dismiss timer
pub struct StatusNotifier {
    state: Arc<watch::Sender<WorkflowStatus>>,
    events: broadcast::Sender<WorkflowStatus>,
    timer: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
    policy: DismissPolicy,
}

impl StatusNotifier {
    pub fn new(policy: DismissPolicy) -> Self {
        let (sender, _) = watch::channel(WorkflowStatus::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Arc::new(sender),
            events,
            timer: Mutex::new(None),
            generation: AtomicU64::new(0),
            policy,
        }
    }

    /// Show `message` and schedule its automatic hide. Must be called from
    /// within a tokio runtime.
    pub async fn notify(&self, phase: StatusPhase, message: impl Into<String>) {
        let message = message.into();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut timer = self.timer.lock().await;
        if let Some(previous) = timer.take() {
            previous.abort();
        }

        tracing::debug!(?phase, %message, "status notification");
        let status = WorkflowStatus {
            visible: true,
            phase,
            message,
            generation,
        };
        // No receivers is fine
        let _ = self.events.send(status.clone());
        self.state.send_replace(status);

        if let Some(delay) = self.policy.delay_for(phase) {
            let state = Arc::clone(&self.state);
            *timer = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                state.send_if_modified(|status| {
                    if status.generation == generation && status.visible {
                        *status = WorkflowStatus::hidden(generation);
                        true
                    } else {
                        false
                    }
                });
            }));
        }
    }

    pub async fn pending(&self, message: impl Into<String>) {
        self.notify(StatusPhase::Pending, message).await;
    }

    pub async fn success(&self, message: impl Into<String>) {
        self.notify(StatusPhase::Success, message).await;
    }

    pub async fn error(&self, message: impl Into<String>) {
        self.notify(StatusPhase::Error, message).await;
    }

    /// Hide the current notification immediately
    pub async fn dismiss(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = self.timer.lock().await.take() {
            previous.abort();
        }
        self.state.send_replace(WorkflowStatus::hidden(generation));
    }

    /// Snapshot of the current notification
    pub fn current(&self) -> WorkflowStatus {
        self.state.borrow().clone()
    }

    /// Receive the latest notification whenever it changes. Intermediate
    /// values may be skipped; use [`StatusNotifier::events`] to see each one.
    pub fn subscribe(&self) -> watch::Receiver<WorkflowStatus> {
        self.state.subscribe()
    }

    /// Receive every notification shown from now on, in order. Automatic
    /// hides are not included.
    pub fn events(&self) -> broadcast::Receiver<WorkflowStatus> {
        self.events.subscribe()
    }
}

impl Default for StatusNotifier {
    fn default() -> Self {
        Self::new(DismissPolicy::default())
    }
}

impl Drop for StatusNotifier {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}
