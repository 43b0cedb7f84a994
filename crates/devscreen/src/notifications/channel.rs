use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::storage::{ChangeEvent, ChangeFeed, Entity, EqualityFilter, EventKind};

/// One logical subscription target on the change feed: an event kind on an entity,
/// optionally narrowed by a column equality filter.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationChannel {
    kind: EventKind,
    entity: Entity,
    filter: Option<EqualityFilter>,
}

impl NotificationChannel {
    pub fn new(kind: EventKind, entity: Entity) -> Self {
        Self {
            kind,
            entity,
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: EqualityFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn filter(&self) -> Option<&EqualityFilter> {
        self.filter.as_ref()
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.kind == self.kind
            && event.entity == self.entity
            && self
                .filter
                .as_ref()
                .map_or(true, |filter| filter.matches(&event.payload))
    }

    fn label(&self) -> String {
        match &self.filter {
            Some(filter) => format!(
                "{:?}:{}[{}={}]",
                self.kind,
                self.entity.as_str(),
                filter.column,
                filter.value
            ),
            None => format!("{:?}:{}", self.kind, self.entity.as_str()),
        }
    }

    /// Start delivering matching events in feed order.
    ///
    /// The feed receiver is registered before this returns, so no event published
    /// afterwards is missed. Must be called from within a Tokio runtime.
    pub fn subscribe(&self, feed: &ChangeFeed) -> Subscription {
        let mut receiver = feed.receiver();
        let (sender, events) = mpsc::unbounded_channel();
        let channel = self.clone();
        let label = self.label();
        let task_label = label.clone();

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if !channel.matches(&event) {
                            continue;
                        }
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel = %task_label, skipped, "subscription lagged behind the change feed");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(channel = %task_label, "subscription forwarder stopped");
        });

        debug!(channel = %label, "subscribed");
        Subscription {
            label,
            events,
            task: Some(task),
        }
    }
}

/// Live handle on a channel subscription.
///
/// Dropping the handle unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    label: String,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_active(&self) -> bool {
        self.task.is_some()
    }

    /// Next matching event, or `None` once unsubscribed or the feed has closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        if self.task.is_none() {
            return None;
        }
        self.events.recv().await
    }

    /// Stop delivery and release the feed receiver. Idempotent.
    pub fn unsubscribe(&mut self) {
        let Some(task) = self.task.take() else {
            return;
        };
        task.abort();
        self.events.close();
        while self.events.try_recv().is_ok() {}
        debug!(channel = %self.label, "unsubscribed");
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
