use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

/// Kind of row change carried by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Insert,
    Update,
}

/// Table a change event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Screening,
    Review,
    PaymentIntent,
    Notification,
    Wallet,
}

impl Entity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Screening => "screening",
            Self::Review => "review",
            Self::PaymentIntent => "payment_intent",
            Self::Notification => "notification",
            Self::Wallet => "wallet",
        }
    }
}

/// Column equality predicate evaluated against an event's payload snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqualityFilter {
    pub column: String,
    pub value: Value,
}

impl EqualityFilter {
    /// `value` is compared as-is, so pass the column's serialized form.
    pub fn new(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, payload: &Value) -> bool {
        payload
            .get(&self.column)
            .is_some_and(|actual| actual == &self.value)
    }
}

/// One committed row change, with a snapshot of the new record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: EventKind,
    pub entity: Entity,
    pub payload: Value,
}

impl ChangeEvent {
    pub fn new(
        kind: EventKind,
        entity: Entity,
        record: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            kind,
            entity,
            payload: serde_json::to_value(record)?,
        })
    }

    /// Convert the untyped snapshot into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }
}

/// Broadcast change-feed fed by the storage layer after each committed write.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub const DEFAULT_CAPACITY: usize = 256;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Having no live subscribers is not an error.
    pub fn publish(&self, event: ChangeEvent) {
        let _ = self.sender.send(event);
    }

    pub fn receiver(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn equality_filter_compares_payload_columns() {
        let filter = EqualityFilter::new("family_id", "fam-1");
        assert!(filter.matches(&json!({"family_id": "fam-1", "status": "COMPLETED"})));
        assert!(!filter.matches(&json!({"family_id": "fam-2"})));
        assert!(!filter.matches(&json!({"status": "COMPLETED"})));
    }

    #[test]
    fn equality_filter_matches_serialized_identifiers() {
        #[derive(Serialize)]
        struct Row {
            family_id: uuid::Uuid,
            risk_score: Option<f64>,
        }

        let family_id = uuid::Uuid::new_v4();
        let event = ChangeEvent::new(
            EventKind::Update,
            Entity::Screening,
            &Row {
                family_id,
                risk_score: None,
            },
        )
        .expect("row serializes");

        assert!(EqualityFilter::new("family_id", family_id.to_string()).matches(&event.payload));
        assert!(!EqualityFilter::new("family_id", uuid::Uuid::new_v4().to_string())
            .matches(&event.payload));
        assert!(EqualityFilter::new("risk_score", Value::Null).matches(&event.payload));
        assert!(!EqualityFilter::new("family_id", Value::Null).matches(&event.payload));
    }

    #[tokio::test]
    async fn publishes_to_every_receiver_in_order() {
        let feed = ChangeFeed::new(8);
        let mut first = feed.receiver();
        let mut second = feed.receiver();

        for step in 0..3 {
            feed.publish(ChangeEvent {
                kind: EventKind::Update,
                entity: Entity::Screening,
                payload: json!({ "step": step }),
            });
        }

        for receiver in [&mut first, &mut second] {
            for step in 0..3 {
                let event = receiver.recv().await.expect("event delivered");
                assert_eq!(event.payload["step"], step);
            }
        }
    }

    #[test]
    fn publishing_without_subscribers_is_silent() {
        let feed = ChangeFeed::default();
        assert_eq!(feed.subscriber_count(), 0);
        feed.publish(ChangeEvent {
            kind: EventKind::Insert,
            entity: Entity::Review,
            payload: Value::Null,
        });
    }
}
