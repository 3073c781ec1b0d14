//! Tracing layer that captures session state transitions.
//!
//! Events on [`RUN_EVENT_TARGET`] are converted to [`RunEvent`]s and sent over
//! an unbounded channel; everything else passes through untouched.

use langshift_application::RUN_EVENT_TARGET;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;

/// One line of the run log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunEvent {
    pub timestamp: String,
    pub level: String,
    pub message: String,
    /// Structured fields of the event (`session_id`, `model`, `attempt`, `state`, ...).
    pub fields: Map<String, Value>,
}

impl RunEvent {
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Forwards run events to a channel.
pub struct RunEventLayer {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl RunEventLayer {
    pub fn new(sender: mpsc::UnboundedSender<RunEvent>) -> Self {
        Self { sender }
    }

    /// Creates a layer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl<S> Layer<S> for RunEventLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() != RUN_EVENT_TARGET {
            return;
        }

        let mut fields = Map::new();
        event.record(&mut FieldVisitor(&mut fields));
        let message = match fields.remove("message") {
            Some(Value::String(message)) => message,
            Some(other) => other.to_string(),
            None => String::new(),
        };

        let run_event = RunEvent {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level: metadata.level().to_string(),
            message,
            fields,
        };

        // Receiver gone means nobody is writing the log any more.
        let _ = self.sender.send(run_event);
    }
}

struct FieldVisitor<'a>(&'a mut Map<String, Value>);

impl Visit for FieldVisitor<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0
            .insert(field.name().to_string(), Value::from(format!("{value:?}")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn test_only_run_target_is_forwarded() {
        let (layer, mut receiver) = RunEventLayer::channel();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("unrelated");
            tracing::info!(
                target: RUN_EVENT_TARGET,
                session_id = "s-1",
                model = %"VertexAI - Gemini Pro",
                attempt = 0u64,
                state = %"requesting",
                "state transition"
            );
            tracing::warn!(target: "langshift::other", "also unrelated");
        });

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.message, "state transition");
        assert_eq!(event.level, "INFO");
        assert_eq!(event.field_str("session_id"), Some("s-1"));
        assert_eq!(event.field_str("model"), Some("VertexAI - Gemini Pro"));
        assert_eq!(event.field_str("state"), Some("requesting"));
        assert_eq!(event.fields["attempt"], Value::from(0u64));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (layer, receiver) = RunEventLayer::channel();
        drop(receiver);
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: RUN_EVENT_TARGET, "state transition");
        });
    }
}
