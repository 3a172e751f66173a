use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{RwLock, broadcast};

use crate::api::Endpoint;

/// Events emitted by the wizard controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    SessionStarted {
        session_id: String,
    },

    // Request events
    RequestStarted {
        endpoint: Endpoint,
    },
    RequestCompleted {
        endpoint: Endpoint,
        items: usize,
    },
    RequestFailed {
        endpoint: Endpoint,
        error: String,
    },

    // Navigation events
    StepChanged {
        step: String,
    },
    WizardReset,
    ErrorDismissed,
}

/// Event bus for component communication
pub struct EventBus {
    sender: broadcast::Sender<Event>,
    metrics: Arc<RwLock<Metrics>>,
}

/// Accumulated metrics from events
#[derive(Debug, Default, Clone)]
pub struct Metrics {
    pub total_requests: usize,
    pub failed_requests: usize,
    pub problems_received: usize,
    pub recommendations_received: usize,
    pub resets: usize,
}

impl EventBus {
    /// Create a new event bus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Emit an event to all subscribers
    pub async fn emit(&self, event: Event) -> Result<()> {
        self.update_metrics(&event).await;

        // No receivers is fine
        let _ = self.sender.send(event);
        Ok(())
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get current metrics
    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    async fn update_metrics(&self, event: &Event) {
        let mut metrics = self.metrics.write().await;

        match event {
            Event::RequestStarted { .. } => {
                metrics.total_requests += 1;
            }
            Event::RequestFailed { .. } => {
                metrics.failed_requests += 1;
            }
            Event::RequestCompleted { endpoint, items } => match endpoint {
                Endpoint::Analyze => metrics.problems_received += items,
                Endpoint::Recommend => metrics.recommendations_received += items,
            },
            Event::WizardReset => {
                metrics.resets += 1;
            }
            _ => {}
        }
    }
}

/// Trait for components that can emit events
#[async_trait::async_trait]
pub trait EventEmitter {
    fn set_event_bus(&mut self, bus: Arc<EventBus>);

    async fn emit_event(&self, event: Event) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_emission() {
        let bus = EventBus::new(100);
        let mut receiver = bus.subscribe();

        bus.emit(Event::RequestStarted {
            endpoint: Endpoint::Analyze,
        })
        .await
        .unwrap();

        match receiver.recv().await.unwrap() {
            Event::RequestStarted { endpoint } => assert_eq!(endpoint, Endpoint::Analyze),
            _ => panic!("Wrong event type"),
        }
    }

    #[tokio::test]
    async fn test_metrics_update() {
        let bus = EventBus::new(100);

        for event in [
            Event::RequestStarted {
                endpoint: Endpoint::Analyze,
            },
            Event::RequestCompleted {
                endpoint: Endpoint::Analyze,
                items: 3,
            },
            Event::RequestStarted {
                endpoint: Endpoint::Recommend,
            },
            Event::RequestFailed {
                endpoint: Endpoint::Recommend,
                error: "boom".to_string(),
            },
            Event::WizardReset,
        ] {
            bus.emit(event).await.unwrap();
        }

        let metrics = bus.get_metrics().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.problems_received, 3);
        assert_eq!(metrics.recommendations_received, 0);
        assert_eq!(metrics.resets, 1);
    }
}
