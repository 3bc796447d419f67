//! Publishes domain events to NATS.
//!
//! Publishing is best effort. A missing or failing connection is logged and
//! never fails the request that raised the event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::events::DomainEvent;
use crate::{CommerceError, Result};

#[derive(Serialize)]
struct Envelope<'a> {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a DomainEvent,
}

#[derive(Clone, Default)]
pub struct EventPublisher {
    client: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn disabled() -> Self { Self::default() }

    /// Connects when a URL is given; a failed connection disables publishing.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self { client: Some(client) }
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "NATS unavailable, events will not be published");
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool { self.client.is_some() }

    pub async fn publish_all(&self, events: Vec<DomainEvent>) {
        for event in events {
            if let Err(err) = self.publish(&event).await {
                tracing::warn!(subject = %event.subject(), error = %err, "failed to publish event");
            }
        }
    }

    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        let Some(client) = &self.client else {
            tracing::debug!(subject = %event.subject(), "event publishing disabled");
            return Ok(());
        };
        let payload = serde_json::to_vec(&Envelope { id: Uuid::now_v7(), occurred_at: Utc::now(), event })
            .map_err(|e| CommerceError::Event(e.to_string()))?;
        client
            .publish(event.subject(), payload.into())
            .await
            .map_err(|e| CommerceError::Event(e.to_string()))
    }
}
