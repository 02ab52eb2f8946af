//! Delivers one relay request to every configured destination.

use std::sync::Arc;

use sms_relay_core::{DatabaseError, RelayDatabase, RelayRequest};
use tracing::{info, instrument, warn};

use crate::channel::{ChannelError, ChannelOutcome, DeliveryContext, ForwardChannel};

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Phone number not found: {0}")]
    PhoneNumberNotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Channel {channel} failed: {source}")]
    Channel {
        channel: &'static str,
        #[source]
        source: ChannelError,
    },
}

/// Channels that delivered and channels that had nothing to do.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ForwardReport {
    pub delivered: Vec<&'static str>,
    pub skipped: Vec<&'static str>,
}

impl ForwardReport {
    /// True when no channel made a delivery attempt.
    pub fn is_noop(&self) -> bool {
        self.delivered.is_empty()
    }
}

pub struct Forwarder {
    db: RelayDatabase,
    channels: Vec<Arc<dyn ForwardChannel>>,
}

impl Forwarder {
    pub fn new(db: RelayDatabase, channels: Vec<Arc<dyn ForwardChannel>>) -> Self {
        Self { db, channels }
    }

    /// Resolve the device and phone number as they are now, then run each
    /// channel in order. The first channel error fails the whole request;
    /// channels that already delivered are not undone.
    #[instrument(skip(self, request), fields(device_id = %request.device_id, sms_id = %request.sms.id))]
    pub async fn forward(&self, request: &RelayRequest) -> Result<ForwardReport, ForwardError> {
        let device = self.db.get_device(&request.device_id).await.map_err(|e| match e {
            DatabaseError::NotFound(_) => ForwardError::DeviceNotFound(request.device_id.clone()),
            other => ForwardError::Storage(other),
        })?;

        let phone_number_id = &request.sms.phone_number_id;
        let phone_number = self
            .db
            .get_phone_number(phone_number_id)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound(_) => {
                    ForwardError::PhoneNumberNotFound(phone_number_id.clone())
                }
                other => ForwardError::Storage(other),
            })?;

        let ctx = DeliveryContext {
            device: &device,
            phone_number: &phone_number,
            sms: &request.sms,
        };

        let mut report = ForwardReport::default();
        for channel in &self.channels {
            match channel.deliver(ctx).await {
                Ok(ChannelOutcome::Delivered) => report.delivered.push(channel.name()),
                Ok(ChannelOutcome::Skipped) => report.skipped.push(channel.name()),
                Err(source) => {
                    warn!(channel = channel.name(), error = %source, "Channel delivery failed");
                    return Err(ForwardError::Channel {
                        channel: channel.name(),
                        source,
                    });
                }
            }
        }

        info!(
            delivered = report.delivered.len(),
            skipped = report.skipped.len(),
            "Relay request forwarded"
        );
        Ok(report)
    }
}
