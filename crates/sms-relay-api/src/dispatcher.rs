//! Hands validated messages to the relay queue.

use std::sync::Arc;

use sms_relay_core::{Device, PhoneNumber, QueueError, RelayQueue, RelayRequest, Sms};
use tracing::{info, instrument};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Failed to encode relay request: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to enqueue relay request: {0}")]
    Enqueue(#[from] QueueError),
}

#[derive(Clone)]
pub struct RelayDispatcher {
    queue: Arc<dyn RelayQueue>,
}

impl RelayDispatcher {
    pub fn new(queue: Arc<dyn RelayQueue>) -> Self {
        Self { queue }
    }

    /// Enqueue `sms` for forwarding. Returns once the queue has stored the
    /// job; delivery happens later in the forwarder.
    #[instrument(skip(self, device, phone_number, sms), fields(device_id = %device.id, phone_number_id = %phone_number.id))]
    pub async fn dispatch(
        &self,
        device: &Device,
        phone_number: &PhoneNumber,
        mut sms: Sms,
    ) -> Result<String, DispatchError> {
        sms.phone_number_id.clone_from(&phone_number.id);
        let request = RelayRequest {
            device_id: device.id.clone(),
            sms,
        };

        let payload = serde_json::to_vec(&request)?;
        let job_id = self.queue.enqueue(&payload).await?;

        info!(job_id = %job_id, sms_id = %request.sms.id, "Relay request queued");
        Ok(job_id)
    }
}
