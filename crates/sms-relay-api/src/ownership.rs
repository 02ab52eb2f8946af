//! Device to phone number ownership check.

use sms_relay_core::{DatabaseError, Device, PhoneNumber, RelayDatabase};
use tracing::{instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Phone number not found: {0}")]
    PhoneNumberNotFound(String),

    #[error("Device {device_id} is not associated with phone number {phone_number_id}")]
    NotAssociated {
        device_id: String,
        phone_number_id: String,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] DatabaseError),
}

#[derive(Clone)]
pub struct OwnershipValidator {
    db: RelayDatabase,
}

impl OwnershipValidator {
    pub const fn new(db: RelayDatabase) -> Self {
        Self { db }
    }

    /// Resolve both records and confirm the device may submit for `number`.
    ///
    /// A missing record is reported as not-found before association is checked.
    #[instrument(skip(self))]
    pub async fn validate(
        &self,
        device_id: &str,
        number: &str,
    ) -> Result<(Device, PhoneNumber), OwnershipError> {
        let device = self.db.get_device(device_id).await.map_err(|e| {
            if e.is_not_found() {
                OwnershipError::DeviceNotFound(device_id.to_string())
            } else {
                OwnershipError::Storage(e)
            }
        })?;

        let phone = self
            .db
            .get_phone_number_by_number(number)
            .await
            .map_err(|e| {
                if e.is_not_found() {
                    OwnershipError::PhoneNumberNotFound(number.to_string())
                } else {
                    OwnershipError::Storage(e)
                }
            })?;

        if !device.is_associated_with(&phone.id) {
            warn!(device_id, phone_number_id = %phone.id, "Device not associated with phone number");
            return Err(OwnershipError::NotAssociated {
                device_id: device.id,
                phone_number_id: phone.id,
            });
        }

        Ok((device, phone))
    }
}
