//! User, device and phone number queries.

use super::db::{DatabaseError, RelayDatabase, unix_timestamp};
use crate::models::{Device, PhoneNumber, User, UserType};

/// Parameters for creating a user.
pub struct NewUser<'a> {
    pub id: &'a str,
    pub username: &'a str,
    pub password_hash: &'a str,
    pub user_type: UserType,
    pub name: &'a str,
    pub device_id: Option<&'a str>,
    pub email: Option<&'a str>,
}

/// Parameters for creating a phone number.
pub struct NewPhoneNumber<'a> {
    pub id: &'a str,
    pub number: &'a str,
    pub name: &'a str,
    pub forward_email: Option<&'a str>,
}

impl RelayDatabase {
    // =========================================================================
    // User queries
    // =========================================================================

    pub async fn create_user(&self, params: &NewUser<'_>) -> Result<User, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO users (id, username, password_hash, user_type, name, device_id, email, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.username)
        .bind(params.password_hash)
        .bind(params.user_type)
        .bind(params.name)
        .bind(params.device_id)
        .bind(params.email)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_user(params.id).await
    }

    pub async fn get_user(&self, id: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User {id}")))
    }

    /// Look up a user through the unique username index. Case-sensitive.
    pub async fn get_user_by_username(&self, username: &str) -> Result<User, DatabaseError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("User with username {username}")))
    }

    // =========================================================================
    // Device queries
    // =========================================================================

    pub async fn create_device(
        &self,
        id: &str,
        name: &str,
        token_hash: &str,
    ) -> Result<Device, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO devices (id, name, token_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(token_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_device(id).await
    }

    /// Get a device together with the ids of its associated phone numbers.
    pub async fn get_device(&self, id: &str) -> Result<Device, DatabaseError> {
        let mut device = sqlx::query_as::<_, Device>("SELECT * FROM devices WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Device {id}")))?;

        let ids = sqlx::query_scalar::<_, String>(
            "SELECT phone_number_id FROM device_phone_numbers WHERE device_id = ?",
        )
        .bind(id)
        .fetch_all(self.pool())
        .await?;

        device.phone_number_ids = ids.into_iter().collect();
        Ok(device)
    }

    /// Allow a device to relay for a phone number. Idempotent.
    pub async fn associate_phone_number(
        &self,
        device_id: &str,
        phone_number_id: &str,
    ) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT OR IGNORE INTO device_phone_numbers (device_id, phone_number_id) VALUES (?, ?)",
        )
        .bind(device_id)
        .bind(phone_number_id)
        .execute(self.pool())
        .await?;

        sqlx::query("UPDATE devices SET updated_at = ? WHERE id = ?")
            .bind(unix_timestamp())
            .bind(device_id)
            .execute(self.pool())
            .await?;

        Ok(())
    }

    pub async fn dissociate_phone_number(
        &self,
        device_id: &str,
        phone_number_id: &str,
    ) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            "DELETE FROM device_phone_numbers WHERE device_id = ? AND phone_number_id = ?",
        )
        .bind(device_id)
        .bind(phone_number_id)
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_device(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM devices WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Phone number queries
    // =========================================================================

    pub async fn create_phone_number(
        &self,
        params: &NewPhoneNumber<'_>,
    ) -> Result<PhoneNumber, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO phone_numbers (id, number, name, forward_email, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(params.id)
        .bind(params.number)
        .bind(params.name)
        .bind(params.forward_email.unwrap_or_default())
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_phone_number(params.id).await
    }

    pub async fn get_phone_number(&self, id: &str) -> Result<PhoneNumber, DatabaseError> {
        sqlx::query_as::<_, PhoneNumber>("SELECT * FROM phone_numbers WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Phone number {id}")))
    }

    /// Look up a phone number through the unique E.164 number index.
    pub async fn get_phone_number_by_number(
        &self,
        number: &str,
    ) -> Result<PhoneNumber, DatabaseError> {
        sqlx::query_as::<_, PhoneNumber>("SELECT * FROM phone_numbers WHERE number = ?")
            .bind(number)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Phone number {number}")))
    }

    /// Replace the email forwarding destination. `None` clears it.
    pub async fn set_forward_email(
        &self,
        phone_number_id: &str,
        email: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let result =
            sqlx::query("UPDATE phone_numbers SET forward_email = ?, updated_at = ? WHERE id = ?")
                .bind(email.unwrap_or_default())
                .bind(unix_timestamp())
                .bind(phone_number_id)
                .execute(self.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "Phone number {phone_number_id}"
            )));
        }
        Ok(())
    }
}
