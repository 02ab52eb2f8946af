//! ACL queries (read-side visibility grants).

use super::db::{DatabaseError, RelayDatabase, unix_timestamp};
use crate::models::Acl;

/// Target of an ACL grant.
#[derive(Debug, Clone, Copy)]
pub enum AclTarget<'a> {
    Device(&'a str),
    PhoneNumber(&'a str),
}

impl RelayDatabase {
    pub async fn create_acl(
        &self,
        id: &str,
        user_id: &str,
        target: AclTarget<'_>,
    ) -> Result<Acl, DatabaseError> {
        let now = unix_timestamp();
        let (device_id, phone_number_id) = match target {
            AclTarget::Device(d) => (Some(d), None),
            AclTarget::PhoneNumber(p) => (None, Some(p)),
        };

        sqlx::query(
            "INSERT INTO acls (id, user_id, device_id, phone_number_id, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(user_id)
        .bind(device_id)
        .bind(phone_number_id)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, Acl>("SELECT * FROM acls WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("ACL {id}")))
    }

    pub async fn list_acls_for_user(&self, user_id: &str) -> Result<Vec<Acl>, DatabaseError> {
        let acls = sqlx::query_as::<_, Acl>(
            "SELECT * FROM acls WHERE user_id = ? ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        Ok(acls)
    }

    /// Whether `user_id` may see SMS traffic of `phone_number_id`, either via a
    /// direct grant or via a grant on a device associated with the number.
    pub async fn user_can_view_phone_number(
        &self,
        user_id: &str,
        phone_number_id: &str,
    ) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM acls a
             WHERE a.user_id = ?
               AND (a.phone_number_id = ?
                    OR a.device_id IN (
                        SELECT device_id FROM device_phone_numbers WHERE phone_number_id = ?
                    ))",
        )
        .bind(user_id)
        .bind(phone_number_id)
        .bind(phone_number_id)
        .fetch_one(self.pool())
        .await?;

        Ok(row.0 > 0)
    }

    pub async fn revoke_acl(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM acls WHERE id = ?")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
