use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

stored_object!(User, "user", {
    email: String,
    api_key: Option<String>,
    admin: bool
});

impl User {
    pub fn new(email: String, api_key: Option<String>, admin: bool) -> Self {
        let now = Utc::now();

        Self {
            id: Uuid::new_v4().to_string(),
            email,
            api_key,
            admin,
            created_at: now,
            updated_at: now,
        }
    }

    pub async fn find_by_api_key(
        api_key: &str,
        db: &SurrealDbClient,
    ) -> Result<Option<Self>, AppError> {
        let user: Option<User> = db
            .client
            .query("SELECT * FROM user WHERE api_key = $api_key LIMIT 1")
            .bind(("api_key", api_key.to_string()))
            .await?
            .take(0)?;

        Ok(user)
    }

    /// Create the administrator account on first boot. Returns the admin API
    /// key when a user was created, `None` when one already exists.
    pub async fn ensure_bootstrap_admin(
        db: &SurrealDbClient,
        email: &str,
        api_key: Option<String>,
    ) -> Result<Option<String>, AppError> {
        #[derive(Deserialize)]
        struct CountResult {
            count: i64,
        }

        let existing: Option<CountResult> = db
            .client
            .query("SELECT count() AS count FROM user GROUP ALL")
            .await?
            .take(0)?;

        if existing.map(|c| c.count).unwrap_or(0) > 0 {
            return Ok(None);
        }

        let api_key =
            api_key.unwrap_or_else(|| format!("sk_{}", Uuid::new_v4().to_string().replace('-', "")));
        let admin = User::new(email.to_string(), Some(api_key.clone()), true);
        db.store_item(admin).await?;

        Ok(Some(api_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_db() -> SurrealDbClient {
        let namespace = "test_ns";
        let database = Uuid::new_v4().to_string();
        SurrealDbClient::memory(namespace, &database)
            .await
            .expect("in-memory surrealdb")
    }

    #[tokio::test]
    async fn test_bootstrap_admin_runs_once() {
        let db = memory_db().await;

        let key = User::ensure_bootstrap_admin(&db, "admin@example.com", None)
            .await
            .expect("bootstrap");
        let key = key.expect("first boot should create an admin");
        assert!(key.starts_with("sk_"));

        let again = User::ensure_bootstrap_admin(&db, "admin@example.com", None)
            .await
            .expect("second bootstrap");
        assert!(again.is_none());

        let users = db
            .get_all_stored_items::<User>()
            .await
            .expect("fetch users");
        assert_eq!(users.len(), 1);
        assert!(users[0].admin);
        assert_eq!(users[0].email, "admin@example.com");
    }

    #[tokio::test]
    async fn test_bootstrap_admin_accepts_configured_key() {
        let db = memory_db().await;

        let key = User::ensure_bootstrap_admin(&db, "admin@example.com", Some("sk_fixed".into()))
            .await
            .expect("bootstrap");
        assert_eq!(key.as_deref(), Some("sk_fixed"));

        let found = User::find_by_api_key("sk_fixed", &db)
            .await
            .expect("lookup")
            .expect("admin present");
        assert!(found.admin);
    }

    #[tokio::test]
    async fn test_find_by_api_key() {
        let db = memory_db().await;

        let user = User::new("user@example.com".to_string(), Some("sk_abc".to_string()), false);
        db.store_item(user.clone()).await.expect("store");

        let found = User::find_by_api_key("sk_abc", &db)
            .await
            .expect("lookup")
            .expect("present");
        assert_eq!(found.id, user.id);

        let missing = User::find_by_api_key("sk_other", &db).await.expect("lookup");
        assert!(missing.is_none());
    }
}
