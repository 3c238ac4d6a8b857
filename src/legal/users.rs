use std::sync::Arc;

use crate::config::LookupMode;
use crate::db::{
    AttrValue, Item, KeyValueStore, PRIMARY_KEY, UpdateOp, get_s, get_string_list, scan_unique,
};
use crate::error::{DatabaseError, ServiceError};
use crate::legal::{Credentials, User, fetch_by_id, generate_id};

pub struct UserRepository {
    store: Arc<dyn KeyValueStore>,
    table: String,
    lookup: LookupMode,
    credentials: Credentials,
}

impl UserRepository {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        table: String,
        lookup: LookupMode,
        credentials: Credentials,
    ) -> Self {
        Self {
            store,
            table,
            lookup,
            credentials,
        }
    }

    /// Store a new user under a fresh id with an empty case list.
    pub async fn create(&self, input: User) -> Result<User, ServiceError> {
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
        let password = self.credentials.hash_blocking(input.password).await?;
        let user = User {
            id: generate_id(),
            cases: Vec::new(),
            password,
            ..input
        };
        self.store.put(&self.table, user_to_item(&user)).await?;
        tracing::info!("Created user {}", user.id);
        Ok(user)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>, DatabaseError> {
        fetch_by_id(self.store.as_ref(), &self.table, self.lookup, id)
            .await?
            .map(|item| user_from_item(&item))
            .transpose()
    }

    /// Email is unique by convention only; duplicates surface as an
    /// integrity error.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, DatabaseError> {
        if email.is_empty() {
            return Ok(None);
        }
        scan_unique(self.store.as_ref(), &self.table, "email", email)
            .await?
            .map(|item| user_from_item(&item))
            .transpose()
    }

    /// Resolve a login attempt to the stored user.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, ServiceError> {
        let user = self
            .get_by_email(email)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;
        let matched = self
            .credentials
            .verify_blocking(password.to_string(), user.password.clone())
            .await;
        if !matched {
            tracing::info!("Rejected login for user {}", user.id);
            return Err(ServiceError::Unauthorized);
        }
        Ok(user)
    }

    /// Overwrite the profile fields and password of an existing user.
    ///
    /// The id and case list are kept. Returns `None` if the user is gone.
    pub async fn update(&self, input: User) -> Result<Option<User>, ServiceError> {
        if input.id.is_empty() {
            return Ok(None);
        }
        if input.email.trim().is_empty() || input.password.is_empty() {
            return Err(ServiceError::InvalidInput(
                "Email and password are required".to_string(),
            ));
        }
        let password = self.credentials.hash_blocking(input.password).await?;
        let ops = [
            UpdateOp::set("email", AttrValue::s(input.email)),
            UpdateOp::set("first_name", AttrValue::s(input.first_name)),
            UpdateOp::set("last_name", AttrValue::s(input.last_name)),
            UpdateOp::set("organization", AttrValue::s(input.organization)),
            UpdateOp::set("password", AttrValue::s(password)),
            UpdateOp::set("profile_picture", AttrValue::s(input.profile_picture)),
        ];
        let updated = self.store.update(&self.table, &input.id, &ops).await?;
        Ok(updated.map(|item| user_from_item(&item)).transpose()?)
    }

    /// Delete a user when both id and email match the stored record.
    ///
    /// Cases owned by the user are left in place.
    pub async fn delete(&self, id: &str, email: &str) -> Result<Option<User>, DatabaseError> {
        let Some(user) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        if user.email != email {
            tracing::info!("Refused to delete user {}: email mismatch", id);
            return Ok(None);
        }
        self.store
            .delete(&self.table, id)
            .await?
            .map(|item| user_from_item(&item))
            .transpose()
    }
}

fn user_to_item(user: &User) -> Item {
    Item::from([
        (PRIMARY_KEY.to_string(), AttrValue::s(&user.id)),
        ("email".to_string(), AttrValue::s(&user.email)),
        (
            "cases".to_string(),
            AttrValue::L(user.cases.iter().map(AttrValue::s).collect()),
        ),
        ("first_name".to_string(), AttrValue::s(&user.first_name)),
        ("last_name".to_string(), AttrValue::s(&user.last_name)),
        ("organization".to_string(), AttrValue::s(&user.organization)),
        ("password".to_string(), AttrValue::s(&user.password)),
        (
            "profile_picture".to_string(),
            AttrValue::s(&user.profile_picture),
        ),
    ])
}

fn user_from_item(item: &Item) -> Result<User, DatabaseError> {
    Ok(User {
        id: get_s(item, PRIMARY_KEY)?,
        email: get_s(item, "email")?,
        cases: get_string_list(item, "cases")?,
        first_name: get_s(item, "first_name")?,
        last_name: get_s(item, "last_name")?,
        organization: get_s(item, "organization")?,
        password: get_s(item, "password")?,
        profile_picture: get_s(item, "profile_picture")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PasswordScheme;
    use crate::db::memory::MemoryStore;

    fn repo(scheme: PasswordScheme, lookup: LookupMode) -> UserRepository {
        UserRepository::new(
            Arc::new(MemoryStore::new()),
            "users".to_string(),
            lookup,
            Credentials::new(scheme),
        )
    }

    fn input(email: &str, password: &str) -> User {
        User {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            organization: "Analytical LLP".to_string(),
            ..User::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_hashes_password() {
        let users = repo(PasswordScheme::Argon2, LookupMode::Key);
        let created = users
            .create(input("ada@example.com", "pw"))
            .await
            .expect("create");
        assert_eq!(created.id.len(), 16);
        assert_ne!(created.password, "pw");

        let fetched = users
            .get_by_id(&created.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn create_requires_email_and_password() {
        let users = repo(PasswordScheme::Plaintext, LookupMode::Key);
        let err = users.create(input("", "pw")).await.expect_err("no email");
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn authenticate_distinguishes_unknown_email_and_bad_password() {
        let users = repo(PasswordScheme::Plaintext, LookupMode::Key);
        users
            .create(input("ada@example.com", "pw"))
            .await
            .expect("create");

        let err = users
            .authenticate("nobody@example.com", "pw")
            .await
            .expect_err("unknown");
        assert!(matches!(err, ServiceError::NotFound("User")));

        let err = users
            .authenticate("ada@example.com", "wrong")
            .await
            .expect_err("bad password");
        assert!(matches!(err, ServiceError::Unauthorized));

        let user = users
            .authenticate("ada@example.com", "pw")
            .await
            .expect("login");
        assert_eq!(user.password, "pw");
    }

    #[tokio::test]
    async fn update_keeps_cases_and_never_upserts() {
        let users = repo(PasswordScheme::Argon2, LookupMode::Scan);
        let created = users
            .create(input("ada@example.com", "pw"))
            .await
            .expect("create");

        let mut changed = input("ada@newfirm.com", "pw2");
        changed.id = created.id.clone();
        let updated = users
            .update(changed)
            .await
            .expect("update")
            .expect("present");
        assert_eq!(updated.email, "ada@newfirm.com");
        assert!(updated.cases.is_empty());
        users
            .authenticate("ada@newfirm.com", "pw2")
            .await
            .expect("login with new password");

        let mut ghost = input("ghost@example.com", "pw");
        ghost.id = "doesnotexist0000".to_string();
        assert!(users.update(ghost).await.expect("update").is_none());
    }

    #[tokio::test]
    async fn update_rejects_blank_email_and_keeps_record() {
        let users = repo(PasswordScheme::Plaintext, LookupMode::Key);
        let created = users
            .create(input("ada@example.com", "pw"))
            .await
            .expect("create");

        for email in ["", "   "] {
            let mut changed = input(email, "pw2");
            changed.id = created.id.clone();
            let err = users.update(changed).await.expect_err("blank email");
            assert!(matches!(err, ServiceError::InvalidInput(_)));
        }

        let fetched = users
            .get_by_id(&created.id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(fetched.email, "ada@example.com");
        users
            .authenticate("ada@example.com", "pw")
            .await
            .expect("old credentials still work");
    }

    #[tokio::test]
    async fn delete_requires_matching_email() {
        let users = repo(PasswordScheme::Plaintext, LookupMode::Key);
        let created = users
            .create(input("ada@example.com", "pw"))
            .await
            .expect("create");

        let kept = users
            .delete(&created.id, "other@example.com")
            .await
            .expect("delete");
        assert!(kept.is_none());
        assert!(users.get_by_id(&created.id).await.expect("get").is_some());

        let removed = users
            .delete(&created.id, "ada@example.com")
            .await
            .expect("delete");
        assert_eq!(removed.map(|u| u.id), Some(created.id.clone()));
        assert!(users.get_by_id(&created.id).await.expect("get").is_none());
    }
}
