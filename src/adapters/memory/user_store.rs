use crate::domain::user::{NewUser, User};
use crate::domain::value_objects::UserId;
use crate::ports::user_store::{Result, UserRecord, UserStore as UserStoreTrait, UserStoreError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory implementation of UserStore
///
/// Used in standalone mode and tests. Usernames are kept unique the same
/// way the relational schema does it.
#[allow(dead_code)]
pub struct UserStore {
    inner: Mutex<Inner>,
}

struct Inner {
    users: HashMap<UserId, UserRecord>,
    next_id: i64,
}

#[allow(dead_code)]
impl UserStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                users: HashMap::new(),
                next_id: 1,
            }),
        }
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStoreTrait for UserStore {
    async fn insert_user(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.lock().unwrap();

        if inner
            .users
            .values()
            .any(|r| r.user.username == user.username)
        {
            return Err(UserStoreError::DuplicateUsername);
        }

        let id = UserId::new(inner.next_id);
        inner.next_id += 1;

        let record = UserRecord {
            user: User {
                id,
                username: user.username,
                name: user.name,
                role: user.role,
            },
            password_hash: user.password_hash,
        };
        inner.users.insert(id, record.clone());
        Ok(record.user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .values()
            .find(|r| r.user.username == username)
            .cloned())
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.users.get(&user_id).map(|r| r.user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::Role;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: Some("$2b$12$hash".to_string()),
            name: None,
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn test_insert_and_find() {
        let store = UserStore::new();
        let user = store.insert_user(new_user("alice")).await.unwrap();

        let by_name = store.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.user.id, user.id);
        assert!(by_name.password_hash.is_some());

        let by_id = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = UserStore::new();
        store.insert_user(new_user("alice")).await.unwrap();
        let result = store.insert_user(new_user("alice")).await;
        assert!(matches!(result, Err(UserStoreError::DuplicateUsername)));
    }
}
