//! In-memory reference implementation of [`CredentialStore`].
//!
//! Backs the integration tests and local wiring. Transactions are modeled by
//! staging mutations on a copy of the tables and swapping it in only when the
//! unit of work succeeds, so a mid-transaction failure leaves no partial
//! writes behind.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Role, User, UserRole};
use crate::store::{CredentialStore, StoreError, TxStore, TxWork, UserPage};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    roles: BTreeMap<Uuid, Role>,
    user_roles: Vec<UserRole>,
}

impl Tables {
    fn insert_user(&mut self, user: &User) -> Result<(), StoreError> {
        if self.users.contains_key(&user.id) {
            return Err(StoreError::Duplicate("user.id"));
        }
        let email_taken = self
            .users
            .values()
            .any(|existing| existing.normalized_email == user.normalized_email);
        if email_taken {
            return Err(StoreError::Duplicate("user.normalized_email"));
        }
        self.users.insert(user.id, user.clone());
        Ok(())
    }

    fn update_user(&mut self, user: &User) -> Result<(), StoreError> {
        match self.users.get_mut(&user.id) {
            Some(existing) => {
                *existing = user.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound("user")),
        }
    }

    fn insert_user_role(&mut self, user_role: &UserRole) -> Result<(), StoreError> {
        if self.user_roles.contains(user_role) {
            return Err(StoreError::Duplicate("user_role"));
        }
        self.user_roles.push(user_role.clone());
        Ok(())
    }

    fn remove_user_role(&mut self, user_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        let before = self.user_roles.len();
        self.user_roles
            .retain(|row| !(row.user_id == user_id && row.role_id == role_id));
        if self.user_roles.len() == before {
            return Err(StoreError::NotFound("user_role"));
        }
        Ok(())
    }

    fn users_with_any_role(&self, search: Option<&str>) -> Vec<&User> {
        let needle = search.map(str::to_lowercase);
        let mut users: Vec<&User> = self
            .users
            .values()
            .filter(|user| self.user_roles.iter().any(|row| row.user_id == user.id))
            .filter(|user| match &needle {
                None => true,
                Some(needle) => {
                    user.email.to_lowercase().contains(needle)
                        || user
                            .first_name
                            .as_deref()
                            .is_some_and(|name| name.to_lowercase().contains(needle))
                        || user
                            .last_name
                            .as_deref()
                            .is_some_and(|name| name.to_lowercase().contains(needle))
                }
            })
            .collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        users
    }
}

struct MemoryTx<'a> {
    tables: &'a mut Tables,
}

impl TxStore for MemoryTx<'_> {
    fn create_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.tables.insert_user(user)
    }

    fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.tables.update_user(user)
    }

    fn create_user_role(&mut self, user_role: &UserRole) -> Result<(), StoreError> {
        self.tables.insert_user_role(user_role)
    }

    fn destroy_user_role(&mut self, user_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        self.tables.remove_user_role(user_id, role_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_user_by_normalized_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|user| user.normalized_email == normalized_email)
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.insert_user(user)
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.update_user(user)
    }

    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.roles.get(&id).cloned())
    }

    async fn create_role(&self, role: &Role) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.roles.contains_key(&role.id) {
            return Err(StoreError::Duplicate("role.id"));
        }
        tables.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        let tables = self.tables.read().await;
        // BTreeMap iteration order is the id order.
        Ok(tables.roles.values().cloned().collect())
    }

    async fn list_roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .roles
            .values()
            .filter(|role| {
                tables
                    .user_roles
                    .iter()
                    .any(|row| row.user_id == user_id && row.role_id == role.id)
            })
            .cloned()
            .collect())
    }

    async fn find_user_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<UserRole>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .user_roles
            .iter()
            .find(|row| row.user_id == user_id && row.role_id == role_id)
            .cloned())
    }

    async fn create_user_role(&self, user_role: &UserRole) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.insert_user_role(user_role)
    }

    async fn destroy_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.remove_user_role(user_id, role_id)
    }

    async fn count_users_with_any_role(&self) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users_with_any_role(None).len() as u64)
    }

    async fn list_users_with_any_role(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<UserPage, StoreError> {
        let tables = self.tables.read().await;
        let matched = tables.users_with_any_role(search);
        let total = matched.len() as u64;

        let page = page.max(1);
        let offset = ((page - 1) as usize).saturating_mul(page_size as usize);
        let users = matched
            .into_iter()
            .skip(offset)
            .take(page_size as usize)
            .cloned()
            .collect();

        Ok(UserPage { users, total })
    }

    async fn run_in_transaction(&self, work: TxWork) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let mut staged = tables.clone();
        work(&mut MemoryTx {
            tables: &mut staged,
        })?;
        *tables = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(email: &str) -> User {
        User::new(email, "hash".to_string(), None, None, None, Utc::now())
    }

    #[tokio::test]
    async fn create_user_enforces_unique_normalized_email() {
        let store = MemoryStore::new();
        store.create_user(&user("a@x.com")).await.unwrap();

        let result = store.create_user(&user("A@X.COM")).await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
    }

    #[tokio::test]
    async fn duplicate_user_role_is_rejected() {
        let store = MemoryStore::new();
        let row = UserRole::new(Uuid::new_v4(), Uuid::new_v4());
        store.create_user_role(&row).await.unwrap();

        let result = store.create_user_role(&row).await;
        assert!(matches!(result, Err(StoreError::Duplicate("user_role"))));
    }

    #[tokio::test]
    async fn failed_transaction_rolls_back_every_write() {
        let store = MemoryStore::new();
        let new_user = user("tx@x.com");
        let staged = new_user.clone();

        let result = store
            .run_in_transaction(Box::new(move |tx| {
                tx.create_user(&staged)?;
                Err(StoreError::Backend(anyhow::anyhow!("boom")))
            }))
            .await;

        assert!(result.is_err());
        let found = store.find_user_by_id(new_user.id).await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn committed_transaction_is_visible() {
        let store = MemoryStore::new();
        let new_user = user("tx2@x.com");
        let role = Role::new("Admin");
        store.create_role(&role).await.unwrap();

        let staged_user = new_user.clone();
        let staged_row = UserRole::new(new_user.id, role.id);
        store
            .run_in_transaction(Box::new(move |tx| {
                tx.create_user(&staged_user)?;
                tx.create_user_role(&staged_row)
            }))
            .await
            .unwrap();

        assert!(store.find_user_by_id(new_user.id).await.unwrap().is_some());
        assert!(store
            .find_user_role(new_user.id, role.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn listing_users_with_roles_filters_and_paginates() {
        let store = MemoryStore::new();
        let role = Role::new("Admin");
        store.create_role(&role).await.unwrap();

        let with_role = User::new(
            "admin@x.com",
            "hash".to_string(),
            Some("Grace".to_string()),
            Some("Hopper".to_string()),
            None,
            Utc::now(),
        );
        let without_role = user("plain@x.com");
        store.create_user(&with_role).await.unwrap();
        store.create_user(&without_role).await.unwrap();
        store
            .create_user_role(&UserRole::new(with_role.id, role.id))
            .await
            .unwrap();

        let page = store.list_users_with_any_role(1, 10, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.users[0].id, with_role.id);

        let page = store
            .list_users_with_any_role(1, 10, Some("grace"))
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let page = store
            .list_users_with_any_role(1, 10, Some("nobody"))
            .await
            .unwrap();
        assert_eq!(page.total, 0);

        let page = store.list_users_with_any_role(2, 10, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert!(page.users.is_empty());
    }
}
