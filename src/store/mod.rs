//! Durable storage seam for users, roles, and role assignments.
//!
//! Services depend on [`CredentialStore`] rather than on a concrete engine so
//! that a database-backed implementation and the in-memory reference store are
//! interchangeable. Multi-statement writes go through [`CredentialStore::run_in_transaction`],
//! which rolls back entirely when the supplied work fails.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Role, User, UserRole};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    Duplicate(&'static str),

    #[error("record not found: {0}")]
    NotFound(&'static str),

    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// One page of users holding at least one role.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
}

/// Write handle available inside a transaction. Every mutation either commits
/// with the rest of the unit or is rolled back with it.
pub trait TxStore: Send {
    fn create_user(&mut self, user: &User) -> Result<(), StoreError>;
    fn save_user(&mut self, user: &User) -> Result<(), StoreError>;
    fn create_user_role(&mut self, user_role: &UserRole) -> Result<(), StoreError>;
    fn destroy_user_role(&mut self, user_id: Uuid, role_id: Uuid) -> Result<(), StoreError>;
}

/// Unit of work executed atomically by [`CredentialStore::run_in_transaction`].
pub type TxWork = Box<dyn FnOnce(&mut dyn TxStore) -> Result<(), StoreError> + Send>;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_user_by_normalized_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    async fn save_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError>;

    async fn create_role(&self, role: &Role) -> Result<(), StoreError>;

    /// All roles, ordered by id.
    async fn list_roles(&self) -> Result<Vec<Role>, StoreError>;

    async fn list_roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, StoreError>;

    async fn find_user_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<UserRole>, StoreError>;

    async fn create_user_role(&self, user_role: &UserRole) -> Result<(), StoreError>;

    async fn destroy_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), StoreError>;

    async fn count_users_with_any_role(&self) -> Result<u64, StoreError>;

    /// Users holding at least one role, paginated (1-based page) and
    /// optionally filtered by a case-insensitive substring match on
    /// email / first name / last name.
    async fn list_users_with_any_role(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<UserPage, StoreError>;

    /// Run `work` as a single atomic unit: all of its writes commit together
    /// or none of them are observable.
    async fn run_in_transaction(&self, work: TxWork) -> Result<(), StoreError>;
}
