//! Test helper module for identity-service integration tests.
//!
//! Wires the services against the in-memory store, a manually driven clock,
//! and a recording notifier so flows can be exercised end to end without any
//! external infrastructure.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use identity_service::config::{LockoutConfig, TokenConfig};
use identity_service::dtos::RegisterRequest;
use identity_service::models::{Role, User, UserRole};
use identity_service::services::{
    AccountService, LockoutPolicy, Notifier, NotifierError, RoleService, TokenService,
};
use identity_service::store::{
    CredentialStore, MemoryStore, StoreError, TxStore, TxWork, UserPage,
};
use identity_service::utils::ManualClock;

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
    pub tokens: TokenService,
    pub accounts: AccountService,
    pub roles: RoleService,
}

pub fn token_config() -> TokenConfig {
    TokenConfig {
        secret: "integration-test-secret".to_string(),
        issuer: "identity-service".to_string(),
        audience: "identity-clients".to_string(),
        session_ttl_hours: 24,
        confirmation_ttl_hours: 6,
        reset_ttl_hours: 6,
        magic_login_ttl_minutes: 15,
    }
}

pub fn setup() -> Harness {
    dotenvy::dotenv().ok();
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .try_init();

    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let notifier = Arc::new(RecordingNotifier::default());
    let tokens = TokenService::new(token_config(), clock.clone());
    let lockout = LockoutPolicy::new(&LockoutConfig::default());

    let accounts = AccountService::new(
        store.clone(),
        notifier.clone(),
        tokens.clone(),
        lockout,
        clock.clone(),
    );
    let roles = RoleService::new(store.clone(), clock.clone());

    Harness {
        store,
        clock,
        notifier,
        tokens,
        accounts,
        roles,
    }
}

pub fn register_request(email: &str, password: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: password.to_string(),
        first_name: Some("Test".to_string()),
        last_name: Some("User".to_string()),
        phone_number: None,
    }
}

/// Register a user and confirm their email via the recorded code.
pub async fn register_confirmed(harness: &Harness, email: &str, password: &str) -> Uuid {
    let profile = harness
        .accounts
        .register(register_request(email, password))
        .await
        .expect("registration failed");
    let code = harness
        .notifier
        .last_confirmation_code()
        .expect("no confirmation code recorded");
    harness
        .accounts
        .confirm_email(profile.id, &code)
        .await
        .expect("confirmation failed");
    profile.id
}

pub async fn seed_role(harness: &Harness, name: &str) -> Role {
    let role = Role::new(name);
    harness.store.create_role(&role).await.expect("seed role");
    role
}

#[derive(Debug, Clone)]
pub enum SentMessage {
    EmailConfirmation {
        email: String,
        user_id: Uuid,
        token: String,
    },
    PasswordReset {
        email: String,
        user_id: Uuid,
        token: String,
    },
    PasswordResetSuccess {
        email: String,
        display_name: String,
    },
    ContactUs {
        email: String,
        message: String,
    },
}

/// Notifier that records every message and can be switched into a failing
/// mode.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<SentMessage>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn fail_all(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn messages(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn last_confirmation_code(&self) -> Option<String> {
        self.messages().iter().rev().find_map(|m| match m {
            SentMessage::EmailConfirmation { token, .. } => Some(token.clone()),
            _ => None,
        })
    }

    pub fn last_reset_code(&self) -> Option<String> {
        self.messages().iter().rev().find_map(|m| match m {
            SentMessage::PasswordReset { token, .. } => Some(token.clone()),
            _ => None,
        })
    }

    pub fn reset_message_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|m| matches!(m, SentMessage::PasswordReset { .. }))
            .count()
    }

    fn record(&self, message: SentMessage) -> Result<(), NotifierError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotifierError("injected notifier failure".to_string()));
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_email_confirmation(
        &self,
        email: &str,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), NotifierError> {
        self.record(SentMessage::EmailConfirmation {
            email: email.to_string(),
            user_id,
            token: token.to_string(),
        })
    }

    async fn send_password_reset(
        &self,
        email: &str,
        user_id: Uuid,
        token: &str,
    ) -> Result<(), NotifierError> {
        self.record(SentMessage::PasswordReset {
            email: email.to_string(),
            user_id,
            token: token.to_string(),
        })
    }

    async fn send_password_reset_success(
        &self,
        email: &str,
        display_name: &str,
    ) -> Result<(), NotifierError> {
        self.record(SentMessage::PasswordResetSuccess {
            email: email.to_string(),
            display_name: display_name.to_string(),
        })
    }

    async fn send_contact_us(
        &self,
        _name: &str,
        email: &str,
        _phone: &str,
        _registration_number: &str,
        message: &str,
    ) -> Result<(), NotifierError> {
        self.record(SentMessage::ContactUs {
            email: email.to_string(),
            message: message.to_string(),
        })
    }
}

/// Which transactional role-row write misbehaves.
#[derive(Clone, Copy)]
pub enum TxFault {
    /// Role-row inserts fail after any user rows have been staged.
    RoleInsertFails,
    /// Role-row deletes report the row already gone, as if a concurrent
    /// removal won the race.
    RoleRowMissing,
}

/// Store wrapper that injects a fault into role-row writes made inside a
/// transaction. Everything outside the transaction hits the real store.
pub struct TxFaultStore {
    inner: Arc<MemoryStore>,
    fault: TxFault,
}

impl TxFaultStore {
    pub fn new(inner: Arc<MemoryStore>, fault: TxFault) -> Self {
        Self { inner, fault }
    }
}

struct FaultTx<'a> {
    inner: &'a mut dyn TxStore,
    fault: TxFault,
}

impl TxStore for FaultTx<'_> {
    fn create_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.inner.create_user(user)
    }

    fn save_user(&mut self, user: &User) -> Result<(), StoreError> {
        self.inner.save_user(user)
    }

    fn create_user_role(&mut self, user_role: &UserRole) -> Result<(), StoreError> {
        match self.fault {
            TxFault::RoleInsertFails => Err(StoreError::Backend(anyhow::anyhow!(
                "injected role-insert failure"
            ))),
            TxFault::RoleRowMissing => self.inner.create_user_role(user_role),
        }
    }

    fn destroy_user_role(&mut self, user_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        match self.fault {
            TxFault::RoleRowMissing => Err(StoreError::NotFound("user_role")),
            TxFault::RoleInsertFails => self.inner.destroy_user_role(user_id, role_id),
        }
    }
}

#[async_trait]
impl CredentialStore for TxFaultStore {
    async fn find_user_by_normalized_email(
        &self,
        normalized_email: &str,
    ) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_normalized_email(normalized_email).await
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.inner.find_user_by_id(id).await
    }

    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.create_user(user).await
    }

    async fn save_user(&self, user: &User) -> Result<(), StoreError> {
        self.inner.save_user(user).await
    }

    async fn find_role_by_id(&self, id: Uuid) -> Result<Option<Role>, StoreError> {
        self.inner.find_role_by_id(id).await
    }

    async fn create_role(&self, role: &Role) -> Result<(), StoreError> {
        self.inner.create_role(role).await
    }

    async fn list_roles(&self) -> Result<Vec<Role>, StoreError> {
        self.inner.list_roles().await
    }

    async fn list_roles_for_user(&self, user_id: Uuid) -> Result<Vec<Role>, StoreError> {
        self.inner.list_roles_for_user(user_id).await
    }

    async fn find_user_role(
        &self,
        user_id: Uuid,
        role_id: Uuid,
    ) -> Result<Option<UserRole>, StoreError> {
        self.inner.find_user_role(user_id, role_id).await
    }

    async fn create_user_role(&self, user_role: &UserRole) -> Result<(), StoreError> {
        self.inner.create_user_role(user_role).await
    }

    async fn destroy_user_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), StoreError> {
        self.inner.destroy_user_role(user_id, role_id).await
    }

    async fn count_users_with_any_role(&self) -> Result<u64, StoreError> {
        self.inner.count_users_with_any_role().await
    }

    async fn list_users_with_any_role(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<UserPage, StoreError> {
        self.inner.list_users_with_any_role(page, page_size, search).await
    }

    async fn run_in_transaction(&self, work: TxWork) -> Result<(), StoreError> {
        let fault = self.fault;
        self.inner
            .run_in_transaction(Box::new(move |tx| {
                work(&mut FaultTx { inner: tx, fault })
            }))
            .await
    }
}
