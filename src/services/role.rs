//! Role service - role assignment, removal, listings, and admin provisioning.
//!
//! The ADMIN role drives the `User::is_admin` flag; whenever the role is
//! (un)assigned the flag is synced in the same transactional unit as the
//! join-row write, so the two can never diverge under partial failure.

use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::account::UserProfile;
use crate::dtos::admin::{CreateAdminUserRequest, PagedUsers, RoleResponse, UserWithRoles};
use crate::models::{Role, User, UserRole};
use crate::services::error::ServiceError;
use crate::store::{CredentialStore, StoreError};
use crate::utils::validation::{normalize_email, validation_message};
use crate::utils::{hash_password, Clock};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct RoleService {
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
}

impl RoleService {
    pub fn new(store: Arc<dyn CredentialStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Assign a role to a user. Assigning an already-held role is a conflict.
    pub async fn assign_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or(ServiceError::NotFound("role"))?;

        if self.store.find_user_role(user_id, role_id).await?.is_some() {
            return Err(ServiceError::RoleAlreadyAssigned);
        }

        let user_role = UserRole::new(user_id, role_id);
        if role.is_admin_role() {
            user.is_admin = true;
            user.touch(self.clock.now());
            self.store
                .run_in_transaction(Box::new(move |tx| {
                    tx.create_user_role(&user_role)?;
                    tx.save_user(&user)
                }))
                .await
                .map_err(map_tx_error)?;
        } else {
            self.store
                .create_user_role(&user_role)
                .await
                .map_err(|e| match e {
                    StoreError::Duplicate(_) => ServiceError::RoleAlreadyAssigned,
                    other => other.into(),
                })?;
        }

        tracing::info!(user_id = %user_id, role = %role.name, "Role assigned");
        Ok(())
    }

    /// Remove a role from a user. Removing a role the user never held is a
    /// conflict.
    pub async fn remove_role(&self, user_id: Uuid, role_id: Uuid) -> Result<(), ServiceError> {
        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;
        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or(ServiceError::NotFound("role"))?;

        if self.store.find_user_role(user_id, role_id).await?.is_none() {
            return Err(ServiceError::RoleNotAssigned);
        }

        if role.is_admin_role() {
            user.is_admin = false;
            user.touch(self.clock.now());
            self.store
                .run_in_transaction(Box::new(move |tx| {
                    tx.destroy_user_role(user_id, role_id)?;
                    tx.save_user(&user)
                }))
                .await
                .map_err(map_tx_error)?;
        } else {
            self.store
                .destroy_user_role(user_id, role_id)
                .await
                .map_err(|e| match e {
                    StoreError::NotFound(_) => ServiceError::RoleNotAssigned,
                    other => other.into(),
                })?;
        }

        tracing::info!(user_id = %user_id, role = %role.name, "Role removed");
        Ok(())
    }

    /// Roles currently held by a user.
    pub async fn list_user_roles(&self, user_id: Uuid) -> Result<Vec<RoleResponse>, ServiceError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let roles = self.store.list_roles_for_user(user_id).await?;
        Ok(roles.iter().map(RoleResponse::from).collect())
    }

    /// All roles, ordered by id.
    pub async fn list_roles(&self) -> Result<Vec<RoleResponse>, ServiceError> {
        let roles = self.store.list_roles().await?;
        Ok(roles.iter().map(RoleResponse::from).collect())
    }

    /// The admin-user subset: users holding at least one role, paginated and
    /// optionally filtered by substring match on email or name.
    pub async fn list_users_with_roles(
        &self,
        page: u32,
        page_size: u32,
        search: Option<&str>,
    ) -> Result<PagedUsers, ServiceError> {
        let page = page.max(1);
        let page_size = match page_size {
            0 => DEFAULT_PAGE_SIZE,
            size => size.min(MAX_PAGE_SIZE),
        };
        let search = search.map(str::trim).filter(|s| !s.is_empty());

        let result = self
            .store
            .list_users_with_any_role(page, page_size, search)
            .await?;

        let mut users = Vec::with_capacity(result.users.len());
        for user in &result.users {
            let roles = self.store.list_roles_for_user(user.id).await?;
            users.push(UserWithRoles {
                profile: UserProfile::from(user),
                roles: roles.iter().map(RoleResponse::from).collect(),
            });
        }

        Ok(PagedUsers {
            users,
            total: result.total,
            page,
            page_size,
        })
    }

    /// Atomically create a pre-confirmed user together with an initial role
    /// assignment. A failure after the user row is staged rolls the whole
    /// unit back, leaving no orphan user.
    pub async fn create_admin_user(
        &self,
        req: CreateAdminUserRequest,
    ) -> Result<UserProfile, ServiceError> {
        req.validate()
            .map_err(|e| ServiceError::Validation(validation_message(&e)))?;

        let normalized = normalize_email(&req.email);
        if self
            .store
            .find_user_by_normalized_email(&normalized)
            .await?
            .is_some()
        {
            return Err(ServiceError::DuplicateEmail);
        }

        let role: Role = self
            .store
            .find_role_by_id(req.role_id)
            .await?
            .ok_or(ServiceError::NotFound("role"))?;

        let password_hash = hash_password(&req.password)?;
        let mut user = User::new(
            &req.email,
            password_hash,
            req.first_name,
            req.last_name,
            req.phone_number,
            self.clock.now(),
        );
        user.email_confirmed = true;
        user.is_admin = role.is_admin_role();

        let profile = UserProfile::from(&user);
        let user_role = UserRole::new(user.id, role.id);
        self.store
            .run_in_transaction(Box::new(move |tx| {
                tx.create_user(&user)?;
                tx.create_user_role(&user_role)
            }))
            .await
            .map_err(|e| match e {
                StoreError::Duplicate("user.normalized_email") => ServiceError::DuplicateEmail,
                other => map_tx_error(other),
            })?;

        tracing::info!(user_id = %profile.id, role = %role.name, "Admin user provisioned");
        Ok(profile)
    }

    /// Reset the password of a provisioned admin user. The target must hold
    /// at least one role.
    pub async fn update_admin_user_password(
        &self,
        user_id: Uuid,
        new_password: &str,
    ) -> Result<(), ServiceError> {
        if new_password.len() < 6 {
            return Err(ServiceError::Validation(
                "Password must be at least 6 characters".to_string(),
            ));
        }

        let mut user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("user"))?;

        let roles = self.store.list_roles_for_user(user_id).await?;
        if roles.is_empty() {
            return Err(ServiceError::NotAnAdminUser);
        }

        user.password_hash = hash_password(new_password)?;
        user.rotate_security_stamp();
        user.touch(self.clock.now());
        self.store.save_user(&user).await?;

        tracing::info!(user_id = %user.id, "Admin user password updated");
        Ok(())
    }
}

fn map_tx_error(e: StoreError) -> ServiceError {
    match e {
        StoreError::Duplicate(_) => ServiceError::RoleAlreadyAssigned,
        // A row deleted between the pre-check and the transaction is the
        // same conflict as removing a role the user never held.
        StoreError::NotFound(_) => ServiceError::RoleNotAssigned,
        other => ServiceError::Transaction(other.to_string()),
    }
}
