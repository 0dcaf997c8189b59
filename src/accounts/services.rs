use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{ChangePasswordRequest, ProfileUpdateRequest};
use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        password::{hash_password, verify_password},
    },
    error::{AppError, StoreError},
    policy,
    recipes::images::discard_image,
    storage::StorageClient,
    store::{ContentStore, CredentialStore, NewUser, User},
    validation::{is_valid_email, FieldErrors, MIN_NAME_LEN, MIN_PASSWORD_LEN},
};

const INVALID_LOGIN: &str = "Invalid email or password";
const EMAIL_TAKEN: &str = "Email already in use";

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Registration, credentials and self-service account changes.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn CredentialStore>,
    content: Arc<dyn ContentStore>,
    storage: Arc<dyn StorageClient>,
    keys: JwtKeys,
}

fn email_conflict(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation(_) => AppError::Conflict(EMAIL_TAKEN.into()),
        other => other.into(),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Like [`non_blank`] but keeps the value untrimmed; passwords are taken as sent.
fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl AccountService {
    pub fn new(
        users: Arc<dyn CredentialStore>,
        content: Arc<dyn ContentStore>,
        storage: Arc<dyn StorageClient>,
        keys: JwtKeys,
    ) -> Self {
        Self {
            users,
            content,
            storage,
            keys,
        }
    }

    #[instrument(skip_all)]
    pub async fn register(&self, req: RegisterRequest) -> Result<User, AppError> {
        let name = req.name.as_deref().map(str::trim).unwrap_or_default();
        let email = req.email.as_deref().map(str::trim).unwrap_or_default();
        let password = req.password.as_deref().unwrap_or_default();

        let mut errors = FieldErrors::new();
        if name.chars().count() < MIN_NAME_LEN {
            errors.push("name", "Name must be at least 2 characters long");
        }
        if email.is_empty() {
            errors.push("email", "Email is required");
        } else if !is_valid_email(email) {
            errors.push("email", "Email should be valid");
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            errors.push("password", "Password must be at least 6 characters");
        }
        errors.into_result()?;

        if self.users.exists_by_email(email).await? {
            warn!(email, "email already registered");
            return Err(AppError::Conflict(EMAIL_TAKEN.into()));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .insert_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash,
            })
            .await
            .map_err(email_conflict)?;

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(user)
    }

    #[instrument(skip_all)]
    pub async fn authenticate(&self, req: LoginRequest) -> Result<(User, TokenPair), AppError> {
        let mut errors = FieldErrors::new();
        errors.require_text("email", req.email.as_deref(), "Email is required");
        errors.require_text("password", req.password.as_deref(), "Password is required");
        errors.into_result()?;

        let email = req.email.as_deref().map(str::trim).unwrap_or_default();
        let password = req.password.as_deref().unwrap_or_default();

        let Some(user) = self.users.find_user_by_email(email).await? else {
            warn!(email, "login unknown email");
            return Err(AppError::InvalidCredentials(INVALID_LOGIN.into()));
        };
        if !verify_password(password, &user.password_hash)? {
            warn!(email, user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials(INVALID_LOGIN.into()));
        }

        let tokens = self.issue_tokens(&user)?;
        info!(user_id = %user.id, "user logged in");
        Ok((user, tokens))
    }

    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair), AppError> {
        let claims = self.keys.verify_refresh(refresh_token).map_err(|e| {
            warn!(error = %e, "refresh token rejected");
            AppError::Unauthenticated("Invalid or expired refresh token".into())
        })?;
        let user = self
            .users
            .find_user_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
        let tokens = self.issue_tokens(&user)?;
        Ok((user, tokens))
    }

    fn issue_tokens(&self, user: &User) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.keys.sign_access(user.id, &user.email)?,
            refresh_token: self.keys.sign_refresh(user.id, &user.email)?,
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<User, AppError> {
        self.users
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with id: {id}")))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, AppError> {
        self.users
            .find_user_by_email(email)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found with email: {email}")))
    }

    pub async fn exists_by_email(&self, email: &str) -> Result<bool, AppError> {
        Ok(self.users.exists_by_email(email).await?)
    }

    /// Applies a partial update to the acting user's own profile.
    #[instrument(skip(self, req))]
    pub async fn update_profile(
        &self,
        acting: Uuid,
        req: ProfileUpdateRequest,
    ) -> Result<User, AppError> {
        let current = self.find_by_id(acting).await?;
        let mut name = current.name.clone();
        let mut email = current.email.clone();

        if let Some(new_name) = non_blank(req.name.as_deref()) {
            if new_name.chars().count() < MIN_NAME_LEN {
                return Err(AppError::validation(
                    "name",
                    "Name must be at least 2 characters long",
                ));
            }
            name = new_name.to_string();
        }

        if let Some(new_email) = non_blank(req.email.as_deref()) {
            if new_email != current.email {
                if !is_valid_email(new_email) {
                    return Err(AppError::validation("email", "Invalid email format"));
                }
                if self.users.exists_by_email(new_email).await? {
                    warn!(user_id = %acting, "profile email already in use");
                    return Err(AppError::Conflict(EMAIL_TAKEN.into()));
                }
                email = new_email.to_string();
            }
        }

        let user = self
            .users
            .update_profile(acting, &name, &email)
            .await
            .map_err(email_conflict)?;
        info!(user_id = %user.id, "profile updated");
        Ok(user)
    }

    #[instrument(skip(self, req))]
    pub async fn change_password(
        &self,
        acting: Uuid,
        req: ChangePasswordRequest,
    ) -> Result<(), AppError> {
        let (Some(current), Some(new)) = (
            present(req.current_password.as_deref()),
            present(req.new_password.as_deref()),
        ) else {
            return Err(AppError::validation(
                "password",
                "Current password and new password are required",
            ));
        };

        let user = self.find_by_id(acting).await?;
        if !verify_password(current, &user.password_hash)? {
            warn!(user_id = %acting, "change password with wrong current password");
            return Err(AppError::InvalidCredentials(
                "Current password is incorrect".into(),
            ));
        }
        if new.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "newPassword",
                "New password must be at least 6 characters long",
            ));
        }

        let hash = hash_password(new)?;
        self.users.update_password_hash(acting, &hash).await?;
        info!(user_id = %acting, "password changed");
        Ok(())
    }

    /// Deletes `target` with everything it owns. Only the account itself may do this.
    #[instrument(skip(self))]
    pub async fn delete_account(&self, acting: Uuid, target: Uuid) -> Result<(), AppError> {
        policy::ensure_self(acting, target, "You are not authorized to delete this user")?;
        let user = self.find_by_id(target).await?;

        let images: Vec<String> = self
            .content
            .list_recipes_by_owner(user.id)
            .await?
            .into_iter()
            .filter_map(|r| r.image_url)
            .collect();

        if !self.users.delete_user(user.id).await? {
            return Err(AppError::NotFound(format!("User not found with id: {target}")));
        }
        for image in &images {
            discard_image(self.storage.as_ref(), image).await;
        }

        info!(user_id = %user.id, images = images.len(), "account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn registration(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: Some(name.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[tokio::test]
    async fn register_then_duplicate_email_conflicts() {
        let state = AppState::fake();
        let accounts = &state.accounts;

        let user = accounts
            .register(registration("Alice", "alice@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.name, "Alice");
        assert_ne!(user.password_hash, "secret1");
        assert!(accounts.exists_by_email("alice@x.com").await.unwrap());

        let err = accounts
            .register(registration("Alice Two", "alice@x.com", "secret2"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_reports_every_invalid_field() {
        let state = AppState::fake();
        let err = state
            .accounts
            .register(registration("A", "not-an-email", "123"))
            .await
            .unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["name", "email", "password"]);
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let state = AppState::fake();
        state
            .accounts
            .register(registration("Alice", "alice@x.com", "secret1"))
            .await
            .unwrap();
        let err = state.accounts.find_by_email("Alice@x.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn authenticate_issues_verifiable_tokens() {
        let state = AppState::fake();
        let alice = state
            .accounts
            .register(registration("Alice", "alice@x.com", "secret1"))
            .await
            .unwrap();

        let (user, tokens) = state
            .accounts
            .authenticate(login("alice@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(user.id, alice.id);
        let claims = state.jwt.verify(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, alice.id);
        assert_eq!(claims.email, "alice@x.com");

        let (again, _) = state.accounts.refresh(&tokens.refresh_token).await.unwrap();
        assert_eq!(again.id, alice.id);
        assert!(state.accounts.refresh(&tokens.access_token).await.is_err());
    }

    #[tokio::test]
    async fn authenticate_rejects_bad_credentials() {
        let state = AppState::fake();
        state
            .accounts
            .register(registration("Alice", "alice@x.com", "secret1"))
            .await
            .unwrap();

        for (email, password) in [("alice@x.com", "wrong!!"), ("nobody@x.com", "secret1")] {
            let err = state
                .accounts
                .authenticate(login(email, password))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials(_)));
        }
    }

    #[tokio::test]
    async fn profile_update_validates_and_applies() {
        let state = AppState::fake();
        let alice = state
            .accounts
            .register(registration("Alice", "alice@x.com", "secret1"))
            .await
            .unwrap();
        state
            .accounts
            .register(registration("Bob", "bob@x.com", "secret1"))
            .await
            .unwrap();

        let short = ProfileUpdateRequest {
            name: Some(" A ".into()),
            email: None,
        };
        assert!(matches!(
            state.accounts.update_profile(alice.id, short).await,
            Err(AppError::Validation(_))
        ));

        let bad_email = ProfileUpdateRequest {
            name: None,
            email: Some("nope".into()),
        };
        assert!(matches!(
            state.accounts.update_profile(alice.id, bad_email).await,
            Err(AppError::Validation(_))
        ));

        let taken = ProfileUpdateRequest {
            name: None,
            email: Some("bob@x.com".into()),
        };
        assert!(matches!(
            state.accounts.update_profile(alice.id, taken).await,
            Err(AppError::Conflict(_))
        ));

        let same_email = ProfileUpdateRequest {
            name: Some("  Alice Liddell ".into()),
            email: Some("alice@x.com".into()),
        };
        let updated = state.accounts.update_profile(alice.id, same_email).await.unwrap();
        assert_eq!(updated.name, "Alice Liddell");
        assert_eq!(updated.email, "alice@x.com");

        let moved = ProfileUpdateRequest {
            name: None,
            email: Some("liddell@x.com".into()),
        };
        let updated = state.accounts.update_profile(alice.id, moved).await.unwrap();
        assert_eq!(updated.email, "liddell@x.com");
        assert_eq!(updated.created_at, alice.created_at);
    }

    #[tokio::test]
    async fn change_password_flow() {
        let state = AppState::fake();
        let alice = state
            .accounts
            .register(registration("Alice", "alice@x.com", "secret1"))
            .await
            .unwrap();

        let missing = ChangePasswordRequest {
            current_password: Some("secret1".into()),
            new_password: Some("  ".into()),
        };
        assert!(matches!(
            state.accounts.change_password(alice.id, missing).await,
            Err(AppError::Validation(_))
        ));

        let wrong = ChangePasswordRequest {
            current_password: Some("nope".into()),
            new_password: Some("secret2".into()),
        };
        assert!(matches!(
            state.accounts.change_password(alice.id, wrong).await,
            Err(AppError::InvalidCredentials(_))
        ));

        let short = ChangePasswordRequest {
            current_password: Some("secret1".into()),
            new_password: Some("12345".into()),
        };
        assert!(matches!(
            state.accounts.change_password(alice.id, short).await,
            Err(AppError::Validation(_))
        ));

        let ok = ChangePasswordRequest {
            current_password: Some("secret1".into()),
            new_password: Some("secret2".into()),
        };
        state.accounts.change_password(alice.id, ok).await.unwrap();
        assert!(state.accounts.authenticate(login("alice@x.com", "secret2")).await.is_ok());
        assert!(state.accounts.authenticate(login("alice@x.com", "secret1")).await.is_err());
    }

    #[tokio::test]
    async fn only_the_account_itself_may_delete_it() {
        let state = AppState::fake();
        let alice = state
            .accounts
            .register(registration("Alice", "alice@x.com", "secret1"))
            .await
            .unwrap();
        let bob = state
            .accounts
            .register(registration("Bob", "bob@x.com", "secret1"))
            .await
            .unwrap();

        let err = state.accounts.delete_account(bob.id, alice.id).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
        assert!(state.accounts.find_by_id(alice.id).await.is_ok());

        state.accounts.delete_account(alice.id, alice.id).await.unwrap();
        assert!(matches!(
            state.accounts.find_by_id(alice.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
