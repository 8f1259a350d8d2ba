//! Authentication service
//!
//! Handles registration, password and resume-token login, and logout.

use chrono::{DateTime, Utc};
use lobby_core::validation::{validate_email, validate_name, validate_password};
use lobby_core::{AccountEvent, DomainError, NewAccount, User, UserId};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use super::caller::CallerContext;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::operation::{Method, Operation};
use super::presence::PresenceService;

/// Result of a successful login: the caller-facing response plus the session the
/// transport should bind to the connection
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: UserId,
    pub session_id: String,
    pub response: LoginResponse,
}

pub struct AuthService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AuthService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create an account. Does not log the caller in.
    ///
    /// Fields are checked in order (email, password, first name, last name) and the
    /// first failure is returned.
    #[instrument(skip(self, caller, request), fields(connection = %caller.connection_id, email = %request.email))]
    pub async fn register(
        &self,
        caller: &CallerContext,
        request: RegisterRequest,
    ) -> ServiceResult<RegisterResponse> {
        self.ctx.throttle(caller, Operation::Call(Method::Register))?;

        if !validate_email(&request.email) {
            return Err(DomainError::InvalidEmail.into());
        }
        if !validate_password(&request.password) {
            return Err(DomainError::InvalidPassword.into());
        }
        if !validate_name(&request.first_name) {
            return Err(DomainError::InvalidFirstName.into());
        }
        if !validate_name(&request.last_name) {
            return Err(DomainError::InvalidLastName.into());
        }

        let store = self.ctx.store();
        match store.find_by_email(&request.email).await {
            Ok(Some(_)) => return Err(DomainError::UserExists.into()),
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Email lookup failed during registration");
                return Err(ServiceError::RegistrationFailed);
            }
        }

        let now = self.ctx.now();
        let user_id = match store.create(NewAccount::from(request), now).await {
            Ok(id) => id,
            // Lost a race with a concurrent registration
            Err(DomainError::UserExists) => return Err(DomainError::UserExists.into()),
            Err(e) => {
                error!(error = %e, "Failed to create account");
                return Err(ServiceError::RegistrationFailed);
            }
        };

        info!(user_id = %user_id, "User registered");
        self.ctx.publish(AccountEvent::AccountCreated {
            user_id,
            timestamp: now,
        });
        self.dispatch_verification(user_id);

        Ok(RegisterResponse {
            success: true,
            user_id: user_id.to_string(),
        })
    }

    /// Log in with a password or a resume token.
    ///
    /// Every failure reads `LOGIN_FAILED` so callers cannot tell which emails exist.
    #[instrument(skip(self, caller, request), fields(connection = %caller.connection_id))]
    pub async fn login(
        &self,
        caller: &CallerContext,
        request: LoginRequest,
    ) -> ServiceResult<LoginOutcome> {
        self.ctx.throttle(caller, Operation::Call(Method::Login))?;

        let (user, session_id) = match request {
            LoginRequest::Password { email, password } => {
                let user = self.check_password(&email, &password).await?;
                (user, Uuid::new_v4().simple().to_string())
            }
            LoginRequest::Resume { resume } => self.check_resume_token(&resume).await?,
        };

        if let Err(e) = PresenceService::new(self.ctx).mark_online(user.id).await {
            warn!(user_id = %user.id, error = %e, "Could not mark user online after login");
        }

        let issued = self
            .ctx
            .tokens()
            .issue(user.id, &session_id, self.ctx.now())
            .map_err(|e| {
                error!(error = %e, "Failed to issue resume token");
                ServiceError::LoginFailed
            })?;

        info!(user_id = %user.id, "User logged in");
        Ok(LoginOutcome {
            user_id: user.id,
            session_id,
            response: LoginResponse {
                user_id: user.id.to_string(),
                token: issued.token,
                token_expires: issued.expires_at,
            },
        })
    }

    /// Client-initiated logout: status goes offline first, then the session ends.
    ///
    /// A failed status update is logged and does not stop the logout.
    #[instrument(skip(self, caller), fields(connection = %caller.connection_id))]
    pub async fn logout(&self, caller: &CallerContext) -> ServiceResult<()> {
        let user_id = caller.require_user()?;

        if let Err(e) = PresenceService::new(self.ctx)
            .update_status(caller, "offline")
            .await
        {
            warn!(user_id = %user_id, error = %e, "Status update failed during logout");
        }

        if let Some(session_id) = &caller.session_id {
            let until = self
                .ctx
                .tokens()
                .expires_at(self.ctx.now())
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            self.ctx.sessions().revoke(session_id, until);
        }

        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    async fn check_password(&self, email: &str, password: &str) -> ServiceResult<User> {
        match self.ctx.store().verify_credentials(email, password).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                warn!("Login failed: bad credentials");
                Err(ServiceError::LoginFailed)
            }
            Err(e) => {
                error!(error = %e, "Credential check failed");
                Err(ServiceError::LoginFailed)
            }
        }
    }

    async fn check_resume_token(&self, token: &str) -> ServiceResult<(User, String)> {
        let claims = self.ctx.tokens().validate(token).map_err(|e| {
            warn!(error = %e, "Login failed: unusable resume token");
            ServiceError::LoginFailed
        })?;

        if self.ctx.sessions().is_revoked(&claims.sid) {
            warn!("Login failed: resume token was revoked");
            return Err(ServiceError::LoginFailed);
        }

        let user_id = claims.user_id().map_err(|_| ServiceError::LoginFailed)?;
        match self.ctx.store().find_by_id(user_id).await {
            Ok(Some(user)) => Ok((user, claims.sid)),
            Ok(None) => {
                warn!(user_id = %user_id, "Login failed: resume token for missing user");
                Err(ServiceError::LoginFailed)
            }
            Err(e) => {
                error!(error = %e, "User lookup failed during resume");
                Err(ServiceError::LoginFailed)
            }
        }
    }

    /// Fire-and-forget; the caller never waits on or hears about mail failures
    fn dispatch_verification(&self, user_id: UserId) {
        let store = self.ctx.store_handle();
        tokio::spawn(async move {
            if let Err(e) = store.send_verification_email(user_id).await {
                warn!(user_id = %user_id, error = %e, "Failed to send verification email");
            }
        });
    }
}
