//! Account service
//!
//! Profile edits and password changes for the logged-in user.

use lobby_core::validation::{validate_name, validate_password};
use lobby_core::{AccountEvent, DomainError, ProfileChanges};
use tracing::{error, info, instrument, warn};

use crate::dto::{ChangePasswordRequest, SuccessResponse, UpdateProfileRequest};

use super::caller::CallerContext;
use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::operation::{Method, Operation};

pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Change any of first name, last name, and avatar. Omitted fields stay as they are.
    #[instrument(skip(self, caller), fields(connection = %caller.connection_id))]
    pub async fn update_profile(
        &self,
        caller: &CallerContext,
        request: UpdateProfileRequest,
    ) -> ServiceResult<SuccessResponse> {
        self.ctx
            .throttle(caller, Operation::Call(Method::UpdateProfile))?;
        let user_id = caller.require_user()?;

        if request.first_name.as_deref().is_some_and(|n| !validate_name(n)) {
            return Err(DomainError::InvalidFirstName.into());
        }
        if request.last_name.as_deref().is_some_and(|n| !validate_name(n)) {
            return Err(DomainError::InvalidLastName.into());
        }

        let changes = ProfileChanges::from(request);
        if changes.is_empty() {
            return Ok(SuccessResponse::ok());
        }

        self.ctx
            .store()
            .update_profile(user_id, &changes)
            .await
            .map_err(|e| {
                error!(user_id = %user_id, error = %e, "Failed to update profile");
                ServiceError::ProfileUpdateFailed
            })?;

        info!(user_id = %user_id, "Profile updated");
        self.ctx.publish(AccountEvent::ProfileUpdated {
            user_id,
            timestamp: self.ctx.now(),
        });
        Ok(SuccessResponse::ok())
    }

    /// Replace the password after checking the current one.
    ///
    /// A wrong current password and a store failure look the same to the caller.
    #[instrument(skip(self, caller, request), fields(connection = %caller.connection_id))]
    pub async fn change_password(
        &self,
        caller: &CallerContext,
        request: ChangePasswordRequest,
    ) -> ServiceResult<SuccessResponse> {
        self.ctx
            .throttle(caller, Operation::Call(Method::ChangePassword))?;
        let user_id = caller.require_user()?;

        if !validate_password(&request.new_password) {
            return Err(DomainError::InvalidPassword.into());
        }

        match self
            .ctx
            .store()
            .change_password(user_id, &request.old_password, &request.new_password)
            .await
        {
            Ok(()) => {
                info!(user_id = %user_id, "Password changed");
                Ok(SuccessResponse::ok())
            }
            Err(DomainError::InvalidCredentials) => {
                warn!(user_id = %user_id, "Password change rejected: wrong current password");
                Err(ServiceError::PasswordChangeFailed)
            }
            Err(e) => {
                error!(user_id = %user_id, error = %e, "Failed to change password");
                Err(ServiceError::PasswordChangeFailed)
            }
        }
    }
}
