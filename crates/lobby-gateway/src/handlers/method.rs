//! Method call handler (op 2)
//!
//! Decodes the parameters, runs the call as the connection's current caller, and
//! answers with a RESULT frame. Login and logout also update the connection itself.

use super::{HandlerError, HandlerResult};
use crate::broadcast::SubscriptionRefresher;
use crate::connection::Connection;
use crate::protocol::{CallError, CloseCode, GatewayMessage};
use crate::server::GatewayState;
use lobby_service::dto::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, SuccessResponse, UpdateProfileRequest,
    UpdateStatusRequest,
};
use lobby_service::{
    AccountService, AuthService, Method, PresenceService, ServiceError,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

/// Why a call produced no result
enum CallFailure {
    Params(serde_json::Error),
    Service(ServiceError),
}

impl From<ServiceError> for CallFailure {
    fn from(err: ServiceError) -> Self {
        Self::Service(err)
    }
}

impl From<serde_json::Error> for CallFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::Params(err)
    }
}

type CallResult = Result<Value, CallFailure>;

/// Handles METHOD frames
pub struct MethodHandler;

impl MethodHandler {
    pub async fn handle(
        state: &GatewayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<Option<CloseCode>> {
        let call_id = message.id.clone().ok_or(HandlerError::MissingField("id"))?;
        let name = message.t.clone().ok_or(HandlerError::MissingField("t"))?;

        let reply = match name.parse::<Method>() {
            Err(_) => {
                tracing::debug!(connection = %connection.id(), method = %name, "Unknown method");
                GatewayMessage::call_error(&call_id, &CallError::unknown("method", &name))
            }
            Ok(method) => match Self::call(state, connection, method, &message).await {
                Ok(result) => GatewayMessage::result(&call_id, result),
                Err(CallFailure::Params(e)) => {
                    GatewayMessage::call_error(&call_id, &CallError::bad_params(e.to_string()))
                }
                Err(CallFailure::Service(e)) => {
                    tracing::debug!(
                        connection = %connection.id(),
                        method = %method,
                        code = e.error_code(),
                        "Call failed"
                    );
                    GatewayMessage::call_error(&call_id, &CallError::from(&e))
                }
            },
        };

        connection.send(reply).await?;
        Ok(None)
    }

    async fn call(
        state: &GatewayState,
        connection: &Arc<Connection>,
        method: Method,
        message: &GatewayMessage,
    ) -> CallResult {
        let ctx = state.service_context();
        let caller = connection.caller().await;

        match method {
            Method::Register => {
                let request: RegisterRequest = message.params()?;
                to_result(&AuthService::new(ctx).register(&caller, request).await?)
            }
            Method::Login => {
                let request: LoginRequest = message.params()?;
                let outcome = AuthService::new(ctx).login(&caller, request).await?;

                state
                    .connection_manager()
                    .authenticate_connection(connection, outcome.user_id, outcome.session_id)
                    .await;
                // Views opened under a previous login now belong to the new user
                SubscriptionRefresher::refresh_all(ctx, connection).await;

                to_result(&outcome.response)
            }
            Method::Logout => {
                AuthService::new(ctx).logout(&caller).await?;

                state.connection_manager().sign_out_connection(connection).await;
                for sub_id in connection.clear_subscriptions().await {
                    if connection.send(GatewayMessage::nosub(sub_id, None)).await.is_err() {
                        break;
                    }
                }

                to_result(&SuccessResponse::ok())
            }
            Method::UpdateProfile => {
                let request: UpdateProfileRequest = message.params()?;
                to_result(&AccountService::new(ctx).update_profile(&caller, request).await?)
            }
            Method::UpdateStatus => {
                let request: UpdateStatusRequest = message.params()?;
                to_result(
                    &PresenceService::new(ctx)
                        .update_status(&caller, request.status())
                        .await?,
                )
            }
            Method::ChangePassword => {
                let request: ChangePasswordRequest = message.params()?;
                to_result(&AccountService::new(ctx).change_password(&caller, request).await?)
            }
        }
    }
}

fn to_result<T: Serialize>(value: &T) -> CallResult {
    serde_json::to_value(value).map_err(|e| CallFailure::Service(ServiceError::internal(e.to_string())))
}
