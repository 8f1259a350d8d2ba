//! Data transfer objects for method calls and read views
//!
//! - Request DTOs deserialize method parameters (camelCase on the wire)
//! - Response DTOs serialize results and view records
//! - Mappers convert domain entities into view records

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{
    AllUsersParams, ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest,
    UpdateStatusRequest,
};
pub use responses::{
    EmailView, LoginResponse, OwnProfileView, ProfileView, RegisterResponse, SuccessResponse,
    UserSummary, ViewRecord,
};
