//! Entity to DTO mappers

use lobby_core::entities::{EmailAddress, Profile, User};

use super::responses::{EmailView, OwnProfileView, ProfileView, UserSummary};

impl From<&Profile> for ProfileView {
    fn from(profile: &Profile) -> Self {
        Self {
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            avatar: profile.avatar.clone(),
            status: profile.status,
            last_seen: profile.last_seen,
        }
    }
}

impl From<&EmailAddress> for EmailView {
    fn from(email: &EmailAddress) -> Self {
        Self {
            address: email.address.clone(),
            verified: email.verified,
        }
    }
}

impl From<&User> for OwnProfileView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            emails: user.emails.iter().map(EmailView::from).collect(),
            profile: ProfileView::from(&user.profile),
            created_at: user.created_at,
        }
    }
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            profile: ProfileView::from(&user.profile),
        }
    }
}
