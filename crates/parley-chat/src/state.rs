//! Session state machine.
//!
//! Valid transitions:
//! - Phone -> Otp (OTP requested)
//! - Otp -> Name (OTP verified, new user)
//! - Otp -> Authenticated (OTP verified, existing user)
//! - Name -> Authenticated (user registered)
//! - Phone -> Authenticated (stored token resolved on start)
//! - any -> Phone (logout, session-resolution failure)

use std::fmt;

use parley_core::{AuthStep, Profile};

/// Where a session is in the identity check, with the data each step owns.
///
/// A token exists only in `Authenticated`, and a phone number is known in
/// every later step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Waiting for a phone number.
    #[default]
    Phone,
    /// OTP sent to `phone`, waiting for the code.
    Otp { phone: String },
    /// OTP verified for a new user, waiting for a display name.
    Name { phone: String },
    /// Identified.
    Authenticated { token: String, profile: Profile },
}

impl AuthState {
    /// The discriminant of this state.
    pub fn step(&self) -> AuthStep {
        match self {
            AuthState::Phone => AuthStep::Phone,
            AuthState::Otp { .. } => AuthStep::Otp,
            AuthState::Name { .. } => AuthStep::Name,
            AuthState::Authenticated { .. } => AuthStep::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            AuthState::Authenticated { token, .. } => Some(token),
            _ => None,
        }
    }

    pub fn profile(&self) -> Option<&Profile> {
        match self {
            AuthState::Authenticated { profile, .. } => Some(profile),
            _ => None,
        }
    }

    /// The phone number collected so far, if any.
    pub fn phone(&self) -> Option<&str> {
        match self {
            AuthState::Phone => None,
            AuthState::Otp { phone } | AuthState::Name { phone } => Some(phone),
            AuthState::Authenticated { profile, .. } => Some(&profile.phone_number),
        }
    }

    /// Prompt shown in the input box for this step.
    pub fn input_hint(&self) -> &'static str {
        match self {
            AuthState::Phone => "Enter your phone number",
            AuthState::Otp { .. } => "Enter OTP",
            AuthState::Name { .. } => "Enter your name",
            AuthState::Authenticated { .. } => "Type your query or 'logout' to close the session",
        }
    }

    /// Returns whether moving from `self` to a state with step `target` is
    /// permitted. Nothing moves backward except a full reset to `Phone`.
    pub fn can_transition_to(&self, target: AuthStep) -> bool {
        matches!(
            (self.step(), target),
            (AuthStep::Phone, AuthStep::Otp)
                | (AuthStep::Otp, AuthStep::Name)
                | (AuthStep::Otp, AuthStep::Authenticated)
                | (AuthStep::Name, AuthStep::Authenticated)
                // Silent re-authentication on start
                | (AuthStep::Phone, AuthStep::Authenticated)
                // Reset
                | (_, AuthStep::Phone)
        )
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step())
    }
}
