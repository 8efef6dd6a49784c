//! Identity primitives: the signed-in identity, provider errors and their
//! user-facing messages, the sign-in/sign-up flows with the email
//! verification gate, and the edit permission rule.
//!
//! The identity provider itself is external. It is reached through the
//! [`IdentityProvider`] trait, which together with [`sign_in`], [`sign_up`]
//! and [`sign_in_federated`] is the seam a provider adapter plugs into. The
//! bundled server does not call them: it trusts the identity headers set by a
//! fronting proxy that has already run these flows.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{CreatedBy, SummaryRecord};

/// An authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
}

impl Identity {
    /// Name shown in the UI: display name, else email, else uid.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.uid)
    }

    /// Snapshot stored on records this identity creates.
    pub fn snapshot(&self) -> CreatedBy {
        CreatedBy {
            uid: self.uid.clone(),
            name: self
                .display_name
                .clone()
                .or_else(|| self.email.clone()),
            email: self.email.clone(),
        }
    }
}

/// Whether `identity` may edit or delete `record`: only its creator may.
/// Records without a creator snapshot are not editable through the UI.
pub fn can_edit(record: &SummaryRecord, identity: Option<&Identity>) -> bool {
    match (&record.created_by, identity) {
        (Some(owner), Some(who)) => owner.uid == who.uid,
        _ => false,
    }
}

/// An error reported by the identity provider, carrying its error code
/// (e.g. `"auth/invalid-credential"`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("identity provider error: {code}")]
pub struct AuthError {
    pub code: String,
}

impl AuthError {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

/// Which form produced an error; selects the fallback message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

const AUTH_ERROR_MESSAGES: &[(&str, &str)] = &[
    ("auth/invalid-credential", "Invalid email or password."),
    ("auth/user-not-found", "No account found with this email."),
    ("auth/wrong-password", "Incorrect password."),
    ("auth/too-many-requests", "Too many attempts. Try again later."),
    ("auth/invalid-email", "Invalid email address."),
    (
        "auth/email-already-in-use",
        "An account with this email already exists.",
    ),
    ("auth/weak-password", "Password must be at least 6 characters."),
    ("auth/popup-closed-by-user", "Sign in cancelled."),
    ("auth/cancelled-popup-request", "Sign in cancelled."),
];

/// Human-readable text for a provider error code.
pub fn auth_error_message(code: &str, mode: AuthMode) -> &'static str {
    AUTH_ERROR_MESSAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, msg)| *msg)
        .unwrap_or(match mode {
            AuthMode::SignIn => "Sign in failed. Please try again.",
            AuthMode::SignUp => "Sign up failed. Please try again.",
        })
}

pub const VERIFICATION_SENT: &str =
    "Verification email sent. Please check your inbox and verify your email before signing in.";
pub const VERIFY_FIRST: &str =
    "Please verify your email first. A new verification link has been sent.";

/// The external identity provider capability.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Identity, AuthError>;

    /// Third-party popup/redirect sign-in.
    async fn sign_in_with_federated(&self, provider: &str) -> Result<Identity, AuthError>;

    async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    async fn send_verification(&self, identity: &Identity) -> Result<(), AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Outcome of a sign-in attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInOutcome {
    SignedIn(Identity),
    /// The account exists but its email is unverified; the user was signed
    /// out again and a fresh verification link sent.
    VerificationRequired { info: &'static str },
}

/// Email/password sign-in with the verification gate.
pub async fn sign_in(
    provider: &dyn IdentityProvider,
    email: &str,
    password: &str,
) -> Result<SignInOutcome, &'static str> {
    let identity = provider
        .sign_in_with_password(email, password)
        .await
        .map_err(|e| auth_error_message(&e.code, AuthMode::SignIn))?;

    if identity.email_verified {
        return Ok(SignInOutcome::SignedIn(identity));
    }

    provider
        .send_verification(&identity)
        .await
        .map_err(|e| auth_error_message(&e.code, AuthMode::SignIn))?;
    provider
        .sign_out()
        .await
        .map_err(|e| auth_error_message(&e.code, AuthMode::SignIn))?;
    Ok(SignInOutcome::VerificationRequired { info: VERIFY_FIRST })
}

/// Federated sign-in. Federated identities arrive verified by the
/// third party, so no gate applies.
pub async fn sign_in_federated(
    provider: &dyn IdentityProvider,
    provider_id: &str,
) -> Result<Identity, &'static str> {
    provider
        .sign_in_with_federated(provider_id)
        .await
        .map_err(|e| auth_error_message(&e.code, AuthMode::SignIn))
}

/// Create an account, send its verification email, and sign out so the
/// first real sign-in passes the gate. Returns the info message to show.
pub async fn sign_up(
    provider: &dyn IdentityProvider,
    email: &str,
    password: &str,
) -> Result<&'static str, &'static str> {
    let to_msg = |e: AuthError| auth_error_message(&e.code, AuthMode::SignUp);
    let identity = provider.create_account(email, password).await.map_err(to_msg)?;
    provider.send_verification(&identity).await.map_err(to_msg)?;
    provider.sign_out().await.map_err(to_msg)?;
    Ok(VERIFICATION_SENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewSummary;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeProvider {
        accounts: Mutex<HashMap<String, (String, Identity)>>,
        verifications_sent: Mutex<u32>,
        signed_in: Mutex<bool>,
    }

    impl FakeProvider {
        fn with_account(email: &str, password: &str, verified: bool) -> Self {
            let p = FakeProvider::default();
            p.accounts.lock().unwrap().insert(
                email.to_string(),
                (
                    password.to_string(),
                    Identity {
                        uid: format!("uid-{}", email),
                        display_name: None,
                        email: Some(email.to_string()),
                        email_verified: verified,
                    },
                ),
            );
            p
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        async fn sign_in_with_password(
            &self,
            email: &str,
            password: &str,
        ) -> Result<Identity, AuthError> {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some((pw, id)) if pw == password => {
                    *self.signed_in.lock().unwrap() = true;
                    Ok(id.clone())
                }
                Some(_) => Err(AuthError::new("auth/wrong-password")),
                None => Err(AuthError::new("auth/user-not-found")),
            }
        }

        async fn sign_in_with_federated(&self, _provider: &str) -> Result<Identity, AuthError> {
            Err(AuthError::new("auth/popup-closed-by-user"))
        }

        async fn create_account(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
            if password.len() < 6 {
                return Err(AuthError::new("auth/weak-password"));
            }
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(AuthError::new("auth/email-already-in-use"));
            }
            let id = Identity {
                uid: format!("uid-{}", email),
                display_name: None,
                email: Some(email.to_string()),
                email_verified: false,
            };
            accounts.insert(email.to_string(), (password.to_string(), id.clone()));
            *self.signed_in.lock().unwrap() = true;
            Ok(id)
        }

        async fn send_verification(&self, _identity: &Identity) -> Result<(), AuthError> {
            *self.verifications_sent.lock().unwrap() += 1;
            Ok(())
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            *self.signed_in.lock().unwrap() = false;
            Ok(())
        }
    }

    #[test]
    fn known_codes_map_to_messages() {
        assert_eq!(
            auth_error_message("auth/invalid-credential", AuthMode::SignIn),
            "Invalid email or password."
        );
        assert_eq!(
            auth_error_message("auth/cancelled-popup-request", AuthMode::SignUp),
            "Sign in cancelled."
        );
    }

    #[test]
    fn unknown_codes_fall_back_per_mode() {
        assert_eq!(
            auth_error_message("auth/network-request-failed", AuthMode::SignIn),
            "Sign in failed. Please try again."
        );
        assert_eq!(
            auth_error_message("", AuthMode::SignUp),
            "Sign up failed. Please try again."
        );
    }

    #[tokio::test]
    async fn verified_account_signs_in() {
        let p = FakeProvider::with_account("ann@example.com", "secret1", true);
        let outcome = sign_in(&p, "ann@example.com", "secret1").await.unwrap();
        assert!(matches!(outcome, SignInOutcome::SignedIn(ref id) if id.uid == "uid-ann@example.com"));
        assert!(*p.signed_in.lock().unwrap());
    }

    #[tokio::test]
    async fn unverified_account_is_gated() {
        let p = FakeProvider::with_account("bo@example.com", "secret1", false);
        let outcome = sign_in(&p, "bo@example.com", "secret1").await.unwrap();
        assert_eq!(outcome, SignInOutcome::VerificationRequired { info: VERIFY_FIRST });
        assert!(!*p.signed_in.lock().unwrap());
        assert_eq!(*p.verifications_sent.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn bad_password_maps_message() {
        let p = FakeProvider::with_account("ann@example.com", "secret1", true);
        let err = sign_in(&p, "ann@example.com", "nope").await.unwrap_err();
        assert_eq!(err, "Incorrect password.");
        let err = sign_in_federated(&p, "google.com").await.unwrap_err();
        assert_eq!(err, "Sign in cancelled.");
    }

    #[tokio::test]
    async fn sign_up_sends_verification_and_signs_out() {
        let p = FakeProvider::default();
        let info = sign_up(&p, "cy@example.com", "longenough").await.unwrap();
        assert_eq!(info, VERIFICATION_SENT);
        assert!(!*p.signed_in.lock().unwrap());
        assert_eq!(*p.verifications_sent.lock().unwrap(), 1);

        let err = sign_up(&p, "cy@example.com", "longenough").await.unwrap_err();
        assert_eq!(err, "An account with this email already exists.");
        let err = sign_up(&p, "dee@example.com", "short").await.unwrap_err();
        assert_eq!(err, "Password must be at least 6 characters.");
    }

    #[test]
    fn only_creator_can_edit() {
        let owner = Identity {
            uid: "u1".to_string(),
            display_name: Some("Ann".to_string()),
            email: Some("ann@example.com".to_string()),
            email_verified: true,
        };
        let other = Identity {
            uid: "u2".to_string(),
            ..owner.clone()
        };
        let mut record = NewSummary {
            id: "x".to_string(),
            game_title: "X".to_string(),
            source_filenames: vec!["x.pdf".to_string()],
            markdown: "## X".to_string(),
            bgg_link: None,
            created_by: Some(owner.snapshot()),
        }
        .into_record(Utc::now());

        assert!(can_edit(&record, Some(&owner)));
        assert!(!can_edit(&record, Some(&other)));
        assert!(!can_edit(&record, None));

        record.created_by = None;
        assert!(!can_edit(&record, Some(&owner)));
    }

    #[test]
    fn snapshot_prefers_display_name() {
        let id = Identity {
            uid: "u1".to_string(),
            display_name: None,
            email: Some("ann@example.com".to_string()),
            email_verified: true,
        };
        assert_eq!(id.snapshot().name.as_deref(), Some("ann@example.com"));
        assert_eq!(id.label(), "ann@example.com");
    }
}
