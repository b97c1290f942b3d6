use crate::error::OrderingError;
use crate::model::AccountId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub account_id: AccountId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub profile: Profile,
}

/// External auth collaborator. The ordering core only ever consumes
/// `validate`: a present, valid bearer token is "session established" and
/// yields the account identity everything else keys on. Password hashing and
/// token issuance live behind this seam.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<Session, OrderingError>;
    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Profile, OrderingError>;
    async fn validate(&self, token: &str) -> Result<Option<Profile>, OrderingError>;
    async fn forgot_password(&self, email: &str) -> Result<(), OrderingError>;
    async fn reset_password(&self, token: &str, new_password: &str)
        -> Result<(), OrderingError>;
    /// Discards the credential; nothing else.
    async fn logout(&self, token: &str) -> Result<(), OrderingError>;
}

#[derive(Default)]
struct StaticAuthState {
    // email -> (password, profile)
    accounts: HashMap<String, (String, Profile)>,
    // bearer token -> email
    tokens: HashMap<String, String>,
    // reset token -> email
    reset_tokens: HashMap<String, String>,
}

/// In-memory auth implementation for tests and local runs. Plaintext
/// passwords and counter-based tokens; a real deployment swaps in a proper
/// identity service behind [`AuthClient`].
#[derive(Default)]
pub struct StaticAuth {
    state: Mutex<StaticAuthState>,
    counter: AtomicI64,
}

impl StaticAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a bearer token for a profile, bypassing login. Test hook.
    pub async fn issue(&self, profile: Profile) -> String {
        let token = format!("tok-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        let mut state = self.state.lock().await;
        state.tokens.insert(token.clone(), profile.email.clone());
        state
            .accounts
            .entry(profile.email.clone())
            .or_insert_with(|| (String::new(), profile));
        token
    }

    fn next_account_id(&self) -> AccountId {
        self.counter.fetch_add(1, Ordering::SeqCst) + 1000
    }
}

#[async_trait]
impl AuthClient for StaticAuth {
    async fn login(&self, email: &str, password: &str) -> Result<Session, OrderingError> {
        let token = format!("tok-{}", self.counter.fetch_add(1, Ordering::SeqCst));
        let mut state = self.state.lock().await;
        let profile = match state.accounts.get(email) {
            Some((stored, profile)) if stored == password => profile.clone(),
            _ => return Err(OrderingError::Auth),
        };
        state.tokens.insert(token.clone(), email.to_string());
        info!(email, "session established");
        Ok(Session { token, profile })
    }

    async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Profile, OrderingError> {
        let account_id = self.next_account_id();
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(email) {
            return Err(OrderingError::Auth);
        }
        let profile = Profile {
            account_id,
            name: name.to_string(),
            email: email.to_string(),
        };
        state
            .accounts
            .insert(email.to_string(), (password.to_string(), profile.clone()));
        Ok(profile)
    }

    async fn validate(&self, token: &str) -> Result<Option<Profile>, OrderingError> {
        let state = self.state.lock().await;
        let profile = state
            .tokens
            .get(token)
            .and_then(|email| state.accounts.get(email))
            .map(|(_, profile)| profile.clone());
        Ok(profile)
    }

    async fn forgot_password(&self, email: &str) -> Result<(), OrderingError> {
        let mut state = self.state.lock().await;
        if state.accounts.contains_key(email) {
            let reset = format!("reset-{}", email);
            state.reset_tokens.insert(reset, email.to_string());
        }
        // Unknown addresses are not reported back to the caller.
        Ok(())
    }

    async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), OrderingError> {
        let mut state = self.state.lock().await;
        let email = state.reset_tokens.remove(token).ok_or(OrderingError::Auth)?;
        match state.accounts.get_mut(&email) {
            Some((password, _)) => {
                *password = new_password.to_string();
                Ok(())
            }
            None => Err(OrderingError::Auth),
        }
    }

    async fn logout(&self, token: &str) -> Result<(), OrderingError> {
        let mut state = self.state.lock().await;
        state.tokens.remove(token);
        Ok(())
    }
}
