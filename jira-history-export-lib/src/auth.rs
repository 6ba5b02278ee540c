
use crate::error::*;

use dialoguer::{Input, Password};

/// Basic auth credentials for the tracker.
#[derive(Clone, RedactedDebug)]
pub struct JiraAuth {
    pub login: String,
    #[redacted]
    pub password: String,
}

/// Capability for obtaining and discarding tracker credentials.
///
/// The tracker client re-enters credentials on every authentication
/// denial, so implementations must tolerate interleaved `invalidate`
/// and `credentials` calls without limit.
pub trait CredentialSource {
    fn credentials(&mut self) -> Result<JiraAuth>;

    fn invalidate(&mut self);
}

/// Interactive credential entry, memoized until invalidated.
///
/// The login survives invalidation; only the password is asked for
/// again.
pub struct PromptCredentials {
    login: Option<String>,
    cached: Option<JiraAuth>,
}

impl PromptCredentials {
    /// A known login skips the login prompt; the password is prompted
    /// on first use.
    pub fn new(login: Option<String>) -> Self {
        PromptCredentials {
            login,
            cached: None,
        }
    }
}

impl CredentialSource for PromptCredentials {
    fn credentials(&mut self) -> Result<JiraAuth> {
        if let Some(ref auth) = self.cached {
            return Ok(auth.clone());
        }
        let login = match self.login {
            Some(ref login) => login.clone(),
            None => Input::<String>::new()
                .with_prompt("jira login")
                .interact_text()?,
        };
        let password = Password::new()
            .with_prompt("jira pass")
            .interact()?;
        let auth = JiraAuth {
            login: login.clone(),
            password,
        };
        self.login = Some(login);
        self.cached = Some(auth.clone());
        Ok(auth)
    }

    fn invalidate(&mut self) {
        self.cached = None;
    }
}
