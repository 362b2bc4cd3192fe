//! Credential loaders for code-execution API keys.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use pcommon::UserId;
use pdispatch::{ArtifactError, ArtifactFuture, CredentialLoader};

use crate::SecretString;

/// Per-user secrets with optional shared fallbacks, held in memory.
#[derive(Debug, Default)]
pub struct InMemoryCredentialLoader {
    user_values: Mutex<HashMap<(UserId, String), SecretString>>,
    shared_values: Mutex<HashMap<String, SecretString>>,
}

impl InMemoryCredentialLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_user_value(
        &self,
        user_id: impl Into<UserId>,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ArtifactError> {
        let secret = non_empty(value)?;
        self.user_values()?
            .insert((user_id.into(), field.into()), secret);
        Ok(())
    }

    /// Used for any user without a value of their own.
    pub fn set_shared_value(
        &self,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), ArtifactError> {
        let secret = non_empty(value)?;
        self.shared_values()?.insert(field.into(), secret);
        Ok(())
    }

    pub fn clear_user(&self, user_id: &UserId) -> Result<usize, ArtifactError> {
        let mut values = self.user_values()?;
        let before = values.len();
        values.retain(|(owner, _), _| owner != user_id);
        Ok(before - values.len())
    }

    fn resolve(
        &self,
        user_id: &UserId,
        fields: &[&str],
    ) -> Result<HashMap<String, String>, ArtifactError> {
        let user_values = self.user_values()?;
        let shared_values = self.shared_values()?;

        fields
            .iter()
            .map(|field| {
                let key = (user_id.clone(), field.to_string());
                user_values
                    .get(&key)
                    .or_else(|| shared_values.get(*field))
                    .map(|secret| (field.to_string(), secret.expose().to_string()))
                    .ok_or_else(|| {
                        ArtifactError::credentials(format!("no value for {field} for user {user_id}"))
                    })
            })
            .collect()
    }

    fn user_values(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<(UserId, String), SecretString>>, ArtifactError> {
        self.user_values
            .lock()
            .map_err(|_| ArtifactError::credentials("credential store lock poisoned"))
    }

    fn shared_values(
        &self,
    ) -> Result<MutexGuard<'_, HashMap<String, SecretString>>, ArtifactError> {
        self.shared_values
            .lock()
            .map_err(|_| ArtifactError::credentials("credential store lock poisoned"))
    }
}

fn non_empty(value: impl Into<String>) -> Result<SecretString, ArtifactError> {
    let secret = SecretString::new(value);
    if secret.is_empty() {
        return Err(ArtifactError::credentials("credential value must not be empty"));
    }
    Ok(secret)
}

impl CredentialLoader for InMemoryCredentialLoader {
    fn load_auth_values<'a>(
        &'a self,
        user_id: &'a UserId,
        fields: &'a [&'a str],
    ) -> ArtifactFuture<'a, Result<HashMap<String, String>, ArtifactError>> {
        Box::pin(async move { self.resolve(user_id, fields) })
    }
}

/// Reads each field from the process environment, optionally under a prefix.
#[derive(Debug, Clone, Default)]
pub struct EnvCredentialLoader {
    prefix: Option<String>,
}

impl EnvCredentialLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    fn variable_name(&self, field: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{field}"),
            None => field.to_string(),
        }
    }
}

impl CredentialLoader for EnvCredentialLoader {
    fn load_auth_values<'a>(
        &'a self,
        _user_id: &'a UserId,
        fields: &'a [&'a str],
    ) -> ArtifactFuture<'a, Result<HashMap<String, String>, ArtifactError>> {
        Box::pin(async move {
            fields
                .iter()
                .map(|field| {
                    let name = self.variable_name(field);
                    std::env::var(&name)
                        .ok()
                        .filter(|value| !value.is_empty())
                        .map(|value| (field.to_string(), value))
                        .ok_or_else(|| {
                            ArtifactError::credentials(format!(
                                "environment variable {name} is not set"
                            ))
                        })
                })
                .collect()
        })
    }
}
