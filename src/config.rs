//! Accounts configuration — the YAML file describing named accounts
//! (credentials, environment, auth type) used by the harbor CLI.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::HarborError;

/// Environment an account talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Prod,
    Qa,
}

/// Authentication flow an account was configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    PersonalAccessKey,
    ApiKey,
    OAuth2,
}

/// One named account entry in the config file.
///
/// Only the credential fields matching `auth_type` are expected to be set;
/// `validate()` enforces that. Credential storage and token refresh are handled
/// elsewhere — this is just the on-disk record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    pub account_id: u64,
    #[serde(default)]
    pub env: Environment,
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personal_access_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AccountConfig {
    fn bare(name: &str, account_id: u64, env: Environment, auth_type: AuthType) -> Self {
        Self {
            name: name.to_string(),
            account_id,
            env,
            auth_type,
            personal_access_key: None,
            api_key: None,
            client_id: None,
            client_secret: None,
            refresh_token: None,
        }
    }

    /// Account entry for the personal-access-key auth flow.
    pub fn for_personal_access_key(
        name: &str,
        account_id: u64,
        env: Environment,
        key: &str,
    ) -> Self {
        let mut account = Self::bare(name, account_id, env, AuthType::PersonalAccessKey);
        account.personal_access_key = Some(key.to_string());
        account
    }

    /// Account entry for the API-key auth flow.
    pub fn for_api_key(name: &str, account_id: u64, env: Environment, key: &str) -> Self {
        let mut account = Self::bare(name, account_id, env, AuthType::ApiKey);
        account.api_key = Some(key.to_string());
        account
    }

    /// Account entry for the OAuth2 auth flow. The refresh token is filled in
    /// after the first authorization round-trip, so it starts empty.
    pub fn for_oauth2(
        name: &str,
        account_id: u64,
        env: Environment,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        let mut account = Self::bare(name, account_id, env, AuthType::OAuth2);
        account.client_id = Some(client_id.to_string());
        account.client_secret = Some(client_secret.to_string());
        account
    }

    /// The stored credential usable as a bearer token, if this auth type keeps
    /// one on disk. OAuth2 access tokens live in the CLI session, not here.
    pub fn auth_token(&self) -> Option<&str> {
        match self.auth_type {
            AuthType::PersonalAccessKey => self.personal_access_key.as_deref(),
            AuthType::ApiKey => self.api_key.as_deref(),
            AuthType::OAuth2 => None,
        }
    }

    fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty() || self.name.chars().any(char::is_whitespace) {
            return Err(HarborError::InvalidAccount(
                self.name.clone(),
                "account name must be non-empty and contain no whitespace".to_string(),
            ));
        }

        match self.auth_type {
            AuthType::PersonalAccessKey => {
                if self.personal_access_key.is_none() {
                    return Err(HarborError::InvalidAccount(
                        self.name.clone(),
                        "personalaccesskey auth requires 'personal_access_key' field".to_string(),
                    ));
                }
            }
            AuthType::ApiKey => {
                if self.api_key.is_none() {
                    return Err(HarborError::InvalidAccount(
                        self.name.clone(),
                        "apikey auth requires 'api_key' field".to_string(),
                    ));
                }
            }
            AuthType::OAuth2 => {
                if self.client_id.is_none() || self.client_secret.is_none() {
                    return Err(HarborError::InvalidAccount(
                        self.name.clone(),
                        "oauth2 auth requires 'client_id' and 'client_secret' fields".to_string(),
                    ));
                }
            }
        }

        Ok(())
    }
}

/// Top-level accounts config, parsed from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HubConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_account: Option<String>,
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl HubConfig {
    /// Default config file location: `$HARBOR_CONFIG` override, else
    /// `~/.config/harbormaster/accounts.yml`.
    pub fn default_path() -> crate::Result<PathBuf> {
        if let Ok(path) = std::env::var("HARBOR_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let config_dir = dirs::config_dir()
            .ok_or_else(|| HarborError::Config("cannot determine config directory".to_string()))?;
        Ok(config_dir.join("harbormaster").join("accounts.yml"))
    }

    /// Load and validate the config file at `path`.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| HarborError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let config: HubConfig = serde_yaml::from_str(&content)
            .map_err(|e| HarborError::Config(format!("cannot parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Like `load`, but a missing file yields an empty config.
    pub fn load_or_default(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Validate, then write the config to `path`, creating parent directories.
    /// The file holds credentials, so it is written 0600 on unix.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                HarborError::Config(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let content = serde_yaml::to_string(self)
            .map_err(|e| HarborError::Config(format!("cannot serialize config: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| HarborError::Config(format!("cannot write {}: {}", path.display(), e)))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(
                |e| {
                    HarborError::Config(format!(
                        "cannot set permissions on {}: {}",
                        path.display(),
                        e
                    ))
                },
            )?;
        }

        Ok(())
    }

    /// Validate the config: unique account names, per-auth-type required
    /// fields, and a default_account that actually exists.
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for account in &self.accounts {
            if !seen.insert(account.name.as_str()) {
                return Err(HarborError::DuplicateAccount(account.name.clone()));
            }
            account.validate()?;
        }

        if let Some(default) = &self.default_account {
            if !seen.contains(default.as_str()) {
                return Err(HarborError::AccountNotFound(default.clone()));
            }
        }

        Ok(())
    }

    /// Look up an account by name.
    pub fn account(&self, name: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.name == name)
    }

    /// The default account, if one is set and still present.
    pub fn default_account(&self) -> Option<&AccountConfig> {
        self.default_account
            .as_deref()
            .and_then(|name| self.account(name))
    }

    /// Insert or replace the account with the same name.
    pub fn upsert_account(&mut self, account: AccountConfig) {
        match self.accounts.iter_mut().find(|a| a.name == account.name) {
            Some(existing) => *existing = account,
            None => self.accounts.push(account),
        }
    }

    /// Remove an account. Clears the default pointer when it referenced the
    /// removed account.
    pub fn remove_account(&mut self, name: &str) -> crate::Result<()> {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.name != name);
        if self.accounts.len() == before {
            return Err(HarborError::AccountNotFound(name.to_string()));
        }
        if self.default_account.as_deref() == Some(name) {
            self.default_account = None;
        }
        Ok(())
    }

    /// Rename an account, following the default pointer if it referenced it.
    pub fn rename_account(&mut self, from: &str, to: &str) -> crate::Result<()> {
        if self.account(to).is_some() {
            return Err(HarborError::DuplicateAccount(to.to_string()));
        }
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.name == from)
            .ok_or_else(|| HarborError::AccountNotFound(from.to_string()))?;
        account.name = to.to_string();
        if self.default_account.as_deref() == Some(from) {
            self.default_account = Some(to.to_string());
        }
        Ok(())
    }

    /// Point the default at an existing account.
    pub fn set_default_account(&mut self, name: &str) -> crate::Result<()> {
        if self.account(name).is_none() {
            return Err(HarborError::AccountNotFound(name.to_string()));
        }
        self.default_account = Some(name.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_yaml(yaml: &str) -> HubConfig {
        serde_yaml::from_str(yaml).expect("valid YAML")
    }

    fn pak_account(name: &str, account_id: u64) -> AccountConfig {
        AccountConfig::for_personal_access_key(name, account_id, Environment::Prod, "pak-123")
    }

    #[test]
    fn test_parse_accounts_yaml() {
        let config = parse_yaml(
            r#"
            default_account: prod
            accounts:
              - name: prod
                account_id: 12345
                env: prod
                auth_type: personalaccesskey
                personal_access_key: pak-abc
              - name: sandbox
                account_id: 67890
                env: qa
                auth_type: apikey
                api_key: key-def
            "#,
        );
        assert!(config.validate().is_ok());
        assert_eq!(config.accounts.len(), 2);
        assert_eq!(config.default_account().unwrap().account_id, 12345);
        assert_eq!(config.account("sandbox").unwrap().env, Environment::Qa);
    }

    #[test]
    fn test_env_defaults_to_prod() {
        let config = parse_yaml(
            r#"
            accounts:
              - name: prod
                account_id: 1
                auth_type: apikey
                api_key: key
            "#,
        );
        assert_eq!(config.account("prod").unwrap().env, Environment::Prod);
    }

    #[test]
    fn test_duplicate_account_name_fails() {
        let mut config = HubConfig::default();
        config.accounts.push(pak_account("same", 1));
        config.accounts.push(pak_account("same", 2));
        let result = config.validate();
        assert!(matches!(result, Err(HarborError::DuplicateAccount(n)) if n == "same"));
    }

    #[test]
    fn test_missing_credential_for_auth_type_fails() {
        let config = parse_yaml(
            r#"
            accounts:
              - name: broken
                account_id: 1
                auth_type: personalaccesskey
            "#,
        );
        let result = config.validate();
        assert!(
            matches!(result, Err(HarborError::InvalidAccount(name, msg)) if name == "broken" && msg.contains("personal_access_key"))
        );
    }

    #[test]
    fn test_oauth2_requires_client_credentials() {
        let config = parse_yaml(
            r#"
            accounts:
              - name: oauth
                account_id: 1
                auth_type: oauth2
                client_id: cid
            "#,
        );
        let result = config.validate();
        assert!(
            matches!(result, Err(HarborError::InvalidAccount(name, msg)) if name == "oauth" && msg.contains("client_secret"))
        );
    }

    #[test]
    fn test_default_account_must_exist() {
        let config = parse_yaml(
            r#"
            default_account: ghost
            accounts: []
            "#,
        );
        let result = config.validate();
        assert!(matches!(result, Err(HarborError::AccountNotFound(n)) if n == "ghost"));
    }

    #[test]
    fn test_account_name_whitespace_rejected() {
        let mut config = HubConfig::default();
        config.accounts.push(pak_account("has space", 1));
        assert!(matches!(
            config.validate(),
            Err(HarborError::InvalidAccount(_, _))
        ));
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut config = HubConfig::default();
        config.upsert_account(pak_account("prod", 1));
        config.upsert_account(pak_account("prod", 99));
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.account("prod").unwrap().account_id, 99);
    }

    #[test]
    fn test_remove_account_clears_default() {
        let mut config = HubConfig::default();
        config.upsert_account(pak_account("prod", 1));
        config.set_default_account("prod").unwrap();

        config.remove_account("prod").unwrap();
        assert!(config.default_account.is_none());
        assert!(matches!(
            config.remove_account("prod"),
            Err(HarborError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_rename_account_follows_default() {
        let mut config = HubConfig::default();
        config.upsert_account(pak_account("old", 1));
        config.set_default_account("old").unwrap();

        config.rename_account("old", "new").unwrap();
        assert_eq!(config.default_account.as_deref(), Some("new"));
        assert!(config.account("old").is_none());
        assert!(config.account("new").is_some());
    }

    #[test]
    fn test_rename_to_existing_name_fails() {
        let mut config = HubConfig::default();
        config.upsert_account(pak_account("a", 1));
        config.upsert_account(pak_account("b", 2));
        let result = config.rename_account("a", "b");
        assert!(matches!(result, Err(HarborError::DuplicateAccount(n)) if n == "b"));
    }

    #[test]
    fn test_set_default_unknown_account_fails() {
        let mut config = HubConfig::default();
        let result = config.set_default_account("ghost");
        assert!(matches!(result, Err(HarborError::AccountNotFound(_))));
    }

    #[test]
    fn test_auth_token_per_auth_type() {
        let pak = pak_account("p", 1);
        assert_eq!(pak.auth_token(), Some("pak-123"));

        let api = AccountConfig::for_api_key("a", 2, Environment::Prod, "key-1");
        assert_eq!(api.auth_token(), Some("key-1"));

        let oauth = AccountConfig::for_oauth2("o", 3, Environment::Prod, "cid", "secret");
        assert_eq!(oauth.auth_token(), None);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("accounts.yml");

        let mut config = HubConfig::default();
        config.upsert_account(pak_account("prod", 12345));
        config.set_default_account("prod").unwrap();
        config.save(&path).unwrap();

        let loaded = HubConfig::load(&path).unwrap();
        assert_eq!(loaded.default_account.as_deref(), Some("prod"));
        assert_eq!(loaded.account("prod").unwrap().account_id, 12345);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_save_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accounts.yml");

        let mut config = HubConfig::default();
        config.accounts.push(pak_account("same", 1));
        config.accounts.push(pak_account("same", 2));
        assert!(config.save(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = HubConfig::load_or_default(&dir.path().join("missing.yml")).unwrap();
        assert!(config.accounts.is_empty());
        assert!(config.default_account.is_none());
    }
}
