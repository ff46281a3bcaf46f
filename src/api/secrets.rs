//! App secrets API wrappers.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;

#[derive(Debug, Deserialize)]
struct SecretList {
    results: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SecretBody<'a> {
    key: &'a str,
    secret: &'a str,
}

/// List the names of all secrets on the account. Values are never returned.
pub async fn fetch_secrets(client: &ApiClient) -> crate::Result<Vec<String>> {
    let list: SecretList = client.get_json("secrets/v1/secrets").await?;
    Ok(list.results)
}

/// Create a new secret.
pub async fn add_secret(client: &ApiClient, name: &str, value: &str) -> crate::Result<()> {
    client
        .post(
            "secrets/v1/secrets",
            &SecretBody {
                key: name,
                secret: value,
            },
        )
        .await
}

/// Replace the value of an existing secret.
pub async fn update_secret(client: &ApiClient, name: &str, value: &str) -> crate::Result<()> {
    client
        .put(
            "secrets/v1/secrets",
            &SecretBody {
                key: name,
                secret: value,
            },
        )
        .await
}

/// Delete a secret by name.
pub async fn delete_secret(client: &ApiClient, name: &str) -> crate::Result<()> {
    client.delete(&format!("secrets/v1/secrets/{name}")).await
}
