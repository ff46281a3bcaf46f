//! Custom object and object schema API wrappers.
//!
//! Property definitions stay as raw JSON — their shape is owned by the remote
//! API and the CLI passes them through unmodified.

use serde::{Deserialize, Serialize};

use crate::api::ApiClient;

/// Display labels for a custom object schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaLabels {
    pub singular: String,
    pub plural: String,
}

/// A custom object schema definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectSchema {
    pub name: String,
    /// Assigned by the remote API on creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_type_id: Option<String>,
    pub labels: SchemaLabels,
    #[serde(default)]
    pub required_properties: Vec<String>,
    #[serde(default)]
    pub properties: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SchemaList {
    results: Vec<ObjectSchema>,
}

#[derive(Debug, Serialize)]
struct BatchCreateRequest<'a> {
    inputs: &'a [serde_json::Value],
}

/// Result of a batch object creation.
#[derive(Debug, Deserialize)]
pub struct BatchCreateResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<serde_json::Value>,
}

/// Fetch all custom object schemas on the account.
pub async fn fetch_schemas(client: &ApiClient) -> crate::Result<Vec<ObjectSchema>> {
    let list: SchemaList = client.get_json("crm/v3/schemas").await?;
    Ok(list.results)
}

/// Fetch one schema by name or object type id.
pub async fn fetch_schema(client: &ApiClient, name: &str) -> crate::Result<ObjectSchema> {
    client.get_json(&format!("crm/v3/schemas/{name}")).await
}

/// Create a new custom object schema. Returns the created schema with its
/// assigned object type id.
pub async fn create_schema(
    client: &ApiClient,
    schema: &ObjectSchema,
) -> crate::Result<ObjectSchema> {
    client.post_json("crm/v3/schemas", schema).await
}

/// Create a batch of objects of the given type in one call.
pub async fn batch_create_objects(
    client: &ApiClient,
    object_type: &str,
    inputs: &[serde_json::Value],
) -> crate::Result<BatchCreateResponse> {
    client
        .post_json(
            &format!("crm/v3/objects/{object_type}/batch/create"),
            &BatchCreateRequest { inputs },
        )
        .await
}
