//! File-mapper API wrappers — upload, download metadata, delete.
//!
//! These are call surfaces only: the file is read in one piece for the
//! multipart body and download returns the mapper's node tree, not file
//! contents. Streaming transfer lives outside this crate.

use std::path::Path;

use serde::Deserialize;

use crate::api::ApiClient;
use crate::error::HarborError;

/// One node in the remote file-mapper tree.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMapperNode {
    pub name: String,
    pub path: String,
    pub folder: bool,
    #[serde(default)]
    pub children: Vec<FileMapperNode>,
    /// Download URL for file nodes; absent on folders.
    #[serde(default)]
    pub source: Option<String>,
}

/// Upload a local file to `dest` in the file mapper.
pub async fn upload_file(client: &ApiClient, src: &Path, dest: &str) -> crate::Result<()> {
    let file_name = src
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            HarborError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("source path has no file name: {}", src.display()),
            ))
        })?
        .to_string();
    let bytes = tokio::fs::read(src).await?;

    let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
    let form = reqwest::multipart::Form::new().part("file", part);

    client
        .post_form(&format!("filemapper/v1/upload/{dest}"), form)
        .await
}

/// Fetch the file-mapper node at `path` — a file node, or a folder node with
/// its children.
pub async fn fetch_node(client: &ApiClient, path: &str) -> crate::Result<FileMapperNode> {
    client
        .get_json(&format!("filemapper/v1/download/{path}"))
        .await
}

/// Delete the file or folder at `path`.
pub async fn delete_path(client: &ApiClient, path: &str) -> crate::Result<()> {
    client.delete(&format!("filemapper/v1/file/{path}")).await
}
