use crate::error::Res;
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Create a directory and any missing parents.
pub(crate) async fn make_dir(path: impl AsRef<Path>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory {}", path.display()))
}

/// Resolve `path` to an absolute path. The path must exist.
pub(crate) async fn canonicalize(path: impl AsRef<Path>) -> Res<PathBuf> {
    let path = path.as_ref();
    tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Unable to resolve the path {}", path.display()))
}

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Unable to write to {}", path.display()))
}

/// Read a file into memory.
pub(crate) async fn read_bytes(path: &Path) -> Res<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Unable to read {}", path.display()))
}

/// The size of a file in bytes.
pub(crate) async fn file_size(path: &Path) -> Res<u64> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Unable to read {}", path.display()))?;
    if !metadata.is_file() {
        anyhow::bail!("{} is not a file", path.display());
    }
    Ok(metadata.len())
}

/// Deserialize a JSON file into type `T`.
pub(crate) async fn deserialize<T>(path: &Path) -> Res<T>
where
    T: DeserializeOwned,
{
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Unable to read {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Unable to parse the JSON file at {}", path.display()))
}

/// Serialize `value` as pretty JSON into the file at `path`.
pub(crate) async fn serialize<T>(path: &Path, value: &T) -> Res<()>
where
    T: Serialize,
{
    let json = serde_json::to_string_pretty(value).context("Unable to serialize to JSON")?;
    write(path, json).await
}
