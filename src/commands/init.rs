use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the home directory and an initial `config.json` with default settings.
///
/// # Arguments
/// - `home` - The directory that will hold the configuration, e.g. `$HOME/submetrics`
/// - `force` - Overwrite an existing `config.json`
///
/// # Errors
/// - Returns an error if `config.json` exists and `force` is false, or if any file operations
///   fail.
pub async fn init(home: &Path, force: bool) -> Result<Out<()>> {
    let config = Config::create(home, force).await?;
    Ok(format!(
        "Successfully created the config file at {}",
        config.config_path().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorType;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home, false).await.unwrap();
        assert!(out.message().contains("config.json"));
        assert!(home.join("config.json").is_file());

        let err = init(&home, false).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Config);
        assert!(err.to_string().contains("Unable to create"));
    }
}
