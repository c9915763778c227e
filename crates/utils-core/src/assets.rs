use std::path::PathBuf;

use directories::ProjectDirs;

const PROJECT_ROOT: &str = env!("CARGO_MANIFEST_DIR");
pub const ASSET_DIR_ENV: &str = "DEVBOARD_ASSET_DIR";

/// Directory holding the SQLite database and the optional `config.json`.
///
/// `DEVBOARD_ASSET_DIR` wins when set. Debug builds use `dev_assets/` at the
/// workspace root; release builds use the platform data directory.
pub fn asset_dir() -> PathBuf {
    let path = match std::env::var(ASSET_DIR_ENV) {
        Ok(override_dir) if !override_dir.trim().is_empty() => PathBuf::from(override_dir.trim()),
        _ if cfg!(debug_assertions) => PathBuf::from(PROJECT_ROOT).join("../../dev_assets"),
        _ => match ProjectDirs::from("dev", "devboard", "devboard") {
            Some(dirs) => dirs.data_dir().to_path_buf(),
            None => {
                tracing::warn!("No home directory available; using the temp directory for assets");
                std::env::temp_dir().join("devboard")
            }
        },
    };

    if !path.exists()
        && let Err(err) = std::fs::create_dir_all(&path)
    {
        tracing::warn!(path = %path.display(), error = %err, "Failed to create asset directory");
    }

    path
}

pub fn config_path() -> PathBuf {
    asset_dir().join("config.json")
}
