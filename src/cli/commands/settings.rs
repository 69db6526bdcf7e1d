//! Selection settings commands.
//!
//! Each run of the CLI is a fresh process, so settings changes are written
//! back to the `[settings]` section of the config file.

use std::path::Path;

use pic_curator::config;
use pic_curator::engine::Curator;
use pic_curator::model::OrientationPreference;

/// Store the curator's current settings in the config file at `path`.
///
/// Only the `[settings]` section is replaced; a `--root` override is not
/// persisted.
fn persist_settings(curator: &Curator, path: Option<&Path>) -> anyhow::Result<()> {
    let Some(path) = path else {
        tracing::warn!("No config file location, settings change not saved");
        return Ok(());
    };

    let mut file_config = config::load_from(path);
    file_config.settings = curator.config_snapshot().settings;
    config::save_to(&file_config, path)?;
    Ok(())
}

/// Cycle the orientation preference
pub fn cmd_toggle_orientation(curator: &Curator, config_path: Option<&Path>) -> anyhow::Result<()> {
    let preference = curator.toggle_orientation_preference();
    let label = match preference {
        OrientationPreference::Off => "off",
        OrientationPreference::Ascending => "ascending",
        OrientationPreference::Descending => "descending",
    };
    println!("Orientation preference: {label}");
    persist_settings(curator, config_path)
}

/// Flip a named setting
pub fn cmd_toggle(curator: &Curator, name: &str, config_path: Option<&Path>) -> anyhow::Result<()> {
    let value = curator.toggle_setting(name);
    println!("{name} = {value}");
    persist_settings(curator, config_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pic_curator::config::Config;

    #[tokio::test]
    async fn test_toggle_persists_only_settings() {
        let temp = tempfile::tempdir().unwrap();
        let config_path = temp.path().join("config.toml");

        let mut on_disk = Config::default();
        on_disk.curation.neighbors = 4;
        config::save_to(&on_disk, &config_path).unwrap();

        let mut runtime_config = config::load_from(&config_path);
        runtime_config.library.root = temp.path().join("pics");
        let curator = Curator::open(runtime_config).await.unwrap();

        cmd_toggle(&curator, "blur", Some(&config_path)).unwrap();
        cmd_toggle_orientation(&curator, Some(&config_path)).unwrap();

        let saved = config::load_from(&config_path);
        assert_eq!(saved.settings.toggles.get("blur"), Some(&true));
        assert_eq!(saved.settings.same_orientation, 1);
        assert_eq!(saved.curation.neighbors, 4);
        assert_eq!(saved.library.root, std::path::PathBuf::from("."));
    }
}
