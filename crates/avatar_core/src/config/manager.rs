//! Config manager for loading, saving, and atomic updates.
//!
//! - Atomic writes (write to temp file, then rename)
//! - Section-level updates via `toml_edit` (other sections and their
//!   comments are left untouched)
//! - Single-key edits addressed as `section.key`
//! - Missing keys are filled with defaults on load

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use toml_edit::{DocumentMut, Item};

use super::settings::{ConfigSection, Settings};

/// Errors that can occur during config operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),

    #[error("Failed to parse config for editing: {0}")]
    EditParseError(#[from] toml_edit::TomlError),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Unknown config key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Result type for config operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Manages application configuration.
pub struct ConfigManager {
    config_path: PathBuf,
    settings: Settings,
}

impl ConfigManager {
    /// Create a new config manager for the given file.
    ///
    /// Does not load the config - call `load()` or `load_or_create()` after.
    pub fn new(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
            settings: Settings::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Load config from file. Errors if the file doesn't exist.
    pub fn load(&mut self) -> ConfigResult<()> {
        if !self.config_path.exists() {
            return Err(ConfigError::NotFound(self.config_path.clone()));
        }

        let content = fs::read_to_string(&self.config_path)?;
        self.settings = toml::from_str(&content)?;
        Ok(())
    }

    /// Load config from file, creating it with defaults if missing.
    ///
    /// An existing file with unknown tables or missing keys is rewritten.
    pub fn load_or_create(&mut self) -> ConfigResult<()> {
        if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)?;
            let (settings, was_modified) = self.parse_and_check(&content)?;
            self.settings = settings;

            if was_modified {
                tracing::info!("Normalizing config file {}", self.config_path.display());
                self.save()?;
            }
        } else {
            self.settings = Settings::default();
            self.save()?;
        }
        Ok(())
    }

    /// Create output, temp and logs directories.
    pub fn ensure_dirs_exist(&self) -> ConfigResult<()> {
        let paths = &self.settings.paths;
        for dir in [&paths.output_folder, &paths.temp_root, &paths.logs_folder] {
            fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Parse content and report whether it differs from its normalized form.
    fn parse_and_check(&self, content: &str) -> ConfigResult<(Settings, bool)> {
        let doc: DocumentMut = content.parse()?;
        let settings: Settings = toml::from_str(content)?;

        let has_unknown = doc
            .iter()
            .any(|(key, _)| !ConfigSection::ALL.iter().any(|s| s.table_name() == key));

        let has_missing = ConfigSection::ALL.iter().any(|section| {
            let Ok(expected) = self.section_toml_for(&settings, *section) else {
                return false;
            };
            let Ok(expected_doc) = expected.parse::<DocumentMut>() else {
                return false;
            };
            match doc.get(section.table_name()).and_then(|item| item.as_table()) {
                Some(table) => expected_doc
                    .iter()
                    .any(|(key, _)| !table.contains_key(key)),
                None => true,
            }
        });

        Ok((settings, has_unknown || has_missing))
    }

    /// Save the entire config atomically.
    pub fn save(&self) -> ConfigResult<()> {
        let content = self.generate_config_with_comments()?;
        self.atomic_write(&content)?;
        Ok(())
    }

    /// Update a specific section atomically.
    ///
    /// Re-reads the file from disk and replaces only the given table.
    pub fn update_section(&mut self, section: ConfigSection) -> ConfigResult<()> {
        let current_content = if self.config_path.exists() {
            fs::read_to_string(&self.config_path)?
        } else {
            String::new()
        };

        let mut doc: DocumentMut = if current_content.is_empty() {
            DocumentMut::new()
        } else {
            current_content.parse()?
        };

        let section_toml = self.section_toml_for(&self.settings, section)?;
        let section_doc: DocumentMut = section_toml.parse()?;
        doc[section.table_name()] = Item::Table(section_doc.as_table().clone());

        self.atomic_write(&doc.to_string())?;
        Ok(())
    }

    /// Set one key, addressed as `section.key`, and write its section back.
    ///
    /// Text keys take `raw` verbatim; other keys parse it as a TOML value
    /// (`5`, `1.5`, `true`). The whole settings struct is re-validated
    /// before anything is written.
    pub fn set_value(&mut self, key: &str, raw: &str) -> ConfigResult<ConfigSection> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let (table, field) = key.split_once('.').ok_or_else(unknown)?;
        let section = ConfigSection::from_name(table).ok_or_else(unknown)?;

        let mut value = toml::Value::try_from(&self.settings)?;
        let slot = value
            .get_mut(table)
            .and_then(|t| t.get_mut(field))
            .ok_or_else(unknown)?;
        let replacement = match slot {
            toml::Value::String(_) => toml::Value::String(raw.to_string()),
            toml::Value::Float(_) => match parse_scalar(raw) {
                Some(toml::Value::Integer(i)) => toml::Value::Float(i as f64),
                Some(v) => v,
                None => return Err(invalid(key, "not a number")),
            },
            _ => parse_scalar(raw).ok_or_else(|| invalid(key, "not a TOML value"))?,
        };
        *slot = replacement;

        self.settings = value
            .try_into()
            .map_err(|e: toml::de::Error| invalid(key, e.message()))?;
        self.update_section(section)?;
        tracing::info!("Set {} = {} in {}", key, raw, self.config_path.display());
        Ok(section)
    }

    fn section_toml_for(&self, settings: &Settings, section: ConfigSection) -> ConfigResult<String> {
        let content = match section {
            ConfigSection::Paths => toml::to_string_pretty(&settings.paths)?,
            ConfigSection::Logging => toml::to_string_pretty(&settings.logging)?,
            ConfigSection::Tts => toml::to_string_pretty(&settings.tts)?,
            ConfigSection::Video => toml::to_string_pretty(&settings.video)?,
            ConfigSection::LipSync => toml::to_string_pretty(&settings.lipsync)?,
        };
        Ok(content)
    }

    fn generate_config_with_comments(&self) -> ConfigResult<String> {
        let mut output = String::new();

        output.push_str("# Talking Avatar Configuration\n");
        output.push_str(
            "# This file is auto-generated. Comments may be preserved on section updates.\n",
        );

        for section in ConfigSection::ALL {
            output.push('\n');
            output.push_str(&format!("# {}\n", section.comment()));
            output.push_str(&format!("[{}]\n", section.table_name()));
            for line in self.section_toml_for(&self.settings, section)?.lines() {
                output.push_str(line);
                output.push('\n');
            }
        }

        Ok(output)
    }

    /// Write to a sibling temp file, then rename over the config.
    fn atomic_write(&self, content: &str) -> io::Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let temp_path = self.config_path.with_extension("toml.tmp");

        {
            let mut file = fs::File::create(&temp_path)?;
            file.write_all(content.as_bytes())?;
            file.sync_all()?;
        }

        fs::rename(&temp_path, &self.config_path)?;
        Ok(())
    }
}

fn parse_scalar(raw: &str) -> Option<toml::Value> {
    let table: toml::Table = format!("v = {}", raw.trim()).parse().ok()?;
    table.get("v").cloned()
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LipSyncQuality;
    use tempfile::tempdir;

    #[test]
    fn load_or_create_creates_default() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(".config").join("avatar.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[paths]"));
        assert!(content.contains("[lipsync]"));
        assert!(content.contains("# Easy-Wav2Lip engine and retry policy"));

        // The generated file must load back cleanly
        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().lipsync.max_attempts, 3);
    }

    #[test]
    fn load_or_create_preserves_existing_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("avatar.toml");
        fs::write(&config_path, "[lipsync]\nquality = \"improved\"\n").unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert_eq!(manager.settings().lipsync.quality, LipSyncQuality::Improved);
        // Missing sections were filled in on disk
        let content = fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[tts]"));
        assert!(content.contains("quality = \"improved\""));
    }

    #[test]
    fn set_value_only_changes_target_section() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("avatar.toml");
        fs::write(
            &config_path,
            "[tts]\n# tuned for this machine\nspeed = 0.9\n",
        )
        .unwrap();

        let mut manager = ConfigManager::new(&config_path);
        manager.load().unwrap();
        let section = manager.set_value("lipsync.max_attempts", "5").unwrap();
        assert_eq!(section, ConfigSection::LipSync);
        manager.set_value("lipsync.quality", "fast").unwrap();

        let content = fs::read_to_string(&config_path).unwrap();
        // Untouched tables keep their text, comments included
        assert!(content.contains("# tuned for this machine\nspeed = 0.9"));

        let mut reloaded = ConfigManager::new(&config_path);
        reloaded.load().unwrap();
        assert_eq!(reloaded.settings().lipsync.max_attempts, 5);
        assert_eq!(reloaded.settings().lipsync.quality, LipSyncQuality::Fast);
        assert_eq!(reloaded.settings().tts.speed, 0.9);
    }

    #[test]
    fn set_value_coerces_scalars() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("avatar.toml"));
        manager.load_or_create().unwrap();

        manager.set_value("tts.speed", "2").unwrap();
        manager.set_value("video.truncate_first_pass", "true").unwrap();
        manager.set_value("paths.output_folder", "renders/final").unwrap();

        let settings = manager.settings();
        assert_eq!(settings.tts.speed, 2.0);
        assert!(settings.video.truncate_first_pass);
        assert_eq!(settings.paths.output_folder, "renders/final");
    }

    #[test]
    fn set_value_rejects_unknown_keys_and_bad_values() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("avatar.toml");
        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();
        let before = fs::read_to_string(&config_path).unwrap();

        assert!(matches!(
            manager.set_value("lipsync.bogus", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            manager.set_value("nosection", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            manager.set_value("lipsync.max_attempts", "many"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            manager.set_value("lipsync.max_attempts", "-1"),
            Err(ConfigError::InvalidValue { .. })
        ));

        assert_eq!(manager.settings().lipsync.max_attempts, 3);
        assert_eq!(fs::read_to_string(&config_path).unwrap(), before);
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let mut manager = ConfigManager::new(dir.path().join("absent.toml"));
        assert!(matches!(manager.load(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("avatar.toml");

        let mut manager = ConfigManager::new(&config_path);
        manager.load_or_create().unwrap();

        assert!(!config_path.with_extension("toml.tmp").exists());
    }
}
