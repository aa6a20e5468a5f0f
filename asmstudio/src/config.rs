use crate::error::StudioError;
use ihexlib::RecordSize;
use std::path::PathBuf;
use std::time::Duration;

/// Reserved include name of the base definitions file.
pub const DEFINITIONS_NAME: &str = "Megaprocessor_defs.asm";

/// Name given to the empty document that keeps the session non-empty.
pub const PLACEHOLDER_NAME: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudioConfig {
    /// Data bytes per record of the canonical HEX output
    pub record_size: RecordSize,
    /// Quiet time after the last edit before a highlight pass runs
    pub highlight_delay: Duration,
    /// Include name the base definitions are registered under
    pub definitions_name: String,
    /// Where to read the base definitions from, if anywhere
    pub definitions_path: Option<PathBuf>,
    /// Target directory of exported `.hex`/`.lst` files
    pub export_dir: PathBuf,
    pub placeholder_name: String,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            record_size: RecordSize::DEFAULT,
            highlight_delay: Duration::from_millis(300),
            definitions_name: DEFINITIONS_NAME.to_string(),
            definitions_path: None,
            export_dir: default_export_dir(),
            placeholder_name: PLACEHOLDER_NAME.to_string(),
        }
    }
}

impl StudioConfig {
    /// Override the canonical record width.
    ///
    /// # Errors
    /// Returns an error if `size` is 0.
    pub fn with_record_size(mut self, size: u8) -> Result<Self, StudioError> {
        self.record_size = RecordSize::new(size)?;
        Ok(self)
    }
}

/// `$HOME/Downloads/asmstudio`, or `./downloads` when no home directory is known.
#[must_use]
pub fn default_export_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|home| !home.is_empty())
        .map_or_else(
            || PathBuf::from("downloads"),
            |home| PathBuf::from(home).join("Downloads").join("asmstudio"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StudioConfig::default();

        assert_eq!(config.record_size.get(), 16);
        assert_eq!(config.highlight_delay, Duration::from_millis(300));
        assert_eq!(config.definitions_name, "Megaprocessor_defs.asm");
        assert_eq!(config.definitions_path, None);
        assert_eq!(config.placeholder_name, "Untitled");
    }

    #[test]
    fn test_record_size_override() {
        // Act
        let config = StudioConfig::default().with_record_size(32);
        let invalid = StudioConfig::default().with_record_size(0);

        // Assert
        assert_eq!(config.map(|c| c.record_size.get()), Ok(32));
        assert!(matches!(invalid, Err(StudioError::MalformedRecord(_))));
    }
}
