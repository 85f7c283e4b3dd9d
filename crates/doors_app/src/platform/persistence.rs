use std::fs;
use std::path::{Path, PathBuf};

use doors_core::ScrapeConfig;
use doors_engine::{ensure_output_dir, AtomicFileWriter};
use doors_logging::{doors_error, doors_info, doors_warn};

/// Loads the configuration file.
///
/// A missing file is created with the defaults. A file that cannot be read or
/// parsed is left alone and the defaults are used.
pub(crate) fn load_config(path: &Path) -> ScrapeConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            let config = ScrapeConfig::default();
            save_config(path, &config);
            return config;
        }
        Err(err) => {
            doors_warn!("Failed to read configuration from {:?}: {}", path, err);
            return ScrapeConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            doors_info!("Loaded configuration from {:?}", path);
            config
        }
        Err(err) => {
            doors_warn!("Failed to parse configuration from {:?}: {}", path, err);
            ScrapeConfig::default()
        }
    }
}

pub(crate) fn save_config(path: &Path, config: &ScrapeConfig) {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        doors_error!("Configuration path {:?} has no file name", path);
        return;
    };
    if let Err(err) = ensure_output_dir(&dir) {
        doors_error!("Failed to ensure config dir {:?}: {}", dir, err);
        return;
    }

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(config, pretty) {
        Ok(text) => text,
        Err(err) => {
            doors_error!("Failed to serialize configuration: {}", err);
            return;
        }
    };

    let writer = AtomicFileWriter::new(dir);
    match writer.write(filename, content.as_bytes()) {
        Ok(written) => doors_info!("Wrote default configuration to {:?}", written),
        Err(err) => doors_error!("Failed to write configuration to {:?}: {}", path, err),
    }
}

#[cfg(test)]
mod tests {
    use doors_core::UnmatchedSecondaryPolicy;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("conf").join("doors.ron");

        let config = load_config(&path);

        assert_eq!(config, ScrapeConfig::default());
        let written: ScrapeConfig = ron::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doors.ron");
        fs::write(
            &path,
            "(headless: true, account_length_threshold: 9, unmatched_secondary_policy: Report)",
        )
        .unwrap();

        let config = load_config(&path);

        assert!(config.headless);
        assert_eq!(config.account_length_threshold, 9);
        assert_eq!(config.unmatched_secondary_policy, UnmatchedSecondaryPolicy::Report);
        assert_eq!(config.retry_attempts, ScrapeConfig::default().retry_attempts);
    }

    #[test]
    fn broken_file_falls_back_and_is_left_alone() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("doors.ron");
        fs::write(&path, "(headless: maybe").unwrap();

        let config = load_config(&path);

        assert_eq!(config, ScrapeConfig::default());
        assert_eq!(fs::read_to_string(&path).unwrap(), "(headless: maybe");
    }
}
