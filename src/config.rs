use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::time::parse_reference_time;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub leases_file: PathBuf,
    /// RFC 3339 time with offset to evaluate leases at; wall clock if unset.
    pub reference_time: Option<String>,
    pub poll_interval_seconds: u64,
    /// Read the lease file as gzip even without a `.gz` extension.
    pub gzip: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            leases_file: PathBuf::from("/var/lib/dhcp/dhcpd.leases"),
            reference_time: None,
            poll_interval_seconds: 30,
            gzip: false,
        }
    }
}

impl Config {
    /// Loads the configuration file, or the defaults if it does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(Error::InvalidConfig(
                "poll_interval_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(reference_time) = &self.reference_time {
            parse_reference_time(reference_time)?;
        }

        Ok(())
    }

    /// The time to evaluate lease validity at.
    ///
    /// This is the only place the system clock is read.
    pub fn now(&self) -> Result<DateTime<Utc>> {
        match &self.reference_time {
            Some(reference_time) => parse_reference_time(reference_time),
            None => Ok(Utc::now()),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Whether the lease file is gzip-compressed.
    pub fn is_gzip(&self) -> bool {
        self.gzip
            || self
                .leases_file
                .extension()
                .is_some_and(|extension| extension == "gz")
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    struct TestGuard(String);
    impl Drop for TestGuard {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_zero_poll_interval() {
        let config = Config {
            poll_interval_seconds: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_naive_reference_time() {
        let config = Config {
            reference_time: Some("2015-07-06T08:15:00".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::NaiveReferenceTime(_))
        ));
        assert!(config.now().is_err());
    }

    #[test]
    fn test_reference_time() {
        let config = Config {
            reference_time: Some("2015-07-06T08:15:00Z".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
        assert_eq!(
            config.now().unwrap(),
            Utc.with_ymd_and_hms(2015, 7, 6, 8, 15, 0).unwrap()
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = Config::load("test_config_missing.json").unwrap();
        assert_eq!(config.leases_file, PathBuf::from("/var/lib/dhcp/dhcpd.leases"));
        assert!(config.reference_time.is_none());
    }

    #[test]
    fn test_save_and_load() {
        let path = "test_config_roundtrip.json";
        let _guard = TestGuard(path.to_string());

        let config = Config {
            leases_file: PathBuf::from("dhcpd6.leases"),
            reference_time: Some("2015-08-18T16:55:37Z".to_string()),
            poll_interval_seconds: 5,
            gzip: true,
        };
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.leases_file, PathBuf::from("dhcpd6.leases"));
        assert_eq!(loaded.poll_interval_seconds, 5);
        assert_eq!(loaded.reference_time, config.reference_time);
        assert!(loaded.gzip);
    }

    #[test]
    fn test_gzip_detected_from_extension() {
        let config = Config {
            leases_file: PathBuf::from("/var/lib/dhcp/dhcpd.leases.gz"),
            ..Default::default()
        };
        assert!(config.is_gzip());

        let config = Config::default();
        assert!(!config.is_gzip());

        let config = Config {
            gzip: true,
            ..Default::default()
        };
        assert!(config.is_gzip());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let path = "test_config_partial.json";
        let _guard = TestGuard(path.to_string());
        std::fs::write(path, r#"{ "leases_file": "other.leases" }"#).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.leases_file, PathBuf::from("other.leases"));
        assert_eq!(loaded.poll_interval_seconds, 30);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let path = "test_config_invalid.json";
        let _guard = TestGuard(path.to_string());
        std::fs::write(path, r#"{ "poll_interval_seconds": 0 }"#).unwrap();

        assert!(Config::load(path).is_err());
    }
}
