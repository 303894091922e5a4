use std::path::PathBuf;

pub const DEFAULT_DOWNLOAD_URL: &str = "https://www.michael-plugge.de/blz.lut";
pub const LUT_FILENAME: &str = "blz.lut";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub lut_path:        PathBuf,
    pub download_url:    String,
    /// Fetch the table when `lut_path` does not exist.
    pub auto_download:   bool,
    pub strict_checksum: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            lut_path:        default_lut_path(),
            download_url:    DEFAULT_DOWNLOAD_URL.to_string(),
            auto_download:   true,
            strict_checksum: false,
        }
    }
}

impl LoaderConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            lut_path: std::env::var("BLZ_LUT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.lut_path),
            download_url: std::env::var("BLZ_LUT_URL")
                .unwrap_or(defaults.download_url),
            auto_download: std::env::var("BLZ_LUT_AUTO_DOWNLOAD")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.auto_download),
            strict_checksum: std::env::var("BLZ_LUT_STRICT_CHECKSUM")
                .ok()
                .and_then(|s| parse_bool(&s))
                .unwrap_or(defaults.strict_checksum),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.lut_path.as_os_str().is_empty() {
            return Err("BLZ_LUT_PATH cannot be empty".to_string());
        }
        if self.auto_download
            && !self.download_url.starts_with("http://")
            && !self.download_url.starts_with("https://")
        {
            return Err("BLZ_LUT_URL must start with http:// or https://".to_string());
        }
        Ok(())
    }
}

/// `~/.stps/blz.lut`, falling back to `USERPROFILE` and then the working directory.
fn default_lut_path() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".stps").join(LUT_FILENAME))
        .unwrap_or_else(|| PathBuf::from(LUT_FILENAME))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on"  => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _                            => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let cfg = LoaderConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(cfg.lut_path.ends_with(LUT_FILENAME));
        assert!(!cfg.strict_checksum);
    }

    #[test]
    fn rejects_bad_url_only_when_downloading() {
        let mut cfg = LoaderConfig { download_url: "ftp://x".into(), ..LoaderConfig::default() };
        assert!(cfg.validate().is_err());
        cfg.auto_download = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn bool_parsing() {
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
