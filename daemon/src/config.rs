use std::time::Duration;

use filterpanel::display::{PanelSize, Rotation};
use filterpanel::probe::StateProbe;
use serde::Deserialize;

use crate::error::DaemonError;

const MAX_PANEL_SIDE: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub debug_mode: bool,
    pub poll_interval_secs: u64,
    pub title_prefix: String,
    pub probe: ProbeConfig,
    pub display: DisplayConfig,
    pub buttons: ButtonsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            debug_mode: false,
            poll_interval_secs: 5,
            title_prefix: "YouTube".to_string(),
            probe: ProbeConfig::default(),
            display: DisplayConfig::default(),
            buttons: ButtonsConfig::default(),
        }
    }
}

impl Config {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    fn validate(self) -> Result<Self, DaemonError> {
        if self.poll_interval_secs == 0 {
            return Err(DaemonError::InvalidConfig(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.probe.timeout_secs == 0 {
            return Err(DaemonError::InvalidConfig(
                "probe.timeout_secs must be at least 1".to_string(),
            ));
        }
        if self.probe.program.trim().is_empty() {
            return Err(DaemonError::InvalidConfig(
                "probe.program must not be empty".to_string(),
            ));
        }
        if self.probe.enabled_marker == self.probe.disabled_marker {
            return Err(DaemonError::InvalidConfig(
                "probe.enabled_marker and probe.disabled_marker must differ".to_string(),
            ));
        }
        let side = 1..=MAX_PANEL_SIDE;
        if !side.contains(&self.display.width) || !side.contains(&self.display.height) {
            return Err(DaemonError::InvalidConfig(format!(
                "display.width and display.height must be between 1 and {MAX_PANEL_SIDE}"
            )));
        }
        self.display.rotation()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub program: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub enabled_marker: String,
    pub disabled_marker: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        ProbeConfig {
            program: "sudo".to_string(),
            args: vec![
                "/usr/bin/sqlite3".to_string(),
                "/etc/pihole/gravity.db".to_string(),
                "SELECT enabled FROM 'group' WHERE name='KidsRestricted';".to_string(),
            ],
            timeout_secs: 5,
            enabled_marker: filterpanel::probe::DEFAULT_ENABLED_MARKER.to_string(),
            disabled_marker: filterpanel::probe::DEFAULT_DISABLED_MARKER.to_string(),
        }
    }
}

impl ProbeConfig {
    pub fn build(&self) -> StateProbe {
        StateProbe::new(&self.program, self.args.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_markers(&self.enabled_marker, &self.disabled_marker)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayBackend {
    Framebuffer,
    Headless,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub backend: DisplayBackend,
    pub device: String,
    /// Native panel size, before rotation.
    pub width: u32,
    pub height: u32,
    pub rotation: u16,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            backend: DisplayBackend::Framebuffer,
            device: "/dev/fb1".to_string(),
            width: 135,
            height: 240,
            rotation: 270,
        }
    }
}

impl DisplayConfig {
    pub fn native_dimensions(&self) -> PanelSize {
        PanelSize::new(self.width, self.height)
    }

    pub fn rotation(&self) -> Result<Rotation, DaemonError> {
        Ok(Rotation::try_from(self.rotation)?)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ButtonsConfig {
    pub debounce_ms: u64,
    pub command_timeout_secs: u64,
    pub block: ButtonConfig,
    pub allow: ButtonConfig,
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        // gpio-key overlay nodes are named after the GPIO number in hex:
        // GPIO23 -> button@17, GPIO24 -> button@18
        ButtonsConfig {
            debounce_ms: 300,
            command_timeout_secs: 30,
            block: ButtonConfig {
                device: Some("/dev/input/by-path/platform-button@17-event".to_string()),
                key_code: None,
                command: "/usr/local/bin/yb".to_string(),
            },
            allow: ButtonConfig {
                device: Some("/dev/input/by-path/platform-button@18-event".to_string()),
                key_code: None,
                command: "/usr/local/bin/yu".to_string(),
            },
        }
    }
}

impl ButtonsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ButtonConfig {
    /// evdev device the button reports on; `None` leaves the button unused.
    #[serde(default)]
    pub device: Option<String>,
    /// Only presses of this key code count. Needed when both buttons share
    /// one input device.
    #[serde(default)]
    pub key_code: Option<u16>,
    pub command: String,
}

/// Load the config file at `path`, or the defaults when no path is given.
pub async fn parse_config(path: Option<&str>) -> Result<Config, DaemonError> {
    let config = match path {
        Some(path) => {
            let contents = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DaemonError::ConfigFileReadError(path.to_string(), e))?;
            toml::from_str(&contents).map_err(DaemonError::ConfigFileParsingError)?
        }
        None => Config::default(),
    };
    config.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn parse_str(contents: &str) -> Result<Config, DaemonError> {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        parse_config(Some(path.to_str().unwrap())).await
    }

    #[tokio::test]
    async fn test_no_path_uses_defaults() {
        let config = parse_config(None).await.unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.buttons.debounce(), Duration::from_millis(300));
        assert_eq!(config.display.rotation().unwrap(), Rotation::Deg270);
    }

    #[tokio::test]
    async fn test_empty_file_uses_defaults() {
        assert_eq!(parse_str("").await.unwrap(), Config::default());
    }

    #[tokio::test]
    async fn test_partial_sections_keep_other_defaults() {
        let config = parse_str(
            r#"
poll_interval_secs = 10
title_prefix = ""

[display]
backend = "headless"
rotation = 90

[buttons.allow]
device = "/dev/input/event3"
key_code = 257
command = "/opt/allow"
"#,
        )
        .await
        .unwrap();

        assert_eq!(config.poll_interval_secs, 10);
        assert_eq!(config.title_prefix, "");
        assert_eq!(config.display.backend, DisplayBackend::Headless);
        assert_eq!(config.display.device, "/dev/fb1");
        assert_eq!(config.display.rotation().unwrap(), Rotation::Deg90);
        assert_eq!(config.buttons.allow.key_code, Some(257));
        assert_eq!(config.buttons.allow.command, "/opt/allow");
        assert_eq!(config.buttons.block, ButtonsConfig::default().block);
        assert_eq!(config.probe, ProbeConfig::default());
    }

    #[tokio::test]
    async fn test_button_without_device_is_disabled() {
        let config = parse_str(
            r#"
[buttons.block]
command = "/opt/block"
"#,
        )
        .await
        .unwrap();
        assert_eq!(config.buttons.block.device, None);
    }

    #[tokio::test]
    async fn test_invalid_rotation_rejected() {
        let err = parse_str("[display]\nrotation = 45\n").await.unwrap_err();
        assert!(matches!(err, DaemonError::DisplayError(_)));
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let err = parse_str("poll_interval_secs = 0\n").await.unwrap_err();
        assert!(matches!(err, DaemonError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_panel_size_bounds() {
        for contents in [
            "[display]\nwidth = 0\n",
            "[display]\nheight = 4097\n",
            "[display]\nwidth = 4294967295\nheight = 4294967295\n",
        ] {
            let err = parse_str(contents).await.unwrap_err();
            assert!(matches!(err, DaemonError::InvalidConfig(_)), "{contents:?}");
        }
        let config = parse_str("[display]\nwidth = 4096\nheight = 4096\n").await.unwrap();
        assert_eq!(config.display.native_dimensions(), PanelSize::new(4096, 4096));
    }

    #[tokio::test]
    async fn test_equal_markers_rejected() {
        let err = parse_str("[probe]\nenabled_marker = \"x\"\ndisabled_marker = \"x\"\n")
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_bad_toml_rejected() {
        let err = parse_str("poll_interval_secs = \"soon\"\n").await.unwrap_err();
        assert!(matches!(err, DaemonError::ConfigFileParsingError(_)));
    }

    #[tokio::test]
    async fn test_missing_file_rejected() {
        let err = parse_config(Some("/nonexistent/filterpanel.toml"))
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::ConfigFileReadError(..)));
    }

    #[tokio::test]
    async fn test_probe_config_builds_probe() {
        let config = ProbeConfig {
            timeout_secs: 2,
            ..ProbeConfig::default()
        };
        assert_eq!(config.build().timeout(), Duration::from_secs(2));
    }
}
