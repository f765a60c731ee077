use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::gsi_logic::engine::{EngineSettings, FlashTimings, HealthTiers, Palette};
use crate::gsi_logic::error::GsiError;
use crate::gsi_logic::model::Rgb;

pub const DEFAULT_CONFIG_FILE: &str = "server_gsi.conf";

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default)]
#[clap(about = "Game state integration to OpenRGB lighting bridge", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "GSI_PORT", help = "Port the game client posts state updates to.")]
    pub port: Option<u16>,

    #[clap(long, env = "GSI_BIND_ADDRESS", help = "Address to listen on.")]
    pub bind_address: Option<IpAddr>,

    #[clap(long, env = "GSI_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "GSI_SECRET", help = "Shared secret expected in auth.key1 of every payload.")]
    pub secret: Option<String>,

    #[clap(long, env = "GSI_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "GSI_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "GSI_LOG_KEEP_FILES", help = "Number of old log files to keep.")]
    pub log_keep_files: Option<usize>,

    #[clap(long, env = "OPENRGB_HOST", help = "Host of the OpenRGB SDK server.")]
    pub openrgb_host: Option<String>,

    #[clap(long, env = "OPENRGB_PORT", help = "Port of the OpenRGB SDK server.")]
    pub openrgb_port: Option<u16>,

    #[clap(long, env = "OPENRGB_CLIENT_NAME", help = "Client name announced to the OpenRGB server.")]
    pub openrgb_client_name: Option<String>,

    #[clap(long, env = "OPENRGB_TIMEOUT_MS", help = "Timeout in milliseconds for OpenRGB requests.")]
    pub openrgb_timeout_ms: Option<u64>,

    #[clap(long, env = "GSI_IDLE_COLOR", help = "Color shown after a flash ends (#rrggbb or r,g,b).")]
    pub idle_color: Option<Rgb>,

    #[clap(long, env = "GSI_STARTUP_COLOR", help = "Test color applied once at startup (#rrggbb or r,g,b).")]
    pub startup_color: Option<Rgb>,

    /// Palette, hold times and health tiers. Config file only.
    #[clap(skip)]
    pub lighting: Option<LightingConfig>,
}

/// Lighting section of the config file. Every field can be left out.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LightingConfig {
    #[serde(default)]
    pub palette: Option<Palette>,
    #[serde(default)]
    pub flash_seconds: Option<FlashSecondsConfig>,
    #[serde(default)]
    pub health_tiers: Option<HealthTiers>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FlashSecondsConfig {
    pub flashed: Option<f64>,
    pub burning: Option<f64>,
    pub smoked: Option<f64>,
    pub kill: Option<f64>,
    pub bomb_exploded: Option<f64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            bind_address: other.bind_address.or(self.bind_address),
            config_path: other.config_path.or(self.config_path),
            secret: other.secret.or(self.secret),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            log_keep_files: other.log_keep_files.or(self.log_keep_files),
            openrgb_host: other.openrgb_host.or(self.openrgb_host),
            openrgb_port: other.openrgb_port.or(self.openrgb_port),
            openrgb_client_name: other.openrgb_client_name.or(self.openrgb_client_name),
            openrgb_timeout_ms: other.openrgb_timeout_ms.or(self.openrgb_timeout_ms),
            idle_color: other.idle_color.or(self.idle_color),
            startup_color: other.startup_color.or(self.startup_color),
            lighting: other.lighting.or(self.lighting),
        }
    }

    pub fn defaults() -> Config {
        Config {
            port: Some(5000),
            bind_address: Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            log_keep_files: Some(7),
            openrgb_host: Some("127.0.0.1".to_string()),
            openrgb_port: Some(6742),
            openrgb_client_name: Some("server_gsi".to_string()),
            openrgb_timeout_ms: Some(2000),
            startup_color: Some(Rgb::new(255, 165, 0)),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenRgbSettings {
    pub host: String,
    pub port: u16,
    pub client_name: String,
    pub timeout: Duration,
}

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub listen: SocketAddr,
    pub secret: String,
    pub log_dir: PathBuf,
    pub log_level: String,
    pub log_keep_files: usize,
    pub openrgb: OpenRgbSettings,
    pub engine: EngineSettings,
    pub idle_color: Rgb,
    pub startup_color: Option<Rgb>,
}

fn hold(name: &str, seconds: Option<f64>, default: Duration) -> Result<Duration, GsiError> {
    let Some(seconds) = seconds else {
        return Ok(default);
    };
    match Duration::try_from_secs_f64(seconds) {
        Ok(d) if !d.is_zero() => Ok(d),
        _ => Err(GsiError::Config(format!(
            "flash duration '{}' must be a positive number of seconds, got {}",
            name, seconds
        ))),
    }
}

impl LightingConfig {
    fn engine_settings(&self) -> Result<EngineSettings, GsiError> {
        let palette = self.palette.clone().unwrap_or_default();
        let tiers = self.health_tiers.unwrap_or_default();
        if !(tiers.high >= tiers.mid && tiers.mid >= tiers.low) {
            return Err(GsiError::Config(format!(
                "health tiers must satisfy high >= mid >= low, got {}/{}/{}",
                tiers.high, tiers.mid, tiers.low
            )));
        }

        let secs = self.flash_seconds.clone().unwrap_or_default();
        let d = FlashTimings::default();
        let timings = FlashTimings {
            flashed: hold("flashed", secs.flashed, d.flashed)?,
            burning: hold("burning", secs.burning, d.burning)?,
            smoked: hold("smoked", secs.smoked, d.smoked)?,
            kill: hold("kill", secs.kill, d.kill)?,
            bomb_exploded: hold("bombExploded", secs.bomb_exploded, d.bomb_exploded)?,
        };

        Ok(EngineSettings { palette, timings, tiers })
    }
}

impl Settings {
    /// Turns a merged `Config` into concrete values.
    pub fn resolve(config: Config) -> Result<Settings, GsiError> {
        let defaults = Config::defaults();
        let config = defaults.merge(config);

        let secret = config
            .secret
            .filter(|s| !s.is_empty())
            .ok_or_else(|| GsiError::Config("a shared secret (GSI_SECRET / --secret / \"secret\") is required".to_string()))?;

        let engine = config.lighting.unwrap_or_default().engine_settings()?;
        let idle_color = config.idle_color.unwrap_or(engine.palette.idle);
        if let Some((name, _)) = engine
            .palette
            .cascade_colors()
            .into_iter()
            .find(|(_, color)| *color == idle_color)
        {
            return Err(GsiError::Config(format!(
                "idle color {} must differ from every cascade color, but equals '{}'",
                idle_color, name
            )));
        }

        // Fields below always have a default from Config::defaults().
        let missing = |field: &str| GsiError::Config(format!("missing value for {}", field));

        Ok(Settings {
            listen: SocketAddr::new(
                config.bind_address.ok_or_else(|| missing("bindAddress"))?,
                config.port.ok_or_else(|| missing("port"))?,
            ),
            secret,
            log_dir: config.log_dir.ok_or_else(|| missing("logDir"))?,
            log_level: config.log_level.ok_or_else(|| missing("logLevel"))?,
            log_keep_files: config.log_keep_files.ok_or_else(|| missing("logKeepFiles"))?,
            openrgb: OpenRgbSettings {
                host: config.openrgb_host.ok_or_else(|| missing("openrgbHost"))?,
                port: config.openrgb_port.ok_or_else(|| missing("openrgbPort"))?,
                client_name: config
                    .openrgb_client_name
                    .ok_or_else(|| missing("openrgbClientName"))?,
                timeout: Duration::from_millis(
                    config.openrgb_timeout_ms.ok_or_else(|| missing("openrgbTimeoutMs"))?,
                ),
            },
            engine,
            idle_color,
            startup_color: config.startup_color,
        })
    }
}

/// Reads the JSON config file. A missing file is not an error.
pub fn read_config_file(path: &Path) -> Result<Option<Config>, GsiError> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .map_err(|e| GsiError::Config(format!("failed to read {}: {}", path.display(), e)))?;
    let config = serde_json::from_str::<Config>(&text)
        .map_err(|e| GsiError::Config(format!("failed to parse {}: {}", path.display(), e)))?;
    Ok(Some(config))
}

/// Defaults < config file < environment / CLI.
pub fn layer_config(cli: Config) -> Result<Settings, GsiError> {
    let config_file_path = cli.config_path.clone().unwrap_or_else(|| {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("server_gsi").join(DEFAULT_CONFIG_FILE))
            .unwrap_or(local)
    });

    let merged = match read_config_file(&config_file_path)? {
        Some(file_config) => file_config.merge(cli),
        None => {
            if cli.config_path.is_some() {
                warn!("Config file not found at {}.", config_file_path.display());
            } else {
                info!(
                    "Config file not found at {}. Using defaults and environment/CLI variables.",
                    config_file_path.display()
                );
            }
            cli
        }
    };

    Settings::resolve(merged)
}

pub fn load_config() -> Result<Settings, GsiError> {
    layer_config(Config::parse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn with_secret() -> Config {
        Config {
            secret: Some("s3cret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::resolve(with_secret()).unwrap();
        assert_eq!(settings.listen, "0.0.0.0:5000".parse().unwrap());
        assert_eq!(settings.openrgb.port, 6742);
        assert_eq!(settings.idle_color, Rgb::new(255, 0, 255));
        assert_eq!(settings.startup_color, Some(Rgb::new(255, 165, 0)));
        assert_eq!(settings.engine, EngineSettings::default());
    }

    #[test]
    fn test_secret_is_required() {
        assert!(matches!(Settings::resolve(Config::default()), Err(GsiError::Config(_))));
        let empty = Config {
            secret: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(Settings::resolve(empty), Err(GsiError::Config(_))));
    }

    #[test]
    fn test_cli_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r##"{{
                "port": 3000,
                "secret": "from-file",
                "idleColor": [0, 0, 255],
                "lighting": {{
                    "palette": {{ "kill": [1, 2, 3] }},
                    "flashSeconds": {{ "kill": 0.25 }},
                    "healthTiers": {{ "high": 90 }}
                }}
            }}"##
        )
        .unwrap();

        let cli = Config {
            config_path: Some(file.path().to_path_buf()),
            port: Some(4000),
            ..Default::default()
        };
        let settings = layer_config(cli).unwrap();

        assert_eq!(settings.listen.port(), 4000);
        assert_eq!(settings.secret, "from-file");
        assert_eq!(settings.idle_color, Rgb::new(0, 0, 255));
        assert_eq!(settings.engine.palette.kill, Rgb::new(1, 2, 3));
        assert_eq!(settings.engine.palette.flashed, Rgb::new(255, 255, 255));
        assert_eq!(settings.engine.timings.kill, Duration::from_millis(250));
        assert_eq!(settings.engine.timings.flashed, Duration::from_millis(1500));
        assert_eq!(settings.engine.tiers, HealthTiers { high: 90, mid: 50, low: 20 });
    }

    #[test]
    fn test_invalid_flash_duration() {
        for bad in [0.0, -1.0, f64::NAN] {
            let config = Config {
                lighting: Some(LightingConfig {
                    flash_seconds: Some(FlashSecondsConfig {
                        burning: Some(bad),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..with_secret()
            };
            assert!(matches!(Settings::resolve(config), Err(GsiError::Config(_))), "{bad}");
        }
    }

    #[test]
    fn test_unordered_health_tiers() {
        let config = Config {
            lighting: Some(LightingConfig {
                health_tiers: Some(HealthTiers { high: 10, mid: 50, low: 20 }),
                ..Default::default()
            }),
            ..with_secret()
        };
        assert!(matches!(Settings::resolve(config), Err(GsiError::Config(_))));
    }

    #[test]
    fn test_idle_color_must_differ_from_cascade_colors() {
        let clash = Config {
            idle_color: Some(Rgb::new(0, 224, 245)),
            ..with_secret()
        };
        match Settings::resolve(clash) {
            Err(GsiError::Config(msg)) => assert!(msg.contains("bombPlanted"), "{msg}"),
            other => panic!("expected a config error, got {:?}", other),
        }

        let palette_clash = Config {
            lighting: Some(LightingConfig {
                palette: Some(Palette {
                    idle: Rgb::new(255, 0, 0),
                    ..Palette::default()
                }),
                ..Default::default()
            }),
            ..with_secret()
        };
        assert!(matches!(Settings::resolve(palette_clash), Err(GsiError::Config(_))));

        let distinct = Config {
            idle_color: Some(Rgb::new(1, 2, 3)),
            ..with_secret()
        };
        assert_eq!(Settings::resolve(distinct).unwrap().idle_color, Rgb::new(1, 2, 3));
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let cli = Config {
            config_path: Some(file.path().to_path_buf()),
            ..with_secret()
        };
        assert!(matches!(layer_config(cli), Err(GsiError::Config(_))));
    }

    #[test]
    fn test_cli_flags_parse() {
        let cli = Config::try_parse_from([
            "server_gsi",
            "--port",
            "5050",
            "--secret",
            "abc",
            "--idle-color",
            "#0000ff",
            "--startup-color",
            "255,165,0",
        ])
        .unwrap();
        assert_eq!(cli.port, Some(5050));
        assert_eq!(cli.idle_color, Some(Rgb::new(0, 0, 255)));
        assert_eq!(cli.startup_color, Some(Rgb::new(255, 165, 0)));
    }
}
