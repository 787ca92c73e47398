use crate::layout::LayoutParams;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DEFAULT_FPS: u32 = 60;
const SPRITE_ENV: &str = "BUBBLETALK_SPRITE";
const FONT_ENV: &str = "BUBBLETALK_FONT";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub overlay: OverlayConfig,
    #[serde(default)]
    pub layout: LayoutParams,
}

#[derive(Debug, Deserialize, Default)]
pub struct AssetsConfig {
    pub sprite: Option<PathBuf>,
    pub font: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct OverlayConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS }
    }
}

fn default_fps() -> u32 {
    DEFAULT_FPS
}

/// Values given on the command line; each wins over env and file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub sprite: Option<PathBuf>,
    pub font: Option<PathBuf>,
    pub fps: Option<u32>,
}

/// Fully resolved startup settings.
#[derive(Debug)]
pub struct Settings {
    pub sprite: PathBuf,
    pub font: Option<PathBuf>,
    pub fps: u32,
    pub layout: LayoutParams,
}

impl Config {
    /// Resolve with priority: CLI arg > env var > config file > default.
    pub fn resolve(cli: Overrides) -> Settings {
        let path = cli.config.clone().or_else(Self::config_path);
        let config = path.as_deref().map(Self::load_from).unwrap_or_default();
        config.merge(cli, |key| std::env::var_os(key).map(PathBuf::from))
    }

    fn merge(self, cli: Overrides, env: impl Fn(&str) -> Option<PathBuf>) -> Settings {
        let sprite = cli
            .sprite
            .or_else(|| env(SPRITE_ENV))
            .or(self.assets.sprite)
            .or_else(|| Self::config_dir().map(|d| d.join("sprite.png")))
            .unwrap_or_else(|| PathBuf::from("sprite.png"));
        let font = cli.font.or_else(|| env(FONT_ENV)).or(self.assets.font);
        let fps = cli.fps.unwrap_or(self.overlay.fps).max(1);

        Settings { sprite, font, fps, layout: self.layout }
    }

    fn config_dir() -> Option<PathBuf> {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
            .ok()
            .map(|c| c.join("bubbletalk"))
    }

    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "no config file found, using defaults");
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => {
                    debug!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to parse config");
                    Self::default()
                }
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read config");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<PathBuf> {
        None
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [assets]
            sprite = "/tmp/pet.png"

            [layout]
            font_size = 18
            bubble_gap = 10.5
            "#,
        )
        .unwrap();
        assert_eq!(config.assets.sprite.as_deref(), Some(Path::new("/tmp/pet.png")));
        assert_eq!(config.overlay.fps, 60);
        assert_eq!(config.layout.font_size, 18.0);
        assert_eq!(config.layout.bubble_gap, 10.5);
        assert_eq!(config.layout.max_line_width, 350.0);
        assert_eq!(config.layout.min_window_size, 300);
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let file = || Config {
            assets: AssetsConfig {
                sprite: Some("file.png".into()),
                font: Some("file.ttf".into()),
            },
            overlay: OverlayConfig { fps: 30 },
            layout: LayoutParams::default(),
        };
        let env = |key: &str| (key == SPRITE_ENV).then(|| PathBuf::from("env.png"));

        let s = file().merge(Overrides::default(), no_env);
        assert_eq!(s.sprite, PathBuf::from("file.png"));
        assert_eq!(s.font, Some(PathBuf::from("file.ttf")));
        assert_eq!(s.fps, 30);

        let s = file().merge(Overrides::default(), env);
        assert_eq!(s.sprite, PathBuf::from("env.png"));

        let cli = Overrides {
            sprite: Some("cli.png".into()),
            fps: Some(0),
            ..Overrides::default()
        };
        let s = file().merge(cli, env);
        assert_eq!(s.sprite, PathBuf::from("cli.png"));
        assert_eq!(s.fps, 1);
    }

    #[test]
    fn loads_file_and_falls_back_on_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.toml");
        std::fs::write(&good, "[overlay]\nfps = 24\n").unwrap();
        assert_eq!(Config::load_from(&good).overlay.fps, 24);

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[overlay\nfps = ").unwrap();
        assert_eq!(Config::load_from(&bad).overlay.fps, 60);

        let missing = dir.path().join("missing.toml");
        assert!(Config::load_from(&missing).assets.sprite.is_none());
    }
}
