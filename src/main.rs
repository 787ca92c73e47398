mod bubble;
mod config;
mod font;
mod input;
mod layout;
mod overlay;
mod presenter;
mod render;
mod sprite;
mod text;

use anyhow::{Context, Result};
use clap::Parser;
use config::{Config, Overrides};
use overlay::OverlayAssets;
use std::io::BufReader;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "bubbletalk",
    about = "Desktop sprite that speaks lines from stdin in a speech bubble"
)]
struct Args {
    /// PNG image for the sprite
    #[arg(short, long)]
    sprite: Option<PathBuf>,

    /// TTF/OTF font for the bubble text (default: system sans-serif)
    #[arg(short, long)]
    font: Option<PathBuf>,

    /// Frame rate; a message stays up for one second per character
    #[arg(long)]
    fps: Option<u32>,

    /// Config file (default: $XDG_CONFIG_HOME/bubbletalk/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let settings = Config::resolve(Overrides {
        config: args.config,
        sprite: args.sprite,
        font: args.font,
        fps: args.fps,
    });

    // Without a sprite and a font there is nothing to show.
    let sprite = sprite::Sprite::load(&settings.sprite)?;
    let text = font::TextRenderer::new(
        settings.font.as_deref(),
        settings.layout.font_size,
        settings.layout.line_spacing,
    )
    .context("failed to load font")?;

    let (tx, rx) = mpsc::channel(1);
    let overlay = overlay::spawn_overlay(
        OverlayAssets {
            sprite,
            text,
            layout: settings.layout,
            fps: settings.fps,
        },
        rx,
    )?;

    info!(fps = settings.fps, "bubbletalk ready - reading messages from stdin");

    input::spawn_reader(BufReader::new(std::io::stdin()), tx)?;

    tokio::task::spawn_blocking(move || overlay.join())
        .await
        .context("overlay join task failed")?
}
