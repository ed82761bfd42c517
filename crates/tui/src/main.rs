mod renderer;
mod stage;

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use folio_core::content::{ContentItem, parse_content, sample_projects};
use folio_core::{Environment, ManualHost, MotionConfig, Page, presets};
use folio_protocol::{InputEvent, Viewport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str =
    "Usage: folio-preview [--mobile | --narrow] [--config tuning.json] [--replay FRAMES] [content.json]";

const DESKTOP_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";
const TABLET_UA: &str = "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
const PHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) Mobile/15E148";

#[derive(Debug)]
struct Args {
    environment: Environment,
    viewport: Viewport,
    config: Option<PathBuf>,
    replay: Option<u64>,
    content: Option<PathBuf>,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self> {
        let mut parsed = Args {
            environment: Environment::new(DESKTOP_UA, 1920.0, 1080.0),
            viewport: Viewport::new(1280.0, 800.0),
            config: None,
            replay: None,
            content: None,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--mobile" => {
                    parsed.environment = Environment::new(TABLET_UA, 1024.0, 1366.0);
                    parsed.viewport = Viewport::new(1024.0, 1366.0);
                }
                "--narrow" => {
                    parsed.environment = Environment::new(PHONE_UA, 390.0, 844.0);
                    parsed.viewport = Viewport::new(390.0, 844.0);
                }
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--replay" => {
                    let frames = args.next().context("--replay needs a frame count")?;
                    parsed.replay = Some(frames.parse().context("invalid frame count")?);
                }
                "-h" | "--help" => bail!(USAGE),
                path if !path.starts_with('-') => parsed.content = Some(PathBuf::from(path)),
                other => bail!("unknown option {other}\n{USAGE}"),
            }
        }
        Ok(parsed)
    }
}

fn main() -> Result<()> {
    let args = Args::parse(std::env::args().skip(1))?;

    // The interactive preview owns the terminal, so it only logs on request.
    let default_filter = if args.replay.is_some() { "info" } else { "off" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match &args.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            MotionConfig::from_json(&json)?
        }
        None => MotionConfig::default(),
    };
    let projects = load_content(args.content.as_ref())?;
    let profile = args.environment.classify(&config.device);
    let views = presets::portfolio(&config, &profile, &projects)?;
    let host = stage::demo_host(args.viewport, projects.len());
    let mut page = Page::mount(host, profile, config, views)?;

    match args.replay {
        Some(frames) => replay(&mut page, frames)?,
        None => renderer::run_preview(&mut page, projects.len())?,
    }
    page.unmount();
    Ok(())
}

fn load_content(path: Option<&PathBuf>) -> Result<Vec<ContentItem>> {
    let Some(path) = path else {
        return Ok(sample_projects());
    };
    let json =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(parse_content(&json)?)
}

/// Scroll down the page for the first half of the run and write every
/// frame's commands to stdout as one JSON line.
fn replay(page: &mut Page<ManualHost>, frames: u64) -> Result<()> {
    let mut out = BufWriter::new(std::io::stdout().lock());
    let mut commands = 0;
    for i in 0..frames {
        if i < frames / 2 && i % 4 == 0 {
            page.handle_input(InputEvent::Wheel { delta_y: 40.0 });
        }
        let Some((request, now)) = page.host_mut().advance(16.0) else {
            break;
        };
        let frame = page.frame(request, now);
        commands += frame.len();
        serde_json::to_writer(&mut out, &frame)?;
        writeln!(out)?;
    }
    out.flush()?;

    let scroll = page.scroll_state();
    tracing::info!(
        frames = page.frames(),
        commands,
        offset = scroll.virtual_offset,
        scene = ?page.scene_status(),
        "replay finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        Args::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_to_desktop() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.environment.user_agent, DESKTOP_UA);
        assert!(args.replay.is_none());
    }

    #[test]
    fn parses_flags_and_content() {
        let args = parse(&["--narrow", "--replay", "120", "projects.json"]).unwrap();
        assert_eq!(args.viewport.width, 390.0);
        assert_eq!(args.replay, Some(120));
        assert_eq!(args.content, Some(PathBuf::from("projects.json")));
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(parse(&["--fast"]).is_err());
        assert!(parse(&["--replay", "many"]).is_err());
    }

    #[test]
    fn replay_runs_headless() {
        let config = MotionConfig::default();
        let environment = Environment::new(DESKTOP_UA, 1920.0, 1080.0);
        let projects = sample_projects();
        let profile = environment.classify(&config.device);
        let views = presets::portfolio(&config, &profile, &projects).unwrap();
        let host = stage::demo_host(Viewport::new(1280.0, 800.0), projects.len());
        let mut page = Page::mount(host, profile, config, views).unwrap();
        assert!(replay(&mut page, 20).is_ok());
        assert_eq!(page.frames(), 20);
        assert!(page.scroll_state().raw_offset > 0.0);
    }
}
