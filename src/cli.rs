//! CLI definitions for Playwatch.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};

/// Playwatch CLI.
#[derive(Parser)]
#[command(name = "playwatch")]
#[command(about = "Live viewer for remotely executed playbook runs")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ./playwatch.toml, then ~/.playwatch/config.toml)
    #[arg(short, long, global = true, env = "PLAYWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Follow runs live: progress, status and screenshots
    Watch {
        /// Runs to watch
        #[arg(required = true)]
        execution_ids: Vec<String>,

        /// Write the latest screenshot of each run into this directory
        #[arg(long)]
        save_frames: Option<PathBuf>,
    },

    /// Click into a run's remote browser
    Click {
        /// Run to click into
        execution_id: String,

        /// Click position on the rendered image, as X,Y
        #[arg(long)]
        at: Point,

        /// Size the image is rendered at, as WxH
        #[arg(long)]
        rendered: Size,

        /// Native size of the remote surface, as WxH
        #[arg(long)]
        native: NativeSize,
    },

    /// Print the native point a rendered click maps to
    Map {
        /// Click position on the rendered image, as X,Y
        #[arg(long)]
        at: Point,

        /// Size the image is rendered at, as WxH
        #[arg(long)]
        rendered: Size,

        /// Native size of the remote surface, as WxH
        #[arg(long)]
        native: NativeSize,
    },
}

/// `X,Y` on the rendered image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Point {
    pub x: f64,
    pub y: f64,
}

impl FromStr for Point {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = split_pair(s, ',')?;
        Ok(Self { x, y })
    }
}

/// `WxH` of the rendered image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Size {
    pub width: f64,
    pub height: f64,
}

impl FromStr for Size {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = split_pair(s, 'x')?;
        Ok(Self { width, height })
    }
}

/// `WxH` in whole native pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NativeSize {
    pub width: u32,
    pub height: u32,
}

impl FromStr for NativeSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (width, height) = split_pair(s, 'x')?;
        Ok(Self { width, height })
    }
}

fn split_pair<T: FromStr>(s: &str, sep: char) -> Result<(T, T), String> {
    let (a, b) = s
        .split_once(sep)
        .ok_or_else(|| format!("expected two values separated by '{}'", sep))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<T>()
            .map_err(|_| format!("'{}' is not a valid number", v.trim()))
    };
    Ok((parse(a)?, parse(b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_point() {
        assert_eq!(
            "12.5,40".parse::<Point>().unwrap(),
            Point { x: 12.5, y: 40.0 }
        );
        assert!("12.5".parse::<Point>().is_err());
        assert!("a,b".parse::<Point>().is_err());
    }

    #[test]
    fn test_parse_sizes() {
        assert_eq!(
            "640x360".parse::<Size>().unwrap(),
            Size {
                width: 640.0,
                height: 360.0
            }
        );
        assert_eq!(
            "1280x720".parse::<NativeSize>().unwrap(),
            NativeSize {
                width: 1280,
                height: 720
            }
        );
        assert!("1280.5x720".parse::<NativeSize>().is_err());
        assert!("1280,720".parse::<NativeSize>().is_err());
    }

    #[test]
    fn test_cli_watch() {
        let cli = Cli::try_parse_from([
            "playwatch",
            "watch",
            "run-1",
            "run-2",
            "--save-frames",
            "/tmp/frames",
        ])
        .unwrap();
        match cli.command {
            Commands::Watch {
                execution_ids,
                save_frames,
            } => {
                assert_eq!(execution_ids, vec!["run-1", "run-2"]);
                assert_eq!(save_frames, Some(PathBuf::from("/tmp/frames")));
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_cli_watch_requires_run() {
        assert!(Cli::try_parse_from(["playwatch", "watch"]).is_err());
    }

    #[test]
    fn test_cli_click() {
        let cli = Cli::try_parse_from([
            "playwatch",
            "--config",
            "custom.toml",
            "click",
            "run-1",
            "--at",
            "320,180",
            "--rendered",
            "640x360",
            "--native",
            "1280x720",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Commands::Click {
                execution_id,
                at,
                rendered,
                native,
            } => {
                assert_eq!(execution_id, "run-1");
                assert_eq!(at, Point { x: 320.0, y: 180.0 });
                assert_eq!(rendered.width, 640.0);
                assert_eq!(native.height, 720);
            }
            _ => panic!("expected click"),
        }
    }
}
