use super::app_config::{LogLevel, StoreBackend};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::entities::TransformParams;

#[derive(Debug, Parser)]
#[command(
    name = "academy-avatar",
    version,
    about = "Transform, store and resolve course platform avatars",
    long_about = None
)]
pub struct CliArgs {
    /// Configuration file path.
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log file path.
    #[arg(long, value_name = "PATH", global = true)]
    pub log_path: Option<PathBuf>,

    /// Log verbosity level.
    #[arg(long, value_enum, global = true)]
    pub log_level: Option<LogLevel>,

    /// Object store backend.
    #[arg(long, value_enum, global = true)]
    pub backend: Option<StoreBackend>,

    /// Directory used by the filesystem backend.
    #[arg(long, value_name = "PATH", global = true)]
    pub store_root: Option<PathBuf>,

    /// Endpoint of the HTTP backend.
    #[arg(long, value_name = "URL", global = true)]
    pub base_url: Option<String>,

    /// Base URL avatars are served from.
    #[arg(long, value_name = "URL", global = true)]
    pub public_base_url: Option<String>,

    /// Bearer token for the HTTP backend.
    #[arg(long, env = "ACADEMY_AVATAR_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Append the version token to resolved URLs.
    #[arg(long, global = true)]
    pub cache_bust: Option<bool>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Transform a photo and store it as the subject's avatar.
    Save {
        /// Subject identifier.
        #[arg(long)]
        subject: String,

        /// Source photo.
        #[arg(long, value_name = "PATH")]
        image: PathBuf,

        #[command(flatten)]
        transform: TransformArgs,
    },

    /// Delete the subject's avatar.
    Remove {
        /// Subject identifier.
        #[arg(long)]
        subject: String,
    },

    /// Print the URL or initials shown for a subject.
    Resolve {
        /// Subject identifier.
        #[arg(long)]
        subject: String,

        /// Display name used for the initials fallback.
        #[arg(long)]
        name: Option<String>,
    },

    /// Transform a photo to a local file without storing it.
    Render {
        /// Source photo.
        #[arg(long, value_name = "PATH")]
        image: PathBuf,

        /// Output path.
        #[arg(long, value_name = "PATH")]
        out: PathBuf,

        #[command(flatten)]
        transform: TransformArgs,
    },
}

/// Editor parameters accepted on the command line.
#[derive(Debug, Clone, Copy, Args)]
pub struct TransformArgs {
    /// Zoom factor between 1 and 3.
    #[arg(long, default_value_t = 1.0)]
    pub scale: f32,

    /// Clockwise rotation in degrees.
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub rotation: i32,

    /// Horizontal focal point between 0 and 1.
    #[arg(long, default_value_t = 0.5)]
    pub focal_x: f32,

    /// Vertical focal point between 0 and 1.
    #[arg(long, default_value_t = 0.5)]
    pub focal_y: f32,
}

impl From<TransformArgs> for TransformParams {
    fn from(args: TransformArgs) -> Self {
        Self::new(args.scale, args.rotation, args.focal_x, args.focal_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_save() {
        let args = CliArgs::try_parse_from([
            "academy-avatar",
            "--backend",
            "fs",
            "save",
            "--subject",
            "u1",
            "--image",
            "photo.jpg",
            "--scale",
            "1.5",
            "--rotation",
            "-90",
        ])
        .unwrap();

        assert_eq!(args.backend, Some(StoreBackend::Fs));
        match args.command {
            Command::Save {
                subject, transform, ..
            } => {
                assert_eq!(subject, "u1");
                let params = TransformParams::from(transform);
                assert!((params.scale - 1.5).abs() < f32::EPSILON);
                assert_eq!(params.normalized_rotation(), 270);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args =
            CliArgs::try_parse_from(["academy-avatar", "remove", "--subject", "u1", "--log-level", "debug"])
                .unwrap();

        assert_eq!(args.log_level, Some(LogLevel::Debug));
        assert!(matches!(args.command, Command::Remove { .. }));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(CliArgs::try_parse_from(["academy-avatar"]).is_err());
    }
}
