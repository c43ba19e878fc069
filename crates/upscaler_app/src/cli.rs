use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "upscaler_app", version, about = "Upload images to an upscaling service")]
pub struct Cli {
    /// RON configuration file (default: ./upscaler.ron if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Base URL of the upscaling service
    #[arg(long, global = true, env = "UPSCALER_API_BASE_URL")]
    pub api_base_url: Option<String>,

    /// Base URL of the auth service used to verify credentials
    #[arg(long, global = true, env = "UPSCALER_AUTH_BASE_URL")]
    pub auth_base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sign in with a credential from the identity provider
    SignIn {
        /// Signed identity token (three dot-separated segments)
        #[arg(long, env = "UPSCALER_CREDENTIAL", hide_env_values = true)]
        credential: String,
    },

    /// Forget the cached session
    SignOut,

    /// Show the cached session
    Whoami,

    /// Upload an image, wait for the result and save it
    Upscale {
        /// Image to upload
        #[arg(conflicts_with = "test_image", required_unless_present = "test_image")]
        file: Option<PathBuf>,

        /// Use the configured test image instead of a local file
        #[arg(long)]
        test_image: bool,

        /// Stop once the enhanced image has loaded
        #[arg(long)]
        no_download: bool,

        /// Sign in with this credential first, so it can be verified
        #[arg(long, env = "UPSCALER_CREDENTIAL", hide_env_values = true)]
        credential: Option<String>,
    },

    /// Query the service health endpoint
    Health,
}
