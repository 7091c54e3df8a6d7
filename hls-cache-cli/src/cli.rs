use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Local caching reverse proxy for HLS playback",
    long_about = "Runs a loopback HTTP endpoint that proxies HLS playlists and segments.\n\
                  Playlists are rewritten so every referenced resource flows through the\n\
                  proxy, and fetched bodies are cached on disk for instant replays."
)]
pub struct CliArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the proxy endpoint
    Serve {
        /// Remote playlist URL(s) to print proxied URLs for
        #[arg(
            required = true,
            help = "Remote HLS playlist URL(s); their local proxy URLs are printed on startup"
        )]
        urls: Vec<String>,

        /// Address for the local endpoint
        #[arg(
            short,
            long,
            default_value = "127.0.0.1:0",
            help = "Bind address for the local endpoint; port 0 picks a free port"
        )]
        bind: SocketAddr,

        /// Disk cache directory
        #[arg(
            short,
            long,
            help = "Directory for the persistent cache (default: system temp)"
        )]
        cache_dir: Option<PathBuf>,

        /// Maximum total disk cache size with optional unit (B, KB, MB, GB, TB)
        #[arg(
            short,
            long,
            default_value = "500MB",
            help = "Maximum total disk cache size with optional unit (B, KB, MB, GB, TB). Examples: \"500MB\", \"4GB\". Use 0 for unbounded."
        )]
        max_size: String,

        /// Overall timeout in seconds for upstream requests
        #[arg(
            long,
            default_value = "30",
            help = "Overall timeout in seconds for upstream HTTP requests"
        )]
        timeout: u64,

        /// Connection timeout in seconds
        #[arg(
            long,
            default_value = "10",
            help = "Connection timeout in seconds (time to establish initial connection)"
        )]
        connect_timeout: u64,

        /// Additional query parameter names stripped during cache-key canonicalization
        #[arg(
            long = "strip-param",
            help = "Extra query parameter name treated as ephemeral signing data (repeatable)"
        )]
        strip_params: Vec<String>,

        /// Custom user agent for upstream fetches
        #[arg(long, help = "User agent string for upstream fetches")]
        user_agent: Option<String>,
    },

    /// Wipe the persistent cache directory
    ClearCache {
        /// Disk cache directory
        #[arg(
            short,
            long,
            help = "Directory of the persistent cache to wipe (default: system temp)"
        )]
        cache_dir: Option<PathBuf>,
    },
}
