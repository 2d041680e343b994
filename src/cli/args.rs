use clap::Parser;
use std::path::PathBuf;

/// umbra - virtual host discovery via Host-header probing
#[derive(Parser, Debug)]
#[command(
    name = "umbra",
    version = "0.1.0",
    about = "Discovers virtual hosts a server only reveals when the Host header matches",
    long_about = None,
    after_help = "EXAMPLES:\n  umbra -u https://10.0.0.5 -w vhosts.txt\n  umbra -l targets.txt -w vhosts.txt -o results.json --internal\n  umbra -u https://target.example -w words.txt --append-domain --minimal"
)]
pub struct Cli {
    /// Comma-separated list of target URLs
    #[arg(short = 'u', long = "url", help_heading = "TARGETS")]
    pub targets: Option<String>,

    /// File containing target URLs (one per line)
    #[arg(short = 'l', long = "list", help_heading = "TARGETS", conflicts_with = "targets")]
    pub targets_file: Option<PathBuf>,

    /// Wordlist of candidate hostnames (one per line)
    #[arg(short = 'w', long, required = true, help_heading = "TARGETS")]
    pub wordlist: PathBuf,

    // ═══════════════════════════════════════════════════════════════════
    // PERFORMANCE
    // ═══════════════════════════════════════════════════════════════════

    /// Number of targets scanned concurrently
    #[arg(short = 't', long = "threads", default_value_t = 3, help_heading = "PERFORMANCE")]
    pub target_concurrency: usize,

    /// Concurrent candidate probes per target
    #[arg(short = 'c', long = "concurrent-vhosts", default_value_t = 5, help_heading = "PERFORMANCE")]
    pub candidate_concurrency: usize,

    /// Skip body similarity comparison and cap body reads at 8 KiB
    #[arg(long, help_heading = "PERFORMANCE")]
    pub minimal: bool,

    // ═══════════════════════════════════════════════════════════════════
    // SCANNING
    // ═══════════════════════════════════════════════════════════════════

    /// Pre-filter the wordlist to hostnames that are not directly accessible
    #[arg(long, help_heading = "SCANNING")]
    pub internal: bool,

    /// Compose dotless candidates as <candidate>.<target-host>
    #[arg(long = "append-domain", help_heading = "SCANNING")]
    pub append_domain: bool,

    // ═══════════════════════════════════════════════════════════════════
    // REQUESTS
    // ═══════════════════════════════════════════════════════════════════

    /// Override the request User-Agent
    #[arg(long = "user-agent", help_heading = "REQUESTS")]
    pub user_agent: Option<String>,

    /// Extra header sent with every probe, as "Name: Value" (repeatable)
    #[arg(short = 'H', long = "header", help_heading = "REQUESTS")]
    pub headers: Vec<String>,

    /// Upstream HTTP proxy URL for all probes
    #[arg(long, help_heading = "REQUESTS")]
    pub proxy: Option<String>,

    // ═══════════════════════════════════════════════════════════════════
    // OUTPUT
    // ═══════════════════════════════════════════════════════════════════

    /// Write results to this file after every new finding
    #[arg(short = 'o', long, help_heading = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Verbose output (debug level)
    #[arg(short, long, help_heading = "OUTPUT")]
    pub verbose: bool,
}
