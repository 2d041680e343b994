use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use umbra::cli::args::Cli;
use umbra::util::{normalize_url, parse_header_args, read_lines};
use umbra::{Engine, ScanConfig, ScanEvent};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("umbra=debug")
    } else {
        EnvFilter::new("umbra=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let targets = load_targets(&cli)?;
    let wordlist = read_lines(&cli.wordlist)
        .with_context(|| format!("failed to read wordlist {}", cli.wordlist.display()))?;
    if wordlist.is_empty() {
        return Err(umbra::UmbraError::EmptyWordlist.into());
    }

    let mut config = ScanConfig {
        targets,
        wordlist,
        target_concurrency: cli.target_concurrency,
        candidate_concurrency: cli.candidate_concurrency,
        minimal: cli.minimal,
        internal: cli.internal,
        append_domain: cli.append_domain,
        output_path: cli.output.clone(),
        custom_headers: parse_header_args(&cli.headers),
        proxy: cli.proxy.clone(),
        ..ScanConfig::default()
    };
    if let Some(user_agent) = cli.user_agent {
        config.user_agent = user_agent;
    }

    let mut engine = Engine::new(config)?;
    let mut events = engine.subscribe();

    let progress = tokio::spawn(async move {
        let mut probed: u64 = 0;
        while let Some(event) = events.recv().await {
            if let ScanEvent::Progress { advanced, .. } = event {
                probed += advanced;
            }
        }
        probed
    });

    let findings = engine.run().await?;
    drop(engine);

    let probed = progress.await.unwrap_or(0);
    tracing::info!(probed, findings = findings.len(), "done");

    Ok(())
}

fn load_targets(cli: &Cli) -> anyhow::Result<Vec<String>> {
    let raw = if let Some(ref inline) = cli.targets {
        inline
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    } else if let Some(ref path) = cli.targets_file {
        read_lines(path)
            .with_context(|| format!("failed to read targets file {}", path.display()))?
    } else {
        anyhow::bail!("either -u/--url or -l/--list is required");
    };

    if raw.is_empty() {
        anyhow::bail!("no targets to scan");
    }

    Ok(raw.iter().map(|t| normalize_url(t)).collect())
}
