//! Generate command - merge GitHub releases into the channel indexes

use clap::Args;
use console::style;
use std::path::PathBuf;
use vpmdex_repo::{ChannelConfig, ChannelReport, ScanConfig, ScanReport, Scanner};

use crate::error::{CliError, Result};
use crate::util::count;

#[derive(Debug, Default, Args)]
pub struct GenerateArgs {
    /// Configuration file (YAML); flags override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory the index files are written to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Source repository (owner/name)
    #[arg(short, long)]
    pub repository: Option<String>,

    /// Package name, also the archive file name prefix
    #[arg(short, long)]
    pub package: Option<String>,

    /// GitHub access token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Read the access token from this environment variable instead
    #[arg(long)]
    pub token_env: Option<String>,

    /// GitHub API endpoint
    #[arg(long)]
    pub api_url: Option<String>,

    /// Public URL of the stable index
    #[arg(long)]
    pub repo_url: Option<String>,

    #[arg(long)]
    pub repo_author: Option<String>,

    #[arg(long)]
    pub repo_name: Option<String>,

    #[arg(long)]
    pub repo_id: Option<String>,

    /// Public URL of the prerelease index; enables the prerelease channel
    #[arg(long)]
    pub prerelease_url: Option<String>,

    #[arg(long)]
    pub prerelease_author: Option<String>,

    #[arg(long)]
    pub prerelease_name: Option<String>,

    #[arg(long)]
    pub prerelease_id: Option<String>,

    /// Documentation link stamped onto every new version
    #[arg(long)]
    pub documentation_url: Option<String>,

    /// Publish prereleases in the stable index (no prerelease channel only)
    #[arg(long)]
    pub include_prereleases: bool,
}

impl GenerateArgs {
    /// Layer the command line over `config`
    pub fn apply(&self, config: &mut ScanConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(value) = value {
                *target = value.clone();
            }
        }

        set(&mut config.output, &self.output);
        set(&mut config.repository, &self.repository);
        set(&mut config.package, &self.package);
        set(&mut config.api_url, &self.api_url);
        if self.token.is_some() {
            config.token = self.token.clone();
        }
        if self.token_env.is_some() {
            config.token_env = self.token_env.clone();
        }
        if self.documentation_url.is_some() {
            config.documentation_url = self.documentation_url.clone();
        }
        config.include_prereleases |= self.include_prereleases;

        set(&mut config.stable.url, &self.repo_url);
        set(&mut config.stable.author, &self.repo_author);
        set(&mut config.stable.name, &self.repo_name);
        if self.repo_id.is_some() {
            config.stable.id = self.repo_id.clone();
        }

        let prerelease_flags = [
            &self.prerelease_url,
            &self.prerelease_author,
            &self.prerelease_name,
            &self.prerelease_id,
        ];
        if prerelease_flags.iter().any(|flag| flag.is_some()) {
            let channel = config.prerelease.get_or_insert_with(ChannelConfig::default);
            set(&mut channel.url, &self.prerelease_url);
            set(&mut channel.author, &self.prerelease_author);
            set(&mut channel.name, &self.prerelease_name);
            if self.prerelease_id.is_some() {
                channel.id = self.prerelease_id.clone();
            }
        }

        // The prerelease listing is published by the same author as the stable one
        if let Some(channel) = config.prerelease.as_mut() {
            if channel.author.is_empty() {
                channel.author = config.stable.author.clone();
            }
            if channel.name.is_empty() {
                channel.name = config.stable.name.clone();
            }
        }
    }
}

/// Run the generate command
pub async fn run(args: &GenerateArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load_from(path)?,
        None => ScanConfig::default(),
    };
    args.apply(&mut config);

    if config.repository.is_empty() {
        return Err(CliError::config_with_help(
            "No source repository configured",
            "Pass --repository owner/name or set `repository` in the config file",
        ));
    }

    tracing::debug!("Writing indexes to {}", config.output.display());
    let (scanner, source) = Scanner::from_config(&config)?;
    let report = scanner.run(&source).await?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &ScanReport) {
    println!(
        "{} Scanned {} ({} drafts, {} incomplete)",
        style("✓").green().bold(),
        count(report.releases, "release"),
        report.drafts,
        report.incomplete
    );

    for channel in &report.channels {
        println!("  {}", channel_line(channel));
    }
}

fn channel_line(channel: &ChannelReport) -> String {
    let counts = format!(
        "{} added, {} updated, {} unchanged, {} skipped",
        channel.added, channel.updated, channel.unchanged, channel.skipped
    );
    let counts = if channel.skipped > 0 {
        style(counts).yellow().to_string()
    } else if channel.changed() {
        style(counts).green().to_string()
    } else {
        style(counts).dim().to_string()
    };

    format!(
        "{:<11} {}  {}",
        style(channel.kind.label()).cyan(),
        channel.path.display(),
        counts
    )
}
