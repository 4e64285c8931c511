//! List command - show the contents of an index file

use console::style;
use std::path::Path;
use vpmdex_repo::RepositoryDocument;

use crate::error::{CliError, Result};
use crate::util::{count, short_digest};

/// Run the list command
pub fn run(path: &Path, output_json: bool) -> Result<()> {
    let document = RepositoryDocument::load(path)?;

    if output_json {
        let packages: Vec<_> = document
            .packages
            .iter()
            .map(|(name, versions)| {
                serde_json::json!({
                    "name": name,
                    "latest": versions.latest(),
                    "versions": versions
                        .sorted()
                        .into_iter()
                        .rev()
                        .map(|(version, metadata)| serde_json::json!({
                            "version": version,
                            "zipSHA256": metadata.zip_sha256,
                        }))
                        .collect::<Vec<_>>(),
                })
            })
            .collect();
        let json = serde_json::to_string_pretty(&packages)
            .map_err(|e| CliError::internal(e.to_string()))?;
        println!("{}", json);
        return Ok(());
    }

    println!(
        "{} {}",
        style(&document.name).bold(),
        style(format!("by {}", document.author)).dim()
    );
    println!("{}", style(&document.url).dim());

    if document.packages.is_empty() {
        println!();
        println!("No packages indexed");
        return Ok(());
    }

    for (name, versions) in &document.packages {
        println!();
        println!(
            "{} ({})",
            style(name).bold(),
            count(versions.versions.len(), "version")
        );

        let latest = versions.latest();
        for (version, metadata) in versions.sorted().into_iter().rev() {
            let checksum = match metadata.zip_sha256.as_deref() {
                Some(digest) => style(short_digest(digest, 12).to_string()).green(),
                None => style("no checksum".to_string()).yellow(),
            };
            let marker = if latest == Some(version) {
                style(" (latest)").cyan().to_string()
            } else {
                String::new()
            };
            println!("  {:<24} {}{}", version, checksum, marker);
        }
    }

    Ok(())
}
