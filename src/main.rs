//! Command-line front end for the nested-archive resolver.
//!
//! Lists and extracts entries of fat packages, local or remote, including
//! entries buried inside Stored sub-packages.

use anyhow::{Result, bail};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;

use zipnest::{
    Cli, CompressionMethod, HttpRangeSource, NestedResolver, ResolverConfig, ZipEntry,
    resolve_address,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ResolverConfig {
        container_suffix: cli.container_suffix.clone(),
        ..ResolverConfig::default()
    };

    // An address with !/ separators names exactly one entry.
    if cli.is_nested_address() {
        return print_addressed_entry(&cli, &config).await;
    }

    let resolver = if cli.is_http_url() {
        let source = HttpRangeSource::connect(cli.address.clone()).await?;
        let source = Arc::new(source);
        let resolver =
            NestedResolver::from_source(source.clone(), cli.address.clone(), config);
        run(&resolver, &cli).await?;
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(source.transferred_bytes())
            );
        }
        return Ok(());
    } else {
        NestedResolver::open_with(&cli.address, config)?
    };

    run(&resolver, &cli).await
}

async fn print_addressed_entry(cli: &Cli, config: &ResolverConfig) -> Result<()> {
    match resolve_address(&cli.address, config).await? {
        Some(bytes) => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&bytes).await?;
            stdout.flush().await?;
            Ok(())
        }
        None => bail!("entry not found: {}", cli.address),
    }
}

async fn run(resolver: &NestedResolver, cli: &Cli) -> Result<()> {
    if cli.list || cli.verbose {
        return list_entries(resolver, cli.verbose).await;
    }

    let selected: Vec<ZipEntry> = if cli.names.is_empty() {
        resolver
            .entries()
            .await?
            .into_iter()
            .filter(|e| !e.is_directory())
            .collect()
    } else {
        let index = resolver.entries().await?;
        let mut picked = Vec::new();
        for name in &cli.names {
            match index.iter().find(|e| &e.name == name) {
                Some(entry) => picked.push(entry.clone()),
                None => bail!("entry not found: {name}"),
            }
        }
        picked
    };

    for entry in &selected {
        let Some(bytes) = resolver.resolve(&entry.name).await? else {
            bail!("entry not found: {}", entry.name);
        };
        if cli.pipe {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&bytes).await?;
            stdout.flush().await?;
        } else {
            write_entry(entry, &bytes, cli).await?;
        }
    }

    Ok(())
}

async fn write_entry(entry: &ZipEntry, bytes: &[u8], cli: &Cli) -> Result<()> {
    let base = cli.extract_dir.clone().unwrap_or_else(|| ".".to_string());
    let path: PathBuf = [base.as_str(), entry.name.as_str()].iter().collect();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, bytes).await?;
    if !cli.is_quiet() {
        println!("  inflating: {}", path.display());
    }
    Ok(())
}

async fn list_entries(resolver: &NestedResolver, verbose: bool) -> Result<()> {
    let entries = resolver.entries().await?;

    if verbose {
        println!("{:>10}  {:>10}  {:>8}  Name", "Length", "Size", "Method");
        println!("{}", "-".repeat(60));
    }

    let mut total_uncompressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        if verbose {
            let method = match entry.method {
                CompressionMethod::Stored => "stored",
                CompressionMethod::Deflated => "deflated",
                CompressionMethod::Unknown(_) => "unknown",
            };
            println!(
                "{:>10}  {:>10}  {:>8}  {}",
                entry.uncompressed_size,
                entry.data.len(),
                method,
                entry.full_name()
            );
            if !entry.is_directory() {
                total_uncompressed += u64::from(entry.uncompressed_size);
                file_count += 1;
            }
        } else {
            println!("{}", entry.full_name());
        }
    }

    if verbose {
        println!("{}", "-".repeat(60));
        println!(
            "{:>10}  {:>10}  {:>8}  {} files",
            total_uncompressed, "", "", file_count
        );
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} {}", UNITS[unit])
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}
