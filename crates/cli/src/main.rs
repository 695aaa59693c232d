use clap::{Parser, Subcommand};
use pinfile_core::{
    RepositoryHandle, RetrievalService, RevisionId, Route, RouteEntry, RouteTable, ServiceConfig,
};
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

#[derive(Parser)]
#[command(name = "pinfile")]
#[command(about = "pinfile commit-addressed file server CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and probe its repositories
    Check {
        /// Path to the YAML configuration
        #[arg(long)]
        config: PathBuf,
    },
    /// Write a file as it was at a given commit
    Fetch {
        /// Repository location
        #[arg(long)]
        repo: PathBuf,
        /// File path inside the repository tree
        #[arg(long)]
        path: String,
        /// Full 40 character commit hash
        #[arg(long)]
        hash: String,
        /// Output file (stdout if omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Check { config }) => {
            let table = ServiceConfig::load(&config)?.into_route_table()?;
            if table.is_empty() {
                println!("No paths configured.");
            }

            let mut unreachable = 0;
            for route in table.iter() {
                println!(
                    "serve {} corresponding to repo {} and file {}",
                    route.endpoint(),
                    route.repository().display(),
                    route.path()
                );
                if let Err(e) = RepositoryHandle::open(route.repository()) {
                    eprintln!("  warning: {}", e);
                    unreachable += 1;
                }
            }

            println!(
                "{} route(s), {} unreachable repositor{}",
                table.len(),
                unreachable,
                if unreachable == 1 { "y" } else { "ies" }
            );
        }
        Some(Commands::Fetch {
            repo,
            path,
            hash,
            output,
        }) => {
            let table = RouteTable::build([RouteEntry {
                repo_location: repo.display().to_string(),
                url: "/fetch".into(),
                path,
            }])?;
            let route = table
                .dispatch("/fetch")
                .ok_or("fetch route missing from table")?;

            let service = RetrievalService::new();
            let written = match &output {
                Some(file) => fetch_to_file(&service, route, &hash, file)?,
                None => service.retrieve(route, &hash, |_| io::stdout().lock())?,
            };
            eprintln!("wrote {} bytes", written);
        }
        None => {
            println!("No command given. Use --help for usage.");
        }
    }

    Ok(())
}

/// Write the file served by `route` at `hash` to `output`.
///
/// Bytes are staged in a temporary file next to `output` and moved over it only once the copy
/// has finished, so a failed fetch leaves any existing file untouched.
fn fetch_to_file(
    service: &RetrievalService,
    route: &Route,
    hash: &str,
    output: &Path,
) -> Result<u64, Box<dyn Error>> {
    RevisionId::parse(hash)?;

    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = NamedTempFile::new_in(dir)?;

    let sink = staged.as_file_mut();
    let written = service.retrieve(route, hash, move |_| sink)?;
    staged.persist(output)?;
    Ok(written)
}
