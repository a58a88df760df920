//! `segarc`: command-line queries over segment archives.
//!
//! Results go to stdout as `SUCCESS` followed by the result lines, or
//! `ERROR` followed by a one-line reason. Logs go to stderr.

use anyhow::Result;
use clap::{Parser, Subcommand};
use segarc_format::{ListOptions, QueryError, extract, find_matching, list_entries, parse_file};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::filter::LevelFilter;

/// Variant number of this tool and its server
const VARIANT: u32 = 75664;

/// Default section size limit for `findall`
const DEFAULT_MAX_SECTION_SIZE: u32 = 1416;

#[derive(Parser)]
#[command(
    name = "segarc",
    about = "Inspect, extract from and search for segment archives",
    version
)]
struct Cli {
    /// Set the logging level (overridden by RUST_LOG)
    #[arg(short, long, value_enum, default_value = "warn")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
enum Commands {
    /// Print the variant number
    Variant,

    /// List directory entries
    List {
        /// Directory to list
        #[arg(long)]
        path: PathBuf,

        /// Descend into subdirectories
        #[arg(long)]
        recursive: bool,

        /// Only regular files smaller than this many bytes
        #[arg(long)]
        size_smaller: Option<u64>,

        /// Only entries whose name ends with this suffix
        #[arg(long)]
        name_ends_with: Option<String>,
    },

    /// Print the header of an archive
    Parse {
        /// Archive file
        #[arg(long)]
        path: PathBuf,
    },

    /// Print one line of a section, reversed
    Extract {
        /// Archive file
        #[arg(long)]
        path: PathBuf,

        /// 1-based section number
        #[arg(long)]
        section: usize,

        /// 1-based line number
        #[arg(long)]
        line: usize,
    },

    /// Find archives whose sections are all small
    Findall {
        /// Directory to search recursively
        #[arg(long)]
        path: PathBuf,

        /// Largest section size an archive may contain
        #[arg(long, default_value_t = DEFAULT_MAX_SECTION_SIZE)]
        max_section_size: u32,
    },
}

fn report_error(out: &mut impl Write, err: &QueryError) -> io::Result<bool> {
    tracing::debug!(error = %err, "Query failed");
    writeln!(out, "ERROR\n{}", err.message())?;
    Ok(false)
}

fn write_paths(out: &mut impl Write, paths: impl Iterator<Item = PathBuf>) -> io::Result<bool> {
    writeln!(out, "SUCCESS")?;
    for path in paths {
        writeln!(out, "{}", path.display())?;
    }
    Ok(true)
}

/// Execute `command`, writing its report to `out`; returns whether it
/// succeeded
fn execute(command: Commands, out: &mut impl Write) -> io::Result<bool> {
    match command {
        Commands::Variant => {
            writeln!(out, "{VARIANT}")?;
            Ok(true)
        }
        Commands::List {
            path,
            recursive,
            size_smaller,
            name_ends_with,
        } => {
            let options = ListOptions {
                root: path,
                recursive,
                size_smaller,
                name_ends_with,
            };
            match list_entries(options) {
                Ok(entries) => write_paths(out, entries),
                Err(e) => report_error(out, &e.into()),
            }
        }
        Commands::Parse { path } => match parse_file(&path) {
            Ok(header) => {
                writeln!(out, "SUCCESS")?;
                for line in header.describe() {
                    writeln!(out, "{line}")?;
                }
                Ok(true)
            }
            Err(e) => report_error(out, &e),
        },
        Commands::Extract {
            path,
            section,
            line,
        } => match extract(&path, section, line) {
            Ok(reversed) => {
                writeln!(out, "SUCCESS")?;
                out.write_all(&reversed)?;
                writeln!(out)?;
                Ok(true)
            }
            Err(e) => report_error(out, &e),
        },
        Commands::Findall {
            path,
            max_section_size,
        } => match find_matching(&path, max_section_size) {
            Ok(found) => write_paths(out, found),
            Err(e) => report_error(out, &e.into()),
        },
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::default()
            .add_directive(LevelFilter::from_level(cli.log_level.into()).into())
    });
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let mut stdout = io::stdout().lock();
    let ok = execute(cli.command, &mut stdout)?;
    stdout.flush()?;

    Ok(if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use segarc_format::ArchiveBuilder;
    use tempfile::TempDir;

    fn run(args: &[&str]) -> (bool, String) {
        let cli = Cli::try_parse_from(std::iter::once("segarc").chain(args.iter().copied()))
            .unwrap();
        let mut out = Vec::new();
        let ok = execute(cli.command, &mut out).unwrap();
        (ok, String::from_utf8(out).unwrap())
    }

    fn write_archive(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("a.bin");
        let data = ArchiveBuilder::new(45)
            .section("head", 82, b"abc\ndef\n".to_vec())
            .section("tail", 39, vec![b'z'; 2000])
            .build()
            .unwrap();
        std::fs::write(&path, data).unwrap();
        path
    }

    #[test]
    fn test_variant() {
        assert_eq!(run(&["variant"]), (true, "75664\n".to_string()));
    }

    #[test]
    fn test_parse() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir);
        let (ok, out) = run(&["parse", "--path", path.to_str().unwrap()]);
        assert!(ok);
        assert_eq!(
            out,
            "SUCCESS\nversion=45\nnr_sections=2\nsection1: head 82 8\nsection2: tail 39 2000\n"
        );
    }

    #[test]
    fn test_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad");
        std::fs::write(&path, b"0123456789xxxx").unwrap();
        let (ok, out) = run(&["parse", "--path", path.to_str().unwrap()]);
        assert!(!ok);
        assert_eq!(out, "ERROR\nwrong magic\n");
    }

    #[test]
    fn test_extract() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir);
        let path = path.to_str().unwrap();
        assert_eq!(
            run(&["extract", "--path", path, "--section", "1", "--line", "2"]),
            (true, "SUCCESS\nfed\n".to_string())
        );
        assert_eq!(
            run(&["extract", "--path", path, "--section", "1", "--line", "3"]),
            (false, "ERROR\ninvalid line\n".to_string())
        );
        assert_eq!(
            run(&["extract", "--path", path, "--section", "5", "--line", "1"]),
            (false, "ERROR\ninvalid section\n".to_string())
        );
    }

    #[test]
    fn test_findall() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir);
        let root = dir.path().to_str().unwrap();

        let (ok, out) = run(&["findall", "--path", root]);
        assert!(ok);
        assert_eq!(out, "SUCCESS\n");

        let (ok, out) = run(&["findall", "--path", root, "--max-section-size", "2000"]);
        assert!(ok);
        assert_eq!(out, format!("SUCCESS\n{}\n", path.display()));

        let missing = dir.path().join("missing");
        let (ok, out) = run(&["findall", "--path", missing.to_str().unwrap()]);
        assert!(!ok);
        assert_eq!(out, "ERROR\ninvalid directory path\n");
    }

    #[test]
    fn test_list() {
        let dir = TempDir::new().unwrap();
        let path = write_archive(&dir);
        let root = dir.path().to_str().unwrap();

        let (ok, out) = run(&["list", "--path", root, "--name-ends-with", ".bin"]);
        assert!(ok);
        assert_eq!(out, format!("SUCCESS\n{}\n", path.display()));

        let (ok, out) = run(&["list", "--path", root, "--size-smaller", "10"]);
        assert!(ok);
        assert_eq!(out, "SUCCESS\n");
    }
}
