use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::{bail, Result};
use futures::stream::TryStreamExt as _;
use tokio::fs;
use tracing_subscriber::EnvFilter;

use applesingle::{
    apple::{parse_with, ExtractMode, Forks, Options},
    scan,
};

const RESOURCE_FORK_SUFFIX: &str = ".resource_fork";

const USAGE: &str = "\
Possible arguments:
  <filename>
  verbose <filename>
  list <path>
  batch <path>
  extract_datafork <filename_in> <filename_out>
  extract_resfork <filename_in> <filename_out>
  extract_both_forks <filename_in> <filename_out>   (NOTE: .resource_fork will be appended to filename_out for the resource fork)";

enum Command {
    Convert {
        mode: ExtractMode,
        input: PathBuf,
        output: Option<PathBuf>,
        options: Options,
    },
    List(PathBuf),
    Batch(PathBuf),
}

impl Command {
    fn from_args(args: &[String]) -> Result<Self> {
        let command = match args {
            [file] => Self::Convert {
                mode: ExtractMode::Verify,
                input: file.into(),
                output: None,
                options: Options::default(),
            },
            [mode, path] => match mode.as_str() {
                "list" => Self::List(path.into()),
                "batch" => Self::Batch(path.into()),
                "verbose" => Self::Convert {
                    mode: ExtractMode::Verify,
                    input: path.into(),
                    output: None,
                    options: Options::verbose(),
                },
                _ => bail!("Verbose, list or batch only supported with input filename only"),
            },
            [mode, input, output] => Self::Convert {
                mode: mode.parse()
                    .map_err(|_| anyhow::anyhow!("Unknown mode: {mode}"))?,
                input: input.into(),
                output: Some(output.into()),
                options: Options::default(),
            },
            _ => bail!("No filename supplied\n{USAGE}"),
        };
        Ok(command)
    }
    fn verbose(&self) -> bool {
        matches!(self, Self::Convert { options: Options { verbose: true }, .. })
    }
}

fn resource_fork_path(output: &Path) -> PathBuf {
    let mut path = output.as_os_str().to_owned();
    path.push(RESOURCE_FORK_SUFFIX);
    path.into()
}

async fn write_fork(path: &Path, fork: &[u8]) -> Result<()> {
    println!("Header bytes:");
    let header = Forks::header_bytes(fork)
        .iter()
        .map(|b| format!("{b:#x}"))
        .collect::<Vec<_>>()
        .join(" ");
    println!("   {header}");
    println!("Length = {}", fork.len());
    fs::write(path, fork).await?;
    Ok(())
}

async fn convert_one_file(
    input: &Path,
    mode: ExtractMode,
    output: Option<&Path>,
    options: Options,
) -> Result<()> {
    let data = fs::read(input).await?;
    let container = parse_with(data, options)?;
    println!("File seems OK (remember - no checksums!)");

    let Forks { data, resource } = container.extract_mode(mode)?;
    drop(container);

    let Some(output) = output else {
        return Ok(());
    };
    match (data, resource) {
        (Some(data), Some(resource)) => {
            write_fork(output, &data).await?;
            write_fork(&resource_fork_path(output), &resource).await?;
        },
        (Some(fork), None) | (None, Some(fork)) => {
            write_fork(output, &fork).await?;
        },
        (None, None) => {},
    }
    Ok(())
}

async fn scan_directory(root: PathBuf, convert: bool) -> Result<()> {
    let candidates = scan::candidates(root);
    futures::pin_mut!(candidates);
    while let Some(path) = candidates.try_next().await? {
        if convert {
            println!("Converting {}", path.display());
            convert_one_file(&path, ExtractMode::BothForks, Some(&path), Options::default())
                .await?;
        } else {
            println!("{}", path.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = Command::from_args(&args)?;

    let default_level = if command.verbose() { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Command::Convert { mode, input, output, options } => {
            if mode != ExtractMode::Verify && output.is_none() {
                bail!("{mode} needs an output filename\n{USAGE}");
            }
            convert_one_file(&input, mode, output.as_deref(), options).await
        },
        Command::List(root) => {
            println!("Files that might be AppleSingle:");
            scan_directory(root, false).await
        },
        Command::Batch(root) => {
            println!("Batch converting directory:");
            scan_directory(root, true).await
        },
    }
}
