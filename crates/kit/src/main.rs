//! Command line front end for `initramfs-inject`.

use std::fs::{File, Permissions};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::os::unix::fs::PermissionsExt;

use camino::Utf8Path;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{bail, Context};
use color_eyre::{Report, Result};
use initramfs_inject::detect::{self, InputKind};
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

mod create;
mod inject;
mod list;
mod template;

/// Path meaning stdin or stdout.
const STDIO: &str = "-";

#[derive(Parser)]
#[command(version, about = "Inject a replacement init into a newc initramfs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rename the archive's init to iniz and append a new init
    Inject(inject::InjectOpts),

    /// Write a new archive holding only an init and the trailer
    Create(create::CreateOpts),

    /// Show the records of an archive
    List(list::ListOpts),
}

fn install_tracing() -> Result<()> {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // stdout may carry the archive itself
    let fmt_layer = fmt::layer().with_target(false).with_writer(io::stderr);
    let filter_layer = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(ErrorLayer::default())
        .try_init()?;
    Ok(())
}

/// Open a path, or stdin for `-`.
pub(crate) fn open_input(path: &Utf8Path) -> Result<Box<dyn BufRead>> {
    if path.as_str() == STDIO {
        return Ok(Box::new(BufReader::new(io::stdin().lock())));
    }
    let f = File::open(path).with_context(|| format!("Opening {path}"))?;
    Ok(Box::new(BufReader::new(f)))
}

/// Refuse inputs that are clearly not an uncompressed newc archive.
///
/// Anything unrecognised is left for the parser to reject with an offset.
#[instrument(skip_all)]
pub(crate) fn check_input_format(src: &mut dyn BufRead) -> Result<()> {
    let prefix = src.fill_buf().context("Reading input")?;
    let kind = detect::sniff(prefix);
    debug!("input looks like {kind}");
    if kind.is_compressed() {
        bail!("Input is {kind} compressed; decompress it first");
    }
    match kind {
        InputKind::Newc | InputKind::Unknown => Ok(()),
        other => bail!("Unsupported archive format {other}; only newc (070701) can be rewritten"),
    }
}

/// Run `f` against stdout for `-`, otherwise against a temporary file
/// next to `output` that replaces it only once `f` succeeded.
pub(crate) fn write_output<F>(output: &Utf8Path, f: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    if output.as_str() == STDIO {
        let mut w = BufWriter::new(io::stdout().lock());
        f(&mut w)?;
        w.flush().context("Flushing stdout")?;
        return Ok(());
    }

    let dir = match output.parent() {
        Some(p) if !p.as_str().is_empty() => p,
        _ => Utf8Path::new("."),
    };
    let mut tmp =
        NamedTempFile::new_in(dir).with_context(|| format!("Creating temporary file in {dir}"))?;
    {
        let mut w = BufWriter::new(&mut tmp);
        f(&mut w)?;
        w.flush().with_context(|| format!("Writing {output}"))?;
    }
    tmp.as_file()
        .set_permissions(Permissions::from_mode(0o644))
        .context("Setting output permissions")?;
    tmp.persist(output)
        .with_context(|| format!("Renaming temporary file to {output}"))?;
    debug!("wrote {output}");
    Ok(())
}

#[instrument]
fn main() -> Result<(), Report> {
    install_tracing()?;
    color_eyre::install()?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Inject(opts) => opts.run()?,
        Commands::Create(opts) => opts.run()?,
        Commands::List(opts) => opts.run()?,
    }
    Ok(())
}
