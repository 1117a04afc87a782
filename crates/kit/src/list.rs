//! Implementation of the `list` command.

use std::io::Read;

use camino::Utf8PathBuf;
use color_eyre::eyre::Context;
use color_eyre::Result;
use comfy_table::{presets, Table};
use initramfs_inject::inspect::{self, EntrySummary};
use tracing::instrument;

use crate::{check_input_format, open_input};

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub(crate) enum ListFormat {
    Table,
    Json,
}

/// Options for the list command
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct ListOpts {
    /// Uncompressed newc archive, or `-` for stdin
    input: Utf8PathBuf,

    /// Output format
    #[clap(long, value_enum, default_value_t = ListFormat::Table)]
    format: ListFormat,
}

fn format_mtime(mtime: u32) -> String {
    chrono::DateTime::from_timestamp(i64::from(mtime), 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| mtime.to_string())
}

fn render_table(entries: &[EntrySummary]) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::NOTHING);
    table.set_header(vec!["OFFSET", "TYPE", "MODE", "INO", "UID", "GID", "SIZE", "MTIME", "NAME"]);
    for e in entries {
        table.add_row(vec![
            e.offset.to_string(),
            e.kind.to_string(),
            format!("{:04o}", e.perm),
            e.ino.to_string(),
            e.uid.to_string(),
            e.gid.to_string(),
            e.size.to_string(),
            format_mtime(e.mtime),
            e.name.clone(),
        ]);
    }
    table
}

impl ListOpts {
    #[instrument(skip_all, fields(input = %self.input))]
    pub(crate) fn run(&self) -> Result<()> {
        let mut src = open_input(&self.input)?;
        check_input_format(&mut src)?;
        let mut buf = Vec::new();
        src.read_to_end(&mut buf)
            .with_context(|| format!("Reading {}", self.input))?;
        let entries = inspect::list(&buf).with_context(|| format!("Parsing {}", self.input))?;

        match self.format {
            ListFormat::Table => println!("{}", render_table(&entries)),
            ListFormat::Json => {
                let stdout = std::io::stdout().lock();
                serde_json::to_writer_pretty(stdout, &entries)?;
                println!();
            }
        }
        Ok(())
    }
}
