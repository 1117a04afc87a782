//! Implementation of the `inject` command.

use std::io::{Read, Write};

use camino::Utf8PathBuf;
use color_eyre::eyre::Context;
use color_eyre::Result;
use initramfs_inject::rewrite::{DEFAULT_RENAME, DEFAULT_TARGET};
use initramfs_inject::Injector;
use tracing::{info, instrument};

use crate::template::TemplateOpts;
use crate::{check_input_format, open_input, write_output};

/// Options for the inject command
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct InjectOpts {
    /// Uncompressed newc archive to rewrite, or `-` for stdin
    #[clap(long, short)]
    input: Utf8PathBuf,

    /// File to install as the new init
    #[clap(long, short)]
    payload: Utf8PathBuf,

    /// Where to write the rewritten archive, or `-` for stdout
    #[clap(long, short, default_value = "-")]
    output: Utf8PathBuf,

    /// Forward records as they are read instead of loading the whole archive
    #[clap(long)]
    streaming: bool,

    #[clap(flatten)]
    template: TemplateOpts,

    /// Entry to replace
    #[clap(long, default_value = DEFAULT_TARGET)]
    target: String,

    /// Name the replaced entry is moved to; must be as long as the target
    #[clap(long, default_value = DEFAULT_RENAME)]
    rename_to: String,
}

impl InjectOpts {
    #[instrument(skip_all, fields(input = %self.input, output = %self.output))]
    pub(crate) fn run(&self) -> Result<()> {
        let injector = Injector::new(self.template.template()?)?.with_names(&self.target, &self.rename_to)?;
        let payload = std::fs::read(&self.payload)
            .with_context(|| format!("Reading payload {}", self.payload))?;

        let mut src = open_input(&self.input)?;
        check_input_format(&mut src)?;

        if self.streaming {
            write_output(&self.output, |dst| {
                injector
                    .rewrite_streaming(&mut src, dst, &payload)
                    .with_context(|| format!("Rewriting {}", self.input))
            })?;
        } else {
            let mut input = Vec::new();
            src.read_to_end(&mut input)
                .with_context(|| format!("Reading {}", self.input))?;
            let out = injector
                .rewrite_buffered(&input, &payload)
                .with_context(|| format!("Rewriting {}", self.input))?;
            write_output(&self.output, |dst: &mut dyn Write| {
                dst.write_all(&out).context("Writing output")
            })?;
        }

        info!(
            "injected {} byte {} into {}",
            payload.len(),
            String::from_utf8_lossy(injector.target()),
            self.output
        );
        Ok(())
    }
}
