//! Implementation of the `create` command.

use camino::Utf8PathBuf;
use color_eyre::eyre::Context;
use color_eyre::Result;
use initramfs_inject::Injector;
use tracing::{info, instrument};

use crate::template::TemplateOpts;
use crate::write_output;

/// Options for the create command
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct CreateOpts {
    /// File to install as init
    #[clap(long, short)]
    payload: Utf8PathBuf,

    /// Where to write the archive, or `-` for stdout
    #[clap(long, short, default_value = "-")]
    output: Utf8PathBuf,

    #[clap(flatten)]
    template: TemplateOpts,
}

impl CreateOpts {
    #[instrument(skip_all, fields(output = %self.output))]
    pub(crate) fn run(&self) -> Result<()> {
        let injector = Injector::new(self.template.template()?)?;
        let payload = std::fs::read(&self.payload)
            .with_context(|| format!("Reading payload {}", self.payload))?;

        write_output(&self.output, |dst| {
            injector
                .create(dst, &payload)
                .context("Writing archive")
        })?;

        info!("created {} with a {} byte init", self.output, payload.len());
        Ok(())
    }
}
