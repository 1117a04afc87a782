//! Command line flags describing the new `init` record.

use color_eyre::eyre::Context;
use color_eyre::Result;
use initramfs_inject::header::S_IFREG;
use initramfs_inject::HeaderTemplate;

/// Metadata of the injected init
#[derive(Debug, Clone, clap::Args)]
pub(crate) struct TemplateOpts {
    /// Permission bits of the new init, in octal
    #[clap(long, default_value = "0755", value_parser = parse_mode)]
    mode: u32,

    /// Modification time of the new init in seconds since the epoch (default: now)
    #[clap(long)]
    mtime: Option<u32>,

    /// Owner of the new init
    #[clap(long, default_value_t = 0)]
    uid: u32,

    /// Group of the new init
    #[clap(long, default_value_t = 0)]
    gid: u32,
}

/// Parse permission bits such as `755`, `0755` or `0o755`.
fn parse_mode(s: &str) -> std::result::Result<u32, String> {
    let digits = s.strip_prefix("0o").unwrap_or(s);
    let mode = u32::from_str_radix(digits, 8).map_err(|e| format!("invalid octal mode {s:?}: {e}"))?;
    if mode > 0o7777 {
        return Err(format!("mode {s} has bits outside 07777"));
    }
    Ok(mode)
}

fn now() -> Result<u32> {
    u32::try_from(chrono::Utc::now().timestamp()).context("Current time does not fit a newc mtime")
}

impl TemplateOpts {
    /// The header template, with the regular file type bits added.
    pub(crate) fn template(&self) -> Result<HeaderTemplate> {
        let mtime = match self.mtime {
            Some(t) => t,
            None => now()?,
        };
        Ok(HeaderTemplate {
            mode: S_IFREG | self.mode,
            mtime,
            uid: self.uid,
            gid: self.gid,
        })
    }
}
