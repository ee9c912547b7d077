//! `arxsync config`: print the effective configuration.

use anyhow::{Context, Result};
use clap::Args;

use arxsync_core::config;

/// Arguments for `arxsync config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let home = config::home()?;
        let mut effective = config::load_at(&home).context("failed to load configuration")?;
        // Show where records actually go, even when the file leaves it unset.
        effective.store_dir = Some(effective.store_dir_at(&home));

        println!("# {}", config::config_path_at(&home).display());
        print!(
            "{}",
            serde_yaml::to_string(&effective).context("failed to serialize configuration")?
        );
        Ok(())
    }
}
