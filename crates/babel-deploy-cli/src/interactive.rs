//! Pre-deploy summary and confirmation prompt.
//!
//! Shown before anything is submitted to a live network. `-y` skips the
//! prompt but the summary is still printed.

use std::io::{self, Write};

use anyhow::Result;
use console::style;
use dialoguer::{Confirm, theme::ColorfulTheme};

use babel_deploy_core::commands::DeploySummary;

pub struct ConfirmFlow<W: Write> {
    writer: W,
    theme: ColorfulTheme,
    yes: bool,
}

impl ConfirmFlow<io::Stderr> {
    pub fn new(yes: bool) -> Self {
        Self::with_writer(io::stderr(), yes)
    }
}

impl<W: Write> ConfirmFlow<W> {
    pub fn with_writer(writer: W, yes: bool) -> Self {
        Self {
            writer,
            theme: ColorfulTheme::default(),
            yes,
        }
    }

    /// Print the summary and ask to proceed.
    pub fn confirm(&mut self, summary: &DeploySummary, rpc_url: &str) -> Result<bool> {
        self.show_summary(summary, rpc_url)?;
        if self.yes {
            return Ok(true);
        }

        let confirmed = Confirm::with_theme(&self.theme)
            .with_prompt("Submit these transactions?")
            .default(false)
            .interact()?;
        Ok(confirmed)
    }

    fn show_summary(&mut self, summary: &DeploySummary, rpc_url: &str) -> Result<()> {
        writeln!(self.writer)?;
        writeln!(self.writer, "{}", style("  Deployment").bold())?;
        writeln!(self.writer, "  ───────────────────────────")?;
        writeln!(self.writer, "  Node:      {}", style(rpc_url).green())?;
        writeln!(self.writer, "  Chain:     {}", style(summary.chain_id).green())?;
        writeln!(self.writer, "  Deployer:  {}", style(summary.deployer).green())?;
        writeln!(self.writer, "  Nonce:     {}", style(summary.start_nonce).green())?;
        writeln!(
            self.writer,
            "  Contracts: {}  Wiring steps: {}",
            style(summary.contracts).green(),
            style(summary.wiring_steps).green()
        )?;
        writeln!(self.writer, "  Plan:      {}", style(&summary.plan[..16.min(summary.plan.len())]).dim())?;
        writeln!(self.writer)?;
        Ok(())
    }
}
