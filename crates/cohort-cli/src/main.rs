//! `cohort`: manage groups and memberships from the command line.
//!
//! Reads `cohort.toml` (or the path given with `--config`) plus `COHORT_*`
//! environment variables, opens the SQLite store and runs one command.
//! Results are printed as JSON on stdout.
//!
//! ```text
//! cohort codec encode COMMUNITY abc123
//! cohort group upsert course.json
//! cohort member find memberId 0b6d… --group 5f1e…
//! cohort group sync 5f1e… --source COMMUNITY
//! ```
//!
//! Exit codes: 2 invalid request, 3 not found, 4 conflict, 1 anything else.

mod commands;
mod settings;

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use cohort_core::ErrorKind;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{commands::Command, settings::Settings};

#[derive(Parser)]
#[command(name = "cohort", author, version, about = "Cohort group and membership tool")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "cohort.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
  // Logs go to stderr; stdout carries the JSON result.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match run(cli).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      eprintln!("error: {err:#}");
      ExitCode::from(exit_code(&err))
    }
  }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
  // The codec needs neither configuration nor a store.
  if let Command::Codec(codec) = &cli.command {
    return commands::print(&codec.run()?);
  }

  let settings = Settings::load(&cli.config)?;
  commands::run(cli.command, &settings).await
}

fn exit_code(err: &anyhow::Error) -> u8 {
  match err.downcast_ref::<cohort_core::Error>().map(cohort_core::Error::kind) {
    Some(ErrorKind::Validation) => 2,
    Some(ErrorKind::NotFound) => 3,
    Some(ErrorKind::Conflict) => 4,
    _ => 1,
  }
}

#[cfg(test)]
mod tests {
  use anyhow::Context as _;
  use cohort_core::Error;

  use crate::commands::MemberCommand;

  use super::*;

  #[test]
  fn exit_codes_follow_error_kind() {
    let wrapped = Err::<(), _>(Error::NotFound("group x".into()))
      .context("finding group")
      .unwrap_err();
    assert_eq!(exit_code(&wrapped), 3);
    assert_eq!(exit_code(&Error::Conflict("slug".into()).into()), 4);
    assert_eq!(exit_code(&Error::RequestInvalid("bad".into()).into()), 2);
    assert_eq!(exit_code(&anyhow::anyhow!("io")), 1);
  }

  #[test]
  fn cli_parses_nested_commands() {
    let cli = Cli::try_parse_from([
      "cohort", "member", "find", "memberId", "0b6d", "--group", "5f1e",
    ])
    .unwrap();
    assert!(matches!(cli.command, Command::Member(_)));
    assert_eq!(cli.config, PathBuf::from("cohort.toml"));
  }

  #[test]
  fn cli_parses_group_wide_member_update() {
    let cli = Cli::try_parse_from([
      "cohort",
      "member",
      "update-all",
      "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
      "-",
    ])
    .unwrap();
    let Command::Member(MemberCommand::UpdateAll { patch, .. }) = cli.command else {
      panic!("expected member update-all");
    };
    assert_eq!(patch, PathBuf::from("-"));
  }
}
