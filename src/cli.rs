use std::{
    fs::OpenOptions,
    io::{self, Write},
    num::NonZeroU64,
    path::{Path, PathBuf},
};

use anyhow::{ensure, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueHint};
use clap_complete::Shell;
use kode_core::Algorithm;

#[derive(Parser)]
#[command(about, author, version, propagate_version = true)]
pub struct Opt {
    /// Location of the account store. Defaults to a `store.json` in the user's data directory.
    #[arg(long, global = true, value_hint = ValueHint::FilePath)]
    pub store: Option<PathBuf>,
    #[command(subcommand)]
    pub cmd: Option<Command>,
}

impl Opt {
    pub fn parse() -> Self {
        <Opt as Parser>::parse()
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a new account from its name and base32 secret.
    Add { name: String, secret: String },
    /// Remove an account.
    Remove { name: String },
    /// List all accounts.
    List,
    /// Search for a single account and print the current OTP.
    Show {
        /// Exact account name, or a case-insensitive part of it.
        name: String,
    },
    /// Add an account from the text of a scanned QR code, an `otpauth://totp/...` URL.
    Scan { text: String },
    /// Import accounts from a JSON backup, merging them with the existing ones.
    Import {
        /// The file to import.
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
    },
    /// Export all accounts as JSON backup.
    Export {
        /// Target location of the file. Defaults to `authenticator-backup-<date>.json` in the
        /// current folder.
        #[arg(value_hint = ValueHint::FilePath)]
        file: Option<PathBuf>,
    },
    /// Show or change the global settings.
    Settings(SettingsArgs),
    /// Generate auto-completion scripts for various shells.
    Completions {
        /// Shell to generate an auto-completion script for.
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Generate man pages into the given directory.
    Manpages {
        /// Target directory, that must already exist and be empty. If the any file with the same
        /// name as any of the man pages already exist, it'll not be overwritten, but instead an
        /// error be returned.
        #[arg(value_hint = ValueHint::DirPath)]
        dir: PathBuf,
    },
}

#[derive(Args)]
pub struct SettingsArgs {
    /// Amount of digits of the codes, either 6 or 8.
    #[arg(long)]
    pub code_length: Option<u8>,
    /// Seconds that a code stays valid.
    #[arg(long)]
    pub refresh_period: Option<NonZeroU64>,
    /// Hash function, one of `SHA-1`, `SHA-256` or `SHA-512`.
    #[arg(long)]
    pub algorithm: Option<Algorithm>,
    /// Write a daily backup next to the store.
    #[arg(long, value_name = "BOOL")]
    pub auto_backup: Option<bool>,
    /// Reject secrets with characters outside the base32 alphabet instead of skipping them.
    #[arg(long, value_name = "BOOL")]
    pub strict_secrets: Option<bool>,
}

#[allow(clippy::unnecessary_wraps)]
pub fn completions(shell: Shell) -> Result<()> {
    clap_complete::generate(
        shell,
        &mut Opt::command(),
        env!("CARGO_PKG_NAME"),
        &mut io::stdout().lock(),
    );
    Ok(())
}

pub fn manpages(dir: &Path) -> Result<()> {
    fn print(dir: &Path, app: &clap::Command) -> Result<()> {
        let name = app.get_display_name().unwrap_or_else(|| app.get_name());
        let out = dir.join(format!("{name}.1"));
        let mut out = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&out)
            .with_context(|| format!("the file `{}` already exists", out.display()))?;

        clap_mangen::Man::new(app.clone()).render(&mut out)?;
        out.flush()?;

        for sub in app.get_subcommands() {
            print(dir, sub)?;
        }

        Ok(())
    }

    ensure!(dir.try_exists()?, "target directory doesn't exist");

    let mut app = Opt::command();
    app.build();

    print(dir, &app)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        Opt::command().debug_assert();
    }

    #[test]
    fn parse_settings() {
        let opt = Opt::try_parse_from([
            "kode",
            "settings",
            "--code-length",
            "8",
            "--algorithm",
            "sha256",
            "--auto-backup",
            "true",
        ])
        .unwrap();

        match opt.cmd {
            Some(Command::Settings(args)) => {
                assert_eq!(Some(8), args.code_length);
                assert_eq!(Some(Algorithm::Sha256), args.algorithm);
                assert_eq!(Some(true), args.auto_backup);
                assert_eq!(None, args.refresh_period);
            }
            _ => panic!("expected settings command"),
        }
    }

    #[test]
    fn global_store_flag() {
        let opt = Opt::try_parse_from(["kode", "list", "--store", "/tmp/store.json"]).unwrap();
        assert_eq!(Some(PathBuf::from("/tmp/store.json")), opt.store);
    }
}
