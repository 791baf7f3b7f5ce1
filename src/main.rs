#![deny(rust_2018_idioms, clippy::all, clippy::pedantic)]
#![allow(
    clippy::too_many_lines,
    clippy::cast_possible_truncation,
    clippy::single_match_else
)]

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, ensure, Context, Result};
use arboard::Clipboard;
use crossbeam_channel::select;
use crossterm::event::KeyCode;
use kode_core::{Account, DecodeMode, Digits, ExposeSecret, Key, Settings};
use kode_gen::{Params, Refresher, SystemClock, Window};
use kode_store::Store;
use tracing_subscriber::EnvFilter;
use tui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    widgets::{Block, Borders, Gauge},
};

use crate::{
    cli::{Command, Opt, SettingsArgs},
    widgets::{CodeDialog, HelpDialog, List, ListState, ScrollBar},
};

mod cli;
mod terminal;
mod widgets;

/// Environment variable to configure the log filter.
const LOG_ENV: &str = "KODE_LOG";

fn main() -> Result<()> {
    let opt = Opt::parse();
    init_logging(opt.cmd.is_none());

    let path = match opt.store {
        Some(path) => path,
        None => Store::default_path()?,
    };

    opt.cmd.map_or_else(
        || run(&path),
        |cmd| match cmd {
            Command::Add { name, secret } => add(&path, &name, &secret),
            Command::Remove { name } => remove(&path, &name),
            Command::List => list(&path),
            Command::Show { name } => show(&path, &name),
            Command::Scan { text } => scan(&path, &text),
            Command::Import { file } => import(&path, &file),
            Command::Export { file } => export(&path, file),
            Command::Settings(args) => settings(&path, args),
            Command::Completions { shell } => cli::completions(shell),
            Command::Manpages { dir } => cli::manpages(&dir),
        },
    )
}

/// Log to stderr. The interactive view only logs if explicitly asked for, as any output would
/// garble the screen.
fn init_logging(interactive: bool) {
    let filter = std::env::var(LOG_ENV).ok();
    if interactive && filter.is_none() {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter.as_deref().unwrap_or("warn")))
        .with_writer(std::io::stderr)
        .init();
}

/// Strip whitespace from the secret and make sure it decodes to a usable key.
fn check_secret(secret: &str, mode: DecodeMode) -> Result<String> {
    let secret = kode_store::normalize_secret(secret);

    let key = Key::decode(&secret, mode).context("the secret is not valid base32")?;
    ensure!(
        !key.expose_secret().is_empty(),
        "the secret doesn't contain any base32 characters"
    );

    Ok(secret)
}

fn add(path: &Path, name: &str, secret: &str) -> Result<()> {
    let mut store = Store::open(path)?;

    let name = name.trim();
    ensure!(!name.is_empty(), "the account name must not be empty");
    let secret = check_secret(secret, store.settings().decode_mode())?;

    if store.get(name).is_some() && !confirm(&format!("Account `{name}` already exists"))? {
        println!("Adding cancelled");
        return Ok(());
    }

    store.insert(Account::new(name, secret));
    store.save()?;

    println!("Account added");

    Ok(())
}

fn remove(path: &Path, name: &str) -> Result<()> {
    let mut store = Store::open(path)?;

    ensure!(store.remove(name), "no account named `{name}`");
    store.save()?;

    println!("Account removed");

    Ok(())
}

fn list(path: &Path) -> Result<()> {
    let store = Store::open(path)?;

    for account in store.list().values() {
        let params = account.params(store.settings());
        println!(
            "{} ({}, {} digits, {}s)",
            account.name, params.algorithm, params.digits, params.period
        );
    }

    Ok(())
}

fn show(path: &Path, name: &str) -> Result<()> {
    let store = Store::open(path)?;
    let needle = name.to_lowercase();

    let acc = store.get(name).or_else(|| {
        store
            .list()
            .values()
            .find(|a| a.name.to_lowercase().contains(&needle))
    });

    match acc {
        Some(acc) => {
            let totp = kode_gen::try_generate(&acc.secret, &acc.params(store.settings()))
                .with_context(|| format!("failed generating a code for `{}`", acc.name))?;

            println!("{}", acc.name);
            println!("{} ({}s left)", totp.code, totp.window.remaining);
        }
        None => bail!("no account found containing `{name}`"),
    }

    Ok(())
}

fn scan(path: &Path, text: &str) -> Result<()> {
    let parsed = kode_core::parse_otpauth_uri(text.trim())
        .context("not a valid authenticator code")?;
    let mut account = Account::from(parsed);

    let mut store = Store::open(path)?;
    account.secret = check_secret(&account.secret, store.settings().decode_mode())
        .with_context(|| format!("unusable secret for `{}`", account.name))?;

    if store.get(&account.name).is_some()
        && !confirm(&format!("Account `{}` already exists", account.name))?
    {
        println!("Scan cancelled");
        return Ok(());
    }

    println!("Account: {}", account.name);
    store.insert(account);
    store.save()?;

    Ok(())
}

fn import(path: &Path, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("failed reading `{}`", file.display()))?;

    let mut store = Store::open(path)?;
    let count = store.import_json(&content)?;
    store.save()?;

    println!("Imported {count} account(s)");

    Ok(())
}

fn export(path: &Path, file: Option<PathBuf>) -> Result<()> {
    let store = Store::open(path)?;
    let file = file.unwrap_or_else(|| PathBuf::from(kode_store::export_name()));

    fs::write(&file, store.export_json()?)
        .with_context(|| format!("failed writing `{}`", file.display()))?;

    println!(
        "Exported {} account(s) to `{}`",
        store.list().len(),
        file.display()
    );

    Ok(())
}

fn settings(path: &Path, args: SettingsArgs) -> Result<()> {
    let mut store = Store::open(path)?;
    let mut settings = store.settings().clone();

    let changed = apply_settings(&mut settings, args)?;
    if changed {
        store.set_settings(settings.clone());
        store.save()?;
        println!("Settings saved");
    }

    println!("code length:    {}", settings.code_length);
    println!("refresh period: {}s", settings.refresh_period);
    println!("algorithm:      {}", settings.algorithm);
    println!("auto backup:    {}", settings.auto_backup);
    println!("strict secrets: {}", settings.strict_secrets);

    Ok(())
}

fn apply_settings(settings: &mut Settings, args: SettingsArgs) -> Result<bool> {
    let mut changed = false;

    if let Some(code_length) = args.code_length {
        settings.code_length = Digits::try_from(code_length)?;
        changed = true;
    }
    if let Some(period) = args.refresh_period {
        settings.refresh_period = period;
        changed = true;
    }
    if let Some(algorithm) = args.algorithm {
        settings.algorithm = algorithm;
        changed = true;
    }
    if let Some(auto_backup) = args.auto_backup {
        settings.auto_backup = auto_backup;
        changed = true;
    }
    if let Some(strict) = args.strict_secrets {
        settings.strict_secrets = strict;
        changed = true;
    }

    Ok(changed)
}

fn confirm(question: &str) -> Result<bool> {
    println!("{question}");
    let resp = rprompt::prompt_reply_stdout("Overwrite? [yN] ")?;

    Ok(is_yes(&resp))
}

fn is_yes(reply: &str) -> bool {
    matches!(reply.trim(), "y" | "Y")
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum CurrentDialog {
    None,
    Help,
    Code,
}

fn run(path: &Path) -> Result<()> {
    let store = Store::open(path)?;
    let settings = store.settings().clone();
    let accounts = store.list().values().cloned().collect::<Vec<_>>();

    let mut terminal = terminal::create()?;
    let events = terminal::create_event_listener();
    let ticker = crossbeam_channel::tick(Duration::from_millis(1000));
    let mut clipboard = Clipboard::new()?;

    let mut list_state = ListState::default();
    let mut refresher = Refresher::default();
    let mut otp_code = String::new();

    let mut showing = CurrentDialog::None;

    'draw: loop {
        let selected = accounts.get(list_state.selection());
        let params = selected.map_or_else(|| Params::from(&settings), |acc| acc.params(&settings));
        let window = Window::now(&SystemClock, params.period)?;

        if showing == CurrentDialog::Code {
            if refresher.poll(&window) {
                otp_code = selected.map_or_else(
                    || kode_gen::sentinel(params.digits),
                    |acc| kode_gen::generate(&acc.secret, &params),
                );
            }
        } else if !otp_code.is_empty() {
            otp_code.clear();
            refresher.reset();
        }

        terminal.draw(|f| {
            let area = f.size();
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(5), Constraint::Percentage(100)])
                .split(area);

            let gauge = Gauge::default()
                .block(Block::default().borders(Borders::ALL))
                .gauge_style(Style::default().fg(Color::Green).bg(Color::DarkGray))
                .label(format!("{}s", window.remaining))
                .ratio(window.remaining_percentage() / 100.0);

            let list = List::new(&accounts, &settings)
                .block(Block::default().borders(Borders::ALL))
                .scrollbar(ScrollBar::default(), 2);

            f.render_widget(gauge, chunks[0]);
            f.render_stateful_widget(list, chunks[1], &mut list_state);

            match showing {
                CurrentDialog::None => {}
                CurrentDialog::Help => f.render_widget(HelpDialog, area),
                CurrentDialog::Code => f.render_widget(
                    CodeDialog::new(selected.map_or("", |a| a.name.as_str()), &otp_code),
                    area,
                ),
            }
        })?;

        let value = select! {
            recv(ticker) -> _ => None,
            recv(events) -> event => event.ok(),
        };

        if let Some(event) = value {
            match event.code {
                KeyCode::Esc | KeyCode::Char('q') => break 'draw,
                KeyCode::Up => {
                    if list_state.up() {
                        refresher.reset();
                    }
                }
                KeyCode::Down => {
                    if list_state.down(&accounts) {
                        refresher.reset();
                    }
                }
                KeyCode::Char('h') => toggle_dialog(&mut showing, CurrentDialog::Help),
                KeyCode::Char('s') => toggle_dialog(&mut showing, CurrentDialog::Code),
                KeyCode::Char('c') => {
                    if let Some(acc) = selected {
                        match kode_gen::try_generate(&acc.secret, &params) {
                            Ok(totp) => clipboard.set_text(totp.code.to_string())?,
                            Err(e) => {
                                tracing::warn!(account = %acc.name, error = %e, "nothing copied");
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }

    Ok(())
}

fn toggle_dialog(showing: &mut CurrentDialog, dialog: CurrentDialog) {
    *showing = if *showing == dialog {
        CurrentDialog::None
    } else {
        dialog
    };
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU64;

    use kode_core::Algorithm;

    use super::*;

    #[test]
    fn settings_unchanged_without_args() {
        let mut settings = Settings::default();
        let changed = apply_settings(
            &mut settings,
            SettingsArgs {
                code_length: None,
                refresh_period: None,
                algorithm: None,
                auto_backup: None,
                strict_secrets: None,
            },
        )
        .unwrap();

        assert!(!changed);
        assert_eq!(Settings::default(), settings);
    }

    #[test]
    fn settings_applied() {
        let mut settings = Settings::default();
        let changed = apply_settings(
            &mut settings,
            SettingsArgs {
                code_length: Some(8),
                refresh_period: NonZeroU64::new(60),
                algorithm: Some(Algorithm::Sha512),
                auto_backup: Some(true),
                strict_secrets: Some(true),
            },
        )
        .unwrap();

        assert!(changed);
        assert_eq!(
            Settings {
                code_length: Digits::EIGHT,
                refresh_period: NonZeroU64::new(60).unwrap(),
                algorithm: Algorithm::Sha512,
                auto_backup: true,
                strict_secrets: true,
            },
            settings
        );
    }

    #[test]
    fn invalid_code_length() {
        let mut settings = Settings::default();
        let result = apply_settings(
            &mut settings,
            SettingsArgs {
                code_length: Some(7),
                refresh_period: None,
                algorithm: None,
                auto_backup: None,
                strict_secrets: None,
            },
        );

        assert!(result.is_err());
    }

    #[test]
    fn show_and_scan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        scan(
            &path,
            "otpauth://totp/Example:alice@example.com?secret=JBSWY3DPEHPK3PXP&issuer=Example",
        )
        .unwrap();
        show(&path, "alice").unwrap();
        assert!(show(&path, "bob").is_err());
        assert!(scan(&path, "https://example.com").is_err());

        let store = Store::open(&path).unwrap();
        assert!(store.get("Example (alice@example.com)").is_some());
    }

    fn strict_store(path: &Path) -> Store {
        let mut store = Store::open(path).unwrap();
        store.set_settings(Settings {
            strict_secrets: true,
            ..Settings::default()
        });
        store.save().unwrap();
        store
    }

    #[test]
    fn add_strips_whitespace_before_strict_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        strict_store(&path);

        add(&path, "  mail ", "JBSW Y3DP EHPK 3PXP").unwrap();

        let store = Store::open(&path).unwrap();
        assert_eq!("JBSWY3DPEHPK3PXP", store.get("mail").unwrap().secret);

        assert!(add(&path, "broken", "JBSW Y3DP EHPK 3PX!").is_err());
        assert!(add(&path, "   ", "JBSWY3DPEHPK3PXP").is_err());
        assert!(Store::open(&path).unwrap().get("broken").is_none());
    }

    #[test]
    fn add_rejects_empty_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        assert!(add(&path, "empty", "!!!!").is_err());
        assert!(Store::open(&path).unwrap().list().is_empty());
    }

    #[test]
    fn scan_checks_secret() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        assert!(scan(&path, "otpauth://totp/empty?secret=!!!!").is_err());

        strict_store(&path);
        assert!(scan(&path, "otpauth://totp/broken?secret=JBSWY3DPEHPK3PX!").is_err());
        scan(&path, "otpauth://totp/fine?secret=JBSWY3DPEHPK3PXP").unwrap();

        let store = Store::open(&path).unwrap();
        assert!(store.get("broken").is_none());
        assert!(store.get("fine").is_some());
    }

    #[test]
    fn confirmation_replies() {
        assert!(is_yes("y"));
        assert!(is_yes("Y\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yes please"));
    }

    #[test]
    fn show_reports_strict_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let mut store = Store::open(&path).unwrap();
        store.set_settings(Settings {
            strict_secrets: true,
            ..Settings::default()
        });
        store.insert(Account::new("broken", "JBSWY3DPEHPK3PX!"));
        store.save().unwrap();

        assert!(show(&path, "broken").is_err());
    }
}
