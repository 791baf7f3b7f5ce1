use std::{
    io::{self, Write},
    thread,
};

use anyhow::Result;
use crossbeam_channel::Receiver;
use crossterm::{
    event::{Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use tui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

pub fn create() -> Result<Terminal<impl Backend>> {
    let screen = Screen::new(io::stdout())?;
    let mut backend = CrosstermBackend::new(screen);

    execute!(&mut backend, SetTitle("Kode"))?;

    Terminal::new(backend).map_err(Into::into)
}

/// Output in raw mode on the alternate screen. Both are reverted once dropped, so the user's
/// terminal is restored even if the UI loop exits with an error.
struct Screen<W: Write> {
    output: W,
}

impl<W: Write> Screen<W> {
    fn new(mut output: W) -> Result<Self> {
        crossterm::terminal::enable_raw_mode()?;
        if let Err(e) = execute!(output, EnterAlternateScreen) {
            crossterm::terminal::disable_raw_mode()?;
            return Err(e.into());
        }

        Ok(Self { output })
    }
}

impl<W: Write> Drop for Screen<W> {
    fn drop(&mut self) {
        if let Err(e) = execute!(self.output, LeaveAlternateScreen) {
            tracing::error!(error = %e, "failed switching to main screen");
        }
        if let Err(e) = crossterm::terminal::disable_raw_mode() {
            tracing::error!(error = %e, "failed disabling raw mode");
        }
    }
}

impl<W: Write> Write for Screen<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.output.flush()
    }
}

/// Forward key presses from a background thread, so they can be selected together with the
/// refresh ticker.
pub fn create_event_listener() -> Receiver<KeyEvent> {
    let (tx, rx) = crossbeam_channel::bounded(0);

    thread::spawn(move || {
        while let Ok(event) = crossterm::event::read() {
            match event {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if tx.send(k).is_err() {
                        break;
                    }
                }
                _ => {}
            }
        }
    });

    rx
}
