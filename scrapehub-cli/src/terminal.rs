//! Standard input/output terminal used by the interactive prompts.

use std::io::{self, BufRead, IsTerminal, Write};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use scrapehub_core::Terminal;

/// Terminal over the process stdin and stdout.
///
/// Masked input switches the tty to raw mode so the typed characters are
/// never echoed. When stdin is not a tty, lines are read as-is.
#[derive(Debug, Default)]
pub struct StdTerminal;

impl StdTerminal {
    pub fn new() -> Self {
        Self
    }
}

/// Leaves raw mode when dropped, also on errors.
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

impl Terminal for StdTerminal {
    fn print(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    fn read_masked(&mut self) -> io::Result<Option<String>> {
        if !io::stdin().is_terminal() {
            return self.read_line();
        }

        let mut input = String::new();
        {
            let guard = RawModeGuard::enable()?;
            loop {
                let Event::Key(key) = event::read()? else {
                    continue;
                };
                match read_key(key, &mut input) {
                    KeyOutcome::Continue => {}
                    KeyOutcome::Submit => break,
                    KeyOutcome::EndOfInput => {
                        drop(guard);
                        self.print("\n")?;
                        return Ok(None);
                    }
                    KeyOutcome::Interrupt => {
                        drop(guard);
                        self.print("\n")?;
                        return Err(io::Error::new(io::ErrorKind::Interrupted, "input interrupted"));
                    }
                }
            }
        }
        self.print("\n")?;
        Ok(Some(input))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Submit,
    EndOfInput,
    Interrupt,
}

/// Apply one key press to the masked buffer.
fn read_key(key: KeyEvent, input: &mut String) -> KeyOutcome {
    // Only presses; repeats and releases are reported on some platforms.
    if key.kind != KeyEventKind::Press {
        return KeyOutcome::Continue;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => KeyOutcome::Submit,
        KeyCode::Char('c') if ctrl => KeyOutcome::Interrupt,
        KeyCode::Char('d') if ctrl && input.is_empty() => KeyOutcome::EndOfInput,
        KeyCode::Char('u') if ctrl => {
            input.clear();
            KeyOutcome::Continue
        }
        KeyCode::Char(c) if !ctrl => {
            input.push(c);
            KeyOutcome::Continue
        }
        KeyCode::Backspace => {
            input.pop();
            KeyOutcome::Continue
        }
        _ => KeyOutcome::Continue,
    }
}
