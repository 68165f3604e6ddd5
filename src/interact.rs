use std::io::{self, BufRead, Write};
use std::process::{Command, Stdio};

use anyhow::{Context as _, Result};

/// Everything the flow needs from the person at the keyboard.
#[cfg_attr(test, mockall::automock)]
pub trait Interaction {
    /// Shows `message` and returns the next input line, trimmed.
    fn prompt(&mut self, message: &str) -> Result<String>;

    /// Fire-and-forget.
    fn open_browser(&mut self, url: &str) -> Result<()>;
}

pub struct Console<R, W> {
    input: R,
    output: W,
}

impl Console<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Console::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Console { input, output }
    }
}

fn opener(os: &str, url: &str) -> Command {
    match os {
        "macos" => {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        }
        // not `cmd /C start`: cmd would split the url at '&'
        "windows" => {
            let mut cmd = Command::new("rundll32");
            cmd.args(["url.dll,FileProtocolHandler", url]);
            cmd
        }
        _ => {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }
}

impl<R: BufRead, W: Write> Interaction for Console<R, W> {
    fn prompt(&mut self, message: &str) -> Result<String> {
        write!(self.output, "{}", message).context("Failed to write prompt")?;
        self.output.flush().context("Failed to flush prompt")?;

        let mut line = String::new();
        self.input
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim().to_string())
    }

    fn open_browser(&mut self, url: &str) -> Result<()> {
        let spawned = opener(std::env::consts::OS, url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();
        match spawned {
            // not waited on here; a detached thread reaps the opener
            Ok(mut child) => {
                std::thread::spawn(move || {
                    if let Err(err) = child.wait() {
                        tracing::debug!(%err, "browser opener wait failed");
                    }
                });
            }
            // the url is printed as well, so the user can still open it by hand
            Err(err) => tracing::warn!(%err, "could not launch a browser"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_writes_message_and_trims_answer() {
        let mut out = Vec::new();
        let mut console = Console::new(&b"  y \nignored\n"[..], &mut out);
        assert_eq!(console.prompt("Continue? ").unwrap(), "y");
        drop(console);
        assert_eq!(out, b"Continue? ");
    }

    #[test]
    fn prompt_at_eof_is_empty() {
        let mut console = Console::new(&b""[..], Vec::new());
        assert_eq!(console.prompt("key: ").unwrap(), "");
    }

    const AUTH_URL: &str = "https://getpocket.com/auth/authorize?request_token=abc&redirect_uri=https%3A%2F%2Fgoogle.com%2F";

    fn command_line(cmd: &Command) -> Vec<String> {
        std::iter::once(cmd.get_program())
            .chain(cmd.get_args())
            .map(|part| part.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn windows_opener_passes_url_untouched_without_cmd() {
        let cmd = opener("windows", AUTH_URL);
        assert_eq!(
            command_line(&cmd),
            ["rundll32", "url.dll,FileProtocolHandler", AUTH_URL]
        );
    }

    #[test]
    fn unix_openers() {
        assert_eq!(command_line(&opener("macos", AUTH_URL)), ["open", AUTH_URL]);
        assert_eq!(command_line(&opener("linux", AUTH_URL)), ["xdg-open", AUTH_URL]);
        assert_eq!(command_line(&opener("freebsd", AUTH_URL)), ["xdg-open", AUTH_URL]);
    }

    #[test]
    fn answers_are_consumed_in_order() {
        let mut console = Console::new(&b"first\r\nsecond\n"[..], Vec::new());
        assert_eq!(console.prompt("").unwrap(), "first");
        assert_eq!(console.prompt("").unwrap(), "second");
    }
}
