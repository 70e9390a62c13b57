use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver};
use std::thread;

use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsoleCommand {
    Help,
    Page { name: String },
    Wander { enabled: bool },
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConsoleInput {
    Command(ConsoleCommand),
    /// Free text for the active page: a quiz answer or a chat message.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CommandParseError {
    pub(crate) reason: String,
    pub(crate) usage: &'static str,
}

pub(crate) const HELP_TEXT: &str = "/page <name>  switch page\n\
/wander on|off  toggle wandering\n\
/quit  exit\n\
anything else goes to the active page";

/// Lines starting with `/` are commands; blank lines yield `None`.
pub(crate) fn parse_console_line(line: &str) -> Option<Result<ConsoleInput, CommandParseError>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let Some(command_line) = trimmed.strip_prefix('/') else {
        return Some(Ok(ConsoleInput::Text(trimmed.to_string())));
    };

    let mut tokens = command_line.split_whitespace();
    let name = tokens.next().unwrap_or_default().to_ascii_lowercase();
    let args = tokens.collect::<Vec<_>>();
    let parsed = match name.as_str() {
        "help" => Ok(ConsoleCommand::Help),
        "quit" | "exit" => Ok(ConsoleCommand::Quit),
        "page" => match args.as_slice() {
            [page] => Ok(ConsoleCommand::Page {
                name: page.to_string(),
            }),
            _ => Err(CommandParseError {
                reason: "expected exactly one page name".to_string(),
                usage: "/page <name>",
            }),
        },
        "wander" => match args.as_slice() {
            ["on"] => Ok(ConsoleCommand::Wander { enabled: true }),
            ["off"] => Ok(ConsoleCommand::Wander { enabled: false }),
            _ => Err(CommandParseError {
                reason: "expected 'on' or 'off'".to_string(),
                usage: "/wander on|off",
            }),
        },
        other => Err(CommandParseError {
            reason: format!("unknown command '/{other}'"),
            usage: "/help",
        }),
    };
    Some(parsed.map(ConsoleInput::Command))
}

/// Reads lines on a background thread. The receiver disconnects at EOF.
pub(crate) fn spawn_line_reader<R>(reader: R, thread_name: &str) -> io::Result<Receiver<String>>
where
    R: BufRead + Send + 'static,
{
    let (sender, receiver) = mpsc::channel();
    thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || {
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if sender.send(line).is_err() {
                            break;
                        }
                    }
                    Err(error) => {
                        warn!(error = %error, "console_read_failed");
                        break;
                    }
                }
            }
            debug!("console_reader_stopped");
        })?;
    Ok(receiver)
}

pub(crate) fn spawn_stdin_reader() -> io::Result<Receiver<String>> {
    spawn_line_reader(io::BufReader::new(io::stdin()), "console_stdin")
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::time::Duration;

    use super::*;

    #[test]
    fn plain_text_is_forwarded_trimmed() {
        assert_eq!(
            parse_console_line("  hello buddy \n"),
            Some(Ok(ConsoleInput::Text("hello buddy".to_string())))
        );
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_console_line("   "), None);
    }

    #[test]
    fn commands_parse_arguments() {
        assert_eq!(
            parse_console_line("/page chat"),
            Some(Ok(ConsoleInput::Command(ConsoleCommand::Page {
                name: "chat".to_string()
            })))
        );
        assert_eq!(
            parse_console_line("/WANDER off"),
            Some(Ok(ConsoleInput::Command(ConsoleCommand::Wander {
                enabled: false
            })))
        );
        assert_eq!(
            parse_console_line("/quit"),
            Some(Ok(ConsoleInput::Command(ConsoleCommand::Quit)))
        );
    }

    #[test]
    fn bad_arguments_report_usage() {
        let err = parse_console_line("/wander maybe")
            .expect("line")
            .expect_err("bad arg");
        assert_eq!(err.usage, "/wander on|off");

        let err = parse_console_line("/dance").expect("line").expect_err("unknown");
        assert!(err.reason.contains("/dance"));
    }

    #[test]
    fn line_reader_forwards_every_line_then_disconnects() {
        let receiver =
            spawn_line_reader(Cursor::new("one\ntwo\r\n"), "test_reader").expect("spawn");
        let timeout = Duration::from_secs(5);
        assert_eq!(receiver.recv_timeout(timeout).expect("one"), "one");
        assert_eq!(receiver.recv_timeout(timeout).expect("two"), "two");
        assert!(receiver.recv_timeout(timeout).is_err());
    }
}
