//! Terminal UI surface: prints the log and title to stdout, turns stdin lines into commands.

use multipeer_core::{EventSender, LoopbackHub, Message, MessageLog, Origin, UiCommand, UiSurface};
use tokio::io::{AsyncBufReadExt, BufReader};

/// Parse one input line. Blank lines still become a send; the controller ignores them.
pub fn parse_command(line: &str) -> UiCommand {
    match line.trim() {
        "/clear" => UiCommand::Clear,
        "/browse" => UiCommand::Browse,
        "/quit" | "/exit" => UiCommand::Shutdown,
        _ => UiCommand::Send(line.to_string()),
    }
}

/// Forward stdin lines to the event queue until EOF or the queue closes. EOF shuts down.
pub async fn read_commands(events: EventSender) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let command = parse_command(&line);
                let quit = command == UiCommand::Shutdown;
                if !events.command(command) || quit {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
    events.command(UiCommand::Shutdown);
}

/// Prints only what changed since the last refresh.
pub struct ConsoleSurface {
    hub: LoopbackHub,
    shown: usize,
}

impl ConsoleSurface {
    /// `hub` is used to look up display names of remote peers.
    pub fn new(hub: LoopbackHub) -> Self {
        Self { hub, shown: 0 }
    }

    fn line(&self, m: &Message) -> String {
        match m.origin {
            Origin::Local => format!("me: {}", m.text),
            Origin::Remote(peer) => {
                let who = self.hub.name_of(&peer).unwrap_or_else(|| peer.to_string());
                format!("{}: {}", who, m.text)
            }
        }
    }
}

impl UiSurface for ConsoleSurface {
    fn messages_changed(&mut self, log: &MessageLog) {
        if log.len() < self.shown {
            println!("-- cleared --");
            self.shown = 0;
        }
        for m in log.iter().skip(self.shown) {
            println!("{}", self.line(m));
        }
        self.shown = log.len();
    }

    fn title_changed(&mut self, title: &str) {
        println!("== {} ==", title);
    }

    fn show_alert(&mut self, title: &str, message: &str) {
        println!("[{}] {}", title, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("/clear"), UiCommand::Clear);
        assert_eq!(parse_command(" /browse "), UiCommand::Browse);
        assert_eq!(parse_command("/quit"), UiCommand::Shutdown);
        assert_eq!(parse_command("hello"), UiCommand::Send("hello".into()));
        assert_eq!(parse_command("/clearly"), UiCommand::Send("/clearly".into()));
    }

    #[test]
    fn tracks_shown_lines_across_clear() {
        let mut s = ConsoleSurface::new(LoopbackHub::new());
        let mut log = MessageLog::new();
        log.push("a".into(), Origin::Local);
        log.push("b".into(), Origin::Local);
        s.messages_changed(&log);
        assert_eq!(s.shown, 2);
        log.clear();
        s.messages_changed(&log);
        assert_eq!(s.shown, 0);
        log.push("c".into(), Origin::Local);
        s.messages_changed(&log);
        assert_eq!(s.shown, 1);
    }
}
