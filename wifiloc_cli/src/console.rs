//! Line console for `wifiloc run`.
//!
//! One command per line; every reply is a single JSON object. Malformed
//! lines are rejected here with `LocError::InvalidInput` and never reach the
//! tracker.

use serde_json::{Value, json};
use wifiloc_core::{LocError, Mode, Position, Tracker};

pub const HELP: &str = "commands: mode <idle|calibrating|tracking>, scan <on|off>, \
calibrate <x> <y>, move <x> <y>, position, status, clear, map, latest, help, quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mode(Mode),
    Scanning(bool),
    Calibrate(Position),
    Move(Position),
    Position,
    Status,
    Clear,
    Map,
    Latest,
    Help,
    Quit,
}

fn invalid(msg: impl Into<String>) -> LocError {
    LocError::InvalidInput(msg.into())
}

fn coords(cmd: &str, args: &[&str]) -> Result<Position, LocError> {
    match args {
        [x, y] => {
            let x = x
                .parse::<i64>()
                .map_err(|_| invalid(format!("{cmd}: x must be an integer, got `{x}`")))?;
            let y = y
                .parse::<i64>()
                .map_err(|_| invalid(format!("{cmd}: y must be an integer, got `{y}`")))?;
            Ok(Position::new(x, y))
        }
        _ => Err(invalid(format!("{cmd} takes two integer coordinates"))),
    }
}

/// Parse one console line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>, LocError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = words.split_first() else {
        return Ok(None);
    };
    let no_args = |c: Command| {
        if args.is_empty() {
            Ok(Some(c))
        } else {
            Err(invalid(format!("`{head}` takes no arguments")))
        }
    };
    match head {
        "mode" => match args {
            [m] => m
                .parse::<Mode>()
                .map(|m| Some(Command::Mode(m)))
                .map_err(|e| invalid(e.to_string())),
            _ => Err(invalid("mode takes one of idle, calibrating, tracking")),
        },
        "scan" => match args {
            ["on"] => Ok(Some(Command::Scanning(true))),
            ["off"] => Ok(Some(Command::Scanning(false))),
            _ => Err(invalid("scan takes `on` or `off`")),
        },
        "calibrate" => coords(head, args).map(|p| Some(Command::Calibrate(p))),
        "move" => coords(head, args).map(|p| Some(Command::Move(p))),
        "position" => no_args(Command::Position),
        "status" => no_args(Command::Status),
        "clear" => no_args(Command::Clear),
        "map" => no_args(Command::Map),
        "latest" => no_args(Command::Latest),
        "help" => no_args(Command::Help),
        "quit" | "exit" => no_args(Command::Quit),
        other => Err(invalid(format!("unknown command `{other}`"))),
    }
}

fn error_reply(err: &eyre::Report) -> Value {
    match err.downcast_ref::<LocError>() {
        Some(le) => json!({
            "error": le.to_string(),
            "reason": crate::error_fmt::loc_error_name(le),
        }),
        None => json!({ "error": err.to_string() }),
    }
}

/// Run one command against the tracker. Failures become `{"error": ..}`
/// replies; the console keeps going.
pub fn execute(tracker: &Tracker, cmd: &Command) -> Value {
    let result: eyre::Result<Value> = match cmd {
        Command::Mode(m) => tracker.set_mode(*m).map(|m| json!({ "mode": m })),
        Command::Scanning(on) => tracker
            .toggle_scanning(*on)
            .map(|m| json!({ "mode": m, "scanning_active": m.localizes() })),
        Command::Calibrate(at) => tracker.record_fingerprint(*at).map(|fp| {
            json!({
                "recorded": { "x": fp.x, "y": fp.y },
                "networks": fp.readings().len(),
            })
        }),
        Command::Move(to) => Ok(json!({ "position": tracker.manual_move(*to) })),
        Command::Position => Ok(json!({ "position": tracker.position() })),
        Command::Status => Ok(serde_json::to_value(tracker.status()).unwrap_or(Value::Null)),
        Command::Clear => tracker
            .clear_fingerprints()
            .map(|n| json!({ "deleted": n })),
        Command::Map => tracker.map_data().map(|recs| json!({ "map": recs })),
        Command::Latest => tracker.latest_scan().map(|rec| json!({ "latest": rec })),
        Command::Help => Ok(json!({ "help": HELP })),
        Command::Quit => Ok(json!({ "bye": true })),
    };
    result.unwrap_or_else(|e| error_reply(&e))
}

/// Parse and execute one line. Returns `None` for blank lines and whether
/// the console should exit.
pub fn handle_line(tracker: &Tracker, line: &str) -> (Option<Value>, bool) {
    match parse_line(line) {
        Ok(None) => (None, false),
        Ok(Some(cmd)) => {
            tracing::debug!(?cmd, "console command");
            (Some(execute(tracker, &cmd)), cmd == Command::Quit)
        }
        Err(e) => {
            tracing::warn!(error = %e, line, "rejected console input");
            (Some(error_reply(&eyre::Report::new(e))), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wifiloc_core::MemoryStore;
    use wifiloc_scan::{SimulatedScanSource, render_report};

    fn tracker() -> Tracker {
        Tracker::builder()
            .with_scan_source(SimulatedScanSource::new(render_report(
                "aa:bb:cc:dd:ee:ff",
                &[("A", -40), ("B", -70)],
            )))
            .with_store(MemoryStore::new())
            .build()
            .unwrap()
    }

    #[rstest]
    #[case("mode calibrating", Command::Mode(Mode::Calibrating))]
    #[case("  move -3 7 ", Command::Move(Position::new(-3, 7)))]
    #[case("calibrate 10 20", Command::Calibrate(Position::new(10, 20)))]
    #[case("scan on", Command::Scanning(true))]
    #[case("status", Command::Status)]
    #[case("exit", Command::Quit)]
    fn parses_commands(#[case] line: &str, #[case] expected: Command) {
        assert_eq!(parse_line(line).unwrap(), Some(expected));
    }

    #[rstest]
    #[case("mode flying")]
    #[case("mode")]
    #[case("move 1")]
    #[case("move a 2")]
    #[case("calibrate 1 2 3")]
    #[case("status now")]
    #[case("teleport")]
    fn rejects_bad_input(#[case] line: &str) {
        assert!(matches!(parse_line(line), Err(LocError::InvalidInput(_))));
    }

    #[test]
    fn blank_line_is_ignored() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn calibrate_reports_wrong_mode_then_succeeds() {
        let t = tracker();
        let (reply, quit) = handle_line(&t, "calibrate 1 2");
        assert!(!quit);
        assert_eq!(reply.unwrap()["reason"], "WrongMode");

        handle_line(&t, "mode calibrating");
        let (reply, _) = handle_line(&t, "calibrate 1 2");
        let reply = reply.unwrap();
        assert_eq!(reply["networks"], 2);
        assert_eq!(reply["recorded"]["x"], 1);

        let (reply, _) = handle_line(&t, "clear");
        assert_eq!(reply.unwrap()["deleted"], 1);
    }

    #[test]
    fn move_and_position_round_trip() {
        let t = tracker();
        handle_line(&t, "move 4 5");
        let (reply, _) = handle_line(&t, "position");
        let reply = reply.unwrap();
        assert_eq!(reply["position"]["x"], 4);
        assert_eq!(reply["position"]["y"], 5);
    }

    #[test]
    fn status_reports_mode() {
        let t = tracker();
        let (reply, _) = handle_line(&t, "status");
        let reply = reply.unwrap();
        assert_eq!(reply["current_mode"], "idle");
        assert_eq!(reply["scanning_active"], false);
        assert_eq!(reply["store_connected"], true);
    }

    #[test]
    fn quit_requests_exit() {
        let (reply, quit) = handle_line(&tracker(), "quit");
        assert!(quit);
        assert_eq!(reply.unwrap()["bye"], true);
    }
}
