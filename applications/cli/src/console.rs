//! Line-oriented console
//!
//! Each stdin line is one command. Indexes are 1-based on the console and
//! converted to the controller's 0-based positions here.

use crate::error::{CliError, Result};
use crossplay_core::{Provider, Track};
use crossplay_playback::{PlaybackEvent, PlayerCommand, SessionState};
use std::fmt::Write as _;

pub const HELP: &str = "\
commands:
  play <provider> <id> <duration> [title]   replace the queue and play
  add <provider> <id> <duration> [title]    append to the queue
  toggle                                    play/pause
  next | prev                               skip
  seek <position>                           seconds or m:ss
  vol <0-100>                               master volume
  select <n>                                play queue entry n
  remove <provider> <id>                    drop a track from the queue
  move <from> <to>                          reorder the queue
  clear                                     empty the queue
  status                                    show the session
  quit";

/// What a console line asks for
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Player(PlayerCommand),
    Status,
    Help,
    Quit,
}

fn invalid(msg: impl Into<String>) -> CliError {
    CliError::Command(msg.into())
}

/// Parse one console line; blank lines yield `None`
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "play" => ConsoleCommand::Player(PlayerCommand::PlayTrack(parse_track(&args)?)),
        "add" => ConsoleCommand::Player(PlayerCommand::AddToQueue(parse_track(&args)?)),
        "toggle" | "pause" | "p" => ConsoleCommand::Player(PlayerCommand::TogglePlayPause),
        "next" | "n" => ConsoleCommand::Player(PlayerCommand::PlayNext),
        "prev" | "previous" => ConsoleCommand::Player(PlayerCommand::PlayPrevious),
        "seek" => {
            let position = args.first().ok_or_else(|| invalid("seek needs a position"))?;
            ConsoleCommand::Player(PlayerCommand::Seek(parse_position(position)?))
        }
        "vol" | "volume" => {
            let percent: u8 = args
                .first()
                .ok_or_else(|| invalid("vol needs a value"))?
                .parse()
                .map_err(|_| invalid("volume must be 0-100"))?;
            if percent > 100 {
                return Err(invalid("volume must be 0-100"));
            }
            ConsoleCommand::Player(PlayerCommand::SetVolume(f32::from(percent) / 100.0))
        }
        "select" => ConsoleCommand::Player(PlayerCommand::SelectIndex(parse_index(args.first())?)),
        "remove" | "rm" => {
            let [provider, id] = args[..] else {
                return Err(invalid("usage: remove <provider> <id>"));
            };
            ConsoleCommand::Player(PlayerCommand::RemoveTrack {
                id: id.to_string(),
                provider: parse_provider(provider)?,
            })
        }
        "move" | "mv" => {
            let [from, to] = args[..] else {
                return Err(invalid("usage: move <from> <to>"));
            };
            ConsoleCommand::Player(PlayerCommand::Reorder {
                from: parse_index(Some(&from))?,
                to: parse_index(Some(&to))?,
            })
        }
        "clear" => ConsoleCommand::Player(PlayerCommand::Clear),
        "status" | "s" => ConsoleCommand::Status,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" | "q" => ConsoleCommand::Quit,
        other => return Err(invalid(format!("unknown command '{other}', try 'help'"))),
    };
    Ok(Some(command))
}

fn parse_provider(word: &str) -> Result<Provider> {
    word.parse().map_err(|e: crossplay_core::CoreError| invalid(e.to_string()))
}

fn parse_index(word: Option<&&str>) -> Result<usize> {
    let n: usize = word
        .ok_or_else(|| invalid("missing queue position"))?
        .parse()
        .map_err(|_| invalid("queue positions are numbers"))?;
    n.checked_sub(1)
        .ok_or_else(|| invalid("queue positions start at 1"))
}

/// `90`, `1:30` and `1:02:03` are all accepted
pub fn parse_position(word: &str) -> Result<u64> {
    let mut seconds: u64 = 0;
    for part in word.split(':') {
        let value: u64 = part
            .parse()
            .map_err(|_| invalid(format!("bad position '{word}'")))?;
        seconds = seconds * 60 + value;
    }
    Ok(seconds * 1000)
}

/// Play URI the provider expects for a bare track id
pub fn play_uri(provider: Provider, id: &str) -> String {
    match provider {
        Provider::Spotify => format!("spotify:track:{id}"),
        Provider::SoundCloud => format!("https://api.soundcloud.com/tracks/{id}"),
    }
}

fn parse_track(args: &[&str]) -> Result<Track> {
    let [provider, id, duration, title @ ..] = args else {
        return Err(invalid("usage: <provider> <id> <duration> [title]"));
    };
    let provider = parse_provider(provider)?;
    let duration_ms = parse_position(duration)?;
    let title = if title.is_empty() {
        id.to_string()
    } else {
        title.join(" ")
    };
    Ok(Track::new(*id, provider, play_uri(provider, id), title, duration_ms))
}

fn clock(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// Multi-line session summary
pub fn format_status(state: &SessionState) -> String {
    let mut out = String::new();
    let _ = write!(out, "{:?}", state.status);
    if let Some(track) = &state.current_track {
        let _ = write!(
            out,
            " {} [{}] {}/{}",
            track.title,
            track.provider,
            clock(state.position_ms),
            clock(track.duration_ms)
        );
    }
    let _ = write!(out, "  vol {:.0}%", state.volume * 100.0);

    for (i, track) in state.queue.iter().enumerate() {
        let marker = if state.current_index == Some(i) { '>' } else { ' ' };
        let _ = write!(out, "\n{marker}{:>3}. {} [{}]", i + 1, track.title, track.provider);
    }
    out
}

/// One-line rendering of events worth showing; ticks are skipped
pub fn format_event(event: &PlaybackEvent) -> Option<String> {
    let line = match event {
        PlaybackEvent::StateChanged { status } => format!("{status:?}"),
        PlaybackEvent::TrackChanged { track, index, .. } => {
            format!("now: {}. {} [{}]", index + 1, track.title, track.provider)
        }
        PlaybackEvent::ProviderReady { provider, .. } => format!("{provider} ready"),
        PlaybackEvent::ProviderUnavailable { provider, message } => {
            format!("{provider} unavailable: {message}")
        }
        PlaybackEvent::TrackUnplayable { track } => {
            format!("cannot play {} ({} unavailable)", track.title, track.provider)
        }
        PlaybackEvent::QueueFinished => "end of queue".to_string(),
        PlaybackEvent::Error { message, .. } => format!("error: {message}"),
        PlaybackEvent::PositionUpdate { .. }
        | PlaybackEvent::QueueChanged { .. }
        | PlaybackEvent::VolumeChanged { .. } => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(line: &str) -> PlayerCommand {
        match parse_line(line).unwrap() {
            Some(ConsoleCommand::Player(command)) => command,
            other => panic!("expected player command, got {other:?}"),
        }
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse_line("   ").unwrap(), None);
    }

    #[test]
    fn add_builds_provider_track() {
        let PlayerCommand::AddToQueue(track) = player("add soundcloud 123 3:05 Night Drive") else {
            panic!("expected add");
        };
        assert_eq!(track.provider, Provider::SoundCloud);
        assert_eq!(track.id, "123");
        assert_eq!(track.title, "Night Drive");
        assert_eq!(track.duration_ms, 185_000);
        assert_eq!(track.play_uri, "https://api.soundcloud.com/tracks/123");
    }

    #[test]
    fn play_defaults_title_to_id() {
        let PlayerCommand::PlayTrack(track) = player("play Spotify 4uLU6h 200") else {
            panic!("expected play");
        };
        assert_eq!(track.title, "4uLU6h");
        assert_eq!(track.play_uri, "spotify:track:4uLU6h");
    }

    #[test]
    fn positions_are_one_based() {
        assert_eq!(player("select 1"), PlayerCommand::SelectIndex(0));
        assert_eq!(player("move 3 1"), PlayerCommand::Reorder { from: 2, to: 0 });
        assert!(parse_line("select 0").is_err());
    }

    #[test]
    fn seek_accepts_clock_format() {
        assert_eq!(player("seek 90"), PlayerCommand::Seek(90_000));
        assert_eq!(player("seek 1:30"), PlayerCommand::Seek(90_000));
        assert!(parse_line("seek abc").is_err());
    }

    #[test]
    fn volume_is_a_percentage() {
        assert_eq!(player("vol 40"), PlayerCommand::SetVolume(0.4));
        assert!(parse_line("vol 140").is_err());
    }

    #[test]
    fn remove_needs_provider_and_id() {
        assert_eq!(
            player("remove spotify abc"),
            PlayerCommand::RemoveTrack {
                id: "abc".into(),
                provider: Provider::Spotify
            }
        );
        assert!(parse_line("remove abc").is_err());
        assert!(parse_line("remove tidal abc").is_err());
    }

    #[test]
    fn unknown_verb_is_rejected() {
        assert!(matches!(parse_line("shuffle"), Err(CliError::Command(_))));
        assert_eq!(parse_line("q").unwrap(), Some(ConsoleCommand::Quit));
    }

    #[test]
    fn status_lists_queue_with_cursor() {
        let state = SessionState {
            queue: vec![
                Track::new("a", Provider::Spotify, "spotify:track:a", "First", 60_000),
                Track::new("b", Provider::SoundCloud, "sc", "Second", 60_000),
            ],
            current_index: Some(1),
            ..SessionState::default()
        };
        let text = format_status(&state);
        assert!(text.contains(">  2. Second [soundcloud]"));
        assert!(text.contains("   1. First [spotify]"));
    }

    #[test]
    fn ticks_are_not_printed() {
        assert!(format_event(&PlaybackEvent::PositionUpdate {
            position_ms: 1,
            duration_ms: 2
        })
        .is_none());
        assert_eq!(
            format_event(&PlaybackEvent::QueueFinished).as_deref(),
            Some("end of queue")
        );
    }
}
