//! Line-based command console
//!
//! The binary reads one command per line from stdin:
//!
//! ```text
//! play [location]     pause     resume     toggle     stop
//! seek <fraction>     seek-ms <ms>
//! ff    rew           (absolute step)
//! ff%   rew%          (relative step)
//! vol+  vol-  vol <v>      left  right  balance <b>     mute
//! rate <x>            loop off|playlist|song
//! suspend  activate   status    help    quit
//! ```

use crate::error::{Error, Result};
use crate::playback::{MediaItem, SeekUnit};
use crate::service::TransportCommand;
use cadence_common::events::LoopMode;

pub const HELP: &str = "\
commands:
  play [location]       play the active item, or load a location
  pause | resume | toggle | stop
  seek <0..1>           seek to a fraction of the duration
  seek-ms <ms>          seek to an absolute position
  ff | rew              step forward/back by the configured time
  ff% | rew%            step forward/back by the configured fraction
  vol+ | vol- | vol <v> volume
  left | right | balance <b>
  mute                  toggle mute
  rate <x>              playback rate
  loop off|playlist|song
  suspend | activate    persist / restore the session
  status | help | quit";

/// A parsed console line
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Transport(TransportCommand),
    Help,
    Quit,
}

/// Parse one console line
pub fn parse_command(line: &str) -> Result<ConsoleCommand> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "" => return Err(Error::InvalidArgument("empty command".to_string())),
        "help" | "?" => return Ok(ConsoleCommand::Help),
        "quit" | "exit" | "q" => return Ok(ConsoleCommand::Quit),

        "play" if rest.is_empty() => TransportCommand::Play(None),
        "play" => TransportCommand::Play(Some(MediaItem::from_location(rest))),
        "pause" => TransportCommand::Pause,
        "resume" => TransportCommand::Resume,
        "toggle" => TransportCommand::TogglePause,
        "stop" => TransportCommand::Stop,

        "seek" => TransportCommand::SeekFraction(number(word, rest)?),
        "seek-ms" => TransportCommand::SeekTo(
            rest.parse()
                .map_err(|_| Error::InvalidArgument(format!("seek-ms needs milliseconds, got '{}'", rest)))?,
        ),
        "ff" => TransportCommand::SeekForward(SeekUnit::Absolute),
        "rew" => TransportCommand::SeekBackward(SeekUnit::Absolute),
        "ff%" => TransportCommand::SeekForward(SeekUnit::Relative),
        "rew%" => TransportCommand::SeekBackward(SeekUnit::Relative),

        "vol+" => TransportCommand::VolumeUp,
        "vol-" => TransportCommand::VolumeDown,
        "vol" => TransportCommand::SetVolume(number(word, rest)?),
        "left" => TransportCommand::BalanceLeft,
        "right" => TransportCommand::BalanceRight,
        "balance" => TransportCommand::SetBalance(number(word, rest)?),
        "mute" => TransportCommand::ToggleMute,
        "rate" => TransportCommand::SetRate(number(word, rest)?),
        "loop" => TransportCommand::SetLoopMode(rest.parse::<LoopMode>()?),

        "suspend" => TransportCommand::Suspend,
        "activate" => TransportCommand::Activate,
        "status" => TransportCommand::Status,

        other => return Err(Error::InvalidArgument(format!("unknown command '{}' (try 'help')", other))),
    };
    Ok(ConsoleCommand::Transport(command))
}

fn number(command: &str, arg: &str) -> Result<f64> {
    arg.parse()
        .map_err(|_| Error::InvalidArgument(format!("{} needs a number, got '{}'", command, arg)))
}
