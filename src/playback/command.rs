//! Interactive playback commands read from stdin.

use super::controller::{PlaybackController, Speed};
use super::scheduler::Scheduler;
use clap::ValueEnum;

/// A single line of user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Toggle,
    Play,
    Pause,
    Reset,
    Speed(Speed),
    Year(i32),
    Quit,
}

impl Command {
    /// Parse a line. An empty line toggles play/pause; a bare number jumps to that year.
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let Some(head) = words.next() else {
            return Some(Command::Toggle);
        };
        let arg = words.next();

        match head.to_lowercase().as_str() {
            "p" | "toggle" => Some(Command::Toggle),
            "play" => Some(Command::Play),
            "pause" => Some(Command::Pause),
            "r" | "reset" => Some(Command::Reset),
            "q" | "quit" | "exit" => Some(Command::Quit),
            "s" | "speed" => Speed::from_str(arg?, true).ok().map(Command::Speed),
            "y" | "year" => arg?.parse().ok().map(Command::Year),
            other => other.parse().ok().map(Command::Year),
        }
    }

    /// Apply to a controller. `Quit` is left to the caller.
    pub fn apply<S: Scheduler>(self, controller: &mut PlaybackController<S>) {
        match self {
            Command::Toggle => controller.toggle(),
            Command::Play => controller.play(),
            Command::Pause => controller.pause(),
            Command::Reset => controller.reset(),
            Command::Speed(speed) => controller.set_speed(speed),
            Command::Year(year) => controller.set_year(year),
            Command::Quit => {}
        }
    }
}
