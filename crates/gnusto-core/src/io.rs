//! The engine's I/O boundary: two primitives, `read_line` and `print`, kept
//! deliberately thin so the turn pipeline never assumes a terminal.
//! `TerminalIo` is the minimal runnable frontend; `ScriptedIo` is the test
//! double every scenario test drives instead.
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// One line of player input, or end-of-input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InputLine {
    /// A line of text, with any trailing newline already stripped.
    Line(String),
    /// The input stream is exhausted.
    Eof,
}

/// The engine's only way to talk to the outside world. The engine calls
/// `print` at most once per turn, with the full buffered output for that
/// turn, trailing newline included.
pub trait IoBoundary {
    /// Reads one line of player input, or `Eof` if the stream has ended.
    fn read_line(&mut self) -> InputLine;
    /// Prints one turn's buffered output.
    fn print(&mut self, text: &str);
}

/// The default frontend: buffered stdin/stdout, included as the minimal
/// reference implementation the engine needs to be runnable outside tests.
pub struct TerminalIo {
    stdin: io::BufReader<io::Stdin>,
    stdout: io::Stdout,
}

impl TerminalIo {
    /// Builds a terminal I/O boundary over the process's stdin/stdout.
    pub fn new() -> Self {
        Self { stdin: io::BufReader::new(io::stdin()), stdout: io::stdout() }
    }
}

impl Default for TerminalIo {
    fn default() -> Self {
        Self::new()
    }
}

impl IoBoundary for TerminalIo {
    fn read_line(&mut self) -> InputLine {
        let mut buffer = String::new();
        match self.stdin.read_line(&mut buffer) {
            Ok(0) => InputLine::Eof,
            Ok(_) => InputLine::Line(buffer.trim_end_matches(['\n', '\r']).to_string()),
            Err(_) => InputLine::Eof,
        }
    }

    fn print(&mut self, text: &str) {
        let _ = write!(self.stdout, "{text}");
        let _ = self.stdout.flush();
    }
}

/// A test double that replays a fixed command script and records every
/// printed turn in order, so a scenario test can assert on exact output
/// without a real terminal.
#[derive(Default)]
pub struct ScriptedIo {
    script: VecDeque<String>,
    transcript: Vec<String>,
}

impl ScriptedIo {
    /// Builds a scripted I/O boundary that will hand out `commands` in order,
    /// then report end-of-input.
    pub fn new(commands: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            script: commands.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }

    /// Every string passed to `print` so far, in call order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// The concatenation of every printed turn, for substring assertions.
    pub fn transcript_text(&self) -> String {
        self.transcript.concat()
    }
}

impl IoBoundary for ScriptedIo {
    fn read_line(&mut self) -> InputLine {
        match self.script.pop_front() {
            Some(line) => InputLine::Line(line),
            None => InputLine::Eof,
        }
    }

    fn print(&mut self, text: &str) {
        self.transcript.push(text.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_io_replays_commands_then_reports_eof() {
        let mut io = ScriptedIo::new(["take lamp", "look"]);
        assert_eq!(io.read_line(), InputLine::Line("take lamp".to_string()));
        assert_eq!(io.read_line(), InputLine::Line("look".to_string()));
        assert_eq!(io.read_line(), InputLine::Eof);
    }

    #[test]
    fn scripted_io_records_every_print_in_order() {
        let mut io = ScriptedIo::new(Vec::<String>::new());
        io.print("Taken.\n");
        io.print("You are in the Foyer.\n");
        assert_eq!(io.transcript(), &["Taken.\n".to_string(), "You are in the Foyer.\n".to_string()]);
        assert_eq!(io.transcript_text(), "Taken.\nYou are in the Foyer.\n");
    }
}
