//! Line-oriented command console: echo, bounded line buffer, tokenizer and
//! the static command table.

use core::fmt;
use core::str::SplitWhitespace;

use heapless::String;

use crate::config::{CMD_LINE_CAP, NAME_CAP};
use crate::error::Error;
use crate::hal::{ConsolePort, DateTime};

/// Adapter so `write!` can target any [`ConsolePort`].
pub struct FmtPort<'a, C: ConsolePort>(pub &'a mut C);

impl<C: ConsolePort> fmt::Write for FmtPort<'_, C> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0.write(s.as_bytes());
        Ok(())
    }
}

/// Copy `s` into a bounded string, truncating past the capacity.
pub fn bounded(s: &str) -> String<NAME_CAP> {
    let mut out = String::new();
    for c in s.chars().take(NAME_CAP) {
        let _ = out.push(c);
    }
    out
}

/// A fully parsed console command, ready for dispatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    SetRtc(DateTime),
    Format { volume: Option<String<NAME_CAP>> },
    Mount { volume: Option<String<NAME_CAP>> },
    Unmount { volume: Option<String<NAME_CAP>> },
    GetFree { volume: Option<String<NAME_CAP>> },
    List { path: Option<String<NAME_CAP>> },
    Cat { path: String<NAME_CAP> },
    Help,
}

/// Result of tokenizing a completed line.
#[derive(Clone, Debug, PartialEq)]
pub enum LineOutcome {
    Dispatch(Command),
    /// First token matched no table entry.
    Unknown(String<NAME_CAP>),
    /// A table entry rejected its arguments.
    Invalid(Error),
    Blank,
}

/// Static command table entry.
pub struct CommandRecord {
    pub keyword: &'static str,
    pub help: &'static str,
    build: fn(&mut SplitWhitespace) -> Result<Command, Error>,
}

pub static COMMANDS: &[CommandRecord] = &[
    CommandRecord {
        keyword: "setrtc",
        help: "setrtc <DD> <MM> <YY> <hh> <mm> <ss>: set the real-time clock",
        build: build_setrtc,
    },
    CommandRecord {
        keyword: "format",
        help: "format [<volume>]: create a fresh filesystem on the volume",
        build: build_format,
    },
    CommandRecord {
        keyword: "mount",
        help: "mount [<volume>]: mount the volume",
        build: build_mount,
    },
    CommandRecord {
        keyword: "unmount",
        help: "unmount [<volume>]: unmount the volume",
        build: build_unmount,
    },
    CommandRecord {
        keyword: "getfree",
        help: "getfree [<volume>]: report total and free space",
        build: build_getfree,
    },
    CommandRecord {
        keyword: "ls",
        help: "ls [<path>]: list files",
        build: build_ls,
    },
    CommandRecord {
        keyword: "cat",
        help: "cat <filename>: print a file's contents",
        build: build_cat,
    },
    CommandRecord {
        keyword: "help",
        help: "help: show the available commands",
        build: build_help,
    },
];

fn opt_name(args: &mut SplitWhitespace) -> Option<String<NAME_CAP>> {
    args.next().map(bounded)
}

/// Next token as an integer with C `atoi` semantics: a missing token is an
/// error, a non-numeric token parses as 0.
fn arg_i32(args: &mut SplitWhitespace) -> Result<i32, Error> {
    let token = args.next().ok_or(Error::MissingArgument)?;
    Ok(token.parse().unwrap_or(0))
}

fn build_setrtc(args: &mut SplitWhitespace) -> Result<Command, Error> {
    let day = arg_i32(args)?;
    let month = arg_i32(args)?;
    // Two-digit year, offset from 2000.
    let year = arg_i32(args)? + 2000;
    let hour = arg_i32(args)?;
    let minute = arg_i32(args)?;
    let second = arg_i32(args)?;
    Ok(Command::SetRtc(DateTime {
        year: year as u16,
        month: month as u8,
        day: day as u8,
        hour: hour as u8,
        minute: minute as u8,
        second: second as u8,
    }))
}

fn build_format(args: &mut SplitWhitespace) -> Result<Command, Error> {
    Ok(Command::Format { volume: opt_name(args) })
}

fn build_mount(args: &mut SplitWhitespace) -> Result<Command, Error> {
    Ok(Command::Mount { volume: opt_name(args) })
}

fn build_unmount(args: &mut SplitWhitespace) -> Result<Command, Error> {
    Ok(Command::Unmount { volume: opt_name(args) })
}

fn build_getfree(args: &mut SplitWhitespace) -> Result<Command, Error> {
    Ok(Command::GetFree { volume: opt_name(args) })
}

fn build_ls(args: &mut SplitWhitespace) -> Result<Command, Error> {
    Ok(Command::List { path: opt_name(args) })
}

fn build_cat(args: &mut SplitWhitespace) -> Result<Command, Error> {
    let path = args.next().ok_or(Error::MissingArgument)?;
    Ok(Command::Cat { path: bounded(path) })
}

fn build_help(_args: &mut SplitWhitespace) -> Result<Command, Error> {
    Ok(Command::Help)
}

/// Tokenize a completed line and look the first token up in the table.
pub fn parse_line(line: &str) -> LineOutcome {
    let mut tokens = line.split_whitespace();
    let keyword = match tokens.next() {
        Some(k) => k,
        None => return LineOutcome::Blank,
    };
    match COMMANDS.iter().find(|record| record.keyword == keyword) {
        Some(record) => match (record.build)(&mut tokens) {
            Ok(command) => LineOutcome::Dispatch(command),
            Err(e) => LineOutcome::Invalid(e),
        },
        None => LineOutcome::Unknown(bounded(keyword)),
    }
}

/// Accumulates console bytes into a bounded line buffer and parses on CR.
pub struct CommandParser {
    line: String<CMD_LINE_CAP>,
}

impl CommandParser {
    pub const fn new() -> Self {
        Self { line: String::new() }
    }

    /// Feed one received byte: echo it, maintain the line buffer and return
    /// the parse outcome once a carriage return terminates the line.
    pub fn feed_byte<C: ConsolePort>(
        &mut self,
        byte: u8,
        console: &mut C,
    ) -> Option<LineOutcome> {
        match byte {
            b'\r' => {
                console.write(b"\r\n");
                let outcome = parse_line(self.line.as_str());
                self.line.clear();
                Some(outcome)
            }
            // Terminals sending CRLF: CR already terminated the line.
            b'\n' => None,
            // Backspace and DEL both trim one character.
            0x08 | 0x7f => {
                console.write(&[byte]);
                self.line.pop();
                None
            }
            b if b.is_ascii_graphic() || b.is_ascii_whitespace() => {
                console.write(&[b]);
                // Silently dropped once the buffer is full.
                let _ = self.line.push(b as char);
                None
            }
            _ => None,
        }
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}
