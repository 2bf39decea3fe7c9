/// Serial shell transport: line reader, command parser and NDJSON output.
///
/// The firmware reads the console one byte at a time. Lines are split on
/// `\r` or `\n`, tokenized on whitespace, and turned into a [`ShellCommand`].
use core::fmt;

use crate::defaults::{MAX_SCAN_DURATION_MS, SHELL_LINE_LEN};
use crate::protocol::{DeviceMessage, OutputFormat, ShellCommand};

/// Commands listed by `help`, in display order.
pub static COMMANDS: &[(&str, &str)] = &[
    ("scan", "trigger a BLE scan, 'scan help' for usage"),
    ("output", "report format: text or json"),
    ("status", "print device status"),
    ("help", "list commands"),
];

/// Usage line printed by `scan help`.
pub const SCAN_USAGE: &str = "usage: scan [timeout in ms]\n       scan default <timeout in ms>";

/// Why a shell line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// Blank line
    Empty,
    /// First word is not a known command
    Unknown,
    /// Known command, unusable argument
    BadArgument,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Empty => f.write_str("empty command"),
            CommandError::Unknown => f.write_str("unknown command, try 'help'"),
            CommandError::BadArgument => f.write_str("bad argument"),
        }
    }
}

// ── Serialization helpers ──────────────────────────────────────────────

/// Serialize a DeviceMessage to JSON bytes and write to the output buffer.
/// Returns the number of bytes written, or None if serialization failed.
pub fn serialize_message(msg: &DeviceMessage, buf: &mut [u8]) -> Option<usize> {
    match serde_json_core::to_slice(msg, buf) {
        Ok(len) => {
            // Append newline for NDJSON
            if len < buf.len() {
                buf[len] = b'\n';
                Some(len + 1)
            } else {
                Some(len)
            }
        }
        Err(_) => None,
    }
}

/// Serialize a DeviceMessage and write it to a text sink as one line.
pub fn write_message<W: fmt::Write>(msg: &DeviceMessage, out: &mut W) -> fmt::Result {
    let mut buf = [0u8; crate::protocol::MAX_MSG_LEN];
    let len = serialize_message(msg, &mut buf).ok_or(fmt::Error)?;
    let line = core::str::from_utf8(&buf[..len]).map_err(|_| fmt::Error)?;
    out.write_str(line)
}

// ── Command parsing ────────────────────────────────────────────────────

/// Parse one shell line.
pub fn parse_command(data: &[u8]) -> Result<ShellCommand, CommandError> {
    let line = core::str::from_utf8(data).map_err(|_| CommandError::Unknown)?;
    let mut words = line.split_ascii_whitespace();
    let name = words.next().ok_or(CommandError::Empty)?;
    let arg = words.next();
    let value = words.next();
    if words.next().is_some() {
        return Err(CommandError::BadArgument);
    }

    match (name, arg, value) {
        ("scan", None, _) => Ok(ShellCommand::Scan { duration_ms: None }),
        ("scan", Some("help"), None) => Ok(ShellCommand::ScanHelp),
        ("scan", Some("default"), Some(ms)) => {
            parse_duration(ms).map(ShellCommand::SetScanDuration)
        }
        ("scan", Some(ms), None) => parse_duration(ms).map(|ms| ShellCommand::Scan {
            duration_ms: Some(ms),
        }),
        ("output", Some("text"), None) => Ok(ShellCommand::SetOutput(OutputFormat::Text)),
        ("output", Some("json"), None) => Ok(ShellCommand::SetOutput(OutputFormat::Ndjson)),
        ("status", None, _) => Ok(ShellCommand::Status),
        ("help", None, _) => Ok(ShellCommand::Help),
        ("scan" | "output" | "status" | "help", ..) => Err(CommandError::BadArgument),
        _ => Err(CommandError::Unknown),
    }
}

/// Scan duration in ms, within `1..=MAX_SCAN_DURATION_MS`.
fn parse_duration(word: &str) -> Result<u32, CommandError> {
    match word.parse::<u32>() {
        Ok(ms) if (1..=MAX_SCAN_DURATION_MS).contains(&ms) => Ok(ms),
        _ => Err(CommandError::BadArgument),
    }
}

/// Print the command table.
pub fn write_help<W: fmt::Write>(out: &mut W) -> fmt::Result {
    writeln!(out, "Command              Description")?;
    writeln!(out, "---------------------------------------")?;
    for (name, description) in COMMANDS {
        writeln!(out, "{name:<20} {description}")?;
    }
    Ok(())
}

// ── Serial line reader ─────────────────────────────────────────────────

/// Serial line reader state machine.
/// Accumulates bytes until a newline is found, then yields the line.
pub struct LineReader {
    buf: [u8; SHELL_LINE_LEN],
    pos: usize,
    overflowed: bool,
}

impl LineReader {
    pub const fn new() -> Self {
        Self {
            buf: [0; SHELL_LINE_LEN],
            pos: 0,
            overflowed: false,
        }
    }

    /// Feed a byte into the reader. Returns a complete line (without newline)
    /// when one is detected.
    ///
    /// A line longer than the buffer is dropped whole, up to its newline.
    pub fn feed(&mut self, byte: u8) -> Option<&[u8]> {
        if byte == b'\n' || byte == b'\r' {
            let len = self.pos;
            let overflowed = self.overflowed;
            self.pos = 0;
            self.overflowed = false;
            if len > 0 && !overflowed {
                Some(&self.buf[..len])
            } else {
                None
            }
        } else if self.overflowed {
            None
        } else if self.pos < self.buf.len() {
            self.buf[self.pos] = byte;
            self.pos += 1;
            None
        } else {
            log::debug!("Shell line too long, discarding");
            self.overflowed = true;
            None
        }
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new()
    }
}
