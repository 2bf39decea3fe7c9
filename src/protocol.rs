/// Shell commands and the NDJSON message protocol.
///
/// Reports are printed as text lines by default. With `output json` each
/// report becomes one newline-delimited JSON object, for companion tooling
/// reading the serial console.
/// Uses `heapless` types for no_std/no-alloc operation.
use heapless::String;
use serde::Serialize;

/// Maximum length for MAC address strings ("AA:BB:CC:DD:EE:FF")
pub type MacString = String<18>;

/// An EphID as 16 hex pairs separated by spaces
pub type EphIdString = String<47>;

/// Messages written to the console in NDJSON mode
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum DeviceMessage<'a> {
    /// DP-3T beacon with a valid EphID
    #[serde(rename = "dp3t")]
    EphId {
        /// Display index within the scan
        idx: u32,
        mac: &'a MacString,
        rssi: i8,
        ephid: &'a EphIdString,
    },
    /// DP-3T beacon whose EphID field is missing or unusable
    #[serde(rename = "dp3t_invalid")]
    InvalidEphId {
        idx: u32,
        mac: &'a MacString,
        rssi: i8,
        /// "missing", "malformed", "truncated" or "oversized"
        reason: &'static str,
    },
    /// Device status report
    #[serde(rename = "status")]
    Status {
        /// Beacons held in the scan list
        records: u16,
        /// Uptime in seconds
        uptime: u32,
        /// Free heap in bytes
        heap_free: u32,
        /// Board identifier
        board: &'static str,
        /// Firmware version
        version: &'static str,
    },
}

/// Report rendering selected with the `output` command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// `[00] DP-3T: ...` lines
    Text,
    /// One `DeviceMessage` per line
    Ndjson,
}

/// Commands typed on the serial shell.
///
/// Parsed in `comm::parse_command()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellCommand {
    /// Scan for the given duration, or the configured default
    Scan { duration_ms: Option<u32> },
    /// Print the `scan` usage line
    ScanHelp,
    /// Change the duration used by `scan` without an argument
    SetScanDuration(u32),
    /// Switch report rendering
    SetOutput(OutputFormat),
    /// Print a status message
    Status,
    /// List commands
    Help,
}

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum size of a serialized JSON message
pub const MAX_MSG_LEN: usize = 256;
