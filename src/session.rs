/// Scan session driver.
///
/// A `scan` command clears the scan list, lets the radio fill it for the
/// requested duration, prints a summary of every beacon seen and then one
/// report per DP-3T beacon. The radio itself sits behind [`ScanController`]
/// so the session runs the same on the device and in host tests.
use core::fmt::{self, Write};

use crate::comm::{self, SCAN_USAGE};
use crate::defaults::DEFAULT_SCAN_DURATION_MS;
use crate::dp3t::{self, Report};
use crate::protocol::{DeviceMessage, MacString, OutputFormat, ShellCommand};
use crate::scanlist::{format_mac, ScanList};

/// Runtime scan configuration, changed through shell commands.
#[derive(Debug, Clone, Copy)]
pub struct ScanConfig {
    /// Duration used by `scan` without an argument
    pub duration_ms: u32,
    /// How DP-3T reports are printed
    pub output: OutputFormat,
}

impl ScanConfig {
    pub const fn new() -> Self {
        Self {
            duration_ms: DEFAULT_SCAN_DURATION_MS,
            output: OutputFormat::Text,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Radio side of a scan.
pub trait ScanController {
    type Error: fmt::Debug;

    /// Scan passively for `duration_ms`, feeding every advertisement report
    /// into `list`. Returns once the radio has stopped.
    fn scan<const N: usize>(
        &mut self,
        duration_ms: u32,
        list: &mut ScanList<N>,
    ) -> Result<(), Self::Error>;
}

/// What the caller still has to do after [`handle_command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Done,
    /// Status needs platform data (uptime, heap) the library does not have.
    StatusRequested,
}

/// Execute one shell command.
pub fn handle_command<C, W, const N: usize>(
    cmd: ShellCommand,
    config: &mut ScanConfig,
    ctrl: &mut C,
    list: &mut ScanList<N>,
    out: &mut W,
) -> Result<CommandOutcome, fmt::Error>
where
    C: ScanController,
    W: Write,
{
    match cmd {
        ShellCommand::Scan { duration_ms } => {
            let duration_ms = duration_ms.unwrap_or(config.duration_ms);
            run_scan(ctrl, list, duration_ms, config.output, out)?;
        }
        ShellCommand::ScanHelp => writeln!(out, "{SCAN_USAGE}")?,
        ShellCommand::SetScanDuration(ms) => {
            config.duration_ms = ms;
            log::info!("Default scan duration set to {} ms", ms);
        }
        ShellCommand::SetOutput(format) => {
            config.output = format;
            log::info!("Report output set to {:?}", format);
        }
        ShellCommand::Status => return Ok(CommandOutcome::StatusRequested),
        ShellCommand::Help => comm::write_help(out)?,
    }
    Ok(CommandOutcome::Done)
}

/// Run one scan and print its results. Returns the number of DP-3T beacons
/// reported.
///
/// A failed scan is logged and reported on `out`; it never ends the session.
pub fn run_scan<C, W, const N: usize>(
    ctrl: &mut C,
    list: &mut ScanList<N>,
    duration_ms: u32,
    format: OutputFormat,
    out: &mut W,
) -> Result<u32, fmt::Error>
where
    C: ScanController,
    W: Write,
{
    list.clear();
    write!(out, "Scanning for {duration_ms}ms now ...")?;

    if let Err(e) = ctrl.scan(duration_ms, list) {
        log::error!("BLE scan failed: {:?}", e);
        writeln!(out, " failed")?;
        return Ok(0);
    }
    log::info!("Scan finished: {} beacons", list.len());

    writeln!(out, " done\n\nResults:")?;
    list.write_summary(out)?;
    let count = write_reports(list, format, out)?;
    writeln!(out)?;
    Ok(count)
}

/// Print one report per DP-3T beacon in the list, indexed from 0.
pub fn write_reports<W: Write, const N: usize>(
    list: &ScanList<N>,
    format: OutputFormat,
    out: &mut W,
) -> Result<u32, fmt::Error> {
    match format {
        OutputFormat::Text => dp3t::report_all(list.iter().map(|e| e.ad()), out),
        OutputFormat::Ndjson => {
            let mut idx = 0;
            for entry in list.iter() {
                let (report, next) = dp3t::extract(&entry.ad(), idx);
                idx = next;
                let Some(report) = report else {
                    continue;
                };

                let mut mac = MacString::new();
                format_mac(&entry.addr, &mut mac);
                match report {
                    Report::EphId { idx, ephid } => {
                        let ephid = ephid.to_hex();
                        let msg = DeviceMessage::EphId {
                            idx,
                            mac: &mac,
                            rssi: entry.last_rssi,
                            ephid: &ephid,
                        };
                        comm::write_message(&msg, out)?;
                    }
                    Report::Invalid { idx, reason } => {
                        let msg = DeviceMessage::InvalidEphId {
                            idx,
                            mac: &mac,
                            rssi: entry.last_rssi,
                            reason: reason.as_str(),
                        };
                        comm::write_message(&msg, out)?;
                    }
                }
            }
            Ok(idx)
        }
    }
}
