//! DP-3T beacon scanner: ESP-IDF std firmware
//!
//! NimBLE (via esp32-nimble) provides the radio. A serial shell on the
//! console accepts `scan [ms]`, runs a passive scan for that long, and prints
//! every beacon seen followed by one line per DP-3T EphID.

use std::io::{self, Read, Write as _};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use dp3t_scanner::{board, comm, defaults, protocol, scanlist, session};

use comm::{CommandError, LineReader};
use esp_idf_svc::hal::task::block_on;
use esp_idf_svc::sys::esp_get_free_heap_size;
use protocol::{DeviceMessage, VERSION};
use scanlist::ScanList;
use session::{CommandOutcome, ScanConfig, ScanController};

use esp32_nimble::{BLEDevice, BLEError, BLEScan};

/// Boot time: captured once in main, used for uptime and report timestamps.
static BOOT_INSTANT: Mutex<Option<Instant>> = Mutex::new(None);

fn uptime_secs() -> u32 {
    BOOT_INSTANT
        .lock()
        .ok()
        .and_then(|i| i.map(|boot| boot.elapsed().as_secs() as u32))
        .unwrap_or(0)
}

fn uptime_micros() -> u64 {
    BOOT_INSTANT
        .lock()
        .ok()
        .and_then(|i| i.map(|boot| boot.elapsed().as_micros() as u64))
        .unwrap_or(0)
}

// ── Scan controller ──────────────────────────────────────────────────

/// NimBLE passive scanner. Each `scan()` blocks for the full duration while
/// the result callback feeds the scan list.
struct NimbleScanner {
    device: &'static BLEDevice,
    scan: BLEScan,
}

impl NimbleScanner {
    fn new() -> Self {
        let device = BLEDevice::take();
        let mut scan = BLEScan::new();
        // DP-3T beacons carry name and EphID in the advertisement itself,
        // no scan requests needed.
        scan.active_scan(false).interval(100).window(99);
        Self { device, scan }
    }
}

impl ScanController for NimbleScanner {
    type Error = BLEError;

    fn scan<const N: usize>(
        &mut self,
        duration_ms: u32,
        list: &mut ScanList<N>,
    ) -> Result<(), BLEError> {
        // NimBLE reads 0 as its default duration and i32::MAX as forever.
        let duration_ms = duration_ms.clamp(1, defaults::MAX_SCAN_DURATION_MS) as i32;
        block_on(self.scan.start(self.device, duration_ms, |device, data| {
            let addr = device.addr().as_be_bytes();
            list.update(&addr, device.rssi(), data.payload(), uptime_micros());
            None::<()> // Continue scanning
        }))?;
        Ok(())
    }
}

// ── Console ──────────────────────────────────────────────────────────

/// `fmt::Write` sink over stdout (the UART console).
struct Console;

impl std::fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        io::stdout()
            .write_all(s.as_bytes())
            .map_err(|_| std::fmt::Error)
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

fn main() -> anyhow::Result<()> {
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    // Record boot time
    *BOOT_INSTANT.lock().unwrap() = Some(Instant::now());

    log::info!("DP-3T scanner v{} starting on {} (std)", VERSION, board::BOARD_NAME);
    log::info!(
        "Scan list holds {} beacons, default scan {} ms",
        defaults::SCANLIST_LEN,
        defaults::DEFAULT_SCAN_DURATION_MS,
    );

    // ── Shell thread (owns the NimBLE scanner) ───────────────────────

    let shell = thread::Builder::new()
        .name("shell".into())
        .stack_size(8192)
        .spawn(shell_thread)?;
    log::info!("Shell thread spawned");

    println!("All up, running the shell now");
    shell
        .join()
        .map_err(|_| anyhow::anyhow!("shell thread panicked"))?;
    Ok(())
}

// ── Shell thread ─────────────────────────────────────────────────────

fn shell_thread() {
    let mut scanner = NimbleScanner::new();
    log::info!("NimBLE initialized");

    let mut list = ScanList::<{ defaults::SCANLIST_LEN }>::new();
    let mut config = ScanConfig::new();
    let mut reader = LineReader::new();
    let mut console = Console;
    let mut stdin = io::stdin();
    let mut byte = [0u8; 1];

    prompt();
    loop {
        // The ESP-IDF console is non-blocking: no input reads as 0 bytes
        // or WouldBlock.
        match stdin.read(&mut byte) {
            Ok(1) => {}
            Ok(_) => {
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            Err(e) => {
                log::error!("Console read error: {}", e);
                thread::sleep(Duration::from_millis(100));
                continue;
            }
        }

        // Echo, the console has no line discipline.
        print!("{}", byte[0] as char);
        let _ = io::stdout().flush();

        let Some(line) = reader.feed(byte[0]) else {
            continue;
        };
        println!();

        match comm::parse_command(line) {
            Ok(cmd) => {
                match session::handle_command(cmd, &mut config, &mut scanner, &mut list, &mut console)
                {
                    Ok(CommandOutcome::Done) => {}
                    Ok(CommandOutcome::StatusRequested) => write_status(&list, &mut console),
                    Err(_) => log::error!("Console write failed"),
                }
            }
            Err(CommandError::Empty) => {}
            Err(e) => println!("shell: {}", e),
        }
        prompt();
    }
}

fn write_status<const N: usize>(list: &ScanList<N>, console: &mut Console) {
    let heap_free = unsafe { esp_get_free_heap_size() };

    let msg = DeviceMessage::Status {
        records: list.len() as u16,
        uptime: uptime_secs(),
        heap_free,
        board: board::BOARD_NAME,
        version: VERSION,
    };

    if comm::write_message(&msg, console).is_err() {
        log::error!("Status serialization failed");
    }
}
