//! DP-3T beacon scanner library: portable scan and identification engine.
//!
//! Scans for BLE beacons, keeps one record per address, and pulls the 16-byte
//! DP-3T ephemeral identifier (EphID) out of every beacon advertising a name
//! starting with `DP3T`. Advertisement data arrives straight from the radio,
//! so all decoding is bounds-checked and never reads past the received bytes.
//!
//! Everything here is `no_std`, allocation-free and testable on any host
//! with `cargo test`. The ESP-IDF firmware in `firmware-std/` is a thin
//! consumer that provides the NimBLE scanner and the serial console.
//!
//! - `ad`: AD structure decoding
//! - `dp3t`: name filter, EphID extraction, report lines
//! - `scanlist`: per-scan beacon store
//! - `session`: scan command driver and the radio seam
//! - `comm`, `protocol`: serial shell and NDJSON output
//! - `defaults`, `board`: constants and board selection

#![cfg_attr(not(test), no_std)]

pub mod ad;
pub mod board;
pub mod comm;
pub mod defaults;
pub mod dp3t;
pub mod protocol;
pub mod scanlist;
pub mod session;
