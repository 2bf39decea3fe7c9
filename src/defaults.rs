/// Compile-time protocol constants and defaults.
///
/// Values the DP-3T beacon fleet agrees on (name signature, vendor field type,
/// identifier size) plus the sizing of the scan list and shell buffers.

/// Maximum legacy BLE advertising data length.
pub const BLE_ADV_PDU_LEN: usize = 31;

/// Display name buffer: one full advertisement payload plus a NUL terminator.
pub const NAME_BUF_LEN: usize = BLE_ADV_PDU_LEN + 1;

/// Name signature advertised by DP-3T beacons (first 4 bytes, case-sensitive).
pub const DP3T_NAME_PREFIX: &[u8; 4] = b"DP3T";

/// AD type carrying the EphID (manufacturer specific data).
pub const DP3T_EPHID_AD_TYPE: u8 = crate::ad::ad_type::MANUFACTURER_DATA;

/// Size of a DP-3T ephemeral identifier in bytes.
pub const EPHID_LEN: usize = 16;

/// Name AD types in lookup order: complete local name, then shortened.
pub static NAME_AD_TYPES: &[u8] = &[
    crate::ad::ad_type::COMPLETE_LOCAL_NAME,
    crate::ad::ad_type::SHORTENED_LOCAL_NAME,
];

/// Name shown when a beacon advertises no usable name.
pub const UNDEFINED_NAME: &str = "undefined";

/// Scan duration used when `scan` is given no argument.
pub const DEFAULT_SCAN_DURATION_MS: u32 = 1000;

/// Longest accepted scan. Zero is rejected as well.
pub const MAX_SCAN_DURATION_MS: u32 = 600_000;

/// Number of distinct beacons kept per scan.
pub const SCANLIST_LEN: usize = 20;

/// Longest shell line accepted before the reader discards input.
pub const SHELL_LINE_LEN: usize = 64;
