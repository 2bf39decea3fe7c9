/// Bounded list of beacons seen during one scan.
///
/// The radio callback feeds every advertisement report through
/// [`ScanList::update`]. Reports from an address already in the list only
/// refresh its counters, so each beacon appears once. When the list is full,
/// new addresses are dropped until the next `clear()`.
use core::fmt::{self, Write};

use heapless::Vec;

use crate::ad::AdBuffer;
use crate::defaults::BLE_ADV_PDU_LEN;
use crate::dp3t::DisplayName;
use crate::protocol::MacString;

/// One beacon and the advertisement it first sent.
#[derive(Debug, Clone)]
pub struct ScanEntry {
    pub addr: [u8; 6],
    ad: [u8; BLE_ADV_PDU_LEN],
    ad_len: usize,
    /// RSSI of the most recent report
    pub last_rssi: i8,
    /// Reports received from this address
    pub adv_msg_cnt: u32,
    /// Timestamps (µs) of the first and latest report
    pub first_update: u64,
    pub last_update: u64,
}

impl ScanEntry {
    fn new(addr: [u8; 6], rssi: i8, data: &[u8], now_us: u64) -> Self {
        let mut ad = [0u8; BLE_ADV_PDU_LEN];
        // Extended advertisements are cut at the legacy size; a field cut in
        // half decodes as malformed.
        let ad_len = data.len().min(BLE_ADV_PDU_LEN);
        ad[..ad_len].copy_from_slice(&data[..ad_len]);
        Self {
            addr,
            ad,
            ad_len,
            last_rssi: rssi,
            adv_msg_cnt: 1,
            first_update: now_us,
            last_update: now_us,
        }
    }

    /// Advertisement data as received (length) within its storage (capacity).
    pub fn ad(&self) -> AdBuffer<'_> {
        AdBuffer::new(&self.ad, self.ad_len)
    }

    /// Mean interval between reports in µs.
    pub fn adv_interval_us(&self) -> u64 {
        (self.last_update - self.first_update) / u64::from(self.adv_msg_cnt.max(1))
    }

    /// `[ 0] AA:BB:CC:DD:EE:FF "name", adv_msg_cnt: 3, adv_int: 100000us, last_rssi: -60`
    pub fn write_summary<W: Write>(&self, idx: usize, out: &mut W) -> fmt::Result {
        let mut mac = MacString::new();
        format_mac(&self.addr, &mut mac);
        let name = DisplayName::resolve(&self.ad());

        writeln!(
            out,
            "[{:2}] {} \"{}\", adv_msg_cnt: {}, adv_int: {}us, last_rssi: {}",
            idx,
            mac,
            name,
            self.adv_msg_cnt,
            self.adv_interval_us(),
            self.last_rssi
        )
    }
}

/// Beacon store with room for `N` distinct addresses.
pub struct ScanList<const N: usize> {
    entries: Vec<ScanEntry, N>,
}

impl<const N: usize> ScanList<N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Forget all beacons before a new scan.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Record one advertisement report.
    ///
    /// Returns `false` when the report came from a new address and the list
    /// had no room left.
    pub fn update(&mut self, addr: &[u8; 6], rssi: i8, data: &[u8], now_us: u64) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.addr == *addr) {
            entry.last_rssi = rssi;
            entry.adv_msg_cnt = entry.adv_msg_cnt.saturating_add(1);
            entry.last_update = now_us.max(entry.first_update);
            return true;
        }

        if self
            .entries
            .push(ScanEntry::new(*addr, rssi, data, now_us))
            .is_err()
        {
            log::trace!("Scan list full, dropping new beacon");
            return false;
        }
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.entries.is_full()
    }

    /// Traverse the list in insertion order. Each call starts over.
    pub fn iter(&self) -> core::slice::Iter<'_, ScanEntry> {
        self.entries.iter()
    }

    /// Print one summary line per beacon.
    pub fn write_summary<W: Write>(&self, out: &mut W) -> fmt::Result {
        for (i, entry) in self.entries.iter().enumerate() {
            entry.write_summary(i, out)?;
        }
        Ok(())
    }
}

impl<const N: usize> Default for ScanList<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a 6-byte MAC address into "AA:BB:CC:DD:EE:FF" string
pub fn format_mac(mac: &[u8; 6], buf: &mut MacString) {
    let _ = write!(
        buf,
        "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
}
