/// DP-3T beacon identification.
///
/// A DP-3T beacon advertises a local name starting with `DP3T` and carries
/// its 16-byte ephemeral identifier (EphID) in the manufacturer specific
/// data field. Everything else in range is ignored.
///
/// The display index is threaded through [`extract`] by value: callers start
/// at 0 for each traversal of the scan list and feed back the returned value.
use core::fmt::{self, Write};

use crate::ad::{AdBuffer, AdError};
use crate::defaults::{
    DP3T_EPHID_AD_TYPE, DP3T_NAME_PREFIX, EPHID_LEN, NAME_AD_TYPES, NAME_BUF_LEN, UNDEFINED_NAME,
};
use crate::protocol::EphIdString;

/// Advertised name of a beacon, copied out of its advertisement.
#[derive(Clone)]
pub struct DisplayName {
    buf: [u8; NAME_BUF_LEN],
    len: usize,
}

impl DisplayName {
    /// Resolve the name from the first usable field in [`NAME_AD_TYPES`],
    /// or [`UNDEFINED_NAME`] when there is none.
    pub fn resolve(ad: &AdBuffer<'_>) -> Self {
        let mut buf = [0u8; NAME_BUF_LEN];
        match ad.find_str_any(NAME_AD_TYPES, &mut buf) {
            Ok((_, len)) => Self { buf, len },
            Err(e) => {
                if e != AdError::NotFound {
                    log::debug!("Name lookup failed: {}", e);
                }
                Self::undefined()
            }
        }
    }

    fn undefined() -> Self {
        let mut buf = [0u8; NAME_BUF_LEN];
        let name = UNDEFINED_NAME.as_bytes();
        buf[..name.len()].copy_from_slice(name);
        Self {
            buf,
            len: name.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Whether the name carries the DP-3T signature.
    pub fn is_dp3t(&self) -> bool {
        self.as_bytes().starts_with(DP3T_NAME_PREFIX)
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match core::str::from_utf8(self.as_bytes()) {
            Ok(s) => f.write_str(s),
            Err(_) => {
                for &b in self.as_bytes() {
                    let c = if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '?'
                    };
                    f.write_char(c)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DisplayName({:?})", self.as_bytes())
    }
}

/// A DP-3T ephemeral identifier, owned independently of the advertisement
/// it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EphId(pub [u8; EPHID_LEN]);

impl EphId {
    /// Copy a vendor field payload of exactly [`EPHID_LEN`] bytes.
    pub fn from_payload(data: &[u8]) -> Option<Self> {
        data.try_into().ok().map(Self)
    }

    pub fn as_bytes(&self) -> &[u8; EPHID_LEN] {
        &self.0
    }

    /// Render as `XX XX ... XX` into a fixed-size string.
    pub fn to_hex(&self) -> EphIdString {
        let mut s = EphIdString::new();
        // 16 pairs plus 15 separators always fit.
        let _ = write!(s, "{self}");
        s
    }
}

impl fmt::Display for EphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_char(' ')?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

/// Why a DP-3T beacon produced no identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidReason {
    /// No manufacturer specific data field.
    Missing,
    /// The advertisement is damaged before the field could be found.
    Malformed,
    /// The field holds fewer than [`EPHID_LEN`] bytes.
    Truncated { len: usize },
    /// The field holds more than [`EPHID_LEN`] bytes.
    Oversized { len: usize },
}

impl InvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvalidReason::Missing => "missing",
            InvalidReason::Malformed => "malformed",
            InvalidReason::Truncated { .. } => "truncated",
            InvalidReason::Oversized { .. } => "oversized",
        }
    }
}

/// Outcome for one DP-3T beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    EphId { idx: u32, ephid: EphId },
    Invalid { idx: u32, reason: InvalidReason },
}

impl Report {
    pub fn idx(&self) -> u32 {
        match self {
            Report::EphId { idx, .. } | Report::Invalid { idx, .. } => *idx,
        }
    }
}

/// Console form: `[00] DP-3T: 00 01 .. 0F` or `[00] DP-3T: Invalid UUID`.
impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::EphId { idx, ephid } => write!(f, "[{idx:02}] DP-3T: {ephid}"),
            Report::Invalid { idx, .. } => write!(f, "[{idx:02}] DP-3T: Invalid UUID"),
        }
    }
}

/// Examine one advertisement.
///
/// Returns `(None, idx)` for anything that is not a DP-3T beacon. DP-3T
/// beacons always yield a report, valid or not, and consume one index.
pub fn extract(ad: &AdBuffer<'_>, idx: u32) -> (Option<Report>, u32) {
    let name = DisplayName::resolve(ad);
    if !name.is_dp3t() {
        log::trace!("Skipping beacon '{}'", name);
        return (None, idx);
    }

    let report = match ad.find(DP3T_EPHID_AD_TYPE) {
        Ok(data) => match EphId::from_payload(data) {
            Some(ephid) => Report::EphId { idx, ephid },
            None => {
                log::debug!("'{}': EphID field holds {} bytes", name, data.len());
                let len = data.len();
                let reason = if len < EPHID_LEN {
                    InvalidReason::Truncated { len }
                } else {
                    InvalidReason::Oversized { len }
                };
                Report::Invalid { idx, reason }
            }
        },
        Err(AdError::NotFound) => Report::Invalid {
            idx,
            reason: InvalidReason::Missing,
        },
        Err(e) => {
            log::debug!("'{}': {}", name, e);
            Report::Invalid {
                idx,
                reason: InvalidReason::Malformed,
            }
        }
    };

    (Some(report), idx.wrapping_add(1))
}

/// Write one line per DP-3T beacon in `ads`. Returns the number of lines.
pub fn report_all<'a, I, W>(ads: I, out: &mut W) -> Result<u32, fmt::Error>
where
    I: IntoIterator<Item = AdBuffer<'a>>,
    W: Write,
{
    let mut idx = 0;
    for ad in ads {
        let (report, next) = extract(&ad, idx);
        idx = next;
        if let Some(report) = report {
            writeln!(out, "{report}")?;
        }
    }
    Ok(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ad::ad_type;

    const EPHID: [u8; 16] = [
        0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E,
        0x0F,
    ];

    /// Build an advertisement from (type, payload) pairs.
    fn adv(fields: &[(u8, &[u8])]) -> heapless::Vec<u8, 64> {
        let mut v = heapless::Vec::new();
        for &(ty, data) in fields {
            v.push(data.len() as u8 + 1).unwrap();
            v.push(ty).unwrap();
            v.extend_from_slice(data).unwrap();
        }
        v
    }

    fn flags() -> (u8, &'static [u8]) {
        (ad_type::FLAGS, &[0x06])
    }

    // ── Name resolution ─────────────────────────────────────────────

    #[test]
    fn name_prefers_complete_local_name() {
        let data = adv(&[
            (ad_type::SHORTENED_LOCAL_NAME, b"short"),
            (ad_type::COMPLETE_LOCAL_NAME, b"complete"),
        ]);
        let name = DisplayName::resolve(&AdBuffer::from_slice(&data));
        assert_eq!(name.as_bytes(), b"complete");
    }

    #[test]
    fn name_falls_back_to_shortened() {
        let data = adv(&[flags(), (ad_type::SHORTENED_LOCAL_NAME, b"DP3T")]);
        let name = DisplayName::resolve(&AdBuffer::from_slice(&data));
        assert_eq!(name.as_bytes(), b"DP3T");
        assert!(name.is_dp3t());
    }

    #[test]
    fn name_defaults_to_undefined() {
        let data = adv(&[flags()]);
        let name = DisplayName::resolve(&AdBuffer::from_slice(&data));
        assert_eq!(name.as_bytes(), b"undefined");
        assert!(!name.is_dp3t());
    }

    #[test]
    fn malformed_name_field_is_undefined() {
        let data = [0x1F, 0x09, b'D', b'P', b'3', b'T'];
        let name = DisplayName::resolve(&AdBuffer::from_slice(&data));
        assert_eq!(name.as_bytes(), b"undefined");
    }

    #[test]
    fn name_display_replaces_invalid_utf8() {
        let data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, &[b'A', 0xFF, b'B'])]);
        let name = DisplayName::resolve(&AdBuffer::from_slice(&data));
        assert_eq!(format!("{name}"), "A?B");
    }

    // ── Prefix filter ───────────────────────────────────────────────

    #[test]
    fn wrong_fourth_byte_is_filtered_out() {
        let data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3Z"), (0xFF, &EPHID)]);
        let (report, idx) = extract(&AdBuffer::from_slice(&data), 0);
        assert!(report.is_none());
        assert_eq!(idx, 0);
    }

    #[test]
    fn prefix_is_case_sensitive() {
        let data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"dp3t"), (0xFF, &EPHID)]);
        assert!(extract(&AdBuffer::from_slice(&data), 0).0.is_none());
    }

    #[test]
    fn name_shorter_than_prefix_is_filtered_out() {
        let data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3"), (0xFF, &EPHID)]);
        assert!(extract(&AdBuffer::from_slice(&data), 0).0.is_none());
    }

    #[test]
    fn suffix_after_prefix_is_accepted() {
        let data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T-01"), (0xFF, &EPHID)]);
        let (report, idx) = extract(&AdBuffer::from_slice(&data), 0);
        assert_eq!(
            report,
            Some(Report::EphId {
                idx: 0,
                ephid: EphId(EPHID)
            })
        );
        assert_eq!(idx, 1);
    }

    // ── EphID extraction ────────────────────────────────────────────

    #[test]
    fn ephid_renders_as_uppercase_hex_pairs() {
        let data = adv(&[flags(), (ad_type::COMPLETE_LOCAL_NAME, b"DP3T"), (0xFF, &EPHID)]);
        let (report, _) = extract(&AdBuffer::from_slice(&data), 0);
        assert_eq!(
            format!("{}", report.unwrap()),
            "[00] DP-3T: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F"
        );
    }

    #[test]
    fn ephid_is_copied_from_source() {
        let mut data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T"), (0xFF, &EPHID)]);
        let (report, _) = extract(&AdBuffer::from_slice(&data), 0);
        data.iter_mut().for_each(|b| *b = 0);
        match report {
            Some(Report::EphId { ephid, .. }) => assert_eq!(ephid.as_bytes(), &EPHID),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn long_vendor_field_is_invalid() {
        let mut payload = [0x10; 17];
        payload[..16].copy_from_slice(&EPHID);
        let data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T"), (0xFF, &payload)]);
        let (report, idx) = extract(&AdBuffer::from_slice(&data), 0);
        assert_eq!(
            report,
            Some(Report::Invalid {
                idx: 0,
                reason: InvalidReason::Oversized { len: 17 }
            })
        );
        assert_eq!(idx, 1);
        assert_eq!(format!("{}", report.unwrap()), "[00] DP-3T: Invalid UUID");
    }

    #[test]
    fn short_vendor_field_is_invalid() {
        let data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T"), (0xFF, &EPHID[..10])]);
        let (report, idx) = extract(&AdBuffer::from_slice(&data), 4);
        assert_eq!(
            report,
            Some(Report::Invalid {
                idx: 4,
                reason: InvalidReason::Truncated { len: 10 }
            })
        );
        assert_eq!(idx, 5);
        assert_eq!(format!("{}", report.unwrap()), "[04] DP-3T: Invalid UUID");
    }

    #[test]
    fn short_vendor_field_does_not_read_adjacent_bytes() {
        // Vendor field of 10 bytes followed by a field whose bytes would
        // complete a 16-byte identifier if read past the payload.
        let data = adv(&[
            (ad_type::COMPLETE_LOCAL_NAME, b"DP3T"),
            (0xFF, &EPHID[..10]),
            (0x16, &EPHID[10..]),
        ]);
        let (report, _) = extract(&AdBuffer::from_slice(&data), 0);
        assert!(matches!(report, Some(Report::Invalid { .. })));
    }

    #[test]
    fn missing_vendor_field_is_invalid() {
        let data = adv(&[flags(), (ad_type::COMPLETE_LOCAL_NAME, b"DP3T")]);
        let (report, idx) = extract(&AdBuffer::from_slice(&data), 0);
        assert_eq!(
            report,
            Some(Report::Invalid {
                idx: 0,
                reason: InvalidReason::Missing
            })
        );
        assert_eq!(idx, 1);
    }

    #[test]
    fn damaged_vendor_field_is_invalid() {
        let mut data = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T")]);
        data.extend_from_slice(&[0x11, 0xFF, 0x00, 0x01]).unwrap();
        let (report, _) = extract(&AdBuffer::from_slice(&data), 0);
        assert_eq!(
            report,
            Some(Report::Invalid {
                idx: 0,
                reason: InvalidReason::Malformed
            })
        );
    }

    #[test]
    fn to_hex_matches_display() {
        let ephid = EphId(EPHID);
        assert_eq!(ephid.to_hex().as_str(), format!("{ephid}"));
        assert_eq!(ephid.to_hex().len(), 47);
    }

    #[test]
    fn from_payload_requires_exact_length() {
        assert_eq!(EphId::from_payload(&EPHID[..15]), None);
        assert_eq!(EphId::from_payload(&EPHID), Some(EphId(EPHID)));
        assert_eq!(EphId::from_payload(&[0u8; 17]), None);
    }

    // ── Index threading ─────────────────────────────────────────────

    #[test]
    fn index_counts_only_dp3t_beacons() {
        let a = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T"), (0xFF, &EPHID)]);
        let other = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"Headphones")]);
        let invalid = adv(&[(ad_type::SHORTENED_LOCAL_NAME, b"DP3T")]);
        let unnamed = adv(&[flags()]);

        let ads = [&a, &other, &invalid, &unnamed, &other, &a];
        let mut idx = 0;
        let mut seen: heapless::Vec<u32, 8> = heapless::Vec::new();
        for data in ads {
            let (report, next) = extract(&AdBuffer::from_slice(data), idx);
            idx = next;
            if let Some(r) = report {
                seen.push(r.idx()).unwrap();
            }
        }
        assert_eq!(seen.as_slice(), &[0, 1, 2]);
        assert_eq!(idx, 3);
    }

    #[test]
    fn report_all_writes_one_line_per_beacon() {
        let a = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T"), (0xFF, &EPHID)]);
        let other = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"Watch")]);
        let invalid = adv(&[(ad_type::COMPLETE_LOCAL_NAME, b"DP3T-x")]);

        let mut out = String::new();
        let count = report_all(
            [&a, &other, &invalid].map(|d| AdBuffer::from_slice(d)),
            &mut out,
        )
        .unwrap();
        assert_eq!(count, 2);
        assert_eq!(
            out,
            "[00] DP-3T: 00 01 02 03 04 05 06 07 08 09 0A 0B 0C 0D 0E 0F\n\
             [01] DP-3T: Invalid UUID\n"
        );
    }
}
