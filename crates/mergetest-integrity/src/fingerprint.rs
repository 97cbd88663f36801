//! Header fingerprints
//!
//! A fingerprint is the MD5 digest of every header byte preceding the
//! payload. It is written into the first 16 payload bytes at generation and
//! recomputed over the same span on receipt.

use std::fmt;

use md5::{Digest, Md5};
use mergetest_core::{GroupId, FINGERPRINT_SIZE};
use mergetest_wire::{Packet, WireError, WireResult};

/// 16-byte header digest
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub [u8; FINGERPRINT_SIZE]);

impl Fingerprint {
    /// Digest a header span
    pub fn of(headers: &[u8]) -> Self {
        let digest = Md5::digest(headers);
        let mut bytes = [0u8; FINGERPRINT_SIZE];
        bytes.copy_from_slice(&digest);
        Fingerprint(bytes)
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_SIZE] {
        &self.0
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint(")?;
        for b in &self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

/// Stamp `group`'s source address on the packet, then fingerprint its
/// headers into the payload.
///
/// The packet must carry constructed headers with a known payload offset and
/// room for the fingerprint.
pub fn tag(packet: &mut Packet, group: GroupId) -> WireResult<Fingerprint> {
    packet.set_ipv4_src(group.addr())?;

    let (headers, payload) = packet.split_headers_payload_mut()?;
    ensure_room(payload.len())?;

    let fingerprint = Fingerprint::of(headers);
    payload[..FINGERPRINT_SIZE].copy_from_slice(fingerprint.as_bytes());
    Ok(fingerprint)
}

/// Fingerprint carried in the payload
pub fn embedded(packet: &Packet) -> WireResult<Fingerprint> {
    let payload = packet.payload()?;
    ensure_room(payload.len())?;

    let mut bytes = [0u8; FINGERPRINT_SIZE];
    bytes.copy_from_slice(&payload[..FINGERPRINT_SIZE]);
    Ok(Fingerprint(bytes))
}

/// Recompute the header fingerprint and compare it with the embedded one
pub fn verify(packet: &Packet) -> WireResult<bool> {
    let expected = embedded(packet)?;
    Ok(Fingerprint::of(packet.headers()?) == expected)
}

#[inline]
fn ensure_room(payload_len: usize) -> WireResult<()> {
    if payload_len < FINGERPRINT_SIZE {
        return Err(WireError::BufferTooShort {
            expected: FINGERPRINT_SIZE,
            actual: payload_len,
        });
    }
    Ok(())
}
