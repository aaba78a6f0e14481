//! Signature forging.
//!
//! The console's broken verifier only compares the first byte of the
//! SHA-1 of the signed range against 0x00, so a valid-looking signature
//! can be produced without any private key: zero the signature
//! placeholder, then cycle an unused 2-byte field inside the signed range
//! until the hash happens to start with 0x00. Expected cost is around 256
//! hash computations.

use sha1::{Digest, Sha1};

use crate::error::WadError;
use crate::{ticket, tmd};

/// First signed byte of a ticket or TMD image; the signed range runs from
/// here to the end of the structure.
pub const SIGNED_RANGE_START: usize = 0x140;

/// Placeholder signature bytes zeroed before the search.
const SIG_START: usize = 4;
const SIG_END: usize = 260;

/// Which signed structure is being forged. The counter field sits at a
/// different offset in each.
#[derive(Clone, Copy, Debug)]
pub enum SignedKind {
    Ticket,
    Tmd,
}

impl SignedKind {
    fn counter_offset(self) -> usize {
        match self {
            SignedKind::Ticket => ticket::FORGE_COUNTER_OFFSET,
            SignedKind::Tmd => tmd::FORGE_COUNTER_OFFSET,
        }
    }
}

/// Returns true if the structure already passes the broken verifier.
pub fn is_accepted(data: &[u8]) -> bool {
    data.len() > SIGNED_RANGE_START && Sha1::digest(&data[SIGNED_RANGE_START..])[0] == 0x00
}

/// Forges the signature of a standalone ticket or TMD image in place.
///
/// A structure that already passes is left untouched, counter field
/// included. The search is deterministic: the same input always yields
/// the same counter value.
pub fn forge(data: &mut [u8], kind: SignedKind) -> Result<(), WadError> {
    let pos = kind.counter_offset();
    if data.len() <= SIGNED_RANGE_START || data.len() < pos + 2 {
        return Err(WadError::Truncated {
            needed: SIGNED_RANGE_START + 1,
            have: data.len(),
        });
    }

    let mut hasher = Sha1::new();
    hasher.update(&data[SIGNED_RANGE_START..]);
    if hasher.finalize_reset()[0] == 0x00 {
        return Ok(());
    }

    for b in &mut data[SIG_START..SIG_END] {
        *b = 0;
    }

    for i in 0..=u16::MAX {
        data[pos..pos + 2].copy_from_slice(&i.to_be_bytes());
        hasher.update(&data[SIGNED_RANGE_START..]);
        if hasher.finalize_reset()[0] == 0x00 {
            return Ok(());
        }
    }

    Err(WadError::SignatureForgeExhausted)
}
