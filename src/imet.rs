//! IMET banner-metadata block.
//!
//! The content at index 0 carries the title's banner bundle, which starts
//! with an `IMET` block holding the localized display titles and an MD5
//! checksum. The same block is often duplicated in the container footer.
//! The block is located by scanning for the marker rather than at a fixed
//! offset; title slots hold the low bytes of 20 UTF-16-BE code units each.

use md5::{Digest, Md5};

use crate::error::WadError;

/// Block marker.
pub const MAGIC: &[u8; 4] = b"IMET";

/// Number of localized title slots (Japanese, English, German, French,
/// Spanish, Italian, Dutch).
pub const LANGUAGES: usize = 7;

/// Marker scan window at the start of a decrypted banner content.
pub const BANNER_SCAN: usize = 400;
/// Marker scan window at the start of a container footer.
pub const FOOTER_SCAN: usize = 200;

/// First title byte, relative to the marker.
const TITLES_OFFSET: usize = 29;
/// Distance between consecutive language slots.
const SLOT_STRIDE: usize = 84;
/// Code units per title slot.
const TITLE_UNITS: usize = 20;

/// Start of the checksummed region, relative to the marker (the block's
/// 64-byte build-tag prefix is covered too).
const HASHED_BLOCK_BACK: usize = 0x40;
/// Length of the checksummed region.
const HASHED_BLOCK_LEN: usize = 1536;
/// Checksum field, relative to the marker.
const MD5_OFFSET: usize = 1456;

/// Finds the marker within the first `window` bytes of `data`.
pub fn find(data: &[u8], window: usize) -> Option<usize> {
    let end = window.min(data.len());
    data.get(..end)?
        .windows(MAGIC.len())
        .position(|w| w == MAGIC)
}

/// Finds the marker in a decrypted banner content.
pub fn find_in_banner(app: &[u8]) -> Result<usize, WadError> {
    find(app, BANNER_SCAN).ok_or(WadError::ImetNotFound)
}

/// Overwrites the seven localized titles in the block at `imet_pos`.
/// Each slot takes up to 20 bytes of the title (one per UTF-16 code
/// unit); the unused tail is zeroed. The checksum is not touched; call
/// [`fix_md5`] afterwards.
pub fn write_titles(
    data: &mut [u8],
    imet_pos: usize,
    titles: &[&str; LANGUAGES],
) -> Result<(), WadError> {
    let needed = imet_pos + TITLES_OFFSET + SLOT_STRIDE * (LANGUAGES - 1) + TITLE_UNITS * 2;
    if data.len() < needed {
        return Err(WadError::Truncated {
            needed,
            have: data.len(),
        });
    }

    for (lang, title) in titles.iter().enumerate() {
        let slot = imet_pos + TITLES_OFFSET + SLOT_STRIDE * lang;
        let bytes = title.as_bytes();
        for unit in 0..TITLE_UNITS {
            data[slot + unit * 2] = bytes.get(unit).copied().unwrap_or(0);
        }
    }
    Ok(())
}

/// Reads the seven localized titles out of the block at `imet_pos`,
/// skipping zero bytes.
pub fn read_titles(data: &[u8], imet_pos: usize) -> [String; LANGUAGES] {
    let mut titles: [String; LANGUAGES] = Default::default();
    for (lang, title) in titles.iter_mut().enumerate() {
        let slot = imet_pos + TITLES_OFFSET + SLOT_STRIDE * lang;
        for unit in 0..TITLE_UNITS {
            match data.get(slot + unit * 2) {
                Some(&b) if b != 0 => title.push(b as char),
                _ => {}
            }
        }
    }
    titles
}

/// Recomputes the block's MD5: the checksum field is zeroed, the
/// 1536-byte region around the marker is hashed, and the digest is
/// written back. Returns the new checksum.
pub fn fix_md5(data: &mut [u8], imet_pos: usize) -> Result<[u8; 16], WadError> {
    if imet_pos < HASHED_BLOCK_BACK {
        return Err(WadError::ImetNotFound);
    }
    let start = imet_pos - HASHED_BLOCK_BACK;
    let needed = start + HASHED_BLOCK_LEN;
    if data.len() < needed {
        return Err(WadError::Truncated {
            needed,
            have: data.len(),
        });
    }

    let mut block = data[start..start + HASHED_BLOCK_LEN].to_vec();
    block[HASHED_BLOCK_LEN - 16..].fill(0);

    let hash: [u8; 16] = Md5::digest(&block).into();
    data[imet_pos + MD5_OFFSET..imet_pos + MD5_OFFSET + 16].copy_from_slice(&hash);
    Ok(hash)
}

/// Writes an externally computed checksum into the block at `imet_pos`,
/// used when patching the footer's duplicate copy.
pub fn set_md5(data: &mut [u8], imet_pos: usize, md5: &[u8; 16]) -> Result<(), WadError> {
    let needed = imet_pos + MD5_OFFSET + 16;
    if data.len() < needed {
        return Err(WadError::Truncated {
            needed,
            have: data.len(),
        });
    }
    data[imet_pos + MD5_OFFSET..imet_pos + MD5_OFFSET + 16].copy_from_slice(md5);
    Ok(())
}
