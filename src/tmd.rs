//! Typed access to the title metadata (TMD) section and its content
//! directory.
//!
//! The TMD carries the title identifier, platform dependency, region and
//! the array of 36-byte content records that describe every encrypted
//! payload in the container.

use crate::bytes::{read_u16, read_u32, read_u64};
use crate::error::WadError;

/// Offset of the IOS dependency (low half of the 8-byte system version).
pub const IOS_OFFSET: usize = 0x188;
/// Offset of the 8-byte title identifier.
pub const TITLE_ID_OFFSET: usize = 0x18c;
/// Offset of the low 4 identifier bytes rewritten by a title-id edit.
pub const TITLE_ID_TAIL_OFFSET: usize = 0x190;
/// Offset of the region byte.
pub const REGION_OFFSET: usize = 0x19d;
/// Offset of the 2-byte counter field the signature forge cycles.
pub const FORGE_COUNTER_OFFSET: usize = 0x1d4;
/// Offset of the title version.
pub const TITLE_VERSION_OFFSET: usize = 0x1dc;
/// Offset of the content count.
pub const CONTENT_COUNT_OFFSET: usize = 0x1de;
/// Offset of the first content record.
pub const RECORDS_OFFSET: usize = 0x1e4;
/// Size of one content record.
pub const RECORD_SIZE: usize = 36;

/// Installation size of one NAND block.
const NAND_BLOCK_SIZE: u64 = 128 * 1024;

/// Region byte values as stored in the TMD.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Region {
    Japan = 0,
    Usa = 1,
    Europe = 2,
    Free = 3,
}

impl Region {
    pub fn name(self) -> &'static str {
        match self {
            Region::Japan => "Japan",
            Region::Usa => "USA",
            Region::Europe => "Europe",
            Region::Free => "Region Free",
        }
    }
}

impl TryFrom<u8> for Region {
    type Error = WadError;

    fn try_from(v: u8) -> Result<Self, WadError> {
        match v {
            0 => Ok(Region::Japan),
            1 => Ok(Region::Usa),
            2 => Ok(Region::Europe),
            3 => Ok(Region::Free),
            other => Err(WadError::UnknownRegion(other)),
        }
    }
}

/// Content type flag. Shared contents are deduplicated across titles on
/// the installation medium; anything that is not shared installs under
/// the title's own directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentType {
    Normal,
    Shared,
}

impl ContentType {
    pub fn from_u16(v: u16) -> Self {
        if v == 0x8001 {
            ContentType::Shared
        } else {
            ContentType::Normal
        }
    }
}

/// One decoded content record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentRecord {
    pub content_id: u32,
    pub index: u16,
    pub ty: ContentType,
    /// Declared plaintext size.
    pub size: u64,
    /// SHA-1 of the plaintext.
    pub hash: [u8; 20],
}

/// Read-only view over a TMD byte image.
#[derive(Clone, Copy)]
pub struct Tmd<'a> {
    data: &'a [u8],
}

impl<'a> Tmd<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, WadError> {
        if data.len() < RECORDS_OFFSET {
            return Err(WadError::Truncated {
                needed: RECORDS_OFFSET,
                have: data.len(),
            });
        }
        Ok(Self { data })
    }

    pub fn title_id(&self) -> [u8; 8] {
        self.data[TITLE_ID_OFFSET..TITLE_ID_OFFSET + 8]
            .try_into()
            .unwrap()
    }

    /// The IOS version this title depends on.
    pub fn ios(&self) -> u32 {
        read_u32(self.data, IOS_OFFSET)
    }

    pub fn region(&self) -> Result<Region, WadError> {
        Region::try_from(self.data[REGION_OFFSET])
    }

    pub fn title_version(&self) -> u16 {
        read_u16(self.data, TITLE_VERSION_OFFSET)
    }

    pub fn content_count(&self) -> u16 {
        read_u16(self.data, CONTENT_COUNT_OFFSET)
    }

    /// Decodes the content directory in file order. Index values are not
    /// required to be contiguous.
    pub fn records(&self) -> Result<Vec<ContentRecord>, WadError> {
        let count = self.content_count() as usize;
        let needed = RECORDS_OFFSET + count * RECORD_SIZE;
        if self.data.len() < needed {
            return Err(WadError::Truncated {
                needed,
                have: self.data.len(),
            });
        }

        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let off = RECORDS_OFFSET + i * RECORD_SIZE;
            records.push(ContentRecord {
                content_id: read_u32(self.data, off),
                index: read_u16(self.data, off + 4),
                ty: ContentType::from_u16(read_u16(self.data, off + 6)),
                size: read_u64(self.data, off + 8),
                hash: self.data[off + 16..off + 36].try_into().unwrap(),
            });
        }
        Ok(records)
    }
}

/// Position of the content conventionally holding the banner asset
/// bundle (index value 0).
pub fn find_banner(records: &[ContentRecord]) -> Result<usize, WadError> {
    records
        .iter()
        .position(|r| r.index == 0)
        .ok_or(WadError::ContentNotFound(0))
}

/// Estimated installed size in bytes as `(min, max)`: shared contents may
/// already be present on the medium, so they only count toward the upper
/// bound.
pub fn nand_size(records: &[ContentRecord]) -> (u64, u64) {
    let mut min = 0;
    let mut max = 0;
    for rec in records {
        max += rec.size;
        if rec.ty == ContentType::Normal {
            min += rec.size;
        }
    }
    (min, max)
}

/// Estimated installed size in 128 KiB NAND blocks, rounded up.
pub fn nand_blocks(records: &[ContentRecord]) -> (u64, u64) {
    let (min, max) = nand_size(records);
    (min.div_ceil(NAND_BLOCK_SIZE), max.div_ceil(NAND_BLOCK_SIZE))
}

/// Rewrites the region byte.
pub fn set_region(tmd: &mut [u8], region: Region) -> Result<(), WadError> {
    check_len(tmd, REGION_OFFSET + 1)?;
    tmd[REGION_OFFSET] = region as u8;
    Ok(())
}

/// Rewrites the low 4 bytes of the title identifier.
pub fn set_title_id_tail(tmd: &mut [u8], id: [u8; 4]) -> Result<(), WadError> {
    check_len(tmd, TITLE_ID_TAIL_OFFSET + 4)?;
    tmd[TITLE_ID_TAIL_OFFSET..TITLE_ID_TAIL_OFFSET + 4].copy_from_slice(&id);
    Ok(())
}

/// Rewrites the stored plaintext hash of content record `i`.
pub fn set_content_hash(tmd: &mut [u8], i: usize, hash: &[u8; 20]) -> Result<(), WadError> {
    let off = RECORDS_OFFSET + i * RECORD_SIZE + 16;
    check_len(tmd, off + 20)?;
    tmd[off..off + 20].copy_from_slice(hash);
    Ok(())
}

fn check_len(tmd: &[u8], needed: usize) -> Result<(), WadError> {
    if tmd.len() < needed {
        return Err(WadError::Truncated {
            needed,
            have: tmd.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn decodes_records_in_file_order() {
        let tmd_buf = testutil::build_test_tmd(
            *b"\x00\x01\x00\x01WADK",
            Region::Europe,
            &[
                testutil::record(0x16, 0, 0x0001, 200, [0xaa; 20]),
                testutil::record(0x17, 3, 0x8001, 96, [0xbb; 20]),
            ],
        );
        let tmd = Tmd::new(&tmd_buf).unwrap();

        assert_eq!(tmd.content_count(), 2);
        assert_eq!(tmd.region().unwrap(), Region::Europe);
        assert_eq!(&tmd.title_id()[4..], b"WADK");

        let records = tmd.records().unwrap();
        assert_eq!(records[0].index, 0);
        assert_eq!(records[0].ty, ContentType::Normal);
        assert_eq!(records[0].size, 200);
        assert_eq!(records[1].index, 3);
        assert_eq!(records[1].ty, ContentType::Shared);
        assert_eq!(records[1].hash, [0xbb; 20]);
    }

    #[test]
    fn banner_is_found_by_index_value() {
        let records = vec![
            testutil::record_decoded(1, 2, ContentType::Normal, 10),
            testutil::record_decoded(2, 0, ContentType::Normal, 10),
        ];
        assert_eq!(find_banner(&records).unwrap(), 1);

        let no_banner = vec![testutil::record_decoded(1, 2, ContentType::Normal, 10)];
        assert!(matches!(
            find_banner(&no_banner),
            Err(WadError::ContentNotFound(0))
        ));
    }

    #[test]
    fn shared_contents_only_count_toward_the_upper_bound() {
        let records = vec![
            testutil::record_decoded(1, 0, ContentType::Normal, 100_000),
            testutil::record_decoded(2, 1, ContentType::Shared, 200_000),
        ];
        assert_eq!(nand_size(&records), (100_000, 300_000));
        assert_eq!(nand_blocks(&records), (1, 3));
    }

    #[test]
    fn truncated_record_array_is_rejected() {
        let mut tmd_buf = vec![0u8; RECORDS_OFFSET + RECORD_SIZE];
        crate::bytes::write_u16(&mut tmd_buf, CONTENT_COUNT_OFFSET, 4);
        assert!(matches!(
            Tmd::new(&tmd_buf).unwrap().records(),
            Err(WadError::Truncated { .. })
        ));
    }

    #[test]
    fn unknown_region_byte_is_an_error() {
        let mut tmd_buf = vec![0u8; RECORDS_OFFSET];
        tmd_buf[REGION_OFFSET] = 9;
        assert!(matches!(
            Tmd::new(&tmd_buf).unwrap().region(),
            Err(WadError::UnknownRegion(9))
        ));
    }
}
