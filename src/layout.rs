//! Container section layout.
//!
//! A WAD is a flat byte image: a 64-byte header followed by the
//! certificate chain, ticket, title metadata, content blob and optional
//! footer, in that order. The header stores the unpadded size of each
//! section; each of the first three sections is zero-padded to the next
//! 64-byte boundary before the following one starts.

use std::ops::Range;

use crate::bytes::{align_num, read_u32, write_u32, SECTION_ALIGN};
use crate::error::WadError;
use crate::tmd::ContentRecord;

/// Size of the padded container header.
pub const HEADER_SIZE: usize = 64;

/// First eight bytes of every installable WAD (`Is` type, 0x20 header).
pub const MAGIC: [u8; 8] = [0x00, 0x00, 0x00, 0x20, 0x49, 0x73, 0x00, 0x00];

const CERT_SIZE_OFFSET: usize = 0x08;
const TIK_SIZE_OFFSET: usize = 0x10;
const TMD_SIZE_OFFSET: usize = 0x14;
const CONTENT_SIZE_OFFSET: usize = 0x18;
const FOOTER_SIZE_OFFSET: usize = 0x1c;

/// The five size fields of the container header, all unpadded byte counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub cert_size: u32,
    pub tik_size: u32,
    pub tmd_size: u32,
    pub content_size: u32,
    pub footer_size: u32,
}

impl Header {
    pub fn parse(buf: &[u8]) -> Result<Self, WadError> {
        if buf.len() < HEADER_SIZE {
            return Err(WadError::Truncated {
                needed: HEADER_SIZE,
                have: buf.len(),
            });
        }
        if buf[..6] != MAGIC[..6] {
            return Err(WadError::BadMagic(
                hex::encode(&MAGIC[..6]),
                hex::encode(&buf[..6]),
            ));
        }

        Ok(Self {
            cert_size: read_u32(buf, CERT_SIZE_OFFSET),
            tik_size: read_u32(buf, TIK_SIZE_OFFSET),
            tmd_size: read_u32(buf, TMD_SIZE_OFFSET),
            content_size: read_u32(buf, CONTENT_SIZE_OFFSET),
            footer_size: read_u32(buf, FOOTER_SIZE_OFFSET),
        })
    }

    /// Renders the padded 64-byte header block.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[..8].copy_from_slice(&MAGIC);
        write_u32(&mut out, CERT_SIZE_OFFSET, self.cert_size);
        write_u32(&mut out, TIK_SIZE_OFFSET, self.tik_size);
        write_u32(&mut out, TMD_SIZE_OFFSET, self.tmd_size);
        write_u32(&mut out, CONTENT_SIZE_OFFSET, self.content_size);
        write_u32(&mut out, FOOTER_SIZE_OFFSET, self.footer_size);
        out
    }
}

/// Returns true if the buffer starts with the container magic.
pub fn is_wad(buf: &[u8]) -> bool {
    buf.len() >= 6 && buf[..6] == MAGIC[..6]
}

/// Byte ranges of every section, validated against the buffer length.
#[derive(Clone, Debug)]
pub struct Layout {
    pub header: Header,
    pub cert: Range<usize>,
    pub ticket: Range<usize>,
    pub tmd: Range<usize>,
    pub content: Range<usize>,
    pub footer: Range<usize>,
    len: usize,
}

impl Layout {
    pub fn parse(buf: &[u8]) -> Result<Self, WadError> {
        let header = Header::parse(buf)?;
        let len = buf.len();

        let cert_start = HEADER_SIZE;
        let tik_start = cert_start + align_num(header.cert_size as usize, SECTION_ALIGN);
        let tmd_start = tik_start + align_num(header.tik_size as usize, SECTION_ALIGN);
        let content_start = tmd_start + align_num(header.tmd_size as usize, SECTION_ALIGN);
        let footer_start = content_start + align_num(header.content_size as usize, SECTION_ALIGN);

        let cert = cert_start..cert_start + header.cert_size as usize;
        let ticket = tik_start..tik_start + header.tik_size as usize;
        let tmd = tmd_start..tmd_start + header.tmd_size as usize;
        let content = content_start..content_start + header.content_size as usize;
        let footer = if header.footer_size > 0 {
            footer_start..footer_start + header.footer_size as usize
        } else {
            len..len
        };

        if cert.end > len {
            return Err(WadError::SectionOutOfBounds("cert", header.cert_size as usize));
        }
        if ticket.end > len {
            return Err(WadError::SectionOutOfBounds("ticket", header.tik_size as usize));
        }
        if tmd.end > len {
            return Err(WadError::SectionOutOfBounds("tmd", header.tmd_size as usize));
        }
        if content.end > len {
            return Err(WadError::SectionOutOfBounds(
                "content",
                header.content_size as usize,
            ));
        }
        if footer.end > len {
            return Err(WadError::SectionOutOfBounds(
                "footer",
                header.footer_size as usize,
            ));
        }

        Ok(Self {
            header,
            cert,
            ticket,
            tmd,
            content,
            footer,
            len,
        })
    }

    /// Offset of content `i` inside the container. Every content before it
    /// occupies its ciphertext size rounded up to the section alignment.
    pub fn content_offset(&self, records: &[ContentRecord], i: usize) -> usize {
        let mut pos = self.content.start;
        for rec in &records[..i] {
            pos += align_num(align_num(rec.size as usize, 16), SECTION_ALIGN);
        }
        pos
    }

    /// Ciphertext range of content `i`: the declared plaintext size rounded
    /// up to the cipher block size, validated against the buffer.
    pub fn content_range(
        &self,
        records: &[ContentRecord],
        i: usize,
    ) -> Result<Range<usize>, WadError> {
        let start = self.content_offset(records, i);
        let end = start + align_num(records[i].size as usize, 16);
        if end > self.len {
            return Err(WadError::SectionOutOfBounds(
                "content entry",
                records[i].size as usize,
            ));
        }
        Ok(start..end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;

    #[test]
    fn rejects_bad_magic() {
        let buf = vec![0xffu8; 128];
        assert!(matches!(Header::parse(&buf), Err(WadError::BadMagic(_, _))));
        assert!(!is_wad(&buf));
    }

    #[test]
    fn rejects_short_buffer() {
        let buf = vec![0u8; 16];
        assert!(matches!(
            Header::parse(&buf),
            Err(WadError::Truncated { needed: 64, .. })
        ));
    }

    #[test]
    fn rejects_oversized_sections() {
        let mut buf = vec![0u8; 256];
        buf[..8].copy_from_slice(&MAGIC);
        write_u32(&mut buf, 0x10, 0x1000); // ticket larger than the buffer
        assert!(matches!(
            Layout::parse(&buf),
            Err(WadError::SectionOutOfBounds("ticket", 0x1000))
        ));
    }

    #[test]
    fn header_round_trip() {
        let header = Header {
            cert_size: 0x280,
            tik_size: 0x2a4,
            tmd_size: 0x208,
            content_size: 0x500,
            footer_size: 0x40,
        };
        let enc = header.encode();
        assert!(is_wad(&enc));
        assert_eq!(Header::parse(&enc).unwrap(), header);
    }

    #[test]
    fn sections_are_contiguous_and_aligned() {
        let wad = testutil::build_test_wad(&[200, 96], true);
        let layout = Layout::parse(&wad).unwrap();

        assert_eq!(layout.cert.start, HEADER_SIZE);
        assert_eq!(layout.ticket.start % SECTION_ALIGN, 0);
        assert_eq!(layout.tmd.start % SECTION_ALIGN, 0);
        assert_eq!(layout.content.start % SECTION_ALIGN, 0);
        assert_eq!(layout.footer.start % SECTION_ALIGN, 0);
        // The footer is the last thing in the image, padded to 64.
        assert_eq!(
            align_num(layout.footer.end, SECTION_ALIGN),
            wad.len()
        );
    }

    #[test]
    fn content_ranges_use_two_tier_padding() {
        let wad = testutil::build_test_wad(&[200, 96], false);
        let layout = Layout::parse(&wad).unwrap();
        let records = crate::tmd::Tmd::new(&wad[layout.tmd.clone()])
            .unwrap()
            .records()
            .unwrap();

        let first = layout.content_range(&records, 0).unwrap();
        let second = layout.content_range(&records, 1).unwrap();
        // 200 plaintext bytes -> 208 ciphertext bytes, padded to 256 before
        // the next content starts.
        assert_eq!(first.len(), 208);
        assert_eq!(second.start, first.start + 256);
        assert_eq!(second.len(), 96);
        // Last content is unpadded, so it ends exactly at the buffer end.
        assert_eq!(second.end, wad.len());
    }
}
