//! Fixture builders shared by the unit tests. Everything here is
//! deterministic so tests can assert on exact bytes.

use aes::cipher::{block_padding::ZeroPadding, BlockEncryptMut, KeyIvInit};
use sha1::{Digest, Sha1};

use crate::crypto;
use crate::imet;
use crate::ticket;
use crate::tmd::{self, ContentRecord, ContentType, Region};
use crate::wad;

pub const COMMON_KEY: [u8; 16] = *b"wadkit test key!";

/// Per-title key every fixture container is encrypted under.
pub const TITLE_KEY: [u8; 16] = *b"per-title secret";

/// Stand-in certificate chain section.
pub const CERT_FIXTURE: &[u8] = &[0x5c; 0xa0];

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;

/// Deterministic content plaintext of the given size.
pub fn content_plaintext(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i * 7 + 3) as u8).collect()
}

/// A ticket image carrying `title_id` and `title_key` (stored encrypted
/// under [`COMMON_KEY`]) over deterministic filler bytes.
pub fn build_test_ticket(title_id: [u8; 8], title_key: [u8; 16]) -> Vec<u8> {
    let mut tik: Vec<u8> = (0..ticket::TICKET_SIZE).map(|i| (i % 251) as u8).collect();
    tik[ticket::TITLE_ID_OFFSET..ticket::TITLE_ID_OFFSET + 8].copy_from_slice(&title_id);

    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&title_id);
    let enc = Aes128CbcEnc::new(&COMMON_KEY.into(), &iv.into())
        .encrypt_padded_vec_mut::<ZeroPadding>(&title_key);
    tik[ticket::ENC_TITLE_KEY_OFFSET..ticket::ENC_TITLE_KEY_OFFSET + 16].copy_from_slice(&enc);
    tik
}

/// A raw 36-byte content record.
pub fn record(content_id: u32, index: u16, ty: u16, size: u64, hash: [u8; 20]) -> [u8; 36] {
    let mut rec = [0u8; 36];
    rec[..4].copy_from_slice(&content_id.to_be_bytes());
    rec[4..6].copy_from_slice(&index.to_be_bytes());
    rec[6..8].copy_from_slice(&ty.to_be_bytes());
    rec[8..16].copy_from_slice(&size.to_be_bytes());
    rec[16..36].copy_from_slice(&hash);
    rec
}

/// A decoded content record with a filler hash.
pub fn record_decoded(content_id: u32, index: u16, ty: ContentType, size: u64) -> ContentRecord {
    ContentRecord {
        content_id,
        index,
        ty,
        size,
        hash: [0xee; 20],
    }
}

/// A TMD image with the given identity and content directory over
/// deterministic filler bytes.
pub fn build_test_tmd(title_id: [u8; 8], region: Region, records: &[[u8; 36]]) -> Vec<u8> {
    let len = tmd::RECORDS_OFFSET + records.len() * tmd::RECORD_SIZE;
    let mut buf: Vec<u8> = (0..len).map(|i| (i % 249) as u8).collect();
    buf[tmd::TITLE_ID_OFFSET..tmd::TITLE_ID_OFFSET + 8].copy_from_slice(&title_id);
    buf[tmd::REGION_OFFSET] = region as u8;
    let count = (records.len() as u16).to_be_bytes();
    buf[tmd::CONTENT_COUNT_OFFSET..tmd::CONTENT_COUNT_OFFSET + 2].copy_from_slice(&count);
    for (i, rec) in records.iter().enumerate() {
        let off = tmd::RECORDS_OFFSET + i * tmd::RECORD_SIZE;
        buf[off..off + tmd::RECORD_SIZE].copy_from_slice(rec);
    }
    buf
}

fn build_wad(
    title_id: [u8; 8],
    plaintexts: &[Vec<u8>],
    types: &[u16],
    footer: Option<&[u8]>,
) -> Vec<u8> {
    let tik = build_test_ticket(title_id, TITLE_KEY);
    let records: Vec<[u8; 36]> = plaintexts
        .iter()
        .enumerate()
        .map(|(i, plain)| {
            let hash: [u8; 20] = Sha1::digest(plain).into();
            record(0x16 + i as u32, i as u16, types[i], plain.len() as u64, hash)
        })
        .collect();
    let tmd_buf = build_test_tmd(title_id, Region::Europe, &records);

    let contents: Vec<Vec<u8>> = plaintexts
        .iter()
        .enumerate()
        .map(|(i, plain)| {
            let pad = i + 1 != plaintexts.len();
            crypto::encrypt_content(plain, i as u16, &TITLE_KEY, pad)
        })
        .collect();

    wad::assemble(CERT_FIXTURE, &tik, &tmd_buf, &contents, footer)
}

/// A complete container with one normal content per entry of `sizes`,
/// indices counting up from zero.
pub fn build_test_wad(sizes: &[usize], footer: bool) -> Vec<u8> {
    let plaintexts: Vec<Vec<u8>> = sizes.iter().map(|&s| content_plaintext(s)).collect();
    let types = vec![0x0001u16; sizes.len()];
    let trailer: Vec<u8> = (0..150).map(|i| (i % 200) as u8).collect();
    build_wad(
        *b"\x00\x01\x00\x01WADK",
        &plaintexts,
        &types,
        footer.then_some(trailer.as_slice()),
    )
}

/// Like [`build_test_wad`] but every content after the first is flagged
/// shared.
pub fn build_test_wad_shared(sizes: &[usize]) -> Vec<u8> {
    let plaintexts: Vec<Vec<u8>> = sizes.iter().map(|&s| content_plaintext(s)).collect();
    let types: Vec<u16> = (0..sizes.len())
        .map(|i| if i == 0 { 0x0001 } else { 0x8001 })
        .collect();
    build_wad(*b"\x00\x01\x00\x01WADH", &plaintexts, &types, None)
}

/// A banner blob with an IMET block at 0x80 carrying `titles`.
pub fn build_test_banner(titles: &[&str; imet::LANGUAGES]) -> Vec<u8> {
    let mut banner: Vec<u8> = (0..0x800).map(|i| (i % 0x3f) as u8).collect();
    banner[0x80..0x84].copy_from_slice(imet::MAGIC);
    imet::write_titles(&mut banner, 0x80, titles).unwrap();
    let _ = imet::fix_md5(&mut banner, 0x80);
    banner
}

/// A container whose first content is a banner blob; the footer, when
/// requested, carries a plaintext copy of the block.
pub fn build_test_wad_with_banner(footer: bool) -> Vec<u8> {
    let banner = build_test_banner(&["Channel"; imet::LANGUAGES]);
    let trailer = banner[..0x700].to_vec();
    let plaintexts = vec![banner, content_plaintext(96)];
    build_wad(
        *b"\x00\x01\x00\x01WADB",
        &plaintexts,
        &[0x0001, 0x0001],
        footer.then_some(trailer.as_slice()),
    )
}
