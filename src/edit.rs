//! Edit transactions over a whole in-memory container image.
//!
//! Each transaction mutates header/ticket/metadata bytes and re-forges
//! the signature of every structure whose signed range it touched, so the
//! result stays installable. Transactions never write through to disk;
//! callers persist the fully edited image in one shot.

use sha1::{Digest, Sha1};

use crate::crypto::{self, TitleCrypto};
use crate::error::WadError;
use crate::imet;
use crate::layout::Layout;
use crate::sign::{self, SignedKind};
use crate::ticket::{self, Ticket};
use crate::tmd::{self, Region, Tmd};

/// Changes the region byte and re-forges the TMD.
pub fn change_region(wad: &mut [u8], region: Region) -> Result<(), WadError> {
    let layout = Layout::parse(wad)?;
    tmd::set_region(&mut wad[layout.tmd.clone()], region)?;
    sign::forge(&mut wad[layout.tmd], SignedKind::Tmd)
}

/// Changes the low 4 bytes of the title identifier in both ticket and
/// TMD, re-forges both, and re-encrypts every content under the key the
/// new identifier derives. Plaintexts are unchanged, so the stored
/// content hashes stay valid.
pub fn change_title_id(
    wad: &mut [u8],
    crypto: &TitleCrypto,
    id: [u8; 4],
) -> Result<(), WadError> {
    let layout = Layout::parse(wad)?;

    let old_key = crypto.title_key(&Ticket::new(&wad[layout.ticket.clone()])?)?;

    ticket::set_title_id_tail(&mut wad[layout.ticket.clone()], id)?;
    tmd::set_title_id_tail(&mut wad[layout.tmd.clone()], id)?;

    sign::forge(&mut wad[layout.ticket.clone()], SignedKind::Ticket)?;
    sign::forge(&mut wad[layout.tmd.clone()], SignedKind::Tmd)?;

    let new_key = crypto.title_key(&Ticket::new(&wad[layout.ticket.clone()])?)?;

    reencrypt_all(wad, &layout, &old_key, &new_key)
}

/// Re-encrypts every content from `old_key` to `new_key` in place.
fn reencrypt_all(
    wad: &mut [u8],
    layout: &Layout,
    old_key: &[u8; 16],
    new_key: &[u8; 16],
) -> Result<(), WadError> {
    let records = Tmd::new(&wad[layout.tmd.clone()])?.records()?;

    for (i, rec) in records.iter().enumerate() {
        let range = layout.content_range(&records, i)?;
        let plain = crypto::decrypt_content(&wad[range.clone()], rec.index, rec.size as usize, old_key)?;
        // The last content is stored unpadded; padding it here could run
        // past the blob.
        let pad = i + 1 != records.len();
        let enc = crypto::encrypt_content(&plain, rec.index, new_key, pad);
        wad[range.start..range.start + enc.len()].copy_from_slice(&enc);
    }
    Ok(())
}

/// Replaces the localized display titles in the banner content's IMET
/// block (and in the footer's duplicate copy, if any), fixing the block
/// checksum, the content's stored hash and the TMD signature along the
/// way. The footer is never signed.
pub fn change_channel_titles(
    wad: &mut [u8],
    crypto: &TitleCrypto,
    titles: &[&str; imet::LANGUAGES],
) -> Result<(), WadError> {
    let layout = Layout::parse(wad)?;
    let records = Tmd::new(&wad[layout.tmd.clone()])?.records()?;
    let banner = tmd::find_banner(&records)?;
    let rec = &records[banner];

    let title_key = crypto.title_key(&Ticket::new(&wad[layout.ticket.clone()])?)?;
    let range = layout.content_range(&records, banner)?;
    let mut plain =
        crypto::decrypt_content(&wad[range.clone()], rec.index, rec.size as usize, &title_key)?;

    let imet_pos = imet::find_in_banner(&plain)?;
    imet::write_titles(&mut plain, imet_pos, titles)?;
    let new_md5 = imet::fix_md5(&mut plain, imet_pos)?;
    let new_sha: [u8; 20] = Sha1::digest(&plain).into();

    // Same plaintext length, same ciphertext length: safe to overwrite in
    // place without touching neighbouring contents.
    let enc = crypto::encrypt_content(&plain, rec.index, &title_key, false);
    wad[range.start..range.start + enc.len()].copy_from_slice(&enc);

    tmd::set_content_hash(&mut wad[layout.tmd.clone()], banner, &new_sha)?;
    sign::forge(&mut wad[layout.tmd.clone()], SignedKind::Tmd)?;

    // A footer, when present, usually carries a plaintext duplicate of
    // the block; patch it with the same titles and checksum.
    if !layout.footer.is_empty() {
        let footer = layout.footer.clone();
        if let Some(rel) = imet::find(&wad[footer.clone()], imet::FOOTER_SCAN) {
            let pos = footer.start + rel;
            imet::write_titles(wad, pos, titles)?;
            imet::set_md5(wad, pos, &new_md5)?;
        }
    }

    Ok(())
}

/// Reads the localized display titles out of the banner content.
pub fn channel_titles(
    wad: &[u8],
    crypto: &TitleCrypto,
) -> Result<[String; imet::LANGUAGES], WadError> {
    let layout = Layout::parse(wad)?;
    let records = Tmd::new(&wad[layout.tmd.clone()])?.records()?;
    let banner = tmd::find_banner(&records)?;
    let rec = &records[banner];

    let title_key = crypto.title_key(&Ticket::new(&wad[layout.ticket.clone()])?)?;
    let range = layout.content_range(&records, banner)?;
    let plain = crypto::decrypt_content(&wad[range], rec.index, rec.size as usize, &title_key)?;

    let imet_pos = imet::find_in_banner(&plain)?;
    Ok(imet::read_titles(&plain, imet_pos))
}
