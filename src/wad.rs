//! Packing and unpacking containers against the file system.
//!
//! Unpacking splits a container into its companion section files
//! (`<titleid>.cert/.tik/.tmd/.trailer` plus one decrypted
//! `<index>.app` per content); packing reassembles and re-signs them.
//! The NAND-style variants additionally route shared contents through
//! the content-addressed store under `shared1/`.
//!
//! Packing always assembles the complete image in memory and returns it;
//! nothing is written to the destination until the image is whole.

use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

use crate::bytes::{align, SECTION_ALIGN};
use crate::content_map::{self, ContentMap};
use crate::crypto::{self, TitleCrypto};
use crate::error::WadError;
use crate::layout::{Header, Layout};
use crate::sign::{self, SignedKind};
use crate::ticket::Ticket;
use crate::tmd::{ContentType, Tmd};

/// Assembles a container image from its raw sections. `contents` must
/// already be encrypted (and padded, except for the last one); the
/// footer, when present, lands on the next 64-byte boundary after the
/// blob and the image is padded out behind it.
pub(crate) fn assemble(
    cert: &[u8],
    tik: &[u8],
    tmd: &[u8],
    contents: &[Vec<u8>],
    footer: Option<&[u8]>,
) -> Vec<u8> {
    let content_size: usize = contents.iter().map(Vec::len).sum();
    let header = Header {
        cert_size: cert.len() as u32,
        tik_size: tik.len() as u32,
        tmd_size: tmd.len() as u32,
        content_size: content_size as u32,
        footer_size: footer.map_or(0, <[u8]>::len) as u32,
    };

    let mut out = header.encode().to_vec();
    out.extend_from_slice(cert);
    align(&mut out, SECTION_ALIGN);
    out.extend_from_slice(tik);
    align(&mut out, SECTION_ALIGN);
    out.extend_from_slice(tmd);
    align(&mut out, SECTION_ALIGN);
    for c in contents {
        out.extend_from_slice(c);
    }
    if let Some(footer) = footer {
        align(&mut out, SECTION_ALIGN);
        out.extend_from_slice(footer);
        align(&mut out, SECTION_ALIGN);
    }
    out
}

/// Encrypts content plaintexts for placement in a blob: every content
/// except the last is padded to the section alignment.
fn encrypt_for_blob(
    plaintexts: &[Vec<u8>],
    indices: &[u16],
    title_key: &[u8; 16],
) -> Vec<Vec<u8>> {
    plaintexts
        .iter()
        .enumerate()
        .map(|(i, plain)| {
            let pad = i + 1 != plaintexts.len();
            crypto::encrypt_content(plain, indices[i], title_key, pad)
        })
        .collect()
}

/// Unpacks a container into `dest`: section files named after the full
/// title identifier, one decrypted `.app` per content named after its
/// index value.
pub fn unpack_wad(wad: &[u8], crypto: &TitleCrypto, dest: &Path) -> Result<(), WadError> {
    let layout = Layout::parse(wad)?;
    let tik = Ticket::new(&wad[layout.ticket.clone()])?;
    let title_key = crypto.title_key(&tik)?;
    let records = Tmd::new(&wad[layout.tmd.clone()])?.records()?;

    std::fs::create_dir_all(dest)?;
    let name = hex::encode(tik.title_id());
    std::fs::write(dest.join(format!("{name}.cert")), &wad[layout.cert.clone()])?;
    std::fs::write(dest.join(format!("{name}.tik")), &wad[layout.ticket.clone()])?;
    std::fs::write(dest.join(format!("{name}.tmd")), &wad[layout.tmd.clone()])?;
    if !layout.footer.is_empty() {
        std::fs::write(
            dest.join(format!("{name}.trailer")),
            &wad[layout.footer.clone()],
        )?;
    }

    for (i, rec) in records.iter().enumerate() {
        let range = layout.content_range(&records, i)?;
        let plain =
            crypto::decrypt_content(&wad[range], rec.index, rec.size as usize, &title_key)?;
        std::fs::write(dest.join(format!("{:08x}.app", rec.index)), plain)?;
    }
    Ok(())
}

/// Packs the companion files in `dir` back into a container image,
/// re-forging ticket and TMD signatures on the way.
pub fn pack_wad(
    dir: &Path,
    crypto: &TitleCrypto,
    include_footer: bool,
) -> Result<Vec<u8>, WadError> {
    let cert = std::fs::read(find_companion(dir, "cert")?)?;
    let mut tik = std::fs::read(find_companion(dir, "tik")?)?;
    let mut tmd = std::fs::read(find_companion(dir, "tmd")?)?;

    sign::forge(&mut tik, SignedKind::Ticket)?;
    sign::forge(&mut tmd, SignedKind::Tmd)?;

    let title_key = crypto.title_key(&Ticket::new(&tik)?)?;
    let records = Tmd::new(&tmd)?.records()?;

    let mut plaintexts = Vec::with_capacity(records.len());
    let mut indices = Vec::with_capacity(records.len());
    for rec in &records {
        plaintexts.push(std::fs::read(dir.join(format!("{:08x}.app", rec.index)))?);
        indices.push(rec.index);
    }
    let contents = encrypt_for_blob(&plaintexts, &indices, &title_key);

    let footer = if include_footer {
        match find_companion(dir, "trailer") {
            Ok(path) => Some(std::fs::read(path)?),
            Err(WadError::MissingCompanionFile(_)) => None,
            Err(e) => return Err(e),
        }
    } else {
        None
    };

    Ok(assemble(&cert, &tik, &tmd, &contents, footer.as_deref()))
}

/// Unpacks a container into a NAND-style directory tree. Shared contents
/// are deduplicated into `shared1/` through the content registry; normal
/// contents land under the title's own `content/` directory.
pub fn unpack_to_nand(wad: &[u8], crypto: &TitleCrypto, nand: &Path) -> Result<(), WadError> {
    let layout = Layout::parse(wad)?;
    let tik = Ticket::new(&wad[layout.ticket.clone()])?;
    let title_key = crypto.title_key(&tik)?;
    let records = Tmd::new(&wad[layout.tmd.clone()])?.records()?;

    let id = tik.title_id();
    let hi = hex::encode(&id[..4]);
    let lo = hex::encode(&id[4..]);

    let ticket_dir = nand.join("ticket").join(&hi);
    let content_dir = nand.join("title").join(&hi).join(&lo).join("content");
    let shared_dir = nand.join("shared1");
    std::fs::create_dir_all(&ticket_dir)?;
    std::fs::create_dir_all(&content_dir)?;
    std::fs::create_dir_all(nand.join("title").join(&hi).join(&lo).join("data"))?;
    std::fs::create_dir_all(&shared_dir)?;

    std::fs::write(
        ticket_dir.join(format!("{lo}.tik")),
        &wad[layout.ticket.clone()],
    )?;
    std::fs::write(content_dir.join("title.tmd"), &wad[layout.tmd.clone()])?;

    let map_path = shared_dir.join("content.map");
    for (i, rec) in records.iter().enumerate() {
        let range = layout.content_range(&records, i)?;
        let plain =
            crypto::decrypt_content(&wad[range], rec.index, rec.size as usize, &title_key)?;

        if rec.ty == ContentType::Shared {
            let map = ContentMap::load(&map_path)?;
            if !map.contains(&rec.hash) {
                // The registry defines no first name; seed it here.
                let name = if map.is_empty() {
                    "00000000".to_string()
                } else {
                    map.allocate_name()?
                };
                std::fs::write(shared_dir.join(format!("{name}.app")), &plain)?;
                content_map::append_record(&map_path, &name, &rec.hash)?;
            }
        } else {
            std::fs::write(
                content_dir.join(format!("{:08x}.app", rec.content_id)),
                &plain,
            )?;
        }
    }
    Ok(())
}

/// Packs a title installed in a NAND-style tree back into a container
/// image, resolving shared contents through the registry. A shared
/// content whose hash is not in the registry aborts packing before
/// anything is written.
pub fn pack_from_nand(
    nand: &Path,
    title_id: [u8; 8],
    crypto: &TitleCrypto,
) -> Result<Vec<u8>, WadError> {
    let hi = hex::encode(&title_id[..4]);
    let lo = hex::encode(&title_id[4..]);
    let content_dir = nand.join("title").join(&hi).join(&lo).join("content");
    let shared_dir = nand.join("shared1");

    let cert = std::fs::read(nand.join("sys").join("cert.sys"))?;
    let mut tik = std::fs::read(nand.join("ticket").join(&hi).join(format!("{lo}.tik")))?;
    let mut tmd = std::fs::read(content_dir.join("title.tmd"))?;

    sign::forge(&mut tik, SignedKind::Ticket)?;
    sign::forge(&mut tmd, SignedKind::Tmd)?;

    let title_key = crypto.title_key(&Ticket::new(&tik)?)?;
    let records = Tmd::new(&tmd)?.records()?;
    let map = ContentMap::load(&shared_dir.join("content.map"))?;

    let mut plaintexts = Vec::with_capacity(records.len());
    let mut indices = Vec::with_capacity(records.len());
    for rec in &records {
        let path = if rec.ty == ContentType::Shared {
            let name = map
                .lookup(&rec.hash)
                .ok_or_else(|| WadError::SharedContentMissing(hex::encode(rec.hash)))?;
            shared_dir.join(format!("{name}.app"))
        } else {
            content_dir.join(format!("{:08x}.app", rec.content_id))
        };
        plaintexts.push(std::fs::read(path)?);
        indices.push(rec.index);
    }
    let contents = encrypt_for_blob(&plaintexts, &indices, &title_key);

    Ok(assemble(&cert, &tik, &tmd, &contents, None))
}

/// SHA-1 of a content plaintext, as stored in its content record.
pub fn content_hash(plain: &[u8]) -> [u8; 20] {
    Sha1::digest(plain).into()
}

fn find_companion(dir: &Path, ext: &'static str) -> Result<PathBuf, WadError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map_or(false, |e| e == ext) {
            return Ok(path);
        }
    }
    Err(WadError::MissingCompanionFile(ext))
}
