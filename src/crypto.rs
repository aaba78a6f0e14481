//! Title-key derivation and content encryption.
//!
//! Every content payload is AES-128-CBC encrypted under the title key,
//! which is itself stored in the ticket encrypted under the console
//! family's common key. IVs are derived from structure fields: the 8-byte
//! title identifier for the title key, the 2-byte content index for
//! content payloads.

use std::path::Path;

use aes::cipher::{
    block_padding::{NoPadding, ZeroPadding},
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};

use crate::bytes::{align, align_num, SECTION_ALIGN};
use crate::error::WadError;
use crate::ticket::Ticket;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// AES block size; every ciphertext region is a multiple of this.
pub const BLOCK_SIZE: usize = 16;

/// Holds the externally supplied common key and derives per-title keys
/// from it. Construct one explicitly rather than reading keys from a
/// global location.
pub struct TitleCrypto {
    common_key: [u8; 16],
}

impl TitleCrypto {
    pub fn new(common_key: [u8; 16]) -> Self {
        Self { common_key }
    }

    /// Loads the common key from a file that must hold exactly 16 bytes.
    pub fn from_key_file(path: &Path) -> Result<Self, WadError> {
        let data = std::fs::read(path).map_err(|_| WadError::MissingCommonKey)?;
        let common_key: [u8; 16] = data.try_into().map_err(|_| WadError::MissingCommonKey)?;
        Ok(Self::new(common_key))
    }

    /// Decrypts the ticket's title key field. The IV is the 8-byte title
    /// identifier followed by 8 zero bytes.
    pub fn title_key(&self, ticket: &Ticket) -> Result<[u8; 16], WadError> {
        let mut iv = [0u8; 16];
        iv[..8].copy_from_slice(&ticket.title_id());

        let enc = ticket.encrypted_title_key();
        let mut buf = [0u8; 16];
        let key = Aes128CbcDec::new(&self.common_key.into(), &iv.into())
            .decrypt_padded_b2b_mut::<NoPadding>(&enc, &mut buf)
            .map_err(|_| WadError::Misaligned(enc.len()))?;

        Ok(key.try_into().expect("one block in, one block out"))
    }
}

/// IV for a content payload: the big-endian content index followed by 14
/// zero bytes.
fn content_iv(index: u16) -> [u8; 16] {
    let mut iv = [0u8; 16];
    iv[..2].copy_from_slice(&index.to_be_bytes());
    iv
}

/// Decrypts one content payload. `cipher` must be the block-aligned
/// ciphertext region; the result is truncated to `declared_size`, the
/// plaintext size stored in the content record.
pub fn decrypt_content(
    cipher: &[u8],
    index: u16,
    declared_size: usize,
    title_key: &[u8; 16],
) -> Result<Vec<u8>, WadError> {
    if cipher.len() % BLOCK_SIZE != 0 {
        return Err(WadError::Misaligned(cipher.len()));
    }
    if declared_size > cipher.len() {
        return Err(WadError::Truncated {
            needed: declared_size,
            have: cipher.len(),
        });
    }

    let mut out = Aes128CbcDec::new(title_key.into(), &content_iv(index).into())
        .decrypt_padded_vec_mut::<NoPadding>(cipher)
        .map_err(|_| WadError::Misaligned(cipher.len()))?;
    out.truncate(declared_size);
    Ok(out)
}

/// Encrypts one content payload. The plaintext is zero-padded to the
/// cipher block size; with `pad_to_section` the ciphertext is further
/// zero-padded to the 64-byte container alignment for placement before
/// another content.
pub fn encrypt_content(
    plaintext: &[u8],
    index: u16,
    title_key: &[u8; 16],
    pad_to_section: bool,
) -> Vec<u8> {
    let mut out = Aes128CbcEnc::new(title_key.into(), &content_iv(index).into())
        .encrypt_padded_vec_mut::<ZeroPadding>(plaintext);
    if pad_to_section {
        align(&mut out, SECTION_ALIGN);
    }
    out
}

/// Ciphertext size a plaintext of `size` bytes occupies before padding to
/// the container alignment.
pub fn ciphertext_size(size: usize) -> usize {
    align_num(size, BLOCK_SIZE)
}
