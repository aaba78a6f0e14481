//! Typed access to the ticket section.
//!
//! The ticket binds a title identifier to an encrypted title key and a
//! forgeable signature. Only the fields this crate reads or writes are
//! named here; everything else is carried through opaquely.

use crate::error::WadError;

/// Size of a version-0 ticket.
pub const TICKET_SIZE: usize = 0x2a4;

/// Offset of the 16-byte title key, encrypted under the common key.
pub const ENC_TITLE_KEY_OFFSET: usize = 0x1bf;
/// Offset of the 8-byte title identifier (4-byte type + 4-byte id).
pub const TITLE_ID_OFFSET: usize = 0x1dc;
/// Offset of the low 4 identifier bytes rewritten by a title-id edit.
pub const TITLE_ID_TAIL_OFFSET: usize = 0x1e0;
/// Offset of the 2-byte counter field the signature forge cycles.
pub const FORGE_COUNTER_OFFSET: usize = 0x1f1;

/// Read-only view over a ticket byte image.
#[derive(Clone, Copy)]
pub struct Ticket<'a> {
    data: &'a [u8],
}

impl<'a> Ticket<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, WadError> {
        if data.len() < TICKET_SIZE {
            return Err(WadError::Truncated {
                needed: TICKET_SIZE,
                have: data.len(),
            });
        }
        Ok(Self { data })
    }

    /// The encrypted title key field.
    pub fn encrypted_title_key(&self) -> [u8; 16] {
        self.data[ENC_TITLE_KEY_OFFSET..ENC_TITLE_KEY_OFFSET + 16]
            .try_into()
            .unwrap()
    }

    /// The full 8-byte title identifier.
    pub fn title_id(&self) -> [u8; 8] {
        self.data[TITLE_ID_OFFSET..TITLE_ID_OFFSET + 8]
            .try_into()
            .unwrap()
    }
}

/// Rewrites the low 4 bytes of the title identifier.
pub fn set_title_id_tail(ticket: &mut [u8], id: [u8; 4]) -> Result<(), WadError> {
    if ticket.len() < TICKET_SIZE {
        return Err(WadError::Truncated {
            needed: TICKET_SIZE,
            have: ticket.len(),
        });
    }
    ticket[TITLE_ID_TAIL_OFFSET..TITLE_ID_TAIL_OFFSET + 4].copy_from_slice(&id);
    Ok(())
}
