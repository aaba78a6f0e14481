//! Wii WAD container editing.
//!
//! A WAD image holds a certificate chain, a ticket, title metadata and a
//! blob of AES-128-CBC encrypted contents, each section padded to a
//! 64-byte boundary. This crate parses that layout, derives title keys,
//! forges the console's broken signatures and performs whole-image edits
//! (region, title identifier, display titles) plus pack/unpack against
//! plain directories and NAND-style trees.

pub mod bytes;
pub mod content_map;
pub mod crypto;
pub mod edit;
mod error;
pub mod imet;
pub mod layout;
pub mod sign;
pub mod ticket;
pub mod tmd;
pub mod wad;

pub use error::WadError;

#[cfg(test)]
pub(crate) mod testutil;
