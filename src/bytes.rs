//! Alignment arithmetic and big-endian field access shared by every
//! section parser. All WAD section boundaries are 64-byte aligned and all
//! multi-byte integers on the wire are big-endian.

/// Alignment of every section boundary inside a container.
pub const SECTION_ALIGN: usize = 64;

/// Rounds `num` up to the next multiple of `amt`.
pub fn align_num(num: usize, amt: usize) -> usize {
    if num % amt != 0 {
        amt * ((num / amt) + 1)
    } else {
        num
    }
}

/// Zero-extends `vec` up to the next multiple of `amt`.
pub fn align(vec: &mut Vec<u8>, amt: usize) {
    if vec.len() % amt != 0 {
        vec.resize(amt * ((vec.len() / amt) + 1), 0);
    }
}

pub fn read_u16(buf: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes(buf[offset..offset + 2].try_into().unwrap())
}

pub fn read_u32(buf: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes(buf[offset..offset + 4].try_into().unwrap())
}

pub fn read_u64(buf: &[u8], offset: usize) -> u64 {
    u64::from_be_bytes(buf[offset..offset + 8].try_into().unwrap())
}

pub fn write_u16(buf: &mut [u8], offset: usize, val: u16) {
    buf[offset..offset + 2].copy_from_slice(&val.to_be_bytes());
}

pub fn write_u32(buf: &mut [u8], offset: usize, val: u32) {
    buf[offset..offset + 4].copy_from_slice(&val.to_be_bytes());
}
