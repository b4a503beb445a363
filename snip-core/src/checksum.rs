//! CRC-32 (ISO 3309 / ITU-T V.42), the variant every zip reader hard-codes.

const POLY: u32 = 0xedb8_8320; // reversed polynomial

const fn build_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut n = 0;
    while n < 256 {
        let mut c = n as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { POLY ^ (c >> 1) } else { c >> 1 };
            k += 1;
        }
        table[n] = c;
        n += 1;
    }
    table
}

// Built once at compile time, shared by every call.
static CRC_TABLE: [u32; 256] = build_table();

/// CRC-32 of `data`. `crc32(&[])` is 0.
pub fn crc32(data: &[u8]) -> u32 {
    let mut crc = 0xffff_ffffu32;
    for &b in data {
        crc = CRC_TABLE[((crc ^ b as u32) & 0xff) as usize] ^ (crc >> 8);
    }
    crc ^ 0xffff_ffff
}
