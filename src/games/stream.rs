//! Keyed byte stream used by games that need more randomness than one digest.
//!
//! Block `k` is `HMAC-SHA256(server_seed, message || ":" || k)` with `k` written in
//! decimal, starting at 0. Bytes are consumed strictly in order and reads may span
//! block boundaries.

use hmac::{Hmac, Mac};
use sha2::Sha256;

pub type HmacSha256 = Hmac<Sha256>;

pub const BLOCK_LEN: usize = 32;

/// Single HMAC-SHA256 digest of `message` under `key`
pub fn hmac_digest(key: &[u8], message: &[u8]) -> Result<[u8; BLOCK_LEN], hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().into())
}

pub struct KeyedStream {
    mac: HmacSha256,
    message: Vec<u8>,
    counter: u64,
    block: [u8; BLOCK_LEN],
    offset: usize,
}

impl KeyedStream {
    pub fn new(key: &[u8], message: &[u8]) -> Result<Self, hmac::digest::InvalidLength> {
        Ok(Self {
            mac: HmacSha256::new_from_slice(key)?,
            message: message.to_vec(),
            counter: 0,
            block: [0u8; BLOCK_LEN],
            // Forces the first read to compute block 0
            offset: BLOCK_LEN,
        })
    }

    fn refill(&mut self) {
        let mut mac = self.mac.clone();
        mac.update(&self.message);
        mac.update(b":");
        mac.update(self.counter.to_string().as_bytes());
        self.block = mac.finalize().into_bytes().into();
        self.counter += 1;
        self.offset = 0;
    }

    pub fn next_u8(&mut self) -> u8 {
        if self.offset == BLOCK_LEN {
            self.refill();
        }
        let byte = self.block[self.offset];
        self.offset += 1;
        byte
    }

    /// Four consecutive bytes, big-endian
    pub fn next_u32(&mut self) -> u32 {
        let bytes = [self.next_u8(), self.next_u8(), self.next_u8(), self.next_u8()];
        u32::from_be_bytes(bytes)
    }

    /// Number of blocks computed so far
    pub fn blocks_used(&self) -> u64 {
        self.counter
    }
}
