//! Frame codec for the encrypted IP-control channel.
//!
//! A frame is `AES-128-ECB(iv) || AES-128-CBC(iv, padded message)`. The key is
//! derived once per client from the keycode shown on the TV.

use crate::error::cipher::CipherError;

use common::ErrorLocation;

use std::panic::Location;

use aes::Aes128;
use aes::cipher::block_padding::NoPadding;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockDecrypt, BlockDecryptMut, BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::Zeroize;

pub const BLOCK_SIZE: usize = 16;

const KEY_ITERATIONS: u32 = 16_384;
const KEY_SALT: [u8; 16] = [
    0x63, 0x61, 0xb8, 0x0e, 0x9b, 0xdc, 0xa6, 0x63, 0x8d, 0x07, 0x20, 0xf2, 0xcc, 0x56, 0x8f, 0xb9,
];

const REQUEST_TERMINATOR: u8 = b'\r';
const LINE_TERMINATORS: [char; 2] = ['\n', '\r'];

type CbcEncryptor = cbc::Encryptor<Aes128>;
type CbcDecryptor = cbc::Decryptor<Aes128>;

/// Encoder/decoder bound to one derived key.
pub struct MessageCipher {
    key: [u8; BLOCK_SIZE],
}

impl MessageCipher {
    /// Derive the key (PBKDF2-HMAC-SHA256) from the device keycode.
    pub fn new(secret: &str) -> Self {
        let mut key = [0u8; BLOCK_SIZE];
        pbkdf2_hmac::<Sha256>(secret.as_bytes(), &KEY_SALT, KEY_ITERATIONS, &mut key);
        Self { key }
    }

    /// Encrypt one request with a fresh random IV.
    pub fn encode(&self, message: &str) -> Vec<u8> {
        let mut iv = [0u8; BLOCK_SIZE];
        OsRng.fill_bytes(&mut iv);
        self.encode_with_iv(message, iv)
    }

    pub(crate) fn encode_with_iv(&self, message: &str, iv: [u8; BLOCK_SIZE]) -> Vec<u8> {
        let padded = pad(message);

        let mut iv_block = GenericArray::clone_from_slice(&iv);
        Aes128::new(&self.key.into()).encrypt_block(&mut iv_block);

        let body = CbcEncryptor::new(&self.key.into(), &iv.into())
            .encrypt_padded_vec_mut::<NoPadding>(&padded);

        let mut frame = Vec::with_capacity(BLOCK_SIZE + body.len());
        frame.extend_from_slice(&iv_block);
        frame.extend_from_slice(&body);
        frame
    }

    /// Decrypt one frame and return the text up to the first line terminator.
    ///
    /// Both `\n` and `\r` end the text, so a frame built by [`Self::encode`]
    /// (which appends `\r`) decodes to its original message. A device reply
    /// with a `\r` inside it comes back cut short at that `\r`.
    pub fn decode(&self, frame: &[u8]) -> Result<String, CipherError> {
        if frame.len() < BLOCK_SIZE || frame.len() % BLOCK_SIZE != 0 {
            return Err(CipherError::FrameDecode {
                message: format!(
                    "Frame of {} bytes is not a whole number of {BLOCK_SIZE}-byte blocks",
                    frame.len()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (iv_block, body) = frame.split_at(BLOCK_SIZE);

        let mut iv = GenericArray::clone_from_slice(iv_block);
        Aes128::new(&self.key.into()).decrypt_block(&mut iv);

        let plain = CbcDecryptor::new(&self.key.into(), &iv)
            .decrypt_padded_vec_mut::<NoPadding>(body)
            .map_err(|e| CipherError::FrameDecode {
                message: format!("Failed to decrypt frame body: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        let text = String::from_utf8_lossy(&plain);
        let end = text.find(LINE_TERMINATORS).ok_or_else(|| CipherError::FrameDecode {
            message: "Decrypted frame has no line terminator".to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(text[..end].to_string())
    }
}

impl Drop for MessageCipher {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

/// Terminate with `\r`, then pad to the block size with `n` bytes of value `n`.
///
/// A terminated message that already fills whole blocks gets one extra space
/// first, so padding always adds at least one byte.
pub(crate) fn pad(message: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(message.len() + 1 + BLOCK_SIZE);
    bytes.extend_from_slice(message.as_bytes());
    bytes.push(REQUEST_TERMINATOR);

    if bytes.len() % BLOCK_SIZE == 0 {
        bytes.push(b' ');
    }

    let padding = BLOCK_SIZE - bytes.len() % BLOCK_SIZE;
    bytes.resize(bytes.len() + padding, padding as u8);
    bytes
}
