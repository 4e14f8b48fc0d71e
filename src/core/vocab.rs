//! Vocabulary models behind the encode/decode boundary.
//!
//! The merge model that maps pieces to IDs is an external collaborator; this
//! module only defines the seam ([`Vocabulary`]) and two models that sit on
//! it:
//!
//! - [`ByteVocabulary`]: identity model, byte `b` is ID `b`. Every input
//!   round-trips, which makes it the reference model for tests.
//! - [`TableVocabulary`]: a fixed piece table loaded from the tiktoken text
//!   format. A piece is looked up whole; if absent, each of its bytes is
//!   looked up on its own.
//!
//! # Tiktoken Format
//!
//! One entry per line: the base64-encoded piece, a space, its ID.
//!
//! ```text
//! ZGVm 0
//! cmV0dXJu 1
//! IA== 2
//! ```
//!
//! decodes to `def` → 0, `return` → 1, ` ` → 2.

use base64::{engine::general_purpose::STANDARD, Engine};
use rustc_hash::FxHashMap;
use thiserror::Error;

use super::byte_level::{byte_level_decode, byte_level_encode};

/// Errors that can occur when loading vocabulary files.
#[derive(Error, Debug)]
pub enum VocabError {
    #[error("Invalid base64 encoding: {0}")]
    Base64Error(#[from] base64::DecodeError),
    #[error("Invalid line format at line {line}: {reason}")]
    ParseError { line: usize, reason: String },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A piece table that turns span bytes into IDs and back.
pub trait Vocabulary: Send + Sync {
    /// IDs for one piece, as raw bytes (synthetic space included).
    ///
    /// Returns `None` if some byte of the piece has no ID.
    fn encode_piece(&self, piece: &[u8]) -> Option<Vec<u32>>;

    /// Raw bytes of one ID.
    fn piece_bytes(&self, id: u32) -> Option<&[u8]>;

    fn vocab_size(&self) -> usize;
}

const IDENTITY: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    table
};

/// Identity model: one ID per byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteVocabulary;

impl Vocabulary for ByteVocabulary {
    fn encode_piece(&self, piece: &[u8]) -> Option<Vec<u32>> {
        Some(piece.iter().map(|&b| u32::from(b)).collect())
    }

    fn piece_bytes(&self, id: u32) -> Option<&[u8]> {
        let index = usize::try_from(id).ok().filter(|&i| i < IDENTITY.len())?;
        Some(std::slice::from_ref(&IDENTITY[index]))
    }

    fn vocab_size(&self) -> usize {
        IDENTITY.len()
    }
}

/// A fixed piece table.
///
/// In byte-level mode the stored pieces are byte-level text (`Ġdef`), as in
/// GPT-2 style vocabularies: lookups render the raw piece first and decoding
/// maps the stored text back to raw bytes.
#[derive(Debug, Clone, Default)]
pub struct TableVocabulary {
    encoder: FxHashMap<Vec<u8>, u32>,
    /// ID to raw bytes.
    decoder: FxHashMap<u32, Vec<u8>>,
    byte_level: bool,
}

impl TableVocabulary {
    /// Table over raw byte pieces.
    pub fn new(encoder: FxHashMap<Vec<u8>, u32>) -> Self {
        let decoder = build_decoder(&encoder);
        Self {
            encoder,
            decoder,
            byte_level: false,
        }
    }

    /// Table whose keys are byte-level text.
    pub fn new_byte_level(encoder: FxHashMap<Vec<u8>, u32>) -> Self {
        let decoder = encoder
            .iter()
            .map(|(piece, &id)| {
                let raw = std::str::from_utf8(piece)
                    .ok()
                    .and_then(byte_level_decode)
                    .unwrap_or_else(|| piece.clone());
                (id, raw)
            })
            .collect();
        Self {
            encoder,
            decoder,
            byte_level: true,
        }
    }

    pub fn from_tiktoken(data: &[u8]) -> Result<Self, VocabError> {
        Ok(Self::new(load_tiktoken_bpe(data)?))
    }

    pub fn from_tiktoken_file(path: &str) -> Result<Self, VocabError> {
        Ok(Self::new(load_tiktoken_bpe_file(path)?))
    }

    pub fn is_byte_level(&self) -> bool {
        self.byte_level
    }

    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    fn key(&self, bytes: &[u8]) -> Vec<u8> {
        if self.byte_level {
            byte_level_encode(bytes).into_bytes()
        } else {
            bytes.to_vec()
        }
    }
}

impl Vocabulary for TableVocabulary {
    fn encode_piece(&self, piece: &[u8]) -> Option<Vec<u32>> {
        if let Some(&id) = self.encoder.get(&self.key(piece)) {
            return Some(vec![id]);
        }
        piece
            .iter()
            .map(|b| self.encoder.get(&self.key(std::slice::from_ref(b))).copied())
            .collect()
    }

    fn piece_bytes(&self, id: u32) -> Option<&[u8]> {
        self.decoder.get(&id).map(Vec::as_slice)
    }

    fn vocab_size(&self) -> usize {
        self.decoder.keys().max().map_or(0, |&max| max as usize + 1)
    }
}

/// Parse one `base64 id` line.
fn parse_line(line: &[u8], number: usize) -> Result<(Vec<u8>, u32), VocabError> {
    let space_pos = line
        .iter()
        .rposition(|&b| b == b' ')
        .ok_or_else(|| VocabError::ParseError {
            line: number,
            reason: "missing space separator".to_string(),
        })?;

    let token = STANDARD.decode(&line[..space_pos])?;

    let rank_str = std::str::from_utf8(&line[space_pos + 1..]).map_err(|_| VocabError::ParseError {
        line: number,
        reason: "invalid UTF-8 in id".to_string(),
    })?;
    let rank: u32 = rank_str.trim().parse().map_err(|_| VocabError::ParseError {
        line: number,
        reason: format!("invalid id: {}", rank_str),
    })?;

    Ok((token, rank))
}

/// Load a tiktoken vocabulary from raw bytes.
///
/// If a piece appears twice, the first (lowest line) entry wins.
pub fn load_tiktoken_bpe(data: &[u8]) -> Result<FxHashMap<Vec<u8>, u32>, VocabError> {
    let mut encoder = FxHashMap::default();

    for (number, line) in data.split(|&b| b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.is_empty() {
            continue;
        }
        let (token, rank) = parse_line(line, number + 1)?;
        encoder.entry(token).or_insert(rank);
    }

    Ok(encoder)
}

/// Load a tiktoken vocabulary from a file path.
pub fn load_tiktoken_bpe_file(path: &str) -> Result<FxHashMap<Vec<u8>, u32>, VocabError> {
    let data = std::fs::read(path)?;
    load_tiktoken_bpe(&data)
}

/// Inverse of an encoder map.
pub fn build_decoder(encoder: &FxHashMap<Vec<u8>, u32>) -> FxHashMap<u32, Vec<u8>> {
    encoder.iter().map(|(k, v)| (*v, k.clone())).collect()
}
