//! Encode/decode boundary.
//!
//! An [`Encoder`] runs the pre-tokenizer pipeline and hands every span's
//! bytes to a [`Vocabulary`]. The result keeps the spans next to the IDs so
//! callers can map any ID back to the input bytes it came from.
//!
//! # Performance Characteristics
//!
//! - Pieces repeat heavily (indentation, keywords, punctuation), so encoded
//!   pieces are memoized in an LRU cache keyed by an Fx hash of their bytes.
//! - [`Encoder::encode_batch`] parallelizes across texts with Rayon, never
//!   within one text.

use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use rayon::prelude::*;
use rustc_hash::FxHasher;
use thiserror::Error;

use super::byte_level::{byte_level_decode, byte_level_encode};
use super::error::PipelineError;
use super::pipeline::PreTokenizerPipeline;
use super::span::Span;
use super::vocab::{VocabError, Vocabulary};

/// Default cache size for encoded pieces
const DEFAULT_CACHE_SIZE: usize = 4096;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Vocabulary error: {0}")]
    Vocab(#[from] VocabError),
    #[error("No token for piece {0:?}")]
    UnknownPiece(String),
    #[error("Unknown token id: {0}")]
    UnknownId(u32),
    #[error("Decoding error: invalid UTF-8")]
    Utf8Error,
}

/// Pieces and IDs for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenizationResult {
    /// Each span with its byte-level token text.
    pub pieces: Vec<(Span, String)>,
    pub ids: Vec<u32>,
    /// For every ID, the index into `pieces` that produced it.
    pub piece_of: Vec<usize>,
}

impl TokenizationResult {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.pieces.iter().map(|(span, _)| span)
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.pieces.iter().map(|(_, token)| token.as_str())
    }

    /// Input byte range of the piece that produced each ID.
    pub fn offsets(&self) -> Vec<(usize, usize)> {
        self.piece_of
            .iter()
            .map(|&i| (self.pieces[i].0.start, self.pieces[i].0.end))
            .collect()
    }

    /// Rebuild the input from the token texts, dropping synthetic spaces.
    pub fn reconstruct(&self) -> Result<String, EncodeError> {
        let mut bytes = Vec::new();
        for (span, token) in &self.pieces {
            let raw = byte_level_decode(token).ok_or(EncodeError::Utf8Error)?;
            let skip = usize::from(span.prefix_space && raw.first() == Some(&b' '));
            bytes.extend_from_slice(&raw[skip..]);
        }
        String::from_utf8(bytes).map_err(|_| EncodeError::Utf8Error)
    }
}

/// Pipeline plus vocabulary.
pub struct Encoder<V: Vocabulary> {
    pipeline: PreTokenizerPipeline,
    vocab: V,
    chunk_cache: Mutex<LruCache<u64, Vec<u32>>>,
    cache_size: usize,
}

impl<V: Vocabulary> Encoder<V> {
    pub fn new(pipeline: PreTokenizerPipeline, vocab: V) -> Self {
        Self::with_cache_size(pipeline, vocab, DEFAULT_CACHE_SIZE)
    }

    pub fn with_cache_size(pipeline: PreTokenizerPipeline, vocab: V, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            pipeline,
            vocab,
            chunk_cache: Mutex::new(LruCache::new(capacity)),
            cache_size,
        }
    }

    pub fn pipeline(&self) -> &PreTokenizerPipeline {
        &self.pipeline
    }

    pub fn vocabulary(&self) -> &V {
        &self.vocab
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
    }

    /// Number of memoized pieces.
    pub fn cache_len(&self) -> usize {
        self.chunk_cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.clear();
        }
    }

    #[inline]
    fn hash_slice(slice: &[u8]) -> u64 {
        let mut hasher = FxHasher::default();
        slice.hash(&mut hasher);
        hasher.finish()
    }

    fn encode_piece_with_cache(&self, bytes: &[u8]) -> Result<Vec<u32>, EncodeError> {
        let hash = Self::hash_slice(bytes);
        if let Ok(mut cache) = self.chunk_cache.lock() {
            if let Some(cached) = cache.get(&hash) {
                return Ok(cached.clone());
            }
        }

        let ids = self
            .vocab
            .encode_piece(bytes)
            .ok_or_else(|| EncodeError::UnknownPiece(String::from_utf8_lossy(bytes).into_owned()))?;

        if let Ok(mut cache) = self.chunk_cache.lock() {
            cache.put(hash, ids.clone());
        }

        Ok(ids)
    }

    /// Pre-tokenize `text` and map every piece to IDs.
    pub fn encode(&self, text: &str) -> Result<TokenizationResult, EncodeError> {
        let spans = self.pipeline.run(text)?;

        let mut pieces = Vec::with_capacity(spans.len());
        let mut ids = Vec::with_capacity(text.len() / 2);
        let mut piece_of = Vec::with_capacity(text.len() / 2);

        for (index, span) in spans.into_iter().enumerate() {
            let bytes = span.token_bytes(text);
            let piece_ids = self.encode_piece_with_cache(&bytes)?;
            piece_of.extend(std::iter::repeat(index).take(piece_ids.len()));
            ids.extend(piece_ids);
            pieces.push((span, byte_level_encode(&bytes)));
        }

        Ok(TokenizationResult {
            pieces,
            ids,
            piece_of,
        })
    }

    /// Only the IDs of [`encode`](Self::encode).
    pub fn encode_ids(&self, text: &str) -> Result<Vec<u32>, EncodeError> {
        Ok(self.encode(text)?.ids)
    }

    pub fn encode_batch(&self, texts: &[String]) -> Result<Vec<TokenizationResult>, EncodeError> {
        texts.par_iter().map(|text| self.encode(text)).collect()
    }

    /// Raw bytes for `ids`, synthetic spaces included.
    pub fn decode_bytes(&self, ids: &[u32]) -> Result<Vec<u8>, EncodeError> {
        let mut result = Vec::with_capacity(ids.len() * 4);
        for &id in ids {
            let bytes = self.vocab.piece_bytes(id).ok_or(EncodeError::UnknownId(id))?;
            result.extend_from_slice(bytes);
        }
        Ok(result)
    }

    pub fn decode(&self, ids: &[u32]) -> Result<String, EncodeError> {
        let bytes = self.decode_bytes(ids)?;
        String::from_utf8(bytes).map_err(|_| EncodeError::Utf8Error)
    }

    /// Decode, skipping unknown IDs and replacing invalid UTF-8.
    pub fn decode_lossy(&self, ids: &[u32]) -> String {
        let bytes: Vec<u8> = ids
            .iter()
            .filter_map(|&id| self.vocab.piece_bytes(id))
            .flatten()
            .copied()
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn decode_batch(&self, id_lists: &[Vec<u32>]) -> Result<Vec<String>, EncodeError> {
        id_lists.par_iter().map(|ids| self.decode(ids)).collect()
    }
}
