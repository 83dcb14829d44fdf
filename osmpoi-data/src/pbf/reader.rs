//! Outer framing: `[u32 big-endian length][BlobHeader][Blob]`, repeated.

use std::io::{self, Read};

use byteorder::{ByteOrder, NetworkEndian};
use flate2::read::ZlibDecoder;
use log::warn;
use prost::Message;
use thiserror::Error;

use super::BlockDecodeError;
use super::proto::{Blob, BlobHeader};

/// Upper bound on a serialised `BlobHeader`.
const MAX_HEADER_LEN: u32 = 64 * 1024;
/// Upper bound on a serialised `Blob`.
const MAX_BLOB_LEN: i32 = 32 * 1024 * 1024;
/// Upper bound on an inflated payload.
const MAX_RAW_LEN: u64 = 32 * 1024 * 1024;

/// Errors that make the remainder of a file unreachable.
#[derive(Debug, Error)]
pub enum PbfReadError {
    /// The underlying reader failed.
    #[error("failed to read blob {block}")]
    Io {
        /// Zero-based index of the blob being read.
        block: usize,
        /// Source error.
        #[source]
        source: io::Error,
    },
    /// The framing is truncated or inconsistent.
    #[error("broken framing at blob {block}: {reason}")]
    Framing {
        /// Zero-based index of the blob being read.
        block: usize,
        /// What was wrong.
        reason: String,
    },
}

/// Kind of payload announced by a `BlobHeader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobKind {
    /// File header with bounding box and required features.
    Header,
    /// Element data.
    Data,
}

/// A framed blob, not yet inflated.
#[derive(Debug, Clone)]
pub struct RawBlob {
    /// Zero-based position of the blob within the file.
    pub index: usize,
    /// Announced payload kind.
    pub kind: BlobKind,
    /// Serialised `Blob` message.
    pub bytes: Vec<u8>,
}

impl RawBlob {
    /// Decompress the payload and check its declared size.
    ///
    /// # Errors
    ///
    /// Returns [`BlockDecodeError`] when the `Blob` message is malformed, the
    /// compression is unsupported, inflation fails, the payload inflates past
    /// its declared size, or the inflated size does not match `raw_size`.
    pub fn inflate(&self) -> Result<Vec<u8>, BlockDecodeError> {
        let blob = Blob::decode(self.bytes.as_slice())?;
        let data = if let Some(raw) = blob.raw {
            raw
        } else if let Some(compressed) = blob.zlib_data {
            let limit = blob
                .raw_size
                .and_then(|declared| u64::try_from(declared).ok())
                .map_or(MAX_RAW_LEN, |declared| declared.min(MAX_RAW_LEN));
            let mut inflated = Vec::new();
            ZlibDecoder::new(compressed.as_slice())
                .take(limit.saturating_add(1))
                .read_to_end(&mut inflated)
                .map_err(BlockDecodeError::Inflate)?;
            if u64::try_from(inflated.len()).map_or(true, |len| len > limit) {
                return Err(BlockDecodeError::InflateLimit { limit });
            }
            inflated
        } else {
            return Err(BlockDecodeError::UnsupportedCompression);
        };

        if let Some(declared) = blob.raw_size
            && usize::try_from(declared).ok() != Some(data.len())
        {
            return Err(BlockDecodeError::SizeMismatch {
                declared,
                actual: data.len(),
            });
        }
        Ok(data)
    }
}

/// Sequential blob reader over any byte source.
///
/// Unknown blob types are skipped with a warning. Iteration stops after the
/// first error.
#[derive(Debug)]
pub struct PbfReader<R> {
    reader: R,
    next_index: usize,
    finished: bool,
}

impl<R: Read> PbfReader<R> {
    /// Wrap `reader`, which should be buffered.
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            next_index: 0,
            finished: false,
        }
    }

    fn read_blob(&mut self) -> Result<Option<RawBlob>, PbfReadError> {
        loop {
            let block = self.next_index;
            let Some(header_len) = self.read_length(block)? else {
                return Ok(None);
            };
            if header_len > MAX_HEADER_LEN {
                return Err(framing(block, format!("header length {header_len} too large")));
            }

            let header_len = usize::try_from(header_len)
                .map_err(|_| framing(block, format!("header length {header_len} too large")))?;
            let header_bytes = self.read_exact_vec(block, header_len)?;
            let header = BlobHeader::decode(header_bytes.as_slice())
                .map_err(|err| framing(block, format!("undecodable blob header: {err}")))?;
            let datasize = usize::try_from(header.datasize)
                .ok()
                .filter(|_| header.datasize <= MAX_BLOB_LEN)
                .ok_or_else(|| {
                    framing(block, format!("blob size {} out of range", header.datasize))
                })?;
            let bytes = self.read_exact_vec(block, datasize)?;
            self.next_index += 1;

            let kind = match header.r#type.as_str() {
                "OSMHeader" => BlobKind::Header,
                "OSMData" => BlobKind::Data,
                other => {
                    warn!("Skipping blob {block} of unknown type {other:?}");
                    continue;
                }
            };
            return Ok(Some(RawBlob {
                index: block,
                kind,
                bytes,
            }));
        }
    }

    /// Read the length prefix; `None` on a clean end of input.
    fn read_length(&mut self, block: usize) -> Result<Option<u32>, PbfReadError> {
        let mut buf = [0_u8; 4];
        let mut filled = 0;
        while let Some(rest) = buf.get_mut(filled..).filter(|rest| !rest.is_empty()) {
            match self.reader.read(rest) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(PbfReadError::Io { block, source }),
            }
        }
        match filled {
            0 => Ok(None),
            4 => Ok(Some(NetworkEndian::read_u32(&buf))),
            partial => Err(framing(block, format!("truncated length prefix ({partial} bytes)"))),
        }
    }

    fn read_exact_vec(&mut self, block: usize, len: usize) -> Result<Vec<u8>, PbfReadError> {
        let mut buf = vec![0; len];
        self.reader.read_exact(&mut buf).map_err(|source| {
            if source.kind() == io::ErrorKind::UnexpectedEof {
                framing(block, format!("truncated after announcing {len} bytes"))
            } else {
                PbfReadError::Io { block, source }
            }
        })?;
        Ok(buf)
    }
}

impl<R: Read> Iterator for PbfReader<R> {
    type Item = Result<RawBlob, PbfReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let next = self.read_blob();
        if !matches!(next, Ok(Some(_))) {
            self.finished = true;
        }
        next.transpose()
    }
}

fn framing(block: usize, reason: String) -> PbfReadError {
    PbfReadError::Framing { block, reason }
}
