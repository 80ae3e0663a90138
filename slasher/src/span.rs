use crate::Error;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use ssz::{Decode, Encode};
use ssz_derive::{Decode, Encode};
use std::io::{Read, Write};
use types::Epoch;

/// Distances from one epoch to the closest and furthest targets that would surround, or be
/// surrounded by, a vote with that source.
///
/// A zero distance means no constraint has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
pub struct MinMaxEpochSpan {
    /// Minimum over recorded votes `(s', t')` with `s' > epoch` of `t' - epoch`.
    pub min_epoch_span: u32,
    /// Maximum over recorded votes `(s', t')` with `s' < epoch` of `t' - epoch`.
    pub max_epoch_span: u32,
}

impl MinMaxEpochSpan {
    /// Smallest target of a vote with a later source, if any.
    pub fn min_target(&self, epoch: Epoch) -> Option<Epoch> {
        (self.min_epoch_span != 0).then(|| epoch + u64::from(self.min_epoch_span))
    }

    /// Largest target of a vote with an earlier source, if any.
    pub fn max_target(&self, epoch: Epoch) -> Option<Epoch> {
        (self.max_epoch_span != 0).then(|| epoch + u64::from(self.max_epoch_span))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct EpochSpanEntry {
    pub epoch: Epoch,
    pub span: MinMaxEpochSpan,
}

/// Sparse `epoch -> MinMaxEpochSpan` mapping for a single validator.
///
/// Entries are kept sorted by epoch, which is also the persisted order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Encode, Decode)]
pub struct EpochSpanMap {
    epoch_span_map: Vec<EpochSpanEntry>,
}

impl EpochSpanMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, epoch: Epoch) -> Result<usize, usize> {
        self.epoch_span_map
            .binary_search_by_key(&epoch, |entry| entry.epoch)
    }

    /// The span at `epoch`, `{0, 0}` if never written.
    pub fn get(&self, epoch: Epoch) -> MinMaxEpochSpan {
        self.position(epoch)
            .map(|i| self.epoch_span_map[i].span)
            .unwrap_or_default()
    }

    fn entry(&mut self, epoch: Epoch) -> &mut MinMaxEpochSpan {
        let i = match self.position(epoch) {
            Ok(i) => i,
            Err(i) => {
                self.epoch_span_map.insert(
                    i,
                    EpochSpanEntry {
                        epoch,
                        span: MinMaxEpochSpan::default(),
                    },
                );
                i
            }
        };
        &mut self.epoch_span_map[i].span
    }

    pub fn set_min_span(&mut self, epoch: Epoch, min_epoch_span: u32) {
        self.entry(epoch).min_epoch_span = min_epoch_span;
    }

    pub fn set_max_span(&mut self, epoch: Epoch, max_epoch_span: u32) {
        self.entry(epoch).max_epoch_span = max_epoch_span;
    }

    /// Drop every entry for an epoch before `min_epoch`.
    pub fn prune(&mut self, min_epoch: Epoch) {
        let keep_from = self.position(min_epoch).unwrap_or_else(|i| i);
        self.epoch_span_map.drain(..keep_from);
    }

    pub fn len(&self) -> usize {
        self.epoch_span_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epoch_span_map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EpochSpanEntry> {
        self.epoch_span_map.iter()
    }

    /// SSZ-encode then zlib-compress.
    pub fn to_compressed_bytes(&self) -> Result<Vec<u8>, Error> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&self.as_ssz_bytes())?;
        Ok(encoder.finish()?)
    }

    pub fn from_compressed_bytes(bytes: &[u8]) -> Result<Self, Error> {
        let mut ssz_bytes = vec![];
        ZlibDecoder::new(bytes).read_to_end(&mut ssz_bytes)?;
        let map = Self::from_ssz_bytes(&ssz_bytes)?;

        let sorted = map
            .epoch_span_map
            .windows(2)
            .all(|pair| pair[0].epoch < pair[1].epoch);
        if sorted {
            Ok(map)
        } else {
            Err(Error::EpochSpanMapCorrupt)
        }
    }
}
