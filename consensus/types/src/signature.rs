use ssz_types::{typenum::U96, FixedVector};

/// Length in bytes of a compressed BLS signature.
pub const SIGNATURE_BYTES_LEN: usize = 96;

/// An opaque, serialized (possibly aggregate) BLS signature.
///
/// Signatures are verified before they reach this crate's consumers, so they are carried as raw
/// bytes and only ever compared, hashed and persisted.
pub type SignatureBytes = FixedVector<u8, U96>;

/// The all-zeros signature, used by tests and as a placeholder.
pub fn empty_signature() -> SignatureBytes {
    FixedVector::from_elem(0)
}
