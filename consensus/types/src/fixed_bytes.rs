use alloy_primitives::FixedBytes;

pub type Hash256 = alloy_primitives::B256;

pub trait FixedBytesExtended {
    fn from_low_u64_be(value: u64) -> Self;
    fn to_low_u64_be(&self) -> u64;
    fn zero() -> Self;
}

impl<const N: usize> FixedBytesExtended for FixedBytes<N> {
    fn from_low_u64_be(value: u64) -> Self {
        let value_bytes = value.to_be_bytes();
        let mut buffer = [0x0; N];
        let bytes_to_copy = value_bytes.len().min(N);
        buffer[N - bytes_to_copy..].copy_from_slice(&value_bytes[8 - bytes_to_copy..]);
        Self::from(buffer)
    }

    /// Reads the trailing (at most) 8 bytes as a big-endian integer.
    fn to_low_u64_be(&self) -> u64 {
        let bytes_to_copy = N.min(8);
        let mut result = [0u8; 8];
        result[8 - bytes_to_copy..].copy_from_slice(&self.as_slice()[N - bytes_to_copy..]);
        u64::from_be_bytes(result)
    }

    fn zero() -> Self {
        Self::ZERO
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn low_u64_be() {
        let hash = Hash256::from_low_u64_be(0xdead_beef);
        assert_eq!(&hash.as_slice()[..24], &[0; 24]);
        assert_eq!(hash.to_low_u64_be(), 0xdead_beef);
        assert_eq!(Hash256::zero(), Hash256::from_low_u64_be(0));
    }
}
