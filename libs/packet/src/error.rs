#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid packet length: {len} bytes (expected {expected})", expected = crate::PACKET_LEN)]
    InvalidLength { len: usize },
}
