use thiserror::Error;

/// Everything that can go wrong while encoding or decoding a stream.
///
/// Errors are cloneable so an engine can hand the same error back on every call made
/// after it failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerializationError {
    /// A read needed more bytes than the stream has left.
    #[error("out of data at byte {position}: needed {needed} bytes but only {remaining} remain")]
    OutOfData {
        needed: usize,
        remaining: usize,
        position: usize,
    },
    /// The stream held a different marker than the one the reader expected.
    #[error("bad tag at byte {position}: expected {expected}, found {found:#08x}")]
    BadTag {
        expected: &'static str,
        found: u32,
        position: usize,
    },
    /// Reader and writer disagree about the structure of the stream.
    #[error("stream out of sync: {0}")]
    SyncError(String),
    /// A class tag or external reference that nothing is registered for.
    #[error("unknown object: {0}")]
    UnknownObject(String),
    /// The stream header carries a version this release cannot handle.
    #[error("unsupported stream version {found} (newest supported is {supported})")]
    UnsupportedVersion { found: u8, supported: u8 },
}

pub type SerializationResult<T> = Result<T, SerializationError>;
