use thiserror::Error;

pub type Result<T> = std::result::Result<T, SortError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SortError {
    #[error("buffer `{buffer}` holds {actual} elements, expected at least {expected}")]
    LengthMismatch {
        buffer: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("bit range [{begin_bit}, {end_bit}) exceeds the {key_bits} bits of the key")]
    InvalidBitRange {
        begin_bit: u32,
        end_bit: u32,
        key_bits: u32,
    },
    #[error("scratch buffer holds {provided} bytes, sort needs {required}")]
    ScratchTooSmall { required: usize, provided: usize },
    #[error("segment offset {offset} at index {index} lies outside [0, {count}]")]
    SegmentOutOfRange {
        index: usize,
        offset: usize,
        count: usize,
    },
    #[error("segment offset {offset} at index {index} is smaller than its predecessor {previous}")]
    SegmentsNotAscending {
        index: usize,
        previous: usize,
        offset: usize,
    },
    #[error("the same device buffer was passed for two distinct arguments")]
    AliasedBuffers,
    #[error("no usable device: {0}")]
    DeviceUnavailable(String),
    #[error("stream worker has shut down")]
    StreamClosed,
    #[error("kernel failed on stream: {0}")]
    Kernel(String),
}
