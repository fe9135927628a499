//! Error types for `Fifo` operations.

#[cfg(feature = "std")]
use std::error;
use std::fmt;

/// Error value returned by `Fifo` operations.
///
/// None of these are fatal. `BufferFull` and `BufferEmpty` are the normal
/// backpressure signals of a producer and a consumer running at different
/// rates; only `InvalidArgument` leaves the caller without a usable buffer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The backing storage is empty or the requested capacity does not fit it.
    InvalidArgument,
    /// A write hit a full, non-overwriting buffer. The byte was discarded.
    BufferFull,
    /// A read found nothing to return.
    BufferEmpty,
}

impl Error {
    fn as_str(&self) -> &'static str {
        match *self {
            Error::InvalidArgument => "invalid fifo storage or capacity",
            Error::BufferFull => "fifo is full",
            Error::BufferEmpty => "fifo is empty",
        }
    }
}

#[cfg(feature = "std")]
impl error::Error for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Error::BufferFull.to_string(), "fifo is full");
        assert_eq!(Error::BufferEmpty.to_string(), "fifo is empty");
        assert_eq!(Error::InvalidArgument.to_string(), "invalid fifo storage or capacity");
    }

    #[cfg(feature = "std")]
    #[test]
    fn is_std_error() {
        fn assert_error<E: std::error::Error>(_: &E) {}
        assert_error(&Error::BufferFull);
    }
}
