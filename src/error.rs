//! Error types for the sentral-fusion crate

use core::fmt;

/// Calibration failures that do not involve the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Fewer samples were collected than the procedure requires
    Incomplete {
        /// Number of samples the procedure needs
        required: usize,
        /// Number of samples actually collected
        collected: usize,
    },
    /// A magnetometer axis never changed during the rotation sweep, so its
    /// soft-iron scale is undefined (contains the axis index, 0 = X)
    NoRotation {
        /// Axis index (0 = X, 1 = Y, 2 = Z)
        axis: usize,
    },
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete { required, collected } => write!(
                f,
                "calibration incomplete: collected {collected} of {required} samples"
            ),
            Self::NoRotation { axis } => {
                write!(f, "magnetometer axis {axis} did not move during calibration")
            }
        }
    }
}

/// Driver errors
///
/// Generic over the error type of the underlying [`RegisterBus`](crate::bus::RegisterBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The register transport reported a failure
    Transport(E),
    /// The co-processor did not acknowledge a parameter transfer within the
    /// configured poll budget. The request register is left as it was; call
    /// [`Sentral::abort_transfer`](crate::sentral::Sentral::abort_transfer)
    /// to clear it.
    AckTimeout {
        /// Request byte that was never acknowledged
        parameter: u8,
        /// Number of acknowledge reads performed
        polls: u32,
    },
    /// Calibration could not produce a result
    Calibration(CalibrationError),
    /// Parameter identifiers are 7 bits wide (contains the rejected id)
    InvalidParameter(u8),
    /// A previous transfer left its handshake unfinished and was never
    /// aborted (contains the outstanding request byte)
    TransferPending(u8),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Transport(error)
    }
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "register transport failed: {e:?}"),
            Self::AckTimeout { parameter, polls } => write!(
                f,
                "parameter 0x{parameter:02X} not acknowledged after {polls} polls"
            ),
            Self::Calibration(e) => write!(f, "{e}"),
            Self::InvalidParameter(id) => {
                write!(f, "parameter id 0x{id:02X} does not fit in 7 bits")
            }
            Self::TransferPending(request) => {
                write!(f, "parameter request 0x{request:02X} still awaits acknowledge")
            }
        }
    }
}

