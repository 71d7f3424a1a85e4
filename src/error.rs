use std::array::TryFromSliceError;

/// [Result] alias for return types of the crate API
pub type Result<T> = std::result::Result<T, Error>;

/// Error enum type
#[derive(Debug)]
pub enum Error {
    /// A mocap datagram could not be decoded. The String contains the reason.
    MalformedPacket(String),
    /// Socket error while receiving mocap data.
    IoError(std::io::Error),
    /// Error returned by the Crazyflie lib. Returns the [error from the lib](crazyflie_lib::Error).
    CrazyflieError(crazyflie_lib::Error),
    /// Trajectory definition error. The String contains the reason.
    TrajectoryError(String),
    /// Invalid argument passed to a function. The String contains the reason.
    InvalidArgument(String),
    /// Memory subsystem error. The String contains the reason.
    MemoryError(String),
    /// The Crazyflie or the pose relay is disconnected.
    Disconnected,
    /// Operation timed out.
    Timeout,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedPacket(reason) => write!(f, "malformed mocap packet: {}", reason),
            Error::IoError(e) => write!(f, "socket error: {}", e),
            Error::CrazyflieError(e) => write!(f, "crazyflie error: {:?}", e),
            Error::TrajectoryError(reason) => write!(f, "trajectory error: {}", reason),
            Error::InvalidArgument(reason) => write!(f, "invalid argument: {}", reason),
            Error::MemoryError(reason) => write!(f, "memory error: {}", reason),
            Error::Disconnected => write!(f, "disconnected"),
            Error::Timeout => write!(f, "operation timed out"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TryFromSliceError> for Error {
    fn from(e: TryFromSliceError) -> Self {
        Self::MalformedPacket(format!("{:?}", e))
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::IoError(error)
    }
}

impl From<crazyflie_lib::Error> for Error {
    fn from(error: crazyflie_lib::Error) -> Self {
        match error {
            crazyflie_lib::Error::Disconnected => Self::Disconnected,
            error => Self::CrazyflieError(error),
        }
    }
}

impl From<flume::RecvError> for Error {
    fn from(_: flume::RecvError) -> Self {
        self::Error::Disconnected
    }
}

impl<T> From<flume::SendError<T>> for Error {
    fn from(_: flume::SendError<T>) -> Self {
        self::Error::Disconnected
    }
}

impl From<tokio::time::error::Elapsed> for Error {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        self::Error::Timeout
    }
}
