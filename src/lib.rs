mod config;
mod convert;
mod device;
mod recorder;
mod regs;
mod sys;

#[derive(Debug)]
pub enum Error {
    /// The device scan found no USB-1901 module.
    NoDevice,
    /// The channel table is empty; round-robin de-interleaving is undefined.
    NoChannels,
    /// More channels were configured than the card can scan.
    TooManyChannels,
    /// `UD_Device_Scan` failed with a driver error code.
    Scan(i16),
    /// `UD_Register_Card` failed with a driver error code.
    Register(i16),
    /// A configuration-stage driver call failed.
    Config { op: &'static str, code: i16 },
    /// A driver call failed while the acquisition was running.
    Acquire { op: &'static str, code: i16 },
    Io(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::NoDevice =>
                write!(f, "no active USB-1901 device"),
            Self::NoChannels =>
                write!(f, "no channels configured"),
            Self::TooManyChannels =>
                write!(f, "too many channels (at most {})", config::MAX_CHANNELS),
            Self::Scan(code) =>
                write!(f, "UD_Device_Scan error: {}", code),
            Self::Register(code) =>
                write!(f, "UD_Register_Card error: {}", code),
            Self::Config { op, code } =>
                write!(f, "{} error: {}", op, code),
            Self::Acquire { op, code } =>
                write!(f, "{} error: {}", op, code),
            Self::Io(io_error) =>
                write!(f, "I/O error: {}", io_error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            &Self::Io(ref io_error) => Some(io_error),
            _ => None
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(io_error: std::io::Error) -> Self {
        Error::Io(io_error)
    }
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use config::{
    ChannelConfig,
    ChannelTable,
    SessionConfig,
    VoltageRange,
    MAX_CHANNELS,
};

pub use convert::{
    full_scale_volts,
    BufferReport,
    SampleSink,
};

pub use device::HALF_BUFFER_SAMPLES;

pub use recorder::{
    record,
    Summary,
};

#[cfg(feature = "hardware")]
pub type Device =
    device::Device<crate::sys::imp::UsbDaskDriverImpl>;
#[cfg(not(feature = "hardware"))]
pub type Device =
    device::Device<crate::sys::imp::SimDriverImpl>;
