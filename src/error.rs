use std::{error::Error, fmt, io, path::PathBuf};

use safetensors::SafeTensorError;

/// The crate's result type.
pub type Result<T> = std::result::Result<T, NetErr>;

/// Training-time failures: dataset files, configuration, checkpoints.
#[derive(Debug)]
pub enum NetErr {
    Io(io::Error),
    BadMagic {
        path: PathBuf,
        got: u32,
        expected: u32,
    },
    Truncated {
        path: PathBuf,
        got: usize,
        expected: usize,
    },
    SampleCountMismatch {
        images: usize,
        labels: usize,
    },
    BadLabel {
        path: PathBuf,
        index: usize,
        label: u8,
    },
    Config(serde_json::Error),
    Checkpoint(SafeTensorError),
    TensorShapeMismatch {
        name: String,
        got: Vec<usize>,
        expected: Vec<usize>,
    },
    Init {
        reason: String,
    },
}

impl fmt::Display for NetErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetErr::Io(e) => write!(f, "io error: {e}"),
            NetErr::BadMagic {
                path,
                got,
                expected,
            } => write!(
                f,
                "bad magic number in {}: got {got}, expected {expected}",
                path.display()
            ),
            NetErr::Truncated {
                path,
                got,
                expected,
            } => write!(
                f,
                "truncated file {}: got {got} bytes, expected {expected}",
                path.display()
            ),
            NetErr::SampleCountMismatch { images, labels } => write!(
                f,
                "sample count mismatch: {images} images but {labels} labels"
            ),
            NetErr::BadLabel { path, index, label } => write!(
                f,
                "label {label} at index {index} in {} is out of range",
                path.display()
            ),
            NetErr::Config(e) => write!(f, "config error: {e}"),
            NetErr::Checkpoint(e) => write!(f, "checkpoint error: {e}"),
            NetErr::TensorShapeMismatch {
                name,
                got,
                expected,
            } => write!(
                f,
                "tensor shape mismatch for {name}: got {got:?}, expected {expected:?}"
            ),
            NetErr::Init { reason } => write!(f, "weight init error: {reason}"),
        }
    }
}

impl Error for NetErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetErr::Io(e) => Some(e),
            NetErr::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for NetErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for NetErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Config(value)
    }
}

impl From<SafeTensorError> for NetErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Checkpoint(value)
    }
}

/// Boundary conversion for binaries / I/O APIs.
impl From<NetErr> for io::Error {
    fn from(value: NetErr) -> Self {
        match value {
            NetErr::Io(e) => e,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
