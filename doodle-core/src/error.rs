//! Crate-wide error type.
//!
//! Lookups that miss return [`Error::NotFound`] and are expected in normal operation. Decode failures
//! abort the load they occur in. Nothing in here is fatal to a running game loop.

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], for callers that only care about the category.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, strum::Display)]
pub enum ErrorKind {
    NotFound,
    Malformed,
    IndexOutOfRange,
    UnsupportedFormat,
    Busy,
    Invariant,
    Io,
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0} not found")]
    NotFound(String),
    #[error("malformed data: {0}")]
    Malformed(String),
    #[error("palette index {index} out of range for palette of {len} swatches")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("{0} is already running")]
    Busy(&'static str),
    #[error("internal inconsistency: {0}")]
    Invariant(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Varint(#[from] crate::io::varint::VarintError),
    #[error(transparent)]
    Color(#[from] crate::color::ColorParseError),
    #[error(transparent)]
    Point(#[from] crate::geom::PointParseError),
    #[error(transparent)]
    PageType(#[from] crate::page::PageTypeParseError),
    #[error(transparent)]
    Option(#[from] crate::actor::OptionParseError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Malformed(_)
            | Self::Json(_)
            | Self::Varint(_)
            | Self::Color(_)
            | Self::Point(_)
            | Self::PageType(_)
            | Self::Option(_) => ErrorKind::Malformed,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::UnsupportedFormat(_) => ErrorKind::UnsupportedFormat,
            Self::Busy(_) => ErrorKind::Busy,
            Self::Invariant(_) => ErrorKind::Invariant,
            Self::Zip(zip::result::ZipError::FileNotFound) => ErrorKind::NotFound,
            Self::Zip(zip::result::ZipError::Io(_)) | Self::Io(_) => ErrorKind::Io,
            Self::Zip(zip::result::ZipError::UnsupportedArchive(_)) => {
                ErrorKind::UnsupportedFormat
            }
            Self::Zip(_) => ErrorKind::Malformed,
            Self::Image(image::ImageError::Unsupported(_)) => ErrorKind::UnsupportedFormat,
            Self::Image(image::ImageError::IoError(_)) => ErrorKind::Io,
            Self::Image(_) => ErrorKind::Malformed,
        }
    }
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::NotFound(what.to_string())
    }
    /// Shorthand for [`Error::Malformed`].
    pub fn malformed(why: impl std::fmt::Display) -> Self {
        Self::Malformed(why.to_string())
    }
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}
