use alloc::format;
use alloc::string::String;
use thiserror_no_std::Error;

/// Errors that cross the boundary of the ATA/ATAPI protocol itself.
///
/// Protocol-level outcomes (unsupported command, no medium, aborted data phase) are
/// encoded in the published register snapshot, not returned here — see
/// [`crate::regs::status`] and [`crate::channel::Channel::on_request`]. This enum covers
/// everything outside that protocol: mount-time validation and the external-trait seams.
///
/// # Variants
///
/// * `InvalidGeometry` - The mounted image's derived geometry failed validation.
/// * `ImageParse` - The mounted image could not be recognized as a supported format.
/// * `RegisterWindow` - The hardware register-window transport reported a failure.
/// * `ImageFile` - The host-side image file reported a failure.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Invalid Geometry: {0}")]
    InvalidGeometry(String),
    #[error("Image Parse Error: {0}")]
    ImageParse(String),
    #[error("Register Window Error: {0}")]
    RegisterWindow(String),
    #[error("Image File Error: {0}")]
    ImageFile(String),
}

impl Error {
    /// Builds an [`Error::InvalidGeometry`] from any displayable message.
    ///
    /// # Arguments
    ///
    /// * `msg` - The message describing the invalid geometry.
    ///
    /// # Returns
    ///
    /// * `Self` - The constructed error.
    #[must_use]
    pub fn invalid_geometry(msg: impl core::fmt::Display) -> Self {
        Self::InvalidGeometry(format!("{msg}"))
    }

    /// Builds an [`Error::ImageParse`] from any displayable message.
    ///
    /// # Arguments
    ///
    /// * `msg` - The message describing the parse failure.
    ///
    /// # Returns
    ///
    /// * `Self` - The constructed error.
    #[must_use]
    pub fn image_parse(msg: impl core::fmt::Display) -> Self {
        Self::ImageParse(format!("{msg}"))
    }
}
