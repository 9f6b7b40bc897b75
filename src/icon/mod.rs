//! Application icons
//!
//! Every record carries an [`AppIcon`]: an immutable, reference-counted RGBA
//! bitmap that can be handed across threads freely. Icons come from one of
//! three native extraction methods or from one of the generated fallbacks.
//!
//! - [`IconResolver`] runs the native fallback chain and never fails.
//! - [`generated`] draws the placeholder, default, missing and package icons.
//! - [`deferred`] resolves icons on the rayon pool after a record was built
//!   and reports each completion once.

pub mod deferred;
pub mod extractor;
pub mod generated;

pub use deferred::{IconCollector, IconDispatcher, IconUpdate};
pub use extractor::IconResolver;

use crate::error::{AppScoutError, Result};
use image::{ImageFormat, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;

/// Edge length of every icon handed out by this crate, in pixels
pub const ICON_SIZE: u32 = 32;

/// Native primitive that produced an extracted icon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// `ExtractAssociatedIconW`: icon of the file or of its associated program
    AssociatedIcon,
    /// `SHGetFileInfoW` with `SHGFI_ICON`
    ShellFileInfo,
    /// `ExtractIconExW`: first icon resource in the file
    IconFromFile,
}

impl ExtractionMethod {
    /// Order in which the resolver tries the methods
    pub const FALLBACK_ORDER: [Self; 3] = [
        Self::AssociatedIcon,
        Self::ShellFileInfo,
        Self::IconFromFile,
    ];
}

/// Where an icon came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IconOrigin {
    /// Pulled out of a file by a native primitive
    Extracted(ExtractionMethod),
    /// Shown while a deferred fetch is still running
    Placeholder,
    /// Generated after every extraction method failed
    Default,
    /// Generated for a saved layout entry that no longer exists
    Missing,
    /// Generated badge for packaged apps without a real executable
    Package,
}

/// Finalized application icon
///
/// Cloning is cheap (the pixel buffer is shared) and the bitmap can no longer
/// be modified once wrapped.
#[derive(Clone)]
pub struct AppIcon {
    image: Arc<RgbaImage>,
    origin: IconOrigin,
}

impl AppIcon {
    /// Freeze a bitmap into an icon
    pub fn new(image: RgbaImage, origin: IconOrigin) -> Self {
        Self {
            image: Arc::new(image),
            origin,
        }
    }

    /// Pixel data
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// How this icon was obtained
    pub fn origin(&self) -> IconOrigin {
        self.origin
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True if the icon was generated rather than extracted
    pub fn is_generated(&self) -> bool {
        !matches!(self.origin, IconOrigin::Extracted(_))
    }

    /// True if both icons share the same pixel buffer
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.image, &other.image)
    }

    /// Encode the icon as PNG
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut buffer = Cursor::new(Vec::new());
        self.image
            .write_to(&mut buffer, ImageFormat::Png)
            .map_err(|e| AppScoutError::IconExtraction(format!("PNG encoding failed: {e}")))?;
        Ok(buffer.into_inner())
    }
}

impl std::fmt::Debug for AppIcon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppIcon")
            .field("origin", &self.origin)
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .finish()
    }
}
