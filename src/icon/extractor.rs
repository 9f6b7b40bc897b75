//! Icon extraction from executables
//!
//! This module resolves a displayable icon for an executable path using the
//! Windows Shell32 API. Three primitives are tried in a fixed order:
//!
//! 1. `ExtractAssociatedIconW`: the file's own icon, or the icon of the
//!    program associated with its type
//! 2. `SHGetFileInfoW`: the icon the shell shows for the file
//! 3. `ExtractIconExW`: the first icon resource stored in the file
//!
//! The first primitive whose handle converts to a bitmap wins. When all of
//! them fail, or the input is not a file at all (packaged app identifiers),
//! the generated default icon is returned. Resolution never fails.
//!
//! Native handles (`HICON`, device contexts, bitmaps) are owned by guards that
//! release them on every exit path.

use super::{AppIcon, ExtractionMethod, IconOrigin, generated};
use std::path::Path;
use tracing::debug;

/// Resolves icons through the native fallback chain
#[derive(Debug, Clone, Copy, Default)]
pub struct IconResolver;

impl IconResolver {
    /// Create a resolver
    pub fn new() -> Self {
        Self
    }

    /// Resolve an icon for an executable path or an opaque identifier
    ///
    /// Always returns a finalized icon; falls back to
    /// [`generated::default_icon`] when nothing could be extracted.
    pub fn resolve(&self, target: &str) -> AppIcon {
        let path = Path::new(target);
        if target.is_empty() || !path.is_file() {
            debug!("Not a file, using default icon: {}", target);
            return generated::default_icon();
        }

        for method in ExtractionMethod::FALLBACK_ORDER {
            if let Some(image) = extract_with(method, path) {
                debug!("Extracted icon from {:?} via {:?}", path, method);
                return AppIcon::new(image, IconOrigin::Extracted(method));
            }
            debug!("{:?} produced no icon for {:?}", method, path);
        }

        debug!("All extraction methods failed for {:?}, using default icon", path);
        generated::default_icon()
    }
}

#[cfg(windows)]
fn extract_with(method: ExtractionMethod, path: &Path) -> Option<image::RgbaImage> {
    native::extract(method, path)
}

#[cfg(not(windows))]
fn extract_with(_method: ExtractionMethod, _path: &Path) -> Option<image::RgbaImage> {
    // No native icon primitives outside Windows
    None
}

#[cfg(windows)]
mod native {
    use super::ExtractionMethod;
    use crate::error::{AppScoutError, Result};
    use crate::icon::ICON_SIZE;
    use image::{RgbaImage, imageops::FilterType};
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use tracing::warn;
    use windows::Win32::Graphics::Gdi::{
        BI_RGB, BITMAP, BITMAPINFO, BITMAPINFOHEADER, CreateCompatibleDC, DIB_RGB_COLORS,
        DeleteDC, DeleteObject, GetDIBits, GetObjectW, HBITMAP, HDC, HGDIOBJ, SelectObject,
    };
    use windows::Win32::Storage::FileSystem::FILE_FLAGS_AND_ATTRIBUTES;
    use windows::Win32::UI::Shell::{
        ExtractAssociatedIconW, ExtractIconExW, SHFILEINFOW, SHGFI_ICON, SHGFI_LARGEICON,
        SHGetFileInfoW,
    };
    use windows::Win32::UI::WindowsAndMessaging::{DestroyIcon, GetIconInfo, HICON, ICONINFO};
    use windows::core::PCWSTR;

    /// Buffer length `ExtractAssociatedIconW` reads and may rewrite
    const ASSOCIATED_ICON_PATH_LEN: usize = 128;

    /// Owned icon handle, destroyed on drop
    pub(super) struct IconHandle(pub(super) HICON);

    impl Drop for IconHandle {
        #[expect(unsafe_code, reason = "Windows FFI for DestroyIcon to release icon handle")]
        fn drop(&mut self) {
            unsafe {
                let _ = DestroyIcon(self.0);
            }
        }
    }

    /// Owned GDI bitmap, deleted on drop
    struct BitmapHandle(HBITMAP);

    impl Drop for BitmapHandle {
        #[expect(unsafe_code, reason = "Windows FFI for DeleteObject to release bitmap")]
        fn drop(&mut self) {
            if !self.0.is_invalid() {
                unsafe {
                    let _ = DeleteObject(self.0.into());
                }
            }
        }
    }

    /// Memory device context with a bitmap selected into it
    ///
    /// Restores the previous selection and deletes the DC on drop.
    struct SelectedDc {
        hdc: HDC,
        previous: HGDIOBJ,
    }

    impl Drop for SelectedDc {
        #[expect(unsafe_code, reason = "Windows FFI for SelectObject/DeleteDC cleanup")]
        fn drop(&mut self) {
            unsafe {
                let _ = SelectObject(self.hdc, self.previous);
                let _ = DeleteDC(self.hdc);
            }
        }
    }

    fn wide_path(path: &Path) -> Vec<u16> {
        path.as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    pub(super) fn extract(method: ExtractionMethod, path: &Path) -> Option<RgbaImage> {
        let handle = match method {
            ExtractionMethod::AssociatedIcon => associated_icon(path),
            ExtractionMethod::ShellFileInfo => shell_file_info_icon(path),
            ExtractionMethod::IconFromFile => icon_from_file(path),
        }?;

        match hicon_to_rgba(&handle) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Failed to convert HICON for {:?}: {}", path, e);
                None
            }
        }
    }

    #[expect(unsafe_code, reason = "Windows FFI for ExtractAssociatedIconW")]
    fn associated_icon(path: &Path) -> Option<IconHandle> {
        let wide = wide_path(path);
        if wide.len() > ASSOCIATED_ICON_PATH_LEN {
            return None;
        }

        let mut buffer = [0u16; ASSOCIATED_ICON_PATH_LEN];
        buffer[..wide.len()].copy_from_slice(&wide);
        let mut index: u16 = 0;

        let hicon = unsafe { ExtractAssociatedIconW(None, &mut buffer, &raw mut index) };
        (!hicon.is_invalid()).then_some(IconHandle(hicon))
    }

    #[expect(unsafe_code, reason = "Windows FFI for SHGetFileInfoW")]
    fn shell_file_info_icon(path: &Path) -> Option<IconHandle> {
        let wide = wide_path(path);
        let mut file_info = SHFILEINFOW::default();

        #[expect(
            clippy::cast_possible_truncation,
            reason = "size_of::<SHFILEINFOW>() is a small compile-time constant"
        )]
        let result = unsafe {
            SHGetFileInfoW(
                PCWSTR(wide.as_ptr()),
                FILE_FLAGS_AND_ATTRIBUTES(0),
                Some(&mut file_info),
                std::mem::size_of::<SHFILEINFOW>() as u32,
                SHGFI_ICON | SHGFI_LARGEICON,
            )
        };

        if result == 0 || file_info.hIcon.is_invalid() {
            return None;
        }
        Some(IconHandle(file_info.hIcon))
    }

    #[expect(unsafe_code, reason = "Windows FFI for ExtractIconExW")]
    fn icon_from_file(path: &Path) -> Option<IconHandle> {
        let wide = wide_path(path);
        let mut large_icon = HICON::default();

        let extracted = unsafe {
            ExtractIconExW(
                PCWSTR(wide.as_ptr()),
                0, // First icon
                Some(&mut large_icon as *mut HICON),
                None, // Only the large icon
                1,
            )
        };

        if extracted == 0 || large_icon.is_invalid() {
            return None;
        }
        Some(IconHandle(large_icon))
    }

    /// Convert an icon handle into a `ICON_SIZE` square RGBA bitmap
    #[expect(unsafe_code, reason = "Windows FFI for GDI bitmap access")]
    pub(super) fn hicon_to_rgba(icon: &IconHandle) -> Result<RgbaImage> {
        let mut icon_info = ICONINFO::default();
        unsafe { GetIconInfo(icon.0, &mut icon_info)? };

        // GetIconInfo hands us ownership of both bitmaps
        let color = BitmapHandle(icon_info.hbmColor);
        let _mask = BitmapHandle(icon_info.hbmMask);
        if color.0.is_invalid() {
            // Monochrome icon, nothing to convert
            return Err(AppScoutError::IconExtraction("icon has no color bitmap".into()));
        }

        let mut bitmap = BITMAP::default();
        #[expect(
            clippy::cast_possible_truncation,
            clippy::cast_possible_wrap,
            reason = "size_of::<BITMAP>() is a small compile-time constant"
        )]
        let written = unsafe {
            GetObjectW(
                color.0.into(),
                std::mem::size_of::<BITMAP>() as i32,
                Some(std::ptr::from_mut(&mut bitmap).cast()),
            )
        };
        if written == 0 || bitmap.bmWidth <= 0 || bitmap.bmHeight <= 0 {
            return Err(windows::core::Error::from_thread().into());
        }

        let width = bitmap.bmWidth.unsigned_abs();
        let height = bitmap.bmHeight.unsigned_abs();

        let hdc = unsafe { CreateCompatibleDC(None) };
        if hdc.is_invalid() {
            return Err(windows::core::Error::from_thread().into());
        }
        let previous = unsafe { SelectObject(hdc, color.0.into()) };
        let dc = SelectedDc { hdc, previous };

        #[expect(
            clippy::cast_possible_truncation,
            reason = "size_of::<BITMAPINFOHEADER>() is a small compile-time constant"
        )]
        let header_size = std::mem::size_of::<BITMAPINFOHEADER>() as u32;

        let mut bmi = BITMAPINFO::default();
        bmi.bmiHeader.biSize = header_size;
        bmi.bmiHeader.biWidth = bitmap.bmWidth;
        bmi.bmiHeader.biHeight = -bitmap.bmHeight; // Top-down DIB
        bmi.bmiHeader.biPlanes = 1;
        bmi.bmiHeader.biBitCount = 32;
        bmi.bmiHeader.biCompression = BI_RGB.0;

        let mut buffer = vec![0u8; width as usize * height as usize * 4];
        let lines = unsafe {
            GetDIBits(
                dc.hdc,
                color.0,
                0,
                height,
                Some(buffer.as_mut_ptr().cast()),
                &mut bmi,
                DIB_RGB_COLORS,
            )
        };
        drop(dc);

        if lines == 0 {
            return Err(windows::core::Error::from_thread().into());
        }

        // BGRA -> RGBA
        for pixel in buffer.chunks_exact_mut(4) {
            pixel.swap(0, 2);
        }

        // Icons without an alpha channel report every pixel as transparent
        if buffer.chunks_exact(4).all(|p| p[3] == 0) {
            for pixel in buffer.chunks_exact_mut(4) {
                pixel[3] = 255;
            }
        }

        let image = RgbaImage::from_raw(width, height, buffer).ok_or_else(|| {
            AppScoutError::IconExtraction("pixel buffer does not match bitmap size".into())
        })?;

        if width == ICON_SIZE && height == ICON_SIZE {
            Ok(image)
        } else {
            Ok(image::imageops::resize(
                &image,
                ICON_SIZE,
                ICON_SIZE,
                FilterType::Triangle,
            ))
        }
    }
}
