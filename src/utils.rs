use std::ffi::OsStr;
use std::path::PathBuf;

/// Converts an `OsStr` to a wide string (`Vec<u16>`) with a trailing null
/// terminator suitable for passing to Win32 APIs.
///
/// Returns `None` if the input already contains a NUL, which would silently
/// truncate the string on the far side.
pub fn to_wide_null_terminated(s: &OsStr) -> Option<Vec<u16>> {
    #[cfg(windows)]
    let wide: Vec<u16> = {
        use std::os::windows::ffi::OsStrExt;
        s.encode_wide().collect()
    };
    #[cfg(not(windows))]
    let wide: Vec<u16> = s.to_string_lossy().encode_utf16().collect();

    if wide.contains(&0) {
        return None;
    }
    Some(wide.into_iter().chain(std::iter::once(0)).collect())
}

/// Reads a null-terminated wide string.
///
/// # Safety
/// `ptr` must be non-null and point to a readable, null-terminated `u16` buffer.
pub unsafe fn wide_ptr_to_path(ptr: *const u16) -> PathBuf {
    let mut len = 0usize;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    let slice = std::slice::from_raw_parts(ptr, len);
    wide_to_path(slice)
}

/// Converts a wide buffer (without terminator) to a path, stopping at the first NUL.
pub fn wide_to_path(wide: &[u16]) -> PathBuf {
    let len = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    #[cfg(windows)]
    {
        use std::os::windows::ffi::OsStringExt;
        PathBuf::from(std::ffi::OsString::from_wide(&wide[..len]))
    }
    #[cfg(not(windows))]
    {
        PathBuf::from(String::from_utf16_lossy(&wide[..len]))
    }
}

/// Operating system version as `major.minor` plus service pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlatformVersion {
    pub major: u32,
    pub minor: u32,
    pub service_pack: u32,
}

impl PlatformVersion {
    pub const fn new(major: u32, minor: u32, service_pack: u32) -> Self {
        Self {
            major,
            minor,
            service_pack,
        }
    }

    /// Version of the running platform, if it can be determined.
    #[cfg(windows)]
    pub fn current() -> Option<Self> {
        use windows::Win32::System::SystemInformation::{
            GetVersionExW, OSVERSIONINFOEXW, OSVERSIONINFOW,
        };

        let mut info = OSVERSIONINFOEXW {
            dwOSVersionInfoSize: std::mem::size_of::<OSVERSIONINFOEXW>() as u32,
            ..Default::default()
        };
        let result = unsafe { GetVersionExW(&mut info as *mut OSVERSIONINFOEXW as *mut OSVERSIONINFOW) };
        match result {
            Ok(()) => Some(Self::new(
                info.dwMajorVersion,
                info.dwMinorVersion,
                u32::from(info.wServicePackMajor),
            )),
            Err(e) => {
                log::warn!("GetVersionExW failed: {e}");
                None
            }
        }
    }

    #[cfg(not(windows))]
    pub fn current() -> Option<Self> {
        None
    }
}

impl std::fmt::Display for PlatformVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} SP{}", self.major, self.minor, self.service_pack)
    }
}
