//! Module lookup in the loader's default search order.
//!
//! This is a filesystem emulation of where the platform loader would look for
//! a module by bare name when no custom search directories are configured.
//! Nothing here loads a module.

use crate::error::LocateError;
use log::{debug, info};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

const DLL_SUFFIX: &str = ".dll";

/// Applies the loader's filename completion.
///
/// A name ending in a single `.` loses that dot and gets no suffix. Otherwise
/// `.dll` is appended unless the name already ends with it (compared without
/// regard to case). The original casing is kept.
pub fn normalize_module_name(name: &str) -> String {
    if let Some(stripped) = name.strip_suffix('.') {
        return stripped.to_string();
    }
    if name.to_lowercase().ends_with(DLL_SUFFIX) {
        name.to_string()
    } else {
        format!("{name}{DLL_SUFFIX}")
    }
}

/// Inputs to the six search tiers, captured at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRoots {
    /// Directory holding the running executable.
    pub process_dir: PathBuf,
    /// `System32`
    pub system_dir: PathBuf,
    /// The 16-bit `System` directory.
    pub legacy_system_dir: PathBuf,
    /// The Windows directory.
    pub windows_dir: PathBuf,
    pub current_dir: PathBuf,
    /// Raw `PATH` value; `None` when the variable is not set.
    pub path_var: Option<OsString>,
}

impl SearchRoots {
    /// Reads every tier from the running process and platform.
    ///
    /// # Returns
    /// * `Ok(SearchRoots)` with the executable's directory, the platform
    ///   directories, the current directory and the raw `PATH` value
    /// * `Err(LocateError::Platform)` if one of the directories cannot be queried
    pub fn from_system() -> Result<Self, LocateError> {
        let exe = std::env::current_exe().map_err(|source| LocateError::Platform {
            what: "executable path",
            source,
        })?;
        let process_dir = exe.parent().map(Path::to_path_buf).unwrap_or_default();
        let windows_dir = platform::windows_dir()?;
        let system_dir = platform::system_dir(&windows_dir)?;
        let current_dir = std::env::current_dir().map_err(|source| LocateError::Platform {
            what: "current directory",
            source,
        })?;

        Ok(Self {
            process_dir,
            system_dir,
            legacy_system_dir: windows_dir.join("System"),
            windows_dir,
            current_dir,
            path_var: std::env::var_os("PATH"),
        })
    }

    /// The ordered candidate directories. Duplicates are kept.
    pub fn directories(&self) -> Result<Vec<PathBuf>, LocateError> {
        let path_var = self
            .path_var
            .as_ref()
            .ok_or(LocateError::MissingEnvironment("PATH"))?;

        let mut dirs = vec![
            self.process_dir.clone(),
            self.system_dir.clone(),
            self.legacy_system_dir.clone(),
            self.windows_dir.clone(),
            self.current_dir.clone(),
        ];
        dirs.extend(std::env::split_paths(path_var));
        Ok(dirs)
    }
}

/// A normalized module name and the directories to search, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub module_name: String,
    pub directories: Vec<PathBuf>,
}

impl SearchRequest {
    /// First directory holding `module_name` as a regular file.
    pub fn resolve(&self) -> Option<PathBuf> {
        self.directories.iter().find_map(|dir| {
            let candidate = dir.join(&self.module_name);
            debug!("checking {}", candidate.display());
            candidate.is_file().then_some(candidate)
        })
    }
}

/// Resolves module names against a fixed set of [`SearchRoots`].
#[derive(Debug, Clone)]
pub struct ModuleLocator {
    roots: SearchRoots,
}

impl ModuleLocator {
    /// # Arguments
    /// * `roots` - Search tiers to use for every lookup
    pub fn new(roots: SearchRoots) -> Self {
        Self { roots }
    }

    /// Locator over [`SearchRoots::from_system`].
    pub fn system() -> Result<Self, LocateError> {
        SearchRoots::from_system().map(Self::new)
    }

    pub fn roots(&self) -> &SearchRoots {
        &self.roots
    }

    /// Builds the search for `name` without touching the filesystem.
    ///
    /// # Arguments
    /// * `name` - Module name as a caller would pass it to the loader
    ///
    /// # Returns
    /// * `Ok(SearchRequest)` with the normalized name and every directory in order
    /// * `Err(LocateError::MissingEnvironment)` if `PATH` is not set
    pub fn request(&self, name: &str) -> Result<SearchRequest, LocateError> {
        Ok(SearchRequest {
            module_name: normalize_module_name(name),
            directories: self.roots.directories()?,
        })
    }

    /// Resolves `name` to the path the loader would pick.
    ///
    /// # Arguments
    /// * `name` - Module name, with or without the `.dll` suffix
    ///
    /// # Returns
    /// * `Ok(PathBuf)` - An absolute or rooted name that exists, as is, or the
    ///   first directory in search order containing the file
    /// * `Err(LocateError::NotFound)` with every directory tried
    /// * `Err(LocateError::MissingEnvironment)` if `PATH` is not set
    pub fn locate(&self, name: &str) -> Result<PathBuf, LocateError> {
        let module_name = normalize_module_name(name);
        let direct = Path::new(&module_name);
        if direct.has_root() && direct.is_file() {
            info!("{name} resolved directly to {}", direct.display());
            return Ok(direct.to_path_buf());
        }

        let request = SearchRequest {
            module_name,
            directories: self.roots.directories()?,
        };
        match request.resolve() {
            Some(found) => {
                info!("{name} resolved to {}", found.display());
                Ok(found)
            }
            None => Err(LocateError::NotFound {
                name: request.module_name,
                tried: request.directories,
            }),
        }
    }
}

/// Locates `name` using the running process's search roots.
pub fn locate(name: &str) -> Result<PathBuf, LocateError> {
    ModuleLocator::system()?.locate(name)
}

#[cfg(windows)]
mod platform {
    use crate::error::LocateError;
    use crate::utils::wide_to_path;
    use std::path::{Path, PathBuf};
    use windows::Win32::System::SystemInformation::{GetSystemDirectoryW, GetWindowsDirectoryW};

    fn query(what: &'static str, get: impl Fn(Option<&mut [u16]>) -> u32) -> Result<PathBuf, LocateError> {
        let needed = get(None);
        if needed == 0 {
            return Err(LocateError::Platform {
                what,
                source: std::io::Error::last_os_error(),
            });
        }
        let mut buffer = vec![0u16; needed as usize];
        let len = get(Some(buffer.as_mut_slice()));
        if len == 0 || len as usize >= buffer.len() {
            return Err(LocateError::Platform {
                what,
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(wide_to_path(&buffer[..len as usize]))
    }

    pub(super) fn windows_dir() -> Result<PathBuf, LocateError> {
        query("Windows directory", |buf| unsafe { GetWindowsDirectoryW(buf) })
    }

    pub(super) fn system_dir(_windows_dir: &Path) -> Result<PathBuf, LocateError> {
        query("system directory", |buf| unsafe { GetSystemDirectoryW(buf) })
    }
}

// Off Windows the layout is taken from the usual environment variables so the
// search order can still be inspected.
#[cfg(not(windows))]
mod platform {
    use crate::error::LocateError;
    use std::path::{Path, PathBuf};

    const DEFAULT_WINDOWS_DIR: &str = r"C:\Windows";

    pub(super) fn windows_dir() -> Result<PathBuf, LocateError> {
        Ok(std::env::var_os("SystemRoot")
            .or_else(|| std::env::var_os("windir"))
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WINDOWS_DIR)))
    }

    pub(super) fn system_dir(windows_dir: &Path) -> Result<PathBuf, LocateError> {
        Ok(windows_dir.join("System32"))
    }
}
