//! modsig - Authenticode trust verdicts for Windows modules
//!
//! This library asks the platform trust provider (WinTrust) whether a file carries
//! a valid, chain-trusted Authenticode signature, and can find a module by bare
//! name using the loader's default search order.
//!
//! # Examples
//!
//! ```no_run
//! use modsig::{locate, verify, VerificationResult};
//!
//! let path = locate("kernel32").expect("kernel32.dll is always present");
//! let result = verify(&path).expect("trust check could not be performed");
//!
//! if result == VerificationResult::Success {
//!     println!("{} is signed and trusted", path.display());
//! }
//! std::process::exit(result.exit_code());
//! ```

pub mod error;
pub mod locator;
pub mod native;
pub mod utils;
pub mod verification;


// Re-export commonly used types for convenience
pub use error::{
    exit_code, exit_status, LocateError, VerificationResult, VerifyError, FAULT_EXIT_CODE,
    FAULT_EXIT_STATUS,
};
pub use locator::{locate, normalize_module_name, ModuleLocator, SearchRequest, SearchRoots};
pub use verification::{
    verify, RevocationCheck, SignatureVerifier, VerifyOptions, WeakDigestPolicy,
};
