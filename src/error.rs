use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use thiserror::Error;

const fn hresult(code: u32) -> i32 {
    code as i32
}

pub const S_OK: i32 = 0;
pub const TRUST_E_PROVIDER_UNKNOWN: i32 = hresult(0x800B_0001);
pub const TRUST_E_ACTION_UNKNOWN: i32 = hresult(0x800B_0002);
pub const TRUST_E_SUBJECT_FORM_UNKNOWN: i32 = hresult(0x800B_0003);
pub const TRUST_E_SUBJECT_NOT_TRUSTED: i32 = hresult(0x800B_0004);
pub const TRUST_E_NOSIGNATURE: i32 = hresult(0x800B_0100);
pub const TRUST_E_EXPLICIT_DISTRUST: i32 = hresult(0x800B_0111);
pub const TRUST_E_BAD_DIGEST: i32 = hresult(0x8009_6010);
pub const CERT_E_EXPIRED: i32 = hresult(0x800B_0101);
pub const CERT_E_REVOKED: i32 = hresult(0x800B_010C);
pub const CERT_E_UNTRUSTEDROOT: i32 = hresult(0x800B_0109);
/// "Cannot find object or property." Never returned for a file the trust
/// provider actually evaluated; used when no evaluation was attempted.
pub const CRYPT_E_NOT_FOUND: i32 = hresult(0x8009_2004);

/// `HRESULT_FROM_WIN32(ERROR_FILE_NOT_FOUND)`
pub const HRESULT_FILE_NOT_FOUND: i32 = hresult(0x8007_0002);
/// `HRESULT_FROM_WIN32(ERROR_PATH_NOT_FOUND)`
pub const HRESULT_PATH_NOT_FOUND: i32 = hresult(0x8007_0003);

/// Exit code used by the CLI when a check could not be performed at all.
/// No named [`VerificationResult`] projects onto it.
pub const FAULT_EXIT_CODE: i32 = 0xFFFF;

/// Outcome of a single trust evaluation.
///
/// Every variant except `Success` is a real trust determination, not a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationResult {
    Success,
    ProviderUnknown,
    ActionUnknown,
    SubjectFormUnknown,
    SubjectNotTrusted,
    FileNotSigned,
    SubjectExplicitlyDistrusted,
    SignatureOrFileCorrupt,
    SubjectCertExpired,
    SubjectCertificateRevoked,
    UntrustedRoot,
    /// The file could not be located, so no evaluation was attempted.
    ObjectNotFound,
    /// Raw code outside the taxonomy, passed through untouched.
    Unknown(i32),
}

impl VerificationResult {
    /// Every named result, in taxonomy order.
    pub const KNOWN: [VerificationResult; 12] = [
        VerificationResult::Success,
        VerificationResult::ProviderUnknown,
        VerificationResult::ActionUnknown,
        VerificationResult::SubjectFormUnknown,
        VerificationResult::SubjectNotTrusted,
        VerificationResult::FileNotSigned,
        VerificationResult::SubjectExplicitlyDistrusted,
        VerificationResult::SignatureOrFileCorrupt,
        VerificationResult::SubjectCertExpired,
        VerificationResult::SubjectCertificateRevoked,
        VerificationResult::UntrustedRoot,
        VerificationResult::ObjectNotFound,
    ];

    /// The 32-bit code this result stands for.
    pub const fn code(self) -> i32 {
        match self {
            VerificationResult::Success => S_OK,
            VerificationResult::ProviderUnknown => TRUST_E_PROVIDER_UNKNOWN,
            VerificationResult::ActionUnknown => TRUST_E_ACTION_UNKNOWN,
            VerificationResult::SubjectFormUnknown => TRUST_E_SUBJECT_FORM_UNKNOWN,
            VerificationResult::SubjectNotTrusted => TRUST_E_SUBJECT_NOT_TRUSTED,
            VerificationResult::FileNotSigned => TRUST_E_NOSIGNATURE,
            VerificationResult::SubjectExplicitlyDistrusted => TRUST_E_EXPLICIT_DISTRUST,
            VerificationResult::SignatureOrFileCorrupt => TRUST_E_BAD_DIGEST,
            VerificationResult::SubjectCertExpired => CERT_E_EXPIRED,
            VerificationResult::SubjectCertificateRevoked => CERT_E_REVOKED,
            VerificationResult::UntrustedRoot => CERT_E_UNTRUSTEDROOT,
            VerificationResult::ObjectNotFound => CRYPT_E_NOT_FOUND,
            VerificationResult::Unknown(code) => code,
        }
    }

    /// Maps a raw code returned by the trust subsystem onto the taxonomy.
    pub fn from_code(code: i32) -> Self {
        match code {
            S_OK => VerificationResult::Success,
            TRUST_E_PROVIDER_UNKNOWN => VerificationResult::ProviderUnknown,
            TRUST_E_ACTION_UNKNOWN => VerificationResult::ActionUnknown,
            TRUST_E_SUBJECT_FORM_UNKNOWN => VerificationResult::SubjectFormUnknown,
            TRUST_E_SUBJECT_NOT_TRUSTED => VerificationResult::SubjectNotTrusted,
            TRUST_E_NOSIGNATURE => VerificationResult::FileNotSigned,
            TRUST_E_EXPLICIT_DISTRUST => VerificationResult::SubjectExplicitlyDistrusted,
            TRUST_E_BAD_DIGEST => VerificationResult::SignatureOrFileCorrupt,
            CERT_E_EXPIRED => VerificationResult::SubjectCertExpired,
            CERT_E_REVOKED => VerificationResult::SubjectCertificateRevoked,
            CERT_E_UNTRUSTEDROOT => VerificationResult::UntrustedRoot,
            CRYPT_E_NOT_FOUND | HRESULT_FILE_NOT_FOUND | HRESULT_PATH_NOT_FOUND => {
                VerificationResult::ObjectNotFound
            }
            other => VerificationResult::Unknown(other),
        }
    }

    /// Low 16 bits of [`code`](Self::code). Injective over [`KNOWN`](Self::KNOWN).
    ///
    /// # Note
    /// An [`Unknown`](Self::Unknown) code whose low 16 bits are `0` or
    /// `0xFFFF` projects onto [`FAULT_EXIT_CODE`] instead. Exit code `0` is
    /// reserved for a trusted file.
    pub const fn exit_code(self) -> i32 {
        let low = (self.code() as u32 & 0xFFFF) as i32;
        match self {
            VerificationResult::Unknown(_) if low == 0 || low == FAULT_EXIT_CODE => FAULT_EXIT_CODE,
            _ => low,
        }
    }

    /// Reverses [`exit_code`](Self::exit_code) for the named results.
    pub fn from_exit_code(exit_code: u16) -> Option<Self> {
        static TABLE: OnceLock<HashMap<u16, VerificationResult>> = OnceLock::new();
        TABLE
            .get_or_init(|| {
                VerificationResult::KNOWN
                    .iter()
                    .map(|result| (result.exit_code() as u16, *result))
                    .collect()
            })
            .get(&exit_code)
            .copied()
    }

    pub fn is_trusted(self) -> bool {
        self == VerificationResult::Success
    }

    /// The platform constant name for this result.
    pub fn name(self) -> &'static str {
        match self {
            VerificationResult::Success => "S_OK",
            VerificationResult::ProviderUnknown => "TRUST_E_PROVIDER_UNKNOWN",
            VerificationResult::ActionUnknown => "TRUST_E_ACTION_UNKNOWN",
            VerificationResult::SubjectFormUnknown => "TRUST_E_SUBJECT_FORM_UNKNOWN",
            VerificationResult::SubjectNotTrusted => "TRUST_E_SUBJECT_NOT_TRUSTED",
            VerificationResult::FileNotSigned => "TRUST_E_NOSIGNATURE",
            VerificationResult::SubjectExplicitlyDistrusted => "TRUST_E_EXPLICIT_DISTRUST",
            VerificationResult::SignatureOrFileCorrupt => "TRUST_E_BAD_DIGEST",
            VerificationResult::SubjectCertExpired => "CERT_E_EXPIRED",
            VerificationResult::SubjectCertificateRevoked => "CERT_E_REVOKED",
            VerificationResult::UntrustedRoot => "CERT_E_UNTRUSTEDROOT",
            VerificationResult::ObjectNotFound => "CRYPT_E_NOT_FOUND",
            VerificationResult::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationResult::Success => write!(f, "S_OK: The file is signed and the signature is trusted."),
            VerificationResult::ProviderUnknown => write!(f, "TRUST_E_PROVIDER_UNKNOWN: The trust provider is not recognized on this system."),
            VerificationResult::ActionUnknown => write!(f, "TRUST_E_ACTION_UNKNOWN: The trust verification action specified is not supported by the specified trust provider."),
            VerificationResult::SubjectFormUnknown => write!(f, "TRUST_E_SUBJECT_FORM_UNKNOWN: The subject form specified is not one supported or known by the trust provider."),
            VerificationResult::SubjectNotTrusted => write!(f, "TRUST_E_SUBJECT_NOT_TRUSTED: The subject failed the specified verification action."),
            VerificationResult::FileNotSigned => write!(f, "TRUST_E_NOSIGNATURE: No signature was present in the subject."),
            VerificationResult::SubjectExplicitlyDistrusted => write!(f, "TRUST_E_EXPLICIT_DISTRUST: The certificate was explicitly marked as untrusted by the user."),
            VerificationResult::SignatureOrFileCorrupt => write!(f, "TRUST_E_BAD_DIGEST: The file's digest does not match the signature; the file or its signature is corrupt."),
            VerificationResult::SubjectCertExpired => write!(f, "CERT_E_EXPIRED: The certificate has expired."),
            VerificationResult::SubjectCertificateRevoked => write!(f, "CERT_E_REVOKED: The certificate has been revoked."),
            VerificationResult::UntrustedRoot => write!(f, "CERT_E_UNTRUSTEDROOT: The certificate chain terminates in an untrusted root."),
            VerificationResult::ObjectNotFound => write!(f, "CRYPT_E_NOT_FOUND: The file could not be found; no signature check was performed."),
            VerificationResult::Unknown(code) => write!(f, "Unknown trust result (0x{:08X})", *code as u32),
        }
    }
}

/// Projects a result onto a process exit status (low 16 bits of its code).
pub fn exit_code(result: VerificationResult) -> i32 {
    result.exit_code()
}

/// What a process exiting with [`FAULT_EXIT_CODE`] reports on this platform.
/// Only Windows keeps more than the low 8 bits of an exit status.
pub const FAULT_EXIT_STATUS: i32 = if cfg!(windows) {
    FAULT_EXIT_CODE
} else {
    FAULT_EXIT_CODE & 0xFF
};

/// Status to hand to `process::exit` for the outcome of one check.
///
/// # Arguments
/// * `result` - The verdict, or `None` when the check could not be performed
///
/// # Returns
/// * The projected [`exit_code`] on Windows
/// * `0` for a trusted file and [`FAULT_EXIT_STATUS`] for everything else on
///   platforms whose exit statuses are 8 bits wide, where the projection would
///   be truncated onto other results
pub fn exit_status(result: Option<VerificationResult>) -> i32 {
    match result {
        Some(result) if cfg!(windows) || result.is_trusted() => result.exit_code(),
        Some(_) | None => FAULT_EXIT_STATUS,
    }
}

/// Failures of the module search.
#[derive(Debug, Error)]
pub enum LocateError {
    /// No searched directory held the module. `tried` is the full ordered list.
    #[error("module `{name}` was not found in any of {} searched directories", .tried.len())]
    NotFound { name: String, tried: Vec<PathBuf> },
    #[error("required environment variable `{0}` is not set")]
    MissingEnvironment(&'static str),
    #[error("failed to determine the {what}: {source}")]
    Platform {
        what: &'static str,
        #[source]
        source: io::Error,
    },
}

/// The trust check could not be carried out.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("path `{}` cannot be passed to the trust provider (interior NUL)", .0.display())]
    InvalidPath(PathBuf),
    #[error("failed to allocate {0} bytes for the trust request")]
    Allocation(usize),
}
