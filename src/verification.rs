use crate::error::{VerificationResult, VerifyError};
use crate::native::*;
use crate::utils::{to_wide_null_terminated, PlatformVersion};
use log::{debug, warn};
use std::path::Path;

/// Platforms newer than this reject MD2/MD4 digests anywhere in the chain.
/// Windows 7 / Server 2008 R2 without a service pack; SP1 and later qualify.
pub const WEAK_DIGEST_CUTOFF: PlatformVersion = PlatformVersion::new(6, 1, 0);

/// Which part of the certificate chain is checked for revocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RevocationCheck {
    /// Provider default: every certificate except the root.
    #[default]
    ExcludeRoot,
    /// Ask the provider to check the whole chain.
    WholeChain,
}

/// Whether MD2/MD4 digests are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeakDigestPolicy {
    /// Reject them when the platform is newer than [`WEAK_DIGEST_CUTOFF`].
    #[default]
    Auto,
    Always,
    Never,
}

/// Knobs passed through to the trust provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VerifyOptions {
    pub revocation: RevocationCheck,
    pub weak_digests: WeakDigestPolicy,
}

impl VerifyOptions {
    /// Value for the request's revocation-checks field.
    pub fn revocation_checks(&self) -> u32 {
        match self.revocation {
            RevocationCheck::ExcludeRoot => WTD_REVOKE_NONE,
            RevocationCheck::WholeChain => WTD_REVOKE_WHOLECHAIN,
        }
    }

    /// Value for the request's provider-flags field on a platform of `version`.
    /// An unknown version counts as current.
    pub fn provider_flags(&self, version: Option<PlatformVersion>) -> u32 {
        let disable_weak = match self.weak_digests {
            WeakDigestPolicy::Always => true,
            WeakDigestPolicy::Never => false,
            WeakDigestPolicy::Auto => version.map_or(true, |v| v > WEAK_DIGEST_CUTOFF),
        };
        if disable_weak {
            WTD_REVOCATION_CHECK_CHAIN_EXCLUDE_ROOT | WTD_DISABLE_MD2_MD4
        } else {
            WTD_REVOCATION_CHECK_CHAIN_EXCLUDE_ROOT
        }
    }
}

/// Evaluates Authenticode trust for standalone files through a [`TrustBoundary`].
#[derive(Debug, Clone)]
pub struct SignatureVerifier<B: TrustBoundary = SystemTrustBoundary> {
    boundary: B,
    options: VerifyOptions,
    platform: Option<PlatformVersion>,
}

impl SignatureVerifier<SystemTrustBoundary> {
    /// Verifier bound to the running platform's trust subsystem.
    pub fn system(options: VerifyOptions) -> Self {
        Self::new(SystemTrustBoundary, options).with_platform(PlatformVersion::current())
    }
}

impl<B: TrustBoundary> SignatureVerifier<B> {
    /// Creates a verifier that marshals its requests through `boundary`.
    ///
    /// # Arguments
    /// * `boundary` - Allocator and trust-provider entry point
    /// * `options` - Revocation and weak-digest settings for every request
    ///
    /// # Returns
    /// * A verifier with no platform version, so [`WeakDigestPolicy::Auto`]
    ///   treats the platform as current until [`with_platform`](Self::with_platform)
    ///   says otherwise
    pub fn new(boundary: B, options: VerifyOptions) -> Self {
        Self {
            boundary,
            options,
            platform: None,
        }
    }

    /// Platform version consulted by [`WeakDigestPolicy::Auto`].
    pub fn with_platform(mut self, platform: Option<PlatformVersion>) -> Self {
        self.platform = platform;
        self
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    pub fn boundary(&self) -> &B {
        &self.boundary
    }

    /// Verifies the embedded Authenticode signature of `path`.
    ///
    /// # Arguments
    /// * `path` - File to evaluate
    ///
    /// # Returns
    /// * `Ok(VerificationResult::ObjectNotFound)` if the file does not exist;
    ///   the trust provider is not called
    /// * `Ok(result)` with the provider's raw verdict mapped onto [`VerificationResult`]
    /// * `Err(VerifyError)` if the check could not be performed
    ///
    /// # Note
    /// The file is never modified. All memory marshaled for the call is
    /// released before returning, on every path.
    pub fn verify(&self, path: &Path) -> Result<VerificationResult, VerifyError> {
        if !path.is_file() {
            debug!("{} does not exist, skipping trust evaluation", path.display());
            return Ok(VerificationResult::ObjectNotFound);
        }

        let wide_path = to_wide_null_terminated(path.as_os_str())
            .ok_or_else(|| VerifyError::InvalidPath(path.to_path_buf()))?;

        // Blocks drop in reverse order of declaration, after the call returns
        // or unwinds.
        let path_block = NativeBlock::copy_from_slice(&self.boundary, &wide_path)?;
        let file_block = NativeBlock::write(
            &self.boundary,
            WinTrustFileInfo::for_path(path_block.as_mut_ptr::<u16>()),
        )?;
        let data_block = NativeBlock::write(
            &self.boundary,
            WinTrustData::for_file(
                file_block.as_mut_ptr::<WinTrustFileInfo>(),
                self.options.revocation_checks(),
                self.options.provider_flags(self.platform),
            ),
        )?;
        let action_block = NativeBlock::write(&self.boundary, WINTRUST_ACTION_GENERIC_VERIFY_V2)?;

        debug!(
            "WinVerifyTrust({}), revocation checks {:#x}, provider flags {:#x}",
            path.display(),
            self.options.revocation_checks(),
            self.options.provider_flags(self.platform)
        );
        let code = unsafe {
            self.boundary.win_verify_trust(
                action_block.as_mut_ptr::<Guid>(),
                data_block.as_mut_ptr::<WinTrustData>(),
            )
        };

        let result = VerificationResult::from_code(code);
        match result {
            VerificationResult::Unknown(raw) => {
                warn!("{}: unrecognised trust result 0x{:08X}", path.display(), raw as u32)
            }
            _ => debug!("{}: {}", path.display(), result.name()),
        }
        Ok(result)
    }
}

/// Verifies `path` against the running platform with default options.
///
/// # Arguments
/// * `path` - File to evaluate
///
/// # Returns
/// * Same as [`SignatureVerifier::verify`]
pub fn verify(path: impl AsRef<Path>) -> Result<VerificationResult, VerifyError> {
    SignatureVerifier::system(VerifyOptions::default()).verify(path.as_ref())
}
