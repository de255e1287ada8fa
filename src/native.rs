// Native trust-call surface: C layouts of the WinTrust request structures and
// RAII ownership of the memory they are marshaled into.

use crate::error::VerifyError;
use std::ffi::c_void;
use std::mem::{align_of, size_of};
use std::ptr::{self, NonNull};

/// C layout of a Win32 `GUID`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Guid {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

/// `WINTRUST_ACTION_GENERIC_VERIFY_V2`: `{00AAC56B-CD44-11d0-8CC2-00C04FC295EE}`
pub const WINTRUST_ACTION_GENERIC_VERIFY_V2: Guid = Guid {
    data1: 0x00AA_C56B,
    data2: 0xCD44,
    data3: 0x11D0,
    data4: [0x8C, 0xC2, 0x00, 0xC0, 0x4F, 0xC2, 0x95, 0xEE],
};

pub const WTD_UI_NONE: u32 = 2;
pub const WTD_REVOKE_NONE: u32 = 0;
pub const WTD_REVOKE_WHOLECHAIN: u32 = 1;
pub const WTD_CHOICE_FILE: u32 = 1;
pub const WTD_STATEACTION_IGNORE: u32 = 0;
pub const WTD_REVOCATION_CHECK_CHAIN_EXCLUDE_ROOT: u32 = 0x0000_0080;
pub const WTD_DISABLE_MD2_MD4: u32 = 0x0000_2000;

/// C layout of `WINTRUST_FILE_INFO`.
#[repr(C)]
#[derive(Debug)]
pub struct WinTrustFileInfo {
    pub cb_struct: u32,
    pub file_path: *const u16,
    pub file_handle: *mut c_void,
    pub known_subject: *mut Guid,
}

impl WinTrustFileInfo {
    /// Descriptor naming only the file path.
    pub fn for_path(file_path: *const u16) -> Self {
        Self {
            cb_struct: size_of::<WinTrustFileInfo>() as u32,
            file_path,
            file_handle: ptr::null_mut(),
            known_subject: ptr::null_mut(),
        }
    }
}

/// C layout of `WINTRUST_DATA` with the subject union fixed to the file member.
#[repr(C)]
#[derive(Debug)]
pub struct WinTrustData {
    pub cb_struct: u32,
    pub policy_callback_data: *mut c_void,
    pub sip_client_data: *mut c_void,
    pub ui_choice: u32,
    pub revocation_checks: u32,
    pub union_choice: u32,
    pub file: *mut WinTrustFileInfo,
    pub state_action: u32,
    pub state_data: *mut c_void,
    pub url_reference: *mut u16,
    pub prov_flags: u32,
    pub ui_context: u32,
    pub signature_settings: *mut c_void,
}

impl WinTrustData {
    /// Silent, stateless verification of a standalone file.
    pub fn for_file(file: *mut WinTrustFileInfo, revocation_checks: u32, prov_flags: u32) -> Self {
        Self {
            cb_struct: size_of::<WinTrustData>() as u32,
            policy_callback_data: ptr::null_mut(),
            sip_client_data: ptr::null_mut(),
            ui_choice: WTD_UI_NONE,
            revocation_checks,
            union_choice: WTD_CHOICE_FILE,
            file,
            state_action: WTD_STATEACTION_IGNORE,
            state_data: ptr::null_mut(),
            url_reference: ptr::null_mut(),
            prov_flags,
            ui_context: 0,
            signature_settings: ptr::null_mut(),
        }
    }
}

/// The far side of the trust call: an allocator for out-of-band request
/// memory plus the verification entry point itself.
pub trait TrustBoundary {
    /// Allocates `bytes` of memory the trust subsystem can read.
    fn allocate(&self, bytes: usize) -> Option<NonNull<u8>>;

    /// # Safety
    /// `block` must have been returned by [`allocate`](Self::allocate) on this
    /// boundary with the same `bytes`, and must not be used afterwards.
    unsafe fn release(&self, block: NonNull<u8>, bytes: usize);

    /// Submits a request and returns the raw 32-bit result.
    ///
    /// # Safety
    /// `data` must point to a fully initialised [`WinTrustData`] whose
    /// pointers stay valid for the duration of the call.
    unsafe fn win_verify_trust(&self, action: *mut Guid, data: *mut WinTrustData) -> i32;
}

/// RAII guard for a block obtained from a [`TrustBoundary`].
/// Releases the block on drop, including during unwinding.
pub struct NativeBlock<'b, B: TrustBoundary + ?Sized> {
    boundary: &'b B,
    ptr: NonNull<u8>,
    len: usize,
}

impl<'b, B: TrustBoundary + ?Sized> NativeBlock<'b, B> {
    fn allocate(boundary: &'b B, len: usize, align: usize) -> Result<Self, VerifyError> {
        let ptr = boundary.allocate(len).ok_or(VerifyError::Allocation(len))?;
        let block = NativeBlock { boundary, ptr, len };
        if (ptr.as_ptr() as usize) % align != 0 {
            return Err(VerifyError::Allocation(len));
        }
        Ok(block)
    }

    /// Moves `value` into a fresh block.
    pub fn write<T>(boundary: &'b B, value: T) -> Result<Self, VerifyError> {
        let block = Self::allocate(boundary, size_of::<T>(), align_of::<T>())?;
        unsafe { ptr::write(block.as_mut_ptr::<T>(), value) };
        Ok(block)
    }

    /// Copies `values` into a fresh block.
    pub fn copy_from_slice<T: Copy>(boundary: &'b B, values: &[T]) -> Result<Self, VerifyError> {
        let len = std::mem::size_of_val(values);
        let block = Self::allocate(boundary, len, align_of::<T>())?;
        unsafe {
            ptr::copy_nonoverlapping(values.as_ptr(), block.as_mut_ptr::<T>(), values.len());
        }
        Ok(block)
    }

    pub fn as_mut_ptr<T>(&self) -> *mut T {
        self.ptr.as_ptr().cast()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<B: TrustBoundary + ?Sized> Drop for NativeBlock<'_, B> {
    fn drop(&mut self) {
        unsafe { self.boundary.release(self.ptr, self.len) };
    }
}

/// The running platform's trust subsystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrustBoundary;

#[cfg(windows)]
impl TrustBoundary for SystemTrustBoundary {
    fn allocate(&self, bytes: usize) -> Option<NonNull<u8>> {
        use windows::Win32::System::Com::CoTaskMemAlloc;

        NonNull::new(unsafe { CoTaskMemAlloc(bytes) }.cast::<u8>())
    }

    unsafe fn release(&self, block: NonNull<u8>, _bytes: usize) {
        use windows::Win32::System::Com::CoTaskMemFree;

        CoTaskMemFree(Some(block.as_ptr() as *const c_void));
    }

    unsafe fn win_verify_trust(&self, action: *mut Guid, data: *mut WinTrustData) -> i32 {
        use windows::core::GUID;
        use windows::Win32::Foundation::HWND;
        use windows::Win32::Security::WinTrust::WinVerifyTrust;

        WinVerifyTrust(
            HWND(ptr::null_mut()),
            action as *mut GUID,
            data as *mut c_void,
        )
    }
}

// Without a WinTrust provider every evaluation answers "provider unknown";
// a missing subject still reports as not found so callers see the same
// distinction they would on Windows.
#[cfg(not(windows))]
impl TrustBoundary for SystemTrustBoundary {
    fn allocate(&self, bytes: usize) -> Option<NonNull<u8>> {
        let layout = std::alloc::Layout::from_size_align(bytes.max(1), 16).ok()?;
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    unsafe fn release(&self, block: NonNull<u8>, bytes: usize) {
        if let Ok(layout) = std::alloc::Layout::from_size_align(bytes.max(1), 16) {
            std::alloc::dealloc(block.as_ptr(), layout);
        }
    }

    unsafe fn win_verify_trust(&self, action: *mut Guid, data: *mut WinTrustData) -> i32 {
        use crate::error::{
            HRESULT_FILE_NOT_FOUND, TRUST_E_ACTION_UNKNOWN, TRUST_E_PROVIDER_UNKNOWN,
            TRUST_E_SUBJECT_FORM_UNKNOWN,
        };

        if *action != WINTRUST_ACTION_GENERIC_VERIFY_V2 {
            return TRUST_E_ACTION_UNKNOWN;
        }
        let data = &*data;
        if data.union_choice != WTD_CHOICE_FILE || data.file.is_null() {
            return TRUST_E_SUBJECT_FORM_UNKNOWN;
        }
        let path = crate::utils::wide_ptr_to_path((*data.file).file_path);
        if !path.is_file() {
            return HRESULT_FILE_NOT_FOUND;
        }
        TRUST_E_PROVIDER_UNKNOWN
    }
}
