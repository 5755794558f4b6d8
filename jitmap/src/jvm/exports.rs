//! Library entry points the VM looks up by name

#![allow(unsafe_code, non_snake_case)]

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::sync::Arc;

use log::info;

use super::callbacks::guarded;
use super::env::JvmRuntime;
use super::sys;
use super::AGENT;
use crate::domain::RuntimeError;
use crate::runtime::Runtime;

/// Copy the option string, `None` when the VM passed none
///
/// # Safety
/// `options` must be null or NUL-terminated.
unsafe fn options_string(options: *const c_char) -> Option<String> {
    if options.is_null() {
        return None;
    }
    // SAFETY: checked non-null above, NUL-terminated per the caller
    Some(unsafe { CStr::from_ptr(options) }.to_string_lossy().into_owned())
}

fn invoke(vm: *mut sys::JavaVM, options: *const c_char, vm_live: bool) -> sys::jint {
    let mut code = sys::JNI_ERR;
    guarded(if vm_live { "Agent_OnAttach" } else { "Agent_OnLoad" }, || {
        // SAFETY: the VM passes a valid option string or null
        let options = unsafe { options_string(options) };
        code = AGENT.handle_invocation(options.as_deref(), vm_live, |parsed| {
            // SAFETY: `vm` is the JavaVM this library was loaded into
            let runtime = unsafe { JvmRuntime::connect(vm, parsed.layout) }?;
            Ok::<_, RuntimeError>(Arc::new(runtime) as Arc<dyn Runtime>)
        });
    });
    code
}

/// Loaded with `-agentpath` while the VM is starting
#[no_mangle]
pub extern "system" fn Agent_OnLoad(vm: *mut sys::JavaVM, options: *mut c_char, _reserved: *mut c_void) -> sys::jint {
    invoke(vm, options, false)
}

/// Loaded into a running VM through the attach mechanism
#[no_mangle]
pub extern "system" fn Agent_OnAttach(
    vm: *mut sys::JavaVM,
    options: *mut c_char,
    _reserved: *mut c_void,
) -> sys::jint {
    invoke(vm, options, true)
}

/// Teardown already happened on VM death or an explicit shutdown
#[no_mangle]
pub extern "system" fn Agent_OnUnload(_vm: *mut sys::JavaVM) {
    guarded("Agent_OnUnload", || info!("agent unloaded"));
}
