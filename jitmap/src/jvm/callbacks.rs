//! `extern "system"` notification handlers
//!
//! Each handler converts the raw arguments into core types and forwards to
//! the process-wide agent. Bodies run under `catch_unwind`: unwinding into
//! the VM aborts it.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::os::raw::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};

use log::error;

use super::env::Jvmti;
use super::sys;
use super::AGENT;
use crate::domain::{CodeAddress, MethodId, ThreadRef};
use crate::lifecycle::ShutdownTrigger;
use crate::profiling::{CompiledCode, PcFrames};

/// Handler table installed with `SetEventCallbacks`
#[must_use]
pub fn table() -> sys::jvmtiEventCallbacks {
    sys::jvmtiEventCallbacks {
        VMInit: Some(vm_init),
        VMDeath: Some(vm_death),
        ThreadStart: Some(thread_start),
        ThreadEnd: Some(thread_end),
        CompiledMethodLoad: Some(compiled_method_load),
        CompiledMethodUnload: Some(compiled_method_unload),
        DynamicCodeGenerated: Some(dynamic_code_generated),
        ..sys::jvmtiEventCallbacks::default()
    }
}

/// Run `body`, logging instead of unwinding
pub(super) fn guarded(handler: &str, body: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(body)).is_err() {
        error!("panic in {handler} handler");
    }
}

fn code_address(address: *const c_void) -> CodeAddress {
    CodeAddress(address as usize as u64)
}

/// Walk the compile-info chain for the inline record
///
/// # Safety
/// `record` must be null or the head of a record chain valid for the
/// duration of the notification.
unsafe fn inline_frames(
    mut record: *const sys::jvmtiCompiledMethodLoadRecordHeader,
) -> Option<Vec<PcFrames>> {
    // SAFETY: every `next` link stays within the chain the VM delivered
    unsafe {
        while !record.is_null() {
            if (*record).kind == sys::JVMTI_CMLR_INLINE_INFO {
                let inline = &*record.cast::<sys::jvmtiCompiledMethodLoadInlineRecord>();
                return Some(pc_frames(inline));
            }
            record = (*record).next;
        }
    }
    None
}

/// # Safety
/// `inline` must describe `numpcs` valid `PCStackInfo` entries.
unsafe fn pc_frames(inline: &sys::jvmtiCompiledMethodLoadInlineRecord) -> Vec<PcFrames> {
    let count = usize::try_from(inline.numpcs).unwrap_or(0);
    if inline.pcinfo.is_null() || count == 0 {
        return Vec::new();
    }
    // SAFETY: `pcinfo` has `numpcs` entries, each with `numstackframes`
    // method ids
    unsafe {
        std::slice::from_raw_parts(inline.pcinfo, count)
            .iter()
            .map(|info| {
                let depth = usize::try_from(info.numstackframes).unwrap_or(0);
                let methods = if info.methods.is_null() || depth == 0 {
                    Vec::new()
                } else {
                    std::slice::from_raw_parts(info.methods, depth)
                        .iter()
                        .map(|&method| MethodId(method as usize))
                        .collect()
                };
                PcFrames { pc: code_address(info.pc), methods }
            })
            .collect()
    }
}

unsafe extern "system" fn vm_init(_env: *mut sys::jvmtiEnv, _jni: *mut sys::JNIEnv, _thread: sys::jthread) {
    guarded("VMInit", || AGENT.on_vm_init());
}

unsafe extern "system" fn vm_death(_env: *mut sys::jvmtiEnv, _jni: *mut sys::JNIEnv) {
    guarded("VMDeath", || AGENT.shutdown(ShutdownTrigger::VmDeath));
}

unsafe extern "system" fn thread_start(env: *mut sys::jvmtiEnv, _jni: *mut sys::JNIEnv, thread: sys::jthread) {
    guarded("ThreadStart", || {
        // SAFETY: `env` is the environment the notification was sent to
        let jvmti = unsafe { Jvmti::from_raw(env) };
        AGENT.processor().thread_event(&jvmti, ThreadRef(thread as usize));
    });
}

unsafe extern "system" fn thread_end(env: *mut sys::jvmtiEnv, _jni: *mut sys::JNIEnv, thread: sys::jthread) {
    guarded("ThreadEnd", || {
        // SAFETY: `env` is the environment the notification was sent to
        let jvmti = unsafe { Jvmti::from_raw(env) };
        AGENT.processor().thread_event(&jvmti, ThreadRef(thread as usize));
    });
}

unsafe extern "system" fn compiled_method_load(
    env: *mut sys::jvmtiEnv,
    method: sys::jmethodID,
    code_size: sys::jint,
    code_addr: *const c_void,
    _map_length: sys::jint,
    _map: *const c_void,
    compile_info: *const c_void,
) {
    guarded("CompiledMethodLoad", || {
        // SAFETY: `compile_info` is valid until this handler returns
        let inline = unsafe { inline_frames(compile_info.cast()) };
        let unit = CompiledCode {
            method: MethodId(method as usize),
            address: code_address(code_addr),
            length: u64::try_from(code_size).unwrap_or(0),
            inline,
        };
        // SAFETY: `env` is the environment the notification was sent to
        let jvmti = unsafe { Jvmti::from_raw(env) };
        AGENT.processor().compiled_method_load(&jvmti, &unit);
    });
}

unsafe extern "system" fn compiled_method_unload(
    env: *mut sys::jvmtiEnv,
    method: sys::jmethodID,
    code_addr: *const c_void,
) {
    guarded("CompiledMethodUnload", || {
        // SAFETY: `env` is the environment the notification was sent to
        let jvmti = unsafe { Jvmti::from_raw(env) };
        AGENT
            .processor()
            .compiled_method_unload(&jvmti, MethodId(method as usize), code_address(code_addr));
    });
}

unsafe extern "system" fn dynamic_code_generated(
    _env: *mut sys::jvmtiEnv,
    name: *const c_char,
    address: *const c_void,
    length: sys::jint,
) {
    guarded("DynamicCodeGenerated", || {
        if name.is_null() {
            return;
        }
        // SAFETY: the VM passes a NUL-terminated stub name
        let name = unsafe { CStr::from_ptr(name) }.to_string_lossy();
        AGENT.processor().dynamic_code_generated(
            &name,
            code_address(address),
            u64::try_from(length).unwrap_or(0),
        );
    });
}
