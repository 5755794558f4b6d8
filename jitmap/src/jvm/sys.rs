//! Raw JNI and JVMTI declarations
//!
//! Only the entries the agent calls are typed. Every other vtable slot is
//! a pointer-sized pad so the typed ones land at their documented index.
//! Vtables are only ever read through a pointer handed out by the VM, so
//! they stop at the last slot used.

#![allow(non_camel_case_types, non_snake_case)]

use std::os::raw::{c_char, c_uchar, c_void};

pub type jint = i32;
pub type jlong = i64;
pub type jboolean = c_uchar;
pub type jobject = *mut c_void;
pub type jclass = jobject;
pub type jthread = jobject;
pub type jstring = jobject;
pub type jmethodID = *mut c_void;
pub type jfieldID = *mut c_void;
pub type jvmtiError = jint;
pub type jvmtiEvent = u32;

type Pad = *const c_void;

pub const JNI_OK: jint = 0;
pub const JNI_ERR: jint = -1;
pub const JNI_VERSION_1_6: jint = 0x0001_0006;

pub const JVMTI_VERSION_1_0: jint = 0x3001_0000;
pub const JVMTI_ERROR_NONE: jvmtiError = 0;
pub const JVMTI_ERROR_NOT_AVAILABLE: jvmtiError = 98;
pub const JVMTI_ENABLE: jint = 1;
pub const JVMTI_DISABLE: jint = 0;
pub const JVMTI_THREAD_NORM_PRIORITY: jint = 5;

/// `jvmtiCapabilities` is a 128-bit bitfield
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct jvmtiCapabilities {
    pub bits: [u32; 4],
}

impl jvmtiCapabilities {
    const CAN_GENERATE_COMPILED_METHOD_LOAD_EVENTS: u32 = 1 << 27;

    #[must_use]
    pub fn compiled_method_load() -> Self {
        let mut caps = Self::default();
        caps.bits[0] |= Self::CAN_GENERATE_COMPILED_METHOD_LOAD_EVENTS;
        caps
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct jvmtiThreadInfo {
    pub name: *mut c_char,
    pub priority: jint,
    pub is_daemon: jboolean,
    pub thread_group: jobject,
    pub context_class_loader: jobject,
}

impl Default for jvmtiThreadInfo {
    fn default() -> Self {
        Self {
            name: std::ptr::null_mut(),
            priority: 0,
            is_daemon: 0,
            thread_group: std::ptr::null_mut(),
            context_class_loader: std::ptr::null_mut(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub union jvalue {
    pub z: jboolean,
    pub i: jint,
    pub j: jlong,
    pub l: jobject,
}

pub type JNIEnv = *const JNINativeInterface;
pub type JavaVM = *const JNIInvokeInterface;
pub type jvmtiEnv = *const jvmtiInterface;

pub type jvmtiStartFunction =
    unsafe extern "system" fn(jvmti_env: *mut jvmtiEnv, jni_env: *mut JNIEnv, arg: *mut c_void);

#[repr(C)]
pub struct JNIInvokeInterface {
    _reserved: [Pad; 3],
    _destroy_java_vm: Pad,
    _attach_current_thread: Pad,
    _detach_current_thread: Pad,
    pub GetEnv: Option<unsafe extern "system" fn(vm: *mut JavaVM, penv: *mut *mut c_void, version: jint) -> jint>,
}

#[repr(C)]
pub struct JNINativeInterface {
    _pad0: [Pad; 6],
    pub FindClass: Option<unsafe extern "system" fn(env: *mut JNIEnv, name: *const c_char) -> jclass>,
    _pad7: [Pad; 10],
    pub ExceptionClear: Option<unsafe extern "system" fn(env: *mut JNIEnv)>,
    _pad18: [Pad; 5],
    pub DeleteLocalRef: Option<unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject)>,
    _pad24: [Pad; 6],
    pub NewObjectA: Option<
        unsafe extern "system" fn(env: *mut JNIEnv, class: jclass, method: jmethodID, args: *const jvalue) -> jobject,
    >,
    _pad31: [Pad; 2],
    pub GetMethodID: Option<
        unsafe extern "system" fn(env: *mut JNIEnv, class: jclass, name: *const c_char, sig: *const c_char) -> jmethodID,
    >,
    _pad34: [Pad; 29],
    pub CallVoidMethodA:
        Option<unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject, method: jmethodID, args: *const jvalue)>,
    _pad64: [Pad; 30],
    pub GetFieldID: Option<
        unsafe extern "system" fn(env: *mut JNIEnv, class: jclass, name: *const c_char, sig: *const c_char) -> jfieldID,
    >,
    _pad95: [Pad; 6],
    pub GetLongField: Option<unsafe extern "system" fn(env: *mut JNIEnv, obj: jobject, field: jfieldID) -> jlong>,
    _pad102: [Pad; 65],
    pub NewStringUTF: Option<unsafe extern "system" fn(env: *mut JNIEnv, utf: *const c_char) -> jstring>,
    _pad168: [Pad; 60],
    pub ExceptionCheck: Option<unsafe extern "system" fn(env: *mut JNIEnv) -> jboolean>,
}

#[repr(C)]
pub struct jvmtiInterface {
    _reserved1: Pad,
    pub SetEventNotificationMode: Option<
        unsafe extern "C" fn(env: *mut jvmtiEnv, mode: jint, event: jvmtiEvent, thread: jthread, ...) -> jvmtiError,
    >,
    _pad3: Pad,
    pub GetAllThreads: Option<
        unsafe extern "system" fn(env: *mut jvmtiEnv, count: *mut jint, threads: *mut *mut jthread) -> jvmtiError,
    >,
    _pad5: [Pad; 4],
    pub GetThreadInfo: Option<
        unsafe extern "system" fn(env: *mut jvmtiEnv, thread: jthread, info: *mut jvmtiThreadInfo) -> jvmtiError,
    >,
    _pad10: [Pad; 2],
    pub RunAgentThread: Option<
        unsafe extern "system" fn(
            env: *mut jvmtiEnv,
            thread: jthread,
            proc_: jvmtiStartFunction,
            arg: *const c_void,
            priority: jint,
        ) -> jvmtiError,
    >,
    _pad13: [Pad; 34],
    pub Deallocate: Option<unsafe extern "system" fn(env: *mut jvmtiEnv, mem: *mut c_uchar) -> jvmtiError>,
    pub GetClassSignature: Option<
        unsafe extern "system" fn(
            env: *mut jvmtiEnv,
            class: jclass,
            signature: *mut *mut c_char,
            generic: *mut *mut c_char,
        ) -> jvmtiError,
    >,
    _pad49: [Pad; 15],
    pub GetMethodName: Option<
        unsafe extern "system" fn(
            env: *mut jvmtiEnv,
            method: jmethodID,
            name: *mut *mut c_char,
            signature: *mut *mut c_char,
            generic: *mut *mut c_char,
        ) -> jvmtiError,
    >,
    pub GetMethodDeclaringClass: Option<
        unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, class: *mut jclass) -> jvmtiError,
    >,
    _pad66: [Pad; 22],
    pub GetVersionNumber: Option<unsafe extern "system" fn(env: *mut jvmtiEnv, version: *mut jint) -> jvmtiError>,
    _pad89: [Pad; 33],
    pub SetEventCallbacks: Option<
        unsafe extern "system" fn(env: *mut jvmtiEnv, callbacks: *const jvmtiEventCallbacks, size: jint) -> jvmtiError,
    >,
    pub GenerateEvents: Option<unsafe extern "system" fn(env: *mut jvmtiEnv, event: jvmtiEvent) -> jvmtiError>,
    _pad124: [Pad; 3],
    pub DisposeEnvironment: Option<unsafe extern "system" fn(env: *mut jvmtiEnv) -> jvmtiError>,
    _pad128: [Pad; 5],
    pub GetPhase: Option<unsafe extern "system" fn(env: *mut jvmtiEnv, phase: *mut jint) -> jvmtiError>,
    _pad134: [Pad; 8],
    pub AddCapabilities:
        Option<unsafe extern "system" fn(env: *mut jvmtiEnv, caps: *const jvmtiCapabilities) -> jvmtiError>,
}

pub type VmInitFn = unsafe extern "system" fn(env: *mut jvmtiEnv, jni: *mut JNIEnv, thread: jthread);
pub type VmDeathFn = unsafe extern "system" fn(env: *mut jvmtiEnv, jni: *mut JNIEnv);
pub type ThreadFn = unsafe extern "system" fn(env: *mut jvmtiEnv, jni: *mut JNIEnv, thread: jthread);
pub type CompiledMethodLoadFn = unsafe extern "system" fn(
    env: *mut jvmtiEnv,
    method: jmethodID,
    code_size: jint,
    code_addr: *const c_void,
    map_length: jint,
    map: *const c_void,
    compile_info: *const c_void,
);
pub type CompiledMethodUnloadFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, method: jmethodID, code_addr: *const c_void);
pub type DynamicCodeGeneratedFn =
    unsafe extern "system" fn(env: *mut jvmtiEnv, name: *const c_char, address: *const c_void, length: jint);

type Unused = Option<unsafe extern "system" fn()>;

/// Prefix of `jvmtiEventCallbacks` up to the last handler installed
///
/// The VM accepts a shorter struct as long as its size is passed along.
#[repr(C)]
#[derive(Default)]
pub struct jvmtiEventCallbacks {
    pub VMInit: Option<VmInitFn>,
    pub VMDeath: Option<VmDeathFn>,
    pub ThreadStart: Option<ThreadFn>,
    pub ThreadEnd: Option<ThreadFn>,
    pub ClassFileLoadHook: Unused,
    pub ClassLoad: Unused,
    pub ClassPrepare: Unused,
    pub VMStart: Unused,
    pub Exception: Unused,
    pub ExceptionCatch: Unused,
    pub SingleStep: Unused,
    pub FramePop: Unused,
    pub Breakpoint: Unused,
    pub FieldAccess: Unused,
    pub FieldModification: Unused,
    pub MethodEntry: Unused,
    pub MethodExit: Unused,
    pub NativeMethodBind: Unused,
    pub CompiledMethodLoad: Option<CompiledMethodLoadFn>,
    pub CompiledMethodUnload: Option<CompiledMethodUnloadFn>,
    pub DynamicCodeGenerated: Option<DynamicCodeGeneratedFn>,
}

/// `jvmtiCMLRKind` of the inline-info record
pub const JVMTI_CMLR_INLINE_INFO: jint = 2;

/// Common header of every compile-info record
#[repr(C)]
pub struct jvmtiCompiledMethodLoadRecordHeader {
    pub kind: jint,
    pub majorinfoversion: jint,
    pub minorinfoversion: jint,
    pub next: *const jvmtiCompiledMethodLoadRecordHeader,
}

/// Inlined frames at one pc; `methods[0]` is the innermost
#[repr(C)]
pub struct PCStackInfo {
    pub pc: *const c_void,
    pub numstackframes: jint,
    pub methods: *const jmethodID,
    pub bcis: *const jint,
}

#[repr(C)]
pub struct jvmtiCompiledMethodLoadInlineRecord {
    pub header: jvmtiCompiledMethodLoadRecordHeader,
    pub numpcs: jint,
    pub pcinfo: *const PCStackInfo,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    const SLOT: usize = size_of::<Pad>();

    #[test]
    fn test_jvmti_slots() {
        // 1-based slot numbers from jvmti.h
        assert_eq!(offset_of!(jvmtiInterface, SetEventNotificationMode), SLOT);
        assert_eq!(offset_of!(jvmtiInterface, GetAllThreads), 3 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, GetThreadInfo), 8 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, RunAgentThread), 11 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, Deallocate), 46 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, GetMethodName), 63 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, GetVersionNumber), 87 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, SetEventCallbacks), 121 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, DisposeEnvironment), 126 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, GetPhase), 132 * SLOT);
        assert_eq!(offset_of!(jvmtiInterface, AddCapabilities), 141 * SLOT);
    }

    #[test]
    fn test_jni_slots() {
        assert_eq!(offset_of!(JNIInvokeInterface, GetEnv), 6 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, FindClass), 6 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, ExceptionClear), 17 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, DeleteLocalRef), 23 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, NewObjectA), 30 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, GetMethodID), 33 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, CallVoidMethodA), 63 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, GetFieldID), 94 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, GetLongField), 101 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, NewStringUTF), 167 * SLOT);
        assert_eq!(offset_of!(JNINativeInterface, ExceptionCheck), 228 * SLOT);
    }

    #[test]
    fn test_callbacks_layout() {
        assert_eq!(size_of::<jvmtiEventCallbacks>(), 21 * SLOT);
        assert_eq!(offset_of!(jvmtiEventCallbacks, CompiledMethodLoad), 18 * SLOT);
        assert_eq!(jvmtiCapabilities::compiled_method_load().bits, [1 << 27, 0, 0, 0]);
    }
}
