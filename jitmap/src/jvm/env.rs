//! Safe wrappers over the JVMTI and JNI environments
//!
//! `Jvmti` is the environment the agent owns; it is valid on any thread
//! until disposed. `Jni` is per-thread and is fetched from the `JavaVM`
//! whenever a call needs one. Every string or array the VM allocates for
//! us is copied out and released before the wrapper returns, and so is
//! every local reference a JVMTI call hands back.

#![allow(unsafe_code)]

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use log::{debug, error};

use super::callbacks;
use super::layout::ThreadLayout;
use super::sys;
use crate::cli::LayoutOverride;
use crate::domain::{report_failed, MethodId, Notification, Phase, RuntimeError, ThreadRef, Tid};
use crate::profiling::thread_registry::UNKNOWN_THREAD_NAME;
use crate::runtime::{AgentJob, ManagedThread, Runtime, SymbolSource, ThreadNames};

/// Status for a phase value the interface does not define
const JVMTI_ERROR_INTERNAL: sys::jvmtiError = 113;

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const CALLBACKS_SIZE: sys::jint = std::mem::size_of::<sys::jvmtiEventCallbacks>() as sys::jint;

/// VM the agent was loaded into, set by [`JvmRuntime::connect`]
///
/// JVMTI calls that return local references get the calling thread's JNI
/// environment from here to delete them.
static JAVA_VM: AtomicPtr<sys::JavaVM> = AtomicPtr::new(ptr::null_mut());

/// Call a JVMTI function by name; must be used inside `unsafe`
macro_rules! jvmti_call {
    ($env:expr, $name:ident $(, $arg:expr)*) => {{
        let env = $env;
        match (**env).$name {
            Some(function) => RuntimeError::check(stringify!($name), function(env $(, $arg)*)),
            None => Err(RuntimeError::new(stringify!($name), sys::JVMTI_ERROR_NOT_AVAILABLE)),
        }
    }};
}

/// Look up a JNI function by name; must be used inside `unsafe`
macro_rules! jni_fn {
    ($env:expr, $name:ident) => {
        (**$env).$name.ok_or(RuntimeError::new(stringify!($name), sys::JNI_ERR))
    };
}

/// Borrowed JVMTI environment
#[derive(Debug, Clone, Copy)]
pub struct Jvmti {
    env: *mut sys::jvmtiEnv,
}

impl Jvmti {
    /// # Safety
    /// `env` must be a JVMTI environment obtained from the VM. Calls made
    /// after it is disposed fail with a status instead of succeeding.
    #[must_use]
    pub unsafe fn from_raw(env: *mut sys::jvmtiEnv) -> Self {
        Self { env }
    }

    fn deallocate<T>(&self, mem: *mut T) {
        if mem.is_null() {
            return;
        }
        // SAFETY: `mem` was allocated by this environment
        let result = unsafe { jvmti_call!(self.env, Deallocate, mem.cast::<u8>()) };
        report_failed(result, "can't release JVMTI memory");
    }

    /// Copy a VM-allocated string out and release it
    fn take_string(&self, raw: *mut c_char) -> Option<String> {
        if raw.is_null() {
            return None;
        }
        // SAFETY: the VM hands out NUL-terminated modified UTF-8
        let copied = unsafe { CStr::from_ptr(raw) }.to_string_lossy().into_owned();
        self.deallocate(raw);
        Some(copied)
    }

    /// Delete local references a JVMTI call returned on this thread
    fn release_locals(&self, refs: &[sys::jobject]) {
        if refs.iter().all(|local| local.is_null()) {
            return;
        }
        match Jni::current(JAVA_VM.load(Ordering::Acquire)) {
            Ok(jni) => refs.iter().for_each(|&local| jni.delete_local_ref(local)),
            Err(err) => debug!("can't release local references: {err}"),
        }
    }

    pub fn phase(&self) -> Result<Phase, RuntimeError> {
        let mut raw = 0;
        // SAFETY: out-pointer to a local
        unsafe { jvmti_call!(self.env, GetPhase, &mut raw) }?;
        Phase::from_raw(raw).ok_or(RuntimeError::new("GetPhase", JVMTI_ERROR_INTERNAL))
    }

    pub fn version_number(&self) -> Result<sys::jint, RuntimeError> {
        let mut version = 0;
        // SAFETY: out-pointer to a local
        unsafe { jvmti_call!(self.env, GetVersionNumber, &mut version) }?;
        Ok(version)
    }

    pub fn add_capabilities(&self, caps: &sys::jvmtiCapabilities) -> Result<(), RuntimeError> {
        // SAFETY: the VM copies the capabilities before returning
        unsafe { jvmti_call!(self.env, AddCapabilities, ptr::from_ref(caps)) }
    }

    pub fn set_event_callbacks(&self, table: &sys::jvmtiEventCallbacks) -> Result<(), RuntimeError> {
        // SAFETY: the VM copies the table before returning
        unsafe { jvmti_call!(self.env, SetEventCallbacks, ptr::from_ref(table), CALLBACKS_SIZE) }
    }

    pub fn set_event_notification_mode(
        &self,
        enabled: bool,
        event: sys::jvmtiEvent,
    ) -> Result<(), RuntimeError> {
        let mode = if enabled { sys::JVMTI_ENABLE } else { sys::JVMTI_DISABLE };
        // SAFETY: a null thread selects all threads
        unsafe { jvmti_call!(self.env, SetEventNotificationMode, mode, event, ptr::null_mut()) }
    }

    pub fn generate_events(&self, event: sys::jvmtiEvent) -> Result<(), RuntimeError> {
        // SAFETY: plain value arguments
        unsafe { jvmti_call!(self.env, GenerateEvents, event) }
    }

    /// Local references to every live thread; the caller deletes them
    pub fn all_threads(&self) -> Result<Vec<sys::jthread>, RuntimeError> {
        let mut count: sys::jint = 0;
        let mut threads: *mut sys::jthread = ptr::null_mut();
        // SAFETY: out-pointers to locals
        unsafe { jvmti_call!(self.env, GetAllThreads, &mut count, &mut threads) }?;

        let listed = match usize::try_from(count) {
            Ok(len) if !threads.is_null() => {
                // SAFETY: the VM returned `count` contiguous handles
                unsafe { std::slice::from_raw_parts(threads, len) }.to_vec()
            }
            _ => Vec::new(),
        };
        self.deallocate(threads);
        Ok(listed)
    }

    fn run_agent_thread(&self, thread: sys::jthread, arg: *const c_void) -> Result<(), RuntimeError> {
        // SAFETY: `run_job` matches the start function signature
        unsafe {
            jvmti_call!(self.env, RunAgentThread, thread, run_job, arg, sys::JVMTI_THREAD_NORM_PRIORITY)
        }
    }

    pub fn dispose(&self) -> Result<(), RuntimeError> {
        // SAFETY: no arguments besides the environment
        unsafe { jvmti_call!(self.env, DisposeEnvironment) }
    }
}

impl SymbolSource for Jvmti {
    fn method_name(&self, method: MethodId) -> Result<String, RuntimeError> {
        let mut name: *mut c_char = ptr::null_mut();
        // SAFETY: null signature and generic out-pointers are allowed
        unsafe {
            jvmti_call!(
                self.env,
                GetMethodName,
                method.0 as sys::jmethodID,
                &mut name,
                ptr::null_mut(),
                ptr::null_mut()
            )
        }?;
        self.take_string(name).ok_or(RuntimeError::new("GetMethodName", JVMTI_ERROR_INTERNAL))
    }

    fn declaring_class_signature(&self, method: MethodId) -> Result<String, RuntimeError> {
        let mut class: sys::jclass = ptr::null_mut();
        // SAFETY: out-pointer to a local
        unsafe { jvmti_call!(self.env, GetMethodDeclaringClass, method.0 as sys::jmethodID, &mut class) }?;

        let mut signature: *mut c_char = ptr::null_mut();
        // SAFETY: a null generic out-pointer is allowed
        let found = unsafe { jvmti_call!(self.env, GetClassSignature, class, &mut signature, ptr::null_mut()) };
        self.release_locals(&[class]);
        found?;
        self.take_string(signature).ok_or(RuntimeError::new("GetClassSignature", JVMTI_ERROR_INTERNAL))
    }
}

impl ThreadNames for Jvmti {
    fn thread_name(&self, thread: ThreadRef) -> Result<Option<String>, RuntimeError> {
        let mut info = sys::jvmtiThreadInfo::default();
        // SAFETY: out-pointer to a local
        unsafe { jvmti_call!(self.env, GetThreadInfo, thread.0 as sys::jthread, &mut info) }?;
        self.release_locals(&[info.thread_group, info.context_class_loader]);
        Ok(self.take_string(info.name))
    }
}

/// JNI environment of the calling thread
struct Jni {
    env: *mut sys::JNIEnv,
}

impl Jni {
    /// Environment of the calling thread
    fn current(vm: *mut sys::JavaVM) -> Result<Self, RuntimeError> {
        if vm.is_null() {
            return Err(RuntimeError::new("GetEnv", sys::JNI_ERR));
        }
        let mut env: *mut c_void = ptr::null_mut();
        // SAFETY: a non-null `vm` was handed to `connect` by the VM
        unsafe {
            let get_env = jni_fn!(vm, GetEnv)?;
            RuntimeError::check("GetEnv", get_env(vm, &mut env, sys::JNI_VERSION_1_6))?;
        }
        Ok(Self { env: env.cast() })
    }

    /// Clear a pending exception, reporting whether there was one
    fn take_exception(&self) -> bool {
        // SAFETY: both calls are valid with or without a pending exception
        unsafe {
            let (Ok(check), Ok(clear)) = (jni_fn!(self.env, ExceptionCheck), jni_fn!(self.env, ExceptionClear))
            else {
                return false;
            };
            if check(self.env) == 0 {
                return false;
            }
            clear(self.env);
        }
        true
    }

    fn non_null<T>(&self, operation: &'static str, value: *mut T) -> Result<*mut T, RuntimeError> {
        if self.take_exception() || value.is_null() {
            Err(RuntimeError::new(operation, sys::JNI_ERR))
        } else {
            Ok(value)
        }
    }

    fn find_class(&self, name: &CStr) -> Result<sys::jclass, RuntimeError> {
        // SAFETY: `name` is NUL-terminated
        let class = unsafe { jni_fn!(self.env, FindClass)?(self.env, name.as_ptr()) };
        self.non_null("FindClass", class)
    }

    fn method_id(&self, class: sys::jclass, name: &CStr, sig: &CStr) -> Result<sys::jmethodID, RuntimeError> {
        // SAFETY: `class` is a live local reference
        let method = unsafe { jni_fn!(self.env, GetMethodID)?(self.env, class, name.as_ptr(), sig.as_ptr()) };
        self.non_null("GetMethodID", method)
    }

    fn field_id(&self, class: sys::jclass, name: &CStr, sig: &CStr) -> Result<sys::jfieldID, RuntimeError> {
        // SAFETY: `class` is a live local reference
        let field = unsafe { jni_fn!(self.env, GetFieldID)?(self.env, class, name.as_ptr(), sig.as_ptr()) };
        self.non_null("GetFieldID", field)
    }

    fn new_object(&self, class: sys::jclass, ctor: sys::jmethodID) -> Result<sys::jobject, RuntimeError> {
        // SAFETY: `ctor` takes no arguments
        let object = unsafe { jni_fn!(self.env, NewObjectA)?(self.env, class, ctor, ptr::null()) };
        self.non_null("NewObjectA", object)
    }

    fn new_string(&self, text: &str) -> Result<sys::jstring, RuntimeError> {
        let text = CString::new(text).map_err(|_| RuntimeError::new("NewStringUTF", sys::JNI_ERR))?;
        // SAFETY: `text` is NUL-terminated
        let string = unsafe { jni_fn!(self.env, NewStringUTF)?(self.env, text.as_ptr()) };
        self.non_null("NewStringUTF", string)
    }

    fn call_void(&self, object: sys::jobject, method: sys::jmethodID, args: &[sys::jvalue]) -> Result<(), RuntimeError> {
        // SAFETY: `args` matches the method signature at every call site
        unsafe { jni_fn!(self.env, CallVoidMethodA)?(self.env, object, method, args.as_ptr()) };
        if self.take_exception() {
            return Err(RuntimeError::new("CallVoidMethodA", sys::JNI_ERR));
        }
        Ok(())
    }

    fn long_field(&self, object: sys::jobject, field: sys::jfieldID) -> Result<sys::jlong, RuntimeError> {
        // SAFETY: `field` is a long field of `object`'s class
        let value = unsafe { jni_fn!(self.env, GetLongField)?(self.env, object, field) };
        if self.take_exception() {
            return Err(RuntimeError::new("GetLongField", sys::JNI_ERR));
        }
        Ok(value)
    }

    fn delete_local_ref(&self, object: sys::jobject) {
        if object.is_null() {
            return;
        }
        // SAFETY: `object` is a local reference owned by this frame
        unsafe {
            if let Ok(delete) = jni_fn!(self.env, DeleteLocalRef) {
                delete(self.env, object);
            }
        }
    }

    /// Unstarted `java.lang.Thread` named `name`
    fn new_thread(&self, name: &str) -> Result<sys::jthread, RuntimeError> {
        let class = self.find_class(c"java/lang/Thread")?;
        let created = (|| {
            let ctor = self.method_id(class, c"<init>", c"()V")?;
            let set_name = self.method_id(class, c"setName", c"(Ljava/lang/String;)V")?;
            let thread = self.new_object(class, ctor)?;
            let named = self.new_string(name).and_then(|jname| {
                let result = self.call_void(thread, set_name, &[sys::jvalue { l: jname }]);
                self.delete_local_ref(jname);
                result
            });
            match named {
                Ok(()) => Ok(thread),
                Err(err) => {
                    self.delete_local_ref(thread);
                    Err(err)
                }
            }
        })();
        self.delete_local_ref(class);
        created
    }
}

/// Start function for agent threads; `arg` is a leaked `Box<AgentJob>`
unsafe extern "system" fn run_job(_jvmti: *mut sys::jvmtiEnv, _jni: *mut sys::JNIEnv, arg: *mut c_void) {
    // SAFETY: `spawn_agent_thread` leaked exactly one box for this thread
    let job = unsafe { Box::from_raw(arg.cast::<AgentJob>()) };
    if catch_unwind(AssertUnwindSafe(move || job())).is_err() {
        error!("agent thread panicked");
    }
}

/// The attached VM
pub struct JvmRuntime {
    vm: *mut sys::JavaVM,
    jvmti: Jvmti,
    layout: Option<ThreadLayout>,
}

// SAFETY: `JavaVM` and `jvmtiEnv` pointers may be used from any thread;
// JNI environments are fetched per call on the calling thread
unsafe impl Send for JvmRuntime {}
unsafe impl Sync for JvmRuntime {}

impl JvmRuntime {
    /// Obtain a JVMTI environment from `vm`
    ///
    /// # Safety
    /// `vm` must be the `JavaVM` passed to the library entry point.
    ///
    /// # Errors
    /// Returns the `GetEnv` status when no environment is available
    pub unsafe fn connect(vm: *mut sys::JavaVM, overrides: LayoutOverride) -> Result<Self, RuntimeError> {
        let mut env: *mut c_void = ptr::null_mut();
        // SAFETY: `vm` is valid per the caller
        unsafe {
            let get_env = jni_fn!(vm, GetEnv)?;
            RuntimeError::check("GetEnv", get_env(vm, &mut env, sys::JVMTI_VERSION_1_0))?;
        }
        // SAFETY: GetEnv succeeded with a JVMTI version
        let jvmti = unsafe { Jvmti::from_raw(env.cast()) };
        JAVA_VM.store(vm, Ordering::Release);

        match jvmti.version_number() {
            Ok(version) => debug!("JVMTI version {version:#x}"),
            Err(err) => debug!("{err}"),
        }
        let layout = ThreadLayout::from_overrides(overrides);
        match layout {
            Some(layout) => debug!("native thread layout {layout:?}"),
            None => debug!("no thread layout options, managed threads have no OS id"),
        }

        Ok(Self { vm, jvmti, layout })
    }

    #[must_use]
    pub fn jvmti(&self) -> Jvmti {
        self.jvmti
    }

    fn jni(&self) -> Result<Jni, RuntimeError> {
        Jni::current(self.vm)
    }

    /// Kernel id behind `thread`'s native thread, `None` if unstarted or gone
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    fn os_tid(jni: &Jni, thread: sys::jthread, eetop: sys::jfieldID, layout: ThreadLayout) -> Option<Tid> {
        let native = jni.long_field(thread, eetop).ok()?;
        if native == 0 {
            return None;
        }
        let native = native as usize as *const u8;
        // SAFETY: a non-zero eetop points at the VM's live native thread,
        // and the layout was checked for this VM
        unsafe {
            let osthread = native.add(layout.thread_osthread_offset).cast::<*const u8>().read_unaligned();
            if osthread.is_null() {
                return None;
            }
            let tid = osthread.add(layout.osthread_id_offset).cast::<i32>().read_unaligned();
            u32::try_from(tid).ok().map(Tid)
        }
    }

    fn eetop_field(&self, jni: &Jni) -> Option<(ThreadLayout, sys::jfieldID)> {
        let layout = self.layout?;
        let class = jni.find_class(c"java/lang/Thread").ok()?;
        let field = jni.field_id(class, c"eetop", c"J");
        jni.delete_local_ref(class);
        match field {
            Ok(field) => Some((layout, field)),
            Err(err) => {
                debug!("no eetop field: {err}");
                None
            }
        }
    }
}

impl SymbolSource for JvmRuntime {
    fn method_name(&self, method: MethodId) -> Result<String, RuntimeError> {
        self.jvmti.method_name(method)
    }

    fn declaring_class_signature(&self, method: MethodId) -> Result<String, RuntimeError> {
        self.jvmti.declaring_class_signature(method)
    }
}

impl ThreadNames for JvmRuntime {
    fn thread_name(&self, thread: ThreadRef) -> Result<Option<String>, RuntimeError> {
        self.jvmti.thread_name(thread)
    }
}

impl Runtime for JvmRuntime {
    fn phase(&self) -> Result<Phase, RuntimeError> {
        self.jvmti.phase()
    }

    fn add_compiled_code_capability(&self) -> Result<(), RuntimeError> {
        self.jvmti.add_capabilities(&sys::jvmtiCapabilities::compiled_method_load())
    }

    fn install_callbacks(&self) -> Result<(), RuntimeError> {
        self.jvmti.set_event_callbacks(&callbacks::table())
    }

    fn set_notification(&self, notification: Notification, enabled: bool) -> Result<(), RuntimeError> {
        self.jvmti.set_event_notification_mode(enabled, notification.event_number())
    }

    fn generate_events(&self, notification: Notification) -> Result<(), RuntimeError> {
        self.jvmti.generate_events(notification.event_number())
    }

    fn spawn_agent_thread(&self, name: &str, job: AgentJob) -> Result<(), RuntimeError> {
        let jni = self.jni()?;
        let thread = jni.new_thread(name)?;

        let arg = Box::into_raw(Box::new(job));
        let started = self.jvmti.run_agent_thread(thread, arg.cast_const().cast());
        if started.is_err() {
            // SAFETY: the thread never started, so the box is still ours
            drop(unsafe { Box::from_raw(arg) });
        }
        jni.delete_local_ref(thread);
        started
    }

    fn managed_threads(&self) -> Result<Vec<ManagedThread>, RuntimeError> {
        let jni = self.jni()?;
        let threads = self.jvmti.all_threads()?;
        let eetop = self.eetop_field(&jni);

        let mut managed = Vec::with_capacity(threads.len());
        for thread in threads {
            match self.jvmti.thread_name(ThreadRef(thread as usize)) {
                Ok(name) => managed.push(ManagedThread {
                    tid: eetop.and_then(|(layout, field)| Self::os_tid(&jni, thread, field, layout)),
                    name: name.unwrap_or_else(|| UNKNOWN_THREAD_NAME.to_string()),
                }),
                Err(err) => debug!("skipping thread: {err}"),
            }
            jni.delete_local_ref(thread);
        }
        Ok(managed)
    }

    fn dispose(&self) -> Result<(), RuntimeError> {
        self.jvmti.dispose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::sync::OnceLock;

    const THREAD_GROUP: usize = 0x10;
    const CLASS_LOADER: usize = 0x20;
    const DECLARING_CLASS: usize = 0x30;

    thread_local! {
        static DELETED: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
    }

    /// Raw pointer wrapper so leaked tables can live in a `OnceLock`
    struct Leaked<T>(*mut T);
    unsafe impl<T> Send for Leaked<T> {}
    unsafe impl<T> Sync for Leaked<T> {}

    unsafe extern "system" fn delete_local_ref(_env: *mut sys::JNIEnv, object: sys::jobject) {
        DELETED.with(|deleted| deleted.borrow_mut().push(object as usize));
    }

    unsafe extern "system" fn get_env(_vm: *mut sys::JavaVM, penv: *mut *mut c_void, _version: sys::jint) -> sys::jint {
        unsafe { *penv = fake_jni().0.cast() };
        sys::JNI_OK
    }

    unsafe extern "system" fn get_thread_info(
        _env: *mut sys::jvmtiEnv,
        _thread: sys::jthread,
        info: *mut sys::jvmtiThreadInfo,
    ) -> sys::jvmtiError {
        unsafe {
            *info = sys::jvmtiThreadInfo {
                thread_group: THREAD_GROUP as sys::jobject,
                context_class_loader: CLASS_LOADER as sys::jobject,
                ..sys::jvmtiThreadInfo::default()
            };
        }
        sys::JVMTI_ERROR_NONE
    }

    unsafe extern "system" fn get_method_declaring_class(
        _env: *mut sys::jvmtiEnv,
        _method: sys::jmethodID,
        class: *mut sys::jclass,
    ) -> sys::jvmtiError {
        unsafe { *class = DECLARING_CLASS as sys::jclass };
        sys::JVMTI_ERROR_NONE
    }

    unsafe extern "system" fn get_class_signature(
        _env: *mut sys::jvmtiEnv,
        _class: sys::jclass,
        _signature: *mut *mut c_char,
        _generic: *mut *mut c_char,
    ) -> sys::jvmtiError {
        // JVMTI_ERROR_INVALID_CLASS
        21
    }

    fn fake_jni() -> &'static Leaked<sys::JNIEnv> {
        static ENV: OnceLock<Leaked<sys::JNIEnv>> = OnceLock::new();
        ENV.get_or_init(|| {
            let mut table: sys::JNINativeInterface = unsafe { std::mem::zeroed() };
            table.DeleteLocalRef = Some(delete_local_ref);
            let table: sys::JNIEnv = Box::leak(Box::new(table));
            Leaked(Box::leak(Box::new(table)))
        })
    }

    /// Point `JAVA_VM` at a VM whose JNI environment records deletions
    fn install_fake_vm() {
        static VM: OnceLock<Leaked<sys::JavaVM>> = OnceLock::new();
        let vm = VM.get_or_init(|| {
            let mut table: sys::JNIInvokeInterface = unsafe { std::mem::zeroed() };
            table.GetEnv = Some(get_env);
            let table: sys::JavaVM = Box::leak(Box::new(table));
            Leaked(Box::leak(Box::new(table)))
        });
        JAVA_VM.store(vm.0, Ordering::Release);
    }

    fn fake_jvmti() -> Jvmti {
        let mut table: sys::jvmtiInterface = unsafe { std::mem::zeroed() };
        table.GetThreadInfo = Some(get_thread_info);
        table.GetMethodDeclaringClass = Some(get_method_declaring_class);
        table.GetClassSignature = Some(get_class_signature);
        let table: sys::jvmtiEnv = Box::leak(Box::new(table));
        unsafe { Jvmti::from_raw(Box::leak(Box::new(table))) }
    }

    fn take_deleted() -> Vec<usize> {
        DELETED.with(|deleted| deleted.borrow_mut().drain(..).collect())
    }

    #[test]
    fn test_thread_name_releases_group_and_loader() {
        install_fake_vm();
        let jvmti = fake_jvmti();
        take_deleted();

        assert_eq!(jvmti.thread_name(ThreadRef(0x1)).unwrap(), None);
        assert_eq!(take_deleted(), vec![THREAD_GROUP, CLASS_LOADER]);

        // the snapshot loop asks once per thread; nothing builds up
        for _ in 0..3 {
            jvmti.thread_name(ThreadRef(0x1)).unwrap();
        }
        assert_eq!(take_deleted().len(), 6);
    }

    #[test]
    fn test_declaring_class_released_when_signature_fails() {
        install_fake_vm();
        let jvmti = fake_jvmti();
        take_deleted();

        let err = jvmti.declaring_class_signature(MethodId(0x40)).unwrap_err();
        assert_eq!(err.code, 21);
        assert_eq!(take_deleted(), vec![DECLARING_CLASS]);
    }
}
