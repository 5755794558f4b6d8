//! Method handle → `Class.method` resolution
//!
//! Resolution is only valid while the instrumentation environment is alive.
//! Notifications already in flight when shutdown starts still reach the
//! resolver, so it fails closed: once the disposal flag is raised every
//! lookup returns `None`, and callers drop the record instead of writing it.

use jitmap_common::CHAIN_SEPARATOR;

use super::descriptor::qualified_method_name;
use crate::domain::MethodId;
use crate::lifecycle::DisposalFlag;
use crate::runtime::SymbolSource;

/// Resolves method handles against one symbol source
///
/// Holds no cache: handles are not assumed stable once the environment
/// that issued them is gone.
pub struct SymbolResolver<'a, S: SymbolSource + ?Sized> {
    source: &'a S,
    disposal: &'a DisposalFlag,
}

impl<'a, S: SymbolSource + ?Sized> SymbolResolver<'a, S> {
    #[must_use]
    pub fn new(source: &'a S, disposal: &'a DisposalFlag) -> Self {
        Self { source, disposal }
    }

    /// `Class.method` for `method`, or `None` if any lookup fails
    #[must_use]
    pub fn resolve(&self, method: MethodId) -> Option<String> {
        if self.disposal.is_disposing() {
            return None;
        }
        let name = self.source.method_name(method).ok()?;
        let class = self.source.declaring_class_signature(method).ok()?;
        Some(qualified_method_name(&class, &name))
    }

    /// Chain rendered in the order given, joined by `->`
    ///
    /// All or nothing: one unresolvable frame drops the whole chain.
    #[must_use]
    pub fn resolve_chain(&self, methods: &[MethodId]) -> Option<String> {
        let mut chain = String::new();
        for (i, method) in methods.iter().enumerate() {
            if i > 0 {
                chain.push_str(CHAIN_SEPARATOR);
            }
            chain.push_str(&self.resolve(*method)?);
        }
        (!chain.is_empty()).then_some(chain)
    }
}
