//! # Inline-Record Decoding
//!
//! One compiled unit can hold the machine code of several methods, merged
//! by the JIT's inliner. The runtime describes this with a list of program
//! counter breakpoints, each carrying the call chain active from that pc
//! on (innermost method first). Decoding cuts the unit into consecutive
//! address ranges, each attributed to the right chain.
//!
//! ## Delay Rule
//!
//! A range is closed when the innermost method changes, and is attributed
//! to the chain recorded at the breakpoint *before* the one that closed it.
//! A range closed by the very first breakpoint has no such chain and is
//! attributed to the root method alone. Whatever remains after the last
//! breakpoint takes the last breakpoint's chain.
//!
//! ```text
//!  base                 pc=100               base+200
//!   |  bp0: [A]          |  bp1: [B, A]          |
//!   +--------------------+-----------------------+
//!   |        A           |         B->A          |
//! ```
//!
//! ## Invariant
//!
//! For one unit the emitted ranges are ascending, never overlap, and cover
//! `[base, base + length)` exactly. Breakpoints that would break this
//! (pc outside the unit, or going backwards) are skipped.

use std::time::Instant;

use super::diagnostics::{add_elapsed, AgentStats};
use crate::domain::{CodeAddress, MethodId};
use crate::runtime::SymbolSource;
use crate::symbolization::SymbolResolver;

/// Call chain active from `pc` onwards, innermost method first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcFrames {
    pub pc: CodeAddress,
    pub methods: Vec<MethodId>,
}

/// One compiled-code-load notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCode {
    pub method: MethodId,
    pub address: CodeAddress,
    pub length: u64,
    /// Inline breakpoints, `None` when the unit carries no inline record
    pub inline: Option<Vec<PcFrames>>,
}

impl CompiledCode {
    /// Unit without inlining metadata
    #[must_use]
    pub fn single(method: MethodId, address: CodeAddress, length: u64) -> Self {
        Self { method, address, length, inline: None }
    }

    #[must_use]
    pub fn end(&self) -> CodeAddress {
        self.address.offset(self.length)
    }
}

/// What a span is attributed to, before any symbol lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution<'a> {
    /// The unit's own method, no chain
    Root,
    /// A breakpoint's call chain, innermost first
    Chain(&'a [MethodId]),
}

/// Address sub-range of a unit with its unresolved attribution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span<'a> {
    pub start: CodeAddress,
    pub length: u64,
    pub attribution: Attribution<'a>,
}

/// A decoded range, ready to be written as a `method_load` record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRange {
    pub start: CodeAddress,
    pub length: u64,
    pub symbol: String,
    /// Produced from an inline breakpoint chain
    pub inlined: bool,
}

fn attribution_of(previous: Option<&PcFrames>) -> Attribution<'_> {
    previous.map_or(Attribution::Root, |p| Attribution::Chain(p.methods.as_slice()))
}

/// Cut an inlined unit into attributed spans
///
/// Units without inline metadata come back as a single root span.
#[must_use]
pub fn partition(unit: &CompiledCode) -> Vec<Span<'_>> {
    let Some(frames) = unit.inline.as_deref() else {
        return vec![Span { start: unit.address, length: unit.length, attribution: Attribution::Root }];
    };

    let end = unit.end();
    let mut spans = Vec::new();
    let mut start = unit.address;
    let mut current = unit.method;
    let mut previous: Option<&PcFrames> = None;

    for breakpoint in frames {
        let Some(&top) = breakpoint.methods.first() else {
            continue;
        };
        if breakpoint.pc < start || breakpoint.pc > end {
            continue;
        }

        // Same innermost method: keep extending the pending range
        if top != current {
            if breakpoint.pc > start {
                spans.push(Span {
                    start,
                    length: breakpoint.pc.0 - start.0,
                    attribution: attribution_of(previous),
                });
            }
            start = breakpoint.pc;
            current = top;
        }
        previous = Some(breakpoint);
    }

    if start < end {
        spans.push(Span { start, length: end.0 - start.0, attribution: attribution_of(previous) });
    }

    spans
}

/// Decode `unit` and hand every resolved range to `emit`, in address order
///
/// An unresolvable root drops the whole unit. An unresolvable chain drops
/// only its own range; by then the environment is usually disposing and
/// the remaining ranges fail the same way.
pub fn decode<S: SymbolSource + ?Sized>(
    unit: &CompiledCode,
    resolver: &SymbolResolver<'_, S>,
    stats: &AgentStats,
    mut emit: impl FnMut(AddressRange),
) {
    let Some(root) = resolver.resolve(unit.method) else {
        return;
    };

    let scan_start = Instant::now();
    let spans = partition(unit);
    if unit.inline.is_some() {
        add_elapsed(&stats.scan_nanos, scan_start);
    }

    for span in spans {
        let started = Instant::now();
        match span.attribution {
            Attribution::Root => {
                AgentStats::count(&stats.single_entries);
                emit(AddressRange {
                    start: span.start,
                    length: span.length,
                    symbol: root.clone(),
                    inlined: false,
                });
                add_elapsed(&stats.single_nanos, started);
            }
            Attribution::Chain(methods) => {
                AgentStats::count(&stats.unfolded_entries);
                let Some(symbol) = resolver.resolve_chain(methods) else {
                    continue;
                };
                emit(AddressRange { start: span.start, length: span.length, symbol, inlined: true });
                add_elapsed(&stats.unfolded_nanos, started);
            }
        }
    }
}
