//! Class descriptor normalization
//!
//! `Ljava/util/HashMap$Node;` → `java.util.HashMap$Node`

/// Convert an internal class descriptor to dotted form
///
/// Strips one leading `L` type tag, cuts at the first `;` terminator and
/// turns path separators into dots. Array and primitive descriptors pass
/// through apart from the separator rewrite.
#[must_use]
pub fn class_name_from_descriptor(descriptor: &str) -> String {
    let body = descriptor.strip_prefix('L').unwrap_or(descriptor);
    let body = body.split_once(';').map_or(body, |(name, _)| name);
    body.replace('/', ".")
}

/// `Class.method` as written in the events file
#[must_use]
pub fn qualified_method_name(class_descriptor: &str, method_name: &str) -> String {
    format!("{}.{method_name}", class_name_from_descriptor(class_descriptor))
}
