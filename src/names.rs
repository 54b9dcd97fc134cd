//! Class-name canonicalization and JVM signature handling.
//!
//! Callers hand class names over in whatever form their source material
//! uses: `android.app.Activity`, `android/app/Activity`,
//! `android.Manifest$permission`, even `android.Manifest.permission`.
//! Every public lookup funnels through [`canonicalize`] so the rest of the
//! crate only ever sees slash package separators and `$` nesting.

use std::collections::HashMap;

use crate::model::ApiClass;

/// Normalize package separators to `/`, keeping `$` nesting intact.
///
/// Dot-form nesting (`java.util.Map.Entry`) cannot be distinguished from a
/// package at this point; [`resolve`] retries trailing-segment `$`
/// substitutions against the class map to cover that form.
pub fn canonicalize(name: &str) -> String {
    name.replace('.', "/")
}

/// Look up a class by any accepted name form.
pub fn resolve<'a>(classes: &'a HashMap<String, ApiClass>, name: &str) -> Option<&'a ApiClass> {
    let canonical = canonicalize(name);
    if let Some(class) = classes.get(&canonical) {
        return Some(class);
    }

    // The name may use dots for nesting: retry with trailing separators
    // flipped to `$`, innermost first.
    let mut candidate = canonical;
    while let Some(last_slash) = candidate.rfind('/') {
        candidate.replace_range(last_slash..=last_slash, "$");
        if let Some(class) = classes.get(&candidate) {
            return Some(class);
        }
    }
    None
}

/// Build the overload key for a method table: `name(args)`.
///
/// The JVM return type is stripped, since Java overloads cannot differ by
/// return type alone. The descriptor is accepted with or without the return
/// type, and with either separator style inside argument class names
/// (`.` never appears in a well-formed descriptor, so the rewrite is safe).
pub fn method_key(name: &str, descriptor: &str) -> String {
    let descriptor = canonicalize(descriptor);
    let args = match descriptor.find(')') {
        Some(close) => &descriptor[..=close],
        None => descriptor.as_str(),
    };
    format!("{}{}", name, args)
}

/// Split a combined JVM member signature (`name(args)ret`) into the method
/// name and its descriptor. Signatures without a parameter list are fields.
pub fn split_signature(signature: &str) -> (&str, Option<&str>) {
    match signature.find('(') {
        Some(open) => (&signature[..open], Some(&signature[open..])),
        None => (signature, None),
    }
}
