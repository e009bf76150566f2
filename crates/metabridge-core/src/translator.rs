//! Field-name translation between two vocabularies through their canonical identifiers.
//!
//! A record is first *expanded* (local names -> global identifiers under the source context)
//! and then *compacted* (global identifiers -> local names under the target context). Only the
//! top-level key set is rewritten; values are carried verbatim.
//!
//! Fields without a mapping are never dropped: an unmapped source name survives expansion as-is
//! and an unmapped global identifier survives compaction under that identifier.

use std::collections::BTreeMap;

use crate::error::TranslationFailure;
use crate::types::{Context, Metadata};

/// Replace each field name with its global identifier from `source`.
pub fn expand(metadata: &Metadata, source: &Context) -> Result<Metadata, TranslationFailure> {
    let mut out = Metadata::new();
    for (name, value) in metadata {
        let global = source.get(name).map(|def| def.id.as_str()).unwrap_or(name.as_str());
        if out.insert(global.to_string(), value.clone()).is_some() {
            return Err(TranslationFailure::FieldCollision(global.to_string()));
        }
    }
    Ok(out)
}

/// Replace each global identifier with its local name in `target`.
pub fn compact(expanded: &Metadata, target: &Context) -> Result<Metadata, TranslationFailure> {
    let reverse = reverse_index(target);
    let mut out = Metadata::new();
    for (global, value) in expanded {
        let local = reverse.get(global.as_str()).copied().unwrap_or(global.as_str());
        if out.insert(local.to_string(), value.clone()).is_some() {
            return Err(TranslationFailure::FieldCollision(local.to_string()));
        }
    }
    Ok(out)
}

/// Rewrite `metadata` from the `source` vocabulary into the `target` vocabulary.
pub fn translate(
    metadata: &Metadata,
    source: &Context,
    target: &Context,
) -> Result<Metadata, TranslationFailure> {
    if source == target {
        return Ok(metadata.clone());
    }
    compact(&expand(metadata, source)?, target)
}

/// Global identifier -> local name. Shared identifiers resolve to the smallest local name.
fn reverse_index(ctx: &Context) -> BTreeMap<&str, &str> {
    let mut reverse = BTreeMap::new();
    // Context iterates in key order, so the first insert is the smallest name.
    for (local, def) in ctx {
        reverse.entry(def.id.as_str()).or_insert(local.as_str());
    }
    reverse
}
