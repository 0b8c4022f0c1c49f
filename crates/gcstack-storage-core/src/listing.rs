//! Prefix/delimiter listing over a bucket's flat key space.
//!
//! Keys are opaque strings; "folders" exist only as common prefixes
//! synthesized from the delimiter.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use crate::state::ObjectResource;

/// Result of listing a bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListResult {
    /// Matching objects in key order.
    pub objects: Vec<ObjectResource>,
    /// Distinct common prefixes in key order, each ending with the delimiter.
    pub prefixes: Vec<String>,
}

/// List the objects of one bucket.
///
/// Without a delimiter every object whose key starts with `prefix` is
/// returned. With one, keys containing the delimiter after the prefix are
/// folded into a common prefix ending at the first delimiter occurrence.
/// A `None` prefix behaves like `""`, and an empty delimiter like `None`.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use gcstack_storage_core::listing::list_objects;
/// use gcstack_storage_core::state::ObjectResource;
///
/// let mut objects = BTreeMap::new();
/// for key in ["a/1.txt", "a/b/2.txt", "z.txt"] {
///     objects.insert(key.to_owned(), ObjectResource::new("http://h", "b", key, None, 0));
/// }
/// let result = list_objects(&objects, Some("a/"), Some("/"));
/// assert_eq!(result.objects.len(), 1);
/// assert_eq!(result.prefixes, vec!["a/b/".to_owned()]);
/// ```
#[must_use]
pub fn list_objects(
    objects: &BTreeMap<String, ObjectResource>,
    prefix: Option<&str>,
    delimiter: Option<&str>,
) -> ListResult {
    let prefix = prefix.unwrap_or_default();
    let delimiter = delimiter.filter(|d| !d.is_empty());

    let mut result = ListResult::default();
    let mut seen_prefixes = HashSet::new();

    let candidates = objects
        .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(|(key, _)| key.starts_with(prefix));

    for (key, obj) in candidates {
        if let Some(delimiter) = delimiter {
            let after_prefix = &key[prefix.len()..];
            if let Some(pos) = after_prefix.find(delimiter) {
                let common = format!("{prefix}{}{delimiter}", &after_prefix[..pos]);
                if seen_prefixes.insert(common.clone()) {
                    result.prefixes.push(common);
                }
                continue;
            }
        }
        result.objects.push(obj.clone());
    }

    result
}
