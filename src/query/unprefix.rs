use log::trace;

use super::FilterNode;
use crate::types::QualifiedName;

/// Rewrites `tree` so that property references qualified with the feature
/// type prefix (`{namespace}local`, or `local` without namespace) are
/// reduced to the remainder of their path.
///
/// The match is an exact, case sensitive string prefix. References that do
/// not start with the prefix, and every other node, are copied unchanged. The
/// input tree is never modified.
pub fn rewrite_filter_for_feature_type(
    tree: &FilterNode,
    feature_type: &QualifiedName,
) -> FilterNode {
    let prefix = feature_type.prefix();

    tree.map_references(&|path: &str| {
        path.strip_prefix(prefix.as_str()).map(|rest| {
            trace!("unprefixing property `{}` into `{}`", path, rest);
            rest.to_owned()
        })
    })
}
