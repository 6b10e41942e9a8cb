//! # Queries
//!
//! Filter trees ([`FilterNode`]), the feature type unprefixing applied before a
//! filter reaches a backing store, and in-memory evaluation of filters.

mod filter;
pub use filter::*;

mod unprefix;
pub use unprefix::*;

mod eval;

use log::{debug, trace};

use crate::{provider, rw, types};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("read error :: {0}")]
    ReadError(#[from] rw::Error),
}

/// Runs `filter` against the features of `provider`.
///
/// The filter is first rewritten for `feature_type` so that property
/// references qualified with the type prefix reach the store as bare names.
/// No filter means every feature.
pub fn query_features(
    provider: &dyn provider::Provider,
    feature_type: &types::QualifiedName,
    filter: Option<&FilterNode>,
) -> Result<Vec<types::Feature>, Error> {
    let rewritten = filter.map(|f| rewrite_filter_for_feature_type(f, feature_type));

    trace!("query filter for `{}`: {:?}", feature_type, rewritten);

    let features = provider.features(rewritten.as_ref())?;

    debug!(
        "query on provider `{}` returned {} features",
        provider.id(),
        features.len()
    );

    Ok(features)
}
