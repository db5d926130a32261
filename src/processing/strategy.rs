//! Strategy orchestrators: stuffing, refine, and map-reduce.

mod map_reduce;
mod refine;
mod stuff;

use std::collections::BTreeMap;

use super::types::PartialResult;

pub use map_reduce::MapReduceStrategy;
pub use refine::RefineStrategy;
pub use stuff::StuffingStrategy;

/// Concatenate partial summaries in ascending chunk index, separated by newlines.
///
/// The input order is irrelevant: any permutation of the same partial results yields a
/// byte-identical context.
pub fn aggregate_context<I>(partials: I) -> String
where
    I: IntoIterator<Item = PartialResult>,
{
    let ordered: BTreeMap<usize, String> = partials
        .into_iter()
        .map(|partial| (partial.index, partial.summary))
        .collect();
    ordered.into_values().collect::<Vec<_>>().join("\n")
}
