//! Aggregation and exclusion over biology containers
//!
//! The aggregator sums whatever holders the caller selects (all water cells,
//! all floating-object interiors, or both) into one summary container; it is
//! agnostic to which holders were included and never double counts on its
//! own. The excluder removes the share currently trapped inside floating
//! objects before a redistribution, clamped at zero.

use crate::biology::pool::Biology;

/// Sum a collection of containers into one, starting from a zeroed template
///
/// An empty collection yields an all-zero container of the template's shape.
pub fn aggregate<'a, B: Biology + 'a>(
    template: &B,
    holders: impl IntoIterator<Item = &'a B>,
) -> B {
    let mut summary = template.zero_like();
    for holder in holders {
        summary.merge(holder);
    }
    summary
}

/// `max(0, aggregate - trapped)` elementwise, leaving both inputs untouched
pub fn exclude<B: Biology>(aggregate: &B, trapped: &B) -> B {
    let mut freed = aggregate.clone();
    freed.exclude(trapped);
    freed
}
