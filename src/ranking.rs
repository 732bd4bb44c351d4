use crate::aggregate::group_sum;
use crate::filter::in_range;
use crate::models::TopEntry;
use crate::store::Observation;
use crate::window::TimeWindow;

/// Ranks `observations` inside `window` by summed count per `label_fn`,
/// largest first, keeping at most `n` entries.
///
/// Equal totals are ordered by label so repeated calls return identical
/// output; callers should not rely on tie order beyond that.
pub fn top_n<'a, I, F>(observations: I, window: &TimeWindow, n: usize, label_fn: F) -> Vec<TopEntry>
where
    I: IntoIterator<Item = Observation<'a>>,
    F: FnMut(&Observation<'a>) -> String,
{
    let totals = group_sum(
        observations
            .into_iter()
            .filter(|obs| in_range(obs.point, window)),
        label_fn,
        |obs| obs.point.count,
    );

    let mut entries: Vec<TopEntry> = totals
        .into_iter()
        .map(|(label, value)| TopEntry { label, value })
        .collect();
    entries.sort_by(|a, b| {
        b.value
            .total_cmp(&a.value)
            .then_with(|| a.label.cmp(&b.label))
    });
    entries.truncate(n);
    entries
}
