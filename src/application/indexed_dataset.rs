// Faceted in-memory index: dimensions, filters and incrementally reduced groups
use crate::domain::key::Key;
use crate::error::DashboardError;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeSet;
use std::marker::PhantomData;

/// One filter bit per dimension in each record's mask.
pub const MAX_DIMENSIONS: usize = 64;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Exact { key: Key },
    /// Half-open: `from <= key < to`.
    Range { from: Key, to: Key },
    In { keys: BTreeSet<Key> },
}

impl Filter {
    pub fn accepts(&self, key: &Key) -> bool {
        match self {
            Filter::All => true,
            Filter::Exact { key: k } => key == k,
            Filter::Range { from, to } => from <= key && key < to,
            Filter::In { keys } => keys.contains(key),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }
}

/// Incremental reduction of the records entering and leaving a group bucket.
pub trait Reducer<R>: Send + Sync + 'static {
    type Value: Send + Sync + 'static;

    fn initial(&self) -> Self::Value;
    fn add(&self, value: &mut Self::Value, row: usize, record: &R);
    fn remove(&self, value: &mut Self::Value, row: usize, record: &R);

    /// Runs once for every bucket touched by a batch of adds and removes,
    /// after the whole batch has been applied.
    fn finish(&self, _value: &mut Self::Value) {}
}

/// Sums a numeric projection. NaN inputs poison the bucket.
pub struct SumReducer<F> {
    project: F,
}

impl<F> SumReducer<F> {
    pub fn new(project: F) -> Self {
        Self { project }
    }
}

impl<R, F> Reducer<R> for SumReducer<F>
where
    F: Fn(&R) -> f64 + Send + Sync + 'static,
{
    type Value = f64;

    fn initial(&self) -> f64 {
        0.0
    }

    fn add(&self, value: &mut f64, _row: usize, record: &R) {
        *value += (self.project)(record);
    }

    fn remove(&self, value: &mut f64, _row: usize, record: &R) {
        *value -= (self.project)(record);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionId(usize);

/// Typed handle to a group; reading through it recovers the reducer's value type.
pub struct GroupHandle<Red> {
    id: usize,
    _reducer: PhantomData<fn() -> Red>,
}

impl<Red> Clone for GroupHandle<Red> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<Red> Copy for GroupHandle<Red> {}

impl<Red> std::fmt::Debug for GroupHandle<Red> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupHandle({})", self.id)
    }
}

struct Dimension {
    keys: Vec<Key>,
    /// Row indices sorted by key, ties in row order.
    order: Vec<usize>,
    filter: Filter,
}

trait GroupIndex<R>: Send + Sync {
    fn dimension(&self) -> usize;
    fn add(&mut self, row: usize, record: &R);
    fn remove(&mut self, row: usize, record: &R);
    /// Settle every bucket touched since the last flush.
    fn flush(&mut self);
    fn as_any(&self) -> &dyn Any;
}

struct ReducedGroup<R, Red: Reducer<R>> {
    dimension: usize,
    /// Distinct group keys, ascending; `values[i]` belongs to `keys[i]`.
    keys: Vec<Key>,
    row_buckets: Vec<usize>,
    reducer: Red,
    values: Vec<Red::Value>,
    dirty: BTreeSet<usize>,
    _record: PhantomData<fn(&R)>,
}

impl<R: 'static, Red: Reducer<R>> GroupIndex<R> for ReducedGroup<R, Red> {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn add(&mut self, row: usize, record: &R) {
        let bucket = self.row_buckets[row];
        self.reducer.add(&mut self.values[bucket], row, record);
        self.dirty.insert(bucket);
    }

    fn remove(&mut self, row: usize, record: &R) {
        let bucket = self.row_buckets[row];
        self.reducer.remove(&mut self.values[bucket], row, record);
        self.dirty.insert(bucket);
    }

    fn flush(&mut self) {
        for bucket in std::mem::take(&mut self.dirty) {
            self.reducer.finish(&mut self.values[bucket]);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A record set with any number of filterable dimensions and reduced groups.
///
/// A record is active when it passes every dimension's filter. Groups see
/// every filter except the one on their own dimension, so a chart that
/// filters a dimension keeps showing the buckets it filtered away.
pub struct IndexedDataset<R> {
    records: Vec<R>,
    masks: Vec<u64>,
    dimensions: Vec<Dimension>,
    groups: Vec<Box<dyn GroupIndex<R>>>,
}

impl<R: Send + Sync + 'static> IndexedDataset<R> {
    pub fn new(records: Vec<R>) -> Self {
        let masks = vec![0; records.len()];
        Self {
            records,
            masks,
            dimensions: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn dimension(
        &mut self,
        key_of: impl Fn(&R) -> Key,
    ) -> Result<DimensionId, DashboardError> {
        if self.dimensions.len() >= MAX_DIMENSIONS {
            return Err(DashboardError::TooManyDimensions(MAX_DIMENSIONS));
        }

        let keys: Vec<Key> = self.records.iter().map(key_of).collect();
        let mut order: Vec<usize> = (0..keys.len()).collect();
        order.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

        self.dimensions.push(Dimension {
            keys,
            order,
            filter: Filter::All,
        });
        Ok(DimensionId(self.dimensions.len() - 1))
    }

    /// Group `dimension`'s records by `group_key(dimension key)` and reduce
    /// each bucket. Buckets exist for every key in the dataset, filtered or not.
    pub fn group<Red: Reducer<R>>(
        &mut self,
        dimension: DimensionId,
        group_key: impl Fn(&Key) -> Key,
        reducer: Red,
    ) -> Result<GroupHandle<Red>, DashboardError> {
        let dim = self.dimension_ref(dimension)?;
        let row_keys: Vec<Key> = dim.keys.iter().map(group_key).collect();
        let keys: Vec<Key> = row_keys
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let row_buckets = row_keys
            .iter()
            .map(|key| keys.partition_point(|k| k < key))
            .collect();
        let values = keys.iter().map(|_| reducer.initial()).collect();

        let mut group = ReducedGroup {
            dimension: dimension.0,
            keys,
            row_buckets,
            reducer,
            values,
            dirty: BTreeSet::new(),
            _record: PhantomData,
        };
        let own_bit = 1u64 << dimension.0;
        for (row, record) in self.records.iter().enumerate() {
            if self.masks[row] & !own_bit == 0 {
                group.add(row, record);
            }
        }
        group.flush();

        self.groups.push(Box::new(group));
        Ok(GroupHandle {
            id: self.groups.len() - 1,
            _reducer: PhantomData,
        })
    }

    /// Replace the filter on one dimension and push the membership delta
    /// through every group.
    pub fn filter(&mut self, dimension: DimensionId, filter: Filter) -> Result<(), DashboardError> {
        let bit = 1u64 << dimension.0;
        let dim = self.dimension_ref(dimension)?;

        let changes: Vec<(usize, u64, u64)> = dim
            .keys
            .iter()
            .enumerate()
            .filter_map(|(row, key)| {
                let old = self.masks[row];
                let new = if filter.accepts(key) { old & !bit } else { old | bit };
                (old != new).then_some((row, old, new))
            })
            .collect();

        for group in self.groups.iter_mut() {
            let others = !(1u64 << group.dimension());
            for &(row, old, new) in &changes {
                if old & others == 0 && new & others != 0 {
                    group.remove(row, &self.records[row]);
                }
            }
            for &(row, old, new) in &changes {
                if old & others != 0 && new & others == 0 {
                    group.add(row, &self.records[row]);
                }
            }
            group.flush();
        }

        for &(row, _, new) in &changes {
            self.masks[row] = new;
        }
        self.dimensions[dimension.0].filter = filter;

        tracing::debug!(
            dimension = dimension.0,
            changed = changes.len(),
            active = self.active_count(),
            "dimension filter applied"
        );
        Ok(())
    }

    pub fn filter_all(&mut self) -> Result<(), DashboardError> {
        for index in 0..self.dimensions.len() {
            if !self.dimensions[index].filter.is_all() {
                self.filter(DimensionId(index), Filter::All)?;
            }
        }
        Ok(())
    }

    pub fn current_filter(&self, dimension: DimensionId) -> Result<&Filter, DashboardError> {
        Ok(&self.dimension_ref(dimension)?.filter)
    }

    #[cfg(test)]
    pub fn is_active(&self, row: usize) -> bool {
        self.masks.get(row).is_some_and(|&m| m == 0)
    }

    pub fn active_count(&self) -> usize {
        self.masks.iter().filter(|&&m| m == 0).count()
    }

    /// Every record passing all filters, in dataset order.
    pub fn active_records(&self) -> Vec<&R> {
        self.records
            .iter()
            .zip(&self.masks)
            .filter(|(_, m)| **m == 0)
            .map(|(r, _)| r)
            .collect()
    }

    /// Up to `n` active records with the greatest keys, descending.
    pub fn top(&self, dimension: DimensionId, n: usize) -> Result<Vec<&R>, DashboardError> {
        let dim = self.dimension_ref(dimension)?;
        Ok(dim
            .order
            .iter()
            .rev()
            .filter(|&&row| self.masks[row] == 0)
            .take(n)
            .map(|&row| &self.records[row])
            .collect())
    }

    /// Up to `n` active records with the smallest keys, ascending.
    pub fn bottom(&self, dimension: DimensionId, n: usize) -> Result<Vec<&R>, DashboardError> {
        let dim = self.dimension_ref(dimension)?;
        Ok(dim
            .order
            .iter()
            .filter(|&&row| self.masks[row] == 0)
            .take(n)
            .map(|&row| &self.records[row])
            .collect())
    }

    /// All buckets of a group in key order.
    pub fn group_all<Red: Reducer<R>>(
        &self,
        handle: &GroupHandle<Red>,
    ) -> Result<Vec<(&Key, &Red::Value)>, DashboardError> {
        let group = self.reduced(handle)?;
        Ok(group.keys.iter().zip(&group.values).collect())
    }

    pub fn group_value<Red: Reducer<R>>(
        &self,
        handle: &GroupHandle<Red>,
        key: &Key,
    ) -> Result<Option<&Red::Value>, DashboardError> {
        let group = self.reduced(handle)?;
        Ok(group.keys.binary_search(key).ok().map(|i| &group.values[i]))
    }

    fn reduced<Red: Reducer<R>>(
        &self,
        handle: &GroupHandle<Red>,
    ) -> Result<&ReducedGroup<R, Red>, DashboardError> {
        self.groups
            .get(handle.id)
            .and_then(|g| g.as_any().downcast_ref::<ReducedGroup<R, Red>>())
            .ok_or(DashboardError::GroupMismatch(handle.id))
    }

    fn dimension_ref(&self, dimension: DimensionId) -> Result<&Dimension, DashboardError> {
        self.dimensions
            .get(dimension.0)
            .ok_or(DashboardError::UnknownDimension(dimension.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct CountReducer;

    impl<R> Reducer<R> for CountReducer {
        type Value = usize;

        fn initial(&self) -> usize {
            0
        }

        fn add(&self, value: &mut usize, _row: usize, _record: &R) {
            *value += 1;
        }

        fn remove(&self, value: &mut usize, _row: usize, _record: &R) {
            *value = value.saturating_sub(1);
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Tally {
        members: usize,
        settled: usize,
    }

    /// Counts members and how often each bucket was settled.
    struct TallyReducer;

    impl<R> Reducer<R> for TallyReducer {
        type Value = Tally;

        fn initial(&self) -> Tally {
            Tally::default()
        }

        fn add(&self, value: &mut Tally, _row: usize, _record: &R) {
            value.members += 1;
        }

        fn remove(&self, value: &mut Tally, _row: usize, _record: &R) {
            value.members -= 1;
        }

        fn finish(&self, value: &mut Tally) {
            value.settled += 1;
        }
    }

    #[derive(Debug, PartialEq)]
    struct Row {
        name: &'static str,
        color: &'static str,
        size: i64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row { name: "a", color: "red", size: 1 },
            Row { name: "b", color: "red", size: 2 },
            Row { name: "c", color: "blue", size: 3 },
            Row { name: "d", color: "blue", size: 4 },
            Row { name: "e", color: "green", size: 5 },
            Row { name: "f", color: "red", size: 6 },
        ]
    }

    fn identity(key: &Key) -> Key {
        key.clone()
    }

    // Sizes are single digits, so text order is numeric order.
    fn size_key(size: i64) -> Key {
        Key::text(size.to_string())
    }

    fn counts(ds: &IndexedDataset<Row>, group: &GroupHandle<CountReducer>) -> Vec<(String, usize)> {
        ds.group_all(group)
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect()
    }

    #[test]
    fn test_group_counts_without_filters() {
        let mut ds = IndexedDataset::new(rows());
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();
        let by_color = ds.group(color, identity, CountReducer).unwrap();

        assert_eq!(
            counts(&ds, &by_color),
            vec![
                ("blue".to_string(), 2),
                ("green".to_string(), 1),
                ("red".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_group_ignores_its_own_dimension_filter() {
        let mut ds = IndexedDataset::new(rows());
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();
        let by_color = ds.group(color, identity, CountReducer).unwrap();

        ds.filter(color, Filter::Exact { key: Key::text("red") }).unwrap();

        assert_eq!(ds.active_count(), 3);
        assert_eq!(ds.group_value(&by_color, &Key::text("blue")).unwrap(), Some(&2));
    }

    #[test]
    fn test_filters_are_a_conjunction_regardless_of_order() {
        let apply = |color_first: bool| {
            let mut ds = IndexedDataset::new(rows());
            let color = ds.dimension(|r| Key::text(r.color)).unwrap();
            let size = ds.dimension(|r| size_key(r.size)).unwrap();
            let name = ds.dimension(|r| Key::text(r.name)).unwrap();
            let by_name = ds.group(name, identity, CountReducer).unwrap();

            let color_filter = Filter::Exact { key: Key::text("red") };
            let size_filter = Filter::Range {
                from: size_key(2),
                to: size_key(7),
            };
            if color_first {
                ds.filter(color, color_filter).unwrap();
                ds.filter(size, size_filter).unwrap();
            } else {
                ds.filter(size, size_filter).unwrap();
                ds.filter(color, color_filter).unwrap();
            }
            counts(&ds, &by_name)
        };

        let expected: Vec<(String, usize)> = ["a", "b", "c", "d", "e", "f"]
            .iter()
            .map(|n| (n.to_string(), usize::from(*n == "b" || *n == "f")))
            .collect();
        assert_eq!(apply(true), expected);
        assert_eq!(apply(false), expected);
    }

    #[test]
    fn test_refiltering_same_dimension_does_not_double_count() {
        let mut ds = IndexedDataset::new(rows());
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();
        let size = ds.dimension(|r| size_key(r.size)).unwrap();
        let total = ds.group(color, |_| Key::text("all"), CountReducer).unwrap();

        ds.filter(size, Filter::Range { from: size_key(1), to: size_key(4) }).unwrap();
        ds.filter(size, Filter::Range { from: size_key(2), to: size_key(6) }).unwrap();
        ds.filter(size, Filter::Range { from: size_key(2), to: size_key(6) }).unwrap();
        assert_eq!(ds.group_value(&total, &Key::text("all")).unwrap(), Some(&4));

        ds.filter_all().unwrap();
        assert_eq!(ds.group_value(&total, &Key::text("all")).unwrap(), Some(&6));
        assert_eq!(ds.active_count(), 6);
    }

    #[test]
    fn test_set_filter() {
        let mut ds = IndexedDataset::new(rows());
        let name = ds.dimension(|r| Key::text(r.name)).unwrap();
        let keys = [Key::text("a"), Key::text("e")].into_iter().collect();
        ds.filter(name, Filter::In { keys }).unwrap();

        let names: Vec<&str> = ds.active_records().iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["a", "e"]);
    }

    #[test]
    fn test_top_and_bottom_honor_filters() {
        let mut ds = IndexedDataset::new(rows());
        let size = ds.dimension(|r| size_key(r.size)).unwrap();
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();

        assert_eq!(ds.top(size, 1).unwrap()[0].name, "f");
        assert_eq!(ds.bottom(size, 1).unwrap()[0].name, "a");

        ds.filter(color, Filter::Exact { key: Key::text("blue") }).unwrap();
        let top: Vec<&str> = ds.top(size, usize::MAX).unwrap().iter().map(|r| r.name).collect();
        assert_eq!(top, vec!["d", "c"]);
        assert_eq!(ds.bottom(size, 1).unwrap()[0].name, "c");
    }

    #[test]
    fn test_sum_reducer_tracks_filter_changes() {
        let mut ds = IndexedDataset::new(rows());
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();
        let size = ds.dimension(|r| size_key(r.size)).unwrap();
        let sizes = ds
            .group(color, identity, SumReducer::new(|r: &Row| r.size as f64))
            .unwrap();

        assert_eq!(ds.group_value(&sizes, &Key::text("red")).unwrap(), Some(&9.0));
        ds.filter(size, Filter::Range { from: size_key(2), to: size_key(9) }).unwrap();
        assert_eq!(ds.group_value(&sizes, &Key::text("red")).unwrap(), Some(&8.0));
    }

    #[test]
    fn test_dimension_limit() {
        let mut ds = IndexedDataset::new(rows());
        for _ in 0..MAX_DIMENSIONS {
            ds.dimension(|r| size_key(r.size)).unwrap();
        }
        assert_eq!(
            ds.dimension(|r| size_key(r.size)).unwrap_err(),
            DashboardError::TooManyDimensions(MAX_DIMENSIONS)
        );
    }

    #[test]
    fn test_group_handle_type_is_checked() {
        let mut ds = IndexedDataset::new(rows());
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();
        let count = ds.group(color, identity, CountReducer).unwrap();
        let forged: GroupHandle<SumReducer<fn(&Row) -> f64>> = GroupHandle {
            id: count.id,
            _reducer: PhantomData,
        };
        assert_eq!(
            ds.group_all(&forged).unwrap_err(),
            DashboardError::GroupMismatch(count.id)
        );
    }

    #[test]
    fn test_touched_buckets_settle_once_per_filter_change() {
        let mut ds = IndexedDataset::new(rows());
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();
        let size = ds.dimension(|r| size_key(r.size)).unwrap();
        let tally = ds.group(color, identity, TallyReducer).unwrap();

        let settled = |ds: &IndexedDataset<Row>| -> Vec<(usize, usize)> {
            ds.group_all(&tally)
                .unwrap()
                .into_iter()
                .map(|(_, t)| (t.members, t.settled))
                .collect()
        };
        // blue, green, red
        assert_eq!(settled(&ds), vec![(2, 1), (1, 1), (3, 1)]);

        // Drops a and b, both red.
        ds.filter(size, Filter::Range { from: size_key(3), to: size_key(9) }).unwrap();
        assert_eq!(settled(&ds), vec![(2, 1), (1, 1), (1, 2)]);

        ds.filter_all().unwrap();
        assert_eq!(settled(&ds), vec![(2, 1), (1, 1), (3, 3)]);
    }

    #[test]
    fn test_missing_group_key_reads_as_none() {
        let mut ds = IndexedDataset::new(rows());
        let color = ds.dimension(|r| Key::text(r.color)).unwrap();
        let by_color = ds.group(color, identity, CountReducer).unwrap();
        assert_eq!(ds.group_value(&by_color, &Key::text("purple")).unwrap(), None);
    }
}
