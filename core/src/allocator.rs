//! Round-robin allocator over a pre-populated object set

use std::sync::{Mutex, PoisonError};

use crate::context::HarnessContext;
use crate::error::HarnessResult;
use crate::storage::{Bucket, ObjectRef};

/// Hands out `obj-0 .. obj-(N-1)` in cyclic order to concurrent callers
///
/// Object `i` lives in bucket `i mod B`. Only the cursor read-and-advance is
/// done under the lock.
#[derive(Debug)]
pub struct ObjectAllocator {
    buckets: Vec<Bucket>,
    population: usize,
    cursor: Mutex<usize>,
}

impl ObjectAllocator {
    /// Allocator over objects that already exist
    ///
    /// With no buckets the population is zero.
    pub fn new(buckets: Vec<Bucket>, population: usize) -> Self {
        let population = if buckets.is_empty() { 0 } else { population };
        Self {
            buckets,
            population,
            cursor: Mutex::new(0),
        }
    }

    /// Upload `count` objects, cycling through the fixture sizes, then
    /// allocate over them
    pub fn populate(
        ctx: &HarnessContext,
        buckets: Vec<Bucket>,
        count: usize,
    ) -> HarnessResult<Self> {
        let allocator = Self::new(buckets, count);
        tracing::info!(
            objects = allocator.population,
            buckets = allocator.buckets.len(),
            "Populating objects"
        );

        let fixtures = ctx.fixtures();
        for idx in 0..allocator.population {
            let bucket = &allocator.buckets[idx % allocator.buckets.len()];
            let class = fixtures.cycle(idx);
            bucket.put(ctx, &fixtures.path(class), Some(&Self::object_name(idx)))?;
            if (idx + 1) % 100 == 0 {
                tracing::debug!(created = idx + 1, "Population progress");
            }
        }

        tracing::info!(objects = allocator.population, "Population complete");
        Ok(allocator)
    }

    /// Key of the object at position `idx`
    pub fn object_name(idx: usize) -> String {
        format!("obj-{idx}")
    }

    /// Number of objects cycled over
    pub fn population(&self) -> usize {
        self.population
    }

    /// Buckets holding the population
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Next object in cyclic order, or `None` with an empty population
    pub fn allocate_next(&self) -> Option<ObjectRef> {
        if self.population == 0 {
            return None;
        }

        let idx = {
            // A panic elsewhere cannot leave the cursor half-updated
            let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
            let idx = *cursor;
            *cursor = (idx + 1) % self.population;
            idx
        };

        let bucket = self.buckets[idx % self.buckets.len()].clone();
        Some(ObjectRef::new(Self::object_name(idx)).in_bucket(bucket))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture_context, MockRunner};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn buckets(n: usize) -> Vec<Bucket> {
        (0..n).map(|i| Bucket::from_suffix("test-", &i.to_string())).collect()
    }

    #[test]
    fn test_cycles_in_order() {
        let allocator = ObjectAllocator::new(buckets(1), 3);
        let names: Vec<String> = (0..4)
            .map(|_| allocator.allocate_next().unwrap().name().to_string())
            .collect();
        assert_eq!(names, ["obj-0", "obj-1", "obj-2", "obj-0"]);
    }

    #[test]
    fn test_objects_map_to_buckets() {
        let allocator = ObjectAllocator::new(buckets(2), 4);
        let urls: Vec<String> = (0..4)
            .map(|_| allocator.allocate_next().unwrap().full_name())
            .collect();
        assert_eq!(
            urls,
            [
                "s3://test-0/obj-0",
                "s3://test-1/obj-1",
                "s3://test-0/obj-2",
                "s3://test-1/obj-3"
            ]
        );
    }

    #[test]
    fn test_empty_population() {
        assert!(ObjectAllocator::new(buckets(1), 0).allocate_next().is_none());
        let allocator = ObjectAllocator::new(Vec::new(), 10);
        assert_eq!(allocator.population(), 0);
        assert!(allocator.allocate_next().is_none());
    }

    #[test]
    fn test_concurrent_callers_see_each_slot_once() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 125;
        let population = THREADS * PER_THREAD;
        let allocator = Arc::new(ObjectAllocator::new(buckets(1), population));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let allocator = allocator.clone();
                std::thread::spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| allocator.allocate_next().unwrap().name().to_string())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen: HashMap<String, usize> = HashMap::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                *seen.entry(name).or_default() += 1;
            }
        }
        assert_eq!(seen.len(), population);
        assert!(seen.values().all(|&count| count == 1));

        // wrapped back to the start
        assert_eq!(allocator.allocate_next().unwrap().name(), "obj-0");
    }

    #[test]
    fn test_populate_uploads_each_object() {
        let (ctx, runner, _tmp) = fixture_context(MockRunner::echo());

        let allocator = ObjectAllocator::populate(&ctx, buckets(2), 5).unwrap();
        assert_eq!(allocator.population(), 5);

        let dests: Vec<String> = runner
            .seen()
            .iter()
            .map(|args| args.last().cloned().unwrap_or_default())
            .collect();
        assert_eq!(dests[0], "s3://test-0/obj-0");
        assert_eq!(dests[1], "s3://test-1/obj-1");
        assert_eq!(dests[4], "s3://test-0/obj-4");
    }
}
