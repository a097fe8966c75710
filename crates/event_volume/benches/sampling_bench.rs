//! Block sampling benchmarks.
//!
//! Measures the two hot paths of a provider:
//! - **grid_query**: voxel-sized region queries against one frame's index
//! - **materialize**: full block evaluation per functor, including rayon
//!   scheduling and normalization

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use glam::{UVec3, Vec3};
use rand::{rngs::StdRng, Rng, SeedableRng};

use event_volume::{
  provider::{BlockRegion, SamplingPipeline},
  source::GridIndex,
  Aabb, Event, EventFunctor, EventStore, FunctorType, InputRange,
};

const EXTENT: f32 = 256.0;
const BLOCK: u32 = 32;

// =============================================================================
// Workloads
// =============================================================================

/// Uniformly scattered events in a cube of side `EXTENT`.
fn scattered_events(count: usize, seed: u64) -> Vec<Event> {
  let mut rng = StdRng::seed_from_u64(seed);
  (0..count)
    .map(|_| {
      Event::at(
        rng.random_range(0.0..EXTENT),
        rng.random_range(0.0..EXTENT),
        rng.random_range(0.0..EXTENT),
        rng.random_range(-80.0..0.0),
      )
    })
    .collect()
}

/// One 32^3 block spanning the whole cube.
fn full_block() -> BlockRegion {
  let spacing = EXTENT / BLOCK as f32;
  BlockRegion {
    dims: UVec3::splat(BLOCK),
    origin: Vec3::splat(spacing * 0.5),
    spacing: Vec3::splat(spacing),
  }
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_grid_query(c: &mut Criterion) {
  let mut group = c.benchmark_group("grid_query");

  for count in [10_000usize, 100_000, 1_000_000] {
    let index = GridIndex::build(scattered_events(count, 7));
    let mut rng = StdRng::seed_from_u64(11);
    let centers: Vec<Vec3> = (0..1024)
      .map(|_| Vec3::new(rng.random_range(0.0..EXTENT), rng.random_range(0.0..EXTENT), rng.random_range(0.0..EXTENT)))
      .collect();

    group.throughput(Throughput::Elements(centers.len() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(count), &centers, |b, centers| {
      b.iter(|| {
        let mut hits = 0usize;
        for &center in centers {
          let region = Aabb::from_center_half_extents(center, Vec3::splat(4.0));
          index.for_each_in(&region, |_| hits += 1);
        }
        black_box(hits)
      })
    });
  }

  group.finish();
}

fn bench_materialize(c: &mut Criterion) {
  let mut group = c.benchmark_group("materialize_32");
  group.throughput(Throughput::Elements((BLOCK * BLOCK * BLOCK) as u64));
  group.sample_size(20);

  let events = scattered_events(200_000, 3);
  let region = full_block();

  for kind in FunctorType::ALL {
    let source = Box::new(EventStore::from_events(events.clone()));
    let functor = EventFunctor::new(kind, InputRange::new(-80.0, 0.0));
    let mut pipeline = SamplingPipeline::<f32>::new(source, functor);

    group.bench_function(kind.name(), |b| {
      b.iter(|| {
        let data = pipeline.materialize(0, &region).map(|data| data[0]);
        black_box(data.ok())
      })
    });
  }

  group.finish();
}

criterion_group!(benches, bench_grid_query, bench_materialize);
criterion_main!(benches);
