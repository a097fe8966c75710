//! End-to-end: a producer thread appends frames while a provider adopts and
//! samples them through a block loader.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use glam::{IVec3, Vec3};
use tracing_subscriber::EnvFilter;

use event_volume::{Aabb, BlockLoader, Event, EventStore, FrameRange, NodeId, VolumeConfig, VolumeProvider};

const FRAMES: u32 = 6;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_test_writer()
    .try_init();
}

/// One event per frame, marching along the x axis.
fn frame_events(frame: u32) -> Vec<Event> {
  vec![Event::at(1.0 + 4.0 * frame as f32, 16.0, 16.0, 10.0)]
}

#[test]
fn test_live_frames_are_adopted_and_sampled() {
  init_tracing();

  let store = EventStore::from_events(frame_events(0)).with_bounds(Aabb::new(Vec3::ZERO, Vec3::splat(32.0)));
  let writer = store.writer();
  let config = VolumeConfig::parse("fivoxtest://?functor=frequency&resolution=1&maxBlockSize=4096&showProgress");
  let provider: VolumeProvider = VolumeProvider::new(&config, Box::new(store)).unwrap();
  assert_eq!(provider.info().frame_range, FrameRange::new(0, 1));

  let producer = thread::spawn(move || {
    for frame in 1..FRAMES {
      writer.push_frame(frame_events(frame));
      thread::sleep(Duration::from_millis(2));
    }
  });
  producer.join().unwrap();

  assert!(provider.update());
  assert_eq!(provider.info().frame_range, FrameRange::new(0, FRAMES));

  let loader = BlockLoader::new(Arc::new(provider));
  for frame in 0..FRAMES {
    assert!(loader.request(NodeId::root(frame)));
  }

  let mut seen = Vec::new();
  while seen.len() < FRAMES as usize {
    let done = loader.wait(Duration::from_secs(10)).expect("block timed out");
    let block = done.block.expect("frame has data");

    // Root spacing is 4: the event of frame f lands in voxel x = f.
    let x = done.node.frame;
    assert_eq!(block.get(x, 4, 4), Some(255), "frame {}", done.node.frame);
    assert_eq!(block.data().iter().filter(|&&v| v != 0).count(), 1);
    seen.push(done.node.frame);
  }

  seen.sort_unstable();
  assert_eq!(seen, (0..FRAMES).collect::<Vec<_>>());
  assert_eq!(loader.pending_count(), 0);
}

#[test]
fn test_leaf_blocks_tile_the_root() {
  init_tracing();

  let store = EventStore::from_events(vec![Event::at(20.0, 4.0, 28.0, 5.0)])
    .with_bounds(Aabb::new(Vec3::ZERO, Vec3::splat(32.0)));
  let config = VolumeConfig::parse("fivoxtest://?functor=density&resolution=1&maxBlockSize=4096");
  let provider: VolumeProvider = VolumeProvider::new(&config, Box::new(store)).unwrap();

  let info = provider.info();
  let leaf_level = info.levels - 1;
  let blocks = info.blocks_at_level(leaf_level) as i32;

  let mut hits = Vec::new();
  for z in 0..blocks {
    for y in 0..blocks {
      for x in 0..blocks {
        let node = NodeId::new(leaf_level, IVec3::new(x, y, z), 0);
        let block = provider.sample(node).unwrap();
        if block.data().iter().any(|&v| v != 0) {
          hits.push(node.position);
        }
      }
    }
  }

  // 8^3 leaves over 32 units: (20, 4, 28) falls in block (2, 0, 3).
  assert_eq!(hits, vec![IVec3::new(2, 0, 3)]);
}
