//! Volume type to event-source factory mapping.
//!
//! Format-specific loaders (compartment reports, spike files, synapse
//! tables) live outside this crate and register themselves here. Only the
//! synthetic test source is built in.

use std::collections::HashMap;

use tracing::info;

use super::{test_source, EventSource};
use crate::config::{VolumeConfig, VolumeType};
use crate::error::{Error, Result};

/// Builds an event source from a resolved configuration.
pub type LoaderFn = fn(&VolumeConfig) -> Result<Box<dyn EventSource>>;

/// Registered loaders, keyed by volume type.
#[derive(Clone)]
pub struct LoaderRegistry {
  loaders: HashMap<VolumeType, LoaderFn>,
}

impl LoaderRegistry {
  /// Registry with only the built-in test source.
  pub fn new() -> Self {
    let mut registry = Self::empty();
    registry.register(VolumeType::Test, test_source::load);
    registry
  }

  /// Registry with nothing registered.
  pub fn empty() -> Self {
    Self {
      loaders: HashMap::new(),
    }
  }

  /// Register `loader` for `volume`, replacing any previous one.
  pub fn register(&mut self, volume: VolumeType, loader: LoaderFn) -> &mut Self {
    self.loaders.insert(volume, loader);
    self
  }

  pub fn has_loader(&self, volume: VolumeType) -> bool {
    self.loaders.contains_key(&volume)
  }

  /// Build the event source `config` asks for.
  pub fn load(&self, config: &VolumeConfig) -> Result<Box<dyn EventSource>> {
    let volume = config.volume_type();
    if volume == VolumeType::Unknown {
      return Err(Error::UnknownScheme(config.uri().scheme().to_owned()));
    }

    let loader = self.loaders.get(&volume).ok_or(Error::MissingLoader(volume))?;

    info!("Loading events...");
    let source = loader(config)?;
    info!(
      "{} {config}, dt = {} ready to voxelize",
      source.description(),
      source.dt()
    );
    Ok(source)
  }
}

impl Default for LoaderRegistry {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::source::EventStore;
  use crate::types::Event;

  fn single_event(_: &VolumeConfig) -> Result<Box<dyn EventSource>> {
    Ok(Box::new(EventStore::from_events(vec![Event::at(1.0, 2.0, 3.0, 4.0)])))
  }

  #[test]
  fn test_builtin_test_loader() {
    let registry = LoaderRegistry::new();
    assert!(registry.has_loader(VolumeType::Test));
    let source = registry.load(&VolumeConfig::parse("fivoxtest://")).unwrap();
    assert!(source.num_events() > 0);
  }

  #[test]
  fn test_missing_loader() {
    let registry = LoaderRegistry::new();
    let result = registry.load(&VolumeConfig::parse("fivoxspikes:///BlueConfig"));
    assert!(matches!(result, Err(Error::MissingLoader(VolumeType::Spikes))));
  }

  #[test]
  fn test_unknown_scheme() {
    let result = LoaderRegistry::new().load(&VolumeConfig::parse("http://example"));
    assert!(matches!(result, Err(Error::UnknownScheme(ref s)) if s == "http"));
  }

  #[test]
  fn test_register_external_loader() {
    let mut registry = LoaderRegistry::empty();
    assert!(!registry.has_loader(VolumeType::Test));

    registry.register(VolumeType::Synapses, single_event);
    let source = registry.load(&VolumeConfig::parse("fivoxsynapses://")).unwrap();
    assert_eq!(source.num_events(), 1);
  }
}
