//! Minimal `scheme://path?key=value&flag` parser.

use std::borrow::Cow;
use std::fmt;

/// A parsed volume URI.
///
/// Query keys and values are percent-decoded. Repeated keys are kept in
/// order; lookups return the last occurrence.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VolumeUri {
  scheme: String,
  path: String,
  query: Vec<(String, String)>,
}

impl VolumeUri {
  /// Parse `uri`. Never fails: anything without `://` has an empty scheme
  /// and is taken as a path.
  pub fn parse(uri: &str) -> Self {
    let uri = uri.trim();
    let uri = uri.split_once('#').map_or(uri, |(head, _)| head);

    let (scheme, rest) = match uri.split_once("://") {
      Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest),
      None => (String::new(), uri),
    };

    let (path, query) = match rest.split_once('?') {
      Some((path, query)) => (path, query),
      None => (rest, ""),
    };

    let query = query
      .split('&')
      .filter(|pair| !pair.is_empty())
      .map(|pair| match pair.split_once('=') {
        Some((key, value)) => (decode(key), decode(value)),
        None => (decode(pair), String::new()),
      })
      .collect();

    Self {
      scheme,
      path: decode(path),
      query,
    }
  }

  pub fn scheme(&self) -> &str {
    &self.scheme
  }

  pub fn path(&self) -> &str {
    &self.path
  }

  /// Value of `key`, `Some("")` for a bare flag, `None` when absent.
  pub fn get(&self, key: &str) -> Option<&str> {
    self
      .query
      .iter()
      .rev()
      .find(|(k, _)| k == key)
      .map(|(_, v)| v.as_str())
  }

  pub fn contains_key(&self, key: &str) -> bool {
    self.query.iter().any(|(k, _)| k == key)
  }

  /// All query pairs in their original order.
  pub fn query_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
    self.query.iter().map(|(k, v)| (k.as_str(), v.as_str()))
  }
}

impl fmt::Display for VolumeUri {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if !self.scheme.is_empty() {
      write!(f, "{}://", self.scheme)?;
    }
    f.write_str(&self.path)?;
    for (i, (key, value)) in self.query.iter().enumerate() {
      f.write_str(if i == 0 { "?" } else { "&" })?;
      f.write_str(&urlencoding::encode(key))?;
      if !value.is_empty() {
        write!(f, "={}", urlencoding::encode(value))?;
      }
    }
    Ok(())
  }
}

/// Percent-decode, keeping the raw text when the result is not UTF-8.
fn decode(text: &str) -> String {
  match urlencoding::decode(text) {
    Ok(Cow::Borrowed(s)) => s.to_owned(),
    Ok(Cow::Owned(s)) => s,
    Err(_) => text.to_owned(),
  }
}
