//! External references and the compound-id codec.
//!
//! An [`ExternalId`] pairs a platform's raw id with the [`SourceTag`] that
//! issued it. When the pair has to travel as a single string (a lookup key, a
//! URL segment, an index column) it is encoded as an [`IdSourceValue`]:
//! `SOURCE#rawId`, e.g. `COMMUNITY#abc123`.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, ids::SourceId, source::SourceTag};

/// Separates the source tag from the raw id in an [`IdSourceValue`].
///
/// Never valid inside a [`SourceId`] or a tag's string form.
pub const SEPARATOR: char = '#';

// ─── ExternalId ──────────────────────────────────────────────────────────────

/// A reference to the copy of an entity held by an external platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExternalId {
  pub id:     SourceId,
  pub source: SourceTag,
}

impl ExternalId {
  pub fn new(id: SourceId, source: SourceTag) -> Self { Self { id, source } }

  pub fn encode(&self) -> IdSourceValue { IdSourceValue::from(self) }
}

impl fmt::Display for ExternalId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{SEPARATOR}{}", self.source, self.id)
  }
}

// ─── Codec ───────────────────────────────────────────────────────────────────

/// The compound, single-string form of an [`ExternalId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IdSourceValue {
  value: String,
  parts: ExternalId,
}

impl IdSourceValue {
  pub fn as_str(&self) -> &str { &self.value }

  pub fn external_id(&self) -> &ExternalId { &self.parts }

  pub fn into_external_id(self) -> ExternalId { self.parts }
}

impl From<&ExternalId> for IdSourceValue {
  fn from(ext: &ExternalId) -> Self {
    Self {
      value: ext.to_string(),
      parts: ext.clone(),
    }
  }
}

impl From<ExternalId> for IdSourceValue {
  fn from(ext: ExternalId) -> Self {
    Self {
      value: ext.to_string(),
      parts: ext,
    }
  }
}

impl fmt::Display for IdSourceValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.value) }
}

impl FromStr for IdSourceValue {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { decode(s).map(Self::from) }
}

impl TryFrom<String> for IdSourceValue {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> { value.parse() }
}

impl From<IdSourceValue> for String {
  fn from(value: IdSourceValue) -> Self { value.value }
}

/// Encode a raw platform id and its source into the compound form.
///
/// Rejects a raw id that is empty, padded with whitespace, or that contains
/// [`SEPARATOR`].
pub fn encode(raw_id: &str, source: SourceTag) -> Result<IdSourceValue> {
  let id = SourceId::new(raw_id)?;
  Ok(ExternalId::new(id, source).encode())
}

/// Decode a compound id. Requires exactly one separator, a recognised source
/// tag on the left and a valid raw id on the right.
pub fn decode(value: &str) -> Result<ExternalId> {
  let invalid = |why: &str| {
    Error::RequestInvalid(format!("invalid id source value {value:?}: {why}"))
  };

  let mut parts = value.split(SEPARATOR);
  let (Some(source), Some(raw_id), None) = (parts.next(), parts.next(), parts.next())
  else {
    return Err(invalid("expected exactly two parts"));
  };
  if source.is_empty() || raw_id.is_empty() {
    return Err(invalid("empty part"));
  }

  let source = SourceTag::from_str(source).map_err(|_| invalid("unknown source"))?;
  let id = SourceId::new(raw_id).map_err(|_| invalid("malformed raw id"))?;
  Ok(ExternalId::new(id, source))
}

// ─── SourceIds ───────────────────────────────────────────────────────────────

/// The external references carried by one entity; at most one per platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ExternalId>", into = "Vec<ExternalId>")]
pub struct SourceIds(BTreeMap<SourceTag, SourceId>);

impl SourceIds {
  pub fn new() -> Self { Self::default() }

  pub fn single(ext: ExternalId) -> Self {
    let mut ids = Self::new();
    ids.set(ext);
    ids
  }

  pub fn get(&self, source: SourceTag) -> Option<ExternalId> {
    self
      .0
      .get(&source)
      .map(|id| ExternalId::new(id.clone(), source))
  }

  pub fn contains(&self, ext: &ExternalId) -> bool {
    self.0.get(&ext.source) == Some(&ext.id)
  }

  /// Set the reference for `ext.source`, replacing any previous one.
  pub fn set(&mut self, ext: ExternalId) -> Option<SourceId> {
    self.0.insert(ext.source, ext.id)
  }

  pub fn remove(&mut self, source: SourceTag) -> Option<SourceId> { self.0.remove(&source) }

  /// Overlay `other` onto `self`, tag by tag.
  pub fn merge(&mut self, other: &SourceIds) {
    for ext in other.iter() {
      self.set(ext);
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = ExternalId> + '_ {
    self
      .0
      .iter()
      .map(|(source, id)| ExternalId::new(id.clone(), *source))
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl TryFrom<Vec<ExternalId>> for SourceIds {
  type Error = Error;

  fn try_from(list: Vec<ExternalId>) -> Result<Self> {
    let mut ids = Self::new();
    for ext in list {
      let source = ext.source;
      if ids.set(ext).is_some() {
        return Err(Error::StructureInvalid(format!(
          "more than one source id for {source}"
        )));
      }
    }
    Ok(ids)
  }
}

impl From<SourceIds> for Vec<ExternalId> {
  fn from(ids: SourceIds) -> Self { ids.iter().collect() }
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;

  #[test]
  fn encodes_source_first() {
    let value = encode("abc123", SourceTag::Community).unwrap();
    assert_eq!(value.as_str(), "COMMUNITY#abc123");
  }

  #[test]
  fn round_trip_for_every_source() {
    for source in SourceTag::iter() {
      for raw in ["1", "abc123", "0031x00000AbCdE", "user@example.org", "a b"] {
        let encoded = encode(raw, source).unwrap();
        let decoded = decode(encoded.as_str()).unwrap();
        assert_eq!(decoded.id.as_str(), raw);
        assert_eq!(decoded.source, source);
        assert_eq!(encoded.external_id(), &decoded);
      }
    }
  }

  #[test]
  fn encode_rejects_reserved_separator() {
    assert!(matches!(
      encode("a#b", SourceTag::Course),
      Err(Error::RequestInvalid(_))
    ));
    assert!(encode("", SourceTag::Course).is_err());
  }

  #[test]
  fn decode_rejects_malformed_values() {
    for bad in [
      "",
      "COMMUNITY",
      "COMMUNITY#",
      "#abc",
      "COMMUNITY#abc#def",
      "NOWHERE#abc",
      "community#abc",
      "COMMUNITY# abc",
    ] {
      assert!(
        matches!(decode(bad), Err(Error::RequestInvalid(_))),
        "{bad:?} should be rejected"
      );
    }
  }

  #[test]
  fn id_source_value_serde_validates() {
    let ok: IdSourceValue = serde_json::from_str("\"MICRO-COURSE#42\"").unwrap();
    assert_eq!(ok.external_id().source, SourceTag::MicroCourse);
    assert!(serde_json::from_str::<IdSourceValue>("\"MICRO-COURSE\"").is_err());
  }

  #[test]
  fn source_ids_allow_one_reference_per_platform() {
    let json = r#"[{"id":"a","source":"COMMUNITY"},{"id":"b","source":"COMMUNITY"}]"#;
    assert!(serde_json::from_str::<SourceIds>(json).is_err());

    let json = r#"[{"id":"a","source":"COMMUNITY"},{"id":"b","source":"COURSE"}]"#;
    let ids: SourceIds = serde_json::from_str(json).unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids.get(SourceTag::Course).unwrap().id.as_str(), "b");
  }

  #[test]
  fn merge_overlays_by_tag() {
    let mut ids = SourceIds::single(ExternalId::new(
      SourceId::new("old").unwrap(),
      SourceTag::Community,
    ));
    let incoming = SourceIds::try_from(vec![
      ExternalId::new(SourceId::new("new").unwrap(), SourceTag::Community),
      ExternalId::new(SourceId::new("crm").unwrap(), SourceTag::Course),
    ])
    .unwrap();
    ids.merge(&incoming);
    assert_eq!(ids, incoming);
  }
}
