//! Walks the top level units of a stream without knowing any of its types.

use crate::deserializer::Deserializer;
use crate::error::{SerializationError, SerializationResult};
use crate::reference_registry::SerializationContext;
use crate::stream_tag::{class_tags, StreamTag};
use pdg_config::StreamConfig;
use std::fmt::{Display, Formatter};

/// What a top level unit of a stream is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitKind {
    Object {
        class_tag: u32,
        /// Registry check, present when tags are enabled.
        registry_check: Option<u16>,
        body_len: usize,
    },
    Nil,
    Ref {
        index: u32,
    },
    Str {
        len: usize,
    },
    Mem {
        len: usize,
    },
    Ptr {
        id: u32,
    },
}

/// One top level unit and the byte it starts at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamUnit {
    pub position: usize,
    pub kind: UnitKind,
}

impl Display for StreamUnit {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>8}  ", self.position)?;
        match &self.kind {
            UnitKind::Object {
                class_tag,
                registry_check,
                body_len,
            } => {
                write!(f, "obj  class {:#010x}", class_tag)?;
                if class_tags::is_reserved(*class_tag) {
                    write!(f, " (reserved)")?;
                }
                if let Some(check) = registry_check {
                    write!(f, "  #{}", check)?;
                }
                write!(f, "  {} body bytes", body_len)
            }
            UnitKind::Nil => write!(f, "nil"),
            UnitKind::Ref { index } => write!(f, "ref  -> object {}", index),
            UnitKind::Str { len } => write!(f, "str  {} bytes", len),
            UnitKind::Mem { len } => write!(f, "mem  {} bytes", len),
            UnitKind::Ptr { id } => write!(f, "ptr  id {}", id),
        }
    }
}

/// Summary of a whole stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    /// Header version, for tagged streams.
    pub version: Option<u8>,
    pub units: Vec<StreamUnit>,
}

/// Lists the top level units of `bytes`.
///
/// Object bodies are skipped by length, so no type registrations are needed. Untagged streams
/// can only be walked if they contain nothing but objects at the top level, since their strings,
/// blobs and external references carry no marker.
///
/// # Example
/// ```
/// use pdg_serialization::{inspect::{scan_stream, UnitKind}, Encoder, SerializationContext, Serializer, StreamConfig};
///
/// let context = SerializationContext::default();
/// let mut serializer = Serializer::new(&context, StreamConfig::default()).unwrap();
/// serializer.write_str("level-1").unwrap();
/// serializer.write_object(None, Default::default()).unwrap();
/// let bytes = serializer.into_bytes().unwrap();
///
/// let report = scan_stream(&bytes, StreamConfig::default()).unwrap();
/// assert_eq!(report.version, Some(1));
/// assert_eq!(report.units[0].kind, UnitKind::Str { len: 7 });
/// assert_eq!(report.units[1].kind, UnitKind::Nil);
/// ```
pub fn scan_stream(bytes: &[u8], config: StreamConfig) -> SerializationResult<StreamReport> {
    let context = SerializationContext::default();
    let mut reader = Deserializer::new(bytes, &context, config)?;
    let version = config.tags_enabled.then(|| reader.stream_version());

    let mut units = Vec::new();
    while !reader.is_at_end() {
        let position = reader.position();
        let found = reader.read_u24()?;
        let tag = StreamTag::from_value(found)
            .filter(|tag| config.tags_enabled || is_object_tag(*tag));
        let kind = match tag {
            Some(StreamTag::Object) => {
                let class_tag = reader.read_u32()?;
                let registry_check = if config.tags_enabled {
                    Some(reader.read_u16()?)
                } else {
                    None
                };
                let body_len = reader.read_varint()? as usize;
                reader.skip(body_len)?;
                UnitKind::Object {
                    class_tag,
                    registry_check,
                    body_len,
                }
            }
            Some(StreamTag::Nil) => UnitKind::Nil,
            Some(StreamTag::Ref) => UnitKind::Ref {
                index: reader.read_varint()?,
            },
            Some(StreamTag::Str) => {
                let len = reader.read_varint()? as usize;
                reader.skip(len)?;
                UnitKind::Str { len }
            }
            Some(StreamTag::Mem) => {
                let len = reader.read_varint()? as usize;
                reader.skip(len)?;
                UnitKind::Mem { len }
            }
            Some(StreamTag::Ptr) => UnitKind::Ptr {
                id: reader.read_varint()?,
            },
            Some(StreamTag::Stream) | None => {
                return Err(SerializationError::BadTag {
                    expected: "a top level unit",
                    found,
                    position,
                })
            }
        };
        units.push(StreamUnit { position, kind });
    }

    Ok(StreamReport { version, units })
}

fn is_object_tag(tag: StreamTag) -> bool {
    matches!(tag, StreamTag::Object | StreamTag::Nil | StreamTag::Ref)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_stream_rejects_blob_tags() {
        // "str" is only a tag in tagged streams
        let bytes = [0x73, 0x74, 0x72, 0x00];
        let error = scan_stream(&bytes, StreamConfig::untagged()).unwrap_err();
        assert!(matches!(error, SerializationError::BadTag { position: 0, .. }));
    }

    #[test]
    fn test_empty_tagged_stream_needs_header() {
        assert!(matches!(
            scan_stream(&[], StreamConfig::default()),
            Err(SerializationError::OutOfData { .. })
        ));
        let report = scan_stream(&[0x70, 0x64, 0x67, 1], StreamConfig::default()).unwrap();
        assert!(report.units.is_empty());
    }

    #[test]
    fn test_display_marks_reserved_tags() {
        let unit = StreamUnit {
            position: 4,
            kind: UnitKind::Object {
                class_tag: class_tags::SPRITE,
                registry_check: Some(1),
                body_len: 12,
            },
        };
        let line = unit.to_string();
        assert!(line.contains("0xffffff01 (reserved)"));
        assert!(line.contains("#1"));
    }
}
