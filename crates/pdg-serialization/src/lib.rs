//! # PDG Data Serialization
//!
//! This crate turns graphs of game objects into a compact, tagged byte stream and back. Objects
//! that appear more than once are written once and referenced afterwards, and the reader
//! rebuilds each object's concrete type through a [`TypeRegistry`].
//!
//! ## Core Components
//!
//! - **[`Serializable`]** - Trait implemented by every object that can be written to a stream
//! - **[`Encoder`]** - The write vocabulary (integers, varints, packed booleans, geometry, objects)
//! - **[`Serializer`]** - Writes a stream into a growable buffer
//! - **[`SizeCounter`]** - Counts the bytes a [`Serializer`] would write
//! - **[`Deserializer`]** - Reads a stream back, with bounds checks on every read
//! - **[`SerializationContext`]** - The type registry and external references both ends share
//!
//! ## Basic Usage
//!
//! ```rust
//! use pdg_serialization::{
//!     deserialize_root, serialize_root, Deserializer, Encoder, Serializable, SerializationContext,
//!     SerializationFlags, SerializationResult, StreamConfig, object_ref,
//! };
//! use std::any::Any;
//!
//! #[derive(Default)]
//! struct Score {
//!     points: u32,
//! }
//!
//! impl Serializable for Score {
//!     fn class_tag(&self) -> u32 {
//!         0x53435245
//!     }
//!     fn write_body(&self, encoder: &mut dyn Encoder, _: SerializationFlags) -> SerializationResult<()> {
//!         encoder.write_varint(self.points)
//!     }
//!     fn read_body(&mut self, decoder: &mut Deserializer<'_>, _: SerializationFlags) -> SerializationResult<()> {
//!         self.points = decoder.read_varint()?;
//!         Ok(())
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let mut context = SerializationContext::default();
//! context.types.register_type::<Score>();
//!
//! let score = object_ref(Score { points: 1200 });
//! let flags = SerializationFlags::FULL;
//! let bytes = serialize_root(Some(&score), flags, &context, StreamConfig::default()).unwrap();
//!
//! let root = deserialize_root(&bytes, flags, &context, StreamConfig::default()).unwrap().unwrap();
//! let root = root.borrow();
//! assert_eq!(root.as_any().downcast_ref::<Score>().unwrap().points, 1200);
//! ```

mod deserializer;
mod encoder;
mod error;
mod flags;
pub mod inspect;
mod lenient;
mod reference_registry;
mod serializable;
mod serializer;
mod size_counter;
mod stream_tag;
mod type_registry;

pub use deserializer::Deserializer;
pub use encoder::Encoder;
pub use error::{SerializationError, SerializationResult};
pub use flags::{FloatFields, SerializationFlags};
pub use lenient::{LenientDecoder, ResolveErrors};
pub use reference_registry::{ExternalReferences, SerializationContext};
pub use serializable::{object_ref, ObjectRef, Serializable};
pub use serializer::Serializer;
pub use size_counter::SizeCounter;
pub use stream_tag::{
    class_tags, varint_len, StreamTag, CURRENT_STREAM_VERSION, VARINT_U16_ESCAPE,
    VARINT_U32_ESCAPE,
};
pub use type_registry::TypeRegistry;

pub use pdg_config::{ErrorMode, StreamConfig};

/// Writes a complete stream holding `object` as its only top level unit.
///
/// Under [`ErrorMode::LogAndDefault`] a failure is logged and an empty buffer is returned.
pub fn serialize_root(
    object: Option<&ObjectRef>,
    flags: SerializationFlags,
    context: &SerializationContext,
    config: StreamConfig,
) -> SerializationResult<Vec<u8>> {
    let result = Serializer::new(context, config).and_then(|mut serializer| {
        serializer.write_object(object, flags)?;
        serializer.into_bytes()
    });
    config.error_mode.resolve(result)
}

/// Reads the first top level object of a stream written by [`serialize_root`].
///
/// Returns `Ok(None)` for a nil root. A root whose class is not registered is an
/// [`SerializationError::UnknownObject`] error, since nothing of it could be rebuilt. Under
/// [`ErrorMode::LogAndDefault`] any failure is logged and read as `None`.
pub fn deserialize_root(
    bytes: &[u8],
    flags: SerializationFlags,
    context: &SerializationContext,
    config: StreamConfig,
) -> SerializationResult<Option<ObjectRef>> {
    let result = Deserializer::new(bytes, context, config).and_then(|mut reader| {
        let root = reader.read_object(flags)?;
        if root.is_none() {
            if let Some(diagnostic) = reader.diagnostics().first() {
                return Err(diagnostic.clone());
            }
        }
        if !reader.is_at_end() {
            tracing::debug!(
                "[DESERIALIZER] {} bytes follow the root object",
                reader.remaining()
            );
        }
        Ok(root)
    });
    config.error_mode.resolve(result)
}
