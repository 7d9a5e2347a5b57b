//! # PDG - Binary Object Graph Serialization
//!
//! PDG writes graphs of game objects into a compact binary stream and reads them back. Objects
//! shared by several owners are written once, fields can be selected per call with
//! [`SerializationFlags`](serialization::SerializationFlags), and the stream can carry tags that
//! let readers detect desynchronization early.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! pdg = "0.1"
//! ```
//!
//! ## Feature Flags
//!
//! - **`observability`** (default): logging setup used by the `inspect_stream` tool
//! - **`file-logging`**: per-run log folders for the tools
//!
//! ## Usage
//!
//! ```rust
//! use pdg::prelude::*;
//! use std::any::Any;
//!
//! #[derive(Default)]
//! struct Marker {
//!     at: Point,
//!     tint: Color,
//! }
//!
//! impl Serializable for Marker {
//!     fn class_tag(&self) -> u32 {
//!         0x4D524B52
//!     }
//!     fn write_body(&self, encoder: &mut dyn Encoder, flags: SerializationFlags) -> SerializationResult<()> {
//!         if flags.contains(SerializationFlags::POSITIONS) {
//!             encoder.write_point(&self.at)?;
//!         }
//!         encoder.write_color(&self.tint)
//!     }
//!     fn read_body(&mut self, decoder: &mut Deserializer<'_>, flags: SerializationFlags) -> SerializationResult<()> {
//!         if flags.contains(SerializationFlags::POSITIONS) {
//!             self.at = decoder.read_point()?;
//!         }
//!         self.tint = decoder.read_color()?;
//!         Ok(())
//!     }
//!     fn as_any(&self) -> &dyn Any { self }
//!     fn as_any_mut(&mut self) -> &mut dyn Any { self }
//! }
//!
//! let mut context = SerializationContext::default();
//! context.types.register_type::<Marker>();
//!
//! let marker = object_ref(Marker { at: Point::new(4.0, 2.0), tint: Color::WHITE });
//! let bytes = serialize_root(Some(&marker), SerializationFlags::FULL, &context, StreamConfig::default())?;
//! let root = deserialize_root(&bytes, SerializationFlags::FULL, &context, StreamConfig::default())?;
//! assert!(root.is_some());
//! # Ok::<(), SerializationError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: pdg-structures, pdg-config                 │
//! │  (Color, Offset, Rect; StreamConfig, ErrorMode)         │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Engine: pdg-serialization                              │
//! │  (Serializer, Deserializer, SizeCounter, registries)    │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Tools: pdg-observability, inspect_stream               │
//! │  (logging setup, stream inspection)                     │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use pdg_config as config;
pub use pdg_serialization as serialization;
pub use pdg_structures as structures;

#[cfg(feature = "observability")]
pub use pdg_observability as observability;

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::structures::{Color, Offset, Point, Quad, Rect, RotatedRect, Vector};

    pub use crate::serialization::{
        deserialize_root, object_ref, serialize_root, Deserializer, Encoder, ErrorMode,
        ObjectRef, Serializable, SerializationContext, SerializationError, SerializationFlags,
        SerializationResult, Serializer, StreamConfig,
    };
}
