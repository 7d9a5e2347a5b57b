use crate::encoder::Encoder;
use crate::error::{SerializationError, SerializationResult};
use crate::flags::SerializationFlags;
use crate::reference_registry::{ObjectTable, SerializationContext};
use crate::serializable::{ObjectRef, Serializable};
use crate::size_counter::{body_len, check_registry_size, unregistered_identity, SizeCounter};
use crate::stream_tag::{StreamTag, CURRENT_STREAM_VERSION, VARINT_U16_ESCAPE, VARINT_U32_ESCAPE};
use byteorder::{BigEndian, ByteOrder};
use pdg_config::StreamConfig;
use std::any::Any;
use std::rc::Rc;
use tracing::debug;

/// Writes an object graph into a growable byte buffer.
///
/// One serializer covers one stream: every object it writes is remembered, so writing the same
/// handle again produces a short back reference. Once any write fails the serializer is poisoned
/// and every later call returns that first error.
///
/// # Format
/// - Header (tags enabled only): `pdg` tag + version byte
/// - Objects: `obj` tag, class tag (4 bytes), registry check (2 bytes, tags enabled only),
///   varint body length, body
/// - Nil objects: `nil` tag. Repeated objects: `ref` tag + varint index
///
/// # Example
/// ```
/// use pdg_serialization::{Encoder, SerializationContext, Serializer, StreamConfig};
///
/// let context = SerializationContext::default();
/// let mut serializer = Serializer::new(&context, StreamConfig::default()).unwrap();
/// assert_eq!(serializer.data(), &[0x70, 0x64, 0x67, 1]); // pdg header, version 1
///
/// serializer.write_varint(1000).unwrap();
/// serializer.write_str("hi").unwrap();
/// let bytes = serializer.into_bytes().unwrap();
/// assert_eq!(bytes.len(), 4 + 3 + (3 + 1 + 2));
/// ```
pub struct Serializer<'ctx> {
    context: &'ctx SerializationContext,
    config: StreamConfig,
    bytes: Vec<u8>,
    /// Index of the byte the next boolean bits go into.
    bool_slot: Option<usize>,
    bool_offset: u8,
    objects: ObjectTable,
    size_pass: SizeCounter<'ctx>,
    poisoned: Option<SerializationError>,
}

impl<'ctx> Serializer<'ctx> {
    /// Creates a serializer and, when tags are enabled, writes the stream header.
    ///
    /// Fails with [`SerializationError::UnsupportedVersion`] if `config.version` is not a version
    /// this release can read back.
    pub fn new(context: &'ctx SerializationContext, config: StreamConfig) -> SerializationResult<Self> {
        if config.version == 0 || config.version > CURRENT_STREAM_VERSION {
            return Err(SerializationError::UnsupportedVersion {
                found: config.version,
                supported: CURRENT_STREAM_VERSION,
            });
        }
        let mut serializer = Self {
            context,
            config,
            bytes: Vec::with_capacity(config.block_size.max(1)),
            bool_slot: None,
            bool_offset: 0,
            objects: ObjectTable::default(),
            size_pass: SizeCounter::new(context, config.tags_enabled),
            poisoned: None,
        };
        if config.tags_enabled {
            serializer.write_tag(StreamTag::Stream)?;
            serializer.write_u8(config.version)?;
        }
        Ok(serializer)
    }

    //region Buffer Access

    /// Bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.bytes
    }

    pub fn data_size(&self) -> usize {
        self.bytes.len()
    }

    /// Hands the buffer over. A poisoned serializer returns its error instead.
    pub fn into_bytes(self) -> SerializationResult<Vec<u8>> {
        match self.poisoned {
            Some(error) => Err(error),
            None => Ok(self.bytes),
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Number of distinct objects written so far.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    //endregion

    /// Bytes `write_object(object, flags)` will add once the same calls have been made on this
    /// serializer.
    ///
    /// Sizing runs on a separate pass that remembers objects across calls, so sizing a sequence
    /// of roots and then writing the same sequence gives the same totals.
    pub fn serialized_size(
        &mut self,
        object: Option<&ObjectRef>,
        flags: SerializationFlags,
    ) -> SerializationResult<usize> {
        self.check_poisoned()?;
        let before = self.size_pass.size();
        self.size_pass.write_object(object, flags)?;
        Ok(self.size_pass.size() - before)
    }

    //region Internals

    fn check_poisoned(&self) -> SerializationResult<()> {
        match &self.poisoned {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    /// Records the first failure and hands `error` back for returning.
    fn poison(&mut self, error: SerializationError) -> SerializationError {
        if self.poisoned.is_none() {
            self.poisoned = Some(error.clone());
        }
        error
    }

    fn fail<T>(&mut self, error: SerializationError) -> SerializationResult<T> {
        Err(self.poison(error))
    }

    /// Grows the buffer in whole blocks.
    fn reserve_blocks(&mut self, additional: usize) {
        let required = self.bytes.len() + additional;
        if required > self.bytes.capacity() {
            let block = self.config.block_size.max(1);
            let target = required.div_ceil(block) * block;
            self.bytes.reserve_exact(target - self.bytes.len());
        }
    }

    fn reset_bools(&mut self) {
        self.bool_slot = None;
        self.bool_offset = 0;
    }

    fn write_new_object(
        &mut self,
        object: &ObjectRef,
        flags: SerializationFlags,
    ) -> SerializationResult<()> {
        let index = self.objects.insert(object);
        let class_tag = object.borrow().class_tag();
        self.write_tag(StreamTag::Object)?;
        self.write_u32(class_tag)?;
        if self.config.tags_enabled {
            let check = match check_registry_size(self.objects.len()) {
                Ok(check) => check,
                Err(error) => return self.fail(error),
            };
            self.write_u16(check)?;
        }

        // Reserve the one byte length form and widen it once the body size is known
        let length_position = self.bytes.len();
        self.write_u8(0)?;
        let body_start = self.bytes.len();

        self.reset_bools();
        let written = object.borrow().write_body(self, flags);
        self.reset_bools();
        if let Err(error) = written {
            return self.fail(error);
        }

        let length = match body_len(self.bytes.len() - body_start) {
            Ok(length) => length,
            Err(error) => return self.fail(error),
        };
        self.patch_length(length_position, length);
        debug!(
            "[SERIALIZER] Wrote object {} (class tag {:#010x}, {} body bytes)",
            index, class_tag, length
        );
        Ok(())
    }

    fn patch_length(&mut self, position: usize, length: u32) {
        if length < VARINT_U16_ESCAPE as u32 {
            self.bytes[position] = length as u8;
            return;
        }
        let mut encoded = [0u8; 5];
        let width = if length <= u16::MAX as u32 {
            encoded[0] = VARINT_U16_ESCAPE;
            BigEndian::write_u16(&mut encoded[1..3], length as u16);
            3
        } else {
            encoded[0] = VARINT_U32_ESCAPE;
            BigEndian::write_u32(&mut encoded[1..5], length);
            5
        };
        self.reserve_blocks(width - 1);
        self.bytes
            .splice(position..position + 1, encoded[..width].iter().copied());
    }

    //endregion
}

impl Encoder for Serializer<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) -> SerializationResult<()> {
        self.check_poisoned()?;
        self.reserve_blocks(bytes.len());
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn write_bool(&mut self, value: bool) -> SerializationResult<()> {
        self.check_poisoned()?;
        let slot = match self.bool_slot {
            Some(slot) => slot,
            None => {
                self.write_u8(0)?;
                let slot = self.bytes.len() - 1;
                self.bool_slot = Some(slot);
                slot
            }
        };
        if value {
            self.bytes[slot] |= 1 << self.bool_offset;
        }
        self.bool_offset = (self.bool_offset + 1) % 8;
        if self.bool_offset == 0 {
            self.bool_slot = None;
        }
        Ok(())
    }

    fn write_object(
        &mut self,
        object: Option<&ObjectRef>,
        flags: SerializationFlags,
    ) -> SerializationResult<()> {
        self.check_poisoned()?;
        let Some(object) = object else {
            return self.write_tag(StreamTag::Nil);
        };
        if let Some(index) = self.objects.find(object) {
            debug!("[SERIALIZER] Wrote reference to object {}", index);
            self.write_tag(StreamTag::Ref)?;
            return self.write_varint(index);
        }
        self.write_new_object(object, flags)
    }

    fn write_inline(
        &mut self,
        object: &dyn Serializable,
        flags: SerializationFlags,
    ) -> SerializationResult<()> {
        self.check_poisoned()?;
        match object.write_body(self, flags) {
            Ok(()) => Ok(()),
            Err(error) => self.fail(error),
        }
    }

    fn write_ref(&mut self, identity: &Rc<dyn Any>) -> SerializationResult<()> {
        self.check_poisoned()?;
        let Some(id) = self.context.externals.id_of(identity) else {
            return self.fail(unregistered_identity());
        };
        if self.config.tags_enabled {
            self.write_tag(StreamTag::Ptr)?;
        }
        self.write_varint(id)
    }

    fn tags_enabled(&self) -> bool {
        self.config.tags_enabled
    }
}
