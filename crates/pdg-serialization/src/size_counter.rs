use crate::encoder::Encoder;
use crate::error::{SerializationError, SerializationResult};
use crate::flags::SerializationFlags;
use crate::reference_registry::{ObjectTable, SerializationContext};
use crate::serializable::{ObjectRef, Serializable};
use crate::stream_tag::varint_len;
use std::any::Any;
use std::rc::Rc;

const TAG_BYTES: usize = 3;
const CLASS_TAG_BYTES: usize = 4;
const REGISTRY_CHECK_BYTES: usize = 2;

/// An [`Encoder`] that only counts the bytes a [`Serializer`](crate::Serializer) would write.
///
/// It keeps its own boolean bit counter and its own list of objects already seen, so sizing a
/// graph that shares objects gives the same total as writing it.
///
/// # Example
/// ```
/// use pdg_serialization::{Encoder, SerializationContext, SizeCounter};
///
/// let context = SerializationContext::default();
/// let mut counter = SizeCounter::new(&context, true);
/// counter.write_varint(300).unwrap();
/// for _ in 0..9 {
///     counter.write_bool(true).unwrap();
/// }
/// assert_eq!(counter.size(), 3 + 2);
/// ```
pub struct SizeCounter<'ctx> {
    context: &'ctx SerializationContext,
    tags_enabled: bool,
    size: usize,
    bool_offset: u8,
    objects: ObjectTable,
}

impl<'ctx> SizeCounter<'ctx> {
    pub fn new(context: &'ctx SerializationContext, tags_enabled: bool) -> Self {
        Self {
            context,
            tags_enabled,
            size: 0,
            bool_offset: 0,
            objects: ObjectTable::default(),
        }
    }

    /// Bytes counted so far.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of distinct objects seen so far.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    fn count_body(
        &mut self,
        object: &ObjectRef,
        flags: SerializationFlags,
    ) -> SerializationResult<usize> {
        let start = self.size;
        self.bool_offset = 0;
        object.borrow().write_body(self, flags)?;
        self.bool_offset = 0;
        Ok(self.size - start)
    }
}

impl Encoder for SizeCounter<'_> {
    fn write_bytes(&mut self, bytes: &[u8]) -> SerializationResult<()> {
        self.size += bytes.len();
        Ok(())
    }

    fn write_bool(&mut self, _value: bool) -> SerializationResult<()> {
        if self.bool_offset == 0 {
            self.size += 1;
        }
        self.bool_offset = (self.bool_offset + 1) % 8;
        Ok(())
    }

    fn write_object(
        &mut self,
        object: Option<&ObjectRef>,
        flags: SerializationFlags,
    ) -> SerializationResult<()> {
        let Some(object) = object else {
            self.size += TAG_BYTES;
            return Ok(());
        };
        if let Some(index) = self.objects.find(object) {
            self.size += TAG_BYTES + varint_len(index);
            return Ok(());
        }

        self.objects.insert(object);
        self.size += TAG_BYTES + CLASS_TAG_BYTES;
        if self.tags_enabled {
            check_registry_size(self.objects.len())?;
            self.size += REGISTRY_CHECK_BYTES;
        }
        let body = self.count_body(object, flags)?;
        self.size += varint_len(body_len(body)?);
        Ok(())
    }

    fn write_inline(
        &mut self,
        object: &dyn Serializable,
        flags: SerializationFlags,
    ) -> SerializationResult<()> {
        object.write_body(self, flags)
    }

    fn write_ref(&mut self, identity: &Rc<dyn Any>) -> SerializationResult<()> {
        let id = self
            .context
            .externals
            .id_of(identity)
            .ok_or_else(unregistered_identity)?;
        if self.tags_enabled {
            self.size += TAG_BYTES;
        }
        self.size += varint_len(id);
        Ok(())
    }

    fn tags_enabled(&self) -> bool {
        self.tags_enabled
    }
}

/// The per-object registry check is 16 bits wide.
pub(crate) fn check_registry_size(count: usize) -> SerializationResult<u16> {
    u16::try_from(count).map_err(|_| {
        SerializationError::SyncError(format!(
            "a tagged stream holds at most {} objects, this is object {}",
            u16::MAX,
            count
        ))
    })
}

pub(crate) fn body_len(len: usize) -> SerializationResult<u32> {
    u32::try_from(len).map_err(|_| {
        SerializationError::SyncError(format!("object body of {} bytes exceeds the u32 length", len))
    })
}

pub(crate) fn unregistered_identity() -> SerializationError {
    SerializationError::UnknownObject(
        "external reference to an identity that was never registered".to_string(),
    )
}
