use crate::deserializer::Deserializer;
use crate::encoder::Encoder;
use crate::error::{SerializationError, SerializationResult};
use crate::flags::SerializationFlags;
use crate::reference_registry::SerializationContext;
use crate::size_counter::SizeCounter;
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

/// Shared handle to a serializable object. Identity is the address of the allocation.
pub type ObjectRef = Rc<RefCell<dyn Serializable>>;

/// Wraps a value into an [`ObjectRef`].
pub fn object_ref<T: Serializable>(value: T) -> ObjectRef {
    Rc::new(RefCell::new(value))
}

/// Stable identity of a shared handle, usable as a map key while the handle is alive.
pub(crate) fn identity_of<T: ?Sized>(handle: &Rc<T>) -> usize {
    Rc::as_ptr(handle) as *const () as usize
}

/// Common trait for game objects that can be written to and read from a stream.
///
/// `write_body` and `read_body` must visit the same fields in the same order for the same
/// flags. Nested objects go through [`Encoder::write_object`] and
/// [`Deserializer::read_object`], so shared children are written once.
pub trait Serializable: Any {
    /// Identifies the concrete type in the stream. Must be unique within a
    /// [`TypeRegistry`](crate::TypeRegistry).
    fn class_tag(&self) -> u32;

    fn write_body(
        &self,
        encoder: &mut dyn Encoder,
        flags: SerializationFlags,
    ) -> SerializationResult<()>;

    fn read_body(
        &mut self,
        decoder: &mut Deserializer<'_>,
        flags: SerializationFlags,
    ) -> SerializationResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Number of bytes `write_body` produces for `flags`.
    ///
    /// External references cannot be sized without their registrations, use
    /// [`Serializable::size_of_in`] for bodies that write them.
    fn size_of(&self, flags: SerializationFlags) -> SerializationResult<u32> {
        self.size_of_in(flags, &SerializationContext::default(), true)
    }

    /// Like [`Serializable::size_of`], with explicit registrations and tag setting.
    fn size_of_in(
        &self,
        flags: SerializationFlags,
        context: &SerializationContext,
        tags_enabled: bool,
    ) -> SerializationResult<u32> {
        let mut counter = SizeCounter::new(context, tags_enabled);
        self.write_body(&mut counter, flags)?;
        u32::try_from(counter.size()).map_err(|_| {
            SerializationError::SyncError(format!(
                "object body of {} bytes exceeds the u32 length",
                counter.size()
            ))
        })
    }
}
