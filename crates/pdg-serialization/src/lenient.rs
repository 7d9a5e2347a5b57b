use crate::deserializer::Deserializer;
use crate::error::SerializationResult;
use crate::flags::SerializationFlags;
use crate::serializable::{ObjectRef, Serializable};
use pdg_config::ErrorMode;
use pdg_structures::{Color, Offset, Point, Quad, Rect, RotatedRect, Vector};
use tracing::error;

/// Applies an [`ErrorMode`] to a result.
pub trait ResolveErrors {
    /// Under [`ErrorMode::Propagate`] returns `result` unchanged. Under
    /// [`ErrorMode::LogAndDefault`] logs an error and returns `T::default()` instead.
    fn resolve<T: Default>(self, result: SerializationResult<T>) -> SerializationResult<T>;
}

impl ResolveErrors for ErrorMode {
    fn resolve<T: Default>(self, result: SerializationResult<T>) -> SerializationResult<T> {
        match (self, result) {
            (ErrorMode::LogAndDefault, Err(err)) => {
                error!("[PDG-SERIALIZATION] {} (continuing with a default value)", err);
                Ok(T::default())
            }
            (_, result) => result,
        }
    }
}

macro_rules! lenient_reads {
    ($($name:ident -> $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> $ty {
                let result = self.inner.$name();
                self.settle(result, stringify!($name))
            }
        )*
    };
}

/// Decoder for targets that cannot propagate errors: every read returns a value.
///
/// Failed reads are logged through `tracing::error!` and produce the type's default. The
/// wrapped reader stays poisoned after the first failure, so later reads also produce defaults.
///
/// # Example
/// ```
/// use pdg_serialization::{Deserializer, LenientDecoder, SerializationContext, StreamConfig};
///
/// let context = SerializationContext::default();
/// let bytes = [7u8];
/// let mut reader = Deserializer::new(&bytes, &context, StreamConfig::untagged()).unwrap();
/// let mut lenient = LenientDecoder::new(&mut reader);
///
/// assert_eq!(lenient.read_u8(), 7);
/// assert_eq!(lenient.read_u32(), 0);
/// assert_eq!(lenient.error_count(), 1);
/// ```
pub struct LenientDecoder<'d, 'a> {
    inner: &'d mut Deserializer<'a>,
    error_count: usize,
}

impl<'d, 'a> LenientDecoder<'d, 'a> {
    pub fn new(inner: &'d mut Deserializer<'a>) -> Self {
        Self {
            inner,
            error_count: 0,
        }
    }

    /// Number of reads that failed and were replaced by defaults.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn inner(&mut self) -> &mut Deserializer<'a> {
        &mut *self.inner
    }

    fn settle<T: Default>(&mut self, result: SerializationResult<T>, read: &str) -> T {
        match result {
            Ok(value) => value,
            Err(err) => {
                self.error_count += 1;
                error!(
                    "[PDG-SERIALIZATION] {} failed at byte {}: {}",
                    read,
                    self.inner.position(),
                    err
                );
                T::default()
            }
        }
    }

    lenient_reads! {
        read_u8 -> u8,
        read_u16 -> u16,
        read_u24 -> u32,
        read_u32 -> u32,
        read_u64 -> u64,
        read_i8 -> i8,
        read_i16 -> i16,
        read_i32 -> i32,
        read_i64 -> i64,
        read_f32 -> f32,
        read_f64 -> f64,
        read_varint -> u32,
        read_bool -> bool,
        read_str -> String,
        read_mem -> Vec<u8>,
        read_color -> Color,
        read_offset -> Offset,
        read_point -> Point,
        read_vector -> Vector,
        read_rect -> Rect,
        read_rotated_rect -> RotatedRect,
        read_quad -> Quad,
    }

    /// Reads an object; failures read as `None`.
    pub fn read_object(&mut self, flags: SerializationFlags) -> Option<ObjectRef> {
        let result = self.inner.read_object(flags);
        self.settle(result, "read_object")
    }

    /// Reads a float field set into `out`; on failure `out` is left zeroed.
    pub fn read_float_fields(&mut self, out: &mut [f32]) {
        let result = self.inner.read_float_fields(out);
        if result.is_err() {
            out.fill(0.0);
        }
        self.settle(result, "read_float_fields")
    }

    /// Reads an inline body into `object`; on failure `object` keeps whatever was read.
    pub fn read_inline(&mut self, object: &mut dyn Serializable, flags: SerializationFlags) {
        let result = self.inner.read_inline(object, flags);
        self.settle(result, "read_inline")
    }
}
