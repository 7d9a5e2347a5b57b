use crate::error::{SerializationError, SerializationResult};
use crate::flags::{FloatFields, SerializationFlags};
use crate::serializable::{ObjectRef, Serializable};
use crate::stream_tag::{StreamTag, VARINT_U16_ESCAPE, VARINT_U32_ESCAPE};
use byteorder::{BigEndian, ByteOrder};
use pdg_structures::{Color, Offset, Point, Quad, Rect, RotatedRect, Vector};
use std::any::Any;
use std::rc::Rc;

/// Largest whole part an axis may have and still be written as a varint.
const MAX_COMPACT_AXIS: f32 = u16::MAX as f32;

/// The encode vocabulary shared by the [`Serializer`](crate::Serializer) and the
/// [`SizeCounter`](crate::SizeCounter).
///
/// Implementors supply raw byte output, boolean packing and the object protocol. Every other
/// encoding is built on those, so a value written through a `SizeCounter` counts exactly the
/// bytes a `Serializer` would produce for it.
pub trait Encoder {
    //region Required

    /// Appends raw bytes.
    fn write_bytes(&mut self, bytes: &[u8]) -> SerializationResult<()>;

    /// Packs one boolean into the current bit slot, starting a new byte every 8 booleans.
    fn write_bool(&mut self, value: bool) -> SerializationResult<()>;

    /// Writes a possibly absent object, by reference if it was already written to this stream.
    fn write_object(
        &mut self,
        object: Option<&ObjectRef>,
        flags: SerializationFlags,
    ) -> SerializationResult<()>;

    /// Writes only the body of `object`, without framing or deduplication.
    fn write_inline(
        &mut self,
        object: &dyn Serializable,
        flags: SerializationFlags,
    ) -> SerializationResult<()>;

    /// Writes the id an external identity was registered under.
    fn write_ref(&mut self, identity: &Rc<dyn Any>) -> SerializationResult<()>;

    /// Whether the optional stream tags are written.
    fn tags_enabled(&self) -> bool;

    //endregion

    //region Integers

    fn write_u8(&mut self, value: u8) -> SerializationResult<()> {
        self.write_bytes(&[value])
    }

    fn write_u16(&mut self, value: u16) -> SerializationResult<()> {
        let mut buffer = [0u8; 2];
        BigEndian::write_u16(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    /// Writes the low 24 bits of `value`. Larger values are rejected.
    fn write_u24(&mut self, value: u32) -> SerializationResult<()> {
        if value > 0x00FF_FFFF {
            return Err(SerializationError::SyncError(format!(
                "{:#x} does not fit in 24 bits",
                value
            )));
        }
        let mut buffer = [0u8; 3];
        BigEndian::write_u24(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    fn write_u32(&mut self, value: u32) -> SerializationResult<()> {
        let mut buffer = [0u8; 4];
        BigEndian::write_u32(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    fn write_u64(&mut self, value: u64) -> SerializationResult<()> {
        let mut buffer = [0u8; 8];
        BigEndian::write_u64(&mut buffer, value);
        self.write_bytes(&buffer)
    }

    fn write_i8(&mut self, value: i8) -> SerializationResult<()> {
        self.write_u8(value as u8)
    }

    fn write_i16(&mut self, value: i16) -> SerializationResult<()> {
        self.write_u16(value as u16)
    }

    fn write_i32(&mut self, value: i32) -> SerializationResult<()> {
        self.write_u32(value as u32)
    }

    fn write_i64(&mut self, value: i64) -> SerializationResult<()> {
        self.write_u64(value as u64)
    }

    fn write_f32(&mut self, value: f32) -> SerializationResult<()> {
        self.write_u32(value.to_bits())
    }

    fn write_f64(&mut self, value: f64) -> SerializationResult<()> {
        self.write_u64(value.to_bits())
    }

    /// Writes a length or count in 1, 3 or 5 bytes.
    fn write_varint(&mut self, value: u32) -> SerializationResult<()> {
        if value < VARINT_U16_ESCAPE as u32 {
            self.write_u8(value as u8)
        } else if value <= u16::MAX as u32 {
            self.write_u8(VARINT_U16_ESCAPE)?;
            self.write_u16(value as u16)
        } else {
            self.write_u8(VARINT_U32_ESCAPE)?;
            self.write_u32(value)
        }
    }

    fn write_tag(&mut self, tag: StreamTag) -> SerializationResult<()> {
        self.write_u24(tag.value())
    }

    /// Writes a per-type debug marker. Only emitted when tags are enabled.
    fn write_magic(&mut self, magic: u32) -> SerializationResult<()> {
        if self.tags_enabled() {
            self.write_u32(magic)?;
        }
        Ok(())
    }

    //endregion

    //region Blobs

    fn write_str(&mut self, value: &str) -> SerializationResult<()> {
        if self.tags_enabled() {
            self.write_tag(StreamTag::Str)?;
        }
        self.write_varint(blob_len(value.len())?)?;
        self.write_bytes(value.as_bytes())
    }

    fn write_mem(&mut self, value: &[u8]) -> SerializationResult<()> {
        if self.tags_enabled() {
            self.write_tag(StreamTag::Mem)?;
        }
        self.write_varint(blob_len(value.len())?)?;
        self.write_bytes(value)
    }

    //endregion

    //region Geometry

    /// A packed "has alpha" bit, the alpha byte if it is not 255, then red, green and blue bytes.
    fn write_color(&mut self, color: &Color) -> SerializationResult<()> {
        let [red, green, blue, alpha] = color.to_bytes();
        let has_alpha = alpha != u8::MAX;
        self.write_bool(has_alpha)?;
        if has_alpha {
            self.write_u8(alpha)?;
        }
        self.write_bytes(&[red, green, blue])
    }

    /// A "non-zero" bit; for non-zero offsets two "integral" bits and then each axis as a
    /// varint (integral) or a float.
    fn write_offset(&mut self, offset: &Offset) -> SerializationResult<()> {
        let non_zero = !offset.is_zero();
        self.write_bool(non_zero)?;
        if !non_zero {
            return Ok(());
        }
        let x_integral = is_compact_integral(offset.x);
        let y_integral = is_compact_integral(offset.y);
        self.write_bool(x_integral)?;
        self.write_bool(y_integral)?;
        write_axis(self, offset.x, x_integral)?;
        write_axis(self, offset.y, y_integral)
    }

    fn write_point(&mut self, point: &Point) -> SerializationResult<()> {
        self.write_offset(point)
    }

    fn write_vector(&mut self, vector: &Vector) -> SerializationResult<()> {
        self.write_offset(vector)
    }

    /// Left-top point followed by the width/height offset.
    fn write_rect(&mut self, rect: &Rect) -> SerializationResult<()> {
        self.write_point(&rect.left_top())?;
        self.write_offset(&rect.size())
    }

    fn write_rotated_rect(&mut self, rotated: &RotatedRect) -> SerializationResult<()> {
        self.write_rect(&rotated.rect)?;
        self.write_f32(rotated.radians)?;
        self.write_offset(&rotated.center_offset)
    }

    fn write_quad(&mut self, quad: &Quad) -> SerializationResult<()> {
        for point in &quad.points {
            self.write_point(point)?;
        }
        Ok(())
    }

    //endregion

    /// Writes a presence mask and only the non-zero values of `values` (at most 16).
    fn write_float_fields(&mut self, values: &[f32]) -> SerializationResult<()> {
        let fields = FloatFields::from_values(values)?;
        self.write_u16(fields.mask())?;
        for value in fields.present() {
            self.write_f32(*value)?;
        }
        Ok(())
    }
}

/// Whole part in `0..=65535` and fractional part below 0.001.
pub(crate) fn is_compact_integral(value: f32) -> bool {
    let whole = value.trunc();
    (0.0..=MAX_COMPACT_AXIS).contains(&whole) && (value - whole).abs() * 1000.0 < 1.0
}

fn write_axis<E: Encoder + ?Sized>(
    encoder: &mut E,
    value: f32,
    integral: bool,
) -> SerializationResult<()> {
    if integral {
        encoder.write_varint(value.trunc() as u32)
    } else {
        encoder.write_f32(value)
    }
}

fn blob_len(len: usize) -> SerializationResult<u32> {
    u32::try_from(len).map_err(|_| {
        SerializationError::SyncError(format!("a blob of {} bytes exceeds the u32 length", len))
    })
}
