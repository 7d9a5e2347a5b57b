use crate::error::{SerializationError, SerializationResult};
use crate::flags::{FloatFields, SerializationFlags};
use crate::reference_registry::SerializationContext;
use crate::serializable::{ObjectRef, Serializable};
use crate::stream_tag::{StreamTag, CURRENT_STREAM_VERSION, VARINT_U16_ESCAPE, VARINT_U32_ESCAPE};
use byteorder::{BigEndian, ByteOrder};
use pdg_config::StreamConfig;
use pdg_structures::{Color, Offset, Point, Quad, Rect, RotatedRect, Vector};
use std::any::Any;
use std::rc::Rc;
use tracing::{debug, warn};

/// Reads an object graph back from a byte slice.
///
/// Mirrors [`Serializer`](crate::Serializer): every `write_*` has a `read_*` here that consumes
/// exactly the bytes it produced. Every read checks the remaining length first. A failed read
/// leaves the cursor where it started and poisons the reader, so every later call returns that
/// first error.
///
/// Objects whose class tag has no registered factory are skipped by their declared length and
/// read as `None`; each skip is kept as a diagnostic (see [`Deserializer::diagnostics`]).
///
/// # Example
/// ```
/// use pdg_serialization::{Deserializer, Encoder, SerializationContext, Serializer, StreamConfig};
///
/// let context = SerializationContext::default();
/// let mut serializer = Serializer::new(&context, StreamConfig::default()).unwrap();
/// serializer.write_varint(70000).unwrap();
/// serializer.write_bool(true).unwrap();
/// let bytes = serializer.into_bytes().unwrap();
///
/// let mut reader = Deserializer::new(&bytes, &context, StreamConfig::default()).unwrap();
/// assert_eq!(reader.read_varint().unwrap(), 70000);
/// assert!(reader.read_bool().unwrap());
/// assert!(reader.is_at_end());
/// assert!(reader.read_u8().is_err());
/// ```
pub struct Deserializer<'a> {
    data: &'a [u8],
    cursor: usize,
    context: &'a SerializationContext,
    config: StreamConfig,
    stream_version: u8,
    bool_byte: u8,
    bool_offset: u8,
    /// Objects in stream order. `None` marks an object that was skipped.
    objects: Vec<Option<ObjectRef>>,
    diagnostics: Vec<SerializationError>,
    poisoned: Option<SerializationError>,
}

impl<'a> Deserializer<'a> {
    /// Creates a reader over `data` and, when tags are enabled, validates the stream header.
    pub fn new(
        data: &'a [u8],
        context: &'a SerializationContext,
        config: StreamConfig,
    ) -> SerializationResult<Self> {
        let mut reader = Self {
            data,
            cursor: 0,
            context,
            config,
            stream_version: config.version,
            bool_byte: 0,
            bool_offset: 0,
            objects: Vec::new(),
            diagnostics: Vec::new(),
            poisoned: None,
        };
        if config.tags_enabled {
            reader.expect_tag(StreamTag::Stream)?;
            let version = reader.read_u8()?;
            if version == 0 || version > CURRENT_STREAM_VERSION {
                return Err(SerializationError::UnsupportedVersion {
                    found: version,
                    supported: CURRENT_STREAM_VERSION,
                });
            }
            reader.stream_version = version;
        }
        Ok(reader)
    }

    //region Cursor

    /// Read position, in bytes from the start of the stream.
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor == self.data.len()
    }

    /// Version from the stream header, or the configured version for untagged streams.
    pub fn stream_version(&self) -> u8 {
        self.stream_version
    }

    pub fn tags_enabled(&self) -> bool {
        self.config.tags_enabled
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Unknown objects skipped so far, as [`SerializationError::UnknownObject`] values.
    pub fn diagnostics(&self) -> &[SerializationError] {
        &self.diagnostics
    }

    /// Number of objects read so far, skipped ones included.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// The first error this reader hit, if any.
    pub fn error(&self) -> Option<&SerializationError> {
        self.poisoned.as_ref()
    }

    /// Moves the cursor `count` bytes forward without decoding them.
    pub fn skip(&mut self, count: usize) -> SerializationResult<()> {
        self.take(count).map(|_| ())
    }

    //endregion

    //region Internals

    fn check_poisoned(&self) -> SerializationResult<()> {
        match &self.poisoned {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn fail<T>(&mut self, error: SerializationError) -> SerializationResult<T> {
        if self.poisoned.is_none() {
            self.poisoned = Some(error.clone());
        }
        Err(error)
    }

    /// Like `fail`, rewinding to `position` first.
    fn fail_at<T>(&mut self, position: usize, error: SerializationError) -> SerializationResult<T> {
        self.cursor = position;
        self.fail(error)
    }

    /// Consumes `count` bytes, or fails without moving the cursor.
    fn take(&mut self, count: usize) -> SerializationResult<&'a [u8]> {
        self.check_poisoned()?;
        let remaining = self.remaining();
        if count > remaining {
            return self.fail(SerializationError::OutOfData {
                needed: count,
                remaining,
                position: self.cursor,
            });
        }
        let data = self.data;
        let bytes = &data[self.cursor..self.cursor + count];
        self.cursor += count;
        Ok(bytes)
    }

    fn reset_bools(&mut self) {
        self.bool_byte = 0;
        self.bool_offset = 0;
    }

    //endregion

    //region Integers

    pub fn read_bytes(&mut self, count: usize) -> SerializationResult<&'a [u8]> {
        self.take(count)
    }

    pub fn read_u8(&mut self) -> SerializationResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> SerializationResult<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    pub fn read_u24(&mut self) -> SerializationResult<u32> {
        Ok(BigEndian::read_u24(self.take(3)?))
    }

    pub fn read_u32(&mut self) -> SerializationResult<u32> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> SerializationResult<u64> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    pub fn read_i8(&mut self) -> SerializationResult<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> SerializationResult<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> SerializationResult<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> SerializationResult<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> SerializationResult<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> SerializationResult<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    /// Reads a 1, 3 or 5 byte varint. A truncated wide form leaves the cursor on its escape byte.
    pub fn read_varint(&mut self) -> SerializationResult<u32> {
        let start = self.cursor;
        let result = match self.read_u8()? {
            VARINT_U16_ESCAPE => self.read_u16().map(u32::from),
            VARINT_U32_ESCAPE => self.read_u32(),
            small => Ok(small as u32),
        };
        if result.is_err() {
            self.cursor = start;
        }
        result
    }

    /// Reads one packed boolean, fetching a new byte every 8 booleans.
    pub fn read_bool(&mut self) -> SerializationResult<bool> {
        if self.bool_offset == 0 {
            self.bool_byte = self.read_u8()?;
        } else {
            self.check_poisoned()?;
        }
        let value = (self.bool_byte >> self.bool_offset) & 1 == 1;
        self.bool_offset = (self.bool_offset + 1) % 8;
        Ok(value)
    }

    //endregion

    //region Tags

    /// Reads a tag and fails with [`SerializationError::BadTag`] unless it is `expected`.
    pub fn expect_tag(&mut self, expected: StreamTag) -> SerializationResult<()> {
        let position = self.cursor;
        let found = self.read_u24()?;
        if found != expected.value() {
            self.cursor = position;
            return self.fail(SerializationError::BadTag {
                expected: expected.name(),
                found,
                position,
            });
        }
        Ok(())
    }

    /// Checks a per-type debug marker. Only present when tags are enabled.
    pub fn expect_magic(&mut self, magic: u32) -> SerializationResult<()> {
        if !self.config.tags_enabled {
            return Ok(());
        }
        let position = self.cursor;
        let found = self.read_u32()?;
        if found != magic {
            self.cursor = position;
            return self.fail(SerializationError::BadTag {
                expected: "magic number",
                found,
                position,
            });
        }
        Ok(())
    }

    //endregion

    //region Blobs

    pub fn read_str(&mut self) -> SerializationResult<String> {
        let start = self.cursor;
        let bytes = self.read_blob(StreamTag::Str)?;
        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_string()),
            Err(error) => {
                self.cursor = start;
                self.fail(SerializationError::SyncError(format!(
                    "string at byte {} is not valid UTF-8: {}",
                    start, error
                )))
            }
        }
    }

    pub fn read_mem(&mut self) -> SerializationResult<Vec<u8>> {
        Ok(self.read_blob(StreamTag::Mem)?.to_vec())
    }

    fn read_blob(&mut self, tag: StreamTag) -> SerializationResult<&'a [u8]> {
        let start = self.cursor;
        if self.config.tags_enabled {
            self.expect_tag(tag)?;
        }
        let result = self
            .read_varint()
            .and_then(|len| self.take(len as usize));
        if result.is_err() {
            self.cursor = start;
        }
        result
    }

    //endregion

    //region Geometry

    pub fn read_color(&mut self) -> SerializationResult<Color> {
        let has_alpha = self.read_bool()?;
        let alpha = if has_alpha { self.read_u8()? } else { u8::MAX };
        let channels = self.take(3)?;
        Ok(Color::from_bytes(channels[0], channels[1], channels[2], alpha))
    }

    pub fn read_offset(&mut self) -> SerializationResult<Offset> {
        if !self.read_bool()? {
            return Ok(Offset::ZERO);
        }
        let x_integral = self.read_bool()?;
        let y_integral = self.read_bool()?;
        let x = self.read_axis(x_integral)?;
        let y = self.read_axis(y_integral)?;
        Ok(Offset::new(x, y))
    }

    pub fn read_point(&mut self) -> SerializationResult<Point> {
        self.read_offset()
    }

    pub fn read_vector(&mut self) -> SerializationResult<Vector> {
        self.read_offset()
    }

    pub fn read_rect(&mut self) -> SerializationResult<Rect> {
        let left_top = self.read_point()?;
        let size = self.read_offset()?;
        Ok(Rect::from_origin_size(left_top, size))
    }

    pub fn read_rotated_rect(&mut self) -> SerializationResult<RotatedRect> {
        let rect = self.read_rect()?;
        let radians = self.read_f32()?;
        let center_offset = self.read_offset()?;
        Ok(RotatedRect::new(rect, radians, center_offset))
    }

    pub fn read_quad(&mut self) -> SerializationResult<Quad> {
        let mut points = [Point::ZERO; 4];
        for point in points.iter_mut() {
            *point = self.read_point()?;
        }
        Ok(Quad::new(points))
    }

    fn read_axis(&mut self, integral: bool) -> SerializationResult<f32> {
        if integral {
            Ok(self.read_varint()? as f32)
        } else {
            self.read_f32()
        }
    }

    //endregion

    /// Reads a presence mask and the floats it flags.
    pub fn read_float_field_set(&mut self) -> SerializationResult<FloatFields> {
        let mask = self.read_u16()?;
        let mut present = Vec::with_capacity(mask.count_ones() as usize);
        for _ in 0..mask.count_ones() {
            present.push(self.read_f32()?);
        }
        Ok(FloatFields::from_parts(mask, present))
    }

    /// Reads a float field set into `out`; fields not in the stream become zero.
    pub fn read_float_fields(&mut self, out: &mut [f32]) -> SerializationResult<()> {
        let fields = self.read_float_field_set()?;
        match fields.expand_into(out) {
            Ok(()) => Ok(()),
            Err(error) => self.fail(error),
        }
    }

    //region Objects

    /// Reads an object written by [`Encoder::write_object`](crate::Encoder::write_object).
    ///
    /// Returns `None` for a nil object and for an object of an unregistered class, and the
    /// already materialized instance for a back reference.
    pub fn read_object(
        &mut self,
        flags: SerializationFlags,
    ) -> SerializationResult<Option<ObjectRef>> {
        let position = self.cursor;
        let tag = self.read_u24()?;
        match StreamTag::from_value(tag) {
            Some(StreamTag::Nil) => Ok(None),
            Some(StreamTag::Ref) => self.read_reference(position),
            Some(StreamTag::Object) => self.read_new_object(flags, position),
            _ => {
                self.cursor = position;
                self.fail(SerializationError::BadTag {
                    expected: "obj, nil or ref",
                    found: tag,
                    position,
                })
            }
        }
    }

    /// Reads a body written by [`Encoder::write_inline`](crate::Encoder::write_inline) into
    /// `object`.
    pub fn read_inline(
        &mut self,
        object: &mut dyn Serializable,
        flags: SerializationFlags,
    ) -> SerializationResult<()> {
        self.check_poisoned()?;
        match object.read_body(self, flags) {
            Ok(()) => Ok(()),
            Err(error) => self.fail(error),
        }
    }

    /// Reads an external reference written by [`Encoder::write_ref`](crate::Encoder::write_ref).
    pub fn read_ref(&mut self) -> SerializationResult<Rc<dyn Any>> {
        let start = self.cursor;
        if self.config.tags_enabled {
            self.expect_tag(StreamTag::Ptr)?;
        }
        let id = match self.read_varint() {
            Ok(id) => id,
            Err(error) => return self.fail_at(start, error),
        };
        match self.context.externals.identity_of(id) {
            Some(identity) => Ok(identity),
            None => {
                self.cursor = start;
                self.fail(SerializationError::UnknownObject(format!(
                    "external reference id {} at byte {} was never registered",
                    id, start
                )))
            }
        }
    }

    fn read_reference(&mut self, position: usize) -> SerializationResult<Option<ObjectRef>> {
        let index = match self.read_varint() {
            Ok(index) => index,
            Err(error) => return self.fail_at(position, error),
        };
        match self.objects.get(index as usize) {
            Some(Some(object)) => Ok(Some(Rc::clone(object))),
            Some(None) => self.fail_at(
                position,
                SerializationError::SyncError(format!(
                    "reference at byte {} points to object {}, which was skipped",
                    position, index
                )),
            ),
            None => {
                let count = self.objects.len();
                self.fail_at(
                    position,
                    SerializationError::SyncError(format!(
                        "reference at byte {} points to object {} but only {} objects were read",
                        position, index, count
                    )),
                )
            }
        }
    }

    /// Class tag, registry check (tags enabled only) and a body length that fits the stream.
    fn read_object_header(&mut self) -> SerializationResult<(u32, Option<u16>, usize)> {
        let class_tag = self.read_u32()?;
        let check = if self.config.tags_enabled {
            Some(self.read_u16()?)
        } else {
            None
        };
        let length = self.read_varint()? as usize;
        let remaining = self.remaining();
        if length > remaining {
            return self.fail(SerializationError::OutOfData {
                needed: length,
                remaining,
                position: self.cursor,
            });
        }
        Ok((class_tag, check, length))
    }

    fn read_new_object(
        &mut self,
        flags: SerializationFlags,
        position: usize,
    ) -> SerializationResult<Option<ObjectRef>> {
        let (class_tag, check, length) = match self.read_object_header() {
            Ok(header) => header,
            Err(error) => return self.fail_at(position, error),
        };

        let instance = self.context.types.create(class_tag);
        let index = self.objects.len();
        self.objects.push(instance.clone());
        if let Some(check) = check {
            if check as usize != self.objects.len() {
                let count = self.objects.len();
                return self.fail_at(
                    position,
                    SerializationError::SyncError(format!(
                        "object at byte {} carries registry check {} but the reader holds {} objects",
                        position, check, count
                    )),
                );
            }
        }

        let Some(instance) = instance else {
            let diagnostic = SerializationError::UnknownObject(format!(
                "class tag {:#010x} at byte {} has no registered factory, skipped {} bytes",
                class_tag, position, length
            ));
            warn!("[DESERIALIZER] {}", diagnostic);
            self.diagnostics.push(diagnostic);
            self.cursor += length;
            self.reset_bools();
            return Ok(None);
        };

        debug!(
            "[DESERIALIZER] Reading object {} (class tag {:#010x}, {} body bytes)",
            index, class_tag, length
        );
        let body_start = self.cursor;
        self.reset_bools();
        let read = instance.borrow_mut().read_body(self, flags);
        self.reset_bools();
        if let Err(error) = read {
            return self.fail_at(position, error);
        }

        let consumed = self.cursor - body_start;
        if consumed != length {
            return self.fail_at(
                position,
                SerializationError::SyncError(format!(
                    "object {} (class tag {:#010x}) declared {} body bytes but read {}",
                    index, class_tag, length, consumed
                )),
            );
        }
        Ok(Some(instance))
    }

    //endregion
}
