use crate::error::{SerializationError, SerializationResult};
use std::fmt::{Display, Formatter};
use std::ops::{BitAnd, BitOr, BitOrAssign};

//region Serialization Flags

/// Field selection bits passed unchanged to every `write_body`/`read_body` call.
///
/// The engine does not interpret them beyond [`SerializationFlags::is_micro_update`]. The named
/// constants are the assignments game entities agree on.
///
/// # Example
/// ```
/// use pdg_serialization::SerializationFlags;
///
/// let flags = SerializationFlags::POSITIONS | SerializationFlags::SIZES;
/// assert!(flags.contains(SerializationFlags::SIZES));
/// assert!(!flags.contains(SerializationFlags::MICRO));
/// assert!(SerializationFlags::UPDATE.contains(SerializationFlags::MICRO));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SerializationFlags(u32);

impl SerializationFlags {
    pub const NONE: SerializationFlags = SerializationFlags(0);

    pub const POSITIONS: SerializationFlags = SerializationFlags(1 << 0);
    pub const Z_ORDER: SerializationFlags = SerializationFlags(1 << 1);
    pub const SIZES: SerializationFlags = SerializationFlags(1 << 2);
    pub const ANIMATIONS: SerializationFlags = SerializationFlags(1 << 3);
    pub const MOTION: SerializationFlags = SerializationFlags(1 << 4);
    pub const FORCES: SerializationFlags = SerializationFlags(1 << 5);
    pub const PHYSICS: SerializationFlags = SerializationFlags(1 << 6);
    pub const LAYER_DRAW: SerializationFlags = SerializationFlags(1 << 7);
    pub const IMAGE_REFS: SerializationFlags = SerializationFlags(1 << 8);
    pub const SCML_REFS: SerializationFlags = SerializationFlags(1 << 9);
    pub const HELPER_REFS: SerializationFlags = SerializationFlags(1 << 10);
    pub const IMAGE_DATA: SerializationFlags = SerializationFlags(1 << 11);
    pub const SCML_DATA: SerializationFlags = SerializationFlags(1 << 12);
    pub const HELPER_OBJS: SerializationFlags = SerializationFlags(1 << 13);
    pub const INITIAL_DATA: SerializationFlags = SerializationFlags(1 << 14);

    /// Position and z-order only. Entities may switch to a fixed compact layout for it.
    pub const MICRO: SerializationFlags = SerializationFlags(Self::POSITIONS.0 | Self::Z_ORDER.0);
    /// Everything that changes from frame to frame.
    pub const UPDATE: SerializationFlags = SerializationFlags(
        Self::MICRO.0
            | Self::SIZES.0
            | Self::ANIMATIONS.0
            | Self::MOTION.0
            | Self::FORCES.0
            | Self::PHYSICS.0,
    );
    /// A complete snapshot, with shared resources sent by reference.
    pub const FULL: SerializationFlags = SerializationFlags(
        Self::UPDATE.0
            | Self::IMAGE_REFS.0
            | Self::SCML_REFS.0
            | Self::HELPER_REFS.0
            | Self::INITIAL_DATA.0,
    );

    pub const fn from_bits(bits: u32) -> Self {
        SerializationFlags(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True if every bit of `other` is set.
    pub const fn contains(self, other: SerializationFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// True if any bit of `other` is set.
    pub const fn intersects(self, other: SerializationFlags) -> bool {
        self.0 & other.0 != 0
    }

    /// True for exactly [`Self::MICRO`] or exactly [`Self::POSITIONS`].
    pub const fn is_micro_update(self) -> bool {
        self.0 == Self::MICRO.0 || self.0 == Self::POSITIONS.0
    }
}

impl BitOr for SerializationFlags {
    type Output = SerializationFlags;

    fn bitor(self, rhs: SerializationFlags) -> SerializationFlags {
        SerializationFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for SerializationFlags {
    fn bitor_assign(&mut self, rhs: SerializationFlags) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for SerializationFlags {
    type Output = SerializationFlags;

    fn bitand(self, rhs: SerializationFlags) -> SerializationFlags {
        SerializationFlags(self.0 & rhs.0)
    }
}

impl From<u32> for SerializationFlags {
    fn from(bits: u32) -> Self {
        SerializationFlags(bits)
    }
}

impl Display for SerializationFlags {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

//endregion

//region Float Fields

/// A run of up to 16 floats where only the non-zero ones are stored.
///
/// On the wire this is a 16 bit presence mask (bit `i` set means value `i` follows) and then the
/// present values in ascending index order.
///
/// # Example
/// ```
/// use pdg_serialization::FloatFields;
///
/// let fields = FloatFields::from_values(&[0.0, 2.5, 0.0, -1.0]).unwrap();
/// assert_eq!(fields.mask(), 0b1010);
/// assert_eq!(fields.present(), &[2.5, -1.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FloatFields {
    mask: u16,
    present: Vec<f32>,
}

impl FloatFields {
    pub const MAX_FIELDS: usize = 16;

    pub fn from_values(values: &[f32]) -> SerializationResult<Self> {
        if values.len() > Self::MAX_FIELDS {
            return Err(SerializationError::SyncError(format!(
                "a float field set holds at most {} values, got {}",
                Self::MAX_FIELDS,
                values.len()
            )));
        }
        let mut fields = FloatFields::default();
        for (index, value) in values.iter().enumerate() {
            if *value != 0.0 {
                fields.mask |= 1 << index;
                fields.present.push(*value);
            }
        }
        Ok(fields)
    }

    pub(crate) fn from_parts(mask: u16, present: Vec<f32>) -> Self {
        Self { mask, present }
    }

    pub fn mask(&self) -> u16 {
        self.mask
    }

    pub fn present(&self) -> &[f32] {
        &self.present
    }

    pub fn is_set(&self, index: usize) -> bool {
        index < Self::MAX_FIELDS && self.mask & (1 << index) != 0
    }

    /// Writes the values back into `out`. Indices without a stored value become zero.
    ///
    /// Fails if a stored value's index does not fit in `out`.
    pub fn expand_into(&self, out: &mut [f32]) -> SerializationResult<()> {
        out.iter_mut().for_each(|value| *value = 0.0);
        let mut present = self.present.iter();
        for index in 0..Self::MAX_FIELDS {
            if !self.is_set(index) {
                continue;
            }
            let (Some(slot), Some(value)) = (out.get_mut(index), present.next()) else {
                return Err(SerializationError::SyncError(format!(
                    "float field {} is present in the stream but only {} fields were expected",
                    index,
                    out.len()
                )));
            };
            *slot = *value;
        }
        Ok(())
    }
}

//endregion

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composites() {
        assert_eq!(SerializationFlags::MICRO.bits(), 0b11);
        assert_eq!(SerializationFlags::UPDATE.bits(), 0b111_1111);
        assert_eq!(SerializationFlags::FULL.bits(), 0b100_0111_0111_1111);
    }

    #[test]
    fn test_micro_update_is_exact() {
        assert!(SerializationFlags::MICRO.is_micro_update());
        assert!(SerializationFlags::POSITIONS.is_micro_update());
        assert!(!SerializationFlags::Z_ORDER.is_micro_update());
        assert!(!SerializationFlags::UPDATE.is_micro_update());
        assert!(!(SerializationFlags::MICRO | SerializationFlags::SIZES).is_micro_update());
    }

    #[test]
    fn test_float_fields_limit() {
        assert!(FloatFields::from_values(&[1.0; 16]).is_ok());
        assert!(FloatFields::from_values(&[1.0; 17]).is_err());
    }

    #[test]
    fn test_expand_into_rejects_short_output() {
        let fields = FloatFields::from_values(&[0.0, 0.0, 3.0]).unwrap();
        let mut out = [9.0f32; 2];
        assert!(fields.expand_into(&mut out).is_err());

        let mut out = [9.0f32; 4];
        fields.expand_into(&mut out).unwrap();
        assert_eq!(out, [0.0, 0.0, 3.0, 0.0]);
    }
}
