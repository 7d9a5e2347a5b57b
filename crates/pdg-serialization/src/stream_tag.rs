use std::fmt::{Display, Formatter};

/// First byte of a 3-byte varint.
pub const VARINT_U16_ESCAPE: u8 = 254;

/// First byte of a 5-byte varint.
pub const VARINT_U32_ESCAPE: u8 = 255;

pub use pdg_config::CURRENT_STREAM_VERSION;

/// Three byte markers that identify the kind of the next unit in a stream.
///
/// The object markers ([`StreamTag::Object`], [`StreamTag::Nil`], [`StreamTag::Ref`]) are always
/// written. The others only appear in streams with tags enabled.
///
/// # Example
/// ```
/// use pdg_serialization::StreamTag;
///
/// assert_eq!(StreamTag::Object.value(), 0x6F626A);
/// assert_eq!(StreamTag::from_value(0x6E696C), Some(StreamTag::Nil));
/// assert_eq!(StreamTag::from_value(0x123456), None);
/// ```
#[repr(u32)]
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
pub enum StreamTag {
    /// A full object: class tag, optional registry check, length, body.
    Object = 0x6F626A,
    /// An absent object.
    Nil = 0x6E696C,
    /// A back reference to an object already in the stream.
    Ref = 0x726566,
    /// A length prefixed UTF-8 string.
    Str = 0x737472,
    /// A length prefixed byte blob.
    Mem = 0x6D656D,
    /// An externally registered identity.
    Ptr = 0x707472,
    /// Start of stream, followed by the version byte.
    Stream = 0x706467,
}

impl StreamTag {
    pub const ALL: [StreamTag; 7] = [
        StreamTag::Object,
        StreamTag::Nil,
        StreamTag::Ref,
        StreamTag::Str,
        StreamTag::Mem,
        StreamTag::Ptr,
        StreamTag::Stream,
    ];

    pub const fn value(self) -> u32 {
        self as u32
    }

    pub fn from_value(value: u32) -> Option<StreamTag> {
        Self::ALL.into_iter().find(|tag| tag.value() == value)
    }

    /// The three letter name the tag value spells.
    pub const fn name(self) -> &'static str {
        match self {
            StreamTag::Object => "obj",
            StreamTag::Nil => "nil",
            StreamTag::Ref => "ref",
            StreamTag::Str => "str",
            StreamTag::Mem => "mem",
            StreamTag::Ptr => "ptr",
            StreamTag::Stream => "pdg",
        }
    }
}

impl Display for StreamTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Number of bytes a varint takes for `value`.
pub const fn varint_len(value: u32) -> usize {
    if value < VARINT_U16_ESCAPE as u32 {
        1
    } else if value <= u16::MAX as u32 {
        3
    } else {
        5
    }
}

/// Class tags of the framework's own serializable types.
///
/// Everything from [`class_tags::RESERVED_BASE`] upwards is reserved, so game code must pick
/// tags below it.
pub mod class_tags {
    pub const RESERVED_BASE: u32 = 0xFFFF_FF00;

    pub const SPRITE: u32 = 0xFFFF_FF01;
    pub const SPRITE_LAYER: u32 = 0xFFFF_FF02;
    pub const TILE_LAYER: u32 = 0xFFFF_FF03;
    pub const ANIMATED: u32 = 0xFFFF_FF04;
    pub const ANIMATION_HELPER: u32 = 0xFFFF_FF05;
    pub const COLLISION_HELPER: u32 = 0xFFFF_FF06;
    pub const DRAW_HELPER: u32 = 0xFFFF_FF07;
    pub const IMAGE: u32 = 0xFFFF_FF08;

    pub const ACTION: u32 = 0xFFFF_FF10;
    pub const REQUEST: u32 = 0xFFFF_FF11;
    pub const UPDATE: u32 = 0xFFFF_FF12;

    pub const SCENARIO_INFO: u32 = 0xFFFF_FF20;
    pub const GAME_INFO: u32 = 0xFFFF_FF21;
    pub const PLAYER_INFO: u32 = 0xFFFF_FF22;
    pub const AI_INFO: u32 = 0xFFFF_FF23;
    pub const GAME_ENGINE: u32 = 0xFFFF_FF24;

    pub const fn is_reserved(class_tag: u32) -> bool {
        class_tag >= RESERVED_BASE
    }
}
