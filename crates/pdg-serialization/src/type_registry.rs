use crate::serializable::{object_ref, ObjectRef, Serializable};
use ahash::AHashMap;
use std::fmt::{Debug, Formatter};
use tracing::warn;

type Factory = Box<dyn Fn() -> ObjectRef>;

/// Maps class tags to constructors, so a reader can rebuild the concrete type of every object
/// in a stream.
///
/// Register every type a stream may contain before decoding it. Objects whose tag has no
/// factory are skipped by the reader.
///
/// # Example
/// ```
/// use pdg_serialization::TypeRegistry;
/// # use pdg_serialization::{Deserializer, Encoder, Serializable, SerializationFlags, SerializationResult};
/// # use std::any::Any;
/// # #[derive(Default)]
/// # struct Marker;
/// # impl Serializable for Marker {
/// #     fn class_tag(&self) -> u32 { 0x4D4B5231 }
/// #     fn write_body(&self, _: &mut dyn Encoder, _: SerializationFlags) -> SerializationResult<()> { Ok(()) }
/// #     fn read_body(&mut self, _: &mut Deserializer<'_>, _: SerializationFlags) -> SerializationResult<()> { Ok(()) }
/// #     fn as_any(&self) -> &dyn Any { self }
/// #     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// # }
///
/// let mut registry = TypeRegistry::new();
/// registry.register_type::<Marker>();
/// assert!(registry.contains(0x4D4B5231));
///
/// let created = registry.create(0x4D4B5231).unwrap();
/// assert!(created.borrow().as_any().is::<Marker>());
/// ```
#[derive(Default)]
pub struct TypeRegistry {
    factories: AHashMap<u32, Factory>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor for `class_tag`, replacing (with a warning) any earlier one.
    pub fn register<F>(&mut self, class_tag: u32, factory: F)
    where
        F: Fn() -> ObjectRef + 'static,
    {
        if self.factories.insert(class_tag, Box::new(factory)).is_some() {
            warn!(
                "[REGISTRY] Replaced the factory registered for class tag {:#010x}",
                class_tag
            );
        }
    }

    /// Registers `T`, taking its class tag from `T::default()`.
    pub fn register_type<T: Serializable + Default>(&mut self) {
        let class_tag = T::default().class_tag();
        self.register(class_tag, || object_ref(T::default()));
    }

    pub fn contains(&self, class_tag: u32) -> bool {
        self.factories.contains_key(&class_tag)
    }

    /// A fresh instance for `class_tag`, or `None` if nothing is registered for it.
    pub fn create(&self, class_tag: u32) -> Option<ObjectRef> {
        self.factories.get(&class_tag).map(|factory| factory())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.factories.keys().copied().collect();
        tags.sort_unstable();
        f.debug_struct("TypeRegistry")
            .field("class_tags", &tags)
            .finish()
    }
}
