use crate::serializable::{identity_of, ObjectRef};
use crate::type_registry::TypeRegistry;
use ahash::AHashMap;
use std::any::Any;
use std::rc::Rc;

//region Object Table

/// Objects already written in one pass, in stream order.
///
/// Holding the handles keeps their addresses from being reused while the pass runs.
#[derive(Default)]
pub(crate) struct ObjectTable {
    objects: Vec<ObjectRef>,
    index_by_identity: AHashMap<usize, u32>,
}

impl ObjectTable {
    pub(crate) fn find(&self, object: &ObjectRef) -> Option<u32> {
        self.index_by_identity.get(&identity_of(object)).copied()
    }

    /// Appends `object` and returns its index.
    pub(crate) fn insert(&mut self, object: &ObjectRef) -> u32 {
        let index = self.objects.len() as u32;
        self.objects.push(Rc::clone(object));
        self.index_by_identity.insert(identity_of(object), index);
        index
    }

    pub(crate) fn len(&self) -> usize {
        self.objects.len()
    }
}

//endregion

//region External References

/// Identities that live outside the stream (textures, sounds, ...) referenced by small ids.
///
/// Both ends register the same identities under the same ids before a stream is written or
/// read; the stream only carries the id.
///
/// # Example
/// ```
/// use pdg_serialization::ExternalReferences;
/// use std::any::Any;
/// use std::rc::Rc;
///
/// let texture: Rc<dyn Any> = Rc::new(String::from("grass.png"));
/// let mut externals = ExternalReferences::new();
/// externals.register_identity(7, Rc::clone(&texture));
///
/// assert_eq!(externals.id_of(&texture), Some(7));
/// assert!(Rc::ptr_eq(&externals.identity_of(7).unwrap(), &texture));
/// ```
#[derive(Default)]
pub struct ExternalReferences {
    identity_by_id: AHashMap<u32, Rc<dyn Any>>,
    id_by_identity: AHashMap<usize, u32>,
}

impl ExternalReferences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `identity` under `id`.
    ///
    /// Re-registering an id replaces its identity, and registering an identity under a new id
    /// moves it there.
    pub fn register_identity(&mut self, id: u32, identity: Rc<dyn Any>) {
        let key = identity_of(&identity);
        if let Some(previous) = self.identity_by_id.remove(&id) {
            self.id_by_identity.remove(&identity_of(&previous));
        }
        if let Some(previous_id) = self.id_by_identity.insert(key, id) {
            if previous_id != id {
                self.identity_by_id.remove(&previous_id);
            }
        }
        self.identity_by_id.insert(id, identity);
    }

    pub fn id_of(&self, identity: &Rc<dyn Any>) -> Option<u32> {
        self.id_by_identity.get(&identity_of(identity)).copied()
    }

    pub fn identity_of(&self, id: u32) -> Option<Rc<dyn Any>> {
        self.identity_by_id.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.identity_by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identity_by_id.is_empty()
    }
}

//endregion

/// The registries an engine consults. Build one at startup and lend it to every
/// [`Serializer`](crate::Serializer) and [`Deserializer`](crate::Deserializer).
#[derive(Default)]
pub struct SerializationContext {
    pub types: TypeRegistry,
    pub externals: ExternalReferences,
}

impl SerializationContext {
    pub fn new(types: TypeRegistry) -> Self {
        Self {
            types,
            externals: ExternalReferences::new(),
        }
    }
}
