//! End to end tests: a small scene is snapshotted, inspected and kept in sync with micro
//! updates, the way a host and a client would use the crates together.

use pdg::config::load_config;
use pdg::prelude::*;
use pdg::serialization::class_tags;
use pdg::serialization::inspect::{scan_stream, UnitKind};
use std::any::Any;
use std::rc::Rc;

//region Scene Types

#[derive(Default)]
struct AnimationHelper {
    frames: u8,
    seconds_per_frame: f32,
}

impl Serializable for AnimationHelper {
    fn class_tag(&self) -> u32 {
        class_tags::ANIMATION_HELPER
    }

    fn write_body(&self, encoder: &mut dyn Encoder, _: SerializationFlags) -> SerializationResult<()> {
        encoder.write_u8(self.frames)?;
        encoder.write_f32(self.seconds_per_frame)
    }

    fn read_body(&mut self, decoder: &mut Deserializer<'_>, _: SerializationFlags) -> SerializationResult<()> {
        self.frames = decoder.read_u8()?;
        self.seconds_per_frame = decoder.read_f32()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
struct Actor {
    position: Point,
    facing: f32,
    frame: u8,
    image: Option<Rc<dyn Any>>,
    animation: Option<ObjectRef>,
    name: String,
}

impl Serializable for Actor {
    fn class_tag(&self) -> u32 {
        class_tags::SPRITE
    }

    fn write_body(&self, encoder: &mut dyn Encoder, flags: SerializationFlags) -> SerializationResult<()> {
        if flags.is_micro_update() {
            encoder.write_i16(self.position.x as i16)?;
            encoder.write_i16(self.position.y as i16)?;
            encoder.write_f32(self.facing)?;
            return encoder.write_u8(self.frame);
        }
        if flags.contains(SerializationFlags::POSITIONS) {
            encoder.write_point(&self.position)?;
        }
        if flags.contains(SerializationFlags::ANIMATIONS) {
            encoder.write_u8(self.frame)?;
            encoder.write_float_fields(&[self.facing])?;
            encoder.write_object(self.animation.as_ref(), flags)?;
        }
        if flags.contains(SerializationFlags::IMAGE_REFS) {
            encoder.write_bool(self.image.is_some())?;
            if let Some(image) = &self.image {
                encoder.write_ref(image)?;
            }
        }
        if flags.contains(SerializationFlags::INITIAL_DATA) {
            encoder.write_str(&self.name)?;
        }
        Ok(())
    }

    fn read_body(&mut self, decoder: &mut Deserializer<'_>, flags: SerializationFlags) -> SerializationResult<()> {
        if flags.is_micro_update() {
            let x = decoder.read_i16()?;
            let y = decoder.read_i16()?;
            self.position = Point::new(x as f32, y as f32);
            self.facing = decoder.read_f32()?;
            self.frame = decoder.read_u8()?;
            return Ok(());
        }
        if flags.contains(SerializationFlags::POSITIONS) {
            self.position = decoder.read_point()?;
        }
        if flags.contains(SerializationFlags::ANIMATIONS) {
            self.frame = decoder.read_u8()?;
            let mut facing = [0.0f32];
            decoder.read_float_fields(&mut facing)?;
            self.facing = facing[0];
            self.animation = decoder.read_object(flags)?;
        }
        if flags.contains(SerializationFlags::IMAGE_REFS) {
            self.image = if decoder.read_bool()? {
                Some(decoder.read_ref()?)
            } else {
                None
            };
        }
        if flags.contains(SerializationFlags::INITIAL_DATA) {
            self.name = decoder.read_str()?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
struct SpriteLayer {
    name: String,
    actors: Vec<ObjectRef>,
}

impl Serializable for SpriteLayer {
    fn class_tag(&self) -> u32 {
        class_tags::SPRITE_LAYER
    }

    fn write_body(&self, encoder: &mut dyn Encoder, flags: SerializationFlags) -> SerializationResult<()> {
        encoder.write_str(&self.name)?;
        encoder.write_varint(self.actors.len() as u32)?;
        for actor in &self.actors {
            encoder.write_object(Some(actor), flags)?;
        }
        Ok(())
    }

    fn read_body(&mut self, decoder: &mut Deserializer<'_>, flags: SerializationFlags) -> SerializationResult<()> {
        self.name = decoder.read_str()?;
        let count = decoder.read_varint()?;
        self.actors.clear();
        for _ in 0..count {
            if let Some(actor) = decoder.read_object(flags)? {
                self.actors.push(actor);
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

//endregion

//region Helpers

const HERO_TEXTURE: u32 = 1;
const SLIME_TEXTURE: u32 = 2;

struct Scene {
    context: SerializationContext,
    hero_texture: Rc<dyn Any>,
    slime_texture: Rc<dyn Any>,
    layer: ObjectRef,
}

fn build_scene() -> Scene {
    let hero_texture: Rc<dyn Any> = Rc::new(String::from("hero.png"));
    let slime_texture: Rc<dyn Any> = Rc::new(String::from("slime.png"));

    let mut context = SerializationContext::default();
    context.types.register_type::<SpriteLayer>();
    context.types.register_type::<Actor>();
    context.types.register_type::<AnimationHelper>();
    context
        .externals
        .register_identity(HERO_TEXTURE, Rc::clone(&hero_texture));
    context
        .externals
        .register_identity(SLIME_TEXTURE, Rc::clone(&slime_texture));

    let wobble = object_ref(AnimationHelper {
        frames: 4,
        seconds_per_frame: 0.25,
    });
    let hero = Actor {
        position: Point::new(10.0, 20.0),
        facing: 0.0,
        frame: 0,
        image: Some(Rc::clone(&hero_texture)),
        animation: None,
        name: "hero".to_string(),
    };
    let slimes = (0..2).map(|i| Actor {
        position: Point::new(100.0 + 16.0 * i as f32, 48.5),
        facing: 3.0,
        frame: i as u8,
        image: Some(Rc::clone(&slime_texture)),
        animation: Some(Rc::clone(&wobble)),
        name: format!("slime-{}", i),
    });

    let mut actors = vec![object_ref(hero)];
    actors.extend(slimes.map(object_ref));
    let layer = object_ref(SpriteLayer {
        name: "foreground".to_string(),
        actors,
    });

    Scene {
        context,
        hero_texture,
        slime_texture,
        layer,
    }
}

fn actors_of(layer: &ObjectRef) -> Vec<ObjectRef> {
    let layer = layer.borrow();
    layer
        .as_any()
        .downcast_ref::<SpriteLayer>()
        .expect("not a sprite layer")
        .actors
        .clone()
}

fn read_actor<R>(actor: &ObjectRef, read: impl FnOnce(&Actor) -> R) -> R {
    let actor = actor.borrow();
    read(actor.as_any().downcast_ref::<Actor>().expect("not an actor"))
}

//endregion

#[test]
fn test_full_snapshot_rebuilds_the_scene() {
    let scene = build_scene();
    let bytes = serialize_root(
        Some(&scene.layer),
        SerializationFlags::FULL,
        &scene.context,
        StreamConfig::default(),
    )
    .unwrap();

    let decoded = deserialize_root(&bytes, SerializationFlags::FULL, &scene.context, StreamConfig::default())
        .unwrap()
        .unwrap();
    let actors = actors_of(&decoded);
    assert_eq!(actors.len(), 3);

    read_actor(&actors[0], |hero| {
        assert_eq!(hero.name, "hero");
        assert_eq!(hero.position, Point::new(10.0, 20.0));
        assert!(hero.animation.is_none());
        assert!(Rc::ptr_eq(hero.image.as_ref().unwrap(), &scene.hero_texture));
    });

    let first = read_actor(&actors[1], |slime| slime.animation.clone()).unwrap();
    let second = read_actor(&actors[2], |slime| slime.animation.clone()).unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    read_actor(&actors[2], |slime| {
        assert_eq!(slime.name, "slime-1");
        assert_eq!(slime.position, Point::new(116.0, 48.5));
        assert_eq!(slime.facing, 3.0);
        assert!(Rc::ptr_eq(slime.image.as_ref().unwrap(), &scene.slime_texture));
    });
    let frames = first
        .borrow()
        .as_any()
        .downcast_ref::<AnimationHelper>()
        .map(|helper| helper.frames);
    assert_eq!(frames, Some(4));
}

#[test]
fn test_inspector_sees_one_layer() {
    let scene = build_scene();
    let bytes = serialize_root(
        Some(&scene.layer),
        SerializationFlags::FULL,
        &scene.context,
        StreamConfig::default(),
    )
    .unwrap();

    let report = scan_stream(&bytes, StreamConfig::default()).unwrap();
    assert_eq!(report.version, Some(1));
    assert_eq!(report.units.len(), 1);
    match report.units[0].kind {
        UnitKind::Object {
            class_tag,
            registry_check,
            body_len,
        } => {
            assert_eq!(class_tag, class_tags::SPRITE_LAYER);
            assert_eq!(registry_check, Some(1));
            assert!(body_len > 0);
        }
        ref other => panic!("expected an object, got {:?}", other),
    }
}

#[test]
fn test_micro_updates_keep_a_client_in_sync() {
    let host = build_scene();
    let snapshot = serialize_root(
        Some(&host.layer),
        SerializationFlags::FULL,
        &host.context,
        StreamConfig::default(),
    )
    .unwrap();
    let client_layer = deserialize_root(&snapshot, SerializationFlags::FULL, &host.context, StreamConfig::default())
        .unwrap()
        .unwrap();

    let host_actors = actors_of(&host.layer);
    for (step, actor) in host_actors.iter().enumerate() {
        let mut borrowed = actor.borrow_mut();
        let actor = borrowed.as_any_mut().downcast_mut::<Actor>().unwrap();
        actor.position = Point::new(actor.position.x + 5.0, actor.position.y - 2.0);
        actor.frame = step as u8 + 7;
    }

    let config = StreamConfig::untagged();
    let mut update = Serializer::new(&host.context, config).unwrap();
    for actor in &host_actors {
        update
            .write_inline(&*actor.borrow(), SerializationFlags::MICRO)
            .unwrap();
    }
    let update = update.into_bytes().unwrap();
    assert_eq!(update.len(), host_actors.len() * 9);

    let client_actors = actors_of(&client_layer);
    let mut reader = Deserializer::new(&update, &host.context, config).unwrap();
    for actor in &client_actors {
        reader
            .read_inline(&mut *actor.borrow_mut(), SerializationFlags::MICRO)
            .unwrap();
    }
    assert!(reader.is_at_end());

    read_actor(&client_actors[0], |hero| {
        assert_eq!(hero.position, Point::new(15.0, 18.0));
        assert_eq!(hero.frame, 7);
        assert_eq!(hero.name, "hero");
    });
    read_actor(&client_actors[2], |slime| {
        // micro updates carry whole units only
        assert_eq!(slime.position, Point::new(121.0, 46.0));
        assert_eq!(slime.frame, 9);
    });
}

#[test]
fn test_update_snapshot_is_smaller_and_sized_exactly() {
    let scene = build_scene();
    let mut serializer = Serializer::new(&scene.context, StreamConfig::default()).unwrap();
    let predicted = serializer
        .serialized_size(Some(&scene.layer), SerializationFlags::UPDATE)
        .unwrap();
    serializer
        .write_object(Some(&scene.layer), SerializationFlags::UPDATE)
        .unwrap();
    let update = serializer.into_bytes().unwrap();
    assert_eq!(update.len(), 4 + predicted);

    let full = serialize_root(
        Some(&scene.layer),
        SerializationFlags::FULL,
        &scene.context,
        StreamConfig::default(),
    )
    .unwrap();
    assert!(update.len() < full.len());
}

#[test]
fn test_configuration_file_selects_the_layout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pdg_serialization.toml");
    std::fs::write(
        &path,
        "[stream]\ntags_enabled = false\nblock_size = 64\nerror_mode = \"log_and_default\"\n",
    )
    .unwrap();
    let config = load_config(Some(path.as_path()), None).unwrap().stream;
    assert!(!config.tags_enabled);
    assert_eq!(config.error_mode, ErrorMode::LogAndDefault);

    let scene = build_scene();
    let untagged = serialize_root(Some(&scene.layer), SerializationFlags::FULL, &scene.context, config).unwrap();
    let tagged = serialize_root(
        Some(&scene.layer),
        SerializationFlags::FULL,
        &scene.context,
        StreamConfig::default(),
    )
    .unwrap();
    assert!(untagged.len() < tagged.len());

    let decoded = deserialize_root(&untagged, SerializationFlags::FULL, &scene.context, config).unwrap();
    assert_eq!(actors_of(&decoded.unwrap()).len(), 3);

    // Reading with the wrong layout fails loudly, or quietly under log-and-default
    assert!(matches!(
        deserialize_root(&untagged, SerializationFlags::FULL, &scene.context, StreamConfig::default()),
        Err(SerializationError::BadTag { .. })
    ));
    let lenient_tagged = StreamConfig {
        tags_enabled: true,
        ..config
    };
    assert!(deserialize_root(&untagged, SerializationFlags::FULL, &scene.context, lenient_tagged)
        .unwrap()
        .is_none());
}
