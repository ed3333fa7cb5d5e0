//! Payload vocabulary shared by the integration suites: a small
//! entity-spawning subsystem and an asset-streaming subsystem.

use std::any::Any;

use axon_core::{category, ClassId, Named, Payload};

pub const SOURCE_ENTITY: u16 = 1;
pub const SOURCE_ASSETS: u16 = 2;

pub const CREATE_ENTITY: ClassId = ClassId::new(category::COMMAND, SOURCE_ENTITY, 1);
pub const ENTITY_CREATED: ClassId = ClassId::new(category::RESULT, SOURCE_ENTITY, 1);
pub const ENTITY_MOVED: ClassId = ClassId::new(category::EVENT, SOURCE_ENTITY, 2);
pub const LOAD_ASSET: ClassId = ClassId::new(category::COMMAND, SOURCE_ASSETS, 1);
pub const ASSET_LOADED: ClassId = ClassId::new(category::RESULT, SOURCE_ASSETS, 1);

macro_rules! test_payload {
    ($payload:ident, $class:expr) => {
        impl Named for $payload {
            fn name(&self) -> &'static str {
                stringify!($payload)
            }
        }

        impl Payload for $payload {
            fn class_id(&self) -> ClassId {
                $class
            }

            fn clone_payload(&self) -> Box<dyn Payload> {
                Box::new(self.clone())
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }
    };
}

#[derive(Clone, Debug)]
pub struct CreateEntity {
    pub archetype: String,
}
test_payload!(CreateEntity, CREATE_ENTITY);

#[derive(Clone, Debug)]
pub struct EntityCreated {
    pub entity_id: u32,
}
test_payload!(EntityCreated, ENTITY_CREATED);

#[derive(Clone, Debug)]
pub struct EntityMoved {
    pub entity_id: u32,
    pub x: i32,
    pub y: i32,
}
test_payload!(EntityMoved, ENTITY_MOVED);

#[derive(Clone, Debug)]
pub struct LoadAsset {
    pub path: String,
}
test_payload!(LoadAsset, LOAD_ASSET);

#[derive(Clone, Debug)]
pub struct AssetLoaded {
    pub path: String,
    pub byte_count: usize,
}
test_payload!(AssetLoaded, ASSET_LOADED);
