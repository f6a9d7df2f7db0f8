//! End-to-end scenarios over the voxel model and the streaming world.

use std::{collections::HashSet, sync::Arc};

use cgmath::Point3;
use voxel_streaming::{
    config::WorldConfig,
    engine_state::{
        streaming::partition::SlotState,
        voxels::{
            block::{block_type::BlockType, BlockRegistry},
            chunk::CHUNK_HEIGHT,
            terrain::{biome::BiomeTable, TerrainGenerator},
        },
        World,
    },
    error::WorldError,
    ChunkCoord, WorldModel,
};
use web_time::Duration;

const FLAT_BIOME: &str = r#"{"biomes": [{
    "name": "plains", "temperature": 0.0, "min_height": 60, "max_height": 80,
    "top_block": "grass", "middle_block": "dirt", "bottom_block": "stone"
}]}"#;

const SHALLOW_BIOME: &str = r#"{"biomes": [{
    "name": "shore", "temperature": 0.0, "min_height": 2, "max_height": 5,
    "top_block": "sand", "middle_block": "sand", "bottom_block": "stone",
    "ore_veins": [{
        "block": "gold_ore", "mask": ["top"], "min_height": 0, "max_height": 5,
        "frequency": 0.0, "algorithm": "perlin2d", "threshold_curve": [[0.0, 0.0], [1.0, 0.0]]
    }]
}]}"#;

fn model(biomes: &str) -> WorldModel {
    let table = Arc::new(BiomeTable::from_json(biomes).unwrap());
    WorldModel::new(
        Arc::new(TerrainGenerator::new(11, table)),
        Arc::new(BlockRegistry::default()),
    )
}

fn around(center: ChunkCoord) -> Vec<ChunkCoord> {
    (-1..=1)
        .flat_map(|dz| (-1..=1).map(move |dx| center.offset(dx, dz)))
        .collect()
}

fn small_world() -> World {
    let config = WorldConfig {
        view_radius: 2,
        worker_count: 2,
        max_renders_per_tick: 4,
        ..WorldConfig::default()
    };
    World::with_defaults(config).unwrap()
}

#[test]
fn single_biome_heights_stay_in_range() {
    let world = model(FLAT_BIOME);
    let generator = world.generator();
    for x in (-300..300).step_by(7) {
        for z in (-300..300).step_by(13) {
            let sample = generator.classify(x, z);
            assert_eq!(sample.biome_index, 0);
            assert!((60..80).contains(&sample.terrain_height));
        }
    }
}

#[test]
fn bottom_layer_is_bedrock() {
    let mut world = model(FLAT_BIOME);
    world.materialize(&around(ChunkCoord::new(0, 0)));
    for x in -16..32 {
        assert_eq!(world.get_voxel(x, 0, x / 2), BlockType::BEDROCK.id());
        assert!(world.check_solid_at_world_position(x, 0, -x / 3));
    }
    assert_eq!(world.get_voxel(0, CHUNK_HEIGHT as i32, 0), BlockType::AIR.id());
}

#[test]
fn top_vein_replaces_every_shallow_surface_voxel() {
    let mut world = model(SHALLOW_BIOME);
    let coord = ChunkCoord::new(2, -3);
    world.materialize(&[coord]);
    let generator = world.generator();
    let origin = coord.world_origin();

    for x in origin.x..origin.x + 16 {
        for z in origin.z..origin.z + 16 {
            let height = generator.classify(x, z).terrain_height as i32;
            assert!((2..5).contains(&height));
            assert_eq!(world.get_voxel(x, height - 1, z), BlockType::GOLD_ORE.id());
            assert_eq!(world.get_voxel(x, height, z), BlockType::AIR.id());
            if height > 2 {
                assert_ne!(world.get_voxel(x, height - 2, z), BlockType::GOLD_ORE.id());
            }
        }
    }
}

#[test]
fn edits_touch_the_neighbours_that_see_them() {
    let mut world = model(FLAT_BIOME);
    world.materialize(&around(ChunkCoord::new(0, 0)));
    let stone = BlockType::STONE.id();

    let inner = world.edit_voxel(Point3::new(5, 90, 5), stone).unwrap();
    assert_eq!(inner, vec![ChunkCoord::new(0, 0)]);

    let edge = world.edit_voxel(Point3::new(0, 90, 7), stone).unwrap();
    assert_eq!(edge, vec![ChunkCoord::new(0, 0), ChunkCoord::new(-1, 0)]);

    let origin_corner = world.edit_voxel(Point3::new(0, 90, 0), stone).unwrap();
    assert_eq!(
        origin_corner,
        vec![
            ChunkCoord::new(0, 0),
            ChunkCoord::new(-1, 0),
            ChunkCoord::new(0, -1),
            ChunkCoord::new(-1, -1)
        ]
    );

    let corner: HashSet<ChunkCoord> = world
        .edit_voxel(Point3::new(15, 90, 15), stone)
        .unwrap()
        .into_iter()
        .collect();
    let expected: HashSet<ChunkCoord> = [(0, 0), (1, 0), (0, 1), (1, 1)]
        .into_iter()
        .map(|(x, z)| ChunkCoord::new(x, z))
        .collect();
    assert_eq!(corner, expected);

    assert_eq!(world.get_voxel(15, 90, 15), stone);
    assert_eq!(world.edited_chunk_count(), 1);
    assert!(matches!(
        world.edit_voxel(Point3::new(3, 0, 3), BlockType::AIR.id()),
        Err(WorldError::ImmutableBedrock)
    ));
    assert!(matches!(
        world.edit_voxel(Point3::new(100, 50, 100), stone),
        Err(WorldError::NotMaterialized(_))
    ));
}

#[test]
fn materialize_is_idempotent_and_keeps_edits() {
    let mut world = model(FLAT_BIOME);
    let coords = around(ChunkCoord::new(-4, 9));
    world.materialize(&coords);
    world
        .edit_voxel(Point3::new(-60, 100, 150), BlockType::GLASS.id())
        .unwrap();
    let before: Vec<Vec<u8>> = coords
        .iter()
        .map(|coord| world.chunk(*coord).unwrap().as_slice().to_vec())
        .collect();

    world.materialize(&coords);
    assert_eq!(world.materialized_count(), coords.len());
    for (coord, voxels) in coords.iter().zip(&before) {
        assert_eq!(world.chunk(*coord).unwrap().as_slice(), voxels.as_slice());
    }

    world.evict(&coords);
    assert_eq!(world.materialized_count(), 0);
    world.materialize(&coords);
    assert_eq!(world.get_voxel(-60, 100, 150), BlockType::GLASS.id());
}

#[test]
fn saved_edits_survive_a_fresh_world() {
    let mut world = model(FLAT_BIOME);
    world.materialize(&around(ChunkCoord::new(0, 0)));
    world
        .edit_voxel(Point3::new(-1, 120, 3), BlockType::WOOD.id())
        .unwrap();
    let blob = world.serialize();

    let mut restored = model(FLAT_BIOME);
    restored.materialize(&around(ChunkCoord::new(0, 0)));
    restored.deserialize(&blob).unwrap();
    assert_eq!(restored.get_voxel(-1, 120, 3), BlockType::WOOD.id());
    assert!(restored.deserialize(&blob[..blob.len() - 1]).is_err());
    assert_eq!(restored.get_voxel(-1, 120, 3), BlockType::WOOD.id());
}

#[test]
fn streaming_world_settles_around_the_observer() {
    let mut world = small_world();
    world.set_observer_position(Point3::new(8.0, 90.0, 8.0));
    assert!(world.wait_until_idle(Duration::from_secs(60)));

    let stats = world.stats();
    assert_eq!(stats.observer, Some(ChunkCoord::new(0, 0)));
    assert!(stats.visible > 0);
    assert_eq!(world.meshes().len(), stats.visible);
    assert_eq!(stats.pool.rendered, stats.visible);
    assert!(stats.faces > 0);
    world.check_invariants().unwrap();

    for offset in world.bounds().render().generation_region().to_vec() {
        assert!(world.is_visible(offset));
        assert_eq!(world.chunk_state(offset), Some(SlotState::Rendered));
        assert!(world.world_model().is_materialized(offset));
    }

    world.set_observer_position(Point3::new(8.0 + 16.0 * 3.0, 90.0, 8.0 - 16.0));
    assert!(world.wait_until_idle(Duration::from_secs(60)));
    let center = ChunkCoord::new(3, -1);
    assert_eq!(world.observer(), Some(center));
    for offset in world.bounds().render().generation_region().to_vec() {
        assert_eq!(world.chunk_state(center + offset), Some(SlotState::Rendered));
    }
    assert!(!world.is_visible(ChunkCoord::new(-2, 2)));
    assert_eq!(world.meshes().len(), world.stats().visible);
    world.check_invariants().unwrap();
}

#[test]
fn long_jumps_resync_both_tiers() {
    let mut world = small_world();
    world.set_observer_position(Point3::new(0.0, 90.0, 0.0));
    assert!(world.wait_until_idle(Duration::from_secs(60)));

    world.set_observer_position(Point3::new(16.0 * 500.0, 90.0, -16.0 * 500.0));
    assert!(world.wait_until_idle(Duration::from_secs(60)));

    let center = ChunkCoord::new(500, -500);
    assert!(!world.world_model().is_materialized(ChunkCoord::new(0, 0)));
    for offset in world.bounds().data().generation_region() {
        assert!(world.world_model().is_materialized(center + *offset));
    }
    assert_eq!(world.meshes().len(), world.stats().visible);
    world.check_invariants().unwrap();
}

#[test]
fn edits_rerender_the_visible_chunk() {
    let mut world = small_world();
    world.set_observer_position(Point3::new(8.0, 90.0, 8.0));
    assert!(world.wait_until_idle(Duration::from_secs(60)));
    let faces_before = world.stats().faces;

    let affected = world
        .edit_voxel(Point3::new(8, 125, 8), BlockType::STONE.id())
        .unwrap();
    assert_eq!(affected, vec![ChunkCoord::new(0, 0)]);
    assert!(world.wait_until_idle(Duration::from_secs(60)));

    assert_eq!(world.stats().faces, faces_before + 6);
    assert_eq!(world.world_model().get_voxel(8, 125, 8), BlockType::STONE.id());
}

fn border_faces(world: &World, coord: ChunkCoord) -> usize {
    let mesh = world
        .meshes()
        .iter()
        .find(|mesh| mesh.coord() == Some(coord))
        .unwrap()
        .mesh();
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .filter(|(position, normal)| **normal == [1.0, 0.0, 0.0] && position[0] == 16.0)
        .count()
        / 4
}

#[test]
fn edge_chunks_are_meshed_against_real_neighbours() {
    let config = WorldConfig {
        view_radius: 1,
        data_lookahead: 0,
        worker_count: 2,
        ..WorldConfig::default()
    };
    let mut world = World::with_defaults(config).unwrap();
    world.set_observer_position(Point3::new(8.0, 90.0, 8.0));
    assert!(world.wait_until_idle(Duration::from_secs(60)));

    for offset in world.bounds().render().generation_region().to_vec() {
        for neighbour in around(offset) {
            assert!(
                world.world_model().is_materialized(neighbour),
                "{} is missing from the cluster of {}",
                neighbour,
                offset
            );
        }
    }

    let model = world.world_model();
    let registry = world.registry();
    let mut expected = 0;
    for y in 0..CHUNK_HEIGHT as i32 {
        for z in 0..16 {
            let inside = model.get_voxel(31, y, z);
            let outside = model.get_voxel(32, y, z);
            if inside != BlockType::AIR.id() && registry.is_transparent(outside) {
                expected += 1;
            }
        }
    }
    assert_eq!(border_faces(&world, ChunkCoord::new(1, 0)), expected);
}

/// Ticks once at `position` and returns the chunks whose pipelines started.
fn start_renders(world: &mut World, position: Point3<f32>) -> Vec<ChunkCoord> {
    world.set_observer_position(position);
    world.tick();
    let center = world.observer().unwrap();
    world
        .bounds()
        .render()
        .generation_region()
        .iter()
        .map(|offset| center + *offset)
        .filter(|coord| world.chunk_state(*coord) == Some(SlotState::InFlight))
        .collect()
}

fn eager_world() -> World {
    let config = WorldConfig {
        view_radius: 2,
        worker_count: 1,
        max_renders_per_tick: 64,
        ..WorldConfig::default()
    };
    World::with_defaults(config).unwrap()
}

#[test]
fn chunks_leaving_mid_render_finish_before_release() {
    let mut world = eager_world();
    let started = start_renders(&mut world, Point3::new(8.0, 90.0, 8.0));
    assert!(!started.is_empty());

    world.set_observer_position(Point3::new(16.0 * 300.0, 90.0, 8.0));
    world.tick();
    let stats = world.stats();
    assert!(stats.deferred_removals > 0);
    for coord in &started {
        assert!(!world.is_visible(*coord));
        assert!(world.chunk_state(*coord).is_some());
    }
    world.check_invariants().unwrap();

    assert!(world.wait_until_idle(Duration::from_secs(60)));
    for coord in &started {
        assert_eq!(world.chunk_state(*coord), None);
    }
    assert_eq!(world.stats().deferred_removals, 0);
    assert_eq!(world.meshes().len(), world.stats().visible);
    world.check_invariants().unwrap();
}

#[test]
fn chunks_returning_mid_render_keep_their_slot() {
    let mut world = eager_world();
    let home = Point3::new(8.0, 90.0, 8.0);
    let started = start_renders(&mut world, home);
    assert!(!started.is_empty());

    world.set_observer_position(Point3::new(16.0 * 300.0, 90.0, 8.0));
    world.tick();
    assert!(world.stats().deferred_removals > 0);

    world.set_observer_position(home);
    world.tick();
    for coord in &started {
        assert!(world.is_visible(*coord));
        assert!(world.chunk_state(*coord).is_some());
    }

    assert!(world.wait_until_idle(Duration::from_secs(60)));
    for coord in &started {
        assert_eq!(world.chunk_state(*coord), Some(SlotState::Rendered));
        assert!(world.meshes().iter().any(|mesh| mesh.coord() == Some(*coord)));
    }
    assert_eq!(world.stats().deferred_removals, 0);
    assert_eq!(world.meshes().len(), world.stats().visible);
    world.check_invariants().unwrap();
}
