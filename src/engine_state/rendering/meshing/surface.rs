//! Surface extraction for the centre chunk of a cluster.
//!
//! Every non-empty voxel of the centre chunk emits one quad per face whose
//! neighbour is see-through. Neighbours may lie in the surrounding chunks of the
//! cluster. Below the world counts as opaque and above it as open sky.

use cgmath::Point3;

use crate::engine_state::voxels::{
    block::{block_side::BlockSide, block_type::BlockType, BlockRegistry, VoxelId},
    chunk::{
        center_to_cluster, chunk_iteration::ChunkColumnIterator, cluster_index, CHUNK_HEIGHT,
    },
};

use super::mesh::{
    face::{corner_offset, corner_position, face_normal},
    MeshData,
};

/// Read-only view of a lit cluster.
pub struct LitCluster<'a> {
    /// Cluster voxels, indexed by [`cluster_index`]
    pub voxels: &'a [VoxelId],
    /// Cluster light levels, same indexing
    pub light: &'a [f32],
    /// Block properties
    pub registry: &'a BlockRegistry,
}

impl LitCluster<'_> {
    /// Voxel at cluster coordinates, `None` below the world, air above it.
    #[inline]
    fn voxel(&self, x: i32, y: i32, z: i32) -> Option<VoxelId> {
        if y < 0 {
            return None;
        }
        if y >= CHUNK_HEIGHT as i32 {
            return Some(BlockType::AIR.id());
        }
        Some(self.voxels[cluster_index(x as usize, y as usize, z as usize)])
    }

    /// Light at cluster coordinates: full above the world, none below it.
    #[inline]
    fn light(&self, x: i32, y: i32, z: i32) -> f32 {
        if y >= CHUNK_HEIGHT as i32 {
            return 1.0;
        }
        if y < 0 {
            return 0.0;
        }
        self.light[cluster_index(x as usize, y as usize, z as usize)]
    }

    /// Whether a face looking at `(x, y, z)` is visible.
    #[inline]
    fn is_open(&self, x: i32, y: i32, z: i32) -> bool {
        self.voxel(x, y, z)
            .map_or(false, |id| self.registry.is_transparent(id))
    }
}

/// Light of one face corner.
///
/// Flat shading reads the face neighbour only. Smooth shading averages it with
/// the two edge cells and the corner cell around the vertex.
fn corner_light(
    cluster: &LitCluster,
    neighbour: [i32; 3],
    side: BlockSide,
    corner: usize,
    smooth: bool,
) -> f32 {
    let [nx, ny, nz] = neighbour;
    let direct = cluster.light(nx, ny, nz);
    if !smooth {
        return direct;
    }

    let offset = corner_offset(side, corner);
    let mut tangents = [[0i32; 3]; 2];
    let mut slot = 0;
    for axis in 0..3 {
        if axis == side.axis() {
            continue;
        }
        tangents[slot][axis] = if offset[axis] == 1 { 1 } else { -1 };
        slot += 1;
    }

    let [a, b] = tangents;
    let edge_a = cluster.light(nx + a[0], ny + a[1], nz + a[2]);
    let edge_b = cluster.light(nx + b[0], ny + b[1], nz + b[2]);
    let diagonal = cluster.light(nx + a[0] + b[0], ny + a[1] + b[1], nz + a[2] + b[2]);

    (direct + edge_a + edge_b + diagonal) * 0.25
}

/// Emits the visible faces of the centre chunk into `out` (cleared first).
///
/// Columns are walked top to bottom. Returns the number of emitted faces.
pub fn extract_surface(cluster: &LitCluster, smooth_lighting: bool, out: &mut MeshData) -> usize {
    out.clear();
    let air = BlockType::AIR.id();
    let unset = BlockType::UNSET.id();

    for (local, _) in ChunkColumnIterator::new() {
        let (cx, cz) = center_to_cluster(local.x, local.z);
        let (cx, cy, cz) = (cx as i32, local.y as i32, cz as i32);
        let Some(id) = cluster.voxel(cx, cy, cz) else {
            continue;
        };
        if id == air || id == unset {
            continue;
        }

        for side in BlockSide::all() {
            let normal = side.normal();
            let neighbour = [cx + normal.x, cy + normal.y, cz + normal.z];
            if !cluster.is_open(neighbour[0], neighbour[1], neighbour[2]) {
                continue;
            }

            let corners: [Point3<f32>; 4] =
                [0, 1, 2, 3].map(|corner| corner_position(local, side, corner));
            let light = [0, 1, 2, 3]
                .map(|corner| corner_light(cluster, neighbour, side, corner, smooth_lighting));
            out.push_quad(
                corners,
                face_normal(side),
                cluster.registry.uv_quad(id, side),
                light,
            );
        }
    }

    out.face_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::meshing::light::propagate_light,
        voxels::chunk::{CHUNK_SIZE, CLUSTER_SIZE, CLUSTER_VOLUME},
    };

    fn lit(voxels: &[VoxelId], registry: &BlockRegistry) -> Vec<f32> {
        let mut light = vec![0.0; CLUSTER_VOLUME];
        propagate_light(voxels, &mut light, registry);
        light
    }

    #[test]
    fn single_block_in_open_air_has_six_faces() {
        let registry = BlockRegistry::default();
        let mut voxels = vec![BlockType::AIR.id(); CLUSTER_VOLUME];
        voxels[cluster_index(CHUNK_SIZE + 3, 40, CHUNK_SIZE + 7)] = BlockType::DIRT.id();
        let light = lit(&voxels, &registry);
        let cluster = LitCluster {
            voxels: &voxels,
            light: &light,
            registry: &registry,
        };

        let mut mesh = MeshData::new();
        assert_eq!(extract_surface(&cluster, false, &mut mesh), 6);
        assert_eq!(mesh.vertex_count(), 24);
        assert_eq!(mesh.index_count(), 36);
        assert!(mesh.positions.iter().all(|p| {
            (3.0..=4.0).contains(&p[0]) && (40.0..=41.0).contains(&p[1]) && (7.0..=8.0).contains(&p[2])
        }));
        // The top face sees the open sky.
        let top = mesh.normals.iter().position(|n| *n == [0.0, 1.0, 0.0]).unwrap();
        assert_eq!(mesh.colors[top], [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn buried_faces_and_world_floor_are_culled() {
        let registry = BlockRegistry::default();
        let mut voxels = vec![BlockType::AIR.id(); CLUSTER_VOLUME];
        for z in 0..CLUSTER_SIZE {
            for x in 0..CLUSTER_SIZE {
                voxels[cluster_index(x, 0, z)] = BlockType::BEDROCK.id();
                voxels[cluster_index(x, 1, z)] = BlockType::STONE.id();
            }
        }
        let light = lit(&voxels, &registry);
        let cluster = LitCluster {
            voxels: &voxels,
            light: &light,
            registry: &registry,
        };

        let mut mesh = MeshData::new();
        let faces = extract_surface(&cluster, true, &mut mesh);
        // Only the top of the stone layer is exposed; chunk borders see stone in the neighbours.
        assert_eq!(faces, CHUNK_SIZE * CHUNK_SIZE);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
        assert!(mesh.colors.iter().all(|c| (c[0] - 1.0).abs() < 1e-6));
    }

    #[test]
    fn glass_neighbours_keep_faces_visible() {
        let registry = BlockRegistry::default();
        let mut voxels = vec![BlockType::AIR.id(); CLUSTER_VOLUME];
        let (x, y, z) = (CHUNK_SIZE + 5, 60, CHUNK_SIZE + 5);
        voxels[cluster_index(x, y, z)] = BlockType::STONE.id();
        voxels[cluster_index(x + 1, y, z)] = BlockType::GLASS.id();
        voxels[cluster_index(x - 1, y, z)] = BlockType::STONE.id();
        let light = lit(&voxels, &registry);
        let cluster = LitCluster {
            voxels: &voxels,
            light: &light,
            registry: &registry,
        };

        let mut mesh = MeshData::new();
        // Each block loses the face it shares with an opaque neighbour; the
        // middle stone keeps the face towards the glass.
        assert_eq!(extract_surface(&cluster, false, &mut mesh), 15);
    }
}
