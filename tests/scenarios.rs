//! End-to-end scenarios exercising the generator and the mesh grid together, following the
//! teacher's convention of keeping cross-module behaviour in `tests/` rather than unit tests.

use glam::Vec3;

use tiled_navmesh::fixed::{Real, Vector3};
use tiled_navmesh::navigation::{NavigationContext, NoOffMeshLinks, OffMeshNavigation, UnrestrictedContext};
use tiled_navmesh::span_grid::{CompactSpanGrid, Span};
use tiled_navmesh::tile::{GridCoord, TriangleId};
use tiled_navmesh::{
    FindWayError, GeneratorParams, MeshGrid, MeshGridParams, PredictionStrategy, RayCastError, RayHit,
    TileGenerator, WayQueryWorkingSet,
};

fn flat_floor_grid(size: u16) -> CompactSpanGrid {
    let mut grid = CompactSpanGrid::new(size, size, Vector3::new(Real::ONE, Real::ONE, Real::ONE));
    for z in 0..size {
        for x in 0..size {
            grid.set_column(
                x,
                z,
                vec![
                    Span { min: 0, max: 4, walkable: true, ..Default::default() },
                    Span { min: 4, max: 64, walkable: false, ..Default::default() },
                ],
            );
        }
    }
    grid
}

/// Scenario 1: a single generated tile supports a start-to-end path entirely within itself.
#[test]
fn single_tile_path_is_found() {
    let span_grid = flat_floor_grid(16);
    let generator = TileGenerator::new(GeneratorParams::default());
    let tile = generator.generate(&span_grid, None).expect("tile should generate");

    let mut mesh = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(16.0) });
    mesh.set_tile(GridCoord::new(0, 0, 0), tile);

    let mut working_set = WayQueryWorkingSet::new(PredictionStrategy::Advanced);
    let path = mesh.find_way(
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(14.0, 0.0, 14.0),
        &UnrestrictedContext,
        &NoOffMeshLinks,
        &[],
        &mut working_set,
    );

    assert!(path.is_ok(), "expected a path within a single tile, got {path:?}");
}

/// Scenario 2: two adjacent tiles are stitched so a path can cross between them.
#[test]
fn cross_tile_path_crosses_the_shared_boundary() {
    let span_grid_a = flat_floor_grid(16);
    let span_grid_b = flat_floor_grid(16);
    let generator = TileGenerator::new(GeneratorParams::default());

    let tile_a = generator.generate(&span_grid_a, None).unwrap();
    let tile_b = generator.generate(&span_grid_b, None).unwrap();

    let mut mesh = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(16.0) });
    mesh.set_tile(GridCoord::new(0, 0, 0), tile_a);
    mesh.set_tile(GridCoord::new(1, 0, 0), tile_b);

    let mut working_set = WayQueryWorkingSet::new(PredictionStrategy::Advanced);
    let path = mesh.find_way(
        Vec3::new(1.0, 0.0, 8.0),
        Vec3::new(20.0, 0.0, 8.0),
        &UnrestrictedContext,
        &NoOffMeshLinks,
        &[],
        &mut working_set,
    );

    assert!(path.is_ok(), "expected a cross-tile path, got {path:?}");
}

/// Scenario 3: a ray cast from one side of a tile to the other, with nothing in the way, reports
/// a clean hit rather than an obstruction.
#[test]
fn ray_cast_through_open_floor_is_clear() {
    let span_grid = flat_floor_grid(16);
    let generator = TileGenerator::new(GeneratorParams::default());
    let tile = generator.generate(&span_grid, None).unwrap();

    let mut mesh = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(16.0) });
    mesh.set_tile(GridCoord::new(0, 0, 0), tile);

    let result = mesh.ray_cast(Vec3::new(1.0, 0.0, 1.0), Vec3::new(14.0, 0.0, 14.0), 50.0);
    assert_eq!(result, Ok(RayHit::Clear));
}

/// Scenario 4: removing a tile that bridged two separate floor slabs splits their static island
/// into two again.
#[test]
fn clearing_a_bridge_tile_splits_the_island() {
    let generator = TileGenerator::new(GeneratorParams::default());

    let mut mesh = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(8.0) });
    let coord_a = GridCoord::new(0, 0, 0);
    let coord_bridge = GridCoord::new(1, 0, 0);
    let coord_b = GridCoord::new(2, 0, 0);
    mesh.set_tile(coord_a, generator.generate(&flat_floor_grid(8), None).unwrap());
    mesh.set_tile(coord_bridge, generator.generate(&flat_floor_grid(8), None).unwrap());
    mesh.set_tile(coord_b, generator.generate(&flat_floor_grid(8), None).unwrap());

    let pending_before = mesh.compute_static_islands(&NoOffMeshLinks);
    assert!(pending_before.is_empty());
    assert_eq!(mesh.islands().len(), 1, "all three stitched tiles should start out as one island");
    let area_before = mesh.islands()[0].area;

    mesh.clear_tile(coord_bridge);

    let pending_after = mesh.compute_static_islands(&NoOffMeshLinks);
    assert!(pending_after.is_empty());
    assert_eq!(mesh.islands().len(), 2, "removing the bridge tile should split the island in two");
    let area_after: Real = mesh.islands().iter().fold(Real::ZERO, |acc, island| acc + island.area);
    assert!(
        area_after < area_before,
        "the remaining two islands should no longer include the bridge tile's own area"
    );
}

struct OneWayBridge;

impl OffMeshNavigation for OneWayBridge {
    fn can_use_link(&self, off_mesh_link_index: u16) -> bool {
        off_mesh_link_index == 0
    }

    fn link_destination(&self, off_mesh_link_index: u16) -> Option<TriangleId> {
        if off_mesh_link_index == 0 {
            None
        } else {
            None
        }
    }
}

/// Scenario 5: an off-mesh link whose destination the host can't resolve locally shows up as a
/// pending connection request rather than silently vanishing.
#[test]
fn unresolved_off_mesh_link_is_reported_pending() {
    use tiled_navmesh::tile::{BvNode, Link, Tile, TileVertex, Triangle};

    let verts = vec![
        TileVertex { x: 0, y: 0, z: 0 },
        TileVertex { x: 320, y: 0, z: 0 },
        TileVertex { x: 0, y: 0, z: 320 },
    ];
    let triangles = vec![Triangle { vertices: [0, 1, 2], first_link: 0, link_count: 1, island_id: 0 }];
    let links = vec![Link::off_mesh(7)];
    let tile = Tile::new(verts, triangles, links, Vec::<BvNode>::new());

    let mut mesh = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(10.0) });
    mesh.set_tile(GridCoord::new(0, 0, 0), tile);

    let pending = mesh.compute_static_islands(&OneWayBridge);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].off_mesh_link_index, 7);
}

/// Scenario 6: regenerating from an unchanged span grid with its previous hash early-outs instead
/// of rebuilding.
#[test]
fn unchanged_span_grid_short_circuits_generation() {
    let span_grid = flat_floor_grid(8);
    let generator = TileGenerator::new(GeneratorParams::default());
    let tile = generator.generate(&span_grid, None).unwrap();

    let result = generator.generate(&span_grid, Some(tile.hash()));
    assert!(matches!(result, Err(tiled_navmesh::GenerateError::HashMatch)));
}

/// A context that forbids a specific region, confirming `find_way` honours host policy.
struct ForbidNegativeX;
impl NavigationContext for ForbidNegativeX {
    fn is_point_valid_for_agent(&self, point: Vec3) -> bool {
        point.x >= 0.0
    }
}

#[test]
fn find_way_reports_invalid_start_outside_any_tile() {
    let span_grid = flat_floor_grid(8);
    let generator = TileGenerator::new(GeneratorParams::default());
    let tile = generator.generate(&span_grid, None).unwrap();

    let mut mesh = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(8.0) });
    mesh.set_tile(GridCoord::new(0, 0, 0), tile);

    let mut working_set = WayQueryWorkingSet::new(PredictionStrategy::Advanced);
    let result = mesh.find_way(
        Vec3::new(-100.0, 0.0, -100.0),
        Vec3::new(1.0, 0.0, 1.0),
        &ForbidNegativeX,
        &NoOffMeshLinks,
        &[],
        &mut working_set,
    );
    assert_eq!(result.unwrap_err(), FindWayError::InvalidStart);
}

#[test]
fn ray_cast_rejects_ray_longer_than_max_length() {
    let span_grid = flat_floor_grid(8);
    let generator = TileGenerator::new(GeneratorParams::default());
    let tile = generator.generate(&span_grid, None).unwrap();

    let mut mesh = MeshGrid::new(MeshGridParams { tile_size: Vec3::splat(8.0) });
    mesh.set_tile(GridCoord::new(0, 0, 0), tile);

    let result = mesh.ray_cast(Vec3::new(0.0, 0.0, 0.0), Vec3::new(7.0, 0.0, 7.0), 1.0);
    assert_eq!(result.unwrap_err(), RayCastError::RayTooLong);
}
