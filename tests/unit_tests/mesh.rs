use crate::non_uniform_description_2d;
use matrixcompare::assert_scalar_eq;
use stagger::decomposition::Decomposition;
use stagger::error::AssemblyError;
use stagger::grid::{Dimension, Direction, Field, GridIndex, IndexBox, IndexSpace};
use stagger::mesh::{Axis, MeshDescription, StaggeredGrid, StaggeredMesh};
use stagger::packing::RankBlockPacking;
use std::sync::Arc;
use util::assert_panics;

#[test]
fn axis_faces_and_length() {
    let axis = Axis::new(1.0, vec![0.5, 1.0, 0.25], false);
    assert_eq!(axis.faces(), vec![1.0, 1.5, 2.5, 2.75]);
    assert_scalar_eq!(axis.length(), 1.75, comp = abs, tol = 1e-14);

    let uniform = Axis::uniform(0.0, 1.0, 4, true);
    assert_eq!(uniform.widths, vec![0.25; 4]);
    assert!(uniform.periodic);
}

#[test]
fn invalid_descriptions_are_rejected() {
    let too_few_axes = MeshDescription::new(vec![Axis::uniform(0.0, 1.0, 4, false)]);
    assert!(matches!(too_few_axes.validate(), Err(AssemblyError::InvalidMesh(_))));

    let one_cell = MeshDescription::uniform(&[1, 4], &[1.0, 1.0], &[false, false]);
    assert!(matches!(StaggeredMesh::serial(one_cell), Err(AssemblyError::InvalidMesh(_))));

    let mut negative_width = MeshDescription::uniform(&[3, 3], &[1.0, 1.0], &[false, false]);
    negative_width.axes[1].widths[2] = -0.1;
    assert!(matches!(negative_width.validate(), Err(AssemblyError::InvalidMesh(_))));

    let mut nan_width = MeshDescription::uniform(&[3, 3], &[1.0, 1.0], &[false, false]);
    nan_width.axes[0].widths[0] = f64::NAN;
    assert!(matches!(nan_width.validate(), Err(AssemblyError::InvalidMesh(_))));

    let valid = MeshDescription::uniform(&[3, 3, 2], &[1.0, 1.0, 1.0], &[false, true, false]);
    assert_eq!(valid.validate().unwrap(), Dimension::Three);
}

#[test]
fn decomposition_must_cover_the_mesh() {
    let description = MeshDescription::uniform(&[4, 4], &[1.0, 1.0], &[false, false]);
    let decomposition = Decomposition::uniform(&[4, 5], &[1, 1]).unwrap();
    assert!(matches!(
        StaggeredMesh::new(description.clone(), decomposition, 0),
        Err(AssemblyError::InvalidDecomposition(_))
    ));

    let decomposition = Decomposition::uniform(&[4, 4], &[2, 1]).unwrap();
    assert!(matches!(
        StaggeredMesh::new(description, decomposition, 2),
        Err(AssemblyError::InvalidDecomposition(_))
    ));
}

#[test]
fn injected_packing_must_match_the_description() {
    let description = MeshDescription::uniform(&[3, 3], &[1.0, 1.0], &[false, false]);

    let larger = RankBlockPacking::new(Decomposition::serial(&[5, 5]).unwrap(), &[false, false]).unwrap();
    assert!(matches!(
        StaggeredMesh::with_packing(description.clone(), Arc::new(larger), 0),
        Err(AssemblyError::InvalidMesh(_))
    ));

    // Same cells, but a periodic x axis has one more u point
    let periodic = RankBlockPacking::new(Decomposition::serial(&[3, 3]).unwrap(), &[true, false]).unwrap();
    assert!(matches!(
        StaggeredMesh::with_packing(description.clone(), Arc::new(periodic), 0),
        Err(AssemblyError::InvalidMesh(_))
    ));

    let decomposition = Decomposition::uniform(&[3, 3], &[1, 2]).unwrap();
    let matching = RankBlockPacking::new(decomposition, &[false, false]).unwrap();
    let mesh = StaggeredMesh::with_packing(description, Arc::new(matching), 1).unwrap();
    assert_eq!(mesh.global_shape(Field::U).unwrap(), [2, 3, 1]);
    assert_eq!(mesh.num_ranks(), 2);
}

#[test]
fn uniform_description_requires_one_entry_per_axis() {
    assert_panics!(MeshDescription::uniform(&[3, 3, 3], &[1.0, 1.0], &[false, false, false]));
    assert_panics!(MeshDescription::uniform(&[3, 3], &[1.0, 1.0], &[false]));
}

#[test]
fn global_shapes_of_staggered_fields() {
    let mesh = StaggeredMesh::serial(non_uniform_description_2d([false, true])).unwrap();
    assert_eq!(mesh.dimension(), Dimension::Two);
    assert_eq!(mesh.global_shape(Field::P).unwrap(), [4, 3, 1]);
    // u is staggered along the non-periodic x axis
    assert_eq!(mesh.global_shape(Field::U).unwrap(), [3, 3, 1]);
    // v is staggered along the periodic y axis
    assert_eq!(mesh.global_shape(Field::V).unwrap(), [4, 3, 1]);
    assert!(matches!(
        mesh.global_shape(Field::W),
        Err(AssemblyError::FieldNotInMesh {
            field: Field::W,
            dimension: Dimension::Two
        })
    ));
    assert_eq!(mesh.space_size(IndexSpace::Velocity), 9 + 12);
    assert_eq!(mesh.space_size(IndexSpace::Pressure), 12);
    assert!(!mesh.is_periodic(Direction::X));
    assert!(mesh.is_periodic(Direction::Y));
    assert!(!mesh.is_periodic(Direction::Z));
}

#[test]
fn pressure_geometry() {
    let mesh = StaggeredMesh::serial(non_uniform_description_2d([false, false])).unwrap();
    let widths = [0.1, 0.2, 0.4, 0.3];
    let centres = [0.05, 0.2, 0.5, 0.85];
    for i in 0..4 {
        assert_scalar_eq!(mesh.spacing(Field::P, Direction::X, i as isize), widths[i], comp = abs, tol = 1e-14);
        assert_scalar_eq!(
            mesh.coordinate(Field::P, Direction::X, i as isize),
            centres[i],
            comp = abs,
            tol = 1e-14
        );
    }

    // Ghosts lie on the boundary faces and mirror the spacing
    assert_scalar_eq!(mesh.coordinate(Field::P, Direction::X, -1), 0.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.coordinate(Field::P, Direction::X, 4), 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.spacing(Field::P, Direction::X, -1), 0.1, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.spacing(Field::P, Direction::X, 4), 0.3, comp = abs, tol = 1e-14);

    assert_scalar_eq!(mesh.coordinate(Field::P, Direction::Y, 0), -0.75, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.coordinate(Field::P, Direction::Y, -1), -1.0, comp = abs, tol = 1e-14);
}

#[test]
fn velocity_geometry_along_staggered_axis() {
    let mesh = StaggeredMesh::serial(non_uniform_description_2d([false, false])).unwrap();
    // Interior faces of the x axis
    let faces = [0.1, 0.3, 0.7];
    let spacings = [0.15, 0.3, 0.35];
    for i in 0..3 {
        assert_scalar_eq!(mesh.coordinate(Field::U, Direction::X, i as isize), faces[i], comp = abs, tol = 1e-14);
        assert_scalar_eq!(mesh.spacing(Field::U, Direction::X, i as isize), spacings[i], comp = abs, tol = 1e-14);
    }
    assert_scalar_eq!(mesh.coordinate(Field::U, Direction::X, -1), 0.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.coordinate(Field::U, Direction::X, 3), 1.0, comp = abs, tol = 1e-14);

    // Across the staggered axis, u is cell centred
    assert_scalar_eq!(mesh.coordinate(Field::U, Direction::Y, 1), -0.375, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.spacing(Field::U, Direction::Y, 1), 0.25, comp = abs, tol = 1e-14);
}

#[test]
fn periodic_geometry_wraps() {
    let mesh = StaggeredMesh::serial(non_uniform_description_2d([true, false])).unwrap();
    // Four faces on a periodic axis, the last one coincides with the first
    assert_eq!(mesh.global_shape(Field::U).unwrap()[0], 4);
    assert_scalar_eq!(mesh.coordinate(Field::U, Direction::X, 3), 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.spacing(Field::U, Direction::X, 3), 0.2, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.coordinate(Field::U, Direction::X, -1), 0.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.coordinate(Field::U, Direction::X, 4), 1.1, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.spacing(Field::U, Direction::X, 4), 0.15, comp = abs, tol = 1e-14);

    assert_scalar_eq!(mesh.coordinate(Field::P, Direction::X, -1), -0.15, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.coordinate(Field::P, Direction::X, 4), 1.05, comp = abs, tol = 1e-14);
    assert_scalar_eq!(mesh.spacing(Field::P, Direction::X, -1), 0.3, comp = abs, tol = 1e-14);
}

#[test]
fn geometry_lookups_outside_the_ghost_layer_panic() {
    let mesh = StaggeredMesh::serial(non_uniform_description_2d([false, false])).unwrap();
    assert_panics!(mesh.spacing(Field::P, Direction::X, -2));
    assert_panics!(mesh.coordinate(Field::U, Direction::X, 4));
    assert_panics!(mesh.spacing(Field::W, Direction::X, 0));
    assert_panics!(mesh.spacing(Field::P, Direction::Z, 0));
}

#[test]
fn local_boxes_of_last_process_lose_one_velocity_point() {
    let description = MeshDescription::uniform(&[6, 4], &[1.0, 1.0], &[false, true]);
    let decomposition = Decomposition::uniform(&[6, 4], &[2, 2]).unwrap();
    let boxes = |rank: usize, field: Field| -> IndexBox {
        StaggeredMesh::new(description.clone(), decomposition.clone(), rank)
            .unwrap()
            .local_box(field)
            .unwrap()
    };
    let box_of = |begin: [isize; 2], end: [isize; 2]| {
        IndexBox::new(GridIndex::new(begin[0], begin[1], 0), GridIndex::new(end[0], end[1], 1))
    };

    assert_eq!(boxes(0, Field::P), box_of([0, 0], [3, 2]));
    assert_eq!(boxes(3, Field::P), box_of([3, 2], [6, 4]));
    assert_eq!(boxes(0, Field::U), box_of([0, 0], [3, 2]));
    assert_eq!(boxes(1, Field::U), box_of([3, 0], [5, 2]));
    // y is periodic, so the last process along y keeps all its v points
    assert_eq!(boxes(2, Field::V), box_of([0, 2], [3, 4]));

    let mesh = StaggeredMesh::new(description.clone(), decomposition.clone(), 0).unwrap();
    assert!(matches!(mesh.local_box(Field::W), Err(AssemblyError::FieldNotInMesh { .. })));
}

#[test]
fn mesh_description_round_trips_through_json() {
    let description = non_uniform_description_2d([true, false]);
    let json = serde_json::to_string(&description).unwrap();
    let parsed: MeshDescription<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, description);

    // Periodicity defaults to false
    let json = r#"{"axes": [{"start": 0.0, "widths": [1.0, 1.0]}, {"start": 0.0, "widths": [0.5, 0.5]}]}"#;
    let parsed: MeshDescription<f64> = serde_json::from_str(json).unwrap();
    assert!(parsed.axes.iter().all(|axis| !axis.periodic));
}
