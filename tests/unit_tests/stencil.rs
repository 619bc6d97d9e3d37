use crate::{mesh_3x3, non_uniform_description_2d};
use matrixcompare::assert_scalar_eq;
use proptest::prelude::*;
use stagger::grid::{Direction, Field, GridIndex};
use stagger::mesh::{StaggeredGrid, StaggeredMesh};
use stagger::operators::{Divergence, Gradient, Interpolation, Laplacian};
use stagger::stencil::{backward_pair, forward_pair, star, Scaling, StencilOperator};
use util::assert_panics;

#[test]
fn pair_stencils() {
    let index = GridIndex::new(4, 5, 6);
    assert_eq!(forward_pair(Direction::X, index), [index, GridIndex::new(5, 5, 6)]);
    assert_eq!(forward_pair(Direction::Y, index), [index, GridIndex::new(4, 6, 6)]);
    assert_eq!(forward_pair(Direction::Z, index), [index, GridIndex::new(4, 5, 7)]);
    assert_eq!(backward_pair(Direction::X, index), [GridIndex::new(3, 5, 6), index]);
    assert_eq!(backward_pair(Direction::Z, index), [GridIndex::new(4, 5, 5), index]);
}

#[test]
fn star_stencils() {
    let index = GridIndex::new(1, 1, 0);
    let expected_2d = [
        index,
        GridIndex::new(0, 1, 0),
        GridIndex::new(2, 1, 0),
        GridIndex::new(1, 0, 0),
        GridIndex::new(1, 2, 0),
    ];
    assert_eq!(star::<5>(index), expected_2d);

    let index = GridIndex::new(1, 1, 1);
    let stencil = star::<7>(index);
    assert_eq!(stencil[0], index);
    assert_eq!(stencil[5], GridIndex::new(1, 1, 0));
    assert_eq!(stencil[6], GridIndex::new(1, 1, 2));

    assert_panics!(star::<4>(index));
}

#[test]
fn gradient_kernel_3x3() {
    let mesh = mesh_3x3();
    let index = GridIndex::new(1, 1, 0);
    let physical =
        StencilOperator::<f64, 2>::coefficients(&Gradient::new(Scaling::Physical), &mesh, Direction::X, index);
    assert_scalar_eq!(physical[0], -10.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(physical[1], 10.0, comp = abs, tol = 1e-12);

    let normalized =
        StencilOperator::<f64, 2>::coefficients(&Gradient::new(Scaling::Normalized), &mesh, Direction::Y, index);
    assert_eq!(normalized, [-1.0, 1.0]);
}

#[test]
fn divergence_kernel_uses_cell_width() {
    let mesh = StaggeredMesh::serial(non_uniform_description_2d([false, false])).unwrap();
    let divergence = Divergence::new(Scaling::Physical);
    let c = StencilOperator::<f64, 2>::coefficients(&divergence, &mesh, Direction::X, GridIndex::new(2, 0, 0));
    assert_scalar_eq!(c[0], -2.5, comp = abs, tol = 1e-12);
    assert_scalar_eq!(c[1], 2.5, comp = abs, tol = 1e-12);

    let c = StencilOperator::<f64, 2>::coefficients(&divergence, &mesh, Direction::Y, GridIndex::new(2, 1, 0));
    assert_scalar_eq!(c[1], 4.0, comp = abs, tol = 1e-12);
}

#[test]
fn interpolation_kernel_weights_by_distance() {
    let mesh = StaggeredMesh::serial(non_uniform_description_2d([false, false])).unwrap();
    let interpolation = Interpolation::new(Scaling::Physical);
    // Face at x = 0.3 between the centres 0.2 and 0.5
    let c = StencilOperator::<f64, 2>::coefficients(&interpolation, &mesh, Direction::X, GridIndex::new(1, 0, 0));
    assert_scalar_eq!(c[0], 2.0 / 3.0, comp = abs, tol = 1e-12);
    assert_scalar_eq!(c[1], 1.0 / 3.0, comp = abs, tol = 1e-12);

    let c = StencilOperator::<f64, 2>::coefficients(
        &Interpolation::new(Scaling::Normalized),
        &mesh,
        Direction::X,
        GridIndex::new(1, 0, 0),
    );
    assert_eq!(c, [0.5, 0.5]);
}

#[test]
fn laplacian_kernel_on_uniform_mesh() {
    let mesh = mesh_3x3();
    let laplacian = Laplacian::new(Scaling::Physical);
    // v(1, 0) has interior neighbors along x, and the boundary face and v(1, 1) along y
    let c = StencilOperator::<f64, 5>::coefficients(&laplacian, &mesh, Direction::Y, GridIndex::new(1, 0, 0));
    let expected = [-400.0, 100.0, 100.0, 100.0, 100.0];
    for (value, expected) in c.iter().zip(expected) {
        assert_scalar_eq!(*value, expected, comp = abs, tol = 1e-9);
    }

    // u(0, 0): the ghost along y lies on the wall, half a cell away
    let c = StencilOperator::<f64, 5>::coefficients(&laplacian, &mesh, Direction::X, GridIndex::new(0, 0, 0));
    let expected = [-500.0, 100.0, 100.0, 200.0, 100.0];
    for (value, expected) in c.iter().zip(expected) {
        assert_scalar_eq!(*value, expected, comp = abs, tol = 1e-9);
    }

    let normalized = StencilOperator::<f64, 5>::coefficients(
        &Laplacian::new(Scaling::Normalized),
        &mesh,
        Direction::X,
        GridIndex::new(0, 0, 0),
    );
    assert_eq!(normalized, [-4.0, 1.0, 1.0, 1.0, 1.0]);
}

proptest! {
    #[test]
    fn physical_gradient_kernel_is_inverse_spacing(
        description in any::<stagger::mesh::MeshDescription<f64>>(),
        seed in any::<(usize, usize, usize)>()
    ) {
        let mesh = StaggeredMesh::serial(description).unwrap();
        let gradient = Gradient::new(Scaling::Physical);
        for &d in mesh.dimension().directions() {
            let field = Field::velocity(d);
            let shape = mesh.global_shape(field).unwrap();
            let index = GridIndex::new(
                (seed.0 % shape[0]) as isize,
                (seed.1 % shape[1]) as isize,
                (seed.2 % shape[2]) as isize,
            );
            let h = mesh.spacing(field, d, index.component(d));
            let c = StencilOperator::<f64, 2>::coefficients(&gradient, &mesh, d, index);
            prop_assert_eq!(c, [-1.0 / h, 1.0 / h]);

            let normalized =
                StencilOperator::<f64, 2>::coefficients(&Gradient::new(Scaling::Normalized), &mesh, d, index);
            prop_assert_eq!(normalized, [-1.0, 1.0]);
        }
    }
}
