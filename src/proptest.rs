//! Strategies for generating meshes and decompositions in property tests.
use crate::decomposition::Decomposition;
use crate::mesh::{Axis, MeshDescription};
use ::proptest::collection::vec;
use ::proptest::prelude::*;

/// An axis with `cells` cells of random, positive widths.
pub fn axis(cells: impl Strategy<Value = usize>) -> impl Strategy<Value = Axis<f64>> {
    // Keep widths within a few orders of magnitude of each other, so that
    // the geometry stays well conditioned
    (cells, -5.0..5.0, any::<bool>())
        .prop_flat_map(|(n, start, periodic)| (vec(0.1..2.0, n), Just(start), Just(periodic)))
        .prop_map(|(widths, start, periodic)| Axis::new(start, widths, periodic))
}

/// A 2-D or 3-D mesh description with between 2 and `max_cells` cells per axis.
pub fn mesh_description(max_cells: usize) -> impl Strategy<Value = MeshDescription<f64>> {
    let max_cells = max_cells.max(2);
    (2usize..=3)
        .prop_flat_map(move |dim| vec(axis(2..=max_cells), dim))
        .prop_map(MeshDescription::new)
}

/// A mesh description together with a valid decomposition of it.
pub fn decomposed_mesh(
    max_cells: usize,
    max_processes: usize,
) -> impl Strategy<Value = (MeshDescription<f64>, Decomposition)> {
    let max_processes = max_processes.max(1);
    mesh_description(max_cells)
        .prop_flat_map(move |description| {
            let processes: Vec<_> = description
                .cells()
                .into_iter()
                .map(|n| 1..=n.min(max_processes))
                .collect();
            (Just(description), processes)
        })
        .prop_map(|(description, processes)| {
            let decomposition = Decomposition::uniform(&description.cells(), &processes)
                .expect("Process counts never exceed cell counts");
            (description, decomposition)
        })
}

impl Arbitrary for MeshDescription<f64> {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_args: Self::Parameters) -> Self::Strategy {
        mesh_description(6).boxed()
    }
}
