use stagger::decomposition::Decomposition;
use stagger::error::AssemblyError;
use stagger::grid::Direction;

#[test]
fn uniform_splits_larger_chunks_first() {
    let decomposition = Decomposition::uniform(&[10, 4], &[3, 2]).unwrap();
    assert_eq!(decomposition.cell_counts(Direction::X), &[4, 3, 3]);
    assert_eq!(decomposition.cell_counts(Direction::Y), &[2, 2]);
    assert_eq!(decomposition.process_grid(), [3, 2, 1]);
    assert_eq!(decomposition.num_ranks(), 6);
    assert_eq!(decomposition.cell_range(Direction::X, 1), 4..7);
    assert_eq!(decomposition.cell_range(Direction::Z, 0), 0..1);
    assert_eq!(decomposition.total_cells(), vec![10, 4]);
}

#[test]
fn ranks_are_numbered_with_x_fastest() {
    let decomposition = Decomposition::uniform(&[4, 4, 4], &[2, 3, 2]).unwrap();
    assert_eq!(decomposition.rank_of([1, 0, 0]), 1);
    assert_eq!(decomposition.rank_of([0, 1, 0]), 2);
    assert_eq!(decomposition.rank_of([1, 2, 1]), 1 + 2 * (2 + 3));
    for rank in 0..decomposition.num_ranks() {
        assert_eq!(decomposition.rank_of(decomposition.coords_of(rank)), rank);
    }
}

#[test]
fn owner_along_axis() {
    let decomposition = Decomposition::uniform(&[5, 2], &[2, 1]).unwrap();
    let owners: Vec<_> = (0..6)
        .map(|cell| decomposition.owner_along(Direction::X, cell))
        .collect();
    assert_eq!(owners, vec![Some(0), Some(0), Some(0), Some(1), Some(1), None]);
    assert_eq!(decomposition.owner_along(Direction::Z, 0), Some(0));
    assert_eq!(decomposition.owner_along(Direction::Z, 1), None);
}

#[test]
fn invalid_decompositions_are_rejected() {
    assert!(matches!(
        Decomposition::uniform(&[3, 3], &[4, 1]),
        Err(AssemblyError::InvalidDecomposition(_))
    ));
    assert!(matches!(
        Decomposition::uniform(&[3, 3], &[1]),
        Err(AssemblyError::InvalidDecomposition(_))
    ));
    assert!(matches!(
        Decomposition::from_ownership(vec![vec![2, 0], vec![3]]),
        Err(AssemblyError::InvalidDecomposition(_))
    ));
    assert!(matches!(
        Decomposition::from_ownership(vec![vec![2]]),
        Err(AssemblyError::InvalidDecomposition(_))
    ));
}

#[test]
fn automatic_minimizes_interfaces() {
    // Long in x: cut across x only
    let decomposition = Decomposition::automatic(&[64, 4], 4).unwrap();
    assert_eq!(decomposition.process_grid(), [4, 1, 1]);

    // Square: 2x2 has less interface than 4x1
    let decomposition = Decomposition::automatic(&[8, 8], 4).unwrap();
    assert_eq!(decomposition.process_grid(), [2, 2, 1]);

    let decomposition = Decomposition::automatic(&[6, 6, 6], 8).unwrap();
    assert_eq!(decomposition.process_grid(), [2, 2, 2]);

    // Prime rank counts still work when an axis is long enough
    let decomposition = Decomposition::automatic(&[3, 7], 7).unwrap();
    assert_eq!(decomposition.process_grid(), [1, 7, 1]);

    assert!(Decomposition::automatic(&[2, 2], 5).is_err());
}
