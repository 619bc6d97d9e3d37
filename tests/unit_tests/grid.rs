use stagger::grid::{Dimension, Direction, Field, GridIndex, IndexBox, IndexSpace};

#[test]
fn fields_in_dimensions() {
    assert!(Field::U.exists_in(Dimension::Two));
    assert!(Field::V.exists_in(Dimension::Two));
    assert!(!Field::W.exists_in(Dimension::Two));
    assert!(Field::P.exists_in(Dimension::Two));
    assert!(Field::ALL.iter().all(|f| f.exists_in(Dimension::Three)));

    assert_eq!(IndexSpace::Velocity.fields(Dimension::Two), &[Field::U, Field::V]);
    assert_eq!(
        IndexSpace::Velocity.fields(Dimension::Three),
        &[Field::U, Field::V, Field::W]
    );
    assert_eq!(IndexSpace::Pressure.fields(Dimension::Three), &[Field::P]);

    for d in Direction::ALL {
        let velocity = Field::velocity(d);
        assert_eq!(velocity.staggered_direction(), Some(d));
        assert_eq!(velocity.space(), IndexSpace::Velocity);
    }
    assert_eq!(Field::P.staggered_direction(), None);
}

#[test]
fn grid_index_shifting() {
    let index = GridIndex::new(1, 2, 3);
    assert_eq!(index.shifted(Direction::X, 1), GridIndex::new(2, 2, 3));
    assert_eq!(index.shifted(Direction::Y, -3), GridIndex::new(1, -1, 3));
    assert_eq!(index.shifted(Direction::Z, 0), index);
    assert_eq!(index.component(Direction::Z), 3);
    assert_eq!(format!("{}", index), "(1, 2, 3)");
}

#[test]
fn index_box_iterates_with_i_fastest() {
    let index_box = IndexBox::new(GridIndex::new(1, 0, 0), GridIndex::new(3, 2, 1));
    let indices: Vec<_> = index_box.iter().map(GridIndex::to_array).collect();
    assert_eq!(indices, vec![[1, 0, 0], [2, 0, 0], [1, 1, 0], [2, 1, 0]]);
    assert_eq!(index_box.num_points(), 4);
    assert_eq!(index_box.shape(), [2, 2, 1]);

    for (n, index) in index_box.iter().enumerate() {
        assert!(index_box.contains(&index));
        assert_eq!(index_box.linear_offset(&index), Some(n));
    }
    assert_eq!(index_box.linear_offset(&GridIndex::new(0, 0, 0)), None);
}

#[test]
fn empty_index_box() {
    let index_box = IndexBox::new(GridIndex::new(2, 0, 0), GridIndex::new(2, 3, 1));
    assert!(index_box.is_empty());
    assert_eq!(index_box.iter().count(), 0);
}
