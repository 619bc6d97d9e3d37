/// Compares the `(column, value)` entries of a sparse row against the expected entries.
///
/// Columns must match exactly, values up to the absolute tolerance.
#[macro_export]
macro_rules! assert_row_entries {
    ($row:expr, $expected:expr, abstol = $tol:expr) => {{
        let row: Vec<(usize, f64)> = $row.into_iter().collect();
        let expected: Vec<(usize, f64)> = $expected.into_iter().collect();
        let columns: Vec<usize> = row.iter().map(|(j, _)| *j).collect();
        let expected_columns: Vec<usize> = expected.iter().map(|(j, _)| *j).collect();
        assert_eq!(columns, expected_columns, "row columns differ");
        for ((j, v), (_, v_expected)) in row.iter().zip(expected.iter()) {
            assert!(
                (v - v_expected).abs() <= $tol,
                "value in column {} is {}, expected {} (abstol {:e})",
                j,
                v,
                v_expected,
                $tol
            );
        }
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::{catch_unwind, AssertUnwindSafe};
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(AssertUnwindSafe(|| $e));
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}

/// Checks that the given indices are exactly `0 .. indices.len()`, in any order.
pub fn is_permutation_of_range(indices: &[usize]) -> bool {
    let mut seen = vec![false; indices.len()];
    for &index in indices {
        match seen.get_mut(index) {
            Some(flag) if !*flag => *flag = true,
            _ => return false,
        }
    }
    true
}
