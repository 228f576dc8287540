//! # Exact Rational Nullspace Solver
//!
//! ## Aim
//! Computes nonzero solutions of `A·x = 0` for the integer stoichiometric
//! matrix using exact fraction arithmetic throughout. Floating point is banned
//! here: a tolerance-based elimination mis-balances larger formulas, while
//! `malachite::Rational` keeps every intermediate in lowest terms so the final
//! integer verification can be bit-exact.
//!
//! ## Main Logic
//! - `row_echelon()`: Gaussian elimination with partial pivoting over
//!   `Rational`, returning the pivot positions
//! - `nullspace_basis()`: one basis vector per free column, obtained by fixing
//!   that free column at 1, all other free columns at 0, and back-substituting
//!   the pivot columns
//! - `sign_feasible_combination()`: bounded exhaustive search over small
//!   integer combinations of the basis vectors for one whose entries are all
//!   nonzero and share a single strict sign. The usual balanced reaction has a
//!   one-dimensional nullspace and the search degenerates to a sign check;
//!   underdetermined reactions (a genuine extra degree of freedom) need the
//!   full search. Both bounds are fixed so the search always terminates.

use log::debug;
use malachite::Rational;
use malachite::num::arithmetic::traits::Abs;
use malachite::num::basic::traits::{One, Zero};

/// Basis-combination coefficients are searched exhaustively in
/// `[-COMBINATION_BOUND, COMBINATION_BOUND]`.
pub const COMBINATION_BOUND: i64 = 3;

/// Nullspaces of higher dimension than this are reported infeasible instead
/// of searched, keeping the combination search bounded.
pub const MAX_FREE_COLUMNS: usize = 4;

/// Forward elimination to row echelon form with partial pivoting.
/// Returns the `(row, column)` pivot positions in order.
fn row_echelon(m: &mut [Vec<Rational>]) -> Vec<(usize, usize)> {
    let rows = m.len();
    let cols = if rows > 0 { m[0].len() } else { 0 };
    let mut pivots = Vec::new();
    let mut row = 0;
    let mut col = 0;
    while row < rows && col < cols {
        let mut i_max = row;
        for i in (row + 1)..rows {
            if (&m[i][col]).abs() > (&m[i_max][col]).abs() {
                i_max = i;
            }
        }
        if m[i_max][col] == Rational::ZERO {
            col += 1;
            continue;
        }
        m.swap(row, i_max);
        for i in (row + 1)..rows {
            if m[i][col] == Rational::ZERO {
                continue;
            }
            let f = &m[i][col] / &m[row][col];
            m[i][col] = Rational::ZERO;
            for j in (col + 1)..cols {
                let sub = &f * &m[row][j];
                m[i][j] -= sub;
            }
        }
        pivots.push((row, col));
        row += 1;
        col += 1;
    }
    pivots
}

/// Rational basis of the nullspace of an integer matrix, one vector per free
/// column. An empty result means the matrix has full column rank (or no
/// columns at all) and only the trivial solution exists.
pub fn nullspace_basis(matrix: &[Vec<i64>]) -> Vec<Vec<Rational>> {
    if matrix.is_empty() || matrix[0].is_empty() {
        return Vec::new();
    }
    let n = matrix[0].len();
    let mut m: Vec<Vec<Rational>> = matrix
        .iter()
        .map(|row| row.iter().map(|&x| Rational::from(x)).collect())
        .collect();
    let pivots = row_echelon(&mut m);
    let pivot_cols: Vec<usize> = pivots.iter().map(|&(_, c)| c).collect();
    let free_cols: Vec<usize> = (0..n).filter(|c| !pivot_cols.contains(c)).collect();

    let mut basis = Vec::with_capacity(free_cols.len());
    for &free in &free_cols {
        let mut x = vec![Rational::ZERO; n];
        x[free] = Rational::ONE;
        for &(row, col) in pivots.iter().rev() {
            let mut acc = Rational::ZERO;
            for j in (col + 1)..n {
                if m[row][j] != Rational::ZERO && x[j] != Rational::ZERO {
                    acc += &m[row][j] * &x[j];
                }
            }
            x[col] = -acc / &m[row][col];
        }
        basis.push(x);
    }
    basis
}

fn uniform_strict_sign(v: &[Rational]) -> bool {
    if v.is_empty() || v.iter().any(|x| *x == Rational::ZERO) {
        return false;
    }
    let positive = v[0] > Rational::ZERO;
    v.iter().all(|x| (*x > Rational::ZERO) == positive)
}

/// Searches small integer combinations of the basis vectors for one whose
/// entries are all nonzero and of one strict sign (every species present on
/// its own side). Among feasible combinations the one with the smallest
/// coefficient weight wins, which keeps the result deterministic. `None`
/// means no combination exists within the bound.
pub fn sign_feasible_combination(basis: &[Vec<Rational>]) -> Option<Vec<Rational>> {
    if basis.is_empty() {
        return None;
    }
    if basis.len() > MAX_FREE_COLUMNS {
        debug!(
            "nullspace dimension {} exceeds the search cap {}",
            basis.len(),
            MAX_FREE_COLUMNS
        );
        return None;
    }
    let k = basis.len();
    let n = basis[0].len();
    let range = (2 * COMBINATION_BOUND + 1) as usize;
    let total = range.pow(k as u32);

    let mut best: Option<(i64, Vec<Rational>)> = None;
    for index in 0..total {
        let mut rem = index;
        let mut coeffs = Vec::with_capacity(k);
        for _ in 0..k {
            coeffs.push((rem % range) as i64 - COMBINATION_BOUND);
            rem /= range;
        }
        if coeffs.iter().all(|&c| c == 0) {
            continue;
        }
        let mut candidate = vec![Rational::ZERO; n];
        for (j, basis_vec) in basis.iter().enumerate() {
            if coeffs[j] == 0 {
                continue;
            }
            let factor = Rational::from(coeffs[j]);
            for (entry, b) in candidate.iter_mut().zip(basis_vec.iter()) {
                *entry += &factor * b;
            }
        }
        if !uniform_strict_sign(&candidate) {
            continue;
        }
        let weight: i64 = coeffs.iter().map(|c| c.abs()).sum();
        match &best {
            Some((best_weight, _)) if *best_weight <= weight => {}
            _ => best = Some((weight, candidate)),
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// Full solve: nullspace basis plus sign-feasibility search. Returns one
/// rational vector with uniformly signed nonzero entries, or `None` when the
/// matrix admits no such vector within the search bound.
pub fn solve_nullspace(matrix: &[Vec<i64>]) -> Option<Vec<Rational>> {
    let basis = nullspace_basis(matrix);
    sign_feasible_combination(&basis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_nullvector(matrix: &[Vec<i64>], x: &[Rational]) {
        for row in matrix {
            let mut acc = Rational::ZERO;
            for (a, xi) in row.iter().zip(x.iter()) {
                acc += &Rational::from(*a) * xi;
            }
            assert_eq!(acc, Rational::ZERO);
        }
    }

    #[test]
    fn test_nullspace_dimension_one() {
        // H2 + O2 -> H2O
        let matrix = vec![vec![2, 0, -2], vec![0, 2, -1]];
        let basis = nullspace_basis(&matrix);
        assert_eq!(basis.len(), 1);
        check_nullvector(&matrix, &basis[0]);
    }

    #[test]
    fn test_nullspace_full_rank() {
        let matrix = vec![vec![1, 0], vec![0, 1]];
        assert!(nullspace_basis(&matrix).is_empty());
        assert_eq!(solve_nullspace(&matrix), None);
    }

    #[test]
    fn test_nullspace_empty_matrix() {
        assert!(nullspace_basis(&[]).is_empty());
        assert_eq!(solve_nullspace(&[]), None);
    }

    #[test]
    fn test_solve_simple_combustion() {
        // C3H8 + O2 -> CO2 + H2O, rows C, H, O
        let matrix = vec![
            vec![3, 0, -1, 0],
            vec![8, 0, 0, -2],
            vec![0, 2, -2, -1],
        ];
        let x = solve_nullspace(&matrix).unwrap();
        check_nullvector(&matrix, &x);
        assert!(uniform_strict_sign(&x));
        // the ratio must be 1 : 5 : 3 : 4
        let ratio = &x[1] / &x[0];
        assert_eq!(ratio, Rational::from(5));
    }

    #[test]
    fn test_solve_underdetermined() {
        // C + O2 -> CO + CO2: nullity two, but sign-feasible combinations exist
        let matrix = vec![vec![1, 0, -1, -1], vec![0, 2, -1, -2]];
        let basis = nullspace_basis(&matrix);
        assert_eq!(basis.len(), 2);
        let x = solve_nullspace(&matrix).unwrap();
        check_nullvector(&matrix, &x);
        assert!(uniform_strict_sign(&x));
    }

    #[test]
    fn test_solve_sign_infeasible() {
        // H2 + O2 -> H2 forces the O2 coefficient to zero
        let matrix = vec![vec![2, 0, -2], vec![0, 2, 0]];
        assert_eq!(solve_nullspace(&matrix), None);
    }

    #[test]
    fn test_combination_bound_cap() {
        let basis = vec![vec![Rational::ONE]; MAX_FREE_COLUMNS + 1];
        assert_eq!(sign_feasible_combination(&basis), None);
    }
}
