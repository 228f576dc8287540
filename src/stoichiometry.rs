//! # Stoichiometric Matrix Module
//!
//! ## Aim
//! Builds the signed element-by-species matrix of a reaction. Rows are the
//! sorted union of all element symbols on both sides; columns are reactant
//! species followed by product species. Reactant columns hold the raw atom
//! counts, product columns the negated counts, so a coefficient vector `x`
//! balances the reaction exactly when `A·x = 0` in integer arithmetic.
//!
//! An unsigned `nalgebra::DMatrix` export is provided for numeric consumers
//! (mass balances, condition estimates) that want dense float matrices.

use crate::formula_parser::{ElementComposition, count_elements};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Signed stoichiometric matrix of one reaction equation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoichMatrix {
    /// Row labels: sorted union of element symbols across both sides.
    pub elements: Vec<String>,
    /// One row per element, one column per species (reactants then products).
    pub matrix: Vec<Vec<i64>>,
    pub n_reactants: usize,
    pub n_products: usize,
}

impl StoichMatrix {
    /// Builds the matrix from coefficient-stripped formula lists. An input
    /// with no species or no elements yields an empty matrix, not an error.
    pub fn build<F>(left: &[String], right: &[String], count_fn: F) -> Self
    where
        F: Fn(&str) -> ElementComposition,
    {
        let left_counts: Vec<ElementComposition> =
            left.iter().map(|formula| count_fn(formula)).collect();
        let right_counts: Vec<ElementComposition> =
            right.iter().map(|formula| count_fn(formula)).collect();

        let mut universe: BTreeSet<String> = BTreeSet::new();
        for counts in left_counts.iter().chain(right_counts.iter()) {
            universe.extend(counts.keys().cloned());
        }
        let elements: Vec<String> = universe.into_iter().collect();

        let n_species = left.len() + right.len();
        let mut matrix = vec![vec![0i64; n_species]; elements.len()];
        // saturated parser counts clamp instead of wrapping negative
        let to_entry = |q: usize| i64::try_from(q).unwrap_or(i64::MAX);
        for (row, element) in elements.iter().enumerate() {
            for (col, counts) in left_counts.iter().enumerate() {
                if let Some(&q) = counts.get(element) {
                    matrix[row][col] = to_entry(q);
                }
            }
            for (col, counts) in right_counts.iter().enumerate() {
                if let Some(&q) = counts.get(element) {
                    matrix[row][left.len() + col] = -to_entry(q);
                }
            }
        }

        StoichMatrix {
            elements,
            matrix,
            n_reactants: left.len(),
            n_products: right.len(),
        }
    }

    pub fn n_species(&self) -> usize {
        self.n_reactants + self.n_products
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty() || self.n_species() == 0
    }

    /// Exact integer check that `A·x = 0` for a candidate coefficient vector.
    /// Products are accumulated in i128 so the check itself cannot overflow.
    pub fn verify(&self, coeffs: &[i64]) -> bool {
        if coeffs.len() != self.n_species() {
            return false;
        }
        self.matrix.iter().all(|row| {
            row.iter()
                .zip(coeffs.iter())
                .map(|(&a, &x)| a as i128 * x as i128)
                .sum::<i128>()
                == 0
        })
    }
}

/// Unsigned element-by-species composition matrix as a dense float matrix,
/// together with the sorted element list labeling the rows.
pub fn composition_dmatrix(formulas: &[&str]) -> (DMatrix<f64>, Vec<String>) {
    let compositions: Vec<ElementComposition> =
        formulas.iter().map(|f| count_elements(f)).collect();
    let mut universe: BTreeSet<String> = BTreeSet::new();
    for counts in &compositions {
        universe.extend(counts.keys().cloned());
    }
    let elements: Vec<String> = universe.into_iter().collect();

    let mut matrix = DMatrix::zeros(elements.len(), formulas.len());
    for (col, counts) in compositions.iter().enumerate() {
        for (row, element) in elements.iter().enumerate() {
            if let Some(&q) = counts.get(element) {
                matrix[(row, col)] = q as f64;
            }
        }
    }
    (matrix, elements)
}
