//! # Equation Balancer Module
//!
//! ## Aim
//! The top of the solve chain: takes a textual reaction equation, builds the
//! signed stoichiometric matrix, solves for an exact rational nullspace vector
//! and reduces it to the minimal positive integer coefficients. Every failure
//! mode is data, not a panic: malformed input, an infeasible reaction and a
//! rejected candidate all come back as `None` from the public surface.
//!
//! ## Main Data Structures and Logic
//! - `BalancedEquation`: the per-side coefficient vectors, minimal and positive
//! - `BalanceError`: internal taxonomy of why a solve produced no result
//! - `solve_equation()`: pure function over formula lists, the engine boundary
//! - `EquationBalancer`: stage-by-stage struct API over one equation string
//!   (parse, build, solve), with string rendering and a pretty-printed
//!   element balance table
//!
//! ## Usage
//! ```
//! use ChemBalancer::balancer::EquationBalancer;
//! let balanced = EquationBalancer::balance("C3H8 + O2 -> CO2 + H2O").unwrap();
//! let coeffs = balanced.balanced.as_ref().unwrap();
//! assert_eq!(coeffs.reactants, vec![1, 5]);
//! assert_eq!(coeffs.products, vec![3, 4]);
//! ```

use crate::equation_parser::{CANONICAL_ARROW, Species, parse_species, split_equation};
use crate::formula_parser::{ElementComposition, count_elements, scale_composition, sum_compositions};
use crate::rational_solver::solve_nullspace;
use crate::stoichiometry::StoichMatrix;
use log::{debug, warn};
use malachite::num::arithmetic::traits::Lcm;
use malachite::num::basic::traits::One;
use malachite::{Natural, Rational};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a solve produced no coefficients. Internal: the public surface maps
/// every variant to `None`.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BalanceError {
    #[error("input does not split into one left and one right side")]
    NoEquation,
    #[error("no nonzero uniformly-signed nullspace vector within the search bound")]
    Infeasible,
    #[error("candidate coefficient does not fit in i64")]
    CoefficientOverflow,
    #[error("integer verification of the candidate coefficients failed")]
    VerificationFailed,
}

/// Minimal positive integer coefficients of a balanced equation, one per
/// species in input order. The entries share no common factor greater than 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancedEquation {
    pub reactants: Vec<i64>,
    pub products: Vec<i64>,
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 { a.abs() } else { gcd(b, a % b) }
}

/// Clears denominators with their LCM, fixes the sign so the numeric majority
/// is positive, takes absolute values and divides out the common GCD.
fn normalize_vector(vector: &[Rational]) -> Result<Vec<i64>, BalanceError> {
    let mut lcm = Natural::ONE;
    for entry in vector {
        lcm = lcm.lcm(entry.denominator_ref());
    }
    let scale = Rational::from(&lcm);
    let mut integers = Vec::with_capacity(vector.len());
    for entry in vector {
        let scaled = entry * &scale;
        let value = i64::try_from(&scaled).map_err(|_| BalanceError::CoefficientOverflow)?;
        integers.push(value);
    }

    let negatives = integers.iter().filter(|&&x| x < 0).count();
    let positives = integers.iter().filter(|&&x| x > 0).count();
    if negatives > positives {
        for value in &mut integers {
            *value = -*value;
        }
    }
    for value in &mut integers {
        *value = value.abs();
    }

    let common = integers.iter().fold(0i64, |acc, &x| gcd(acc, x));
    if common == 0 {
        return Err(BalanceError::Infeasible);
    }
    for value in &mut integers {
        *value /= common;
    }
    Ok(integers)
}

fn solve_matrix(stoich: &StoichMatrix) -> Result<BalancedEquation, BalanceError> {
    if stoich.is_empty() || stoich.n_reactants == 0 || stoich.n_products == 0 {
        return Err(BalanceError::NoEquation);
    }
    let vector = solve_nullspace(&stoich.matrix).ok_or(BalanceError::Infeasible)?;
    let coeffs = normalize_vector(&vector)?;
    if coeffs.iter().any(|&c| c <= 0) {
        return Err(BalanceError::Infeasible);
    }
    if !stoich.verify(&coeffs) {
        // a candidate that fails the exact re-check is discarded, never returned
        warn!("exact verification rejected a candidate coefficient vector");
        return Err(BalanceError::VerificationFailed);
    }
    let (left, right) = coeffs.split_at(stoich.n_reactants);
    Ok(BalancedEquation {
        reactants: left.to_vec(),
        products: right.to_vec(),
    })
}

/// Balances a reaction given the coefficient-stripped formula lists of both
/// sides and a formula evaluation function. `None` means the equation has no
/// balanced form within the solver's search bound (or the input is degenerate).
pub fn solve_equation<F>(left: &[String], right: &[String], count_fn: F) -> Option<BalancedEquation>
where
    F: Fn(&str) -> ElementComposition,
{
    let stoich = StoichMatrix::build(left, right, count_fn);
    match solve_matrix(&stoich) {
        Ok(balanced) => Some(balanced),
        Err(e) => {
            debug!("balancing failed: {}", e);
            None
        }
    }
}

/// Stage-by-stage balancer over one equation string. Construct with [`new`],
/// then call [`parse`], [`build_matrix`] and [`solve`] in order, or use
/// [`balance`] to run the whole chain. Every instance is independent; nothing
/// is cached between instances.
///
/// [`new`]: EquationBalancer::new
/// [`parse`]: EquationBalancer::parse
/// [`build_matrix`]: EquationBalancer::build_matrix
/// [`solve`]: EquationBalancer::solve
/// [`balance`]: EquationBalancer::balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquationBalancer {
    pub equation: String,
    pub reactants: Vec<Species>,
    pub products: Vec<Species>,
    pub stoich: Option<StoichMatrix>,
    pub balanced: Option<BalancedEquation>,
}

impl EquationBalancer {
    pub fn new(equation: &str) -> Self {
        Self {
            equation: equation.to_string(),
            reactants: Vec::new(),
            products: Vec::new(),
            stoich: None,
            balanced: None,
        }
    }

    /// Splits the equation text into species. Returns false (and leaves the
    /// species lists empty) when the text is not an equation.
    pub fn parse(&mut self) -> bool {
        match split_equation(&self.equation) {
            Some(sides) => {
                self.reactants = sides.left.iter().map(|chunk| parse_species(chunk)).collect();
                self.products = sides.right.iter().map(|chunk| parse_species(chunk)).collect();
                true
            }
            None => false,
        }
    }

    fn left_formulas(&self) -> Vec<String> {
        self.reactants.iter().map(|s| s.formula.clone()).collect()
    }

    fn right_formulas(&self) -> Vec<String> {
        self.products.iter().map(|s| s.formula.clone()).collect()
    }

    /// Builds the signed stoichiometric matrix from the parsed species.
    pub fn build_matrix(&mut self) {
        self.stoich = Some(StoichMatrix::build(
            &self.left_formulas(),
            &self.right_formulas(),
            count_elements,
        ));
    }

    /// Solves for minimal positive integer coefficients. Returns false when
    /// the equation is infeasible; `self.balanced` stays `None` in that case.
    pub fn solve(&mut self) -> bool {
        if self.stoich.is_none() {
            self.build_matrix();
        }
        let Some(stoich) = &self.stoich else {
            return false;
        };
        match solve_matrix(stoich) {
            Ok(balanced) => {
                self.balanced = Some(balanced);
                true
            }
            Err(e) => {
                debug!("{}: {}", self.equation, e);
                false
            }
        }
    }

    /// Runs the whole chain. `None` when parsing or solving fails.
    pub fn balance(equation: &str) -> Option<Self> {
        let mut balancer = Self::new(equation);
        if !balancer.parse() {
            return None;
        }
        balancer.build_matrix();
        if !balancer.solve() {
            return None;
        }
        Some(balancer)
    }

    /// The balanced equation as text, e.g. `"C3H8 + 5O2 → 3CO2 + 4H2O"`.
    /// Coefficient 1 is left implicit.
    pub fn balanced_str(&self) -> Option<String> {
        let balanced = self.balanced.as_ref()?;

        let render_side = |species: &[Species], coeffs: &[i64]| -> String {
            species
                .iter()
                .zip(coeffs.iter())
                .map(|(sp, &q)| {
                    if q == 1 {
                        sp.formula.clone()
                    } else {
                        format!("{}{}", q, sp.formula)
                    }
                })
                .collect::<Vec<String>>()
                .join(" + ")
        };

        Some(format!(
            "{} {} {}",
            render_side(&self.reactants, &balanced.reactants),
            CANONICAL_ARROW,
            render_side(&self.products, &balanced.products),
        ))
    }

    /// Per-element atom totals of one side under the balanced coefficients.
    fn side_totals(species: &[Species], coeffs: &[i64]) -> ElementComposition {
        let scaled: Vec<ElementComposition> = species
            .iter()
            .zip(coeffs.iter())
            .map(|(sp, &q)| scale_composition(&count_elements(&sp.formula), q as usize))
            .collect();
        sum_compositions(&scaled)
    }

    /// Prints an element balance table (element, reactant atoms, product
    /// atoms) to stdout. Does nothing before a successful solve.
    pub fn pretty_print_balance(&self) {
        let Some(balanced) = &self.balanced else {
            return;
        };
        let left = Self::side_totals(&self.reactants, &balanced.reactants);
        let right = Self::side_totals(&self.products, &balanced.products);

        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("element"),
            Cell::new("reactants"),
            Cell::new("products"),
        ]));
        for (element, count) in &left {
            let right_count = right.get(element).copied().unwrap_or(0);
            table.add_row(Row::new(vec![
                Cell::new(element),
                Cell::new(&count.to_string()),
                Cell::new(&right_count.to_string()),
            ]));
        }
        table.printstd();
    }
}
