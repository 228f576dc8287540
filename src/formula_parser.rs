//! # Chemical Formula Parser Module
//!
//! ## Aim
//! This module turns a chemical formula string like "Al2(SO4)3" or "CuSO4·5H2O"
//! into a mapping from element symbols to atom counts. Parsing is deliberately
//! tolerant: unknown characters, unmatched brackets and stray multipliers are
//! skipped or ignored instead of raising errors, because formulas often arrive
//! from user input or from databases with formatting artifacts. Counts too
//! large to represent saturate at `usize::MAX` rather than failing.
//!
//! ## Main Data Structures and Logic
//! - `Token`: flat lexical item (element, bracket, number, hydrate dot)
//! - `ElementComposition`: BTreeMap from element symbol to atom count, so the
//!   mapping iterates in a deterministic lexicographic order
//! - `tokenize()` + `evaluate_tokens()`: two-stage pipeline; evaluation uses an
//!   explicit stack of partial accumulators, one per open bracket group
//! - `molar_mass()`: auxiliary calculation over a static element mass table
//!
//! ## Usage
//! ```
//! use ChemBalancer::formula_parser::count_elements;
//! let counts = count_elements("Mg(OH)2");
//! assert_eq!(counts.get("O"), Some(&2));
//! assert_eq!(counts.get("H"), Some(&2));
//! ```

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Mapping from element symbol to atom count. Symbols absent from the map have
/// count zero; a zero count is never stored explicitly.
pub type ElementComposition = BTreeMap<String, usize>;

/// One lexical item of a chemical formula, produced in left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// One of `( ) [ ] { }`, carrying the literal character.
    Delimiter(char),
    /// An element symbol (1-2 letters, first uppercase) with its multiplicity.
    Element { symbol: String, count: usize },
    /// A standalone integer not attached to an element symbol.
    Number(usize),
    /// The hydrate separator `·` (or an ASCII period).
    HydrateDot,
}

fn is_open_delimiter(c: char) -> bool {
    matches!(c, '(' | '[' | '{')
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}')
}

/// Lexes a formula string into a flat token stream. Whitespace anywhere in the
/// string is ignored; characters that fit no token class are skipped.
pub fn tokenize(formula: &str) -> Vec<Token> {
    let chars: Vec<char> = formula.chars().filter(|c| !c.is_whitespace()).collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '·' || c == '.' {
            tokens.push(Token::HydrateDot);
            i += 1;
        } else if is_delimiter(c) {
            tokens.push(Token::Delimiter(c));
            i += 1;
        } else if c.is_ascii_uppercase() {
            let mut symbol = c.to_string();
            i += 1;
            if i < chars.len() && chars[i].is_ascii_lowercase() {
                symbol.push(chars[i]);
                i += 1;
            }
            let mut digits = String::new();
            while i < chars.len() && chars[i].is_ascii_digit() {
                digits.push(chars[i]);
                i += 1;
            }
            let count = if digits.is_empty() {
                1
            } else {
                // a multiplicity too large for usize saturates rather than
                // collapsing to some smaller count
                digits.parse().unwrap_or(usize::MAX)
            };
            tokens.push(Token::Element { symbol, count });
        } else if c.is_ascii_digit() {
            let mut digits = String::new();
            while i < chars.len() && chars[i].is_ascii_digit() {
                digits.push(chars[i]);
                i += 1;
            }
            tokens.push(Token::Number(digits.parse().unwrap_or(usize::MAX)));
        } else {
            // tolerate anything else (charges, phase marks, typos)
            i += 1;
        }
    }
    tokens
}

// All count arithmetic saturates: stacked group multipliers can push a
// product past usize, and the tolerant-parsing contract forbids both the
// debug-build panic and the wrapped release-build count.
fn merge_scaled(target: &mut ElementComposition, source: &ElementComposition, k: usize) {
    if k == 0 {
        return;
    }
    for (symbol, count) in source {
        let entry = target.entry(symbol.clone()).or_insert(0);
        *entry = entry.saturating_add(count.saturating_mul(k));
    }
}

/// Position of the close delimiter matching the open delimiter at `open`,
/// tracked by nesting depth only (bracket families are interchangeable).
/// Returns the end of the stream when the group is never closed.
fn matching_close(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        if let Token::Delimiter(c) = token {
            if is_open_delimiter(*c) {
                depth += 1;
            } else {
                depth -= 1;
                if depth == 0 {
                    return i;
                }
            }
        }
    }
    tokens.len()
}

/// Evaluates a token stream into the total element composition of the formula.
///
/// A stack of partial accumulators carries one entry per currently open bracket
/// group; closing a group pops it, applies the optional trailing multiplier and
/// merges into the enclosing accumulator. A hydrate dot followed by an integer
/// N treats the entire remaining suffix as one sub-formula repeated N times and
/// ends top-level processing; only one hydrate segment per formula is
/// supported and it must be the last segment.
pub fn evaluate_tokens(tokens: &[Token]) -> ElementComposition {
    let mut stack: Vec<ElementComposition> = vec![ElementComposition::new()];
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::Element { symbol, count } => {
                let entry = stack.last_mut().unwrap().entry(symbol.clone()).or_insert(0);
                *entry = entry.saturating_add(*count);
                i += 1;
            }
            Token::Delimiter(c) if is_open_delimiter(*c) => {
                stack.push(ElementComposition::new());
                i += 1;
            }
            Token::Delimiter(_) => {
                // a close with no matching open is tolerated as a no-op,
                // and a mismatched bracket family closes the group anyway
                let group = if stack.len() > 1 {
                    stack.pop().unwrap()
                } else {
                    ElementComposition::new()
                };
                let mut multiplier = 1;
                if let Some(Token::Number(n)) = tokens.get(i + 1) {
                    multiplier = *n;
                    i += 1;
                }
                merge_scaled(stack.last_mut().unwrap(), &group, multiplier);
                i += 1;
            }
            Token::HydrateDot => {
                if let Some(Token::Number(n)) = tokens.get(i + 1) {
                    let suffix = evaluate_tokens(&tokens[i + 2..]);
                    merge_scaled(stack.last_mut().unwrap(), &suffix, *n);
                    break;
                }
                // a dot with no count is a plain separator
                i += 1;
            }
            Token::Number(n) => match tokens.get(i + 1) {
                Some(Token::Element { symbol, count }) => {
                    let entry = stack.last_mut().unwrap().entry(symbol.clone()).or_insert(0);
                    *entry = entry.saturating_add(n.saturating_mul(*count));
                    i += 2;
                }
                Some(Token::Delimiter(c)) if is_open_delimiter(*c) => {
                    let close = matching_close(tokens, i + 1);
                    let group = evaluate_tokens(&tokens[i + 2..close.min(tokens.len())]);
                    merge_scaled(stack.last_mut().unwrap(), &group, *n);
                    i = close + 1;
                }
                // stray multiplier with no target
                _ => i += 1,
            },
        }
    }
    // groups left open by malformed input collapse into their parent
    while stack.len() > 1 {
        let group = stack.pop().unwrap();
        merge_scaled(stack.last_mut().unwrap(), &group, 1);
    }
    let mut root = stack.pop().unwrap();
    root.retain(|_, count| *count > 0);
    root
}

/// Convenience wrapper: tokenize and evaluate in one call.
pub fn count_elements(formula: &str) -> ElementComposition {
    evaluate_tokens(&tokenize(formula))
}

/// Multiplies every count by `k`. Scaling by zero yields the empty composition.
pub fn scale_composition(counts: &ElementComposition, k: usize) -> ElementComposition {
    let mut scaled = ElementComposition::new();
    merge_scaled(&mut scaled, counts, k);
    scaled
}

/// Element-wise sum of several compositions.
pub fn sum_compositions(list: &[ElementComposition]) -> ElementComposition {
    let mut total = ElementComposition::new();
    for counts in list {
        merge_scaled(&mut total, counts, 1);
    }
    total
}

// Element data for the auxiliary molar mass calculation. The balancing path
// never consults this table; symbols missing here still balance fine.
struct ElementData {
    name: &'static str,
    atomic_mass: f64,
}

const ELEMENTS: &[ElementData] = &[
    ElementData { name: "H", atomic_mass: 1.008 },
    ElementData { name: "He", atomic_mass: 4.0026 },
    ElementData { name: "Li", atomic_mass: 6.94 },
    ElementData { name: "Be", atomic_mass: 9.0122 },
    ElementData { name: "B", atomic_mass: 10.81 },
    ElementData { name: "C", atomic_mass: 12.011 },
    ElementData { name: "N", atomic_mass: 14.007 },
    ElementData { name: "O", atomic_mass: 15.999 },
    ElementData { name: "F", atomic_mass: 18.998 },
    ElementData { name: "Ne", atomic_mass: 20.18 },
    ElementData { name: "Na", atomic_mass: 22.99 },
    ElementData { name: "Mg", atomic_mass: 24.305 },
    ElementData { name: "Al", atomic_mass: 26.98 },
    ElementData { name: "Si", atomic_mass: 28.085 },
    ElementData { name: "P", atomic_mass: 30.974 },
    ElementData { name: "S", atomic_mass: 32.065 },
    ElementData { name: "Cl", atomic_mass: 35.45 },
    ElementData { name: "Ar", atomic_mass: 39.948 },
    ElementData { name: "K", atomic_mass: 39.102 },
    ElementData { name: "Ca", atomic_mass: 40.08 },
    ElementData { name: "Sc", atomic_mass: 44.9559 },
    ElementData { name: "Ti", atomic_mass: 47.867 },
    ElementData { name: "V", atomic_mass: 50.9415 },
    ElementData { name: "Cr", atomic_mass: 51.9961 },
    ElementData { name: "Mn", atomic_mass: 54.938 },
    ElementData { name: "Fe", atomic_mass: 55.845 },
    ElementData { name: "Co", atomic_mass: 58.933 },
    ElementData { name: "Ni", atomic_mass: 58.69 },
    ElementData { name: "Cu", atomic_mass: 63.546 },
    ElementData { name: "Zn", atomic_mass: 65.38 },
    ElementData { name: "Ga", atomic_mass: 69.723 },
    ElementData { name: "Ge", atomic_mass: 72.64 },
    ElementData { name: "As", atomic_mass: 74.9216 },
    ElementData { name: "Se", atomic_mass: 78.96 },
    ElementData { name: "Br", atomic_mass: 79.904 },
    ElementData { name: "Kr", atomic_mass: 83.798 },
    ElementData { name: "Rb", atomic_mass: 85.4678 },
    ElementData { name: "Sr", atomic_mass: 87.62 },
    ElementData { name: "Y", atomic_mass: 88.9059 },
    ElementData { name: "Zr", atomic_mass: 91.224 },
    ElementData { name: "Nb", atomic_mass: 92.9064 },
    ElementData { name: "Mo", atomic_mass: 95.94 },
    ElementData { name: "Tc", atomic_mass: 98.0 },
    ElementData { name: "Ru", atomic_mass: 101.07 },
    ElementData { name: "Rh", atomic_mass: 102.9055 },
    ElementData { name: "Pd", atomic_mass: 106.42 },
    ElementData { name: "Ag", atomic_mass: 107.8682 },
    ElementData { name: "Cd", atomic_mass: 112.411 },
    ElementData { name: "In", atomic_mass: 114.818 },
    ElementData { name: "Sn", atomic_mass: 118.71 },
    ElementData { name: "Sb", atomic_mass: 121.76 },
    ElementData { name: "Te", atomic_mass: 127.6 },
    ElementData { name: "I", atomic_mass: 126.9045 },
    ElementData { name: "Xe", atomic_mass: 131.293 },
    ElementData { name: "Cs", atomic_mass: 132.9055 },
    ElementData { name: "Ba", atomic_mass: 137.327 },
    ElementData { name: "W", atomic_mass: 183.84 },
    ElementData { name: "Pt", atomic_mass: 195.084 },
    ElementData { name: "Au", atomic_mass: 196.9666 },
    ElementData { name: "Hg", atomic_mass: 200.59 },
    ElementData { name: "Pb", atomic_mass: 207.2 },
    ElementData { name: "U", atomic_mass: 238.0289 },
];

/// Molar mass of a formula in g/mol. Symbols missing from the element table
/// contribute zero mass and are reported through the log facade.
pub fn molar_mass(formula: &str) -> f64 {
    let counts = count_elements(formula);
    let mut mass = 0.0;
    for (symbol, count) in &counts {
        match ELEMENTS.iter().find(|e| e.name == symbol.as_str()) {
            Some(e) => mass += e.atomic_mass * *count as f64,
            None => warn!("molar_mass: no atomic mass for symbol {}", symbol),
        }
    }
    mass
}

/// Molar masses of a batch of formulas, in input order.
pub fn molar_masses(formulas: &[&str]) -> Vec<f64> {
    formulas.iter().map(|f| molar_mass(f)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn composition(pairs: &[(&str, usize)]) -> ElementComposition {
        pairs
            .iter()
            .map(|(s, n)| (s.to_string(), *n))
            .collect()
    }

    #[test]
    fn test_tokenize_simple() {
        let tokens = tokenize("H2O");
        assert_eq!(
            tokens,
            vec![
                Token::Element { symbol: "H".to_string(), count: 2 },
                Token::Element { symbol: "O".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_tokenize_brackets_and_numbers() {
        let tokens = tokenize("K4[Fe(CN)6]");
        assert_eq!(
            tokens,
            vec![
                Token::Element { symbol: "K".to_string(), count: 4 },
                Token::Delimiter('['),
                Token::Element { symbol: "Fe".to_string(), count: 1 },
                Token::Delimiter('('),
                Token::Element { symbol: "C".to_string(), count: 1 },
                Token::Element { symbol: "N".to_string(), count: 1 },
                Token::Delimiter(')'),
                Token::Number(6),
                Token::Delimiter(']'),
            ]
        );
    }

    #[test]
    fn test_tokenize_skips_junk_and_whitespace() {
        assert_eq!(tokenize(" H 2 O "), tokenize("H2O"));
        assert_eq!(tokenize("H2O*?!"), tokenize("H2O"));
    }

    #[test]
    fn test_count_elements_plain() {
        assert_eq!(count_elements("H2O"), composition(&[("H", 2), ("O", 1)]));
        assert_eq!(
            count_elements("C6H8O6"),
            composition(&[("C", 6), ("H", 8), ("O", 6)])
        );
    }

    #[test]
    fn test_count_elements_groups() {
        assert_eq!(
            count_elements("Mg(OH)2"),
            composition(&[("Mg", 1), ("O", 2), ("H", 2)])
        );
        assert_eq!(
            count_elements("Al2(SO4)3"),
            composition(&[("Al", 2), ("S", 3), ("O", 12)])
        );
    }

    #[test]
    fn test_count_elements_nested_brackets() {
        assert_eq!(
            count_elements("K4[Fe(CN)6]"),
            composition(&[("K", 4), ("Fe", 1), ("C", 6), ("N", 6)])
        );
    }

    #[test]
    fn test_count_elements_hydrate() {
        assert_eq!(
            count_elements("CuSO4·5H2O"),
            composition(&[("Cu", 1), ("S", 1), ("O", 9), ("H", 10)])
        );
        // ASCII period works as the separator too
        assert_eq!(count_elements("CuSO4.5H2O"), count_elements("CuSO4·5H2O"));
        // dot without a count is a no-op separator
        assert_eq!(
            count_elements("NaCl·H2O"),
            composition(&[("Na", 1), ("Cl", 1), ("H", 2), ("O", 1)])
        );
    }

    #[test]
    fn test_leading_number_scales_one_element() {
        assert_eq!(count_elements("2H2"), composition(&[("H", 4)]));
        assert_eq!(
            count_elements("2(OH)"),
            composition(&[("O", 2), ("H", 2)])
        );
    }

    #[test]
    fn test_mismatched_brackets_tolerated() {
        // family mismatch closes the group anyway
        assert_eq!(
            count_elements("Mg(OH]2"),
            composition(&[("Mg", 1), ("O", 2), ("H", 2)])
        );
        // unmatched open collapses without a multiplier
        assert_eq!(
            count_elements("Mg(OH"),
            composition(&[("Mg", 1), ("O", 1), ("H", 1)])
        );
    }

    #[test]
    fn test_nested_multiplier_overflow_saturates() {
        // 9^25 is far past usize::MAX; deep multiplier stacks must neither
        // panic nor wrap
        let mut formula = String::new();
        for _ in 0..25 {
            formula.push('(');
        }
        formula.push('H');
        for _ in 0..25 {
            formula.push_str(")9");
        }
        assert_eq!(count_elements(&formula).get("H"), Some(&usize::MAX));
    }

    #[test]
    fn test_huge_multiplicity_saturates() {
        let formula = format!("H{}", "9".repeat(30));
        assert_eq!(count_elements(&formula).get("H"), Some(&usize::MAX));
        // saturation, not a fallback to 1
        assert_ne!(count_elements(&formula).get("H"), Some(&1));
    }

    #[test]
    fn test_standalone_number_without_target_ignored() {
        // junk between O and 7 breaks the digit run, leaving a bare Number
        assert_eq!(
            count_elements("H2O*7"),
            composition(&[("H", 2), ("O", 1)])
        );
        assert_eq!(count_elements("7"), ElementComposition::new());
        // a number before a hydrate dot has no target either
        assert_eq!(
            count_elements("2·H2O"),
            composition(&[("H", 2), ("O", 1)])
        );
    }

    #[test]
    fn test_determinism_and_order() {
        let a = count_elements("K4[Fe(CN)6]");
        let b = count_elements("K4[Fe(CN)6]");
        assert_eq!(a, b);
        let keys: Vec<&String> = a.keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn test_scale_and_sum() {
        let c = count_elements("H2O");
        assert_eq!(scale_composition(&c, 1), c);
        assert_eq!(sum_compositions(&[scale_composition(&c, 1)]), c);
        assert_eq!(scale_composition(&c, 0), ElementComposition::new());

        let a = count_elements("H2O");
        let b = count_elements("CO2");
        let total = sum_compositions(&[a.clone(), b.clone()]);
        for element in ["H", "C", "O"] {
            let expected =
                a.get(element).copied().unwrap_or(0) + b.get(element).copied().unwrap_or(0);
            assert_eq!(total.get(element).copied().unwrap_or(0), expected);
        }
    }

    #[test]
    fn test_molar_mass() {
        assert_relative_eq!(molar_mass("H2O"), 18.015, epsilon = 1e-2);
        assert_relative_eq!(molar_mass("NaCl"), 58.44, epsilon = 1e-2);
        assert_relative_eq!(molar_mass("Ca(NO3)2"), 164.093, epsilon = 1e-2);
    }

    #[test]
    fn test_molar_masses_batch() {
        let masses = molar_masses(&["H2O", "NaCl"]);
        assert_relative_eq!(masses[0], 18.015, epsilon = 1e-2);
        assert_relative_eq!(masses[1], 58.44, epsilon = 1e-2);
    }
}
