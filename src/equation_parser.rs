//! Splitting of textual reaction equations into reactant and product species.
//!
//! Several arrow spellings are accepted (`->`, `=>`, `→`, `⇒`, `⇌`, `⟷`, and
//! dash or equals runs before `>`); they all normalize to one canonical arrow
//! before the string is split. A string with zero or several arrows is not an
//! equation and yields `None` rather than an error.

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The arrow all recognized spellings are normalized to.
pub const CANONICAL_ARROW: char = '→';

/// One reactant or product: a formula with its leading coefficient
/// (1 when the chunk carries no explicit coefficient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Species {
    pub coefficient: usize,
    pub formula: String,
}

/// The two sides of a split equation, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquationSides {
    pub left: Vec<String>,
    pub right: Vec<String>,
}

/// Replaces every recognized arrow spelling with [`CANONICAL_ARROW`].
/// Runs of `-` or `=` before `>` count as a single arrow, so `-->` and `==>`
/// work the same as `->`.
pub fn normalize_arrows(text: &str) -> String {
    let re = Regex::new(r"[-=]+>|⇒|⇌|⟷").unwrap();
    re.replace_all(text, CANONICAL_ARROW.to_string().as_str())
        .into_owned()
}

fn side_chunks(side: &str) -> Vec<String> {
    side.split('+')
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits an equation into its `+`-delimited species chunks per side.
/// Exactly one arrow must remain after normalization; otherwise the input is
/// not an equation and `None` is returned. Chunks keep their leading
/// coefficients; use [`parse_species`] to strip them.
pub fn split_equation(text: &str) -> Option<EquationSides> {
    let normalized = normalize_arrows(text);
    if normalized.matches(CANONICAL_ARROW).count() != 1 {
        return None;
    }
    let mut parts = normalized.split(CANONICAL_ARROW);
    let left = side_chunks(parts.next().unwrap_or(""));
    let right = side_chunks(parts.next().unwrap_or(""));
    Some(EquationSides { left, right })
}

/// Parses one species chunk into its coefficient and formula text.
/// A run of leading digits is the coefficient; no digits means 1.
pub fn parse_species(chunk: &str) -> Species {
    let re = Regex::new(r"^(\d+)\s*(.*)$").unwrap();
    match re.captures(chunk.trim()) {
        Some(cap) => {
            let coefficient = cap[1].parse().unwrap_or(1);
            Species {
                coefficient,
                formula: cap[2].trim().to_string(),
            }
        }
        None => Species {
            coefficient: 1,
            formula: chunk.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_arrows() {
        assert_eq!(normalize_arrows("A -> B"), "A → B");
        assert_eq!(normalize_arrows("A => B"), "A → B");
        assert_eq!(normalize_arrows("A --> B"), "A → B");
        assert_eq!(normalize_arrows("A ===> B"), "A → B");
        assert_eq!(normalize_arrows("A ⇌ B"), "A → B");
        assert_eq!(normalize_arrows("A → B"), "A → B");
    }

    #[test]
    fn test_split_equation() {
        let sides = split_equation("C3H8 + O2 -> CO2 + H2O").unwrap();
        assert_eq!(sides.left, vec!["C3H8", "O2"]);
        assert_eq!(sides.right, vec!["CO2", "H2O"]);
    }

    #[test]
    fn test_split_equation_no_arrow() {
        assert_eq!(split_equation("H2 + O2 CO2 + H2O"), None);
    }

    #[test]
    fn test_split_equation_two_arrows() {
        assert_eq!(split_equation("A -> B -> C"), None);
    }

    #[test]
    fn test_split_drops_empty_chunks() {
        let sides = split_equation("H2 + + O2 -> H2O +").unwrap();
        assert_eq!(sides.left, vec!["H2", "O2"]);
        assert_eq!(sides.right, vec!["H2O"]);
    }

    #[test]
    fn test_parse_species() {
        assert_eq!(
            parse_species("2H2O"),
            Species { coefficient: 2, formula: "H2O".to_string() }
        );
        assert_eq!(
            parse_species("  3 Fe2O3 "),
            Species { coefficient: 3, formula: "Fe2O3".to_string() }
        );
        assert_eq!(
            parse_species("O2"),
            Species { coefficient: 1, formula: "O2".to_string() }
        );
    }
}
