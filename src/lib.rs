//! Chemical formula parsing and reaction equation balancing.
//!
//! The engine is a set of pure functions: formulas are tokenized and evaluated
//! into element compositions, equations are split into species, and minimal
//! positive integer coefficients are found through an exact-rational nullspace
//! solve of the stoichiometric matrix. No global state, no caching; every call
//! works on its own data.

pub mod balancer;
pub mod equation_parser;
pub mod formula_parser;
pub mod rational_solver;
pub mod stoichiometry;
