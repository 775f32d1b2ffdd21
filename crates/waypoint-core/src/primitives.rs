//! # Innate Primitives
//!
//! Hardcoded runtime constants for the Waypoint CORE.
//!
//! The graph content is authored offline and arrives at runtime, but the rules
//! for walking it are fixed. These primitives are compiled into the binary
//! and are immutable at runtime.

/// Reserved pseudo-option id that submits a feature selection.
///
/// Selecting it on a feature-selection node does not resolve an authored
/// option; it consumes the pending feature selection and follows the node's
/// single outgoing edge (its recipe successor).
pub const FEATURE_SELECTION_SUBMIT: &str = "feature-selection-submit";

/// Number of leading recipe steps that are always included.
///
/// Together with the last authored step these form the core steps
/// (`{1, 2, N}` for an `N`-step recipe).
pub const LEADING_CORE_STEPS: u32 = 2;

/// Separator between a feature id and its granular refinements.
///
/// `token-limits-request` refines `token-limits` because it starts with
/// `token-limits` followed by this separator.
pub const FEATURE_ID_SEPARATOR: char = '-';

/// Metadata key under which the mirror stores its version token.
pub const VERSION_KEY: &str = "version";
