use oxrdf::BlankNodeIdParseError;
use thiserror::Error;

/// Everything that can go wrong during canonicalization.
///
/// Only [`NQuadsParse`](Self::NQuadsParse) (malformed external input) and
/// [`HndqCallLimitExceeded`](Self::HndqCallLimitExceeded) (an opt-in resource
/// bound) are expected in normal operation; the remaining variants indicate a
/// bug in the canonicalizer or its configuration and are never produced on a
/// conformant execution.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// The input N-Quads document could not be parsed.
    #[error("failed to parse input N-Quads: {0}")]
    NQuadsParse(#[from] oxttl::TurtleParseError),

    /// A reference blank node has no entry in the blank node to quads map.
    #[error("blank node _:{0} is missing from the blank node to quads map")]
    MissingMentionSet(String),

    /// A blank node survived the labeling passes without ever receiving a
    /// canonical identifier.
    #[error("no canonical identifier was issued for blank node _:{0}")]
    UnissuedBlankNode(String),

    /// An issued identifier is not a valid blank node identifier. Only
    /// reachable when the configured canonical prefix is itself invalid.
    #[error("issued identifier is not a valid blank node identifier: {0}")]
    InvalidIssuedIdentifier(#[from] BlankNodeIdParseError),

    /// The configured bound on Hash N-Degree Quads invocations was hit.
    #[error("the limit of {0} calls to Hash N-Degree Quads has been exceeded")]
    HndqCallLimitExceeded(usize),
}
