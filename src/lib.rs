//! RDF Dataset Canonicalization ([RDFC-1.0]) over [`oxrdf`] datasets.
//!
//! Blank nodes have no global identity, so two datasets that differ only in
//! blank node labels serialize differently even though they say the same
//! thing. This crate deterministically assigns every blank node a canonical
//! identifier (`c14n0`, `c14n1`, ...) such that isomorphic datasets produce
//! byte-identical canonical N-Quads, which makes digital signing, diffing,
//! and equality checks over RDF possible.
//!
//! The entry points are [`canonicalize`] (dataset in, canonical N-Quads
//! out), [`to_canonicalized_dataset`] (keeps the issued identifier map), and
//! [`is_isomorphic`]. Graph counterparts operate on [`oxrdf::Graph`].
//!
//! [RDFC-1.0]: https://www.w3.org/TR/rdf-canon/

mod api;
mod canon;
mod counter;
mod error;
mod issuer;
#[cfg(feature = "log")]
pub mod logger;
mod nquads;

pub use api::{
    canonicalize, canonicalize_graph, canonicalize_graph_with, canonicalize_with, is_isomorphic,
    is_isomorphic_graphs, is_isomorphic_graphs_with, is_isomorphic_with, relabel, relabel_graph,
    to_canonicalized_dataset, to_canonicalized_dataset_from_nquads,
    to_canonicalized_dataset_from_nquads_with, to_canonicalized_dataset_with, to_nquads,
    CanonicalizationOptions, CanonicalizedDataset, HashAlgorithm,
};
pub use error::CanonicalizationError;
pub use nquads::parse_nquads;
