use crate::canon::canonicalize_core;
use crate::counter::HndqCallBudget;
use crate::error::CanonicalizationError;
use crate::nquads::{parse_nquads, serialize_dataset, serialize_graph};
use oxrdf::{
    BlankNode, BlankNodeRef, Dataset, Graph, GraphNameRef, Quad, QuadRef, SubjectRef, TermRef,
    Triple, TripleRef,
};
use sha2::{Sha256, Sha384};
use std::collections::HashMap;

/// Hash function fed by the blank node hashing algorithms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha384,
}

/// Options accepted by the `_with` variants of the facade functions.
#[derive(Debug, Clone)]
pub struct CanonicalizationOptions {
    /// Hash function used for first-degree and N-degree hashes.
    pub hash_algorithm: HashAlgorithm,
    /// Prefix of issued canonical identifiers.
    pub canonical_prefix: String,
    /// Upper bound on Hash N-Degree Quads invocations; `None` is unbounded.
    /// Worth setting when canonicalizing untrusted input, whose permutation
    /// search can be made super-polynomial.
    pub hndq_call_limit: Option<usize>,
}

impl Default for CanonicalizationOptions {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            canonical_prefix: "c14n".to_string(),
            hndq_call_limit: None,
        }
    }
}

/// The result of canonicalization: the (deduplicated) input dataset together
/// with the canonical identifier issued to every blank node in it.
#[derive(Debug, Clone)]
pub struct CanonicalizedDataset {
    input_dataset: Dataset,
    issued_identifiers: HashMap<String, String>,
}

impl CanonicalizedDataset {
    pub fn input_dataset(&self) -> &Dataset {
        &self.input_dataset
    }

    /// Maps each input blank node identifier to its canonical identifier.
    pub fn issued_identifiers(&self) -> &HashMap<String, String> {
        &self.issued_identifiers
    }
}

/// Returns the canonical N-Quads form of the dataset, with every blank node
/// relabeled to its deterministic `c14n`-prefixed identifier.
///
/// # Examples
///
/// ```
/// use rdf_c14n::{canonicalize, parse_nquads};
///
/// let input = r#"_:e0 <http://example.org/vocab#next> _:e1 _:g .
/// _:e0 <http://example.org/vocab#prev> _:e2 _:g .
/// _:e1 <http://example.org/vocab#next> _:e2 _:g .
/// _:e1 <http://example.org/vocab#prev> _:e0 _:g .
/// _:e2 <http://example.org/vocab#next> _:e0 _:g .
/// _:e2 <http://example.org/vocab#prev> _:e1 _:g .
/// <urn:ex:s> <urn:ex:p> "\u0008\u0009\u000a\u000b\u000c\u000d\u0022\u005c\u007f" _:g .
/// "#;
/// let expected = r#"<urn:ex:s> <urn:ex:p> "\b\t\n\u000B\f\r\"\\\u007F" _:c14n0 .
/// _:c14n1 <http://example.org/vocab#next> _:c14n2 _:c14n0 .
/// _:c14n1 <http://example.org/vocab#prev> _:c14n3 _:c14n0 .
/// _:c14n2 <http://example.org/vocab#next> _:c14n3 _:c14n0 .
/// _:c14n2 <http://example.org/vocab#prev> _:c14n1 _:c14n0 .
/// _:c14n3 <http://example.org/vocab#next> _:c14n1 _:c14n0 .
/// _:c14n3 <http://example.org/vocab#prev> _:c14n2 _:c14n0 .
/// "#;
///
/// let input_dataset = parse_nquads(input)?;
/// assert_eq!(canonicalize(&input_dataset)?, expected);
/// # Ok::<_, rdf_c14n::CanonicalizationError>(())
/// ```
pub fn canonicalize(input_dataset: &Dataset) -> Result<String, CanonicalizationError> {
    canonicalize_with(input_dataset, &CanonicalizationOptions::default())
}

/// [`canonicalize`] with explicit options.
pub fn canonicalize_with(
    input_dataset: &Dataset,
    options: &CanonicalizationOptions,
) -> Result<String, CanonicalizationError> {
    let issued_identifiers = issue_identifiers(input_dataset, options)?;
    let relabeled = relabel(input_dataset, &issued_identifiers)?;
    Ok(serialize_dataset(&relabeled))
}

/// Returns the canonical N-Triples form of the graph, treating its triples
/// as quads in the default graph.
///
/// # Examples
///
/// ```
/// use oxrdf::Graph;
/// use oxttl::NTriplesParser;
/// use rdf_c14n::canonicalize_graph;
///
/// let input = r#"_:e0 <http://example.org/vocab#next> _:e1 .
/// _:e0 <http://example.org/vocab#prev> _:e2 .
/// _:e1 <http://example.org/vocab#next> _:e2 .
/// _:e1 <http://example.org/vocab#prev> _:e0 .
/// _:e2 <http://example.org/vocab#next> _:e0 .
/// _:e2 <http://example.org/vocab#prev> _:e1 .
/// "#;
/// let expected = r#"_:c14n0 <http://example.org/vocab#next> _:c14n2 .
/// _:c14n0 <http://example.org/vocab#prev> _:c14n1 .
/// _:c14n1 <http://example.org/vocab#next> _:c14n0 .
/// _:c14n1 <http://example.org/vocab#prev> _:c14n2 .
/// _:c14n2 <http://example.org/vocab#next> _:c14n1 .
/// _:c14n2 <http://example.org/vocab#prev> _:c14n0 .
/// "#;
///
/// let triples = NTriplesParser::new()
///     .for_reader(input.as_bytes())
///     .collect::<Result<Vec<_>, _>>()?;
/// let input_graph = Graph::from_iter(triples);
/// assert_eq!(canonicalize_graph(&input_graph)?, expected);
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub fn canonicalize_graph(input_graph: &Graph) -> Result<String, CanonicalizationError> {
    canonicalize_graph_with(input_graph, &CanonicalizationOptions::default())
}

/// [`canonicalize_graph`] with explicit options.
pub fn canonicalize_graph_with(
    input_graph: &Graph,
    options: &CanonicalizationOptions,
) -> Result<String, CanonicalizationError> {
    let input_dataset: Dataset = input_graph
        .iter()
        .map(|t| QuadRef::new(t.subject, t.predicate, t.object, GraphNameRef::DefaultGraph))
        .collect();
    let issued_identifiers = issue_identifiers(&input_dataset, options)?;
    let relabeled = relabel_graph(input_graph, &issued_identifiers)?;
    Ok(serialize_graph(&relabeled))
}

/// Whether two datasets are equal up to blank node relabeling, decided by
/// comparing their canonical forms.
///
/// # Examples
///
/// ```
/// use rdf_c14n::{is_isomorphic, parse_nquads};
///
/// let a = parse_nquads("_:a <http://example.org/#p> _:b .\n_:b <http://example.org/#p> _:a .\n")?;
/// let b = parse_nquads("_:y <http://example.org/#p> _:x .\n_:x <http://example.org/#p> _:y .\n")?;
/// let c = parse_nquads("_:z <http://example.org/#p> _:z .\n")?;
/// assert!(is_isomorphic(&a, &b)?);
/// assert!(!is_isomorphic(&a, &c)?);
/// # Ok::<_, rdf_c14n::CanonicalizationError>(())
/// ```
pub fn is_isomorphic(a: &Dataset, b: &Dataset) -> Result<bool, CanonicalizationError> {
    is_isomorphic_with(a, b, &CanonicalizationOptions::default())
}

/// [`is_isomorphic`] with explicit options.
pub fn is_isomorphic_with(
    a: &Dataset,
    b: &Dataset,
    options: &CanonicalizationOptions,
) -> Result<bool, CanonicalizationError> {
    Ok(canonicalize_with(a, options)? == canonicalize_with(b, options)?)
}

/// Whether two graphs are equal up to blank node relabeling.
pub fn is_isomorphic_graphs(a: &Graph, b: &Graph) -> Result<bool, CanonicalizationError> {
    is_isomorphic_graphs_with(a, b, &CanonicalizationOptions::default())
}

/// [`is_isomorphic_graphs`] with explicit options.
pub fn is_isomorphic_graphs_with(
    a: &Graph,
    b: &Graph,
    options: &CanonicalizationOptions,
) -> Result<bool, CanonicalizationError> {
    Ok(canonicalize_graph_with(a, options)? == canonicalize_graph_with(b, options)?)
}

/// Runs the canonicalization algorithm and returns the input dataset paired
/// with the issued identifier map, leaving serialization to [`to_nquads`].
///
/// # Examples
///
/// ```
/// use rdf_c14n::{parse_nquads, to_canonicalized_dataset};
/// use std::collections::HashMap;
///
/// let input = r#"_:e0 <http://example.org/vocab#next> _:e1 _:g .
/// _:e0 <http://example.org/vocab#prev> _:e2 _:g .
/// _:e1 <http://example.org/vocab#next> _:e2 _:g .
/// _:e1 <http://example.org/vocab#prev> _:e0 _:g .
/// _:e2 <http://example.org/vocab#next> _:e0 _:g .
/// _:e2 <http://example.org/vocab#prev> _:e1 _:g .
/// "#;
/// let expected: HashMap<String, String> = [
///     ("g", "c14n0"),
///     ("e0", "c14n1"),
///     ("e1", "c14n2"),
///     ("e2", "c14n3"),
/// ]
/// .into_iter()
/// .map(|(existing, canonical)| (existing.to_string(), canonical.to_string()))
/// .collect();
///
/// let canonicalized = to_canonicalized_dataset(&parse_nquads(input)?)?;
/// assert_eq!(canonicalized.issued_identifiers(), &expected);
/// # Ok::<_, rdf_c14n::CanonicalizationError>(())
/// ```
pub fn to_canonicalized_dataset(
    input_dataset: &Dataset,
) -> Result<CanonicalizedDataset, CanonicalizationError> {
    to_canonicalized_dataset_with(input_dataset, &CanonicalizationOptions::default())
}

/// [`to_canonicalized_dataset`] with explicit options.
pub fn to_canonicalized_dataset_with(
    input_dataset: &Dataset,
    options: &CanonicalizationOptions,
) -> Result<CanonicalizedDataset, CanonicalizationError> {
    let issued_identifiers = issue_identifiers(input_dataset, options)?;
    Ok(CanonicalizedDataset {
        input_dataset: input_dataset.clone(),
        issued_identifiers,
    })
}

/// Parses an N-Quads document and canonicalizes the resulting dataset.
pub fn to_canonicalized_dataset_from_nquads(
    input: &str,
) -> Result<CanonicalizedDataset, CanonicalizationError> {
    to_canonicalized_dataset_from_nquads_with(input, &CanonicalizationOptions::default())
}

/// [`to_canonicalized_dataset_from_nquads`] with explicit options.
pub fn to_canonicalized_dataset_from_nquads_with(
    input: &str,
    options: &CanonicalizationOptions,
) -> Result<CanonicalizedDataset, CanonicalizationError> {
    let input_dataset = parse_nquads(input)?;
    let issued_identifiers = issue_identifiers(&input_dataset, options)?;
    Ok(CanonicalizedDataset {
        input_dataset,
        issued_identifiers,
    })
}

/// Serializes a canonicalized dataset as canonical N-Quads: blank nodes
/// relabeled to their issued identifiers, one quad per line, lines sorted in
/// code point order.
///
/// # Examples
///
/// ```
/// use rdf_c14n::{to_canonicalized_dataset_from_nquads, to_nquads};
///
/// let input = "_:b <http://example.org/#p> _:a .\n_:a <http://example.org/#p> _:b .\n";
/// let canonicalized = to_canonicalized_dataset_from_nquads(input)?;
/// assert_eq!(
///     to_nquads(&canonicalized)?,
///     "_:c14n0 <http://example.org/#p> _:c14n1 .\n_:c14n1 <http://example.org/#p> _:c14n0 .\n"
/// );
/// # Ok::<_, rdf_c14n::CanonicalizationError>(())
/// ```
pub fn to_nquads(canonicalized: &CanonicalizedDataset) -> Result<String, CanonicalizationError> {
    let relabeled = relabel(&canonicalized.input_dataset, &canonicalized.issued_identifiers)?;
    Ok(serialize_dataset(&relabeled))
}

/// Rebuilds the dataset with every blank node relabeled according to
/// `issued_identifiers`.
///
/// # Examples
///
/// ```
/// use rdf_c14n::{parse_nquads, relabel};
/// use std::collections::HashMap;
///
/// let dataset = parse_nquads("_:x <http://example.com/p> \"v\" .\n")?;
/// let issued = HashMap::from([("x".to_string(), "c14n0".to_string())]);
/// assert_eq!(
///     relabel(&dataset, &issued)?,
///     parse_nquads("_:c14n0 <http://example.com/p> \"v\" .\n")?
/// );
/// # Ok::<_, rdf_c14n::CanonicalizationError>(())
/// ```
pub fn relabel(
    input_dataset: &Dataset,
    issued_identifiers: &HashMap<String, String>,
) -> Result<Dataset, CanonicalizationError> {
    input_dataset
        .iter()
        .map(|quad| relabel_quad(quad, issued_identifiers))
        .collect()
}

/// Rebuilds the graph with every blank node relabeled according to
/// `issued_identifiers`.
pub fn relabel_graph(
    input_graph: &Graph,
    issued_identifiers: &HashMap<String, String>,
) -> Result<Graph, CanonicalizationError> {
    input_graph
        .iter()
        .map(|triple| relabel_triple(triple, issued_identifiers))
        .collect()
}

fn issue_identifiers(
    input_dataset: &Dataset,
    options: &CanonicalizationOptions,
) -> Result<HashMap<String, String>, CanonicalizationError> {
    let mut budget = HndqCallBudget::new(options.hndq_call_limit);
    match options.hash_algorithm {
        HashAlgorithm::Sha256 => {
            canonicalize_core::<Sha256>(input_dataset, &options.canonical_prefix, &mut budget)
        }
        HashAlgorithm::Sha384 => {
            canonicalize_core::<Sha384>(input_dataset, &options.canonical_prefix, &mut budget)
        }
    }
}

fn relabel_quad(
    quad: QuadRef<'_>,
    issued_identifiers: &HashMap<String, String>,
) -> Result<Quad, CanonicalizationError> {
    Ok(Quad::new(
        match quad.subject {
            SubjectRef::BlankNode(n) => relabel_blank_node(n, issued_identifiers)?.into(),
            s => s.into_owned(),
        },
        quad.predicate,
        match quad.object {
            TermRef::BlankNode(n) => relabel_blank_node(n, issued_identifiers)?.into(),
            o => o.into_owned(),
        },
        match quad.graph_name {
            GraphNameRef::BlankNode(n) => relabel_blank_node(n, issued_identifiers)?.into(),
            g => g.into_owned(),
        },
    ))
}

fn relabel_triple(
    triple: TripleRef<'_>,
    issued_identifiers: &HashMap<String, String>,
) -> Result<Triple, CanonicalizationError> {
    Ok(Triple::new(
        match triple.subject {
            SubjectRef::BlankNode(n) => relabel_blank_node(n, issued_identifiers)?.into(),
            s => s.into_owned(),
        },
        triple.predicate,
        match triple.object {
            TermRef::BlankNode(n) => relabel_blank_node(n, issued_identifiers)?.into(),
            o => o.into_owned(),
        },
    ))
}

fn relabel_blank_node(
    blank_node: BlankNodeRef<'_>,
    issued_identifiers: &HashMap<String, String>,
) -> Result<BlankNode, CanonicalizationError> {
    let canonical = issued_identifiers.get(blank_node.as_str()).ok_or_else(|| {
        CanonicalizationError::UnissuedBlankNode(blank_node.as_str().to_string())
    })?;
    Ok(BlankNode::new(canonical.as_str())?)
}
