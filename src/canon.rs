//! The RDFC-1.0 labeling algorithm: first-degree hashing, N-degree hashing
//! with permutation search, and the canonicalization driver.

use crate::counter::HndqCallBudget;
use crate::error::CanonicalizationError;
use crate::issuer::IdentifierIssuer;
use crate::nquads::quad_line;
use base16ct::lower::encode_string;
use digest::Digest;
use itertools::Itertools;
use oxrdf::{BlankNode, BlankNodeRef, Dataset, GraphNameRef, Quad, QuadRef, SubjectRef, TermRef};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, debug_span};

/// Prefix of the temporary identifiers issued along N-degree hash paths.
const TEMPORARY_ISSUER_PREFIX: &str = "b";

/// Canonicalization state (RDFC-1.0 §4.3), owned by a single invocation.
pub(crate) struct CanonicalizationState<'a> {
    /// Blank node identifier to the quads in which it appears (its mention
    /// set). A blank node counts as appearing in subject, object, or graph
    /// name position.
    mention_sets: HashMap<String, Vec<QuadRef<'a>>>,

    /// First-degree hash to the blank node identifiers carrying it. The
    /// BTreeMap keeps buckets in code point order of the hash.
    hash_buckets: BTreeMap<String, Vec<String>>,

    canonical_issuer: IdentifierIssuer,
}

impl<'a> CanonicalizationState<'a> {
    fn new(canonical_prefix: &str) -> Self {
        Self {
            mention_sets: HashMap::new(),
            hash_buckets: BTreeMap::new(),
            canonical_issuer: IdentifierIssuer::new(canonical_prefix),
        }
    }

    fn index_blank_nodes(&mut self, dataset: &'a Dataset) {
        for quad in dataset.iter() {
            for (blank_node, _) in blank_node_components(quad) {
                self.mention_sets
                    .entry(blank_node.as_str().to_string())
                    .or_default()
                    .push(quad);
            }
        }
    }

    fn mention_set(&self, identifier: &str) -> Result<&[QuadRef<'a>], CanonicalizationError> {
        self.mention_sets
            .get(identifier)
            .map(Vec::as_slice)
            .ok_or_else(|| CanonicalizationError::MissingMentionSet(identifier.to_string()))
    }
}

/// Position of a related blank node within a quad (RDFC-1.0 §4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Subject,
    Object,
    GraphName,
}

impl Position {
    fn tag(self) -> &'static str {
        match self {
            Self::Subject => "s",
            Self::Object => "o",
            Self::GraphName => "g",
        }
    }
}

/// The blank node components of a quad, with their positions. The predicate
/// is always an IRI and never yielded.
fn blank_node_components(quad: QuadRef<'_>) -> impl Iterator<Item = (BlankNodeRef<'_>, Position)> {
    let subject = match quad.subject {
        SubjectRef::BlankNode(n) => Some((n, Position::Subject)),
        _ => None,
    };
    let object = match quad.object {
        TermRef::BlankNode(n) => Some((n, Position::Object)),
        _ => None,
    };
    let graph_name = match quad.graph_name {
        GraphNameRef::BlankNode(n) => Some((n, Position::GraphName)),
        _ => None,
    };
    subject.into_iter().chain(object).chain(graph_name)
}

/// Lowercase hex digest of `data` (RDFC-1.0 "hash").
fn hash<D: Digest>(data: impl AsRef<[u8]>) -> String {
    encode_string(D::digest(data).as_slice())
}

/// Rewrites every blank node in `quad` to `_:a` (the reference) or `_:z`
/// (any other), the substitution rule of Hash First Degree Quads.
fn mask_blank_nodes(quad: QuadRef<'_>, reference: &str) -> Quad {
    fn mask(blank_node: BlankNodeRef<'_>, reference: &str) -> BlankNode {
        BlankNode::new_unchecked(if blank_node.as_str() == reference {
            "a"
        } else {
            "z"
        })
    }

    Quad::new(
        match quad.subject {
            SubjectRef::BlankNode(n) => mask(n, reference).into(),
            s => s.into_owned(),
        },
        quad.predicate,
        match quad.object {
            TermRef::BlankNode(n) => mask(n, reference).into(),
            o => o.into_owned(),
        },
        match quad.graph_name {
            GraphNameRef::BlankNode(n) => mask(n, reference).into(),
            g => g.into_owned(),
        },
    )
}

/// Hash First Degree Quads (RDFC-1.0 §4.7): digest of the reference blank
/// node's mention set, serialized with the `_:a`/`_:z` substitution, sorted
/// in code point order and concatenated.
///
/// The result depends only on the shapes of the quads and on where the
/// reference sits among other blank nodes in them; it is invariant under
/// renaming of any non-reference blank node.
fn hash_first_degree_quads<D: Digest>(
    state: &CanonicalizationState<'_>,
    reference: &str,
) -> Result<String, CanonicalizationError> {
    let mut nquads: Vec<String> = state
        .mention_set(reference)?
        .iter()
        .map(|quad| quad_line(mask_blank_nodes(*quad, reference).as_ref()))
        .collect();
    nquads.sort_unstable();

    let hash = hash::<D>(nquads.concat());
    debug!("first degree hash of _:{reference}: {hash}");
    Ok(hash)
}

/// Hash Related Blank Node (RDFC-1.0 §4.8): characterizes `related` as seen
/// from one (quad, position) occurrence. The input is the position tag,
/// the quad's predicate (elided for graph name position), and the best
/// identifier known for `related` — its canonical identifier, else the
/// identifier issued along the current path, else its first-degree hash.
fn hash_related_blank_node<D: Digest>(
    state: &CanonicalizationState<'_>,
    related: &str,
    quad: QuadRef<'_>,
    issuer: &IdentifierIssuer,
    position: Position,
) -> Result<String, CanonicalizationError> {
    let mut input = match position {
        Position::GraphName => position.tag().to_string(),
        _ => format!("{}<{}>", position.tag(), quad.predicate.as_str()),
    };
    match state
        .canonical_issuer
        .get(related)
        .or_else(|| issuer.get(related))
    {
        Some(identifier) => {
            input.push_str("_:");
            input.push_str(identifier);
        }
        None => input.push_str(&hash_first_degree_quads::<D>(state, related)?),
    }
    Ok(hash::<D>(input))
}

#[derive(Debug)]
struct HashNDegreeResult {
    hash: String,
    issuer: IdentifierIssuer,
}

/// Hash N-Degree Quads (RDFC-1.0 §4.9): disambiguates blank nodes whose
/// first-degree hashes collide by hashing ever larger neighborhoods.
///
/// Related blank nodes are grouped by their related-hash tag; within each
/// group every permutation is tried, and the permutation producing the
/// code-point-least path wins. The path issuer is cloned per permutation and
/// only the winning copy survives into the returned result, so abandoned
/// branches leave no trace in the issued identifiers.
fn hash_n_degree_quads<D: Digest>(
    state: &CanonicalizationState<'_>,
    identifier: &str,
    path_issuer: &IdentifierIssuer,
    budget: &mut HndqCallBudget,
) -> Result<HashNDegreeResult, CanonicalizationError> {
    budget.charge()?;
    let span = debug_span!("hash_n_degree_quads", identifier);
    let _entered = span.enter();

    let mut issuer = path_issuer.clone();

    // Group the identifiers of related blank nodes by related-hash tag,
    // one entry per (quad, position) occurrence.
    let mut related_by_hash = BTreeMap::<String, Vec<String>>::new();
    for quad in state.mention_set(identifier)? {
        for (blank_node, position) in blank_node_components(*quad) {
            if blank_node.as_str() == identifier {
                continue;
            }
            let related_hash =
                hash_related_blank_node::<D>(state, blank_node.as_str(), *quad, &issuer, position)?;
            related_by_hash
                .entry(related_hash)
                .or_default()
                .push(blank_node.as_str().to_string());
        }
    }

    let mut data_to_hash = String::new();

    // Tag groups in code point order of the tag.
    for (related_hash, related_identifiers) in &related_by_hash {
        data_to_hash.push_str(related_hash);

        let mut chosen_path = String::new();
        let mut chosen_issuer = None;

        'permutations: for permutation in related_identifiers
            .iter()
            .permutations(related_identifiers.len())
        {
            let mut issuer_copy = issuer.clone();
            let mut path = String::new();
            let mut recursion_list = Vec::new();

            for related in permutation {
                match state.canonical_issuer.get(related) {
                    Some(canonical) => {
                        path.push_str("_:");
                        path.push_str(canonical);
                    }
                    None => {
                        if !issuer_copy.has_issued(related) {
                            recursion_list.push(related);
                        }
                        let issued = issuer_copy.issue(related);
                        path.push_str("_:");
                        path.push_str(&issued);
                    }
                }
                // A longer path that already compares greater can never win.
                if !chosen_path.is_empty()
                    && path.len() >= chosen_path.len()
                    && path.as_str() > chosen_path.as_str()
                {
                    continue 'permutations;
                }
            }

            for related in recursion_list {
                let result = hash_n_degree_quads::<D>(state, related, &issuer_copy, budget)?;
                let issued = issuer_copy.issue(related);
                path.push_str("_:");
                path.push_str(&issued);
                path.push('<');
                path.push_str(&result.hash);
                path.push('>');
                issuer_copy = result.issuer;
                if !chosen_path.is_empty()
                    && path.len() >= chosen_path.len()
                    && path.as_str() > chosen_path.as_str()
                {
                    continue 'permutations;
                }
            }

            if chosen_path.is_empty() || path < chosen_path {
                chosen_path = path;
                chosen_issuer = Some(issuer_copy);
            }
        }

        debug!("chosen path for tag {related_hash}: {chosen_path}");
        data_to_hash.push_str(&chosen_path);
        if let Some(chosen) = chosen_issuer {
            issuer = chosen;
        }
    }

    Ok(HashNDegreeResult {
        hash: hash::<D>(&data_to_hash),
        issuer,
    })
}

/// The canonicalization driver (RDFC-1.0 §4.5): returns the map from input
/// blank node identifier to canonical identifier.
pub(crate) fn canonicalize_core<D: Digest>(
    input_dataset: &Dataset,
    canonical_prefix: &str,
    budget: &mut HndqCallBudget,
) -> Result<HashMap<String, String>, CanonicalizationError> {
    let mut state = CanonicalizationState::new(canonical_prefix);
    state.index_blank_nodes(input_dataset);

    // First-degree hash every blank node, visiting identifiers in code point
    // order so bucket-internal list order is platform independent.
    let mut identifiers: Vec<&String> = state.mention_sets.keys().collect();
    identifiers.sort_unstable();
    for identifier in identifiers {
        let first_degree_hash = hash_first_degree_quads::<D>(&state, identifier)?;
        state
            .hash_buckets
            .entry(first_degree_hash)
            .or_default()
            .push(identifier.clone());
    }

    // Unique hashes get canonical identifiers immediately, in hash order.
    for bucket in state.hash_buckets.values() {
        if let [identifier] = bucket.as_slice() {
            state.canonical_issuer.issue(identifier);
        }
    }

    // Shared hashes go through N-degree hashing: compute a hash path for
    // every still-unlabeled member, then merge the winning temporary issuers
    // into the canonical issuer in ascending order of their N-degree hash,
    // each one in its own issuance order.
    for bucket in state.hash_buckets.values() {
        if bucket.len() < 2 {
            continue;
        }

        let mut hash_path_list = Vec::new();
        for identifier in bucket {
            if state.canonical_issuer.has_issued(identifier) {
                continue;
            }
            let mut temporary_issuer = IdentifierIssuer::new(TEMPORARY_ISSUER_PREFIX);
            temporary_issuer.issue(identifier);
            hash_path_list.push(hash_n_degree_quads::<D>(
                &state,
                identifier,
                &temporary_issuer,
                budget,
            )?);
        }

        hash_path_list.sort_by(|a, b| a.hash.cmp(&b.hash));
        for result in hash_path_list {
            for (existing, _) in result.issuer.issued_in_order() {
                state.canonical_issuer.issue(existing);
            }
        }
    }

    let mut issued_identifiers = HashMap::with_capacity(state.mention_sets.len());
    for identifier in state.mention_sets.keys() {
        match state.canonical_issuer.get(identifier) {
            Some(canonical) => {
                issued_identifiers.insert(identifier.clone(), canonical.to_string());
            }
            None => {
                return Err(CanonicalizationError::UnissuedBlankNode(identifier.clone()));
            }
        }
    }
    debug!(
        "issued {} canonical identifiers with {} calls to hash_n_degree_quads",
        issued_identifiers.len(),
        budget.calls()
    );
    Ok(issued_identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nquads::parse_nquads;
    use sha2::Sha256;

    const UNIQUE_HASHES: &str = "\
<http://example.com/#p> <http://example.com/#q> _:e0 .
<http://example.com/#p> <http://example.com/#r> _:e1 .
_:e0 <http://example.com/#s> <http://example.com/#u> .
_:e1 <http://example.com/#t> <http://example.com/#u> .
";

    const SHARED_HASHES: &str = "\
<http://example.com/#p> <http://example.com/#q> _:e0 .
<http://example.com/#p> <http://example.com/#q> _:e1 .
_:e0 <http://example.com/#p> _:e2 .
_:e1 <http://example.com/#p> _:e3 .
_:e2 <http://example.com/#r> _:e3 .
";

    fn indexed_state<'a>(dataset: &'a Dataset) -> CanonicalizationState<'a> {
        let mut state = CanonicalizationState::new("c14n");
        state.index_blank_nodes(dataset);
        state
    }

    #[test]
    fn first_degree_hashes_distinguish_distinct_neighborhoods() {
        let dataset = parse_nquads(UNIQUE_HASHES).unwrap();
        let state = indexed_state(&dataset);
        assert_eq!(
            hash_first_degree_quads::<Sha256>(&state, "e0").unwrap(),
            "21d1dd5ba21f3dee9d76c0c00c260fa6f5d5d65315099e553026f4828d0dc77a"
        );
        assert_eq!(
            hash_first_degree_quads::<Sha256>(&state, "e1").unwrap(),
            "6fa0b9bdb376852b5743ff39ca4cbf7ea14d34966b2828478fbf222e7c764473"
        );
    }

    #[test]
    fn first_degree_hashes_collide_for_symmetric_neighborhoods() {
        let dataset = parse_nquads(SHARED_HASHES).unwrap();
        let state = indexed_state(&dataset);
        assert_eq!(
            hash_first_degree_quads::<Sha256>(&state, "e0").unwrap(),
            "3b26142829b8887d011d779079a243bd61ab53c3990d550320a17b59ade6ba36"
        );
        assert_eq!(
            hash_first_degree_quads::<Sha256>(&state, "e1").unwrap(),
            "3b26142829b8887d011d779079a243bd61ab53c3990d550320a17b59ade6ba36"
        );
        assert_eq!(
            hash_first_degree_quads::<Sha256>(&state, "e2").unwrap(),
            "15973d39de079913dac841ac4fa8c4781c0febfba5e83e5c6e250869587f8659"
        );
        assert_eq!(
            hash_first_degree_quads::<Sha256>(&state, "e3").unwrap(),
            "7e790a99273eed1dc57e43205d37ce232252c85b26ca4a6ff74ff3b5aea7bccd"
        );
    }

    #[test]
    fn missing_mention_set_is_reported() {
        let dataset = parse_nquads(UNIQUE_HASHES).unwrap();
        let state = indexed_state(&dataset);
        assert!(matches!(
            hash_first_degree_quads::<Sha256>(&state, "nope"),
            Err(CanonicalizationError::MissingMentionSet(id)) if id == "nope"
        ));
    }

    #[test]
    fn related_hash_prefers_the_canonical_identifier() {
        let dataset = parse_nquads("_:e0 <http://example.com/#p> _:e2 .\n").unwrap();
        let mut state = indexed_state(&dataset);
        state.canonical_issuer.issue("e2");
        let issuer = IdentifierIssuer::new(TEMPORARY_ISSUER_PREFIX);
        let quad = dataset.iter().next().unwrap();
        assert_eq!(
            hash_related_blank_node::<Sha256>(&state, "e2", quad, &issuer, Position::Object)
                .unwrap(),
            "29cf7e22790bc2ed395b81b3933e5329fc7b25390486085cac31ce7252ca60fa"
        );
    }

    #[test]
    fn n_degree_hashes_break_the_shared_bucket() {
        let dataset = parse_nquads(SHARED_HASHES).unwrap();
        let mut state = indexed_state(&dataset);

        let mut identifiers: Vec<&String> = state.mention_sets.keys().collect();
        identifiers.sort_unstable();
        for identifier in identifiers {
            let hash = hash_first_degree_quads::<Sha256>(&state, identifier).unwrap();
            state
                .hash_buckets
                .entry(hash)
                .or_default()
                .push(identifier.clone());
        }
        for bucket in state.hash_buckets.values() {
            if let [identifier] = bucket.as_slice() {
                state.canonical_issuer.issue(identifier);
            }
        }

        let mut budget = HndqCallBudget::new(None);
        let mut results = Vec::new();
        for bucket in state.hash_buckets.values() {
            if bucket.len() < 2 {
                continue;
            }
            for identifier in bucket {
                let mut temporary_issuer = IdentifierIssuer::new(TEMPORARY_ISSUER_PREFIX);
                temporary_issuer.issue(identifier);
                results.push(
                    hash_n_degree_quads::<Sha256>(&state, identifier, &temporary_issuer, &mut budget)
                        .unwrap(),
                );
            }
        }
        results.sort_by(|a, b| a.hash.cmp(&b.hash));

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].hash,
            "2c0b377baf86f6c18fed4b0df6741290066e73c932861749b172d1e5560f5045"
        );
        assert_eq!(
            results[1].hash,
            "fbc300de5afafd97a4b9ee1e72b57754dcdcb7ebb724789ac6a94a5b82a48d30"
        );
    }

    #[test]
    fn driver_issues_the_expected_identifiers() {
        let dataset = parse_nquads(SHARED_HASHES).unwrap();
        let mut budget = HndqCallBudget::new(None);
        let issued = canonicalize_core::<Sha256>(&dataset, "c14n", &mut budget).unwrap();
        let expected: HashMap<String, String> = [
            ("e0", "c14n3"),
            ("e1", "c14n2"),
            ("e2", "c14n0"),
            ("e3", "c14n1"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(issued, expected);
        assert_eq!(budget.calls(), 2);
    }

    #[test]
    fn driver_ignores_datasets_without_blank_nodes() {
        let dataset =
            parse_nquads("<http://example.com/s> <http://example.com/p> \"v\" .\n").unwrap();
        let mut budget = HndqCallBudget::new(None);
        let issued = canonicalize_core::<Sha256>(&dataset, "c14n", &mut budget).unwrap();
        assert!(issued.is_empty());
        assert_eq!(budget.calls(), 0);
    }
}
