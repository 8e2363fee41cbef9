use crate::error::CanonicalizationError;
use oxrdf::{Dataset, Graph, QuadRef};
use oxttl::NQuadsParser;

/// Parses an N-Quads document into a [`Dataset`], collapsing duplicate quads
/// through the dataset's set semantics.
pub fn parse_nquads(input: &str) -> Result<Dataset, CanonicalizationError> {
    let mut dataset = Dataset::new();
    for quad in NQuadsParser::new().for_reader(input.as_bytes()) {
        let quad = quad?;
        dataset.insert(&quad);
    }
    Ok(dataset)
}

/// A quad as one line of canonical N-Quads, terminated by LF.
///
/// oxrdf's `Display` renders `S P O` plus the graph name when it is not the
/// default graph, with canonical literal escaping, so only the final ` .`
/// and the newline are added here. These exact bytes are what the blank node
/// hashing algorithms digest; any divergence would make the resulting hashes
/// incompatible with other implementations.
pub(crate) fn quad_line(quad: QuadRef<'_>) -> String {
    format!("{quad} .\n")
}

/// Serializes a dataset as canonical N-Quads: one quad per line, lines
/// sorted in code point order.
pub(crate) fn serialize_dataset(dataset: &Dataset) -> String {
    let mut lines: Vec<String> = dataset.iter().map(quad_line).collect();
    lines.sort_unstable();
    lines.concat()
}

/// Serializes a graph as N-Triples lines sorted in code point order.
pub(crate) fn serialize_graph(graph: &Graph) -> String {
    let mut lines: Vec<String> = graph.iter().map(|triple| format!("{triple} .\n")).collect();
    lines.sort_unstable();
    lines.concat()
}
