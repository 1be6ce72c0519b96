//! Linear dependency validation.
//!
//! Nodes run in the declared order. A chain is valid when every node's inputs
//! are available from the initial keys or from the outputs of earlier nodes.

use crate::errors::UnsatisfiedDependencyError;
use std::collections::BTreeSet;

/// The declared keys of one node in a chain.
#[derive(Debug, Clone, Copy)]
pub struct ChainLink<'a> {
    /// Node name used in errors.
    pub name: &'a str,
    /// Keys the node requires.
    pub inputs: &'a [String],
    /// Keys the node produces.
    pub outputs: &'a [String],
}

impl<'a> ChainLink<'a> {
    /// Creates a link.
    #[must_use]
    pub fn new(name: &'a str, inputs: &'a [String], outputs: &'a [String]) -> Self {
        Self {
            name,
            inputs,
            outputs,
        }
    }
}

/// Validates that `links` form a satisfiable chain.
///
/// # Errors
///
/// Returns the first node whose inputs are not all available, with the
/// missing and available keys sorted.
pub fn validate_chain<'a>(
    links: impl IntoIterator<Item = ChainLink<'a>>,
    initial_keys: &[String],
) -> Result<(), UnsatisfiedDependencyError> {
    let mut available: BTreeSet<&str> = initial_keys.iter().map(String::as_str).collect();

    for (index, link) in links.into_iter().enumerate() {
        let missing: BTreeSet<&str> = link
            .inputs
            .iter()
            .map(String::as_str)
            .filter(|key| !available.contains(key))
            .collect();

        if !missing.is_empty() {
            return Err(UnsatisfiedDependencyError::new(
                index,
                link.name,
                missing.into_iter().map(str::to_string).collect(),
                available.into_iter().map(str::to_string).collect(),
            ));
        }

        available.extend(link.outputs.iter().map(String::as_str));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_valid_chain() {
        let (a_in, a_out) = (keys(&[]), keys(&["img"]));
        let (b_in, b_out) = (keys(&["img"]), keys(&["boxes"]));
        let (c_in, c_out) = (keys(&["img", "boxes"]), keys(&[]));

        let links = [
            ChainLink::new("a", &a_in, &a_out),
            ChainLink::new("b", &b_in, &b_out),
            ChainLink::new("c", &c_in, &c_out),
        ];
        assert!(validate_chain(links, &[]).is_ok());
    }

    #[test]
    fn test_reports_first_failure() {
        let (a_in, a_out) = (keys(&["x"]), keys(&["y"]));
        let (b_in, b_out) = (keys(&["z", "w"]), keys(&[]));

        let links = [ChainLink::new("a", &a_in, &a_out), ChainLink::new("b", &b_in, &b_out)];
        let err = validate_chain(links, &keys(&["x"])).unwrap_err();

        assert_eq!(err.index, 1);
        assert_eq!(err.node, "b");
        assert_eq!(err.missing, keys(&["w", "z"]));
        assert_eq!(err.available, keys(&["x", "y"]));
    }

    #[test]
    fn test_initial_keys_satisfy_first_node() {
        let (a_in, a_out) = (keys(&["image"]), keys(&[]));
        let links = [ChainLink::new("a", &a_in, &a_out)];

        assert!(validate_chain(links, &keys(&["image"])).is_ok());
        assert_eq!(validate_chain(links, &[]).unwrap_err().index, 0);
    }

    #[test]
    fn test_node_cannot_satisfy_itself() {
        let (a_in, a_out) = (keys(&["k"]), keys(&["k"]));
        let links = [ChainLink::new("a", &a_in, &a_out)];

        assert!(validate_chain(links, &[]).is_err());
    }
}
