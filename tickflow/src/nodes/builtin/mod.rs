//! Nodes shipped with tickflow.
//!
//! Their default configs live under `configs/<namespace>/<name>.yml` in this
//! crate.

mod bbox_count;
mod constant;
mod fps;
mod log_sink;
mod tracking;

pub use bbox_count::BboxCount;
pub use constant::ConstantSource;
pub use fps::Fps;
pub use log_sink::LogSink;
pub use tracking::{iou, BBox, IouTracker, Tracking};

use crate::catalog::NodeCatalog;
use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::identifier::NodeIdentifier;
use crate::nodes::Node;
use tracing::warn;

/// Built-in node identifiers with a one-line summary.
pub const BUILTIN_NODES: &[(&str, &str)] = &[
    ("input.constant", "Emits configured values every tick, ending after max_ticks"),
    ("dabble.bbox_count", "Counts the boxes in `bboxes`"),
    ("dabble.fps", "Moving-average tick rate"),
    ("dabble.tracking", "IoU multi-object tracker producing `obj_tags`"),
    ("output.log", "Logs its inputs every tick"),
];

fn register<N, F>(catalog: &mut NodeCatalog, identifier: &str, construct: F)
where
    N: Node + 'static,
    F: Fn(&NodeConfig) -> Result<N, NodeError> + Send + Sync + 'static,
{
    match NodeIdentifier::parse(identifier) {
        Ok(id) => catalog.register(id, move |config: NodeConfig| {
            Ok(Box::new(construct(&config)?) as Box<dyn Node>)
        }),
        Err(e) => warn!(error = %e, "Skipping built-in node"),
    }
}

/// Registers every built-in node.
pub fn register_all(catalog: &mut NodeCatalog) {
    register(catalog, "input.constant", ConstantSource::from_config);
    register(catalog, "dabble.bbox_count", BboxCount::from_config);
    register(catalog, "dabble.fps", Fps::from_config);
    register(catalog, "dabble.tracking", Tracking::from_config);
    register(catalog, "output.log", LogSink::from_config);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;

    #[test]
    fn test_summaries_match_registry() {
        let catalog = NodeCatalog::with_builtins("/unused");
        for (id, _) in BUILTIN_NODES {
            assert!(catalog.contains(&NodeIdentifier::parse(id).unwrap()), "{id}");
        }
        assert_eq!(catalog.identifiers().len(), BUILTIN_NODES.len());
    }

    #[test]
    fn test_shipped_configs_instantiate() {
        let catalog = NodeCatalog::with_builtins("/unused");
        let resolver = ConfigResolver::new(env!("CARGO_MANIFEST_DIR"), "/unused");

        for (id, _) in BUILTIN_NODES {
            let id = NodeIdentifier::parse(id).unwrap();
            let config = resolver.resolve(&id).unwrap();
            let node = catalog.resolve(&id).unwrap().instantiate(config);
            assert!(node.is_ok(), "{id}: {:?}", node.err());
        }
    }
}
