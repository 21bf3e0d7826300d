//! Escalation chain derivation
//!
//! Walks the catalog topology upstream from a service, breadth first, and
//! attaches contacts from the system registry (or the service node's own
//! owner/escalation pointers when the registry has none).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use super::normalize_id;
use super::types::{CatalogEdge, Contact, EscalationStep, ServiceNode, SystemMetadata};

pub const DEFAULT_MAX_DEPTH: u32 = 8;

pub const REASON_REPORTED: &str = "reported_bad_data";

/// Build the upstream chain for `service_id`.
///
/// Steps are ordered by depth, then system id. The starting service is always
/// present at depth 0, even when nothing else is known about it.
pub fn derive_chain(
    service_id: &str,
    edges: &[CatalogEdge],
    services: &[ServiceNode],
    registry: &[SystemMetadata],
    max_depth: u32,
) -> Vec<EscalationStep> {
    let start = normalize_id(service_id);
    if start.is_empty() {
        return Vec::new();
    }

    let graph = upstream_graph(edges);
    let registry: HashMap<String, &SystemMetadata> = registry
        .iter()
        .map(|system| (normalize_id(&system.id), system))
        .collect();
    let nodes: HashMap<String, &ServiceNode> = services
        .iter()
        .map(|node| (normalize_id(&node.id), node))
        .collect();

    let mut queue = VecDeque::from([(start, 0u32, REASON_REPORTED.to_string())]);
    let mut visited = HashSet::new();
    let mut steps = Vec::new();

    while let Some((system, depth, reason)) = queue.pop_front() {
        if !visited.insert(system.clone()) {
            continue;
        }

        let mut step = EscalationStep {
            depth,
            system_id: system.clone(),
            name: None,
            owner: None,
            reason,
            contacts: Vec::new(),
        };

        if let Some(meta) = registry.get(&system) {
            step.name = non_empty(&meta.name);
            step.owner = non_empty(&meta.owner_team);
            step.contacts.extend(meta.escalation.iter().cloned());
        }
        if let Some(node) = nodes.get(&system) {
            if step.name.is_none() {
                step.name = non_empty(&node.name);
            }
            if step.owner.is_none() {
                step.owner = non_empty(&node.owner);
            }
            if step.contacts.is_empty() {
                step.contacts = fallback_contacts(node);
            }
        }
        steps.push(step);

        if depth >= max_depth {
            continue;
        }

        if let Some(upstreams) = graph.get(&system) {
            for upstream in upstreams {
                if visited.contains(upstream) {
                    continue;
                }
                queue.push_back((upstream.clone(), depth + 1, format!("upstream_of:{}", system)));
            }
        }
    }

    steps.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.system_id.cmp(&b.system_id)));
    steps
}

/// Consumer -> sorted upstream producers, including `root:sub` collapsed to `root`
fn upstream_graph(edges: &[CatalogEdge]) -> BTreeMap<String, BTreeSet<String>> {
    let mut graph: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut add = |consumer: String, producer: String| {
        if consumer.is_empty() || producer.is_empty() || consumer == producer {
            return;
        }
        graph.entry(consumer).or_default().insert(producer);
    };

    for edge in edges {
        let producer = normalize_id(&edge.from);
        let consumer = normalize_id(&edge.to);
        add(root_system(&consumer), root_system(&producer));
        add(consumer, producer);
    }
    graph
}

fn root_system(id: &str) -> String {
    match id.find(':') {
        Some(cut) if cut > 0 => id[..cut].to_string(),
        _ => id.to_string(),
    }
}

fn fallback_contacts(node: &ServiceNode) -> Vec<Contact> {
    let mut contacts = Vec::new();
    if !node.owner.trim().is_empty() {
        contacts.push(Contact {
            role: "owner".to_string(),
            name: node.owner.clone(),
            channel: String::new(),
        });
    }
    if !node.escalation.trim().is_empty() {
        contacts.push(Contact {
            role: "escalation".to_string(),
            name: String::new(),
            channel: node.escalation.clone(),
        });
    }
    contacts
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============================================================================
// TESTS
// ============================================================================
