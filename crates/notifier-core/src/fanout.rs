//! Pure fan-out target computation, split out from [`crate::processor`] so
//! the join logic (the part worth unit-testing exhaustively) doesn't need a
//! running processor, a datastore, or a publisher to exercise.

use std::collections::{HashMap, HashSet};

use crate::catalog::CapabilityMap;

/// For a subscription-update event, compute the set of clients to notify
/// and, for each, the list of matched capabilities (ordered by first
/// occurrence in `product_capabilities`; duplicated if the same capability
/// appears more than once in the input -- the algorithm does not dedupe).
///
/// A client is included iff it is in `user_clients` AND at least one of its
/// capabilities appears in `product_capabilities`.
pub fn plan_subscription_fanout(
    product_capabilities: &[String],
    capability_map: &CapabilityMap,
    user_clients: &[String],
) -> Vec<(String, Vec<String>)> {
    let mut notify_map: HashMap<String, Vec<String>> = HashMap::new();
    for cap in product_capabilities {
        for (cid, caps) in capability_map {
            if caps.contains(cap) {
                notify_map.entry(cid.clone()).or_default().push(cap.clone());
            }
        }
    }

    let user_set: HashSet<&str> = user_clients.iter().map(String::as_str).collect();
    notify_map
        .into_iter()
        .filter(|(cid, _)| user_set.contains(cid.as_str()))
        .collect()
}

/// For delete/profile/password events, the fan-out target set is exactly
/// every client the user has logged into -- no capability join.
pub fn generic_fanout_targets(user_clients: &[String]) -> Vec<String> {
    user_clients.to_vec()
}
