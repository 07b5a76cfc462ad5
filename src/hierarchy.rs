// Assemble the nested Organization -> Group -> Server view from flat lists.
// Back-references are resolved through id lookup tables. Groups and servers whose
// parent is missing are kept out of the tree and returned alongside it, each one
// logged at WARN. Servers of an unattached group are unattached as well.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::{Group, Organization, Server};

/// A composed organization plus everything that could not be attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composition {
    pub organization: Organization,
    pub unattached_groups: Vec<Group>,
    pub unattached_servers: Vec<Server>,
}

/// Several composed organizations plus everything that could not be attached.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forest {
    pub organizations: Vec<Organization>,
    pub unattached_groups: Vec<Group>,
    pub unattached_servers: Vec<Server>,
}

/// Nests `groups` under `org` and `servers` under their groups. Input order is kept.
pub fn compose_hierarchy(org: Organization, groups: Vec<Group>, servers: Vec<Server>) -> Composition {
    let mut forest = compose_forest(vec![org], groups, servers);
    // compose_forest returns exactly one organization per input organization
    let organization = forest.organizations.remove(0);
    Composition {
        organization,
        unattached_groups: forest.unattached_groups,
        unattached_servers: forest.unattached_servers,
    }
}

/// Same as [`compose_hierarchy`] across several organizations. Any nested `groups` or
/// `servers` already present on the inputs are replaced. Duplicate ids: the first
/// occurrence wins and later ones are reported as unattached.
pub fn compose_forest(
    orgs: Vec<Organization>,
    groups: Vec<Group>,
    servers: Vec<Server>,
) -> Forest {
    let mut organizations: Vec<Organization> = Vec::with_capacity(orgs.len());
    let mut org_index: HashMap<String, usize> = HashMap::with_capacity(orgs.len());
    for mut org in orgs {
        org.groups = Some(Vec::new());
        if org_index.contains_key(&org.id) {
            warn!(org_id = %org.id, "duplicate organization id; keeping first occurrence");
            continue;
        }
        org_index.insert(org.id.clone(), organizations.len());
        organizations.push(org);
    }

    // (org position, position within that org's groups)
    let mut group_index: HashMap<String, (usize, usize)> = HashMap::with_capacity(groups.len());
    let mut unattached_groups = Vec::new();
    for mut group in groups {
        group.servers = Some(Vec::new());
        let Some(&org_pos) = org_index.get(&group.org_id) else {
            warn!(group_id = %group.id, org_id = %group.org_id, "group references unknown organization; excluded");
            unattached_groups.push(group);
            continue;
        };
        if group_index.contains_key(&group.id) {
            warn!(group_id = %group.id, "duplicate group id; excluded");
            unattached_groups.push(group);
            continue;
        }
        let org_groups = organizations[org_pos].groups.get_or_insert_with(Vec::new);
        group_index.insert(group.id.clone(), (org_pos, org_groups.len()));
        org_groups.push(group);
    }

    let mut unattached_servers = Vec::new();
    let mut seen_servers: HashSet<String> = HashSet::with_capacity(servers.len());
    for server in servers {
        let Some(&(org_pos, group_pos)) = group_index.get(&server.group_id) else {
            warn!(server_id = %server.id, group_id = %server.group_id, "server references a group that is not attached; excluded");
            unattached_servers.push(server);
            continue;
        };
        if !seen_servers.insert(server.id.clone()) {
            warn!(server_id = %server.id, "duplicate server id; excluded");
            unattached_servers.push(server);
            continue;
        }
        let group = organizations[org_pos]
            .groups
            .get_or_insert_with(Vec::new)
            .get_mut(group_pos);
        if let Some(group) = group {
            group.servers.get_or_insert_with(Vec::new).push(server);
        }
    }

    Forest {
        organizations,
        unattached_groups,
        unattached_servers,
    }
}
