//! Parent/child view of the host track table, rebuilt once per operation

use std::collections::HashMap;

use crate::host::{HostPort, TrackGuid, TrackSnapshot};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackNode {
    pub guid: TrackGuid,
    pub name: String,
    /// Position in the host table at snapshot time
    pub index: usize,
    pub channels: u32,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
}

/// Track hierarchy captured from a single host snapshot.
///
/// Structural edits to the host invalidate it; capture a new one afterwards.
#[derive(Debug, Clone, Default)]
pub struct TrackTree {
    nodes: Vec<TrackNode>,
    by_guid: HashMap<TrackGuid, usize>,
    roots: Vec<usize>,
}

impl TrackTree {
    pub fn capture<H: HostPort + ?Sized>(host: &H) -> Self {
        Self::from_snapshot(&host.snapshot())
    }

    pub fn from_snapshot(snapshot: &[TrackSnapshot]) -> Self {
        let mut tree = Self::default();
        let mut open_folders: Vec<usize> = Vec::new();

        for (index, row) in snapshot.iter().enumerate() {
            let parent = open_folders.last().copied();
            tree.nodes.push(TrackNode {
                guid: row.guid.clone(),
                name: row.name.clone(),
                index,
                channels: row.channels,
                parent,
                children: Vec::new(),
            });
            tree.by_guid.insert(row.guid.clone(), index);

            match parent {
                Some(p) => tree.nodes[p].children.push(index),
                None => tree.roots.push(index),
            }

            if row.folder_depth > 0 {
                open_folders.push(index);
            } else {
                for _ in 0..row.folder_depth.unsigned_abs() {
                    open_folders.pop();
                }
            }
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, guid: &TrackGuid) -> Option<&TrackNode> {
        self.by_guid.get(guid).map(|&i| &self.nodes[i])
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TrackNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Look up by GUID first, then by name
    pub fn locate(&self, guid: Option<&str>, name: &str) -> Option<&TrackNode> {
        guid.and_then(|g| self.node(&TrackGuid::new(g)))
            .or_else(|| self.find_by_name(name))
    }

    pub fn parent(&self, guid: &TrackGuid) -> Option<&TrackNode> {
        let node = self.node(guid)?;
        node.parent.map(|p| &self.nodes[p])
    }

    /// Direct children in host order
    pub fn children(&self, guid: &TrackGuid) -> Vec<&TrackNode> {
        self.node(guid)
            .map(|n| n.children.iter().map(|&c| &self.nodes[c]).collect())
            .unwrap_or_default()
    }

    /// Ancestors from the nearest parent up to a top-level track
    pub fn ancestors(&self, guid: &TrackGuid) -> Vec<&TrackNode> {
        let mut chain = Vec::new();
        let mut current = self.node(guid).and_then(|n| n.parent);
        while let Some(index) = current {
            let node = &self.nodes[index];
            chain.push(node);
            current = node.parent;
        }
        chain
    }

    pub fn roots(&self) -> impl Iterator<Item = &TrackNode> {
        self.roots.iter().map(|&i| &self.nodes[i])
    }
}
