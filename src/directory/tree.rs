//! Department tree
//!
//! Builds a forest from flat `(id, name, parent_id)` rows and answers the
//! recurring queries against it: path from a root, a department with all of
//! its sub-departments, and lookup by name.
//!
//! Nodes own their children and never point back at their parent. Ancestor
//! chains are rebuilt from the traversal stack when needed.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Flat department row, as delivered by the data-access layer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentRow {
    pub id: String,
    pub name: String,
    #[serde(rename = "parentId")]
    pub parent_id: Option<String>,
}

impl DepartmentRow {
    pub fn new(id: impl Into<String>, name: impl Into<String>, parent_id: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: parent_id.map(str::to_string),
        }
    }
}

/// Lightweight `{id, name}` projection returned by every forest query
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepartmentRef {
    pub id: String,
    pub name: String,
}

impl DepartmentRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Forest node
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DepartmentNode {
    pub id: String,
    pub name: String,
    pub children: Vec<DepartmentNode>,
}

impl DepartmentNode {
    pub fn to_ref(&self) -> DepartmentRef {
        DepartmentRef::new(self.id.as_str(), self.name.as_str())
    }

    /// This node followed by all of its descendants in depth-first pre-order
    pub fn iter(&self) -> impl Iterator<Item = &DepartmentNode> {
        Walk::new(std::slice::from_ref(self)).map(|(_, node)| node)
    }
}

/// Ordered sequence of root departments
///
/// Built once from the current rows and never mutated afterwards. When the
/// rows change the forest is rebuilt.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DepartmentForest {
    roots: Vec<DepartmentNode>,
}

/// Row data borrowed during construction, one per distinct id
struct Slot<'a> {
    id: &'a str,
    name: &'a str,
    parent_id: Option<&'a str>,
}

impl DepartmentForest {
    /// Build the forest from flat rows.
    ///
    /// Rows may arrive in any order. Roots and siblings keep the order in
    /// which their ids first appear in `rows`. A row becomes a root when its
    /// parent is null, does not resolve to any row, or lies on a parent
    /// cycle. When an id repeats, the last row's name and parent win.
    pub fn build(rows: &[DepartmentRow]) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(rows.len());
        let mut slots: Vec<Slot<'_>> = Vec::with_capacity(rows.len());

        for row in rows {
            match index.get(row.id.as_str()) {
                Some(&i) => {
                    warn!(id = %row.id, "Duplicate department id, keeping the last row");
                    slots[i].name = &row.name;
                    slots[i].parent_id = row.parent_id.as_deref();
                }
                None => {
                    index.insert(&row.id, slots.len());
                    slots.push(Slot {
                        id: &row.id,
                        name: &row.name,
                        parent_id: row.parent_id.as_deref(),
                    });
                }
            }
        }

        let mut parents: Vec<Option<usize>> = slots
            .iter()
            .map(|slot| {
                let parent_id = slot.parent_id?;
                let parent = index.get(parent_id).copied();
                if parent.is_none() {
                    debug!(id = slot.id, parent_id, "Unknown parent department, treating as root");
                }
                parent
            })
            .collect();

        break_cycles(&mut parents, &slots);

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); slots.len()];
        let mut roots = Vec::new();
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Some(p) => children[*p].push(i),
                None => roots.push(i),
            }
        }

        Self {
            roots: assemble(&slots, &children, &roots),
        }
    }

    pub fn roots(&self) -> &[DepartmentNode] {
        &self.roots
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes, roots included
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// All nodes in depth-first pre-order, roots then children
    pub fn iter(&self) -> impl Iterator<Item = &DepartmentNode> {
        self.walk().map(|(_, node)| node)
    }

    fn walk(&self) -> Walk<'_> {
        Walk::new(&self.roots)
    }

    /// First node with the given id in traversal order
    pub fn find(&self, id: &str) -> Option<&DepartmentNode> {
        self.iter().find(|node| node.id == id)
    }

    /// Root-first chain of departments ending at `id`.
    ///
    /// Empty when `id` is not in the forest.
    pub fn find_path(&self, id: &str) -> Vec<DepartmentRef> {
        let mut path: Vec<&DepartmentNode> = Vec::new();
        for (depth, node) in self.walk() {
            path.truncate(depth);
            path.push(node);
            if node.id == id {
                return path.into_iter().map(DepartmentNode::to_ref).collect();
            }
        }
        Vec::new()
    }

    /// The department `id` followed by every descendant in depth-first
    /// pre-order. Empty when `id` is not in the forest.
    pub fn find_subtree(&self, id: &str) -> Vec<DepartmentRef> {
        self.find(id)
            .map(|node| node.iter().map(DepartmentNode::to_ref).collect())
            .unwrap_or_default()
    }

    /// Case-insensitive exact lookup by name.
    ///
    /// Partial names never match. When several departments share a name the
    /// first one in traversal order is returned.
    pub fn find_by_name(&self, name: &str) -> Option<DepartmentRef> {
        let wanted = name.to_lowercase();
        self.iter()
            .find(|node| node.name.to_lowercase() == wanted)
            .map(DepartmentNode::to_ref)
    }
}

/// Detach every node that lies on a parent cycle so it becomes a root.
///
/// Each node is walked up at most once; nodes already proven acyclic stop the
/// walk early.
fn break_cycles(parents: &mut [Option<usize>], slots: &[Slot<'_>]) {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mark {
        Unvisited,
        OnWalk(usize),
        Done,
    }

    let mut marks = vec![Mark::Unvisited; parents.len()];
    let mut walk: Vec<usize> = Vec::new();

    for start in 0..parents.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }

        let mut current = Some(start);
        while let Some(i) = current {
            match marks[i] {
                Mark::Done => break,
                Mark::OnWalk(pos) => {
                    for &member in &walk[pos..] {
                        warn!(
                            id = slots[member].id,
                            parent_id = slots[member].parent_id.unwrap_or_default(),
                            "Department parent chain forms a cycle, treating as root"
                        );
                        parents[member] = None;
                    }
                    break;
                }
                Mark::Unvisited => {
                    marks[i] = Mark::OnWalk(walk.len());
                    walk.push(i);
                    current = parents[i];
                }
            }
        }

        for &i in &walk {
            marks[i] = Mark::Done;
        }
        walk.clear();
    }
}

/// Turn the index-based parent/children tables into owned nodes.
///
/// Post-order with an explicit stack so children are complete before their
/// parent takes them.
fn assemble(slots: &[Slot<'_>], children: &[Vec<usize>], roots: &[usize]) -> Vec<DepartmentNode> {
    let mut built: Vec<Option<DepartmentNode>> = (0..slots.len()).map(|_| None).collect();
    let mut stack: Vec<(usize, bool)> = roots.iter().map(|&r| (r, false)).collect();

    while let Some((i, expanded)) = stack.pop() {
        if expanded {
            let kids = children[i].iter().filter_map(|&c| built[c].take()).collect();
            built[i] = Some(DepartmentNode {
                id: slots[i].id.to_string(),
                name: slots[i].name.to_string(),
                children: kids,
            });
        } else {
            stack.push((i, true));
            stack.extend(children[i].iter().map(|&c| (c, false)));
        }
    }

    roots.iter().filter_map(|&r| built[r].take()).collect()
}

/// Depth-first pre-order traversal yielding `(depth, node)`
struct Walk<'a> {
    stack: Vec<(usize, &'a DepartmentNode)>,
}

impl<'a> Walk<'a> {
    fn new(roots: &'a [DepartmentNode]) -> Self {
        Self {
            stack: roots.iter().rev().map(|node| (0, node)).collect(),
        }
    }
}

impl<'a> Iterator for Walk<'a> {
    type Item = (usize, &'a DepartmentNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (depth, node) = self.stack.pop()?;
        self.stack
            .extend(node.children.iter().rev().map(|child| (depth + 1, child)));
        Some((depth, node))
    }
}
