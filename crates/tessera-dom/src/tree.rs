//! DOM Tree (arena-based allocation)
//!
//! Node 0 is always the document node. Detaching a node unlinks it but keeps
//! its slot, so IDs handed out earlier stay valid for the tree's lifetime.

use crate::{ElementData, Node, NodeData, NodeId, TextData};

/// Arena-based DOM tree
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
}

impl DomTree {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::document()],
        }
    }

    /// The document node
    #[inline]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Get a node by ID
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    /// Get a mutable node by ID
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    /// Number of allocated nodes, detached ones included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the document node has no children
    pub fn is_empty(&self) -> bool {
        !self.nodes[0].first_child.is_valid()
    }

    /// Number of nodes reachable from the document node, itself included
    pub fn node_count(&self) -> usize {
        1 + self.descendants(self.root()).count()
    }

    fn contains(&self, id: NodeId) -> bool {
        id.is_valid() && id.index() < self.nodes.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(data));
        id
    }

    // ------------------------------------------------------------------
    // Node creation
    // ------------------------------------------------------------------

    /// Create a detached HTML element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData::new(name)))
    }

    /// Create a detached element from prepared data
    pub fn create_element_with(&mut self, data: ElementData) -> NodeId {
        self.push(NodeData::Element(data))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Text(TextData {
            content: content.to_string(),
        }))
    }

    /// Create a detached comment
    pub fn create_comment(&mut self, content: &str) -> NodeId {
        self.push(NodeData::Comment(content.to_string()))
    }

    /// Create a detached doctype
    pub fn create_doctype(&mut self, name: &str, public_id: &str, system_id: &str) -> NodeId {
        self.push(NodeData::Doctype {
            name: name.to_string(),
            public_id: public_id.to_string(),
            system_id: system_id.to_string(),
        })
    }

    pub fn create_processing_instruction(&mut self, target: &str, data: &str) -> NodeId {
        self.push(NodeData::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Whether `ancestor` is `node` or one of its ancestors
    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        while self.contains(current) {
            if current == ancestor {
                return true;
            }
            current = self.nodes[current.index()].parent;
        }
        false
    }

    fn can_insert(&self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(child) || child == NodeId::ROOT {
            return false;
        }
        // A leaf can only contain itself
        let is_leaf = !self.nodes[child.index()].first_child.is_valid();
        if child == parent || (!is_leaf && self.is_inclusive_ancestor(child, parent)) {
            tracing::debug!("Refusing to insert node {:?} into its own subtree", child);
            return false;
        }
        true
    }

    /// Append `child` as the last child of `parent`, moving it if attached
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.can_insert(parent, child) {
            return;
        }
        self.detach(child);

        let last = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = last;
            node.next_sibling = NodeId::NONE;
        }
        if last.is_valid() {
            self.nodes[last.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
        self.nodes[parent.index()].last_child = child;
    }

    /// Insert `child` before `reference`; appends when `reference` is not a
    /// child of `parent`
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        if !self.contains(reference)
            || self.nodes[reference.index()].parent != parent
            || reference == child
        {
            self.append_child(parent, child);
            return;
        }
        if !self.can_insert(parent, child) {
            return;
        }
        self.detach(child);

        let prev = self.nodes[reference.index()].prev_sibling;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = parent;
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        self.nodes[reference.index()].prev_sibling = child;
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = child;
        } else {
            self.nodes[parent.index()].first_child = child;
        }
    }

    /// Insert `child` as the first child of `parent`
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        match self.get(parent).map(|p| p.first_child) {
            Some(first) if first.is_valid() => self.insert_before(parent, child, first),
            _ => self.append_child(parent, child),
        }
    }

    /// Unlink a node from its parent and siblings. Its subtree stays intact.
    pub fn detach(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        let (parent, prev, next) = {
            let node = &self.nodes[id.index()];
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        if prev.is_valid() {
            self.nodes[prev.index()].next_sibling = next;
        } else if parent.is_valid() {
            self.nodes[parent.index()].first_child = next;
        }
        if next.is_valid() {
            self.nodes[next.index()].prev_sibling = prev;
        } else if parent.is_valid() {
            self.nodes[parent.index()].last_child = prev;
        }

        let node = &mut self.nodes[id.index()];
        node.parent = NodeId::NONE;
        node.prev_sibling = NodeId::NONE;
        node.next_sibling = NodeId::NONE;
    }

    /// Replace a node by its children, in place
    pub fn unwrap(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).map(|n| n.parent).filter(|p| p.is_valid()) else {
            return;
        };
        for child in self.child_ids(id) {
            self.insert_before(parent, child, id);
        }
        self.detach(id);
    }

    /// Merge adjacent text nodes and drop empty ones in the subtree of `id`
    pub fn normalize(&mut self, id: NodeId) {
        let mut parents = vec![id];
        parents.extend(self.descendants(id).map(|(child, _)| child));

        for parent in parents {
            let mut child = self.nodes[parent.index()].first_child;
            while child.is_valid() {
                let next = self.nodes[child.index()].next_sibling;
                let NodeData::Text(text) = &self.nodes[child.index()].data else {
                    child = next;
                    continue;
                };
                if text.content.is_empty() {
                    self.detach(child);
                    child = next;
                    continue;
                }
                let following = match next.is_valid().then(|| &self.nodes[next.index()].data) {
                    Some(NodeData::Text(t)) => t.content.clone(),
                    _ => {
                        child = next;
                        continue;
                    }
                };
                if let NodeData::Text(text) = &mut self.nodes[child.index()].data {
                    text.content.push_str(&following);
                }
                self.detach(next);
            }
        }
    }

    /// Deep-copy `node` from another tree into this one. The copy is detached.
    pub fn import(&mut self, source: &DomTree, node: NodeId) -> NodeId {
        let Some(src) = source.get(node) else {
            return NodeId::NONE;
        };
        if matches!(src.data, NodeData::Document) {
            return NodeId::NONE;
        }
        let copy = self.push(src.data.clone());

        let mut pending = vec![(node, copy)];
        while let Some((from, to)) = pending.pop() {
            for (child, child_node) in source.children(from) {
                let id = self.push(child_node.data.clone());
                self.append_child(to, id);
                pending.push((child, id));
            }
        }
        copy
    }

    // ------------------------------------------------------------------
    // Traversal
    // ------------------------------------------------------------------

    /// Iterate over direct children
    pub fn children(&self, parent: NodeId) -> Children<'_> {
        Children {
            tree: self,
            next: self.get(parent).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// Snapshot of child IDs, for loops that mutate the tree
    pub fn child_ids(&self, parent: NodeId) -> Vec<NodeId> {
        self.children(parent).map(|(id, _)| id).collect()
    }

    /// Pre-order iteration over the subtree of `start`, excluding `start`
    pub fn descendants(&self, start: NodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            start,
            next: self.get(start).map_or(NodeId::NONE, |n| n.first_child),
        }
    }

    /// First direct child element with the given name
    pub fn child_element(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .find(|(_, node)| node.is_element_named(name))
            .map(|(id, _)| id)
    }

    /// First descendant element with the given name
    pub fn find_element(&self, start: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(start)
            .find(|(_, node)| node.is_element_named(name))
            .map(|(id, _)| id)
    }

    /// All descendant elements with the given name, in document order
    pub fn elements_by_tag_name(&self, start: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(start)
            .filter(|(_, node)| node.is_element_named(name))
            .map(|(id, _)| id)
            .collect()
    }

    /// The root element (first element child of the document node)
    pub fn document_element(&self) -> Option<NodeId> {
        self.children(self.root())
            .find(|(_, node)| node.is_element())
            .map(|(id, _)| id)
    }

    /// Concatenated text of a node and its descendants
    pub fn text_content(&self, id: NodeId) -> String {
        if let Some(text) = self.get(id).and_then(Node::as_text) {
            return text.to_string();
        }
        let mut result = String::new();
        for (_, node) in self.descendants(id) {
            if let Some(text) = node.as_text() {
                result.push_str(text);
            }
        }
        result
    }
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over the children of a node
pub struct Children<'a> {
    tree: &'a DomTree,
    next: NodeId,
}

impl<'a> Iterator for Children<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;
        self.next = node.next_sibling;
        Some((id, node))
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    tree: &'a DomTree,
    start: NodeId,
    next: NodeId,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next;
        let node = self.tree.get(id)?;

        self.next = if node.first_child.is_valid() {
            node.first_child
        } else {
            let mut current = id;
            loop {
                if current == self.start {
                    break NodeId::NONE;
                }
                let Some(cur) = self.tree.get(current) else {
                    break NodeId::NONE;
                };
                if cur.next_sibling.is_valid() {
                    break cur.next_sibling;
                }
                current = cur.parent;
                if !current.is_valid() {
                    break NodeId::NONE;
                }
            }
        };
        Some((id, node))
    }
}
