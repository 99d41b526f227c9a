use crate::error::IndexError;

type NodeId = usize;

#[derive(Debug, Clone)]
enum Cell<T> {
    Leaf(T),
    Node(NodeId),
}

/// One rectangular block of cells with precomputed row-major strides
#[derive(Debug, Clone)]
struct Node<T> {
    dim: Vec<usize>,
    stride: Vec<usize>,
    cells: Vec<Cell<T>>,
}

impl<T> Node<T> {
    fn empty(dim: &[usize]) -> Self {
        let mut stride = vec![1; dim.len()];
        for axis in (0..dim.len().saturating_sub(1)).rev() {
            stride[axis] = stride[axis + 1] * dim[axis + 1];
        }
        Self {
            dim: dim.to_vec(),
            stride,
            cells: Vec::with_capacity(dim.iter().product()),
        }
    }

    /// A node whose leaves are produced by `element(prefix ++ local index)`
    fn filled(dim: &[usize], prefix: &[usize], element: &mut impl FnMut(&[usize]) -> T) -> Self {
        let mut node = Self::empty(dim);
        let size = dim.iter().product::<usize>();
        let mut index = prefix.to_vec();
        for offset in 0..size {
            node.unravel(offset, &mut index);
            node.cells.push(Cell::Leaf(element(&index)));
            index.truncate(prefix.len());
        }
        node
    }

    /// Append the multi-index of `offset` to `out`
    fn unravel(&self, offset: usize, out: &mut Vec<usize>) {
        out.extend(
            self.dim
                .iter()
                .zip(&self.stride)
                .map(|(&extent, &stride)| offset / stride % extent),
        );
    }
}

/// An N-dimensional array whose cells may hold nested arrays of their own shape
///
/// Every node is a rectangular block addressed with row-major strides. A cell holds either a
/// leaf element or a nested node, so different branches can have different sub-shapes
/// (e.g. one row of action values per state, with a different number of actions per state).
///
/// Nodes live in an arena and refer to their children by position, and once built the shape
/// never changes: only leaf contents are mutable.
///
/// ### Example
/// ```
/// # use tabular_rl::ds::NSet;
/// // two rows of length 1 and 2
/// let rows = NSet::from_vec(vec![1usize, 2]);
/// let mut jagged = rows.expand(|_, &n| vec![n], |_| 0.0);
/// jagged.set(&[1, 1], 4.0).unwrap();
/// assert_eq!(jagged.iter().copied().collect::<Vec<_>>(), [0.0, 0.0, 4.0]);
/// assert!(jagged.get(&[0, 1]).is_err());
/// ```
#[derive(Debug, Clone)]
pub struct NSet<T> {
    nodes: Vec<Node<T>>,
    len: usize,
}

impl<T> NSet<T> {
    /// Construct a rectangular set of shape `dim`, filling each leaf with `element(index)`
    pub fn new(dim: &[usize], mut element: impl FnMut(&[usize]) -> T) -> Self {
        let root = Node::filled(dim, &[], &mut element);
        let len = root.cells.len();
        Self {
            nodes: vec![root],
            len,
        }
    }

    /// Construct a one dimensional set holding `elements`
    pub fn from_vec(elements: Vec<T>) -> Self {
        let mut root = Node::empty(&[elements.len()]);
        root.cells = elements.into_iter().map(Cell::Leaf).collect();
        let len = root.cells.len();
        Self {
            nodes: vec![root],
            len,
        }
    }

    /// Construct a set with exactly the shape and nesting of `source`
    ///
    /// `element` is called once per leaf position, in iteration order, with the leaf's full index.
    pub fn copy_shape<U>(source: &NSet<U>, mut element: impl FnMut(&[usize]) -> T) -> Self {
        source.rebuild(|index, _, _| Cell::Leaf(element(index)))
    }

    /// Construct a set with the shape of `self` where every leaf is replaced by a nested node
    ///
    /// The nested node's shape is `sub_dim(index, leaf)` and its leaves are filled with
    /// `element(full index)`.
    pub fn expand<U>(
        &self,
        mut sub_dim: impl FnMut(&[usize], &T) -> Vec<usize>,
        mut element: impl FnMut(&[usize]) -> U,
    ) -> NSet<U> {
        self.rebuild(|index, value, nodes| {
            let node = Node::filled(&sub_dim(index, value), index, &mut element);
            nodes.push(node);
            Cell::Node(nodes.len() - 1)
        })
    }

    fn rebuild<U>(
        &self,
        mut leaf: impl FnMut(&[usize], &T, &mut Vec<Node<U>>) -> Cell<U>,
    ) -> NSet<U> {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut prefix = Vec::new();
        rebuild_node(&self.nodes, 0, &mut prefix, &mut nodes, &mut leaf);
        let len = nodes
            .iter()
            .flat_map(|n| &n.cells)
            .filter(|c| matches!(c, Cell::Leaf(_)))
            .count();
        NSet { nodes, len }
    }

    /// Number of leaves
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Shape of the root node
    pub fn dim(&self) -> &[usize] {
        &self.nodes[0].dim
    }

    /// Resolve `index` to the node and flat offset of the addressed cell
    fn locate(&self, index: &[usize]) -> Result<(NodeId, usize), IndexError> {
        let mut id = 0;
        let mut start = 0;
        loop {
            let node = &self.nodes[id];
            let rank = node.dim.len();
            let rest = &index[start..];
            if rest.len() < rank {
                return Err(IndexError::Rank {
                    remaining: rest.len(),
                    rank,
                });
            }

            let mut offset = 0;
            for (axis, ((&i, &extent), &stride)) in
                rest.iter().zip(&node.dim).zip(&node.stride).enumerate()
            {
                if i >= extent {
                    return Err(IndexError::OutOfBounds {
                        axis: start + axis,
                        index: i,
                        extent,
                    });
                }
                offset += i * stride;
            }

            start += rank;
            if start == index.len() {
                return Ok((id, offset));
            }
            match node.cells[offset] {
                Cell::Node(child) => id = child,
                Cell::Leaf(_) => return Err(IndexError::TooDeep { depth: start }),
            }
        }
    }

    pub fn get(&self, index: &[usize]) -> Result<&T, IndexError> {
        let (id, offset) = self.locate(index)?;
        match &self.nodes[id].cells[offset] {
            Cell::Leaf(value) => Ok(value),
            Cell::Node(_) => Err(IndexError::NotALeaf),
        }
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Result<&mut T, IndexError> {
        let (id, offset) = self.locate(index)?;
        match &mut self.nodes[id].cells[offset] {
            Cell::Leaf(value) => Ok(value),
            Cell::Node(_) => Err(IndexError::NotALeaf),
        }
    }

    /// Overwrite the leaf at `index`
    pub fn set(&mut self, index: &[usize], value: T) -> Result<(), IndexError> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Iterate leaves depth first, in increasing flat order within each node
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            cursor: Cursor::new(self),
        }
    }

    /// Iterate leaves together with their full index, in the order of [`iter`](NSet::iter)
    pub fn indexed(&self) -> Indexed<'_, T> {
        Indexed {
            cursor: Cursor::new(self),
        }
    }

    /// Iterate the full index of every leaf
    pub fn indices(&self) -> impl Iterator<Item = Vec<usize>> + '_ {
        self.indexed().map(|(index, _)| index)
    }

    /// Visit every leaf mutably, in iteration order
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&[usize], &mut T)) {
        let mut stack: Vec<(NodeId, usize)> = vec![(0, 0)];
        let mut index = Vec::new();
        while let Some(&(id, next)) = stack.last() {
            if next == self.nodes[id].cells.len() {
                stack.pop();
                continue;
            }
            if let Some(top) = stack.last_mut() {
                top.1 += 1;
            }

            index.clear();
            for &(frame, next) in &stack {
                self.nodes[frame].unravel(next - 1, &mut index);
            }
            match &mut self.nodes[id].cells[next] {
                Cell::Leaf(value) => f(&index, value),
                Cell::Node(child) => {
                    let child = *child;
                    stack.push((child, 0));
                }
            }
        }
    }

    /// Replace every leaf with `f(index, leaf)`
    pub fn map_in_place(&mut self, mut f: impl FnMut(&[usize], &T) -> T) {
        self.for_each_mut(|index, value| *value = f(index, value));
    }
}

fn rebuild_node<T, U, F>(
    src: &[Node<T>],
    id: NodeId,
    prefix: &mut Vec<usize>,
    out: &mut Vec<Node<U>>,
    leaf: &mut F,
) -> NodeId
where
    F: FnMut(&[usize], &T, &mut Vec<Node<U>>) -> Cell<U>,
{
    let node = &src[id];
    let new_id = out.len();
    out.push(Node::empty(&node.dim));
    let depth = prefix.len();
    for (offset, cell) in node.cells.iter().enumerate() {
        node.unravel(offset, prefix);
        let cell = match cell {
            Cell::Leaf(value) => leaf(prefix.as_slice(), value, out),
            Cell::Node(child) => Cell::Node(rebuild_node(src, *child, prefix, out, leaf)),
        };
        out[new_id].cells.push(cell);
        prefix.truncate(depth);
    }
    new_id
}

/// Depth first walk over the leaves of an [`NSet`]
///
/// Each stack frame holds a node and the offset of the next cell to visit, so the cell being
/// visited in every frame is at `next - 1`.
struct Cursor<'a, T> {
    set: &'a NSet<T>,
    stack: Vec<(NodeId, usize)>,
}

impl<'a, T> Cursor<'a, T> {
    fn new(set: &'a NSet<T>) -> Self {
        Self {
            set,
            stack: vec![(0, 0)],
        }
    }

    fn advance(&mut self) -> Option<&'a T> {
        let set = self.set;
        loop {
            let &(id, next) = self.stack.last()?;
            let node = &set.nodes[id];
            if next == node.cells.len() {
                self.stack.pop();
                continue;
            }
            if let Some(top) = self.stack.last_mut() {
                top.1 += 1;
            }
            match &node.cells[next] {
                Cell::Leaf(value) => return Some(value),
                Cell::Node(child) => self.stack.push((*child, 0)),
            }
        }
    }

    fn index(&self) -> Vec<usize> {
        let mut index = Vec::new();
        for &(id, next) in &self.stack {
            self.set.nodes[id].unravel(next - 1, &mut index);
        }
        index
    }
}

/// Iterator over the leaves of an [`NSet`]
pub struct Iter<'a, T> {
    cursor: Cursor<'a, T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.advance()
    }
}

/// Iterator over `(index, leaf)` pairs of an [`NSet`]
pub struct Indexed<'a, T> {
    cursor: Cursor<'a, T>,
}

impl<'a, T> Iterator for Indexed<'a, T> {
    type Item = (Vec<usize>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.cursor.advance()?;
        Some((self.cursor.index(), value))
    }
}

impl<'a, T> IntoIterator for &'a NSet<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
