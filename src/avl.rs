use std::{cmp::Ordering, mem};

/// the ordered map capability the catalog and the reference indexes are built on.
/// anything that can look up, insert and walk its keys in order can stand in for the AVL tree
pub trait OrderedIndex<K: Ord, V>: Default {
    type Iter<'a>: Iterator<Item = (&'a K, &'a V)>
    where
        Self: 'a,
        K: 'a,
        V: 'a;

    fn lookup(&self, key: &K) -> Option<&V>;
    fn lookup_mut(&mut self, key: &K) -> Option<&mut V>;
    /// insert a value, handing back the previous one if the key was already present
    fn insert(&mut self, key: K, value: V) -> Option<V>;
    fn len(&self) -> usize;
    fn iter(&self) -> Self::Iter<'_>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

type Link<K, V> = Option<Box<Node<K, V>>>;

#[derive(Debug, Clone)]
pub struct Node<K, V> {
    key: K,
    value: V,
    height: u32,
    left: Link<K, V>,
    right: Link<K, V>,
}

impl<K, V> Node<K, V> {
    fn leaf(key: K, value: V) -> Self {
        Self {
            key,
            value,
            height: 1,
            left: None,
            right: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    fn update_height(&mut self) {
        self.height = 1 + height(&self.left).max(height(&self.right));
    }

    fn balance_factor(&self) -> i64 {
        i64::from(height(&self.left)) - i64::from(height(&self.right))
    }
}

fn height<K, V>(link: &Link<K, V>) -> u32 {
    link.as_ref().map_or(0, |node| node.height)
}

fn rotate_right<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    match node.left.take() {
        Some(mut pivot) => {
            node.left = pivot.right.take();
            node.update_height();
            pivot.right = Some(node);
            pivot.update_height();
            pivot
        }
        None => node,
    }
}

fn rotate_left<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    match node.right.take() {
        Some(mut pivot) => {
            node.right = pivot.left.take();
            node.update_height();
            pivot.left = Some(node);
            pivot.update_height();
            pivot
        }
        None => node,
    }
}

// restore |balance factor| <= 1 after one insertion below `node`
fn rebalance<K, V>(mut node: Box<Node<K, V>>) -> Box<Node<K, V>> {
    node.update_height();
    let factor = node.balance_factor();
    if factor > 1 {
        if let Some(left) = node.left.take() {
            // left-right case
            node.left = Some(if left.balance_factor() < 0 {
                rotate_left(left)
            } else {
                left
            });
        }
        rotate_right(node)
    } else if factor < -1 {
        if let Some(right) = node.right.take() {
            // right-left case
            node.right = Some(if right.balance_factor() > 0 {
                rotate_right(right)
            } else {
                right
            });
        }
        rotate_left(node)
    } else {
        node
    }
}

fn insert_at<K: Ord, V>(link: Link<K, V>, key: K, value: V) -> (Box<Node<K, V>>, Option<V>) {
    let mut node = match link {
        Some(node) => node,
        None => return (Box::new(Node::leaf(key, value)), None),
    };
    let replaced = match key.cmp(&node.key) {
        Ordering::Less => {
            let (child, replaced) = insert_at(node.left.take(), key, value);
            node.left = Some(child);
            replaced
        }
        Ordering::Greater => {
            let (child, replaced) = insert_at(node.right.take(), key, value);
            node.right = Some(child);
            replaced
        }
        Ordering::Equal => {
            // same key, the shape does not change
            let old = mem::replace(&mut node.value, value);
            return (node, Some(old));
        }
    };
    (rebalance(node), replaced)
}

/// a self-balancing binary search tree,
/// the heights of two sibling subtrees never differ by more than one
#[derive(Debug, Clone)]
pub struct AvlTree<K, V> {
    root: Link<K, V>,
    len: usize,
}

impl<K, V> Default for AvlTree<K, V> {
    fn default() -> Self {
        Self { root: None, len: 0 }
    }
}

impl<K: Ord, V> AvlTree<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            match key.cmp(&node.key) {
                Ordering::Less => current = node.left.as_deref(),
                Ordering::Greater => current = node.right.as_deref(),
                Ordering::Equal => return Some(&node.value),
            }
        }
        None
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let mut current = self.root.as_deref_mut();
        while let Some(node) = current {
            match key.cmp(&node.key) {
                Ordering::Less => current = node.left.as_deref_mut(),
                Ordering::Greater => current = node.right.as_deref_mut(),
                Ordering::Equal => return Some(&mut node.value),
            }
        }
        None
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.get(key).is_some()
    }

    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let (root, replaced) = insert_at(self.root.take(), key, value);
        self.root = Some(root);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// height of the tree, 0 when empty
    pub fn height(&self) -> u32 {
        height(&self.root)
    }

    pub fn root(&self) -> Option<&Node<K, V>> {
        self.root.as_deref()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(self.root.as_deref(), self.len)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.iter().map(|(key, _)| key)
    }

    /// walk the whole tree and check ordering, stored heights and balance
    pub fn is_valid(&self) -> bool {
        fn check<K: Ord, V>(
            link: &Link<K, V>,
            low: Option<&K>,
            high: Option<&K>,
        ) -> Option<u32> {
            let node = match link {
                Some(node) => node,
                None => return Some(0),
            };
            let below = low.map_or(false, |low| node.key <= *low);
            let above = high.map_or(false, |high| node.key >= *high);
            if below || above {
                return None;
            }
            let left = check(&node.left, low, Some(&node.key))?;
            let right = check(&node.right, Some(&node.key), high)?;
            if left.abs_diff(right) > 1 || node.height != 1 + left.max(right) {
                return None;
            }
            Some(node.height)
        }
        check(&self.root, None, None).is_some() && self.iter().count() == self.len
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for AvlTree<K, V> {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut tree = Self::new();
        for (key, value) in iter {
            tree.insert(key, value);
        }
        tree
    }
}

impl<'a, K: Ord, V> IntoIterator for &'a AvlTree<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K: Ord, V> OrderedIndex<K, V> for AvlTree<K, V> {
    type Iter<'a> = Iter<'a, K, V> where K: 'a, V: 'a;

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn lookup_mut(&mut self, key: &K) -> Option<&mut V> {
        self.get_mut(key)
    }

    fn insert(&mut self, key: K, value: V) -> Option<V> {
        AvlTree::insert(self, key, value)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn iter(&self) -> Self::Iter<'_> {
        AvlTree::iter(self)
    }
}

/// in-order traversal, keys come out strictly increasing
pub struct Iter<'a, K, V> {
    stack: Vec<&'a Node<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    fn new(root: Option<&'a Node<K, V>>, len: usize) -> Self {
        let mut iter = Self {
            stack: Vec::new(),
            remaining: len,
        };
        iter.push_left_spine(root);
        iter
    }

    fn push_left_spine(&mut self, mut link: Option<&'a Node<K, V>>) {
        while let Some(node) = link {
            self.stack.push(node);
            link = node.left.as_deref();
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left_spine(node.right.as_deref());
        self.remaining = self.remaining.saturating_sub(1);
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}
