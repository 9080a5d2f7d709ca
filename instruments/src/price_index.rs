//! Price-ordered AVL index
//!
//! Every node holds a copy of one instrument, keyed by price. Equal prices
//! are rejected: the first instrument at a price owns the slot and later ones
//! are reachable only through the catalog.

use crate::catalog::Catalog;
use crate::instrument::Instrument;
use std::ops::RangeInclusive;
use tracing::debug;

type Link = Option<Box<Node>>;

#[derive(Debug, Clone)]
struct Node {
    instrument: Instrument,
    height: i32,
    left: Link,
    right: Link,
}

impl Node {
    fn leaf(instrument: Instrument) -> Self {
        Self {
            instrument,
            height: 1,
            left: None,
            right: None,
        }
    }

    fn price(&self) -> f64 {
        self.instrument.price
    }

    fn update_height(&mut self) {
        self.height = 1 + height_of(self.left.as_deref()).max(height_of(self.right.as_deref()));
    }
}

fn height_of(node: Option<&Node>) -> i32 {
    node.map_or(0, |n| n.height)
}

fn balance_factor(node: Option<&Node>) -> i32 {
    node.map_or(0, |n| height_of(n.left.as_deref()) - height_of(n.right.as_deref()))
}

fn rotate_right(mut y: Box<Node>) -> Box<Node> {
    let Some(mut x) = y.left.take() else {
        return y;
    };
    y.left = x.right.take();
    y.update_height();
    x.right = Some(y);
    x.update_height();
    x
}

fn rotate_left(mut x: Box<Node>) -> Box<Node> {
    let Some(mut y) = x.right.take() else {
        return x;
    };
    x.right = y.left.take();
    x.update_height();
    y.left = Some(x);
    y.update_height();
    y
}

/// Insert below `link`, returning the new subtree root. `inserted` is set
/// when a node was actually added.
fn insert_node(link: Link, instrument: Instrument, inserted: &mut bool) -> Box<Node> {
    let mut node = match link {
        Some(node) => node,
        None => {
            *inserted = true;
            return Box::new(Node::leaf(instrument));
        }
    };

    let price = instrument.price;
    if price < node.price() {
        node.left = Some(insert_node(node.left.take(), instrument, inserted));
    } else if price > node.price() {
        node.right = Some(insert_node(node.right.take(), instrument, inserted));
    } else {
        return node;
    }

    node.update_height();
    let balance = balance_factor(Some(&*node));

    if balance > 1 {
        if let Some(left) = node.left.take() {
            // left-right case straightens the child first
            node.left = Some(if price > left.price() {
                rotate_left(left)
            } else {
                left
            });
            return rotate_right(node);
        }
    }

    if balance < -1 {
        if let Some(right) = node.right.take() {
            // right-left case
            node.right = Some(if price < right.price() {
                rotate_right(right)
            } else {
                right
            });
            return rotate_left(node);
        }
    }

    node
}

/// Balanced search tree over instrument prices
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    root: Link,
    len: usize,
}

impl PriceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every catalog instrument in id order
    pub fn build(catalog: &Catalog) -> Self {
        let mut index = Self::new();
        for instrument in catalog.iter() {
            if !index.insert(instrument.clone()) {
                debug!(
                    name = %instrument.name,
                    price = instrument.price,
                    "Price already indexed, instrument left out of tree"
                );
            }
        }
        index
    }

    /// Insert an instrument. Returns `false` and leaves the tree untouched
    /// if its price is already present.
    pub fn insert(&mut self, instrument: Instrument) -> bool {
        let mut inserted = false;
        self.root = Some(insert_node(self.root.take(), instrument, &mut inserted));
        if inserted {
            self.len += 1;
        }
        inserted
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Height of the tree (0 when empty)
    pub fn height(&self) -> i32 {
        height_of(self.root.as_deref())
    }

    /// Balance factor of the root
    pub fn root_balance(&self) -> i32 {
        balance_factor(self.root.as_deref())
    }

    /// Exact price lookup
    pub fn get(&self, price: f64) -> Option<&Instrument> {
        let mut current = self.root.as_deref();
        while let Some(node) = current {
            if price < node.price() {
                current = node.left.as_deref();
            } else if price > node.price() {
                current = node.right.as_deref();
            } else {
                return Some(&node.instrument);
            }
        }
        None
    }

    pub fn min(&self) -> Option<&Instrument> {
        let mut node = self.root.as_deref()?;
        while let Some(left) = node.left.as_deref() {
            node = left;
        }
        Some(&node.instrument)
    }

    pub fn max(&self) -> Option<&Instrument> {
        let mut node = self.root.as_deref()?;
        while let Some(right) = node.right.as_deref() {
            node = right;
        }
        Some(&node.instrument)
    }

    /// Instruments priced within `range`, ascending
    pub fn range(&self, range: RangeInclusive<f64>) -> Vec<&Instrument> {
        let mut out = Vec::new();
        collect_range(self.root.as_deref(), &range, &mut out);
        out
    }

    /// In-order (ascending price) traversal
    pub fn iter(&self) -> PriceIter<'_> {
        let mut iter = PriceIter { stack: Vec::new() };
        iter.push_left(self.root.as_deref());
        iter
    }

    /// Verify ordering, height bookkeeping and AVL balance of every node
    pub fn check_invariants(&self) -> Result<(), String> {
        check_node(self.root.as_deref(), None, None).map(|_| ())
    }
}

fn collect_range<'a>(
    node: Option<&'a Node>,
    range: &RangeInclusive<f64>,
    out: &mut Vec<&'a Instrument>,
) {
    let Some(node) = node else {
        return;
    };
    let price = node.price();
    if price > *range.start() {
        collect_range(node.left.as_deref(), range, out);
    }
    if range.contains(&price) {
        out.push(&node.instrument);
    }
    if price < *range.end() {
        collect_range(node.right.as_deref(), range, out);
    }
}

fn check_node(node: Option<&Node>, lower: Option<f64>, upper: Option<f64>) -> Result<i32, String> {
    let Some(node) = node else {
        return Ok(0);
    };
    let price = node.price();
    if lower.is_some_and(|lo| price <= lo) || upper.is_some_and(|hi| price >= hi) {
        return Err(format!("price {} out of order", price));
    }

    let left = check_node(node.left.as_deref(), lower, Some(price))?;
    let right = check_node(node.right.as_deref(), Some(price), upper)?;

    if (left - right).abs() > 1 {
        return Err(format!("node {} unbalanced ({} vs {})", price, left, right));
    }
    let height = 1 + left.max(right);
    if height != node.height {
        return Err(format!(
            "node {} records height {}, actual {}",
            price, node.height, height
        ));
    }
    Ok(height)
}

/// Ascending-price iterator over a [`PriceIndex`]
pub struct PriceIter<'a> {
    stack: Vec<&'a Node>,
}

impl<'a> PriceIter<'a> {
    fn push_left(&mut self, mut node: Option<&'a Node>) {
        while let Some(n) = node {
            self.stack.push(n);
            node = n.left.as_deref();
        }
    }
}

impl<'a> Iterator for PriceIter<'a> {
    type Item = &'a Instrument;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.push_left(node.right.as_deref());
        Some(&node.instrument)
    }
}
