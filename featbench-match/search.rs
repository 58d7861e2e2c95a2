//! Exact k-nearest-neighbour search backends.
//!
//! Both backends report neighbours nearest first; equal distances are
//! ordered by reference index so the two agree on exact data.

use bitarray::{BitArray, Hamming};
use featbench_core::{FatalError, FatalResult};
use rayon::prelude::*;
use space::{Knn, LinearKnn};

use crate::metric::l2_squared;

/// One reference row and its distance to the query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Keep the `k` best `(index, distance)` candidates, nearest first
struct BestK {
    k: usize,
    items: Vec<Neighbor>,
}

impl BestK {
    fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k + 1),
        }
    }

    fn is_full(&self) -> bool {
        self.items.len() >= self.k
    }

    fn worst(&self) -> f32 {
        self.items.last().map_or(f32::INFINITY, |n| n.distance)
    }

    fn offer(&mut self, index: usize, distance: f32) {
        if self.k == 0 {
            return;
        }
        if self.is_full() {
            let last = self.items[self.items.len() - 1];
            if (distance, index) >= (last.distance, last.index) {
                return;
            }
        }
        let pos = self
            .items
            .partition_point(|n| (n.distance, n.index) < (distance, index));
        self.items.insert(pos, Neighbor { index, distance });
        self.items.truncate(self.k);
    }
}

/// Widest packed row the Hamming search accepts, in bytes
pub const MAX_BINARY_BYTES: usize = 64;

/// Exhaustive Hamming search, one neighbour list per source row.
///
/// Rows are zero-padded into `BitArray`s of 32 or 64 bytes; the padding is
/// identical on both sides and leaves every distance unchanged.
pub fn brute_force_hamming(
    source: &[u8],
    reference: &[u8],
    width: usize,
    k: usize,
) -> FatalResult<Vec<Vec<Neighbor>>> {
    match width {
        0 => Ok(Vec::new()),
        1..=32 => Ok(linear_hamming::<32>(source, reference, width, k)),
        33..=MAX_BINARY_BYTES => Ok(linear_hamming::<64>(source, reference, width, k)),
        _ => Err(FatalError::UnsupportedWidth {
            width,
            max: MAX_BINARY_BYTES,
        }),
    }
}

fn to_bits<const B: usize>(data: &[u8], width: usize) -> Vec<BitArray<B>> {
    data.chunks(width)
        .map(|row| {
            let mut bits = BitArray::<B>::zeros();
            bits.bytes_mut()[..row.len()].copy_from_slice(row);
            bits
        })
        .collect()
}

fn linear_hamming<const B: usize>(source: &[u8], reference: &[u8], width: usize, k: usize) -> Vec<Vec<Neighbor>> {
    let queries = to_bits::<B>(source, width);
    let references = to_bits::<B>(reference, width);
    let knn = LinearKnn {
        metric: Hamming,
        iter: references.iter(),
    };
    queries
        .par_iter()
        .map(|query| {
            let mut found: Vec<Neighbor> = knn
                .knn(query, k)
                .into_iter()
                .map(|n| Neighbor {
                    index: n.index,
                    distance: n.distance as f32,
                })
                .collect();
            found.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index)));
            found
        })
        .collect()
}

/// Exhaustive Euclidean search, one neighbour list per source row
pub fn brute_force_l2(source: &[f32], reference: &[f32], dims: usize, k: usize) -> Vec<Vec<Neighbor>> {
    if dims == 0 {
        return Vec::new();
    }
    source
        .par_chunks(dims)
        .map(|query| {
            let mut best = BestK::new(k);
            for (j, row) in reference.chunks(dims).enumerate() {
                best.offer(j, l2_squared(query, row));
            }
            into_euclidean(best.items)
        })
        .collect()
}

fn into_euclidean(mut items: Vec<Neighbor>) -> Vec<Neighbor> {
    for n in &mut items {
        n.distance = n.distance.sqrt();
    }
    items
}

const LEAF_SIZE: usize = 8;

#[derive(Debug)]
enum Node {
    Leaf { start: usize, end: usize },
    Split { dim: usize, value: f32, left: usize, right: usize },
}

/// Kd-tree over the rows of a float matrix, splitting on the dimension of
/// largest spread at the median
#[derive(Debug)]
pub struct KdTree<'a> {
    dims: usize,
    data: &'a [f32],
    /// Row indices, permuted so every leaf owns a contiguous range
    order: Vec<usize>,
    nodes: Vec<Node>,
}

impl<'a> KdTree<'a> {
    pub fn build(data: &'a [f32], dims: usize) -> Self {
        let rows = if dims == 0 { 0 } else { data.len() / dims };
        let mut tree = Self {
            dims,
            data,
            order: (0..rows).collect(),
            nodes: Vec::new(),
        };
        if rows > 0 {
            tree.build_node(0, rows);
        }
        tree
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn row(&self, i: usize) -> &[f32] {
        &self.data[i * self.dims..(i + 1) * self.dims]
    }

    fn build_node(&mut self, start: usize, end: usize) -> usize {
        let id = self.nodes.len();
        if end - start <= LEAF_SIZE {
            self.nodes.push(Node::Leaf { start, end });
            return id;
        }

        let dim = self.widest_dimension(start, end);
        let (data, dims) = (self.data, self.dims);
        let mid = start + (end - start) / 2;
        self.order[start..end]
            .select_nth_unstable_by(mid - start, |&a, &b| data[a * dims + dim].total_cmp(&data[b * dims + dim]));
        let value = data[self.order[mid] * dims + dim];

        // placeholder, patched once both children exist
        self.nodes.push(Node::Leaf { start, end });
        let left = self.build_node(start, mid);
        let right = self.build_node(mid, end);
        self.nodes[id] = Node::Split { dim, value, left, right };
        id
    }

    fn widest_dimension(&self, start: usize, end: usize) -> usize {
        let mut best = (0, f32::NEG_INFINITY);
        for dim in 0..self.dims {
            let (mut lo, mut hi) = (f32::INFINITY, f32::NEG_INFINITY);
            for &i in &self.order[start..end] {
                let v = self.data[i * self.dims + dim];
                lo = lo.min(v);
                hi = hi.max(v);
            }
            if hi - lo > best.1 {
                best = (dim, hi - lo);
            }
        }
        best.0
    }

    /// The `k` rows nearest to `query` by Euclidean distance
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor> {
        let mut best = BestK::new(k);
        if !self.nodes.is_empty() {
            self.search(0, query, &mut best);
        }
        into_euclidean(best.items)
    }

    fn search(&self, node: usize, query: &[f32], best: &mut BestK) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &i in &self.order[start..end] {
                    best.offer(i, l2_squared(query, self.row(i)));
                }
            }
            Node::Split { dim, value, left, right } => {
                let diff = query[dim] - value;
                let (near, far) = if diff < 0.0 { (left, right) } else { (right, left) };
                self.search(near, query, best);
                // ties on the boundary may hide an equally distant lower index
                if !best.is_full() || diff * diff <= best.worst() {
                    self.search(far, query, best);
                }
            }
        }
    }

    /// Neighbour lists for every row of `source`
    pub fn nearest_all(&self, source: &[f32], k: usize) -> Vec<Vec<Neighbor>> {
        if self.dims == 0 {
            return Vec::new();
        }
        source.par_chunks(self.dims).map(|query| self.nearest(query, k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_best_k_orders_and_breaks_ties_by_index() {
        let mut best = BestK::new(2);
        best.offer(5, 3.0);
        best.offer(2, 3.0);
        best.offer(9, 1.0);
        best.offer(1, 3.0);
        let got: Vec<(usize, f32)> = best.items.iter().map(|n| (n.index, n.distance)).collect();
        assert_eq!(got, vec![(9, 1.0), (1, 3.0)]);
    }

    #[test]
    fn test_brute_force_hamming() {
        let source = [0b0000_0000u8, 0b1111_1111];
        let reference = [0b0000_0001u8, 0b1111_0000, 0b1111_1110];
        let result = brute_force_hamming(&source, &reference, 1, 2).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0][0], Neighbor { index: 0, distance: 1.0 });
        assert_eq!(result[0][1], Neighbor { index: 1, distance: 4.0 });
        assert_eq!(result[1][0], Neighbor { index: 2, distance: 1.0 });
    }

    #[test]
    fn test_hamming_padding_keeps_distances() {
        let source = [0xffu8; 40];
        let mut near = [0xffu8; 40];
        near[39] = 0x0f;
        let reference: Vec<u8> = [[0u8; 40], near].concat();
        let result = brute_force_hamming(&source, &reference, 40, 2).unwrap();
        assert_eq!(result[0][0], Neighbor { index: 1, distance: 4.0 });
        assert_eq!(result[0][1], Neighbor { index: 0, distance: 320.0 });
    }

    #[test]
    fn test_hamming_rejects_oversized_rows() {
        let rows = [0u8; 65];
        let err = brute_force_hamming(&rows, &rows, 65, 1).unwrap_err();
        assert!(matches!(err, FatalError::UnsupportedWidth { width: 65, max: 64 }));
    }

    #[test]
    fn test_fewer_references_than_k() {
        let result = brute_force_l2(&[0.0, 0.0], &[1.0, 0.0], 2, 2);
        assert_eq!(result[0].len(), 1);
        assert_eq!(result[0][0].distance, 1.0);
    }

    #[test]
    fn test_empty_tree() {
        let tree = KdTree::build(&[], 4);
        assert!(tree.is_empty());
        assert!(tree.nearest(&[0.0; 4], 2).is_empty());
    }

    proptest! {
        #[test]
        fn prop_kd_tree_agrees_with_brute_force(
            reference in proptest::collection::vec(0u8..=255, 0..(3 * 60)),
            queries in proptest::collection::vec(0u8..=255, 3..(3 * 10)),
        ) {
            let dims = 3;
            let reference: Vec<f32> = reference[..reference.len() / dims * dims].iter().map(|&v| v as f32).collect();
            let queries: Vec<f32> = queries[..queries.len() / dims * dims].iter().map(|&v| v as f32).collect();

            let tree = KdTree::build(&reference, dims);
            prop_assert_eq!(tree.len(), reference.len() / dims);
            let indexed = tree.nearest_all(&queries, 2);
            let exhaustive = brute_force_l2(&queries, &reference, dims, 2);
            prop_assert_eq!(indexed, exhaustive);
        }
    }
}
