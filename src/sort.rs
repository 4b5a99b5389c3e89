//! Partial sort used to rank ANN candidates: brings the smallest `k`
//! elements (by ascending `(score, id)`) to the front of the slice without
//! fully sorting the remainder.

const INSERTION_THRESHOLD: usize = 64;

/// A scored candidate: `score` ranks ascending, ties break by ascending
/// `id`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scored {
    pub id: u32,
    pub dist: f32,
}

fn less(a: &Scored, b: &Scored) -> bool {
    (a.dist, a.id).partial_cmp(&(b.dist, b.id)).unwrap() == std::cmp::Ordering::Less
}

fn insertion_sort(xs: &mut [Scored]) {
    for i in 1..xs.len() {
        let mut j = i;
        while j > 0 && less(&xs[j], &xs[j - 1]) {
            xs.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Median-of-three pivot index among `lo`, `mid`, `hi`.
fn median_of_three(xs: &[Scored], lo: usize, mid: usize, hi: usize) -> usize {
    let (a, b, c) = (xs[lo], xs[mid], xs[hi]);
    if less(&a, &b) {
        if less(&b, &c) {
            mid
        } else if less(&a, &c) {
            hi
        } else {
            lo
        }
    } else if less(&a, &c) {
        lo
    } else if less(&b, &c) {
        hi
    } else {
        mid
    }
}

fn partition(xs: &mut [Scored], pivot_index: usize) -> usize {
    let last = xs.len() - 1;
    xs.swap(pivot_index, last);
    let pivot = xs[last];
    let mut store = 0;
    for i in 0..last {
        if less(&xs[i], &pivot) {
            xs.swap(i, store);
            store += 1;
        }
    }
    xs.swap(store, last);
    store
}

/// Rearranges `xs` so that the first `k` elements (or all of them, if
/// `k >= xs.len()`) are the smallest by ascending `(dist, id)` order.
/// Elements beyond the first `k` are left in unspecified order.
pub fn partial_sort_by_dist(xs: &mut [Scored], k: usize) {
    if xs.len() <= 1 || k == 0 {
        return;
    }
    partial_sort_range(xs, 0, xs.len(), k);
    let bound = k.min(xs.len());
    insertion_sort(&mut xs[..bound]);
}

fn partial_sort_range(xs: &mut [Scored], lo: usize, hi: usize, k: usize) {
    let len = hi - lo;
    if len <= INSERTION_THRESHOLD {
        insertion_sort(&mut xs[lo..hi]);
        return;
    }
    let mid = lo + len / 2;
    let pivot_index = median_of_three(xs, lo, mid, hi - 1);
    let relative_pivot = pivot_index - lo;
    let split = lo + partition(&mut xs[lo..hi], relative_pivot);

    if split > lo + k {
        partial_sort_range(xs, lo, split, k);
    } else if split < lo + k {
        partial_sort_range(xs, lo, split, split - lo);
        partial_sort_range(xs, split + 1, hi, k - (split - lo) - 1);
    }
}
