//! Window filters, connected regions and sieving on single bands

use ndarray::Array2;
use std::collections::VecDeque;

/// Values inside the square window centred on `(i, j)`, clipped at the edges
fn window_values(image: &Array2<f32>, i: usize, j: usize, window: usize) -> Vec<f32> {
    let (height, width) = image.dim();
    let half = window / 2;
    let row_start = i.saturating_sub(half);
    let row_end = (i + half + 1).min(height);
    let col_start = j.saturating_sub(half);
    let col_end = (j + half + 1).min(width);

    let mut values = Vec::with_capacity(window * window);
    for ii in row_start..row_end {
        for jj in col_start..col_end {
            values.push(image[[ii, jj]]);
        }
    }
    values
}

/// Most frequent value in each window; ties keep the centre value
pub fn majority_filter(image: &Array2<f32>, window: usize) -> Array2<f32> {
    let (height, width) = image.dim();
    let mut filtered = Array2::zeros((height, width));

    for i in 0..height {
        for j in 0..width {
            let center = image[[i, j]];
            let mut counts: Vec<(f32, usize)> = Vec::new();
            for value in window_values(image, i, j, window) {
                match counts.iter_mut().find(|(v, _)| *v == value) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((value, 1)),
                }
            }

            let best = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
            let center_count = counts.iter().find(|(v, _)| *v == center).map(|(_, n)| *n);
            filtered[[i, j]] = if center_count == Some(best) {
                center
            } else {
                counts.iter().find(|(_, n)| *n == best).map(|(v, _)| *v).unwrap_or(center)
            };
        }
    }

    filtered
}

/// Median of the positive finite values in each window
///
/// Pixels whose window has no valid values are copied through.
pub fn median_filter(image: &Array2<f32>, window: usize) -> Array2<f32> {
    let (height, width) = image.dim();
    let mut filtered = Array2::zeros((height, width));

    for i in 0..height {
        for j in 0..width {
            let mut values: Vec<f32> = window_values(image, i, j, window)
                .into_iter()
                .filter(|v| v.is_finite() && *v > 0.0)
                .collect();

            filtered[[i, j]] = if values.is_empty() {
                image[[i, j]]
            } else {
                values.sort_by(|a, b| a.total_cmp(b));
                values[values.len() / 2]
            };
        }
    }

    filtered
}

/// Gamma-MAP speckle filter for intensity images with `looks` equivalent looks
pub fn gamma_map_filter(image: &Array2<f32>, window: usize, looks: f32) -> Array2<f32> {
    let (height, width) = image.dim();
    let mut filtered = Array2::zeros((height, width));

    let cu = 1.0 / looks.max(f32::EPSILON).sqrt();
    let cu2 = cu * cu;

    for i in 0..height {
        for j in 0..width {
            let center = image[[i, j]];
            if !center.is_finite() || center <= 0.0 {
                filtered[[i, j]] = center;
                continue;
            }

            let values: Vec<f32> = window_values(image, i, j, window)
                .into_iter()
                .filter(|v| v.is_finite() && *v > 0.0)
                .collect();
            let n = values.len() as f32;
            let mean = values.iter().sum::<f32>() / n;
            let variance = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;

            if mean <= 0.0 {
                filtered[[i, j]] = center;
                continue;
            }

            let cv2 = variance / (mean * mean);
            let alpha = (1.0 + cu2) / (cv2 - cu2).max(0.001);
            let weight = alpha / (alpha + 1.0);
            filtered[[i, j]] = weight * center + (1.0 - weight) * mean;
        }
    }

    filtered
}

/// A 4-connected region of equal values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub value: f32,
    pub size: usize,
}

/// Label 4-connected regions of equal value
///
/// Pixels for which `is_data` is false get no label (`usize::MAX`).
pub fn label_regions(
    image: &Array2<f32>,
    is_data: impl Fn(f32) -> bool,
) -> (Array2<usize>, Vec<Region>) {
    let (height, width) = image.dim();
    let mut labels = Array2::from_elem((height, width), usize::MAX);
    let mut regions = Vec::new();
    let mut queue = VecDeque::new();

    for i in 0..height {
        for j in 0..width {
            let value = image[[i, j]];
            if labels[[i, j]] != usize::MAX || !is_data(value) {
                continue;
            }

            let label = regions.len();
            let mut size = 0;
            labels[[i, j]] = label;
            queue.push_back((i, j));

            while let Some((r, c)) = queue.pop_front() {
                size += 1;
                for (nr, nc) in neighbours(r, c, height, width) {
                    if labels[[nr, nc]] == usize::MAX && image[[nr, nc]] == value {
                        labels[[nr, nc]] = label;
                        queue.push_back((nr, nc));
                    }
                }
            }

            regions.push(Region { value, size });
        }
    }

    (labels, regions)
}

fn neighbours(r: usize, c: usize, height: usize, width: usize) -> impl Iterator<Item = (usize, usize)> {
    let up = (r > 0).then(|| (r - 1, c));
    let down = (r + 1 < height).then(|| (r + 1, c));
    let left = (c > 0).then(|| (r, c - 1));
    let right = (c + 1 < width).then(|| (r, c + 1));
    [up, down, left, right].into_iter().flatten()
}

fn find_root(parent: &mut [usize], mut label: usize) -> usize {
    while parent[label] != label {
        parent[label] = parent[parent[label]];
        label = parent[label];
    }
    label
}

/// Merge 4-connected regions smaller than `min_pixels` into their largest neighbour
///
/// Small regions are absorbed smallest first; a region with no neighbours is kept.
pub fn sieve(image: &Array2<f32>, min_pixels: u64) -> Array2<f32> {
    let (height, width) = image.dim();
    let (labels, regions) = label_regions(image, |v| v.is_finite());

    let mut parent: Vec<usize> = (0..regions.len()).collect();
    let mut sizes: Vec<usize> = regions.iter().map(|r| r.size).collect();

    // Adjacency between distinct regions
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); regions.len()];
    for i in 0..height {
        for j in 0..width {
            let a = labels[[i, j]];
            if a == usize::MAX {
                continue;
            }
            for (ni, nj) in neighbours(i, j, height, width) {
                let b = labels[[ni, nj]];
                if b != usize::MAX && b != a && !adjacency[a].contains(&b) {
                    adjacency[a].push(b);
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..regions.len()).collect();
    order.sort_by_key(|l| regions[*l].size);

    for label in order {
        let root = find_root(&mut parent, label);
        if root != label || sizes[root] as u64 >= min_pixels {
            continue;
        }

        let mut best: Option<usize> = None;
        for neighbour in adjacency[label].clone() {
            let n_root = find_root(&mut parent, neighbour);
            if n_root == root {
                continue;
            }
            if best.map(|b| sizes[n_root] > sizes[b]).unwrap_or(true) {
                best = Some(n_root);
            }
        }

        if let Some(target) = best {
            parent[root] = target;
            sizes[target] += sizes[root];
            let inherited = std::mem::take(&mut adjacency[root]);
            adjacency[target].extend(inherited);
        }
    }

    let mut sieved = image.clone();
    for i in 0..height {
        for j in 0..width {
            let label = labels[[i, j]];
            if label != usize::MAX {
                let root = find_root(&mut parent, label);
                sieved[[i, j]] = regions[root].value;
            }
        }
    }
    sieved
}
