//! K-mer dot plot alignment of a read against one candidate haplotype sequence
//!
//! The read is cut into fixed-size counting windows. Each window is matched to the haplotype by
//! the densest band of k-mer hit diagonals. Runs of consistently matching windows form stretches,
//! and the best-scoring chain of stretches through the dot plot is the read path. Jumps between
//! consecutive path stretches expose insertions and deletions of the read relative to the
//! haplotype.
//!

use std::collections::HashMap;

use crate::parameters::ConfirmParameters;

/// Haplotype k-mers occurring more often than this are ignored as repeats
const MAX_KMER_OCCURRENCES: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq)]
struct WindowMatch {
    window: usize,

    /// Haplotype position minus read position of the window's k-mer hits
    diagonal: i64,
}

/// A run of matching read windows on a consistent dot plot diagonal
#[derive(Clone, Debug, PartialEq)]
pub struct Stretch {
    pub first_window: usize,
    pub last_window: usize,
    pub matched_windows: usize,
    pub read_start: usize,
    pub read_end: usize,
    pub hap_start: i64,
    pub hap_end: i64,
}

/// The transition between two consecutive stretches of a path
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathJump {
    /// Haplotype position at the end of the stretch before the jump
    pub hap_pos: i64,

    pub read_gap: i64,
    pub hap_gap: i64,
}

impl PathJump {
    /// Positive for inserted read sequence, negative for deleted haplotype sequence
    pub fn indel_size(&self) -> i64 {
        self.read_gap - self.hap_gap
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DotPlotPath {
    pub score: f64,
    pub matched_windows: usize,
    pub window_count: usize,
    pub jumps: Vec<PathJump>,
}

impl DotPlotPath {
    /// Fraction of read windows explained by the path
    pub fn coverage(&self) -> f64 {
        if self.window_count == 0 {
            0.0
        } else {
            self.matched_windows as f64 / self.window_count as f64
        }
    }
}

fn is_unambiguous_kmer(kmer: &[u8]) -> bool {
    kmer.iter()
        .all(|x| matches!(x, b'A' | b'C' | b'G' | b'T'))
}

/// Index all haplotype k-mers without ambiguous bases by their positions
fn build_kmer_index(hap: &[u8], k: usize) -> HashMap<&[u8], Vec<usize>> {
    let mut index: HashMap<&[u8], Vec<usize>> = HashMap::new();
    if hap.len() < k {
        return index;
    }
    for (pos, kmer) in hap.windows(k).enumerate() {
        if is_unambiguous_kmer(kmer) {
            index.entry(kmer).or_default().push(pos);
        }
    }
    index
}

/// Find the band of width `band` containing the most diagonals
///
/// Returns the hit count of the band and its median diagonal.
///
fn get_densest_band(diagonals: &mut [i64], band: i64) -> Option<(usize, i64)> {
    diagonals.sort_unstable();
    let mut best: Option<(usize, i64)> = None;
    let mut left = 0;
    for right in 0..diagonals.len() {
        while diagonals[right] - diagonals[left] > band {
            left += 1;
        }
        let count = right + 1 - left;
        if best.is_none_or(|(best_count, _)| count > best_count) {
            best = Some((count, diagonals[(left + right) / 2]));
        }
    }
    best
}

fn get_window_count(read_len: usize, params: &ConfirmParameters) -> usize {
    read_len.div_ceil(params.count_win_size)
}

fn get_window_matches(
    read: &[u8],
    index: &HashMap<&[u8], Vec<usize>>,
    params: &ConfirmParameters,
) -> Vec<WindowMatch> {
    let win = params.count_win_size;
    let k = params.count_k;
    let band = params.band_width();

    let mut matches = Vec::new();
    let mut diagonals = Vec::new();
    for window in 0..get_window_count(read.len(), params) {
        let start = window * win;
        let end = std::cmp::min(start + win, read.len());
        if end < start + k {
            continue;
        }

        diagonals.clear();
        for read_pos in start..=(end - k) {
            if let Some(positions) = index.get(&read[read_pos..read_pos + k]) {
                if positions.len() <= MAX_KMER_OCCURRENCES {
                    diagonals.extend(positions.iter().map(|&x| x as i64 - read_pos as i64));
                }
            }
        }

        if let Some((count, diagonal)) = get_densest_band(&mut diagonals, band) {
            if count >= params.stretch_threshold {
                matches.push(WindowMatch { window, diagonal });
            }
        }
    }
    matches
}

struct StretchBuilder {
    first: WindowMatch,
    last: WindowMatch,
    matched_windows: usize,
}

/// Group window matches into stretches
///
/// A window extends the stretch whose last matching window is at most `stretch_tolerance`
/// non-matching windows before it, with a diagonal inside the band. Stretches with fewer than
/// `stretch_min_length` matching windows are dropped.
///
fn get_stretches(
    matches: &[WindowMatch],
    read_len: usize,
    params: &ConfirmParameters,
) -> Vec<Stretch> {
    let band = params.band_width();
    let mut builders: Vec<StretchBuilder> = Vec::new();
    for m in matches.iter() {
        let extended = builders
            .iter_mut()
            .filter(|b| {
                m.window - b.last.window <= params.stretch_tolerance + 1
                    && (m.diagonal - b.last.diagonal).abs() <= band
            })
            .min_by_key(|b| (m.diagonal - b.last.diagonal).abs());
        match extended {
            Some(b) => {
                b.last = *m;
                b.matched_windows += 1;
            }
            None => builders.push(StretchBuilder {
                first: *m,
                last: *m,
                matched_windows: 1,
            }),
        }
    }

    let win = params.count_win_size;
    builders
        .into_iter()
        .filter(|b| b.matched_windows >= params.stretch_min_length)
        .map(|b| {
            let read_start = b.first.window * win;
            let read_end = std::cmp::min((b.last.window + 1) * win, read_len);
            Stretch {
                first_window: b.first.window,
                last_window: b.last.window,
                matched_windows: b.matched_windows,
                read_start,
                read_end,
                hap_start: read_start as i64 + b.first.diagonal,
                hap_end: read_end as i64 + b.last.diagonal,
            }
        })
        .collect()
}

/// Cost of a path jump changing the dot plot diagonal by `distance`
pub fn get_gap_cost(distance: f64, params: &ConfirmParameters) -> f64 {
    params.path_constant_gap_cost
        + params.path_linear_gap_cost * distance
        + params.path_convex_gap_cost * distance * distance
        + params.path_root_gap_cost * distance.sqrt()
}

fn get_transition_score(prev: &Stretch, next: &Stretch, params: &ConfirmParameters) -> f64 {
    let read_gap = next.read_start as i64 - prev.read_end as i64;
    let hap_gap = next.hap_start - prev.hap_end;
    let distance = (read_gap - hap_gap).abs() as f64;
    let unexplained_windows = next.first_window.saturating_sub(prev.last_window + 1);

    let mut score = unexplained_windows as f64 * params.align_costs_mismatch as f64;
    if distance > 0.0 {
        score += params.align_costs_gap as f64 - get_gap_cost(distance, params);
    }
    score
}

/// True if `next` may follow `prev` in a path, allowing up to `path_tolerance` windows of overlap
fn is_valid_transition(prev: &Stretch, next: &Stretch, params: &ConfirmParameters) -> bool {
    let overlap_limit = (params.path_tolerance * params.count_win_size) as i64;
    next.first_window > prev.first_window
        && next.last_window > prev.last_window
        && next.first_window + params.path_tolerance > prev.last_window
        && next.hap_start >= prev.hap_end - overlap_limit
}

/// Chain stretches into the highest scoring path
///
fn find_best_path(
    mut stretches: Vec<Stretch>,
    window_count: usize,
    params: &ConfirmParameters,
) -> DotPlotPath {
    if stretches.is_empty() {
        return DotPlotPath {
            window_count,
            ..Default::default()
        };
    }
    stretches.sort_by_key(|x| (x.first_window, x.hap_start));

    let match_score = params.align_costs_match as f64;
    let stretch_count = stretches.len();
    let mut best_score = vec![0.0; stretch_count];
    let mut prev_index: Vec<Option<usize>> = vec![None; stretch_count];
    for next in 0..stretch_count {
        let s = &stretches[next];
        best_score[next] = (s.read_end - s.read_start) as f64 * match_score;
        for prev in 0..next {
            let p = &stretches[prev];
            if !is_valid_transition(p, s, params) {
                continue;
            }
            let overlap = p.read_end.saturating_sub(s.read_start);
            let segment_score = (s.read_end - s.read_start - overlap) as f64 * match_score;
            let score = best_score[prev] + segment_score + get_transition_score(p, s, params);
            if score > best_score[next] {
                best_score[next] = score;
                prev_index[next] = Some(prev);
            }
        }
    }

    let mut last = 0;
    for i in 1..stretch_count {
        if best_score[i] > best_score[last] {
            last = i;
        }
    }

    let mut path_stretches = vec![last];
    let mut current = last;
    while let Some(prev) = prev_index[current] {
        path_stretches.push(prev);
        current = prev;
    }
    path_stretches.reverse();

    let matched_windows = path_stretches
        .iter()
        .map(|&x| stretches[x].matched_windows)
        .sum::<usize>();
    let jumps = path_stretches
        .windows(2)
        .map(|x| {
            let (p, s) = (&stretches[x[0]], &stretches[x[1]]);
            PathJump {
                hap_pos: p.hap_end,
                read_gap: s.read_start as i64 - p.read_end as i64,
                hap_gap: s.hap_start - p.hap_end,
            }
        })
        .collect();

    DotPlotPath {
        score: best_score[last],
        matched_windows: std::cmp::min(matched_windows, window_count),
        window_count,
        jumps,
    }
}

/// Find the best dot plot path of `read` through `hap`
///
/// Both sequences are expected in upper case, with the read in haplotype orientation.
///
pub fn get_read_path(read: &[u8], hap: &[u8], params: &ConfirmParameters) -> DotPlotPath {
    let index = build_kmer_index(hap, params.count_k);
    let matches = get_window_matches(read, &index, params);
    let stretches = get_stretches(&matches, read.len(), params);
    find_best_path(stretches, get_window_count(read.len(), params), params)
}


#[cfg(test)]
mod tests {
    use super::test_utils::get_random_test_seq;
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_get_densest_band() {
        let mut diagonals = vec![10, -400, 12, 11, 300, 9, 13];
        assert_eq!(get_densest_band(&mut diagonals, 5), Some((5, 11)));
        assert_eq!(get_densest_band(&mut [], 5), None);
    }

    #[test]
    fn test_gap_cost() {
        let params = ConfirmParameters::default();
        assert_abs_diff_eq!(get_gap_cost(100.0, &params), 11.0);
    }

    #[test]
    fn test_identical_read_path() {
        let params = ConfirmParameters::default();
        let hap = get_random_test_seq(3000, 1);

        let path = get_read_path(&hap, &hap, &params);
        assert_eq!(path.window_count, 30);
        assert_eq!(path.matched_windows, 30);
        assert!(path.jumps.is_empty());
        assert_abs_diff_eq!(path.score, 9000.0);
        assert_abs_diff_eq!(path.coverage(), 1.0);
    }

    #[test]
    fn test_deletion_read_path() {
        let params = ConfirmParameters::default();
        let hap = get_random_test_seq(3000, 2);
        let read = [&hap[..1000], &hap[1500..]].concat();

        let path = get_read_path(&read, &hap, &params);
        assert_eq!(path.jumps.len(), 1);
        let jump = path.jumps[0];
        assert_eq!(jump.hap_pos, 1000);
        assert_eq!(jump.indel_size(), -500);

        let expected_score = 2500.0 * 3.0 - 12.0 - get_gap_cost(500.0, &params);
        assert_abs_diff_eq!(path.score, expected_score, epsilon = 1e-9);

        // The read matches its own haplotype better than the reference haplotype:
        let alt_path = get_read_path(&read, &read, &params);
        assert!(alt_path.score > path.score);
    }

    #[test]
    fn test_insertion_read_path() {
        let params = ConfirmParameters::default();
        let hap = get_random_test_seq(3000, 3);
        let inserted = get_random_test_seq(300, 4);
        let read = [&hap[..1000], &inserted[..], &hap[1000..]].concat();

        let path = get_read_path(&read, &hap, &params);
        assert_eq!(path.jumps.len(), 1);
        assert_eq!(path.jumps[0].hap_pos, 1000);
        assert_eq!(path.jumps[0].indel_size(), 300);
        assert_eq!(path.window_count, 33);
        assert_eq!(path.matched_windows, 30);
    }

    #[test]
    fn test_inverted_read_path() {
        let params = ConfirmParameters::default();
        let hap = get_random_test_seq(3000, 5);
        let inverted = bio::alphabets::dna::revcomp(&hap[1000..2000]);
        let read = [&hap[..1000], &inverted[..], &hap[2000..]].concat();

        // The inverted segment can't be explained on the reference haplotype:
        let ref_path = get_read_path(&read, &hap, &params);
        assert_eq!(ref_path.matched_windows, 20);
        assert_abs_diff_eq!(ref_path.score, 6000.0 - 10.0 * 12.0, epsilon = 1e-9);

        let alt_path = get_read_path(&read, &read, &params);
        assert!(alt_path.score > ref_path.score);
    }

    #[test]
    fn test_unrelated_read_path() {
        let params = ConfirmParameters::default();
        let hap = get_random_test_seq(2000, 6);
        let read = get_random_test_seq(2000, 7);

        let path = get_read_path(&read, &hap, &params);
        assert_eq!(path.matched_windows, 0);
        assert_eq!(path.score, 0.0);
    }
}
