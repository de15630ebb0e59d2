pub const SIGMA: usize = 6; // {0:$, 1:A, 2:C, 3:G, 4:T, 5:N}

/// FM 文本中 N 的编码
pub const ALPHA_N: u8 = 5;

#[inline]
pub fn to_alphabet(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        b'A' => 1,
        b'C' => 2,
        b'G' => 3,
        b'T' | b'U' => 4,
        _ => ALPHA_N,
    }
}

/// Upper-case a base and fold anything that is not ACGT into N.
#[inline]
pub fn normalize_base(b: u8) -> u8 {
    match b.to_ascii_uppercase() {
        up @ (b'A' | b'C' | b'G' | b'T') => up,
        b'U' => b'T',
        _ => b'N',
    }
}

pub fn normalize_seq(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&b| normalize_base(b)).collect()
}

#[inline]
pub fn complement(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => b'T',
        b'C' => b'G',
        b'G' => b'C',
        b'T' | b'U' => b'A',
        _ => b'N',
    }
}

pub fn revcomp(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// 原地反向互补，避免为负链再分配一份查询序列
pub fn revcomp_in_place(seq: &mut [u8]) {
    seq.reverse();
    for b in seq.iter_mut() {
        *b = complement(*b);
    }
}

/// True for a run made of one base only (polyA and friends), which the
/// locator never uses as a seed.
pub fn is_homopolymer(tile: &[u8]) -> bool {
    match tile.first() {
        Some(&first) => tile.iter().all(|&b| b == first),
        None => false,
    }
}

/// Deterministic pseudo-random ACGT sequence (LCG), used by tests and
/// benchmarks.
pub fn pseudo_random_dna(len: usize, seed: u32) -> Vec<u8> {
    let bases = [b'A', b'C', b'G', b'T'];
    let mut x = seed;
    let mut seq = Vec::with_capacity(len);
    for _ in 0..len {
        x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        seq.push(bases[(x >> 16) as usize % 4]);
    }
    seq
}
