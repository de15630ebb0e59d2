/// 构建后缀数组（前缀倍增，按 (rank[i], rank[i+k]) 排序）。
/// 输入为数值化文本（0:$,1:A,2:C,3:G,4:T,5:N），每条 target 之后用 0 分隔。
/// 多个 0 之间按位置先后比较，保证结果与朴素排序一致。
pub fn build_sa(text: &[u8]) -> Vec<u32> {
    let n = text.len();
    if n == 0 {
        return Vec::new();
    }
    let mut sa: Vec<u32> = (0..n as u32).collect();
    let mut rank: Vec<u32> = text.iter().map(|&b| b as u32).collect();
    let mut next_rank = vec![0u32; n];

    let second = |rank: &[u32], i: usize, k: usize| -> i64 {
        if i + k < n {
            rank[i + k] as i64
        } else {
            -1
        }
    };

    let mut k = 1usize;
    loop {
        sa.sort_unstable_by_key(|&i| {
            let i = i as usize;
            (rank[i], second(&rank, i, k))
        });

        next_rank[sa[0] as usize] = 0;
        for w in 1..n {
            let a = sa[w - 1] as usize;
            let b = sa[w] as usize;
            let same = rank[a] == rank[b] && second(&rank, a, k) == second(&rank, b, k);
            next_rank[b] = next_rank[a] + u32::from(!same);
        }
        std::mem::swap(&mut rank, &mut next_rank);

        if rank[sa[n - 1] as usize] as usize == n - 1 || k >= n {
            break;
        }
        k <<= 1;
    }
    sa
}
