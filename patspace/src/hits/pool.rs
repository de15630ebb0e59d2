//! cDNA 比对记录池
//!
//! 每条 cDNA 在每个 BAC 上的命中都是一条小记录，数量极大且生命周期很短
//! （只在该 cDNA / EST 对被处理期间存在）。记录存放在 `Vec` 槽位中，
//! 释放时归还空闲表以便复用；句柄带代数（generation），过期句柄或重复释放
//! 都会被发现而不是悄悄破坏别的记录。

/// 查询序列是否被反向互补
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn as_char(self) -> char {
        match self {
            Strand::Plus => '+',
            Strand::Minus => '-',
        }
    }
}

/// Which end of an EST pair a hit came from. Unpaired queries are
/// labelled `Five`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadDir {
    Five,
    Three,
}

impl ReadDir {
    pub fn as_char(self) -> char {
        match self {
            ReadDir::Five => '5',
            ReadDir::Three => '3',
        }
    }
}

/// 一条被接受的比对：某条查询在某个 BAC 的某个 contig 上
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentHit {
    pub bac_ix: usize,
    pub seq_ix: usize,
    /// 查询坐标 [start, end)，总是换算到查询正链
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    pub dir: ReadDir,
    /// 大致为 solid 区内匹配碱基的比例
    pub cooked_score: f64,
}

impl AlignmentHit {
    /// Build a hit from coordinates on the searched strand of a query of
    /// `query_size` bases. Minus-strand coordinates are flipped back onto
    /// the forward query.
    pub fn normalized(
        bac_ix: usize,
        seq_ix: usize,
        start: usize,
        end: usize,
        query_size: usize,
        strand: Strand,
        dir: ReadDir,
        cooked_score: f64,
    ) -> Self {
        let (start, end) = match strand {
            Strand::Plus => (start, end),
            Strand::Minus => (query_size - end, query_size - start),
        };
        Self {
            bac_ix,
            seq_ix,
            start,
            end,
            strand,
            dir,
            cooked_score,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HitHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    hit: Option<AlignmentHit>,
}

#[derive(Debug, Default)]
pub struct HitPool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    acquired: u64,
    released: u64,
}

impl HitPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&mut self, hit: AlignmentHit) -> HitHandle {
        self.acquired += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.hit = Some(hit);
            return HitHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            hit: Some(hit),
        });
        HitHandle {
            index,
            generation: 0,
        }
    }

    pub fn get(&self, h: HitHandle) -> Option<&AlignmentHit> {
        self.slots
            .get(h.index as usize)
            .filter(|s| s.generation == h.generation)
            .and_then(|s| s.hit.as_ref())
    }

    /// Return a record to the free list. Returns `false` for a stale handle
    /// (already released), leaving the pool untouched.
    pub fn release(&mut self, h: HitHandle) -> bool {
        let Some(slot) = self.slots.get_mut(h.index as usize) else {
            return false;
        };
        if slot.generation != h.generation || slot.hit.is_none() {
            return false;
        }
        slot.hit = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(h.index);
        self.released += 1;
        true
    }

    pub fn release_all(&mut self, handles: impl IntoIterator<Item = HitHandle>) {
        for h in handles {
            self.release(h);
        }
    }

    /// Records currently handed out.
    pub fn live(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Slots ever allocated; stays flat once the pool is warm.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn acquired_total(&self) -> u64 {
        self.acquired
    }

    pub fn released_total(&self) -> u64 {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(start: usize, end: usize) -> AlignmentHit {
        AlignmentHit::normalized(0, 0, start, end, 1000, Strand::Plus, ReadDir::Five, 0.9)
    }

    #[test]
    fn minus_strand_is_flipped_onto_forward_query() {
        let h = AlignmentHit::normalized(1, 2, 50, 480, 500, Strand::Minus, ReadDir::Five, 0.8);
        assert_eq!((h.start, h.end), (20, 450));
        let p = AlignmentHit::normalized(1, 2, 50, 480, 500, Strand::Plus, ReadDir::Five, 0.8);
        assert_eq!((p.start, p.end), (50, 480));
    }

    #[test]
    fn normalized_stays_in_bounds() {
        for (s, e) in [(0usize, 11usize), (3, 500), (489, 500)] {
            for strand in [Strand::Plus, Strand::Minus] {
                let h = AlignmentHit::normalized(0, 0, s, e, 500, strand, ReadDir::Three, 1.0);
                assert!(h.start < h.end && h.end <= 500);
                assert_eq!(h.len(), e - s);
            }
        }
    }

    #[test]
    fn released_slots_are_reused() {
        let mut pool = HitPool::new();
        let a = pool.acquire(hit(0, 10));
        let b = pool.acquire(hit(10, 20));
        assert_eq!(pool.live(), 2);
        assert!(pool.release(a));
        let c = pool.acquire(hit(20, 30));
        assert_eq!(pool.capacity(), 2);
        assert_eq!(pool.get(c).map(|h| h.start), Some(20));
        assert_eq!(pool.get(b).map(|h| h.start), Some(10));
    }

    #[test]
    fn stale_handle_is_rejected() {
        let mut pool = HitPool::new();
        let a = pool.acquire(hit(0, 10));
        assert!(pool.release(a));
        assert!(!pool.release(a));
        let b = pool.acquire(hit(5, 15));
        // same slot, new generation
        assert!(pool.get(a).is_none());
        assert!(pool.get(b).is_some());
        assert!(!pool.release(a));
        assert_eq!(pool.live(), 1);
        assert_eq!(pool.acquired_total(), 2);
        assert_eq!(pool.released_total(), 1);
    }
}
