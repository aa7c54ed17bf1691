//! Probabilistic skiplist keyed by ring score.
//!
//! Nodes live in an arena indexed by `usize`, with vacated indices recycled
//! through a free list, so the structure needs no unsafe pointer juggling.
//! The head pointer array grows to the tallest live level and shrinks from
//! the top as levels empty out.

use carousel_types::Score;
use rand::Rng;

/// One ring slot: a score and the vkeys anchored to it, insertion-ordered.
#[derive(Debug)]
struct SlotNode {
    score: Score,
    vkeys: Vec<String>,
    /// Forward pointers, one per level this node participates in.
    next: Vec<Option<usize>>,
}

/// Ordered slot store. Not synchronized; the owning backend wraps it.
#[derive(Debug, Default)]
pub(crate) struct Skiplist {
    /// Sentinel forward pointers, one per live level.
    head: Vec<Option<usize>>,
    arena: Vec<Option<SlotNode>>,
    free: Vec<usize>,
    len: usize,
}

impl Skiplist {
    /// Number of slots.
    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The vkey list at `score`, if a slot exists there.
    pub(crate) fn vkeys(&self, score: Score) -> Option<&[String]> {
        self.find(score).map(|idx| self.node(idx).vkeys.as_slice())
    }

    /// Append `vkey` to the slot at `score`, creating the slot if needed.
    /// A vkey already present in the slot is left alone.
    pub(crate) fn insert(&mut self, score: Score, vkey: &str) {
        if let Some(idx) = self.find(score) {
            let slot = self.arena[idx].as_mut().expect("dangling skiplist index");
            if !slot.vkeys.iter().any(|v| v == vkey) {
                slot.vkeys.push(vkey.to_string());
            }
            return;
        }

        let level = roll_level();
        if self.head.len() < level + 1 {
            self.head.resize(level + 1, None);
        }

        let node = SlotNode {
            score,
            vkeys: vec![vkey.to_string()],
            next: vec![None; level + 1],
        };
        let idx = match self.free.pop() {
            Some(slot) => {
                self.arena[slot] = Some(node);
                slot
            }
            None => {
                self.arena.push(Some(node));
                self.arena.len() - 1
            }
        };

        // Splice in at every level up to the rolled one, top-down.
        let mut pred: Option<usize> = None;
        for lvl in (0..self.head.len()).rev() {
            while let Some(succ) = self.next_at(pred, lvl) {
                if self.node(succ).score < score {
                    pred = Some(succ);
                } else {
                    break;
                }
            }
            if lvl <= level {
                let after = self.next_at(pred, lvl);
                self.set_next(pred, lvl, Some(idx));
                self.arena[idx].as_mut().expect("dangling skiplist index").next[lvl] = after;
            }
        }

        self.len += 1;
    }

    /// Remove `vkey` from the slot at `score`, unlinking the slot when its
    /// last vkey goes. Returns `false` if the slot or vkey is absent.
    pub(crate) fn remove(&mut self, score: Score, vkey: &str) -> bool {
        let Some(idx) = self.find(score) else {
            return false;
        };

        let slot = self.arena[idx].as_mut().expect("dangling skiplist index");
        let Some(pos) = slot.vkeys.iter().position(|v| v == vkey) else {
            return false;
        };

        if slot.vkeys.len() > 1 {
            slot.vkeys.remove(pos);
            return true;
        }

        // Last vkey: unlink the whole slot.
        let mut pred: Option<usize> = None;
        for lvl in (0..self.head.len()).rev() {
            while let Some(succ) = self.next_at(pred, lvl) {
                if self.node(succ).score < score {
                    pred = Some(succ);
                } else {
                    break;
                }
            }
            if self.next_at(pred, lvl) == Some(idx) {
                let after = self.node(idx).next[lvl];
                self.set_next(pred, lvl, after);
            }
        }

        self.arena[idx] = None;
        self.free.push(idx);
        self.len -= 1;

        // Drop levels that went vacant.
        while self.head.last().is_some_and(|top| top.is_none()) {
            self.head.pop();
        }

        true
    }

    /// Smallest slot score `>= score`, without wrap-around.
    pub(crate) fn ceiling(&self, score: Score) -> Option<Score> {
        let pred = self.pred_below(score);
        self.next_at(pred, 0).map(|idx| self.node(idx).score)
    }

    /// Largest slot score `<= score`, without wrap-around.
    pub(crate) fn floor(&self, score: Score) -> Option<Score> {
        let pred = self.pred_below(score);
        if let Some(succ) = self.next_at(pred, 0) {
            if self.node(succ).score == score {
                return Some(score);
            }
        }
        pred.map(|idx| self.node(idx).score)
    }

    /// Minimum slot score.
    pub(crate) fn first(&self) -> Option<Score> {
        self.next_at(None, 0).map(|idx| self.node(idx).score)
    }

    /// Maximum slot score.
    pub(crate) fn last(&self) -> Option<Score> {
        let mut pred: Option<usize> = None;
        for lvl in (0..self.head.len()).rev() {
            while let Some(succ) = self.next_at(pred, lvl) {
                pred = Some(succ);
            }
        }
        pred.map(|idx| self.node(idx).score)
    }

    /// Arena index of the slot at exactly `score`.
    fn find(&self, score: Score) -> Option<usize> {
        let pred = self.pred_below(score);
        let succ = self.next_at(pred, 0)?;
        (self.node(succ).score == score).then_some(succ)
    }

    /// Last node strictly below `score` (`None` means the head sentinel).
    fn pred_below(&self, score: Score) -> Option<usize> {
        let mut pred: Option<usize> = None;
        for lvl in (0..self.head.len()).rev() {
            while let Some(succ) = self.next_at(pred, lvl) {
                if self.node(succ).score < score {
                    pred = Some(succ);
                } else {
                    break;
                }
            }
        }
        pred
    }

    fn node(&self, idx: usize) -> &SlotNode {
        self.arena[idx].as_ref().expect("dangling skiplist index")
    }

    fn next_at(&self, pred: Option<usize>, lvl: usize) -> Option<usize> {
        match pred {
            None => self.head.get(lvl).copied().flatten(),
            Some(idx) => self.node(idx).next.get(lvl).copied().flatten(),
        }
    }

    fn set_next(&mut self, pred: Option<usize>, lvl: usize, to: Option<usize>) {
        match pred {
            None => self.head[lvl] = to,
            Some(idx) => {
                self.arena[idx].as_mut().expect("dangling skiplist index").next[lvl] = to;
            }
        }
    }
}

/// Geometric level draw: count leading wins of a fair coin.
fn roll_level() -> usize {
    let mut rng = rand::rng();
    let mut level = 0;
    while rng.random_bool(0.5) {
        level += 1;
    }
    level
}
