//! Skyline bin-packing
//!
//! Maintains a "skyline": a left-to-right staircase of horizontal segments
//! marking the lowest free row above every column. New cells go at the lowest
//! position where they fit, leftmost on ties, so pages fill left-to-right,
//! top-to-bottom. Space is never reclaimed.

/// A horizontal segment at a given height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SkylineNode {
    x: u32,
    y: u32,
    width: u32,
}

/// Skyline rectangle allocator for one atlas page
#[derive(Debug, Clone)]
pub struct SkylinePacker {
    width: u32,
    height: u32,
    skyline: Vec<SkylineNode>,
}

impl SkylinePacker {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            skyline: vec![SkylineNode { x: 0, y: 0, width }],
        }
    }

    /// Place a `w`x`h` cell, returning its top-left corner
    pub fn pack(&mut self, w: u32, h: u32) -> Option<(u32, u32)> {
        if w == 0 || h == 0 || w > self.width || h > self.height {
            return None;
        }

        let mut best: Option<(usize, u32, u64)> = None;
        for i in 0..self.skyline.len() {
            if let Some((y, waste)) = self.fit(i, w, h) {
                let better = match best {
                    None => true,
                    Some((_, by, bw)) => y < by || (y == by && waste < bw),
                };
                if better {
                    best = Some((i, y, waste));
                }
            }
        }

        let (idx, y, _) = best?;
        let x = self.skyline[idx].x;
        let right = x + w;

        // Drop or shorten the segments now covered by the cell
        while idx < self.skyline.len() {
            let node = self.skyline[idx];
            if node.x >= right {
                break;
            }
            let node_right = node.x + node.width;
            if node_right > right {
                self.skyline[idx] = SkylineNode {
                    x: right,
                    y: node.y,
                    width: node_right - right,
                };
                break;
            }
            self.skyline.remove(idx);
        }

        self.skyline.insert(
            idx,
            SkylineNode {
                x,
                y: y + h,
                width: w,
            },
        );
        self.merge();

        Some((x, y))
    }

    /// Lowest y for a cell starting at segment `idx`, and the area it wastes
    fn fit(&self, idx: usize, w: u32, h: u32) -> Option<(u32, u64)> {
        let x = self.skyline[idx].x;
        if x + w > self.width {
            return None;
        }

        let mut y = 0u32;
        let mut waste = 0u64;
        let mut remaining = w;
        let mut i = idx;

        while remaining > 0 {
            let node = self.skyline.get(i)?;
            let span = remaining.min(node.width);
            if node.y > y {
                // Raising the cell wastes the area under it so far
                waste += (node.y - y) as u64 * (w - remaining) as u64;
                y = node.y;
            } else {
                waste += (y - node.y) as u64 * span as u64;
            }
            if y + h > self.height {
                return None;
            }
            remaining -= span;
            i += 1;
        }

        Some((y, waste))
    }

    /// Merge adjacent segments at the same height
    fn merge(&mut self) {
        let mut i = 0;
        while i + 1 < self.skyline.len() {
            if self.skyline[i].y == self.skyline[i + 1].y {
                self.skyline[i].width += self.skyline[i + 1].width;
                self.skyline.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_left_to_right_then_down() {
        let mut p = SkylinePacker::new(100, 100);
        assert_eq!(p.pack(40, 10), Some((0, 0)));
        assert_eq!(p.pack(40, 10), Some((40, 0)));
        // Third cell no longer fits on the first row
        assert_eq!(p.pack(40, 10), Some((0, 10)));
    }

    #[test]
    fn test_rejects_oversized_and_empty() {
        let mut p = SkylinePacker::new(64, 64);
        assert_eq!(p.pack(65, 1), None);
        assert_eq!(p.pack(1, 65), None);
        assert_eq!(p.pack(0, 10), None);
        assert_eq!(p.pack(64, 64), Some((0, 0)));
        assert_eq!(p.pack(1, 1), None);
    }

    #[test]
    fn test_prefers_lowest_gap() {
        let mut p = SkylinePacker::new(100, 100);
        p.pack(50, 30).unwrap();
        p.pack(50, 10).unwrap();
        // Lands on the shorter column
        assert_eq!(p.pack(50, 10), Some((50, 10)));
    }
}
