use crate::{Bounds, Size};

const CELL_SIZE: u32 = 16;

#[derive(Clone, Debug, Default)]
struct Cell {
    rects: Vec<(Bounds, u32)>,
    max_group: u32,
}

/// Assigns draws to groups such that overlapping draws land in increasing groups.
///
/// The render target is divided into square cells, each remembering the rectangles that touch it.
/// A rectangle that covers a whole cell replaces the cell's list.
#[derive(Clone, Debug, Default)]
pub struct IntersectionBoard {
    size: Size,
    cols: u32,
    rows: u32,
    cells: Vec<Cell>,
}

impl IntersectionBoard {
    pub fn new(size: Size) -> Self {
        let mut board = Self::default();
        board.reset(size);
        board
    }

    /// Forget every rectangle and resize the board.
    pub fn reset(&mut self, size: Size) {
        self.size = size;
        self.cols = size.width.div_ceil(CELL_SIZE);
        self.rows = size.height.div_ceil(CELL_SIZE);

        let count = (self.cols * self.rows) as usize;
        self.cells.truncate(count);
        for cell in self.cells.iter_mut() {
            cell.rects.clear();
            cell.max_group = 0;
        }
        self.cells.resize_with(count, Cell::default);
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Add a rectangle and return its group: one more than the largest group of any rectangle it
    /// intersects, and at least `min_group` (and 1).
    pub fn add_rectangle(&mut self, bounds: Bounds, min_group: u32) -> u32 {
        let bounds = bounds.intersect(self.size.bounds());
        let mut group = min_group.max(1);
        if bounds.is_empty() {
            return group;
        }

        let cx0 = bounds.left / CELL_SIZE;
        let cy0 = bounds.top / CELL_SIZE;
        let cx1 = (bounds.right - 1) / CELL_SIZE;
        let cy1 = (bounds.bottom - 1) / CELL_SIZE;

        for cy in cy0..=cy1 {
            for cx in cx0..=cx1 {
                let cell = &self.cells[(cy * self.cols + cx) as usize];
                if bounds.contains(self.cell_bounds(cx, cy)) {
                    if cell.max_group > 0 {
                        group = group.max(cell.max_group + 1);
                    }
                } else if cell.max_group >= group {
                    for (rect, rect_group) in cell.rects.iter() {
                        if *rect_group >= group && rect.intersects(bounds) {
                            group = rect_group + 1;
                        }
                    }
                }
            }
        }

        for cy in cy0..=cy1 {
            for cx in cx0..=cx1 {
                let covers = bounds.contains(self.cell_bounds(cx, cy));
                let cell = &mut self.cells[(cy * self.cols + cx) as usize];
                if covers {
                    cell.rects.clear();
                }

                cell.rects.push((bounds, group));
                cell.max_group = cell.max_group.max(group);
            }
        }

        group
    }

    fn cell_bounds(&self, cx: u32, cy: u32) -> Bounds {
        Bounds {
            left: cx * CELL_SIZE,
            top: cy * CELL_SIZE,
            right: ((cx + 1) * CELL_SIZE).min(self.size.width),
            bottom: ((cy + 1) * CELL_SIZE).min(self.size.height),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_disjoint_rects_share_a_group() {
        let mut board = IntersectionBoard::new(Size::from([100, 100]));
        assert_eq!(board.add_rectangle(Bounds::from([0, 0, 10, 10]), 0), 1);
        assert_eq!(board.add_rectangle(Bounds::from([10, 0, 20, 10]), 0), 1);
        assert_eq!(board.add_rectangle(Bounds::from([50, 50, 60, 60]), 0), 1);
    }

    #[test]
    fn test_overlapping_rects_stack() {
        let mut board = IntersectionBoard::new(Size::from([100, 100]));
        assert_eq!(board.add_rectangle(Bounds::from([0, 0, 10, 10]), 0), 1);
        assert_eq!(board.add_rectangle(Bounds::from([5, 5, 15, 15]), 0), 2);
        assert_eq!(board.add_rectangle(Bounds::from([12, 12, 20, 20]), 0), 3);
        assert_eq!(board.add_rectangle(Bounds::from([0, 0, 4, 4]), 0), 2);
    }

    #[test]
    fn test_min_group() {
        let mut board = IntersectionBoard::new(Size::from([100, 100]));
        assert_eq!(board.add_rectangle(Bounds::from([0, 0, 10, 10]), 4), 4);
        assert_eq!(board.add_rectangle(Bounds::from([50, 50, 60, 60]), 2), 2);
        assert_eq!(board.add_rectangle(Bounds::from([200, 200, 300, 300]), 3), 3);
    }

    #[test]
    fn test_covering_rect_replaces_cell() {
        let mut board = IntersectionBoard::new(Size::from([64, 64]));
        for i in 0..10 {
            board.add_rectangle(Bounds::from([i, i, i + 2, i + 2]), 0);
        }

        let full = board.add_rectangle(Bounds::from([0, 0, 64, 64]), 0);
        assert!(board.cells.iter().all(|c| c.rects.len() == 1));
        assert_eq!(board.add_rectangle(Bounds::from([1, 1, 2, 2]), 0), full + 1);
        assert_eq!(board.add_rectangle(Bounds::from([40, 40, 41, 41]), 0), full + 1);
    }

    #[test]
    fn test_reset() {
        let mut board = IntersectionBoard::new(Size::from([32, 32]));
        board.add_rectangle(Bounds::from([0, 0, 32, 32]), 0);
        board.reset(Size::from([48, 16]));
        assert_eq!(board.add_rectangle(Bounds::from([0, 0, 48, 16]), 0), 1);
    }
}
