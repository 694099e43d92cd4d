//! Which column/task is selected and which window of columns is visible.
//! Pure arithmetic; callers pass in the lengths they know about.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Selected column index
    pub column: usize,
    /// Selected task index inside the selected column
    pub task: usize,
    /// First visible column
    pub offset: usize,
    /// Number of visible columns, always >= 1
    pub size: usize,
}

impl Default for Selection {
    fn default() -> Self {
        Selection {
            column: 0,
            task: 0,
            offset: 0,
            size: 1,
        }
    }
}

/// How many columns of `column_width` cells fit in `width`
pub fn viewport_size(width: u16, column_width: u16) -> usize {
    (width / column_width.max(1)).max(1) as usize
}

impl Selection {
    pub fn visible(&self, columns_len: usize) -> Range<usize> {
        let start = self.offset.min(columns_len);
        start..(self.offset + self.size).min(columns_len)
    }

    pub fn in_viewport(&self) -> bool {
        self.column >= self.offset && self.column < self.offset + self.size
    }

    /// Terminal resized: recompute the window and keep the selection in it.
    pub fn resize(&mut self, width: u16, column_width: u16, columns_len: usize) {
        self.size = viewport_size(width, column_width);
        self.pull_offset(columns_len);
        self.reveal();
    }

    pub fn move_left(&mut self) -> bool {
        if self.column == 0 {
            return false;
        }
        self.column -= 1;
        self.task = 0;
        if self.column < self.offset {
            self.offset = self.column;
        }
        true
    }

    pub fn move_right(&mut self, columns_len: usize) -> bool {
        if self.column + 1 >= columns_len {
            return false;
        }
        self.column += 1;
        self.task = 0;
        if self.column >= self.offset + self.size {
            self.offset = self.column + 1 - self.size;
        }
        true
    }

    pub fn move_up(&mut self) -> bool {
        if self.task == 0 {
            return false;
        }
        self.task -= 1;
        true
    }

    pub fn move_down(&mut self, tasks_len: usize) -> bool {
        if self.task + 1 >= tasks_len {
            return false;
        }
        self.task += 1;
        true
    }

    /// Shift the window one column left, snapping the selection to the
    /// nearest visible edge when it falls out.
    pub fn scroll_left(&mut self) -> bool {
        if self.offset == 0 {
            return false;
        }
        self.offset -= 1;
        self.snap();
        true
    }

    pub fn scroll_right(&mut self, columns_len: usize) -> bool {
        if self.offset + self.size >= columns_len {
            return false;
        }
        self.offset += 1;
        self.snap();
        true
    }

    /// Jump straight to `column`, bringing it into view.
    pub fn select_column(&mut self, column: usize, columns_len: usize) {
        self.column = column.min(columns_len.saturating_sub(1));
        self.task = 0;
        self.reveal();
    }

    /// A column was added or removed: clamp the column (the last one moves
    /// back by one), reset the task, and pull the window left so it does not
    /// show empty slots.
    pub fn after_structural_change(&mut self, columns_len: usize) {
        if self.column >= columns_len {
            self.column = columns_len.saturating_sub(1);
        }
        self.task = 0;
        self.pull_offset(columns_len);
        self.reveal();
    }

    /// Keep the task index valid after the column's contents changed.
    pub fn clamp_task(&mut self, tasks_len: usize) {
        if self.task >= tasks_len {
            self.task = tasks_len.saturating_sub(1);
        }
    }

    /// Clamp everything after a wholesale reload.
    pub fn clamp(&mut self, columns_len: usize, tasks_len: usize) {
        if self.column >= columns_len {
            self.column = columns_len.saturating_sub(1);
        }
        self.clamp_task(tasks_len);
        self.pull_offset(columns_len);
        self.reveal();
    }

    fn pull_offset(&mut self, columns_len: usize) {
        if self.offset + self.size > columns_len {
            self.offset = columns_len.saturating_sub(self.size);
        }
    }

    fn reveal(&mut self) {
        if self.column < self.offset {
            self.offset = self.column;
        } else if self.column >= self.offset + self.size {
            self.offset = self.column + 1 - self.size;
        }
    }

    fn snap(&mut self) {
        if self.column < self.offset {
            self.column = self.offset;
            self.task = 0;
        } else if self.column >= self.offset + self.size {
            self.column = self.offset + self.size - 1;
            self.task = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sel(column: usize, offset: usize, size: usize) -> Selection {
        Selection {
            column,
            task: 0,
            offset,
            size,
        }
    }

    #[test]
    fn viewport_size_is_never_zero() {
        assert_eq!(viewport_size(100, 32), 3);
        assert_eq!(viewport_size(10, 32), 1);
        assert_eq!(viewport_size(0, 32), 1);
        assert_eq!(viewport_size(80, 0), 80);
    }

    #[test]
    fn move_right_past_viewport_makes_column_last_visible() {
        let mut s = sel(2, 0, 3);
        s.task = 4;
        assert!(s.move_right(6));
        assert_eq!(s, sel(3, 1, 3));
    }

    #[test]
    fn move_left_past_viewport_makes_column_first_visible() {
        let mut s = sel(2, 2, 3);
        assert!(s.move_left());
        assert_eq!(s, sel(1, 1, 3));
    }

    #[test]
    fn column_moves_clamp_at_edges() {
        let mut s = sel(0, 0, 3);
        assert!(!s.move_left());
        let mut s = sel(4, 2, 3);
        assert!(!s.move_right(5));
        assert_eq!(s.column, 4);
        let mut empty = Selection::default();
        assert!(!empty.move_right(0));
    }

    #[test]
    fn task_moves_stay_in_range() {
        let mut s = Selection::default();
        assert!(!s.move_up());
        assert!(s.move_down(3));
        assert!(s.move_down(3));
        assert!(!s.move_down(3));
        assert_eq!(s.task, 2);
    }

    #[test]
    fn scroll_snaps_selection_to_visible_edge() {
        let mut s = sel(0, 0, 2);
        s.task = 3;
        assert!(s.scroll_right(5));
        assert_eq!((s.column, s.task, s.offset), (1, 0, 1));

        let mut s = sel(3, 2, 2);
        assert!(s.scroll_left());
        assert_eq!((s.column, s.offset), (2, 1));
    }

    #[test]
    fn scroll_stops_at_bounds() {
        let mut s = sel(0, 0, 3);
        assert!(!s.scroll_left());
        assert!(!s.scroll_right(3));
        assert!(s.scroll_right(4));
        assert!(!s.scroll_right(4));
    }

    #[test]
    fn deleting_last_column_steps_back() {
        let mut s = sel(4, 2, 3);
        s.task = 2;
        s.after_structural_change(4);
        assert_eq!(s, sel(3, 1, 3));
    }

    #[test]
    fn structural_change_to_empty_board() {
        let mut s = sel(0, 0, 3);
        s.after_structural_change(0);
        assert_eq!(s, sel(0, 0, 3));
    }

    #[test]
    fn resize_keeps_selection_visible() {
        let mut s = sel(5, 3, 3);
        s.resize(64, 32, 6);
        assert_eq!(s.size, 2);
        assert!(s.in_viewport());
        s.resize(320, 32, 6);
        assert_eq!((s.size, s.offset), (10, 0));
    }

    #[test]
    fn invariants_hold_under_random_walk() {
        let columns = 7;
        let tasks = [3usize, 0, 5, 1, 0, 2, 4];
        let mut s = sel(0, 0, 3);
        // Deterministic pseudo-random walk
        let mut seed: u32 = 17;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            match (seed >> 16) % 6 {
                0 => {
                    s.move_left();
                }
                1 => {
                    s.move_right(columns);
                }
                2 => {
                    s.move_up();
                }
                3 => {
                    s.move_down(tasks[s.column]);
                }
                4 => {
                    s.scroll_left();
                }
                _ => {
                    s.scroll_right(columns);
                }
            }
            assert!(s.column < columns);
            assert!(s.task < tasks[s.column].max(1));
            assert!(s.in_viewport(), "{s:?}");
        }
    }
}
