/// Skyline bin packer: bottom-left best fit over the upper envelope of
/// allocated columns. Coordinates exclude a one-pixel border on every side.

/// One horizontal segment of the skyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub x: usize,
    pub y: usize,
    pub width: usize,
}

/// A rectangle handed out by the packer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn right(&self) -> usize {
        self.x + self.width
    }

    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone)]
pub struct Skyline {
    nodes: Vec<Node>,
    width: usize,
    height: usize,
}

impl Skyline {
    /// Caller guarantees `width >= 3` and `height >= 3`.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            nodes: vec![Node { x: 1, y: 1, width: width - 2 }],
            width,
            height,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(Node { x: 1, y: 1, width: self.width - 2 });
    }

    /// Lowest y at which a `width x height` box starting at node `index` fits.
    fn fit(&self, index: usize, width: usize, height: usize) -> Option<usize> {
        let start = self.nodes[index];
        if start.x + width > self.width - 1 {
            return None;
        }
        let mut y = start.y;
        let mut left = width;
        let mut i = index;
        while left > 0 {
            let node = self.nodes.get(i)?;
            y = y.max(node.y);
            if y + height > self.height - 1 {
                return None;
            }
            left = left.saturating_sub(node.width);
            i += 1;
        }
        Some(y)
    }

    /// Reserve a region, or `None` when nothing fits. The skyline is left
    /// untouched on failure.
    pub fn allocate(&mut self, width: usize, height: usize) -> Option<Region> {
        // Empty regions occupy nothing.
        if width == 0 || height == 0 {
            return Some(Region { x: 1, y: 1, width, height });
        }

        let mut best: Option<(usize, usize, usize)> = None;
        let mut best_top = usize::MAX;
        let mut best_width = usize::MAX;
        for i in 0..self.nodes.len() {
            let Some(y) = self.fit(i, width, height) else {
                continue;
            };
            let node = self.nodes[i];
            let top = y + height;
            if top < best_top || (top == best_top && node.width > 0 && node.width < best_width) {
                best_top = top;
                best_width = node.width;
                best = Some((i, node.x, y));
            }
        }
        let (index, x, y) = best?;

        self.nodes.insert(index, Node { x, y: y + height, width });
        self.shrink_after(index);
        self.merge();
        log::trace!("skyline: placed {}x{} at ({}, {}), {} nodes", width, height, x, y, self.nodes.len());

        Some(Region { x, y, width, height })
    }

    /// Trim nodes shadowed by the node at `index`.
    fn shrink_after(&mut self, index: usize) {
        let mut i = index + 1;
        while i < self.nodes.len() {
            let prev = self.nodes[i - 1];
            let edge = prev.x + prev.width;
            let node = &mut self.nodes[i];
            if node.x >= edge {
                break;
            }
            let shrink = edge - node.x;
            if shrink >= node.width {
                self.nodes.remove(i);
                continue;
            }
            node.x += shrink;
            node.width -= shrink;
            break;
        }
    }

    fn merge(&mut self) {
        let mut i = 0;
        while i + 1 < self.nodes.len() {
            if self.nodes[i].y == self.nodes[i + 1].y {
                let next = self.nodes.remove(i + 1);
                self.nodes[i].width += next.width;
            } else {
                i += 1;
            }
        }
    }

    /// Extend the packing area. New horizontal room becomes a fresh node at
    /// the top border.
    pub fn grow(&mut self, width: usize, height: usize) {
        if width > self.width {
            self.nodes.push(Node { x: self.width - 1, y: 1, width: width - self.width });
            self.merge();
        }
        self.width = width;
        self.height = height;
    }
}
