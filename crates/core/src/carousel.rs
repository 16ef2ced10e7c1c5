//! Banner carousel position.

/// Index into a fixed number of slides. Movement wraps in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    /// A carousel at `index`, wrapped into range.
    #[must_use]
    pub const fn new(len: usize, index: usize) -> Self {
        let mut carousel = Self { len, index: 0 };
        carousel.go_to(index);
        carousel
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Auto-advance and the arrows only make sense with two or more slides.
    #[must_use]
    pub const fn can_cycle(&self) -> bool {
        self.len > 1
    }

    pub const fn advance(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    pub const fn previous(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }

    pub const fn go_to(&mut self, index: usize) {
        self.index = if self.len == 0 { 0 } else { index % self.len };
    }

    /// Index the "next" control points at.
    #[must_use]
    pub const fn next_index(&self) -> usize {
        let mut next = *self;
        next.advance();
        next.index
    }

    /// Index the "previous" control points at.
    #[must_use]
    pub const fn previous_index(&self) -> usize {
        let mut prev = *self;
        prev.previous();
        prev.index
    }
}
