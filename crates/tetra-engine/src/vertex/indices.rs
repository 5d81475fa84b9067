//! Index patterns for the line and dot families.

/// Vertices emitted per line segment.
pub const LINE_VERTICES: u32 = 6;

/// Two join wedges around the quad body of one segment.
pub const LINE_INDICES: [u32; 12] = [0, 2, 1, 1, 2, 4, 1, 4, 3, 3, 4, 5];

/// Smallest fan that still closes a polygon (center + triangle + repeat).
pub const MIN_DOT_VERTICES: u32 = 5;

const FAN_START_CAPACITY: u32 = 8;

/// `LINE_INDICES` repeated for `segments` segments, offset by six each.
pub fn line_indices(segments: u32) -> Vec<u32> {
    (0..segments)
        .flat_map(|s| LINE_INDICES.map(|i| i + s * LINE_VERTICES))
        .collect()
}

/// Fan triangulation `(0, i, i + 1)` for `i in 1..n-1`.
pub fn fan_indices(vertex_count: u32) -> Vec<u16> {
    let n = vertex_count.clamp(3, u16::MAX as u32) as u16;
    (1..n - 1).flat_map(|i| [0, i, i + 1]).collect()
}

#[inline]
pub const fn fan_index_count(vertex_count: u32) -> u32 {
    if vertex_count < 3 {
        0
    } else {
        3 * (vertex_count - 2)
    }
}

/// CPU copy of the dot fan index buffer.
///
/// Grows to the largest vertex count requested so far; smaller fans are a
/// prefix of larger ones. `generation` changes on every regeneration so the
/// GPU copy knows to re-upload.
#[derive(Debug)]
pub struct FanCache {
    vertex_count: u32,
    indices: Vec<u16>,
    generation: u64,
}

impl FanCache {
    pub fn new() -> Self {
        Self {
            vertex_count: FAN_START_CAPACITY,
            indices: fan_indices(FAN_START_CAPACITY),
            generation: 0,
        }
    }

    /// Makes room for a fan of `vertex_count`; returns true if regenerated.
    pub fn ensure(&mut self, vertex_count: u32) -> bool {
        if vertex_count <= self.vertex_count {
            return false;
        }
        self.vertex_count = vertex_count;
        self.indices = fan_indices(vertex_count);
        self.generation += 1;
        log::trace!("dot fan regenerated for {vertex_count} vertices");
        true
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Default for FanCache {
    fn default() -> Self {
        Self::new()
    }
}

/// CPU copy of the line index buffer, grown in powers of two.
#[derive(Debug, Default)]
pub struct LineIndexCache {
    segments: u32,
    indices: Vec<u32>,
    generation: u64,
}

impl LineIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure(&mut self, segments: u32) -> bool {
        if segments <= self.segments {
            return false;
        }
        self.segments = segments.next_power_of_two();
        self.indices = line_indices(self.segments);
        self.generation += 1;
        true
    }

    pub fn segments(&self) -> u32 {
        self.segments
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
