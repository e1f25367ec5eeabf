//! Position mapping through document changes.

/// Result of mapping a single position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MapResult {
    pub pos: usize,
    /// The content on the `assoc` side of the position was deleted.
    pub deleted: bool,
}

/// Replaced ranges of one step, in old-document coordinates, sorted by start.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMap {
    /// `(start, old_size, new_size)` triples.
    ranges: Vec<(usize, usize, usize)>,
}

impl StepMap {
    pub fn new(ranges: Vec<(usize, usize, usize)>) -> Self {
        Self {
            ranges: ranges
                .into_iter()
                .filter(|(_, old, new)| old != new || *old > 0)
                .collect(),
        }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[(usize, usize, usize)] {
        &self.ranges
    }

    /// Map a position. `assoc` picks the side a position sticks to when
    /// content is inserted exactly at it: negative keeps it before, positive
    /// moves it after.
    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }

    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut diff: isize = 0;
        for &(start, old_size, new_size) in &self.ranges {
            if start > pos {
                break;
            }
            let end = start + old_size;
            if pos <= end {
                let side = if old_size == 0 {
                    assoc
                } else if pos == start {
                    -1
                } else if pos == end {
                    1
                } else {
                    assoc
                };
                let base = (start as isize + diff) as usize;
                let mapped = if side < 0 { base } else { base + new_size };
                let deleted = old_size > 0 && if assoc < 0 { pos != start } else { pos != end };
                return MapResult {
                    pos: mapped,
                    deleted,
                };
            }
            diff += new_size as isize - old_size as isize;
        }
        MapResult {
            pos: (pos as isize + diff) as usize,
            deleted: false,
        }
    }
}

/// Step maps of a whole transaction, applied in order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn maps(&self) -> &[StepMap] {
        &self.maps
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    pub fn map(&self, pos: usize, assoc: i8) -> usize {
        self.map_result(pos, assoc).pos
    }

    /// Map through every step; `deleted` is set if any step deleted the position.
    pub fn map_result(&self, pos: usize, assoc: i8) -> MapResult {
        let mut deleted = false;
        let mut pos = pos;
        for map in &self.maps {
            let r = map.map_result(pos, assoc);
            deleted |= r.deleted;
            pos = r.pos;
        }
        MapResult { pos, deleted }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_respects_assoc() {
        let map = StepMap::new(vec![(5, 0, 3)]);
        assert_eq!(map.map(5, -1), 5);
        assert_eq!(map.map(5, 1), 8);
        assert_eq!(map.map(2, 1), 2);
        assert_eq!(map.map(9, 1), 12);
    }

    #[test]
    fn test_deletion_flags_positions_inside() {
        let map = StepMap::new(vec![(4, 4, 0)]);
        assert_eq!(map.map_result(6, 1), MapResult { pos: 4, deleted: true });
        assert_eq!(map.map_result(4, 1), MapResult { pos: 4, deleted: true });
        assert_eq!(map.map_result(8, 1), MapResult { pos: 4, deleted: false });
        assert_eq!(map.map_result(10, 1), MapResult { pos: 6, deleted: false });
    }

    #[test]
    fn test_mapping_composes() {
        let mut mapping = Mapping::new();
        mapping.push(StepMap::new(vec![(0, 0, 2)]));
        mapping.push(StepMap::new(vec![(10, 2, 0)]));
        assert_eq!(mapping.map(3, 1), 5);
        assert_eq!(mapping.map_result(9, 1).pos, 10);
        assert!(mapping.map_result(9, 1).deleted);
    }
}
