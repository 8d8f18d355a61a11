/*
 * idset.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Scambio, a MAPI/RPC client protocol engine.
 *
 * Scambio is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Scambio is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Scambio.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Replica-scoped id range sets and their GLOBSET wire form ([OXCFXICS]
//! 2.2.2.5). Ids are 48-bit GLOBCNT counters scoped by a 16-byte replica
//! GUID. Ranges are kept sorted by low bound and maximally coalesced, so
//! the same set of ids always yields the same range list regardless of
//! insertion order. GLOBCNT bytes travel low byte first.

use crate::error::MapiError;

/// Largest value a 6-byte GLOBCNT can hold.
pub const MAX_GLOBCNT: u64 = (1 << 48) - 1;

const CMD_END: u8 = 0x00;
const CMD_BITMASK: u8 = 0x42;
const CMD_POP: u8 = 0x50;
const CMD_RANGE: u8 = 0x52;

/// An inclusive id range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdRange {
    pub low: u64,
    pub high: u64,
}

/// A set of ids belonging to one replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSet {
    guid: [u8; 16],
    ranges: Vec<IdRange>,
}

impl IdSet {
    pub fn new(guid: [u8; 16]) -> IdSet {
        IdSet {
            guid,
            ranges: Vec::new(),
        }
    }

    /// Build a set from an unsorted id array, coalescing consecutive runs.
    pub fn from_ids(guid: [u8; 16], ids: &[u64]) -> Result<IdSet, MapiError> {
        let mut set = IdSet::new(guid);
        for &id in ids {
            set.insert(id)?;
        }
        Ok(set)
    }

    pub fn guid(&self) -> &[u8; 16] {
        &self.guid
    }

    /// The ranges, sorted by low bound, maximally coalesced.
    pub fn ranges(&self) -> &[IdRange] {
        &self.ranges
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn insert(&mut self, id: u64) -> Result<(), MapiError> {
        self.insert_range(id, id)
    }

    /// Insert an inclusive range, merging with any range it overlaps or is
    /// adjacent to (`high + 1 == low` on either side).
    pub fn insert_range(&mut self, low: u64, high: u64) -> Result<(), MapiError> {
        if low > high {
            return Err(MapiError::InvalidParameter(format!(
                "range low 0x{:x} above high 0x{:x}",
                low, high
            )));
        }
        if high > MAX_GLOBCNT {
            return Err(MapiError::InvalidParameter(format!(
                "id 0x{:x} exceeds 48 bits",
                high
            )));
        }
        let start = self.ranges.partition_point(|r| r.high + 1 < low);
        let mut new_low = low;
        let mut new_high = high;
        let mut end = start;
        while end < self.ranges.len() && self.ranges[end].low <= high + 1 {
            new_low = new_low.min(self.ranges[end].low);
            new_high = new_high.max(self.ranges[end].high);
            end += 1;
        }
        self.ranges.splice(
            start..end,
            [IdRange {
                low: new_low,
                high: new_high,
            }],
        );
        Ok(())
    }

    pub fn contains(&self, id: u64) -> bool {
        let i = self.ranges.partition_point(|r| r.high < id);
        i < self.ranges.len() && self.ranges[i].low <= id
    }

    /// Union with another set of the same replica. Differently-scoped sets
    /// never merge silently.
    pub fn union(&self, other: &IdSet) -> Result<IdSet, MapiError> {
        if self.guid != other.guid {
            return Err(MapiError::InvalidParameter(
                "cannot union id sets with different replica guids".into(),
            ));
        }
        let mut merged = self.clone();
        for r in &other.ranges {
            merged.insert_range(r.low, r.high)?;
        }
        Ok(merged)
    }

    /// Serialize: replica GUID, then the GLOBSET command stream. A
    /// singleton is a push-6; a range pushes the low-order bytes the two
    /// bounds share, emits a range command with the remaining bytes of
    /// each bound, and pops.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16 + 13 * self.ranges.len() + 1);
        out.extend_from_slice(&self.guid);
        for range in &self.ranges {
            if range.low == range.high {
                out.push(0x06);
                push_globcnt_bytes(&mut out, range.low, 0, 6);
            } else {
                let mut shared = 0u8;
                let mut mask = 0xFFu64;
                while shared < 6 && (range.low & mask) == (range.high & mask) {
                    shared += 1;
                    mask <<= 8;
                }
                if shared > 0 {
                    out.push(shared);
                    push_globcnt_bytes(&mut out, range.low, 0, shared);
                }
                out.push(CMD_RANGE);
                push_globcnt_bytes(&mut out, range.low, shared, 6 - shared);
                push_globcnt_bytes(&mut out, range.high, shared, 6 - shared);
                if shared > 0 {
                    out.push(CMD_POP);
                }
            }
        }
        out.push(CMD_END);
        out
    }

    /// Parse a serialized set. Accepts the bitmask command (0x42) even
    /// though the serializer never emits it. The result is normalized into
    /// the sorted coalesced form.
    pub fn parse(data: &[u8]) -> Result<IdSet, MapiError> {
        if data.len() < 17 {
            return Err(MapiError::InvalidParameter(
                "id set blob shorter than guid plus end command".into(),
            ));
        }
        let mut guid = [0u8; 16];
        guid.copy_from_slice(&data[..16]);
        let mut set = IdSet::new(guid);

        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut pos = 16usize;
        loop {
            let command = *data
                .get(pos)
                .ok_or_else(|| MapiError::InvalidParameter("id set blob ends without end command".into()))?;
            pos += 1;
            match command {
                CMD_END => break,
                n @ 0x01..=0x06 => {
                    let count = n as usize;
                    let bytes = take(data, &mut pos, count)?;
                    stack.push(bytes.to_vec());
                    if stack_size(&stack) > 6 {
                        return Err(MapiError::InvalidParameter("push past 6 globcnt bytes".into()));
                    }
                    if stack_size(&stack) == 6 {
                        let value = combine(&stack, &[]);
                        set.insert(value)?;
                        stack.pop();
                    }
                }
                CMD_POP => {
                    if stack.pop().is_none() {
                        return Err(MapiError::InvalidParameter("pop with empty stack".into()));
                    }
                }
                CMD_RANGE => {
                    let count = (6 - stack_size(&stack)) as usize;
                    let low_bytes = take(data, &mut pos, count)?.to_vec();
                    let high_bytes = take(data, &mut pos, count)?.to_vec();
                    let low = combine(&stack, &low_bytes);
                    let high = combine(&stack, &high_bytes);
                    set.insert_range(low, high)?;
                }
                CMD_BITMASK => {
                    if stack_size(&stack) != 5 {
                        return Err(MapiError::InvalidParameter(
                            "bitmask command needs exactly 5 pushed bytes".into(),
                        ));
                    }
                    let start = *take(data, &mut pos, 1)?.first().unwrap_or(&0);
                    let mask = *take(data, &mut pos, 1)?.first().unwrap_or(&0);
                    let base = combine(&stack, &[]) << 8;
                    set.insert(base | start as u64)?;
                    for bit in 0..8u8 {
                        if mask & (1 << bit) != 0 {
                            set.insert(base | (start as u64 + 1 + bit as u64))?;
                        }
                    }
                }
                other => {
                    return Err(MapiError::InvalidParameter(format!(
                        "invalid globset command 0x{:02x}",
                        other
                    )))
                }
            }
        }
        Ok(set)
    }
}

fn push_globcnt_bytes(out: &mut Vec<u8>, id: u64, start: u8, count: u8) {
    for i in 0..count {
        out.push(((id >> (8 * (start + i))) & 0xFF) as u8);
    }
}

fn stack_size(stack: &[Vec<u8>]) -> u8 {
    stack.iter().map(|b| b.len() as u8).sum()
}

fn take<'a>(data: &'a [u8], pos: &mut usize, count: usize) -> Result<&'a [u8], MapiError> {
    if *pos + count > data.len() {
        return Err(MapiError::InvalidParameter("truncated globset stream".into()));
    }
    let slice = &data[*pos..*pos + count];
    *pos += count;
    Ok(slice)
}

/// Reassemble a GLOBCNT from stacked prefix bytes plus trailing bytes,
/// low byte first.
fn combine(stack: &[Vec<u8>], rest: &[u8]) -> u64 {
    let mut value = 0u64;
    let mut shift = 0u32;
    for bytes in stack.iter().map(|b| b.as_slice()).chain(std::iter::once(rest)) {
        for &b in bytes {
            value |= (b as u64) << shift;
            shift += 8;
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    const GUID_A: [u8; 16] = [1; 16];
    const GUID_B: [u8; 16] = [2; 16];

    #[test]
    fn adjacent_ranges_coalesce() {
        let mut set = IdSet::new(GUID_A);
        set.insert_range(5, 10).unwrap();
        set.insert_range(11, 20).unwrap();
        assert_eq!(set.ranges(), &[IdRange { low: 5, high: 20 }]);
    }

    #[test]
    fn gap_keeps_ranges_separate() {
        let mut set = IdSet::new(GUID_A);
        set.insert_range(5, 10).unwrap();
        set.insert_range(12, 20).unwrap();
        assert_eq!(
            set.ranges(),
            &[IdRange { low: 5, high: 10 }, IdRange { low: 12, high: 20 }]
        );
    }

    #[test]
    fn overlapping_ranges_merge() {
        let mut set = IdSet::new(GUID_A);
        set.insert_range(5, 15).unwrap();
        set.insert_range(10, 20).unwrap();
        assert_eq!(set.ranges(), &[IdRange { low: 5, high: 20 }]);
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let ids = [44u64, 7, 8, 9, 200, 6, 45, 201, 199];
        let forward = IdSet::from_ids(GUID_A, &ids).unwrap();
        let mut reversed = ids;
        reversed.reverse();
        let backward = IdSet::from_ids(GUID_A, &reversed).unwrap();
        assert_eq!(forward.ranges(), backward.ranges());
        assert_eq!(
            forward.ranges(),
            &[
                IdRange { low: 6, high: 9 },
                IdRange { low: 44, high: 45 },
                IdRange { low: 199, high: 201 }
            ]
        );
    }

    #[test]
    fn contains_checks_bounds() {
        let mut set = IdSet::new(GUID_A);
        set.insert_range(10, 20).unwrap();
        assert!(set.contains(10));
        assert!(set.contains(15));
        assert!(set.contains(20));
        assert!(!set.contains(9));
        assert!(!set.contains(21));
    }

    #[test]
    fn union_requires_same_replica() {
        let a = IdSet::from_ids(GUID_A, &[1, 2]).unwrap();
        let b = IdSet::from_ids(GUID_B, &[3]).unwrap();
        assert!(matches!(a.union(&b), Err(MapiError::InvalidParameter(_))));
    }

    #[test]
    fn union_merges_ranges() {
        let a = IdSet::from_ids(GUID_A, &[5, 6, 7]).unwrap();
        let b = IdSet::from_ids(GUID_A, &[8, 9, 30]).unwrap();
        let u = a.union(&b).unwrap();
        assert_eq!(
            u.ranges(),
            &[IdRange { low: 5, high: 9 }, IdRange { low: 30, high: 30 }]
        );
    }

    #[test]
    fn oversized_id_rejected() {
        let mut set = IdSet::new(GUID_A);
        assert!(set.insert(MAX_GLOBCNT).is_ok());
        assert!(set.insert(MAX_GLOBCNT + 1).is_err());
    }

    #[test]
    fn serialize_singleton_uses_push_six() {
        let set = IdSet::from_ids(GUID_A, &[0x0102030405]).unwrap();
        let wire = set.serialize();
        // guid, push-6 command, six bytes low first, end
        assert_eq!(&wire[16..], &[0x06, 0x05, 0x04, 0x03, 0x02, 0x01, 0x00, 0x00]);
        let back = IdSet::parse(&wire).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn serialize_shares_low_order_bytes() {
        // low and high agree on their two low-order bytes
        let mut set = IdSet::new(GUID_A);
        set.insert_range(0x0433_2211, 0x0944_2211).unwrap();
        let wire = set.serialize();
        assert_eq!(wire[16], 0x02); // push 2
        assert_eq!(&wire[17..19], &[0x11, 0x22]);
        assert_eq!(wire[19], 0x52);
        let back = IdSet::parse(&wire).unwrap();
        assert_eq!(back.ranges(), set.ranges());
    }

    #[test]
    fn round_trip_mixed_set() {
        let mut set = IdSet::new(GUID_A);
        set.insert_range(1, 9).unwrap();
        set.insert(100).unwrap();
        set.insert_range(0xFFFF00, 0xFFFFFF).unwrap();
        let back = IdSet::parse(&set.serialize()).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn parse_bitmask_command() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&GUID_A);
        wire.push(0x05); // push 5 low-order bytes, all zero
        wire.extend_from_slice(&[0, 0, 0, 0, 0]);
        wire.push(0x42);
        wire.push(10); // start
        wire.push(0b0000_0011); // 11 and 12
        wire.push(0x50);
        wire.push(0x00);
        let set = IdSet::parse(&wire).unwrap();
        assert_eq!(set.ranges(), &[IdRange { low: 10, high: 12 }]);
    }

    #[test]
    fn parse_rejects_garbage_command() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&GUID_A);
        wire.push(0x77);
        wire.push(0x00);
        assert!(IdSet::parse(&wire).is_err());
    }
}
