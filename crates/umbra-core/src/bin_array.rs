//! # Bins and Bin Sources
//!
//! A bin is a discrete price bucket holding pooled reserves and a
//! liquidity-share supply. On chain, bins live in fixed-size array accounts
//! keyed by `floor(bin_id / BIN_ARRAY_SIZE)`; off chain, the quote and
//! rebalance engines only need a lookup, abstracted as [`BinSource`], with
//! [`BinMap`] as the in-memory implementation fed from whatever accounts
//! the caller prefetched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{BIN_ARRAY_BITMAP_SIZE, BIN_ARRAY_SIZE};
use crate::math::bin_price::price_at_bin;

/// One price bucket of the pool
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bin {
    /// Signed index of this bucket; price is monotonically increasing in it
    pub bin_id: i32,
    /// Reserve of token X
    pub amount_x: u64,
    /// Reserve of token Y
    pub amount_y: u64,
    /// Outstanding liquidity shares for this bin
    pub liquidity_supply: u128,
    /// Q64.64 price of token X in token Y at this bin
    pub price: u128,
}

impl Bin {
    /// Bin with its price derived from the id and step
    pub fn new(bin_id: i32, bin_step: u16, amount_x: u64, amount_y: u64) -> Self {
        Self {
            bin_id,
            amount_x,
            amount_y,
            liquidity_supply: 0,
            price: price_at_bin(bin_id, bin_step),
        }
    }

    /// Reserve a swap in the given direction pulls from
    pub fn reserve_out(&self, swap_for_y: bool) -> u64 {
        if swap_for_y {
            self.amount_y
        } else {
            self.amount_x
        }
    }
}

/// Lookup over the bins a caller has fetched. Returning `None` means the
/// walk cannot see past that point: for the quote engine that is liquidity
/// exhaustion, not an empty bin.
pub trait BinSource {
    /// The bin at `bin_id`, if supplied
    fn bin(&self, bin_id: i32) -> Option<Bin>;

    /// Next supplied bin strictly beyond `from`, descending when
    /// `descending` is set. The default steps one id at a time; sparse
    /// implementations should skip directly to the next known bin.
    fn next_bin(&self, from: i32, descending: bool) -> Option<Bin> {
        let next = if descending {
            from.checked_sub(1)?
        } else {
            from.checked_add(1)?
        };
        self.bin(next)
    }
}

/// In-memory bin source over a sorted map
#[derive(Debug, Clone, Default)]
pub struct BinMap {
    bins: BTreeMap<i32, Bin>,
}

impl BinMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any bin iterator, keyed by bin id
    pub fn from_bins(bins: impl IntoIterator<Item = Bin>) -> Self {
        Self {
            bins: bins.into_iter().map(|bin| (bin.bin_id, bin)).collect(),
        }
    }

    /// Insert or replace one bin
    pub fn insert(&mut self, bin: Bin) {
        self.bins.insert(bin.bin_id, bin);
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

impl BinSource for BinMap {
    fn bin(&self, bin_id: i32) -> Option<Bin> {
        self.bins.get(&bin_id).copied()
    }

    fn next_bin(&self, from: i32, descending: bool) -> Option<Bin> {
        if descending {
            self.bins.range(..from).next_back().map(|(_, bin)| *bin)
        } else {
            let start = from.checked_add(1)?;
            self.bins.range(start..).next().map(|(_, bin)| *bin)
        }
    }
}

// ============================================================================
// Bin Array Indexing
// ============================================================================

/// Index of the fixed-size array account holding `bin_id`
pub fn bin_array_index(bin_id: i32) -> i32 {
    bin_id.div_euclid(BIN_ARRAY_SIZE)
}

/// Inclusive bin-id bounds of the array at `index`
pub fn bin_array_range(index: i32) -> (i32, i32) {
    let lower = index * BIN_ARRAY_SIZE;
    (lower, lower + BIN_ARRAY_SIZE - 1)
}

/// Whether the array index falls outside the pool's default bitmap and
/// needs the bitmap extension account to be located
pub fn requires_bitmap_extension(index: i32) -> bool {
    index < -BIN_ARRAY_BITMAP_SIZE || index >= BIN_ARRAY_BITMAP_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_index_floors_toward_negative() {
        assert_eq!(bin_array_index(0), 0);
        assert_eq!(bin_array_index(69), 0);
        assert_eq!(bin_array_index(70), 1);
        assert_eq!(bin_array_index(-1), -1);
        assert_eq!(bin_array_index(-70), -1);
        assert_eq!(bin_array_index(-71), -2);
    }

    #[test]
    fn test_array_range_contains_its_bins() {
        for index in [-3, -1, 0, 2] {
            let (lower, upper) = bin_array_range(index);
            assert_eq!(bin_array_index(lower), index);
            assert_eq!(bin_array_index(upper), index);
            assert_eq!(upper - lower + 1, BIN_ARRAY_SIZE);
        }
    }

    #[test]
    fn test_bitmap_extension_boundary() {
        assert!(!requires_bitmap_extension(0));
        assert!(!requires_bitmap_extension(511));
        assert!(!requires_bitmap_extension(-512));
        assert!(requires_bitmap_extension(512));
        assert!(requires_bitmap_extension(-513));
    }

    #[test]
    fn test_bin_map_skips_gaps() {
        let map = BinMap::from_bins([
            Bin::new(-3, 100, 0, 500),
            Bin::new(0, 100, 10, 20),
            Bin::new(4, 100, 700, 0),
        ]);

        assert_eq!(map.bin(0).unwrap().amount_x, 10);
        assert!(map.bin(1).is_none());
        assert_eq!(map.next_bin(0, false).unwrap().bin_id, 4);
        assert_eq!(map.next_bin(0, true).unwrap().bin_id, -3);
        assert!(map.next_bin(4, false).is_none());
    }
}
