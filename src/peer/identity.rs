//! Slot normalization for identities asserted by the remote side

use crate::ws::protocol::Slot;

/// Map an asserted slot into {1, 2}.
///
/// In-range values pass through. Anything else falls back to slot 1 when
/// the local slot is unknown, or to the slot that is not ours.
pub fn normalize(asserted: i32, local: Option<Slot>) -> Slot {
    if let Some(slot) = Slot::from_wire(asserted) {
        return slot;
    }
    match local {
        Some(mine) => mine.other(),
        None => Slot::ONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_range_passes_through() {
        assert_eq!(normalize(2, None), Slot::TWO);
        assert_eq!(normalize(1, Some(Slot::ONE)), Slot::ONE);
        assert_eq!(normalize(2, Some(Slot::TWO)), Slot::TWO);
    }

    #[test]
    fn test_out_of_range_falls_back() {
        assert_eq!(normalize(3, Some(Slot::ONE)), Slot::TWO);
        assert_eq!(normalize(0, None), Slot::ONE);
        assert_eq!(normalize(-1, Some(Slot::TWO)), Slot::ONE);
        assert_eq!(normalize(i32::MAX, None), Slot::ONE);
    }
}
