//! # Branch Target Buffer Tests

use o3sim_core::core::units::bru::btb::Btb;
use pretty_assertions::assert_eq;

fn counter_of(btb: &Btb, pc: u64) -> Option<usize> {
    btb.set(pc)
        .iter()
        .find(|e| e.source == pc)
        .map(|e| e.counter)
}

#[test]
fn test_third_branch_evicts_least_recent_way() {
    // Four sets: 0x104, 0x204 and 0x304 all map to set 0.
    let mut btb = Btb::new(4, 2);
    btb.update(0x104, 0x500);
    btb.update(0x204, 0x600);
    assert_eq!(counter_of(&btb, 0x204), Some(1));
    assert_eq!(counter_of(&btb, 0x104), Some(0));

    btb.update(0x304, 0x700);
    assert_eq!(btb.lookup(0x104), None);
    assert_eq!(btb.lookup(0x304), Some(0x700));
    assert_eq!(counter_of(&btb, 0x304), Some(1));
    assert_eq!(counter_of(&btb, 0x204), Some(0));
}

#[test]
fn test_hit_refreshes_recency() {
    let mut btb = Btb::new(4, 2);
    btb.update(0x104, 0x500);
    btb.update(0x204, 0x600);
    // Touch the older entry, so the other one becomes the victim.
    btb.update(0x104, 0x540);
    btb.update(0x304, 0x700);
    assert_eq!(btb.lookup(0x104), Some(0x540));
    assert_eq!(btb.lookup(0x204), None);
}

#[test]
fn test_other_sets_are_untouched() {
    let mut btb = Btb::new(4, 2);
    btb.update(0x105, 0x900);
    for pc in [0x104, 0x204, 0x304] {
        btb.update(pc, pc + 0x10);
    }
    assert_eq!(btb.lookup(0x105), Some(0x900));
}
