#![no_main]
use libfuzzer_sys::fuzz_target;
use swarmstore::{piece_budget, piece_window};

fuzz_target!(|input: (u64, u32, u32, u32, u64)| {
    let (requested, total_pieces, slot, bucket_count, total_length) = input;

    // piece_budget() should never panic and never exceed the piece count
    let budget = piece_budget(requested, total_pieces, total_length);
    assert!(budget <= total_pieces);

    // piece_window() must stay inside the piece space for any inputs
    let range = piece_window(total_pieces, slot, bucket_count, budget);
    assert!(range.start <= range.end);
    assert!(range.end <= total_pieces);
    assert_eq!(range.len(), budget);

    // Oversized budgets are clamped to the whole piece space
    let wild = piece_window(total_pieces, slot, bucket_count, u32::MAX);
    assert_eq!(wild.len(), total_pieces);
});
