use std::sync::Arc;

use mtrack_ir::{
    BufferConfig, Const, EmitError, Insn, InsnBuffer, JumpCond, Label, Slot, ValueType,
};

use super::*;
use crate::counters::MethodCounters;
use crate::runtime::RuntimeFn;

const MID: u32 = 7;

fn setup(entries: &[Marker]) -> (MethodTrackingExpander, Arc<MethodCounters>) {
    let counters = Arc::new(MethodCounters::new());
    let mut expander = MethodTrackingExpander::new(MID, ExpandConfig::default(), counters.clone());
    for marker in entries {
        expander.record(marker).unwrap();
    }
    (expander, counters)
}

/// Expand each marker into its own buffer segment, returning the segments.
fn expand_each(
    expander: &mut MethodTrackingExpander,
    buf: &mut InsnBuffer,
    markers: &[Marker],
) -> Vec<Vec<Insn>> {
    let mut segments = Vec::new();
    for marker in markers {
        let start = buf.len();
        expander.expand(marker, buf).unwrap();
        segments.push(buf.insns()[start..].to_vec());
    }
    segments
}

fn call(f: RuntimeFn) -> Insn {
    Insn::Invoke(f.extern_fn())
}

fn push_long(v: i64) -> Insn {
    Insn::Push(Const::Long(v))
}

fn push_int(v: i32) -> Insn {
    Insn::Push(Const::Int(v))
}

fn store(ty: ValueType, slot: u16) -> Insn {
    Insn::Store {
        ty,
        slot: Slot(slot),
    }
}

fn load(ty: ValueType, slot: u16) -> Insn {
    Insn::Load {
        ty,
        slot: Slot(slot),
    }
}

fn jump(cond: JumpCond, label: u32) -> Insn {
    Insn::Jump {
        cond,
        target: Label(label),
    }
}

fn merge(label: u32) -> [Insn; 2] {
    [Insn::Label(Label(label)), Insn::Frame(Label(label))]
}

#[test]
fn test_untracked_method_emits_only_zero_duration() {
    let entry = Marker::entry();
    let (mut expander, counters) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[
            entry,
            Marker::test().timed(),
            Marker::else_branch(),
            Marker::duration(),
            Marker::exit(),
        ],
    );

    assert!(segments[0].is_empty());
    assert!(segments[1].is_empty());
    assert!(segments[2].is_empty());
    assert_eq!(segments[3], vec![push_long(0)]);
    assert!(segments[4].is_empty());
    assert!(counters.is_empty());
}

#[test]
fn test_timed_entry_and_test() {
    let entry = Marker::entry().timed();
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[entry, Marker::test().timed(), Marker::duration()],
    );

    // Duration slot first (wide), then the entry timestamp.
    assert_eq!(
        segments[0],
        vec![
            push_long(0),
            store(ValueType::Long, 0),
            call(RuntimeFn::NanoTime),
            store(ValueType::Long, 2),
        ]
    );

    let mut expected_test = vec![
        call(RuntimeFn::NanoTime),
        load(ValueType::Long, 2),
        Insn::Sub(ValueType::Long),
        store(ValueType::Long, 0),
    ];
    expected_test.extend(merge(0));
    assert_eq!(segments[1], expected_test);

    assert_eq!(segments[2], vec![load(ValueType::Long, 0)]);
}

#[test]
fn test_test_without_timed_tag_does_not_measure() {
    let entry = Marker::entry().timed();
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[entry, Marker::test(), Marker::duration()],
    );
    assert!(segments[1].is_empty());
    assert_eq!(segments[2], vec![push_long(0)]);
}

#[test]
fn test_duration_defaults_to_zero_then_reads_stored_value() {
    let entry = Marker::entry().timed();
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[
            entry,
            Marker::duration(),
            Marker::test().timed(),
            Marker::duration(),
            Marker::duration(),
        ],
    );

    assert_eq!(segments[1], vec![push_long(0)]);
    let duration = expander.state().duration().unwrap();
    let read = vec![Insn::Load {
        ty: ValueType::Long,
        slot: duration,
    }];
    assert_eq!(segments[3], read);
    assert_eq!(segments[4], read);
}

#[test]
fn test_const_timed_entry_calls_counter_once_per_cycle() {
    let entry = Marker::entry()
        .timed()
        .sampled(SamplerKind::Const, Some(10));
    let (mut expander, counters) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(&mut expander, &mut buf, &[entry.clone(), entry]);

    assert_eq!(
        segments[0],
        vec![
            push_long(0),
            store(ValueType::Long, 0),
            push_int(7),
            call(RuntimeFn::HitTimed),
            Insn::Dup(ValueType::Long),
            store(ValueType::Long, 2),
            Insn::LongToInt,
            store(ValueType::Int, 4),
        ]
    );
    assert!(segments[1].is_empty());
    assert_eq!(buf.count_calls("hitTimed"), 1);
    assert_eq!(counters.mean(MID), Some(10));
}

#[test]
fn test_timed_entry_calls_clock_once_per_cycle() {
    let entry = Marker::entry().timed();
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    expand_each(&mut expander, &mut buf, &[entry.clone(), entry]);
    assert_eq!(buf.count_calls("nanoTime"), 1);
}

#[test]
fn test_sampled_test_else_exit() {
    let entry = Marker::entry().sampled(SamplerKind::Adaptive, Some(4));
    let (mut expander, counters) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[
            entry,
            Marker::test(),
            Marker::else_branch(),
            Marker::else_branch(),
            Marker::exit(),
        ],
    );

    assert_eq!(
        segments[0],
        vec![
            push_int(7),
            call(RuntimeFn::HitAdaptive),
            store(ValueType::Int, 0)
        ]
    );

    let mut expected_test = vec![load(ValueType::Int, 0), jump(JumpCond::IfZero, 1)];
    expected_test.extend(merge(0));
    assert_eq!(segments[1], expected_test);

    assert_eq!(segments[2], merge(1).to_vec());
    // The else target is consumed once.
    assert!(segments[3].is_empty());

    let mut expected_exit = vec![
        load(ValueType::Int, 0),
        jump(JumpCond::IfZero, 2),
        push_int(7),
        call(RuntimeFn::UpdateEndTs),
    ];
    expected_exit.extend(merge(2));
    assert_eq!(segments[4], expected_exit);

    assert_eq!(counters.mean(MID), Some(4));
    assert!(buf.dangling_labels().is_empty());
}

#[test]
fn test_exit_is_noop_for_const_sampler() {
    let entry = Marker::entry().sampled(SamplerKind::Const, Some(4));
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(&mut expander, &mut buf, &[entry, Marker::exit()]);
    assert!(segments[1].is_empty());
}

#[test]
fn test_timed_sampled_test_uses_end_timestamp() {
    let entry = Marker::entry()
        .timed()
        .sampled(SamplerKind::Const, None);
    let (mut expander, counters) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[entry, Marker::test().timed(), Marker::test().timed()],
    );

    let mut expected_test = vec![
        load(ValueType::Int, 4),
        jump(JumpCond::IfZero, 1),
        push_int(7),
        call(RuntimeFn::GetEndTs),
        load(ValueType::Long, 2),
        Insn::Sub(ValueType::Long),
        store(ValueType::Long, 0),
    ];
    expected_test.extend(merge(0));
    assert_eq!(segments[1], expected_test);

    // Second test branches again but does not recompute the duration.
    assert_eq!(buf.count_calls("getEndTs"), 1);
    assert_eq!(counters.mean(MID), Some(10));
}

#[test]
fn test_single_level_gate() {
    let entry = Marker::entry().timed().level("[5,5]");
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(&mut expander, &mut buf, &[entry]);

    let mut expected = vec![
        // duration and entry timestamp defined before the gate
        push_long(0),
        store(ValueType::Long, 0),
        push_long(0),
        store(ValueType::Long, 2),
        // [-inf, 4] -> skip
        Insn::ReadLevel {
            field: "level".to_string(),
        },
        Insn::Dup(ValueType::Int),
        store(ValueType::Int, 4),
        push_int(4),
        jump(JumpCond::IfLessOrEqual, 0),
    ];
    expected.extend(merge(1));
    // [6, +inf] -> skip
    expected.extend([
        load(ValueType::Int, 4),
        push_int(6),
        jump(JumpCond::IfLess, 2),
        jump(JumpCond::Always, 0),
    ]);
    expected.extend(merge(2));
    expected.extend([call(RuntimeFn::NanoTime), store(ValueType::Long, 2)]);
    expected.extend(merge(0));

    assert_eq!(segments[0], expected);
}

#[test]
fn test_level_value_read_once_per_cycle() {
    let entry = Marker::entry().timed().level("[1,3]");
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    expand_each(
        &mut expander,
        &mut buf,
        &[entry.clone(), Marker::test().timed(), Marker::reset(), entry],
    );

    let reads = buf
        .insns()
        .iter()
        .filter(|i| matches!(i, Insn::ReadLevel { .. }))
        .count();
    assert_eq!(reads, 2);
    assert!(buf.dangling_labels().is_empty());
}

#[test]
fn test_zero_bound_uses_single_operand_compare() {
    let entry = Marker::entry().timed().level("[1,]");
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    expand_each(&mut expander, &mut buf, &[entry]);

    // Skip range [-inf, 0] compares against zero directly.
    assert!(buf.insns().contains(&jump(JumpCond::IfNonPositive, 0)));
    assert!(!buf.insns().contains(&push_int(0)));
}

#[test]
fn test_always_on_level_generates_no_branch() {
    for level in ["[0,2147483647]", ">=0", "0"] {
        let entry = Marker::entry().timed().level(level);
        let (mut expander, _) = setup(&[entry.clone()]);
        let mut buf = InsnBuffer::default();
        expand_each(&mut expander, &mut buf, &[entry, Marker::test().timed()]);
        assert!(
            !buf.insns().iter().any(|i| i.jump_target().is_some()),
            "{level}"
        );
        assert!(!buf.insns().iter().any(|i| matches!(i, Insn::ReadLevel { .. })));
    }
}

#[test]
fn test_gated_sampler_entry_defines_flag_on_every_path() {
    let entry = Marker::entry()
        .sampled(SamplerKind::Adaptive, Some(2))
        .level("[1,3]");
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(&mut expander, &mut buf, &[entry]);

    assert_eq!(segments[0][..2], [push_int(0), store(ValueType::Int, 0)]);
    // The hit call stores into the pre-defined flag instead of a new slot.
    let hit = segments[0]
        .iter()
        .position(|i| i.calls("hitAdaptive"))
        .unwrap();
    assert_eq!(segments[0][hit + 1], store(ValueType::Int, 0));
    assert_eq!(buf.slots_allocated(), 2);
    assert!(buf.dangling_labels().is_empty());
}

#[test]
fn test_sampler_test_gate_targets_merge_label() {
    let entry = Marker::entry()
        .sampled(SamplerKind::Const, Some(3))
        .level("=2");
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(&mut expander, &mut buf, &[entry, Marker::test()]);

    let test = &segments[1];
    let &Insn::Label(merge_label) = &test[test.len() - 2] else {
        panic!("test must end at its merge point");
    };
    // Level checks skip to the merge label; the hit check goes to else.
    let targets: Vec<Label> = test.iter().filter_map(Insn::jump_target).collect();
    assert!(targets.contains(&merge_label));
    assert!(test.ends_with(&[Insn::Label(merge_label), Insn::Frame(merge_label)]));
    assert!(expander.state().has_pending_else());
}

#[test]
fn test_reset_starts_fresh_cycle() {
    let entry = Marker::entry()
        .timed()
        .sampled(SamplerKind::Const, Some(10))
        .level("[0,5]");
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();

    expand_each(
        &mut expander,
        &mut buf,
        &[entry.clone(), Marker::test().timed(), Marker::exit()],
    );
    let tracking_before = expander.tracking().clone();
    let first_ts = expander.state().entry_ts().unwrap();
    let first_hit = expander.state().sample_hit().unwrap();
    let duration = expander.state().duration().unwrap();

    expand_each(&mut expander, &mut buf, &[Marker::reset()]);
    assert_eq!(expander.state().entry_ts(), None);
    assert_eq!(expander.state().sample_hit(), None);
    assert!(!expander.state().is_duration_computed());

    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[entry, Marker::duration(), Marker::test().timed()],
    );
    assert_ne!(expander.state().entry_ts().unwrap(), first_ts);
    assert_ne!(expander.state().sample_hit().unwrap(), first_hit);
    assert_eq!(expander.state().duration(), Some(duration));
    assert_eq!(expander.tracking(), &tracking_before);

    assert_eq!(segments[1], vec![push_long(0)]);
    assert_eq!(buf.count_calls("hitTimed"), 2);
    assert_eq!(buf.count_calls("getEndTs"), 2);
}

#[test]
fn test_reset_state_clears_only_duration_flag() {
    let entry = Marker::entry().timed();
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    expand_each(&mut expander, &mut buf, &[entry, Marker::test().timed()]);
    let ts = expander.state().entry_ts();

    expander.reset_state();
    assert!(!expander.state().is_duration_computed());
    assert_eq!(expander.state().entry_ts(), ts);

    let segments = expand_each(&mut expander, &mut buf, &[Marker::duration()]);
    assert_eq!(segments[0], vec![push_long(0)]);
}

#[test]
fn test_method_id_override() {
    let entry = Marker::entry()
        .sampled(SamplerKind::Const, Some(5))
        .method_id_override(42);
    let (mut expander, counters) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(&mut expander, &mut buf, &[entry]);

    assert_eq!(segments[0][0], push_int(42));
    assert_eq!(counters.mean(42), Some(5));
    assert_eq!(counters.mean(MID), None);
}

#[test]
fn test_malformed_method_id_fails() {
    let (mut expander, _) = setup(&[]);
    let mut buf = InsnBuffer::default();
    let marker = Marker::exit().with_tag(tags::METHOD_ID, "seven");
    assert!(matches!(
        expander.expand(&marker, &mut buf),
        Err(crate::ConfigError::InvalidInteger { .. })
    ));
    assert!(buf.is_empty());
}

#[test]
fn test_unsampled_declaration_suppresses_registration() {
    let sampled = Marker::entry().sampled(SamplerKind::Const, Some(5));
    let plain = Marker::entry().timed();
    let (mut expander, counters) = setup(&[sampled.clone(), plain]);
    let mut buf = InsnBuffer::default();
    expand_each(&mut expander, &mut buf, &[sampled]);

    assert!(counters.is_empty());
    assert_eq!(buf.count_calls("hitTimed"), 0);
    assert_eq!(buf.count_calls("nanoTime"), 1);
}

#[test]
fn test_two_bound_skip_range_reloads_cached_level() {
    // Skip ranges: [-inf, -1], [4, 8], [10, +inf].
    let entry = Marker::entry().timed().level("[0,3]");
    let (mut expander, _) = setup(&[entry.clone(), Marker::entry().timed().level("[9,9]")]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(&mut expander, &mut buf, &[entry]);

    let mut expected = vec![
        push_long(0),
        store(ValueType::Long, 0),
        push_long(0),
        store(ValueType::Long, 2),
        Insn::ReadLevel {
            field: "level".to_string(),
        },
        Insn::Dup(ValueType::Int),
        store(ValueType::Int, 4),
        push_int(-1),
        jump(JumpCond::IfLessOrEqual, 0),
    ];
    expected.extend(merge(1));
    expected.extend([
        load(ValueType::Int, 4),
        push_int(4),
        jump(JumpCond::IfLess, 2),
        load(ValueType::Int, 4),
        push_int(8),
        jump(JumpCond::IfLessOrEqual, 0),
    ]);
    expected.extend(merge(2));
    expected.extend([
        load(ValueType::Int, 4),
        push_int(10),
        jump(JumpCond::IfLess, 3),
        jump(JumpCond::Always, 0),
    ]);
    expected.extend(merge(3));
    expected.extend([call(RuntimeFn::NanoTime), store(ValueType::Long, 2)]);
    expected.extend(merge(0));

    assert_eq!(segments[0], expected);
    let reads = buf
        .insns()
        .iter()
        .filter(|i| matches!(i, Insn::ReadLevel { .. }))
        .count();
    assert_eq!(reads, 1);
}

#[test]
fn test_gated_timed_test_before_entry_defines_duration() {
    let entry = Marker::entry().timed().level("[1,3]");
    let (mut expander, _) = setup(&[entry]);
    let mut buf = InsnBuffer::default();
    let segments = expand_each(
        &mut expander,
        &mut buf,
        &[Marker::test().timed(), Marker::duration()],
    );

    let test = &segments[0];
    assert_eq!(test[..2], [push_long(0), store(ValueType::Long, 0)]);
    let first_jump = test.iter().position(|i| i.jump_target().is_some()).unwrap();
    assert!(first_jump > 2);
    assert_eq!(segments[1], vec![load(ValueType::Long, 0)]);
    assert!(buf.dangling_labels().is_empty());
}

#[test]
fn test_method_id_beyond_int_range_fails() {
    let entry = Marker::entry()
        .sampled(SamplerKind::Const, Some(5))
        .with_tag(tags::METHOD_ID, "3000000000");
    let (mut expander, counters) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::default();
    assert_eq!(
        expander.expand(&entry, &mut buf),
        Err(crate::ConfigError::InvalidInteger {
            tag: "methodid".to_string(),
            value: "3000000000".to_string()
        })
    );
    assert!(buf.is_empty());
    assert!(counters.is_empty());

    // A static id that does not fit an int constant is rejected too.
    let counters = Arc::new(MethodCounters::new());
    let mut expander =
        MethodTrackingExpander::new(3_000_000_000, ExpandConfig::default(), counters.clone());
    let entry = Marker::entry().sampled(SamplerKind::Const, Some(5));
    expander.record(&entry).unwrap();
    assert!(matches!(
        expander.expand(&entry, &mut buf),
        Err(crate::ConfigError::InvalidInteger { .. })
    ));
    assert!(counters.is_empty());
}

#[test]
fn test_slot_exhaustion_surfaces_as_error() {
    let entry = Marker::entry().timed();
    let (mut expander, _) = setup(&[entry.clone()]);
    let mut buf = InsnBuffer::new(&BufferConfig::default().with_first_slot(u16::MAX));
    assert_eq!(
        expander.expand(&entry, &mut buf),
        Err(crate::ConfigError::Emit(EmitError::SlotsExhausted {
            index: 65535,
            ty: ValueType::Long
        }))
    );
    assert_eq!(buf.slots_allocated(), 0);
}
