/// Pruning soundness and the error taxonomy at the scan boundary
mod common;

use common::write_int_segment;
use segscan::{
    prune, ColumnType, CompareOp, ExecState, FilterCounters, LocalSource, OutputLayout, Predicate,
    ScanConfig, ScanError, ScanPlan, SegmentMeta, SegmentSource, Value,
};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

fn int_pred(op: CompareOp, v: i64) -> Predicate {
    Predicate::bind("k", op, Value::Int64(v), ColumnType::Int64).unwrap()
}

#[test]
fn test_pruning_never_excludes_a_matching_row() {
    let dir = tempfile::tempdir().unwrap();
    let groups: Vec<Vec<i64>> = vec![vec![1, 2, 3], vec![4, 5, 6], vec![10, 11, 12], vec![20, 30]];
    let slices: Vec<&[i64]> = groups.iter().map(|g| g.as_slice()).collect();
    let path = write_int_segment(dir.path(), "a.seg", &slices);

    let source = LocalSource::new();
    for (op, constant) in [
        (CompareOp::Eq, 5),
        (CompareOp::Lt, 4),
        (CompareOp::Le, 10),
        (CompareOp::Gt, 11),
        (CompareOp::Ge, 30),
        (CompareOp::Eq, 7), // matches nothing; pruning may keep [4,6] conservatively
    ] {
        let pred = int_pred(op, constant);
        let counters = FilterCounters::default();
        let matched = prune(&source, &[path.clone()], &[pred.clone()], &counters).unwrap();
        let survivors: Vec<usize> = matched
            .first()
            .map(|f| f.row_groups.clone())
            .unwrap_or_default();
        // every row that satisfies the predicate must live in a surviving group
        for (ordinal, group) in groups.iter().enumerate() {
            if survivors.contains(&ordinal) {
                continue;
            }
            for v in group {
                let satisfied = match op {
                    CompareOp::Lt => *v < constant,
                    CompareOp::Le => *v <= constant,
                    CompareOp::Eq => *v == constant,
                    CompareOp::Ge => *v >= constant,
                    CompareOp::Gt => *v > constant,
                    CompareOp::KeyExists => unreachable!(),
                };
                assert!(
                    !satisfied,
                    "row {} satisfying {:?} {} was pruned away in group {}",
                    v, op, constant, ordinal
                );
            }
        }
    }
}

#[test]
fn test_counters_accumulate_across_files() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_int_segment(dir.path(), "a.seg", &[&[1, 2], &[8, 9]]);
    let b = write_int_segment(dir.path(), "b.seg", &[&[3, 4, 5]]);

    let counters = FilterCounters::default();
    let matched = prune(
        &LocalSource::new(),
        &[a, b],
        &[int_pred(CompareOp::Ge, 8)],
        &counters,
    )
    .unwrap();
    assert_eq!(counters.total_rows(), 7);
    assert_eq!(counters.matched_rows(), 2);
    // b has no surviving groups and drops out of the plan
    assert_eq!(matched.len(), 1);
    assert_eq!(matched[0].row_groups, vec![1]);
}

#[test]
fn test_zero_row_groups_are_never_scheduled() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_int_segment(dir.path(), "holes.seg", &[&[], &[1, 2], &[], &[3], &[]]);

    let source = Arc::new(LocalSource::new());
    let counters = FilterCounters::default();
    let matched = prune(source.as_ref(), &[path], &[], &counters).unwrap();
    assert_eq!(matched[0].row_groups, vec![1, 3]);

    let plan = ScanPlan::unsorted(matched, OutputLayout::typed(vec!["k".into()]));
    let mut state =
        ExecState::build(source, plan, &ScanConfig::default(), None, None).unwrap();
    assert_eq!(common::collect_keys(&mut state), vec![1, 2, 3]);
}

#[test]
fn test_missing_file_is_a_storage_error() {
    let err = LocalSource::new()
        .open(&PathBuf::from("/nonexistent/path.seg"))
        .unwrap_err();
    assert!(matches!(err, ScanError::Storage { .. }));
}

#[test]
fn test_corrupt_chunk_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_int_segment(dir.path(), "corrupt.seg", &[&[1, 2, 3]]);

    // flip one byte inside the first chunk (chunks start after the magic)
    let mut bytes = fs::read(&path).unwrap();
    bytes[6] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let source = Arc::new(LocalSource::new());
    let handle = source.open(&path).unwrap();
    let meta = SegmentMeta::read_from(handle.as_ref(), &path.to_string_lossy()).unwrap();
    assert_eq!(meta.row_groups.len(), 1);

    let plan = ScanPlan::unsorted(
        vec![segscan::MatchedFile {
            path: path.clone(),
            row_groups: vec![0],
        }],
        OutputLayout::typed(vec!["k".into()]),
    );
    let mut state =
        ExecState::build(source, plan, &ScanConfig::default(), None, None).unwrap();
    let mut record = segscan::Record::new();
    let err = state.next(&mut record).unwrap_err();
    assert!(matches!(err, ScanError::Format { .. }));
}

#[test]
fn test_truncated_footer_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_int_segment(dir.path(), "trunc.seg", &[&[1, 2, 3]]);
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();

    let source = LocalSource::new();
    let handle = source.open(&path).unwrap();
    let err = SegmentMeta::read_from(handle.as_ref(), &path.to_string_lossy()).unwrap_err();
    assert!(matches!(err, ScanError::Format { .. }));
}

#[test]
fn test_unconvertible_constant_is_a_coercion_error() {
    let err = Predicate::bind(
        "k",
        CompareOp::Eq,
        Value::String("five".into()),
        ColumnType::Int64,
    )
    .unwrap_err();
    assert!(matches!(err, ScanError::TypeCoercion { .. }));
}
