/// Prune-then-merge across two files, the whole pipeline in one pass
mod common;

use common::{collect_keys, write_int_segment};
use segscan::{
    prune, ColumnType, CompareOp, ExecState, FilterCounters, LocalSource, OutputLayout, Predicate,
    ScanConfig, ScanPlan, Value,
};
use std::sync::Arc;

#[test]
fn test_prune_then_merge_two_files() {
    let dir = tempfile::tempdir().unwrap();
    // file A: key ranges [1-4] and [5-9]; file B: [0-3] and [6-12]
    let a = write_int_segment(dir.path(), "a.seg", &[&[1, 2, 4], &[5, 7, 9]]);
    let b = write_int_segment(dir.path(), "b.seg", &[&[0, 1, 3], &[6, 8, 12]]);

    let source = Arc::new(LocalSource::new());
    let predicate =
        Predicate::bind("k", CompareOp::Ge, Value::Int64(5), ColumnType::Int64).unwrap();
    let counters = FilterCounters::default();
    let matched = prune(source.as_ref(), &[a, b], &[predicate], &counters).unwrap();

    // only the second group of each file survives
    assert_eq!(matched.len(), 2);
    assert_eq!(matched[0].row_groups, vec![1]);
    assert_eq!(matched[1].row_groups, vec![1]);
    assert_eq!(counters.total_rows(), 12);
    assert_eq!(counters.matched_rows(), 6);

    for max_open_files in [0usize, 1] {
        let plan = ScanPlan::sorted(
            matched.clone(),
            OutputLayout::typed(vec!["k".into()]),
            vec!["k".into()],
        );
        let config = ScanConfig { max_open_files };
        let mut state = ExecState::build(source.clone(), plan, &config, None, None).unwrap();
        let keys: Vec<i64> = collect_keys(&mut state)
            .into_iter()
            .filter(|k| *k >= 5)
            .collect();
        assert_eq!(keys, vec![5, 6, 7, 8, 9, 12]);
    }
}
