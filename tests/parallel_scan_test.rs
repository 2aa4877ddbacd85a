/// Cross-worker row-group distribution through the parallel coordinator
mod common;

use common::write_int_segment;
use segscan::{
    ExecState, LocalSource, MatchedFile, OutputLayout, ParallelCoordinator, ReadOutcome, Record,
    ScanConfig, ScanPlan, Value,
};
use std::sync::Arc;
use std::thread;

fn drain_keys(state: &mut ExecState) -> Vec<i64> {
    let mut keys = Vec::new();
    let mut record = Record::new();
    loop {
        match state.next(&mut record).unwrap() {
            ReadOutcome::Success => {
                let Value::Int64(v) = record.values[0] else {
                    panic!("expected Int64 key");
                };
                keys.push(v);
            }
            ReadOutcome::EndOfData => return keys,
            ReadOutcome::Inactive => panic!("strategy leaked Inactive to the caller"),
        }
    }
}

#[test]
fn test_two_workers_cover_all_row_groups_once() {
    let dir = tempfile::tempdir().unwrap();
    // file A: 5 row groups, file B: 1 row group
    let a = write_int_segment(
        dir.path(),
        "a.seg",
        &[&[1, 2], &[3], &[4, 5], &[6], &[7, 8]],
    );
    let b = write_int_segment(dir.path(), "b.seg", &[&[9, 10]]);
    let matched = vec![
        MatchedFile {
            path: a,
            row_groups: vec![0, 1, 2, 3, 4],
        },
        MatchedFile {
            path: b,
            row_groups: vec![0],
        },
    ];

    assert!(ParallelCoordinator::estimate_shared_state_size(2) > 0);
    let coordinator = ParallelCoordinator::init_shared_state(vec![5, 1]);

    let mut workers = Vec::new();
    for _ in 0..2 {
        let coordinator = ParallelCoordinator::attach(&coordinator);
        let matched = matched.clone();
        workers.push(thread::spawn(move || {
            let plan = ScanPlan::unsorted(matched, OutputLayout::typed(vec!["k".into()]));
            let mut state = ExecState::build(
                Arc::new(LocalSource::new()),
                plan,
                &ScanConfig::default(),
                Some(coordinator),
                None,
            )
            .unwrap();
            drain_keys(&mut state)
        }));
    }

    let mut all: Vec<i64> = Vec::new();
    for worker in workers {
        all.extend(worker.join().unwrap());
    }
    all.sort_unstable();
    assert_eq!(all, (1..=10).collect::<Vec<i64>>());
}

#[test]
fn test_single_file_workers_share_row_groups() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_int_segment(dir.path(), "solo.seg", &[&[1], &[2], &[3], &[4]]);
    let matched = vec![MatchedFile {
        path: a,
        row_groups: vec![0, 1, 2, 3],
    }];

    let coordinator = ParallelCoordinator::init_shared_state(vec![4]);
    let mut workers = Vec::new();
    for _ in 0..2 {
        let coordinator = ParallelCoordinator::attach(&coordinator);
        let matched = matched.clone();
        workers.push(thread::spawn(move || {
            let plan = ScanPlan::unsorted(matched, OutputLayout::typed(vec!["k".into()]));
            let mut state = ExecState::build(
                Arc::new(LocalSource::new()),
                plan,
                &ScanConfig::default(),
                Some(coordinator),
                None,
            )
            .unwrap();
            drain_keys(&mut state)
        }));
    }

    let mut all: Vec<i64> = Vec::new();
    for worker in workers {
        all.extend(worker.join().unwrap());
    }
    all.sort_unstable();
    assert_eq!(all, vec![1, 2, 3, 4]);
}

#[test]
fn test_sorted_merge_rejects_coordinator() {
    let dir = tempfile::tempdir().unwrap();
    let a = write_int_segment(dir.path(), "s.seg", &[&[1]]);
    let plan = ScanPlan::sorted(
        vec![MatchedFile {
            path: a,
            row_groups: vec![0],
        }],
        OutputLayout::typed(vec!["k".into()]),
        vec!["k".into()],
    );
    let coordinator = ParallelCoordinator::init_shared_state(vec![1]);
    let err = ExecState::build(
        Arc::new(LocalSource::new()),
        plan,
        &ScanConfig::default(),
        Some(coordinator),
        None,
    )
    .unwrap_err();
    assert!(matches!(err, segscan::ScanError::Consistency { .. }));
}
