use super::*;

fn every(id: &str, interval_ms: u64, now_ms: i64) -> CronJob {
    CronJob::new(id, id, format!("{} message", id), CronSchedule::every(interval_ms), now_ms)
}

/// Fire everything due at `now_ms` the way the timer does
fn fire_until_idle(table: &CronTable, now_ms: i64) -> Vec<(String, i64)> {
    let mut fired = Vec::new();
    loop {
        let due = table.due_jobs(now_ms);
        if due.is_empty() {
            return fired;
        }
        for job in due {
            if table.mark_triggered(&job.id, job.scheduled_ms) {
                fired.push((job.id, job.scheduled_ms));
            }
        }
    }
}

#[test]
fn test_schedule_from_parts_requires_exactly_one() {
    assert_eq!(
        CronSchedule::from_parts(Some(1000), None).unwrap(),
        CronSchedule::every(1000)
    );
    assert_eq!(
        CronSchedule::from_parts(None, Some(500)).unwrap(),
        CronSchedule::once(500)
    );
    assert!(matches!(
        CronSchedule::from_parts(Some(1000), Some(500)),
        Err(Error::InvalidSchedule(_))
    ));
    assert!(matches!(
        CronSchedule::from_parts(None, None),
        Err(Error::InvalidSchedule(_))
    ));
}

#[test]
fn test_validate_rejects_zero_interval_and_past_once() {
    assert!(CronSchedule::every(0).validate(0).is_err());
    assert!(CronSchedule::once(100).validate(100).is_err());
    assert!(CronSchedule::once(101).validate(100).is_ok());
    assert!(CronSchedule::every(1).validate(i64::MAX).is_ok());
}

#[test]
fn test_duplicate_job_rejected() {
    let table = CronTable::new();
    table.add(every("daily", 1000, 0), 0).unwrap();

    let err = table.add(every("daily", 2000, 0), 0).unwrap_err();
    assert!(matches!(err, Error::DuplicateJob(id) if id == "daily"));
    assert_eq!(table.get("daily").unwrap().schedule, CronSchedule::every(1000));
}

#[test]
fn test_invalid_add_leaves_table_unchanged() {
    let table = CronTable::new();
    assert!(table.add(every("zero", 0, 0), 0).is_err());
    assert!(table.add(every("", 100, 0), 0).is_err());
    assert!(table.is_empty());
}

#[test]
fn test_remove_missing_is_noop() {
    let table = CronTable::new();
    assert!(!table.remove("missing"));

    table.add(every("job", 100, 0), 0).unwrap();
    assert!(table.remove("job"));
    assert!(!table.remove("job"));
}

#[test]
fn test_due_jobs_does_not_mutate() {
    let table = CronTable::new();
    table.add(every("job", 1000, 0), 0).unwrap();

    assert!(table.due_jobs(999).is_empty());
    assert_eq!(table.due_jobs(1000).len(), 1);
    assert_eq!(table.due_jobs(1000).len(), 1);
    assert_eq!(table.get("job").unwrap().run_count, 0);
}

#[test]
fn test_every_keeps_phase() {
    let table = CronTable::new();
    table.add(every("tick", 1000, 0), 0).unwrap();

    let fired = fire_until_idle(&table, 2500);
    assert_eq!(
        fired,
        vec![("tick".to_string(), 1000), ("tick".to_string(), 2000)]
    );

    let job = table.get("tick").unwrap();
    assert_eq!(job.next_run_ms, 3000);
    assert_eq!(job.run_count, 2);
    assert_eq!(job.last_run_ms, Some(2000));
}

#[test]
fn test_once_fires_exactly_once() {
    let table = CronTable::new();
    table
        .add(CronJob::new("remind", "remind", "stand up", CronSchedule::once(500), 0), 0)
        .unwrap();

    assert_eq!(fire_until_idle(&table, 500).len(), 1);
    assert!(fire_until_idle(&table, 1500).is_empty());

    let job = table.get("remind").unwrap();
    assert!(!job.enabled);
    assert_eq!(job.run_count, 1);
    assert_eq!(table.next_due(), None);
}

#[test]
fn test_mark_triggered_rejects_stale_slot() {
    let table = CronTable::new();
    table.add(every("job", 100, 0), 0).unwrap();

    assert!(table.mark_triggered("job", 100));
    assert!(!table.mark_triggered("job", 100));
    assert!(!table.mark_triggered("missing", 100));
}

#[test]
fn test_take_due_claims_each_slot_once() {
    let table = CronTable::new();
    table.add(every("a", 1000, 0), 0).unwrap();
    table.add(every("b", 400, 0), 0).unwrap();
    table.add(every("idle", 1000, 0), 0).unwrap();
    table.set_enabled("idle", false, 0).unwrap();

    let claimed: Vec<(String, i64)> = table
        .take_due(1000, 64)
        .into_iter()
        .map(|job| (job.id, job.scheduled_ms))
        .collect();
    assert_eq!(
        claimed,
        vec![
            ("b".to_string(), 400),
            ("b".to_string(), 800),
            ("a".to_string(), 1000),
        ]
    );
    assert!(table.take_due(1000, 64).is_empty());
    assert_eq!(table.get("b").unwrap().next_run_ms, 1200);
    assert_eq!(table.get("idle").unwrap().run_count, 0);
}

#[test]
fn test_take_due_caps_slots_per_job() {
    let table = CronTable::new();
    table.add(every("fast", 10, 0), 0).unwrap();

    assert_eq!(table.take_due(1000, 5).len(), 5);
    assert_eq!(table.get("fast").unwrap().next_run_ms, 60);
    assert_eq!(table.next_due(), Some(60));

    let mut total = 5;
    loop {
        let claimed = table.take_due(1000, 5).len();
        if claimed == 0 {
            break;
        }
        total += claimed;
    }
    assert_eq!(total, 100);
    assert_eq!(table.get("fast").unwrap().next_run_ms, 1010);
}

#[test]
fn test_release_restores_unqueued_slots() {
    let table = CronTable::new();
    table.add(every("tick", 100, 0), 0).unwrap();
    table
        .add(CronJob::new("once", "once", "ping", CronSchedule::once(50), 0), 0)
        .unwrap();

    assert_eq!(table.take_due(300, 64).len(), 4);
    assert!(table.release("tick", 200, 2));
    assert!(table.release("once", 50, 1));

    let tick = table.get("tick").unwrap();
    assert_eq!(tick.next_run_ms, 200);
    assert_eq!(tick.run_count, 1);
    assert_eq!(tick.last_run_ms, Some(100));

    let once = table.get("once").unwrap();
    assert!(once.enabled);
    assert_eq!(once.run_count, 0);
    assert_eq!(once.last_run_ms, None);

    let again: Vec<(String, i64)> = table
        .take_due(300, 64)
        .into_iter()
        .map(|job| (job.id, job.scheduled_ms))
        .collect();
    assert_eq!(
        again,
        vec![
            ("once".to_string(), 50),
            ("tick".to_string(), 200),
            ("tick".to_string(), 300),
        ]
    );
}

#[test]
fn test_release_ignores_removed_or_disabled_jobs() {
    let table = CronTable::new();
    table.add(every("gone", 100, 0), 0).unwrap();
    table.add(every("off", 100, 0), 0).unwrap();

    assert_eq!(table.take_due(100, 64).len(), 2);
    table.remove("gone");
    table.set_enabled("off", false, 100).unwrap();

    assert!(!table.release("gone", 100, 1));
    assert!(!table.release("off", 100, 1));
    assert!(!table.get("off").unwrap().enabled);
    assert_eq!(table.next_due(), None);
}

#[test]
fn test_disabled_jobs_never_due() {
    let table = CronTable::new();
    table.add(every("job", 100, 0), 0).unwrap();
    table.set_enabled("job", false, 0).unwrap();

    assert!(table.due_jobs(10_000).is_empty());
    assert_eq!(table.next_due(), None);

    table.set_enabled("job", true, 10_000).unwrap();
    assert_eq!(table.get("job").unwrap().next_run_ms, 10_100);
    assert!(table.set_enabled("missing", true, 0).is_err());
}

#[test]
fn test_due_jobs_ordered_by_time_then_id() {
    let table = CronTable::new();
    table.add(every("b", 100, 0), 0).unwrap();
    table.add(every("a", 100, 0), 0).unwrap();
    table.add(every("c", 50, 0), 0).unwrap();

    let ids: Vec<_> = table.due_jobs(100).into_iter().map(|d| d.id).collect();
    assert_eq!(ids, vec!["c", "a", "b"]);
}

#[test]
fn test_definition_serialization() {
    let json = r#"[
        {"id": "a", "name": "Morning", "message": "summarize inbox", "schedule": {"every_ms": 60000}},
        {"id": "b", "name": "Once", "message": "ping", "schedule": {"at_ms": 5000}, "enabled": false}
    ]"#;
    let defs: Vec<CronJobDefinition> = serde_json::from_str(json).unwrap();
    assert_eq!(defs[0].schedule, CronSchedule::every(60_000));
    assert!(defs[0].enabled);
    assert_eq!(defs[1].schedule, CronSchedule::once(5000));
    assert!(!defs[1].enabled);

    let out = serde_json::to_value(&defs[0]).unwrap();
    assert_eq!(out["schedule"]["every_ms"], 60_000);
    assert!(out["schedule"].get("at_ms").is_none());
}

#[test]
fn test_definition_with_both_fields_rejected() {
    let json = r#"{"id": "x", "name": "x", "message": "", "schedule": {"every_ms": 1, "at_ms": 2}}"#;
    assert!(serde_json::from_str::<CronJobDefinition>(json).is_err());
}

#[test]
fn test_snapshot_sorted() {
    let table = CronTable::new();
    table.add(every("z", 100, 0), 0).unwrap();
    table.add(every("m", 100, 0), 0).unwrap();

    let ids: Vec<_> = table.snapshot().into_iter().map(|j| j.id).collect();
    assert_eq!(ids, vec!["m", "z"]);
    assert_eq!(table.clear(), 2);
    assert!(table.is_empty());
}
