use super::*;

#[test]
fn test_source_tags() {
    assert_eq!(TaskSource::from("telegram"), TaskSource::Telegram);
    assert_eq!(TaskSource::from("cron"), TaskSource::Cron);
    assert_eq!(
        TaskSource::from("matrix"),
        TaskSource::Other("matrix".to_string())
    );
    assert_eq!(TaskSource::Heartbeat.to_string(), "heartbeat");
    assert_eq!(TaskSource::Other("irc".into()).to_string(), "irc");
}

#[test]
fn test_source_serialization() {
    let json = serde_json::to_string(&TaskSource::Discord).unwrap();
    assert_eq!(json, "\"discord\"");

    let source: TaskSource = serde_json::from_str("\"whatsapp\"").unwrap();
    assert_eq!(source, TaskSource::Other("whatsapp".to_string()));

    let source: TaskSource = serde_json::from_str("\"slack\"").unwrap();
    assert_eq!(source, TaskSource::Slack);
}

#[test]
fn test_copied_task_owns_its_payload() {
    let mut buffer = b"hello".to_vec();
    let task = Task::copied("t1", &buffer, "telegram").unwrap();

    buffer.clear();
    buffer.extend_from_slice(b"reused");

    assert_eq!(task.data, b"hello");
    assert_eq!(task.data_lossy(), "hello");
    assert_eq!(task.source, TaskSource::Telegram);
    assert_eq!(task.id, "t1");
}

#[test]
fn test_copy_payload_empty() {
    assert!(copy_payload(&[]).unwrap().is_empty());
    assert_eq!(copy_str("abc").unwrap(), "abc");
}
