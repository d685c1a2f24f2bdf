//! End-to-end tests for the context-aware logger.

use std::io::{self, Write};
use std::process::Command;
use std::sync::{Arc, Mutex};

use ctxlog::{Arg, Context, Field, Formatter, LevelFilter, Logger, Output};
use serde::Serialize;
use serde_json::Value;
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn lines(&self) -> Vec<String> {
        let buf = self.0.lock().unwrap();
        String::from_utf8_lossy(&buf).lines().map(str::to_owned).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[derive(Serialize)]
struct TestStruct {
    #[serde(rename = "F1")]
    f1: String,
    #[serde(rename = "F2")]
    f2: i32,
}

fn request_context() -> Context {
    Context::background()
        .with_value("requestId", "request-id")
        .with_value("userId", "user-id")
}

fn emit_all_levels(logger: &Logger, ctx: &Context) {
    logger.debug(ctx, "Debug Message 1", &[]);
    logger.debugf(ctx, "Debug Message {}", &[Arg::from(2)]);
    logger.info(ctx, "Informational Message 1", &[]);
    logger.info(ctx, "Informational Message 2", &[Field::new("field1", "value1")]);
    logger.infof(ctx, "Informational Message {}", &[Arg::from(3)]);
    logger.warn(ctx, "Warning Message 1", &[]);
    logger.warnf(ctx, "Warning Message {}", &[Arg::from(2)]);
    logger.error(ctx, "Error Message 1", &[]);
    logger.errorf(ctx, "Error Message {}", &[Arg::from(2)]);
}

#[test]
fn test_simple_formatter_at_debug() {
    let capture = Capture::default();
    let logger = Logger::new(Formatter::Simple, LevelFilter::DEBUG, ["requestId", "userId"])
        .with_writer(capture.clone());

    emit_all_levels(&logger, &request_context());

    let suffix = " | requestId=request-id | userId=user-id";
    assert_eq!(
        capture.lines(),
        vec![
            format!("Debug Message 1{suffix}"),
            format!("Debug Message 2{suffix}"),
            format!("Informational Message 1{suffix}"),
            format!("Informational Message 2{suffix} | field1=value1"),
            format!("Informational Message 3{suffix}"),
            format!("Warning Message 1{suffix}"),
            format!("Warning Message 2{suffix}"),
            format!("Error Message 1{suffix}"),
            format!("Error Message 2{suffix}"),
        ]
    );
}

#[test]
fn test_text_formatter_at_info() {
    let capture = Capture::default();
    let logger = Logger::new(Formatter::from_name("TEXT"), LevelFilter::INFO, ["requestId", "userId"])
        .with_writer(capture.clone());

    emit_all_levels(&logger, &request_context());

    let lines = capture.lines();
    assert_eq!(lines.len(), 7);
    assert!(lines.iter().all(|line| line.starts_with("time=\"")));
    assert!(lines[0].ends_with(
        "level=info msg=\"Informational Message 1\" requestId=request-id userId=user-id"
    ));
    assert!(lines[1].ends_with("field1=value1 requestId=request-id userId=user-id"));
    assert!(lines[3].contains("level=warning"));
    assert!(lines[6].contains("level=error msg=\"Error Message 2\""));
}

#[test]
fn test_json_formatter_at_debug() {
    let capture = Capture::default();
    let logger = Logger::new(Formatter::Json, LevelFilter::DEBUG, ["requestId", "userId"])
        .with_writer(capture.clone());

    emit_all_levels(&logger, &request_context());

    let entries: Vec<Value> = capture
        .lines()
        .iter()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(entries.len(), 9);
    for entry in &entries {
        assert_eq!(entry["requestId"], "request-id");
        assert_eq!(entry["userId"], "user-id");
        assert!(entry["time"].is_string());
    }
    assert_eq!(entries[0]["level"], "debug");
    assert_eq!(entries[1]["msg"], "Debug Message 2");
    assert_eq!(entries[3]["field1"], "value1");
    assert_eq!(entries[5]["level"], "warning");
    assert_eq!(entries[8]["level"], "error");
}

#[test]
fn test_empty_context_adds_no_fields() {
    let capture = Capture::default();
    let logger = Logger::new(Formatter::Json, LevelFilter::INFO, ["requestId", "userId"])
        .with_writer(capture.clone());

    emit_all_levels(&logger, &Context::background());

    let lines = capture.lines();
    assert_eq!(lines.len(), 7);
    for line in lines {
        let entry: Value = serde_json::from_str(&line).unwrap();
        let mut keys: Vec<&str> = entry.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        if entry["msg"] == "Informational Message 2" {
            assert_eq!(keys, vec!["field1", "level", "msg", "time"]);
        } else {
            assert_eq!(keys, vec!["level", "msg", "time"]);
        }
    }
}

#[test]
fn test_structured_arguments_are_json_encoded() {
    let capture = Capture::default();
    let logger = Logger::new(Formatter::Simple, LevelFilter::INFO, ["requestId"])
        .with_writer(capture.clone());
    let payload = TestStruct {
        f1: "hello".to_string(),
        f2: 2,
    };
    let err = io::Error::new(io::ErrorKind::Other, "connection reset");

    logger.infof(
        &request_context(),
        "payload={} retries={} cause={}",
        &[Arg::json(&payload), Arg::from(3u8), Arg::error(&err)],
    );

    assert_eq!(
        capture.lines(),
        vec![r#"payload={"F1":"hello","F2":2} retries=3 cause=connection reset | requestId=request-id"#]
    );
}

#[test]
fn test_explicit_field_overrides_context() {
    let capture = Capture::default();
    let logger = Logger::new(Formatter::Json, LevelFilter::INFO, ["requestId", "userId"])
        .with_writer(capture.clone());
    let err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");

    logger.error(
        &request_context(),
        "lookup failed",
        &[Field::new("userId", "override"), Field::new("error", Arg::error(&err))],
    );

    let entry: Value = serde_json::from_str(&capture.lines()[0]).unwrap();
    assert_eq!(entry["userId"], "override");
    assert_eq!(entry["requestId"], "request-id");
    assert_eq!(entry["error"], "access denied");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_logging_keeps_lines_intact() {
    let capture = Capture::default();
    let logger = Arc::new(
        Logger::new(Formatter::Json, LevelFilter::INFO, ["requestId"]).with_writer(capture.clone()),
    );

    let mut handles = Vec::new();
    for i in 0..32 {
        let logger = Arc::clone(&logger);
        handles.push(tokio::spawn(async move {
            let ctx = Context::background().with_value("requestId", format!("request-{i}"));
            logger.infof(&ctx, "task {} finished", &[Arg::from(i)]);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut ids: Vec<String> = capture
        .lines()
        .iter()
        .map(|line| {
            let entry: Value = serde_json::from_str(line).unwrap();
            entry["requestId"].as_str().unwrap().to_owned()
        })
        .collect();
    ids.sort();
    let mut expected: Vec<String> = (0..32).map(|i| format!("request-{i}")).collect();
    expected.sort();
    assert_eq!(ids, expected);
}

const FATAL_CHILD_ENV: &str = "CTXLOG_FATAL_CHILD";

#[test]
fn test_fatal_logs_then_exits() {
    if std::env::var_os(FATAL_CHILD_ENV).is_some() {
        let logger = Logger::new(Formatter::Simple, LevelFilter::INFO, ["requestId"])
            .with_output(Output::Stdout);
        let err = io::Error::new(io::ErrorKind::Other, "unrecoverable state");
        logger.fatal(&request_context(), &err);
    }

    let exe = std::env::current_exe().unwrap();
    let output = Command::new(exe)
        .args(["test_fatal_logs_then_exits", "--exact", "--nocapture", "--test-threads=1"])
        .env(FATAL_CHILD_ENV, "1")
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("unrecoverable state | requestId=request-id\n"));
}
