use super::*;
use crate::domain::model::TimeRange;
use crate::events::ProgressEvent;
use crate::ports::{Invocation, MockProbePort};
use async_trait::async_trait;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Semaphore;

/// Records every invocation and writes its output file
#[derive(Default)]
struct ScriptedTranscoder {
    calls: Mutex<Vec<Invocation>>,
    fail_single_pass: bool,
    fail_parts: bool,
    lines: Vec<String>,
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedTranscoder {
    fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscodePort for ScriptedTranscoder {
    async fn run(
        &self,
        invocation: &Invocation,
        on_line: &mut (dyn for<'l> FnMut(&'l str) + Send),
    ) -> CutXResult<()> {
        self.calls.lock().unwrap().push(invocation.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let single_pass = invocation.has_arg("-filter_complex");
        if single_pass && self.fail_single_pass {
            return Err(CutXError::transcode("ffmpeg exited with exit status: 1"));
        }
        if !single_pass && invocation.has_arg("-ss") && self.fail_parts {
            return Err(CutXError::transcode("part failed"));
        }
        for line in &self.lines {
            on_line(line);
        }
        std::fs::write(&invocation.output, b"media")?;
        Ok(())
    }
}

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    audit: PathBuf,
    work: PathBuf,
    hub: ProgressHub,
    transcoder: Arc<ScriptedTranscoder>,
    orchestrator: CutOrchestrator,
}

fn fixture(source_duration: f64, transcoder: ScriptedTranscoder) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("talk.mov");
    std::fs::write(&source, b"source").unwrap();
    let audit = dir.path().join("audit").join("delete_segments.json");
    let work = dir.path().join("work");

    let mut probe = MockProbePort::new();
    let probed = source.clone();
    probe.expect_probe_duration().returning(move |path| {
        if path == probed.as_path() {
            Ok(source_duration)
        } else {
            Ok(source_duration / 2.0)
        }
    });

    let settings = CutSettings {
        audit_file: Some(audit.clone()),
        work_dir: Some(work.clone()),
        ..CutSettings::default()
    };
    let hub = ProgressHub::new(1024);
    let transcoder = Arc::new(transcoder);
    let orchestrator = CutOrchestrator::new(
        Arc::new(probe),
        Arc::clone(&transcoder) as Arc<dyn TranscodePort>,
        hub.clone(),
        settings,
    );

    Fixture {
        _dir: dir,
        source,
        audit,
        work,
        hub,
        transcoder,
        orchestrator,
    }
}

fn range(start: f64, end: f64) -> TimeRange {
    TimeRange::new(start, end).unwrap()
}

fn percents(events: &[ProgressEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_single_pass_cut() {
    let fx = fixture(
        10.0,
        ScriptedTranscoder {
            lines: vec![
                "frame=10 time=00:00:02.00 bitrate=1k".to_string(),
                "frame=20 time=00:00:05.00 bitrate=1k".to_string(),
                "frame=30 time=00:00:09.50 bitrate=1k".to_string(),
            ],
            ..Default::default()
        },
    );
    let mut sub = fx.hub.subscribe();

    let outcome = fx
        .orchestrator
        .execute(CutRequest::new(&fx.source, vec![range(2.0, 3.0)], OutputFormat::Mp4))
        .await
        .unwrap();

    assert_eq!(outcome.strategy, ExecutionStrategy::SinglePass);
    assert_eq!(outcome.segments, 2);
    assert_eq!(outcome.output, fx.source.with_file_name("talk_cut.mp4"));
    assert_eq!(outcome.size, 5);
    assert!((outcome.duration - 5.0).abs() < 1e-9);

    let calls = fx.transcoder.calls();
    assert_eq!(calls.len(), 1);
    let graph = calls[0].arg_value("-filter_complex").unwrap();
    assert!(graph.contains("trim=start=0.000:end=1.950"));
    assert!(graph.contains("trim=start=3.050:end=10.000"));

    let events = sub.drain();
    assert_eq!(events[0], ProgressEvent::Connected);
    assert_eq!(events[1], ProgressEvent::Start { total: 2 });
    // kept duration is 8.9s
    assert_eq!(percents(&events), vec![22, 56, 99]);
    assert!(matches!(events.last(), Some(ProgressEvent::Complete { size: 5, .. })));
    assert_eq!(fx.orchestrator.in_flight(), 0);
}

#[tokio::test]
async fn test_full_delete_spawns_nothing() {
    let fx = fixture(10.0, ScriptedTranscoder::default());
    let mut sub = fx.hub.subscribe();

    let err = fx
        .orchestrator
        .execute(CutRequest::new(&fx.source, vec![range(0.0, 10.0)], OutputFormat::Mp4))
        .await
        .unwrap_err();

    assert!(matches!(err, CutXError::Validation { .. }));
    assert!(fx.transcoder.calls().is_empty());
    let events = sub.drain();
    assert_eq!(events.len(), 2);
    assert!(matches!(events[1], ProgressEvent::Error { .. }));
}

#[tokio::test]
async fn test_fragmented_plan_uses_fallback() {
    let fx = fixture(1200.0, ScriptedTranscoder::default());
    let mut sub = fx.hub.subscribe();
    let deletes: Vec<TimeRange> = (1..=119)
        .map(|i| range(i as f64 * 10.0, i as f64 * 10.0 + 1.0))
        .collect();

    let outcome = fx
        .orchestrator
        .execute(CutRequest::new(&fx.source, deletes, OutputFormat::Mp4))
        .await
        .unwrap();
    assert_eq!(outcome.strategy, ExecutionStrategy::Fallback);
    assert_eq!(outcome.segments, 120);

    let calls = fx.transcoder.calls();
    assert_eq!(calls.len(), 121);
    assert!(calls.iter().all(|c| !c.has_arg("-filter_complex")));
    assert!(calls[..120].iter().all(|c| c.has_arg("-ss")));
    assert_eq!(calls[120].arg_value("-f"), Some("concat"));
    assert!(calls[0].output.ends_with("part0000.mp4"));
    assert!(calls[119].output.ends_with("part0119.mp4"));

    let events = sub.drain();
    assert_eq!(events[1], ProgressEvent::Start { total: 120 });
    let progress: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::Progress { current, total, .. } => {
                assert_eq!(*total, 120.0);
                Some(*current)
            }
            _ => None,
        })
        .collect();
    assert_eq!(progress, (1..=120).map(|i| i as f64).collect::<Vec<_>>());
    assert_eq!(events[events.len() - 2], ProgressEvent::Merge);
    assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));

    // parts directory is gone
    let leftovers = std::fs::read_dir(&fx.work).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[tokio::test]
async fn test_single_pass_failure_escalates_once() {
    let fx = fixture(
        10.0,
        ScriptedTranscoder {
            fail_single_pass: true,
            ..Default::default()
        },
    );
    let mut sub = fx.hub.subscribe();

    let outcome = fx
        .orchestrator
        .execute(CutRequest::new(&fx.source, vec![range(2.0, 3.0)], OutputFormat::Mp3))
        .await
        .unwrap();
    assert_eq!(outcome.strategy, ExecutionStrategy::Fallback);
    assert_eq!(outcome.output, fx.source.with_file_name("talk_cut.mp3"));

    let calls = fx.transcoder.calls();
    assert_eq!(calls.iter().filter(|c| c.has_arg("-filter_complex")).count(), 1);
    assert_eq!(calls.len(), 4);
    assert!(calls[1].has_arg("-vn"));

    let events = sub.drain();
    assert!(events.iter().any(|e| matches!(e, ProgressEvent::Info { .. })));
    let p = percents(&events);
    assert!(p.windows(2).all(|w| w[0] <= w[1]));
    assert!(p.iter().all(|&v| v <= 99));
    assert!(matches!(events.last(), Some(ProgressEvent::Complete { .. })));
}

#[tokio::test]
async fn test_part_failure_is_terminal_error() {
    let fx = fixture(
        10.0,
        ScriptedTranscoder {
            fail_single_pass: true,
            fail_parts: true,
            ..Default::default()
        },
    );
    let mut sub = fx.hub.subscribe();

    let err = fx
        .orchestrator
        .execute(CutRequest::new(&fx.source, vec![range(2.0, 3.0)], OutputFormat::Mp4))
        .await
        .unwrap_err();
    assert!(err.is_transcode());
    // no second escalation
    assert_eq!(fx.transcoder.calls().len(), 2);
    assert!(!fx.source.with_file_name("talk_cut.mp4").exists());
    assert_eq!(std::fs::read_dir(&fx.work).unwrap().count(), 0);

    let events = sub.drain();
    assert!(matches!(events.last(), Some(ProgressEvent::Error { .. })));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);
}

#[tokio::test]
async fn test_audit_file_records_request() {
    let fx = fixture(10.0, ScriptedTranscoder::default());
    let deletes = vec![range(4.0, 5.0), range(1.0, 2.0)];
    fx.orchestrator
        .execute(CutRequest::new(&fx.source, deletes.clone(), OutputFormat::Mp4))
        .await
        .unwrap();

    let text = std::fs::read_to_string(&fx.audit).unwrap();
    let recorded: Vec<TimeRange> = serde_json::from_str(&text).unwrap();
    assert_eq!(recorded, deletes);
}

#[tokio::test]
async fn test_missing_source_rejected_before_start() {
    let fx = fixture(10.0, ScriptedTranscoder::default());
    let mut sub = fx.hub.subscribe();
    let err = fx
        .orchestrator
        .submit(CutRequest::new(
            fx.source.with_file_name("absent.mov"),
            vec![],
            OutputFormat::Mp4,
        ))
        .unwrap_err();
    assert!(matches!(err, CutXError::Validation { .. }));
    assert_eq!(sub.drain(), vec![ProgressEvent::Connected]);
}

#[tokio::test]
async fn test_same_output_rejected_while_in_flight() {
    let gate = Arc::new(Semaphore::new(0));
    let fx = fixture(
        10.0,
        ScriptedTranscoder {
            gate: Some(Arc::clone(&gate)),
            ..Default::default()
        },
    );
    let mut sub = fx.hub.subscribe();
    let request = CutRequest::new(&fx.source, vec![range(2.0, 3.0)], OutputFormat::Mp4);

    let accepted = fx.orchestrator.submit(request.clone()).unwrap();
    assert_eq!(accepted.output, fx.source.with_file_name("talk_cut.mp4"));
    let err = fx.orchestrator.submit(request.clone()).unwrap_err();
    assert!(matches!(err, CutXError::JobInFlight { .. }));

    // a different format writes a different file
    fx.orchestrator
        .submit(CutRequest::new(&fx.source, vec![], OutputFormat::Mp3))
        .unwrap();
    assert_eq!(fx.orchestrator.in_flight(), 2);

    gate.add_permits(2);
    let mut completes = 0;
    while completes < 2 {
        let event = tokio::time::timeout(Duration::from_secs(5), sub.recv())
            .await
            .unwrap()
            .unwrap();
        if matches!(event, ProgressEvent::Complete { .. }) {
            completes += 1;
        }
    }

    for _ in 0..100 {
        if fx.orchestrator.in_flight() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(fx.orchestrator.in_flight(), 0);
    assert!(fx.orchestrator.submit(request).is_ok());
}

#[tokio::test]
async fn test_output_dir_setting() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("ep.mp4");
    std::fs::write(&source, b"x").unwrap();
    let exports = dir.path().join("exports");
    std::fs::create_dir(&exports).unwrap();

    let mut probe = MockProbePort::new();
    probe.expect_probe_duration().returning(|_| Ok(4.0));
    let orchestrator = CutOrchestrator::new(
        Arc::new(probe),
        Arc::new(ScriptedTranscoder::default()),
        ProgressHub::default(),
        CutSettings {
            audit_file: None,
            output_dir: Some(exports.clone()),
            ..CutSettings::default()
        },
    );

    let outcome = orchestrator
        .execute(CutRequest::new(&source, vec![range(1.0, 2.0)], OutputFormat::Mp4))
        .await
        .unwrap();
    assert_eq!(outcome.output, exports.join("ep_cut.mp4"));
    assert!(outcome.output.exists());
}
