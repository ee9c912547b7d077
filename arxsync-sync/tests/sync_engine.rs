//! End-to-end behaviour of the sync engine against a scripted source.

use std::collections::{HashMap, VecDeque};

use arxsync_core::{MemoryStore, Page, PageSource, Query, Record, RecordId, RecordStore, SourceError};
use arxsync_sync::merge::merge_page;
use arxsync_sync::{
    BackoffRetrier, Delay, Pacer, RetryConfig, RunOutcome, RunParams, StopReason, SyncEngine,
    SyncError,
};
use chrono::{DateTime, TimeZone, Utc};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Clone)]
enum Reply {
    Page(Page),
    Fail,
}

/// Per-offset scripted replies. The last reply for an offset repeats;
/// unscripted offsets answer with an empty page.
#[derive(Default)]
struct ScriptedSource {
    replies: HashMap<u64, VecDeque<Reply>>,
    calls: Vec<u64>,
}

impl ScriptedSource {
    fn page_at(mut self, offset: u64, page: Page) -> Self {
        self.replies
            .entry(offset)
            .or_default()
            .push_back(Reply::Page(page));
        self
    }

    fn fail_at(mut self, offset: u64) -> Self {
        self.replies.entry(offset).or_default().push_back(Reply::Fail);
        self
    }

    fn calls_at(&self, offset: u64) -> usize {
        self.calls.iter().filter(|&&o| o == offset).count()
    }
}

impl PageSource for ScriptedSource {
    fn fetch(&mut self, _: &Query, offset: u64, _: usize) -> Result<Page, SourceError> {
        self.calls.push(offset);
        let reply = match self.replies.get_mut(&offset) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        match reply {
            Some(Reply::Page(page)) => Ok(page),
            Some(Reply::Fail) => Err(SourceError::Http {
                url: format!("http://fake/?start={offset}"),
                reason: "503 Service Unavailable".into(),
            }),
            None => Ok(Page::default()),
        }
    }
}

#[derive(Default)]
struct RecordingPacer(Vec<Delay>);

impl RecordingPacer {
    fn count(&self, delay: Delay) -> usize {
        self.0.iter().filter(|&&d| d == delay).count()
    }
}

impl Pacer for RecordingPacer {
    fn pause(&mut self, delay: Delay) {
        self.0.push(delay);
    }
}

const SUCCESS_PAUSE: Delay = Delay::fixed(std::time::Duration::from_millis(500));

fn page_pause() -> Delay {
    Delay::from_millis(1_000, 3_000)
}

fn backoff() -> Delay {
    Delay::from_millis(2_000, 4_000)
}

fn retrier(max_attempts: u32) -> BackoffRetrier {
    BackoffRetrier::new(
        RetryConfig::new(max_attempts)
            .with_backoff(backoff())
            .with_success_pause(SUCCESS_PAUSE),
    )
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_600_000_000 + secs, 0).single().unwrap()
}

fn records(prefix: &str, n: usize, secs: i64) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new(format!("{prefix}.{i:05}"), at(secs)).with_field("title", format!("{prefix} {i}")))
        .collect()
}

fn page(prefix: &str, n: usize, secs: i64) -> Page {
    Page::new(records(prefix, n, secs))
}

fn run(
    source: &mut ScriptedSource,
    store: &mut MemoryStore,
    pacer: &mut RecordingPacer,
    params: &RunParams,
) -> Result<arxsync_sync::RunSummary, SyncError> {
    SyncEngine::new(source, store, pacer)
        .with_retrier(retrier(5))
        .with_page_pause(page_pause())
        .run(params)
}

// ---------------------------------------------------------------------------
// Merge properties
// ---------------------------------------------------------------------------

#[test]
fn merging_the_same_page_twice_is_idempotent() {
    let p = page("2101", 20, 10);
    let mut store = MemoryStore::new();

    let first = merge_page(&mut store, &p).unwrap();
    let snapshot = store.clone();
    let second = merge_page(&mut store, &p).unwrap();

    assert_eq!(first.new, 20);
    assert_eq!((second.had, second.new, second.replaced), (20, 0, 0));
    let mut before: Vec<_> = snapshot.records().cloned().map(|r| (r.id.clone(), r)).collect();
    let mut after: Vec<_> = store.records().cloned().map(|r| (r.id.clone(), r)).collect();
    before.sort_by(|a, b| a.0.cmp(&b.0));
    after.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(before, after);
}

#[rstest]
#[case(&[10, 20, 30])]
#[case(&[30, 20, 10])]
#[case(&[20, 30, 10])]
#[case(&[10, 10, 10])]
#[case(&[30, 10, 30, 20])]
fn stored_time_is_max_seen(#[case] times: &[i64]) {
    let mut store = MemoryStore::new();
    for (n, &secs) in times.iter().enumerate() {
        let record = Record::new("2101.00001", at(secs)).with_field("seen", n as u64);
        merge_page(&mut store, &Page::new(vec![record])).unwrap();
    }
    let stored = store.get(&RecordId::from("2101.00001")).unwrap().unwrap();
    let max = times.iter().copied().max().unwrap();
    assert_eq!(stored.time, at(max));
    // Ties keep the first copy seen at that time.
    let first_at_max = times.iter().position(|&t| t == max).unwrap() as u64;
    assert_eq!(stored.payload["seen"], first_at_max);
}

#[test]
fn page_counts_add_up_to_page_length() {
    let mut store = MemoryStore::with_records(vec![
        Record::new("a", at(5)),  // newer copy incoming -> replaced
        Record::new("b", at(50)), // stored is newer -> had
        Record::new("c", at(7)),  // equal -> had
    ]);
    let incoming = Page::new(vec![
        Record::new("a", at(9)),
        Record::new("b", at(10)),
        Record::new("c", at(7)),
        Record::new("d", at(1)),
        Record::new("e", at(1)),
    ]);
    let counts = merge_page(&mut store, &incoming).unwrap();
    assert_eq!((counts.had, counts.new, counts.replaced), (2, 2, 1));
    assert_eq!(counts.total(), incoming.len());
    assert_eq!(store.len(), 5);
}

// ---------------------------------------------------------------------------
// Termination
// ---------------------------------------------------------------------------

#[rstest]
#[case(1)]
#[case(2)]
#[case(3)]
#[case(5)]
fn stops_after_exactly_break_after_empty_pages(#[case] break_after: u32) {
    // Offset 0 is fresh; every later page is already stored.
    let mut source = ScriptedSource::default().page_at(0, page("new", 4, 100));
    let mut known = Vec::new();
    for n in 1..=10u64 {
        let p = page(&format!("old{n}"), 4, 1);
        known.extend(p.records.clone());
        source = source.page_at(n * 4, p);
    }
    let mut store = MemoryStore::with_records(known);
    let mut pacer = RecordingPacer::default();
    let params = RunParams::new("q")
        .with_page_size(4)
        .with_max_count(400)
        .with_break_after(break_after);

    let summary = run(&mut source, &mut store, &mut pacer, &params).unwrap();

    assert_eq!(summary.pages, 1 + break_after as usize);
    assert_eq!(summary.stop_reason, StopReason::CaughtUp { streak: break_after });
    assert_eq!(summary.final_offset, 4 * u64::from(break_after));
    assert_eq!(source.calls.len(), 1 + break_after as usize);
}

#[test]
fn max_count_caps_run_before_break_after() {
    let mut source = ScriptedSource::default().page_at(0, page("new", 4, 100));
    let mut known = Vec::new();
    for n in 1..=10u64 {
        let p = page(&format!("old{n}"), 4, 1);
        known.extend(p.records.clone());
        source = source.page_at(n * 4, p);
    }
    let mut store = MemoryStore::with_records(known);
    let mut pacer = RecordingPacer::default();
    let params = RunParams::new("q")
        .with_page_size(4)
        .with_max_count(12)
        .with_break_after(5);

    let summary = run(&mut source, &mut store, &mut pacer, &params).unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.stop_reason, StopReason::RangeExhausted);
    assert_eq!(source.calls, vec![0, 4, 8]);
}

#[test]
fn break_after_zero_never_stops_early() {
    let mut source = ScriptedSource::default().page_at(0, page("new", 4, 100));
    let mut known = Vec::new();
    for n in 1..=10u64 {
        let p = page(&format!("old{n}"), 4, 1);
        known.extend(p.records.clone());
        source = source.page_at(n * 4, p);
    }
    let mut store = MemoryStore::with_records(known);
    let mut pacer = RecordingPacer::default();
    let params = RunParams::new("q")
        .with_page_size(4)
        .with_max_count(44)
        .with_break_after(0);

    let summary = run(&mut source, &mut store, &mut pacer, &params).unwrap();
    assert_eq!(summary.pages, 11);
    assert_eq!(summary.stop_reason, StopReason::RangeExhausted);
}

#[rstest]
#[case(0)]
#[case(3)]
#[case(50)]
fn known_first_page_stops_regardless_of_break_after(#[case] break_after: u32) {
    let first = page("known", 4, 1);
    let mut store = MemoryStore::with_records(first.records.clone());
    let mut source = ScriptedSource::default()
        .page_at(8, first)
        .page_at(12, page("fresh", 4, 100));
    let mut pacer = RecordingPacer::default();
    let params = RunParams::new("q")
        .with_start(8)
        .with_page_size(4)
        .with_max_count(100)
        .with_break_after(break_after);

    let summary = run(&mut source, &mut store, &mut pacer, &params).unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.stop_reason, StopReason::FirstPageKnown);
    assert_eq!(summary.outcome(), RunOutcome::NoChanges);
    assert_eq!(source.calls, vec![8]);
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn all_new_page_is_inserted_and_run_continues() {
    let mut source = ScriptedSource::default()
        .page_at(0, page("p0", 100, 10))
        .page_at(100, page("p1", 100, 5));
    let mut store = MemoryStore::new();
    let mut pacer = RecordingPacer::default();
    let params = RunParams::new("q").with_page_size(100).with_max_count(200);

    let summary = run(&mut source, &mut store, &mut pacer, &params).unwrap();

    assert_eq!(source.calls, vec![0, 100]);
    assert_eq!(summary.totals.new, 200);
    assert_eq!(summary.total_updated, 200);
    assert_eq!(store.len(), 200);
    assert_eq!(summary.stop_reason, StopReason::RangeExhausted);
}

#[rstest]
#[case::equal_times(10)]
#[case::stored_newer(20)]
fn fully_known_first_page_is_all_had(#[case] stored_secs: i64) {
    let mut store = MemoryStore::with_records(records("p0", 100, stored_secs));
    let mut source = ScriptedSource::default().page_at(0, page("p0", 100, 10));
    let mut pacer = RecordingPacer::default();
    let params = RunParams::new("q").with_page_size(100).with_max_count(1_000);

    let summary = run(&mut source, &mut store, &mut pacer, &params).unwrap();

    assert_eq!(summary.totals.had, 100);
    assert_eq!(summary.totals.new, 0);
    assert_eq!(summary.totals.replaced, 0);
    assert_eq!(summary.pages, 1);
    // Stored copies are untouched.
    let stored = store.get(&RecordId::from("p0.00000")).unwrap().unwrap();
    assert_eq!(stored.time, at(stored_secs));
}

#[test]
fn three_known_pages_after_fresh_one_stop_the_run() {
    let mut known = Vec::new();
    let mut source = ScriptedSource::default().page_at(0, page("fresh", 100, 50));
    for offset in [100u64, 200, 300, 400] {
        let p = page(&format!("o{offset}"), 100, 1);
        known.extend(p.records.clone());
        source = source.page_at(offset, p);
    }
    let mut store = MemoryStore::with_records(known);
    let mut pacer = RecordingPacer::default();
    let params = RunParams::new("q")
        .with_page_size(100)
        .with_max_count(1_000)
        .with_break_after(3);

    let summary = run(&mut source, &mut store, &mut pacer, &params).unwrap();

    assert_eq!(source.calls, vec![0, 100, 200, 300]);
    assert_eq!(summary.final_offset, 300);
    assert_eq!(summary.totals.had, 300);
    assert_eq!(summary.total_updated, 100);
    assert_eq!(summary.stop_reason, StopReason::CaughtUp { streak: 3 });
}

// ---------------------------------------------------------------------------
// Retry and pacing
// ---------------------------------------------------------------------------

#[rstest]
#[case(1)]
#[case(2)]
#[case(7)]
fn failing_first_page_exhausts_after_max_attempts(#[case] max_attempts: u32) {
    let mut source = ScriptedSource::default().fail_at(0);
    let mut store = MemoryStore::new();
    let mut pacer = RecordingPacer::default();

    let err = SyncEngine::new(&mut source, &mut store, &mut pacer)
        .with_retrier(retrier(max_attempts))
        .run(&RunParams::new("q").with_page_size(4))
        .unwrap_err();

    assert!(matches!(err, SyncError::FetchExhausted { offset: 0, attempts, .. } if attempts == max_attempts));
    assert_eq!(source.calls_at(0), max_attempts as usize);
    assert_eq!(pacer.count(backoff()), max_attempts as usize - 1);
    assert!(store.is_empty());
}

#[test]
fn exhausted_page_mid_run_keeps_earlier_merges() {
    let mut source = ScriptedSource::default()
        .page_at(0, page("p0", 4, 10))
        .fail_at(4);
    let mut store = MemoryStore::new();
    let mut pacer = RecordingPacer::default();

    let err = SyncEngine::new(&mut source, &mut store, &mut pacer)
        .with_retrier(retrier(3))
        .run(&RunParams::new("q").with_page_size(4).with_max_count(40))
        .unwrap_err();

    assert!(matches!(err, SyncError::FetchExhausted { offset: 4, .. }));
    assert_eq!(store.len(), 4);
    assert_eq!(source.calls_at(4), 3);
}

#[test]
fn transient_failures_are_invisible_to_the_run() {
    let mut source = ScriptedSource::default()
        .fail_at(0)
        .page_at(0, page("short", 2, 10))
        .page_at(0, page("p0", 4, 10));
    let mut store = MemoryStore::new();
    let mut pacer = RecordingPacer::default();

    let summary = run(
        &mut source,
        &mut store,
        &mut pacer,
        &RunParams::new("q").with_page_size(4).with_max_count(4),
    )
    .unwrap();

    assert_eq!(source.calls_at(0), 3);
    // The short page was retried, not merged.
    assert_eq!(summary.totals.new, 4);
    assert!(!store.contains(&RecordId::from("short.00000")));
    assert_eq!(pacer.count(backoff()), 2);
}

#[test]
fn short_tail_page_within_reported_total_is_accepted() {
    let mut source = ScriptedSource::default()
        .page_at(0, page("p0", 4, 10).with_total_results(6))
        .page_at(4, page("p1", 2, 10).with_total_results(6));
    let mut store = MemoryStore::new();
    let mut pacer = RecordingPacer::default();

    let summary = run(
        &mut source,
        &mut store,
        &mut pacer,
        &RunParams::new("q").with_page_size(4).with_max_count(100),
    )
    .unwrap();

    assert_eq!(source.calls, vec![0, 4]);
    assert_eq!(summary.stop_reason, StopReason::SourceExhausted);
    assert_eq!(store.len(), 6);
}

#[test]
fn politeness_pause_only_between_pages() {
    let mut source = ScriptedSource::default()
        .page_at(0, page("a", 4, 3))
        .page_at(4, page("b", 4, 2))
        .page_at(8, page("c", 4, 1));
    let mut store = MemoryStore::new();
    let mut pacer = RecordingPacer::default();

    run(
        &mut source,
        &mut store,
        &mut pacer,
        &RunParams::new("q").with_page_size(4).with_max_count(12),
    )
    .unwrap();

    assert_eq!(pacer.count(SUCCESS_PAUSE), 3);
    assert_eq!(pacer.count(page_pause()), 2);
    // Each page's success pause precedes the politeness pause that follows it.
    assert_eq!(
        pacer.0,
        vec![
            SUCCESS_PAUSE,
            page_pause(),
            SUCCESS_PAUSE,
            page_pause(),
            SUCCESS_PAUSE,
        ]
    );
}
