use crate::score::{ScoreRecord, ScoreSink, SubmitReceipt};
use crate::text_source::Passage;
use chrono::Local;

/// Countdown lengths selectable for a session, in seconds.
pub const DURATIONS: [u32; 3] = [15, 30, 60];

/// What kind of passage the session is typed against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, strum_macros::Display)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Plain,
    Code,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Plain => "plain",
            Mode::Code => "code",
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "code" => Mode::Code,
            _ => Mode::Plain,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Phase {
    Idle,
    Running,
    Finished,
}

/// wpm/accuracy pair, valid live during a run or frozen after the finish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LiveStats {
    pub wpm: u32,
    pub accuracy: u32,
}

/// Pure statistics over a target/typed pair and the countdown position.
///
/// A typed character is correct iff a target character exists at the same
/// index and matches it; anything typed past the end of the target is
/// incorrect. wpm normalizes correct characters by the standard five
/// characters per word; accuracy is against characters actually typed.
pub fn compute_stats(target: &str, typed: &str, duration_secs: u32, time_remaining: u32) -> LiveStats {
    let target: Vec<char> = target.chars().collect();
    let typed: Vec<char> = typed.chars().collect();
    stats_of(&target, &typed, duration_secs, time_remaining)
}

fn stats_of(target: &[char], typed: &[char], duration_secs: u32, time_remaining: u32) -> LiveStats {
    let correct = typed
        .iter()
        .zip(target.iter())
        .filter(|(t, e)| t == e)
        .count();

    let elapsed_secs = duration_secs.saturating_sub(time_remaining);
    let wpm = if elapsed_secs > 0 {
        let minutes = elapsed_secs as f64 / 60.0;
        ((correct as f64 / 5.0) / minutes).round() as u32
    } else {
        0
    };

    let accuracy = if typed.is_empty() {
        0
    } else {
        ((correct as f64 / typed.len() as f64) * 100.0).round() as u32
    };

    LiveStats { wpm, accuracy }
}

fn mean(data: &[f64]) -> Option<f64> {
    match data.len() {
        0 => None,
        n => Some(data.iter().sum::<f64>() / n as f64),
    }
}

fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (m - v) * (m - v)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// One timed typing attempt against a fixed target passage.
///
/// The session is a single-writer state machine: Idle until the first
/// input, Running while the countdown is live, Finished exactly once,
/// either when the countdown hits zero or when the typed text consumes
/// the whole target. Input and tick events outside Running are dropped.
#[derive(Debug)]
pub struct Session {
    pub target: String,
    pub title: Option<String>,
    pub mode: Mode,
    pub duration_secs: u32,
    target_chars: Vec<char>,
    typed: Vec<char>,
    time_remaining: u32,
    phase: Phase,
    submitted: bool,
    wpm_series: Vec<(f64, f64)>,
    wpm: u32,
    accuracy: u32,
}

impl Session {
    pub fn new(passage: Passage, mode: Mode, duration_secs: u32) -> Self {
        let target_chars = passage.text.chars().collect();
        Self {
            target: passage.text,
            title: passage.title,
            mode,
            duration_secs,
            target_chars,
            typed: vec![],
            time_remaining: duration_secs,
            phase: Phase::Idle,
            submitted: false,
            wpm_series: vec![],
            wpm: 0,
            accuracy: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn has_started(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn has_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    pub fn elapsed_secs(&self) -> u32 {
        self.duration_secs - self.time_remaining
    }

    pub fn typed(&self) -> &[char] {
        &self.typed
    }

    pub fn typed_text(&self) -> String {
        self.typed.iter().collect()
    }

    /// The caret: index of the next untyped character.
    pub fn cursor_pos(&self) -> usize {
        self.typed.len()
    }

    pub fn expected_char(&self, idx: usize) -> Option<char> {
        self.target_chars.get(idx).copied()
    }

    /// Correctness verdict for a typed index; None for untyped indices.
    pub fn outcome_at(&self, idx: usize) -> Option<Outcome> {
        self.typed.get(idx).map(|c| {
            if self.target_chars.get(idx) == Some(c) {
                Outcome::Correct
            } else {
                Outcome::Incorrect
            }
        })
    }

    /// The only Idle -> Running edge. No-op once started.
    pub fn on_first_input(&mut self) {
        if self.phase == Phase::Idle {
            self.phase = Phase::Running;
        }
    }

    /// Replace the typed text wholesale. Dropped outside Running.
    pub fn on_input(&mut self, new_typed: &str) {
        if self.phase != Phase::Running {
            return;
        }
        self.typed = new_typed.chars().collect();
        self.finish_if_consumed();
    }

    /// Append one character, starting the session if it is the first.
    pub fn type_char(&mut self, c: char) {
        self.on_first_input();
        if self.phase != Phase::Running {
            return;
        }
        self.typed.push(c);
        self.finish_if_consumed();
    }

    pub fn backspace(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.typed.pop();
    }

    /// One wall-clock second elapsed. Dropped outside Running, so a tick
    /// left over from a previous session can never touch a fresh one.
    pub fn on_tick(&mut self) {
        if self.phase != Phase::Running {
            return;
        }
        self.time_remaining = self.time_remaining.saturating_sub(1);
        let live = self.live_stats();
        self.wpm_series
            .push((self.elapsed_secs() as f64, live.wpm as f64));
        if self.time_remaining == 0 {
            self.finish();
        }
    }

    fn finish_if_consumed(&mut self) {
        if !self.target_chars.is_empty() && self.typed.len() >= self.target_chars.len() {
            self.finish();
        }
    }

    fn finish(&mut self) {
        if self.phase == Phase::Finished {
            return;
        }
        let stats = self.live_stats();
        self.wpm = stats.wpm;
        self.accuracy = stats.accuracy;
        self.phase = Phase::Finished;
    }

    /// Current statistics; live while Running, frozen once Finished.
    pub fn live_stats(&self) -> LiveStats {
        stats_of(
            &self.target_chars,
            &self.typed,
            self.duration_secs,
            self.time_remaining,
        )
    }

    pub fn wpm(&self) -> u32 {
        self.wpm
    }

    pub fn accuracy(&self) -> u32 {
        self.accuracy
    }

    pub fn wpm_series(&self) -> &[(f64, f64)] {
        &self.wpm_series
    }

    /// Standard deviation of the per-second wpm samples.
    pub fn consistency(&self) -> f64 {
        let samples: Vec<f64> = self.wpm_series.iter().map(|p| p.1).collect();
        std_dev(&samples).unwrap_or(0.0)
    }

    /// Freeze results and hand them to the sink, at most once per session.
    ///
    /// Returns None when this session already submitted. A sink error is
    /// the caller's to surface as a warning; the session stays Finished
    /// with its statistics intact either way.
    pub fn finalize(&mut self, sink: &mut dyn ScoreSink) -> Option<rusqlite::Result<SubmitReceipt>> {
        self.finish();
        if self.submitted {
            return None;
        }
        self.submitted = true;
        let record = ScoreRecord {
            wpm: self.wpm,
            accuracy: self.accuracy,
            mode: self.mode,
            duration_secs: self.duration_secs,
            timestamp: Local::now(),
        };
        Some(sink.submit(&record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    struct CountingSink {
        submissions: Vec<ScoreRecord>,
    }

    impl CountingSink {
        fn new() -> Self {
            Self { submissions: vec![] }
        }
    }

    impl ScoreSink for CountingSink {
        fn submit(&mut self, record: &ScoreRecord) -> rusqlite::Result<SubmitReceipt> {
            self.submissions.push(record.clone());
            Ok(SubmitReceipt {
                high_score: record.wpm,
                is_new_high_score: true,
            })
        }
    }

    struct FailingSink;

    impl ScoreSink for FailingSink {
        fn submit(&mut self, _record: &ScoreRecord) -> rusqlite::Result<SubmitReceipt> {
            Err(rusqlite::Error::InvalidQuery)
        }
    }

    fn session(target: &str, duration_secs: u32) -> Session {
        Session::new(Passage::plain(target.to_string()), Mode::Plain, duration_secs)
    }

    #[test]
    fn new_session_is_idle() {
        let s = session("hello world", 30);
        assert_matches!(s.phase(), Phase::Idle);
        assert!(!s.has_started());
        assert!(!s.has_finished());
        assert_eq!(s.time_remaining(), 30);
        assert_eq!(s.cursor_pos(), 0);
    }

    #[test]
    fn first_input_is_the_only_idle_to_running_edge() {
        let mut s = session("abc", 15);
        s.on_tick();
        assert_eq!(s.time_remaining(), 15);
        assert_matches!(s.phase(), Phase::Idle);

        s.on_first_input();
        assert_matches!(s.phase(), Phase::Running);

        // a second call is a no-op
        s.on_first_input();
        assert_matches!(s.phase(), Phase::Running);
    }

    #[test]
    fn input_is_dropped_while_idle() {
        let mut s = session("abc", 15);
        s.on_input("ab");
        assert_eq!(s.typed_text(), "");
    }

    #[test]
    fn type_char_records_outcomes() {
        let mut s = session("test", 30);
        s.type_char('t');
        s.type_char('x');
        assert_eq!(s.outcome_at(0), Some(Outcome::Correct));
        assert_eq!(s.outcome_at(1), Some(Outcome::Incorrect));
        assert_eq!(s.outcome_at(2), None);
        assert_eq!(s.cursor_pos(), 2);
    }

    #[test]
    fn backspace_supports_edits() {
        let mut s = session("test", 30);
        s.type_char('t');
        s.type_char('x');
        s.backspace();
        assert_eq!(s.typed_text(), "t");
        s.type_char('e');
        assert_eq!(s.outcome_at(1), Some(Outcome::Correct));
    }

    #[test]
    fn backspace_at_start_is_a_noop() {
        let mut s = session("test", 30);
        s.on_first_input();
        s.backspace();
        assert_eq!(s.typed_text(), "");
        assert_eq!(s.cursor_pos(), 0);
    }

    #[test]
    fn replace_input_supports_arbitrary_edits() {
        let mut s = session("the cat", 30);
        s.on_first_input();
        s.on_input("the ");
        s.on_input("thx");
        assert_eq!(s.typed_text(), "thx");
        assert_eq!(s.outcome_at(2), Some(Outcome::Incorrect));
    }

    #[test]
    fn countdown_decrements_and_finishes_at_zero() {
        let mut s = session("some long target text", 15);
        s.on_first_input();
        for _ in 0..14 {
            s.on_tick();
        }
        assert_eq!(s.time_remaining(), 1);
        assert!(!s.has_finished());
        s.on_tick();
        assert_eq!(s.time_remaining(), 0);
        assert!(s.has_finished());
    }

    #[test]
    fn tick_is_idempotent_at_zero() {
        let mut s = session("abc def", 15);
        s.on_first_input();
        for _ in 0..20 {
            s.on_tick();
        }
        assert_eq!(s.time_remaining(), 0);
        assert!(s.has_finished());
    }

    #[test]
    fn typing_after_finish_has_no_effect() {
        let mut s = session("long target to avoid consuming", 15);
        s.type_char('l');
        for _ in 0..15 {
            s.on_tick();
        }
        assert!(s.has_finished());
        let before = s.typed_text();

        s.type_char('x');
        s.on_input("x");
        s.backspace();
        assert_eq!(s.typed_text(), before);
    }

    #[test]
    fn finishes_early_when_target_is_consumed() {
        let mut s = session("hi", 30);
        s.type_char('h');
        assert!(!s.has_finished());
        s.type_char('i');
        assert!(s.has_finished());
        // remaining time is frozen where the session ended
        assert_eq!(s.time_remaining(), 30);
    }

    #[test]
    fn instant_finish_has_zero_wpm() {
        // consumed before the first tick: zero elapsed seconds
        let mut s = session("hi", 30);
        s.type_char('h');
        s.type_char('i');
        assert_eq!(s.wpm(), 0);
        assert_eq!(s.accuracy(), 100);
    }

    #[test]
    fn scenario_full_correct_thirty_second_run() {
        let stats = compute_stats("the cat sat", "the cat sat", 30, 0);
        assert_eq!(stats.wpm, 4);
        assert_eq!(stats.accuracy, 100);
    }

    #[test]
    fn scenario_one_miss_sixty_second_run() {
        let stats = compute_stats("abcde", "abXde", 60, 0);
        assert_eq!(stats.accuracy, 80);
        assert_eq!(stats.wpm, 1);
    }

    #[test]
    fn scenario_untouched_session_times_out() {
        let mut s = session("anything at all", 15);
        s.on_first_input();
        let mut sink = CountingSink::new();
        for _ in 0..15 {
            s.on_tick();
        }
        assert!(s.has_finished());

        assert!(s.finalize(&mut sink).is_some());
        assert!(s.finalize(&mut sink).is_none());
        assert_eq!(sink.submissions.len(), 1);
        assert_eq!(sink.submissions[0].wpm, 0);
        assert_eq!(sink.submissions[0].accuracy, 0);
    }

    #[test]
    fn finalize_submits_exactly_once() {
        let mut s = session("hi", 30);
        s.type_char('h');
        s.type_char('i');
        let mut sink = CountingSink::new();
        assert!(s.finalize(&mut sink).is_some());
        assert!(s.finalize(&mut sink).is_none());
        assert!(s.finalize(&mut sink).is_none());
        assert_eq!(sink.submissions.len(), 1);
    }

    #[test]
    fn sink_failure_leaves_results_standing() {
        let mut s = session("hi", 30);
        s.type_char('h');
        s.type_char('i');
        let outcome = s.finalize(&mut FailingSink);
        assert_matches!(outcome, Some(Err(_)));
        assert!(s.has_finished());
        assert_eq!(s.accuracy(), 100);
        // the failed attempt still consumed the one submission
        assert!(s.finalize(&mut FailingSink).is_none());
    }

    #[test]
    fn typing_past_the_target_is_always_incorrect() {
        let mut s = Session::new(Passage::plain("hi there".to_string()), Mode::Plain, 30);
        s.on_first_input();
        s.on_input("hix");
        assert_eq!(s.outcome_at(2), Some(Outcome::Incorrect));

        let stats = compute_stats("ab", "abab", 60, 30);
        // two correct of four typed
        assert_eq!(stats.accuracy, 50);
    }

    #[test]
    fn compute_stats_is_pure_and_deterministic() {
        let a = compute_stats("hello world", "hello wor", 60, 42);
        let b = compute_stats("hello world", "hello wor", 60, 42);
        assert_eq!(a, b);
    }

    #[test]
    fn correct_count_bounded_by_both_lengths() {
        for (target, typed) in [("abc", "abcdef"), ("abcdef", "abc"), ("", "xyz"), ("xyz", "")] {
            let stats = compute_stats(target, typed, 60, 0);
            assert!(stats.accuracy <= 100);
        }
    }

    #[test]
    fn zero_guards_in_formulas() {
        let no_time = compute_stats("abc", "abc", 30, 30);
        assert_eq!(no_time.wpm, 0);

        let no_input = compute_stats("abc", "", 30, 0);
        assert_eq!(no_input.accuracy, 0);
        assert_eq!(no_input.wpm, 0);
    }

    #[test]
    fn unicode_targets_compare_by_character() {
        let stats = compute_stats("héllo", "héllo", 60, 0);
        assert_eq!(stats.accuracy, 100);
    }

    #[test]
    fn tick_samples_feed_the_wpm_series() {
        let mut s = session("the quick brown fox jumps over", 15);
        for c in "the ".chars() {
            s.type_char(c);
        }
        s.on_tick();
        s.on_tick();
        assert_eq!(s.wpm_series().len(), 2);
        assert_eq!(s.wpm_series()[0].0, 1.0);
        assert!(s.consistency() >= 0.0);
    }

    #[test]
    fn mode_names_round_trip() {
        assert_eq!(Mode::Plain.as_str(), "plain");
        assert_eq!(Mode::Code.as_str(), "code");
        assert_eq!(Mode::from_name("code"), Mode::Code);
        assert_eq!(Mode::from_name("plain"), Mode::Plain);
        assert_eq!(Mode::from_name("anything else"), Mode::Plain);
        assert_eq!(Mode::Code.to_string(), "Code");
    }
}
