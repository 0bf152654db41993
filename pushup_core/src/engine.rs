//! Challenge state engine.
//!
//! The engine is the single owner of the challenge: program state, the
//! reminder countdown, the resume wake and the current screen. Hosts drive it
//! with user commands and by calling [`ChallengeEngine::tick`] once a second;
//! they only read state back through the query methods.
//!
//! Every mutation ends with a snapshot written through the settings store.
//! Write failures are logged and otherwise ignored, so the in-memory state
//! stays authoritative for the life of the process.

use crate::clock::{Clock, ReferenceTime};
use crate::history::{DailyTotals, DayTotal};
use crate::notify::{Reminder, ReminderSink};
use crate::persist::{self, Snapshot};
use crate::schedule::{daily_target, ProgramPosition};
use crate::store::SettingsStore;
use crate::timer::{format_remaining, Countdown, TimerState};
use crate::transition::{self, DayInputs, Verdict};
use crate::wake::{WakeScheduler, WakeToken};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Seconds of countdown between snapshots while nothing else changes
const CHECKPOINT_SECS: u32 = 30;

/// The screen the host should be showing. Exactly one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UiMode {
    Welcome,
    AwaitingMaxTest,
    DoneForToday,
    NextDay,
    Completed,
    Active,
    ConfirmingStop,
}

/// Program state owned by the engine, apart from the countdown
#[derive(Debug, Clone, Default)]
struct ChallengeState {
    start_date: Option<DateTime<Utc>>,
    baseline: u32,
    totals: DailyTotals,
    max_test_counted: bool,
    challenge_started: bool,
    last_updated_day: Option<NaiveDate>,
    target_reps: u32,
    done_for_day: Option<NaiveDate>,
}

impl From<&Snapshot> for ChallengeState {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            start_date: snapshot.start_date,
            baseline: snapshot.baseline,
            totals: snapshot.totals.clone(),
            max_test_counted: snapshot.max_test_counted,
            challenge_started: snapshot.challenge_started,
            last_updated_day: snapshot.last_updated_day,
            target_reps: snapshot.target_reps,
            done_for_day: snapshot.done_for_day,
        }
    }
}

/// Everything a host needs to render the current screen
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    pub mode: UiMode,
    pub week: u32,
    pub day: u32,
    pub days_since_start: i64,
    pub baseline: u32,
    pub target_reps: u32,
    pub interval_minutes: u32,
    pub remaining_secs: u32,
    pub time_remaining: String,
    pub timer: TimerState,
    pub today_total: u32,
    pub resume_at: Option<DateTime<Utc>>,
}

pub struct ChallengeEngine<S: SettingsStore, C: Clock> {
    store: S,
    clock: C,
    reference: ReferenceTime,
    state: ChallengeState,
    countdown: Countdown,
    wakes: WakeScheduler,
    mode: UiMode,
    mode_before_stop: Option<UiMode>,
    pending_reminder: Option<Reminder>,
}

impl<S: SettingsStore, C: Clock> ChallengeEngine<S, C> {
    /// Restore the engine from `store` and settle on the right screen for now.
    ///
    /// A countdown that was live when the process exited keeps its remaining
    /// time if the session is still active today.
    pub fn open(store: S, clock: C, reference: ReferenceTime) -> Self {
        let snapshot = persist::load(&store);
        let countdown = Countdown::restore(
            snapshot.timer_state,
            snapshot.interval_minutes,
            snapshot.remaining_secs,
        );

        let mut engine = Self {
            store,
            clock,
            reference,
            state: ChallengeState::from(&snapshot),
            countdown,
            wakes: WakeScheduler::new(),
            mode: UiMode::Welcome,
            mode_before_stop: None,
            pending_reminder: None,
        };

        let now = engine.clock.now();
        let verdict = engine.apply_evaluation(now);
        tracing::info!("Restored challenge state: {:?}", verdict);
        engine.persist();
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn ui_mode(&self) -> UiMode {
        self.mode
    }

    pub fn current_target(&self) -> u32 {
        self.state.target_reps
    }

    pub fn current_interval_minutes(&self) -> u32 {
        self.countdown.interval_minutes()
    }

    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining_secs()
    }

    /// Remaining time formatted for display
    pub fn time_remaining(&self) -> String {
        format_remaining(self.countdown.remaining_secs())
    }

    pub fn timer_state(&self) -> TimerState {
        self.countdown.state()
    }

    /// Whether a session countdown is live (running or paused)
    pub fn is_active(&self) -> bool {
        self.mode == UiMode::Active && self.countdown.state() != TimerState::Stopped
    }

    pub fn is_timer_paused(&self) -> bool {
        self.countdown.is_paused()
    }

    pub fn baseline(&self) -> u32 {
        self.state.baseline
    }

    pub fn challenge_started(&self) -> bool {
        self.state.challenge_started
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.state.start_date
    }

    pub fn position(&self) -> ProgramPosition {
        self.position_at(self.clock.now())
    }

    /// Daily totals in ascending day order
    pub fn progress_history(&self) -> Vec<DayTotal> {
        self.state.totals.history()
    }

    pub fn grand_total(&self) -> u64 {
        self.state.totals.grand_total()
    }

    pub fn today_total(&self) -> u32 {
        let today = self.reference.local_day(self.clock.now());
        self.state.totals.get(today)
    }

    /// When the outstanding resume wake is due
    pub fn pending_wake(&self) -> Option<DateTime<Utc>> {
        self.wakes.pending()
    }

    /// Token of the outstanding resume wake, for hosts that run their own timer
    pub fn wake_token(&self) -> Option<WakeToken> {
        self.wakes.token()
    }

    /// The reminder awaiting a done/skip answer
    pub fn pending_reminder(&self) -> Option<&Reminder> {
        self.pending_reminder.as_ref()
    }

    pub fn reference_time(&self) -> ReferenceTime {
        self.reference
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn status(&self) -> Status {
        let position = self.position();
        Status {
            mode: self.mode,
            week: position.week,
            day: position.day_number(),
            days_since_start: position.days_since_start,
            baseline: self.state.baseline,
            target_reps: self.state.target_reps,
            interval_minutes: self.countdown.interval_minutes(),
            remaining_secs: self.countdown.remaining_secs(),
            time_remaining: self.time_remaining(),
            timer: self.countdown.state(),
            today_total: self.today_total(),
            resume_at: self.wakes.pending(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin (or continue) the challenge.
    ///
    /// Records the start date on first use. Without a baseline the user is
    /// sent to the max test; otherwise the day is evaluated and, if it is a
    /// training day, the countdown starts.
    pub fn start_challenge(&mut self) {
        let now = self.clock.now();
        if self.state.start_date.is_none() {
            self.state.start_date = Some(now);
            tracing::info!("Challenge started at {}", now);
        }
        self.state.challenge_started = true;
        self.mode_before_stop = None;

        if self.state.baseline == 0 {
            self.halt_timer();
            self.mode = UiMode::AwaitingMaxTest;
        } else {
            let verdict = self.apply_evaluation(now);
            if verdict.is_session_eligible() {
                self.setup_daily_challenge(now);
            }
        }
        self.persist();
    }

    /// Record the max test result as this cycle's baseline.
    ///
    /// Rejects non-positive counts without touching any state.
    pub fn submit_max_test(&mut self, reps: i64) -> Result<()> {
        let baseline = u32::try_from(reps)
            .ok()
            .filter(|&r| r > 0)
            .ok_or(Error::InvalidBaseline(reps))?;

        let now = self.clock.now();
        let today = self.reference.local_day(now);
        if self.state.start_date.is_none() {
            self.state.start_date = Some(now);
        }
        self.state.challenge_started = true;
        self.state.baseline = baseline;
        self.mode_before_stop = None;

        // The baseline-day target depends on the max test not being counted yet
        self.refresh_target(now);

        if !self.state.max_test_counted {
            self.state.totals.add(today, baseline);
            self.state.max_test_counted = true;
        }
        tracing::info!("Baseline set to {} reps", baseline);

        self.setup_daily_challenge(now);
        self.persist();
        Ok(())
    }

    /// Acknowledge the next-day or done-for-today screen and start training.
    ///
    /// Inside the restricted window this only re-evaluates.
    pub fn begin_day(&mut self) {
        if !matches!(self.mode, UiMode::NextDay | UiMode::DoneForToday) {
            tracing::debug!("begin_day ignored in {:?}", self.mode);
            return;
        }

        let now = self.clock.now();
        if self.reference.is_restricted(now) {
            self.apply_evaluation(now);
        } else {
            self.state.done_for_day = None;
            self.wakes.cancel();
            self.setup_daily_challenge(now);
        }
        self.persist();
    }

    /// Stop reminders for the rest of the day and resume at the next boundary.
    pub fn mark_done_for_today(&mut self) {
        if !matches!(
            self.mode,
            UiMode::Active | UiMode::NextDay | UiMode::DoneForToday
        ) {
            tracing::debug!("mark_done_for_today ignored in {:?}", self.mode);
            return;
        }

        let now = self.clock.now();
        self.state.done_for_day = Some(self.reference.local_day(now));
        self.enter_done_for_today(now);
        tracing::info!("Done for today, resuming at {:?}", self.wakes.pending());
        self.persist();
    }

    pub fn pause_timer(&mut self) {
        if self.mode == UiMode::Active && self.countdown.pause() {
            self.persist();
        }
    }

    pub fn resume_timer(&mut self) {
        if self.mode == UiMode::Active && self.countdown.resume() {
            self.persist();
        }
    }

    /// Ask for confirmation before a reset. The countdown holds meanwhile.
    pub fn request_stop(&mut self) {
        if matches!(self.mode, UiMode::Welcome | UiMode::ConfirmingStop) {
            return;
        }
        self.mode_before_stop = Some(self.mode);
        self.mode = UiMode::ConfirmingStop;
    }

    /// Back out of the stop confirmation to the previous screen.
    pub fn cancel_stop(&mut self) {
        if self.mode != UiMode::ConfirmingStop {
            return;
        }
        self.mode = self.mode_before_stop.take().unwrap_or(UiMode::Welcome);
    }

    /// Wipe the cycle: countdown, wake, baseline, totals and every persisted key.
    pub fn stop_and_reset(&mut self) {
        self.countdown = Countdown::new();
        self.wakes.cancel();
        self.state = ChallengeState::default();
        self.pending_reminder = None;
        self.mode_before_stop = None;
        self.mode = UiMode::Welcome;

        if let Err(e) = persist::clear(&mut self.store) {
            tracing::warn!("Failed to clear persisted challenge: {}", e);
        }
        tracing::info!("Challenge reset");
    }

    /// Reset and immediately start a new cycle.
    pub fn restart_challenge(&mut self) {
        self.stop_and_reset();
        self.start_challenge();
    }

    /// Explicit day-boundary re-check. Never starts the countdown by itself.
    pub fn reevaluate(&mut self) -> UiMode {
        let now = self.clock.now();
        self.mode_before_stop = None;
        self.apply_evaluation(now);
        self.persist();
        self.mode
    }

    /// Advance one second.
    ///
    /// Handles a due resume wake, stops the session when the restricted
    /// window or a new calendar day begins, and otherwise moves the
    /// countdown. Returns the reminder when the countdown fires; no further
    /// time passes until it is acknowledged.
    pub fn tick(&mut self) -> Option<Reminder> {
        if self.mode == UiMode::ConfirmingStop {
            return None;
        }

        let now = self.clock.now();
        if self.wakes.take_due(now).is_some() {
            self.resume_from_wake(now);
            return None;
        }

        if self.mode == UiMode::NextDay && self.reference.is_restricted(now) {
            tracing::info!("Restricted window reached before the day was begun");
            self.enter_done_for_today(now);
            self.persist();
            return None;
        }

        if self.mode != UiMode::Active
            || self.countdown.state() == TimerState::Stopped
            || self.pending_reminder.is_some()
        {
            return None;
        }

        if self.reference.is_restricted(now) {
            tracing::info!("Restricted window reached, halting reminders");
            self.enter_done_for_today(now);
            self.persist();
            return None;
        }

        let today = self.reference.local_day(now);
        if self.state.last_updated_day != Some(today) || self.position_at(now).completed {
            self.apply_evaluation(now);
            self.persist();
            return None;
        }

        let reminder = self
            .countdown
            .tick()
            .map(|_| Reminder::for_reps(self.state.target_reps));
        if let Some(ref r) = reminder {
            tracing::info!("Reminder: {}", r.body);
            self.pending_reminder = Some(r.clone());
        }
        if reminder.is_some() || self.countdown.remaining_secs() % CHECKPOINT_SECS == 0 {
            self.persist();
        }
        reminder
    }

    /// Write the current state now, including the countdown's remaining time.
    ///
    /// Ticks only snapshot every [`CHECKPOINT_SECS`], so hosts call this before exiting.
    pub fn checkpoint(&mut self) {
        self.persist();
    }

    /// Answer the pending reminder. Only "done" adds to today's total.
    pub fn acknowledge_reminder(&mut self, done: bool) {
        let Some(reminder) = self.pending_reminder.take() else {
            return;
        };

        if done {
            let today = self.reference.local_day(self.clock.now());
            let total = self.state.totals.add(today, reminder.reps);
            tracing::info!("Logged {} reps, {} today", reminder.reps, total);
        } else {
            tracing::info!("Reminder skipped");
        }
        self.persist();
    }

    /// Tick, and if a reminder fires ask `sink` right away.
    ///
    /// Returns the user's answer when a reminder was shown.
    pub fn tick_with(&mut self, sink: &mut dyn ReminderSink) -> Option<bool> {
        let reminder = self.tick()?;
        let done = sink.confirm(&reminder);
        self.acknowledge_reminder(done);
        Some(done)
    }

    /// Deliver a resume wake from a host-side timer.
    ///
    /// Tokens that were cancelled or replaced are ignored.
    pub fn fire_wake(&mut self, token: WakeToken) -> bool {
        if self.mode == UiMode::ConfirmingStop || !self.wakes.claim(token) {
            tracing::debug!("Ignoring stale or deferred wake {:?}", token);
            return false;
        }
        let now = self.clock.now();
        self.resume_from_wake(now);
        true
    }

    // ── Internals ────────────────────────────────────────────────────

    fn position_at(&self, now: DateTime<Utc>) -> ProgramPosition {
        self.state
            .start_date
            .map(|start| ProgramPosition::at(start, now))
            .unwrap_or_else(ProgramPosition::not_started)
    }

    fn day_inputs(&self, now: DateTime<Utc>) -> DayInputs {
        DayInputs {
            today: self.reference.local_day(now),
            restricted: self.reference.is_restricted(now),
            has_start_date: self.state.start_date.is_some(),
            baseline: self.state.baseline,
            position: self.position_at(now),
            last_updated_day: self.state.last_updated_day,
            done_for_day: self.state.done_for_day,
            timer_live: self.countdown.state() != TimerState::Stopped,
        }
    }

    /// Evaluate the day and put the engine on the matching screen.
    fn apply_evaluation(&mut self, now: DateTime<Utc>) -> Verdict {
        let verdict = transition::evaluate(&self.day_inputs(now));
        match verdict {
            Verdict::Welcome => {
                self.halt_timer();
                self.mode = UiMode::Welcome;
            }
            Verdict::AwaitingMaxTest => {
                self.halt_timer();
                self.mode = UiMode::AwaitingMaxTest;
            }
            Verdict::Completed => {
                self.halt_timer();
                self.mode = UiMode::Completed;
            }
            Verdict::DoneForToday => self.enter_done_for_today(now),
            Verdict::NextDay => {
                if self.target_is_stale(now) {
                    self.refresh_target(now);
                }
                self.halt_timer();
                self.mode = UiMode::NextDay;
            }
            Verdict::Active => {
                self.wakes.cancel();
                self.mode = UiMode::Active;
            }
        }
        verdict
    }

    /// Recompute today's target and interval from the program table.
    fn refresh_target(&mut self, now: DateTime<Utc>) {
        let position = self.position_at(now);
        if let Some(target) = daily_target(
            position.week,
            position.day_index,
            self.state.baseline,
            !self.state.max_test_counted,
        ) {
            self.state.target_reps = target.reps;
            self.countdown.set_interval(target.interval_minutes);
            tracing::debug!(
                "Week {} day {}: {} reps every {} minutes",
                position.week,
                position.day_number(),
                target.reps,
                target.interval_minutes
            );
        }
        self.state.last_updated_day = Some(self.reference.local_day(now));
    }

    /// Today's target was never computed, or was computed on another day.
    fn target_is_stale(&self, now: DateTime<Utc>) -> bool {
        self.state.last_updated_day != Some(self.reference.local_day(now))
            || self.state.target_reps == 0
            || self.countdown.interval_minutes() == 0
    }

    /// Arm the countdown for today and enter the active session.
    fn setup_daily_challenge(&mut self, now: DateTime<Utc>) {
        if self.position_at(now).completed {
            self.halt_timer();
            self.mode = UiMode::Completed;
            return;
        }
        if self.reference.is_restricted(now) {
            self.enter_done_for_today(now);
            return;
        }

        if self.target_is_stale(now) {
            self.refresh_target(now);
        }

        self.wakes.cancel();
        self.pending_reminder = None;
        if self.countdown.state() == TimerState::Stopped {
            self.countdown.start(self.countdown.interval_minutes());
        }
        self.mode = UiMode::Active;
    }

    fn halt_timer(&mut self) {
        self.countdown.stop();
        self.wakes.cancel();
        self.pending_reminder = None;
    }

    /// Park the countdown at its full interval and wait for the next boundary.
    fn enter_done_for_today(&mut self, now: DateTime<Utc>) {
        self.countdown.stop();
        self.countdown.rewind();
        self.pending_reminder = None;
        self.mode = UiMode::DoneForToday;
        self.arm_resume_wake(now);
    }

    fn arm_resume_wake(&mut self, now: DateTime<Utc>) {
        match self.reference.next_resume_at(now) {
            Some(due) => {
                self.wakes.arm(due);
            }
            None => {
                self.wakes.cancel();
                tracing::error!(
                    "Could not compute the next {}:00 boundary in {} after {}; no resume wake armed",
                    self.reference.resume_hour,
                    self.reference.tz,
                    now
                );
            }
        }
    }

    fn resume_from_wake(&mut self, now: DateTime<Utc>) {
        tracing::info!("Resume wake fired at {}", now);
        self.state.done_for_day = None;
        let verdict = self.apply_evaluation(now);
        if verdict.is_session_eligible() {
            self.setup_daily_challenge(now);
        }
        self.persist();
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            start_date: self.state.start_date,
            baseline: self.state.baseline,
            totals: self.state.totals.clone(),
            max_test_counted: self.state.max_test_counted,
            challenge_started: self.state.challenge_started,
            last_updated_day: self.state.last_updated_day,
            interval_minutes: self.countdown.interval_minutes(),
            remaining_secs: self.countdown.remaining_secs(),
            target_reps: self.state.target_reps,
            timer_state: self.countdown.state(),
            done_for_day: self.state.done_for_day,
        }
    }

    fn persist(&mut self) {
        let snapshot = self.snapshot();
        if let Err(e) = persist::save(&mut self.store, &snapshot) {
            tracing::warn!("Failed to persist challenge state: {}", e);
        }
    }
}
