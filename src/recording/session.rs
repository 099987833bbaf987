// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Recording session: samples GPS fixes and streams them to a trip.
//!
//! A session is owned by a single actor task. Callers talk to it through a
//! [`RecordingHandle`], which sends commands over an mpsc channel and
//! observes state through `watch` snapshots. Appends to the server are
//! spawned so a slow network never blocks sampling; they are awaited only
//! when the session finishes, so the end request is always sent last.

use crate::error::AppError;
use crate::geodesy::LatLng;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;

/// Minimum spacing between two appends sent to the server.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

const COMMAND_BUFFER: usize = 64;

/// Where a session sends its samples.
#[async_trait]
pub trait PathSink: Send + Sync {
    /// Create the trip and return its ID.
    async fn start(&self, start: LatLng) -> Result<String, AppError>;
    async fn append(&self, trip_id: &str, point: LatLng) -> Result<(), AppError>;
    async fn end(&self, trip_id: &str, end: LatLng, is_public: bool) -> Result<(), AppError>;
}

/// When to send a fix to the server.
#[derive(Debug, Clone, Copy)]
pub struct FlushPolicy {
    pub interval: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

impl FlushPolicy {
    pub fn should_flush(&self, last_flush: Instant, now: Instant) -> bool {
        now.saturating_duration_since(last_flush) >= self.interval
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Recording,
    Paused,
    Finished,
}

/// What the UI sees.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub trip_id: String,
    pub state: SessionState,
    /// Local polyline, including fixes that were never flushed
    pub points: Vec<LatLng>,
    /// Haversine length of the local polyline, in meters
    pub distance_m: f64,
    /// Time spent recording, excluding pauses
    pub elapsed: Duration,
    /// Appends handed to the sink
    pub flushes: usize,
}

/// Session state machine, independent of any runtime or I/O.
#[derive(Debug)]
pub struct Session {
    trip_id: String,
    state: SessionState,
    points: Vec<LatLng>,
    distance_m: f64,
    policy: FlushPolicy,
    last_flush: Instant,
    recording_since: Option<Instant>,
    elapsed: Duration,
    flushes: usize,
}

impl Session {
    pub fn new(trip_id: String, start: LatLng, policy: FlushPolicy, now: Instant) -> Self {
        Self {
            trip_id,
            state: SessionState::Recording,
            points: vec![start],
            distance_m: 0.0,
            policy,
            last_flush: now,
            recording_since: Some(now),
            elapsed: Duration::ZERO,
            flushes: 0,
        }
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Record a fix. Returns the point to send when a flush is due.
    pub fn on_fix(&mut self, position: LatLng, now: Instant) -> Option<LatLng> {
        if self.state != SessionState::Recording {
            return None;
        }
        if !position.is_valid() {
            tracing::debug!(lat = position.lat, lng = position.lng, "Ignoring invalid fix");
            return None;
        }

        if let Some(last) = self.points.last() {
            self.distance_m += last.distance_to(&position);
        }
        self.points.push(position);

        if !self.policy.should_flush(self.last_flush, now) {
            return None;
        }
        self.last_flush = now;
        self.flushes += 1;
        Some(position)
    }

    pub fn pause(&mut self, now: Instant) {
        if self.state != SessionState::Recording {
            return;
        }
        self.stop_clock(now);
        self.state = SessionState::Paused;
    }

    pub fn resume(&mut self, now: Instant) {
        if self.state != SessionState::Paused {
            return;
        }
        self.recording_since = Some(now);
        self.state = SessionState::Recording;
    }

    /// Stop for good. Returns the last known position.
    pub fn finish(&mut self, now: Instant) -> LatLng {
        self.stop_clock(now);
        self.state = SessionState::Finished;
        // points always holds at least the start point
        self.points[self.points.len() - 1]
    }

    fn stop_clock(&mut self, now: Instant) {
        if let Some(since) = self.recording_since.take() {
            self.elapsed += now.saturating_duration_since(since);
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        let running = self
            .recording_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();

        SessionSnapshot {
            trip_id: self.trip_id.clone(),
            state: self.state,
            points: self.points.clone(),
            distance_m: self.distance_m,
            elapsed: self.elapsed + running,
            flushes: self.flushes,
        }
    }
}

enum Command {
    Fix(LatLng),
    Pause,
    Resume,
    Finish {
        is_public: bool,
        reply: oneshot::Sender<Result<SessionSnapshot, AppError>>,
    },
}

/// Handle to a running recording session.
pub struct RecordingHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
}

fn session_closed() -> AppError {
    AppError::Internal(anyhow::anyhow!("Recording session has stopped"))
}

impl RecordingHandle {
    /// Create the trip through `sink` and start the session actor.
    pub async fn start(
        sink: Arc<dyn PathSink>,
        start: LatLng,
        policy: FlushPolicy,
    ) -> Result<Self, AppError> {
        if !start.is_valid() {
            return Err(AppError::BadRequest("Invalid start coordinates".to_string()));
        }

        let trip_id = sink.start(start).await?;
        tracing::info!(trip_id = %trip_id, "Recording started");

        let now = Instant::now();
        let session = Session::new(trip_id, start, policy, now);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot(now));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);

        tokio::spawn(run_session(session, sink, command_rx, snapshot_tx));

        Ok(Self {
            commands: command_tx,
            snapshots: snapshot_rx,
        })
    }

    pub async fn fix(&self, position: LatLng) -> Result<(), AppError> {
        self.send(Command::Fix(position)).await
    }

    pub async fn pause(&self) -> Result<(), AppError> {
        self.send(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), AppError> {
        self.send(Command::Resume).await
    }

    /// Stop recording and end the trip at the last known position.
    pub async fn finish(self, is_public: bool) -> Result<SessionSnapshot, AppError> {
        let (reply, response) = oneshot::channel();
        self.send(Command::Finish { is_public, reply }).await?;
        response.await.map_err(|_| session_closed())?
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    async fn send(&self, command: Command) -> Result<(), AppError> {
        self.commands.send(command).await.map_err(|_| session_closed())
    }
}

async fn run_session(
    mut session: Session,
    sink: Arc<dyn PathSink>,
    mut commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
) {
    let mut flushes = JoinSet::new();

    while let Some(command) = commands.recv().await {
        while flushes.try_join_next().is_some() {}
        let now = Instant::now();

        match command {
            Command::Fix(position) => {
                if let Some(point) = session.on_fix(position, now) {
                    let sink = sink.clone();
                    let trip_id = session.trip_id().to_string();
                    flushes.spawn(async move {
                        if let Err(e) = sink.append(&trip_id, point).await {
                            tracing::warn!(trip_id = %trip_id, error = %e, "Failed to flush fix");
                        }
                    });
                }
            }
            Command::Pause => session.pause(now),
            Command::Resume => session.resume(now),
            Command::Finish { is_public, reply } => {
                let end = session.finish(now);
                while flushes.join_next().await.is_some() {}

                let result = sink.end(session.trip_id(), end, is_public).await;
                let snapshot = session.snapshot(now);
                snapshots.send_replace(snapshot.clone());

                match &result {
                    Ok(()) => tracing::info!(
                        trip_id = %session.trip_id(),
                        distance_m = snapshot.distance_m,
                        "Recording finished"
                    ),
                    Err(e) => tracing::error!(trip_id = %session.trip_id(), error = %e, "Failed to end trip"),
                }
                let _ = reply.send(result.map(|()| snapshot));
                return;
            }
        }

        snapshots.send_replace(session.snapshot(now));
    }

    // Handle dropped without finishing; let in-flight appends land.
    while flushes.join_next().await.is_some() {}
    tracing::debug!(trip_id = %session.trip_id(), "Recording session abandoned");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geodesy::path_length;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Start,
        Append(LatLng),
        End(LatLng, bool),
    }

    #[derive(Default)]
    struct MockSink {
        calls: Mutex<Vec<Call>>,
        fail_appends: bool,
    }

    #[async_trait]
    impl PathSink for MockSink {
        async fn start(&self, _start: LatLng) -> Result<String, AppError> {
            self.calls.lock().unwrap().push(Call::Start);
            Ok("trip-1".to_string())
        }

        async fn append(&self, trip_id: &str, point: LatLng) -> Result<(), AppError> {
            assert_eq!(trip_id, "trip-1");
            self.calls.lock().unwrap().push(Call::Append(point));
            if self.fail_appends {
                return Err(AppError::Upstream("offline".to_string()));
            }
            Ok(())
        }

        async fn end(&self, _trip_id: &str, end: LatLng, is_public: bool) -> Result<(), AppError> {
            self.calls.lock().unwrap().push(Call::End(end, is_public));
            Ok(())
        }
    }

    fn p(lat: f64, lng: f64) -> LatLng {
        LatLng::new(lat, lng)
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_flushes_at_most_once_per_window() {
        let t0 = Instant::now();
        let mut session = Session::new("t".into(), p(-6.2, 106.8), FlushPolicy::default(), t0);

        // First window is measured from the start time.
        assert_eq!(session.on_fix(p(-6.2001, 106.8), t0 + secs(3)), None);
        assert_eq!(
            session.on_fix(p(-6.2002, 106.8), t0 + secs(5)),
            Some(p(-6.2002, 106.8))
        );
        assert_eq!(session.on_fix(p(-6.2003, 106.8), t0 + secs(7)), None);
        assert_eq!(session.on_fix(p(-6.2004, 106.8), t0 + secs(9)), None);
        assert!(session.on_fix(p(-6.2005, 106.8), t0 + secs(10)).is_some());

        let snap = session.snapshot(t0 + secs(10));
        assert_eq!(snap.points.len(), 6);
        assert_eq!(snap.flushes, 2);
    }

    #[test]
    fn test_pause_ignores_fixes_and_keeps_polyline() {
        let t0 = Instant::now();
        let mut session = Session::new("t".into(), p(0.0, 0.0), FlushPolicy::default(), t0);
        session.on_fix(p(0.0, 0.001), t0 + secs(1));

        session.pause(t0 + secs(10));
        assert_eq!(session.state(), SessionState::Paused);
        assert_eq!(session.on_fix(p(1.0, 1.0), t0 + secs(20)), None);
        assert_eq!(session.snapshot(t0 + secs(30)).points.len(), 2);

        session.resume(t0 + secs(40));
        // Last flush was at start, so the window has long passed.
        assert!(session.on_fix(p(0.0, 0.002), t0 + secs(41)).is_some());

        let snap = session.snapshot(t0 + secs(45));
        assert_eq!(snap.points.len(), 3);
        // 10s before the pause plus 5s after resuming
        assert_eq!(snap.elapsed, secs(15));
    }

    #[test]
    fn test_distance_matches_polyline_length() {
        let t0 = Instant::now();
        let mut session = Session::new("t".into(), p(-6.2, 106.8), FlushPolicy::default(), t0);
        session.on_fix(p(-6.21, 106.81), t0 + secs(1));
        session.on_fix(p(-6.22, 106.83), t0 + secs(2));

        let snap = session.snapshot(t0 + secs(2));
        let expected = path_length(snap.points.iter());
        assert!((snap.distance_m - expected).abs() < 1e-6);
        assert!(snap.distance_m > 0.0);
    }

    #[test]
    fn test_invalid_fix_is_dropped() {
        let t0 = Instant::now();
        let mut session = Session::new("t".into(), p(0.0, 0.0), FlushPolicy::default(), t0);
        assert_eq!(session.on_fix(p(91.0, 0.0), t0 + secs(6)), None);
        assert_eq!(session.snapshot(t0 + secs(6)).points.len(), 1);
    }

    #[test]
    fn test_finish_returns_last_position() {
        let t0 = Instant::now();
        let mut session = Session::new("t".into(), p(0.0, 0.0), FlushPolicy::default(), t0);
        assert_eq!(session.finish(t0 + secs(1)), p(0.0, 0.0));

        let mut session = Session::new("t".into(), p(0.0, 0.0), FlushPolicy::default(), t0);
        session.on_fix(p(0.5, 0.5), t0 + secs(1));
        assert_eq!(session.finish(t0 + secs(2)), p(0.5, 0.5));
        assert_eq!(session.state(), SessionState::Finished);
    }

    #[tokio::test]
    async fn test_actor_streams_fixes_and_ends_last() {
        let sink = Arc::new(MockSink::default());
        let policy = FlushPolicy {
            interval: Duration::ZERO,
        };
        let handle = RecordingHandle::start(sink.clone(), p(-6.2, 106.8), policy)
            .await
            .unwrap();

        handle.fix(p(-6.201, 106.8)).await.unwrap();
        handle.fix(p(-6.202, 106.8)).await.unwrap();
        handle.pause().await.unwrap();
        handle.fix(p(10.0, 10.0)).await.unwrap();
        handle.resume().await.unwrap();
        handle.fix(p(-6.203, 106.8)).await.unwrap();

        let snap = handle.finish(true).await.unwrap();
        assert_eq!(snap.state, SessionState::Finished);
        assert_eq!(snap.points.len(), 4);
        assert_eq!(snap.flushes, 3);

        let calls = sink.calls.lock().unwrap().clone();
        assert_eq!(calls.first(), Some(&Call::Start));
        assert_eq!(calls.last(), Some(&Call::End(p(-6.203, 106.8), true)));
        let appends = calls
            .iter()
            .filter(|c| matches!(c, Call::Append(_)))
            .count();
        assert_eq!(appends, 3);
        assert!(!calls.contains(&Call::Append(p(10.0, 10.0))));
    }

    #[tokio::test]
    async fn test_actor_survives_flush_failures() {
        let sink = Arc::new(MockSink {
            fail_appends: true,
            ..Default::default()
        });
        let policy = FlushPolicy {
            interval: Duration::ZERO,
        };
        let handle = RecordingHandle::start(sink.clone(), p(0.0, 0.0), policy)
            .await
            .unwrap();

        handle.fix(p(0.0, 0.001)).await.unwrap();
        handle.fix(p(0.0, 0.002)).await.unwrap();

        let snap = handle.finish(false).await.unwrap();
        assert_eq!(snap.points.len(), 3);
        assert_eq!(
            sink.calls.lock().unwrap().last(),
            Some(&Call::End(p(0.0, 0.002), false))
        );
    }

    #[tokio::test]
    async fn test_snapshots_are_published() {
        let sink = Arc::new(MockSink::default());
        let handle = RecordingHandle::start(sink, p(0.0, 0.0), FlushPolicy::default())
            .await
            .unwrap();
        let mut rx = handle.subscribe();

        handle.fix(p(0.0, 0.001)).await.unwrap();
        let snap = rx.wait_for(|s| s.points.len() == 2).await.unwrap().clone();
        assert_eq!(snap.trip_id, "trip-1");
        assert_eq!(snap.state, SessionState::Recording);

        handle.pause().await.unwrap();
        rx.wait_for(|s| s.state == SessionState::Paused).await.unwrap();
        assert_eq!(handle.snapshot().state, SessionState::Paused);
    }
}
