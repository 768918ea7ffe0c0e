//! Playback controller tests
//!
//! Timer-driven behaviour runs on a paused tokio clock, so the loading
//! deadline and settle delay elapse instantly once the runtime is idle.

mod helpers;

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use helpers::{drain, pause, FakeMedia};
use study_common::events::{EventBus, FailureKind, PlaybackPhase, StudyEvent};
use study_common::{Condition, InteractionState};
use study_flow::playback::{
    MediaErrorCode, MediaSignal, PlaybackCommand, PlaybackController, PlaybackError,
    PlaybackSettings, SoundUnlock,
};

const LOCATOR: &str = "https://media.test/P306_C/index.m3u8";

fn condition() -> Condition {
    Condition::new("P306_C", LOCATOR)
}

struct Harness {
    signals: mpsc::Sender<MediaSignal>,
    commands: mpsc::Sender<PlaybackCommand>,
}

impl Harness {
    async fn signal(&self, signal: MediaSignal) {
        self.signals.send(signal).await.unwrap();
        pause().await;
    }

    async fn command(&self, command: PlaybackCommand) {
        self.commands.send(command).await.unwrap();
        pause().await;
    }
}

fn channels() -> (
    Harness,
    mpsc::Receiver<MediaSignal>,
    mpsc::Receiver<PlaybackCommand>,
) {
    let (signals, signal_rx) = mpsc::channel(16);
    let (commands, command_rx) = mpsc::channel(16);
    (Harness { signals, commands }, signal_rx, command_rx)
}

fn phases(events: &[StudyEvent]) -> Vec<PlaybackPhase> {
    events
        .iter()
        .filter_map(|event| match event {
            StudyEvent::PlaybackStateChanged { new_phase, .. } => Some(*new_phase),
            _ => None,
        })
        .collect()
}

fn failures(events: &[StudyEvent]) -> Vec<FailureKind> {
    events
        .iter()
        .filter_map(|event| match event {
            StudyEvent::PlaybackFailed { kind, .. } => Some(*kind),
            _ => None,
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_liked_viewing_produces_one_record() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let media = FakeMedia::new(25.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        bus.clone(),
    );

    let started = Instant::now();
    let (result, ended_at) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::CanPlay).await;
        harness.signal(MediaSignal::Playing).await;
        harness.command(PlaybackCommand::ToggleLike).await;
        media.set_position(22.35);
        harness.signal(MediaSignal::Ended).await;
        Instant::now()
    });

    let record = result.unwrap();
    assert_eq!(record.condition_id, "P306_C");
    assert!(record.like);
    assert!(!record.cart);
    assert_eq!(record.watch_duration, 22.35);
    assert!(record.completed);
    assert!(Instant::now() - started >= Duration::from_millis(500));
    assert!(ended_at - started < Duration::from_millis(500));

    assert!(interaction.like_clicked);
    assert!(!interaction.cart_clicked);

    let events = drain(&mut rx);
    let completions = events
        .iter()
        .filter(|e| matches!(e, StudyEvent::ViewingCompleted { .. }))
        .count();
    assert_eq!(completions, 1);
    assert_eq!(
        phases(&events),
        vec![
            PlaybackPhase::Loading,
            PlaybackPhase::Playing,
            PlaybackPhase::Completed
        ]
    );

    // Mounted muted from position zero
    assert_eq!(media.loads(), vec![LOCATOR.to_string()]);
    assert!(media.muted());
}

#[tokio::test(start_paused = true)]
async fn test_stall_running_into_end_still_completes() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let media = FakeMedia::new(30.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        bus.clone(),
    );

    // Channels stay open for the whole test; only the end signal can finish it
    let (result, _) = tokio::join!(
        tokio::time::timeout(Duration::from_secs(300), controller.run(signal_rx, command_rx)),
        async {
            harness.signal(MediaSignal::Playing).await;
            harness.command(PlaybackCommand::ToggleCart).await;
            media.set_position(29.97);
            harness.signal(MediaSignal::Waiting).await;
            harness.signal(MediaSignal::Ended).await;
        }
    );

    let record = result
        .expect("viewing should complete after a stall at the tail")
        .unwrap();
    assert_eq!(record.watch_duration, 29.97);
    assert!(record.cart);
    assert!(record.completed);

    let events = drain(&mut rx);
    assert_eq!(
        phases(&events),
        vec![
            PlaybackPhase::Loading,
            PlaybackPhase::Playing,
            PlaybackPhase::Buffering,
            PlaybackPhase::Completed
        ]
    );
    drop(harness);
}

#[tokio::test(start_paused = true)]
async fn test_buffering_only_after_first_frame() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let media = FakeMedia::new(10.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        bus.clone(),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::Waiting).await;
        harness.signal(MediaSignal::Playing).await;
        harness.signal(MediaSignal::Waiting).await;
        harness.signal(MediaSignal::Playing).await;
        media.set_position(10.0);
        harness.signal(MediaSignal::Ended).await;
    });

    assert!(result.is_ok());
    assert_eq!(
        phases(&drain(&mut rx)),
        vec![
            PlaybackPhase::Loading,
            PlaybackPhase::Playing,
            PlaybackPhase::Buffering,
            PlaybackPhase::Playing,
            PlaybackPhase::Completed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_loading_deadline_fails_with_timeout() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        FakeMedia::new(10.0),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        bus.clone(),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async move {
        tokio::time::sleep(Duration::from_secs(31)).await;
        drop(harness);
    });

    assert_eq!(
        result.unwrap_err(),
        PlaybackError::Detached {
            phase: PlaybackPhase::Error,
            last_failure: Some(FailureKind::Timeout),
        }
    );
    assert_eq!(failures(&drain(&mut rx)), vec![FailureKind::Timeout]);
}

#[tokio::test(start_paused = true)]
async fn test_progress_cancels_deadline() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let media = FakeMedia::new(40.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        bus.clone(),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::LoadedData).await;
        tokio::time::sleep(Duration::from_secs(45)).await;
        harness.signal(MediaSignal::Playing).await;
        media.set_position(40.0);
        harness.signal(MediaSignal::Ended).await;
    });

    assert_eq!(result.unwrap().watch_duration, 40.0);
    assert!(failures(&drain(&mut rx)).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_each_error_code_classifies() {
    let cases = [
        (MediaErrorCode::Aborted, FailureKind::Aborted),
        (MediaErrorCode::Network, FailureKind::Network),
        (MediaErrorCode::Decode, FailureKind::Decode),
        (MediaErrorCode::SrcNotSupported, FailureKind::UnsupportedFormat),
    ];

    for (code, expected) in cases {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe();
        let mut interaction = InteractionState::cleared();
        let mut sound = SoundUnlock::default();
        let (harness, signal_rx, command_rx) = channels();

        let controller = PlaybackController::new(
            FakeMedia::new(10.0),
            condition(),
            PlaybackSettings::default(),
            &mut interaction,
            &mut sound,
            bus.clone(),
        );

        let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async move {
            harness.signal(MediaSignal::Error(code)).await;
            drop(harness);
        });

        assert!(result.is_err());
        assert_eq!(failures(&drain(&mut rx)), vec![expected]);
    }
}

#[tokio::test(start_paused = true)]
async fn test_retry_reloads_with_cache_buster() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let media = FakeMedia::new(12.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        bus.clone(),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::Playing).await;
        media.set_position(4.0);
        harness.signal(MediaSignal::Error(MediaErrorCode::Network)).await;
        // Still in Error: signals other than retry do nothing
        harness.signal(MediaSignal::Playing).await;
        harness.command(PlaybackCommand::Retry).await;
        harness.signal(MediaSignal::Playing).await;
        media.set_position(12.0);
        harness.signal(MediaSignal::Ended).await;
    });

    assert_eq!(result.unwrap().watch_duration, 12.0);

    let loads = media.loads();
    assert_eq!(loads.len(), 2);
    assert_eq!(loads[0], LOCATOR);
    assert!(loads[1].starts_with(&format!("{}?cb=", LOCATOR)));
    assert_eq!(media.state.lock().unwrap().rewinds, 2);
    assert!(media.muted());

    assert_eq!(
        phases(&drain(&mut rx)),
        vec![
            PlaybackPhase::Loading,
            PlaybackPhase::Playing,
            PlaybackPhase::Error,
            PlaybackPhase::Loading,
            PlaybackPhase::Playing,
            PlaybackPhase::Completed
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_outside_error_is_ignored() {
    let media = FakeMedia::new(5.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        EventBus::new(16),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::Playing).await;
        harness.command(PlaybackCommand::Retry).await;
        harness.signal(MediaSignal::Ended).await;
    });

    assert!(result.is_ok());
    assert_eq!(media.loads().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_toggle_reentrancy_window() {
    let media = FakeMedia::new(30.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        EventBus::new(16),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::Playing).await;
        // Double click: second toggle lands inside the window
        harness.command(PlaybackCommand::ToggleLike).await;
        harness.command(PlaybackCommand::ToggleLike).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        harness.command(PlaybackCommand::ToggleCart).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        harness.command(PlaybackCommand::ToggleCart).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        harness.command(PlaybackCommand::ToggleCart).await;
        media.set_position(30.0);
        harness.signal(MediaSignal::Ended).await;
        // Ignored once completed
        harness.command(PlaybackCommand::ToggleLike).await;
    });

    let record = result.unwrap();
    assert!(record.like);
    assert!(record.cart);
    assert_eq!(
        interaction,
        InteractionState {
            like_clicked: true,
            cart_clicked: true
        }
    );
}

#[tokio::test(start_paused = true)]
async fn test_unmute_carries_to_next_video() {
    let mut sound = SoundUnlock::default();

    // First video: participant unmutes explicitly
    {
        let media = FakeMedia::new(5.0);
        let mut interaction = InteractionState::cleared();
        let (harness, signal_rx, command_rx) = channels();
        let controller = PlaybackController::new(
            media.clone(),
            condition(),
            PlaybackSettings::default(),
            &mut interaction,
            &mut sound,
            EventBus::new(16),
        );

        let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
            harness.signal(MediaSignal::Playing).await;
            assert!(media.muted());
            harness.command(PlaybackCommand::UnmuteGesture).await;
            assert!(!media.muted());
            harness.signal(MediaSignal::Ended).await;
        });
        assert!(result.is_ok());
    }
    assert!(sound.is_unlocked());

    // Second video starts muted and unmutes itself on the first frame
    let media = FakeMedia::new(5.0);
    let mut interaction = InteractionState::cleared();
    let (harness, signal_rx, command_rx) = channels();
    let controller = PlaybackController::new(
        media.clone(),
        Condition::new("P312_C", "https://media.test/P312_C/index.m3u8"),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        EventBus::new(16),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        pause().await;
        assert!(media.muted());
        harness.signal(MediaSignal::Playing).await;
        assert!(!media.muted());
        harness.signal(MediaSignal::Ended).await;
    });
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_refused_unmute_falls_back_to_muted() {
    let media = FakeMedia::new(5.0);
    media.refuse_unmuted(true);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    sound.mark_unlocked();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        EventBus::new(16),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::Playing).await;
        assert!(media.muted());
        harness.command(PlaybackCommand::UnmuteGesture).await;
        assert!(media.muted());
        harness.signal(MediaSignal::Ended).await;
    });
    assert!(result.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_watch_duration_clamped_to_resource() {
    let media = FakeMedia::new(25.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        EventBus::new(16),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async {
        harness.signal(MediaSignal::Playing).await;
        media.set_position(25.004);
        harness.signal(MediaSignal::Ended).await;
    });

    let record = result.unwrap();
    assert!(record.watch_duration >= 0.0 && record.watch_duration <= 25.0);
    assert_eq!(record.watch_duration, 25.0);
}

#[tokio::test(start_paused = true)]
async fn test_signals_closing_during_settle_still_completes() {
    let media = FakeMedia::new(8.0);
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        media.clone(),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        EventBus::new(16),
    );

    let (result, _) = tokio::join!(controller.run(signal_rx, command_rx), async move {
        harness.signal(MediaSignal::Playing).await;
        media.set_position(8.0);
        harness.signal(MediaSignal::Ended).await;
        drop(harness);
    });

    assert_eq!(result.unwrap().watch_duration, 8.0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_cancels_pending_timers() {
    let bus = EventBus::new(64);
    let mut rx = bus.subscribe();
    let mut interaction = InteractionState::cleared();
    let mut sound = SoundUnlock::default();
    let (_harness, signal_rx, command_rx) = channels();

    let controller = PlaybackController::new(
        FakeMedia::new(10.0),
        condition(),
        PlaybackSettings::default(),
        &mut interaction,
        &mut sound,
        bus.clone(),
    );

    // Unmount while still loading
    let outcome = tokio::time::timeout(
        Duration::from_secs(1),
        controller.run(signal_rx, command_rx),
    )
    .await;
    assert!(outcome.is_err());

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(failures(&drain(&mut rx)).is_empty());
}
