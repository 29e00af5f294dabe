//! Tracker behaviour against the in-memory store
//!
//! Covers:
//! - Lesson and song assignment rules
//! - Submission exclusivity
//! - Approval effects (reward, rank, progress) and idempotence
//! - Rejection leaving the learner untouched
//! - Rollback when the approval commit fails
//! - Notification failures not failing operations

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use fret_common::config::ProgressionConfig;
use fret_tracker::error::Missing;
use fret_tracker::model::{
    Assignment, AssignmentId, AssignmentStatus, CourseId, LearnerId, LearnerSummary, LessonId,
    SongId, TaskRef,
};
use fret_tracker::notify::{LearnerNotice, Notifier, NotifyError};
use fret_tracker::store::{MemoryStore, ProgressStore};
use fret_tracker::tracker::NextLesson;
use fret_tracker::{Tracker, TrackerError};

const ANN: LearnerId = LearnerId(100);

// =============================================================================
// Helpers
// =============================================================================

/// Remembers every notification it was asked to send
#[derive(Default)]
struct RecordingNotifier {
    reviewer: Mutex<Vec<(AssignmentId, String)>>,
    learner: Mutex<Vec<(LearnerId, LearnerNotice)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_reviewer(
        &self,
        assignment: &Assignment,
        _learner: &LearnerSummary,
        item_title: &str,
    ) -> Result<(), NotifyError> {
        self.reviewer
            .lock()
            .unwrap()
            .push((assignment.id, item_title.to_string()));
        Ok(())
    }

    async fn notify_learner(
        &self,
        learner_id: LearnerId,
        notice: &LearnerNotice,
    ) -> Result<(), NotifyError> {
        self.learner.lock().unwrap().push((learner_id, notice.clone()));
        Ok(())
    }
}

/// Fails every delivery
struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn notify_reviewer(
        &self,
        _assignment: &Assignment,
        _learner: &LearnerSummary,
        _item_title: &str,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("chat unreachable".to_string()))
    }

    async fn notify_learner(
        &self,
        _learner_id: LearnerId,
        _notice: &LearnerNotice,
    ) -> Result<(), NotifyError> {
        Err(NotifyError::Delivery("chat unreachable".to_string()))
    }
}

/// Course 1 with `n` lessons (the last one a graduation piece) plus two songs
fn store_with_course(n: usize) -> Arc<MemoryStore> {
    let mut titles: Vec<String> = (1..n).map(|i| format!("Lesson {}", i)).collect();
    titles.push(format!("Lesson {}. Graduation piece", n));
    let titles: Vec<&str> = titles.iter().map(String::as_str).collect();

    Arc::new(
        MemoryStore::new()
            .with_course(CourseId(1), &titles)
            .with_song(SongId(1), "Wonderwall")
            .with_song(SongId(2), "Numb"),
    )
}

fn tracker_with(store: Arc<MemoryStore>, notifier: Arc<dyn Notifier>) -> Tracker {
    Tracker::new(store.clone(), store, notifier, ProgressionConfig::default()).unwrap()
}

async fn setup(lessons: usize) -> (Tracker, Arc<MemoryStore>, Arc<RecordingNotifier>) {
    let store = store_with_course(lessons);
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = tracker_with(store.clone(), notifier.clone());
    tracker.register(ANN, Some("ann".to_string()), "Ann").await.unwrap();
    (tracker, store, notifier)
}

async fn assign_lesson(tracker: &Tracker, learner: LearnerId) -> LessonId {
    match tracker.assign_next_lesson(learner).await.unwrap() {
        NextLesson::Assigned { lesson } => lesson.id,
        NextLesson::CourseComplete => panic!("course unexpectedly complete"),
    }
}

/// assign → submit → approve one lesson
async fn complete_next_lesson(tracker: &Tracker, learner: LearnerId) {
    assign_lesson(tracker, learner).await;
    let assignment = tracker.submit(learner).await.unwrap();
    tracker.approve(assignment.id).await.unwrap();
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {}, got {}",
        expected,
        actual
    );
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_creates_fresh_learner() {
    let (_tracker, store, _) = setup(20).await;

    let learner = store.load_learner(ANN).await.unwrap().unwrap();
    assert_eq!(learner.reputation, 0);
    assert_eq!(learner.rank, "Novice");
    assert_eq!(learner.course, CourseId(1));
    assert_eq!(learner.progress, 0.0);
    assert!(learner.active_task.is_none());
    assert!(!learner.graduated);
}

#[tokio::test]
async fn test_register_returns_existing_learner_unchanged() {
    let (tracker, _store, _) = setup(20).await;
    complete_next_lesson(&tracker, ANN).await;

    let again = tracker.register(ANN, None, "Someone else").await.unwrap();
    assert_eq!(again.display_name, "Ann");
    assert_eq!(again.reputation, 10);
}

#[tokio::test]
async fn test_operations_on_unknown_learner() {
    let (tracker, _store, _) = setup(20).await;

    let result = tracker.assign_next_lesson(LearnerId(404)).await;
    assert!(matches!(result, Err(TrackerError::LearnerNotFound(LearnerId(404)))));

    let result = tracker.profile(LearnerId(404)).await;
    assert!(matches!(result, Err(TrackerError::LearnerNotFound(_))));
}

// =============================================================================
// Assignment
// =============================================================================

#[tokio::test]
async fn test_new_learner_gets_first_lesson() {
    let (tracker, store, _) = setup(20).await;

    let lesson = match tracker.assign_next_lesson(ANN).await.unwrap() {
        NextLesson::Assigned { lesson } => lesson,
        NextLesson::CourseComplete => panic!("expected a lesson"),
    };
    assert_eq!(lesson.sequence, 0);

    let learner = store.load_learner(ANN).await.unwrap().unwrap();
    assert_eq!(learner.active_task, Some(TaskRef::Lesson(lesson.id)));
}

#[tokio::test]
async fn test_second_assignment_conflicts() {
    let (tracker, _store, _) = setup(20).await;
    let first = assign_lesson(&tracker, ANN).await;

    match tracker.assign_next_lesson(ANN).await {
        Err(TrackerError::TaskConflict { active, .. }) => {
            assert_eq!(active, TaskRef::Lesson(first))
        }
        other => panic!("expected TaskConflict, got {:?}", other),
    }

    assert!(matches!(
        tracker.assign_song(ANN, SongId(1)).await,
        Err(TrackerError::TaskConflict { .. })
    ));
}

#[tokio::test]
async fn test_next_lesson_skips_completed() {
    let (tracker, store, _) = setup(20).await;

    let mut learner = store.load_learner(ANN).await.unwrap().unwrap();
    learner.completed_lessons.insert(LessonId(1));
    learner.completed_lessons.insert(LessonId(2));
    learner.completed_lessons.insert(LessonId(4));
    store.save_learner(&learner).await.unwrap();

    assert_eq!(assign_lesson(&tracker, ANN).await, LessonId(3));
}

#[tokio::test]
async fn test_course_complete_changes_nothing() {
    let (tracker, store, _) = setup(3).await;

    let mut learner = store.load_learner(ANN).await.unwrap().unwrap();
    learner.completed_lessons.extend([LessonId(1), LessonId(2), LessonId(3)]);
    store.save_learner(&learner).await.unwrap();

    assert_eq!(
        tracker.assign_next_lesson(ANN).await.unwrap(),
        NextLesson::CourseComplete
    );
    assert_eq!(store.load_learner(ANN).await.unwrap().unwrap(), learner);
}

#[tokio::test]
async fn test_song_checks_run_in_order() {
    let (tracker, store, _) = setup(20).await;

    let mut learner = store.load_learner(ANN).await.unwrap().unwrap();
    learner.completed_songs.insert(SongId(2));
    learner.active_task = Some(TaskRef::Lesson(LessonId(1)));
    store.save_learner(&learner).await.unwrap();

    // Missing song wins over everything
    assert!(matches!(
        tracker.assign_song(ANN, SongId(77)).await,
        Err(TrackerError::NotFound(Missing::Song(SongId(77))))
    ));
    // Completed beats the busy slot
    assert!(matches!(
        tracker.assign_song(ANN, SongId(2)).await,
        Err(TrackerError::AlreadyCompleted(SongId(2)))
    ));
    assert!(matches!(
        tracker.assign_song(ANN, SongId(1)).await,
        Err(TrackerError::TaskConflict { .. })
    ));
}

#[tokio::test]
async fn test_song_assignment_sets_active_song() {
    let (tracker, store, _) = setup(20).await;

    let song = tracker.assign_song(ANN, SongId(1)).await.unwrap();
    assert_eq!(song.title, "Wonderwall");

    let learner = store.load_learner(ANN).await.unwrap().unwrap();
    assert_eq!(learner.active_task, Some(TaskRef::Song(SongId(1))));
}

// =============================================================================
// Submission
// =============================================================================

#[tokio::test]
async fn test_submit_without_task() {
    let (tracker, _store, _) = setup(20).await;
    assert!(matches!(
        tracker.submit(ANN).await,
        Err(TrackerError::NoActiveTask(ANN))
    ));
}

#[tokio::test]
async fn test_submit_keeps_active_task_and_notifies_reviewer() {
    let (tracker, store, notifier) = setup(20).await;
    let lesson = assign_lesson(&tracker, ANN).await;

    let assignment = tracker.submit(ANN).await.unwrap();
    assert_eq!(assignment.status, AssignmentStatus::Pending);
    assert_eq!(assignment.item, TaskRef::Lesson(lesson));

    let learner = store.load_learner(ANN).await.unwrap().unwrap();
    assert_eq!(learner.active_task, Some(TaskRef::Lesson(lesson)));

    let sent = notifier.reviewer.lock().unwrap().clone();
    assert_eq!(sent, vec![(assignment.id, "Lesson 1".to_string())]);
}

#[tokio::test]
async fn test_second_submit_conflicts() {
    let (tracker, _store, _) = setup(20).await;
    assign_lesson(&tracker, ANN).await;

    tracker.submit(ANN).await.unwrap();
    assert!(matches!(
        tracker.submit(ANN).await,
        Err(TrackerError::TaskConflict { .. })
    ));
    assert_eq!(tracker.pending_assignments().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_submits_create_one_assignment() {
    let (tracker, store, _) = setup(20).await;
    assign_lesson(&tracker, ANN).await;
    let tracker = Arc::new(tracker);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.submit(ANN).await })
        })
        .collect();

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(e) => assert!(matches!(e, TrackerError::TaskConflict { .. })),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(store.assignments().await.len(), 1);
}

#[tokio::test]
async fn test_pending_queue_is_oldest_first() {
    let (tracker, _store, _) = setup(20).await;
    let bob = LearnerId(200);
    tracker.register(bob, None, "Bob").await.unwrap();

    assign_lesson(&tracker, ANN).await;
    assign_lesson(&tracker, bob).await;
    let first = tracker.submit(bob).await.unwrap();
    let second = tracker.submit(ANN).await.unwrap();

    let queue: Vec<AssignmentId> = tracker
        .pending_assignments()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.id)
        .collect();
    assert_eq!(queue, vec![first.id, second.id]);
}

// =============================================================================
// Approval
// =============================================================================

#[tokio::test]
async fn test_end_to_end_first_lesson() {
    let (tracker, store, notifier) = setup(20).await;
    let lesson = assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();

    let result = tracker.approve(assignment.id).await.unwrap();
    assert_eq!(result.reward, 10);
    assert_eq!(result.reputation, 10);
    assert_eq!(result.rank, "Novice");
    assert!(!result.rank_changed);
    assert_close(result.progress, 5.0);
    assert_eq!(result.assignment.status, AssignmentStatus::Approved);
    assert!(result.assignment.decided_at.is_some());

    let learner = store.load_learner(ANN).await.unwrap().unwrap();
    assert!(learner.active_task.is_none());
    assert!(learner.completed_lessons.contains(&lesson));
    assert_eq!(learner.reputation, 10);

    let notices = notifier.learner.lock().unwrap().clone();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].0, ANN);
    assert!(matches!(notices[0].1, LearnerNotice::Approved { reward: 10, .. }));
}

#[tokio::test]
async fn test_five_of_twenty_is_quarter_progress() {
    let (tracker, store, _) = setup(20).await;
    for _ in 0..5 {
        complete_next_lesson(&tracker, ANN).await;
    }

    let learner = store.load_learner(ANN).await.unwrap().unwrap();
    assert_close(learner.progress, 25.0);
    assert_eq!(learner.reputation, 50);
    assert_eq!(learner.rank, "Apprentice");
}

#[tokio::test]
async fn test_final_lesson_pays_final_reward() {
    let (tracker, store, _) = setup(3).await;
    complete_next_lesson(&tracker, ANN).await;
    complete_next_lesson(&tracker, ANN).await;

    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    let result = tracker.approve(assignment.id).await.unwrap();

    assert_eq!(result.reward, 30);
    assert_eq!(result.reputation, 50);
    assert_close(result.progress, 100.0);

    assert_eq!(
        tracker.assign_next_lesson(ANN).await.unwrap(),
        NextLesson::CourseComplete
    );
    assert_eq!(store.load_learner(ANN).await.unwrap().unwrap().reputation, 50);
}

#[tokio::test]
async fn test_marker_match_ignores_case() {
    let store = Arc::new(
        MemoryStore::new().with_course(CourseId(1), &["Warm-up", "FINAL EXAM: blues"]),
    );
    let progression = ProgressionConfig {
        final_lesson_marker: "Final Exam".to_string(),
        ..ProgressionConfig::default()
    };
    let tracker = Tracker::new(
        store.clone(),
        store.clone(),
        Arc::new(RecordingNotifier::default()),
        progression,
    )
    .unwrap();
    tracker.register(ANN, None, "Ann").await.unwrap();

    complete_next_lesson(&tracker, ANN).await;
    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();

    assert_eq!(tracker.approve(assignment.id).await.unwrap().reward, 30);
}

#[tokio::test]
async fn test_song_reward_leaves_progress_alone() {
    let (tracker, store, _) = setup(20).await;
    complete_next_lesson(&tracker, ANN).await;

    tracker.assign_song(ANN, SongId(2)).await.unwrap();
    let assignment = tracker.submit(ANN).await.unwrap();
    let result = tracker.approve(assignment.id).await.unwrap();

    assert_eq!(result.reward, 20);
    assert_eq!(result.reputation, 30);
    assert_close(result.progress, 5.0);

    let learner = store.load_learner(ANN).await.unwrap().unwrap();
    assert!(learner.completed_songs.contains(&SongId(2)));
    assert!(learner.active_task.is_none());
    assert!(matches!(
        tracker.assign_song(ANN, SongId(2)).await,
        Err(TrackerError::AlreadyCompleted(SongId(2)))
    ));
}

#[tokio::test]
async fn test_rank_change_is_reported() {
    let (tracker, store, _) = setup(20).await;

    let mut learner = store.load_learner(ANN).await.unwrap().unwrap();
    learner.reputation = 45;
    store.save_learner(&learner).await.unwrap();

    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    let result = tracker.approve(assignment.id).await.unwrap();

    assert_eq!(result.reputation, 55);
    assert_eq!(result.rank, "Apprentice");
    assert!(result.rank_changed);
}

#[tokio::test]
async fn test_double_approve_applies_once() {
    let (tracker, store, _) = setup(20).await;
    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();

    tracker.approve(assignment.id).await.unwrap();
    let before = store.load_learner(ANN).await.unwrap().unwrap();

    match tracker.approve(assignment.id).await {
        Err(TrackerError::AlreadyDecided { status, .. }) => {
            assert_eq!(status, AssignmentStatus::Approved)
        }
        other => panic!("expected AlreadyDecided, got {:?}", other),
    }
    assert_eq!(store.load_learner(ANN).await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_concurrent_approvals_apply_once() {
    let (tracker, store, _) = setup(20).await;
    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    let tracker = Arc::new(tracker);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let tracker = tracker.clone();
            tokio::spawn(async move { tracker.approve(assignment.id).await })
        })
        .collect();

    let mut approved = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            approved += 1;
        }
    }

    assert_eq!(approved, 1);
    assert_eq!(store.load_learner(ANN).await.unwrap().unwrap().reputation, 10);
}

#[tokio::test]
async fn test_unknown_assignment() {
    let (tracker, _store, _) = setup(20).await;

    assert!(matches!(
        tracker.approve(AssignmentId(999)).await,
        Err(TrackerError::NotFound(Missing::Assignment(AssignmentId(999))))
    ));
    assert!(matches!(
        tracker.reject(AssignmentId(999)).await,
        Err(TrackerError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_approve_with_missing_learner_keeps_assignment_pending() {
    let (tracker, store, _) = setup(20).await;
    let orphan = store
        .create_assignment(LearnerId(5), TaskRef::Lesson(LessonId(1)))
        .await
        .unwrap();

    let err = tracker.approve(orphan.id).await.unwrap_err();
    assert!(matches!(err, TrackerError::LearnerNotFound(LearnerId(5))));
    assert!(err.is_integrity());
    assert!(store
        .load_assignment(orphan.id)
        .await
        .unwrap()
        .unwrap()
        .is_pending());
}

// =============================================================================
// Rejection
// =============================================================================

#[tokio::test]
async fn test_reject_preserves_learner_and_allows_resubmit() {
    let (tracker, store, notifier) = setup(20).await;
    let lesson = assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    let before = store.load_learner(ANN).await.unwrap().unwrap();

    let rejected = tracker.reject(assignment.id).await.unwrap();
    assert_eq!(rejected.status, AssignmentStatus::Rejected);

    let after = store.load_learner(ANN).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert_eq!(after.active_task, Some(TaskRef::Lesson(lesson)));

    assert!(matches!(
        notifier.learner.lock().unwrap()[0].1,
        LearnerNotice::Rejected { .. }
    ));

    let resubmitted = tracker.submit(ANN).await.unwrap();
    assert_ne!(resubmitted.id, assignment.id);
}

#[tokio::test]
async fn test_decided_assignment_cannot_be_decided_again() {
    let (tracker, store, _) = setup(20).await;
    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    tracker.reject(assignment.id).await.unwrap();

    assert!(matches!(
        tracker.reject(assignment.id).await,
        Err(TrackerError::AlreadyDecided { status: AssignmentStatus::Rejected, .. })
    ));
    assert!(matches!(
        tracker.approve(assignment.id).await,
        Err(TrackerError::AlreadyDecided { .. })
    ));
    assert_eq!(store.load_learner(ANN).await.unwrap().unwrap().reputation, 0);
}

// =============================================================================
// Failure handling
// =============================================================================

#[tokio::test]
async fn test_failed_commit_rolls_back_approval() {
    let (tracker, store, notifier) = setup(20).await;
    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    let before = store.load_learner(ANN).await.unwrap().unwrap();

    store.fail_next_commits(1);
    let err = tracker.approve(assignment.id).await.unwrap_err();
    assert!(matches!(err, TrackerError::Storage(_)));

    assert_eq!(store.load_learner(ANN).await.unwrap().unwrap(), before);
    assert!(store
        .load_assignment(assignment.id)
        .await
        .unwrap()
        .unwrap()
        .is_pending());
    assert!(notifier.learner.lock().unwrap().is_empty());

    let result = tracker.approve(assignment.id).await.unwrap();
    assert_eq!(result.reputation, 10);
}

#[tokio::test]
async fn test_notification_failure_does_not_fail_operations() {
    let store = store_with_course(20);
    let tracker = tracker_with(store.clone(), Arc::new(BrokenNotifier));
    tracker.register(ANN, None, "Ann").await.unwrap();

    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    let result = tracker.approve(assignment.id).await.unwrap();
    assert_eq!(result.reputation, 10);

    assign_lesson(&tracker, ANN).await;
    let assignment = tracker.submit(ANN).await.unwrap();
    assert!(tracker.reject(assignment.id).await.is_ok());
}

// =============================================================================
// Profile and reviewer bootstrap
// =============================================================================

#[tokio::test]
async fn test_profile_reports_progress() {
    let (tracker, _store, _) = setup(20).await;
    complete_next_lesson(&tracker, ANN).await;
    assign_lesson(&tracker, ANN).await;

    let profile = tracker.profile(ANN).await.unwrap();
    assert_eq!(profile.summary.display_name, "Ann");
    assert_eq!(profile.completed_lessons, 1);
    assert_eq!(profile.completed_songs, 0);
    assert_eq!(profile.course_lessons, 20);
    assert_eq!(profile.active_title.as_deref(), Some("Lesson 2"));
    assert_close(profile.progress, 5.0);
}

#[tokio::test]
async fn test_seed_reviewer() {
    let (tracker, store, _) = setup(20).await;

    let reviewer = tracker.seed_reviewer(LearnerId(1), "Mentor").await.unwrap();
    assert_eq!(reviewer.reputation, 1000);
    assert_eq!(reviewer.rank, "Fretboard Legend");
    assert!(reviewer.graduated);

    // Running again at the next startup changes nothing
    tracker.seed_reviewer(LearnerId(1), "Mentor").await.unwrap();
    assert_eq!(store.load_learner(LearnerId(1)).await.unwrap().unwrap(), reviewer);
}
