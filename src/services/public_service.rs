//! Service helpers that expose read-only public projections of the live session.

use crate::{
    dto::{
        common::QuestionView,
        public::{LeaderboardResponse, SessionResponse},
    },
    error::ServiceError,
    services::leaderboard,
    state::{SharedState, session::SessionPhase},
};

/// Return the ordered leaderboard of the active quiz.
pub async fn get_leaderboard(state: &SharedState) -> Result<LeaderboardResponse, ServiceError> {
    Ok(LeaderboardResponse {
        entries: leaderboard::current(state).await?,
    })
}

/// Return the visible phase, the active question and the time left in the running window.
pub fn get_session(state: &SharedState) -> SessionResponse {
    let snapshot = state.session_snapshot();
    let round = match &snapshot.phase {
        SessionPhase::Idle => None,
        SessionPhase::Countdown { round } | SessionPhase::RoundFinalized { round } => Some(*round),
        SessionPhase::QuestionActive(active) | SessionPhase::AnswerReveal(active) => {
            Some(active.round)
        }
    };
    SessionResponse {
        phase: (&snapshot.phase).into(),
        round,
        question: snapshot
            .phase
            .active_question()
            .map(|active| QuestionView::from(&active.question)),
        remaining_secs: snapshot
            .window
            .map(|clock| clock.remaining().as_secs_f64()),
        paused: state.is_paused(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::memory::MemoryStore, dto::phase::VisibleSessionPhase,
        state::{AppState, session::SessionEvent},
    };

    #[tokio::test]
    async fn idle_session_has_no_round_or_window() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(AppConfig::default(), store.clone(), store);

        let idle = get_session(&state);
        assert_eq!(idle.phase, VisibleSessionPhase::Idle);
        assert!(idle.round.is_none());
        assert!(idle.remaining_secs.is_none());

        let mut writer = state.claim_session().unwrap();
        writer
            .apply(SessionEvent::StartCountdown { round: 3 })
            .unwrap();
        let countdown = get_session(&state);
        assert_eq!(countdown.phase, VisibleSessionPhase::Countdown);
        assert_eq!(countdown.round, Some(3));

        assert!(get_leaderboard(&state).await.unwrap().entries.is_empty());
    }
}
