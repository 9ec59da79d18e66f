//! Leaderboard aggregation: scores are always rebuilt from the recorded answers.

use std::cmp::Ordering;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    dto::common::LeaderboardEntry,
    error::ServiceError,
    state::{
        SharedState,
        quiz::{Answer, Contestant},
    },
};

/// Sum answer points per contestant. Every contestant appears, starting at zero.
pub fn aggregate(contestants: &[Contestant], answers: &[Answer]) -> IndexMap<String, f64> {
    let mut totals: IndexMap<String, f64> = contestants
        .iter()
        .map(|contestant| (contestant.name.clone(), 0.0))
        .collect();
    for answer in answers {
        if let Some(total) = totals.get_mut(&answer.contestant) {
            *total += answer.points.total();
        }
    }
    totals
}

/// Order totals by score, highest first; ties are ordered by name.
pub fn ranked(totals: &IndexMap<String, f64>) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = totals
        .iter()
        .map(|(name, score)| LeaderboardEntry {
            name: name.clone(),
            score: *score,
        })
        .collect();
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });
    entries
}

/// Recompute and store every contestant score for the active quiz.
///
/// Idempotent: running it twice without new answers yields the same scores.
pub async fn recompute(state: &SharedState) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let contestants = state.sessions().contestants().await?;
    let answers = match state.content().active_quiz().await? {
        Some(quiz) => state.sessions().answers_for_quiz(quiz.id).await?,
        None => Vec::new(),
    };

    let totals = aggregate(&contestants, &answers);
    state.sessions().set_scores(totals.clone()).await?;
    debug!(contestants = totals.len(), "leaderboard recomputed");
    Ok(ranked(&totals))
}

/// Current stored scores without recomputation.
pub async fn current(state: &SharedState) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let contestants = state.sessions().contestants().await?;
    let totals: IndexMap<String, f64> = contestants
        .into_iter()
        .map(|contestant| (contestant.name, contestant.score))
        .collect();
    Ok(ranked(&totals))
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            memory::MemoryStore,
            models::{ContentFile, QuestionEntity, QuestionKindEntity},
            session_store::AnswerUpsert,
        },
        state::{
            AppState,
            quiz::{FieldPoints, SubmittedFields},
        },
    };

    fn state() -> SharedState {
        let store = Arc::new(
            MemoryStore::from_content(ContentFile {
                title: "Pub quiz".into(),
                questions: vec![QuestionEntity {
                    round: 1,
                    position: 1,
                    duration: Duration::from_secs(30),
                    kind: QuestionKindEntity::Text {
                        question_text: "Capital of Peru?".into(),
                        answer_text: "Lima".into(),
                    },
                }],
            })
            .unwrap(),
        );
        AppState::new(AppConfig::default(), store.clone(), store)
    }

    #[test]
    fn ties_are_ordered_by_name() {
        let totals = IndexMap::from([
            ("zoe".to_string(), 1.0),
            ("ana".to_string(), 1.0),
            ("bo".to_string(), 2.5),
        ]);
        let names: Vec<_> = ranked(&totals).into_iter().map(|e| e.name).collect();
        assert_eq!(names, ["bo", "ana", "zoe"]);
    }

    #[tokio::test]
    async fn recompute_is_idempotent_and_includes_silent_contestants() {
        let state = state();
        let sessions = state.sessions();
        sessions
            .join_contestant("ana".into(), "1111".into(), true)
            .await
            .unwrap();
        sessions
            .join_contestant("bo".into(), "2222".into(), true)
            .await
            .unwrap();

        let question = state.content().question_by_id(1).await.unwrap().unwrap();
        let answer = sessions
            .upsert_answer(AnswerUpsert {
                contestant: "ana".into(),
                question,
                fields: SubmittedFields {
                    title: "Lima".into(),
                    ..Default::default()
                },
                submission_time: 2.0,
            })
            .await
            .unwrap()
            .unwrap();
        sessions
            .set_points(
                answer.id,
                FieldPoints {
                    secondary: 0.8,
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let first = recompute(&state).await.unwrap();
        let second = recompute(&state).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].name, "ana");
        assert_eq!(first[0].score, 0.8);
        assert_eq!(first[1].name, "bo");
        assert_eq!(first[1].score, 0.0);
        assert_eq!(current(&state).await.unwrap(), first);
    }
}
