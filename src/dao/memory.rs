//! In-memory store backing both the content collaborator and the session tables.
//!
//! The orchestrator state is never persisted; these tables live as long as the process.

use std::collections::{BTreeMap, HashMap, HashSet};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tokio::sync::RwLock;

use crate::{
    dao::{
        content_store::ContentStore,
        models::ContentFile,
        session_store::{AnswerUpsert, SessionStore},
        storage::{StorageError, StorageResult},
    },
    state::quiz::{
        Answer, AnswerId, Contestant, FieldPoints, PointSlot, PresenceStatus, Question,
        QuestionId, Quiz, QuizId, SubmittedFields,
    },
};

/// Positions are shifted into this band during the first renumbering pass.
const REPOSITION_OFFSET: u32 = 10_000;
const POSITION_CONSTRAINT: &str = "uq_question_quiz_round_position";

type PositionKey = (QuizId, u32, u32);

#[derive(Default)]
struct ContentTables {
    quizzes: IndexMap<QuizId, (Quiz, bool)>,
    questions: BTreeMap<QuestionId, Question>,
    positions: HashMap<PositionKey, QuestionId>,
    next_question_id: QuestionId,
}

impl ContentTables {
    fn insert_question(&mut self, question: Question) -> StorageResult<()> {
        let key = (question.quiz_id, question.round_number, question.position);
        if self.positions.contains_key(&key) {
            return Err(StorageError::UniqueViolation {
                constraint: POSITION_CONSTRAINT,
            });
        }
        self.positions.insert(key, question.id);
        self.questions.insert(question.id, question);
        Ok(())
    }

    /// Single row position write, enforcing the unique `(quiz, round, position)` index.
    fn move_position(&mut self, id: QuestionId, position: u32) -> StorageResult<()> {
        let question = self
            .questions
            .get(&id)
            .ok_or(StorageError::QuestionNotFound(id))?;
        let old_key = (question.quiz_id, question.round_number, question.position);
        let new_key = (question.quiz_id, question.round_number, position);
        if old_key == new_key {
            return Ok(());
        }
        if self.positions.contains_key(&new_key) {
            return Err(StorageError::UniqueViolation {
                constraint: POSITION_CONSTRAINT,
            });
        }

        self.positions.remove(&old_key);
        self.positions.insert(new_key, id);
        if let Some(question) = self.questions.get_mut(&id) {
            question.position = position;
        }
        Ok(())
    }

    fn round_ids(&self, quiz_id: QuizId, round: u32) -> Vec<QuestionId> {
        let mut round: Vec<&Question> = self
            .questions
            .values()
            .filter(|q| q.quiz_id == quiz_id && q.round_number == round)
            .collect();
        round.sort_by_key(|q| q.position);
        round.into_iter().map(|q| q.id).collect()
    }

    fn round_questions(&self, quiz_id: QuizId, round: u32) -> Vec<Question> {
        self.round_ids(quiz_id, round)
            .into_iter()
            .filter_map(|id| self.questions.get(&id).cloned())
            .collect()
    }
}

#[derive(Default)]
struct SessionTables {
    contestants: IndexMap<String, Contestant>,
    next_contestant_id: u64,
    answers: BTreeMap<AnswerId, Answer>,
    answer_index: HashMap<(String, QuestionId), AnswerId>,
    next_answer_id: AnswerId,
    /// Questions whose answers were locked at the end of their window.
    closed: HashSet<QuestionId>,
}

impl SessionTables {
    fn contestant_mut(&mut self, name: &str) -> StorageResult<&mut Contestant> {
        self.contestants
            .get_mut(name)
            .ok_or_else(|| StorageError::ContestantNotFound(name.to_string()))
    }

    fn answer_slot(&mut self, contestant: &str, question: &Question) -> &mut Answer {
        let next_id = &mut self.next_answer_id;
        let id = *self
            .answer_index
            .entry((contestant.to_string(), question.id))
            .or_insert_with(|| {
                *next_id += 1;
                *next_id
            });
        self.answers.entry(id).or_insert_with(|| Answer {
            id,
            contestant: contestant.to_string(),
            quiz_id: question.quiz_id,
            round_number: question.round_number,
            question_id: question.id,
            fields: SubmittedFields::default(),
            points: FieldPoints::default(),
            overridden: Vec::new(),
            submission_time: 0.0,
            locked: false,
        })
    }

    fn answer_mut(&mut self, id: AnswerId) -> StorageResult<&mut Answer> {
        self.answers
            .get_mut(&id)
            .ok_or(StorageError::AnswerNotFound(id))
    }
}

/// Process-local store implementing [`ContentStore`] and [`SessionStore`].
#[derive(Default)]
pub struct MemoryStore {
    content: RwLock<ContentTables>,
    session: RwLock<SessionTables>,
}

impl MemoryStore {
    /// Create an empty store without any quiz.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store holding a single active quiz seeded from a content document.
    pub fn from_content(file: ContentFile) -> StorageResult<Self> {
        let mut content = ContentTables::default();
        let quiz = Quiz {
            id: 1,
            title: file.title,
        };
        content.quizzes.insert(quiz.id, (quiz.clone(), true));

        for entity in file.questions {
            content.next_question_id += 1;
            content.insert_question(Question {
                id: content.next_question_id,
                quiz_id: quiz.id,
                round_number: entity.round,
                position: entity.position,
                duration: entity.duration,
                kind: entity.kind.into(),
            })?;
        }

        Ok(Self {
            content: RwLock::new(content),
            session: RwLock::new(SessionTables::default()),
        })
    }
}

impl ContentStore for MemoryStore {
    fn active_quiz(&self) -> BoxFuture<'_, StorageResult<Option<Quiz>>> {
        Box::pin(async move {
            let content = self.content.read().await;
            Ok(content
                .quizzes
                .values()
                .find(|(_, active)| *active)
                .map(|(quiz, _)| quiz.clone()))
        })
    }

    fn first_question(
        &self,
        quiz_id: QuizId,
        round: u32,
    ) -> BoxFuture<'_, StorageResult<Option<Question>>> {
        Box::pin(async move {
            let content = self.content.read().await;
            Ok(content.round_questions(quiz_id, round).into_iter().next())
        })
    }

    fn next_question(
        &self,
        quiz_id: QuizId,
        round: u32,
        after_position: u32,
    ) -> BoxFuture<'_, StorageResult<Option<Question>>> {
        Box::pin(async move {
            let content = self.content.read().await;
            Ok(content
                .round_questions(quiz_id, round)
                .into_iter()
                .find(|q| q.position > after_position))
        })
    }

    fn question_by_id(&self, id: QuestionId) -> BoxFuture<'_, StorageResult<Option<Question>>> {
        Box::pin(async move {
            let content = self.content.read().await;
            Ok(content.questions.get(&id).cloned())
        })
    }

    fn questions_in_round(
        &self,
        quiz_id: QuizId,
        round: u32,
    ) -> BoxFuture<'_, StorageResult<Vec<Question>>> {
        Box::pin(async move {
            let content = self.content.read().await;
            Ok(content.round_questions(quiz_id, round))
        })
    }

    fn reposition_question(
        &self,
        id: QuestionId,
        position: u32,
    ) -> BoxFuture<'_, StorageResult<Vec<Question>>> {
        Box::pin(async move {
            let mut content = self.content.write().await;
            let (quiz_id, round) = content
                .questions
                .get(&id)
                .map(|q| (q.quiz_id, q.round_number))
                .ok_or(StorageError::QuestionNotFound(id))?;

            let mut order = content.round_ids(quiz_id, round);
            order.retain(|other| *other != id);
            let target = (position.max(1) as usize - 1).min(order.len());
            order.insert(target, id);

            // First pass parks every row outside the live range so the final
            // assignment never collides with a position still held by a sibling.
            for qid in &order {
                let current = content
                    .questions
                    .get(qid)
                    .map(|q| q.position)
                    .ok_or(StorageError::QuestionNotFound(*qid))?;
                content.move_position(*qid, current + REPOSITION_OFFSET)?;
            }
            for (index, qid) in order.iter().enumerate() {
                content.move_position(*qid, index as u32 + 1)?;
            }

            Ok(content.round_questions(quiz_id, round))
        })
    }
}

impl SessionStore for MemoryStore {
    fn join_contestant(
        &self,
        name: String,
        pin: String,
        registrations_open: bool,
    ) -> BoxFuture<'_, StorageResult<Contestant>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            if let Some(existing) = session.contestants.get_mut(&name) {
                if existing.pin != pin {
                    return Err(StorageError::PinMismatch(name));
                }
                existing.status = PresenceStatus::Active;
                return Ok(existing.clone());
            }

            if !registrations_open {
                return Err(StorageError::RegistrationsClosed);
            }

            session.next_contestant_id += 1;
            let contestant = Contestant {
                id: session.next_contestant_id,
                name: name.clone(),
                pin,
                score: 0.0,
                flagged: false,
                status: PresenceStatus::Active,
            };
            session.contestants.insert(name, contestant.clone());
            Ok(contestant)
        })
    }

    fn contestant(&self, name: &str) -> BoxFuture<'_, StorageResult<Option<Contestant>>> {
        let name = name.to_string();
        Box::pin(async move {
            let session = self.session.read().await;
            Ok(session.contestants.get(&name).cloned())
        })
    }

    fn contestants(&self) -> BoxFuture<'_, StorageResult<Vec<Contestant>>> {
        Box::pin(async move {
            let session = self.session.read().await;
            Ok(session.contestants.values().cloned().collect())
        })
    }

    fn set_status(
        &self,
        name: &str,
        status: PresenceStatus,
    ) -> BoxFuture<'_, StorageResult<Contestant>> {
        let name = name.to_string();
        Box::pin(async move {
            let mut session = self.session.write().await;
            let contestant = session.contestant_mut(&name)?;
            contestant.status = status;
            Ok(contestant.clone())
        })
    }

    fn flag_contestant(&self, name: &str) -> BoxFuture<'_, StorageResult<Contestant>> {
        let name = name.to_string();
        Box::pin(async move {
            let mut session = self.session.write().await;
            let contestant = session.contestant_mut(&name)?;
            contestant.flagged = true;
            Ok(contestant.clone())
        })
    }

    fn upsert_answer(&self, upsert: AnswerUpsert) -> BoxFuture<'_, StorageResult<Option<Answer>>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            if !session.contestants.contains_key(&upsert.contestant) {
                return Err(StorageError::ContestantNotFound(upsert.contestant));
            }
            if session.closed.contains(&upsert.question.id) {
                return Ok(None);
            }

            let answer = session.answer_slot(&upsert.contestant, &upsert.question);
            if answer.locked {
                return Ok(None);
            }
            answer.fields = upsert.fields;
            answer.submission_time = upsert.submission_time;
            Ok(Some(answer.clone()))
        })
    }

    fn lock_answers(&self, question_id: QuestionId) -> BoxFuture<'_, StorageResult<usize>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            session.closed.insert(question_id);
            let mut count = 0;
            for answer in session
                .answers
                .values_mut()
                .filter(|a| a.question_id == question_id)
            {
                answer.locked = true;
                count += 1;
            }
            Ok(count)
        })
    }

    fn reopen_answers(&self, question_id: QuestionId) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            session.closed.remove(&question_id);
            session
                .answers
                .values_mut()
                .filter(|a| a.question_id == question_id)
                .for_each(|answer| answer.locked = false);
            Ok(())
        })
    }

    fn lock_contestant_answer(
        &self,
        contestant: &str,
        question: &Question,
    ) -> BoxFuture<'_, StorageResult<Answer>> {
        let contestant = contestant.to_string();
        let question = question.clone();
        Box::pin(async move {
            let mut session = self.session.write().await;
            if !session.contestants.contains_key(&contestant) {
                return Err(StorageError::ContestantNotFound(contestant));
            }
            let answer = session.answer_slot(&contestant, &question);
            answer.locked = true;
            Ok(answer.clone())
        })
    }

    fn answer(&self, id: AnswerId) -> BoxFuture<'_, StorageResult<Option<Answer>>> {
        Box::pin(async move {
            let session = self.session.read().await;
            Ok(session.answers.get(&id).cloned())
        })
    }

    fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> BoxFuture<'_, StorageResult<Vec<Answer>>> {
        Box::pin(async move {
            let session = self.session.read().await;
            Ok(session
                .answers
                .values()
                .filter(|a| a.question_id == question_id)
                .cloned()
                .collect())
        })
    }

    fn answers_for_round(
        &self,
        quiz_id: QuizId,
        round: u32,
    ) -> BoxFuture<'_, StorageResult<Vec<Answer>>> {
        Box::pin(async move {
            let session = self.session.read().await;
            Ok(session
                .answers
                .values()
                .filter(|a| a.quiz_id == quiz_id && a.round_number == round)
                .cloned()
                .collect())
        })
    }

    fn answers_for_quiz(&self, quiz_id: QuizId) -> BoxFuture<'_, StorageResult<Vec<Answer>>> {
        Box::pin(async move {
            let session = self.session.read().await;
            Ok(session
                .answers
                .values()
                .filter(|a| a.quiz_id == quiz_id)
                .cloned()
                .collect())
        })
    }

    fn set_points(
        &self,
        id: AnswerId,
        points: FieldPoints,
    ) -> BoxFuture<'_, StorageResult<Answer>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            let answer = session.answer_mut(id)?;
            for slot in [PointSlot::Primary, PointSlot::Secondary, PointSlot::Extra] {
                if !answer.overridden.contains(&slot) {
                    answer.points.set(slot, points.get(slot));
                }
            }
            Ok(answer.clone())
        })
    }

    fn override_points(
        &self,
        id: AnswerId,
        slot: PointSlot,
        value: f64,
    ) -> BoxFuture<'_, StorageResult<Answer>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            let answer = session.answer_mut(id)?;
            answer.points.set(slot, value);
            if !answer.overridden.contains(&slot) {
                answer.overridden.push(slot);
            }
            Ok(answer.clone())
        })
    }

    fn set_scores(&self, scores: IndexMap<String, f64>) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut session = self.session.write().await;
            for contestant in session.contestants.values_mut() {
                contestant.score = scores.get(&contestant.name).copied().unwrap_or(0.0);
            }
            Ok(())
        })
    }
}
