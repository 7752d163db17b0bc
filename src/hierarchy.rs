//! In-memory mirror of the course tree.
//!
//! Callers address nodes by position. Every structural edit goes to the
//! store first and then triggers a full reload. A single-field assignment
//! edit patches the cached node in place once the store confirms the row
//! was written.

use serde::Serialize;
use std::fmt;

use crate::store::{Assignment, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseNode {
    pub id: i64,
    pub name: String,
    pub subjects: Vec<SubjectNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectNode {
    pub id: i64,
    pub name: String,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Course,
    Subject,
    Assignment,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Course => "course",
            Level::Subject => "subject",
            Level::Assignment => "assignment",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{level} index {index} out of range (len {len})")]
    IndexOutOfRange { level: Level, index: usize, len: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store write committed; only the reload after it failed.
    #[error("change saved but reload failed: {0}")]
    Resync(#[source] StoreError),
}

/// One editable assignment field together with its new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentField {
    Grade(String),
    MaxGrade(String),
    Date(String),
    Completed(bool),
}

impl AssignmentField {
    fn apply(&self, a: &mut Assignment) {
        match self {
            AssignmentField::Grade(v) => a.grade = v.clone(),
            AssignmentField::MaxGrade(v) => a.max_grade = v.clone(),
            AssignmentField::Date(v) => a.date = v.clone(),
            AssignmentField::Completed(v) => a.completed = *v,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            AssignmentField::Grade(_) => "grade",
            AssignmentField::MaxGrade(_) => "maxGrade",
            AssignmentField::Date(_) => "date",
            AssignmentField::Completed(_) => "completed",
        }
    }
}

type Observer = Box<dyn FnMut()>;

pub struct Hierarchy {
    store: Store,
    courses: Vec<CourseNode>,
    observers: Vec<Observer>,
    revision: u64,
    stale: bool,
}

impl Hierarchy {
    /// Wraps a store with an empty cache. Call `reload` to populate it.
    pub fn new(store: Store) -> Self {
        Self {
            store,
            courses: Vec::new(),
            observers: Vec::new(),
            revision: 0,
            stale: false,
        }
    }

    pub fn courses(&self) -> &[CourseNode] {
        &self.courses
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when a committed write could not be followed by a reload.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    #[cfg(test)]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Registers a payload-less change callback. Observers re-read `courses()`.
    pub fn subscribe(&mut self, observer: impl FnMut() + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self) {
        self.revision += 1;
        for observer in self.observers.iter_mut() {
            observer();
        }
    }

    /// Rebuilds the whole cache from the store. The previous cache is kept
    /// if any fetch fails.
    pub fn reload(&mut self) -> Result<(), SyncError> {
        let mut courses = Vec::new();
        for course in self.store.list_courses()? {
            let mut subjects = Vec::new();
            for subject in self.store.list_subjects_by_course(course.id)? {
                let assignments = self.store.list_assignments_by_subject(subject.id)?;
                subjects.push(SubjectNode {
                    id: subject.id,
                    name: subject.name,
                    assignments,
                });
            }
            courses.push(CourseNode {
                id: course.id,
                name: course.name,
                subjects,
            });
        }
        self.courses = courses;
        self.stale = false;
        tracing::debug!(courses = self.courses.len(), "cache reloaded");
        self.notify();
        Ok(())
    }

    fn reload_after_write(&mut self) -> Result<(), SyncError> {
        self.reload().map_err(|e| {
            self.stale = true;
            tracing::error!("write committed but reload failed: {e}");
            match e {
                SyncError::Store(se) => SyncError::Resync(se),
                other => other,
            }
        })
    }

    // ---- index resolution ----

    fn course_at(&self, ci: usize) -> Result<&CourseNode, SyncError> {
        self.courses.get(ci).ok_or_else(|| {
            out_of_range(Level::Course, ci, self.courses.len())
        })
    }

    fn subject_at(&self, ci: usize, si: usize) -> Result<&SubjectNode, SyncError> {
        let course = self.course_at(ci)?;
        course
            .subjects
            .get(si)
            .ok_or_else(|| out_of_range(Level::Subject, si, course.subjects.len()))
    }

    fn assignment_at(&self, ci: usize, si: usize, ti: usize) -> Result<&Assignment, SyncError> {
        let subject = self.subject_at(ci, si)?;
        subject
            .assignments
            .get(ti)
            .ok_or_else(|| out_of_range(Level::Assignment, ti, subject.assignments.len()))
    }

    // ---- structural edits ----

    pub fn add_course(&mut self, name: &str) -> Result<(), SyncError> {
        self.store
            .create_course(name)
            .inspect_err(|e| tracing::warn!(name, "add course failed: {e}"))?;
        self.reload_after_write()
    }

    pub fn add_subject(&mut self, ci: usize, name: &str) -> Result<(), SyncError> {
        let course_id = self.course_at(ci)?.id;
        self.store
            .create_subject(course_id, name)
            .inspect_err(|e| tracing::warn!(course_id, name, "add subject failed: {e}"))?;
        self.reload_after_write()
    }

    pub fn add_assignment(&mut self, ci: usize, si: usize, name: &str) -> Result<(), SyncError> {
        let subject_id = self.subject_at(ci, si)?.id;
        self.store
            .create_assignment(subject_id, name, "", "", "", false)
            .inspect_err(|e| tracing::warn!(subject_id, name, "add assignment failed: {e}"))?;
        self.reload_after_write()
    }

    pub fn remove_course(&mut self, ci: usize) -> Result<(), SyncError> {
        let course_id = self.course_at(ci)?.id;
        self.store
            .delete_course(course_id)
            .inspect_err(|e| tracing::warn!(course_id, "remove course failed: {e}"))?;
        self.reload_after_write()
    }

    pub fn remove_subject(&mut self, ci: usize, si: usize) -> Result<(), SyncError> {
        let subject_id = self.subject_at(ci, si)?.id;
        self.store
            .delete_subject(subject_id)
            .inspect_err(|e| tracing::warn!(subject_id, "remove subject failed: {e}"))?;
        self.reload_after_write()
    }

    pub fn remove_assignment(&mut self, ci: usize, si: usize, ti: usize) -> Result<(), SyncError> {
        let assignment_id = self.assignment_at(ci, si, ti)?.id;
        self.store
            .delete_assignment(assignment_id)
            .inspect_err(|e| tracing::warn!(assignment_id, "remove assignment failed: {e}"))?;
        self.reload_after_write()
    }

    // ---- field patch ----

    /// Writes one field through to the store and patches the cached node.
    /// No reload: cardinality is unchanged and the store has confirmed the row.
    pub fn update_assignment_field(
        &mut self,
        ci: usize,
        si: usize,
        ti: usize,
        field: AssignmentField,
    ) -> Result<(), SyncError> {
        let mut merged = self.assignment_at(ci, si, ti)?.clone();
        field.apply(&mut merged);

        self.store
            .update_assignment(
                merged.id,
                &merged.name,
                &merged.grade,
                &merged.max_grade,
                &merged.date,
                merged.completed,
            )
            .inspect_err(|e| {
                tracing::warn!(id = merged.id, field = field.name(), "update failed: {e}")
            })?;

        self.courses[ci].subjects[si].assignments[ti] = merged;
        self.notify();
        Ok(())
    }

    // ---- id -> position ----

    pub fn locate_course(&self, id: i64) -> Option<usize> {
        self.courses.iter().position(|c| c.id == id)
    }

    pub fn locate_subject(&self, id: i64) -> Option<(usize, usize)> {
        self.courses.iter().enumerate().find_map(|(ci, c)| {
            c.subjects
                .iter()
                .position(|s| s.id == id)
                .map(|si| (ci, si))
        })
    }

    pub fn locate_assignment(&self, id: i64) -> Option<(usize, usize, usize)> {
        for (ci, c) in self.courses.iter().enumerate() {
            for (si, s) in c.subjects.iter().enumerate() {
                if let Some(ti) = s.assignments.iter().position(|a| a.id == id) {
                    return Some((ci, si, ti));
                }
            }
        }
        None
    }
}

fn out_of_range(level: Level, index: usize, len: usize) -> SyncError {
    tracing::warn!(%level, index, len, "index out of range; operation skipped");
    SyncError::IndexOutOfRange { level, index, len }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn tracker() -> (Hierarchy, Rc<Cell<usize>>) {
        let mut h = Hierarchy::new(Store::open_in_memory().expect("store"));
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        h.subscribe(move || counter.set(counter.get() + 1));
        h.reload().expect("initial load");
        (h, hits)
    }

    /// Cache rebuilt straight from the store's list operations.
    fn from_store(store: &Store) -> Vec<CourseNode> {
        store
            .list_courses()
            .expect("courses")
            .into_iter()
            .map(|c| CourseNode {
                id: c.id,
                name: c.name,
                subjects: store
                    .list_subjects_by_course(c.id)
                    .expect("subjects")
                    .into_iter()
                    .map(|s| SubjectNode {
                        id: s.id,
                        name: s.name,
                        assignments: store.list_assignments_by_subject(s.id).expect("tasks"),
                    })
                    .collect(),
            })
            .collect()
    }

    fn seeded() -> (Hierarchy, Rc<Cell<usize>>) {
        let (mut h, hits) = tracker();
        h.add_course("CS").expect("course");
        h.add_course("Math").expect("course");
        h.add_subject(0, "Algorithms").expect("subject");
        h.add_subject(0, "Systems").expect("subject");
        h.add_subject(1, "Calculus").expect("subject");
        h.add_assignment(0, 0, "PS1").expect("task");
        h.add_assignment(0, 0, "PS2").expect("task");
        h.add_assignment(1, 0, "Limits").expect("task");
        (h, hits)
    }

    #[test]
    fn initial_load_notifies_once() {
        let (h, hits) = tracker();
        assert_eq!(hits.get(), 1);
        assert_eq!(h.revision(), 1);
        assert!(h.courses().is_empty());
    }

    #[test]
    fn every_structural_edit_matches_a_fresh_reload() {
        let (mut h, _) = seeded();
        assert_eq!(h.courses(), from_store(h.store()).as_slice());

        h.remove_subject(0, 1).expect("remove subject");
        assert_eq!(h.courses(), from_store(h.store()).as_slice());

        h.remove_assignment(0, 0, 0).expect("remove task");
        assert_eq!(h.courses(), from_store(h.store()).as_slice());
        assert_eq!(h.courses()[0].subjects[0].assignments[0].name, "PS2");
    }

    #[test]
    fn remove_course_cascades_in_cache_and_store() {
        let (mut h, _) = seeded();
        let cs_id = h.courses()[0].id;
        h.remove_course(0).expect("remove");
        assert_eq!(h.courses().len(), 1);
        assert_eq!(h.courses()[0].name, "Math");
        assert!(h.store().list_subjects_by_course(cs_id).expect("list").is_empty());
    }

    #[test]
    fn field_patch_matches_store_for_every_variant() {
        let fields = [
            AssignmentField::Grade("A".into()),
            AssignmentField::MaxGrade("100".into()),
            AssignmentField::Date("2025-05-01".into()),
            AssignmentField::Completed(true),
        ];
        for field in fields {
            let (mut h, hits) = seeded();
            let before = h.courses()[0].subjects[0].assignments[1].clone();
            let sibling = h.courses()[0].subjects[0].assignments[0].clone();
            let seen = hits.get();

            h.update_assignment_field(0, 0, 1, field.clone())
                .expect("update");

            let mut expected = before.clone();
            field.apply(&mut expected);
            assert_eq!(h.courses()[0].subjects[0].assignments[1], expected);
            assert_eq!(h.courses()[0].subjects[0].assignments[0], sibling);
            assert_eq!(h.courses(), from_store(h.store()).as_slice());
            assert_eq!(hits.get(), seen + 1);
        }
    }

    #[test]
    fn out_of_range_indices_change_nothing() {
        let (mut h, hits) = seeded();
        let snapshot = h.courses().to_vec();
        let seen = hits.get();

        let attempts: Vec<Result<(), SyncError>> = vec![
            h.add_subject(2, "x"),
            h.add_subject(usize::MAX, "x"),
            h.add_assignment(0, 2, "x"),
            h.add_assignment(5, 0, "x"),
            h.update_assignment_field(0, 0, 2, AssignmentField::Grade("F".into())),
            h.update_assignment_field(1, 1, 0, AssignmentField::Completed(true)),
            h.remove_course(2),
            h.remove_subject(1, 1),
            h.remove_assignment(1, 0, 1),
        ];
        for r in attempts {
            assert!(matches!(r, Err(SyncError::IndexOutOfRange { .. })), "{r:?}");
        }

        assert_eq!(h.courses(), snapshot.as_slice());
        assert_eq!(from_store(h.store()), snapshot);
        assert_eq!(hits.get(), seen);
    }

    #[test]
    fn out_of_range_reports_level_and_length() {
        let (mut h, _) = seeded();
        match h.add_assignment(0, 9, "x") {
            Err(SyncError::IndexOutOfRange { level, index, len }) => {
                assert_eq!(level, Level::Subject);
                assert_eq!(index, 9);
                assert_eq!(len, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn duplicate_course_leaves_cache_untouched() {
        let (mut h, hits) = tracker();
        h.add_course("Math").expect("first");
        let snapshot = h.courses().to_vec();
        let seen = hits.get();

        let err = h.add_course("Math").expect_err("duplicate");
        assert!(matches!(err, SyncError::Store(StoreError::Constraint(_))));
        assert_eq!(h.courses(), snapshot.as_slice());
        assert_eq!(hits.get(), seen);
    }

    #[test]
    fn patch_is_skipped_when_row_vanished_underneath() {
        let (mut h, hits) = seeded();
        let id = h.courses()[0].subjects[0].assignments[0].id;
        h.store().delete_assignment(id).expect("out-of-band delete");
        let seen = hits.get();

        let err = h
            .update_assignment_field(0, 0, 0, AssignmentField::Grade("B".into()))
            .expect_err("row gone");
        assert!(matches!(
            err,
            SyncError::Store(StoreError::NotFound { .. })
        ));
        assert_eq!(h.courses()[0].subjects[0].assignments[0].grade, "");
        assert_eq!(hits.get(), seen);
    }

    #[test]
    fn end_to_end_grade_flow() {
        let (mut h, _) = tracker();
        h.add_course("CS").expect("course");
        h.add_subject(0, "Algorithms").expect("subject");
        h.add_assignment(0, 0, "PS1").expect("task");
        h.update_assignment_field(0, 0, 0, AssignmentField::Grade("A".into()))
            .expect("grade");

        let sid = h.courses()[0].subjects[0].id;
        let rows = h.store().list_assignments_by_subject(sid).expect("list");
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.name, "PS1");
        assert_eq!(row.grade, "A");
        assert_eq!(row.max_grade, "");
        assert_eq!(row.date, "");
        assert!(!row.completed);
    }

    #[test]
    fn failed_reload_keeps_previous_cache_and_revision() {
        let (mut h, hits) = seeded();
        let snapshot = h.courses().to_vec();
        let revision = h.revision();
        let seen = hits.get();

        h.store()
            .conn()
            .execute_batch("DROP TABLE assignments")
            .expect("drop table");

        assert!(matches!(h.reload(), Err(SyncError::Store(_))));
        assert_eq!(h.courses(), snapshot.as_slice());
        assert_eq!(h.revision(), revision);
        assert_eq!(hits.get(), seen);
    }

    #[test]
    fn committed_write_with_failed_reload_reports_resync() {
        let (mut h, _) = seeded();
        let math_id = h.courses()[1].id;
        let revision = h.revision();
        h.store()
            .conn()
            .execute_batch("DROP TABLE assignments")
            .expect("drop table");

        let err = h.add_subject(1, "Geometry").expect_err("reload fails");
        assert!(matches!(err, SyncError::Resync(_)), "{err:?}");
        assert!(h.is_stale());
        assert_eq!(h.revision(), revision);

        // The subject landed even though the cache could not catch up.
        let names: Vec<String> = h
            .store()
            .list_subjects_by_course(math_id)
            .expect("subjects")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Calculus".to_string(), "Geometry".to_string()]);
        assert_eq!(h.courses()[1].subjects.len(), 1);

        h.store()
            .conn()
            .execute_batch(
                "CREATE TABLE assignments(
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    subject_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    grade TEXT, max_grade TEXT, date TEXT,
                    completed INTEGER DEFAULT 0)",
            )
            .expect("recreate table");
        h.reload().expect("reload");
        assert!(!h.is_stale());
        assert_eq!(h.courses()[1].subjects.len(), 2);
    }

    #[test]
    fn locate_tracks_positions_across_removals() {
        let (mut h, _) = seeded();
        let limits = h.courses()[1].subjects[0].assignments[0].id;
        let calculus = h.courses()[1].subjects[0].id;
        let math = h.courses()[1].id;
        assert_eq!(h.locate_assignment(limits), Some((1, 0, 0)));

        h.remove_course(0).expect("remove");
        assert_eq!(h.locate_course(math), Some(0));
        assert_eq!(h.locate_subject(calculus), Some((0, 0)));
        assert_eq!(h.locate_assignment(limits), Some((0, 0, 0)));
        assert_eq!(h.locate_course(-1), None);
    }
}
