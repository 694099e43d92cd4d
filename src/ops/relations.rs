//! Relation bookkeeping shared by the task form and the relation pickers.

use std::collections::{HashSet, VecDeque};

use crate::model::{RelationTypeId, TaskId, TaskReference};
use crate::store::{DbContext, Store, StoreError};

/// One side of a task's relations: (other task, relation type)
pub type RelationSet = Vec<(TaskId, RelationTypeId)>;

/// Store calls needed to turn one relation set into another
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationDiff {
    pub remove: Vec<TaskId>,
    pub add: Vec<(TaskId, RelationTypeId)>,
}

impl RelationDiff {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

pub fn relation_set(refs: &[TaskReference]) -> RelationSet {
    refs.iter().map(|r| (r.id, r.relation_type.id)).collect()
}

/// `wanted − current` is added, `current − wanted` removed. An entry whose
/// relation type changed is only added again, since adding overwrites the
/// type in place.
pub fn diff_relations(
    current: &[(TaskId, RelationTypeId)],
    wanted: &[(TaskId, RelationTypeId)],
) -> RelationDiff {
    let mut diff = RelationDiff::default();
    for &(id, _) in current {
        if !wanted.iter().any(|(w, _)| *w == id) {
            diff.remove.push(id);
        }
    }
    for &(id, ty) in wanted {
        match current.iter().find(|(c, _)| *c == id) {
            Some(&(_, current_ty)) if current_ty == ty => {}
            _ => diff.add.push((id, ty)),
        }
    }
    diff
}

/// True when linking `parent → child` would close a loop: the two are the
/// same task, or `parent` is already reachable from `child` through child
/// links.
pub fn would_create_cycle(
    store: &dyn Store,
    ctx: &DbContext,
    parent: TaskId,
    child: TaskId,
) -> Result<bool, StoreError> {
    if parent == child {
        return Ok(true);
    }
    let mut seen = HashSet::from([child]);
    let mut queue = VecDeque::from([child]);
    while let Some(id) = queue.pop_front() {
        for next in store.list_children(ctx, id)? {
            if next.id == parent {
                return Ok(true);
            }
            if seen.insert(next.id) {
                queue.push_back(next.id);
            }
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewTask;
    use crate::store::{CancelToken, SqliteStore};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn diff_changes_only_what_moved() {
        // {A:1, B:2} → {B:2, C:1}
        let (a, b, c) = (10, 11, 12);
        let diff = diff_relations(&[(a, 1), (b, 2)], &[(b, 2), (c, 1)]);
        assert_eq!(
            diff,
            RelationDiff {
                remove: vec![a],
                add: vec![(c, 1)],
            }
        );
    }

    #[test]
    fn changed_type_is_only_re_added() {
        let diff = diff_relations(&[(5, 1)], &[(5, 2)]);
        assert!(diff.remove.is_empty());
        assert_eq!(diff.add, vec![(5, 2)]);
    }

    #[test]
    fn identical_sets_need_nothing() {
        assert!(diff_relations(&[(1, 1), (2, 3)], &[(2, 3), (1, 1)]).is_empty());
    }

    #[test]
    fn detects_indirect_cycles() {
        let store = SqliteStore::open_in_memory().unwrap();
        let ctx = DbContext::new(Duration::from_secs(5), &CancelToken::new());
        let p = store.create_project(&ctx, "p", "").unwrap().id;
        let col = store.create_column(&ctx, p, "Todo", None).unwrap().id;
        let mk = |title: &str| {
            store
                .create_task(
                    &ctx,
                    &NewTask {
                        column_id: col,
                        title: title.into(),
                        description: String::new(),
                        priority_id: 2,
                        type_id: 1,
                    },
                )
                .unwrap()
                .id
        };
        let (a, b, c) = (mk("a"), mk("b"), mk("c"));
        store.add_relation(&ctx, a, b, 1).unwrap();
        store.add_relation(&ctx, b, c, 1).unwrap();

        assert!(would_create_cycle(&store, &ctx, c, a).unwrap());
        assert!(would_create_cycle(&store, &ctx, a, a).unwrap());
        assert!(!would_create_cycle(&store, &ctx, a, c).unwrap());
    }
}
