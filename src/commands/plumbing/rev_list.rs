use crate::areas::repository::Repository;
use crate::artifacts::merge::bca_finder::ParentLookup;
use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;
use std::collections::{HashSet, VecDeque};

/// History walk over every parent of a commit
#[derive(Clone, new)]
pub struct RevList<'r> {
    repository: &'r Repository,
    start: ObjectId,
    #[new(default)]
    skip_merges: bool,
}

enum Visit {
    Enter(ObjectId),
    Emit(ObjectId),
}

impl<'r> RevList<'r> {
    /// Leave merge commits out of the result; their parents are still walked
    pub fn no_merges(self) -> Self {
        Self {
            skip_merges: true,
            ..self
        }
    }

    /// Commits reachable from the start but not from `stop`, parents before children
    ///
    /// Every parent is followed, so a `stop` reached only through a merged branch still bounds
    /// the walk. Commits missing from the database (shallow history) end their path.
    pub fn range_from(self, stop: Option<&ObjectId>) -> anyhow::Result<Vec<ObjectId>> {
        let excluded = match stop {
            Some(stop) => self.ancestors_of(stop)?,
            None => HashSet::new(),
        };

        let mut commits = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![Visit::Enter(self.start.clone())];

        while let Some(visit) = stack.pop() {
            let commit_id = match visit {
                Visit::Emit(commit_id) => {
                    commits.push(commit_id);
                    continue;
                }
                Visit::Enter(commit_id) => commit_id,
            };
            if excluded.contains(&commit_id) || !seen.insert(commit_id.clone()) {
                continue;
            }
            let Some(commit) = self.repository.database().find_commit(&commit_id)? else {
                continue;
            };

            if !(self.skip_merges && commit.is_merge()) {
                stack.push(Visit::Emit(commit_id));
            }
            // first parent on top: its history comes out first
            for parent_id in commit.parents().iter().rev() {
                stack.push(Visit::Enter(parent_id.clone()));
            }
        }

        Ok(commits)
    }

    /// `commit_id` and everything reachable from it
    fn ancestors_of(&self, commit_id: &ObjectId) -> anyhow::Result<HashSet<ObjectId>> {
        let mut reached = HashSet::new();
        let mut queue = VecDeque::from([commit_id.clone()]);

        while let Some(current) = queue.pop_front() {
            if !reached.insert(current.clone()) {
                continue;
            }
            let parents = self.repository.parents(&current)?.unwrap_or_default();
            queue.extend(parents);
        }

        Ok(reached)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::commit::{Commit, Person};
    use crate::artifacts::objects::tree::Tree;
    use pretty_assertions::assert_eq;
    use rstest::*;

    fn commit(repository: &Repository, message: &str, parents: &[&ObjectId]) -> ObjectId {
        let person = Person::new("Ada".to_string(), "ada@example.com".to_string());
        repository
            .put_commit(Commit::new(
                parents.iter().map(|&parent| parent.clone()).collect(),
                Tree::empty_id(),
                person.clone(),
                person,
                message.to_string(),
            ))
            .unwrap()
    }

    #[fixture]
    fn repository() -> Repository {
        Repository::in_memory().unwrap()
    }

    #[rstest]
    fn linear_range_is_oldest_first(repository: Repository) {
        let a = commit(&repository, "a", &[]);
        let b = commit(&repository, "b", &[&a]);
        let c = commit(&repository, "c", &[&b]);
        let d = commit(&repository, "d", &[&c]);

        let range = RevList::new(&repository, d.clone()).range_from(Some(&a)).unwrap();

        assert_eq!(range, vec![b, c, d]);
    }

    #[rstest]
    fn stop_behind_a_merge_bounds_the_walk(repository: Repository) {
        //   base <- upstream
        //     \          \
        //      topic <- merge <- tip
        let base = commit(&repository, "base", &[]);
        let upstream = commit(&repository, "upstream", &[&base]);
        let topic = commit(&repository, "topic", &[&base]);
        let merge = commit(&repository, "merge", &[&topic, &upstream]);
        let tip = commit(&repository, "tip", &[&merge]);

        let all = RevList::new(&repository, tip.clone())
            .range_from(Some(&upstream))
            .unwrap();
        let without_merges = RevList::new(&repository, tip.clone())
            .no_merges()
            .range_from(Some(&upstream))
            .unwrap();

        assert_eq!(all, vec![topic.clone(), merge, tip.clone()]);
        assert_eq!(without_merges, vec![topic, tip]);
    }

    #[rstest]
    fn parents_come_before_children(repository: Repository) {
        let root = commit(&repository, "root", &[]);
        let left = commit(&repository, "left", &[&root]);
        let right = commit(&repository, "right", &[&root]);
        let joined = commit(&repository, "joined", &[&left, &right]);

        let range = RevList::new(&repository, joined.clone()).range_from(None).unwrap();

        assert_eq!(range, vec![root, left, right, joined]);
    }
}
