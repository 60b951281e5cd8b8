//! Configuration validation.
//!
//! Uses Stillwater's `Validation` to accumulate every problem in a state
//! tree instead of stopping at the first one, so a broken configuration is
//! reported in a single pass.

use crate::builder::config::StateConfig;
use crate::builder::error::{BuildError, ConfigError};
use crate::builder::options::InitialPolicy;
use crate::core::{ContextValue, Event};
use std::collections::HashSet;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigError>>;

/// Validate a subtree about to be attached.
///
/// `known` holds ids already present in the machine; they count as
/// duplicates. The root context requirement only applies to whole trees.
pub fn validate_tree<C: ContextValue, E: Event>(
    root: &StateConfig<C, E>,
    known: &HashSet<String>,
    policy: InitialPolicy,
    is_root: bool,
) -> Check {
    let mut checks: Vec<Check> = Vec::new();

    if is_root && !root.has_context() {
        checks.push(Validation::fail(ConfigError::MissingRootContext {
            root: root.id.clone(),
        }));
    }

    let mut seen = known.clone();
    collect(root, "<root>", &mut seen, policy, &mut checks);

    Validation::all_vec(checks).map(|_| ())
}

/// Run [`validate_tree`] and convert the outcome into a `Result`.
pub fn check_tree<C: ContextValue, E: Event>(
    root: &StateConfig<C, E>,
    known: &HashSet<String>,
    policy: InitialPolicy,
    is_root: bool,
) -> Result<(), BuildError> {
    match validate_tree(root, known, policy, is_root) {
        Validation::Success(_) => Ok(()),
        Validation::Failure(errors) => Err(BuildError::InvalidConfig(
            errors.iter().cloned().collect(),
        )),
    }
}

fn collect<C: ContextValue, E: Event>(
    node: &StateConfig<C, E>,
    parent: &str,
    seen: &mut HashSet<String>,
    policy: InitialPolicy,
    checks: &mut Vec<Check>,
) {
    if node.id.is_empty() {
        checks.push(Validation::fail(ConfigError::EmptyId {
            parent: parent.to_string(),
        }));
    } else if !seen.insert(node.id.clone()) {
        checks.push(Validation::fail(ConfigError::DuplicateId {
            id: node.id.clone(),
        }));
    }

    if !node.parallel && policy == InitialPolicy::Reject {
        let flagged: Vec<String> = node
            .children
            .iter()
            .filter(|c| c.initial)
            .map(|c| c.id.clone())
            .collect();
        if flagged.len() > 1 {
            checks.push(Validation::fail(ConfigError::MultipleInitial {
                parent: node.id.clone(),
                ids: flagged,
            }));
        }
    }

    for child in &node.children {
        collect(child, &node.id, seen, policy, checks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DynEvent;

    type Config = StateConfig<(), DynEvent>;

    fn problems(result: Check) -> Vec<ConfigError> {
        match result {
            Validation::Failure(errors) => errors.iter().cloned().collect(),
            Validation::Success(_) => Vec::new(),
        }
    }

    #[test]
    fn valid_tree_passes() {
        let root = Config::new("root")
            .context(())
            .state(Config::new("a").initial())
            .state(Config::new("b"));

        assert!(validate_tree(&root, &HashSet::new(), InitialPolicy::Reject, true).is_success());
    }

    #[test]
    fn accumulates_all_problems() {
        let root = Config::new("root")
            .state(Config::new("a").initial())
            .state(Config::new("b").initial().state(Config::new("a")))
            .state(Config::new(""));

        let errors = problems(validate_tree(
            &root,
            &HashSet::new(),
            InitialPolicy::Reject,
            true,
        ));

        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ConfigError::MissingRootContext {
            root: "root".into()
        }));
        assert!(errors.contains(&ConfigError::DuplicateId { id: "a".into() }));
        assert!(errors.contains(&ConfigError::EmptyId {
            parent: "root".into()
        }));
        assert!(errors.contains(&ConfigError::MultipleInitial {
            parent: "root".into(),
            ids: vec!["a".into(), "b".into()],
        }));
    }

    #[test]
    fn first_match_policy_allows_several_initial_children() {
        let root = Config::new("root")
            .context(())
            .state(Config::new("a").initial())
            .state(Config::new("b").initial());

        assert!(
            validate_tree(&root, &HashSet::new(), InitialPolicy::FirstMatch, true).is_success()
        );
    }

    #[test]
    fn parallel_children_may_all_be_initial() {
        let root = Config::new("root")
            .context(())
            .parallel()
            .state(Config::new("a").initial())
            .state(Config::new("b").initial());

        assert!(validate_tree(&root, &HashSet::new(), InitialPolicy::Reject, true).is_success());
    }

    #[test]
    fn known_ids_count_as_duplicates() {
        let known: HashSet<String> = ["taken".to_string()].into_iter().collect();
        let subtree = Config::new("fresh").state(Config::new("taken"));

        let err = check_tree(&subtree, &known, InitialPolicy::Reject, false).unwrap_err();
        assert_eq!(
            err,
            BuildError::InvalidConfig(vec![ConfigError::DuplicateId { id: "taken".into() }])
        );
    }
}
