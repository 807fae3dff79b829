use ferrous_scope::{ExportStrategy, InjectionScope, Locator};
use proptest::prelude::*;

/// Expected selection order of `(index, priority)` registrations made in
/// index order on a single scope.
fn expected_order(priorities: &[i32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..priorities.len()).collect();
    order.sort_by(|&a, &b| priorities[b].cmp(&priorities[a]).then(b.cmp(&a)));
    order
}

proptest! {
    #[test]
    fn prop_locate_picks_highest_priority_then_latest(priorities in prop::collection::vec(-3i32..3, 1..12)) {
        let scope = InjectionScope::new();
        for (index, priority) in priorities.iter().enumerate() {
            scope.register(ExportStrategy::instance(index).priority(*priority).build());
        }

        let expected = expected_order(&priorities);
        prop_assert_eq!(*scope.locate::<usize>().unwrap(), expected[0]);

        let all: Vec<usize> = scope.locate_all::<usize>().unwrap().iter().map(|v| **v).collect();
        prop_assert_eq!(all, expected);
    }

    #[test]
    fn prop_child_wins_ties_against_parent(
        parent in prop::collection::vec(0i32..3, 1..6),
        child in prop::collection::vec(0i32..3, 1..6),
    ) {
        let root = InjectionScope::new();
        for (index, priority) in parent.iter().enumerate() {
            root.register(ExportStrategy::instance(index).priority(*priority).build());
        }
        let scope = root.create_child_scope();
        for (index, priority) in child.iter().enumerate() {
            scope.register(ExportStrategy::instance(100 + index).priority(*priority).build());
        }

        let best_parent = parent.iter().max().copied().unwrap_or(i32::MIN);
        let best_child = child.iter().max().copied().unwrap_or(i32::MIN);
        let selected = *scope.locate::<usize>().unwrap();

        if best_child >= best_parent {
            prop_assert!(selected >= 100);
        } else {
            prop_assert!(selected < 100);
        }
        prop_assert_eq!(scope.locate_all::<usize>().unwrap().len(), parent.len() + child.len());
    }

    #[test]
    fn prop_keyed_and_unkeyed_never_mix(keys in prop::collection::vec(prop::option::of(0i32..4), 1..10)) {
        let scope = InjectionScope::new();
        for (index, key) in keys.iter().enumerate() {
            let builder = ExportStrategy::instance(index);
            let builder = match key {
                Some(key) => builder.keyed(*key),
                None => builder,
            };
            scope.register(builder.build());
        }

        let unkeyed = keys.iter().filter(|k| k.is_none()).count();
        prop_assert_eq!(scope.locate_all::<usize>().unwrap().len(), unkeyed);

        for key in 0..4 {
            let expected = keys.iter().rposition(|k| *k == Some(key));
            let located = scope.locate_keyed::<usize>(key).ok().map(|v| *v);
            prop_assert_eq!(located, expected);
        }
    }
}
