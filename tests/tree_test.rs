mod common;

use assert2::check;
use common::{TempSite, memory_site, sample_tree, temp_site};
use docseek::session::load_tree;
use docseek::store::FileStore;
use docseek::tree::{is_visible, highlight_html};
use docseek::{ClientState, Config, FileTreeData, MemorySource, NavAction, TreeLoad, TreeView};
use rstest::rstest;
use std::collections::BTreeSet;
use std::sync::Arc;

fn visible_paths(view: &TreeView) -> Vec<String> {
    view.rows().into_iter().map(|row| row.path).collect()
}

/// Test: Filtering "foo" shows only the matching branch and expands it.
#[rstest]
fn filter_shows_matching_branch(sample_tree: FileTreeData) {
    let mut view = TreeView::mount(sample_tree, ClientState::in_memory("test"), "/");
    view.set_filter("foo");

    check!(visible_paths(&view) == vec!["root", "root/dirA", "root/dirA/leafFoo.adoc"]);
    check!(view.is_expanded("root/dirA"));
    check!(!view.is_expanded("root/dirB"));

    let leaf = &view.rows()[2];
    check!(leaf.label_html == "leaf<mark>Foo</mark>");
}

/// Test: A matching leaf makes every ancestor visible.
#[rstest]
fn visibility_is_monotonic_up_the_tree(sample_tree: FileTreeData) {
    let root = &sample_tree.root[0];
    for filter in ["leafbar", "Bar Page", "orphan", "dira"] {
        for node in root.walk() {
            if is_visible(node, filter) {
                let ancestors = sample_tree
                    .nodes()
                    .filter(|n| n.is_directory && node.path.starts_with(&format!("{}/", n.path)));
                for ancestor in ancestors {
                    check!(is_visible(ancestor, filter), "{} hides {}", ancestor.path, node.path);
                }
            }
        }
    }
}

/// Test: Filter expansion only adds; clearing the filter keeps it.
#[rstest]
fn filter_expansion_is_a_union(sample_tree: FileTreeData) {
    let mut view = TreeView::mount(sample_tree, ClientState::in_memory("test"), "/");
    view.toggle("root/dirB");
    view.set_filter("foo");
    view.set_filter("");

    let expected: BTreeSet<String> = ["root", "root/dirA", "root/dirB"]
        .into_iter()
        .map(str::to_string)
        .collect();
    check!(view.expanded() == &expected);
    check!(visible_paths(&view).len() == 6);
}

/// Test: Clicks toggle directories and navigate leaves with a target only.
#[rstest]
fn clicks_toggle_or_navigate(sample_tree: FileTreeData) {
    let mut view = TreeView::mount(sample_tree, ClientState::in_memory("test"), "/");

    check!(
        view.click("root")
            == NavAction::Toggle {
                path: "root".to_string(),
                expanded: true
            }
    );
    check!(
        view.click("root/dirA/leafFoo.adoc")
            == NavAction::Navigate {
                url: "/root/dirA/leafFoo.html".to_string()
            }
    );
    check!(view.click("root/dirB/orphan.adoc") == NavAction::None);
    check!(view.click("does/not/exist") == NavAction::None);
}

/// Test: Mount expands the current page's ancestors and marks it active.
#[rstest]
fn mount_expands_path_to_current_page(sample_tree: FileTreeData) {
    let view = TreeView::mount(
        sample_tree,
        ClientState::in_memory("test"),
        "/root/dirB/leafBar.html",
    );
    check!(view.current_path() == "root/dirB/leafBar.html");
    check!(view.is_expanded("root"));
    check!(view.is_expanded("root/dirB"));

    let active: Vec<_> = view
        .rows()
        .into_iter()
        .filter(|row| row.is_active)
        .map(|row| row.label_html)
        .collect();
    check!(active == vec!["Bar Page"]);
}

/// Test: Expanded and collapsed state survive a remount and merge with ancestors.
#[rstest]
fn state_persists_across_mounts(temp_site: TempSite, sample_tree: FileTreeData) {
    let state_path = temp_site.path().join("state").join("state.json");
    let state = || {
        let store = FileStore::open(&state_path).expect("open state");
        ClientState::new(Arc::new(store), "site")
    };

    let mut first = TreeView::mount(sample_tree.clone(), state(), "/");
    first.toggle("root");
    first.toggle("root/dirB");
    check!(first.toggle_collapsed());

    let second = TreeView::mount(sample_tree, state(), "/root/dirA/leafFoo.html");
    let expected: BTreeSet<String> = ["root", "root/dirA", "root/dirB"]
        .into_iter()
        .map(str::to_string)
        .collect();
    check!(second.expanded() == &expected);
    check!(second.is_collapsed());
}

/// Test: Highlighting with an empty filter leaves labels untouched.
#[rstest]
#[case("leafFoo")]
#[case("Bar & <Baz>")]
fn empty_filter_highlight_is_identity(#[case] label: &str) {
    check!(highlight_html(label, "") == label);
}

/// Test: Tree loading reports failures as a value.
#[rstest]
#[tokio::test]
async fn load_tree_from_site(memory_site: MemorySource) {
    let config = Config::default();
    let loaded = load_tree(&memory_site, &config, ClientState::in_memory("test"), "/").await;
    let TreeLoad::Ready(view) = loaded else {
        panic!("tree should load");
    };
    check!(view.data().flat_list.len() == 6);

    let missing = load_tree(&MemorySource::new(), &config, ClientState::in_memory("test"), "/").await;
    check!(matches!(missing, TreeLoad::Failed(message) if message.contains("filetree.json")));
}
